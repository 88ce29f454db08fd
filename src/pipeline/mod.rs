// Normalization pipeline: ingestion, per-record processing, and output

pub mod ingestion;
pub mod output;
pub mod processing;

use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::app::ports::GeocoderPort;
use crate::config::NormalizerConfig;
use crate::domain::{NormalizedPermit, PermitMetadata, RunStats, StatsSnapshot};
use crate::error::{NormalizerError, Result};
use crate::observability::metrics;
use processing::normalize::values::value_kind;
use processing::normalize::CanonicalField;
use processing::{
    ConflictResolver, FieldMapper, Formatters, GeocodingFallback, QualityScorer, RecordBuilder,
};

/// Orchestrates resolve -> build -> score for each raw record and isolates
/// per-record failures from the rest of the batch.
///
/// Cheap to clone; clones share the same configuration and geocoder handle.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<NormalizerConfig>,
    resolver: ConflictResolver,
    builder: RecordBuilder,
    scorer: QualityScorer,
}

impl Pipeline {
    /// `geocoder` is ignored when geocoding is disabled in `config`.
    pub fn new(config: NormalizerConfig, geocoder: Option<Arc<dyn GeocoderPort>>) -> Result<Self> {
        config.validate()?;
        let formatters = Formatters::from_config(&config)?;

        let fallback = match geocoder {
            Some(port) if config.geocoding.enabled => Some(GeocodingFallback::new(
                port,
                config.geocoding.timeout(),
                config.zip_regex()?,
            )),
            _ => None,
        };

        let builder = RecordBuilder::new(
            formatters,
            fallback,
            config.default_city.clone(),
            config.default_state.clone(),
        );
        let resolver = ConflictResolver::new(FieldMapper::new(), config.missing_sentinels.clone());
        let scorer = QualityScorer::new(config.missing_sentinels.clone());

        Ok(Self {
            config: Arc::new(config),
            resolver,
            builder,
            scorer,
        })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one raw record. Returns `None` when the record had to be
    /// dropped; the failure is logged and counted on `stats`.
    #[instrument(skip(self, raw, stats))]
    pub async fn normalize_record(
        &self,
        raw: &Value,
        index: usize,
        stats: &RunStats,
    ) -> Option<NormalizedPermit> {
        stats.record_total();

        let outcome = AssertUnwindSafe(self.try_normalize_record(raw, index, stats))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(permit)) => {
                stats.record_normalized();
                metrics::normalize::record_normalized(permit.metadata.data_quality_score);
                debug!("Record {} emitted as {}", index, permit.permit_id);
                Some(permit)
            }
            Ok(Err(e)) => {
                error!("Error normalizing record {}: {}", index, e);
                stats.record_error();
                metrics::normalize::record_failed();
                None
            }
            Err(panic) => {
                error!("Record {} panicked during normalization: {}", index, panic_message(panic.as_ref()));
                stats.record_error();
                metrics::normalize::record_failed();
                None
            }
        }
    }

    async fn try_normalize_record(
        &self,
        raw: &Value,
        index: usize,
        stats: &RunStats,
    ) -> Result<NormalizedPermit> {
        let fields = raw.as_object().ok_or_else(|| NormalizerError::InvalidRecord {
            index,
            message: format!("expected a key/value object, found {}", value_kind(raw)),
        })?;

        let resolved = self.resolver.resolve(fields);
        debug!("Record {} resolved to {} canonical fields", index, resolved.len());

        let sections = self.builder.build(&resolved, stats).await;
        debug!("Record {} built", index);

        let data_quality_score = self.scorer.score(&resolved);
        debug!("Record {} scored {:.3}", index, data_quality_score);

        let permit_number = resolved.text(CanonicalField::PermitNumber);
        let permit_id = resolved
            .text(CanonicalField::PermitId)
            .or_else(|| permit_number.clone())
            .unwrap_or_else(|| fallback_permit_id(raw));

        if !stats.claim_permit_id(&permit_id) {
            warn!("Duplicate permit_id {} at record {}", permit_id, index);
            stats.record_warning();
            metrics::normalize::warning_logged("duplicate_permit_id");
        }

        Ok(NormalizedPermit {
            permit_id,
            permit_number,
            status: resolved.text(CanonicalField::Status),
            location: sections.location,
            contractor: sections.contractor,
            applicant: sections.applicant,
            valuation: sections.valuation,
            work_details: sections.work_details,
            dates: sections.dates,
            metadata: PermitMetadata {
                normalized_at: Utc::now(),
                original_fields_count: fields.len(),
                data_quality_score,
            },
        })
    }

    /// Normalize a whole batch with a fresh set of run counters.
    ///
    /// Output order follows input order; dropped records leave no gap.
    #[instrument(skip_all, fields(records = records.len(), concurrency = self.config.concurrency))]
    pub async fn normalize_batch(&self, records: Vec<Value>) -> (Vec<NormalizedPermit>, StatsSnapshot) {
        let started = Instant::now();
        let total = records.len();
        let stats = Arc::new(RunStats::new());

        info!("Starting normalization of {} records", total);

        let normalized = if self.config.concurrency <= 1 {
            self.run_sequential(records, &stats).await
        } else {
            self.run_concurrent(records, &stats).await
        };

        let snapshot = stats.snapshot();
        let elapsed = started.elapsed().as_secs_f64();
        metrics::normalize::batch_processed(total, elapsed);
        info!(
            "Normalization complete: {} normalized, {} errors, {} warnings, {} zip codes filled, {} geocoding failures ({:.2}s)",
            snapshot.normalized_records,
            snapshot.errors,
            snapshot.warnings,
            snapshot.zip_codes_filled,
            snapshot.geocoding_failures,
            elapsed
        );

        (normalized, snapshot)
    }

    async fn run_sequential(&self, records: Vec<Value>, stats: &RunStats) -> Vec<NormalizedPermit> {
        let total = records.len();
        let mut normalized = Vec::with_capacity(total);

        for (index, raw) in records.iter().enumerate() {
            if let Some(permit) = self.normalize_record(raw, index, stats).await {
                normalized.push(permit);
            }
            self.report_progress(index + 1, total);
        }

        normalized
    }

    async fn run_concurrent(&self, records: Vec<Value>, stats: &Arc<RunStats>) -> Vec<NormalizedPermit> {
        let total = records.len();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.min(Semaphore::MAX_PERMITS)));
        let mut handles = Vec::with_capacity(total);

        for (index, raw) in records.into_iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Worker pool closed before record {}: {}", index, e);
                    break;
                }
            };
            let pipeline = self.clone();
            let stats = Arc::clone(stats);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                pipeline.normalize_record(&raw, index, &stats).await
            }));
        }

        let mut normalized = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Some(permit)) => normalized.push(permit),
                Ok(None) => {}
                Err(e) => {
                    // total was already counted when the task started
                    error!("Worker for record {} failed: {}", index, e);
                    stats.record_error();
                    metrics::normalize::record_failed();
                }
            }
            self.report_progress(index + 1, total);
        }

        normalized
    }

    fn report_progress(&self, processed: usize, total: usize) {
        let interval = self.config.progress_interval;
        if interval > 0 && processed % interval == 0 {
            info!("Processed {}/{} records", processed, total);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Deterministic stand-in id for records without an identifier field.
///
/// Derived from the compact JSON text of the raw record, so it changes when
/// key order or value spelling changes, and it collides more often as the
/// dataset grows past a few thousand records.
pub fn fallback_permit_id(raw: &Value) -> String {
    let digest = Sha256::digest(raw.to_string().as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let id = format!("permit_{}", u64::from_be_bytes(prefix) % 1_000_000);
    debug!("Generated {} from content digest {}", id, hex::encode(digest));
    id
}
