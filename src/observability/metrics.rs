//! Prometheus metrics for the normalization run.
//!
//! Each run counter is mirrored here so a long batch can be watched from a
//! scrape endpoint. Without an installed recorder every call is a no-op.

use std::fmt;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::info;

/// Every metric name the normalizer records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    NormalizeRecordsProcessed,
    NormalizeRecordsFailed,
    NormalizeWarnings,
    NormalizeZipCodesFilled,
    NormalizeGeocodingFailures,
    NormalizeQualityScore,
    NormalizeBatchesProcessed,
    NormalizeBatchSize,
    NormalizeBatchDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::NormalizeRecordsProcessed => "permits_normalize_records_processed_total",
            MetricName::NormalizeRecordsFailed => "permits_normalize_records_failed_total",
            MetricName::NormalizeWarnings => "permits_normalize_warnings_total",
            MetricName::NormalizeZipCodesFilled => "permits_normalize_zip_codes_filled_total",
            MetricName::NormalizeGeocodingFailures => "permits_normalize_geocoding_failures_total",
            MetricName::NormalizeQualityScore => "permits_normalize_quality_score",
            MetricName::NormalizeBatchesProcessed => "permits_normalize_batches_processed_total",
            MetricName::NormalizeBatchSize => "permits_normalize_batch_size",
            MetricName::NormalizeBatchDuration => "permits_normalize_batch_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static EXPORTER_ADDR: OnceLock<SocketAddr> = OnceLock::new();

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
/// Idempotent: later calls return the address of the first install.
pub fn init(addr: SocketAddr) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    if let Some(existing) = EXPORTER_ADDR.get() {
        return Ok(*existing);
    }
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = EXPORTER_ADDR.set(addr);
    info!("Prometheus exporter listening at http://{}/metrics", addr);
    Ok(addr)
}

pub mod normalize {
    use super::MetricName;

    /// Record a record emitted into the output batch
    pub fn record_normalized(quality_score: f64) {
        ::metrics::counter!(MetricName::NormalizeRecordsProcessed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::NormalizeQualityScore.as_str()).record(quality_score);
    }

    /// Record a record dropped on an unrecoverable failure
    pub fn record_failed() {
        ::metrics::counter!(MetricName::NormalizeRecordsFailed.as_str()).increment(1);
    }

    /// Record an unparseable field value
    pub fn warning_logged(kind: &'static str) {
        ::metrics::counter!(MetricName::NormalizeWarnings.as_str(), "kind" => kind).increment(1);
    }

    pub fn zip_filled() {
        ::metrics::counter!(MetricName::NormalizeZipCodesFilled.as_str()).increment(1);
    }

    pub fn geocoding_failed(reason: &'static str) {
        ::metrics::counter!(MetricName::NormalizeGeocodingFailures.as_str(), "reason" => reason)
            .increment(1);
    }

    /// Record that a batch finished
    pub fn batch_processed(batch_size: usize, duration_secs: f64) {
        ::metrics::counter!(MetricName::NormalizeBatchesProcessed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::NormalizeBatchSize.as_str()).record(batch_size as f64);
        ::metrics::histogram!(MetricName::NormalizeBatchDuration.as_str()).record(duration_secs);
    }
}
