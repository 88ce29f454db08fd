use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{info, instrument};

use crate::app::ports::NormalizeOutputPort;
use crate::domain::StatsSnapshot;
use crate::pipeline::ingestion::{load_records, InputFormat};
use crate::pipeline::output::NormalizationOutput;
use crate::pipeline::Pipeline;

/// Use case for normalizing a whole permit dataset and publishing the result
pub struct NormalizeUseCase {
    pipeline: Pipeline,
    output: Box<dyn NormalizeOutputPort>,
}

impl NormalizeUseCase {
    pub fn new(pipeline: Pipeline, output: Box<dyn NormalizeOutputPort>) -> Self {
        Self { pipeline, output }
    }

    /// Load `input`, normalize at most `limit` records and write the output
    /// document. Loading failures abort before any record is touched.
    #[instrument(skip(self, input), fields(input = %input.display()))]
    pub async fn run(
        &self,
        input: &Path,
        format: InputFormat,
        limit: Option<usize>,
    ) -> Result<StatsSnapshot> {
        let records = load_records(input, format)
            .with_context(|| format!("loading records from {}", input.display()))?;
        self.normalize_records(records, &input.display().to_string(), limit)
            .await
    }

    /// Normalize already-loaded raw records from `source`.
    pub async fn normalize_records(
        &self,
        mut records: Vec<Value>,
        source: &str,
        limit: Option<usize>,
    ) -> Result<StatsSnapshot> {
        if let Some(limit) = limit {
            if records.len() > limit {
                records.truncate(limit);
                info!("Limited to {} records for processing", limit);
            }
        }

        let (normalized, stats) = self.pipeline.normalize_batch(records).await;

        let document = NormalizationOutput::new(source, stats, normalized);
        self.output.write_output(&document).await?;

        info!("Normalization complete for {}", source);
        Ok(stats)
    }
}
