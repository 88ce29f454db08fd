use crate::app::ports::NormalizeOutputPort;
use crate::pipeline::output::NormalizationOutput;
use anyhow::Context;
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File-based implementation of NormalizeOutputPort.
/// Writes the whole output document as pretty-printed JSON.
pub struct JsonFileOutput {
    path: PathBuf,
}

impl JsonFileOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NormalizeOutputPort for JsonFileOutput {
    async fn write_output(&self, output: &NormalizationOutput) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }

        let file = File::create(&self.path)
            .with_context(|| format!("creating output file {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, output)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!(
            "Wrote {} normalized records to {}",
            output.records.len(),
            self.path.display()
        );
        Ok(())
    }
}
