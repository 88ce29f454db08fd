// Pipeline ingestion: loading raw permit records from tabular or JSON datasets

use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{NormalizerError, Result};
use crate::pipeline::processing::normalize::values::value_kind;

/// Dataset format for `load_records`. `Auto` picks by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    #[default]
    Auto,
    Csv,
    Json,
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(InputFormat::Auto),
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            other => Err(format!("unknown input format '{}', expected auto, csv or json", other)),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputFormat::Auto => "auto",
            InputFormat::Csv => "csv",
            InputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

impl InputFormat {
    /// Resolve `Auto` against the file extension.
    pub fn resolve(self, path: &Path) -> Result<InputFormat> {
        if self != InputFormat::Auto {
            return Ok(self);
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            _ => Err(NormalizerError::UnsupportedFormat(format!(
                "cannot infer format of '{}' from extension '{}'",
                path.display(),
                extension
            ))),
        }
    }
}

/// Load every raw record from `path`. Any failure here is fatal for the run.
pub fn load_records(path: &Path, format: InputFormat) -> Result<Vec<Value>> {
    let format = format.resolve(path)?;
    info!("Loading data from {} as {}", path.display(), format);

    let records = if format == InputFormat::Csv {
        load_csv(path)?
    } else {
        load_json(path)?
    };

    info!("Loaded {} records", records.len());
    Ok(records)
}

/// Header row gives the keys; an empty cell becomes `null`.
fn load_csv(path: &Path) -> Result<Vec<Value>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut fields = Map::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = match row.get(i) {
                Some(cell) if !cell.trim().is_empty() => Value::String(cell.to_string()),
                _ => Value::Null,
            };
            fields.insert(header.to_string(), value);
        }
        records.push(Value::Object(fields));
    }
    Ok(records)
}

/// An array of records, or a single object treated as one record.
fn load_json(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(items) => Ok(items),
        Value::Object(fields) => Ok(vec![Value::Object(fields)]),
        other => Err(NormalizerError::UnsupportedFormat(format!(
            "JSON document in '{}' must be an array or an object, found {}",
            path.display(),
            value_kind(&other)
        ))),
    }
}
