use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid record at index {index}: {message}")]
    InvalidRecord { index: usize, message: String },
}

impl NormalizerError {
    /// Fatal errors abort a run before any record is normalized.
    pub fn is_configuration_failure(&self) -> bool {
        matches!(
            self,
            NormalizerError::Config(_)
                | NormalizerError::UnsupportedFormat(_)
                | NormalizerError::Io(_)
                | NormalizerError::Csv(_)
                | NormalizerError::Toml(_)
                | NormalizerError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NormalizerError>;
