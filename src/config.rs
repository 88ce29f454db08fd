use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{NormalizerError, Result};

/// Normalization settings. Every field has a default, so an empty (or absent)
/// config file yields the stock Austin permit setup.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// chrono format strings tried in order before the generic fallback parse
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default = "default_currency_symbols")]
    pub currency_symbols: Vec<String>,
    #[serde(default = "default_zip_pattern")]
    pub zip_pattern: String,
    /// Case-insensitive string values treated the same as null
    #[serde(default = "default_missing_sentinels")]
    pub missing_sentinels: Vec<String>,
    #[serde(default = "default_city")]
    pub default_city: String,
    #[serde(default = "default_state")]
    pub default_state: String,
    /// Emit a progress line every N records (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    /// Number of records normalized concurrently; 1 means a sequential pass
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_date_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d".to_string(),
        "%m/%d/%Y".to_string(),
        "%Y-%m-%dT%H:%M:%S".to_string(),
        "%Y-%m-%dT%H:%M:%S%.f".to_string(),
    ]
}

fn default_currency_symbols() -> Vec<String> {
    vec!["$".to_string(), "USD".to_string(), "usd".to_string()]
}

fn default_zip_pattern() -> String {
    r"\d{5}(-\d{4})?".to_string()
}

fn default_missing_sentinels() -> Vec<String> {
    vec!["nan".to_string(), "null".to_string(), "none".to_string()]
}

fn default_city() -> String {
    "Austin".to_string()
}

fn default_state() -> String {
    "TX".to_string()
}

fn default_progress_interval() -> usize {
    10
}

fn default_concurrency() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_user_agent() -> String {
    concat!("permit-normalizer/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_request_delay_ms() -> u64 {
    100
}

fn default_country() -> String {
    "US".to_string()
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_geocoder_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            country: default_country(),
        }
    }
}

impl GeocodingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
            currency_symbols: default_currency_symbols(),
            zip_pattern: default_zip_pattern(),
            missing_sentinels: default_missing_sentinels(),
            default_city: default_city(),
            default_state: default_state(),
            progress_interval: default_progress_interval(),
            concurrency: default_concurrency(),
            geocoding: GeocodingConfig::default(),
        }
    }
}

impl NormalizerConfig {
    /// Load settings from an optional TOML file, then apply `PERMITS_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            NormalizerError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: NormalizerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(enabled) = env_var("PERMITS_GEOCODING_ENABLED") {
            self.geocoding.enabled = parse_env("PERMITS_GEOCODING_ENABLED", &enabled)?;
        }
        if let Some(url) = env_var("PERMITS_GEOCODER_URL") {
            self.geocoding.base_url = url;
        }
        if let Some(agent) = env_var("PERMITS_GEOCODER_USER_AGENT") {
            self.geocoding.user_agent = agent;
        }
        if let Some(timeout) = env_var("PERMITS_GEOCODER_TIMEOUT_SECS") {
            self.geocoding.timeout_secs = parse_env("PERMITS_GEOCODER_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(concurrency) = env_var("PERMITS_CONCURRENCY") {
            self.concurrency = parse_env("PERMITS_CONCURRENCY", &concurrency)?;
        }
        Ok(())
    }

    /// Reject settings that would make every record fail.
    pub fn validate(&self) -> Result<()> {
        self.zip_regex()?;
        if self.date_formats.is_empty() {
            return Err(NormalizerError::Config(
                "date_formats must list at least one format".to_string(),
            ));
        }
        if self.geocoding.enabled && self.geocoding.base_url.trim().is_empty() {
            return Err(NormalizerError::Config(
                "geocoding.base_url is empty while geocoding is enabled".to_string(),
            ));
        }
        if self.concurrency > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(NormalizerError::Config(format!(
                "concurrency {} exceeds the supported maximum of {}",
                self.concurrency,
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }

    pub fn zip_regex(&self) -> Result<Regex> {
        Regex::new(&self.zip_pattern).map_err(|e| {
            NormalizerError::Config(format!("Invalid zip_pattern '{}': {}", self.zip_pattern, e))
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| NormalizerError::Config(format!("Invalid value for {}: '{}'", key, value)))
}
