use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::values::{is_absent, to_text};
use crate::config::NormalizerConfig;
use crate::domain::RunStats;
use crate::error::Result;
use crate::observability::metrics;

/// Formats tried when none of the configured formats match.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y%m%d",
];

/// Field-level normalizers for dates, currency, phone numbers and postal codes.
///
/// Unrecoverable input yields `None` and a warning on the run stats; these
/// functions never fail the record.
#[derive(Debug, Clone)]
pub struct Formatters {
    date_formats: Vec<String>,
    currency_symbols: Vec<String>,
    zip_regex: Regex,
    sentinels: Vec<String>,
}

impl Formatters {
    pub fn from_config(config: &NormalizerConfig) -> Result<Self> {
        Ok(Self {
            date_formats: config.date_formats.clone(),
            currency_symbols: config.currency_symbols.clone(),
            zip_regex: config.zip_regex()?,
            sentinels: config.missing_sentinels.clone(),
        })
    }

    pub fn is_absent(&self, value: &Value) -> bool {
        is_absent(value, &self.sentinels)
    }

    /// Normalize a date to ISO `YYYY-MM-DD`, discarding any time of day.
    pub fn normalize_date(&self, value: Option<&Value>, stats: &RunStats) -> Option<String> {
        let value = value.filter(|v| !self.is_absent(v))?;
        let date_str = to_text(value).trim().to_string();

        let parsed = self
            .date_formats
            .iter()
            .find_map(|fmt| parse_with_format(&date_str, fmt))
            .or_else(|| parse_generic_date(&date_str));

        match parsed {
            Some(date) => Some(date.format("%Y-%m-%d").to_string()),
            None => {
                warn!("Could not parse date: {}", date_str);
                stats.record_warning();
                metrics::normalize::warning_logged("date");
                None
            }
        }
    }

    /// Strip currency tokens, thousands separators and whitespace, then parse.
    pub fn normalize_currency(&self, value: Option<&Value>, stats: &RunStats) -> Option<f64> {
        let value = value.filter(|v| !self.is_absent(v))?;

        if let Value::Number(n) = value {
            if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                return Some(f);
            }
        }

        let mut cleaned = to_text(value).trim().to_string();
        for symbol in &self.currency_symbols {
            cleaned = cleaned.replace(symbol.as_str(), "");
        }
        let cleaned: String = cleaned
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();

        match cleaned.parse::<f64>() {
            Ok(amount) if amount.is_finite() => Some(amount),
            _ => {
                warn!("Could not parse currency value: {}", to_text(value));
                stats.record_warning();
                metrics::normalize::warning_logged("currency");
                None
            }
        }
    }

    /// Format 10-digit numbers (optionally prefixed by a `1`) as
    /// `DDD-DDD-DDDD`; anything else is returned trimmed and unchanged.
    pub fn normalize_phone(&self, value: Option<&Value>) -> Option<String> {
        let value = value.filter(|v| !self.is_absent(v))?;
        let phone_str = to_text(value).trim().to_string();

        let digits: String = phone_str.chars().filter(|c| c.is_ascii_digit()).collect();
        let ten = match digits.len() {
            10 => Some(digits.as_str()),
            11 if digits.starts_with('1') => Some(&digits[1..]),
            _ => None,
        };

        match ten {
            Some(d) => Some(format!("{}-{}-{}", &d[..3], &d[3..6], &d[6..])),
            None if phone_str.is_empty() => None,
            None => Some(phone_str),
        }
    }

    /// First postal-code-shaped substring of the value, if any.
    pub fn extract_zip(&self, value: Option<&Value>) -> Option<String> {
        let value = value.filter(|v| !self.is_absent(v))?;
        let zip_str = to_text(value);
        self.zip_regex
            .find(zip_str.trim())
            .map(|m| m.as_str().to_string())
    }

    /// True when the whole string is a postal code.
    pub fn is_valid_zip(&self, candidate: &str) -> bool {
        matches_fully(&self.zip_regex, candidate)
    }
}

pub(crate) fn matches_fully(regex: &Regex, candidate: &str) -> bool {
    regex
        .find(candidate)
        .map(|m| m.start() == 0 && m.end() == candidate.len())
        .unwrap_or(false)
}

/// chrono's `%Y` also accepts one to three digits, so `01/15/23` would match
/// `%m/%d/%Y` as year 23. Such years are rejected so the two-digit formats
/// get their turn.
fn parse_with_format(input: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(input, fmt)
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(input, fmt))
        .ok()
        .filter(|date| date.year() >= 1000)
}

/// Best-effort parse for shapes the configured formats don't cover.
fn parse_generic_date(input: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.date_naive());
    }
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| parse_with_format(input, fmt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatters() -> Formatters {
        Formatters::from_config(&NormalizerConfig::default()).unwrap()
    }

    #[test]
    fn test_configured_date_formats_round_trip() {
        let f = formatters();
        let stats = RunStats::new();
        let moment = NaiveDate::from_ymd_opt(2023, 1, 15)
            .unwrap()
            .and_hms_milli_opt(10, 30, 45, 123)
            .unwrap();

        for fmt in &NormalizerConfig::default().date_formats {
            let rendered = moment.format(fmt).to_string();
            assert_eq!(
                f.normalize_date(Some(&json!(rendered)), &stats).as_deref(),
                Some("2023-01-15"),
                "format {} rendered as {}",
                fmt,
                rendered
            );
        }
        assert_eq!(stats.snapshot().warnings, 0);
    }

    #[test]
    fn test_date_generic_fallback() {
        let f = formatters();
        let stats = RunStats::new();
        assert_eq!(
            f.normalize_date(Some(&json!("2023-01-15T10:00:00Z")), &stats).as_deref(),
            Some("2023-01-15")
        );
        assert_eq!(
            f.normalize_date(Some(&json!("January 15, 2023")), &stats).as_deref(),
            Some("2023-01-15")
        );
        assert_eq!(
            f.normalize_date(Some(&json!("2023/01/15")), &stats).as_deref(),
            Some("2023-01-15")
        );
        assert_eq!(stats.snapshot().warnings, 0);
    }

    #[test]
    fn test_unparseable_date_warns() {
        let f = formatters();
        let stats = RunStats::new();
        assert_eq!(f.normalize_date(Some(&json!("sometime next week")), &stats), None);
        assert_eq!(f.normalize_date(Some(&json!("02/30/2023")), &stats), None);
        assert_eq!(stats.snapshot().warnings, 2);
    }

    #[test]
    fn test_absent_date_is_silent() {
        let f = formatters();
        let stats = RunStats::new();
        assert_eq!(f.normalize_date(None, &stats), None);
        assert_eq!(f.normalize_date(Some(&json!("  ")), &stats), None);
        assert_eq!(stats.snapshot().warnings, 0);
    }

    #[test]
    fn test_currency() {
        let f = formatters();
        let stats = RunStats::new();
        assert_eq!(f.normalize_currency(Some(&json!("$1,234.56")), &stats), Some(1234.56));
        assert_eq!(f.normalize_currency(Some(&json!("usd 10")), &stats), Some(10.0));
        assert_eq!(f.normalize_currency(Some(&json!("USD 2,000")), &stats), Some(2000.0));
        assert_eq!(f.normalize_currency(Some(&json!(750.5)), &stats), Some(750.5));
        assert_eq!(stats.snapshot().warnings, 0);

        assert_eq!(f.normalize_currency(Some(&json!("n/a")), &stats), None);
        assert_eq!(stats.snapshot().warnings, 1);
    }

    #[test]
    fn test_currency_rejects_non_finite() {
        let f = formatters();
        let stats = RunStats::new();
        assert_eq!(f.normalize_currency(Some(&json!("inf")), &stats), None);
        assert_eq!(stats.snapshot().warnings, 1);
    }

    #[test]
    fn test_phone() {
        let f = formatters();
        assert_eq!(
            f.normalize_phone(Some(&json!("(512) 555-1234"))).as_deref(),
            Some("512-555-1234")
        );
        assert_eq!(
            f.normalize_phone(Some(&json!("15125551234"))).as_deref(),
            Some("512-555-1234")
        );
        assert_eq!(
            f.normalize_phone(Some(&json!("+1 512.555.1234"))).as_deref(),
            Some("512-555-1234")
        );
        assert_eq!(f.normalize_phone(Some(&json!("555"))).as_deref(), Some("555"));
        assert_eq!(
            f.normalize_phone(Some(&json!(" ext. 42 "))).as_deref(),
            Some("ext. 42")
        );
        assert_eq!(f.normalize_phone(Some(&json!(""))), None);
        assert_eq!(f.normalize_phone(None), None);
    }

    #[test]
    fn test_extract_zip() {
        let f = formatters();
        assert_eq!(f.extract_zip(Some(&json!("78701-1234"))).as_deref(), Some("78701-1234"));
        assert_eq!(f.extract_zip(Some(&json!("TX 78704"))).as_deref(), Some("78704"));
        assert_eq!(f.extract_zip(Some(&json!(78701))).as_deref(), Some("78701"));
        assert_eq!(f.extract_zip(Some(&json!("abc"))), None);
        assert_eq!(f.extract_zip(None), None);
    }

    #[test]
    fn test_two_digit_years_are_not_read_as_year_zero() {
        let f = formatters();
        let stats = RunStats::new();
        assert_eq!(
            f.normalize_date(Some(&json!("01/15/23")), &stats).as_deref(),
            Some("2023-01-15")
        );
        assert_eq!(
            f.normalize_date(Some(&json!("1/5/23")), &stats).as_deref(),
            Some("2023-01-05")
        );
        assert_eq!(
            f.normalize_date(Some(&json!("01/15/2023")), &stats).as_deref(),
            Some("2023-01-15")
        );
        assert_eq!(stats.snapshot().warnings, 0);
    }

    #[test]
    fn test_is_valid_zip() {
        let f = formatters();
        assert!(f.is_valid_zip("78701"));
        assert!(f.is_valid_zip("78701-1234"));
        assert!(!f.is_valid_zip("7870"));
        assert!(!f.is_valid_zip("78701 TX"));
        assert!(!f.is_valid_zip("Austin"));
    }
}
