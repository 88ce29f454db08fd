//! Canonical permit shapes and run-level statistics.
//!
//! Every normalized record is emitted in this fixed nested schema regardless of
//! how its raw keys were spelled. Optional fields serialize as explicit `null`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Main normalized permit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPermit {
    /// Never empty; derived from the source id or a content hash
    pub permit_id: String,
    pub permit_number: Option<String>,
    pub status: Option<String>,
    pub location: Location,
    pub contractor: Contractor,
    pub applicant: Applicant,
    pub valuation: Valuation,
    pub work_details: WorkDetails,
    pub dates: PermitDates,
    pub metadata: PermitMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub street_address: Option<String>,
    pub city: String,
    pub state: String,
    /// Five digit or ZIP+4 code
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub council_district: Option<i64>,
    pub census_tract: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contractor {
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub total_valuation: Option<f64>,
    pub permit_fee: Option<f64>,
    pub currency: String,
}

impl Default for Valuation {
    fn default() -> Self {
        Self {
            total_valuation: None,
            permit_fee: None,
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkDetails {
    pub permit_type: Option<String>,
    pub work_class: Option<String>,
    pub description: Option<String>,
    pub use_category: Option<String>,
}

/// Calendar dates rendered as ISO `YYYY-MM-DD`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermitDates {
    pub issue_date: Option<String>,
    pub expiration_date: Option<String>,
    pub application_date: Option<String>,
}

impl PermitDates {
    /// Year of `issue_date`, used for the calendar-year filter downstream.
    pub fn issue_year(&self) -> Option<i32> {
        self.issue_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.year())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitMetadata {
    pub normalized_at: DateTime<Utc>,
    pub original_fields_count: usize,
    /// Weighted completeness in [0, 1]
    pub data_quality_score: f64,
}

/// Run-scoped counters shared by every record of one batch.
///
/// Increments are atomic so concurrent workers can report into the same
/// accumulator. A fresh `RunStats` is created per run.
#[derive(Debug, Default)]
pub struct RunStats {
    total_records: AtomicU64,
    normalized_records: AtomicU64,
    errors: AtomicU64,
    warnings: AtomicU64,
    zip_codes_filled: AtomicU64,
    geocoding_failures: AtomicU64,
    seen_permit_ids: Mutex<HashSet<String>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_total(&self) {
        self.total_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_normalized(&self) {
        self.normalized_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_zip_filled(&self) {
        self.zip_codes_filled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_geocoding_failure(&self) {
        self.geocoding_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns false when `permit_id` was already emitted in this run.
    pub fn claim_permit_id(&self, permit_id: &str) -> bool {
        match self.seen_permit_ids.lock() {
            Ok(mut seen) => seen.insert(permit_id.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(permit_id.to_string()),
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_records: self.total_records.load(Ordering::Relaxed),
            normalized_records: self.normalized_records.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            zip_codes_filled: self.zip_codes_filled.load(Ordering::Relaxed),
            geocoding_failures: self.geocoding_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_records: u64,
    pub normalized_records: u64,
    pub errors: u64,
    pub warnings: u64,
    pub zip_codes_filled: u64,
    pub geocoding_failures: u64,
}
