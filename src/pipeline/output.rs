use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{NormalizedPermit, StatsSnapshot};

pub const SCHEMA_VERSION: &str = "1.0";

/// The document written at the end of a dataset run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationOutput {
    pub metadata: OutputMetadata,
    pub schema: Value,
    pub records: Vec<NormalizedPermit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub normalized_at: DateTime<Utc>,
    pub source_file: String,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub schema_version: String,
}

impl NormalizationOutput {
    pub fn new(source_file: impl Into<String>, stats: StatsSnapshot, records: Vec<NormalizedPermit>) -> Self {
        Self {
            metadata: OutputMetadata {
                normalized_at: Utc::now(),
                source_file: source_file.into(),
                stats,
                schema_version: SCHEMA_VERSION.to_string(),
            },
            schema: schema_documentation(),
            records,
        }
    }
}

/// Human-readable description of every canonical sub-object.
pub fn schema_documentation() -> Value {
    json!({
        "description": "Normalized construction permits schema",
        "version": SCHEMA_VERSION,
        "objects": {
            "Location": {
                "description": "Standardized location information",
                "fields": {
                    "street_address": "Primary street address",
                    "city": "City name (default: Austin)",
                    "state": "State code (default: TX)",
                    "zip_code": "Five digit or ZIP+4 postal code",
                    "latitude": "Decimal latitude",
                    "longitude": "Decimal longitude",
                    "council_district": "Council district number",
                    "census_tract": "Census tract identifier"
                }
            },
            "Contractor": {
                "description": "Contractor information",
                "fields": {
                    "name": "Contractor name or company",
                    "license_number": "Professional license number",
                    "phone": "Normalized phone (XXX-XXX-XXXX) or the source text",
                    "address": "Contractor address",
                    "company_type": "Type of contracting company"
                }
            },
            "Applicant": {
                "description": "Applicant information",
                "fields": {
                    "name": "Name of the applicant",
                    "company": "Applicant company",
                    "phone": "Applicant phone number",
                    "email": "Applicant email address",
                    "address": "Applicant address"
                }
            },
            "Valuation": {
                "description": "Financial information",
                "fields": {
                    "total_valuation": "Total project valuation",
                    "permit_fee": "Permit fee paid",
                    "currency": "Currency code (always USD)"
                }
            },
            "WorkDetails": {
                "description": "Work description and classification",
                "fields": {
                    "permit_type": "Permit type (e.g. Building, Electrical)",
                    "work_class": "Class or category of the work",
                    "description": "Description of the work",
                    "use_category": "Use category (e.g. Residential, Commercial)"
                }
            },
            "PermitDates": {
                "description": "Permit lifecycle dates",
                "fields": {
                    "issue_date": "Date issued (YYYY-MM-DD)",
                    "expiration_date": "Date the permit expires (YYYY-MM-DD)",
                    "application_date": "Date applied for (YYYY-MM-DD)"
                }
            },
            "metadata": {
                "description": "Per-record normalization metadata",
                "fields": {
                    "normalized_at": "UTC timestamp of normalization",
                    "original_fields_count": "Number of raw fields in the source record",
                    "data_quality_score": "Weighted completeness score between 0 and 1"
                }
            }
        }
    })
}
