//! Contract helpers for downstream indexing and filtered search.

use serde::{Deserialize, Serialize};

use crate::domain::NormalizedPermit;

/// Text representation handed to the embedding collaborator.
pub fn embedding_text(permit: &NormalizedPermit) -> String {
    let mut parts = Vec::new();
    let work = &permit.work_details;

    if let Some(v) = &work.permit_type {
        parts.push(format!("Permit Type: {}", v));
    }
    if let Some(v) = &work.work_class {
        parts.push(format!("Work Class: {}", v));
    }
    if let Some(v) = &work.description {
        parts.push(format!("Description: {}", v));
    }
    if let Some(v) = &work.use_category {
        parts.push(format!("Use Category: {}", v));
    }
    if let Some(v) = &permit.location.street_address {
        parts.push(format!("Address: {}", v));
    }
    if !permit.location.city.is_empty() {
        parts.push(format!("City: {}", permit.location.city));
    }
    if let Some(v) = &permit.contractor.name {
        parts.push(format!("Contractor: {}", v));
    }
    if let Some(v) = permit.valuation.total_valuation.filter(|v| *v > 0.0) {
        parts.push(format!("Valuation: ${}", format_thousands(v)));
    }

    parts.join(" | ")
}

/// `1234567.5` -> `1,234,567.50`
fn format_thousands(amount: f64) -> String {
    let fixed = format!("{:.2}", amount);
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let digits: Vec<char> = whole.chars().collect();
    let mut grouped = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    format!("{}.{}", grouped, frac)
}

/// Equality predicates over canonical field names; unset predicates match all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermitFilter {
    pub permit_type: Option<String>,
    pub work_class: Option<String>,
    pub use_category: Option<String>,
    pub city: Option<String>,
    pub council_district: Option<i64>,
    pub calendar_year_issued: Option<i32>,
}

impl PermitFilter {
    pub fn is_empty(&self) -> bool {
        *self == PermitFilter::default()
    }

    pub fn matches(&self, permit: &NormalizedPermit) -> bool {
        fn eq(want: &Option<String>, have: Option<&str>) -> bool {
            want.as_deref().map_or(true, |w| have == Some(w))
        }

        eq(&self.permit_type, permit.work_details.permit_type.as_deref())
            && eq(&self.work_class, permit.work_details.work_class.as_deref())
            && eq(&self.use_category, permit.work_details.use_category.as_deref())
            && eq(&self.city, Some(permit.location.city.as_str()))
            && self
                .council_district
                .map_or(true, |d| permit.location.council_district == Some(d))
            && self
                .calendar_year_issued
                .map_or(true, |y| permit.dates.issue_year() == Some(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::*;
    use chrono::Utc;

    fn permit() -> NormalizedPermit {
        NormalizedPermit {
            permit_id: "2023-00123".to_string(),
            permit_number: Some("2023-00123".to_string()),
            status: Some("Active".to_string()),
            location: Location {
                street_address: Some("101 Congress Ave".to_string()),
                city: "Austin".to_string(),
                state: "TX".to_string(),
                zip_code: Some("78701".to_string()),
                latitude: None,
                longitude: None,
                council_district: Some(9),
                census_tract: None,
            },
            contractor: Contractor {
                name: Some("Acme Irrigation".to_string()),
                ..Default::default()
            },
            applicant: Applicant::default(),
            valuation: Valuation {
                total_valuation: Some(1234567.5),
                ..Default::default()
            },
            work_details: WorkDetails {
                permit_type: Some("Building".to_string()),
                work_class: Some("Commercial".to_string()),
                description: Some("irrigation system".to_string()),
                use_category: None,
            },
            dates: PermitDates {
                issue_date: Some("2023-01-15".to_string()),
                ..Default::default()
            },
            metadata: PermitMetadata {
                normalized_at: Utc::now(),
                original_fields_count: 4,
                data_quality_score: 1.0,
            },
        }
    }

    #[test]
    fn test_embedding_text() {
        assert_eq!(
            embedding_text(&permit()),
            "Permit Type: Building | Work Class: Commercial | Description: irrigation system | \
             Address: 101 Congress Ave | City: Austin | Contractor: Acme Irrigation | \
             Valuation: $1,234,567.50"
        );
    }

    #[test]
    fn test_embedding_text_skips_zero_valuation() {
        let mut p = permit();
        p.valuation.total_valuation = Some(0.0);
        assert!(!embedding_text(&p).contains("Valuation"));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(999.0), "999.00");
        assert_eq!(format_thousands(1000.0), "1,000.00");
        assert_eq!(format_thousands(12500.456), "12,500.46");
    }

    #[test]
    fn test_filter_matches() {
        let p = permit();
        assert!(PermitFilter::default().matches(&p));
        assert!(PermitFilter {
            permit_type: Some("Building".to_string()),
            council_district: Some(9),
            calendar_year_issued: Some(2023),
            city: Some("Austin".to_string()),
            ..Default::default()
        }
        .matches(&p));
        assert!(!PermitFilter {
            calendar_year_issued: Some(2022),
            ..Default::default()
        }
        .matches(&p));
        assert!(!PermitFilter {
            use_category: Some("Residential".to_string()),
            ..Default::default()
        }
        .matches(&p));
    }
}
