use crate::pipeline::processing::normalize::{is_absent, CanonicalField, ResolvedRecord};

/// Fields that carry double weight in the completeness score.
pub const ESSENTIAL_FIELDS: [CanonicalField; 4] = [
    CanonicalField::PermitId,
    CanonicalField::StreetAddress,
    CanonicalField::PermitType,
    CanonicalField::IssueDate,
];

const ESSENTIAL_WEIGHT: f64 = 2.0;
const OTHER_WEIGHT: f64 = 1.0;

/// Weighted completeness score for a resolved record.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    sentinels: Vec<String>,
}

impl QualityScorer {
    pub fn new(sentinels: Vec<String>) -> Self {
        Self { sentinels }
    }

    /// Essential fields always count toward the total with weight 2; every
    /// other key present in the record counts with weight 1. Returns the
    /// filled share of the total, in [0, 1].
    pub fn score(&self, record: &ResolvedRecord) -> f64 {
        let filled = |key: &str| {
            record
                .get_key(key)
                .map(|v| !is_absent(v, &self.sentinels))
                .unwrap_or(false)
        };

        let mut score = 0.0;
        let mut total_weight = 0.0;

        for field in ESSENTIAL_FIELDS {
            total_weight += ESSENTIAL_WEIGHT;
            if filled(field.as_str()) {
                score += ESSENTIAL_WEIGHT;
            }
        }

        let essential_keys: Vec<&str> = ESSENTIAL_FIELDS.iter().map(|f| f.as_str()).collect();
        for key in record.keys().filter(|k| !essential_keys.contains(k)) {
            total_weight += OTHER_WEIGHT;
            if filled(key) {
                score += OTHER_WEIGHT;
            }
        }

        if total_weight > 0.0 {
            (score / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
