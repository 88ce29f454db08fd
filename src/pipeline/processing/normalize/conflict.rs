use serde_json::{Map, Value};
use tracing::debug;

use super::field_mapper::{CanonicalField, FieldMapper};
use super::values::{is_absent, to_text};

/// One value per canonical key, in first-seen order.
///
/// Keys are canonical field names, or the normalized spelling of keys the
/// alias table does not know.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRecord {
    fields: Map<String, Value>,
}

impl ResolvedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: CanonicalField) -> Option<&Value> {
        self.fields.get(field.as_str())
    }

    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Value of `field` as text, if present.
    pub fn text(&self, field: CanonicalField) -> Option<String> {
        self.get(field).map(to_text)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains_key(field.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Collapses duplicate and aliased raw keys to a single value per canonical key.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    mapper: FieldMapper,
    sentinels: Vec<String>,
}

impl ConflictResolver {
    pub fn new(mapper: FieldMapper, sentinels: Vec<String>) -> Self {
        Self { mapper, sentinels }
    }

    /// Walks raw fields in source order. Absent values are skipped. When two
    /// keys map to the same canonical key the strictly longer text wins; ties
    /// keep the first value seen.
    pub fn resolve(&self, raw: &Map<String, Value>) -> ResolvedRecord {
        let mut resolved = ResolvedRecord::new();

        for (raw_key, value) in raw {
            if is_absent(value, &self.sentinels) {
                continue;
            }

            let key = self.mapper.map_key(raw_key);
            match resolved.get_key(&key) {
                None => resolved.insert(key, value.clone()),
                Some(existing) => {
                    let current_len = to_text(existing).chars().count();
                    let new_len = to_text(value).chars().count();
                    if new_len > current_len {
                        debug!(field = %key, raw_key = %raw_key, "Replacing shorter duplicate value");
                        resolved.insert(key, value.clone());
                    }
                }
            }
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver() -> ConflictResolver {
        ConflictResolver::new(
            FieldMapper::new(),
            vec!["nan".to_string(), "null".to_string(), "none".to_string()],
        )
    }

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_longer_duplicate_wins() {
        let raw = as_map(json!({
            "description": "roof",
            "work_description": "replace entire roof structure"
        }));
        let resolved = resolver().resolve(&raw);
        assert_eq!(
            resolved.text(CanonicalField::WorkDescription).as_deref(),
            Some("replace entire roof structure")
        );
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_shorter_later_duplicate_is_ignored() {
        let raw = as_map(json!({
            "work_description": "replace entire roof structure",
            "description": "roof"
        }));
        let resolved = resolver().resolve(&raw);
        assert_eq!(
            resolved.text(CanonicalField::WorkDescription).as_deref(),
            Some("replace entire roof structure")
        );
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let raw = as_map(json!({
            "permit_status": "Active",
            "status": "Closed"
        }));
        let resolved = resolver().resolve(&raw);
        assert_eq!(resolved.text(CanonicalField::Status).as_deref(), Some("Active"));
    }

    #[test]
    fn test_absent_values_are_skipped() {
        let raw = as_map(json!({
            "zip_code": null,
            "original_zip": "   ",
            "zipcode": "NaN",
            "address": "101 Congress Ave",
            "street_address": ""
        }));
        let resolved = resolver().resolve(&raw);
        assert!(!resolved.contains(CanonicalField::ZipCode));
        assert_eq!(
            resolved.text(CanonicalField::StreetAddress).as_deref(),
            Some("101 Congress Ave")
        );
    }

    #[test]
    fn test_unknown_keys_keep_order_and_value() {
        let raw = as_map(json!({
            "Housing Units": 4,
            "permit_num": "BP-1"
        }));
        let resolved = resolver().resolve(&raw);
        let keys: Vec<&str> = resolved.keys().collect();
        assert_eq!(keys, vec!["housing_units", "permit_number"]);
        assert_eq!(resolved.get_key("housing_units"), Some(&json!(4)));
    }

    #[test]
    fn test_numeric_values_compare_by_text_length() {
        let raw = as_map(json!({
            "valuation": 9500,
            "total_valuation": "$12,500.00"
        }));
        let resolved = resolver().resolve(&raw);
        assert_eq!(resolved.get(CanonicalField::TotalValuation), Some(&json!("$12,500.00")));
    }
}
