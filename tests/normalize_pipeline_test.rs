use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::Builder;

use permit_normalizer::app::normalize_use_case::NormalizeUseCase;
use permit_normalizer::app::ports::{GeocodeQuery, GeocoderPort};
use permit_normalizer::infra::JsonFileOutput;
use permit_normalizer::pipeline::processing::FieldMapper;
use permit_normalizer::{
    embedding_text, load_records, InputFormat, NormalizerConfig, NormalizerError, PermitFilter,
    Pipeline,
};

fn offline_config() -> NormalizerConfig {
    let mut config = NormalizerConfig::default();
    config.geocoding.enabled = false;
    config
}

struct FixedGeocoder {
    postcode: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl GeocoderPort for FixedGeocoder {
    async fn lookup_postal_code(&self, _query: &GeocodeQuery) -> Result<Option<String>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.postcode.clone())
    }
}

struct FailingGeocoder;

#[async_trait]
impl GeocoderPort for FailingGeocoder {
    async fn lookup_postal_code(&self, _query: &GeocodeQuery) -> Result<Option<String>, String> {
        Err("connection refused".to_string())
    }
}

#[tokio::test]
async fn test_austin_record_normalizes_end_to_end() -> Result<()> {
    let pipeline = Pipeline::new(offline_config(), None)?;
    let raw = json!({
        "permit_num": "2023-00123",
        "ADDRESS": "101 Congress Ave",
        "Zip_Code": "78701",
        "issue_date": "01/15/2023"
    });

    let (records, stats) = pipeline.normalize_batch(vec![raw]).await;

    assert_eq!(records.len(), 1);
    let permit = &records[0];
    assert_eq!(permit.permit_number.as_deref(), Some("2023-00123"));
    assert_eq!(permit.location.street_address.as_deref(), Some("101 Congress Ave"));
    assert_eq!(permit.location.zip_code.as_deref(), Some("78701"));
    assert_eq!(permit.dates.issue_date.as_deref(), Some("2023-01-15"));
    assert_eq!(stats.total_records, 1);
    assert_eq!(stats.normalized_records, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.warnings, 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_isolates_bad_record() -> Result<()> {
    let pipeline = Pipeline::new(offline_config(), None)?;
    let records = vec![
        json!({ "permit_number": "BP-1", "address": "1 Main St" }),
        json!(null),
        json!({ "permit_number": "BP-3", "address": "3 Main St" }),
    ];

    let (normalized, stats) = pipeline.normalize_batch(records).await;

    assert_eq!(normalized.len(), 2);
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.normalized_records, 2);
    Ok(())
}

#[tokio::test]
async fn test_conflicting_descriptions_keep_longer_value() -> Result<()> {
    let pipeline = Pipeline::new(offline_config(), None)?;
    let raw = json!({
        "permit_id": "R-1",
        "description": "roof",
        "work_description": "replace entire roof structure"
    });

    let (normalized, _) = pipeline.normalize_batch(vec![raw]).await;

    assert_eq!(
        normalized[0].work_details.description.as_deref(),
        Some("replace entire roof structure")
    );
    Ok(())
}

#[tokio::test]
async fn test_geocoding_fills_and_counts() -> Result<()> {
    let geocoder = Arc::new(FixedGeocoder {
        postcode: Some("78701".to_string()),
        calls: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(NormalizerConfig::default(), Some(geocoder.clone()))?;
    let records = vec![
        json!({ "permit_id": "G-1", "address": "101 Congress Ave", "zip": "abc" }),
        json!({ "permit_id": "G-2", "zip": "78704" }),
        json!({ "permit_id": "G-3" }),
    ];

    let (normalized, stats) = pipeline.normalize_batch(records).await;

    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(normalized[0].location.zip_code.as_deref(), Some("78701"));
    assert_eq!(normalized[1].location.zip_code.as_deref(), Some("78704"));
    assert_eq!(normalized[2].location.zip_code, None);
    assert_eq!(stats.zip_codes_filled, 1);
    assert_eq!(stats.geocoding_failures, 0);
    Ok(())
}

#[tokio::test]
async fn test_geocoding_failures_never_drop_records() -> Result<()> {
    let no_match = Arc::new(FixedGeocoder {
        postcode: None,
        calls: AtomicUsize::new(0),
    });
    let bad_format = Arc::new(FixedGeocoder {
        postcode: Some("TX 787".to_string()),
        calls: AtomicUsize::new(0),
    });
    let raw = json!({ "permit_id": "F-1", "address": "1 Nowhere Rd" });

    for port in [
        no_match as Arc<dyn GeocoderPort>,
        bad_format as Arc<dyn GeocoderPort>,
        Arc::new(FailingGeocoder) as Arc<dyn GeocoderPort>,
    ] {
        let pipeline = Pipeline::new(NormalizerConfig::default(), Some(port))?;
        let (normalized, stats) = pipeline.normalize_batch(vec![raw.clone()]).await;
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].location.zip_code, None);
        assert_eq!(stats.geocoding_failures, 1);
        assert_eq!(stats.errors, 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_csv_dataset_to_output_file() -> Result<()> {
    let mut input = Builder::new().suffix(".csv").tempfile()?;
    writeln!(input, "Permit Num,Permit Type Desc,Original Address1,Original Zip,Issued Date,Total Job Valuation,Contractor Phone")?;
    writeln!(input, "2023-001,Building Permit,101 Congress Ave,78701,2023-03-01,\"$1,250.00\",(512) 555-1234")?;
    writeln!(input, "2023-002,Electrical Permit,500 E 7th St,,not a date,,")?;
    input.flush()?;

    let dir = tempfile::tempdir()?;
    let output_path = dir.path().join("normalized.json");

    let pipeline = Pipeline::new(offline_config(), None)?;
    let use_case = NormalizeUseCase::new(pipeline, Box::new(JsonFileOutput::new(&output_path)));
    let stats = use_case.run(input.path(), InputFormat::Auto, None).await?;

    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.normalized_records, 2);
    // the unparseable issue date
    assert_eq!(stats.warnings, 1);

    let document: Value = serde_json::from_str(&std::fs::read_to_string(&output_path)?)?;
    assert_eq!(document["metadata"]["schema_version"], "1.0");
    assert_eq!(document["metadata"]["total_records"], 2);

    let first = &document["records"][0];
    assert_eq!(first["permit_id"], "2023-001");
    assert_eq!(first["work_details"]["permit_type"], "Building Permit");
    assert_eq!(first["valuation"]["total_valuation"], 1250.0);
    assert_eq!(first["valuation"]["currency"], "USD");
    assert_eq!(first["contractor"]["phone"], "512-555-1234");
    assert_eq!(first["dates"]["issue_date"], "2023-03-01");

    let second = &document["records"][1];
    assert_eq!(second["location"]["zip_code"], Value::Null);
    assert_eq!(second["dates"]["issue_date"], Value::Null);
    assert_eq!(second["applicant"]["email"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_unsupported_format_aborts_before_processing() -> Result<()> {
    let mut input = Builder::new().suffix(".txt").tempfile()?;
    writeln!(input, "permit_id,address")?;

    let err = load_records(input.path(), InputFormat::Auto).unwrap_err();
    assert!(matches!(err, NormalizerError::UnsupportedFormat(_)));
    assert!(err.is_configuration_failure());

    let dir = tempfile::tempdir()?;
    let output_path = dir.path().join("normalized.json");
    let pipeline = Pipeline::new(offline_config(), None)?;
    let use_case = NormalizeUseCase::new(pipeline, Box::new(JsonFileOutput::new(&output_path)));
    assert!(use_case.run(input.path(), InputFormat::Auto, None).await.is_err());
    assert!(!output_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_normalized_records_feed_search_contract() -> Result<()> {
    let pipeline = Pipeline::new(offline_config(), None)?;
    let raw = json!({
        "permit_id": "S-1",
        "permit_type": "Building",
        "work_class": "New",
        "city": "Austin",
        "council_district": "9",
        "issued_date": "2022-06-30",
        "total_valuation": "250000"
    });

    let (normalized, _) = pipeline.normalize_batch(vec![raw]).await;
    let permit = &normalized[0];

    let text = embedding_text(permit);
    assert!(text.starts_with("Permit Type: Building | Work Class: New"));
    assert!(text.ends_with("Valuation: $250,000.00"));

    let filter = PermitFilter {
        permit_type: Some("Building".to_string()),
        council_district: Some(9),
        calendar_year_issued: Some(2022),
        ..Default::default()
    };
    assert!(filter.matches(permit));
    Ok(())
}

#[test]
fn test_map_key_is_idempotent() {
    let mapper = FieldMapper::new();
    for key in ["Permit Num", "  ZIP-CODE ", "Original_Address1", "Some Future Column!", "__lat__"] {
        let once = mapper.map_key(key);
        assert_eq!(mapper.map_key(&once), once, "key {:?}", key);
    }
}
