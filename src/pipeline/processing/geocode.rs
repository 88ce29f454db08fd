use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::app::ports::{GeocodeQuery, GeocoderPort};
use crate::domain::RunStats;
use crate::observability::metrics;
use crate::pipeline::processing::normalize::formatters::matches_fully;

/// Best-effort postal code lookup by street address.
///
/// One attempt per call, bounded by `timeout`. Every outcome other than a
/// valid postal code counts as a geocoding failure and yields `None`; nothing
/// here fails the record.
#[derive(Clone)]
pub struct GeocodingFallback {
    port: Arc<dyn GeocoderPort>,
    timeout: Duration,
    zip_regex: Regex,
}

impl GeocodingFallback {
    pub fn new(port: Arc<dyn GeocoderPort>, timeout: Duration, zip_regex: Regex) -> Self {
        Self {
            port,
            timeout,
            zip_regex,
        }
    }

    pub async fn lookup_postal_code(
        &self,
        street_address: &str,
        city: &str,
        state: &str,
        stats: &RunStats,
    ) -> Option<String> {
        let query = GeocodeQuery {
            street_address: street_address.trim().to_string(),
            city: city.to_string(),
            state: state.to_string(),
        };

        let outcome = tokio::time::timeout(self.timeout, self.port.lookup_postal_code(&query)).await;

        let failure = match outcome {
            Ok(Ok(Some(code))) => {
                let code = code.trim().to_string();
                if matches_fully(&self.zip_regex, &code) {
                    info!("Found zip code {} for address: {}", code, query.street_address);
                    stats.record_zip_filled();
                    metrics::normalize::zip_filled();
                    return Some(code);
                }
                warn!("Invalid zip code format returned: {}", code);
                "invalid_format"
            }
            Ok(Ok(None)) => {
                warn!(
                    "Could not get zip code for address: {}, {}, {}",
                    query.street_address, query.city, query.state
                );
                "no_result"
            }
            Ok(Err(e)) => {
                warn!("Geocoding request failed for {}: {}", query.street_address, e);
                "request_failed"
            }
            Err(_) => {
                warn!(
                    "Geocoding timed out after {:?} for {}",
                    self.timeout, query.street_address
                );
                "timeout"
            }
        };

        stats.record_geocoding_failure();
        metrics::normalize::geocoding_failed(failure);
        None
    }
}
