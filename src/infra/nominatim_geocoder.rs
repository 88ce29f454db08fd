use crate::app::ports::{GeocodeQuery, GeocoderPort};
use crate::config::GeocodingConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// OpenStreetMap Nominatim search client. Built once per run and reused.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country: String,
    request_delay: Duration,
    /// When the last request was let through. Shared by every concurrent lookup.
    last_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    #[serde(default)]
    postcode: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            country: config.country.clone(),
            request_delay: config.request_delay(),
            last_request: Mutex::new(None),
        })
    }

    /// Nominatim's usage policy asks for spaced-out requests. The lock is held
    /// while sleeping so concurrent lookups queue up behind each other.
    async fn wait_for_turn(&self) {
        if self.request_delay.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_delay {
                tokio::time::sleep(self.request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn search_text(&self, query: &GeocodeQuery) -> String {
        [
            query.street_address.as_str(),
            query.city.as_str(),
            query.state.as_str(),
            self.country.as_str(),
        ]
        .iter()
        .filter(|part| !part.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[async_trait]
impl GeocoderPort for NominatimGeocoder {
    async fn lookup_postal_code(&self, query: &GeocodeQuery) -> std::result::Result<Option<String>, String> {
        self.wait_for_turn().await;

        let q = self.search_text(query);
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", q.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("geocoder responded with status {}", status.as_u16()));
        }

        let places: Vec<NominatimPlace> = resp.json().await.map_err(|e| e.to_string())?;
        Ok(places
            .into_iter()
            .next()
            .and_then(|place| place.address)
            .and_then(|address| address.postcode))
    }
}
