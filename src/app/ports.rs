use async_trait::async_trait;

use crate::pipeline::output::NormalizationOutput;

/// Free-text address handed to the geocoding collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeocodeQuery {
    pub street_address: String,
    pub city: String,
    pub state: String,
}

// Enrichment-side ports
#[async_trait]
pub trait GeocoderPort: Send + Sync {
    /// Best-match postal code for the address, `Ok(None)` when nothing matched.
    async fn lookup_postal_code(&self, query: &GeocodeQuery) -> Result<Option<String>, String>;
}

// Output-side ports
#[async_trait]
pub trait NormalizeOutputPort: Send + Sync {
    async fn write_output(&self, output: &NormalizationOutput) -> anyhow::Result<()>;
}
