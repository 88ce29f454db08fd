pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

// Domain data shapes shared across layers
pub mod domain;

pub use config::NormalizerConfig;
pub use domain::{NormalizedPermit, RunStats, StatsSnapshot};
pub use error::{NormalizerError, Result};
pub use pipeline::ingestion::{load_records, InputFormat};
pub use pipeline::processing::index_text::{embedding_text, PermitFilter};
pub use pipeline::Pipeline;
