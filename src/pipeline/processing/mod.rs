// Pipeline processing: field normalization, geocoding fallback, and scoring

pub mod geocode;
pub mod index_text;
pub mod normalize;
pub mod quality_gate;

pub use geocode::GeocodingFallback;
pub use normalize::{ConflictResolver, FieldMapper, Formatters, RecordBuilder, ResolvedRecord};
pub use quality_gate::QualityScorer;
