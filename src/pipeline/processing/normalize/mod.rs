//! Field-level normalization: key canonicalization, duplicate resolution,
//! value formatting and section assembly.

pub mod builder;
pub mod conflict;
pub mod field_mapper;
pub mod formatters;
pub mod values;

pub use builder::{PermitSections, RecordBuilder};
pub use conflict::{ConflictResolver, ResolvedRecord};
pub use field_mapper::{CanonicalField, FieldKey, FieldMapper};
pub use formatters::Formatters;
pub use values::is_absent;
