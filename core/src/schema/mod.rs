//! Canonical raw/clean aspect schemas and the registry that ties them
//! together (§4.1).
//!
//! Schemas are declared as plain `const`/`static` data rather than derived
//! through runtime reflection: each raw field carries an explicit
//! [`FieldMetadata`] bag, and [`registry::SchemaRegistry::build`] folds those
//! bags into the derived dequantization and enum maps once, at startup.

pub mod clean;
pub mod raw;
pub mod registry;

pub use clean::{CleanFieldType, CleanSchema};
pub use raw::{FieldMetadata, RawFieldDescriptor, RawSchema, ScalarType};
pub use registry::SchemaRegistry;

/// The name of a registered enum kind, e.g. `"UnitEventsEnum"`. Output
/// contracts and enum-mapping rules reference enum kinds by this key rather
/// than by Rust type, matching the "globally registered by string key"
/// requirement in the data model.
pub type EnumKindName = &'static str;
