//! A library for decoding per-replay game telemetry from its self-describing
//! binary encoding, normalizing it against a declared schema, and encoding
//! the result into one of several analytical bundle formats.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::missing_errors_doc)]

pub mod cache;
pub mod contract;
pub mod decode;
pub mod encode;
pub mod enums;
pub mod error;
pub mod ingestion;
pub mod materialize;
pub mod orchestrator;
pub mod schema;
pub mod stats;
pub mod stream;
pub mod transform;
pub mod value;

pub use crate::error::{Error, Result};
pub use crate::orchestrator::{run_pipeline, OutputFormat, PipelineConfig};
pub use crate::schema::SchemaRegistry;
