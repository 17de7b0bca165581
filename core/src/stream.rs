//! The per-stream unit the encoders consume: a transformed table plus the
//! metadata the Output Contract Engine produced for it.

use indexmap::IndexMap;
use polars::prelude::DataFrame;

use crate::contract::TableMetadata;

/// One named output stream: a transformed table and its column metadata.
#[derive(Debug, Clone)]
pub struct TransformedStream {
    /// The stream's name (an aspect name or a derived-stat name).
    pub name: String,
    /// The transformed column table.
    pub table: DataFrame,
    /// The metadata the contract engine produced alongside `table`.
    pub metadata: TableMetadata,
}

impl TransformedStream {
    /// `true` if the stream has no rows; empty streams are skipped by the
    /// binary encoders (§4.6) but still enumerated by the conventional ones.
    pub fn is_empty(&self) -> bool {
        self.table.height() == 0
    }
}

/// An insertion-ordered collection of streams, keyed by name.
///
/// The hybrid encoder's `schema.streams` iteration order must be
/// deterministic given the input name set (§5); an `IndexMap` gives that
/// for free instead of requiring callers to sort by name themselves.
pub type StreamMap = IndexMap<String, TransformedStream>;
