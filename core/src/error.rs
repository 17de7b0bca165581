//! The tagged error sum used throughout the pipeline.
//!
//! Each variant corresponds to one kind in the error taxonomy and carries
//! enough structured context (aspect, row index, a human message, and a
//! causal chain) for a caller to decide whether to recover, log-and-skip,
//! or abort the replay.

use std::path::PathBuf;

/// A result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The tagged error sum for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The schema registry's raw/clean maps or derived rule maps disagree.
    /// Fatal at startup; there is no recovery.
    #[error("schema registry is inconsistent: {reason}")]
    ConfigInconsistent {
        /// What was found to be inconsistent.
        reason: String,
    },

    /// Reading an input file or directory failed. Fatal for the replay.
    #[error("failed to ingest '{}': {reason}", path.display())]
    FileIngestion {
        /// The file or directory that could not be read.
        path: PathBuf,
        /// A short human message.
        reason: String,
        /// The underlying I/O error, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// A record failed to decode from its self-describing binary encoding.
    #[error("decoding failed for aspect '{aspect}' at row {row_index}: {reason}")]
    Decoding {
        /// The aspect being decoded.
        aspect: String,
        /// The index of the offending record within the aspect's stream.
        row_index: usize,
        /// A short human message.
        reason: String,
    },

    /// A decoded record did not conform to its raw or clean schema.
    #[error("schema validation failed for aspect '{aspect}' at row {row_index}: {reason}")]
    SchemaValidation {
        /// The aspect being validated.
        aspect: String,
        /// The index of the offending record.
        row_index: usize,
        /// A short human message, e.g. `"arity mismatch"` or `"not a list"`.
        reason: String,
    },

    /// The value transformer or output contract engine could not produce a
    /// valid clean record or transformed column. Always fatal for the replay.
    #[error("transformation failed for aspect '{aspect}' at row {row_index:?}: {reason}")]
    Transformation {
        /// The aspect or stream being transformed.
        aspect: String,
        /// The offending row, if the failure is row-scoped.
        row_index: Option<usize>,
        /// A short human message.
        reason: String,
    },

    /// A derived-stat function failed. Logged with context; the stat is
    /// dropped and the replay continues.
    #[error("derived stat '{stat}' failed: {reason}")]
    Aggregation {
        /// The name of the stat function that failed.
        stat: String,
        /// A short human message.
        reason: String,
    },

    /// An output encoder failed to produce its artifact. Fatal for the replay.
    #[error("output generation failed in strategy '{strategy}': {reason}")]
    OutputGeneration {
        /// The name of the output strategy.
        strategy: String,
        /// The stream being encoded, if applicable.
        stream: Option<String>,
        /// A short human message.
        reason: String,
    },

    /// Reading the intermediate decode cache failed; recoverable by
    /// falling back to fresh processing.
    #[error("cache read failed: {reason}")]
    CacheRead {
        /// A short human message.
        reason: String,
    },

    /// Writing the intermediate decode cache failed; recoverable, the
    /// replay's result is unaffected.
    #[error("cache write failed: {reason}")]
    CacheWrite {
        /// A short human message.
        reason: String,
    },

    /// The cache's version hash no longer matches the running pipeline's
    /// source hash; recoverable by reprocessing from scratch.
    #[error(
        "cache is stale: {reason} (re-run with a fresh cache directory to force reprocessing)"
    )]
    CacheValidation {
        /// A short human message.
        reason: String,
    },
}

impl Error {
    pub(crate) fn file_ingestion(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileIngestion {
            path: path.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn file_ingestion_io(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::FileIngestion {
            path: path.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// `true` if this error kind should abort the whole replay rather than
    /// being logged and skipped.
    pub fn is_fatal_for_replay(&self) -> bool {
        !matches!(
            self,
            Error::Aggregation { .. }
                | Error::CacheRead { .. }
                | Error::CacheWrite { .. }
                | Error::CacheValidation { .. }
        )
    }
}
