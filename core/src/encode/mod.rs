//! Output encoders: the binary layouts in §4.6 plus the conventional
//! wrappers in §4.7, sharing a template-method trait (§9, "Polymorphic
//! stream strategies").

pub mod column_encoder;
pub mod columnar_bundle;
pub mod dtype_code;
pub mod hybrid;
pub mod legacy;
pub mod ndjson;
pub mod parquet_dir;
pub mod row_major;
pub mod row_major_bundle;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::stream::StreamMap;

/// The inputs every output strategy shares: where to write, the replay's
/// identity, a fixed timestamp (never sampled internally, so runs are
/// reproducible — §8 property 8), and any static assets to attach.
pub struct EncodeContext {
    /// The replay this bundle belongs to.
    pub replay_id: String,
    /// The directory artifacts are written under.
    pub output_dir: PathBuf,
    /// The timestamp recorded in schema documents.
    pub generated_at: OffsetDateTime,
    /// Opaque named byte blobs (`game_meta`, `defs_map`, …) attached
    /// without participating in stream-layout machinery.
    pub static_assets: HashMap<String, Vec<u8>>,
}

/// A physical output layout. Each variant gathers the transformed streams,
/// dispatches to its own `execute_write`, and relies on [`write`] to wrap
/// any failure as [`Error::OutputGeneration`].
pub trait OutputStrategy {
    /// The strategy's name, used in error messages and CLI listings.
    fn strategy_name(&self) -> &'static str;

    /// Writes the bundle for `streams` under `ctx`. Implementations should
    /// propagate failures as plain [`anyhow::Error`]-compatible causes; the
    /// default [`OutputStrategy::write`] method attaches strategy context.
    fn execute_write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()>;

    /// Runs [`OutputStrategy::execute_write`], tagging any error with this
    /// strategy's name if it wasn't already an [`Error::OutputGeneration`].
    fn write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()> {
        self.execute_write(streams, ctx).map_err(|e| match e {
            Error::OutputGeneration { .. } => e,
            other => Error::OutputGeneration {
                strategy: self.strategy_name().to_string(),
                stream: None,
                reason: other.to_string(),
            },
        })
    }
}

/// Compresses `bytes` with zstd at the library's default level.
pub fn zstd_compress(bytes: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(bytes, 0).map_err(|e| Error::OutputGeneration {
        strategy: "zstd".to_string(),
        stream: None,
        reason: format!("compression failed: {e}"),
    })
}

/// Writes `bytes` to `path` atomically: write to a `.tmp` sibling, then
/// rename over the destination.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("tmp")
    ));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::file_ingestion_io(parent, "failed to create output directory", e))?;
    }
    {
        use std::io::Write;
        let file = std::fs::File::create(&tmp_path)
            .map_err(|e| Error::file_ingestion_io(&tmp_path, "failed to create temp file", e))?;
        let mut writer = std::io::BufWriter::new(file);
        writer
            .write_all(bytes)
            .map_err(|e| Error::file_ingestion_io(&tmp_path, "failed to write temp file", e))?;
        writer
            .flush()
            .map_err(|e| Error::file_ingestion_io(&tmp_path, "failed to flush temp file", e))?;
    }
    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::file_ingestion_io(path, "failed to rename into place", e))?;
    Ok(())
}
