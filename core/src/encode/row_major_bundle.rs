//! The row-major bundle encoder: a directory with one compressed
//! `<stream>.rows.bin.zst` per row-major stream plus a `schema.json`
//! index (§4.6.3).

use serde_json::json;

use super::row_major::pack_rows;
use super::{atomic_write, zstd_compress, EncodeContext, OutputStrategy};
use crate::contract::Layout;
use crate::error::{Error, Result};
use crate::stream::StreamMap;

/// `schema_version` for this bundle's wire format (§6).
pub const SCHEMA_VERSION: &str = "7.0-row-major-mixed";

/// The row-major bundle directory strategy.
pub struct RowMajorBundleStrategy;

impl OutputStrategy for RowMajorBundleStrategy {
    fn strategy_name(&self) -> &'static str {
        "row-major-bundle"
    }

    fn execute_write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()> {
        let bundle_dir = ctx.output_dir.join(&ctx.replay_id);
        let mut stream_entries = serde_json::Map::new();

        for (name, stream) in streams {
            if stream.is_empty() || stream.metadata.table.layout != Layout::RowMajorMixed {
                continue;
            }

            let packed = pack_rows(&stream.table, &stream.metadata, &stream.metadata.table, name)?;
            let file_name = format!("{name}.rows.bin.zst");
            let compressed = zstd_compress(&packed.bytes)?;
            atomic_write(&bundle_dir.join(&file_name), &compressed)?;

            let columns_json: Vec<_> = packed
                .columns
                .iter()
                .map(|c| {
                    json!({
                        "name": c.name,
                        "dtype": c.dtype,
                        "original_dtype": c.original_dtype,
                        "transform": c.transform,
                        "null_encoding": c.null_encoding,
                    })
                })
                .collect();

            stream_entries.insert(
                name.clone(),
                json!({
                    "layout": "row-major-mixed",
                    "num_rows": stream.table.height(),
                    "row_byte_stride": packed.row_byte_stride,
                    "file": file_name,
                    "columns": columns_json,
                }),
            );
        }

        let schema_doc = json!({
            "replay_id": ctx.replay_id,
            "schema_version": SCHEMA_VERSION,
            "generated_at": ctx
                .generated_at
                .format(&time::format_description::well_known::Rfc3339)
                .map_err(|e| Error::OutputGeneration {
                    strategy: self.strategy_name().to_string(),
                    stream: None,
                    reason: format!("failed to format generated_at: {e}"),
                })?,
            "streams": stream_entries,
        });

        let bytes = serde_json::to_vec_pretty(&schema_doc).map_err(|e| Error::OutputGeneration {
            strategy: self.strategy_name().to_string(),
            stream: None,
            reason: format!("failed to serialize schema.json: {e}"),
        })?;
        atomic_write(&bundle_dir.join("schema.json"), &bytes)
    }
}
