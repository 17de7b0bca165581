//! The columnar bundle encoder: a directory of per-blob zstd files plus a
//! `schema.json` index (§4.6.2).

use serde_json::{json, Value as Json};

use super::column_encoder::{encode_column, ColumnEntryDescriptor};
use super::{atomic_write, zstd_compress, EncodeContext, OutputStrategy};
use crate::contract::Layout;
use crate::error::{Error, Result};
use crate::stream::StreamMap;

/// `schema_version` for this bundle's wire format (§6).
pub const SCHEMA_VERSION: &str = "6.0-columnar";

/// The columnar bundle directory strategy.
pub struct ColumnarBundleStrategy;

impl OutputStrategy for ColumnarBundleStrategy {
    fn strategy_name(&self) -> &'static str {
        "columnar-bundle"
    }

    fn execute_write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()> {
        let bundle_dir = ctx.output_dir.join(&ctx.replay_id);
        let mut stream_entries = serde_json::Map::new();

        for (name, stream) in streams {
            if stream.is_empty() || stream.metadata.table.layout != Layout::Columnar {
                continue;
            }

            let null_encoding = stream.metadata.table.null_encoding;
            let mut columns_json = Vec::new();
            for series in stream.table.get_columns() {
                let encoded = encode_column(series, series.name(), null_encoding)?;
                for (blob_key, bytes) in &encoded.blobs {
                    let file_name = format!("{name}__{blob_key}.bin.zst");
                    let compressed = zstd_compress(bytes)?;
                    atomic_write(&bundle_dir.join(&file_name), &compressed)?;
                }
                columns_json.push(column_entry_to_json(&encoded.descriptor, name));
            }

            stream_entries.insert(
                name.clone(),
                json!({
                    "layout": "columnar",
                    "num_rows": stream.table.height(),
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

fn column_entry_to_json(descriptor: &ColumnEntryDescriptor, stream_name: &str) -> Json {
    let file_for = |blob_key: &str| format!("{stream_name}__{blob_key}.bin.zst");
    match descriptor {
        ColumnEntryDescriptor::Primitive { name, dtype, data_key } => json!({
            "name": name, "dtype": dtype, "data_key": data_key, "file": file_for(data_key),
        }),
        ColumnEntryDescriptor::Utf8 { name, dtype, data_key, offsets_key } => json!({
            "name": name, "dtype": dtype,
            "data_key": data_key, "data_file": file_for(data_key),
            "offsets_key": offsets_key, "offsets_file": file_for(offsets_key),
        }),
        ColumnEntryDescriptor::ListOfPrimitive { name, dtype, data_key, offsets_key } => json!({
            "name": name, "dtype": dtype,
            "data_key": data_key, "data_file": file_for(data_key),
            "offsets_key": offsets_key, "offsets_file": file_for(offsets_key),
        }),
        ColumnEntryDescriptor::ListOfStruct { name, dtype, list_offsets_key, struct_fields } => json!({
            "name": name, "dtype": dtype,
            "list_offsets_key": list_offsets_key, "list_offsets_file": file_for(list_offsets_key),
            "struct_fields": struct_fields.iter().map(|f| column_entry_to_json(f, stream_name)).collect::<Vec<_>>(),
        }),
        ColumnEntryDescriptor::Opaque { name, dtype, mpk_key } => json!({
            "name": name, "dtype": dtype,
            "mpk_key": mpk_key, "file": file_for(mpk_key),
            "serialization_method": "opaque-packed-list",
        }),
    }
}
