//! The hybrid encoder: one self-contained `<replay_id>.mpk.zst` file
//! carrying both the schema descriptor and every stream's blobs (§4.6.1).

use indexmap::IndexMap;
use rmpv::Value;

use super::column_encoder::{encode_column, ColumnEntryDescriptor};
use super::row_major::pack_rows;
use super::{atomic_write, zstd_compress, EncodeContext, OutputStrategy};
use crate::contract::Layout;
use crate::error::{Error, Result};
use crate::stream::StreamMap;

/// `schema_version` for this bundle's wire format (§6).
pub const SCHEMA_VERSION: &str = "8.2-hybrid-mpk";

/// The hybrid single-file bundle strategy.
pub struct HybridBundleStrategy;

impl OutputStrategy for HybridBundleStrategy {
    fn strategy_name(&self) -> &'static str {
        "hybrid"
    }

    fn execute_write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()> {
        let mut stream_descriptors: IndexMap<String, Value> = IndexMap::new();
        let mut data: IndexMap<String, Value> = IndexMap::new();

        for (name, stream) in streams {
            if stream.is_empty() {
                continue;
            }
            let (descriptor, blobs) = match stream.metadata.table.layout {
                Layout::RowMajorMixed => encode_row_major_stream(stream, name)?,
                Layout::Columnar => encode_columnar_stream(stream, name)?,
            };
            stream_descriptors.insert(name.clone(), descriptor);
            data.insert(
                name.clone(),
                Value::Map(
                    blobs
                        .into_iter()
                        .map(|(key, bytes)| (Value::from(key), Value::Binary(bytes)))
                        .collect(),
                ),
            );
        }

        let mut static_asset_names = Vec::new();
        for (asset_name, bytes) in &ctx.static_assets {
            static_asset_names.push(asset_name.clone());
            data.insert(
                asset_name.clone(),
                Value::Map(vec![(Value::from("default"), Value::Binary(bytes.clone()))]),
            );
        }
        static_asset_names.sort();

        let schema = Value::Map(vec![
            (Value::from("replay_id"), Value::from(ctx.replay_id.clone())),
            (Value::from("schema_version"), Value::from(SCHEMA_VERSION)),
            (
                Value::from("generated_at"),
                Value::from(
                    ctx.generated_at
                        .format(&time::format_description::well_known::Rfc3339)
                        .map_err(|e| Error::OutputGeneration {
                            strategy: self.strategy_name().to_string(),
                            stream: None,
                            reason: format!("failed to format generated_at: {e}"),
                        })?,
                ),
            ),
            (
                Value::from("static_assets"),
                Value::Array(static_asset_names.into_iter().map(Value::from).collect()),
            ),
            (
                Value::from("streams"),
                Value::Map(
                    stream_descriptors
                        .into_iter()
                        .map(|(k, v)| (Value::from(k), v))
                        .collect(),
                ),
            ),
        ]);

        let master_object = Value::Map(vec![
            (Value::from("schema"), schema),
            (
                Value::from("data"),
                Value::Map(data.into_iter().map(|(k, v)| (Value::from(k), v)).collect()),
            ),
        ]);

        let mut encoded = Vec::new();
        rmpv::encode::write_value(&mut encoded, &master_object).map_err(|e| Error::OutputGeneration {
            strategy: self.strategy_name().to_string(),
            stream: None,
            reason: format!("failed to msgpack-encode master object: {e}"),
        })?;

        let compressed = zstd_compress(&encoded)?;
        let path = ctx.output_dir.join(format!("{}.mpk.zst", ctx.replay_id));
        atomic_write(&path, &compressed)
    }
}

fn encode_row_major_stream(stream: &crate::stream::TransformedStream, name: &str) -> Result<(Value, Vec<(String, Vec<u8>)>)> {
    let packed = pack_rows(&stream.table, &stream.metadata, &stream.metadata.table, name)?;
    let columns: Vec<Value> = packed
        .columns
        .iter()
        .map(|c| {
            let mut fields = vec![
                (Value::from("name"), Value::from(c.name.clone())),
                (Value::from("dtype"), Value::from(c.dtype.clone())),
                (Value::from("original_dtype"), Value::from(c.original_dtype.clone())),
                (Value::from("transform"), Value::from(c.transform.clone())),
            ];
            if let Some(sentinel) = c.null_encoding {
                fields.push((Value::from("null_encoding"), Value::from(sentinel)));
            }
            Value::Map(fields)
        })
        .collect();

    let data_key = format!("{name}_rows");
    let descriptor = Value::Map(vec![
        (Value::from("layout"), Value::from("row-major-mixed")),
        (Value::from("num_rows"), Value::from(stream.table.height() as u64)),
        (Value::from("row_byte_stride"), Value::from(packed.row_byte_stride as u64)),
        (Value::from("data_key"), Value::from(data_key.clone())),
        (Value::from("columns"), Value::Array(columns)),
    ]);

    Ok((descriptor, vec![(data_key, packed.bytes)]))
}

fn encode_columnar_stream(stream: &crate::stream::TransformedStream, name: &str) -> Result<(Value, Vec<(String, Vec<u8>)>)> {
    let null_encoding = stream.metadata.table.null_encoding;
    let mut columns = Vec::new();
    let mut blobs = Vec::new();
    let mut byte_size = 0usize;

    for series in stream.table.get_columns() {
        let encoded = encode_column(series, series.name(), null_encoding)?;
        columns.push(column_entry_to_value(&encoded.descriptor));
        for (key, bytes) in encoded.blobs {
            byte_size += bytes.len();
            blobs.push((key, bytes));
        }
    }

    let descriptor = Value::Map(vec![
        (Value::from("layout"), Value::from("columnar")),
        (Value::from("byte_size"), Value::from(byte_size as u64)),
        (Value::from("num_rows"), Value::from(stream.table.height() as u64)),
        (Value::from("columns"), Value::Array(columns)),
    ]);

    Ok((descriptor, blobs))
}

/// Renders a [`ColumnEntryDescriptor`] as the `column_entry` msgpack value
/// shape described in §3.
pub fn column_entry_to_value(descriptor: &ColumnEntryDescriptor) -> Value {
    match descriptor {
        ColumnEntryDescriptor::Primitive { name, dtype, data_key } => Value::Map(vec![
            (Value::from("name"), Value::from(name.clone())),
            (Value::from("dtype"), Value::from(dtype.clone())),
            (Value::from("data_key"), Value::from(data_key.clone())),
        ]),
        ColumnEntryDescriptor::Utf8 { name, dtype, data_key, offsets_key } => Value::Map(vec![
            (Value::from("name"), Value::from(name.clone())),
            (Value::from("dtype"), Value::from(dtype.clone())),
            (Value::from("data_key"), Value::from(data_key.clone())),
            (Value::from("offsets_key"), Value::from(offsets_key.clone())),
        ]),
        ColumnEntryDescriptor::ListOfPrimitive { name, dtype, data_key, offsets_key } => Value::Map(vec![
            (Value::from("name"), Value::from(name.clone())),
            (Value::from("dtype"), Value::from(dtype.clone())),
            (Value::from("data_key"), Value::from(data_key.clone())),
            (Value::from("offsets_key"), Value::from(offsets_key.clone())),
        ]),
        ColumnEntryDescriptor::ListOfStruct { name, dtype, list_offsets_key, struct_fields } => Value::Map(vec![
            (Value::from("name"), Value::from(name.clone())),
            (Value::from("dtype"), Value::from(dtype.clone())),
            (Value::from("list_offsets_key"), Value::from(list_offsets_key.clone())),
            (
                Value::from("struct_fields"),
                Value::Array(struct_fields.iter().map(column_entry_to_value).collect()),
            ),
        ]),
        ColumnEntryDescriptor::Opaque { name, dtype, mpk_key } => Value::Map(vec![
            (Value::from("name"), Value::from(name.clone())),
            (Value::from("dtype"), Value::from(dtype.clone())),
            (Value::from("mpk_key"), Value::from(mpk_key.clone())),
            (Value::from("serialization_method"), Value::from("opaque-packed-list")),
        ]),
    }
}
