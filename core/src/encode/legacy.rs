//! The legacy single-file envelope encoder: superseded by the hybrid
//! encoder but retained for producers that still target it (§4.7).

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use rmpv::Value;

use super::column_encoder::any_value_to_msgpack;
use super::{atomic_write, EncodeContext, OutputStrategy};
use crate::error::{Error, Result};
use crate::stream::StreamMap;

/// `schema_version` for this envelope's wire format (§4.7).
pub const SCHEMA_VERSION: &str = "3.1";

/// The legacy single-file envelope strategy.
pub struct LegacyEnvelopeStrategy;

impl OutputStrategy for LegacyEnvelopeStrategy {
    fn strategy_name(&self) -> &'static str {
        "legacy-envelope"
    }

    fn execute_write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()> {
        let mut stream_rows = Vec::new();
        for (name, stream) in streams {
            if stream.is_empty() {
                continue;
            }
            stream_rows.push((Value::from(name.clone()), table_to_row_list(&stream.table)?));
        }

        let document = Value::Map(vec![
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
            (Value::from("streams"), Value::Map(stream_rows)),
        ]);

        let mut encoded = Vec::new();
        rmpv::encode::write_value(&mut encoded, &document).map_err(|e| Error::OutputGeneration {
            strategy: self.strategy_name().to_string(),
            stream: None,
            reason: format!("failed to msgpack-encode legacy envelope: {e}"),
        })?;

        let mut gzip = GzEncoder::new(Vec::new(), Compression::default());
        gzip.write_all(&encoded).map_err(|e| Error::OutputGeneration {
            strategy: self.strategy_name().to_string(),
            stream: None,
            reason: format!("gzip compression failed: {e}"),
        })?;
        let compressed = gzip.finish().map_err(|e| Error::OutputGeneration {
            strategy: self.strategy_name().to_string(),
            stream: None,
            reason: format!("gzip finish failed: {e}"),
        })?;

        let path = ctx.output_dir.join(format!("{}_master.mpk.gz", ctx.replay_id));
        atomic_write(&path, &compressed)
    }
}

fn table_to_row_list(table: &polars::prelude::DataFrame) -> Result<Value> {
    let mut rows = Vec::with_capacity(table.height());
    for row_index in 0..table.height() {
        let mut fields = Vec::with_capacity(table.width());
        for series in table.get_columns() {
            let value = series.get(row_index).map_err(|e| Error::OutputGeneration {
                strategy: "legacy-envelope".to_string(),
                stream: None,
                reason: format!("failed to read row {row_index}: {e}"),
            })?;
            fields.push((Value::from(series.name()), any_value_to_msgpack(value)));
        }
        rows.push(Value::Map(fields));
    }
    Ok(Value::Array(rows))
}
