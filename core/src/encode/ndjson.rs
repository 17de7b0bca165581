//! The newline-delimited JSON encoder: one gzip-compressed NDJSON file per
//! non-empty transformed stream, written via Polars's NDJSON writer (§4.7).

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use polars::prelude::*;

use super::{atomic_write, EncodeContext, OutputStrategy};
use crate::error::{Error, Result};
use crate::stream::StreamMap;

/// The gzip-compressed NDJSON strategy.
pub struct NdjsonStrategy;

impl OutputStrategy for NdjsonStrategy {
    fn strategy_name(&self) -> &'static str {
        "ndjson"
    }

    fn execute_write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()> {
        for (name, stream) in streams {
            if stream.is_empty() {
                continue;
            }
            let mut buffer = Vec::new();
            let mut table = stream.table.clone();
            JsonWriter::new(&mut buffer)
                .with_json_format(JsonFormat::JsonLines)
                .finish(&mut table)
                .map_err(|e| Error::OutputGeneration {
                    strategy: self.strategy_name().to_string(),
                    stream: Some(name.clone()),
                    reason: format!("ndjson write failed: {e}"),
                })?;

            let mut gzip = GzEncoder::new(Vec::new(), Compression::default());
            gzip.write_all(&buffer).map_err(|e| Error::OutputGeneration {
                strategy: self.strategy_name().to_string(),
                stream: Some(name.clone()),
                reason: format!("gzip compression failed: {e}"),
            })?;
            let compressed = gzip.finish().map_err(|e| Error::OutputGeneration {
                strategy: self.strategy_name().to_string(),
                stream: Some(name.clone()),
                reason: format!("gzip finish failed: {e}"),
            })?;

            let path = ctx.output_dir.join(format!("{}_{name}.jsonl.gz", ctx.replay_id));
            atomic_write(&path, &compressed)?;
        }
        Ok(())
    }
}
