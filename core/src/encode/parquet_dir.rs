//! The Parquet directory encoder: a thin wrapper over
//! `polars::prelude::ParquetWriter`, as conventional as the teacher's own
//! CSV/JSON encoders are over their respective libraries (§4.7).

use std::fs::File;

use polars::prelude::*;

use super::{EncodeContext, OutputStrategy};
use crate::error::{Error, Result};
use crate::stream::StreamMap;

/// The Parquet-per-stream directory strategy.
pub struct ParquetDirStrategy;

impl OutputStrategy for ParquetDirStrategy {
    fn strategy_name(&self) -> &'static str {
        "parquet"
    }

    fn execute_write(&self, streams: &StreamMap, ctx: &EncodeContext) -> Result<()> {
        let bundle_dir = ctx.output_dir.join(&ctx.replay_id);
        std::fs::create_dir_all(&bundle_dir)
            .map_err(|e| Error::file_ingestion_io(&bundle_dir, "failed to create output directory", e))?;

        for (name, stream) in streams {
            if stream.is_empty() {
                continue;
            }
            let path = bundle_dir.join(format!("{name}.parquet"));
            let file = File::create(&path)
                .map_err(|e| Error::file_ingestion_io(&path, "failed to create parquet file", e))?;
            let mut table = stream.table.clone();
            ParquetWriter::new(file).finish(&mut table).map_err(|e| Error::OutputGeneration {
                strategy: self.strategy_name().to_string(),
                stream: Some(name.clone()),
                reason: format!("parquet write failed: {e}"),
            })?;
        }
        Ok(())
    }
}
