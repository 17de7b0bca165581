//! The per-replay pipeline driver: validate, ingest, decode, transform,
//! materialize, aggregate, contract, encode (§4.8).

use std::collections::HashMap;
use std::path::PathBuf;

use log::{info, warn};
use polars::prelude::*;
use time::OffsetDateTime;

use crate::contract::{apply_contract, ContractRegistry};
use crate::decode::decode_aspect;
use crate::encode::{columnar_bundle, hybrid, legacy, ndjson, parquet_dir, row_major_bundle, EncodeContext, OutputStrategy};
use crate::error::{Error, Result};
use crate::ingestion::discover_inputs;
use crate::materialize::materialize_aspect;
use crate::schema::SchemaRegistry;
use crate::stats::{to_lookup_map, StatRegistry};
use crate::stream::{StreamMap, TransformedStream};
use crate::transform::transform_aspect;

/// The reserved table name under which the unit-definitions side table, if
/// discovered, is merged into the table dictionary (§4.8 step 4).
pub const UNIT_DEFS_TABLE: &str = "unit_defs";

/// The physical output layout to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `<replay_id>.mpk.zst`, schema version `8.2-hybrid-mpk`.
    Hybrid,
    /// `<replay_id>/` directory of per-blob columnar files.
    Columnar,
    /// `<replay_id>/` directory of per-stream packed rows.
    RowMajor,
    /// `<replay_id>_master.mpk.gz`.
    Legacy,
    /// `<replay_id>/<stream>.parquet`.
    Parquet,
    /// `<replay_id>_<stream>.jsonl.gz`.
    Ndjson,
}

impl OutputFormat {
    /// Parses the CLI's `--output-format` value.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hybrid" => Some(Self::Hybrid),
            "columnar" => Some(Self::Columnar),
            "row-major" => Some(Self::RowMajor),
            "legacy" => Some(Self::Legacy),
            "parquet" => Some(Self::Parquet),
            "ndjson" => Some(Self::Ndjson),
            _ => None,
        }
    }

    fn strategy(self) -> Box<dyn OutputStrategy> {
        match self {
            Self::Hybrid => Box::new(hybrid::HybridBundleStrategy),
            Self::Columnar => Box::new(columnar_bundle::ColumnarBundleStrategy),
            Self::RowMajor => Box::new(row_major_bundle::RowMajorBundleStrategy),
            Self::Legacy => Box::new(legacy::LegacyEnvelopeStrategy),
            Self::Parquet => Box::new(parquet_dir::ParquetDirStrategy),
            Self::Ndjson => Box::new(ndjson::NdjsonStrategy),
        }
    }
}

/// One run's configuration, mirroring the `run` subcommand's flags (§6).
pub struct PipelineConfig {
    /// The replay identity, used in output filenames and schema documents.
    pub replay_id: String,
    /// Directories searched for aspect blobs and side inputs, in order.
    pub input_dirs: Vec<PathBuf>,
    /// Where intermediate cache entries would be read/written (unused by
    /// the shipped no-op cache, kept for interface completeness).
    pub cache_dir: PathBuf,
    /// Where output artifacts are written.
    pub output_dir: PathBuf,
    /// The physical output layout to emit.
    pub output_format: OutputFormat,
    /// Derived-stat names to compute, e.g. `army_value_timeline`.
    pub stats: Vec<String>,
    /// Pass-through aspect names to emit as detailed streams, verbatim.
    pub streams: Vec<String>,
    /// Disables parallel fan-out across aspects (§5); forces step 3 serial.
    pub serial: bool,
    /// Skip malformed records with a warning instead of aborting (§4.2).
    pub skip_on_error: bool,
    /// Validate configuration and discover inputs, but write nothing.
    pub dry_run: bool,
    /// An explicit path to the unit-definitions CSV, overriding discovery.
    pub unit_defs: Option<PathBuf>,
    /// The timestamp recorded in schema documents. Threaded in rather than
    /// sampled internally so a run's output is reproducible given the same
    /// inputs and clock reading.
    pub generated_at: OffsetDateTime,
}

/// Runs the full per-replay pipeline against `config`. On success, the
/// requested output artifacts have been written under `config.output_dir`
/// (unless `config.dry_run` is set).
pub fn run_pipeline(config: &PipelineConfig) -> Result<()> {
    // Step 1: validate schema/contract consistency.
    let registry = SchemaRegistry::build()?;

    // Step 2: discover and read raw aspect blobs plus optional side inputs.
    let inputs = discover_inputs(&config.input_dirs)?;
    let unit_defs_path = config.unit_defs.clone().or_else(|| inputs.unit_defs_path.clone());

    if config.dry_run {
        info!(
            "dry run: {} aspect file(s), unit_defs={:?}, game_meta={:?}",
            inputs.aspect_files.len(),
            unit_defs_path,
            inputs.game_meta_path
        );
        return Ok(());
    }

    // Step 3: decode -> transform -> materialize, per aspect.
    let mut tables: HashMap<String, DataFrame> = if config.serial {
        run_aspects_serial(&registry, &inputs.aspect_files, config.skip_on_error)?
    } else {
        run_aspects_parallel(&registry, &inputs.aspect_files, config.skip_on_error)?
    };

    // Step 4: merge in context tables under reserved names.
    let mut static_assets: HashMap<String, Vec<u8>> = HashMap::new();
    if let Some(meta_path) = &inputs.game_meta_path {
        let bytes = std::fs::read(meta_path)
            .map_err(|e| Error::file_ingestion_io(meta_path, "failed to read game_meta.json", e))?;
        static_assets.insert("game_meta".to_string(), bytes);
    }
    if let Some(defs_path) = &unit_defs_path {
        let defs_table = read_unit_defs(defs_path)?;
        if defs_table.column("name").is_ok() {
            let lookup = to_lookup_map(&defs_table, "id", &["name", "translatedHumanName"])
                .or_else(|_| to_lookup_map(&defs_table, "id", &["name"]))?;
            let mut bytes = Vec::new();
            rmpv::encode::write_value(&mut bytes, &lookup).map_err(|e| Error::OutputGeneration {
                strategy: "hybrid".to_string(),
                stream: None,
                reason: format!("failed to pack defs_map: {e}"),
            })?;
            static_assets.insert("defs_map".to_string(), bytes);
        }
        tables.insert(UNIT_DEFS_TABLE.to_string(), defs_table);
    }

    // Step 5: invoke the requested derived-stat and pass-through streams.
    let stat_registry = StatRegistry::build();
    let mut named_tables: HashMap<String, DataFrame> = HashMap::new();
    for stat_name in &config.stats {
        match stat_registry.invoke(stat_name, &tables) {
            Ok(table) => {
                named_tables.insert(stat_name.clone(), table);
            }
            Err(err) => warn!("{err}"),
        }
    }
    for stream_name in &config.streams {
        match tables.get(stream_name) {
            Some(table) => {
                named_tables.insert(stream_name.clone(), table.clone());
            }
            None => warn!("requested pass-through stream '{stream_name}' has no table; skipping"),
        }
    }

    // Step 6: run the Output Contract Engine per output stream, keyed by the
    // stream's own named contract. Iteration follows the configured
    // `stats` then `streams` order (not HashMap order) so that the
    // resulting stream_map, and everything the encoders derive from it, is
    // deterministic across runs over identical inputs.
    let contract_registry = ContractRegistry::build();
    let mut stream_map: StreamMap = StreamMap::new();
    for name in config.stats.iter().chain(config.streams.iter()) {
        let Some(table) = named_tables.remove(name) else {
            continue;
        };
        let contract = contract_registry.contract_for(name);
        let (contracted, metadata) = apply_contract(&table, &contract)?;
        stream_map.insert(
            name.clone(),
            TransformedStream {
                name: name.clone(),
                table: contracted,
                metadata,
            },
        );
    }

    // Step 7: invoke the selected output encoder.
    let ctx = EncodeContext {
        replay_id: config.replay_id.clone(),
        output_dir: config.output_dir.clone(),
        generated_at: config.generated_at,
        static_assets,
    };
    config.output_format.strategy().write(&stream_map, &ctx)
}

fn run_aspects_serial(
    registry: &SchemaRegistry,
    aspect_files: &HashMap<String, PathBuf>,
    skip_on_error: bool,
) -> Result<HashMap<String, DataFrame>> {
    let mut tables = HashMap::with_capacity(aspect_files.len());
    for (aspect, path) in aspect_files {
        let table = process_one_aspect(registry, aspect, path, skip_on_error)?;
        tables.insert(aspect.clone(), table);
    }
    Ok(tables)
}

/// Runs each aspect's decode/transform/materialize chain on its own worker
/// thread, borrowing `registry` rather than cloning it: the registry is
/// read-only after [`SchemaRegistry::build`], and every aspect is
/// independent, so there is no shared mutable state to synchronize.
fn run_aspects_parallel(
    registry: &SchemaRegistry,
    aspect_files: &HashMap<String, PathBuf>,
    skip_on_error: bool,
) -> Result<HashMap<String, DataFrame>> {
    let mut tables = HashMap::with_capacity(aspect_files.len());
    std::thread::scope(|scope| {
        let handles: Vec<_> = aspect_files
            .iter()
            .map(|(aspect, path)| {
                scope.spawn(move || {
                    let table = process_one_aspect(registry, aspect, path, skip_on_error);
                    (aspect.clone(), table)
                })
            })
            .collect();

        for handle in handles {
            let (aspect, result) = handle.join().expect("aspect worker thread panicked");
            tables.insert(aspect, result?);
        }
        Ok(tables)
    })
}

fn process_one_aspect(
    registry: &SchemaRegistry,
    aspect: &str,
    path: &PathBuf,
    skip_on_error: bool,
) -> Result<DataFrame> {
    let bytes = std::fs::read(path).map_err(|e| Error::file_ingestion_io(path, "failed to read aspect blob", e))?;
    let raw_records = decode_aspect(registry, aspect, &bytes, skip_on_error)?;
    let clean_records = transform_aspect(registry, &raw_records)?;
    let Some(clean_schema) = registry.clean_schema_for(aspect) else {
        return DataFrame::new(Vec::new()).map_err(|e| Error::Transformation {
            aspect: aspect.to_string(),
            row_index: None,
            reason: format!("failed to build empty table for unrecognized aspect: {e}"),
        });
    };
    materialize_aspect(clean_schema, &clean_records)
}

fn read_unit_defs(path: &PathBuf) -> Result<DataFrame> {
    CsvReader::from_path(path)
        .map_err(|e| Error::file_ingestion_io(path, "failed to open defs.csv", e))?
        .has_header(true)
        .finish()
        .map_err(|e| Error::file_ingestion(path, format!("failed to parse defs.csv: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_known_names() {
        assert_eq!(OutputFormat::parse("hybrid"), Some(OutputFormat::Hybrid));
        assert_eq!(OutputFormat::parse("row-major"), Some(OutputFormat::RowMajor));
        assert_eq!(OutputFormat::parse("unknown"), None);
    }

    #[test]
    fn dry_run_does_not_require_output_dir_to_exist() {
        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        std::fs::remove_dir(output_dir.path()).unwrap();

        let config = PipelineConfig {
            replay_id: "r1".to_string(),
            input_dirs: vec![input_dir.path().to_path_buf()],
            cache_dir: PathBuf::from("/tmp/cache"),
            output_dir: output_dir.path().to_path_buf(),
            output_format: OutputFormat::Hybrid,
            stats: Vec::new(),
            streams: Vec::new(),
            serial: true,
            skip_on_error: false,
            dry_run: true,
            unit_defs: None,
            generated_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(run_pipeline(&config).is_ok());
    }
}
