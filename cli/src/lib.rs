//! The `run`/`list-aspects`/`list-stats`/`list-streams` command surface
//! for the replay telemetry pipeline (§6, "CLI surface").

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use replay_telemetry::schema::SchemaRegistry;
use replay_telemetry::stats::StatRegistry;
use replay_telemetry::{OutputFormat, PipelineConfig};

/// The top-level CLI, dispatching to one of the pipeline's subcommands.
#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Cli {
    /// The subcommand to run.
    #[clap(subcommand)]
    pub command: Command,
}

/// A subcommand of the `replay-telemetry` binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Runs the full pipeline for one replay.
    Run(RunArgs),
    /// Lists the aspect names the schema registry recognizes.
    ListAspects,
    /// Lists the derived-stat functions available to `--stat`.
    ListStats,
    /// Lists the pass-through stream names available to `--stream`.
    ListStreams,
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// The replay identity, used in output filenames and schema documents.
    pub replay_id: String,
    /// A directory to search for aspect blobs and side inputs. May be
    /// repeated; directories are searched in order, with later directories
    /// winning on a duplicate aspect name.
    #[clap(long = "input-dir", value_name = "DIR", required = true)]
    pub input_dirs: Vec<PathBuf>,
    /// The directory the intermediate decode cache would use.
    #[clap(long = "cache-dir", value_name = "DIR")]
    pub cache_dir: PathBuf,
    /// The directory output artifacts are written under.
    #[clap(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,
    /// The physical output layout: one of `hybrid`, `columnar`, `row-major`,
    /// `legacy`, `parquet`, `ndjson`.
    #[clap(long = "output-format", value_name = "FORMAT", default_value = "hybrid")]
    pub output_format: String,
    /// A derived-stat name to compute. May be repeated.
    #[clap(long = "stat", value_name = "NAME")]
    pub stats: Vec<String>,
    /// A pass-through aspect name to emit as a detailed stream, verbatim.
    /// May be repeated.
    #[clap(long = "stream", value_name = "NAME")]
    pub streams: Vec<String>,
    /// Disables parallel fan-out across aspects, forcing serial decoding.
    #[clap(long)]
    pub serial: bool,
    /// Skip malformed records with a warning instead of aborting the replay.
    #[clap(long = "skip-on-error")]
    pub skip_on_error: bool,
    /// The `env_logger` filter level, e.g. `info`, `debug`.
    #[clap(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
    /// Validate configuration and discover inputs, but write nothing.
    #[clap(long = "dry-run")]
    pub dry_run: bool,
    /// An explicit path to the unit-definitions CSV, overriding discovery.
    #[clap(long = "unit-defs", value_name = "PATH")]
    pub unit_defs: Option<PathBuf>,
}

/// Builds a [`PipelineConfig`] from parsed `run` arguments, stamping
/// `generated_at` at the single point the current time is actually sampled.
pub fn config_from_args(args: &RunArgs) -> anyhow::Result<PipelineConfig> {
    let output_format = OutputFormat::parse(&args.output_format)
        .ok_or_else(|| anyhow::anyhow!("unrecognized output format '{}'", args.output_format))?;

    Ok(PipelineConfig {
        replay_id: args.replay_id.clone(),
        input_dirs: args.input_dirs.clone(),
        cache_dir: args.cache_dir.clone(),
        output_dir: args.output_dir.clone(),
        output_format,
        stats: args.stats.clone(),
        streams: args.streams.clone(),
        serial: args.serial,
        skip_on_error: args.skip_on_error,
        dry_run: args.dry_run,
        unit_defs: args.unit_defs.clone(),
        generated_at: time::OffsetDateTime::now_utc(),
    })
}

/// Prints every aspect name the schema registry recognizes, one per line.
pub fn list_aspects() -> anyhow::Result<()> {
    let registry = SchemaRegistry::build()?;
    for aspect in registry.recognized_aspects() {
        println!("{aspect}");
    }
    Ok(())
}

/// Prints every registered derived-stat name, one per line.
pub fn list_stats() {
    for name in StatRegistry::build().names() {
        println!("{name}");
    }
}

/// Prints every aspect name eligible as a `--stream` pass-through, one per
/// line. Any recognized aspect may be passed through verbatim.
pub fn list_streams() -> anyhow::Result<()> {
    list_aspects()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_output_format() {
        let args = RunArgs {
            replay_id: "r1".to_string(),
            input_dirs: vec![PathBuf::from(".")],
            cache_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            output_format: "not-a-format".to_string(),
            stats: Vec::new(),
            streams: Vec::new(),
            serial: false,
            skip_on_error: false,
            log_level: "info".to_string(),
            dry_run: true,
            unit_defs: None,
        };
        assert!(config_from_args(&args).is_err());
    }
}
