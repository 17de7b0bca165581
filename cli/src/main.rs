use clap::Parser;
use replay_telemetry_cli::{config_from_args, list_aspects, list_stats, list_streams, Cli, Command};

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Run(args) => {
            env_logger::Builder::new().parse_filters(&args.log_level).init();
            config_from_args(args).and_then(|config| replay_telemetry::run_pipeline(&config).map_err(Into::into))
        }
        Command::ListAspects => list_aspects(),
        Command::ListStats => {
            list_stats();
            Ok(())
        }
        Command::ListStreams => list_streams(),
    };

    if let Err(err) = result {
        log::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
