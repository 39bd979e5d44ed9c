use std::io;
use std::process::ExitCode;

use clap::Parser;

use tosca_cli::{logging, run_parse, Cli, CliConfig, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = CliConfig::load();
    if let Err(err) = logging::init_logging(&config) {
        eprintln!("Failed to initialize logging: {:#}", err);
    }
    config.report_rejected();

    let result = match &cli.command {
        Commands::Parse(args) => run_parse(args, &mut io::stdout()),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
