//! Command line front end for `tosca-parser`.

pub mod commands;
pub mod config;
pub mod logging;

pub use commands::{load_inputs, run_parse, Cli, Commands, OutputFormat, ParseArgs};
pub use config::{CliConfig, LogFormat};
