use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::{debug, info};

use tosca_parser::{ParserError, Topology};

#[derive(ClapParser)]
#[command(name = "tosca")]
#[command(about = "TOSCA Simple Profile 1.3 service template parser")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a TOSCA service template or an unpacked CSAR directory
    Parse(ParseArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ParseArgs {
    /// YAML or JSON file with topology template inputs
    #[arg(short, long, value_name = "FILE")]
    pub inputs: Option<PathBuf>,

    /// Print the resulting topology in this format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Service template file or CSAR directory
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Read topology inputs from a YAML (or JSON) file.
///
/// An empty file means no inputs; anything other than a mapping is rejected.
pub fn load_inputs(path: &Path) -> Result<IndexMap<String, Json>, ParserError> {
    let text = fs::read_to_string(path).map_err(|source| ParserError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value: serde_yaml::Value = serde_yaml::from_str(&text)?;
    match value {
        serde_yaml::Value::Null => Ok(IndexMap::new()),
        serde_yaml::Value::Mapping(_) => {
            let json = serde_json::to_value(&value)
                .map_err(|err| ParserError::InvalidInputs(err.to_string()))?;
            match json {
                Json::Object(map) => Ok(map.into_iter().collect()),
                _ => Err(ParserError::InvalidInputs(
                    "expected a mapping of input names to values".to_string(),
                )),
            }
        }
        _ => Err(ParserError::InvalidInputs(
            "expected a mapping of input names to values".to_string(),
        )),
    }
}

fn render(topology: &Topology, format: OutputFormat) -> anyhow::Result<String> {
    let text = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(topology).context("Failed to render topology as JSON")?
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(topology).context("Failed to render topology as YAML")?
        }
    };
    Ok(text)
}

/// Run the `parse` command, returning the process exit code.
///
/// Progress, the rendered topology and parser failures all go to `out`.
/// Only failures to write output are returned as errors.
pub fn run_parse(args: &ParseArgs, out: &mut dyn Write) -> anyhow::Result<u8> {
    writeln!(out, "Parsing TOSCA CSAR or service template...")?;

    let inputs = match &args.inputs {
        Some(path) => match load_inputs(path) {
            Ok(inputs) => inputs,
            Err(error) => {
                writeln!(out, "{}", error)?;
                return Ok(1);
            }
        },
        None => IndexMap::new(),
    };
    debug!(path = %args.path.display(), inputs = inputs.len(), "Running parse");

    let topology = match tosca_parser::parse(&args.path, &inputs) {
        Ok(topology) => topology,
        Err(error) => {
            debug!(code = error.error_code(), "Parse failed");
            writeln!(out, "{}", error)?;
            return Ok(1);
        }
    };
    info!(
        nodes = topology.nodes.len(),
        policies = topology.policies.len(),
        "Topology built"
    );

    if let Some(format) = args.output {
        writeln!(out, "{}", render(&topology, format)?)?;
    }
    writeln!(out, "Done.")?;
    Ok(0)
}
