//! Structured logging setup using tracing.
//!
//! Logs go to stderr so that stdout only carries command output.

use std::io;

use anyhow::Context;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CliConfig, LogFormat};

/// Initialize the global tracing subscriber
pub fn init_logging(config: &CliConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("Invalid log filter: {}", config.log_filter))?;

    let (json_layer, pretty_layer) = match config.log_format {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(io::stderr),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .context("Failed to set global default subscriber")?;

    debug!(
        log_filter = %config.log_filter,
        log_format = %config.log_format,
        "Logging initialized"
    );
    Ok(())
}
