//! Configuration for the `tosca` command line tool
//!
//! Settings come from environment variables; invalid values are reported
//! once logging is up and otherwise ignored.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Environment variable holding the tracing filter directive
pub const LOG_ENV: &str = "TOSCA_LOG";

/// Environment variable selecting the log format (`pretty` or `json`)
pub const LOG_FORMAT_ENV: &str = "TOSCA_LOG_FORMAT";

/// How log records are rendered on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Tracing filter directive, e.g. `warn` or `tosca_parser=debug`
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Settings that were present but could not be used
    pub rejected: Vec<String>,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
            rejected: Vec::new(),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(filter) = lookup(LOG_ENV) {
            if filter.trim().is_empty() {
                config.rejected.push(format!("Empty {} value", LOG_ENV));
            } else {
                config.log_filter = filter;
            }
        }

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            match format.parse::<LogFormat>() {
                Ok(format) => config.log_format = format,
                Err(err) => config
                    .rejected
                    .push(format!("Invalid {} value: {}", LOG_FORMAT_ENV, err)),
            }
        }

        config
    }

    /// Log every rejected setting; call once logging is initialized
    pub fn report_rejected(&self) {
        for rejected in &self.rejected {
            warn!("{}", rejected);
        }
    }
}
