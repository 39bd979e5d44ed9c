use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::yaml::Location;

/// A failure tied to a place in a source document.
///
/// Raised while normalizing, validating or parsing document nodes and while
/// resolving references or building templates from the parsed AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Where the offending node lives
    pub loc: Location,

    /// Human-readable error message
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, loc: &Location) -> Self {
        ParseError {
            loc: loc.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Shorthand for results that fail with a located error
pub type ParseResult<T> = Result<T, ParseError>;

/// All possible errors that can occur while turning a service template into a topology
#[derive(Error, Debug)]
pub enum ParserError {
    /// A located parse, validation or build error
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Errors that occur while reading documents from disk
    #[error("Cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Errors that occur while parsing auxiliary YAML (metadata, inputs)
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Inputs that are not a mapping of names to values
    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    /// Archive layout problems (missing or ambiguous entrypoint, packaged archives)
    #[error("Invalid archive: {0}")]
    Archive(String),

    /// Unsupported TOSCA definitions version
    #[error("Unsupported TOSCA definitions version: {version}")]
    UnsupportedVersion { version: String, loc: Location },
}

impl ParserError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ParserError::Parse(_) => "ERR_TOSCA_PARSE",
            ParserError::Io { .. } => "ERR_TOSCA_IO",
            ParserError::Yaml(_) => "ERR_TOSCA_YAML",
            ParserError::InvalidInputs(_) => "ERR_TOSCA_INVALID_INPUTS",
            ParserError::Archive(_) => "ERR_TOSCA_ARCHIVE",
            ParserError::UnsupportedVersion { .. } => "ERR_TOSCA_UNSUPPORTED_VERSION",
        }
    }

    /// Source location of the failure, when there is one
    pub fn location(&self) -> Option<&Location> {
        match self {
            ParserError::Parse(err) => Some(&err.loc),
            ParserError::UnsupportedVersion { loc, .. } => Some(loc),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ParserError::Io {
            path: path.into(),
            source,
        }
    }
}
