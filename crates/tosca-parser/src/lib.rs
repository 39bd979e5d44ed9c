//! # TOSCA Parser
//!
//! Parses TOSCA Simple Profile 1.3 service templates (YAML) into a validated,
//! cross-referenced [`Topology`]: node instances with their capabilities,
//! requirements and interface operations, groups, and policies with resolved
//! targets and triggers.
//!
//! ## Features
//!
//! * Located YAML tree: every error points at `file:line:column`
//! * Static schema tables drive normalization, validation and parsing of
//!   every construct
//! * Deferred references, resolved only while the topology is built
//! * `concat`, `get_property` and `get_input` evaluation
//! * Imports and unpacked CSAR directories
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use indexmap::IndexMap;
//!
//! let topology = tosca_parser::parse(Path::new("service.yaml"), &IndexMap::new())?;
//! for (name, node) in &topology.nodes {
//!     println!("{} is a {:?}", name, node.type_name());
//! }
//! # Ok::<(), tosca_parser::ParserError>(())
//! ```

mod collector;
mod csar;
mod error;
mod reference;
mod service;
mod value;

pub mod schema;
pub mod template;
pub mod tosca;
pub mod yaml;

use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::debug;

pub use csar::{DirectoryArchive, Source};
pub use error::{ParseError, ParseResult, ParserError};
pub use reference::{Reference, Target};
pub use service::{load, ServiceAst};
pub use template::Topology;
pub use value::{EvalContext, Function, Value};

/// Parse a service template file or an unpacked CSAR directory into a
/// topology, using `inputs` for the topology template's input parameters.
///
/// # Errors
///
/// Returns a [`ParserError`]; located failures are
/// [`ParserError::Parse`] and render as `file:line:column: message`.
pub fn parse(path: &Path, inputs: &IndexMap<String, Json>) -> Result<Topology, ParserError> {
    let source = Source::locate(path)?;
    debug!(
        workdir = %source.workdir.display(),
        entrypoint = %source.entrypoint.display(),
        "Parsing service template"
    );
    let ast = load(&source.workdir, &source.entrypoint)?;
    ast.get_template(inputs)
}

/// Parse a single in-memory service template; imports are not followed.
pub fn parse_str(
    text: &str,
    file: &str,
    inputs: &IndexMap<String, Json>,
) -> Result<Topology, ParserError> {
    let node = yaml::load_str(text, file)?;
    let root = tosca::parse_service_template(&node)?;
    if !root.list("imports").is_empty() {
        return Err(ParseError::new(
            "Imports need a file system location; use parse() instead.",
            root.loc(),
        )
        .into());
    }
    Ok(template::build_topology(&root, inputs)?)
}
