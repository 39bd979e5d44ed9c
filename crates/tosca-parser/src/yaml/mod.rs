//! Located YAML node tree.
//!
//! Every node produced here carries the file, line and column it was read
//! from so that later phases can report errors against the source.

mod loader;
mod node;

pub use loader::load_str;
pub use node::{Location, Node, NodeValue};
