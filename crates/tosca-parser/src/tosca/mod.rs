//! Schema tables of the TOSCA Simple Profile 1.3 grammar.

mod definitions;
mod service_template;
mod templates;

pub use definitions::*;
pub use service_template::{
    check_version, parse_service_template, IMPORT_DEFINITION, SERVICE_TEMPLATE, SUPPORTED_VERSION,
    TYPE_SECTIONS,
};
pub use templates::*;

use crate::schema::Section;

pub const DATA_TYPES: Section = &["data_types"];
pub const CAPABILITY_TYPES: Section = &["capability_types"];
pub const INTERFACE_TYPES: Section = &["interface_types"];
pub const RELATIONSHIP_TYPES: Section = &["relationship_types"];
pub const NODE_TYPES: Section = &["node_types"];
pub const GROUP_TYPES: Section = &["group_types"];
pub const POLICY_TYPES: Section = &["policy_types"];

pub const NODE_TEMPLATES: Section = &["topology_template", "node_templates"];
pub const GROUPS: Section = &["topology_template", "groups"];
