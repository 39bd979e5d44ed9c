use super::definitions::{
    CAPABILITY_TYPE, DATA_TYPE, GROUP_TYPE, INTERFACE_TYPE, NODE_TYPE, POLICY_TYPE,
    RELATIONSHIP_TYPE,
};
use super::templates::TOPOLOGY_TEMPLATE;
use crate::error::ParserError;
use crate::schema::{Descriptor, Entity, Schema};
use crate::yaml::Node;

pub const SUPPORTED_VERSION: &str = "tosca_simple_yaml_1_3";

/// Sections that imported documents contribute to the importing one
pub const TYPE_SECTIONS: &[&str] = &[
    "data_types",
    "capability_types",
    "interface_types",
    "relationship_types",
    "node_types",
    "group_types",
    "policy_types",
];

pub static IMPORT_DEFINITION: Schema = Schema {
    name: "import definition",
    attrs: &[
        ("file", Descriptor::String),
        ("repository", Descriptor::String),
        ("namespace_prefix", Descriptor::String),
        ("namespace_uri", Descriptor::String),
    ],
    required: &["file"],
    short_form: Some("file"),
};

pub static SERVICE_TEMPLATE: Schema = Schema {
    name: "service template",
    attrs: &[
        ("tosca_definitions_version", Descriptor::String),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("imports", Descriptor::List(&Descriptor::Entity(&IMPORT_DEFINITION))),
        ("repositories", Descriptor::Map(&Descriptor::Void)),
        ("dsl_definitions", Descriptor::Void),
        ("artifact_types", Descriptor::Map(&Descriptor::Void)),
        ("data_types", Descriptor::Map(&Descriptor::Entity(&DATA_TYPE))),
        ("capability_types", Descriptor::Map(&Descriptor::Entity(&CAPABILITY_TYPE))),
        ("interface_types", Descriptor::Map(&Descriptor::Entity(&INTERFACE_TYPE))),
        ("relationship_types", Descriptor::Map(&Descriptor::Entity(&RELATIONSHIP_TYPE))),
        ("node_types", Descriptor::Map(&Descriptor::Entity(&NODE_TYPE))),
        ("group_types", Descriptor::Map(&Descriptor::Entity(&GROUP_TYPE))),
        ("policy_types", Descriptor::Map(&Descriptor::Entity(&POLICY_TYPE))),
        ("topology_template", Descriptor::Entity(&TOPOLOGY_TEMPLATE)),
    ],
    required: &["tosca_definitions_version"],
    short_form: None,
};

/// Reject documents written for another TOSCA version before the schema is
/// applied.
pub fn check_version(document: &Node) -> Result<(), ParserError> {
    let Some(entries) = document.as_map() else {
        return Ok(());
    };
    match entries.get("tosca_definitions_version") {
        Some(version) => match version.scalar_text() {
            Some(text) if text == SUPPORTED_VERSION => Ok(()),
            text => Err(ParserError::UnsupportedVersion {
                version: text.unwrap_or_else(|| version.kind().to_string()),
                loc: version.loc().clone(),
            }),
        },
        None => Ok(()),
    }
}

/// Apply the service template schema to a loaded document
pub fn parse_service_template(document: &Node) -> Result<Entity, ParserError> {
    check_version(document)?;
    Ok(Entity::parse(&SERVICE_TEMPLATE, document)?)
}
