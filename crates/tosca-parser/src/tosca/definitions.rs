//! Type-level constructs: the `*_types` sections and the definitions they
//! declare.
//!
//! Data type names (`type` of a property, `derived_from` of a data type) are
//! kept as plain strings; no value is ever checked against them.

use super::{
    CAPABILITY_TYPES, GROUP_TYPES, INTERFACE_TYPES, NODE_TEMPLATES, NODE_TYPES, POLICY_TYPES,
    RELATIONSHIP_TYPES,
};
use crate::schema::{Descriptor, Schema};

pub static SCHEMA_DEFINITION: Schema = Schema {
    name: "schema definition",
    attrs: &[
        ("type", Descriptor::String),
        ("description", Descriptor::String),
        ("constraints", Descriptor::List(&Descriptor::Void)),
        ("key_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
        ("entry_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
    ],
    required: &["type"],
    short_form: Some("type"),
};

pub static PROPERTY_DEFINITION: Schema = Schema {
    name: "property definition",
    attrs: &[
        ("type", Descriptor::String),
        ("description", Descriptor::String),
        ("required", Descriptor::Boolean),
        ("default", Descriptor::Void),
        ("status", Descriptor::String),
        ("constraints", Descriptor::List(&Descriptor::Void)),
        ("key_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
        ("entry_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
        ("metadata", Descriptor::Map(&Descriptor::String)),
    ],
    required: &["type"],
    short_form: None,
};

pub static ATTRIBUTE_DEFINITION: Schema = Schema {
    name: "attribute definition",
    attrs: &[
        ("type", Descriptor::String),
        ("description", Descriptor::String),
        ("default", Descriptor::Void),
        ("status", Descriptor::String),
        ("key_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
        ("entry_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
    ],
    required: &["type"],
    short_form: None,
};

/// Topology inputs and outputs
pub static PARAMETER_DEFINITION: Schema = Schema {
    name: "parameter definition",
    attrs: &[
        ("type", Descriptor::String),
        ("description", Descriptor::String),
        ("value", Descriptor::Void),
        ("required", Descriptor::Boolean),
        ("default", Descriptor::Void),
        ("status", Descriptor::String),
        ("constraints", Descriptor::List(&Descriptor::Void)),
        ("key_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
        ("entry_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
    ],
    required: &[],
    short_form: None,
};

pub static DATA_TYPE: Schema = Schema {
    name: "data type",
    attrs: &[
        ("derived_from", Descriptor::String),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("version", Descriptor::String),
        ("constraints", Descriptor::List(&Descriptor::Void)),
        ("properties", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("key_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
        ("entry_schema", Descriptor::Entity(&SCHEMA_DEFINITION)),
    ],
    required: &[],
    short_form: None,
};

pub static CAPABILITY_TYPE: Schema = Schema {
    name: "capability type",
    attrs: &[
        ("derived_from", Descriptor::Reference(CAPABILITY_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("version", Descriptor::String),
        ("properties", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("attributes", Descriptor::Map(&Descriptor::Entity(&ATTRIBUTE_DEFINITION))),
        ("valid_source_types", Descriptor::List(&Descriptor::Reference(NODE_TYPES))),
    ],
    required: &[],
    short_form: None,
};

pub static CAPABILITY_DEFINITION: Schema = Schema {
    name: "capability definition",
    attrs: &[
        ("type", Descriptor::Reference(CAPABILITY_TYPES)),
        ("description", Descriptor::String),
        ("properties", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("attributes", Descriptor::Map(&Descriptor::Entity(&ATTRIBUTE_DEFINITION))),
        ("valid_source_types", Descriptor::List(&Descriptor::Reference(NODE_TYPES))),
        ("occurrences", Descriptor::Range),
    ],
    required: &["type"],
    short_form: Some("type"),
};

pub static IMPLEMENTATION_DEFINITION: Schema = Schema {
    name: "operation implementation definition",
    attrs: &[
        ("primary", Descriptor::String),
        ("dependencies", Descriptor::List(&Descriptor::String)),
        ("timeout", Descriptor::String),
        ("operation_host", Descriptor::String),
    ],
    required: &["primary"],
    short_form: Some("primary"),
};

pub static OPERATION_DEFINITION: Schema = Schema {
    name: "operation definition",
    attrs: &[
        ("description", Descriptor::String),
        ("implementation", Descriptor::Entity(&IMPLEMENTATION_DEFINITION)),
        ("inputs", Descriptor::Map(&Descriptor::Void)),
        ("outputs", Descriptor::Map(&Descriptor::Void)),
    ],
    required: &[],
    short_form: Some("implementation"),
};

pub static INTERFACE_TYPE: Schema = Schema {
    name: "interface type",
    attrs: &[
        ("derived_from", Descriptor::Reference(INTERFACE_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("version", Descriptor::String),
        ("inputs", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("operations", Descriptor::Map(&Descriptor::Entity(&OPERATION_DEFINITION))),
        ("notifications", Descriptor::Map(&Descriptor::Void)),
    ],
    required: &[],
    short_form: None,
};

pub static INTERFACE_DEFINITION: Schema = Schema {
    name: "interface definition",
    attrs: &[
        ("type", Descriptor::Reference(INTERFACE_TYPES)),
        ("description", Descriptor::String),
        ("inputs", Descriptor::Map(&Descriptor::Void)),
        ("operations", Descriptor::Map(&Descriptor::Entity(&OPERATION_DEFINITION))),
        ("notifications", Descriptor::Map(&Descriptor::Void)),
    ],
    required: &["type"],
    short_form: None,
};

pub static RELATIONSHIP_TYPE: Schema = Schema {
    name: "relationship type",
    attrs: &[
        ("derived_from", Descriptor::Reference(RELATIONSHIP_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("version", Descriptor::String),
        ("properties", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("attributes", Descriptor::Map(&Descriptor::Entity(&ATTRIBUTE_DEFINITION))),
        ("interfaces", Descriptor::Map(&Descriptor::Entity(&INTERFACE_DEFINITION))),
        ("valid_target_types", Descriptor::List(&Descriptor::Reference(CAPABILITY_TYPES))),
    ],
    required: &[],
    short_form: None,
};

pub static REQUIREMENT_DEFINITION: Schema = Schema {
    name: "requirement definition",
    attrs: &[
        ("capability", Descriptor::Reference(CAPABILITY_TYPES)),
        ("node", Descriptor::Reference(NODE_TYPES)),
        ("relationship", Descriptor::Reference(RELATIONSHIP_TYPES)),
        ("description", Descriptor::String),
        ("occurrences", Descriptor::Range),
    ],
    required: &["capability"],
    short_form: Some("capability"),
};

pub static NODE_TYPE: Schema = Schema {
    name: "node type",
    attrs: &[
        ("derived_from", Descriptor::Reference(NODE_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("version", Descriptor::String),
        ("properties", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("attributes", Descriptor::Map(&Descriptor::Entity(&ATTRIBUTE_DEFINITION))),
        (
            "requirements",
            Descriptor::List(&Descriptor::Map(&Descriptor::Entity(&REQUIREMENT_DEFINITION))),
        ),
        ("capabilities", Descriptor::Map(&Descriptor::Entity(&CAPABILITY_DEFINITION))),
        ("interfaces", Descriptor::Map(&Descriptor::Entity(&INTERFACE_DEFINITION))),
        ("artifacts", Descriptor::Map(&Descriptor::Void)),
    ],
    required: &[],
    short_form: None,
};

pub static GROUP_TYPE: Schema = Schema {
    name: "group type",
    attrs: &[
        ("derived_from", Descriptor::Reference(GROUP_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("version", Descriptor::String),
        ("properties", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("attributes", Descriptor::Map(&Descriptor::Entity(&ATTRIBUTE_DEFINITION))),
        ("members", Descriptor::List(&Descriptor::Reference(NODE_TYPES))),
    ],
    required: &[],
    short_form: None,
};

/// Narrows a trigger to one node, requirement or capability
pub static EVENT_FILTER: Schema = Schema {
    name: "event filter",
    attrs: &[
        ("node", Descriptor::ReferenceXor(&[NODE_TEMPLATES, NODE_TYPES])),
        ("requirement", Descriptor::String),
        ("capability", Descriptor::String),
    ],
    required: &[],
    short_form: None,
};

pub static TRIGGER_DEFINITION: Schema = Schema {
    name: "trigger definition",
    attrs: &[
        ("description", Descriptor::String),
        ("event", Descriptor::String),
        ("schedule", Descriptor::Void),
        ("target_filter", Descriptor::Entity(&EVENT_FILTER)),
        ("condition", Descriptor::Void),
        ("action", Descriptor::List(&Descriptor::Map(&Descriptor::Void))),
    ],
    required: &["event", "action"],
    short_form: None,
};

pub static POLICY_TYPE: Schema = Schema {
    name: "policy type",
    attrs: &[
        ("derived_from", Descriptor::Reference(POLICY_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("version", Descriptor::String),
        ("properties", Descriptor::Map(&Descriptor::Entity(&PROPERTY_DEFINITION))),
        ("targets", Descriptor::List(&Descriptor::ReferenceXor(&[NODE_TYPES, GROUP_TYPES]))),
        ("triggers", Descriptor::Map(&Descriptor::Entity(&TRIGGER_DEFINITION))),
    ],
    required: &[],
    short_form: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Entity;
    use crate::yaml::load_str;
    use pretty_assertions::assert_eq;

    fn parse(schema: &'static Schema, yaml: &str) -> crate::error::ParseResult<Entity> {
        Entity::parse(schema, &load_str(yaml, "definitions.yaml").unwrap())
    }

    #[test]
    fn test_operation_short_forms_cascade() {
        let operation = parse(&OPERATION_DEFINITION, "playbooks/create.yaml").unwrap();
        let implementation = operation.entity("implementation").unwrap();
        assert_eq!(implementation.str("primary"), Some("playbooks/create.yaml"));
        assert!(implementation.list("dependencies").is_empty());
    }

    #[test]
    fn test_operation_rejects_non_string_scalar() {
        for raw in ["1", "2.3", "true", "[]"] {
            assert!(parse(&OPERATION_DEFINITION, raw).is_err(), "{} should fail", raw);
        }
    }

    #[test]
    fn test_full_operation_definition() {
        let operation = parse(
            &OPERATION_DEFINITION,
            r#"
description: Some description
implementation:
  primary: create.sh
  dependencies: [lib.sh, util.sh]
inputs:
  input: {type: string}
outputs:
  my_output: [SELF, attribute_name]
"#,
        )
        .unwrap();
        let implementation = operation.entity("implementation").unwrap();
        assert_eq!(implementation.list("dependencies").len(), 2);
        assert_eq!(operation.map("inputs").len(), 1);
    }

    #[test]
    fn test_requirement_definition_short_form() {
        let requirement = parse(&REQUIREMENT_DEFINITION, "tosca.capabilities.Compute").unwrap();
        assert_eq!(
            requirement.reference("capability").map(|r| r.name()),
            Some("tosca.capabilities.Compute")
        );
    }

    #[test]
    fn test_property_definition_requires_type() {
        let err = parse(&PROPERTY_DEFINITION, "{default: 3}").unwrap_err();
        assert!(err.message.starts_with("Missing required field: type"));
    }

    #[test]
    fn test_schema_definition_nests() {
        let schema = parse(&SCHEMA_DEFINITION, "{type: map, entry_schema: {type: list, entry_schema: string}}").unwrap();
        let inner = schema.entity("entry_schema").and_then(|e| e.entity("entry_schema")).unwrap();
        assert_eq!(inner.str("type"), Some("string"));
    }

    #[test]
    fn test_trigger_requires_event_and_action() {
        let err = parse(&TRIGGER_DEFINITION, "{event: scale_up}").unwrap_err();
        assert!(err.message.contains("Missing required field: action"));
    }

    #[test]
    fn test_capability_occurrences_must_be_a_range() {
        assert!(parse(&CAPABILITY_DEFINITION, "{type: a, occurrences: [1, UNBOUNDED]}").is_ok());
        assert!(parse(&CAPABILITY_DEFINITION, "{type: a, occurrences: [2, 1]}").is_err());
    }
}
