//! Topology-level constructs: everything under `topology_template`.

use super::definitions::{OPERATION_DEFINITION, PARAMETER_DEFINITION, TRIGGER_DEFINITION};
use super::{GROUPS, GROUP_TYPES, INTERFACE_TYPES, NODE_TEMPLATES, NODE_TYPES, POLICY_TYPES};
use crate::schema::{Descriptor, Schema};

pub static CAPABILITY_ASSIGNMENT: Schema = Schema {
    name: "capability assignment",
    attrs: &[
        ("properties", Descriptor::Map(&Descriptor::Void)),
        ("attributes", Descriptor::Map(&Descriptor::Void)),
        ("occurrences", Descriptor::Range),
    ],
    required: &[],
    short_form: None,
};

pub static REQUIREMENT_ASSIGNMENT: Schema = Schema {
    name: "requirement assignment",
    attrs: &[
        ("capability", Descriptor::String),
        ("node", Descriptor::ReferenceXor(&[NODE_TEMPLATES, NODE_TYPES])),
        ("relationship", Descriptor::String),
        ("node_filter", Descriptor::Void),
        ("occurrences", Descriptor::Range),
    ],
    required: &[],
    short_form: Some("node"),
};

pub static INTERFACE_ASSIGNMENT: Schema = Schema {
    name: "interface assignment",
    attrs: &[
        ("type", Descriptor::Reference(INTERFACE_TYPES)),
        ("inputs", Descriptor::Map(&Descriptor::Void)),
        ("operations", Descriptor::Map(&Descriptor::Entity(&OPERATION_DEFINITION))),
        ("notifications", Descriptor::Map(&Descriptor::Void)),
    ],
    required: &[],
    short_form: None,
};

pub static NODE_TEMPLATE: Schema = Schema {
    name: "node template",
    attrs: &[
        ("type", Descriptor::Reference(NODE_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("directives", Descriptor::List(&Descriptor::String)),
        ("properties", Descriptor::Map(&Descriptor::Void)),
        ("attributes", Descriptor::Map(&Descriptor::Void)),
        (
            "requirements",
            Descriptor::List(&Descriptor::Map(&Descriptor::Entity(&REQUIREMENT_ASSIGNMENT))),
        ),
        ("capabilities", Descriptor::Map(&Descriptor::Entity(&CAPABILITY_ASSIGNMENT))),
        ("interfaces", Descriptor::Map(&Descriptor::Entity(&INTERFACE_ASSIGNMENT))),
        ("artifacts", Descriptor::Map(&Descriptor::Void)),
    ],
    required: &["type"],
    short_form: None,
};

pub static GROUP_DEFINITION: Schema = Schema {
    name: "group definition",
    attrs: &[
        ("type", Descriptor::Reference(GROUP_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("properties", Descriptor::Map(&Descriptor::Void)),
        ("attributes", Descriptor::Map(&Descriptor::Void)),
        ("members", Descriptor::List(&Descriptor::Reference(NODE_TEMPLATES))),
    ],
    required: &["type"],
    short_form: None,
};

pub static POLICY_DEFINITION: Schema = Schema {
    name: "policy definition",
    attrs: &[
        ("type", Descriptor::Reference(POLICY_TYPES)),
        ("description", Descriptor::String),
        ("metadata", Descriptor::Map(&Descriptor::String)),
        ("properties", Descriptor::Map(&Descriptor::Void)),
        ("targets", Descriptor::List(&Descriptor::ReferenceXor(&[NODE_TEMPLATES, GROUPS]))),
        ("triggers", Descriptor::Map(&Descriptor::Entity(&TRIGGER_DEFINITION))),
    ],
    required: &["type"],
    short_form: None,
};

pub static TOPOLOGY_TEMPLATE: Schema = Schema {
    name: "topology template",
    attrs: &[
        ("description", Descriptor::String),
        ("inputs", Descriptor::Map(&Descriptor::Entity(&PARAMETER_DEFINITION))),
        ("node_templates", Descriptor::Map(&Descriptor::Entity(&NODE_TEMPLATE))),
        ("relationship_templates", Descriptor::Map(&Descriptor::Void)),
        ("groups", Descriptor::Map(&Descriptor::Entity(&GROUP_DEFINITION))),
        (
            "policies",
            Descriptor::List(&Descriptor::Map(&Descriptor::Entity(&POLICY_DEFINITION))),
        ),
        ("outputs", Descriptor::Map(&Descriptor::Entity(&PARAMETER_DEFINITION))),
        ("substitution_mappings", Descriptor::Void),
        ("workflows", Descriptor::Map(&Descriptor::Void)),
    ],
    required: &[],
    short_form: None,
};
