use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

use super::group::{build_group, Group};
use super::node::{build_node, Node};
use super::policy::{build_policy, Policy};
use super::BuildContext;
use crate::collector::entries;
use crate::error::{ParseError, ParseResult};
use crate::schema::Entity;
use crate::value::{EvalContext, Value};

/// Fully resolved result of parsing a service template
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub metadata: IndexMap<String, String>,
    pub inputs: IndexMap<String, Json>,
    pub nodes: IndexMap<String, Node>,
    pub groups: IndexMap<String, Group>,
    pub policies: IndexMap<String, Policy>,
    pub outputs: IndexMap<String, Json>,
}

impl Topology {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }
}

pub(crate) fn build_topology(root: &Entity, supplied: &IndexMap<String, Json>) -> ParseResult<Topology> {
    let mut topology = Topology {
        description: root.str("description").map(str::to_string),
        metadata: root
            .map("metadata")
            .into_iter()
            .filter_map(|(key, data)| data.as_str().map(|value| (key.to_string(), value.to_string())))
            .collect(),
        ..Topology::default()
    };

    let Some(template) = root.entity("topology_template") else {
        debug!("Service template has no topology_template");
        return Ok(topology);
    };

    topology.inputs = resolve_inputs(template, supplied)?;
    let ctx = BuildContext {
        root,
        inputs: &topology.inputs,
    };

    let mut nodes = IndexMap::new();
    for (name, data) in template.map("node_templates") {
        if let Some(node_template) = data.as_entity() {
            nodes.insert(name.to_string(), build_node(name, node_template, &ctx)?);
        }
    }

    let mut groups = IndexMap::new();
    for (name, data) in template.map("groups") {
        if let Some(definition) = data.as_entity() {
            groups.insert(name.to_string(), build_group(name, definition, &ctx)?);
        }
    }

    let mut policies = IndexMap::new();
    for (name, data) in entries(template, "policies") {
        let Some(definition) = data.as_entity() else {
            continue;
        };
        if policies.contains_key(&name) {
            return Err(ParseError::new(
                format!("Duplicate policy name: '{}'.", name),
                definition.loc(),
            ));
        }
        let policy = build_policy(&name, definition, &nodes, &ctx)?;
        policies.insert(name, policy);
    }

    let outputs = evaluate_outputs(template, &ctx)?;
    debug!(
        nodes = nodes.len(),
        groups = groups.len(),
        policies = policies.len(),
        "Topology ready"
    );

    topology.nodes = nodes;
    topology.groups = groups;
    topology.policies = policies;
    topology.outputs = outputs;
    Ok(topology)
}

/// A supplied input wins over the declared default; required inputs with
/// neither fail. Supplied inputs that are not declared are ignored.
fn resolve_inputs(template: &Entity, supplied: &IndexMap<String, Json>) -> ParseResult<IndexMap<String, Json>> {
    let declared = template.map("inputs");

    for name in supplied.keys() {
        if !declared.contains_key(name.as_str()) {
            warn!(input = %name, "Ignoring input that the topology template does not declare");
        }
    }

    let mut inputs = IndexMap::new();
    for (name, data) in declared {
        let Some(definition) = data.as_entity() else {
            continue;
        };
        if let Some(value) = supplied.get(name) {
            inputs.insert(name.to_string(), value.clone());
        } else if let Some(default) = definition.node("default") {
            inputs.insert(name.to_string(), default.to_json());
        } else if definition.bool("required").unwrap_or(true) {
            return Err(ParseError::new(
                format!("Missing required input: '{}'.", name),
                definition.loc(),
            ));
        }
    }
    Ok(inputs)
}

fn evaluate_outputs(template: &Entity, ctx: &BuildContext<'_>) -> ParseResult<IndexMap<String, Json>> {
    let no_properties = IndexMap::new();
    let eval: EvalContext<'_> = ctx.eval_context(&no_properties);

    let mut outputs = IndexMap::new();
    for (name, data) in template.map("outputs") {
        let Some(value) = data.as_entity().and_then(|definition| definition.node("value")) else {
            continue;
        };
        outputs.insert(name.to_string(), Value::new(value).eval(&eval, name)?);
    }
    Ok(outputs)
}
