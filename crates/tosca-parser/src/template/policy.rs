//! Policies, their targets and their triggers.
//!
//! Target names are matched against built node instances by template name or
//! by most derived type. Trigger actions are `call_operation` activities that
//! must land on an interface operation of one of the targeted nodes.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::debug;

use super::node::Node;
use super::{assign, assigned_values, declared_values, evaluate, BuildContext};
use crate::collector::{merge_assignments, TypeChain};
use crate::error::{ParseError, ParseResult};
use crate::reference::Reference;
use crate::schema::{Data, Entity};
use crate::value::{EvalContext, Value};
use crate::yaml::{Location, NodeValue};

const CALL_OPERATION: &str = "call_operation";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    pub name: String,
    pub types: Vec<String>,
    pub properties: IndexMap<String, Json>,
    /// Names of the node instances the policy applies to
    pub targets: Vec<String>,
    pub triggers: IndexMap<String, Trigger>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Node instance selected by the trigger's `target_filter`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Json>,
    pub actions: Vec<Action>,
}

/// A resolved `call_operation` activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub node: String,
    pub interface: String,
    pub operation: String,
    /// Extra inputs from the activity, evaluated in the policy's context
    pub inputs: IndexMap<String, Json>,
}

pub(crate) fn build_policy(
    name: &str,
    definition: &Entity,
    nodes: &IndexMap<String, Node>,
    ctx: &BuildContext<'_>,
) -> ParseResult<Policy> {
    let type_ref = definition.reference("type").ok_or_else(|| {
        ParseError::new("Missing required field: type (in policy definition).", definition.loc())
    })?;
    let chain = TypeChain::resolve(type_ref, ctx.root)?;

    let targets = collect_targets(definition, &chain, ctx)?;

    let mut properties = declared_values(chain.collect("properties"));
    assign(&mut properties, assigned_values(definition, "properties"), "policy property")?;
    let eval = ctx.eval_context(&properties);

    let triggers = collect_triggers(definition, &chain, &targets, nodes, ctx, &eval)?;
    let resolved_targets = nodes
        .values()
        .filter(|node| targets.keys().any(|target| node.matches(target)))
        .map(|node| node.name.clone())
        .collect();

    debug!(policy = name, targets = ?targets.keys().collect::<Vec<_>>(), "Built policy");

    Ok(Policy {
        name: name.to_string(),
        types: chain.names(),
        properties: evaluate(&properties, &eval)?,
        targets: resolved_targets,
        triggers,
    })
}

/// Target references of the policy: the template's own list when it is not
/// empty, otherwise the list declared by the policy type. Each reference
/// must resolve.
fn collect_targets<'a>(
    definition: &'a Entity,
    chain: &TypeChain<'a>,
    ctx: &BuildContext<'_>,
) -> ParseResult<IndexMap<String, &'a Reference>> {
    let assigned = definition.list("targets");
    let declared = chain.most_derived().map_or(&[][..], |link| link.entity.list("targets"));
    let source = if assigned.is_empty() { declared } else { assigned };

    let mut targets = IndexMap::new();
    for reference in source.iter().filter_map(Data::as_reference) {
        reference.resolve(ctx.root)?;
        targets.insert(reference.name().to_string(), reference);
    }
    Ok(targets)
}

fn collect_triggers(
    definition: &Entity,
    chain: &TypeChain<'_>,
    targets: &IndexMap<String, &Reference>,
    nodes: &IndexMap<String, Node>,
    ctx: &BuildContext<'_>,
    eval: &EvalContext<'_>,
) -> ParseResult<IndexMap<String, Trigger>> {
    let mut definitions: IndexMap<String, &Entity> = chain
        .collect("triggers")
        .into_iter()
        .filter_map(|(name, data)| data.as_entity().map(|trigger| (name, trigger)))
        .collect();
    merge_assignments(
        &mut definitions,
        definition
            .map("triggers")
            .into_iter()
            .filter_map(|(name, data)| data.as_entity().map(|trigger| (name.to_string(), trigger))),
    );

    let mut triggers = IndexMap::new();
    for (name, trigger) in definitions {
        let filter = match trigger.entity("target_filter") {
            Some(filter) => Some(filter_node(filter, targets, ctx)?),
            None => None,
        };

        let candidates = candidate_nodes(filter.as_deref(), targets, nodes);
        let actions = trigger
            .list("action")
            .iter()
            .filter_map(Data::as_map)
            .map(|activity| build_action(activity, &candidates, trigger.loc(), eval))
            .collect::<ParseResult<Vec<_>>>()?;

        let filtered_node = filter.and_then(|filter_name| {
            nodes
                .values()
                .find(|node| node.matches(&filter_name))
                .map(|node| node.name.clone())
        });

        triggers.insert(
            name.clone(),
            Trigger {
                name,
                event: trigger.str("event").map(str::to_string),
                target_filter: filtered_node,
                condition: trigger.node("condition").map(|condition| condition.to_json()),
                actions,
            },
        );
    }
    Ok(triggers)
}

/// Resolve the filter's node and check it against the policy targets
fn filter_node(
    filter: &Entity,
    targets: &IndexMap<String, &Reference>,
    ctx: &BuildContext<'_>,
) -> ParseResult<String> {
    let node = filter
        .reference("node")
        .ok_or_else(|| ParseError::new("Cannot obtain node from target_filter.", filter.loc()))?;
    node.resolve(ctx.root)?;

    if !targets.is_empty() && !targets.contains_key(node.name()) {
        return Err(ParseError::new(
            format!(
                "The node reference: {} from policy trigger's target_filter should be also present in policy's targets.",
                node.name()
            ),
            node.loc(),
        ));
    }
    Ok(node.name().to_string())
}

/// Nodes a trigger's actions may call into: the first node matching the
/// filter, else every node matching a policy target, else every node
fn candidate_nodes<'n>(
    filter: Option<&str>,
    targets: &IndexMap<String, &Reference>,
    nodes: &'n IndexMap<String, Node>,
) -> Vec<&'n Node> {
    match filter {
        Some(filter) => nodes.values().find(|node| node.matches(filter)).into_iter().collect(),
        None if !targets.is_empty() => nodes
            .values()
            .filter(|node| targets.keys().any(|target| node.matches(target)))
            .collect(),
        None => nodes.values().collect(),
    }
}

fn build_action(
    activity: &IndexMap<String, Data>,
    candidates: &[&Node],
    trigger_loc: &Location,
    eval: &EvalContext<'_>,
) -> ParseResult<Action> {
    let (kind, body) = activity
        .iter()
        .next()
        .and_then(|(kind, data)| data.as_node().map(|node| (kind, node)))
        .ok_or_else(|| ParseError::new("Empty trigger activity definition.", trigger_loc))?;

    if kind != CALL_OPERATION {
        return Err(ParseError::new(
            format!(
                "Unsupported trigger activity definitions: {}. Only {} is supported.",
                kind, CALL_OPERATION
            ),
            body.loc(),
        ));
    }

    let (operation_name, inputs) = match body.value() {
        NodeValue::Str(name) => (Some(name.clone()), None),
        NodeValue::Map(entries) => (
            entries.get("operation").and_then(|op| op.scalar_text()),
            entries.get("inputs"),
        ),
        _ => {
            return Err(ParseError::new(
                format!("Invalid call operation activity definition type: {}.", body.kind()),
                body.loc(),
            ))
        }
    };
    let operation_name = operation_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ParseError::new("Missing required name for call_operation activity definition.", body.loc()))?;

    let extra_inputs = match inputs {
        Some(inputs) => inputs
            .as_map()
            .ok_or_else(|| ParseError::new("Expected map of call_operation inputs.", inputs.loc()))?
            .iter()
            .map(|(name, raw)| Ok((name.clone(), Value::new(raw).eval(eval, name)?)))
            .collect::<ParseResult<IndexMap<_, _>>>()?,
        None => IndexMap::new(),
    };

    // First match wins when several targeted nodes expose the operation
    let found = candidates.iter().find_map(|node| {
        node.interfaces.values().find_map(|interface| {
            interface
                .operations
                .values()
                .find(|operation| format!("{}.{}", interface.name, operation.name) == operation_name)
                .map(|operation| (node, interface, operation))
        })
    });

    match found {
        Some((node, interface, operation)) => Ok(Action {
            node: node.name.clone(),
            interface: interface.name.clone(),
            operation: operation.name.clone(),
            inputs: extra_inputs,
        }),
        None => Err(ParseError::new(
            format!(
                "Trigger action: {} from call_operation does not belong to any node interface. Make sure that you \
                 have referenced it correctly (as <interface_sub_name>.<operation_sub_name>, where \
                 interface_sub_name is the interface name and the operation_sub_name is the name of the operation \
                 within this interface). The node that you're targeting with interface operation also has to be \
                 used in topology_template/node_templates section.",
                operation_name
            ),
            body.loc(),
        )),
    }
}
