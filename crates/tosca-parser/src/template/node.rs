use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::debug;

use super::{assign, assigned_values, declared_values, evaluate, undeclared, BuildContext};
use crate::collector::{merge_assignments, TypeChain};
use crate::error::{ParseError, ParseResult};
use crate::reference::{container, lookup, resolve_in, Reference};
use crate::schema::{Data, Entity};
use crate::tosca::{NODE_TEMPLATES, NODE_TYPES};
use crate::value::Value;

/// A node instance built from a node template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    /// Type chain, most derived first
    pub types: Vec<String>,
    pub properties: IndexMap<String, Json>,
    pub attributes: IndexMap<String, Json>,
    pub capabilities: IndexMap<String, Capability>,
    pub requirements: Vec<Requirement>,
    pub interfaces: IndexMap<String, Interface>,
}

impl Node {
    /// Most derived type name
    pub fn type_name(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    /// A target name matches the template name or the most derived type only
    pub fn matches(&self, target: &str) -> bool {
        self.name == target || self.type_name() == Some(target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capability {
    pub name: String,
    pub types: Vec<String>,
    pub properties: IndexMap<String, Json>,
    pub attributes: IndexMap<String, Json>,
}

/// A resolved requirement: which node satisfies it and through what
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interface {
    pub name: String,
    pub types: Vec<String>,
    pub operations: IndexMap<String, Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub name: String,
    pub interface: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    pub inputs: IndexMap<String, Json>,
    pub outputs: IndexMap<String, Json>,
}

pub(crate) fn build_node(name: &str, template: &Entity, ctx: &BuildContext<'_>) -> ParseResult<Node> {
    let type_ref = template
        .reference("type")
        .ok_or_else(|| ParseError::new("Missing required field: type (in node template).", template.loc()))?;
    let chain = TypeChain::resolve(type_ref, ctx.root)?;
    debug!(node = name, types = ?chain.names(), "Building node");

    let mut properties = declared_values(chain.collect("properties"));
    assign(&mut properties, assigned_values(template, "properties"), "property")?;

    let mut attributes = declared_values(chain.collect("attributes"));
    assign(&mut attributes, assigned_values(template, "attributes"), "attribute")?;

    let eval = ctx.eval_context(&properties);

    Ok(Node {
        name: name.to_string(),
        types: chain.names(),
        properties: evaluate(&properties, &eval)?,
        attributes: evaluate(&attributes, &eval)?,
        capabilities: build_capabilities(template, &chain, ctx)?,
        requirements: build_requirements(name, template, &chain, ctx)?,
        interfaces: build_interfaces(template, &chain, &properties, ctx)?,
    })
}

fn build_capabilities(
    template: &Entity,
    chain: &TypeChain<'_>,
    ctx: &BuildContext<'_>,
) -> ParseResult<IndexMap<String, Capability>> {
    let definitions = chain.collect("capabilities");
    let assignments = template.map("capabilities");
    for (name, data) in &assignments {
        if !definitions.contains_key(*name) {
            let loc = data.as_entity().map_or(template.loc(), Entity::loc);
            return Err(undeclared("capability", name, definitions.keys(), loc));
        }
    }

    let mut capabilities = IndexMap::new();
    for (name, data) in definitions {
        let Some(definition) = data.as_entity() else {
            continue;
        };
        let assignment = assignments.get(name.as_str()).and_then(|data| data.as_entity());
        let capability = build_capability(&name, definition, assignment, ctx)?;
        capabilities.insert(name, capability);
    }
    Ok(capabilities)
}

fn build_capability(
    name: &str,
    definition: &Entity,
    assignment: Option<&Entity>,
    ctx: &BuildContext<'_>,
) -> ParseResult<Capability> {
    let type_ref = definition.reference("type").ok_or_else(|| {
        ParseError::new("Missing required field: type (in capability definition).", definition.loc())
    })?;
    let chain = TypeChain::resolve(type_ref, ctx.root)?;

    let mut property_definitions = chain.collect("properties");
    let mut attribute_definitions = chain.collect("attributes");
    for (name, data) in definition.map("properties") {
        property_definitions.insert(name.to_string(), data);
    }
    for (name, data) in definition.map("attributes") {
        attribute_definitions.insert(name.to_string(), data);
    }

    let mut properties = declared_values(property_definitions);
    let mut attributes = declared_values(attribute_definitions);
    if let Some(assignment) = assignment {
        assign(&mut properties, assigned_values(assignment, "properties"), "capability property")?;
        assign(&mut attributes, assigned_values(assignment, "attributes"), "capability attribute")?;
    }

    let eval = ctx.eval_context(&properties);
    Ok(Capability {
        name: name.to_string(),
        types: chain.names(),
        properties: evaluate(&properties, &eval)?,
        attributes: evaluate(&attributes, &eval)?,
    })
}

fn build_requirements(
    node_name: &str,
    template: &Entity,
    chain: &TypeChain<'_>,
    ctx: &BuildContext<'_>,
) -> ParseResult<Vec<Requirement>> {
    let definitions = chain.collect("requirements");
    let mut requirements = Vec::new();

    for entry in template.list("requirements").iter().filter_map(Data::as_map) {
        for (name, data) in entry {
            let Some(assignment) = data.as_entity() else {
                continue;
            };
            let definition = definitions
                .get(name)
                .and_then(|data| data.as_entity())
                .ok_or_else(|| undeclared("requirement", name, definitions.keys(), assignment.loc()))?;

            let target = match (assignment.reference("node"), definition.reference("node")) {
                (Some(node), _) => requirement_target(node, ctx)?,
                (None, Some(node_type)) => template_of_type(node_type, ctx)?,
                (None, None) => {
                    return Err(ParseError::new(
                        format!("Requirement '{}' of node '{}' has no target node.", name, node_name),
                        assignment.loc(),
                    ))
                }
            };

            requirements.push(Requirement {
                name: name.clone(),
                target,
                capability: assignment
                    .str("capability")
                    .or_else(|| definition.reference("capability").map(Reference::name))
                    .map(str::to_string),
                relationship: assignment
                    .str("relationship")
                    .or_else(|| definition.reference("relationship").map(Reference::name))
                    .map(str::to_string),
            });
        }
    }
    Ok(requirements)
}

/// Node template name a requirement's `node` points at; a node type is
/// satisfied by the first template of exactly that type
fn requirement_target(node: &Reference, ctx: &BuildContext<'_>) -> ParseResult<String> {
    let resolved = resolve_in(node, ctx.root)?;
    if resolved.section == NODE_TEMPLATES {
        Ok(node.name().to_string())
    } else {
        template_of_type(node, ctx)
    }
}

fn template_of_type(node_type: &Reference, ctx: &BuildContext<'_>) -> ParseResult<String> {
    lookup(ctx.root, NODE_TYPES, node_type.name()).ok_or_else(|| {
        ParseError::new(
            format!("Invalid reference: '{}' is not defined in node_types.", node_type.name()),
            node_type.loc(),
        )
    })?;

    container(ctx.root, NODE_TEMPLATES)
        .into_iter()
        .flatten()
        .find(|(_, data)| {
            data.as_entity()
                .and_then(|template| template.reference("type"))
                .map_or(false, |typ| typ.name() == node_type.name())
        })
        .map(|(name, _)| name.clone())
        .ok_or_else(|| {
            ParseError::new(
                format!("No node template of type '{}' is available.", node_type.name()),
                node_type.loc(),
            )
        })
}

fn build_interfaces(
    template: &Entity,
    chain: &TypeChain<'_>,
    properties: &IndexMap<String, Value>,
    ctx: &BuildContext<'_>,
) -> ParseResult<IndexMap<String, Interface>> {
    let definitions = chain.collect("interfaces");
    let assignments = template.map("interfaces");
    for (name, data) in &assignments {
        if !definitions.contains_key(*name) {
            let loc = data.as_entity().map_or(template.loc(), Entity::loc);
            return Err(undeclared("interface", name, definitions.keys(), loc));
        }
    }

    let mut interfaces = IndexMap::new();
    for (name, data) in definitions {
        let Some(definition) = data.as_entity() else {
            continue;
        };
        let assignment = assignments.get(name.as_str()).and_then(|data| data.as_entity());
        let interface = build_interface(&name, definition, assignment, properties, ctx)?;
        interfaces.insert(name, interface);
    }
    Ok(interfaces)
}

/// Operations and inputs come from the interface type chain, then the node
/// type's definition, then the template's assignment; each level replaces
/// same-named entries in full
fn build_interface(
    name: &str,
    definition: &Entity,
    assignment: Option<&Entity>,
    properties: &IndexMap<String, Value>,
    ctx: &BuildContext<'_>,
) -> ParseResult<Interface> {
    let type_ref = definition.reference("type").ok_or_else(|| {
        ParseError::new("Missing required field: type (in interface definition).", definition.loc())
    })?;
    let chain = TypeChain::resolve(type_ref, ctx.root)?;

    let mut operations: IndexMap<String, &Entity> = chain
        .collect("operations")
        .into_iter()
        .filter_map(|(name, data)| data.as_entity().map(|operation| (name, operation)))
        .collect();
    let mut inputs = declared_values(chain.collect("inputs"));

    for level in std::iter::once(definition).chain(assignment) {
        merge_assignments(
            &mut operations,
            level
                .map("operations")
                .into_iter()
                .filter_map(|(name, data)| data.as_entity().map(|operation| (name.to_string(), operation))),
        );
        merge_assignments(&mut inputs, assigned_values(level, "inputs"));
    }

    let eval = ctx.eval_context(properties);
    let mut built = IndexMap::new();
    for (operation_name, operation) in operations {
        let mut operation_inputs = inputs.clone();
        merge_assignments(&mut operation_inputs, assigned_values(operation, "inputs"));

        let implementation = operation.entity("implementation");
        built.insert(
            operation_name.clone(),
            Operation {
                name: operation_name,
                interface: name.to_string(),
                primary: implementation.and_then(|i| i.str("primary")).map(str::to_string),
                dependencies: implementation
                    .map(|i| i.list("dependencies").iter().filter_map(Data::as_str).map(str::to_string).collect())
                    .unwrap_or_default(),
                timeout: implementation.and_then(|i| i.str("timeout")).map(str::to_string),
                inputs: evaluate(&operation_inputs, &eval)?,
                outputs: operation
                    .map("outputs")
                    .into_iter()
                    .filter_map(|(name, data)| data.as_node().map(|node| (name.to_string(), node.to_json())))
                    .collect(),
            },
        );
    }

    Ok(Interface {
        name: name.to_string(),
        types: chain.names(),
        operations: built,
    })
}
