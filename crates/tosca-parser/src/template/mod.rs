//! Topology builder: turns the parsed service template plus user inputs into
//! node instances, groups, policies, triggers and operations.
//!
//! Everything deferred during parsing happens here: references are resolved,
//! type chains are walked and values are evaluated.

mod group;
mod node;
mod policy;
mod topology;

pub use group::Group;
pub use node::{Capability, Interface, Node, Operation, Requirement};
pub use policy::{Action, Policy, Trigger};
pub use topology::Topology;

pub(crate) use topology::build_topology;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::collector::merge_assignments;
use crate::error::{ParseError, ParseResult};
use crate::schema::{Data, Entity};
use crate::value::{EvalContext, Value};
use crate::yaml::Location;

/// Shared state of one template build
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuildContext<'a> {
    /// Root of the (merged) service template
    pub root: &'a Entity,
    /// Resolved topology inputs
    pub inputs: &'a IndexMap<String, Json>,
}

impl<'a> BuildContext<'a> {
    pub fn eval_context<'p>(&self, properties: &'p IndexMap<String, Value>) -> EvalContext<'p>
    where
        'a: 'p,
    {
        EvalContext {
            properties,
            inputs: self.inputs,
        }
    }
}

/// Values declared by property, attribute or parameter definitions: the
/// default when there is one, otherwise an absent value. Raw data entries
/// are taken as they are.
pub(crate) fn declared_values(definitions: IndexMap<String, &Data>) -> IndexMap<String, Value> {
    definitions
        .into_iter()
        .filter_map(|(name, data)| {
            let value = match data {
                Data::Entity(definition) => match definition.node("default") {
                    Some(default) => Value::new(default),
                    None => Value::absent(definition.loc()),
                },
                Data::Void(node) => Value::new(node),
                _ => return None,
            };
            Some((name, value))
        })
        .collect()
}

/// Raw assignments of a `Map(Void)` attribute as values
pub(crate) fn assigned_values(entity: &Entity, section: &str) -> Vec<(String, Value)> {
    entity
        .map(section)
        .into_iter()
        .filter_map(|(name, data)| data.as_node().map(|node| (name.to_string(), Value::new(node))))
        .collect()
}

/// Merge explicit assignments over declared values; every assigned name
/// must have been declared
pub(crate) fn assign(
    values: &mut IndexMap<String, Value>,
    assignments: Vec<(String, Value)>,
    what: &str,
) -> ParseResult<()> {
    for (name, value) in &assignments {
        if !values.contains_key(name) {
            return Err(undeclared(what, name, values.keys(), value.loc()));
        }
    }
    merge_assignments(values, assignments);
    Ok(())
}

pub(crate) fn undeclared<'k>(
    what: &str,
    name: &str,
    declared: impl Iterator<Item = &'k String>,
    loc: &Location,
) -> ParseError {
    let declared = declared.map(String::as_str).collect::<Vec<_>>().join(", ");
    ParseError::new(
        format!("Undeclared {}: '{}'. Declared: [{}].", what, name, declared),
        loc,
    )
}

/// Evaluate every present value; absent ones are left out
pub(crate) fn evaluate(
    values: &IndexMap<String, Value>,
    ctx: &EvalContext<'_>,
) -> ParseResult<IndexMap<String, Json>> {
    values
        .iter()
        .filter(|(_, value)| value.is_present())
        .map(|(name, value)| Ok((name.clone(), value.eval(ctx, name)?)))
        .collect()
}
