use indexmap::IndexMap;

use super::entity::{Entity, Schema};
use super::range::Range;
use crate::error::{ParseError, ParseResult};
use crate::reference::{Reference, Target};
use crate::yaml::{Node, NodeValue};

/// Container path inside the service template, e.g. `["node_types"]`
pub type Section = &'static [&'static str];

/// A reusable rule for interpreting a document node as a typed value.
///
/// Descriptors are stateless and live in the static schema tables of each
/// construct. All variants share the same normalize / validate / parse
/// contract.
#[derive(Debug)]
pub enum Descriptor {
    /// Any non-null scalar, kept as text
    String,
    /// `true` or `false`
    Boolean,
    /// Anything at all; interpretation is deferred to template building
    Void,
    /// Mapping of names to values described by the inner descriptor
    Map(&'static Descriptor),
    /// Sequence of values described by the inner descriptor
    List(&'static Descriptor),
    /// `[lower, upper]` bound pair
    Range,
    /// Name of an entity that lives in the given section
    Reference(Section),
    /// Name of an entity that lives in exactly one of the given sections
    ReferenceXor(&'static [Section]),
    /// Embedded construct with its own schema
    Entity(&'static Schema),
}

/// Output of a descriptor's parse step
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    String(String),
    Boolean(bool),
    Void(Node),
    Map(IndexMap<String, Data>),
    List(Vec<Data>),
    Range(Range),
    Reference(Reference),
    Entity(Entity),
}

impl Data {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Data::Void(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Data>> {
        match self {
            Data::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&Range> {
        match self {
            Data::Range(range) => Some(range),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Data::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Data::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

impl Descriptor {
    /// Rewrite shorthand forms into their canonical shape.
    ///
    /// Idempotent: normalizing an already normalized node returns it unchanged.
    pub fn normalize(&self, node: &Node) -> ParseResult<Node> {
        match self {
            Descriptor::Entity(schema) => schema.normalize(node),
            Descriptor::Map(inner) => match node.value() {
                NodeValue::Map(entries) => {
                    let mut normalized = IndexMap::with_capacity(entries.len());
                    for (name, value) in entries {
                        normalized.insert(name.clone(), inner.normalize(value)?);
                    }
                    Ok(Node::new(NodeValue::Map(normalized), node.loc().clone()))
                }
                _ => Ok(node.clone()),
            },
            Descriptor::List(inner) => match node.value() {
                NodeValue::Seq(items) => {
                    let normalized = items
                        .iter()
                        .map(|item| inner.normalize(item))
                        .collect::<ParseResult<Vec<_>>>()?;
                    Ok(Node::new(NodeValue::Seq(normalized), node.loc().clone()))
                }
                _ => Ok(node.clone()),
            },
            _ => Ok(node.clone()),
        }
    }

    /// Check the node has the shape this descriptor expects
    pub fn validate(&self, node: &Node) -> ParseResult<()> {
        let valid = match self {
            Descriptor::String => node.is_scalar() && !node.is_null(),
            Descriptor::Boolean => node.as_bool().is_some(),
            Descriptor::Void => true,
            Descriptor::Map(_) | Descriptor::Entity(_) => node.as_map().is_some(),
            Descriptor::List(_) => node.as_seq().is_some(),
            Descriptor::Range => node.as_seq().map_or(false, |items| items.len() == 2),
            Descriptor::Reference(_) | Descriptor::ReferenceXor(_) => node.as_str().is_some(),
        };

        if valid {
            Ok(())
        } else {
            Err(ParseError::new(
                format!("Expected {}, found {}.", self.expected(), node.kind()),
                node.loc(),
            ))
        }
    }

    /// Normalize, validate and convert the node into typed data
    pub fn parse(&self, node: &Node) -> ParseResult<Data> {
        let node = self.normalize(node)?;
        self.validate(&node)?;

        match self {
            Descriptor::String => Ok(Data::String(node.scalar_text().unwrap_or_default())),
            Descriptor::Boolean => Ok(Data::Boolean(node.as_bool().unwrap_or_default())),
            Descriptor::Void => Ok(Data::Void(node)),
            Descriptor::Map(inner) => {
                let entries = node.as_map().map(|m| m.iter()).into_iter().flatten();
                let mut parsed = IndexMap::new();
                for (name, value) in entries {
                    parsed.insert(name.clone(), inner.parse(value)?);
                }
                Ok(Data::Map(parsed))
            }
            Descriptor::List(inner) => node
                .as_seq()
                .unwrap_or_default()
                .iter()
                .map(|item| inner.parse(item))
                .collect::<ParseResult<Vec<_>>>()
                .map(Data::List),
            Descriptor::Range => Range::parse(&node).map(Data::Range),
            Descriptor::Reference(section) => Ok(Data::Reference(Reference::new(
                node.as_str().unwrap_or_default(),
                Target::Single(*section),
                node.loc(),
            ))),
            Descriptor::ReferenceXor(sections) => Ok(Data::Reference(Reference::new(
                node.as_str().unwrap_or_default(),
                Target::Xor(*sections),
                node.loc(),
            ))),
            Descriptor::Entity(schema) => Entity::parse(*schema, &node).map(Data::Entity),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Descriptor::String => "string",
            Descriptor::Boolean => "boolean",
            Descriptor::Void => "anything",
            Descriptor::Map(_) | Descriptor::Entity(_) => "map",
            Descriptor::List(_) => "list",
            Descriptor::Range => "list of two bounds",
            Descriptor::Reference(_) | Descriptor::ReferenceXor(_) => "name",
        }
    }
}
