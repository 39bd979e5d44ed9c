use indexmap::IndexMap;

use super::descriptor::{Data, Descriptor};
use crate::error::{ParseError, ParseResult};
use crate::reference::Reference;
use crate::yaml::{Location, Node, NodeValue};

/// Attribute table of one construct kind
#[derive(Debug)]
pub struct Schema {
    /// Construct name used in diagnostics (e.g. "node type")
    pub name: &'static str,

    /// Allowed attributes and how to interpret each of them
    pub attrs: &'static [(&'static str, Descriptor)],

    /// Attributes that must be present after normalization
    pub required: &'static [&'static str],

    /// When set, a bare scalar `x` is accepted and promoted to `{<key>: x}`
    pub short_form: Option<&'static str>,
}

impl Schema {
    pub fn descriptor(&self, name: &str) -> Option<&'static Descriptor> {
        self.attrs
            .iter()
            .find(|(attr, _)| *attr == name)
            .map(|(_, descriptor)| descriptor)
    }

    /// Construct-level normalization hook
    pub fn normalize(&self, node: &Node) -> ParseResult<Node> {
        match (node.value(), self.short_form) {
            (NodeValue::Map(_), _) => Ok(node.clone()),
            (NodeValue::Str(_), Some(key)) => Ok(Node::single_key_map(key, node.clone())),
            (_, Some(_)) => Err(ParseError::new("Expected string or map.", node.loc())),
            (_, None) => Err(ParseError::new("Expected map.", node.loc())),
        }
    }
}

/// Validated, typed form of one document construct
#[derive(Debug, Clone)]
pub struct Entity {
    schema: &'static Schema,
    attrs: IndexMap<String, Data>,
    loc: Location,
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.attrs == other.attrs && self.loc == other.loc
    }
}

impl Entity {
    /// Apply `schema` to `node`: normalize, check required and unknown names,
    /// then parse every present attribute in document order.
    pub fn parse(schema: &'static Schema, node: &Node) -> ParseResult<Entity> {
        let node = schema.normalize(node)?;
        let entries = node
            .as_map()
            .ok_or_else(|| ParseError::new("Expected map.", node.loc()))?;

        for required in schema.required {
            if !entries.contains_key(*required) {
                return Err(ParseError::new(
                    format!("Missing required field: {} (in {}).", required, schema.name),
                    node.loc(),
                ));
            }
        }

        let mut attrs = IndexMap::with_capacity(entries.len());
        for (name, value) in entries {
            let descriptor = schema.descriptor(name).ok_or_else(|| {
                let valid = schema
                    .attrs
                    .iter()
                    .map(|(attr, _)| *attr)
                    .collect::<Vec<_>>()
                    .join(", ");
                ParseError::new(
                    format!(
                        "Invalid {} attribute: '{}'. Valid attributes: {}.",
                        schema.name, name, valid
                    ),
                    value.loc(),
                )
            })?;
            attrs.insert(name.clone(), descriptor.parse(value)?);
        }

        Ok(Entity {
            schema,
            attrs,
            loc: node.loc().clone(),
        })
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn loc(&self) -> &Location {
        &self.loc
    }

    pub fn attrs(&self) -> &IndexMap<String, Data> {
        &self.attrs
    }

    pub fn get(&self, name: &str) -> Option<&Data> {
        self.attrs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Data::as_str)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Data::as_bool)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.get(name).and_then(Data::as_node)
    }

    pub fn reference(&self, name: &str) -> Option<&Reference> {
        self.get(name).and_then(Data::as_reference)
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.get(name).and_then(Data::as_entity)
    }

    /// Mapping attribute, or an empty map when absent
    pub fn map(&self, name: &str) -> IndexMap<&str, &Data> {
        self.get(name)
            .and_then(Data::as_map)
            .map(|map| map.iter().map(|(key, value)| (key.as_str(), value)).collect())
            .unwrap_or_default()
    }

    /// List attribute, or an empty slice when absent
    pub fn list(&self, name: &str) -> &[Data] {
        self.get(name).and_then(Data::as_list).unwrap_or_default()
    }

    /// Same entity with one attribute replaced; used while assembling the
    /// root of a multi-document template, before anything reads it.
    pub(crate) fn with_attr(mut self, name: &str, data: Data) -> Entity {
        self.attrs.insert(name.to_string(), data);
        self
    }
}
