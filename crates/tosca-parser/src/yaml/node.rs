use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// A position in a source document (1-based line and column)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
        Location {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Raw value of a document node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Node>),
    Map(IndexMap<String, Node>),
}

/// One point in a parsed document together with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    value: NodeValue,
    loc: Location,
}

impl Node {
    pub fn new(value: NodeValue, loc: Location) -> Self {
        Node { value, loc }
    }

    /// Build a single-key mapping located where `value` is; used by short-form normalization
    pub fn single_key_map(key: &str, value: Node) -> Self {
        let loc = value.loc.clone();
        let mut map = IndexMap::with_capacity(1);
        map.insert(key.to_string(), value);
        Node::new(NodeValue::Map(map), loc)
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn loc(&self) -> &Location {
        &self.loc
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            NodeValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match &self.value {
            NodeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match &self.value {
            NodeValue::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, NodeValue::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self.value, NodeValue::Seq(_) | NodeValue::Map(_))
    }

    /// Render a non-null scalar as text (`1.0` stays `1.0`, `true` stays `true`)
    pub fn scalar_text(&self) -> Option<String> {
        match &self.value {
            NodeValue::Str(s) => Some(s.clone()),
            NodeValue::Bool(b) => Some(b.to_string()),
            NodeValue::Int(i) => Some(i.to_string()),
            NodeValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{:.1}", f)),
            NodeValue::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    /// Name of the node's shape, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self.value {
            NodeValue::Null => "null",
            NodeValue::Bool(_) => "boolean",
            NodeValue::Int(_) => "integer",
            NodeValue::Float(_) => "float",
            NodeValue::Str(_) => "string",
            NodeValue::Seq(_) => "list",
            NodeValue::Map(_) => "map",
        }
    }

    /// Strip locations and convert into plain data
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match &self.value {
            NodeValue::Null => Value::Null,
            NodeValue::Bool(b) => Value::Bool(*b),
            NodeValue::Int(i) => Value::from(*i),
            NodeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            NodeValue::Str(s) => Value::String(s.clone()),
            NodeValue::Seq(items) => Value::Array(items.iter().map(Node::to_json).collect()),
            NodeValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize) -> Location {
        Location::new("doc.yaml", line, 1)
    }

    #[test]
    fn test_single_key_map_inherits_location() {
        let inner = Node::new(NodeValue::Str("tosca.capabilities.Node".into()), at(4));
        let map = Node::single_key_map("type", inner);

        assert_eq!(map.loc(), &at(4));
        let entries = map.as_map().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["type"].as_str(), Some("tosca.capabilities.Node"));
    }

    #[test]
    fn test_to_json_preserves_key_order() {
        let mut map = IndexMap::new();
        map.insert("zeta".to_string(), Node::new(NodeValue::Int(1), at(1)));
        map.insert("alpha".to_string(), Node::new(NodeValue::Bool(true), at(2)));
        let node = Node::new(NodeValue::Map(map), at(1));

        let json = node.to_json();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Node::new(NodeValue::Float(1.5), at(1)).scalar_text().as_deref(), Some("1.5"));
        assert_eq!(Node::new(NodeValue::Float(1.0), at(1)).scalar_text().as_deref(), Some("1.0"));
        assert_eq!(Node::new(NodeValue::Null, at(1)).scalar_text(), None);
    }
}
