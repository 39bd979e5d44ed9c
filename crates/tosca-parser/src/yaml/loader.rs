use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::node::{Location, Node, NodeValue};
use crate::error::{ParseError, ParseResult};

lazy_static! {
    // Plain scalars that YAML's core schema resolves to floats
    static ref FLOAT_REGEX: Regex =
        Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").unwrap();
}

/// Parse YAML text into a located node tree.
///
/// Only the first document of a multi-document stream is loaded. Duplicate
/// mapping keys are rejected here, before any schema processing happens.
pub fn load_str(text: &str, file: &str) -> ParseResult<Node> {
    let mut builder = TreeBuilder::new(file);
    let mut parser = Parser::new(text.chars());

    if let Err(err) = parser.load(&mut builder, false) {
        let loc = builder.location(err.marker());
        return Err(ParseError::new(format!("Invalid YAML: {}", err), &loc));
    }
    if let Some(err) = builder.error {
        return Err(err);
    }

    Ok(builder
        .root
        .unwrap_or_else(|| Node::new(NodeValue::Null, Location::new(builder.file, 1, 1))))
}

enum Frame {
    Seq {
        items: Vec<Node>,
        loc: Location,
        anchor: usize,
    },
    Map {
        entries: IndexMap<String, Node>,
        key: Option<(String, Location)>,
        loc: Location,
        anchor: usize,
    },
}

struct TreeBuilder {
    file: Arc<str>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Node>,
    root: Option<Node>,
    error: Option<ParseError>,
}

impl TreeBuilder {
    fn new(file: &str) -> Self {
        TreeBuilder {
            file: Arc::from(file),
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn location(&self, mark: &Marker) -> Location {
        Location::new(self.file.clone(), mark.line(), mark.col() + 1)
    }

    fn fail(&mut self, err: ParseError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Attach a finished node to whatever collection is currently open
    fn complete(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }

        let failure = match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
                None
            }
            Some(Frame::Seq { items, .. }) => {
                items.push(node);
                None
            }
            Some(Frame::Map { entries, key, .. }) => match key.take() {
                None => match node.scalar_text() {
                    Some(text) => {
                        *key = Some((text, node.loc().clone()));
                        None
                    }
                    None => Some(ParseError::new(
                        format!("Mapping keys must be scalars, found {}.", node.kind()),
                        node.loc(),
                    )),
                },
                Some((name, key_loc)) => {
                    if entries.contains_key(&name) {
                        Some(ParseError::new(format!("Duplicate map key: '{}'.", name), &key_loc))
                    } else {
                        entries.insert(name, node);
                        None
                    }
                }
            },
        };

        if let Some(err) = failure {
            self.fail(err);
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        let loc = self.location(&mark);

        match ev {
            Event::Scalar(value, style, anchor, _) => {
                let value = if matches!(style, TScalarStyle::Plain) {
                    resolve_plain(value)
                } else {
                    NodeValue::Str(value)
                };
                self.complete(Node::new(value, loc), anchor);
            }
            Event::Alias(id) => match self.anchors.get(&id) {
                Some(target) => {
                    let node = Node::new(target.value().clone(), loc);
                    self.complete(node, 0);
                }
                None => self.fail(ParseError::new("Alias refers to an unknown anchor.", &loc)),
            },
            Event::SequenceStart(anchor, ..) => self.stack.push(Frame::Seq {
                items: Vec::new(),
                loc,
                anchor,
            }),
            Event::MappingStart(anchor, ..) => self.stack.push(Frame::Map {
                entries: IndexMap::new(),
                key: None,
                loc,
                anchor,
            }),
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Seq { items, loc, anchor }) => {
                    self.complete(Node::new(NodeValue::Seq(items), loc), anchor)
                }
                Some(Frame::Map {
                    entries, loc, anchor, ..
                }) => self.complete(Node::new(NodeValue::Map(entries), loc), anchor),
                None => self.fail(ParseError::new("Unbalanced YAML collection.", &loc)),
            },
            _ => {}
        }
    }
}

/// Resolve an untagged plain scalar the way YAML's core schema does
fn resolve_plain(value: String) -> NodeValue {
    match value.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => return NodeValue::Null,
        "true" | "True" | "TRUE" => return NodeValue::Bool(true),
        "false" | "False" | "FALSE" => return NodeValue::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return NodeValue::Float(f64::INFINITY)
        }
        "-.inf" | "-.Inf" | "-.INF" => return NodeValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return NodeValue::Float(f64::NAN),
        _ => {}
    }

    if let Ok(int) = value.parse::<i64>() {
        return NodeValue::Int(int);
    }
    if let Some(hex) = value.strip_prefix("0x") {
        if let Ok(int) = i64::from_str_radix(hex, 16) {
            return NodeValue::Int(int);
        }
    }
    if let Some(oct) = value.strip_prefix("0o") {
        if let Ok(int) = i64::from_str_radix(oct, 8) {
            return NodeValue::Int(int);
        }
    }
    if FLOAT_REGEX.is_match(&value) {
        if let Ok(float) = value.parse::<f64>() {
            return NodeValue::Float(float);
        }
    }

    NodeValue::Str(value)
}
