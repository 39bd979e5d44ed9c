//! Literal-or-function values and their evaluation.
//!
//! Values are captured while parsing and evaluated only while building
//! templates, once the owning construct's full property set is known.

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::error::{ParseError, ParseResult};
use crate::yaml::{Location, Node, NodeValue};

/// Self-referential host name accepted by `get_property`
pub const SELF: &str = "SELF";

// Guards against `get_property` chains that loop back on themselves
const MAX_DEPTH: usize = 64;

/// Functions the evaluator knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Concat,
    GetProperty,
    GetInput,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Function> {
        match name {
            "concat" => Some(Function::Concat),
            "get_property" => Some(Function::GetProperty),
            "get_input" => Some(Function::GetInput),
            _ => None,
        }
    }
}

/// What a value may look at while it is evaluated
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Collected properties of the construct that owns the value (`SELF`)
    pub properties: &'a IndexMap<String, Value>,
    /// Resolved topology inputs
    pub inputs: &'a IndexMap<String, Json>,
}

/// A raw payload that is either literal data or a deferred function call
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    payload: Option<Node>,
    loc: Location,
}

impl Value {
    pub fn new(node: &Node) -> Self {
        Value {
            payload: Some(node.clone()),
            loc: node.loc().clone(),
        }
    }

    /// A declared value that has not been given any data
    pub fn absent(loc: &Location) -> Self {
        Value {
            payload: None,
            loc: loc.clone(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.payload.is_some()
    }

    pub fn loc(&self) -> &Location {
        &self.loc
    }

    pub fn is_function(&self) -> bool {
        self.function().is_some()
    }

    /// Function name and argument node when the payload is a single-key
    /// mapping naming a known function
    fn function(&self) -> Option<(Function, &Node)> {
        let map = self.payload.as_ref()?.as_map()?;
        if map.len() != 1 {
            return None;
        }
        let (name, args) = map.iter().next()?;
        Function::from_name(name).map(|function| (function, args))
    }

    /// Evaluate the value; `name` is the attribute it is assigned to
    pub fn eval(&self, ctx: &EvalContext<'_>, name: &str) -> ParseResult<Json> {
        self.eval_at(ctx, name, 0)
    }

    fn eval_at(&self, ctx: &EvalContext<'_>, name: &str, depth: usize) -> ParseResult<Json> {
        if depth > MAX_DEPTH {
            return Err(ParseError::new(
                format!("Evaluation of '{}' nests too deeply; get_property chain loops?", name),
                &self.loc,
            ));
        }
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| ParseError::new(format!("Missing value for '{}'.", name), &self.loc))?;

        match self.function() {
            Some((Function::Concat, args)) => concat(args, ctx, name, depth),
            Some((Function::GetProperty, args)) => get_property(args, ctx, depth),
            Some((Function::GetInput, args)) => get_input(args, ctx),
            None => Ok(payload.to_json()),
        }
    }
}

fn arguments<'n>(args: &'n Node, function: &str) -> ParseResult<&'n [Node]> {
    args.as_seq().ok_or_else(|| {
        ParseError::new(format!("{} expects a list of arguments.", function), args.loc())
    })
}

/// Strings are joined as-is, nulls contribute nothing and any other value
/// is rendered as JSON text
fn concat(args: &Node, ctx: &EvalContext<'_>, name: &str, depth: usize) -> ParseResult<Json> {
    let mut joined = String::new();
    for arg in arguments(args, "concat")? {
        match Value::new(arg).eval_at(ctx, name, depth + 1)? {
            Json::String(s) => joined.push_str(&s),
            Json::Null => {}
            other => joined.push_str(&other.to_string()),
        }
    }
    Ok(Json::String(joined))
}

fn get_property(args: &Node, ctx: &EvalContext<'_>, depth: usize) -> ParseResult<Json> {
    let (host, property, path) = match arguments(args, "get_property")? {
        [host, property, path @ ..] => (host, property, path),
        _ => {
            return Err(ParseError::new(
                "get_property expects at least [<host>, <property>].",
                args.loc(),
            ))
        }
    };

    if host.as_str() != Some(SELF) {
        return Err(ParseError::new(
            format!(
                "Unknown host: '{}'. Only {} is supported.",
                host.scalar_text().unwrap_or_else(|| host.kind().to_string()),
                SELF
            ),
            host.loc(),
        ));
    }

    let property_name = property.scalar_text().unwrap_or_default();
    let value = ctx.properties.get(&property_name).ok_or_else(|| {
        let known = ctx.properties.keys().cloned().collect::<Vec<_>>().join(", ");
        ParseError::new(
            format!("Unknown property: '{}'. Known properties: [{}].", property_name, known),
            property.loc(),
        )
    })?;

    let mut result = value.eval_at(ctx, &property_name, depth + 1)?;
    for step in path {
        result = descend(result, step)?;
    }
    Ok(result)
}

/// Follow one `get_property` path segment into a nested value
fn descend(value: Json, step: &Node) -> ParseResult<Json> {
    let found = match (value, step.value()) {
        (Json::Object(mut object), _) => step
            .scalar_text()
            .and_then(|key| object.remove(&key)),
        (Json::Array(mut items), NodeValue::Int(index)) if *index >= 0 && (*index as usize) < items.len() => {
            Some(items.swap_remove(*index as usize))
        }
        _ => None,
    };
    found.ok_or_else(|| {
        ParseError::new(
            format!(
                "Cannot follow '{}' into property value.",
                step.scalar_text().unwrap_or_else(|| step.kind().to_string())
            ),
            step.loc(),
        )
    })
}

fn get_input(args: &Node, ctx: &EvalContext<'_>) -> ParseResult<Json> {
    let input = match args.value() {
        NodeValue::Seq(items) if items.len() == 1 => items[0].scalar_text(),
        _ => args.scalar_text(),
    }
    .ok_or_else(|| ParseError::new("get_input expects an input name.", args.loc()))?;

    ctx.inputs.get(&input).cloned().ok_or_else(|| {
        let known = ctx.inputs.keys().cloned().collect::<Vec<_>>().join(", ");
        ParseError::new(
            format!("Unknown input: '{}'. Known inputs: [{}].", input, known),
            args.loc(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::load_str;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn value(yaml: &str) -> Value {
        Value::new(&load_str(yaml, "value.yaml").unwrap())
    }

    fn properties(entries: &[(&str, &str)]) -> IndexMap<String, Value> {
        entries
            .iter()
            .map(|(name, yaml)| (name.to_string(), value(yaml)))
            .collect()
    }

    #[test]
    fn test_literal_evaluates_to_payload() {
        let props = IndexMap::new();
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let v = value("{port: 80, tags: [a, b]}");
        assert!(!v.is_function());
        assert_eq!(v.eval(&ctx, "config").unwrap(), json!({"port": 80, "tags": ["a", "b"]}));
    }

    #[test]
    fn test_unknown_single_key_map_is_literal() {
        let props = IndexMap::new();
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let v = value("{get_attribute: [SELF, ip]}");
        assert!(!v.is_function());
        assert_eq!(v.eval(&ctx, "ip").unwrap(), json!({"get_attribute": ["SELF", "ip"]}));
    }

    #[test]
    fn test_concat_with_nested_functions() {
        let props = properties(&[("host", "example.com"), ("port", "8080")]);
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let v = value("concat: ['http://', {get_property: [SELF, host]}, ':', {get_property: [SELF, port]}]");
        assert_eq!(v.eval(&ctx, "url").unwrap(), json!("http://example.com:8080"));
    }

    #[test]
    fn test_concat_renders_scalars_as_json_text() {
        let props = IndexMap::new();
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let v = value("concat: [a, ~, true, 1.5, [x]]");
        assert_eq!(v.eval(&ctx, "joined").unwrap(), json!("atrue1.5[\"x\"]"));
    }

    #[test]
    fn test_get_property_chain_and_path() {
        let props = properties(&[
            ("base", "{ports: [80, 443]}"),
            ("alias", "{get_property: [SELF, base]}"),
        ]);
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        assert_eq!(value("{get_property: [SELF, alias]}").eval(&ctx, "x").unwrap(), json!({"ports": [80, 443]}));
        assert_eq!(value("{get_property: [SELF, base, ports, 1]}").eval(&ctx, "x").unwrap(), json!(443));
    }

    #[test]
    fn test_get_property_rejects_unknown_host() {
        let props = properties(&[("a", "1")]);
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let err = value("{get_property: [HOST, a]}").eval(&ctx, "x").unwrap_err();
        assert_eq!(err.message, "Unknown host: 'HOST'. Only SELF is supported.");
    }

    #[test]
    fn test_get_property_lists_known_names() {
        let props = properties(&[("a", "1"), ("b", "2")]);
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let err = value("{get_property: [SELF, c]}").eval(&ctx, "x").unwrap_err();
        assert_eq!(err.message, "Unknown property: 'c'. Known properties: [a, b].");
    }

    #[test]
    fn test_self_referencing_property_fails() {
        let props = properties(&[("loop", "{get_property: [SELF, loop]}")]);
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let err = value("{get_property: [SELF, loop]}").eval(&ctx, "x").unwrap_err();
        assert!(err.message.contains("nests too deeply"));
    }

    #[test]
    fn test_get_input() {
        let props = IndexMap::new();
        let mut inputs = IndexMap::new();
        inputs.insert("region".to_string(), json!("eu-west"));
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        assert_eq!(value("{get_input: region}").eval(&ctx, "r").unwrap(), json!("eu-west"));
        assert_eq!(value("{get_input: [region]}").eval(&ctx, "r").unwrap(), json!("eu-west"));
        let err = value("{get_input: zone}").eval(&ctx, "r").unwrap_err();
        assert_eq!(err.message, "Unknown input: 'zone'. Known inputs: [region].");
    }

    #[test]
    fn test_absent_value_fails_on_eval() {
        let props = IndexMap::new();
        let inputs = IndexMap::new();
        let ctx = EvalContext { properties: &props, inputs: &inputs };

        let v = Value::absent(&Location::new("value.yaml", 2, 5));
        assert!(!v.is_present());
        assert_eq!(v.eval(&ctx, "size").unwrap_err().message, "Missing value for 'size'.");
    }
}
