use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{ParseError, ParseResult};
use crate::yaml::{Node, NodeValue};

/// Upper end of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Finite(u64),
    Unbounded,
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bound::Finite(value) => serializer.serialize_u64(*value),
            Bound::Unbounded => serializer.serialize_str("UNBOUNDED"),
        }
    }
}

/// Two-ended numeric bound such as `[0, UNBOUNDED]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub lower: u64,
    pub upper: Bound,
}

impl Range {
    pub fn parse(node: &Node) -> ParseResult<Range> {
        let items = match node.as_seq() {
            Some(items) if items.len() == 2 => items,
            _ => return Err(ParseError::new("Expected range as [lower, upper].", node.loc())),
        };

        let lower = match items[0].value() {
            NodeValue::Int(value) if *value >= 0 => *value as u64,
            _ => {
                return Err(ParseError::new(
                    "Lower bound must be a non-negative integer.",
                    items[0].loc(),
                ))
            }
        };

        let upper = match items[1].value() {
            NodeValue::Int(value) if *value >= 0 => Bound::Finite(*value as u64),
            NodeValue::Str(value) if value == "UNBOUNDED" => Bound::Unbounded,
            _ => {
                return Err(ParseError::new(
                    "Upper bound must be a non-negative integer or UNBOUNDED.",
                    items[1].loc(),
                ))
            }
        };

        if let Bound::Finite(upper) = upper {
            if lower > upper {
                return Err(ParseError::new(
                    format!("Lower bound {} is greater than upper bound {}.", lower, upper),
                    node.loc(),
                ));
            }
        }

        Ok(Range { lower, upper })
    }

    #[cfg(test)]
    pub fn contains(&self, value: u64) -> bool {
        value >= self.lower
            && match self.upper {
                Bound::Finite(upper) => value <= upper,
                Bound::Unbounded => true,
            }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Bound::Finite(upper) => write!(f, "[{}, {}]", self.lower, upper),
            Bound::Unbounded => write!(f, "[{}, UNBOUNDED]", self.lower),
        }
    }
}
