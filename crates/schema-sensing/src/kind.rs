//! Closed set of JSON value kinds.
//!
//! Every decoded value is classified into exactly one [`Observed`]
//! variant before it reaches the aggregator. The aggregator and the
//! flattener match on these exhaustively; a number that fits none of the
//! numeric variants is reported as an unknown kind rather than coerced.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of an observed value, as recorded in a node's type histogram.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Object,
    Array,
    Text,
    Integer,
    Real,
    Boolean,
    Null,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Text => "string",
            ValueKind::Integer => "integer",
            ValueKind::Real => "real",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ValueKind::Object | ValueKind::Array)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrowed view of a decoded value, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observed<'a> {
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Text(&'a str),
    Integer(i128),
    Real(f64),
    Boolean(bool),
    Null,
}

impl<'a> Observed<'a> {
    /// Classify a decoded value. Returns `None` only for numbers that are
    /// neither integers nor representable as `f64`.
    pub fn classify(value: &'a Value) -> Option<Self> {
        let observed = match value {
            Value::Object(map) => Observed::Object(map),
            Value::Array(items) => Observed::Array(items),
            Value::String(s) => Observed::Text(s),
            Value::Bool(b) => Observed::Boolean(*b),
            Value::Null => Observed::Null,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Observed::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    Observed::Integer(i128::from(u))
                } else {
                    Observed::Real(n.as_f64()?)
                }
            }
        };
        Some(observed)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Observed::Object(_) => ValueKind::Object,
            Observed::Array(_) => ValueKind::Array,
            Observed::Text(_) => ValueKind::Text,
            Observed::Integer(_) => ValueKind::Integer,
            Observed::Real(_) => ValueKind::Real,
            Observed::Boolean(_) => ValueKind::Boolean,
            Observed::Null => ValueKind::Null,
        }
    }
}

/// A scalar value retained in an enumerated summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i128),
    Real(f64),
    Text(String),
}

impl Literal {
    pub fn kind(&self) -> ValueKind {
        match self {
            Literal::Null => ValueKind::Null,
            Literal::Boolean(_) => ValueKind::Boolean,
            Literal::Integer(_) => ValueKind::Integer,
            Literal::Real(_) => ValueKind::Real,
            Literal::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Literal::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// Renders the literal the way it would appear in JSON.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Real(r) => write!(f, "{r:?}"),
            Literal::Text(s) => write!(f, "{}", Value::from(s.as_str())),
        }
    }
}
