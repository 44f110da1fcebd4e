//! Leaf value model: typed scalars, homogeneous lists, and `ValueNode`.
//!
//! A [`ValueNode`] holds a single typed, defaulted, optionally-validated
//! value. Its kind is inferred once from the default and never changes;
//! the one coercion allowed afterwards is an integer widening into a
//! float-typed node.

use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfigError, Result};

/// A configuration value: scalar or homogeneous list of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

/// Type tag for a [`Value`].
///
/// Boolean is a distinct tag from integer: a bool is never accepted by
/// an int-typed node and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::List => "list",
        };
        write!(f, "{}", name)
    }
}

impl Value {
    /// The kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float accessor; integers widen, matching the node-level coercion.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// True for scalars and for lists of same-kind scalars (empty
    /// lists included). Nested lists are never homogeneous.
    pub fn is_homogeneous(&self) -> bool {
        match self {
            Value::List(items) => {
                let mut kinds = items.iter().map(Value::kind);
                match kinds.next() {
                    None => true,
                    Some(ValueKind::List) => false,
                    Some(first) => kinds.all(|k| k == first),
                }
            }
            _ => true,
        }
    }

    /// Convert to the `serde_json::Value` interchange form.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::from(*f),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Convert from `serde_json::Value`. Returns `None` for nulls,
    /// objects, and arrays containing either.
    pub fn from_json(json: &Json) -> Option<Value> {
        match json {
            Json::Bool(b) => Some(Value::Bool(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            Json::String(s) => Some(Value::Str(s.clone())),
            Json::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            Json::Null | Json::Object(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // JSON rendering doubles as the human-readable form.
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Parse the CLI boolean grammar: `1`/`true` and `0`/`false`,
/// case-insensitive. Anything else is a parse error.
pub fn parse_bool(s: &str) -> std::result::Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("expected 1/true or 0/false, got `{}`", s)),
    }
}

/// Validator predicate owned by a single node.
pub type Validator = Box<dyn Fn(&Value) -> bool>;

/// A single typed, defaulted, optionally-validated leaf value.
///
/// Node operations take the node's dotted path purely for error
/// context; nodes themselves do not know where they live.
pub struct ValueNode {
    value: Value,
    kind: ValueKind,
    default: Value,
    desc: Option<String>,
    validator: Option<Validator>,
    extra: BTreeMap<String, Value>,
}

impl ValueNode {
    /// Build a node from its default value and metadata.
    ///
    /// The kind is inferred from the default. A present validator must
    /// accept the default.
    pub fn new(
        path: &str,
        default: Value,
        desc: Option<String>,
        validator: Option<Validator>,
        extra: BTreeMap<String, Value>,
    ) -> Result<Self> {
        if !default.is_homogeneous() {
            return Err(ConfigError::invalid_key(
                path,
                "default list must be a homogeneous list of scalars",
            ));
        }
        if let Some(ref validator) = validator
            && !validator(&default)
        {
            return Err(ConfigError::validation_failed(path, default));
        }
        let kind = default.kind();
        Ok(Self {
            value: default.clone(),
            kind,
            default,
            desc,
            validator,
            extra,
        })
    }

    /// Current value. Never fails, no side effects.
    pub fn get(&self) -> &Value {
        &self.value
    }

    /// The inferred type tag.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The construction-time default. Immutable.
    pub fn default(&self) -> &Value {
        &self.default
    }

    /// Human description, or empty if none was given.
    pub fn describe(&self) -> &str {
        self.desc.as_deref().unwrap_or("")
    }

    /// Open bag of extra metadata from the schema entry.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Assign a new value.
    ///
    /// The candidate is type-checked (int widens into a float node) and
    /// validator-checked before any assignment; on failure the node is
    /// left exactly as it was.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let candidate = match (self.kind, value) {
            (ValueKind::Float, Value::Int(i)) => Value::Float(i as f64),
            (kind, value) if value.kind() == kind => value,
            (kind, value) => {
                return Err(ConfigError::type_mismatch(path, kind, value.kind()));
            }
        };
        if !candidate.is_homogeneous() {
            return Err(ConfigError::type_mismatch(path, self.kind, ValueKind::List));
        }
        if let Some(ref validator) = self.validator
            && !validator(&candidate)
        {
            return Err(ConfigError::validation_failed(path, candidate));
        }
        self.value = candidate;
        Ok(())
    }

    /// Re-check the validator against the current value. True when no
    /// validator is attached.
    pub fn validate(&self) -> bool {
        match self.validator {
            Some(ref validator) => validator(&self.value),
            None => true,
        }
    }
}

impl fmt::Debug for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueNode")
            .field("value", &self.value)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("desc", &self.desc)
            .field("has_validator", &self.validator.is_some())
            .field("extra", &self.extra)
            .finish()
    }
}
