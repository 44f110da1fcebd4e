//! Declarative schema model.
//!
//! A [`Schema`] is an ordered mapping from keys to entries. Each entry
//! is classified as one of:
//! - a pure default value (scalar or homogeneous list),
//! - a described leaf (default plus optional description, validator,
//!   and extra metadata),
//! - a nested schema.
//!
//! Tuple sugar `(default, desc)` / `(default, desc, validator)` exists
//! only at this boundary, as [`Entry`] conversions; once a tree is
//! built no trace of the sugar remains.
//!
//! Schemas can also be parsed from a plain JSON mapping using the
//! reserved marker keys [`DEFAULT_KEY`] and [`DESC_KEY`]. Validators
//! cannot be expressed that way and are attached programmatically.

use regex_lite::Regex;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{ConfigError, Result};
use crate::value::{Validator, Value};

/// Reserved marker key holding a described leaf's default value.
pub const DEFAULT_KEY: &str = "_default";

/// Reserved marker key holding a described leaf's description.
pub const DESC_KEY: &str = "_desc";

/// Names a local key may not take: they would shadow the tree's own
/// operations in the public contract.
pub(crate) const RESERVED_KEYS: &[&str] = &[
    "build",
    "from_json",
    "get",
    "set",
    "value",
    "node",
    "subtree",
    "resolve",
    "keys",
    "public_keys",
    "items",
    "public_items",
    "to_mapping",
    "validate_all",
    "update_from_file",
    "save_to_file",
    "update_from_args",
    "update_from_cli",
    "command",
    "print_config",
];

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static key pattern compiles")
    })
}

/// Validate one path segment against the key grammar.
pub fn validate_segment(key: &str) -> Result<()> {
    if key_pattern().is_match(key) {
        Ok(())
    } else {
        Err(ConfigError::invalid_key(
            key,
            "only [A-Za-z_][A-Za-z0-9_]* is allowed",
        ))
    }
}

/// Validate a schema key: grammar plus the reserved-name check.
pub(crate) fn validate_schema_key(key: &str) -> Result<()> {
    validate_segment(key)?;
    if RESERVED_KEYS.contains(&key) {
        return Err(ConfigError::invalid_key(
            key,
            "collides with a reserved method name",
        ));
    }
    Ok(())
}

/// One schema entry, classified at the parsing boundary.
pub enum Entry {
    /// Pure default value; becomes a leaf with no metadata.
    Value(Value),
    /// Described leaf.
    Described {
        default: Value,
        desc: Option<String>,
        validator: Option<Validator>,
        extra: BTreeMap<String, Value>,
    },
    /// Nested mapping; becomes a child tree.
    Tree(Schema),
}

impl Entry {
    fn described(default: Value, desc: Option<String>, validator: Option<Validator>) -> Self {
        Entry::Described {
            default,
            desc,
            validator,
            extra: BTreeMap::new(),
        }
    }
}

// Tuple sugar: (default, desc).
impl<D: Into<Value>> From<(D, &str)> for Entry {
    fn from((default, desc): (D, &str)) -> Self {
        Entry::described(default.into(), Some(desc.to_string()), None)
    }
}

// Tuple sugar: (default, desc, validator).
impl<D, F> From<(D, &str, F)> for Entry
where
    D: Into<Value>,
    F: Fn(&Value) -> bool + 'static,
{
    fn from((default, desc, validator): (D, &str, F)) -> Self {
        Entry::described(
            default.into(),
            Some(desc.to_string()),
            Some(Box::new(validator)),
        )
    }
}

impl From<Schema> for Entry {
    fn from(schema: Schema) -> Self {
        Entry::Tree(schema)
    }
}

/// Declarative nested schema, in construction order.
///
/// Keys are validated when the tree is built, not here, so a schema
/// can be assembled freely and rejected in one place.
#[derive(Default)]
pub struct Schema {
    entries: Vec<(String, Entry)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pure-value leaf entry.
    pub fn value(self, key: impl Into<String>, default: impl Into<Value>) -> Self {
        self.entry(key, Entry::Value(default.into()))
    }

    /// Add a described leaf entry.
    pub fn described(
        self,
        key: impl Into<String>,
        default: impl Into<Value>,
        desc: impl Into<String>,
    ) -> Self {
        self.entry(
            key,
            Entry::described(default.into(), Some(desc.into()), None),
        )
    }

    /// Add a described leaf entry with a validator predicate.
    pub fn validated(
        self,
        key: impl Into<String>,
        default: impl Into<Value>,
        desc: impl Into<String>,
        validator: impl Fn(&Value) -> bool + 'static,
    ) -> Self {
        self.entry(
            key,
            Entry::described(default.into(), Some(desc.into()), Some(Box::new(validator))),
        )
    }

    /// Add a nested schema entry.
    pub fn subtree(self, key: impl Into<String>, schema: Schema) -> Self {
        self.entry(key, Entry::Tree(schema))
    }

    /// Add any entry, including the tuple-sugar forms.
    pub fn entry(mut self, key: impl Into<String>, entry: impl Into<Entry>) -> Self {
        self.entries.push((key.into(), entry.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Entry)> {
        self.entries
    }

    /// Parse a schema from a plain JSON mapping.
    ///
    /// An object containing [`DEFAULT_KEY`] with a scalar/list value is
    /// a described leaf: [`DESC_KEY`] supplies the description and any
    /// remaining key becomes extra metadata. Any other object is a
    /// nested mapping. An object whose `_default` is itself a mapping
    /// is therefore a nested mapping too, not a leaf.
    pub fn from_value(json: &Json) -> Result<Schema> {
        let map = match json {
            Json::Object(map) => map,
            _ => {
                return Err(ConfigError::invalid_key(
                    json.to_string(),
                    "schema must be a mapping",
                ));
            }
        };
        let mut schema = Schema::new();
        for (key, raw) in map {
            schema = schema.entry(key.clone(), Self::classify(key, raw)?);
        }
        Ok(schema)
    }

    fn classify(key: &str, raw: &Json) -> Result<Entry> {
        if let Json::Object(map) = raw {
            let default = map.get(DEFAULT_KEY).and_then(Value::from_json);
            let Some(default) = default else {
                // No scalar default marker: a plain nested mapping.
                return Ok(Entry::Tree(Schema::from_value(raw)?));
            };
            let desc = match map.get(DESC_KEY) {
                None => None,
                Some(Json::String(s)) => Some(s.clone()),
                Some(other) => {
                    return Err(ConfigError::invalid_key(
                        key,
                        format!("`{}` must be a string, got {}", DESC_KEY, other),
                    ));
                }
            };
            let mut extra = BTreeMap::new();
            for (attr, attr_value) in map {
                if attr == DEFAULT_KEY || attr == DESC_KEY {
                    continue;
                }
                let Some(value) = Value::from_json(attr_value) else {
                    return Err(ConfigError::invalid_key(
                        key,
                        format!("metadata `{}` is not a scalar or list", attr),
                    ));
                };
                extra.insert(attr.clone(), value);
            }
            return Ok(Entry::Described {
                default,
                desc,
                validator: None,
                extra,
            });
        }
        match Value::from_json(raw) {
            Some(value) => Ok(Entry::Value(value)),
            None => Err(ConfigError::invalid_key(
                key,
                format!("unsupported schema value: {}", raw),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segment_grammar() {
        assert!(validate_segment("f_d_b").is_ok());
        assert!(validate_segment("_private").is_ok());
        assert!(validate_segment("A9").is_ok());
        assert!(validate_segment("2363").is_err());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("f?%f").is_err());
        assert!(validate_segment("a.b").is_err());
    }

    #[test]
    fn reserved_names_rejected() {
        assert!(validate_schema_key("keys").is_err());
        assert!(validate_schema_key("to_mapping").is_err());
        assert!(validate_schema_key("keys_of").is_ok());
    }

    #[test]
    fn json_classification() {
        let schema = Schema::from_value(&json!({
            "a": 1,
            "e": {"_default": true, "_custom_attr": "t"},
            "f": {"f_a": 1},
        }))
        .unwrap();
        assert_eq!(schema.len(), 3);
        let kinds: Vec<&str> = schema
            .entries
            .iter()
            .map(|(_, e)| match e {
                Entry::Value(_) => "value",
                Entry::Described { .. } => "described",
                Entry::Tree(_) => "tree",
            })
            .collect();
        assert_eq!(kinds, vec!["value", "described", "tree"]);
    }

    #[test]
    fn mapping_default_marker_is_a_subtree() {
        // `_default` pointing at a mapping does not make a leaf.
        let schema = Schema::from_value(&json!({
            "f": {"_default": {"x": 1}},
        }))
        .unwrap();
        let (_, entry) = &schema.entries[0];
        assert!(matches!(entry, Entry::Tree(_)));
    }

    #[test]
    fn null_schema_value_rejected() {
        assert!(Schema::from_value(&json!({"a": null})).is_err());
        assert!(Schema::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn tuple_sugar_produces_described_entries() {
        let schema = Schema::new()
            .entry("foo", (2, "a counter"))
            .entry("bar", (1.0, "a ratio", |v: &Value| {
                v.as_f64().is_some_and(|f| f >= 0.0)
            }));
        assert_eq!(schema.len(), 2);
        for (_, entry) in &schema.entries {
            assert!(matches!(entry, Entry::Described { .. }));
        }
    }
}
