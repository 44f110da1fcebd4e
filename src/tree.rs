//! Hierarchical configuration tree with dotted-path resolution.
//!
//! A [`ConfigTree`] is built once from a [`Schema`](crate::schema::Schema)
//! and then mutated in place through dotted paths. Every access route —
//! single key, dotted string, file overlay, CLI overlay — goes through
//! the same segment-by-segment resolution primitive.
//!
//! Keys are never added or removed after construction.

use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::schema::{Entry, Schema, validate_schema_key, validate_segment};
use crate::value::{Value, ValueNode};

/// A child slot: leaf value or nested tree.
#[derive(Debug)]
enum Child {
    Leaf(ValueNode),
    Tree(ConfigTree),
}

/// Result of resolving a dotted path: a leaf's value or a subtree.
#[derive(Debug)]
pub enum Resolved<'a> {
    Value(&'a Value),
    Tree(&'a ConfigTree),
}

impl<'a> Resolved<'a> {
    pub fn as_value(&self) -> Option<&'a Value> {
        match self {
            Resolved::Value(v) => Some(v),
            Resolved::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&'a ConfigTree> {
        match self {
            Resolved::Tree(t) => Some(t),
            Resolved::Value(_) => None,
        }
    }
}

/// Typed, hierarchical configuration container.
#[derive(Debug)]
pub struct ConfigTree {
    children: BTreeMap<String, Child>,
}

impl ConfigTree {
    /// Build a tree from a declarative schema.
    ///
    /// Fails with [`ConfigError::InvalidKey`] for malformed key names,
    /// reserved-name collisions, duplicates, and empty mappings at any
    /// level, and with the leaf's own error when a default is rejected
    /// by its validator.
    pub fn build(schema: Schema) -> Result<Self> {
        Self::build_at("", schema)
    }

    fn build_at(prefix: &str, schema: Schema) -> Result<Self> {
        if schema.is_empty() {
            let at = if prefix.is_empty() { "<root>" } else { prefix };
            return Err(ConfigError::invalid_key(at, "schema mapping is empty"));
        }
        let mut children = BTreeMap::new();
        for (key, entry) in schema.into_entries() {
            validate_schema_key(&key)?;
            let path = join_path(prefix, &key);
            let child = match entry {
                Entry::Value(default) => {
                    Child::Leaf(ValueNode::new(&path, default, None, None, BTreeMap::new())?)
                }
                Entry::Described {
                    default,
                    desc,
                    validator,
                    extra,
                } => Child::Leaf(ValueNode::new(&path, default, desc, validator, extra)?),
                Entry::Tree(sub) => Child::Tree(Self::build_at(&path, sub)?),
            };
            if children.insert(key.clone(), child).is_some() {
                return Err(ConfigError::invalid_key(&key, "duplicate key in schema"));
            }
        }
        Ok(Self { children })
    }

    /// Build directly from a JSON schema literal (no validators).
    pub fn from_json(json: &Json) -> Result<Self> {
        Self::build(Schema::from_value(json)?)
    }

    /// Resolve a dotted path to its child slot, validating each segment
    /// and failing fast on the first invalid or missing one.
    fn resolve_child(&self, path: &str) -> Result<&Child> {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(ConfigError::invalid_key(path, "empty path"));
        };
        let mut current = self;
        for seg in parents {
            validate_segment(seg)?;
            current = match current.children.get(*seg) {
                Some(Child::Tree(tree)) => tree,
                Some(Child::Leaf(_)) => {
                    return Err(ConfigError::invalid_target(
                        path,
                        format!("cannot descend through leaf `{}`", seg),
                    ));
                }
                None => return Err(ConfigError::key_not_found(path)),
            };
        }
        validate_segment(last)?;
        current
            .children
            .get(*last)
            .ok_or_else(|| ConfigError::key_not_found(path))
    }

    /// Mutable resolution to a leaf, for `set`.
    fn resolve_leaf_mut(&mut self, path: &str) -> Result<&mut ValueNode> {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(ConfigError::invalid_key(path, "empty path"));
        };
        let mut current = self;
        for seg in parents {
            validate_segment(seg)?;
            current = match current.children.get_mut(*seg) {
                Some(Child::Tree(tree)) => tree,
                Some(Child::Leaf(_)) => {
                    return Err(ConfigError::invalid_target(
                        path,
                        format!("cannot descend through leaf `{}`", seg),
                    ));
                }
                None => return Err(ConfigError::key_not_found(path)),
            };
        }
        validate_segment(last)?;
        match current.children.get_mut(*last) {
            Some(Child::Leaf(node)) => Ok(node),
            Some(Child::Tree(_)) => Err(ConfigError::invalid_target(
                path,
                "cannot assign a value to a subtree",
            )),
            None => Err(ConfigError::key_not_found(path)),
        }
    }

    /// Resolve a dotted path: a leaf's current value or the subtree
    /// itself, allowing further chained access.
    pub fn get(&self, path: &str) -> Result<Resolved<'_>> {
        Ok(match self.resolve_child(path)? {
            Child::Leaf(node) => Resolved::Value(node.get()),
            Child::Tree(tree) => Resolved::Tree(tree),
        })
    }

    /// Leaf-only access to the current value.
    pub fn value(&self, path: &str) -> Result<&Value> {
        Ok(self.node(path)?.get())
    }

    /// Leaf-only access to the full node (default, description,
    /// metadata, validator state).
    pub fn node(&self, path: &str) -> Result<&ValueNode> {
        match self.resolve_child(path)? {
            Child::Leaf(node) => Ok(node),
            Child::Tree(_) => Err(ConfigError::invalid_target(
                path,
                "expected a leaf, found a subtree",
            )),
        }
    }

    /// Subtree-only access.
    pub fn subtree(&self, path: &str) -> Result<&ConfigTree> {
        match self.resolve_child(path)? {
            Child::Tree(tree) => Ok(tree),
            Child::Leaf(_) => Err(ConfigError::invalid_target(
                path,
                "expected a subtree, found a leaf",
            )),
        }
    }

    /// Assign a value at a leaf path.
    ///
    /// The target must resolve to a leaf; the leaf type-checks and
    /// validator-checks the candidate before assigning.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.resolve_leaf_mut(path)?.set(path, value)?;
        debug!(path, "config value set");
        Ok(())
    }

    /// Lazy iterator over every fully-dotted leaf path, depth-first,
    /// lexicographic at each level. Restartable: each call walks the
    /// tree afresh.
    pub fn keys(&self) -> Keys<'_> {
        Keys(Walk::new(self, false))
    }

    /// Like [`keys`](Self::keys), but prunes every branch whose segment
    /// starts with `_` — nothing beneath a private subtree is listed.
    pub fn public_keys(&self) -> Keys<'_> {
        Keys(Walk::new(self, true))
    }

    /// `(dotted path, current value)` pairs over [`keys`](Self::keys).
    pub fn items(&self) -> Items<'_> {
        Items(Walk::new(self, false))
    }

    /// `(dotted path, current value)` pairs over
    /// [`public_keys`](Self::public_keys).
    pub fn public_items(&self) -> Items<'_> {
        Items(Walk::new(self, true))
    }

    /// Materialize the whole tree as a plain nested mapping of current
    /// values. Leaves hold raw values; metadata is not included.
    pub fn to_mapping(&self) -> Json {
        let mut map = serde_json::Map::new();
        for (key, child) in &self.children {
            let value = match child {
                Child::Leaf(node) => node.get().to_json(),
                Child::Tree(tree) => tree.to_mapping(),
            };
            map.insert(key.clone(), value);
        }
        Json::Object(map)
    }

    /// Re-run every leaf validator, failing on the first leaf whose
    /// validator no longer holds, with its path and current value.
    pub fn validate_all(&self) -> Result<()> {
        for (path, node) in Walk::new(self, false) {
            if !node.validate() {
                return Err(ConfigError::validation_failed(path, node.get().clone()));
            }
        }
        Ok(())
    }

    /// Print the public configuration to stdout, one `path = value`
    /// line per leaf, with descriptions as trailing comments.
    pub fn print_config(&self) {
        println!("{}", self);
    }

    /// Public leaves with their nodes, for the CLI adapter.
    pub(crate) fn walk_public(&self) -> Walk<'_> {
        Walk::new(self, true)
    }
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, node) in Walk::new(self, true) {
            write!(f, "{} = {}", path, node.get())?;
            if !node.describe().is_empty() {
                write!(f, "  # {}", node.describe())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Depth-first walk over leaf nodes, in lexicographic key order at
/// each level.
#[derive(Clone)]
pub(crate) struct Walk<'a> {
    stack: Vec<(String, btree_map::Iter<'a, String, Child>)>,
    public_only: bool,
}

impl<'a> Walk<'a> {
    fn new(tree: &'a ConfigTree, public_only: bool) -> Self {
        Self {
            stack: vec![(String::new(), tree.children.iter())],
            public_only,
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a ValueNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = {
                let (prefix, iter) = self.stack.last_mut()?;
                iter.next()
                    .map(|(key, child)| (join_path(prefix, key), key, child))
            };
            match step {
                None => {
                    self.stack.pop();
                }
                Some((path, key, child)) => {
                    if self.public_only && key.starts_with('_') {
                        continue;
                    }
                    match child {
                        Child::Leaf(node) => return Some((path, node)),
                        Child::Tree(tree) => self.stack.push((path, tree.children.iter())),
                    }
                }
            }
        }
    }
}

/// Iterator over fully-dotted leaf paths. See [`ConfigTree::keys`].
#[derive(Clone)]
pub struct Keys<'a>(Walk<'a>);

impl Iterator for Keys<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(path, _)| path)
    }
}

/// Iterator over `(dotted path, value)` pairs. See [`ConfigTree::items`].
#[derive(Clone)]
pub struct Items<'a>(Walk<'a>);

impl<'a> Iterator for Items<'a> {
    type Item = (String, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(path, node)| (path, node.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// The reference schema shared across the suite.
    fn reference() -> ConfigTree {
        ConfigTree::from_json(&json!({
            "a": 1,
            "b": 1.0,
            "c": "val",
            "d": [1, 2, 3, 4],
            "e": {"_default": true, "_custom_attr": "t"},
            "f": {
                "f_a": 1,
                "f_b": 2,
                "f_c": {"_default": 1, "_custom_attr": "t"},
                "f_d": {
                    "f_d_a": "s",
                    "f_d_b": {"_default": ["a", "b", "c"]},
                },
            },
        }))
        .unwrap()
    }

    #[test]
    fn build_rejects_invalid_key() {
        let err = ConfigTree::from_json(&json!({"2363": 1})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey { .. }));
    }

    #[test]
    fn build_rejects_empty_schema() {
        assert!(matches!(
            ConfigTree::build(Schema::new()),
            Err(ConfigError::InvalidKey { .. })
        ));
        // Empty at a nested level too.
        assert!(matches!(
            ConfigTree::build(Schema::new().value("a", 1).subtree("f", Schema::new())),
            Err(ConfigError::InvalidKey { .. })
        ));
    }

    #[test]
    fn build_rejects_reserved_key() {
        let err = ConfigTree::build(Schema::new().value("keys", 1)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey { .. }));
    }

    #[test]
    fn get_scalar_and_subtree() {
        let cfg = reference();
        assert_eq!(cfg.value("c").unwrap().as_str(), Some("val"));
        assert_eq!(cfg.value("d").unwrap().as_list().unwrap()[0], Value::Int(1));
        assert_eq!(cfg.value("e").unwrap().as_bool(), Some(true));
        assert!(cfg.get("f.f_d").unwrap().as_tree().is_some());
        // Chained subtree access routes through the same primitive.
        let f_d = cfg.subtree("f").unwrap().subtree("f_d").unwrap();
        assert_eq!(f_d.value("f_d_a").unwrap().as_str(), Some("s"));
    }

    #[test]
    fn dotted_path_resolves_to_leaf() {
        let cfg = reference();
        let list = cfg.value("f.f_d.f_d_b").unwrap().as_list().unwrap();
        assert_eq!(list[0], Value::Str("a".into()));
    }

    #[test]
    fn malformed_paths_are_invalid_keys() {
        let cfg = reference();
        for path in ["f.", ".f.", "f?%f..", "", "."] {
            assert!(
                matches!(cfg.get(path), Err(ConfigError::InvalidKey { .. })),
                "path {:?} should be invalid",
                path
            );
        }
    }

    #[test]
    fn missing_key_is_key_not_found() {
        let cfg = reference();
        assert!(matches!(
            cfg.get("non_exist_key"),
            Err(ConfigError::KeyNotFound { .. })
        ));
        assert!(matches!(
            cfg.get("f.nope"),
            Err(ConfigError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn missing_segment_reported_before_malformed_later_segment() {
        let cfg = reference();
        // Walks fail fast at the first bad segment, in walk order.
        assert!(matches!(
            cfg.get("missing.f?%"),
            Err(ConfigError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn descending_through_leaf_is_invalid_target() {
        let cfg = reference();
        assert!(matches!(
            cfg.get("a.deeper"),
            Err(ConfigError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn set_round_trips() {
        let mut cfg = reference();
        cfg.set("b", 2.0).unwrap();
        assert_eq!(cfg.value("b").unwrap().as_f64(), Some(2.0));

        cfg.set("f.f_b", 9).unwrap();
        assert_eq!(cfg.value("f.f_b").unwrap().as_i64(), Some(9));

        cfg.set("e", false).unwrap();
        assert_eq!(cfg.value("e").unwrap().as_bool(), Some(false));
    }

    #[test]
    fn set_int_into_bool_leaf_is_type_mismatch() {
        let mut cfg = reference();
        assert!(matches!(
            cfg.set("e", 1),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert_eq!(cfg.value("e").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn set_on_subtree_is_invalid_target() {
        let mut cfg = reference();
        assert!(matches!(
            cfg.set("f.f_d", "fail"),
            Err(ConfigError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn keys_are_sorted_and_restartable() {
        let cfg = reference();
        let keys: Vec<String> = cfg.keys().collect();
        assert_eq!(
            keys,
            vec![
                "a",
                "b",
                "c",
                "d",
                "e",
                "f.f_a",
                "f.f_b",
                "f.f_c",
                "f.f_d.f_d_a",
                "f.f_d.f_d_b",
            ]
        );
        // A second call walks the tree afresh.
        assert_eq!(cfg.keys().collect::<Vec<_>>(), keys);
    }

    #[test]
    fn public_keys_prune_private_branches() {
        let cfg = ConfigTree::from_json(&json!({
            "_this_is_private_key": 1,
            "this_is_public_key": 1,
            "_hidden": {"inner": 2},
            "open": {"_secret": 3, "plain": 4},
        }))
        .unwrap();
        let all: Vec<String> = cfg.keys().collect();
        assert!(all.contains(&"_this_is_private_key".to_string()));
        assert!(all.contains(&"_hidden.inner".to_string()));
        assert!(all.contains(&"open._secret".to_string()));

        let public: Vec<String> = cfg.public_keys().collect();
        assert_eq!(public, vec!["open.plain", "this_is_public_key"]);
    }

    #[test]
    fn items_pair_paths_with_values() {
        let cfg = reference();
        let items: Vec<(String, &Value)> = cfg.items().collect();
        assert_eq!(items.len(), cfg.keys().count());
        assert_eq!(items[0], ("a".to_string(), &Value::Int(1)));
    }

    #[test]
    fn to_mapping_reproduces_defaults() {
        let cfg = reference();
        assert_eq!(
            cfg.to_mapping(),
            json!({
                "a": 1,
                "b": 1.0,
                "c": "val",
                "d": [1, 2, 3, 4],
                "e": true,
                "f": {
                    "f_a": 1,
                    "f_b": 2,
                    "f_c": 1,
                    "f_d": {"f_d_a": "s", "f_d_b": ["a", "b", "c"]},
                },
            })
        );
    }

    #[test]
    fn node_metadata_survives_parsing() {
        let cfg = reference();
        let node = cfg.node("e").unwrap();
        assert_eq!(
            node.metadata().get("_custom_attr"),
            Some(&Value::Str("t".into()))
        );
        assert_eq!(node.default(), &Value::Bool(true));
    }

    #[test]
    fn validate_all_reports_first_offender() {
        let schema = Schema::new().subtree(
            "net",
            Schema::new()
                .validated("port", 8080, "listen port", |v| {
                    v.as_i64().is_some_and(|i| (1..=65535).contains(&i))
                })
                .value("host", "localhost"),
        );
        let mut cfg = ConfigTree::build(schema).unwrap();
        assert!(cfg.validate_all().is_ok());
        assert!(matches!(
            cfg.set("net.port", 0),
            Err(ConfigError::ValidationFailed { .. })
        ));
        // The failed set left the tree valid.
        assert!(cfg.validate_all().is_ok());
        assert_eq!(cfg.value("net.port").unwrap().as_i64(), Some(8080));
    }

    #[test]
    fn display_lists_public_items_with_descriptions() {
        let cfg = ConfigTree::build(
            Schema::new()
                .described("foo", 2, "this is a test description!")
                .value("_private", 1),
        )
        .unwrap();
        let rendered = cfg.to_string();
        assert_eq!(rendered, "foo = 2  # this is a test description!\n");
    }
}
