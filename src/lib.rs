//! Typed, hierarchical configuration container.
//!
//! A [`ConfigTree`] is built once from a declarative [`Schema`] — a
//! nested mapping of keys to default values, optional descriptions,
//! and optional validators — and then accessed through dotted paths
//! with strict type enforcement. The tree synchronizes with two
//! external surfaces: command-line flags and JSON/YAML config files.
//!
//! ```
//! use cfgtree::{ConfigTree, Schema, Value};
//!
//! let schema = Schema::new()
//!     .value("host", "localhost")
//!     .validated("port", 8080, "listen port", |v: &Value| {
//!         v.as_i64().is_some_and(|p| p > 0)
//!     })
//!     .subtree("log", Schema::new().entry("level", ("info", "log level")));
//!
//! let mut cfg = ConfigTree::build(schema).unwrap();
//! cfg.set("log.level", "debug").unwrap();
//! assert_eq!(cfg.value("log.level").unwrap().as_str(), Some("debug"));
//! assert!(cfg.set("port", 0).is_err());
//! ```

pub mod cli;
pub mod error;
pub mod file;
pub mod schema;
pub mod tree;
pub mod value;

pub use cli::{CONFIG_FLAG, SAVE_FLAG};
pub use error::{ConfigError, Result};
pub use schema::{DEFAULT_KEY, DESC_KEY, Entry, Schema};
pub use tree::{ConfigTree, Items, Keys, Resolved};
pub use value::{Value, ValueKind, ValueNode, parse_bool};
