//! Schema-driven command-line surface.
//!
//! Every public leaf path becomes a long flag named after the path
//! (`--f.f_b` style). Two reserved flags frame the overlay: `--config`
//! loads a file before any flag is applied, `--save-config` dumps the
//! final tree as the last step. Flags are built with clap's builder API
//! because the flag set only exists at runtime.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::tree::ConfigTree;
use crate::value::{Value, ValueKind, ValueNode, parse_bool};

/// Reserved flag: load a config file before applying flag overrides.
pub const CONFIG_FLAG: &str = "config";

/// Reserved flag: save the final configuration after all overrides.
pub const SAVE_FLAG: &str = "save-config";

impl ValueNode {
    /// Produce the CLI flag declaration for this node at `path`.
    ///
    /// List nodes accept zero-or-more raw tokens; bool nodes go through
    /// the dedicated `1/true/0/false` parser; other kinds use their
    /// scalar parsers. Help text carries the type and default.
    pub fn to_arg(&self, path: &str) -> Arg {
        let desc = self.describe();
        let help = if desc.is_empty() {
            format!("[type: {}, default: {}]", self.kind(), self.default())
        } else {
            format!("{} [type: {}, default: {}]", desc, self.kind(), self.default())
        };
        let arg = Arg::new(path.to_string())
            .long(path.to_string())
            .action(ArgAction::Set)
            .help(help);
        match self.kind() {
            ValueKind::Bool => arg.value_parser(parse_bool).value_name("BOOL"),
            ValueKind::Int => arg.value_parser(clap::value_parser!(i64)).value_name("INT"),
            ValueKind::Float => arg
                .value_parser(clap::value_parser!(f64))
                .value_name("FLOAT"),
            ValueKind::Str => arg.value_name("STRING"),
            ValueKind::List => arg.num_args(0..).value_name("ITEM"),
        }
    }
}

impl ConfigTree {
    /// Build the `clap` command for this tree: one flag per public leaf
    /// plus the two reserved file flags.
    ///
    /// A public top-level leaf named `config` would collide with the
    /// reserved flag and is rejected.
    pub fn command(&self, name: impl Into<clap::builder::Str>) -> Result<Command> {
        let mut cmd = Command::new(name);
        for (path, node) in self.walk_public() {
            if path == CONFIG_FLAG || path == SAVE_FLAG {
                return Err(ConfigError::invalid_key(
                    path,
                    "collides with a reserved command-line flag",
                ));
            }
            cmd = cmd.arg(node.to_arg(&path));
        }
        cmd = cmd
            .arg(
                Arg::new(CONFIG_FLAG)
                    .short('c')
                    .long(CONFIG_FLAG)
                    .value_name("FILE")
                    .action(ArgAction::Set)
                    .help("Load configuration from FILE before applying flag overrides"),
            )
            .arg(
                Arg::new(SAVE_FLAG)
                    .long(SAVE_FLAG)
                    .value_name("FILE")
                    .action(ArgAction::Set)
                    .help("Save the final configuration to FILE after all overrides"),
            );
        Ok(cmd)
    }

    /// Apply parsed matches: file overlay first, then each present leaf
    /// flag, then the optional dump.
    ///
    /// `matches` must come from [`command`](Self::command) on this same
    /// tree. Absent flags leave existing values untouched. Like the
    /// file overlay, the apply phase is not transactional.
    pub fn update_from_args(&mut self, matches: &ArgMatches) -> Result<()> {
        if let Some(file) = matches.get_one::<String>(CONFIG_FLAG) {
            self.update_from_file(file)?;
        }

        let paths: Vec<String> = self.public_keys().collect();
        for path in paths {
            let kind = self.node(&path)?.kind();
            match kind {
                ValueKind::Bool => {
                    if let Some(b) = matches.get_one::<bool>(&path) {
                        self.set(&path, *b)?;
                    }
                }
                ValueKind::Int => {
                    if let Some(i) = matches.get_one::<i64>(&path) {
                        self.set(&path, *i)?;
                    }
                }
                ValueKind::Float => {
                    if let Some(f) = matches.get_one::<f64>(&path) {
                        self.set(&path, *f)?;
                    }
                }
                ValueKind::Str => {
                    if let Some(s) = matches.get_one::<String>(&path) {
                        self.set(&path, s.clone())?;
                    }
                }
                ValueKind::List => {
                    if let Some(tokens) = matches.get_many::<String>(&path) {
                        let element_kind = self
                            .value(&path)?
                            .as_list()
                            .and_then(|items| items.first())
                            .map(Value::kind);
                        let items = tokens
                            .map(|token| parse_list_token(&path, element_kind, token))
                            .collect::<Result<Vec<_>>>()?;
                        self.set(&path, Value::List(items))?;
                    }
                }
            }
        }

        if let Some(file) = matches.get_one::<String>(SAVE_FLAG) {
            self.save_to_file(file)?;
        }
        Ok(())
    }

    /// One-shot convenience: build the command, parse `args`, and apply.
    ///
    /// `args` must include the program name as its first element.
    /// Unrecognized flags fail at parse time, before any mutation.
    pub fn update_from_cli<I, T>(&mut self, name: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command(name.to_string())?.try_get_matches_from(args)?;
        debug!(name, "applying command-line overrides");
        self.update_from_args(&matches)
    }
}

/// Parse one list token with the element kind of the node's current
/// list, falling back to a plain string when the list is empty.
fn parse_list_token(path: &str, element_kind: Option<ValueKind>, token: &str) -> Result<Value> {
    let mismatch = || ConfigError::type_mismatch(path, ValueKind::List, ValueKind::Str);
    match element_kind {
        Some(ValueKind::Bool) => parse_bool(token).map(Value::Bool).map_err(|_| mismatch()),
        Some(ValueKind::Int) => token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| mismatch()),
        Some(ValueKind::Float) => token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| mismatch()),
        Some(ValueKind::Str) | None => Ok(Value::Str(token.to_string())),
        Some(ValueKind::List) => Err(mismatch()),
    }
}
