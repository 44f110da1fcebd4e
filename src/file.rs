//! File overlay and dump adapters.
//!
//! Format is selected by file extension: `.json`/`.jsonc` (tolerant of
//! `//` and `/* */` comments outside strings) or `.yaml`/`.yml`. YAML
//! documents are read through `serde_json::Value`, the crate's common
//! interchange form.

use serde_json::Value as Json;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::tree::{ConfigTree, join_path};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Yaml,
}

fn detect_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") | Some("jsonc") => Ok(FileFormat::Json),
        Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Remove `//` line comments and `/* */` block comments, leaving string
/// contents untouched. Newlines after a line comment are kept so parse
/// errors still point near the right line.
fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Flatten a loaded mapping into dotted-path/value pairs.
///
/// Any key beginning with `_` is a hard error: private keys are
/// immutable from external sources.
fn flatten(prefix: &str, map: &serde_json::Map<String, Json>, out: &mut Vec<(String, Value)>) -> Result<()> {
    for (key, raw) in map {
        let path = join_path(prefix, key);
        if key.starts_with('_') {
            return Err(ConfigError::invalid_key(
                path,
                "private keys cannot be set from a file",
            ));
        }
        match raw {
            Json::Object(inner) => flatten(&path, inner, out)?,
            other => match Value::from_json(other) {
                Some(value) => out.push((path, value)),
                None => {
                    return Err(ConfigError::invalid_key(
                        path,
                        "null is not a config value",
                    ));
                }
            },
        }
    }
    Ok(())
}

impl ConfigTree {
    /// Overlay values from a config file onto the tree.
    ///
    /// The whole document is read and flattened before anything is
    /// applied, so a malformed file or a private key mutates nothing.
    /// The apply phase itself is NOT transactional: pairs set before a
    /// type-mismatch, validation, or unknown-key failure stay applied.
    pub fn update_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = detect_format(path)?;
        let content = fs::read_to_string(path)?;
        let doc: Json = match format {
            FileFormat::Json => serde_json::from_str(&strip_json_comments(&content))
                .map_err(|err| ConfigError::parse(path, err.to_string()))?,
            FileFormat::Yaml => serde_yaml::from_str(&content)
                .map_err(|err| ConfigError::parse(path, err.to_string()))?,
        };
        let Json::Object(ref map) = doc else {
            return Err(ConfigError::parse(path, "top level must be a mapping"));
        };
        let mut pairs = Vec::new();
        flatten("", map, &mut pairs)?;
        info!(path = %path.display(), count = pairs.len(), "updating config from file");
        for (key, value) in pairs {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Serialize the current values to a config file.
    ///
    /// JSON output is pretty-printed with two-space indentation; keys
    /// are sorted in both formats.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = detect_format(path)?;
        let mapping = self.to_mapping();
        let serialized = match format {
            FileFormat::Json => {
                let mut text = serde_json::to_string_pretty(&mapping)
                    .map_err(|err| ConfigError::parse(path, err.to_string()))?;
                text.push('\n');
                text
            }
            FileFormat::Yaml => serde_yaml::to_string(&mapping)
                .map_err(|err| ConfigError::parse(path, err.to_string()))?,
        };
        fs::write(path, serialized)?;
        info!(path = %path.display(), "saved config to file");
        Ok(())
    }
}
