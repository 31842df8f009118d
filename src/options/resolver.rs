//! Merge raw command-line values with schema defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use super::parse::{parse_flag, ParseError};
use super::schema::{OptionSpec, OptionValue, ValueKind};
use crate::config::ProjectConfig;

/// Raw option text keyed by option name. Absent keys mean "not supplied".
pub type RawArgs = BTreeMap<String, String>;

/// A resolved configuration that does not have the shape a caller expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("option `{0}` is missing from the resolved configuration")]
    Missing(String),
    #[error("option `{name}` should be a {expected} but is a {actual}")]
    WrongKind {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("option `{name}` is {value}, which is outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Final typed value for every option of a schema, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    values: Vec<(&'static str, OptionValue)>,
}

impl ResolvedConfig {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    #[allow(dead_code)]
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, name: &str, expected: ValueKind) -> Result<&OptionValue, ResolveError> {
        let value = self
            .get(name)
            .ok_or_else(|| ResolveError::Missing(name.to_string()))?;
        if value.kind() != expected {
            return Err(ResolveError::WrongKind {
                name: name.to_string(),
                expected,
                actual: value.kind(),
            });
        }
        Ok(value)
    }

    fn flag(&self, name: &str) -> Result<bool, ResolveError> {
        match self.require(name, ValueKind::Boolean)? {
            OptionValue::Boolean(value) => Ok(*value),
            _ => unreachable!("kind checked by require"),
        }
    }

    fn string_list(&self, name: &str) -> Result<&[String], ResolveError> {
        match self.require(name, ValueKind::StringList)? {
            OptionValue::StringList(values) => Ok(values),
            _ => unreachable!("kind checked by require"),
        }
    }

    fn path_list(&self, name: &str) -> Result<&[PathBuf], ResolveError> {
        match self.require(name, ValueKind::PathList)? {
            OptionValue::PathList(values) => Ok(values),
            _ => unreachable!("kind checked by require"),
        }
    }

    pub fn port(&self) -> Result<u16, ResolveError> {
        match self.require("port", ValueKind::Number)? {
            OptionValue::Number(port) => {
                u16::try_from(*port).map_err(|_| ResolveError::OutOfRange {
                    name: "port".to_string(),
                    value: *port,
                    min: 0,
                    max: u64::from(u16::MAX),
                })
            }
            _ => unreachable!("kind checked by require"),
        }
    }

    pub fn host(&self) -> Result<&str, ResolveError> {
        match self.require("host", ValueKind::String)? {
            OptionValue::String(host) => Ok(host),
            _ => unreachable!("kind checked by require"),
        }
    }

    /// Extra roots given with `--root`.
    pub fn root(&self) -> Result<&[PathBuf], ResolveError> {
        self.path_list("root")
    }

    pub fn project_roots(&self) -> Result<&[String], ResolveError> {
        self.string_list("projectRoots")
    }

    pub fn asset_roots(&self) -> Result<&[PathBuf], ResolveError> {
        self.path_list("assetRoots")
    }

    pub fn asset_exts(&self) -> Result<&[String], ResolveError> {
        self.string_list("assetExts")
    }

    pub fn transformer(&self) -> Result<&Path, ResolveError> {
        match self.require("transformer", ValueKind::Path)? {
            OptionValue::Path(path) => Ok(path),
            _ => unreachable!("kind checked by require"),
        }
    }

    pub fn skipflow(&self) -> Result<bool, ResolveError> {
        self.flag("skipflow")
    }

    pub fn non_persistent(&self) -> Result<bool, ResolveError> {
        self.flag("nonPersistent")
    }

    pub fn reset_cache(&self) -> Result<bool, ResolveError> {
        self.flag("resetCache")
    }

    pub fn verbose(&self) -> Result<bool, ResolveError> {
        self.flag("verbose")
    }
}

impl Serialize for ResolvedConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Resolve every option in `schema`.
///
/// Supplied values go through the option's parser; missing ones fall back to
/// the default, which may consult `project_config`. The first parse failure
/// aborts resolution. Relative paths are resolved against `cwd`.
pub fn resolve(
    raw: &RawArgs,
    schema: &[OptionSpec],
    project_config: &dyn ProjectConfig,
    cwd: &Path,
) -> Result<ResolvedConfig, ParseError> {
    for name in raw.keys() {
        if !schema.iter().any(|spec| spec.name == name) {
            warn!("Ignoring unknown option `{}`", name);
        }
    }

    let mut values = Vec::with_capacity(schema.len());

    for spec in schema {
        let value = match raw.get(spec.name) {
            Some(text) => {
                let parsed = match spec.parser {
                    Some(parser) => parser(text, cwd),
                    None => parse_flag(text),
                };
                parsed.map_err(|reason| ParseError::new(spec.name, text.as_str(), reason))?
            }
            None => {
                debug!("Option `{}` not supplied, using default", spec.name);
                spec.default.evaluate(project_config)
            }
        };
        values.push((spec.name, value));
    }

    Ok(ResolvedConfig { values })
}
