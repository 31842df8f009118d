//! Declarative option catalog for the `start` command.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::parse::{parse_path, parse_path_list, parse_port, parse_string, parse_string_list};
use crate::config::ProjectConfig;

/// File name of the transformer shipped next to the executable.
pub const BUILTIN_TRANSFORMER: &str = "transformer.js";

/// Default port the packager listens on.
pub const DEFAULT_PORT: u16 = 8081;

/// Kind of value an option carries once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Number,
    String,
    StringList,
    Boolean,
    Path,
    PathList,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::StringList => "list of strings",
            ValueKind::Boolean => "boolean",
            ValueKind::Path => "path",
            ValueKind::PathList => "list of paths",
        };
        f.write_str(name)
    }
}

impl ValueKind {
    /// Placeholder shown for the option's value in `--help`.
    pub fn placeholder(self) -> &'static str {
        match self {
            ValueKind::Number => "NUMBER",
            ValueKind::String => "STRING",
            ValueKind::StringList | ValueKind::PathList => "LIST",
            ValueKind::Boolean => "",
            ValueKind::Path => "PATH",
        }
    }
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Number(u64),
    String(String),
    StringList(Vec<String>),
    Boolean(bool),
    Path(PathBuf),
    PathList(Vec<PathBuf>),
}

impl OptionValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            OptionValue::Number(_) => ValueKind::Number,
            OptionValue::String(_) => ValueKind::String,
            OptionValue::StringList(_) => ValueKind::StringList,
            OptionValue::Boolean(_) => ValueKind::Boolean,
            OptionValue::Path(_) => ValueKind::Path,
            OptionValue::PathList(_) => ValueKind::PathList,
        }
    }
}

/// Converts a raw command-line string into a typed value.
///
/// Relative paths are resolved against the working directory passed in.
/// The `Err` string is a human-readable reason.
pub type ParseFn = fn(raw: &str, cwd: &Path) -> Result<OptionValue, String>;

/// Computes a default from the project configuration.
pub type DeriveFn = fn(&dyn ProjectConfig) -> OptionValue;

/// How an option obtains its value when the caller did not supply one.
#[derive(Clone)]
pub enum DefaultRule {
    Literal(OptionValue),
    Derived(DeriveFn),
}

impl fmt::Debug for DefaultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultRule::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultRule::Derived(_) => f.write_str("Derived(<project config>)"),
        }
    }
}

impl DefaultRule {
    pub fn evaluate(&self, project_config: &dyn ProjectConfig) -> OptionValue {
        match self {
            DefaultRule::Literal(value) => value.clone(),
            DefaultRule::Derived(derive) => derive(project_config),
        }
    }
}

/// One recognized option.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    /// Key used in raw arguments and in the resolved configuration
    pub name: &'static str,
    /// How the option is written on the command line
    pub command_form: &'static str,
    pub value_kind: ValueKind,
    /// `None` for boolean flags, which are set by presence alone
    pub parser: Option<ParseFn>,
    pub default: DefaultRule,
    /// Help text of the command-line flag
    pub description: &'static str,
}

impl OptionSpec {
    pub fn valued(
        name: &'static str,
        command_form: &'static str,
        value_kind: ValueKind,
        parser: ParseFn,
        default: DefaultRule,
    ) -> Self {
        Self {
            name,
            command_form,
            value_kind,
            parser: Some(parser),
            default,
            description: "",
        }
    }

    pub fn flag(name: &'static str, command_form: &'static str) -> Self {
        Self {
            name,
            command_form,
            value_kind: ValueKind::Boolean,
            parser: None,
            default: DefaultRule::Literal(OptionValue::Boolean(false)),
            description: "",
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Long flag names spelled in `command_form`, primary spelling first.
    ///
    /// `"--reset-cache, --resetCache"` gives `["reset-cache", "resetCache"]`.
    pub fn long_names(&self) -> Vec<&'static str> {
        self.command_form
            .split(',')
            .filter_map(|form| form.split_whitespace().next())
            .filter_map(|flag| flag.strip_prefix("--"))
            .filter(|long| !long.is_empty())
            .collect()
    }
}

/// Structural problems in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("option `{0}` is declared more than once")]
    DuplicateName(&'static str),
    #[error("option `{name}` has command form {form:?}, which does not start with `--`")]
    InvalidCommandForm {
        name: &'static str,
        form: &'static str,
    },
    #[error("option `{name}` is a {kind} but has no parser")]
    MissingParser {
        name: &'static str,
        kind: ValueKind,
    },
    #[error("option `{name}` is a {expected} but its default is a {actual}")]
    DefaultKindMismatch {
        name: &'static str,
        expected: ValueKind,
        actual: ValueKind,
    },
}

/// Check that a schema is well formed.
///
/// Names are unique, every spelling in a command form starts with `--`,
/// non-boolean options have a parser and literal defaults match the
/// declared kind.
pub fn validate_schema(schema: &[OptionSpec]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();

    for spec in schema {
        if !seen.insert(spec.name) {
            return Err(SchemaError::DuplicateName(spec.name));
        }

        let spellings = spec.command_form.split(',').count();
        if spec.long_names().len() != spellings {
            return Err(SchemaError::InvalidCommandForm {
                name: spec.name,
                form: spec.command_form,
            });
        }

        if spec.parser.is_none() && spec.value_kind != ValueKind::Boolean {
            return Err(SchemaError::MissingParser {
                name: spec.name,
                kind: spec.value_kind,
            });
        }

        if let DefaultRule::Literal(value) = &spec.default {
            if value.kind() != spec.value_kind {
                return Err(SchemaError::DefaultKindMismatch {
                    name: spec.name,
                    expected: spec.value_kind,
                    actual: value.kind(),
                });
            }
        }
    }

    Ok(())
}

/// Path of the transformer bundled with this executable.
pub fn builtin_transformer_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(BUILTIN_TRANSFORMER)))
        .unwrap_or_else(|| PathBuf::from(BUILTIN_TRANSFORMER))
}

fn derive_project_roots(config: &dyn ProjectConfig) -> OptionValue {
    OptionValue::StringList(config.project_roots())
}

fn derive_asset_roots(config: &dyn ProjectConfig) -> OptionValue {
    OptionValue::PathList(config.asset_roots())
}

fn derive_asset_exts(config: &dyn ProjectConfig) -> OptionValue {
    OptionValue::StringList(config.asset_exts())
}

/// Options accepted by `packager start`, in declaration order.
pub fn start_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::valued(
            "port",
            "--port [number]",
            ValueKind::Number,
            parse_port,
            DefaultRule::Literal(OptionValue::Number(u64::from(DEFAULT_PORT))),
        )
        .describe("port to listen on"),
        OptionSpec::valued(
            "host",
            "--host [string]",
            ValueKind::String,
            parse_string,
            DefaultRule::Literal(OptionValue::String(String::new())),
        )
        .describe("host to bind, all interfaces when empty"),
        OptionSpec::valued(
            "root",
            "--root [list]",
            ValueKind::PathList,
            parse_path_list,
            DefaultRule::Literal(OptionValue::PathList(Vec::new())),
        )
        .describe("add another root(s) to be used by the packager in this project"),
        OptionSpec::valued(
            "projectRoots",
            "--projectRoots [list]",
            ValueKind::StringList,
            parse_string_list,
            DefaultRule::Derived(derive_project_roots),
        )
        .describe("override the root(s) to be used by the packager"),
        OptionSpec::valued(
            "assetRoots",
            "--assetRoots [list]",
            ValueKind::PathList,
            parse_path_list,
            DefaultRule::Derived(derive_asset_roots),
        )
        .describe("specify the root directories of app assets"),
        OptionSpec::valued(
            "assetExts",
            "--assetExts [list]",
            ValueKind::StringList,
            parse_string_list,
            DefaultRule::Derived(derive_asset_exts),
        )
        .describe("specify any additional asset extensions to be used by the packager"),
        OptionSpec::flag("skipflow", "--skipflow").describe("disable flow checks"),
        OptionSpec::flag("nonPersistent", "--nonPersistent").describe("disable file watcher"),
        OptionSpec::valued(
            "transformer",
            "--transformer [string]",
            ValueKind::Path,
            parse_path,
            DefaultRule::Literal(OptionValue::Path(builtin_transformer_path())),
        )
        .describe("specify a custom transformer to be used (absolute path)"),
        OptionSpec::flag("resetCache", "--reset-cache, --resetCache")
            .describe("removes cached files"),
        OptionSpec::flag("verbose", "--verbose").describe("enables logging"),
    ]
}
