//! Parsers from raw command-line text to typed option values.

use std::path::Path;

use thiserror::Error;

use super::schema::OptionValue;
use crate::cli::paths::absolutize;

/// A raw option value that could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {raw:?} for option `{option}`: {reason}")]
pub struct ParseError {
    pub option: String,
    pub raw: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(option: impl Into<String>, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

/// Parse a TCP port. Anything other than an integer in `0..=65535` is rejected.
pub fn parse_port(raw: &str, _cwd: &Path) -> Result<OptionValue, String> {
    raw.trim()
        .parse::<u16>()
        .map(|port| OptionValue::Number(u64::from(port)))
        .map_err(|e| format!("expected a port number: {}", e))
}

pub fn parse_string(raw: &str, _cwd: &Path) -> Result<OptionValue, String> {
    Ok(OptionValue::String(raw.to_string()))
}

/// Split on commas, keeping segments verbatim.
pub fn parse_string_list(raw: &str, _cwd: &Path) -> Result<OptionValue, String> {
    Ok(OptionValue::StringList(
        raw.split(',').map(str::to_string).collect(),
    ))
}

pub fn parse_path(raw: &str, cwd: &Path) -> Result<OptionValue, String> {
    Ok(OptionValue::Path(absolutize(cwd, raw)))
}

/// Split on commas and resolve each segment against `cwd`.
pub fn parse_path_list(raw: &str, cwd: &Path) -> Result<OptionValue, String> {
    Ok(OptionValue::PathList(
        raw.split(',').map(|segment| absolutize(cwd, segment)).collect(),
    ))
}

/// Interpret a boolean flag. An empty value counts as presence.
pub fn parse_flag(raw: &str) -> Result<OptionValue, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(OptionValue::Boolean(true)),
        "false" | "0" | "no" => Ok(OptionValue::Boolean(false)),
        other => Err(format!("expected a boolean, got {:?}", other)),
    }
}
