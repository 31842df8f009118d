//! Classification and reporting of startup failures.

use std::backtrace::Backtrace;
use std::fmt;
use std::io::{self, Write};

/// Machine code of the "address already in use" socket error.
pub const ADDR_IN_USE_CODE: &str = "EADDRINUSE";

/// General troubleshooting guide appended to every failure report.
pub const TROUBLESHOOTING_URL: &str = "https://reactnative.dev/docs/troubleshooting";

/// An error surfaced while launching the server or by one of its tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchError {
    /// Platform error code such as `EADDRINUSE`, when one is known
    pub code: Option<String>,
    pub message: String,
    /// Extra facts about the error, in insertion order
    pub attributes: Vec<(String, String)>,
    pub stack_trace: String,
}

impl LaunchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            attributes: Vec::new(),
            stack_trace: String::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = stack_trace.into();
        self
    }

    /// Build from an I/O error, mapping well-known kinds to their errno names.
    pub fn from_io(error: &io::Error) -> Self {
        let mut launch_error = Self::new(error.to_string())
            .with_attribute("kind", format!("{:?}", error.kind()))
            .with_stack_trace(Backtrace::force_capture().to_string());

        if let Some(code) = io_error_code(error.kind()) {
            launch_error = launch_error.with_code(code);
        }
        if let Some(errno) = error.raw_os_error() {
            launch_error = launch_error.with_attribute("errno", errno);
        }
        launch_error
    }

    /// Build from a panic payload caught by the panic hook.
    pub fn from_panic(message: &str, location: Option<String>, backtrace: String) -> Self {
        let mut launch_error =
            Self::new(format!("panic: {}", message)).with_stack_trace(backtrace);
        if let Some(location) = location {
            launch_error = launch_error.with_attribute("location", location);
        }
        launch_error
    }

    pub fn is_addr_in_use(&self) -> bool {
        self.code.as_deref() == Some(ADDR_IN_USE_CODE)
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for LaunchError {}

fn io_error_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::AddrInUse => Some(ADDR_IN_USE_CODE),
        io::ErrorKind::AddrNotAvailable => Some("EADDRNOTAVAIL"),
        io::ErrorKind::PermissionDenied => Some("EACCES"),
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        _ => None,
    }
}

/// Why startup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFailure {
    /// The configured port is bound by another process
    PortInUse { port: u16 },
    /// Any other failure
    Generic {
        message: String,
        attributes: Vec<(String, String)>,
        stack_trace: String,
    },
}

/// Classify a launch error for a server configured on `port`.
pub fn classify(error: LaunchError, port: u16) -> StartupFailure {
    if error.is_addr_in_use() {
        return StartupFailure::PortInUse { port };
    }

    StartupFailure::Generic {
        message: error.message,
        attributes: error.attributes,
        stack_trace: error.stack_trace,
    }
}

/// Write the operator-facing report for `failure`.
///
/// Remediation text and the troubleshooting link go to `out`. The error
/// attributes and stack trace of a generic failure go to `err`.
pub fn write_failure<O: Write, E: Write>(
    failure: &StartupFailure,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    match failure {
        StartupFailure::PortInUse { port } => {
            writeln!(out, " ERROR  Packager can't listen on port {}", port)?;
            writeln!(out, "Most likely another process is already using this port")?;
            writeln!(out, "Run the following command to find out which process:")?;
            writeln!(out, "\n   lsof -n -i4TCP:{} \n", port)?;
            writeln!(out, "You can either shut down the other process:")?;
            writeln!(out, "\n   kill -9 <PID> \n")?;
            writeln!(out, "or run packager on different port, for example with --port.")?;
        }
        StartupFailure::Generic {
            message,
            attributes,
            stack_trace,
        } => {
            writeln!(out, " ERROR  {}", message)?;
            out.flush()?;
            if !attributes.is_empty() {
                writeln!(err, "{}", render_attributes(attributes))?;
            }
            if !stack_trace.is_empty() {
                writeln!(err, "{}", stack_trace.trim_end())?;
            }
            err.flush()?;
        }
    }

    writeln!(out, "\nSee {}", TROUBLESHOOTING_URL)?;
    writeln!(out, "for common problems and solutions.")?;
    out.flush()
}

fn render_attributes(attributes: &[(String, String)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = attributes
        .iter()
        .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
        .collect();
    serde_json::Value::Object(map).to_string()
}
