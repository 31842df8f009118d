//! Startup orchestration for the packager server.
//!
//! This module prints the startup banner, launches the server through a
//! [`ServerLauncher`](crate::server::ServerLauncher) and turns the single
//! launch outcome into either a running server or a classified
//! `StartupFailure` with remediation text:
//! - `PortInUse` - the port is bound by another process
//! - `Generic` - anything else, reported with attributes and stack trace
//!
//! Every failure is fatal; the caller exits with status 1.

mod banner;
mod failure;
mod hook;
mod orchestrator;
#[cfg(test)]
mod tests;

pub use failure::LaunchError;
#[cfg(test)]
pub use hook::failure_channel;
pub use hook::FailureSender;
pub use orchestrator::{Orchestrator, StartupOutcome};
