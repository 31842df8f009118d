//! Startup state machine.
//!
//! ```text
//! Idle ──start()──▶ Starting ──launch ok──────────▶ Ready
//!                       └──────launch error/report──▶ Failed
//! ```
//!
//! One launch attempt is modelled as a single await on whichever comes first:
//! the launcher's result or the first error reported on the failure channel.
//! Failures are classified and reported, never retried.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::banner::{roots_listing, startup_banner};
use super::failure::{classify, write_failure, StartupFailure};
use super::hook::{failure_channel, route_panics_to, FailureReceiver};
use crate::roots::RootSet;
use crate::server::{ServerConfig, ServerHandle, ServerLauncher};

/// Notice written once the server is up.
pub const READY_NOTICE: &str = "\nReact packager ready.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Idle,
    Starting,
    Ready,
    Failed,
}

/// `start` was called on an orchestrator that already ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("startup already attempted (state: {0:?})")]
pub struct AlreadyStarted(pub StartupState);

/// Result of a launch attempt.
#[derive(Debug)]
pub enum StartupOutcome {
    Ready(RunningServer),
    Failed(StartupFailure),
}

/// A started server together with the channel still reporting its failures.
#[derive(Debug)]
pub struct RunningServer {
    port: u16,
    handle: ServerHandle,
    failures: FailureReceiver,
}

impl RunningServer {
    pub fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    /// Run until Ctrl-C or until a failure is reported.
    ///
    /// A reported failure is written to `out` and `err` and returned.
    pub async fn wait<W: Write, E: Write>(
        self,
        out: &mut W,
        err: &mut E,
    ) -> Option<StartupFailure> {
        let RunningServer {
            port,
            handle,
            mut failures,
        } = self;

        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutting down packager");
                handle.stop();
                None
            }
            Some(reported) = failures.recv() => {
                error!("Packager failed after startup: {}", reported);
                let failure = classify(reported, port);
                if let Err(e) = write_failure(&failure, out, err) {
                    warn!("Failed to write failure report: {}", e);
                }
                handle.stop();
                Some(failure)
            }
        }
    }
}

/// Drives one startup attempt.
///
/// Operator-facing text goes to `out`; error attributes and stack traces go
/// to `err`, stderr unless replaced with [`Orchestrator::with_err`].
pub struct Orchestrator<W, E = io::Stderr> {
    port: u16,
    roots: RootSet,
    out: W,
    err: E,
    state: StartupState,
    route_panics: bool,
}

impl<W: Write> Orchestrator<W> {
    pub fn new(port: u16, roots: RootSet, out: W) -> Self {
        Self {
            port,
            roots,
            out,
            err: io::stderr(),
            state: StartupState::Idle,
            route_panics: true,
        }
    }
}

impl<W: Write, E: Write> Orchestrator<W, E> {
    /// Send error details to `err` instead.
    #[allow(dead_code)]
    pub fn with_err<E2: Write>(self, err: E2) -> Orchestrator<W, E2> {
        Orchestrator {
            port: self.port,
            roots: self.roots,
            out: self.out,
            err,
            state: self.state,
            route_panics: self.route_panics,
        }
    }

    /// Do not forward process panics into this attempt's failure channel.
    #[allow(dead_code)]
    pub fn without_panic_routing(mut self) -> Self {
        self.route_panics = false;
        self
    }

    pub fn state(&self) -> StartupState {
        self.state
    }

    #[allow(dead_code)]
    pub fn output(&self) -> &W {
        &self.out
    }

    #[allow(dead_code)]
    pub fn err_output(&self) -> &E {
        &self.err
    }

    /// Launch the server once and wait for the outcome.
    pub async fn start<L: ServerLauncher>(
        &mut self,
        launcher: &L,
        config: &ServerConfig,
    ) -> Result<StartupOutcome, AlreadyStarted> {
        if self.state != StartupState::Idle {
            return Err(AlreadyStarted(self.state));
        }
        self.transition(StartupState::Starting);

        self.say(&startup_banner(self.port));
        self.say(&roots_listing(&self.roots));

        let (sender, mut receiver) = failure_channel();
        if self.route_panics && route_panics_to(sender.clone()) {
            debug!("Installed process panic hook");
        }

        let launched = tokio::select! {
            result = launcher.launch(config, sender) => result,
            Some(err) = receiver.recv() => Err(err),
        };

        match launched {
            Ok(handle) => {
                self.transition(StartupState::Ready);
                self.say(READY_NOTICE);
                Ok(StartupOutcome::Ready(RunningServer {
                    port: self.port,
                    handle,
                    failures: receiver,
                }))
            }
            Err(err) => {
                error!("Packager failed to start: {}", err);
                let failure = classify(err, self.port);
                if let Err(e) = write_failure(&failure, &mut self.out, &mut self.err) {
                    warn!("Failed to write failure report: {}", e);
                }
                self.transition(StartupState::Failed);
                Ok(StartupOutcome::Failed(failure))
            }
        }
    }

    fn transition(&mut self, next: StartupState) {
        debug!("Startup state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn say(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            warn!("Failed to write startup output: {}", e);
        }
    }
}
