//! Failure channel between the server and the orchestrator.
//!
//! Launchers and their background tasks report errors through a
//! [`FailureSender`]. Panics anywhere in the process are routed into the
//! current channel by a panic hook that is installed at most once.

use std::backtrace::Backtrace;
use std::sync::{Mutex, OnceLock};

use tokio::sync::mpsc;
use tracing::debug;

use super::failure::LaunchError;

/// Reporting half of the failure channel.
#[derive(Debug, Clone)]
pub struct FailureSender(mpsc::UnboundedSender<LaunchError>);

impl FailureSender {
    /// Report an error. Reports made after the orchestrator stopped listening are dropped.
    pub fn report(&self, error: LaunchError) {
        if let Err(mpsc::error::SendError(error)) = self.0.send(error) {
            debug!("Dropping failure reported after shutdown: {}", error);
        }
    }
}

/// Listening half of the failure channel.
#[derive(Debug)]
pub struct FailureReceiver(mpsc::UnboundedReceiver<LaunchError>);

impl FailureReceiver {
    /// Wait for the next reported error. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<LaunchError> {
        self.0.recv().await
    }
}

pub fn failure_channel() -> (FailureSender, FailureReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FailureSender(tx), FailureReceiver(rx))
}

/// Where the panic hook forwards panics.
static PANIC_ROUTE: OnceLock<Mutex<Option<FailureSender>>> = OnceLock::new();

/// Route panics to `sender`.
///
/// The process-wide hook is installed on the first call only; later calls
/// just swap the destination. Returns `true` if this call installed the hook.
pub fn route_panics_to(sender: FailureSender) -> bool {
    let mut installed = false;
    let route = PANIC_ROUTE.get_or_init(|| {
        install_hook();
        installed = true;
        Mutex::new(None)
    });

    match route.lock() {
        Ok(mut slot) => *slot = Some(sender),
        Err(poisoned) => *poisoned.into_inner() = Some(sender),
    }
    installed
}

fn install_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);

        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        let location = info.location().map(|l| l.to_string());
        let error = LaunchError::from_panic(
            &message,
            location,
            Backtrace::force_capture().to_string(),
        );

        // try_lock: a panic while the route is being swapped must not deadlock
        if let Some(route) = PANIC_ROUTE.get() {
            if let Ok(slot) = route.try_lock() {
                if let Some(sender) = slot.as_ref() {
                    sender.report(error);
                }
            }
        }
    }));
}
