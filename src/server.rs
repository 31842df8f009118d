//! Launching the packager server.
//!
//! The orchestrator only needs a [`ServerLauncher`]: something that starts a
//! server for a [`ServerConfig`] and reports either a running handle or a
//! [`LaunchError`]. [`TcpLauncher`] is the production launcher; it prepares
//! the cache directory and binds the listening socket. Serving requests is
//! left to the bundler, so accepted connections are closed straight away.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::options::{ResolveError, ResolvedConfig};
use crate::roots::RootSet;
use crate::startup::{FailureSender, LaunchError};

/// Host used when `--host` is empty.
pub const ANY_HOST: &str = "0.0.0.0";

/// Cache directory name under the platform cache dir.
const CACHE_DIR_NAME: &str = "packager";

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub roots: RootSet,
    pub asset_roots: Vec<PathBuf>,
    pub asset_exts: Vec<String>,
    pub skipflow: bool,
    pub non_persistent: bool,
    pub transformer: PathBuf,
    pub reset_cache: bool,
    pub verbose: bool,
    pub cache_dir: PathBuf,
}

impl ServerConfig {
    /// Build from a resolved configuration and the aggregated roots.
    ///
    /// `cache_dir` falls back to the platform cache directory.
    pub fn from_resolved(
        resolved: &ResolvedConfig,
        roots: RootSet,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            host: resolved.host()?.to_string(),
            port: resolved.port()?,
            roots,
            asset_roots: resolved.asset_roots()?.to_vec(),
            asset_exts: resolved.asset_exts()?.to_vec(),
            skipflow: resolved.skipflow()?,
            non_persistent: resolved.non_persistent()?,
            transformer: resolved.transformer()?.to_path_buf(),
            reset_cache: resolved.reset_cache()?,
            verbose: resolved.verbose()?,
            cache_dir: cache_dir.unwrap_or_else(default_cache_dir),
        })
    }

    /// `host:port` to bind. An empty host binds every interface.
    pub fn bind_address(&self) -> String {
        let host = if self.host.is_empty() {
            ANY_HOST
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
    }
}

/// Platform cache directory for the packager, or a temp dir fallback.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

/// A server that finished starting.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn new(local_addr: SocketAddr, task: JoinHandle<()>) -> Self {
        Self {
            local_addr,
            task: Some(task),
        }
    }

    /// A handle with no background task.
    #[allow(dead_code)]
    pub fn detached(local_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            task: None,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the background task, if any.
    pub fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Starts a server.
///
/// Errors from work that outlives `launch` go to `failures`.
pub trait ServerLauncher {
    fn launch(
        &self,
        config: &ServerConfig,
        failures: FailureSender,
    ) -> impl Future<Output = Result<ServerHandle, LaunchError>> + Send;
}

/// Binds a TCP listener for the packager.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpLauncher;

impl ServerLauncher for TcpLauncher {
    async fn launch(
        &self,
        config: &ServerConfig,
        failures: FailureSender,
    ) -> Result<ServerHandle, LaunchError> {
        if config.reset_cache {
            reset_cache(&config.cache_dir).map_err(|e| {
                LaunchError::from_io(&e).with_attribute("path", config.cache_dir.display())
            })?;
        }
        std::fs::create_dir_all(&config.cache_dir).map_err(|e| {
            LaunchError::from_io(&e).with_attribute("path", config.cache_dir.display())
        })?;

        if config.non_persistent {
            debug!("File watcher disabled (--nonPersistent)");
        }
        if config.skipflow {
            debug!("Flow checks disabled (--skipflow)");
        }
        debug!("Transformer: {}", config.transformer.display());
        debug!(
            "Serving {} root(s), {} asset root(s), extra asset extensions {:?}, verbose: {}",
            config.roots.len(),
            config.asset_roots.len(),
            config.asset_exts,
            config.verbose
        );

        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| LaunchError::from_io(&e).with_attribute("address", &address))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| LaunchError::from_io(&e))?;
        info!("Listening on {}", local_addr);

        let task = tokio::spawn(accept_loop(listener, failures));
        Ok(ServerHandle::new(local_addr, task))
    }
}

async fn accept_loop(listener: TcpListener, failures: FailureSender) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Connection from {} closed: no request handler attached", peer);
                drop(stream);
            }
            Err(e) => {
                failures.report(LaunchError::from_io(&e));
                return;
            }
        }
    }
}

/// Remove everything under `cache_dir`. A missing directory is not an error.
pub fn reset_cache(cache_dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(cache_dir) {
        Ok(()) => {
            info!("Removed cache at {}", cache_dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
