use anyhow::{Context, Result};
use std::io;
use tracing::{debug, info};

use crate::cli::StartArgs;
use crate::config::FileProjectConfig;
use crate::options::{resolve, start_options, validate_schema};
use crate::roots::aggregate_with_symlinks;
use crate::server::{ServerConfig, TcpLauncher};
use crate::startup::{Orchestrator, StartupOutcome};

/// Exit status for a failed startup.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Run `packager start`. Returns the process exit status.
pub async fn run_start(args: StartArgs) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let project_config = FileProjectConfig::load(args.config.as_deref(), &cwd)?;
    debug!("Project directory: {}", project_config.base_dir().display());

    let schema = start_options();
    validate_schema(&schema)?;
    let resolved = resolve(args.raw_args(), &schema, &project_config, &cwd)?;
    debug!("Resolved options: {}", serde_json::to_string(&resolved)?);

    let dependency_root = project_config.dependency_root();
    let roots = aggregate_with_symlinks(&resolved, &dependency_root)?;
    info!("Aggregated {} project root(s)", roots.len());

    let config = ServerConfig::from_resolved(&resolved, roots.clone(), project_config.cache_dir())?;

    let mut orchestrator = Orchestrator::new(config.port, roots, io::stdout());
    let outcome = orchestrator.start(&TcpLauncher, &config).await?;
    debug!("Startup finished in state {:?}", orchestrator.state());

    match outcome {
        StartupOutcome::Ready(running) => {
            info!("Packager listening on {}", running.handle().local_addr());
            match running.wait(&mut io::stdout(), &mut io::stderr()).await {
                Some(_) => Ok(FAILURE_EXIT_CODE),
                None => Ok(0),
            }
        }
        StartupOutcome::Failed(_) => Ok(FAILURE_EXIT_CODE),
    }
}
