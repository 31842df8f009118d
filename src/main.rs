use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;
mod config;
mod options;
mod roots;
mod server;
mod startup;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => {
            // Initialize logging
            let filter = if args.verbose() {
                EnvFilter::new("debug")
            } else {
                EnvFilter::new("info")
            };

            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();

            let code = command::run_start(args).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
