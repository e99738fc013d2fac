//! xfercheck entry point.

mod cli;
mod commands;
mod config;
mod oracle;
mod transfer;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: cli::Cli) -> anyhow::Result<bool> {
    let config = config::Config::load(cli.config.as_deref())?;

    // Logs go to stderr so stdout stays parseable with --json.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting xfercheck");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::run(cli.command, &config, cli.json))
}
