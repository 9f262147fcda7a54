//! squad-assigner
//!
//! Operator entry point for squad auto-assignment: runs migrations, places
//! members, drains task files through the intake worker, lists squads, and
//! flips the placement kill switch.

use anyhow::Result;
use clap::Parser;
use squad_assigner::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to SQUAD_LOG_LEVEL. Logs go to stderr so
    // command output on stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    if let Err(e) = cli.run(config).await {
        output::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
