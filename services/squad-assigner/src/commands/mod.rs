//! Operator commands.

mod assign;
mod drain;
mod migrate;
mod moves;
mod positions;
mod rosters;
mod switch;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use squad_assigner::assign::AssignmentOrchestrator;
use squad_assigner::config::Config;
use squad_assigner::db::Database;
use squad_assigner::intake::TaskIntake;
use tracing::info;

use crate::output::OutputFormat;

/// Squad auto-assignment operator CLI.
#[derive(Debug, Parser)]
#[command(name = "squad-assigner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,

    /// Place one member through task intake and print the report.
    Assign(assign::AssignArgs),

    /// Run a file of placement tasks through the intake worker.
    Drain(drain::DrainArgs),

    /// List the squads of a birth year in placement order.
    Rosters(rosters::RostersArgs),

    /// Show the positions and jersey numbers for a birth year.
    Positions(positions::PositionsArgs),

    /// Pause automatic placement.
    Pause,

    /// Resume automatic placement.
    Resume,

    /// Move an assignment to another squad or position.
    Move(moves::MoveArgs),
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self, config: Config) -> Result<()> {
        let ctx = CommandContext {
            config,
            format: self.format,
        };

        match self.command {
            Commands::Migrate => migrate::run(ctx).await,
            Commands::Assign(args) => assign::run(ctx, args).await,
            Commands::Drain(args) => drain::run(ctx, args).await,
            Commands::Rosters(args) => rosters::run(ctx, args).await,
            Commands::Positions(args) => positions::run(ctx, args),
            Commands::Pause => switch::run(ctx, true).await,
            Commands::Resume => switch::run(ctx, false).await,
            Commands::Move(args) => moves::run(ctx, args).await,
        }
    }
}

/// Shared state for command handlers.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Connects to the database, migrating first in dev mode.
    pub async fn database(&self) -> Result<Database> {
        let db = Database::connect(&self.config.database).await?;
        if self.config.dev_mode {
            info!("Running database migrations (dev mode)");
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Task intake wired to Postgres.
    pub fn intake(&self, db: &Database) -> TaskIntake {
        let orchestrator = AssignmentOrchestrator::new(
            Arc::new(db.roster_store()),
            self.config.orchestrator.clone(),
        );
        TaskIntake::new(
            orchestrator,
            Arc::new(db.member_directory()),
            Arc::new(db.assignment_switch()),
        )
    }
}
