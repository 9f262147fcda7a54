//! Single placement command.

use anyhow::{bail, Result};
use clap::Args;
use squad_assigner::context::RunContext;
use squad_assigner::intake::{PlacementTask, TaskOutcome};

use super::CommandContext;
use crate::output::{print_info, print_single};

#[derive(Debug, Args)]
pub struct AssignArgs {
    /// Member ID.
    #[arg(long)]
    member: String,

    /// Member's birth year.
    #[arg(long)]
    birth_year: i32,

    /// Preferred position (canonical key or label).
    #[arg(long)]
    primary: String,

    /// Fallback position.
    #[arg(long)]
    secondary: Option<String>,
}

pub async fn run(ctx: CommandContext, args: AssignArgs) -> Result<()> {
    let db = ctx.database().await?;
    let intake = ctx.intake(&db);
    let run_ctx = RunContext::new();

    let task = PlacementTask {
        member_id: args.member,
        birth_year: args.birth_year,
        primary_position_key: args.primary,
        secondary_position_key: args.secondary,
    };

    match intake.handle(&run_ctx, &task).await {
        TaskOutcome::Completed(report) => {
            print_single(&report);
            Ok(())
        }
        TaskOutcome::Paused => {
            print_info("Squad assignment is paused; nothing was placed.");
            Ok(())
        }
        TaskOutcome::Skipped { reason } => {
            print_info(&format!("Skipped: {reason}."));
            Ok(())
        }
        TaskOutcome::Failed { report, retryable } => {
            print_single(&report);
            let kind = report.error_kind.unwrap_or_default();
            if retryable {
                bail!("placement failed with {kind} (retryable), request {}", run_ctx.request_id)
            }
            bail!("placement failed with {kind}, request {}", run_ctx.request_id)
        }
    }
}
