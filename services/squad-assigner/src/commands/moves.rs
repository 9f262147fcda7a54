//! Manual assignment override.

use anyhow::{Context, Result};
use clap::Args;
use squad_assigner::store::RosterStore;
use squad_catalog::PositionKey;
use squad_id::{AssignmentId, RosterId};

use super::CommandContext;
use crate::output::{print_single, print_success};

#[derive(Debug, Args)]
pub struct MoveArgs {
    /// Assignment to move.
    #[arg(long)]
    assignment: AssignmentId,

    /// Target squad.
    #[arg(long)]
    roster: RosterId,

    /// Target position, as a canonical key.
    #[arg(long)]
    position: String,
}

pub async fn run(ctx: CommandContext, args: MoveArgs) -> Result<()> {
    let position: PositionKey = args
        .position
        .parse()
        .map_err(anyhow::Error::msg)
        .context("--position must be a canonical position key")?;

    let db = ctx.database().await?;
    let assignment = db
        .roster_store()
        .move_assignment(args.assignment, args.roster, position)
        .await?;

    print_success(&format!(
        "Moved {} to {} #{}.",
        assignment.member_id, assignment.position, assignment.jersey_number
    ));
    print_single(&assignment);
    Ok(())
}
