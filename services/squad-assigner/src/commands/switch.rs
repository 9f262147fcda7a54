//! Kill switch commands.

use anyhow::Result;

use super::CommandContext;
use crate::output::print_success;

pub async fn run(ctx: CommandContext, paused: bool) -> Result<()> {
    let db = ctx.database().await?;
    db.assignment_switch().set_paused(paused).await?;
    if paused {
        print_success("Squad assignment paused. Queued tasks will be acknowledged without placement.");
    } else {
        print_success("Squad assignment resumed.");
    }
    Ok(())
}
