//! Migration command.

use anyhow::Result;
use squad_assigner::db::Database;

use super::CommandContext;
use crate::output::print_success;

pub async fn run(ctx: CommandContext) -> Result<()> {
    let db = Database::connect(&ctx.config.database).await?;
    db.run_migrations().await?;
    db.health_check().await?;
    print_success("Database migrations applied.");
    Ok(())
}
