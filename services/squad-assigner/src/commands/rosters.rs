//! Squad listing command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use squad_assigner::ranking::list_rosters;
use squad_catalog::{template_for_birth_year, AgeGroupCode};
use tabled::Tabled;

use super::CommandContext;
use crate::output::print_output;

#[derive(Debug, Args)]
pub struct RostersArgs {
    /// Birth year of the age group.
    #[arg(long)]
    birth_year: i32,
}

#[derive(Debug, Serialize, Tabled)]
struct RosterRow {
    #[tabled(rename = "Rank")]
    rank: usize,

    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "Filled")]
    filled: usize,

    #[tabled(rename = "Capacity")]
    capacity: usize,

    #[tabled(rename = "Free jerseys")]
    free_jerseys: String,

    #[tabled(rename = "Created")]
    created_at: String,
}

pub async fn run(ctx: CommandContext, args: RostersArgs) -> Result<()> {
    let template = template_for_birth_year(args.birth_year)?;
    let age_group = AgeGroupCode::for_birth_year(args.birth_year);

    let db = ctx.database().await?;
    let store = db.roster_store();
    let rosters = list_rosters(&store, &age_group, template).await?;

    let rows: Vec<RosterRow> = rosters
        .iter()
        .enumerate()
        .map(|(i, occupancy)| RosterRow {
            rank: i + 1,
            id: occupancy.roster.id.to_string(),
            name: occupancy.roster.name.clone(),
            filled: occupancy.filled(),
            capacity: occupancy.capacity(),
            free_jerseys: squad_catalog::positions_for_template(template)
                .iter()
                .filter(|slot| occupancy.is_slot_free(slot.jersey_number))
                .map(|slot| slot.jersey_number.to_string())
                .collect::<Vec<_>>()
                .join(","),
            created_at: occupancy.roster.created_at.to_rfc3339(),
        })
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}
