//! Position catalog command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use squad_catalog::{positions_for_template, template_for_birth_year};
use tabled::Tabled;

use super::CommandContext;
use crate::output::print_output;

#[derive(Debug, Args)]
pub struct PositionsArgs {
    /// Birth year that selects the template.
    #[arg(long)]
    birth_year: i32,
}

#[derive(Debug, Serialize, Tabled)]
struct PositionRow {
    #[tabled(rename = "Template")]
    template: &'static str,

    #[tabled(rename = "Position")]
    position: &'static str,

    #[tabled(rename = "Jersey")]
    jersey_number: u8,
}

pub fn run(ctx: CommandContext, args: PositionsArgs) -> Result<()> {
    let template = template_for_birth_year(args.birth_year)?;
    let rows: Vec<PositionRow> = positions_for_template(template)
        .iter()
        .map(|slot| PositionRow {
            template: template.label(),
            position: slot.position.as_str(),
            jersey_number: slot.jersey_number,
        })
        .collect();
    print_output(&rows, ctx.format);
    Ok(())
}
