//! Squad ranking.
//!
//! Candidates are ordered least-full first. Ties go to the older squad, then
//! to the lower instance letter, and finally to the ID so the order is total
//! even for hand-built inputs.

use std::cmp::Ordering;

use squad_catalog::{AgeGroupCode, Template};
use tracing::debug;

use crate::db::StoreResult;
use crate::model::RosterOccupancy;
use crate::store::RosterStore;

/// Compares two squads for placement preference.
pub fn compare(a: &RosterOccupancy, b: &RosterOccupancy) -> Ordering {
    // filled_a / cap_a vs filled_b / cap_b without floating point.
    let lhs = a.filled() as u64 * b.capacity() as u64;
    let rhs = b.filled() as u64 * a.capacity() as u64;

    lhs.cmp(&rhs)
        .then_with(|| a.roster.created_at.cmp(&b.roster.created_at))
        .then_with(|| a.roster.instance.cmp(&b.roster.instance))
        .then_with(|| a.roster.id.cmp(&b.roster.id))
}

/// Sorts squads into placement order.
pub fn rank(mut rosters: Vec<RosterOccupancy>) -> Vec<RosterOccupancy> {
    rosters.sort_by(compare);
    rosters
}

/// Loads a partition and returns it in placement order.
///
/// Always reads fresh state; nothing is cached between calls.
pub async fn list_rosters(
    store: &dyn RosterStore,
    age_group: &AgeGroupCode,
    template: Template,
) -> StoreResult<Vec<RosterOccupancy>> {
    let rosters = rank(store.load_partition(age_group, template).await?);
    debug!(
        age_group = %age_group,
        template = %template,
        rosters = rosters.len(),
        "Ranked squads"
    );
    Ok(rosters)
}
