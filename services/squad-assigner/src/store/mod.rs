//! Storage seam for squads and assignments.
//!
//! The placement algorithm talks to storage only through [`RosterStore`].
//! Implementations must enforce the assignment invariants atomically at write
//! time, not in a preceding read:
//!
//! - one assignment per (squad, jersey number)
//! - one assignment per (member, age group)
//! - one assignment per (member, squad)
//! - one squad per (age group, template, instance)
//!
//! [`crate::db::PgRosterStore`] backs these with unique constraints.
//! [`MemoryRosterStore`] checks them under a lock for tests and embedding.

mod memory;

pub use memory::MemoryRosterStore;

use async_trait::async_trait;
use squad_catalog::{AgeGroupCode, PositionKey, Template};
use squad_id::{AssignmentId, MemberId};

use crate::db::StoreResult;
use crate::model::{Assignment, NewAssignment, Roster, RosterOccupancy};

#[async_trait]
pub trait RosterStore: Send + Sync {
    /// The member's assignment in an age group, if any.
    async fn find_assignment(
        &self,
        member_id: &MemberId,
        age_group: &AgeGroupCode,
    ) -> StoreResult<Option<Assignment>>;

    /// All squads of a partition with their assignments, in no particular order.
    async fn load_partition(
        &self,
        age_group: &AgeGroupCode,
        template: Template,
    ) -> StoreResult<Vec<RosterOccupancy>>;

    /// Creates the next squad of a partition.
    ///
    /// Fails with `RosterInstanceConflict` when a concurrent writer took the
    /// same letter and `RosterInstancesExhausted` past `Z`.
    async fn create_roster(&self, age_group: &AgeGroupCode, template: Template)
        -> StoreResult<Roster>;

    /// Inserts one assignment atomically.
    ///
    /// Checks that the squad and member exist, then inserts. Unique
    /// violations surface as `SlotOccupied`, `MemberAlreadyAssignedInAgeGroup`
    /// or `MemberAlreadyInRoster`. No row is written on failure.
    async fn place_member(&self, placement: &NewAssignment) -> StoreResult<Assignment>;

    /// Operator override: deletes an assignment and recreates it for the same
    /// member in another slot, in one transaction, with `source = manual`.
    async fn move_assignment(
        &self,
        assignment_id: AssignmentId,
        roster_id: squad_id::RosterId,
        position: PositionKey,
    ) -> StoreResult<Assignment>;
}
