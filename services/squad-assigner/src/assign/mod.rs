//! Assignment orchestrator.
//!
//! Places one member into one squad of their (age group, template)
//! partition:
//!
//! 1. Resolve template, age group and positions. Bad input fails here,
//!    before any storage access.
//! 2. Return the existing assignment if the member already has one in the
//!    age group, either by lookup or in the squad listing.
//! 3. Scan the ranked squads for a free primary slot, then scan the same
//!    list again for a free secondary slot.
//! 4. Otherwise look the member up once more, then open a new squad and
//!    place the member there.
//!
//! No locks are held across the scan. A lost slot race moves on to the next
//! squad; a lost squad-creation race restarts from step 2.

mod error;
mod plan;

pub use error::AssignError;
pub use plan::{Candidate, PlacementPlan};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use squad_id::{MemberId, RosterId};
use tracing::{debug, info, instrument, warn};

use crate::context::RunContext;
use crate::db::StoreError;
use crate::model::{Assignment, AssignmentSource, NewAssignment};
use crate::ranking::list_rosters;
use crate::store::RosterStore;

/// Default bound on whole-orchestration restarts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// One placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub member_id: MemberId,
    pub birth_year: i32,
    pub primary_position: String,
    pub secondary_position: Option<String>,
}

/// Why a member ended up in their slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementReason {
    Primary,
    Secondary,
    NewRoster,
    AlreadyAssigned,
}

impl PlacementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementReason::Primary => "PRIMARY",
            PlacementReason::Secondary => "SECONDARY",
            PlacementReason::NewRoster => "NEW_ROSTER",
            PlacementReason::AlreadyAssigned => "ALREADY_ASSIGNED",
        }
    }
}

impl std::fmt::Display for PlacementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementResult {
    pub assignment: Assignment,
    pub reason: PlacementReason,
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Whole-orchestration attempts before giving up with `Contention`.
    pub max_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Outcome of one pass that did not produce a placement.
#[derive(Debug)]
enum AttemptError {
    /// A concurrent writer invalidated this pass; start over.
    Restart(&'static str),
    Fail(AssignError),
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        AttemptError::Fail(err.into())
    }
}

type AttemptResult = Result<PlacementResult, AttemptError>;

/// Runs placement requests against a [`RosterStore`].
#[derive(Clone)]
pub struct AssignmentOrchestrator {
    store: Arc<dyn RosterStore>,
    config: OrchestratorConfig,
}

impl AssignmentOrchestrator {
    pub fn new(store: Arc<dyn RosterStore>, config: OrchestratorConfig) -> Self {
        Self { store, config }
    }

    /// Places a member, or returns their existing assignment.
    ///
    /// Safe to call any number of times for the same member: once an
    /// assignment exists for the age group every call returns it with
    /// [`PlacementReason::AlreadyAssigned`].
    #[instrument(
        skip(self, ctx, request),
        fields(
            service = ctx.service,
            version = ctx.version,
            request_id = %ctx.request_id,
            member_id = %request.member_id,
            birth_year = request.birth_year,
        )
    )]
    pub async fn auto_assign(
        &self,
        ctx: &RunContext,
        request: &PlacementRequest,
    ) -> Result<PlacementResult, AssignError> {
        let plan = PlacementPlan::resolve(request)?;
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.attempt(&request.member_id, &plan).await {
                Ok(result) => {
                    info!(
                        attempt,
                        reason = %result.reason,
                        roster_id = %result.assignment.roster_id,
                        position = %result.assignment.position,
                        jersey_number = result.assignment.jersey_number,
                        "Member placed"
                    );
                    return Ok(result);
                }
                Err(AttemptError::Restart(cause)) => {
                    warn!(attempt, max_attempts, cause, "Placement attempt restarting");
                }
                Err(AttemptError::Fail(e)) => return Err(e),
            }
        }

        Err(AssignError::Contention {
            attempts: max_attempts,
        })
    }

    async fn attempt(&self, member_id: &MemberId, plan: &PlacementPlan) -> AttemptResult {
        if let Some(existing) = self.existing_assignment(member_id, plan).await? {
            return Ok(already_assigned(existing));
        }

        let rosters =
            list_rosters(self.store.as_ref(), plan.age_group(), plan.template()).await?;

        // The squad listing is newer than the lookup above.
        if let Some(existing) = rosters.iter().find_map(|r| r.assignment_of(member_id)) {
            debug!(assignment_id = %existing.id, "Member found in squad listing");
            return Ok(already_assigned(existing.clone()));
        }

        // Every squad for the primary before any squad for the secondary.
        for candidate in plan.candidates() {
            for roster in &rosters {
                if !roster.is_slot_free(candidate.jersey_number) {
                    continue;
                }
                match self.place(member_id, roster.roster.id, candidate).await {
                    Ok(result) => return Ok(result),
                    Err(StoreError::SlotOccupied { .. }) => {
                        debug!(
                            roster_id = %roster.roster.id,
                            jersey_number = candidate.jersey_number,
                            "Slot taken concurrently, trying next squad"
                        );
                    }
                    Err(e) => return self.resolve_conflict(member_id, plan, e).await,
                }
            }
        }

        // Last check before opening a squad that would otherwise stay empty.
        if let Some(existing) = self.existing_assignment(member_id, plan).await? {
            return Ok(already_assigned(existing));
        }

        let roster = match self
            .store
            .create_roster(plan.age_group(), plan.template())
            .await
        {
            Ok(roster) => roster,
            Err(StoreError::RosterInstanceConflict { .. }) => {
                return Err(AttemptError::Restart("squad instance taken concurrently"))
            }
            Err(e) => return Err(e.into()),
        };

        let candidate = Candidate {
            reason: PlacementReason::NewRoster,
            ..*plan.new_roster_candidate()
        };
        match self.place(member_id, roster.id, &candidate).await {
            Ok(result) => Ok(result),
            // Another writer found the new squad through its own scan first.
            Err(StoreError::SlotOccupied { .. }) => {
                Err(AttemptError::Restart("slot on new squad taken concurrently"))
            }
            Err(e) => self.resolve_conflict(member_id, plan, e).await,
        }
    }

    async fn existing_assignment(
        &self,
        member_id: &MemberId,
        plan: &PlacementPlan,
    ) -> Result<Option<Assignment>, StoreError> {
        let existing = self
            .store
            .find_assignment(member_id, plan.age_group())
            .await?;
        if let Some(existing) = &existing {
            debug!(assignment_id = %existing.id, "Member already assigned in age group");
        }
        Ok(existing)
    }

    async fn place(
        &self,
        member_id: &MemberId,
        roster_id: RosterId,
        candidate: &Candidate,
    ) -> Result<PlacementResult, StoreError> {
        let assignment = self
            .store
            .place_member(&NewAssignment {
                member_id: member_id.clone(),
                roster_id,
                position: candidate.position,
                jersey_number: candidate.jersey_number,
                source: AssignmentSource::Automatic,
            })
            .await?;
        Ok(PlacementResult {
            assignment,
            reason: candidate.reason,
        })
    }

    /// Turns a lost idempotency race into the winner's assignment.
    async fn resolve_conflict(
        &self,
        member_id: &MemberId,
        plan: &PlacementPlan,
        err: StoreError,
    ) -> AttemptResult {
        let duplicate_in_roster = match err {
            StoreError::MemberAlreadyAssignedInAgeGroup { .. } => false,
            StoreError::MemberAlreadyInRoster { .. } => true,
            other => return Err(other.into()),
        };

        match self.store.find_assignment(member_id, plan.age_group()).await? {
            Some(existing) => {
                debug!(assignment_id = %existing.id, "Lost placement race to same member");
                Ok(already_assigned(existing))
            }
            // The winning row was removed between our insert and the re-read.
            None if !duplicate_in_roster => Err(AttemptError::Restart("assignment vanished")),
            None => Err(AttemptError::Fail(AssignError::Integrity(format!(
                "member {member_id} holds a squad slot outside age group {}",
                plan.age_group()
            )))),
        }
    }
}

fn already_assigned(assignment: Assignment) -> PlacementResult {
    PlacementResult {
        assignment,
        reason: PlacementReason::AlreadyAssigned,
    }
}
