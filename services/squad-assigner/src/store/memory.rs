//! In-process store with the same uniqueness rules as Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use squad_catalog::{jersey_number_for, AgeGroupCode, PositionKey, Template};
use squad_id::{AssignmentId, MemberId, RosterId};
use tokio::sync::Mutex;
use tracing::debug;

use super::RosterStore;
use crate::db::{StoreError, StoreResult};
use crate::intake::{MemberDirectory, MemberStatus};
use crate::model::{Assignment, AssignmentSource, NewAssignment, Roster, RosterOccupancy};
use crate::roster::{highest_instance, next_instance, roster_name};

#[derive(Debug, Default)]
struct MemoryState {
    members: HashMap<MemberId, MemberStatus>,
    rosters: Vec<Roster>,
    assignments: Vec<Assignment>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing timestamps so creation order is observable.
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn roster(&self, roster_id: RosterId) -> StoreResult<&Roster> {
        self.rosters
            .iter()
            .find(|r| r.id == roster_id)
            .ok_or(StoreError::RosterNotFound(roster_id))
    }

    /// Applies the three assignment uniqueness constraints.
    fn check_unique(&self, candidate: &Assignment) -> StoreResult<()> {
        for existing in &self.assignments {
            if existing.roster_id == candidate.roster_id
                && existing.jersey_number == candidate.jersey_number
            {
                return Err(StoreError::SlotOccupied {
                    roster_id: candidate.roster_id,
                    jersey_number: candidate.jersey_number,
                });
            }
        }
        for existing in &self.assignments {
            if existing.member_id == candidate.member_id
                && existing.age_group == candidate.age_group
            {
                return Err(StoreError::MemberAlreadyAssignedInAgeGroup {
                    member_id: candidate.member_id.clone(),
                    age_group: candidate.age_group.clone(),
                });
            }
            if existing.member_id == candidate.member_id
                && existing.roster_id == candidate.roster_id
            {
                return Err(StoreError::MemberAlreadyInRoster {
                    member_id: candidate.member_id.clone(),
                    roster_id: candidate.roster_id,
                });
            }
        }
        Ok(())
    }

    fn build_assignment(
        &mut self,
        member_id: MemberId,
        roster_id: RosterId,
        position: PositionKey,
        jersey_number: u8,
        source: AssignmentSource,
    ) -> StoreResult<Assignment> {
        let roster = self.roster(roster_id)?;
        let (age_group, template) = (roster.age_group.clone(), roster.template);

        if !self.members.contains_key(&member_id) {
            return Err(StoreError::MemberNotFound(member_id));
        }
        if jersey_number_for(template, position) != Some(jersey_number) {
            return Err(StoreError::InvalidSlot {
                template,
                position,
                jersey_number,
            });
        }

        Ok(Assignment {
            id: AssignmentId::new(),
            roster_id,
            member_id,
            age_group,
            position,
            jersey_number,
            source,
            created_at: self.now(),
        })
    }
}

/// [`RosterStore`] and [`MemberDirectory`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryRosterStore {
    state: Mutex<MemoryState>,
}

impl MemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a member.
    pub async fn upsert_member(&self, member_id: MemberId, status: MemberStatus) {
        self.state.lock().await.members.insert(member_id, status);
    }

    /// Registers an active member with a complete profile.
    pub async fn add_active_member(&self, member_id: &MemberId) {
        self.upsert_member(member_id.clone(), MemberStatus::active())
            .await;
    }

    /// Snapshot of every assignment.
    pub async fn assignments(&self) -> Vec<Assignment> {
        self.state.lock().await.assignments.clone()
    }

    /// Snapshot of every squad.
    pub async fn rosters(&self) -> Vec<Roster> {
        self.state.lock().await.rosters.clone()
    }
}

#[async_trait]
impl RosterStore for MemoryRosterStore {
    async fn find_assignment(
        &self,
        member_id: &MemberId,
        age_group: &AgeGroupCode,
    ) -> StoreResult<Option<Assignment>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .find(|a| &a.member_id == member_id && &a.age_group == age_group)
            .cloned())
    }

    async fn load_partition(
        &self,
        age_group: &AgeGroupCode,
        template: Template,
    ) -> StoreResult<Vec<RosterOccupancy>> {
        let state = self.state.lock().await;
        Ok(state
            .rosters
            .iter()
            .filter(|r| &r.age_group == age_group && r.template == template)
            .map(|roster| RosterOccupancy {
                roster: roster.clone(),
                assignments: state
                    .assignments
                    .iter()
                    .filter(|a| a.roster_id == roster.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn create_roster(
        &self,
        age_group: &AgeGroupCode,
        template: Template,
    ) -> StoreResult<Roster> {
        let mut state = self.state.lock().await;
        let highest = highest_instance(
            state
                .rosters
                .iter()
                .filter(|r| &r.age_group == age_group && r.template == template)
                .map(|r| r.instance),
        );
        let instance = next_instance(highest, age_group, template)?;

        let roster = Roster {
            id: RosterId::new(),
            age_group: age_group.clone(),
            template,
            instance,
            name: roster_name(age_group, template, instance),
            created_at: state.now(),
        };
        state.rosters.push(roster.clone());
        debug!(roster_id = %roster.id, name = %roster.name, "Created squad");
        Ok(roster)
    }

    async fn place_member(&self, placement: &NewAssignment) -> StoreResult<Assignment> {
        let mut state = self.state.lock().await;
        let assignment = state.build_assignment(
            placement.member_id.clone(),
            placement.roster_id,
            placement.position,
            placement.jersey_number,
            placement.source,
        )?;
        state.check_unique(&assignment)?;
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn move_assignment(
        &self,
        assignment_id: AssignmentId,
        roster_id: RosterId,
        position: PositionKey,
    ) -> StoreResult<Assignment> {
        let mut state = self.state.lock().await;
        let index = state
            .assignments
            .iter()
            .position(|a| a.id == assignment_id)
            .ok_or(StoreError::AssignmentNotFound(assignment_id))?;

        // The member's own row must not block the recreate; it is restored if
        // the move is rejected.
        let removed = state.assignments.remove(index);
        let template = match state.roster(roster_id).map(|r| r.template) {
            Ok(template) => template,
            Err(e) => {
                state.assignments.insert(index, removed);
                return Err(e);
            }
        };
        let result = jersey_number_for(template, position)
            .ok_or(StoreError::InvalidSlot {
                template,
                position,
                jersey_number: 0,
            })
            .and_then(|jersey_number| {
                state.build_assignment(
                    removed.member_id.clone(),
                    roster_id,
                    position,
                    jersey_number,
                    AssignmentSource::Manual,
                )
            })
            .and_then(|assignment| state.check_unique(&assignment).map(|_| assignment));

        match result {
            Ok(assignment) => {
                state.assignments.push(assignment.clone());
                Ok(assignment)
            }
            Err(e) => {
                state.assignments.insert(index, removed);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl MemberDirectory for MemoryRosterStore {
    async fn member_status(&self, member_id: &MemberId) -> StoreResult<Option<MemberStatus>> {
        Ok(self.state.lock().await.members.get(member_id).cloned())
    }
}
