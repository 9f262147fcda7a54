//! Squad and assignment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use squad_catalog::{AgeGroupCode, PositionKey, Template};
use squad_id::{AssignmentId, MemberId, RosterId};

/// How an assignment came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Placed by the auto-assignment algorithm.
    Automatic,
    /// Moved by an operator.
    Manual,
}

impl AssignmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentSource::Automatic => "automatic",
            AssignmentSource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automatic" => Ok(AssignmentSource::Automatic),
            "manual" => Ok(AssignmentSource::Manual),
            other => Err(format!("unknown assignment source '{other}'")),
        }
    }
}

/// One squad of an (age group, template) partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub id: RosterId,
    pub age_group: AgeGroupCode,
    pub template: Template,
    /// Single uppercase letter, unique within the partition.
    pub instance: char,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Roster {
    /// Number of slots, fixed by the template.
    pub fn capacity(&self) -> usize {
        self.template.capacity()
    }
}

/// A member placed into one slot of one squad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub roster_id: RosterId,
    pub member_id: MemberId,
    pub age_group: AgeGroupCode,
    pub position: PositionKey,
    pub jersey_number: u8,
    pub source: AssignmentSource,
    pub created_at: DateTime<Utc>,
}

/// Input to a placement. The age group is taken from the squad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub member_id: MemberId,
    pub roster_id: RosterId,
    pub position: PositionKey,
    pub jersey_number: u8,
    pub source: AssignmentSource,
}

/// A squad together with its current assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterOccupancy {
    pub roster: Roster,
    pub assignments: Vec<Assignment>,
}

impl RosterOccupancy {
    pub fn filled(&self) -> usize {
        self.assignments.len()
    }

    pub fn capacity(&self) -> usize {
        self.roster.capacity()
    }

    /// Filled slots as a fraction of capacity.
    pub fn occupancy_rate(&self) -> f64 {
        match self.capacity() {
            0 => 1.0,
            capacity => self.filled() as f64 / capacity as f64,
        }
    }

    pub fn is_full(&self) -> bool {
        self.filled() >= self.capacity()
    }

    /// Advisory check; the unique constraint decides at insert time.
    pub fn is_slot_free(&self, jersey_number: u8) -> bool {
        !self
            .assignments
            .iter()
            .any(|a| a.jersey_number == jersey_number)
    }

    /// The member's assignment in this squad, if any.
    pub fn assignment_of(&self, member_id: &MemberId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| &a.member_id == member_id)
    }
}
