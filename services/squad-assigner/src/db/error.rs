//! Storage error types.

use squad_catalog::{AgeGroupCode, PositionKey, Template};
use squad_id::{AssignmentId, MemberId, RosterId};
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation errors.
///
/// Conflict variants are produced from unique constraint violations so the
/// caller can branch on which invariant rejected the write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}")]
    MigrationDirNotFound { tried: String, last_error: String },

    #[error("squad not found: {0}")]
    RosterNotFound(RosterId),

    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("assignment not found: {0}")]
    AssignmentNotFound(AssignmentId),

    /// Another member holds this jersey number in the squad.
    #[error("slot {jersey_number} already filled in squad {roster_id}")]
    SlotOccupied {
        roster_id: RosterId,
        jersey_number: u8,
    },

    /// The member already has an assignment in this age group.
    #[error("member {member_id} already assigned in age group {age_group}")]
    MemberAlreadyAssignedInAgeGroup {
        member_id: MemberId,
        age_group: AgeGroupCode,
    },

    /// The member already has an assignment in this squad.
    #[error("member {member_id} already in squad {roster_id}")]
    MemberAlreadyInRoster {
        member_id: MemberId,
        roster_id: RosterId,
    },

    /// A concurrent writer took the same instance letter.
    #[error("squad instance {instance} already exists for {age_group}/{template}")]
    RosterInstanceConflict {
        age_group: AgeGroupCode,
        template: Template,
        instance: char,
    },

    /// Every instance letter `A..=Z` is taken for the partition.
    #[error("no squad instance letters left for {age_group}/{template}")]
    RosterInstancesExhausted {
        age_group: AgeGroupCode,
        template: Template,
    },

    /// The position/jersey pair is not a slot of the squad's template.
    #[error("{position} #{jersey_number} is not a slot of template {template}")]
    InvalidSlot {
        template: Template,
        position: PositionKey,
        jersey_number: u8,
    },

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt row in {table}: {message}")]
    Corrupt {
        table: &'static str,
        message: String,
    },
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str, message: impl std::fmt::Display) -> Self {
        StoreError::Corrupt {
            table,
            message: message.to_string(),
        }
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Returns the constraint name if `err` is a unique violation.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    constraint_violation(err, UNIQUE_VIOLATION)
}

/// Returns the constraint name if `err` is a foreign key violation.
pub(crate) fn foreign_key_violation(err: &sqlx::Error) -> Option<&str> {
    constraint_violation(err, FOREIGN_KEY_VIOLATION)
}

fn constraint_violation<'a>(err: &'a sqlx::Error, code: &str) -> Option<&'a str> {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some(code) {
            return Some(db_err.constraint().unwrap_or_default());
        }
    }
    None
}
