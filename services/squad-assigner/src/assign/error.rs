//! Orchestrator error types.

use squad_catalog::{AgeGroupCode, CatalogError, PositionKey, Template};
use squad_id::{MemberId, RosterId};
use thiserror::Error;

use crate::db::StoreError;

/// Errors that cross the orchestrator boundary.
///
/// Slot races and idempotent duplicates are resolved internally and never
/// appear here.
#[derive(Debug, Error)]
pub enum AssignError {
    #[error("birth year {year} has no squad template")]
    UnsupportedBirthYear { year: i32 },

    #[error("'{input}' is not a recognised position for template {template}")]
    InvalidPosition { input: String, template: Template },

    #[error("no requested position is legal for template {template}: {}", join_keys(.positions))]
    PositionTemplateMismatch {
        template: Template,
        positions: Vec<PositionKey>,
    },

    #[error("squad disappeared during placement: {0}")]
    RosterNotFound(RosterId),

    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    /// Stored state contradicts an invariant.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("no squad instance letters left for {age_group}/{template}")]
    RosterInstancesExhausted {
        age_group: AgeGroupCode,
        template: Template,
    },

    /// Every attempt lost a creation race.
    #[error("placement abandoned after {attempts} contended attempts")]
    Contention { attempts: u32 },

    #[error(transparent)]
    Store(StoreError),
}

impl AssignError {
    /// Whether the task queue should redeliver the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssignError::Contention { .. } | AssignError::Store(_))
    }

    /// Stable identifier reported as `errorKind`.
    pub fn kind(&self) -> &'static str {
        match self {
            AssignError::UnsupportedBirthYear { .. } => "UNSUPPORTED_BIRTH_YEAR",
            AssignError::InvalidPosition { .. } => "INVALID_POSITION",
            AssignError::PositionTemplateMismatch { .. } => "POSITION_TEMPLATE_MISMATCH",
            AssignError::RosterNotFound(_) => "ROSTER_NOT_FOUND",
            AssignError::MemberNotFound(_) => "MEMBER_NOT_FOUND",
            AssignError::Integrity(_) => "INTEGRITY",
            AssignError::RosterInstancesExhausted { .. } => "ROSTER_INSTANCES_EXHAUSTED",
            AssignError::Contention { .. } => "CONTENTION",
            AssignError::Store(_) => "STORE",
        }
    }
}

impl From<CatalogError> for AssignError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnsupportedBirthYear { year } => AssignError::UnsupportedBirthYear { year },
            CatalogError::InvalidPosition { input, template } => {
                AssignError::InvalidPosition { input, template }
            }
        }
    }
}

impl From<StoreError> for AssignError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RosterNotFound(id) => AssignError::RosterNotFound(id),
            StoreError::MemberNotFound(id) => AssignError::MemberNotFound(id),
            StoreError::RosterInstancesExhausted {
                age_group,
                template,
            } => AssignError::RosterInstancesExhausted {
                age_group,
                template,
            },
            e @ (StoreError::Corrupt { .. }
            | StoreError::InvalidSlot { .. }
            | StoreError::AssignmentNotFound(_)) => AssignError::Integrity(e.to_string()),
            e => AssignError::Store(e),
        }
    }
}

fn join_keys(keys: &[PositionKey]) -> String {
    keys.iter()
        .map(PositionKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_terminal() {
        let errors = [
            AssignError::UnsupportedBirthYear { year: 2019 },
            AssignError::InvalidPosition {
                input: "quarterback".into(),
                template: Template::EightASide,
            },
            AssignError::PositionTemplateMismatch {
                template: Template::EightASide,
                positions: vec![PositionKey::OnLibero],
            },
        ];
        for err in errors {
            assert!(!err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_contention_is_retryable() {
        let err = AssignError::Contention { attempts: 3 };
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "CONTENTION");
    }

    #[test]
    fn test_store_errors_are_classified() {
        let err: AssignError = StoreError::RosterNotFound(RosterId::new()).into();
        assert_eq!(err.kind(), "ROSTER_NOT_FOUND");
        assert!(!err.is_retryable());

        let err: AssignError = StoreError::corrupt("squads", "bad instance").into();
        assert_eq!(err.kind(), "INTEGRITY");

        let err: AssignError = StoreError::Query(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "STORE");
    }

    #[test]
    fn test_mismatch_lists_positions() {
        let err = AssignError::PositionTemplateMismatch {
            template: Template::EightASide,
            positions: vec![PositionKey::OnLibero, PositionKey::OnNumara],
        };
        assert!(err.to_string().ends_with("ON_LIBERO, ON_NUMARA"));
    }
}
