//! Member state lookup.

use async_trait::async_trait;
use squad_id::MemberId;

use crate::db::StoreResult;

/// Member lifecycle as recorded by the registration system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Pending,
    Active,
    Withdrawn,
    /// Any state this service does not act on.
    Other(String),
}

impl LifecycleState {
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Active => "active",
            LifecycleState::Withdrawn => "withdrawn",
            LifecycleState::Other(s) => s.as_str(),
        }
    }

    /// Parses a stored state. Unknown values are kept, not rejected.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "pending" => LifecycleState::Pending,
            "active" => LifecycleState::Active,
            "withdrawn" => LifecycleState::Withdrawn,
            other => LifecycleState::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What placement needs to know about a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStatus {
    pub lifecycle: LifecycleState,
    pub profile_complete: bool,
}

impl MemberStatus {
    /// An active member with a complete profile.
    pub fn active() -> Self {
        Self {
            lifecycle: LifecycleState::Active,
            profile_complete: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == LifecycleState::Active
    }
}

/// Source of member state, consulted right before placement.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// `None` when the member does not exist.
    async fn member_status(&self, member_id: &MemberId) -> StoreResult<Option<MemberStatus>>;
}
