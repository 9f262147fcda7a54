//! Member state read from the registration system's `members` table.

use async_trait::async_trait;
use squad_id::MemberId;
use sqlx::{postgres::PgPool, Row};
use tracing::instrument;

use super::{StoreError, StoreResult};
use crate::intake::{LifecycleState, MemberDirectory, MemberStatus};

/// [`MemberDirectory`] over Postgres.
#[derive(Clone)]
pub struct PgMemberDirectory {
    pool: PgPool,
}

impl PgMemberDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or updates a member row. Used by operators and tests; the
    /// registration system owns these rows in production.
    pub async fn upsert(&self, member_id: &MemberId, status: &MemberStatus) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO members (member_id, lifecycle_state, profile_complete)
            VALUES ($1, $2, $3)
            ON CONFLICT (member_id) DO UPDATE
            SET lifecycle_state = EXCLUDED.lifecycle_state,
                profile_complete = EXCLUDED.profile_complete
            "#,
        )
        .bind(member_id.as_str())
        .bind(status.lifecycle.as_str())
        .bind(status.profile_complete)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Query)?;
        Ok(())
    }
}

#[async_trait]
impl MemberDirectory for PgMemberDirectory {
    #[instrument(skip(self), fields(member_id = %member_id))]
    async fn member_status(&self, member_id: &MemberId) -> StoreResult<Option<MemberStatus>> {
        let row = sqlx::query(
            "SELECT lifecycle_state, profile_complete FROM members WHERE member_id = $1",
        )
        .bind(member_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let lifecycle: String = row.try_get("lifecycle_state").map_err(StoreError::Query)?;
        let profile_complete: bool = row.try_get("profile_complete").map_err(StoreError::Query)?;

        Ok(Some(MemberStatus {
            lifecycle: LifecycleState::from_stored(&lifecycle),
            profile_complete,
        }))
    }
}
