//! Kill switch stored in `feature_flags`.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::{info, instrument};

use super::{StoreError, StoreResult};
use crate::intake::AssignmentSwitch;

/// Flag row that pauses placement when enabled.
pub const ASSIGNMENT_PAUSED_FLAG: &str = "squad_assignment_paused";

/// [`AssignmentSwitch`] over Postgres. Read on every task, never cached.
#[derive(Clone)]
pub struct PgAssignmentSwitch {
    pool: PgPool,
}

impl PgAssignmentSwitch {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sets or clears the pause flag.
    #[instrument(skip(self))]
    pub async fn set_paused(&self, paused: bool) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO feature_flags (flag_name, enabled, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (flag_name) DO UPDATE
            SET enabled = EXCLUDED.enabled, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(ASSIGNMENT_PAUSED_FLAG)
        .bind(paused)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        info!(paused, "Squad assignment switch updated");
        Ok(())
    }
}

#[async_trait]
impl AssignmentSwitch for PgAssignmentSwitch {
    async fn is_paused(&self) -> StoreResult<bool> {
        let enabled: Option<bool> =
            sqlx::query_scalar("SELECT enabled FROM feature_flags WHERE flag_name = $1")
                .bind(ASSIGNMENT_PAUSED_FLAG)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::Query)?;
        // A missing row means the switch was never set.
        Ok(enabled.unwrap_or(false))
    }
}
