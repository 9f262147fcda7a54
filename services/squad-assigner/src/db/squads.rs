//! Postgres-backed squad and assignment storage.
//!
//! Each write is one short transaction scoped to a single insert. Nothing is
//! locked across the ranked scan; the unique constraints in
//! `migrations/0001_squads.sql` are the authority on conflicts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use squad_catalog::{jersey_number_for, AgeGroupCode, PositionKey, Template};
use squad_id::{AssignmentId, MemberId, RosterId};
use sqlx::{postgres::PgPool, postgres::PgRow, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use super::error::{foreign_key_violation, unique_violation};
use super::{StoreError, StoreResult};
use crate::model::{Assignment, AssignmentSource, NewAssignment, Roster, RosterOccupancy};
use crate::roster::{next_instance, roster_name};
use crate::store::RosterStore;

const SQUADS_PARTITION_INSTANCE_KEY: &str = "squads_partition_instance_key";
const SLOT_KEY: &str = "squad_assignments_slot_key";
const MEMBER_AGE_GROUP_KEY: &str = "squad_assignments_member_age_group_key";
const MEMBER_SQUAD_KEY: &str = "squad_assignments_member_squad_key";
const SQUAD_FKEY: &str = "squad_assignments_squad_fkey";

const ASSIGNMENT_COLUMNS: &str = "assignment_id, squad_id, member_id, age_group_code, \
     position_key, jersey_number, source, created_at";

/// Squad store over a Postgres pool.
#[derive(Clone)]
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roster_partition(
        tx: &mut Transaction<'_, Postgres>,
        roster_id: RosterId,
    ) -> StoreResult<(AgeGroupCode, Template)> {
        let row = sqlx::query(
            "SELECT age_group_code, template FROM squads WHERE squad_id = $1",
        )
        .bind(roster_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(StoreError::Query)?
        .ok_or(StoreError::RosterNotFound(roster_id))?;

        let age_group: String = row.try_get("age_group_code").map_err(StoreError::Query)?;
        let template: String = row.try_get("template").map_err(StoreError::Query)?;
        let template = template
            .parse::<Template>()
            .map_err(|e| StoreError::corrupt("squads", e))?;
        Ok((AgeGroupCode::from_stored(age_group), template))
    }

    async fn ensure_member(
        tx: &mut Transaction<'_, Postgres>,
        member_id: &MemberId,
    ) -> StoreResult<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM members WHERE member_id = $1)")
                .bind(member_id.as_str())
                .fetch_one(&mut **tx)
                .await
                .map_err(StoreError::Query)?;
        if exists {
            Ok(())
        } else {
            Err(StoreError::MemberNotFound(member_id.clone()))
        }
    }

    /// Inserts one assignment inside `tx`, mapping constraint violations.
    async fn insert_assignment(
        tx: &mut Transaction<'_, Postgres>,
        placement: &NewAssignment,
    ) -> StoreResult<Assignment> {
        let (age_group, template) = Self::roster_partition(tx, placement.roster_id).await?;
        Self::ensure_member(tx, &placement.member_id).await?;

        if jersey_number_for(template, placement.position) != Some(placement.jersey_number) {
            return Err(StoreError::InvalidSlot {
                template,
                position: placement.position,
                jersey_number: placement.jersey_number,
            });
        }

        let assignment_id = AssignmentId::new();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO squad_assignments (
                assignment_id, squad_id, member_id, age_group_code,
                position_key, jersey_number, source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING created_at
            "#,
        )
        .bind(assignment_id.to_string())
        .bind(placement.roster_id.to_string())
        .bind(placement.member_id.as_str())
        .bind(age_group.as_str())
        .bind(placement.position.as_str())
        .bind(i32::from(placement.jersey_number))
        .bind(placement.source.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_assignment_insert_error(e, placement, &age_group))?;

        Ok(Assignment {
            id: assignment_id,
            roster_id: placement.roster_id,
            member_id: placement.member_id.clone(),
            age_group,
            position: placement.position,
            jersey_number: placement.jersey_number,
            source: placement.source,
            created_at,
        })
    }
}

fn map_assignment_insert_error(
    e: sqlx::Error,
    placement: &NewAssignment,
    age_group: &AgeGroupCode,
) -> StoreError {
    match unique_violation(&e) {
        Some(SLOT_KEY) => {
            return StoreError::SlotOccupied {
                roster_id: placement.roster_id,
                jersey_number: placement.jersey_number,
            }
        }
        Some(MEMBER_AGE_GROUP_KEY) => {
            return StoreError::MemberAlreadyAssignedInAgeGroup {
                member_id: placement.member_id.clone(),
                age_group: age_group.clone(),
            }
        }
        Some(MEMBER_SQUAD_KEY) => {
            return StoreError::MemberAlreadyInRoster {
                member_id: placement.member_id.clone(),
                roster_id: placement.roster_id,
            }
        }
        _ => {}
    }

    // The existence checks above run in the same transaction, so these only
    // fire if a row vanished underneath us.
    match foreign_key_violation(&e) {
        Some(SQUAD_FKEY) => StoreError::RosterNotFound(placement.roster_id),
        Some(_) => StoreError::MemberNotFound(placement.member_id.clone()),
        None => StoreError::Query(e),
    }
}

#[async_trait]
impl RosterStore for PgRosterStore {
    #[instrument(skip(self), fields(member_id = %member_id, age_group = %age_group))]
    async fn find_assignment(
        &self,
        member_id: &MemberId,
        age_group: &AgeGroupCode,
    ) -> StoreResult<Option<Assignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM squad_assignments \
             WHERE member_id = $1 AND age_group_code = $2"
        ))
        .bind(member_id.as_str())
        .bind(age_group.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        row.map(Assignment::try_from).transpose()
    }

    #[instrument(skip(self), fields(age_group = %age_group, template = %template))]
    async fn load_partition(
        &self,
        age_group: &AgeGroupCode,
        template: Template,
    ) -> StoreResult<Vec<RosterOccupancy>> {
        // Both reads see one snapshot so counts match the squad list.
        let mut tx = self.pool.begin().await.map_err(StoreError::Query)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(StoreError::Query)?;

        let rosters = sqlx::query_as::<_, RosterRow>(
            r#"
            SELECT squad_id, age_group_code, template, instance, name, created_at
            FROM squads
            WHERE age_group_code = $1 AND template = $2
            "#,
        )
        .bind(age_group.as_str())
        .bind(template.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::Query)?;

        let assignments = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {cols} FROM squad_assignments a \
             WHERE a.squad_id IN ( \
                 SELECT squad_id FROM squads WHERE age_group_code = $1 AND template = $2 \
             )",
            cols = ASSIGNMENT_COLUMNS
        ))
        .bind(age_group.as_str())
        .bind(template.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::Query)?;

        tx.commit().await.map_err(StoreError::Query)?;

        let assignments = assignments
            .into_iter()
            .map(Assignment::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        rosters
            .into_iter()
            .map(|row| {
                let roster = Roster::try_from(row)?;
                let assignments = assignments
                    .iter()
                    .filter(|a| a.roster_id == roster.id)
                    .cloned()
                    .collect();
                Ok(RosterOccupancy {
                    roster,
                    assignments,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(age_group = %age_group, template = %template))]
    async fn create_roster(
        &self,
        age_group: &AgeGroupCode,
        template: Template,
    ) -> StoreResult<Roster> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Query)?;

        let highest: Option<String> = sqlx::query_scalar(
            "SELECT MAX(instance) FROM squads WHERE age_group_code = $1 AND template = $2",
        )
        .bind(age_group.as_str())
        .bind(template.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::Query)?;

        let highest = highest.and_then(|s| s.chars().next());
        let instance = next_instance(highest, age_group, template)?;
        let roster_id = RosterId::new();
        let name = roster_name(age_group, template, instance);

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO squads (squad_id, age_group_code, template, instance, name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(roster_id.to_string())
        .bind(age_group.as_str())
        .bind(template.as_str())
        .bind(instance.to_string())
        .bind(&name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(SQUADS_PARTITION_INSTANCE_KEY) => StoreError::RosterInstanceConflict {
                age_group: age_group.clone(),
                template,
                instance,
            },
            _ => StoreError::Query(e),
        })?;

        tx.commit().await.map_err(StoreError::Query)?;

        debug!(roster_id = %roster_id, name = %name, "Created squad");

        Ok(Roster {
            id: roster_id,
            age_group: age_group.clone(),
            template,
            instance,
            name,
            created_at,
        })
    }

    #[instrument(
        skip(self, placement),
        fields(
            member_id = %placement.member_id,
            roster_id = %placement.roster_id,
            position = %placement.position,
        )
    )]
    async fn place_member(&self, placement: &NewAssignment) -> StoreResult<Assignment> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Query)?;
        // On error the transaction is dropped and rolled back.
        let assignment = Self::insert_assignment(&mut tx, placement).await?;
        tx.commit().await.map_err(StoreError::Query)?;
        Ok(assignment)
    }

    #[instrument(skip(self))]
    async fn move_assignment(
        &self,
        assignment_id: AssignmentId,
        roster_id: RosterId,
        position: PositionKey,
    ) -> StoreResult<Assignment> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Query)?;

        let member_id: Option<String> = sqlx::query_scalar(
            "DELETE FROM squad_assignments WHERE assignment_id = $1 RETURNING member_id",
        )
        .bind(assignment_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::Query)?;
        let member_id = member_id.ok_or(StoreError::AssignmentNotFound(assignment_id))?;
        let member_id =
            MemberId::parse(&member_id).map_err(|e| StoreError::corrupt("squad_assignments", e))?;

        let (_, template) = Self::roster_partition(&mut tx, roster_id).await?;
        let jersey_number =
            jersey_number_for(template, position).ok_or(StoreError::InvalidSlot {
                template,
                position,
                jersey_number: 0,
            })?;

        let assignment = Self::insert_assignment(
            &mut tx,
            &NewAssignment {
                member_id,
                roster_id,
                position,
                jersey_number,
                source: AssignmentSource::Manual,
            },
        )
        .await?;

        tx.commit().await.map_err(StoreError::Query)?;
        Ok(assignment)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug)]
struct RosterRow {
    squad_id: String,
    age_group_code: String,
    template: String,
    instance: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for RosterRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            squad_id: row.try_get("squad_id")?,
            age_group_code: row.try_get("age_group_code")?,
            template: row.try_get("template")?,
            instance: row.try_get("instance")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<RosterRow> for Roster {
    type Error = StoreError;

    fn try_from(row: RosterRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| StoreError::corrupt("squads", e);
        let mut letters = row.instance.chars();
        let instance = match (letters.next(), letters.next()) {
            (Some(c), None) => c,
            _ => return Err(corrupt(format!("bad instance '{}'", row.instance))),
        };

        Ok(Roster {
            id: row.squad_id.parse().map_err(|e: squad_id::IdError| corrupt(e.to_string()))?,
            age_group: AgeGroupCode::from_stored(row.age_group_code),
            template: row.template.parse().map_err(corrupt)?,
            instance,
            name: row.name,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct AssignmentRow {
    assignment_id: String,
    squad_id: String,
    member_id: String,
    age_group_code: String,
    position_key: String,
    jersey_number: i32,
    source: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for AssignmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            assignment_id: row.try_get("assignment_id")?,
            squad_id: row.try_get("squad_id")?,
            member_id: row.try_get("member_id")?,
            age_group_code: row.try_get("age_group_code")?,
            position_key: row.try_get("position_key")?,
            jersey_number: row.try_get("jersey_number")?,
            source: row.try_get("source")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = StoreError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| StoreError::corrupt("squad_assignments", e);

        Ok(Assignment {
            id: row
                .assignment_id
                .parse()
                .map_err(|e: squad_id::IdError| corrupt(e.to_string()))?,
            roster_id: row
                .squad_id
                .parse()
                .map_err(|e: squad_id::IdError| corrupt(e.to_string()))?,
            member_id: MemberId::parse(&row.member_id).map_err(|e| corrupt(e.to_string()))?,
            age_group: AgeGroupCode::from_stored(row.age_group_code),
            position: row.position_key.parse().map_err(corrupt)?,
            jersey_number: u8::try_from(row.jersey_number)
                .map_err(|_| corrupt(format!("jersey number {} out of range", row.jersey_number)))?,
            source: row.source.parse().map_err(corrupt)?,
            created_at: row.created_at,
        })
    }
}
