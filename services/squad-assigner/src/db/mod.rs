//! Postgres storage: squads and assignments ([`PgRosterStore`]), member
//! state ([`PgMemberDirectory`]) and the pause flag ([`PgAssignmentSwitch`]),
//! all sharing one pool.

mod error;
mod flags;
mod members;
mod squads;

pub use error::{StoreError, StoreResult};
pub use flags::{PgAssignmentSwitch, ASSIGNMENT_PAUSED_FLAG};
pub use members::PgMemberDirectory;
pub use squads::PgRosterStore;

use std::path::PathBuf;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Pool settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/squads".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// `DATABASE_URL`, `DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`; unset or
    /// unparsable values keep the defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let count = |name: &str, fallback: u32| {
            var(name)
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(fallback)
        };

        Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| defaults.database_url.clone()),
            max_connections: count("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: count("DB_MIN_CONNECTIONS", defaults.min_connections),
            ..defaults
        }
    }
}

/// Shared pool; hands out the store handles.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DbConfig) -> StoreResult<Self> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(StoreError::Connect)?;

        info!("Database pool ready");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `SELECT 1`.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    /// Applies `migrations/`, looked up relative to the working directory,
    /// the workspace root, then this crate.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        let dirs = [
            PathBuf::from("migrations"),
            PathBuf::from("services/squad-assigner/migrations"),
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];

        let mut last_error = None;
        for dir in &dirs {
            let migrator = match Migrator::new(dir.as_path()).await {
                Ok(migrator) => migrator,
                Err(e) => {
                    last_error = Some(e.to_string());
                    continue;
                }
            };
            info!(migrations_dir = %dir.display(), "Applying migrations");
            migrator.run(&self.pool).await.map_err(StoreError::Migration)?;
            info!("Migrations applied");
            return Ok(());
        }

        Err(StoreError::MigrationDirNotFound {
            tried: dirs
                .iter()
                .map(|dir| dir.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            last_error: last_error.unwrap_or_default(),
        })
    }

    pub fn roster_store(&self) -> PgRosterStore {
        PgRosterStore::new(self.pool.clone())
    }

    pub fn member_directory(&self) -> PgMemberDirectory {
        PgMemberDirectory::new(self.pool.clone())
    }

    pub fn assignment_switch(&self) -> PgAssignmentSwitch {
        PgAssignmentSwitch::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_vars_keep_defaults() {
        let config = DbConfig::from_vars(|_| None);
        assert_eq!(config.database_url, "postgres://localhost/squads");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_pool_sizes_from_vars() {
        let config = DbConfig::from_vars(|name| match name {
            "DATABASE_URL" => Some("postgres://db/squads_test".to_string()),
            "DB_MAX_CONNECTIONS" => Some(" 4 ".to_string()),
            "DB_MIN_CONNECTIONS" => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(config.database_url, "postgres://db/squads_test");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 1);
    }
}
