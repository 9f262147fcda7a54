//! Service configuration.

use anyhow::{Context, Result};

use crate::assign::{OrchestratorConfig, DEFAULT_MAX_ATTEMPTS};
use crate::db::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Runs migrations at startup.
    pub dev_mode: bool,
    pub database: DbConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("SQUAD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("SQUAD_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let max_attempts = match std::env::var("SQUAD_MAX_PLACEMENT_ATTEMPTS") {
            Ok(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("SQUAD_MAX_PLACEMENT_ATTEMPTS must be a positive integer, got '{v}'"))?,
            Err(_) => DEFAULT_MAX_ATTEMPTS,
        };

        let database = DbConfig::from_env();

        Ok(Self {
            log_level,
            dev_mode,
            database,
            orchestrator: OrchestratorConfig { max_attempts },
        })
    }
}
