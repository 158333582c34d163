//! CLI command implementations.

pub mod bootstrap;
pub mod find;
pub mod identifiers;
pub mod sequence;
pub mod state;

use digireg_core::{DataSourceConfig, Registry};
use digireg_service::{Caller, RegistryService, ServiceConfig};
use digireg_storage::{SqliteSource, SqliteSourceConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Result type for command handlers.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Settings loaded from `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Data source settings.
    pub data_source: DataSourceConfig,
    /// SQLite connection settings. `--db` overrides the path.
    pub storage: Option<SqliteSourceConfig>,
    /// Service settings.
    pub service: ServiceConfig,
}

impl CliConfig {
    /// Loads a JSON configuration file.
    pub fn load(path: &Path) -> CommandResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("cannot read config {}: {err}", path.display()))?;
        let config = serde_json::from_str(&text)
            .map_err(|err| format!("invalid config {}: {err}", path.display()))?;
        Ok(config)
    }

    /// Storage settings for the database, with `db` taking precedence over
    /// the configured path.
    pub fn storage_for(&self, db: Option<PathBuf>) -> CommandResult<SqliteSourceConfig> {
        match (db, &self.storage) {
            (Some(path), Some(storage)) => Ok(SqliteSourceConfig {
                path,
                ..storage.clone()
            }),
            (Some(path), None) => Ok(SqliteSourceConfig::new(path)),
            (None, Some(storage)) => Ok(storage.clone()),
            (None, None) => Err("database path required (--db or storage.path in --config)".into()),
        }
    }
}

/// Opens the service over the configured database.
pub fn open(config: &CliConfig, storage: SqliteSourceConfig) -> CommandResult<RegistryService> {
    debug!(path = %storage.path.display(), "opening registry database");
    let source = Arc::new(SqliteSource::new(storage)?);
    let registry = Registry::new(source, config.data_source.clone());
    Ok(RegistryService::new(registry, config.service.clone()))
}

/// The principal the CLI acts as. Holds the configured write role.
pub fn operator(config: &CliConfig) -> Caller {
    let name = std::env::var("USER").unwrap_or_else(|_| "digireg".to_string());
    Caller::new(name).with_role(config.service.write_role.clone())
}
