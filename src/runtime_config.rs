//! Locating and preparing the RSVP store.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::Args;
use rsvp_model::{create_store, DatabaseLocation, SqlStatements};
use serde::Deserialize;

/// Where the database lives when nothing else is configured, relative to the
/// working directory.
pub const DEFAULT_DATABASE_PATH: &str = "db/rsvp.db";

/// Options selecting the store, shared by every command.
#[derive(Args, Debug, Default)]
pub struct StoreOptions {
    /// Path to the SQLite database holding RSVPs.
    #[clap(long = "database", env = "RSVP_DATABASE")]
    pub database: Option<PathBuf>,

    /// Configuration file for the RSVP store.
    #[clap(long = "runtime-config-file", env = "RSVP_RUNTIME_CONFIG")]
    pub runtime_config_file: Option<PathBuf>,
}

/// The contents of a runtime config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// The `[database]` table of a runtime config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path. Relative paths are resolved against the directory of
    /// the config file.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
}

impl RuntimeConfig {
    /// Reads and parses a runtime config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| {
            format!("failed to read runtime config file '{}'", path.display())
        })?;
        let mut config: Self = toml::from_str(&text).with_context(|| {
            format!("invalid runtime config file '{}'", path.display())
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        if let Some(db_path) = config.database.as_mut().and_then(|db| db.path.as_mut()) {
            if db_path.is_relative() {
                *db_path = base_dir.join(&*db_path);
            }
        }
        Ok(config)
    }
}

impl StoreOptions {
    /// Works out the store location without touching it.
    ///
    /// `--database` wins over the runtime config file, which wins over
    /// [`DEFAULT_DATABASE_PATH`].
    pub fn resolve(&self) -> anyhow::Result<DatabaseLocation> {
        let config = match &self.runtime_config_file {
            Some(file) => RuntimeConfig::from_file(file)?,
            None => RuntimeConfig::default(),
        };
        let database = config.database.unwrap_or_default();

        let path = self
            .database
            .clone()
            .or(database.path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));
        let mut location = DatabaseLocation::new(path);
        if let Some(ms) = database.busy_timeout_ms {
            location = location.with_busy_timeout(Duration::from_millis(ms));
        }
        Ok(location)
    }

    /// Resolves the store location, creates the database and `rsvp` table if
    /// needed and runs `statements` against it.
    pub fn prepare(&self, statements: &SqlStatements) -> anyhow::Result<DatabaseLocation> {
        let resolved = self.resolve()?;
        let location =
            DatabaseLocation::from_path(resolved.path())?.with_busy_timeout(resolved.busy_timeout());
        let connection = create_store(&location)
            .with_context(|| format!("failed to prepare store at {}", location.summary()))?;
        statements.execute(&connection)?;
        Ok(location)
    }
}
