use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Where recommendation documents are stored.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum DatabaseConfig {
    /// Process-local store. Contents are lost on exit.
    #[default]
    Memory,

    /// SQLite database file.
    #[cfg(feature = "database-sqlite")]
    Sqlite(SqliteConfig),
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        matches!(self, DatabaseConfig::Memory)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DatabaseConfig::Memory => Ok(()),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(c) => c.validate(),
        }
    }
}

/// SQLite configuration.
#[cfg(feature = "database-sqlite")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    pub path: String,

    /// Create the database file if it doesn't exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Run migrations when the store is opened.
    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// Enable WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_sqlite_max_connections")]
    pub max_connections: u32,
}

#[cfg(feature = "database-sqlite")]
impl SqliteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.is_empty() {
            return Err(ConfigError::Validation(
                "SQLite path cannot be empty".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "SQLite max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "database-sqlite")]
fn default_true() -> bool {
    true
}

#[cfg(feature = "database-sqlite")]
fn default_busy_timeout() -> u64 {
    5000 // 5 seconds
}

#[cfg(feature = "database-sqlite")]
fn default_sqlite_max_connections() -> u32 {
    5
}
