//! Configuration for bq-lens.
//!
//! Configured via a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "sqlite"
//! path = "${BQ_LENS_DATA}/bq-lens.db"
//!
//! [observability.logging]
//! format = "json"
//!
//! [optimizer]
//! price_per_tb_scan = 6.25
//! has_discovery_data = true
//! ```

mod database;
mod observability;
mod optimizer;

use std::path::Path;

pub use database::*;
pub use observability::*;
pub use optimizer::*;
use serde::{Deserialize, Serialize};

/// Root configuration.
///
/// Every section is optional, so an empty file yields an in-memory store
/// with default prices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BqLensConfig {
    /// Document store holding recommendation output.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Pricing defaults of a run.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl BqLensConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: BqLensConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.optimizer.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Rejects backends this build was compiled without, before serde reports
/// them as an unknown variant.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let type_val = raw
        .get("database")
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str());

    match type_val {
        #[cfg(not(feature = "database-sqlite"))]
        Some("sqlite") => Err(ConfigError::Validation(
            "database type 'sqlite' requires the 'database-sqlite' feature\n\
             Rebuild with: cargo build --features database-sqlite"
                .into(),
        )),
        _ => Ok(()),
    }
}

/// Expand `${VAR}` references, leaving anything after a `#` untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("invalid interpolation pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Keep the input's trailing-newline shape
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
