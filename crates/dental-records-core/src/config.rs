//! Store configuration, loaded from TOML.
//!
//! ```toml
//! database_path = "dental_clinic.db"
//! busy_timeout_ms = 5000
//! min_password_length = 6
//! reset_token_ttl_minutes = 60
//! dashboard_months = 12
//! top_n = 10
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Tunables for a [`crate::Database`]. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file path
    pub database_path: PathBuf,
    /// How long a writer waits on a locked database
    pub busy_timeout_ms: u64,
    /// Minimum length for a password set through reset or change
    pub min_password_length: usize,
    /// Lifetime of a password-reset token
    pub reset_token_ttl_minutes: i64,
    /// Months shown in monthly trend reports
    pub dashboard_months: u32,
    /// Rows kept in top-N breakdowns
    pub top_n: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("dental_clinic.db"),
            busy_timeout_ms: 5000,
            min_password_length: 6,
            reset_token_ttl_minutes: 60,
            dashboard_months: 12,
            top_n: 10,
        }
    }
}

impl StoreConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_password_length == 0 {
            return Err(ConfigError::Invalid("min_password_length must be > 0".into()));
        }
        if self.reset_token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("reset_token_ttl_minutes must be > 0".into()));
        }
        if self.dashboard_months == 0 || self.top_n == 0 {
            return Err(ConfigError::Invalid("dashboard_months and top_n must be > 0".into()));
        }
        Ok(())
    }
}
