//! Configuration management for bloodbank.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::BloodGroup;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "bloodbank";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "bloodbank.db";

/// Default session token file name.
const SESSION_FILE_NAME: &str = "session";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BLOODBANK_`, sections split on `__`)
/// 2. TOML config file at `~/.config/bloodbank/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Session configuration.
    pub session: SessionConfig,
    /// Form validation bounds.
    pub validation: ValidationConfig,
    /// Donor workflow configuration.
    pub workflow: WorkflowConfig,
    /// Inventory display configuration.
    pub inventory: InventoryConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/bloodbank/bloodbank.db`
    pub database_path: Option<PathBuf>,
    /// Path to the file holding the CLI's session token.
    /// Defaults to `~/.local/share/bloodbank/session`
    pub session_file: Option<PathBuf>,
}

/// Session lifetime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a session lives after sign-in or refresh.
    pub ttl_minutes: u32,
    /// A session used within this many minutes of expiry is extended.
    pub refresh_window_minutes: u32,
}

/// Bounds applied when validating submitted forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Youngest accepted donor age.
    pub min_donor_age: u8,
    /// Oldest accepted donor age.
    pub max_donor_age: u8,
    /// Fewest units a hospital may request.
    pub min_request_units: u32,
    /// Most units a hospital may request.
    pub max_request_units: u32,
}

/// Donor workflow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Quantity used when a collection form leaves it blank.
    pub default_quantity_ml: u32,
}

/// Inventory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Storage capacity per blood group, in units.
    pub capacity: CapacityConfig,
    /// Groups filled below this percentage are flagged.
    pub alert_percent: u32,
}

/// Per-group storage capacity, in units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// A+ capacity.
    pub a_pos: u32,
    /// A- capacity.
    pub a_neg: u32,
    /// B+ capacity.
    pub b_pos: u32,
    /// B- capacity.
    pub b_neg: u32,
    /// AB+ capacity.
    pub ab_pos: u32,
    /// AB- capacity.
    pub ab_neg: u32,
    /// O+ capacity.
    pub o_pos: u32,
    /// O- capacity.
    pub o_neg: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 8 * 60,
            refresh_window_minutes: 60,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_donor_age: 18,
            max_donor_age: 65,
            min_request_units: 1,
            max_request_units: 50,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_quantity_ml: 450,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            capacity: CapacityConfig::default(),
            alert_percent: 30,
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            a_pos: 100,
            a_neg: 50,
            b_pos: 100,
            b_neg: 50,
            ab_pos: 50,
            ab_neg: 30,
            o_pos: 120,
            o_neg: 60,
        }
    }
}

impl CapacityConfig {
    /// Capacity for one blood group.
    #[must_use]
    pub fn for_group(&self, group: BloodGroup) -> u32 {
        match group {
            BloodGroup::APositive => self.a_pos,
            BloodGroup::ANegative => self.a_neg,
            BloodGroup::BPositive => self.b_pos,
            BloodGroup::BNegative => self.b_neg,
            BloodGroup::AbPositive => self.ab_pos,
            BloodGroup::AbNegative => self.ab_neg,
            BloodGroup::OPositive => self.o_pos,
            BloodGroup::ONegative => self.o_neg,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("BLOODBANK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that `path` exists and yields a valid configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, fails to parse, or holds
    /// invalid values.
    pub fn validate_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigValidation {
                message: format!("{} is not a file", path.display()),
            });
        }
        Self::load_from(Some(path.to_path_buf()))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let v = &self.validation;
        if v.min_donor_age > v.max_donor_age {
            return Err(Error::ConfigValidation {
                message: format!(
                    "min_donor_age ({}) cannot be greater than max_donor_age ({})",
                    v.min_donor_age, v.max_donor_age
                ),
            });
        }

        if v.min_request_units == 0 || v.min_request_units > v.max_request_units {
            return Err(Error::ConfigValidation {
                message: format!(
                    "request unit bounds must satisfy 0 < min_request_units ({}) <= max_request_units ({})",
                    v.min_request_units, v.max_request_units
                ),
            });
        }

        if self.session.ttl_minutes == 0 {
            return Err(Error::ConfigValidation {
                message: "ttl_minutes must be greater than 0".to_string(),
            });
        }

        if self.session.refresh_window_minutes >= self.session.ttl_minutes {
            return Err(Error::ConfigValidation {
                message: format!(
                    "refresh_window_minutes ({}) must be less than ttl_minutes ({})",
                    self.session.refresh_window_minutes, self.session.ttl_minutes
                ),
            });
        }

        if self.workflow.default_quantity_ml == 0 {
            return Err(Error::ConfigValidation {
                message: "default_quantity_ml must be greater than 0".to_string(),
            });
        }

        for group in BloodGroup::ALL {
            if self.inventory.capacity.for_group(group) == 0 {
                return Err(Error::ConfigValidation {
                    message: format!("capacity for {group} must be greater than 0"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the session token file path, resolving defaults if not set.
    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.storage
            .session_file
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SESSION_FILE_NAME))
    }

    /// Get the session lifetime as a Duration.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.session.ttl_minutes))
    }

    /// Get the session refresh window as a Duration.
    #[must_use]
    pub fn session_refresh_window(&self) -> Duration {
        Duration::minutes(i64::from(self.session.refresh_window_minutes))
    }
}
