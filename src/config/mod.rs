//! # Configuration Management Module
//!
//! All tunables of the training engine live in a single TOML file. Sections:
//!
//! - [`StorageConfig`] - where horse records and backups are kept
//! - [`LoggingConfig`] - log level and optional log file
//! - [`TrainingConfig`] - hydration, plausibility and abandonment constants
//! - [`AbilitiesConfig`] - the level tables for Speed, Jump and Health
//! - [`BackupConfig`] - startup backups and retention
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stablemaster::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("stablemaster.toml").await?;
//!     let curves = config.build_curves()?;
//!     println!("Speed tops out at level {}", curves.get(stablemaster::training::Ability::Speed).max_level());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [training]
//! dehydration_distance = 5000.0
//! bucket_hydration = 0.25
//! speed_limit = 10.0
//! abandoned_days = 14
//!
//! [[abilities.health.levels]]
//! level = 1
//! effort = 0.0
//! value = 15.0
//! ```
//!
//! Ability tables are validated when the curves are built; a malformed table
//! aborts startup.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::storage::backup::RetentionPolicy;
use crate::training::ability::{AbilityCurves, CurveConfig};
use crate::training::errors::TrainingError;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub abilities: AbilitiesConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the horse database path; defaults to `<data_dir>/horses`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    /// Optional override for the backup directory; defaults to `<data_dir>/backups`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("horses"),
        }
    }

    pub fn backup_path(&self) -> PathBuf {
        match &self.backup_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("backups"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Constants of the training rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Metres of riding that drain a fully hydrated horse to zero.
    #[serde(default = "default_dehydration_distance")]
    pub dehydration_distance: f64,
    /// Hydration restored by one bucket of water.
    #[serde(default = "default_bucket_hydration")]
    pub bucket_hydration: f64,
    /// Largest accepted ratio of one tick's displacement to the next speed level's value.
    #[serde(default = "default_speed_limit")]
    pub speed_limit: f64,
    /// Days without owner contact before a low-progress undead horse is abandoned.
    #[serde(default = "default_abandoned_days")]
    pub abandoned_days: i64,
    /// Minimum ticks between two dehydration warnings to the same rider.
    #[serde(default = "default_dehydration_warning_ticks")]
    pub dehydration_warning_ticks: u64,
    /// Ticks between save cycles (0 disables periodic saves).
    #[serde(default = "default_save_interval_ticks")]
    pub save_interval_ticks: u64,
    /// Log per-horse events for horses that have the debug flag set.
    #[serde(default)]
    pub debug_events: bool,
}

fn default_dehydration_distance() -> f64 {
    5000.0
}

fn default_bucket_hydration() -> f64 {
    0.25
}

fn default_speed_limit() -> f64 {
    10.0
}

fn default_abandoned_days() -> i64 {
    14
}

fn default_dehydration_warning_ticks() -> u64 {
    100
}

fn default_save_interval_ticks() -> u64 {
    6000
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dehydration_distance: default_dehydration_distance(),
            bucket_hydration: default_bucket_hydration(),
            speed_limit: default_speed_limit(),
            abandoned_days: default_abandoned_days(),
            dehydration_warning_ticks: default_dehydration_warning_ticks(),
            save_interval_ticks: default_save_interval_ticks(),
            debug_events: false,
        }
    }
}

impl TrainingConfig {
    /// Reject constants that would make the rules divide by zero or never trigger.
    pub fn validate(&self) -> Result<()> {
        if !(self.dehydration_distance > 0.0) {
            return Err(anyhow!(
                "training.dehydration_distance must be positive (got {})",
                self.dehydration_distance
            ));
        }
        if !(self.speed_limit > 0.0) {
            return Err(anyhow!("training.speed_limit must be positive (got {})", self.speed_limit));
        }
        if !(0.0..=1.0).contains(&self.bucket_hydration) {
            return Err(anyhow!(
                "training.bucket_hydration must be within [0, 1] (got {})",
                self.bucket_hydration
            ));
        }
        if self.abandoned_days < 0 {
            return Err(anyhow!("training.abandoned_days must not be negative"));
        }
        Ok(())
    }
}

/// Level tables for the three abilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilitiesConfig {
    pub speed: CurveConfig,
    pub jump: CurveConfig,
    pub health: CurveConfig,
}

impl Default for AbilitiesConfig {
    fn default() -> Self {
        Self {
            speed: CurveConfig::default_speed(),
            jump: CurveConfig::default_jump(),
            health: CurveConfig::default_health(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Snapshot the database before the startup orphan purge.
    #[serde(default = "default_backup_on_startup")]
    pub on_startup: bool,
    #[serde(default)]
    pub retention: RetentionPolicy,
}

fn default_backup_on_startup() -> bool {
    true
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            retention: RetentionPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.training.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Validate the ability tables and build the curves used by the engine.
    pub fn build_curves(&self) -> Result<AbilityCurves, TrainingError> {
        AbilityCurves::new(&self.abilities.speed, &self.abilities.jump, &self.abilities.health)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_path: None,
                backup_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("stablemaster.log".to_string()),
            },
            training: TrainingConfig::default(),
            abilities: AbilitiesConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Ability;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed = Config::from_toml_str(&text).expect("parse");
        assert_eq!(parsed.training.abandoned_days, 14);
        assert_eq!(parsed.abilities.health, config.abilities.health);
        parsed.build_curves().expect("default curves are valid");
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let text = r#"
            [storage]
            data_dir = "/tmp/stable"

            [logging]
            level = "debug"
        "#;
        let config = Config::from_toml_str(text).expect("parse");
        assert_eq!(config.training.dehydration_warning_ticks, 100);
        assert_eq!(config.training.bucket_hydration, 0.25);
        assert!(config.backup.on_startup);
        assert_eq!(config.storage.db_path(), PathBuf::from("/tmp/stable/horses"));
        assert_eq!(config.storage.backup_path(), PathBuf::from("/tmp/stable/backups"));
    }

    #[test]
    fn custom_health_table_is_used() {
        let text = r#"
            [storage]
            data_dir = "./data"

            [logging]
            level = "info"

            [abilities.speed]
            levels = [{ level = 1, effort = 0.0, value = 0.1 }]

            [abilities.jump]
            levels = [{ level = 1, effort = 0.0, value = 0.4 }]

            [abilities.health]
            levels = [
                { level = 1, effort = 0.0, value = 15.0 },
                { level = 2, effort = 72.0, value = 17.0 },
            ]
        "#;
        let config = Config::from_toml_str(text).expect("parse");
        let curves = config.build_curves().expect("curves");
        assert_eq!(curves.get(Ability::Health).level_for_effort(72.0), 2);
        assert_eq!(curves.get(Ability::Speed).max_level(), 1);
    }

    #[test]
    fn malformed_curve_fails_to_build() {
        let mut config = Config::default();
        config.abilities.jump.levels.clear();
        let err = config.build_curves().expect_err("empty table");
        assert!(matches!(err, TrainingError::Configuration { ability: Ability::Jump, .. }));
    }

    #[test]
    fn rejects_zero_dehydration_distance() {
        let mut config = Config::default();
        config.training.dehydration_distance = 0.0;
        assert!(config.training.validate().is_err());
    }
}
