//! Configuration management for race-checklist.
//!
//! This module handles the `.race-checklist/config.yaml` file which stores
//! per-event settings: the admin password, the reporting timezone, the
//! refresh cadence and where the board database lives.

use crate::error::{Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file path relative to the event directory.
pub const CONFIG_FILE_PATH: &str = ".race-checklist/config.yaml";

/// Default reporting timezone.
pub const DEFAULT_TIMEZONE: &str = "US/Pacific";

/// Default refresh cadence for viewer surfaces, in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5;

/// Per-event board configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardConfig {
    /// Password that grants the admin capability. Empty disables admin access.
    #[serde(default)]
    pub admin_password: String,

    /// IANA timezone name used for note timestamps and history lines.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Seconds between viewer refreshes.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Background image shown behind the board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image_url: Option<String>,

    /// Database location. None means the per-event default under `~/.race-checklist`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

const fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            admin_password: String::new(),
            timezone: default_timezone(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            background_image_url: None,
            database_path: None,
        }
    }
}

impl BoardConfig {
    /// Load config from the current directory, returning None if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(Path::new("."))
    }

    /// Load config from a specific event directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load_from(base_dir: &Path) -> Result<Option<Self>> {
        let config_path = Self::config_path(base_dir);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Load config, falling back to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load_or_default(base_dir: &Path) -> Result<Self> {
        Ok(Self::load_from(base_dir)?.unwrap_or_default())
    }

    /// Save config to a specific event directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, base_dir: &Path) -> Result<()> {
        let config_path = Self::config_path(base_dir);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config file path for an event directory.
    pub fn config_path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE_PATH)
    }

    /// Check that the timezone parses and the interval is positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        self.reporting_timezone()?;
        if self.refresh_interval_secs == 0 {
            return Err(Error::InvalidInput("refresh_interval_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// The parsed reporting timezone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name is not a known IANA zone.
    pub fn reporting_timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| Error::InvalidInput(format!("unknown timezone: {}", self.timezone)))
    }

    /// The viewer refresh interval.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_board_config_default() {
        let config = BoardConfig::default();
        assert!(config.admin_password.is_empty());
        assert_eq!(config.timezone, "US/Pacific");
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_load_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(BoardConfig::load_from(dir.path()).unwrap().is_none());
        assert_eq!(BoardConfig::load_or_default(dir.path()).unwrap(), BoardConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let config = BoardConfig {
            admin_password: "fastgreen".to_string(),
            timezone: "America/Denver".to_string(),
            refresh_interval_secs: 15,
            background_image_url: Some("https://example.com/bg.jpg".to_string()),
            database_path: Some(PathBuf::from("/tmp/board.sqlite3")),
        };

        config.save_to(dir.path()).unwrap();

        let loaded = BoardConfig::load_from(dir.path()).unwrap().unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".race-checklist")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_PATH), "admin_password: hunter2\n").unwrap();

        let loaded = BoardConfig::load_from(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.admin_password, "hunter2");
        assert_eq!(loaded.timezone, DEFAULT_TIMEZONE);
        assert_eq!(loaded.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let config = BoardConfig { timezone: "Mars/Olympus".to_string(), ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = BoardConfig { refresh_interval_secs: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml_file_fails_to_load() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".race-checklist")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_PATH), "refresh_interval_secs: [oops").unwrap();

        assert!(BoardConfig::load_from(dir.path()).is_err());
    }
}
