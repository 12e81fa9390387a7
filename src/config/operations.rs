//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::MAX_DELAY_MS;
use crate::error::{Result, SocklockError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "SOCKLOCK_CONFIG";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            SocklockError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Resolve the effective config: an explicit path wins, then
    /// `SOCKLOCK_CONFIG`, then built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| SocklockError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            SocklockError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock_dir` must be absolute when set
    /// - `socket_suffix` must be non-empty and contain no path separators
    /// - millisecond settings must not exceed ten seconds
    /// - `probe_timeout_ms` and `foreign_poll_ms` must be positive
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.lock_dir
            && !dir.is_absolute()
        {
            return Err(SocklockError::ConfigError(format!(
                "config validation failed: lock_dir must be an absolute path (found '{}')",
                dir.display()
            )));
        }

        if self.socket_suffix.is_empty() {
            return Err(SocklockError::ConfigError(
                "config validation failed: socket_suffix must be non-empty".to_string(),
            ));
        }
        if self.socket_suffix.contains(['/', '\\']) {
            return Err(SocklockError::ConfigError(format!(
                "config validation failed: socket_suffix must not contain path separators (found '{}')",
                self.socket_suffix
            )));
        }

        for (field, value) in [
            ("reclaim_backoff_ms", self.reclaim_backoff_ms),
            ("foreign_poll_ms", self.foreign_poll_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(SocklockError::ConfigError(format!(
                    "config validation failed: {} must be at most {} (found {})",
                    field, MAX_DELAY_MS, value
                )));
            }
        }

        if self.probe_timeout_ms == 0 {
            return Err(SocklockError::ConfigError(
                "config validation failed: probe_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.foreign_poll_ms == 0 {
            return Err(SocklockError::ConfigError(
                "config validation failed: foreign_poll_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Directory that bare lock names resolve into.
    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn reclaim_backoff(&self) -> Duration {
        Duration::from_millis(self.reclaim_backoff_ms)
    }

    pub fn foreign_poll(&self) -> Duration {
        Duration::from_millis(self.foreign_poll_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
