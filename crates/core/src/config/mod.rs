//! Configuration module for vcstatus
//!
//! Configuration can be loaded from TOML files and/or environment variables.
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

mod defaults;
mod loading;


use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.vcstatus/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".vcstatus").join("config.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reconciliation loop configuration
    #[serde(default)]
    pub status: StatusConfig,

    /// Directory watcher configuration
    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// Reconciliation loop thresholds and repository layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Scheduler period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Time without new change events before a burst is considered settled
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Accumulated change count above which a full rebuild replaces
    /// per-file queries
    #[serde(default = "default_rebuild_threshold")]
    pub rebuild_threshold: usize,

    /// Name of the backend's metadata directory inside each root
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,

    /// File inside the metadata directory that tracks the working copy
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,

    /// Ask the backend to report ignored files during root scans
    #[serde(default = "default_include_ignored")]
    pub include_ignored: bool,
}

impl StatusConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            quiet_period_ms: default_quiet_period_ms(),
            rebuild_threshold: default_rebuild_threshold(),
            metadata_dir: default_metadata_dir(),
            metadata_file: default_metadata_file(),
            include_ignored: default_include_ignored(),
        }
    }
}

/// Configuration for directory watching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Deliver filesystem notifications at startup
    #[serde(default = "default_watch_enabled")]
    pub enabled: bool,

    /// Poll interval used when the platform watcher falls back to polling
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_watch_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.status.tick_interval_ms == 0 {
            return Err(Error::config(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.status.rebuild_threshold == 0 {
            return Err(Error::config(
                "rebuild_threshold must be greater than 0".to_string(),
            ));
        }

        if self.status.quiet_period_ms < self.status.tick_interval_ms {
            return Err(Error::config(format!(
                "quiet_period_ms ({}) must not be shorter than tick_interval_ms ({})",
                self.status.quiet_period_ms, self.status.tick_interval_ms
            )));
        }

        if self.status.metadata_dir.trim().is_empty() {
            return Err(Error::config("metadata_dir cannot be empty".to_string()));
        }

        if self.status.metadata_file.trim().is_empty() {
            return Err(Error::config("metadata_file cannot be empty".to_string()));
        }

        if self.watcher.poll_interval_ms == 0 {
            return Err(Error::config(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Saves configuration to a TOML file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, toml_string)
            .context(format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }
}
