//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;
use tracing::debug;

use super::defaults::*;
use super::{global_config_path, Config};

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `VCSTATUS_` and use double underscores
    /// for nested values. For example:
    /// - `VCSTATUS_STATUS__QUIET_PERIOD_MS=500`
    /// - `VCSTATUS_WATCHER__ENABLED=false`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        // The config crate doesn't apply serde defaults for missing sections
        let builder = set_config_default(
            builder,
            "status.tick_interval_ms",
            default_tick_interval_ms() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "status.quiet_period_ms",
            default_quiet_period_ms() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "status.rebuild_threshold",
            default_rebuild_threshold() as i64,
        )?;
        let builder = set_config_default(builder, "status.metadata_dir", default_metadata_dir())?;
        let builder =
            set_config_default(builder, "status.metadata_file", default_metadata_file())?;
        let builder =
            set_config_default(builder, "status.include_ignored", default_include_ignored())?;
        let builder = set_config_default(builder, "watcher.enabled", default_watch_enabled())?;
        let mut builder = set_config_default(
            builder,
            "watcher.poll_interval_ms",
            default_poll_interval_ms() as i64,
        )?;

        // Add the config file if it exists
        if path.exists() {
            debug!("Loading configuration from {:?}", path);
            builder = builder.add_source(File::from(path));
        } else {
            debug!("No configuration file at {:?}, using defaults", path);
        }

        // Add environment variables with VCSTATUS_ prefix
        builder = builder.add_source(
            Environment::with_prefix("VCSTATUS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.vcstatus/config.toml or custom --config path)
    /// 3. Environment variables (VCSTATUS_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
