//! Default values and functions for configuration

pub(crate) const DEFAULT_METADATA_DIR: &str = ".git";
pub(crate) const DEFAULT_METADATA_FILE: &str = "index";

pub(crate) fn default_tick_interval_ms() -> u64 {
    100
}

pub(crate) fn default_quiet_period_ms() -> u64 {
    2000
}

pub(crate) fn default_rebuild_threshold() -> usize {
    200
}

pub(crate) fn default_metadata_dir() -> String {
    DEFAULT_METADATA_DIR.to_string()
}

pub(crate) fn default_metadata_file() -> String {
    DEFAULT_METADATA_FILE.to_string()
}

pub(crate) fn default_include_ignored() -> bool {
    true
}

pub(crate) fn default_watch_enabled() -> bool {
    true
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    2000
}
