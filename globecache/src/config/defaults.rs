//! Default values for configuration settings.

use std::path::PathBuf;

use crate::cache::DEFAULT_FILL_FACTOR;
use crate::orchestrator::DEFAULT_MAX_BLOCKS;
use crate::provider::DEFAULT_TIMEOUT_SECS;

/// Name of the directory under `$HOME` holding configuration and logs.
pub const CONFIG_DIR_NAME: &str = ".globecache";

pub const CONFIG_FILE_NAME: &str = "config.ini";

pub const DEFAULT_CACHE_MAX_BLOCKS: usize = DEFAULT_MAX_BLOCKS;
pub const DEFAULT_CACHE_FILL_FACTOR: f64 = DEFAULT_FILL_FACTOR;
/// Seconds; 0 disables idle expiration.
pub const DEFAULT_CACHE_IDLE_EXPIRY_SECS: u64 = 0;

pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = DEFAULT_TIMEOUT_SECS;

pub const DEFAULT_LOG_FILE: &str = "globecache.log";

/// Imagery and elevation datasets served by openwebglobe.org.
pub const DEFAULT_IMAGE_SERVER: &str = "http://www.openwebglobe.org/data/img";
pub const DEFAULT_IMAGE_LAYER: &str = "World500";
pub const DEFAULT_ELEVATION_SERVER: &str = "http://www.openwebglobe.org/data/elv";
pub const DEFAULT_ELEVATION_LAYER: &str = "SRTM";

/// Get the path to the config directory (~/.globecache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.globecache/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Get the default log directory (~/.globecache/logs).
pub fn default_log_directory() -> PathBuf {
    config_directory().join("logs")
}
