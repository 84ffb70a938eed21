//! User configuration loaded from `~/.globecache/config.ini`.
//!
//! The file has fixed `[cache]`, `[download]` and `[logging]` sections
//! plus one `[layer.NAME]` section per tile layer.
//!
//! # Example
//!
//! ```no_run
//! use globecache::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! for layer in config.image_layers() {
//!     println!("{} ({})", layer.name(), layer.provider.kind());
//! }
//! # Ok::<(), globecache::config::ConfigFileError>(())
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    config_directory, config_file_path, default_log_directory, CONFIG_DIR_NAME,
    CONFIG_FILE_NAME, DEFAULT_CACHE_FILL_FACTOR, DEFAULT_CACHE_IDLE_EXPIRY_SECS,
    DEFAULT_CACHE_MAX_BLOCKS, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_LOG_FILE,
};
pub use file::ConfigFileError;
pub use settings::{
    CacheSettings, ConfigFile, DownloadSettings, LayerRole, LayerSettings, LoggingSettings,
};
