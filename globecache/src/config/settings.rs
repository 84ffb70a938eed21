//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file, except
//! [`LayerSettings`] which represents one `[layer.NAME]` section.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;
use crate::orchestrator::OrchestratorConfig;
use crate::provider::ProviderConfig;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub download: DownloadSettings,
    pub logging: LoggingSettings,
    /// Tile layers in file order. Image layers blend in this order.
    pub layers: Vec<LayerSettings>,
}

/// Block cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Soft maximum of resident blocks, 0 for unbounded
    pub max_blocks: usize,
    /// Fraction of `max_blocks` kept after a purge
    pub fill_factor: f64,
    /// Seconds a block may go unrequested before it expires, 0 = never
    pub idle_expiry: u64,
}

/// Download configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    /// Timeout in seconds for HTTP requests.
    pub timeout: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

/// Which provider list a configured layer joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Image,
    Elevation,
}

impl LayerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerRole::Image => "image",
            LayerRole::Elevation => "elevation",
        }
    }
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `[layer.NAME]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings {
    pub role: LayerRole,
    /// Backend and connection parameters; its name is the section suffix.
    pub provider: ProviderConfig,
}

impl LayerSettings {
    pub fn image(provider: ProviderConfig) -> Self {
        Self {
            role: LayerRole::Image,
            provider,
        }
    }

    pub fn elevation(provider: ProviderConfig) -> Self {
        Self {
            role: LayerRole::Elevation,
            provider,
        }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }
}

impl ConfigFile {
    /// Orchestrator settings derived from the `[cache]` section.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let config = OrchestratorConfig::default()
            .with_max_blocks(self.cache.max_blocks)
            .with_fill_factor(self.cache.fill_factor);
        if self.cache.idle_expiry > 0 {
            config.with_expire_after_idle(Duration::from_secs(self.cache.idle_expiry))
        } else {
            config
        }
    }

    pub fn image_layers(&self) -> impl Iterator<Item = &LayerSettings> {
        self.layers.iter().filter(|l| l.role == LayerRole::Image)
    }

    pub fn elevation_layers(&self) -> impl Iterator<Item = &LayerSettings> {
        self.layers.iter().filter(|l| l.role == LayerRole::Elevation)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                max_blocks: DEFAULT_CACHE_MAX_BLOCKS,
                fill_factor: DEFAULT_CACHE_FILL_FACTOR,
                idle_expiry: DEFAULT_CACHE_IDLE_EXPIRY_SECS,
            },
            download: DownloadSettings {
                timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                directory: default_log_directory(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
            layers: vec![
                LayerSettings::image(ProviderConfig::dataset(
                    "world500",
                    vec![DEFAULT_IMAGE_SERVER.to_string()],
                    DEFAULT_IMAGE_LAYER,
                )),
                LayerSettings::elevation(ProviderConfig::dataset(
                    "srtm",
                    vec![DEFAULT_ELEVATION_SERVER.to_string()],
                    DEFAULT_ELEVATION_LAYER,
                )),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layers() {
        let config = ConfigFile::default();
        assert_eq!(config.image_layers().count(), 1);
        assert_eq!(config.elevation_layers().count(), 1);
        assert_eq!(config.layers[0].name(), "world500");
        assert_eq!(config.layers[1].role, LayerRole::Elevation);
    }

    #[test]
    fn test_orchestrator_config_idle_expiry() {
        let mut config = ConfigFile::default();
        assert!(config.orchestrator_config().expire_after_idle.is_none());

        config.cache.idle_expiry = 90;
        config.cache.max_blocks = 64;
        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.expire_after_idle, Some(Duration::from_secs(90)));
        assert_eq!(orchestrator.max_blocks, 64);
    }
}
