//! Application configuration for GlobeApp.
//!
//! `AppConfig` combines everything needed to bootstrap the application:
//! cache sizing, download timeout and the image and elevation layers.

use crate::config::ConfigFile;
use crate::orchestrator::OrchestratorConfig;
use crate::provider::{ProviderConfig, DEFAULT_TIMEOUT_SECS};

/// Application configuration combining all component configs.
///
/// This is the top-level configuration passed to
/// [`GlobeApp::start_with_client`](super::GlobeApp::start_with_client).
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Block cache configuration.
    pub orchestrator: OrchestratorConfig,

    /// HTTP timeout in seconds.
    pub download_timeout_secs: u64,

    /// Image layers, in blend order.
    pub image_layers: Vec<ProviderConfig>,

    /// Elevation layers.
    pub elevation_layers: Vec<ProviderConfig>,
}

impl AppConfig {
    /// Create a config with the given image layers and default settings.
    pub fn new(image_layers: Vec<ProviderConfig>) -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            download_timeout_secs: DEFAULT_TIMEOUT_SECS,
            image_layers,
            elevation_layers: Vec::new(),
        }
    }

    pub fn with_elevation_layers(mut self, layers: Vec<ProviderConfig>) -> Self {
        self.elevation_layers = layers;
        self
    }

    pub fn with_orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Build from a loaded configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            orchestrator: config.orchestrator_config(),
            download_timeout_secs: config.download.timeout,
            image_layers: config
                .image_layers()
                .map(|layer| layer.provider.clone())
                .collect(),
            elevation_layers: config
                .elevation_layers()
                .map(|layer| layer.provider.clone())
                .collect(),
        }
    }
}
