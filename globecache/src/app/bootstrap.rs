//! Application bootstrap implementation.
//!
//! This module contains `GlobeApp` which wires the configured layers into
//! a tile orchestrator, loading every layer's metadata before the first
//! block is requested.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use super::config::AppConfig;
use super::error::AppError;
use crate::config::ConfigFile;
use crate::coord::QuadKey;
use crate::orchestrator::{BlockHandle, FetchStats, TileOrchestrator};
use crate::provider::{
    AsyncHttpClient, AsyncReqwestClient, ProviderConfig, ProviderFactory, TileProvider,
};

/// GlobeCache application with service lifecycle management.
///
/// Startup order:
/// 1. Create one provider per configured layer (sharing one HTTP client)
/// 2. Load every layer's metadata concurrently
/// 3. Build the tile orchestrator over the prepared providers
///
/// A layer whose metadata fails to load does not abort startup; the
/// orchestrator then reports [`has_failed`](TileOrchestrator::has_failed)
/// and rejects block requests.
///
/// # Example
///
/// ```ignore
/// use globecache::app::GlobeApp;
/// use globecache::config::ConfigFile;
///
/// let mut app = GlobeApp::start(&ConfigFile::load()?).await?;
/// let handles = app.fetch_blocks(&["0312".parse()?]).await?;
/// let stats = app.shutdown();
/// ```
pub struct GlobeApp {
    orchestrator: TileOrchestrator,
    config: AppConfig,
}

impl GlobeApp {
    /// Start the application from a loaded configuration file, using the
    /// reqwest HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, no image layer
    /// is configured, or a layer's parameters are invalid.
    pub async fn start(config: &ConfigFile) -> Result<Self, AppError> {
        let config = AppConfig::from_config_file(config);
        let client = AsyncReqwestClient::with_timeout(config.download_timeout_secs)
            .map_err(AppError::HttpClient)?;
        Self::start_with_client(config, client).await
    }

    /// Start the application with a specific HTTP client.
    pub async fn start_with_client<C: AsyncHttpClient>(
        config: AppConfig,
        client: C,
    ) -> Result<Self, AppError> {
        info!(
            image_layers = config.image_layers.len(),
            elevation_layers = config.elevation_layers.len(),
            "Starting GlobeApp"
        );

        if config.image_layers.is_empty() {
            return Err(AppError::NoImageLayers);
        }
        config.orchestrator.validate()?;

        let factory = ProviderFactory::new(client);
        let images = create_layers(&factory, &config.image_layers)?;
        let elevations = create_layers(&factory, &config.elevation_layers)?;

        let prepares = images.iter().chain(elevations.iter()).map(|provider| {
            let name = provider.name().to_string();
            let prepare = provider.prepare();
            async move { (name, prepare.await) }
        });
        for (name, result) in join_all(prepares).await {
            match result {
                Ok(()) => info!(layer = %name, "Layer ready"),
                Err(e) => warn!(layer = %name, error = %e, "Layer metadata failed to load"),
            }
        }

        let orchestrator = TileOrchestrator::new(images, elevations, config.orchestrator.clone())?;
        info!(
            ready = orchestrator.is_ready(),
            max_lod = orchestrator.max_lod(),
            "GlobeApp started"
        );

        Ok(Self {
            orchestrator,
            config,
        })
    }

    pub fn orchestrator(&self) -> &TileOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut TileOrchestrator {
        &mut self.orchestrator
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.orchestrator.is_ready()
    }

    /// Request every block and wait until all of their layer fetches have
    /// completed.
    ///
    /// Handles are returned in input order. A handle may no longer resolve
    /// if the block was purged because more blocks were requested than the
    /// cache holds.
    pub async fn fetch_blocks(
        &mut self,
        quadkeys: &[QuadKey],
    ) -> Result<Vec<BlockHandle>, AppError> {
        let handles = quadkeys
            .iter()
            .map(|quadkey| self.orchestrator.request_block(quadkey))
            .collect::<Result<Vec<_>, _>>()?;
        self.orchestrator.settle().await;
        Ok(handles)
    }

    /// Shutdown the application, destroying the orchestrator.
    ///
    /// Returns the session's fetch counters.
    pub fn shutdown(mut self) -> FetchStats {
        info!("Shutting down GlobeApp");
        let stats = self.orchestrator.stats();
        self.orchestrator.destroy();
        info!(%stats, "GlobeApp shutdown complete");
        stats
    }
}

fn create_layers<C: AsyncHttpClient>(
    factory: &ProviderFactory<C>,
    layers: &[ProviderConfig],
) -> Result<Vec<Arc<dyn TileProvider>>, AppError> {
    layers
        .iter()
        .map(|layer| {
            factory.create(layer).map_err(|source| AppError::Layer {
                name: layer.name().to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{ImageComposition, OrchestratorConfig, OrchestratorError};
    use crate::provider::{MockAsyncHttpClient, ProviderError};

    fn osm() -> ProviderConfig {
        ProviderConfig::xyz("osm", vec!["https://tile.example.org".into()], 0, 19)
    }

    #[tokio::test]
    async fn test_start_requires_image_layer() {
        let config = AppConfig::new(vec![]);
        let result = GlobeApp::start_with_client(config, MockAsyncHttpClient::ok(vec![])).await;
        assert!(matches!(result, Err(AppError::NoImageLayers)));
    }

    #[tokio::test]
    async fn test_invalid_layer_rejected() {
        let config = AppConfig::new(vec![ProviderConfig::xyz("empty", vec![], 0, 19)]);
        let result = GlobeApp::start_with_client(config, MockAsyncHttpClient::ok(vec![])).await;
        assert!(matches!(result, Err(AppError::Layer { ref name, .. }) if name == "empty"));
    }

    #[tokio::test]
    async fn test_invalid_fill_factor_rejected() {
        let config = AppConfig::new(vec![osm()])
            .with_orchestrator(OrchestratorConfig::default().with_fill_factor(1.5));
        let result = GlobeApp::start_with_client(config, MockAsyncHttpClient::ok(vec![])).await;
        assert!(matches!(
            result,
            Err(AppError::Orchestrator(OrchestratorError::InvalidConfig(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_blocks_and_shutdown() {
        let client = MockAsyncHttpClient::ok(vec![0x89, b'P', b'N', b'G']);
        let mut app = GlobeApp::start_with_client(AppConfig::new(vec![osm()]), client.clone())
            .await
            .unwrap();
        assert!(app.is_ready());

        let quadkey = QuadKey::parse("0123").unwrap();
        let handles = app.fetch_blocks(&[quadkey]).await.unwrap();

        let block = app.orchestrator().block(handles[0]).unwrap();
        assert!(block.is_available());
        assert_eq!(block.image_composition(), ImageComposition::Single(0));
        assert_eq!(
            client.requested_urls(),
            vec!["https://tile.example.org/4/5/3.png"]
        );

        let stats = app.shutdown();
        assert_eq!(stats.loaded, 1);
        assert_eq!(stats.bytes_loaded, 4);
    }

    #[tokio::test]
    async fn test_failed_metadata_blocks_requests() {
        let client = MockAsyncHttpClient::err(ProviderError::HttpError("404".into()));
        let config = AppConfig::new(vec![osm()]).with_elevation_layers(vec![
            ProviderConfig::dataset("srtm", vec!["http://a.example.org/elv".into()], "SRTM"),
        ]);

        let mut app = GlobeApp::start_with_client(config, client).await.unwrap();

        assert!(!app.is_ready());
        assert!(app.orchestrator().has_failed());
        let result = app.fetch_blocks(&[QuadKey::parse("1").unwrap()]).await;
        assert!(matches!(
            result,
            Err(AppError::Orchestrator(OrchestratorError::NotReady))
        ));
    }
}
