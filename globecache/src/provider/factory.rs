//! Provider factory for centralized provider creation.

use std::sync::Arc;

use super::dataset::DatasetProvider;
use super::http::AsyncHttpClient;
use super::types::{ProviderError, TileProvider};
use super::wms::{WmsProvider, DEFAULT_WMS_FORMAT, DEFAULT_WMS_VERSION};
use super::wmts::{
    WmtsProvider, DEFAULT_WMTS_FORMAT, DEFAULT_WMTS_MATRIX_SET, DEFAULT_WMTS_MAX_LOD,
    DEFAULT_WMTS_STYLE,
};
use super::xyz::XyzProvider;

/// Configuration for creating a provider.
///
/// # Example
///
/// ```
/// use globecache::provider::ProviderConfig;
///
/// let osm = ProviderConfig::xyz("osm", vec!["https://tile.openstreetmap.org".into()], 0, 19);
/// let world = ProviderConfig::dataset(
///     "world",
///     vec!["http://www.openwebglobe.org/data/img".into()],
///     "World500",
/// );
/// assert_eq!(osm.name(), "osm");
/// assert_eq!(world.kind(), "dataset");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// Tile-service dataset described by `layersettings.json`.
    Dataset {
        name: String,
        servers: Vec<String>,
        layer: String,
    },

    /// Slippy-map tile server.
    Xyz {
        name: String,
        servers: Vec<String>,
        min_lod: u8,
        max_lod: u8,
        /// URL template, see [`XyzProvider::with_template`].
        template: Option<String>,
    },

    /// OGC Web Map Service.
    Wms {
        name: String,
        server: String,
        layer: String,
        format: String,
        style: String,
        version: String,
    },

    /// OGC Web Map Tile Service.
    Wmts {
        name: String,
        server: String,
        layer: String,
        format: String,
        style: String,
        matrix_set: String,
        max_lod: u8,
    },
}

impl ProviderConfig {
    pub fn dataset(name: impl Into<String>, servers: Vec<String>, layer: impl Into<String>) -> Self {
        Self::Dataset {
            name: name.into(),
            servers,
            layer: layer.into(),
        }
    }

    pub fn xyz(name: impl Into<String>, servers: Vec<String>, min_lod: u8, max_lod: u8) -> Self {
        Self::Xyz {
            name: name.into(),
            servers,
            min_lod,
            max_lod,
            template: None,
        }
    }

    /// WMS layer with default format, style and version.
    pub fn wms(
        name: impl Into<String>,
        server: impl Into<String>,
        layer: impl Into<String>,
    ) -> Self {
        Self::Wms {
            name: name.into(),
            server: server.into(),
            layer: layer.into(),
            format: DEFAULT_WMS_FORMAT.to_string(),
            style: String::new(),
            version: DEFAULT_WMS_VERSION.to_string(),
        }
    }

    /// WMTS layer with default format, style, matrix set and depth.
    pub fn wmts(
        name: impl Into<String>,
        server: impl Into<String>,
        layer: impl Into<String>,
    ) -> Self {
        Self::Wmts {
            name: name.into(),
            server: server.into(),
            layer: layer.into(),
            format: DEFAULT_WMTS_FORMAT.to_string(),
            style: DEFAULT_WMTS_STYLE.to_string(),
            matrix_set: DEFAULT_WMTS_MATRIX_SET.to_string(),
            max_lod: DEFAULT_WMTS_MAX_LOD,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Dataset { name, .. }
            | Self::Xyz { name, .. }
            | Self::Wms { name, .. }
            | Self::Wmts { name, .. } => name,
        }
    }

    /// Backend type as written in configuration files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dataset { .. } => "dataset",
            Self::Xyz { .. } => "xyz",
            Self::Wms { .. } => "wms",
            Self::Wmts { .. } => "wmts",
        }
    }
}

/// Creates providers sharing one HTTP client.
pub struct ProviderFactory<C: AsyncHttpClient> {
    http_client: C,
}

impl<C: AsyncHttpClient> ProviderFactory<C> {
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    /// Build the provider described by `config`.
    pub fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn TileProvider>, ProviderError> {
        let client = self.http_client.clone();
        let provider: Arc<dyn TileProvider> = match config {
            ProviderConfig::Dataset {
                name,
                servers,
                layer,
            } => Arc::new(DatasetProvider::new(
                client,
                name.clone(),
                servers.clone(),
                layer.clone(),
            )?),
            ProviderConfig::Xyz {
                name,
                servers,
                min_lod,
                max_lod,
                template,
            } => {
                let provider =
                    XyzProvider::new(client, name.clone(), servers.clone(), *min_lod, *max_lod)?;
                match template {
                    Some(template) => Arc::new(provider.with_template(template.clone())),
                    None => Arc::new(provider),
                }
            }
            ProviderConfig::Wms {
                name,
                server,
                layer,
                format,
                style,
                version,
            } => Arc::new(
                WmsProvider::new(client, name.clone(), server.clone(), layer.clone())
                    .with_format(format.clone())
                    .with_style(style.clone())
                    .with_version(version.clone()),
            ),
            ProviderConfig::Wmts {
                name,
                server,
                layer,
                format,
                style,
                matrix_set,
                max_lod,
            } => Arc::new(
                WmtsProvider::new(client, name.clone(), server.clone(), layer.clone())
                    .with_format(format.clone())
                    .with_style(style.clone())
                    .with_matrix_set(matrix_set.clone())
                    .with_max_lod(*max_lod),
            ),
        };
        Ok(provider)
    }
}
