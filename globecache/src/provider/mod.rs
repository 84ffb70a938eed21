//! Tile provider abstraction
//!
//! A [`TileProvider`] is one source of image or elevation tiles. The
//! orchestrator only sees the trait; each backend is a concrete type:
//!
//! - [`DatasetProvider`] - OpenWebGlobe tile-service datasets
//! - [`XyzProvider`] - slippy-map `{z}/{x}/{y}` tile servers
//! - [`WmsProvider`] - OGC Web Map Service `GetMap`
//! - [`WmtsProvider`] - OGC Web Map Tile Service `GetTile`
//!
//! # Factory Pattern
//!
//! For centralized provider creation, use the [`ProviderFactory`]:
//!
//! ```ignore
//! use globecache::provider::{AsyncReqwestClient, ProviderConfig, ProviderFactory};
//!
//! let factory = ProviderFactory::new(AsyncReqwestClient::new()?);
//! let provider = factory.create(&ProviderConfig::wms("wms", "https://example.org/wms", "roads"))?;
//! ```

mod dataset;
mod factory;
mod http;
mod types;
mod wms;
mod wmts;
mod xyz;

pub use dataset::{DatasetInfo, DatasetProvider, DatasetState, DATASET_INFO_FILE};
pub use factory::{ProviderConfig, ProviderFactory};
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use types::{BoxFuture, ProviderError, TileData, TileFuture, TileProvider};
pub use wms::{WmsProvider, DEFAULT_WMS_FORMAT, DEFAULT_WMS_VERSION, WMS_TILE_SIZE};
pub use wmts::{
    WmtsProvider, DEFAULT_WMTS_FORMAT, DEFAULT_WMTS_MATRIX_SET, DEFAULT_WMTS_MAX_LOD,
    DEFAULT_WMTS_STYLE,
};
pub use xyz::{XyzProvider, DEFAULT_XYZ_TEMPLATE, TMS_TEMPLATE};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
