//! OpenWebGlobe tile-service dataset provider.
//!
//! A dataset lives under `{server}/{layer}/` and describes itself in
//! `layersettings.json`. Tiles are stored at
//! `{server}/{layer}/tiles/{lod}/{x}/{row}{ext}` where `row` counts from the
//! north edge. The provider is not ready until [`TileProvider::prepare`]
//! has loaded the dataset description.

use std::fmt;
use std::future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use super::http::AsyncHttpClient;
use super::types::{BoxFuture, ProviderError, TileData, TileFuture, TileProvider};
use crate::coord::{QuadKey, MAX_LOD};

/// Name of the dataset description file.
pub const DATASET_INFO_FILE: &str = "layersettings.json";

/// Contents of `layersettings.json`.
///
/// `boundingbox` is the covered tile range at the dataset's deepest
/// level as `[x_min, row_min, x_max, row_max]`, rows counted from the
/// north edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub layer: String,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub srs: Option<u32>,
    pub boundingbox: [i64; 4],
    pub levelofdetail: u8,
    #[serde(default)]
    pub imagewidth: Option<u64>,
    #[serde(default)]
    pub imageheight: Option<u64>,
    #[serde(default)]
    pub tilesize: Option<u32>,
    #[serde(default)]
    pub tilelayout: Option<Vec<u64>>,
    pub tileformat: String,
    #[serde(default)]
    pub bounds: Option<Vec<f64>>,
    #[serde(default)]
    pub center: Option<Vec<f64>>,
}

impl DatasetInfo {
    /// File extension for the tile format.
    pub fn file_extension(&self) -> &'static str {
        match self.tileformat.as_str() {
            "image/png" => ".png",
            "image/jpg" | "image/jpeg" => ".jpg",
            "elevation/json" => ".json",
            _ => "",
        }
    }

    /// Deepest level with tiles.
    pub fn max_lod(&self) -> u8 {
        self.levelofdetail.saturating_sub(1)
    }

    /// Whether any tile below `quadkey` falls inside the bounding box.
    ///
    /// The key is padded with `0` (north-west corner) and `3` (south-east
    /// corner) to [`max_lod`](Self::max_lod), the level the bounding box
    /// is expressed at, and the resulting tile range is tested for overlap
    /// with inclusive comparisons.
    pub fn covers(&self, quadkey: &QuadKey) -> bool {
        if quadkey.lod() > self.max_lod() {
            return false;
        }
        let depth = self.max_lod().min(MAX_LOD);
        let (north_west, south_east) = match (quadkey.pad_to(depth, 0), quadkey.pad_to(depth, 3))
        {
            (Ok(nw), Ok(se)) => (nw.tile_coord(), se.tile_coord()),
            _ => return false,
        };

        let x0 = i64::from(north_west.x);
        let x1 = i64::from(south_east.x);
        let row0 = i64::from(north_west.xyz_row());
        let row1 = i64::from(south_east.xyz_row());
        let [x_min, row_min, x_max, row_max] = self.boundingbox;

        !(x0 > x_max || x1 < x_min || row0 > row_max || row1 < row_min)
    }
}

impl fmt::Display for DatasetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.layer, self.tileformat)?;
        if let Some(copyright) = &self.copyright {
            write!(f, ", {}", copyright)?;
        }
        write!(f, ")")
    }
}

/// Metadata load state.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetState {
    Pending,
    Ready(Arc<DatasetInfo>),
    Failed(ProviderError),
}

/// Tile-service dataset provider.
pub struct DatasetProvider<C: AsyncHttpClient> {
    name: String,
    http_client: C,
    servers: Vec<String>,
    layer: String,
    state: Arc<RwLock<DatasetState>>,
    next_server: AtomicUsize,
}

impl<C: AsyncHttpClient> DatasetProvider<C> {
    /// Creates a provider for `layer`. Call [`TileProvider::prepare`]
    /// before requesting tiles.
    pub fn new(
        http_client: C,
        name: impl Into<String>,
        servers: Vec<String>,
        layer: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let name = name.into();
        if servers.is_empty() {
            return Err(ProviderError::ProviderSpecific(format!(
                "{}: at least one server is required",
                name
            )));
        }
        Ok(Self {
            name,
            http_client,
            servers: servers
                .into_iter()
                .map(|s| s.trim_end_matches('/').to_string())
                .collect(),
            layer: layer.into(),
            state: Arc::new(RwLock::new(DatasetState::Pending)),
            next_server: AtomicUsize::new(0),
        })
    }

    /// Current metadata state.
    pub fn state(&self) -> DatasetState {
        self.state.read().clone()
    }

    /// Loaded dataset description, if ready.
    pub fn info(&self) -> Option<Arc<DatasetInfo>> {
        match &*self.state.read() {
            DatasetState::Ready(info) => Some(Arc::clone(info)),
            _ => None,
        }
    }

    fn info_url(&self) -> String {
        format!("{}/{}/{}", self.servers[0], self.layer, DATASET_INFO_FILE)
    }

    fn build_url(&self, quadkey: &QuadKey, info: &DatasetInfo) -> String {
        let tile = quadkey.tile_coord();
        let index = self.next_server.fetch_add(1, Ordering::Relaxed) % self.servers.len();
        format!(
            "{}/{}/tiles/{}/{}/{}{}",
            self.servers[index],
            self.layer,
            tile.lod,
            tile.x,
            tile.xyz_row(),
            info.file_extension()
        )
    }
}

impl<C: AsyncHttpClient> TileProvider for DatasetProvider<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        matches!(*self.state.read(), DatasetState::Ready(_))
    }

    fn has_failed(&self) -> bool {
        matches!(*self.state.read(), DatasetState::Failed(_))
    }

    fn min_lod(&self) -> u8 {
        0
    }

    fn max_lod(&self) -> u8 {
        self.info().map(|info| info.max_lod()).unwrap_or(0)
    }

    fn contains(&self, quadkey: &QuadKey) -> bool {
        self.info().map(|info| info.covers(quadkey)).unwrap_or(false)
    }

    fn request_tile(&self, quadkey: &QuadKey) -> TileFuture {
        let info = match self.info() {
            Some(info) => info,
            None => {
                return Box::pin(future::ready(Err(ProviderError::NotReady(
                    self.name.clone(),
                ))))
            }
        };

        if !info.covers(quadkey) {
            return Box::pin(future::ready(Err(ProviderError::NotCovered(
                quadkey.clone(),
            ))));
        }

        let url = self.build_url(quadkey, &info);
        trace!(provider = %self.name, quadkey = %quadkey, url = %url, "requesting tile");

        let client = self.http_client.clone();
        let quadkey = quadkey.clone();
        Box::pin(async move {
            let bytes = client.get(&url).await?;
            Ok(TileData::new(quadkey, info.tileformat.clone(), bytes))
        })
    }

    fn prepare(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        let url = self.info_url();
        let client = self.http_client.clone();
        let state = Arc::clone(&self.state);
        let name = self.name.clone();

        Box::pin(async move {
            let result = match client.get(&url).await {
                Ok(body) => serde_json::from_slice::<DatasetInfo>(&body).map_err(|e| {
                    ProviderError::InvalidResponse(format!("{}: {}", DATASET_INFO_FILE, e))
                }),
                Err(e) => Err(e),
            };

            match result {
                Ok(info) => {
                    info!(provider = %name, dataset = %info, max_lod = info.max_lod(), "dataset info loaded");
                    *state.write() = DatasetState::Ready(Arc::new(info));
                    Ok(())
                }
                Err(e) => {
                    warn!(provider = %name, url = %url, error = %e, "dataset info download failed");
                    *state.write() = DatasetState::Failed(e.clone());
                    Err(e)
                }
            }
        })
    }
}
