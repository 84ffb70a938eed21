//! OGC Web Map Tile Service provider.
//!
//! Issues KVP `GetTile` requests against a Google-compatible spherical
//! Mercator tile matrix set, where matrix `n` is the `2^n × 2^n` grid of
//! level `n` and rows count from the north edge.

use std::future;

use tracing::trace;

use super::http::AsyncHttpClient;
use super::types::{ProviderError, TileData, TileFuture, TileProvider};
use super::wms::query_separator;
use crate::coord::{QuadKey, MAX_LOD};

/// Default `FORMAT` parameter.
pub const DEFAULT_WMTS_FORMAT: &str = "image/png";

/// Default `STYLE` parameter.
pub const DEFAULT_WMTS_STYLE: &str = "default";

/// Default `TILEMATRIXSET` parameter.
pub const DEFAULT_WMTS_MATRIX_SET: &str = "EPSG:900913";

/// Deepest level requested unless configured otherwise.
pub const DEFAULT_WMTS_MAX_LOD: u8 = 19;

/// WMTS tile provider.
pub struct WmtsProvider<C: AsyncHttpClient> {
    name: String,
    http_client: C,
    server: String,
    layer: String,
    format: String,
    style: String,
    matrix_set: String,
    max_lod: u8,
}

impl<C: AsyncHttpClient> WmtsProvider<C> {
    pub fn new(
        http_client: C,
        name: impl Into<String>,
        server: impl Into<String>,
        layer: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            http_client,
            server: server.into(),
            layer: layer.into(),
            format: DEFAULT_WMTS_FORMAT.to_string(),
            style: DEFAULT_WMTS_STYLE.to_string(),
            matrix_set: DEFAULT_WMTS_MATRIX_SET.to_string(),
            max_lod: DEFAULT_WMTS_MAX_LOD,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Tile matrix set identifier. Matrices are addressed as `{set}:{lod}`.
    pub fn with_matrix_set(mut self, matrix_set: impl Into<String>) -> Self {
        self.matrix_set = matrix_set.into();
        self
    }

    /// Deepest level served, capped at [`MAX_LOD`].
    pub fn with_max_lod(mut self, max_lod: u8) -> Self {
        self.max_lod = max_lod.min(MAX_LOD);
        self
    }

    fn build_url(&self, quadkey: &QuadKey) -> String {
        let tile = quadkey.tile_coord();
        let matrix_set = urlencoding::encode(&self.matrix_set);
        format!(
            "{}{}SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER={}&STYLE={}\
             &TILEMATRIXSET={}&TILEMATRIX={}:{}&TILEROW={}&TILECOL={}&FORMAT={}",
            self.server,
            query_separator(&self.server),
            urlencoding::encode(&self.layer),
            urlencoding::encode(&self.style),
            matrix_set,
            matrix_set,
            tile.lod,
            tile.xyz_row(),
            tile.x,
            urlencoding::encode(&self.format),
        )
    }
}

impl<C: AsyncHttpClient> TileProvider for WmtsProvider<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn has_failed(&self) -> bool {
        false
    }

    fn min_lod(&self) -> u8 {
        0
    }

    fn max_lod(&self) -> u8 {
        self.max_lod
    }

    fn contains(&self, quadkey: &QuadKey) -> bool {
        self.supports_lod(quadkey.lod())
    }

    fn request_tile(&self, quadkey: &QuadKey) -> TileFuture {
        if !self.supports_lod(quadkey.lod()) {
            return Box::pin(future::ready(Err(ProviderError::UnsupportedLod(
                quadkey.lod(),
            ))));
        }

        let url = self.build_url(quadkey);
        trace!(provider = %self.name, quadkey = %quadkey, url = %url, "requesting tile");

        let client = self.http_client.clone();
        let quadkey = quadkey.clone();
        let format = self.format.clone();
        Box::pin(async move {
            let bytes = client.get(&url).await?;
            Ok(TileData::new(quadkey, format, bytes))
        })
    }
}
