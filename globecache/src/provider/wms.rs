//! OGC Web Map Service provider.
//!
//! Requests each tile as a 256×256 `GetMap` in spherical Mercator
//! (`EPSG:900913`), with the tile's Mercator bounds as `BBOX`. A WMS
//! renders any extent, so every tile down to [`MAX_LOD`] is covered.

use tracing::trace;

use super::http::AsyncHttpClient;
use super::types::{ProviderError, TileData, TileFuture, TileProvider};
use crate::coord::{QuadKey, MAX_LOD};

/// Tile edge length requested from the server, in pixels.
pub const WMS_TILE_SIZE: u32 = 256;

/// Default `FORMAT` parameter.
pub const DEFAULT_WMS_FORMAT: &str = "image/png";

/// Default `VERSION` parameter.
pub const DEFAULT_WMS_VERSION: &str = "1.1.1";

/// WMS tile provider.
pub struct WmsProvider<C: AsyncHttpClient> {
    name: String,
    http_client: C,
    server: String,
    layer: String,
    format: String,
    style: String,
    version: String,
}

impl<C: AsyncHttpClient> WmsProvider<C> {
    /// Creates a provider for `layer` on `server` with default format,
    /// style and version.
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
            format: DEFAULT_WMS_FORMAT.to_string(),
            style: String::new(),
            version: DEFAULT_WMS_VERSION.to_string(),
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

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Builds the `GetMap` URL for the given tile.
    fn build_url(&self, quadkey: &QuadKey) -> String {
        let [x0, y0, x1, y1] = quadkey.mercator_bounds();
        let separator = query_separator(&self.server);
        format!(
            "{}{}service=WMS&request=GetMap&WIDTH={size}&HEIGHT={size}&TILED=TRUE\
             &SRS=EPSG%3A900913&LAYERS={}&STYLES={}&FORMAT={}&VERSION={}&BBOX={},{},{},{}",
            self.server,
            separator,
            urlencoding::encode(&self.layer),
            urlencoding::encode(&self.style),
            urlencoding::encode(&self.format),
            urlencoding::encode(&self.version),
            x0,
            y0,
            x1,
            y1,
            size = WMS_TILE_SIZE,
        )
    }
}

/// What to put between a service URL and the first request parameter.
pub(super) fn query_separator(server: &str) -> &'static str {
    if server.ends_with('?') || server.ends_with('&') {
        ""
    } else if server.contains('?') {
        "&"
    } else {
        "?"
    }
}

impl<C: AsyncHttpClient> TileProvider for WmsProvider<C> {
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
        MAX_LOD
    }

    fn contains(&self, quadkey: &QuadKey) -> bool {
        quadkey.lod() <= MAX_LOD
    }

    fn request_tile(&self, quadkey: &QuadKey) -> TileFuture {
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
