//! Slippy-map (XYZ) tile provider.
//!
//! Serves the OpenStreetMap style `{z}/{x}/{y}` tile layout used by most
//! public raster tile servers.
//!
//! # Coordinate System
//!
//! XYZ servers number rows from the north edge, so `{y}` in the URL is
//! [`TileCoord::xyz_row`](crate::coord::TileCoord::xyz_row), not the
//! south-origin `y` of our tile coordinates. TMS servers count rows from
//! the south edge; `{-y}` gives that row (see [`TMS_TEMPLATE`]).

use std::future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use super::http::AsyncHttpClient;
use super::types::{ProviderError, TileData, TileFuture, TileProvider};
use crate::coord::{QuadKey, MAX_LOD};

/// Default URL template. `{server}` is replaced by one of the configured
/// server base URLs, chosen round-robin.
pub const DEFAULT_XYZ_TEMPLATE: &str = "{server}/{z}/{x}/{y}.png";

/// Template for TMS servers, which number rows from the south edge.
pub const TMS_TEMPLATE: &str = "{server}/{z}/{x}/{-y}.png";

/// Slippy-map tile provider.
pub struct XyzProvider<C: AsyncHttpClient> {
    name: String,
    http_client: C,
    servers: Vec<String>,
    template: String,
    format: String,
    min_lod: u8,
    max_lod: u8,
    next_server: AtomicUsize,
}

impl<C: AsyncHttpClient> XyzProvider<C> {
    /// Creates a provider serving `min_lod..=max_lod` from `servers`.
    ///
    /// # Errors
    ///
    /// Fails if `servers` is empty or the LOD range is invalid.
    pub fn new(
        http_client: C,
        name: impl Into<String>,
        servers: Vec<String>,
        min_lod: u8,
        max_lod: u8,
    ) -> Result<Self, ProviderError> {
        let name = name.into();
        if servers.is_empty() {
            return Err(ProviderError::ProviderSpecific(format!(
                "{}: at least one server is required",
                name
            )));
        }
        if min_lod > max_lod || max_lod > MAX_LOD {
            return Err(ProviderError::ProviderSpecific(format!(
                "{}: invalid lod range {}..={}",
                name, min_lod, max_lod
            )));
        }
        Ok(Self {
            name,
            http_client,
            servers: servers
                .into_iter()
                .map(|s| s.trim_end_matches('/').to_string())
                .collect(),
            template: DEFAULT_XYZ_TEMPLATE.to_string(),
            format: "image/png".to_string(),
            min_lod,
            max_lod,
            next_server: AtomicUsize::new(0),
        })
    }

    /// Use a custom URL template with `{server}`, `{z}`, `{x}`, `{y}`
    /// (row from the north) and `{-y}` (row from the south) placeholders.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Mime type reported on fetched tiles.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Builds the tile URL, advancing the round-robin server index.
    fn build_url(&self, quadkey: &QuadKey) -> String {
        let tile = quadkey.tile_coord();
        let index = self.next_server.fetch_add(1, Ordering::Relaxed) % self.servers.len();
        self.template
            .replace("{server}", &self.servers[index])
            .replace("{z}", &tile.lod.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.xyz_row().to_string())
            .replace("{-y}", &tile.y.to_string())
    }
}

impl<C: AsyncHttpClient> TileProvider for XyzProvider<C> {
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
        self.min_lod
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    fn qk(s: &str) -> QuadKey {
        QuadKey::parse(s).unwrap()
    }

    fn provider(client: MockAsyncHttpClient) -> XyzProvider<MockAsyncHttpClient> {
        XyzProvider::new(
            client,
            "osm",
            vec![
                "https://a.tile.example.org/".to_string(),
                "https://b.tile.example.org".to_string(),
            ],
            1,
            18,
        )
        .unwrap()
    }

    #[test]
    fn test_provider_metadata() {
        let provider = provider(MockAsyncHttpClient::ok(vec![]));
        assert_eq!(provider.name(), "osm");
        assert!(provider.is_ready());
        assert!(!provider.has_failed());
        assert_eq!(provider.min_lod(), 1);
        assert_eq!(provider.max_lod(), 18);
    }

    #[test]
    fn test_contains_follows_lod_range() {
        let provider = provider(MockAsyncHttpClient::ok(vec![]));
        assert!(!provider.contains(&QuadKey::root()));
        assert!(provider.contains(&qk("0")));
        assert!(provider.contains(&qk(&"3".repeat(18))));
        assert!(!provider.contains(&qk(&"3".repeat(19))));
    }

    #[test]
    fn test_url_uses_top_down_rows_and_round_robin() {
        let provider = provider(MockAsyncHttpClient::ok(vec![]));
        // "2" is the south-west quadrant: x=0, xyz row=1
        assert_eq!(
            provider.build_url(&qk("2")),
            "https://a.tile.example.org/1/0/1.png"
        );
        // "1" is north-east: x=1, xyz row=0
        assert_eq!(
            provider.build_url(&qk("1")),
            "https://b.tile.example.org/1/1/0.png"
        );
        assert!(provider.build_url(&qk("1")).starts_with("https://a."));
    }

    #[test]
    fn test_custom_template() {
        let provider = provider(MockAsyncHttpClient::ok(vec![]))
            .with_template("{server}/tiles?z={z}&x={x}&y={y}");
        assert_eq!(
            provider.build_url(&qk("03")),
            "https://a.tile.example.org/tiles?z=2&x=1&y=1"
        );
    }

    #[test]
    fn test_tms_template_uses_bottom_up_rows() {
        let provider = provider(MockAsyncHttpClient::ok(vec![])).with_template(TMS_TEMPLATE);
        // "2" is the south-west quadrant: TMS row 0
        assert_eq!(
            provider.build_url(&qk("2")),
            "https://a.tile.example.org/1/0/0.png"
        );
        // "0123": x=5, row 12 from the south
        assert_eq!(
            provider.build_url(&qk("0123")),
            "https://b.tile.example.org/4/5/12.png"
        );
    }

    #[test]
    fn test_new_rejects_empty_servers() {
        let result = XyzProvider::new(MockAsyncHttpClient::ok(vec![]), "osm", vec![], 0, 18);
        assert!(matches!(result, Err(ProviderError::ProviderSpecific(_))));
    }

    #[test]
    fn test_new_rejects_bad_lod_range() {
        let servers = vec!["https://a".to_string()];
        assert!(
            XyzProvider::new(MockAsyncHttpClient::ok(vec![]), "x", servers.clone(), 5, 2).is_err()
        );
        assert!(XyzProvider::new(MockAsyncHttpClient::ok(vec![]), "x", servers, 0, 31).is_err());
    }

    #[tokio::test]
    async fn test_request_tile_success() {
        let client = MockAsyncHttpClient::ok(vec![9, 9]);
        let provider = provider(client.clone());

        let tile = provider.request_tile(&qk("21")).await.unwrap();
        assert_eq!(tile.quadkey, qk("21"));
        assert_eq!(tile.format, "image/png");
        assert_eq!(&tile.bytes[..], &[9, 9]);
        assert_eq!(
            client.requested_urls(),
            vec!["https://a.tile.example.org/2/1/2.png"]
        );
    }

    #[tokio::test]
    async fn test_request_tile_http_error() {
        let client = MockAsyncHttpClient::err(ProviderError::HttpError("Network error".into()));
        let provider = provider(client);

        match provider.request_tile(&qk("0")).await {
            Err(ProviderError::HttpError(msg)) => assert_eq!(msg, "Network error"),
            other => panic!("Expected HttpError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_tile_unsupported_lod() {
        let client = MockAsyncHttpClient::ok(vec![]);
        let provider = provider(client.clone());

        let result = provider.request_tile(&QuadKey::root()).await;
        assert_eq!(result, Err(ProviderError::UnsupportedLod(0)));
        assert!(client.requested_urls().is_empty());
    }
}
