//! Provider types and traits

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::coord::QuadKey;

/// Boxed future returned by object-safe provider methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Future resolving to one fetched tile.
pub type TileFuture = BoxFuture<'static, Result<TileData, ProviderError>>;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP request failed
    HttpError(String),
    /// Level of detail outside the provider's range
    UnsupportedLod(u8),
    /// The provider's dataset does not cover this tile
    NotCovered(QuadKey),
    /// Dataset metadata has not loaded (or failed to load)
    NotReady(String),
    /// Invalid response data from provider
    InvalidResponse(String),
    /// Provider-specific error
    ProviderSpecific(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::UnsupportedLod(lod) => {
                write!(f, "Level of detail {} not supported by provider", lod)
            }
            ProviderError::NotCovered(quadkey) => {
                write!(f, "Tile {} not covered by provider", quadkey)
            }
            ProviderError::NotReady(name) => write!(f, "Provider {} is not ready", name),
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ProviderError::ProviderSpecific(msg) => write!(f, "Provider error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Payload of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    pub quadkey: QuadKey,
    /// Mime type reported by the provider, e.g. `image/png`.
    pub format: String,
    pub bytes: Bytes,
}

impl TileData {
    pub fn new(quadkey: QuadKey, format: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            quadkey,
            format: format.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A source of image or elevation tiles.
///
/// Implementations must be cheap to query: every method except
/// [`request_tile`](TileProvider::request_tile) and
/// [`prepare`](TileProvider::prepare) is a plain read of provider state.
/// The returned futures own everything they need so the caller can keep
/// them past the borrow of `self`.
pub trait TileProvider: Send + Sync {
    /// Returns the provider's name for logging and identification.
    fn name(&self) -> &str;

    /// Dataset metadata has loaded and tiles may be requested.
    fn is_ready(&self) -> bool;

    /// Dataset metadata failed to load.
    fn has_failed(&self) -> bool;

    fn min_lod(&self) -> u8;

    fn max_lod(&self) -> u8;

    /// Whether this provider can serve `quadkey`.
    fn contains(&self, quadkey: &QuadKey) -> bool;

    /// Start fetching `quadkey`. The future resolves once, with the tile
    /// or the reason it could not be fetched.
    fn request_tile(&self, quadkey: &QuadKey) -> TileFuture;

    /// Load dataset metadata. Providers without metadata are ready at
    /// construction and keep this default.
    fn prepare(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        Box::pin(async { Ok(()) })
    }

    /// Checks if this provider supports the given level of detail.
    fn supports_lod(&self, lod: u8) -> bool {
        lod >= self.min_lod() && lod <= self.max_lod()
    }
}
