//! Terrain block orchestration implementation

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, trace, warn};

use super::block::TerrainBlock;
use super::types::{
    FetchStats, LayerKind, LayerRef, OrchestratorConfig, OrchestratorError, TickReport,
};
use crate::cache::{BoundedCache, CachePriority, CacheStats, EntryOptions};
use crate::coord::QuadKey;
use crate::provider::{ProviderError, TileData, TileProvider};
use crate::registry::{Handle, Registry};

/// Stable reference to a resident [`TerrainBlock`].
///
/// Stays valid until the block leaves the cache; afterwards it resolves
/// to nothing, even if its registry slot is reused.
pub type BlockHandle = Handle<TerrainBlock>;

struct Completion {
    handle: BlockHandle,
    layer: LayerRef,
    result: Result<TileData, ProviderError>,
}

/// Owns the terrain block cache and fans block requests out to the
/// configured image and elevation providers.
///
/// The orchestrator is driven by a single event loop. Requests never
/// block: [`request_block`](Self::request_block) creates the block and
/// starts one fetch per layer, and completions are applied later by
/// [`tick`](Self::tick) (non-blocking) or [`settle`](Self::settle)
/// (awaits everything in flight).
///
/// # Example
///
/// ```ignore
/// let mut orchestrator = TileOrchestrator::new(images, elevations, OrchestratorConfig::default())?;
/// let handle = orchestrator.request_block(&"0312".parse()?)?;
/// orchestrator.settle().await;
/// let block = orchestrator.block(handle).unwrap();
/// ```
pub struct TileOrchestrator {
    cache: BoundedCache<QuadKey, BlockHandle>,
    blocks: Registry<TerrainBlock>,
    image_providers: Vec<Arc<dyn TileProvider>>,
    elevation_providers: Vec<Arc<dyn TileProvider>>,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    expire_after_idle: Option<std::time::Duration>,
    stats: FetchStats,
}

impl TileOrchestrator {
    /// Creates an orchestrator over the given provider lists.
    ///
    /// # Arguments
    ///
    /// * `image_providers` - Image layers in blend order (at least one is
    ///   needed before the orchestrator reports ready)
    /// * `elevation_providers` - Elevation layers, may be empty
    /// * `config` - Cache size and expiration settings
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::InvalidConfig`] if `config` fails
    /// [`OrchestratorConfig::validate`].
    pub fn new(
        image_providers: Vec<Arc<dyn TileProvider>>,
        elevation_providers: Vec<Arc<dyn TileProvider>>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let cache = BoundedCache::builder(config.max_blocks)
            .fill_factor(config.fill_factor)
            .eviction_listener(|quadkey: &QuadKey, _: &BlockHandle, cause| {
                trace!(quadkey = %quadkey, %cause, "block left cache");
            })
            .build();

        info!(
            image_layers = image_providers.len(),
            elevation_layers = elevation_providers.len(),
            max_blocks = config.max_blocks,
            "tile orchestrator created"
        );

        Ok(Self {
            cache,
            blocks: Registry::new(),
            image_providers,
            elevation_providers,
            in_flight: FuturesUnordered::new(),
            expire_after_idle: config.expire_after_idle,
            stats: FetchStats::default(),
        })
    }

    /// True when at least one image provider is configured and every
    /// provider, image and elevation, reports ready.
    pub fn is_ready(&self) -> bool {
        !self.image_providers.is_empty()
            && self.image_providers.iter().all(|p| p.is_ready())
            && self.elevation_providers.iter().all(|p| p.is_ready())
    }

    /// True if any provider failed to load its metadata. Such an
    /// orchestrator will never become ready.
    pub fn has_failed(&self) -> bool {
        self.image_providers
            .iter()
            .chain(self.elevation_providers.iter())
            .any(|p| p.has_failed())
    }

    /// Returns the block for `quadkey`, creating it and starting its
    /// layer fetches on a cache miss.
    ///
    /// Repeated calls for a resident quadkey return the same handle and
    /// start no new fetches.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::NotReady`] while [`is_ready`](Self::is_ready)
    /// is false. Nothing is queued in that case.
    pub fn request_block(&mut self, quadkey: &QuadKey) -> Result<BlockHandle, OrchestratorError> {
        self.request_block_with_priority(quadkey, CachePriority::Normal)
    }

    /// Like [`request_block`](Self::request_block), inserting a missing
    /// block with the given eviction priority.
    pub fn request_block_with_priority(
        &mut self,
        quadkey: &QuadKey,
        priority: CachePriority,
    ) -> Result<BlockHandle, OrchestratorError> {
        if !self.is_ready() {
            return Err(OrchestratorError::NotReady);
        }

        if let Some(handle) = self.lookup(quadkey) {
            return Ok(handle);
        }

        let block = TerrainBlock::new(
            quadkey.clone(),
            self.image_providers.len(),
            self.elevation_providers.len(),
        );
        let handle = self.blocks.insert(block);

        let mut options = EntryOptions::new().with_priority(priority);
        if let Some(idle) = self.expire_after_idle {
            options = options.with_expire_after_idle(idle);
        }
        if let Err(e) = self.cache.put(quadkey.clone(), handle, options) {
            self.blocks.remove(handle);
            return Err(e.into());
        }

        self.stats.blocks_created += 1;
        debug!(quadkey = %quadkey, handle = ?handle, "terrain block created");

        for index in 0..self.image_providers.len() {
            self.dispatch(handle, quadkey, LayerRef::image(index));
        }
        for index in 0..self.elevation_providers.len() {
            self.dispatch(handle, quadkey, LayerRef::elevation(index));
        }

        Ok(handle)
    }

    /// Cached block for `quadkey`, if resident. Never starts a fetch.
    pub fn get_cached_block(&mut self, quadkey: &QuadKey) -> Option<BlockHandle> {
        self.lookup(quadkey)
    }

    /// Resolve a handle. `None` once the block has been released after
    /// leaving the cache.
    pub fn block(&self, handle: BlockHandle) -> Option<&TerrainBlock> {
        self.blocks.get(handle)
    }

    /// Deepest level worth requesting.
    ///
    /// With elevation layers this is the deepest elevation level minus
    /// one; otherwise the deepest image level. 0 without providers.
    pub fn max_lod(&self) -> i32 {
        // The elevation path subtracts one and the image path does not.
        // Kept as is for compatibility with existing datasets.
        if !self.elevation_providers.is_empty() {
            let deepest = self
                .elevation_providers
                .iter()
                .map(|p| i32::from(p.max_lod()))
                .max()
                .unwrap_or(0);
            deepest - 1
        } else {
            self.image_providers
                .iter()
                .map(|p| i32::from(p.max_lod()))
                .max()
                .unwrap_or(0)
        }
    }

    /// Apply every completion that is ready now, without waiting.
    ///
    /// Must be called from within the runtime the provider futures
    /// expect (for the reqwest client, a Tokio runtime).
    pub fn poll_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(Some(completion)) = self.in_flight.next().now_or_never() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// One event-loop step: apply ready completions, then run deferred
    /// cache maintenance and release the blocks that left the cache.
    pub fn tick(&mut self) -> TickReport {
        let completions = self.poll_completions();
        let released = self.run_maintenance();
        TickReport {
            completions,
            released,
        }
    }

    /// Wait for every in-flight fetch, then run maintenance.
    pub async fn settle(&mut self) -> TickReport {
        let mut completions = 0;
        while let Some(completion) = self.in_flight.next().await {
            self.apply(completion);
            completions += 1;
        }
        let released = self.run_maintenance();
        TickReport {
            completions,
            released,
        }
    }

    /// Clear the cache, drop in-flight fetches and release the provider
    /// lists. The orchestrator is unusable (never ready) afterwards.
    pub fn destroy(&mut self) {
        let in_flight = self.in_flight.len();
        self.cache.clear();
        self.in_flight = FuturesUnordered::new();
        self.image_providers.clear();
        self.elevation_providers.clear();
        let released = self.run_maintenance();
        // Blocks not tracked by the cache any more, e.g. after a failed put
        self.blocks.clear();
        info!(
            released,
            dropped_fetches = in_flight,
            "tile orchestrator destroyed"
        );
    }

    /// Number of fetches not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of live blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn has_pending_work(&self) -> bool {
        !self.in_flight.is_empty() || self.cache.has_pending_tasks()
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn image_providers(&self) -> &[Arc<dyn TileProvider>] {
        &self.image_providers
    }

    pub fn elevation_providers(&self) -> &[Arc<dyn TileProvider>] {
        &self.elevation_providers
    }

    fn lookup(&mut self, quadkey: &QuadKey) -> Option<BlockHandle> {
        let handle = *self.cache.get(quadkey)?;
        self.blocks.contains(handle).then_some(handle)
    }

    fn provider(&self, layer: LayerRef) -> &Arc<dyn TileProvider> {
        match layer.kind {
            LayerKind::Image => &self.image_providers[layer.index],
            LayerKind::Elevation => &self.elevation_providers[layer.index],
        }
    }

    fn dispatch(&mut self, handle: BlockHandle, quadkey: &QuadKey, layer: LayerRef) {
        let provider = Arc::clone(self.provider(layer));

        if !provider.contains(quadkey) {
            trace!(quadkey = %quadkey, provider = provider.name(), %layer, "tile not covered");
            if let Some(block) = self.blocks.get_mut(handle) {
                block.mark_not_covered(layer);
            }
            self.stats.not_covered += 1;
            return;
        }

        let request = provider.request_tile(quadkey);
        self.stats.dispatched += 1;
        self.in_flight.push(
            async move {
                Completion {
                    handle,
                    layer,
                    result: request.await,
                }
            }
            .boxed(),
        );
    }

    fn apply(&mut self, completion: Completion) {
        let Completion {
            handle,
            layer,
            result,
        } = completion;

        // A block that left the cache stays in the registry until the
        // next maintenance run; only the resident block takes results.
        let resident = self
            .blocks
            .get(handle)
            .map(|block| self.cache.peek(block.quadkey()) == Some(&handle))
            .unwrap_or(false);
        let block = match self.blocks.get_mut(handle) {
            Some(block) if resident => block,
            _ => {
                self.stats.stale_dropped += 1;
                debug!(handle = ?handle, %layer, "completion for released block dropped");
                return;
            }
        };

        let quadkey = block.quadkey().clone();
        let outcome = result
            .as_ref()
            .map(|tile| tile.len() as u64)
            .map_err(|e| e.clone());

        if !block.resolve(layer, result) {
            self.stats.stale_dropped += 1;
            debug!(quadkey = %quadkey, %layer, "duplicate completion ignored");
            return;
        }

        match outcome {
            Ok(bytes) => {
                self.stats.loaded += 1;
                self.stats.bytes_loaded += bytes;
                debug!(quadkey = %quadkey, %layer, bytes, "tile loaded");
            }
            Err(e) => {
                self.stats.failed += 1;
                let provider = match layer.kind {
                    LayerKind::Image => self.image_providers.get(layer.index),
                    LayerKind::Elevation => self.elevation_providers.get(layer.index),
                }
                .map(|p| p.name())
                .unwrap_or("unknown");
                warn!(quadkey = %quadkey, provider, %layer, error = %e, "tile fetch failed");
            }
        }
    }

    fn run_maintenance(&mut self) -> usize {
        let blocks = &mut self.blocks;
        let mut released = 0;
        self.cache.run_pending_tasks_with(|_, handle, _| {
            if blocks.remove(handle).is_some() {
                released += 1;
            }
        });
        released
    }
}

impl std::fmt::Debug for TileOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileOrchestrator")
            .field("blocks", &self.blocks.len())
            .field("in_flight", &self.in_flight.len())
            .field("image_layers", &self.image_providers.len())
            .field("elevation_layers", &self.elevation_providers.len())
            .finish()
    }
}
