//! Orchestrator types and errors

use std::fmt;
use std::time::Duration;

use crate::cache::{CacheError, DEFAULT_FILL_FACTOR};

/// Default number of resident terrain blocks.
pub const DEFAULT_MAX_BLOCKS: usize = 512;

/// Errors that can occur during tile orchestration.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    /// Not every configured provider is ready (or no image provider exists)
    NotReady,
    /// The block cache rejected the entry
    Cache(CacheError),
    /// An [`OrchestratorConfig`] value is out of range
    InvalidConfig(String),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::NotReady => {
                write!(f, "Tile providers are not ready, block requests are rejected")
            }
            OrchestratorError::Cache(e) => write!(f, "Cache error: {}", e),
            OrchestratorError::InvalidConfig(msg) => {
                write!(f, "Invalid orchestrator configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrchestratorError::Cache(e) => Some(e),
            OrchestratorError::NotReady | OrchestratorError::InvalidConfig(_) => None,
        }
    }
}

impl From<CacheError> for OrchestratorError {
    fn from(e: CacheError) -> Self {
        OrchestratorError::Cache(e)
    }
}

/// Settings for a [`TileOrchestrator`](super::TileOrchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Soft maximum of resident blocks, 0 for unbounded.
    pub max_blocks: usize,
    /// Fraction of `max_blocks` kept after a purge.
    pub fill_factor: f64,
    /// Drop blocks that have not been requested for this long.
    pub expire_after_idle: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_blocks: DEFAULT_MAX_BLOCKS,
            fill_factor: DEFAULT_FILL_FACTOR,
            expire_after_idle: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    pub fn with_fill_factor(mut self, fill_factor: f64) -> Self {
        self.fill_factor = fill_factor;
        self
    }

    /// Check the values a block cache cannot be built from.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::InvalidConfig`] unless `0 < fill_factor <= 1`.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if !(self.fill_factor > 0.0 && self.fill_factor <= 1.0) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "fill_factor must be in (0, 1], got {}",
                self.fill_factor
            )));
        }
        Ok(())
    }

    pub fn with_expire_after_idle(mut self, idle: Duration) -> Self {
        self.expire_after_idle = Some(idle);
        self
    }
}

/// Which provider list a layer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Image,
    Elevation,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Image => f.write_str("image"),
            LayerKind::Elevation => f.write_str("elevation"),
        }
    }
}

/// Position of a provider in the orchestrator's provider lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerRef {
    pub kind: LayerKind,
    pub index: usize,
}

impl LayerRef {
    pub fn image(index: usize) -> Self {
        Self {
            kind: LayerKind::Image,
            index,
        }
    }

    pub fn elevation(index: usize) -> Self {
        Self {
            kind: LayerKind::Elevation,
            index,
        }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.index)
    }
}

/// Session counters for tile fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Blocks created on a cache miss.
    pub blocks_created: u64,
    /// Tile requests handed to providers.
    pub dispatched: u64,
    pub loaded: u64,
    pub failed: u64,
    /// Layers skipped because the provider does not cover the tile.
    pub not_covered: u64,
    /// Completions whose block left the cache before they arrived.
    pub stale_dropped: u64,
    pub bytes_loaded: u64,
}

impl FetchStats {
    /// Requests dispatched but not yet completed or dropped.
    pub fn outstanding(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.loaded + self.failed + self.stale_dropped)
    }
}

impl fmt::Display for FetchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocks, {} requests: {} loaded ({} bytes), {} failed, {} not covered, {} stale",
            self.blocks_created,
            self.dispatched,
            self.loaded,
            self.bytes_loaded,
            self.failed,
            self.not_covered,
            self.stale_dropped
        )
    }
}

/// Result of one [`TileOrchestrator::tick`](super::TileOrchestrator::tick).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Provider completions applied to blocks.
    pub completions: usize,
    /// Blocks released from the registry after leaving the cache.
    pub released: usize,
}
