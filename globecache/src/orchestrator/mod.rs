//! Terrain block orchestration
//!
//! Ties the tile providers to a bounded cache of [`TerrainBlock`]s keyed
//! by quadkey. At most one block, and so at most one fetch per layer,
//! exists per quadkey while it is resident.

mod block;
mod tiles;
mod types;

pub use block::{ImageComposition, LayerSlot, TerrainBlock};
pub use tiles::{BlockHandle, TileOrchestrator};
pub use types::{
    FetchStats, LayerKind, LayerRef, OrchestratorConfig, OrchestratorError, TickReport,
    DEFAULT_MAX_BLOCKS,
};
