//! Terrain blocks: the per-quadkey result of fanning a request out to
//! every configured layer.

use crate::coord::QuadKey;
use crate::provider::{ProviderError, TileData};

use super::types::{LayerKind, LayerRef};

/// State of one layer's contribution to a block.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSlot {
    /// Request in flight.
    Pending,
    Loaded(TileData),
    Failed(ProviderError),
    /// The provider does not serve this tile; no request was made.
    NotCovered,
}

impl LayerSlot {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, LayerSlot::Pending)
    }

    pub fn tile(&self) -> Option<&TileData> {
        match self {
            LayerSlot::Loaded(tile) => Some(tile),
            _ => None,
        }
    }
}

/// How the image layers of a block combine into one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageComposition {
    /// No image layer delivered data.
    NoData,
    /// Exactly one layer delivered data; use it as is.
    Single(usize),
    /// Several layers delivered data; blend them in layer order.
    Blend(Vec<usize>),
}

/// Combined image and elevation state for one quadkey.
///
/// Created empty on a cache miss and filled in place as provider
/// requests complete. Each slot is written at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainBlock {
    quadkey: QuadKey,
    images: Vec<LayerSlot>,
    elevations: Vec<LayerSlot>,
}

impl TerrainBlock {
    pub fn new(quadkey: QuadKey, image_layers: usize, elevation_layers: usize) -> Self {
        Self {
            quadkey,
            images: vec![LayerSlot::Pending; image_layers],
            elevations: vec![LayerSlot::Pending; elevation_layers],
        }
    }

    pub fn quadkey(&self) -> &QuadKey {
        &self.quadkey
    }

    pub fn images(&self) -> &[LayerSlot] {
        &self.images
    }

    pub fn elevations(&self) -> &[LayerSlot] {
        &self.elevations
    }

    pub fn slot(&self, layer: LayerRef) -> Option<&LayerSlot> {
        match layer.kind {
            LayerKind::Image => self.images.get(layer.index),
            LayerKind::Elevation => self.elevations.get(layer.index),
        }
    }

    fn slot_mut(&mut self, layer: LayerRef) -> Option<&mut LayerSlot> {
        match layer.kind {
            LayerKind::Image => self.images.get_mut(layer.index),
            LayerKind::Elevation => self.elevations.get_mut(layer.index),
        }
    }

    /// Every image layer has resolved.
    pub fn is_image_ready(&self) -> bool {
        self.images.iter().all(LayerSlot::is_resolved)
    }

    /// Every elevation layer has resolved. True when there are none.
    pub fn is_elevation_ready(&self) -> bool {
        self.elevations.iter().all(LayerSlot::is_resolved)
    }

    /// All layers resolved; the block can be handed to the renderer.
    pub fn is_available(&self) -> bool {
        self.is_image_ready() && self.is_elevation_ready()
    }

    /// At least one layer failed to fetch.
    pub fn has_failed(&self) -> bool {
        self.images
            .iter()
            .chain(self.elevations.iter())
            .any(|slot| matches!(slot, LayerSlot::Failed(_)))
    }

    /// Layers whose fetch failed, with the reason.
    pub fn failures(&self) -> Vec<(LayerRef, &ProviderError)> {
        let images = self.images.iter().enumerate().filter_map(|(i, slot)| match slot {
            LayerSlot::Failed(e) => Some((LayerRef::image(i), e)),
            _ => None,
        });
        let elevations = self
            .elevations
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                LayerSlot::Failed(e) => Some((LayerRef::elevation(i), e)),
                _ => None,
            });
        images.chain(elevations).collect()
    }

    /// Image layers with data, in layer order.
    pub fn image_composition(&self) -> ImageComposition {
        let loaded: Vec<usize> = self
            .images
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, LayerSlot::Loaded(_)))
            .map(|(i, _)| i)
            .collect();
        match loaded.len() {
            0 => ImageComposition::NoData,
            1 => ImageComposition::Single(loaded[0]),
            _ => ImageComposition::Blend(loaded),
        }
    }

    /// First elevation tile with data.
    pub fn elevation(&self) -> Option<&TileData> {
        self.elevations.iter().find_map(LayerSlot::tile)
    }

    /// Record a provider result. Returns false, leaving the block
    /// untouched, if the slot does not exist or is already resolved.
    pub fn resolve(&mut self, layer: LayerRef, result: Result<TileData, ProviderError>) -> bool {
        match self.slot_mut(layer) {
            Some(slot @ LayerSlot::Pending) => {
                *slot = match result {
                    Ok(tile) => LayerSlot::Loaded(tile),
                    Err(e) => LayerSlot::Failed(e),
                };
                true
            }
            _ => false,
        }
    }

    /// Mark a layer as not serving this tile.
    pub fn mark_not_covered(&mut self, layer: LayerRef) -> bool {
        match self.slot_mut(layer) {
            Some(slot @ LayerSlot::Pending) => {
                *slot = LayerSlot::NotCovered;
                true
            }
            _ => false,
        }
    }
}
