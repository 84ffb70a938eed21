//! Quadtree tile addressing.
//!
//! Converts quadkeys to tile coordinates and to tile bounds in normalized,
//! spherical-Mercator and WGS84 space. Everything here is pure.

mod types;

pub use types::{
    CoordError, QuadKey, TileCoord, MAX_LAT, MAX_LOD, MAX_LON, MERCATOR_EXTENT, MIN_LAT, MIN_LON,
};

use std::f64::consts::{FRAC_PI_2, PI};

/// Converts a quadkey string to its tile coordinate.
///
/// Each digit contributes one bit to `x` (digits `1` and `3`) and one bit
/// to `y` (digits `0` and `1`, the northern half), most significant first.
///
/// # Errors
///
/// Returns [`CoordError::InvalidQuadKey`] if any character is outside
/// `'0'..='3'`, or [`CoordError::QuadKeyTooDeep`] beyond [`MAX_LOD`].
pub fn to_tile_coord(quadkey: &str) -> Result<TileCoord, CoordError> {
    Ok(QuadKey::parse(quadkey)?.tile_coord())
}

/// Inverse of [`to_tile_coord`].
pub fn tile_coord_to_quadkey(tile: TileCoord) -> Result<QuadKey, CoordError> {
    QuadKey::from_tile_coord(tile)
}

/// Normalized `[0, 1]²` bounds as `[x0, y1, x1, y0]`.
///
/// The two `y` values are in swapped order (max first) to match the
/// pixel-space convention used by tile consumers.
pub fn to_normalized_bounds(quadkey: &str) -> Result<[f64; 4], CoordError> {
    Ok(QuadKey::parse(quadkey)?.normalized_bounds())
}

/// Spherical-Mercator bounds in meters as `[min_x, min_y, max_x, max_y]`.
pub fn to_mercator_bounds(quadkey: &str) -> Result<[f64; 4], CoordError> {
    Ok(QuadKey::parse(quadkey)?.mercator_bounds())
}

/// WGS84 bounds in degrees as `[lon_min, lat_min, lon_max, lat_max]`.
pub fn to_wgs84_bounds(quadkey: &str) -> Result<[f64; 4], CoordError> {
    Ok(QuadKey::parse(quadkey)?.wgs84_bounds())
}

/// Returns the parent quadkey.
///
/// Keys shorter than two digits have no parent and yield `None`; the
/// first-level tiles are treated as roots of their own quadrant.
pub fn get_parent(quadkey: &QuadKey) -> Option<QuadKey> {
    if quadkey.lod() < 2 {
        return None;
    }
    quadkey.truncate_one()
}

/// Finds the quadkey containing a WGS84 position at the given level.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `lod` - Level of detail (0 to 30)
#[inline]
pub fn quadkey_at(lat: f64, lon: f64, lod: u8) -> Result<QuadKey, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if lod > MAX_LOD {
        return Err(CoordError::InvalidLod(lod));
    }

    let n = (1u64 << lod) as f64;
    let last = (1u64 << lod) - 1;

    let col = (((lon + 180.0) / 360.0 * n) as u64).min(last);

    // Row counted from the north edge, then flipped to a south origin
    let lat_rad = lat.to_radians();
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).max(0.0) as u64).min(last);

    QuadKey::from_tile_coord(TileCoord {
        x: col as u32,
        y: (last - row) as u32,
        lod,
    })
}

/// Inverse spherical-Mercator for a unit-square coordinate in `[-1, 1]`.
#[inline]
fn unit_mercator_to_lat(y: f64) -> f64 {
    (FRAC_PI_2 - 2.0 * (-y * PI).exp().atan()).to_degrees()
}

#[inline]
fn unit_mercator_to_lon(x: f64) -> f64 {
    (x * PI).to_degrees()
}

impl QuadKey {
    /// Builds the quadkey for a tile coordinate by de-interleaving its bits.
    pub fn from_tile_coord(tile: TileCoord) -> Result<Self, CoordError> {
        if !tile.is_valid() {
            return Err(CoordError::TileOutOfRange {
                x: tile.x,
                y: tile.y,
                lod: tile.lod,
            });
        }
        let mut key = QuadKey::root();
        for level in (0..tile.lod).rev() {
            let east = (tile.x >> level) & 1;
            let north = (tile.y >> level) & 1;
            key = key.child((east + 2 * (1 - north)) as u8)?;
        }
        Ok(key)
    }

    /// Tile coordinate addressed by this key.
    pub fn tile_coord(&self) -> TileCoord {
        let (x, y) = self.digits().fold((0u32, 0u32), |(x, y), d| {
            ((x << 1) | u32::from(d & 1), (y << 1) | u32::from((d >> 1) ^ 1))
        });
        TileCoord {
            x,
            y,
            lod: self.lod(),
        }
    }

    /// See [`to_normalized_bounds`].
    pub fn normalized_bounds(&self) -> [f64; 4] {
        let tile = self.tile_coord();
        let scale = 1.0 / tile.grid_size() as f64;
        let x = f64::from(tile.x) * scale;
        let y = f64::from(tile.y) * scale;
        [x, y + scale, x + scale, y]
    }

    /// See [`to_mercator_bounds`].
    pub fn mercator_bounds(&self) -> [f64; 4] {
        let [x0, y1, x1, y0] = self.normalized_bounds();
        let span = 2.0 * MERCATOR_EXTENT;
        [
            x0 * span - MERCATOR_EXTENT,
            y0 * span - MERCATOR_EXTENT,
            x1 * span - MERCATOR_EXTENT,
            y1 * span - MERCATOR_EXTENT,
        ]
    }

    /// See [`to_wgs84_bounds`].
    pub fn wgs84_bounds(&self) -> [f64; 4] {
        let [x0, y1, x1, y0] = self.normalized_bounds();
        [
            unit_mercator_to_lon(2.0 * x0 - 1.0),
            unit_mercator_to_lat(2.0 * y0 - 1.0),
            unit_mercator_to_lon(2.0 * x1 - 1.0),
            unit_mercator_to_lat(2.0 * y1 - 1.0),
        ]
    }

    /// Parent key, see [`get_parent`].
    pub fn parent(&self) -> Option<QuadKey> {
        get_parent(self)
    }

    /// The four children in digit order. Empty at [`MAX_LOD`].
    pub fn children(&self) -> Vec<QuadKey> {
        (0..4).filter_map(|d| self.child(d).ok()).collect()
    }
}
