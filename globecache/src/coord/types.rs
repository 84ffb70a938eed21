//! Core coordinate types for the quadtree tile scheme.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Deepest level of detail a quadkey may address.
pub const MAX_LOD: u8 = 30;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;

/// Half the side of the spherical-Mercator world square, in meters.
pub const MERCATOR_EXTENT: f64 = 20037508.34;

/// Errors produced by coordinate conversions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("invalid quadkey '{0}': digits must be in 0..=3")]
    InvalidQuadKey(String),

    #[error("quadkey '{0}' is deeper than the maximum level of detail 30")]
    QuadKeyTooDeep(String),

    #[error("invalid latitude {0}: must be within -85.05112878..=85.05112878")]
    InvalidLatitude(f64),

    #[error("invalid longitude {0}: must be within -180..=180")]
    InvalidLongitude(f64),

    #[error("invalid level of detail {0}: must be at most 30")]
    InvalidLod(u8),

    #[error("tile ({x}, {y}) is outside the grid at level {lod}")]
    TileOutOfRange { x: u32, y: u32, lod: u8 },
}

/// Tile position in the quadtree grid.
///
/// `x` counts columns from the west edge. `y` counts rows from the
/// *south* edge (origin at the lower-left corner of the world square),
/// so larger `y` is further north. Slippy-map servers number rows from
/// the north; use [`TileCoord::xyz_row`] for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub lod: u8,
}

impl TileCoord {
    /// Number of tiles along one axis at this level.
    #[inline]
    pub fn grid_size(&self) -> u64 {
        1u64 << self.lod
    }

    /// Row index counted from the north edge, as used by XYZ tile servers.
    #[inline]
    pub fn xyz_row(&self) -> u32 {
        (self.grid_size() - 1 - u64::from(self.y)) as u32
    }

    /// Returns true when both indices lie inside the grid for this level.
    pub fn is_valid(&self) -> bool {
        self.lod <= MAX_LOD
            && u64::from(self.x) < self.grid_size()
            && u64::from(self.y) < self.grid_size()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.lod, self.x, self.y)
    }
}

/// A validated quadkey.
///
/// One digit per level below the root, each in `'0'..='3'`. The empty
/// quadkey is the root tile covering the whole world.
///
/// Digit meaning (bit 0 = east half, bit 1 = south half):
///
/// | digit | quadrant    |
/// |-------|-------------|
/// | `0`   | north-west  |
/// | `1`   | north-east  |
/// | `2`   | south-west  |
/// | `3`   | south-east  |
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuadKey(String);

impl QuadKey {
    /// The root quadkey (level 0).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parses and validates a quadkey string.
    pub fn parse(s: &str) -> Result<Self, CoordError> {
        validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Level of detail, equal to the number of digits.
    #[inline]
    pub fn lod(&self) -> u8 {
        self.0.len() as u8
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits as numeric values, most significant level first.
    pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b - b'0')
    }

    /// Last digit, or `None` for the root.
    pub fn last_digit(&self) -> Option<u8> {
        self.0.bytes().last().map(|b| b - b'0')
    }

    /// Appends one digit, descending one level.
    pub fn child(&self, digit: u8) -> Result<Self, CoordError> {
        if digit > 3 {
            return Err(CoordError::InvalidQuadKey(format!("{}{}", self.0, digit)));
        }
        if self.lod() >= MAX_LOD {
            return Err(CoordError::QuadKeyTooDeep(format!("{}{}", self.0, digit)));
        }
        let mut key = String::with_capacity(self.0.len() + 1);
        key.push_str(&self.0);
        key.push(char::from(b'0' + digit));
        Ok(Self(key))
    }

    /// Removes the last digit without the depth-2 floor applied by
    /// [`get_parent`](super::get_parent). Returns `None` only for the root.
    pub(crate) fn truncate_one(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_owned()))
        }
    }

    /// Pads this quadkey to `lod` digits by repeating `digit`.
    ///
    /// Returns a clone when the key is already at least that deep.
    pub fn pad_to(&self, lod: u8, digit: u8) -> Result<Self, CoordError> {
        let mut key = self.clone();
        while key.lod() < lod {
            key = key.child(digit)?;
        }
        Ok(key)
    }
}

impl fmt::Display for QuadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl FromStr for QuadKey {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for QuadKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QuadKey {
    type Error = CoordError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate(&s)?;
        Ok(Self(s))
    }
}

fn validate(s: &str) -> Result<(), CoordError> {
    if !s.bytes().all(|b| (b'0'..=b'3').contains(&b)) {
        return Err(CoordError::InvalidQuadKey(s.to_owned()));
    }
    if s.len() > MAX_LOD as usize {
        return Err(CoordError::QuadKeyTooDeep(s.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_valid_digits() {
        let key: QuadKey = "0123".parse().unwrap();
        assert_eq!(key.as_str(), "0123");
        assert_eq!(key.lod(), 4);
        assert_eq!(key.digits().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_rejects_bad_digit() {
        assert_eq!(
            QuadKey::parse("0124"),
            Err(CoordError::InvalidQuadKey("0124".to_string()))
        );
        assert!(QuadKey::parse("01a").is_err());
        assert!(QuadKey::parse(" 0").is_err());
    }

    #[test]
    fn test_parse_rejects_too_deep() {
        let deep = "0".repeat(MAX_LOD as usize + 1);
        assert!(matches!(
            QuadKey::parse(&deep),
            Err(CoordError::QuadKeyTooDeep(_))
        ));
        assert!(QuadKey::parse(&"3".repeat(MAX_LOD as usize)).is_ok());
    }

    #[test]
    fn test_root_is_empty_and_valid() {
        let root = QuadKey::parse("").unwrap();
        assert!(root.is_root());
        assert_eq!(root, QuadKey::root());
        assert_eq!(root.to_string(), "<root>");
        assert_eq!(root.last_digit(), None);
    }

    #[test]
    fn test_child_appends_digit() {
        let key = QuadKey::parse("12").unwrap();
        assert_eq!(key.child(3).unwrap().as_str(), "123");
        assert!(key.child(4).is_err());
    }

    #[test]
    fn test_child_rejected_at_max_lod() {
        let key = QuadKey::parse(&"1".repeat(MAX_LOD as usize)).unwrap();
        assert!(matches!(key.child(0), Err(CoordError::QuadKeyTooDeep(_))));
    }

    #[test]
    fn test_pad_to() {
        let key = QuadKey::parse("1").unwrap();
        assert_eq!(key.pad_to(4, 3).unwrap().as_str(), "1333");
        assert_eq!(key.pad_to(0, 3).unwrap(), key);
    }

    #[test]
    fn test_xyz_row_flips_vertically() {
        let tile = TileCoord { x: 0, y: 0, lod: 2 };
        assert_eq!(tile.xyz_row(), 3);
        let tile = TileCoord { x: 0, y: 3, lod: 2 };
        assert_eq!(tile.xyz_row(), 0);
    }

    #[test]
    fn test_tile_coord_validity() {
        assert!(TileCoord { x: 3, y: 3, lod: 2 }.is_valid());
        assert!(!TileCoord { x: 4, y: 0, lod: 2 }.is_valid());
        assert!(TileCoord { x: 0, y: 0, lod: 0 }.is_valid());
    }
}
