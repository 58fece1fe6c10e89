//! Cache Key
//!
//! Packs a region coordinate into the 64-bit primary key of a cache table.

use std::fmt;

/// Coordinate of a region in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionCoord {
    pub x: i32,
    pub z: i32,
}

impl RegionCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.x, self.z)
    }
}

/// Primary key of a cache row
///
/// High 32 bits hold `x` with its sign, low 32 bits hold the raw bits of `z`.
/// Every `(x, z)` pair maps to a distinct key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(i64);

impl CacheKey {
    /// Encode a region coordinate
    pub const fn encode(coord: RegionCoord) -> Self {
        Self(((coord.x as i64) << 32) | (coord.z as u32 as i64))
    }

    /// Decode back into the region coordinate
    pub const fn decode(self) -> RegionCoord {
        RegionCoord {
            x: (self.0 >> 32) as i32,
            z: self.0 as i32,
        }
    }

    /// Raw value as stored in the `p` column
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    pub const fn from_i64(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<RegionCoord> for CacheKey {
    fn from(coord: RegionCoord) -> Self {
        Self::encode(coord)
    }
}
