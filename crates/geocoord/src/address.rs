use crate::Quadrant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a single tile of the quadtree.
///
/// At `level` the tiling consists of `2^level` x `2^level` tiles, `x` grows
/// towards the east and `y` towards the north. Row `0` therefore touches the
/// southern edge of the tiling extents and row `2^level - 1` the northern one.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadAddress {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl QuadAddress {
    /// The single tile covering the whole tiling extents.
    pub const ROOT: Self = Self {
        level: 0,
        x: 0,
        y: 0,
    };

    /// The deepest level that can still be addressed with `u32` coordinates.
    pub const MAX_LEVEL: u32 = 31;

    /// Creates an address, returning `None` if `x` or `y` lie outside of the level.
    pub fn new(level: u32, x: u32, y: u32) -> Option<Self> {
        let address = Self { level, x, y };
        address.is_valid().then_some(address)
    }

    /// The count of tiles along each axis at `level`.
    pub fn tile_count(level: u32) -> u64 {
        1 << level
    }

    pub fn is_valid(self) -> bool {
        let count = Self::tile_count(self.level.min(Self::MAX_LEVEL));

        self.level <= Self::MAX_LEVEL && (self.x as u64) < count && (self.y as u64) < count
    }

    pub fn parent(self) -> Option<Self> {
        (self.level > 0).then(|| Self {
            level: self.level - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// The child of this tile covering `quadrant`.
    pub fn child(self, quadrant: Quadrant) -> Self {
        let (dx, dy) = quadrant.offset();

        Self {
            level: self.level + 1,
            x: 2 * self.x + dx,
            y: 2 * self.y + dy,
        }
    }

    /// All four children, ordered like [`Quadrant::ALL`].
    pub fn children(self) -> [Self; 4] {
        Quadrant::ALL.map(|quadrant| self.child(quadrant))
    }

    /// The quadrant of the parent this tile occupies.
    pub fn quadrant(self) -> Option<Quadrant> {
        (self.level > 0).then(|| Quadrant::from_offset(self.x % 2, self.y % 2))
    }

    /// Whether this tile lies in the southernmost row of its level.
    pub fn is_south_row(self) -> bool {
        self.y == 0
    }

    /// Whether this tile lies in the northernmost row of its level.
    pub fn is_north_row(self) -> bool {
        self.y as u64 + 1 == Self::tile_count(self.level)
    }
}

impl fmt::Display for QuadAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}
