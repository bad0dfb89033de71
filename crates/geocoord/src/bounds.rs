use crate::QuadAddress;
use bevy_math::DVec2;
use serde::{Deserialize, Serialize};

/// An axis aligned rectangle in the local coordinate system of a surface.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct LocalBounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl LocalBounds {
    pub const fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Bounds with a positive area. Empty or inverted bounds are invalid.
    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec2 {
        0.5 * (self.min + self.max)
    }

    /// Maps a unit coordinate (`0..=1` on both axes) into the bounds.
    pub fn lerp(&self, unit: DVec2) -> DVec2 {
        self.min + self.size() * unit
    }

    pub fn contains(&self, point: DVec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The overlap of both bounds, which may be invalid if they do not overlap.
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn corners(&self) -> [DVec2; 4] {
        [
            self.min,
            DVec2::new(self.max.x, self.min.y),
            DVec2::new(self.min.x, self.max.y),
            self.max,
        ]
    }

    /// The cell of the quadtree tiling these bounds that is covered by `address`.
    pub fn tile(&self, address: QuadAddress) -> Self {
        let count = QuadAddress::tile_count(address.level) as f64;
        let tile_size = self.size() / count;
        let min = self.min + tile_size * DVec2::new(address.x as f64, address.y as f64);

        Self {
            min,
            max: min + tile_size,
        }
    }
}
