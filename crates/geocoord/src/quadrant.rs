use bevy_derive::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// One of the four children of a quadtree tile.
#[derive(Serialize, Deserialize, EnumIter, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    SouthWest,
    SouthEast,
    NorthWest,
    NorthEast,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [
        Self::SouthWest,
        Self::SouthEast,
        Self::NorthWest,
        Self::NorthEast,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::SouthWest => 0,
            Self::SouthEast => 1,
            Self::NorthWest => 2,
            Self::NorthEast => 3,
        }
    }

    /// The quadrant at the given `(x, y)` offset inside the parent, each `0` or `1`.
    pub fn from_offset(dx: u32, dy: u32) -> Self {
        match (dx & 1, dy & 1) {
            (0, 0) => Self::SouthWest,
            (1, 0) => Self::SouthEast,
            (0, _) => Self::NorthWest,
            _ => Self::NorthEast,
        }
    }

    /// The `(x, y)` offset of this quadrant inside its parent.
    pub fn offset(self) -> (u32, u32) {
        match self {
            Self::SouthWest => (0, 0),
            Self::SouthEast => (1, 0),
            Self::NorthWest => (0, 1),
            Self::NorthEast => (1, 1),
        }
    }
}

/// Stores one value per [`Quadrant`].
#[derive(Deref, DerefMut, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuadrantArray<T>(pub [T; 4]);

impl<T> QuadrantArray<T> {
    pub fn from_fn(mut f: impl FnMut(Quadrant) -> T) -> Self {
        Self(Quadrant::ALL.map(&mut f))
    }

    pub fn splat(value: T) -> Self
    where
        T: Clone,
    {
        Self::from_fn(|_| value.clone())
    }

    /// Iterates the values together with their quadrant.
    pub fn iter_quadrants(&self) -> impl Iterator<Item = (Quadrant, &T)> {
        Quadrant::iter().zip(self.0.iter())
    }

    pub fn iter_quadrants_mut(&mut self) -> impl Iterator<Item = (Quadrant, &mut T)> {
        Quadrant::iter().zip(self.0.iter_mut())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QuadrantArray<U> {
        QuadrantArray(self.0.map(f))
    }
}

impl<T> Index<Quadrant> for QuadrantArray<T> {
    type Output = T;

    fn index(&self, quadrant: Quadrant) -> &T {
        &self.0[quadrant.index()]
    }
}

impl<T> IndexMut<Quadrant> for QuadrantArray<T> {
    fn index_mut(&mut self, quadrant: Quadrant) -> &mut T {
        &mut self.0[quadrant.index()]
    }
}
