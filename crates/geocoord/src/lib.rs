//! Addressing and coordinate utilities for quadtree tiled surfaces.
//!
//! A surface is tiled by a quadtree laid over a rectangular region of its local
//! coordinate system (see [`LocalBounds`]). Each tile is identified by a
//! [`QuadAddress`], its four children by a [`Quadrant`], and a [`Surface`] maps
//! local coordinates onto display space.

mod address;
mod bounds;
mod quadrant;
mod surface;

pub use self::{
    address::QuadAddress,
    bounds::LocalBounds,
    quadrant::{Quadrant, QuadrantArray},
    surface::{Projection, Surface, SurfaceShape},
};

#[doc(hidden)]
pub mod prelude {
    pub use crate::{
        LocalBounds, Projection, QuadAddress, Quadrant, QuadrantArray, Surface, SurfaceShape,
    };
}
