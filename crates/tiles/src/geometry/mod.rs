//! Mesh synthesis for single tiles.
//!
//! A tile is sampled on a regular grid over its local bounds. Curved surfaces
//! additionally get skirts along the four edges and, for the outermost rows of
//! the tiling, a cap closing the gap to the pole.

mod builder;
mod mesh;
mod pole_cap;
mod skirt;

pub use self::{
    builder::{ElevationSource, SynthesisRequest, TileBuilder},
    mesh::{DrawStyle, MeshRole, TileGeometry, TileMesh, TileVertex, Topology},
};

pub(crate) use self::builder::GridSample;
