//! Geometry and scene bookkeeping for quadtree tiled surfaces.
//!
//! # Explanation
//! The [`TileBuilder`] synthesizes the mesh of a single tile, including the
//! optional skirts hiding cracks between neighbours and the caps covering
//! the poles of curved surfaces.
//!
//! Each loaded quadtree address is owned by a [`TileNode`]. Nodes submit
//! their textures and meshes to an [`AtlasService`] (or directly to the scene)
//! and record every scene mutation in an ordered [`ChangeSet`]. As children
//! finish loading, a node replaces its own geometry quadrant by quadrant with
//! either the real child or a placeholder that samples the parent's texture.
//!
//! The renderer never touches nodes. It reads the latest [`AtlasSnapshot`]
//! from the [`AtlasSnapshotPublisher`], which the loader replaces atomically.

pub mod atlas;
pub mod cache;
pub mod config;
pub mod error;
pub mod geometry;
pub mod node;
pub mod scene;
pub mod texture;

#[doc(hidden)]
pub mod prelude {
    pub use crate::{
        atlas::{
            AtlasCounters, AtlasService, AtlasSettings, AtlasSnapshot, AtlasSnapshotPublisher,
            DrawableBinding, SharedAtlas, SubRegion, SubTextureHandle,
        },
        cache::TileCache,
        config::TileBuilderConfig,
        error::{TileError, TileResult},
        geometry::{
            ElevationSource, MeshRole, TileBuilder, TileGeometry, TileMesh, TileVertex, Topology,
        },
        node::{AnimationFrames, ChildState, QuadrantCoverage, TileContext, TileNode},
        scene::{BufferId, ChangeRequest, ChangeSet, DrawableId, ProgramId, TextureId},
        texture::{ImageResizePolicy, TileImage},
    };
    pub use mosaic_geocoord::prelude::*;
}

pub use self::{
    atlas::{AtlasService, AtlasSnapshot, AtlasSnapshotPublisher},
    geometry::TileBuilder,
    node::TileNode,
    scene::ChangeSet,
};
