//! The per address state of loaded tiles.
//!
//! # Explanation
//! A [`TileNode`] owns every drawable shown for its quadtree address. Once its
//! images arrived it draws the whole tile itself. As soon as one of its
//! children is ready, the node stops drawing itself and instead covers each
//! quadrant that is still loading with a placeholder, which is a child sized
//! mesh sampling the matching quarter of the node's own texture.
//!
//! Nodes never talk to the renderer. Every mutation is recorded as a
//! [`ChangeRequest`](crate::scene::ChangeRequest) in the [`TileContext`] of the
//! current loader pass.

mod tile_node;

pub use self::tile_node::TileNode;

use crate::{atlas::AtlasService, geometry::TileBuilder, scene::ChangeSet};
use serde::{Deserialize, Serialize};

/// What currently represents one quadrant of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuadrantCoverage {
    /// Nothing is drawn, either because the node is not realized or because
    /// the quadrant lies outside the clip extents.
    Uncovered,
    /// The node's own full tile geometry.
    SelfDraw,
    /// A placeholder built from the node's texture.
    Placeholder,
    /// The child node draws the quadrant.
    RealChild,
}

/// The loading state of a child as seen by its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildState {
    /// The loader never referenced the child.
    #[default]
    Missing,
    /// The child is referenced but has nothing to draw yet.
    Loading,
    /// The child draws its own quadrant.
    Ready,
}

impl ChildState {
    pub fn of(node: Option<&TileNode>) -> Self {
        match node {
            None => Self::Missing,
            Some(node) if node.is_initialized() && !node.is_placeholder_only() => Self::Ready,
            Some(_) => Self::Loading,
        }
    }
}

/// The animation frames bound to the texture slots of every drawable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrames {
    pub primary: usize,
    /// Only bound when the image depth is larger than one.
    pub secondary: usize,
}

impl AnimationFrames {
    pub fn new(primary: usize, secondary: usize) -> Self {
        Self { primary, secondary }
    }
}

/// The collaborators a node operation works with.
pub struct TileContext<'a> {
    pub builder: &'a TileBuilder,
    /// Textures and drawables are added to the scene directly without an atlas.
    pub atlas: Option<&'a mut dyn AtlasService>,
    pub changes: &'a mut ChangeSet,
    /// Set once a submission allocated a new shared buffer.
    pub allocated_buffer: bool,
}

impl<'a> TileContext<'a> {
    pub fn new(
        builder: &'a TileBuilder,
        atlas: Option<&'a mut dyn AtlasService>,
        changes: &'a mut ChangeSet,
    ) -> Self {
        Self {
            builder,
            atlas,
            changes,
            allocated_buffer: false,
        }
    }
}
