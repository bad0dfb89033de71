//! Packing of tile textures and geometry into shared resources.
//!
//! # Explanation
//! Drawing every tile with its own texture and vertex buffer does not scale to
//! the thousands of tiles a globe view keeps around. An [`AtlasService`] packs
//! tile images into cells of larger texture pages and, optionally, tile meshes
//! into shared vertex and index buffers.
//!
//! A tile node only ever holds the opaque [`SubTextureHandle`] and
//! [`DrawableId`] it got back from the service. Which page or buffer range they
//! live in is published to the renderer through an [`AtlasSnapshot`], which is
//! rebuilt off to the side and swapped in by the [`AtlasSnapshotPublisher`].

mod ranges;
mod shared;
mod snapshot;

pub use self::{
    shared::{AtlasSettings, SharedAtlas},
    snapshot::{AtlasSnapshot, AtlasSnapshotPublisher, DrawableBinding},
};

use crate::{
    error::TileResult,
    geometry::TileMesh,
    scene::{ChangeSet, DrawableId, TextureId},
};
use bevy_math::Vec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Identifies the cell a tile image occupies inside an atlas page.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubTextureHandle(pub u64);

/// The part of an atlas page covered by one sub texture, in texture coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubRegion {
    pub offset: Vec2,
    pub scale: Vec2,
}

impl SubRegion {
    pub const FULL: Self = Self {
        offset: Vec2::ZERO,
        scale: Vec2::ONE,
    };

    /// Maps a texture coordinate of the tile image into the atlas page.
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        self.offset + uv * self.scale
    }
}

/// Live allocations of an atlas service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AtlasCounters {
    pub sub_textures: usize,
    pub pages: usize,
    pub drawables: usize,
    pub buffers: usize,
    /// Releases waiting for a fade to finish.
    pub pending_releases: usize,
}

/// The collaborator tile nodes submit textures and drawables to.
///
/// All scene mutations are recorded in the passed [`ChangeSet`].
pub trait AtlasService: Send {
    /// Packs one image per animation frame into a new sub texture.
    ///
    /// With `frame` set, `images` holds a single image for that frame and the
    /// other frames stay blank until they are updated.
    fn add_texture(
        &mut self,
        images: &[RgbaImage],
        frame: Option<usize>,
        border_texels: u32,
        changes: &mut ChangeSet,
    ) -> TileResult<SubTextureHandle>;

    /// Replaces the pixels of one frame of an existing sub texture.
    fn update_texture(
        &mut self,
        image: &RgbaImage,
        frame: usize,
        handle: SubTextureHandle,
        changes: &mut ChangeSet,
    ) -> TileResult<()>;

    /// Returns the cell of `handle` once `delay` seconds have passed.
    fn remove_texture(&mut self, handle: SubTextureHandle, delay: f32, changes: &mut ChangeSet);

    /// The atlas page holding `frame` of `handle`.
    fn texture_id_for_frame(&self, handle: SubTextureHandle, frame: usize) -> Option<TextureId>;

    fn sub_region(&self, handle: SubTextureHandle) -> Option<SubRegion>;

    /// Whether meshes are packed into shared buffers by [`AtlasService::add_drawable`].
    /// Otherwise nodes add their drawables to the scene directly.
    fn packs_drawables(&self) -> bool;

    /// Takes ownership of `mesh` and packs it into a shared buffer.
    ///
    /// The flag reports whether a new shared buffer had to be allocated, which
    /// the renderer has to swap in before the drawable becomes visible.
    fn add_drawable(
        &mut self,
        mesh: TileMesh,
        textures: &[Option<TextureId>],
        changes: &mut ChangeSet,
    ) -> TileResult<(DrawableId, bool)>;

    fn remove_drawable(&mut self, id: DrawableId, delay: f32, changes: &mut ChangeSet);

    /// Rebinds texture `slot` of a packed drawable.
    fn bind_texture(&mut self, id: DrawableId, slot: usize, texture: TextureId, changes: &mut ChangeSet);

    /// Finishes releases whose delay has passed by `now`.
    fn release_expired(&mut self, _now: f64, _changes: &mut ChangeSet) {}

    /// Collects the current texture and drawable mappings.
    fn build_snapshot(&self) -> AtlasSnapshot;

    fn counters(&self) -> AtlasCounters;
}
