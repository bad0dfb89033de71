use crate::{
    atlas::{
        AtlasCounters, AtlasService, AtlasSnapshot, DrawableBinding, SubRegion, SubTextureHandle,
        ranges::RangeAllocator,
    },
    config::TileBuilderConfig,
    error::{TileError, TileResult},
    geometry::{DrawStyle, TileMesh, Topology},
    scene::{BufferId, ChangeRequest, ChangeSet, DrawableId, TextureData, TextureId},
};
use bevy_log::{debug, info};
use bevy_math::{DVec3, UVec2};
use bevy_platform::collections::HashMap;
use bevy_utils::default;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use slab::Slab;
use std::{mem, ops::Range};

/// Configures the page and buffer sizes of a [`SharedAtlas`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AtlasSettings {
    /// Edge length of the square texture pages in texels.
    pub page_size: u32,
    /// The number of animation frames, each page has one texture per frame.
    pub image_depth: u32,
    /// Whether meshes are packed into shared buffers.
    pub pack_drawables: bool,
    /// Vertex capacity of a newly allocated shared buffer.
    pub vertex_budget: u32,
    /// Index capacity of a newly allocated shared buffer.
    pub index_budget: u32,
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            page_size: 2048,
            image_depth: 1,
            pack_drawables: true,
            vertex_budget: 1 << 16,
            index_budget: 6 << 16,
        }
    }
}

impl AtlasSettings {
    /// Settings matching the image depth of a builder configuration.
    pub fn for_config(config: &TileBuilderConfig) -> Self {
        Self {
            image_depth: config.image_depth.max(1),
            ..default()
        }
    }
}

/// A square texture split into equally sized cells.
struct Page {
    cell_size: u32,
    /// One texture per animation frame.
    textures: Vec<TextureId>,
    occupied: Vec<bool>,
    used: usize,
}

struct SubTexture {
    page: usize,
    cell: usize,
    size: UVec2,
    border: u32,
}

struct SharedBuffer {
    id: BufferId,
    topology: Topology,
    vertices: RangeAllocator,
    indices: RangeAllocator,
    /// Drawables living in the buffer, including those waiting for release.
    drawables: usize,
}

impl SharedBuffer {
    fn allocate(&mut self, vertex_count: u32, index_count: u32) -> Option<(Range<u32>, Range<u32>)> {
        let vertex_range = self.vertices.allocate(vertex_count)?;

        match self.indices.allocate(index_count) {
            Some(index_range) => Some((vertex_range, index_range)),
            None => {
                self.vertices.free(vertex_range);
                None
            }
        }
    }
}

struct PackedDrawable {
    buffer: usize,
    vertex_range: Range<u32>,
    index_range: Range<u32>,
    textures: Vec<Option<TextureId>>,
    origin: DVec3,
    style: DrawStyle,
}

enum Release {
    Cell { page: usize, cell: usize },
    Ranges {
        buffer: usize,
        vertex_range: Range<u32>,
        index_range: Range<u32>,
    },
}

struct PendingRelease {
    at: f64,
    release: Release,
}

/// An [`AtlasService`] packing tile images into texture pages and tile meshes
/// into shared buffers.
///
/// Pages are grouped by cell size, the smallest power of two fitting an image
/// and its border. Empty pages and buffers are removed from the scene again.
pub struct SharedAtlas {
    settings: AtlasSettings,
    pages: Slab<Page>,
    sub_textures: Slab<SubTexture>,
    buffers: Slab<SharedBuffer>,
    drawables: HashMap<DrawableId, PackedDrawable>,
    pending: Vec<PendingRelease>,
}

impl SharedAtlas {
    pub fn new(settings: AtlasSettings) -> Self {
        Self {
            settings,
            pages: Slab::with_capacity(8),
            sub_textures: Slab::with_capacity(256),
            buffers: Slab::with_capacity(8),
            drawables: default(),
            pending: default(),
        }
    }

    pub fn settings(&self) -> &AtlasSettings {
        &self.settings
    }

    fn depth(&self) -> usize {
        self.settings.image_depth.max(1) as usize
    }

    fn key(handle: SubTextureHandle) -> Option<usize> {
        usize::try_from(handle.0).ok()
    }

    fn cell_origin(&self, page: &Page, cell: usize) -> UVec2 {
        let per_side = (self.settings.page_size / page.cell_size) as usize;
        UVec2::new((cell % per_side) as u32, (cell / per_side) as u32) * page.cell_size
    }

    fn allocate_cell(&mut self, cell_size: u32, changes: &mut ChangeSet) -> (usize, usize) {
        let free = self
            .pages
            .iter()
            .filter(|(_, page)| page.cell_size == cell_size && page.used < page.occupied.len())
            .find_map(|(key, page)| Some((key, page.occupied.iter().position(|&taken| !taken)?)));

        let (page_key, cell) = match free {
            Some(free) => free,
            None => {
                let per_side = (self.settings.page_size / cell_size) as usize;
                let textures: Vec<_> = (0..self.depth()).map(|_| TextureId::next()).collect();

                for &id in &textures {
                    changes.push(ChangeRequest::AddTexture {
                        id,
                        data: TextureData::Blank {
                            width: self.settings.page_size,
                            height: self.settings.page_size,
                        },
                    });
                }

                debug!(
                    "Allocated atlas page with {} cells of {cell_size} texels.",
                    per_side * per_side
                );

                let key = self.pages.insert(Page {
                    cell_size,
                    textures,
                    occupied: vec![false; per_side * per_side],
                    used: 0,
                });
                (key, 0)
            }
        };

        let page = &mut self.pages[page_key];
        page.occupied[cell] = true;
        page.used += 1;

        (page_key, cell)
    }

    fn write_cell(&self, sub_texture: &SubTexture, image: &RgbaImage, frame: usize, changes: &mut ChangeSet) {
        let Some(page) = self.pages.get(sub_texture.page) else {
            return;
        };
        let Some(&id) = page.textures.get(frame) else {
            return;
        };

        changes.push(ChangeRequest::WriteTexture {
            id,
            origin: self.cell_origin(page, sub_texture.cell),
            image: pad_image(image, sub_texture.border),
        });
    }

    fn release_later(&mut self, release: Release, delay: f32, changes: &mut ChangeSet) {
        if delay > 0.0 {
            self.pending.push(PendingRelease {
                at: changes.now() + delay as f64,
                release,
            });
        } else {
            self.release(release, changes);
        }
    }

    fn release(&mut self, release: Release, changes: &mut ChangeSet) {
        match release {
            Release::Cell { page: page_key, cell } => {
                let Some(page) = self.pages.get_mut(page_key) else {
                    return;
                };

                if mem::replace(&mut page.occupied[cell], false) {
                    page.used -= 1;
                }

                if page.used == 0 {
                    for id in self.pages.remove(page_key).textures {
                        changes.push(ChangeRequest::RemoveTexture { id, delay: 0.0 });
                    }
                }
            }
            Release::Ranges {
                buffer: buffer_key,
                vertex_range,
                index_range,
            } => {
                let Some(buffer) = self.buffers.get_mut(buffer_key) else {
                    return;
                };

                buffer.vertices.free(vertex_range);
                buffer.indices.free(index_range);
                buffer.drawables = buffer.drawables.saturating_sub(1);

                if buffer.drawables == 0 {
                    let buffer = self.buffers.remove(buffer_key);
                    changes.push(ChangeRequest::RemoveBuffer {
                        id: buffer.id,
                        delay: 0.0,
                    });
                }
            }
        }
    }

    fn validate_frames(&self, images: &[RgbaImage], frame: Option<usize>) -> TileResult<Vec<usize>> {
        let depth = self.depth();

        match frame {
            Some(frame) if frame >= depth => Err(TileError::FrameOutOfRange {
                frame,
                depth: depth as u32,
            }),
            Some(frame) => Ok(vec![frame]),
            None if images.len() > depth => Err(TileError::FrameOutOfRange {
                frame: images.len() - 1,
                depth: depth as u32,
            }),
            None => Ok((0..images.len()).collect()),
        }
    }
}

/// Surrounds `image` with `border` texels repeating its edge.
fn pad_image(image: &RgbaImage, border: u32) -> RgbaImage {
    if border == 0 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    RgbaImage::from_fn(width + 2 * border, height + 2 * border, |x, y| {
        let x = x.saturating_sub(border).min(width - 1);
        let y = y.saturating_sub(border).min(height - 1);
        *image.get_pixel(x, y)
    })
}

impl AtlasService for SharedAtlas {
    fn add_texture(
        &mut self,
        images: &[RgbaImage],
        frame: Option<usize>,
        border_texels: u32,
        changes: &mut ChangeSet,
    ) -> TileResult<SubTextureHandle> {
        let first = images.first().ok_or(TileError::EmptyImage)?;
        let size = UVec2::from(first.dimensions());

        if size.min_element() == 0 {
            return Err(TileError::EmptyImage);
        }
        if let Some(index) = images.iter().position(|image| image.dimensions() != first.dimensions()) {
            return Err(TileError::TextureBuild {
                frame: frame.unwrap_or(index),
                reason: format!("expected a {}x{} image", size.x, size.y),
            });
        }

        let frames = self.validate_frames(images, frame)?;

        let cell_size = (size.max_element() + 2 * border_texels).next_power_of_two();
        if cell_size > self.settings.page_size {
            return Err(TileError::AtlasFull { size: cell_size });
        }

        let (page, cell) = self.allocate_cell(cell_size, changes);
        let sub_texture = SubTexture {
            page,
            cell,
            size,
            border: border_texels,
        };

        for (image, frame) in images.iter().zip(frames) {
            self.write_cell(&sub_texture, image, frame, changes);
        }

        Ok(SubTextureHandle(self.sub_textures.insert(sub_texture) as u64))
    }

    fn update_texture(
        &mut self,
        image: &RgbaImage,
        frame: usize,
        handle: SubTextureHandle,
        changes: &mut ChangeSet,
    ) -> TileResult<()> {
        let depth = self.depth();
        let sub_texture = Self::key(handle)
            .and_then(|key| self.sub_textures.get(key))
            .ok_or(TileError::UnknownTexture(handle))?;

        if frame >= depth {
            return Err(TileError::FrameOutOfRange {
                frame,
                depth: depth as u32,
            });
        }
        if UVec2::from(image.dimensions()) != sub_texture.size {
            return Err(TileError::TextureBuild {
                frame,
                reason: format!(
                    "expected a {}x{} image",
                    sub_texture.size.x, sub_texture.size.y
                ),
            });
        }

        self.write_cell(sub_texture, image, frame, changes);

        Ok(())
    }

    fn remove_texture(&mut self, handle: SubTextureHandle, delay: f32, changes: &mut ChangeSet) {
        let Some(sub_texture) = Self::key(handle).and_then(|key| self.sub_textures.try_remove(key)) else {
            return;
        };

        let release = Release::Cell {
            page: sub_texture.page,
            cell: sub_texture.cell,
        };
        self.release_later(release, delay, changes);
    }

    fn texture_id_for_frame(&self, handle: SubTextureHandle, frame: usize) -> Option<TextureId> {
        let sub_texture = self.sub_textures.get(Self::key(handle)?)?;
        self.pages.get(sub_texture.page)?.textures.get(frame).copied()
    }

    fn sub_region(&self, handle: SubTextureHandle) -> Option<SubRegion> {
        let sub_texture = self.sub_textures.get(Self::key(handle)?)?;
        let page = self.pages.get(sub_texture.page)?;
        let page_size = self.settings.page_size as f32;
        let origin = self.cell_origin(page, sub_texture.cell) + sub_texture.border;

        Some(SubRegion {
            offset: origin.as_vec2() / page_size,
            scale: sub_texture.size.as_vec2() / page_size,
        })
    }

    fn packs_drawables(&self) -> bool {
        self.settings.pack_drawables
    }

    fn add_drawable(
        &mut self,
        mesh: TileMesh,
        textures: &[Option<TextureId>],
        changes: &mut ChangeSet,
    ) -> TileResult<(DrawableId, bool)> {
        let vertex_count = mesh.vertices.len() as u32;
        let index_count = mesh.indices.len() as u32;

        let placement = self
            .buffers
            .iter_mut()
            .filter(|(_, buffer)| buffer.topology == mesh.topology)
            .find_map(|(key, buffer)| Some((key, buffer.allocate(vertex_count, index_count)?)));

        let (buffer_key, (vertex_range, index_range), allocated) = match placement {
            Some((key, ranges)) => (key, ranges, false),
            None => {
                let vertex_capacity = self.settings.vertex_budget.max(vertex_count);
                let index_capacity = self.settings.index_budget.max(index_count);
                let (vertices, vertex_range) = RangeAllocator::with_reserved(vertex_capacity, vertex_count);
                let (indices, index_range) = RangeAllocator::with_reserved(index_capacity, index_count);
                let id = BufferId::next();

                changes.push(ChangeRequest::AddBuffer {
                    id,
                    topology: mesh.topology,
                    vertex_capacity: vertices.capacity(),
                    index_capacity: indices.capacity(),
                });

                info!(
                    "Allocated shared buffer {id:?} for {vertex_capacity} vertices and {index_capacity} indices."
                );

                let key = self.buffers.insert(SharedBuffer {
                    id,
                    topology: mesh.topology,
                    vertices,
                    indices,
                    drawables: 0,
                });
                (key, (vertex_range, index_range), true)
            }
        };

        let buffer = &mut self.buffers[buffer_key];
        buffer.drawables += 1;

        let TileMesh {
            vertices,
            indices,
            origin,
            style,
            ..
        } = mesh;

        changes.push(ChangeRequest::WriteBuffer {
            id: buffer.id,
            vertex_offset: vertex_range.start,
            index_offset: index_range.start,
            vertices,
            indices: indices
                .into_iter()
                .map(|index| index + vertex_range.start)
                .collect(),
        });

        let id = DrawableId::next();
        self.drawables.insert(
            id,
            PackedDrawable {
                buffer: buffer_key,
                vertex_range,
                index_range,
                textures: textures.to_vec(),
                origin,
                style,
            },
        );

        Ok((id, allocated))
    }

    fn remove_drawable(&mut self, id: DrawableId, delay: f32, changes: &mut ChangeSet) {
        let Some(drawable) = self.drawables.remove(&id) else {
            return;
        };

        if let Some(buffer) = self.buffers.get(drawable.buffer) {
            changes.push(ChangeRequest::ClearBuffer {
                id: buffer.id,
                index_offset: drawable.index_range.start,
                index_count: drawable.index_range.len() as u32,
                delay: delay.max(0.0),
            });
        }

        let release = Release::Ranges {
            buffer: drawable.buffer,
            vertex_range: drawable.vertex_range,
            index_range: drawable.index_range,
        };
        self.release_later(release, delay, changes);
    }

    fn bind_texture(&mut self, id: DrawableId, slot: usize, texture: TextureId, changes: &mut ChangeSet) {
        let Some(drawable) = self.drawables.get_mut(&id) else {
            return;
        };

        match drawable.textures.get_mut(slot) {
            Some(bound) => *bound = Some(texture),
            None => {
                drawable.textures.resize(slot, None);
                drawable.textures.push(Some(texture));
            }
        }

        changes.push(ChangeRequest::BindTexture {
            drawable: id,
            slot,
            texture,
        });
    }

    fn release_expired(&mut self, now: f64, changes: &mut ChangeSet) {
        let (due, pending): (Vec<_>, Vec<_>) = mem::take(&mut self.pending)
            .into_iter()
            .partition(|pending| pending.at <= now);
        self.pending = pending;

        for pending in due {
            self.release(pending.release, changes);
        }
    }

    fn build_snapshot(&self) -> AtlasSnapshot {
        let textures = self
            .sub_textures
            .iter()
            .filter_map(|(key, sub_texture)| {
                let page = self.pages.get(sub_texture.page)?;
                Some((SubTextureHandle(key as u64), page.textures.clone()))
            })
            .collect();

        let drawables = self
            .drawables
            .iter()
            .filter_map(|(&id, drawable)| {
                let buffer = self.buffers.get(drawable.buffer)?;
                Some((
                    id,
                    DrawableBinding {
                        buffer: buffer.id,
                        vertex_range: drawable.vertex_range.clone(),
                        index_range: drawable.index_range.clone(),
                        textures: drawable.textures.clone(),
                        origin: drawable.origin,
                        style: drawable.style,
                    },
                ))
            })
            .collect();

        AtlasSnapshot {
            generation: 0,
            textures,
            drawables,
        }
    }

    fn counters(&self) -> AtlasCounters {
        AtlasCounters {
            sub_textures: self.sub_textures.len(),
            pages: self.pages.len(),
            drawables: self.drawables.len(),
            buffers: self.buffers.len(),
            pending_releases: self.pending.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TileBuilder;
    use bevy_math::Vec2;
    use image::Rgba;
    use mosaic_geocoord::{QuadAddress, Surface};

    fn image(size: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([value, value, value, 255]))
    }

    fn quad_mesh() -> TileMesh {
        let mut config = TileBuilderConfig::for_surface(Surface::plane(1.0));
        config.tessellation = UVec2::ONE;

        TileBuilder::new(config)
            .build_tile(QuadAddress::ROOT, None, Vec2::ONE, Vec2::ZERO, false)
            .unwrap()
            .mesh
    }

    fn small_atlas(image_depth: u32) -> SharedAtlas {
        SharedAtlas::new(AtlasSettings {
            page_size: 64,
            image_depth,
            vertex_budget: 8,
            index_budget: 12,
            ..default()
        })
    }

    fn count(changes: &ChangeSet, predicate: impl Fn(&ChangeRequest) -> bool) -> usize {
        changes.iter().filter(|request| predicate(request)).count()
    }

    #[test]
    fn images_of_one_size_share_a_page() {
        let mut atlas = small_atlas(1);
        let mut changes = ChangeSet::new(0.0);

        let a = atlas.add_texture(&[image(32, 1)], None, 0, &mut changes).unwrap();
        let b = atlas.add_texture(&[image(32, 2)], None, 0, &mut changes).unwrap();

        assert_eq!(atlas.counters().pages, 1);
        assert_eq!(count(&changes, |r| matches!(r, ChangeRequest::AddTexture { .. })), 1);
        assert_eq!(count(&changes, |r| matches!(r, ChangeRequest::WriteTexture { .. })), 2);
        assert_eq!(atlas.texture_id_for_frame(a, 0), atlas.texture_id_for_frame(b, 0));

        let region = atlas.sub_region(b).unwrap();
        assert_eq!(region.offset, Vec2::new(0.5, 0.0));
        assert_eq!(region.scale, Vec2::splat(0.5));
        assert_eq!(region.apply(Vec2::ONE), Vec2::new(1.0, 0.5));
    }

    #[test]
    fn borders_repeat_the_edge_texels() {
        let mut atlas = small_atlas(1);
        let mut changes = ChangeSet::new(0.0);

        let handle = atlas.add_texture(&[image(30, 7)], None, 1, &mut changes).unwrap();
        let region = atlas.sub_region(handle).unwrap();
        assert_eq!(region.offset, Vec2::splat(1.0 / 64.0));
        assert_eq!(region.scale, Vec2::splat(30.0 / 64.0));

        let ChangeRequest::WriteTexture { image, .. } = &changes[1] else {
            panic!("expected a texture write, got {:?}", changes[1]);
        };
        assert_eq!(image.dimensions(), (32, 32));
        assert_eq!(image.get_pixel(0, 0).0, [7, 7, 7, 255]);
    }

    #[test]
    fn frames_get_their_own_page_textures() {
        let mut atlas = small_atlas(2);
        let mut changes = ChangeSet::new(0.0);

        let handle = atlas.add_texture(&[image(16, 1)], Some(1), 0, &mut changes).unwrap();
        let frame_0 = atlas.texture_id_for_frame(handle, 0).unwrap();
        let frame_1 = atlas.texture_id_for_frame(handle, 1).unwrap();
        assert_ne!(frame_0, frame_1);
        assert!(changes.iter().any(|r| matches!(r, ChangeRequest::WriteTexture { id, .. } if *id == frame_1)));
        assert!(!changes.iter().any(|r| matches!(r, ChangeRequest::WriteTexture { id, .. } if *id == frame_0)));

        atlas.update_texture(&image(16, 2), 0, handle, &mut changes).unwrap();
        assert!(changes.iter().any(|r| matches!(r, ChangeRequest::WriteTexture { id, .. } if *id == frame_0)));

        assert!(matches!(
            atlas.update_texture(&image(16, 2), 2, handle, &mut changes),
            Err(TileError::FrameOutOfRange { frame: 2, depth: 2 })
        ));
        assert!(matches!(
            atlas.update_texture(&image(8, 2), 0, handle, &mut changes),
            Err(TileError::TextureBuild { frame: 0, .. })
        ));
    }

    #[test]
    fn invalid_textures_are_rejected() {
        let mut atlas = small_atlas(1);
        let mut changes = ChangeSet::new(0.0);

        assert!(matches!(
            atlas.add_texture(&[image(100, 1)], None, 0, &mut changes),
            Err(TileError::AtlasFull { size: 128 })
        ));
        assert!(matches!(
            atlas.add_texture(&[image(8, 1), image(8, 1)], None, 0, &mut changes),
            Err(TileError::FrameOutOfRange { frame: 1, depth: 1 })
        ));
        assert!(matches!(
            atlas.add_texture(&[], None, 0, &mut changes),
            Err(TileError::EmptyImage)
        ));
        assert_eq!(atlas.counters(), AtlasCounters::default());
        assert!(changes.is_empty());
    }

    #[test]
    fn drawables_are_packed_until_the_budget_is_used() {
        let mut atlas = small_atlas(1);
        let mut changes = ChangeSet::new(0.0);
        let texture = TextureId::next();

        let (first, allocated) = atlas.add_drawable(quad_mesh(), &[Some(texture)], &mut changes).unwrap();
        assert!(allocated);
        let (second, allocated) = atlas.add_drawable(quad_mesh(), &[Some(texture)], &mut changes).unwrap();
        assert!(!allocated);
        let (_, allocated) = atlas.add_drawable(quad_mesh(), &[Some(texture)], &mut changes).unwrap();
        assert!(allocated);

        assert_eq!(atlas.counters().buffers, 2);

        let snapshot = atlas.build_snapshot();
        assert_eq!(snapshot.drawables[&first].vertex_range, 0..4);
        assert_eq!(snapshot.drawables[&second].vertex_range, 4..8);
        assert_eq!(snapshot.drawables[&second].index_range, 6..12);

        let ChangeRequest::WriteBuffer { indices, .. } = &changes[2] else {
            panic!("expected a buffer write, got {:?}", changes[2]);
        };
        assert!(indices.iter().all(|&index| (4..8).contains(&index)));
    }

    #[test]
    fn removing_everything_releases_buffers_and_pages() {
        let mut atlas = small_atlas(1);
        let mut changes = ChangeSet::new(0.0);

        let handle = atlas.add_texture(&[image(16, 1)], None, 0, &mut changes).unwrap();
        let texture = atlas.texture_id_for_frame(handle, 0).unwrap();
        let (drawable, _) = atlas.add_drawable(quad_mesh(), &[Some(texture)], &mut changes).unwrap();

        atlas.remove_drawable(drawable, 0.0, &mut changes);
        atlas.remove_texture(handle, 0.0, &mut changes);
        atlas.remove_texture(handle, 0.0, &mut changes);

        assert_eq!(atlas.counters(), AtlasCounters::default());
        assert_eq!(count(&changes, |r| matches!(r, ChangeRequest::ClearBuffer { .. })), 1);
        assert_eq!(count(&changes, |r| matches!(r, ChangeRequest::RemoveBuffer { .. })), 1);
        assert_eq!(count(&changes, |r| matches!(r, ChangeRequest::RemoveTexture { .. })), 1);
    }

    #[test]
    fn delayed_releases_wait_for_the_fade() {
        let mut atlas = small_atlas(1);
        let mut changes = ChangeSet::new(10.0);

        let handle = atlas.add_texture(&[image(16, 1)], None, 0, &mut changes).unwrap();
        let (drawable, _) = atlas.add_drawable(quad_mesh(), &[], &mut changes).unwrap();

        atlas.remove_drawable(drawable, 0.5, &mut changes);
        atlas.remove_texture(handle, 0.5, &mut changes);

        let counters = atlas.counters();
        assert_eq!((counters.sub_textures, counters.drawables), (0, 0));
        assert_eq!((counters.pages, counters.buffers, counters.pending_releases), (1, 1, 2));

        atlas.release_expired(10.25, &mut changes);
        assert_eq!(atlas.counters().pending_releases, 2);

        atlas.release_expired(10.5, &mut changes);
        assert_eq!(atlas.counters(), AtlasCounters::default());
    }

    #[test]
    fn rebinding_updates_the_snapshot() {
        let mut atlas = small_atlas(1);
        let mut changes = ChangeSet::new(0.0);
        let (drawable, _) = atlas
            .add_drawable(quad_mesh(), &[Some(TextureId(1))], &mut changes)
            .unwrap();

        atlas.bind_texture(drawable, 0, TextureId(2), &mut changes);
        atlas.bind_texture(drawable, 1, TextureId(3), &mut changes);

        let snapshot = atlas.build_snapshot();
        assert_eq!(snapshot.drawables[&drawable].textures, vec![Some(TextureId(2)), Some(TextureId(3))]);
    }
}
