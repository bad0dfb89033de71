use crate::{
    atlas::{AtlasService, AtlasSnapshotPublisher},
    error::{TileError, TileResult},
    geometry::TileBuilder,
    node::{AnimationFrames, ChildState, QuadrantCoverage, TileContext, TileNode},
    scene::{ChangeRequest, ChangeSet},
    texture::TileImage,
};
use bevy_log::debug;
use bevy_platform::collections::{HashMap, HashSet};
use bevy_utils::default;
use mosaic_geocoord::{QuadAddress, Quadrant, QuadrantArray};
use std::{mem, sync::Arc};

fn context<'a>(
    builder: &'a TileBuilder,
    atlas: &'a mut Option<Box<dyn AtlasService>>,
    changes: &'a mut ChangeSet,
) -> TileContext<'a> {
    let atlas = atlas
        .as_deref_mut()
        .map(|atlas| atlas as &mut dyn AtlasService);

    TileContext::new(builder, atlas, changes)
}

/// The loader side of a tiled surface.
///
/// Owns one [`TileNode`] per loaded address and serializes every node
/// operation. The recorded changes of a pass are handed out as one ordered
/// batch by [`TileCache::finish_pass`].
pub struct TileCache {
    builder: TileBuilder,
    atlas: Option<Box<dyn AtlasService>>,
    publisher: Arc<AtlasSnapshotPublisher>,
    nodes: HashMap<QuadAddress, TileNode>,
    /// Nodes whose children changed since their last update.
    dirty: HashSet<QuadAddress>,
    frames: AnimationFrames,
    changes: ChangeSet,
    allocated_buffer: bool,
}

impl TileCache {
    /// A cache adding textures and drawables to the scene directly.
    pub fn new(builder: TileBuilder) -> Self {
        Self {
            builder,
            atlas: None,
            publisher: default(),
            nodes: default(),
            dirty: default(),
            frames: default(),
            changes: default(),
            allocated_buffer: false,
        }
    }

    /// Routes textures and drawables through `atlas`.
    pub fn with_atlas(mut self, atlas: impl AtlasService + 'static) -> Self {
        self.atlas = Some(Box::new(atlas));
        self
    }

    pub fn builder(&self) -> &TileBuilder {
        &self.builder
    }

    pub fn atlas(&self) -> Option<&dyn AtlasService> {
        self.atlas.as_deref()
    }

    /// The publisher the renderer reads atlas snapshots from.
    pub fn publisher(&self) -> Arc<AtlasSnapshotPublisher> {
        self.publisher.clone()
    }

    pub fn frames(&self) -> AnimationFrames {
        self.frames
    }

    /// Whether the renderer caught up with newly allocated buffers.
    pub fn is_ready(&self) -> bool {
        self.publisher.is_ready()
    }

    pub fn node(&self, address: QuadAddress) -> Option<&TileNode> {
        self.nodes.get(&address)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TileNode> {
        self.nodes.values()
    }

    pub fn coverage(&self, address: QuadAddress, quadrant: Quadrant) -> QuadrantCoverage {
        self.node(address)
            .map_or(QuadrantCoverage::Uncovered, |node| node.coverage(quadrant))
    }

    /// The states of the children of `address` as seen by its node.
    pub fn child_states(&self, address: QuadAddress) -> QuadrantArray<ChildState> {
        QuadrantArray::from_fn(|quadrant| ChildState::of(self.node(address.child(quadrant))))
    }

    /// Starts a loader pass happening at `now` seconds.
    pub fn begin_pass(&mut self, now: f64) {
        self.changes.set_now(now);
    }

    /// Realizes the node of `address` from its loaded images.
    pub fn tile_loaded(
        &mut self,
        address: QuadAddress,
        images: &[TileImage],
        texture_frame: Option<usize>,
    ) -> TileResult<()> {
        if !address.is_valid() {
            return Err(TileError::InvalidAddress(address));
        }

        let node = self
            .nodes
            .entry(address)
            .or_insert_with(|| TileNode::new(address));
        let mut ctx = context(&self.builder, &mut self.atlas, &mut self.changes);

        let result = node.add_to_scene(&mut ctx, images, texture_frame, self.frames);
        self.allocated_buffer |= ctx.allocated_buffer;

        // a failed reload still tore down the previous contents
        self.mark_dirty(address);

        result
    }

    /// Tears down the node of `address`.
    pub fn tile_unloaded(&mut self, address: QuadAddress) {
        if let Some(mut node) = self.nodes.remove(&address) {
            let mut ctx = context(&self.builder, &mut self.atlas, &mut self.changes);
            node.clear_contents(&mut ctx);
        }

        self.dirty.remove(&address);
        if let Some(parent) = address.parent() {
            self.dirty.insert(parent);
        }
    }

    /// Re-evaluates the quadrant coverage of every node whose children changed.
    pub fn refresh_parents(&mut self) -> TileResult<()> {
        let mut dirty: Vec<_> = self.dirty.drain().collect();
        dirty.sort();

        for (index, &address) in dirty.iter().enumerate() {
            let children = self.child_states(address);
            let Some(node) = self.nodes.get_mut(&address) else {
                continue;
            };

            let mut ctx = context(&self.builder, &mut self.atlas, &mut self.changes);
            let result = node.update_contents(&mut ctx, children, self.frames);
            self.allocated_buffer |= ctx.allocated_buffer;

            if let Err(err) = result {
                self.dirty.extend(dirty[index..].iter().copied());
                return Err(err);
            }
        }

        Ok(())
    }

    /// Binds the textures of `frames` to every drawable.
    pub fn set_current_images(&mut self, frames: AnimationFrames) {
        self.frames = frames;

        for node in self.nodes.values() {
            let mut ctx = context(&self.builder, &mut self.atlas, &mut self.changes);
            node.set_current_images(&mut ctx, frames);
        }
    }

    pub fn set_enable(&mut self, enabled: bool) {
        for node in self.nodes.values() {
            node.set_enable(&mut self.changes, enabled);
        }
    }

    pub fn set_fade(&mut self, start: f64, end: f64) {
        for node in self.nodes.values() {
            node.set_fade(&mut self.changes, start, end);
        }
    }

    pub fn set_shader_value(&mut self, name: &str, value: f32) {
        for node in self.nodes.values() {
            node.set_shader_value(&mut self.changes, name, value);
        }
    }

    /// Tears down every node.
    pub fn clear(&mut self) {
        for (_, mut node) in self.nodes.drain() {
            let mut ctx = context(&self.builder, &mut self.atlas, &mut self.changes);
            node.clear_contents(&mut ctx);
        }

        self.dirty.clear();
    }

    /// Ends the current pass and returns its ordered change batch.
    ///
    /// Publishes a new atlas snapshot if anything changed.
    pub fn finish_pass(&mut self) -> Vec<ChangeRequest> {
        let now = self.changes.now();

        if let Some(atlas) = self.atlas.as_deref_mut() {
            atlas.release_expired(now, &mut self.changes);

            if !self.changes.is_empty() {
                let swap_buffers = mem::take(&mut self.allocated_buffer);
                self.publisher.publish(atlas.build_snapshot(), swap_buffers);
            }
        }

        let changes = self.changes.take();
        debug!("Finished loader pass at {now} with {} changes.", changes.len());

        changes.into_ordered()
    }

    fn mark_dirty(&mut self, address: QuadAddress) {
        self.dirty.insert(address);
        if let Some(parent) = address.parent() {
            self.dirty.insert(parent);
        }
    }
}
