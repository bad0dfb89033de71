use crate::{
    atlas::{AtlasService, SubRegion, SubTextureHandle},
    error::{TileError, TileResult},
    geometry::{TileGeometry, TileMesh},
    node::{AnimationFrames, ChildState, QuadrantCoverage, TileContext},
    scene::{ChangeRequest, ChangeSet, DrawableId, TextureData, TextureId},
    texture::{TileImage, normalize},
};
use bevy_log::{debug, warn};
use bevy_math::Vec2;
use bevy_utils::default;
use mosaic_geocoord::{QuadAddress, Quadrant, QuadrantArray};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DrawableRef {
    id: DrawableId,
    /// Packed into a shared buffer by the atlas service.
    packed: bool,
}

/// A tile mesh and its optional skirt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct DrawablePair {
    draw: Option<DrawableRef>,
    skirt: Option<DrawableRef>,
}

impl DrawablePair {
    fn iter(&self) -> impl Iterator<Item = DrawableRef> {
        self.draw.into_iter().chain(self.skirt)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum TileTextures {
    Atlas(SubTextureHandle),
    /// Standalone textures, one per animation frame.
    Direct(Vec<Option<TextureId>>),
}

/// The drawables and textures of one loaded quadtree address.
#[derive(Debug)]
pub struct TileNode {
    address: QuadAddress,
    self_draw: DrawablePair,
    placeholders: QuadrantArray<DrawablePair>,
    real_children: QuadrantArray<bool>,
    textures: Option<TileTextures>,
    initialized: bool,
    placeholder_only: bool,
}

impl TileNode {
    pub fn new(address: QuadAddress) -> Self {
        Self {
            address,
            self_draw: default(),
            placeholders: default(),
            real_children: default(),
            textures: None,
            initialized: false,
            placeholder_only: false,
        }
    }

    pub fn address(&self) -> QuadAddress {
        self.address
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Reserved below the minimum level of a source, never drawn.
    pub fn is_placeholder_only(&self) -> bool {
        self.placeholder_only
    }

    pub fn has_textures(&self) -> bool {
        self.textures.is_some()
    }

    pub fn has_self_draw(&self) -> bool {
        self.self_draw.draw.is_some()
    }

    pub fn has_placeholder(&self, quadrant: Quadrant) -> bool {
        self.placeholders[quadrant].draw.is_some()
    }

    pub fn coverage(&self, quadrant: Quadrant) -> QuadrantCoverage {
        if self.real_children[quadrant] {
            QuadrantCoverage::RealChild
        } else if self.has_placeholder(quadrant) {
            QuadrantCoverage::Placeholder
        } else if self.has_self_draw() {
            QuadrantCoverage::SelfDraw
        } else {
            QuadrantCoverage::Uncovered
        }
    }

    /// The number of representations active for `quadrant`, at most one
    /// outside of a node operation.
    pub fn representation_count(&self, quadrant: Quadrant) -> usize {
        [
            self.real_children[quadrant],
            self.has_placeholder(quadrant),
            self.has_self_draw(),
        ]
        .into_iter()
        .filter(|&active| active)
        .count()
    }

    /// Every drawable currently owned by the node, skirts included.
    pub fn drawables(&self) -> impl Iterator<Item = DrawableId> + '_ {
        self.active().map(|drawable| drawable.id)
    }

    fn active(&self) -> impl Iterator<Item = DrawableRef> + '_ {
        self.self_draw
            .iter()
            .chain(self.placeholders.iter().flat_map(DrawablePair::iter))
    }

    /// Realizes the node from its loaded images.
    ///
    /// A leading [`TileImage::Placeholder`] reserves the address without
    /// drawing anything. With `texture_frame` set on a textured node only that
    /// animation frame is replaced. On failure the node is left uninitialized
    /// and every texture built by the call is released again.
    pub fn add_to_scene(
        &mut self,
        ctx: &mut TileContext,
        images: &[TileImage],
        texture_frame: Option<usize>,
        frames: AnimationFrames,
    ) -> TileResult<()> {
        if images.first().is_some_and(TileImage::is_placeholder) {
            self.clear_contents(ctx);
            self.initialized = true;
            self.placeholder_only = true;
            return Ok(());
        }

        if let Some(frame) = texture_frame
            && self.initialized
            && self.textures.is_some()
        {
            return self.update_frame(ctx, images, frame, frames);
        }

        self.clear_contents(ctx);
        self.textures = self.build_textures(ctx, images, texture_frame)?;

        if let Err(err) = self.build_self(ctx, frames) {
            self.release_textures(ctx);
            return Err(err);
        }

        self.initialized = true;

        Ok(())
    }

    /// Decides per quadrant whether the node, a placeholder or the real child
    /// draws it. Safe to call repeatedly with any combination of child states.
    pub fn update_contents(
        &mut self,
        ctx: &mut TileContext,
        children: QuadrantArray<ChildState>,
        frames: AnimationFrames,
    ) -> TileResult<()> {
        if !self.initialized || self.placeholder_only {
            return Ok(());
        }

        if !children.contains(&ChildState::Ready) {
            self.build_self(ctx, frames)?;

            for (quadrant, pair) in self.placeholders.iter_quadrants_mut() {
                remove_pair(ctx, pair);
                self.real_children[quadrant] = false;
            }

            return Ok(());
        }

        for (quadrant, &state) in children.iter_quadrants() {
            if state == ChildState::Ready {
                remove_pair(ctx, &mut self.placeholders[quadrant]);
                self.real_children[quadrant] = true;
            } else {
                self.real_children[quadrant] = false;
                self.build_placeholder(ctx, quadrant, frames)?;
            }
        }

        remove_pair(ctx, &mut self.self_draw);

        Ok(())
    }

    /// Binds the textures of `frames` to every active drawable.
    pub fn set_current_images(&self, ctx: &mut TileContext, frames: AnimationFrames) {
        let textures = self.current_textures(ctx, frames);

        for drawable in self.active() {
            for (slot, texture) in textures.iter().enumerate() {
                let Some(texture) = *texture else {
                    continue;
                };

                match ctx.atlas.as_deref_mut() {
                    Some(atlas) if drawable.packed => {
                        atlas.bind_texture(drawable.id, slot, texture, ctx.changes);
                    }
                    _ => ctx.changes.push(ChangeRequest::BindTexture {
                        drawable: drawable.id,
                        slot,
                        texture,
                    }),
                }
            }
        }
    }

    /// Removes every drawable and texture of the node. Does nothing on an
    /// empty node.
    pub fn clear_contents(&mut self, ctx: &mut TileContext) {
        remove_pair(ctx, &mut self.self_draw);
        for pair in self.placeholders.iter_mut() {
            remove_pair(ctx, pair);
        }

        self.release_textures(ctx);

        self.real_children = default();
        self.initialized = false;
        self.placeholder_only = false;
    }

    pub fn set_enable(&self, changes: &mut ChangeSet, enabled: bool) {
        for drawable in self.drawables() {
            changes.push(ChangeRequest::OnOff { drawable, enabled });
        }
    }

    pub fn set_fade(&self, changes: &mut ChangeSet, start: f64, end: f64) {
        for drawable in self.drawables() {
            changes.push(ChangeRequest::Fade {
                drawable,
                start,
                end,
            });
        }
    }

    pub fn set_shader_value(&self, changes: &mut ChangeSet, name: &str, value: f32) {
        for drawable in self.drawables() {
            changes.push(ChangeRequest::ShaderValue {
                drawable,
                name: name.to_owned(),
                value,
            });
        }
    }

    fn update_frame(
        &mut self,
        ctx: &mut TileContext,
        images: &[TileImage],
        frame: usize,
        frames: AnimationFrames,
    ) -> TileResult<()> {
        let Some(TileImage::Image(image)) = images.first() else {
            return Ok(());
        };
        let image = normalize(image, ctx.builder.config().resize_policy)
            .map_err(|err| texture_error(frame, err))?;

        let rebind = match &mut self.textures {
            Some(TileTextures::Atlas(handle)) => {
                let handle = *handle;
                let atlas = ctx
                    .atlas
                    .as_deref_mut()
                    .ok_or(TileError::UnknownTexture(handle))?;

                atlas
                    .update_texture(&image, frame, handle, ctx.changes)
                    .inspect_err(|err| warn!("Failed to update frame {frame} of tile {}: {err}", self.address))?;
                false
            }
            Some(TileTextures::Direct(ids)) => {
                let depth = ids.len() as u32;
                let slot = ids
                    .get_mut(frame)
                    .ok_or(TileError::FrameOutOfRange { frame, depth })?;

                let id = TextureId::next();
                ctx.changes.push(ChangeRequest::AddTexture {
                    id,
                    data: TextureData::Image(image),
                });
                if let Some(old) = slot.replace(id) {
                    ctx.changes
                        .push(ChangeRequest::RemoveTexture { id: old, delay: 0.0 });
                }
                true
            }
            None => false,
        };

        if rebind {
            self.set_current_images(ctx, frames);
        }

        Ok(())
    }

    fn build_textures(
        &self,
        ctx: &mut TileContext,
        images: &[TileImage],
        frame: Option<usize>,
    ) -> TileResult<Option<TileTextures>> {
        let config = ctx.builder.config();

        let normalized = images
            .iter()
            .filter_map(|image| match image {
                TileImage::Image(image) => Some(image),
                TileImage::Placeholder => None,
            })
            .enumerate()
            .map(|(index, image)| {
                normalize(image, config.resize_policy)
                    .map_err(|err| texture_error(frame.unwrap_or(index), err))
            })
            .collect::<TileResult<Vec<_>>>()
            .inspect_err(|err| warn!("Failed to build textures for tile {}: {err}", self.address))?;

        if normalized.is_empty() {
            return Ok(None);
        }

        if let Some(atlas) = ctx.atlas.as_deref_mut() {
            let handle = atlas
                .add_texture(&normalized, frame, config.border_texels, ctx.changes)
                .inspect_err(|err| warn!("Failed to build textures for tile {}: {err}", self.address))?;

            return Ok(Some(TileTextures::Atlas(handle)));
        }

        let depth = config.image_depth.max(1) as usize;
        let slots: Vec<usize> = match frame {
            Some(frame) if frame < depth => vec![frame],
            None if normalized.len() <= depth => (0..normalized.len()).collect(),
            _ => {
                return Err(TileError::FrameOutOfRange {
                    frame: frame.unwrap_or(normalized.len() - 1),
                    depth: depth as u32,
                });
            }
        };

        let mut ids = vec![None; depth];
        for (slot, image) in slots.into_iter().zip(normalized) {
            let id = TextureId::next();
            ctx.changes.push(ChangeRequest::AddTexture {
                id,
                data: TextureData::Image(image),
            });
            ids[slot] = Some(id);
        }

        Ok(Some(TileTextures::Direct(ids)))
    }

    fn release_textures(&mut self, ctx: &mut TileContext) {
        let delay = ctx.builder.config().fade.max(0.0);

        match self.textures.take() {
            Some(TileTextures::Atlas(handle)) => {
                if let Some(atlas) = ctx.atlas.as_deref_mut() {
                    atlas.remove_texture(handle, delay, ctx.changes);
                }
            }
            Some(TileTextures::Direct(ids)) => {
                for id in ids.into_iter().flatten() {
                    ctx.changes.push(ChangeRequest::RemoveTexture { id, delay });
                }
            }
            None => {}
        }
    }

    fn texture_for_frame(&self, atlas: Option<&dyn AtlasService>, frame: usize) -> Option<TextureId> {
        match self.textures.as_ref()? {
            TileTextures::Atlas(handle) => atlas?.texture_id_for_frame(*handle, frame),
            TileTextures::Direct(ids) => ids.get(frame).copied().flatten(),
        }
    }

    /// The texture of every slot, `None` where the frame was not loaded yet.
    fn current_textures(&self, ctx: &TileContext, frames: AnimationFrames) -> Vec<Option<TextureId>> {
        let slots = ctx.builder.config().texture_slots();

        [frames.primary, frames.secondary]
            .into_iter()
            .take(slots)
            .map(|frame| self.texture_for_frame(ctx.atlas.as_deref(), frame))
            .collect()
    }

    fn sub_region(&self, ctx: &TileContext) -> Option<SubRegion> {
        match self.textures.as_ref()? {
            TileTextures::Atlas(handle) => ctx.atlas.as_deref()?.sub_region(*handle),
            TileTextures::Direct(_) => None,
        }
    }

    fn build_self(&mut self, ctx: &mut TileContext, frames: AnimationFrames) -> TileResult<()> {
        if self.has_self_draw() {
            return Ok(());
        }

        let line_mode = self.textures.is_none();
        let Some(geometry) = ctx
            .builder
            .build_tile(self.address, None, Vec2::ONE, Vec2::ZERO, line_mode)
        else {
            debug!("Tile {} lies outside of the clip extents.", self.address);
            return Ok(());
        };

        self.self_draw = self.submit_geometry(ctx, geometry, frames)?;

        Ok(())
    }

    /// Covers `quadrant` with the matching quarter of this node's texture.
    fn build_placeholder(
        &mut self,
        ctx: &mut TileContext,
        quadrant: Quadrant,
        frames: AnimationFrames,
    ) -> TileResult<()> {
        if self.has_placeholder(quadrant) {
            return Ok(());
        }

        let child = self.address.child(quadrant);
        let (dx, dy) = quadrant.offset();
        let tex_offset = Vec2::new(dx as f32, dy as f32) * 0.5;
        let line_mode = self.textures.is_none();

        let Some(geometry) = ctx.builder.build_tile(
            child,
            Some(self.address),
            Vec2::splat(0.5),
            tex_offset,
            line_mode,
        ) else {
            debug!("Skipping placeholder {child} outside of the clip extents.");
            return Ok(());
        };

        self.placeholders[quadrant] = self.submit_geometry(ctx, geometry, frames)?;

        Ok(())
    }

    fn submit_geometry(
        &self,
        ctx: &mut TileContext,
        geometry: TileGeometry,
        frames: AnimationFrames,
    ) -> TileResult<DrawablePair> {
        let textures = self.current_textures(ctx, frames);
        let region = self.sub_region(ctx);
        let TileGeometry { mesh, skirt } = geometry;

        let mut pair = DrawablePair {
            draw: Some(submit_mesh(ctx, mesh, &textures, region)?),
            skirt: None,
        };

        if let Some(skirt) = skirt {
            match submit_mesh(ctx, skirt, &textures, region) {
                Ok(drawable) => pair.skirt = Some(drawable),
                Err(err) => {
                    remove_pair(ctx, &mut pair);
                    return Err(err);
                }
            }
        }

        Ok(pair)
    }
}

fn texture_error(frame: usize, err: TileError) -> TileError {
    TileError::TextureBuild {
        frame,
        reason: err.to_string(),
    }
}

/// Hands `mesh` over to the atlas or the scene.
fn submit_mesh(
    ctx: &mut TileContext,
    mut mesh: TileMesh,
    textures: &[Option<TextureId>],
    region: Option<SubRegion>,
) -> TileResult<DrawableRef> {
    if let Some(region) = region {
        mesh.map_uvs(|uv| region.apply(uv));
    }

    match ctx.atlas.as_deref_mut() {
        Some(atlas) if atlas.packs_drawables() => {
            let (id, allocated) = atlas.add_drawable(mesh, textures, ctx.changes)?;
            ctx.allocated_buffer |= allocated;

            Ok(DrawableRef { id, packed: true })
        }
        _ => {
            let id = DrawableId::next();
            ctx.changes.push(ChangeRequest::AddDrawable {
                id,
                mesh: Box::new(mesh),
                textures: textures.to_vec(),
            });

            Ok(DrawableRef { id, packed: false })
        }
    }
}

fn remove_pair(ctx: &mut TileContext, pair: &mut DrawablePair) {
    let fade = ctx.builder.config().fade;

    for drawable in pair.draw.take().into_iter().chain(pair.skirt.take()) {
        if drawable.packed {
            ctx.changes.fade_out(drawable.id, fade);
            if let Some(atlas) = ctx.atlas.as_deref_mut() {
                atlas.remove_drawable(drawable.id, fade.max(0.0), ctx.changes);
            }
        } else {
            ctx.changes.remove_drawable(drawable.id, fade);
        }
    }
}
