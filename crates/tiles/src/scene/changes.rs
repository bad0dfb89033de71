use crate::{
    geometry::{TileMesh, TileVertex, Topology},
    scene::{BufferId, DrawableId, TextureId},
};
use bevy_derive::{Deref, DerefMut};
use bevy_math::UVec2;
use image::RgbaImage;
use std::mem;

/// The pixel content of a newly added texture.
#[derive(Clone, Debug)]
pub enum TextureData {
    /// A standalone texture holding a single tile image.
    Image(RgbaImage),
    /// An empty atlas page, filled later by [`ChangeRequest::WriteTexture`].
    Blank { width: u32, height: u32 },
}

/// A single mutation of the scene the renderer has to apply.
#[derive(Clone, Debug)]
pub enum ChangeRequest {
    AddTexture {
        id: TextureId,
        data: TextureData,
    },
    /// Copies `image` into an existing texture at `origin`.
    WriteTexture {
        id: TextureId,
        origin: UVec2,
        image: RgbaImage,
    },
    RemoveTexture {
        id: TextureId,
        delay: f32,
    },
    AddDrawable {
        id: DrawableId,
        mesh: Box<TileMesh>,
        /// Starting texture per slot.
        textures: Vec<Option<TextureId>>,
    },
    RemoveDrawable {
        id: DrawableId,
        delay: f32,
    },
    AddBuffer {
        id: BufferId,
        topology: Topology,
        vertex_capacity: u32,
        index_capacity: u32,
    },
    /// Uploads packed geometry into a shared buffer. Indices are already
    /// relative to the start of the buffer.
    WriteBuffer {
        id: BufferId,
        vertex_offset: u32,
        index_offset: u32,
        vertices: Vec<TileVertex>,
        indices: Vec<u32>,
    },
    /// Degenerates the index range of a packed drawable after `delay` seconds.
    ClearBuffer {
        id: BufferId,
        index_offset: u32,
        index_count: u32,
        delay: f32,
    },
    RemoveBuffer {
        id: BufferId,
        delay: f32,
    },
    BindTexture {
        drawable: DrawableId,
        slot: usize,
        texture: TextureId,
    },
    OnOff {
        drawable: DrawableId,
        enabled: bool,
    },
    Fade {
        drawable: DrawableId,
        start: f64,
        end: f64,
    },
    ShaderValue {
        drawable: DrawableId,
        name: String,
        value: f32,
    },
}

impl ChangeRequest {
    /// Resources are created before and destroyed after everything else in a batch.
    fn phase(&self) -> u8 {
        match self {
            Self::AddTexture { .. } | Self::AddBuffer { .. } => 0,
            Self::RemoveTexture { .. } | Self::RemoveBuffer { .. } => 2,
            _ => 1,
        }
    }
}

/// The ordered batch of change requests produced by one loader pass.
#[derive(Deref, DerefMut, Debug, Default)]
pub struct ChangeSet {
    now: f64,
    #[deref]
    requests: Vec<ChangeRequest>,
}

impl ChangeSet {
    /// Creates an empty batch for a pass happening at `now` (in seconds).
    pub fn new(now: f64) -> Self {
        Self {
            now,
            requests: Vec::new(),
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn set_now(&mut self, now: f64) {
        self.now = now;
    }

    /// Fades a drawable out over `fade` seconds before it is removed.
    pub fn fade_out(&mut self, drawable: DrawableId, fade: f32) {
        if fade > 0.0 {
            self.requests.push(ChangeRequest::Fade {
                drawable,
                start: self.now,
                end: self.now + fade as f64,
            });
        }
    }

    /// Removes a standalone drawable, fading it out first if `fade` is positive.
    pub fn remove_drawable(&mut self, id: DrawableId, fade: f32) {
        self.fade_out(id, fade);
        self.requests.push(ChangeRequest::RemoveDrawable {
            id,
            delay: fade.max(0.0),
        });
    }

    /// Takes the recorded requests, leaving an empty batch at the same time.
    pub fn take(&mut self) -> ChangeSet {
        ChangeSet {
            now: self.now,
            requests: mem::take(&mut self.requests),
        }
    }

    /// Consumes the batch in submission order: resource creation first,
    /// resource destruction last, everything else in recording order.
    pub fn into_ordered(mut self) -> Vec<ChangeRequest> {
        self.requests.sort_by_key(ChangeRequest::phase);
        self.requests
    }
}
