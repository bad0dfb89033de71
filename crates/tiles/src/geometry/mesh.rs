use crate::scene::ProgramId;
use bevy_math::{DVec3, Vec2, Vec3};
use bytemuck::{Pod, Zeroable};
use mosaic_geocoord::QuadAddress;

/// The vertex layout shared by all tile drawables.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    /// Position relative to the mesh origin.
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Sampled elevation, zero unless elevation is included.
    pub elevation: f32,
}

impl TileVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2, elevation: f32) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            elevation,
        }
    }

    pub fn uv(&self) -> Vec2 {
        Vec2::from_array(self.uv)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

impl Topology {
    pub fn indices_per_primitive(self) -> usize {
        match self {
            Topology::Triangles => 3,
            Topology::Lines => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshRole {
    /// The tile surface itself, including pole caps.
    Surface,
    /// The seam hiding curtain along the tile edges.
    Skirt,
}

/// Render state every drawable of a tile is created with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawStyle {
    pub priority: i32,
    pub offset: f32,
    pub color: [u8; 4],
    pub min_visible_height: f32,
    pub max_visible_height: f32,
    pub program: Option<ProgramId>,
}

/// Geometry of a single drawable, handed over to the scene or an atlas by value.
#[derive(Clone, Debug)]
pub struct TileMesh {
    pub address: QuadAddress,
    pub role: MeshRole,
    pub topology: Topology,
    pub vertices: Vec<TileVertex>,
    pub indices: Vec<u32>,
    /// Display space position all vertex positions are relative to.
    pub origin: DVec3,
    /// Display space center of the tile.
    pub center: DVec3,
    /// Radius of a sphere around `center` enclosing the tile.
    pub approx_size: f64,
    pub style: DrawStyle,
}

impl TileMesh {
    pub(crate) fn new(address: QuadAddress, role: MeshRole, topology: Topology, style: DrawStyle) -> Self {
        Self {
            address,
            role,
            topology,
            vertices: Vec::new(),
            indices: Vec::new(),
            origin: DVec3::ZERO,
            center: DVec3::ZERO,
            approx_size: 0.0,
            style,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.indices.len() / self.topology.indices_per_primitive()
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.primitive_count(),
            Topology::Lines => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends a vertex given in display space and returns its index.
    pub(crate) fn push_vertex(&mut self, position: DVec3, normal: DVec3, uv: Vec2, elevation: f32) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(TileVertex::new(
            (position - self.origin).as_vec3(),
            normal.as_vec3(),
            uv,
            elevation,
        ));
        index
    }

    pub(crate) fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend([a, b, c]);
    }

    pub(crate) fn push_line(&mut self, a: u32, b: u32) {
        self.indices.extend([a, b]);
    }

    /// Applies `f` to every texture coordinate.
    pub fn map_uvs(&mut self, mut f: impl FnMut(Vec2) -> Vec2) {
        for vertex in &mut self.vertices {
            vertex.uv = f(vertex.uv()).to_array();
        }
    }
}

/// Everything synthesized for one tile.
#[derive(Clone, Debug)]
pub struct TileGeometry {
    pub mesh: TileMesh,
    pub skirt: Option<TileMesh>,
}
