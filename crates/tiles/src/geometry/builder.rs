use crate::{
    config::TileBuilderConfig,
    geometry::{
        DrawStyle, MeshRole, TileGeometry, TileMesh, Topology, pole_cap::cover_poles,
        skirt::build_skirt,
    },
};
use bevy_math::{DVec2, DVec3, UVec2, Vec2};
use itertools::iproduct;
use mosaic_geocoord::{LocalBounds, QuadAddress, Surface};

/// Provides elevation for flat surfaces.
pub trait ElevationSource: Send + Sync {
    /// Samples the elevation data loaded for `source`, which covers
    /// `source_bounds`, at `point`.
    fn elevation(&self, source: QuadAddress, source_bounds: &LocalBounds, point: DVec2) -> Option<f64>;
}

/// Parameters of a single mesh synthesis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthesisRequest {
    pub address: QuadAddress,
    pub bounds: LocalBounds,
    /// Elevation is sampled from the parent's data when present, as the data of
    /// a placeholder's own address is not loaded yet.
    pub parent: Option<(QuadAddress, LocalBounds)>,
    pub tessellation: UVec2,
    pub tex_scale: Vec2,
    pub tex_offset: Vec2,
    pub line_mode: bool,
}

/// One grid vertex in display space.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GridSample {
    pub(crate) position: DVec3,
    pub(crate) normal: DVec3,
    pub(crate) uv: Vec2,
    pub(crate) elevation: f32,
}

/// Builds tile geometry according to a [`TileBuilderConfig`].
pub struct TileBuilder {
    config: TileBuilderConfig,
    elevation: Option<Box<dyn ElevationSource>>,
}

impl TileBuilder {
    pub fn new(config: TileBuilderConfig) -> Self {
        Self {
            config,
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, source: impl ElevationSource + 'static) -> Self {
        self.elevation = Some(Box::new(source));
        self
    }

    pub fn config(&self) -> &TileBuilderConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.config.surface
    }

    /// The local bounds of `address`, clamped to the clip extents.
    ///
    /// Returns `None` for tiles without any overlap, which are skipped.
    pub fn tile_bounds(&self, address: QuadAddress) -> Option<LocalBounds> {
        if !address.is_valid() {
            return None;
        }

        let cell = self.config.extents.tile(address);
        let bounds = match &self.config.clip_extents {
            Some(clip) => cell.intersection(clip),
            None => cell,
        };

        bounds.is_valid().then_some(bounds)
    }

    /// The grid resolution used for `address`.
    pub fn tessellation(&self, address: QuadAddress) -> UVec2 {
        if self.config.single_level || address.level > self.config.max_tessellated_level {
            UVec2::ONE
        } else {
            self.config.tessellation.max(UVec2::ONE)
        }
    }

    /// How far skirt vertices are pulled towards the surface center.
    pub fn skirt_factor(level: u32) -> f64 {
        1.0 - 0.2 / (level as f64).exp2()
    }

    pub fn style(&self) -> DrawStyle {
        DrawStyle {
            priority: self.config.draw_priority,
            offset: self.config.draw_offset,
            color: self.config.color,
            min_visible_height: self.config.min_visible_height,
            max_visible_height: self.config.max_visible_height,
            program: self.config.program,
        }
    }

    /// Builds the geometry of `address`, sampling the texture region selected by
    /// `tex_scale` and `tex_offset`.
    ///
    /// Returns `None` if the tile does not overlap the clip extents.
    pub fn build_tile(
        &self,
        address: QuadAddress,
        parent: Option<QuadAddress>,
        tex_scale: Vec2,
        tex_offset: Vec2,
        line_mode: bool,
    ) -> Option<TileGeometry> {
        let bounds = self.tile_bounds(address)?;
        let parent = parent.and_then(|parent| Some((parent, self.tile_bounds(parent)?)));

        Some(self.synthesize(&SynthesisRequest {
            address,
            bounds,
            parent,
            tessellation: self.tessellation(address),
            tex_scale,
            tex_offset,
            line_mode: line_mode || self.config.line_mode,
        }))
    }

    pub fn synthesize(&self, request: &SynthesisRequest) -> TileGeometry {
        let tessellation = request.tessellation.max(UVec2::ONE);
        let surface = &self.config.surface;
        let topology = if request.line_mode {
            Topology::Lines
        } else {
            Topology::Triangles
        };

        let mut mesh = TileMesh::new(request.address, MeshRole::Surface, topology, self.style());
        mesh.center = surface.local_to_display(request.bounds.center(), 0.0);
        if self.config.use_tile_centers {
            mesh.origin = mesh.center;
        }

        let grid = self.sample_grid(request, tessellation);

        for sample in &grid {
            mesh.push_vertex(sample.position, sample.normal, sample.uv, sample.elevation);
        }

        mesh.approx_size = grid
            .iter()
            .map(|sample| sample.position.distance(mesh.center))
            .fold(0.0, f64::max);

        let row = tessellation.x + 1;
        let index = |ix: u32, iy: u32| iy * row + ix;

        for (iy, ix) in iproduct!(0..tessellation.y, 0..tessellation.x) {
            match topology {
                Topology::Triangles => {
                    mesh.push_triangle(index(ix, iy + 1), index(ix, iy), index(ix + 1, iy + 1));
                    mesh.push_triangle(index(ix + 1, iy + 1), index(ix, iy), index(ix + 1, iy));
                }
                Topology::Lines => {
                    mesh.push_line(index(ix, iy), index(ix + 1, iy));
                    mesh.push_line(index(ix, iy), index(ix, iy + 1));
                }
            }
        }

        if surface.is_curved() && self.config.cover_poles && topology == Topology::Triangles {
            cover_poles(&mut mesh, surface, tessellation);
        }

        let skirt = (surface.is_curved() && !self.config.ignore_edge_matching).then(|| {
            build_skirt(
                &mesh,
                &grid,
                tessellation,
                surface.center(),
                Self::skirt_factor(request.address.level),
            )
        });

        TileGeometry { mesh, skirt }
    }

    fn sample_grid(&self, request: &SynthesisRequest, tessellation: UVec2) -> Vec<GridSample> {
        let surface = &self.config.surface;
        let elevation_source = if !surface.is_curved() && self.config.include_elevation {
            self.elevation.as_deref()
        } else {
            None
        };
        let (source, source_bounds) = request.parent.unwrap_or((request.address, request.bounds));
        let steps = tessellation.as_vec2();

        iproduct!(0..=tessellation.y, 0..=tessellation.x)
            .map(|(iy, ix)| {
                let unit = DVec2::new(ix as f64, iy as f64) / steps.as_dvec2();
                let local = request.bounds.lerp(unit);

                let elevation = elevation_source
                    .and_then(|source_data| source_data.elevation(source, &source_bounds, local))
                    .unwrap_or(0.0);
                let height = if self.config.use_elevation_as_z {
                    elevation
                } else {
                    0.0
                };

                let position = surface.local_to_display(local, height);
                let uv = Vec2::new(
                    ix as f32 * request.tex_scale.x / steps.x + request.tex_offset.x,
                    1.0 - (iy as f32 * request.tex_scale.y / steps.y + request.tex_offset.y),
                );

                GridSample {
                    position,
                    normal: surface.normal(position),
                    uv,
                    elevation: elevation as f32,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Vec3;
    use mosaic_geocoord::{Projection, SurfaceShape};
    use std::sync::{Arc, Mutex};

    fn sphere_builder(configure: impl FnOnce(&mut TileBuilderConfig)) -> TileBuilder {
        let mut config = TileBuilderConfig::for_surface(Surface::new(
            SurfaceShape::UNIT_SPHERE,
            Projection::PlateCarree,
        ));
        configure(&mut config);
        TileBuilder::new(config)
    }

    fn plane_builder(configure: impl FnOnce(&mut TileBuilderConfig)) -> TileBuilder {
        let mut config = TileBuilderConfig::for_surface(Surface::plane(100.0));
        configure(&mut config);
        TileBuilder::new(config)
    }

    fn full_tile(builder: &TileBuilder, address: QuadAddress) -> TileGeometry {
        builder
            .build_tile(address, None, Vec2::ONE, Vec2::ZERO, false)
            .unwrap()
    }

    fn address(level: u32, x: u32, y: u32) -> QuadAddress {
        QuadAddress::new(level, x, y).unwrap()
    }

    fn world_position(mesh: &TileMesh, index: u32) -> DVec3 {
        mesh.origin + Vec3::from_array(mesh.vertices[index as usize].position).as_dvec3()
    }

    #[test]
    fn root_tile_on_sphere_covers_both_poles() {
        let builder = sphere_builder(|_| {});
        let geometry = full_tile(&builder, QuadAddress::ROOT);

        assert_eq!(geometry.mesh.vertex_count(), 121 + 2);
        assert_eq!(geometry.mesh.triangle_count(), 200 + 2 * 10);
    }

    #[test]
    fn pole_caps_only_on_outer_rows() {
        let builder = sphere_builder(|_| {});

        let south = full_tile(&builder, address(2, 1, 0)).mesh;
        let north = full_tile(&builder, address(2, 1, 3)).mesh;
        let middle = full_tile(&builder, address(2, 1, 1)).mesh;

        assert_eq!(south.triangle_count(), 200 + 10);
        assert_eq!(north.triangle_count(), 200 + 10);
        assert_eq!(middle.triangle_count(), 200);
        assert_eq!(middle.vertex_count(), 121);

        let apex = world_position(&south, 121);
        assert!((apex - DVec3::NEG_Z).length() < 1e-6);
        assert_eq!(south.vertices[121].uv, [0.5, 1.0]);
        assert_eq!(north.vertices[121].uv, [0.5, 0.0]);

        // the fan shares the edge row, which keeps its grid coordinates
        assert_eq!(south.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(south.vertices[10].uv, [1.0, 1.0]);
    }

    #[test]
    fn pole_caps_can_be_disabled() {
        let builder = sphere_builder(|config| config.cover_poles = false);
        let mesh = full_tile(&builder, QuadAddress::ROOT).mesh;

        assert_eq!(mesh.vertex_count(), 121);
        assert_eq!(mesh.triangle_count(), 200);
    }

    #[test]
    fn skirts_have_one_quad_per_edge_sample() {
        let builder = sphere_builder(|config| config.tessellation = UVec2::new(6, 4));
        let skirt = full_tile(&builder, address(3, 2, 2)).skirt.unwrap();

        assert_eq!(skirt.role, MeshRole::Skirt);
        assert_eq!(skirt.triangle_count(), 2 * (2 * 6 + 2 * 4));
        assert_eq!(skirt.vertex_count(), 2 * (2 * 7 + 2 * 5));
    }

    #[test]
    fn skirt_outer_vertices_are_pulled_towards_center() {
        let builder = sphere_builder(|_| {});
        let skirt = full_tile(&builder, address(2, 1, 1)).skirt.unwrap();
        let factor = TileBuilder::skirt_factor(2);

        assert!((factor - 0.95).abs() < 1e-12);
        assert!((world_position(&skirt, 0).length() - 1.0).abs() < 1e-6);
        assert!((world_position(&skirt, 1).length() - factor).abs() < 1e-6);
    }

    #[test]
    fn skirts_need_curvature_and_edge_matching() {
        assert!(full_tile(&plane_builder(|_| {}), QuadAddress::ROOT).skirt.is_none());

        let ignoring = sphere_builder(|config| config.ignore_edge_matching = true);
        assert!(full_tile(&ignoring, QuadAddress::ROOT).skirt.is_none());
    }

    #[test]
    fn flat_surfaces_have_no_pole_caps() {
        let mesh = full_tile(&plane_builder(|_| {}), QuadAddress::ROOT).mesh;

        assert_eq!(mesh.vertex_count(), 121);
        assert_eq!(mesh.triangle_count(), 200);
        assert!(mesh.vertices.iter().all(|vertex| vertex.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn deep_or_single_level_tiles_collapse_to_one_quad() {
        let deep = full_tile(&sphere_builder(|_| {}), address(18, 5, 7)).mesh;
        assert_eq!(deep.vertex_count(), 4);
        assert_eq!(deep.triangle_count(), 2);

        let at_threshold = full_tile(&sphere_builder(|_| {}), address(17, 5, 7)).mesh;
        assert_eq!(at_threshold.vertex_count(), 121);

        let single = full_tile(&plane_builder(|config| config.single_level = true), address(1, 0, 1)).mesh;
        assert_eq!(single.vertex_count(), 4);
        assert_eq!(single.triangle_count(), 2);
    }

    #[test]
    fn grid_triangles_face_outwards() {
        let builder = sphere_builder(|_| {});
        let mesh = full_tile(&builder, QuadAddress::ROOT).mesh;

        for triangle in mesh.indices.chunks(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| world_position(&mesh, i));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;

            if face_normal.length() > 1e-9 {
                assert!(face_normal.dot(centroid) > 0.0);
            }
        }
    }

    #[test]
    fn texture_coordinates_follow_scale_and_offset() {
        let builder = plane_builder(|config| config.tessellation = UVec2::new(2, 2));
        let full = full_tile(&builder, QuadAddress::ROOT).mesh;

        assert_eq!(full.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(full.vertices[8].uv, [1.0, 0.0]);

        let quarter = builder
            .build_tile(address(1, 1, 0), Some(QuadAddress::ROOT), Vec2::splat(0.5), Vec2::new(0.5, 0.0), false)
            .unwrap()
            .mesh;

        assert_eq!(quarter.vertices[0].uv, [0.5, 1.0]);
        assert_eq!(quarter.vertices[1].uv, [0.75, 1.0]);
        assert_eq!(quarter.vertices[8].uv, [1.0, 0.5]);
    }

    #[test]
    fn line_mode_emits_two_segments_per_cell() {
        let builder = sphere_builder(|config| config.line_mode = true);
        let mesh = full_tile(&builder, QuadAddress::ROOT).mesh;

        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.primitive_count(), 2 * 10 * 10);
        assert_eq!(mesh.vertex_count(), 121);
    }

    #[test]
    fn bounds_are_clamped_to_clip_extents() {
        let builder = plane_builder(|config| {
            config.clip_extents = Some(LocalBounds::new(DVec2::new(-1.0, -1.0), DVec2::new(0.5, 0.5)));
        });

        let clamped = builder.tile_bounds(address(1, 1, 1)).unwrap();
        assert_eq!(clamped.min, DVec2::ZERO);
        assert_eq!(clamped.max, DVec2::splat(0.5));

        assert!(builder.tile_bounds(address(2, 3, 3)).is_none());
        assert!(builder.build_tile(address(2, 3, 3), None, Vec2::ONE, Vec2::ZERO, false).is_none());
        assert!(builder.tile_bounds(QuadAddress { level: 1, x: 2, y: 0 }).is_none());
    }

    #[test]
    fn tile_centers_keep_positions_relative() {
        let builder = sphere_builder(|config| config.use_tile_centers = true);
        let mesh = full_tile(&builder, address(4, 3, 9)).mesh;

        assert_eq!(mesh.origin, mesh.center);
        assert!((world_position(&mesh, 0).length() - 1.0).abs() < 1e-5);
        assert!(mesh.vertices.iter().all(|vertex| Vec3::from_array(vertex.position).length() < 0.5));
    }

    struct Recorded {
        sources: Arc<Mutex<Vec<QuadAddress>>>,
    }

    impl ElevationSource for Recorded {
        fn elevation(&self, source: QuadAddress, _: &LocalBounds, _: DVec2) -> Option<f64> {
            self.sources.lock().unwrap().push(source);
            Some(5.0)
        }
    }

    #[test]
    fn flat_elevation_is_sampled_from_the_data_owner() {
        let sources = Arc::new(Mutex::new(Vec::new()));
        let builder = plane_builder(|config| {
            config.include_elevation = true;
            config.use_elevation_as_z = true;
            config.tessellation = UVec2::ONE;
        })
        .with_elevation(Recorded {
            sources: sources.clone(),
        });

        let own = full_tile(&builder, address(1, 0, 0)).mesh;
        assert!(own.vertices.iter().all(|vertex| vertex.position[2] == 5.0 && vertex.elevation == 5.0));

        builder
            .build_tile(address(1, 0, 0), Some(QuadAddress::ROOT), Vec2::splat(0.5), Vec2::ZERO, false)
            .unwrap();

        let sources = sources.lock().unwrap();
        assert_eq!(&sources[..4], &[address(1, 0, 0); 4]);
        assert_eq!(&sources[4..], &[QuadAddress::ROOT; 4]);
    }
}
