use crate::{error::TileResult, scene::ProgramId, texture::ImageResizePolicy};
use bevy_log::info;
use bevy_math::UVec2;
use bevy_utils::default;
use mosaic_geocoord::{LocalBounds, Surface};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Levels deeper than this are never tessellated beyond a single quad.
pub const MAX_TESSELLATED_LEVEL: u32 = 17;

/// Configures how the [`TileBuilder`](crate::geometry::TileBuilder) turns quadtree
/// addresses into geometry and how the resulting drawables are styled.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TileBuilderConfig {
    pub surface: Surface,
    /// The region of local space tiled by the quadtree.
    pub extents: LocalBounds,
    /// The region of local space that holds valid data. Tile bounds are clamped to it.
    pub clip_extents: Option<LocalBounds>,
    /// The grid resolution of a tile along x and y.
    pub tessellation: UVec2,
    /// Tiles deeper than this level collapse to a single quad.
    pub max_tessellated_level: u32,
    /// The number of animation frames stored per tile.
    pub image_depth: u32,
    /// Texels of padding added around each image inside the atlas.
    pub border_texels: u32,
    pub draw_priority: i32,
    pub draw_offset: f32,
    /// The flat color the tile texture is modulated with.
    pub color: [u8; 4],
    pub min_visible_height: f32,
    pub max_visible_height: f32,
    pub program: Option<ProgramId>,
    pub include_elevation: bool,
    pub use_elevation_as_z: bool,
    pub ignore_edge_matching: bool,
    pub cover_poles: bool,
    pub line_mode: bool,
    pub single_level: bool,
    pub use_tile_centers: bool,
    pub resize_policy: ImageResizePolicy,
    /// Seconds drawables take to fade out before they are removed.
    pub fade: f32,
}

impl Default for TileBuilderConfig {
    fn default() -> Self {
        let surface = Surface::default();

        Self {
            extents: surface.extents(),
            surface,
            clip_extents: None,
            tessellation: UVec2::new(10, 10),
            max_tessellated_level: MAX_TESSELLATED_LEVEL,
            image_depth: 1,
            border_texels: 0,
            draw_priority: 0,
            draw_offset: 0.0,
            color: [255; 4],
            min_visible_height: 0.0,
            max_visible_height: f32::MAX,
            program: None,
            include_elevation: false,
            use_elevation_as_z: false,
            ignore_edge_matching: false,
            cover_poles: true,
            line_mode: false,
            single_level: false,
            use_tile_centers: false,
            resize_policy: default(),
            fade: 0.0,
        }
    }
}

impl TileBuilderConfig {
    /// A config tiling `surface` over its whole local extents.
    pub fn for_surface(surface: Surface) -> Self {
        Self {
            surface,
            extents: surface.extents(),
            ..default()
        }
    }

    /// The number of texture slots each drawable binds.
    pub fn texture_slots(&self) -> usize {
        if self.image_depth > 1 { 2 } else { 1 }
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> TileResult<Self> {
        let encoded = fs::read_to_string(&path)?;
        let config = ron::from_str(&encoded)?;

        info!("Loaded tile builder config from {:?}", path.as_ref());
        Ok(config)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> TileResult<()> {
        let encoded = ron::ser::to_string_pretty(self, default())?;
        Ok(fs::write(path, encoded)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_geocoord::SurfaceShape;

    #[test]
    fn partial_configs_fall_back_to_defaults() {
        let config: TileBuilderConfig =
            ron::from_str("(tessellation: (4, 6), cover_poles: false, image_depth: 3)").unwrap();

        assert_eq!(config.tessellation, UVec2::new(4, 6));
        assert!(!config.cover_poles);
        assert_eq!(config.texture_slots(), 2);
        assert_eq!(config.max_tessellated_level, MAX_TESSELLATED_LEVEL);
        assert_eq!(config.extents, Surface::default().extents());
    }

    #[test]
    fn saves_and_loads_files() {
        let path = std::env::temp_dir().join(format!("mosaic_config_{}.ron", std::process::id()));
        let config = TileBuilderConfig::for_surface(Surface::plane(4.0));

        config.save_file(&path).unwrap();
        let loaded = TileBuilderConfig::load_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.surface.shape, SurfaceShape::Plane { scale: 4.0 });
        assert_eq!(loaded.extents, config.extents);
    }
}
