use crate::geometry::TileMesh;
use bevy_math::{UVec2, Vec2};
use mosaic_geocoord::Surface;

/// Closes the gap between the outermost tile rows and the poles with a
/// triangle fan around a single apex vertex.
///
/// The fan reuses the edge row of the grid, which must be the first
/// `(x + 1) * (y + 1)` vertices of `mesh`. Only the apex gets the degenerate
/// texture coordinate, the shared edge vertices keep their grid coordinates.
pub(crate) fn cover_poles(mesh: &mut TileMesh, surface: &Surface, tessellation: UVec2) {
    let row = tessellation.x + 1;
    let index = |ix: u32, iy: u32| iy * row + ix;

    if mesh.address.is_south_row() {
        let pole = surface.pole(false);
        let apex = mesh.push_vertex(pole, surface.normal(pole), Vec2::new(0.5, 1.0), 0.0);

        for ix in 0..tessellation.x {
            mesh.push_triangle(index(ix, 0), apex, index(ix + 1, 0));
        }
    }

    if mesh.address.is_north_row() {
        let pole = surface.pole(true);
        let apex = mesh.push_vertex(pole, surface.normal(pole), Vec2::new(0.5, 0.0), 0.0);
        let top = tessellation.y;

        for ix in 0..tessellation.x {
            mesh.push_triangle(index(ix + 1, top), apex, index(ix, top));
        }
    }
}
