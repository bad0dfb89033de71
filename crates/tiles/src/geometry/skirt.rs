use crate::geometry::{GridSample, MeshRole, TileMesh, Topology};
use bevy_math::{DVec3, UVec2};

/// Builds the skirt hanging from the four edges of a tile.
///
/// Edges are walked counter clockwise when seen from outside, so every skirt
/// quad faces away from the tile. The inner vertex of each quad is the edge
/// vertex itself, the outer one is pulled towards `center` by `factor`.
pub(crate) fn build_skirt(
    surface_mesh: &TileMesh,
    grid: &[GridSample],
    tessellation: UVec2,
    center: DVec3,
    factor: f64,
) -> TileMesh {
    let (tx, ty) = (tessellation.x, tessellation.y);
    let index = |ix: u32, iy: u32| (iy * (tx + 1) + ix) as usize;

    let edges: [Vec<usize>; 4] = [
        (0..=tx).map(|ix| index(ix, 0)).collect(),
        (0..=ty).map(|iy| index(tx, iy)).collect(),
        (0..=tx).rev().map(|ix| index(ix, ty)).collect(),
        (0..=ty).rev().map(|iy| index(0, iy)).collect(),
    ];

    let mut skirt = TileMesh::new(
        surface_mesh.address,
        MeshRole::Skirt,
        Topology::Triangles,
        surface_mesh.style,
    );
    skirt.origin = surface_mesh.origin;
    skirt.center = surface_mesh.center;
    skirt.approx_size = surface_mesh.approx_size;

    for edge in &edges {
        let start = skirt.vertices.len() as u32;

        for &sample_index in edge {
            let GridSample {
                position,
                normal,
                uv,
                elevation,
            } = grid[sample_index];

            skirt.push_vertex(position, normal, uv, elevation);
            skirt.push_vertex(center + (position - center) * factor, normal, uv, elevation);
        }

        for quad in 0..edge.len() as u32 - 1 {
            let inner = start + 2 * quad;
            let outer = inner + 1;
            let (next_inner, next_outer) = (inner + 2, inner + 3);

            skirt.push_triangle(inner, outer, next_inner);
            skirt.push_triangle(next_inner, outer, next_outer);
        }
    }

    skirt
}
