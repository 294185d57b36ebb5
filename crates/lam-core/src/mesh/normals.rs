//! Normal generation for expanded triangle buffers.

use glam::Vec3;

/// Unit normal of a counter-clockwise triangle; `+Z` for degenerate input.
pub fn calculate_triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Z)
}

/// One face normal per triangle, repeated for each of its three vertices.
///
/// A trailing partial triangle gets `+Z` normals so the buffer stays aligned.
pub fn flat_vertex_normals(positions: &[f32]) -> Vec<f32> {
    let vertices: Vec<Vec3> = positions
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect();

    let mut normals = Vec::with_capacity(vertices.len() * 3);
    for tri in vertices.chunks(3) {
        let n = match tri {
            [a, b, c] => calculate_triangle_normal(*a, *b, *c),
            _ => Vec3::Z,
        };
        for _ in tri {
            normals.extend_from_slice(&[n.x, n.y, n.z]);
        }
    }
    normals
}
