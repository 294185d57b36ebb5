//! Primitive shapes for URDF `<box>`, `<cylinder>` and `<sphere>` visuals.
//!
//! All shapes are centered at the origin; cylinders run along +Z as URDF requires.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use super::{Drawable, flat_vertex_normals};

const CYLINDER_SEGMENTS: usize = 32;
const SPHERE_RINGS: usize = 16;
const SPHERE_SEGMENTS: usize = 32;

fn push_triangle(positions: &mut Vec<f32>, a: Vec3, b: Vec3, c: Vec3) {
    for v in [a, b, c] {
        positions.extend_from_slice(&[v.x, v.y, v.z]);
    }
}

fn push_quad(positions: &mut Vec<f32>, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
    push_triangle(positions, a, b, c);
    push_triangle(positions, a, c, d);
}

fn finish(name: &str, positions: Vec<f32>) -> Drawable {
    let mut drawable = Drawable::new(name, positions);
    drawable.normals = flat_vertex_normals(&drawable.positions);
    drawable
}

/// Axis-aligned box with full extents `size`.
pub fn box_drawable(name: &str, size: [f32; 3]) -> Drawable {
    let h = Vec3::from(size) * 0.5;
    let corner = |x: f32, y: f32, z: f32| Vec3::new(x * h.x, y * h.y, z * h.z);
    let mut positions = Vec::with_capacity(36 * 3);

    // Counter-clockwise seen from outside: +X, -X, +Y, -Y, +Z, -Z
    const FACES: [[[f32; 3]; 4]; 6] = [
        [[1., -1., -1.], [1., 1., -1.], [1., 1., 1.], [1., -1., 1.]],
        [[-1., -1., 1.], [-1., 1., 1.], [-1., 1., -1.], [-1., -1., -1.]],
        [[-1., 1., -1.], [-1., 1., 1.], [1., 1., 1.], [1., 1., -1.]],
        [[-1., -1., 1.], [-1., -1., -1.], [1., -1., -1.], [1., -1., 1.]],
        [[-1., -1., 1.], [1., -1., 1.], [1., 1., 1.], [-1., 1., 1.]],
        [[1., -1., -1.], [-1., -1., -1.], [-1., 1., -1.], [1., 1., -1.]],
    ];
    for [a, b, c, d] in FACES {
        let [a, b, c, d] = [a, b, c, d].map(|[x, y, z]| corner(x, y, z));
        push_quad(&mut positions, a, b, c, d);
    }

    finish(name, positions)
}

/// Closed cylinder along Z.
pub fn cylinder_drawable(name: &str, radius: f32, length: f32) -> Drawable {
    let half = length * 0.5;
    let ring = |i: usize, z: f32| {
        let angle = TAU * (i % CYLINDER_SEGMENTS) as f32 / CYLINDER_SEGMENTS as f32;
        Vec3::new(radius * angle.cos(), radius * angle.sin(), z)
    };
    let top = Vec3::new(0.0, 0.0, half);
    let bottom = Vec3::new(0.0, 0.0, -half);

    let mut positions = Vec::with_capacity(CYLINDER_SEGMENTS * 12 * 3);
    for i in 0..CYLINDER_SEGMENTS {
        let (b0, b1) = (ring(i, -half), ring(i + 1, -half));
        let (t0, t1) = (ring(i, half), ring(i + 1, half));
        push_quad(&mut positions, b0, b1, t1, t0);
        push_triangle(&mut positions, top, t0, t1);
        push_triangle(&mut positions, bottom, b1, b0);
    }

    finish(name, positions)
}

/// UV sphere.
pub fn sphere_drawable(name: &str, radius: f32) -> Drawable {
    let point = |ring: usize, segment: usize| {
        let theta = PI * ring as f32 / SPHERE_RINGS as f32;
        let phi = TAU * (segment % SPHERE_SEGMENTS) as f32 / SPHERE_SEGMENTS as f32;
        Vec3::new(
            radius * theta.sin() * phi.cos(),
            radius * theta.sin() * phi.sin(),
            radius * theta.cos(),
        )
    };

    let mut positions = Vec::with_capacity(SPHERE_RINGS * SPHERE_SEGMENTS * 6 * 3);
    for ring in 0..SPHERE_RINGS {
        for segment in 0..SPHERE_SEGMENTS {
            let a = point(ring, segment);
            let b = point(ring + 1, segment);
            let c = point(ring + 1, segment + 1);
            let d = point(ring, segment + 1);
            if ring != 0 {
                push_triangle(&mut positions, a, b, d);
            }
            if ring != SPHERE_RINGS - 1 {
                push_triangle(&mut positions, b, c, d);
            }
        }
    }

    finish(name, positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_bounds() {
        let drawable = box_drawable("box", [2.0, 4.0, 6.0]);
        assert_eq!(drawable.triangle_count(), 12);
        let bounds = drawable.local_bounds();
        assert_eq!(bounds.size(), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(bounds.center(), Vec3::ZERO);
    }

    #[test]
    fn test_box_normals_point_outward() {
        let drawable = box_drawable("box", [1.0, 1.0, 1.0]);
        for (p, n) in drawable
            .positions
            .chunks_exact(9)
            .zip(drawable.normals.chunks_exact(9))
        {
            let centroid =
                Vec3::new(p[0] + p[3] + p[6], p[1] + p[4] + p[7], p[2] + p[5] + p[8]) / 3.0;
            assert!(centroid.dot(Vec3::new(n[0], n[1], n[2])) > 0.0);
        }
    }

    #[test]
    fn test_box_one_quad_per_axis() {
        let drawable = box_drawable("box", [1.0, 2.0, 3.0]);
        let normals: Vec<Vec3> = drawable
            .normals
            .chunks_exact(3)
            .map(|n| Vec3::new(n[0], n[1], n[2]))
            .collect();
        for axis in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
            let matching = normals.iter().filter(|n| n.abs_diff_eq(axis, 1e-6)).count();
            assert_eq!(matching, 6, "axis {axis}");
        }
    }

    #[test]
    fn test_cylinder_runs_along_z() {
        let bounds = cylinder_drawable("cyl", 0.5, 3.0).local_bounds();
        assert_relative_eq!(bounds.size().z, 3.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.size().x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_extent() {
        let bounds = sphere_drawable("ball", 2.0).local_bounds();
        assert_relative_eq!(bounds.size().z, 4.0, epsilon = 1e-5);
    }
}
