//! Camera framing: fit a perspective camera around a bounded object.
//!
//! Framing is pure in `(bounds, projection)`. Applying the result to a
//! camera or orbit controls overwrites their state instead of adjusting it,
//! so framing the same box again yields the same pose.

use std::f32::consts::{FRAC_PI_4, FRAC_PI_6};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bounds::{Boundable, BoundingBox};

/// Below this extent on every axis a box is treated as degenerate.
pub const DEGENERATE_EXTENT: f32 = 0.001;
/// Distance of the fallback pose.
pub const DEFAULT_DISTANCE: f32 = 5.0;
/// Direction of the fallback pose, scaled by [`DEFAULT_DISTANCE`].
pub const DEFAULT_DIRECTION: Vec3 = Vec3::new(0.7, 0.5, 0.8);
/// Safety margin on the fitted distance.
pub const DISTANCE_MARGIN: f32 = 1.5;

/// Perspective projection descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Width over height.
    pub aspect: f32,
}

impl Projection {
    pub fn new(fov_degrees: f32, aspect: f32) -> Self {
        Self { fov_degrees, aspect }
    }

    /// Field of view strictly inside `(0, 180)` degrees and a positive finite aspect.
    pub fn is_valid(&self) -> bool {
        self.fov_degrees.is_finite()
            && self.fov_degrees > 0.0
            && self.fov_degrees < 180.0
            && self.aspect.is_finite()
            && self.aspect > 0.0
    }

    fn half_fov_tan(&self) -> f32 {
        (self.fov_degrees.to_radians() / 2.0).tan()
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(45.0, 1.0)
    }
}

/// Shape of a bounding box, by size ratios. First match wins in the order
/// flat, tall, wide, deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeClass {
    Flat,
    Tall,
    Wide,
    Deep,
    Standard,
    /// Degenerate or non-finite box; the fixed fallback pose is used.
    Default,
}

impl ShapeClass {
    pub fn classify(size: Vec3) -> Self {
        if size.y < size.x * 0.3 && size.y < size.z * 0.3 {
            ShapeClass::Flat
        } else if size.y > size.x * 2.0 && size.y > size.z * 2.0 {
            ShapeClass::Tall
        } else if size.x > size.z * 2.0 {
            ShapeClass::Wide
        } else if size.z > size.x * 2.0 {
            ShapeClass::Deep
        } else {
            ShapeClass::Standard
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeClass::Flat => "flat",
            ShapeClass::Tall => "tall",
            ShapeClass::Wide => "wide",
            ShapeClass::Deep => "deep",
            ShapeClass::Standard => "standard",
            ShapeClass::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlanes {
    pub near: f32,
    pub far: f32,
}

/// Allowed orbit distance range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitRange {
    pub min_distance: f32,
    pub max_distance: f32,
}

/// Result of framing a box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Framing {
    pub center: Vec3,
    pub size: Vec3,
    pub distance: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub shape: ShapeClass,
    /// `None` for the fallback pose: the camera keeps its planes.
    pub clip: Option<ClipPlanes>,
    /// `None` for the fallback pose: controls only retarget.
    pub orbit: Option<OrbitRange>,
}

impl Framing {
    /// The fixed pose used for degenerate boxes.
    pub fn fallback() -> Self {
        Self {
            center: Vec3::ZERO,
            size: Vec3::ONE,
            distance: DEFAULT_DISTANCE,
            position: DEFAULT_DIRECTION * DEFAULT_DISTANCE,
            target: Vec3::ZERO,
            shape: ShapeClass::Default,
            clip: None,
            orbit: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.shape == ShapeClass::Default
    }
}

fn is_degenerate(size: Vec3) -> bool {
    !size.is_finite() || size.cmplt(Vec3::splat(DEGENERATE_EXTENT)).all()
}

/// Raise the distance for small objects, tiered by the largest dimension.
fn clamp_distance(distance: f32, max_dim: f32) -> f32 {
    let factor = if max_dim < 0.5 {
        3.0
    } else if max_dim < 2.0 {
        2.5
    } else {
        2.0
    };
    distance.max(max_dim * factor)
}

/// Frame a world-space box.
pub fn frame_bounds(bounds: &BoundingBox, projection: &Projection) -> Framing {
    let center = bounds.center();
    let size = bounds.max - bounds.min;
    if bounds.is_empty() || is_degenerate(size) {
        return Framing::fallback();
    }
    if !projection.is_valid() {
        warn!(?projection, "invalid projection, using default pose");
        return Framing::fallback();
    }

    let max_dim = size.max_element();
    let tan = projection.half_fov_tan();
    let for_height = size.y / (2.0 * tan);
    let for_width = size.x / (2.0 * tan * projection.aspect);
    let for_depth = size.z / (2.0 * tan);
    let fitted = for_height.max(for_width).max(for_depth) * DISTANCE_MARGIN;
    let d = clamp_distance(fitted, max_dim);

    let shape = ShapeClass::classify(size);
    let offset = match shape {
        ShapeClass::Flat => Vec3::new(
            d * FRAC_PI_6.sin() * 0.7,
            d * 0.9,
            d * FRAC_PI_6.cos() * 0.7,
        ),
        ShapeClass::Tall => Vec3::new(d * FRAC_PI_4.cos(), size.y * 0.2, d * FRAC_PI_4.sin()),
        ShapeClass::Wide => Vec3::new(size.x * 0.1, d * 0.5, d * 0.9),
        ShapeClass::Deep => Vec3::new(d * 0.9, d * 0.5, size.z * 0.1),
        ShapeClass::Standard | ShapeClass::Default => {
            let ratio = size / max_dim;
            d * Vec3::new(
                0.7 + ratio.x * 0.2,
                0.6 + ratio.y * 0.4,
                0.8 + ratio.z * 0.2,
            )
        }
    };

    Framing {
        center,
        size,
        distance: d,
        position: center + offset,
        target: center,
        shape,
        clip: Some(ClipPlanes {
            near: d * 0.01,
            far: d * 100.0,
        }),
        orbit: Some(OrbitRange {
            min_distance: d * 0.3,
            max_distance: d * 4.0,
        }),
    }
}

/// Frame anything boundable at its current pose.
pub fn frame_object(object: &impl Boundable, projection: &Projection) -> Framing {
    frame_bounds(&object.world_bounds(), projection)
}

/// Simplified framing for callers without orbit controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickFraming {
    pub center: Vec3,
    pub distance: f32,
    pub position: Vec3,
}

/// Height and width fit only, fixed `(0.7, 0.6, 0.8)` direction.
pub fn quick_position(bounds: &BoundingBox, projection: &Projection) -> QuickFraming {
    let size = bounds.max - bounds.min;
    if bounds.is_empty() || is_degenerate(size) || !projection.is_valid() {
        return QuickFraming {
            center: Vec3::ZERO,
            distance: DEFAULT_DISTANCE,
            position: DEFAULT_DIRECTION * DEFAULT_DISTANCE,
        };
    }

    let center = bounds.center();
    let tan = projection.half_fov_tan();
    let for_height = size.y / (2.0 * tan);
    let for_width = size.x / (2.0 * tan * projection.aspect);
    let distance = clamp_distance(for_height.max(for_width) * DISTANCE_MARGIN, size.max_element());

    QuickFraming {
        center,
        distance,
        position: center + distance * Vec3::new(0.7, 0.6, 0.8),
    }
}

/// Perspective camera state handed to the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            aspect: 1.0,
            near: 0.01,
            far: 1000.0,
            position: Vec3::splat(2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

impl PerspectiveCamera {
    pub fn projection(&self) -> Projection {
        Projection::new(self.fov_degrees, self.aspect)
    }

    pub fn apply_framing(&mut self, framing: &Framing) {
        self.position = framing.position;
        self.target = framing.target;
        if let Some(clip) = framing.clip {
            self.near = clip.near;
            self.far = clip.far;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

/// Orbit-style interactive control state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub damping_factor: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            damping_factor: 0.05,
        }
    }
}

impl OrbitControls {
    pub fn apply_framing(&mut self, framing: &Framing) {
        self.target = framing.target;
        if let Some(range) = framing.orbit {
            self.min_distance = range.min_distance;
            self.max_distance = range.max_distance;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn sized(size: Vec3) -> BoundingBox {
        BoundingBox::from_center_size(Vec3::new(1.0, -2.0, 0.5), size)
    }

    #[test]
    fn test_framing_is_idempotent() {
        let bounds = sized(Vec3::new(0.7, 1.3, 0.9));
        let projection = Projection::new(45.0, 1.6);
        let first = frame_bounds(&bounds, &projection);
        let second = frame_bounds(&bounds, &projection);
        assert_eq!(first, second);

        let mut camera = PerspectiveCamera::default();
        camera.apply_framing(&first);
        let once = camera;
        camera.apply_framing(&second);
        assert_eq!(once, camera);
    }

    #[test]
    fn test_degenerate_boxes_use_default_pose() {
        for center in [Vec3::ZERO, Vec3::new(100.0, -3.0, 7.0)] {
            let bounds = BoundingBox::from_center_size(center, Vec3::splat(0.0005));
            let framing = frame_bounds(&bounds, &Projection::default());
            assert_eq!(framing.shape, ShapeClass::Default);
            assert_eq!(framing.distance, 5.0);
            assert!(framing.position.abs_diff_eq(Vec3::new(3.5, 2.5, 4.0), 1e-6));
            assert_eq!(framing.target, Vec3::ZERO);
            assert!(framing.clip.is_none());
        }

        let empty = frame_bounds(&BoundingBox::EMPTY, &Projection::default());
        assert!(empty.is_fallback());

        let infinite = BoundingBox::new(Vec3::ZERO, Vec3::new(f32::INFINITY, 1.0, 1.0));
        assert!(frame_bounds(&infinite, &Projection::default()).is_fallback());
    }

    #[test]
    fn test_invalid_projection_uses_default_pose() {
        let bounds = sized(Vec3::new(0.7, 1.3, 0.9));
        for projection in [
            Projection::new(0.0, 1.0),
            Projection::new(-30.0, 1.0),
            Projection::new(180.0, 1.0),
            Projection::new(f32::NAN, 1.0),
            Projection::new(45.0, 0.0),
            Projection::new(45.0, -1.0),
            Projection::new(45.0, f32::INFINITY),
        ] {
            assert!(!projection.is_valid(), "{projection:?}");
            let framing = frame_bounds(&bounds, &projection);
            assert!(framing.is_fallback(), "{projection:?}");
            assert!(framing.position.is_finite());

            let quick = quick_position(&bounds, &projection);
            assert_eq!(quick.distance, DEFAULT_DISTANCE);
            assert!(quick.position.is_finite());
        }
        assert!(Projection::default().is_valid());
    }

    #[test]
    fn test_fallback_keeps_camera_clip_planes() {
        let mut camera = PerspectiveCamera::default();
        let mut controls = OrbitControls {
            target: Vec3::ONE,
            ..OrbitControls::default()
        };
        let framing = Framing::fallback();
        camera.apply_framing(&framing);
        controls.apply_framing(&framing);
        assert_eq!(camera.near, 0.01);
        assert_eq!(camera.far, 1000.0);
        assert_eq!(controls.target, Vec3::ZERO);
        assert_eq!(controls.max_distance, f32::INFINITY);
    }

    #[test]
    fn test_wide_object() {
        let bounds = sized(Vec3::new(10.0, 1.0, 1.0));
        let framing = frame_bounds(&bounds, &Projection::new(45.0, 1.0));
        assert_eq!(framing.shape, ShapeClass::Wide);

        let tan = (45.0f32.to_radians() / 2.0).tan();
        // The fitted distance is raised to twice the largest dimension.
        let fitted = 10.0 / (2.0 * tan) * 1.5;
        assert!(fitted < 20.0);
        let expected = 20.0;
        assert_relative_eq!(framing.distance, expected, epsilon = 1e-4);

        let offset = framing.position - framing.center;
        assert_relative_eq!(offset.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(offset.y, expected * 0.5, epsilon = 1e-4);
        assert_relative_eq!(offset.z, expected * 0.9, epsilon = 1e-4);

        let clip = framing.clip.unwrap();
        assert_relative_eq!(clip.near, framing.distance * 0.01);
        assert_relative_eq!(clip.far, framing.distance * 100.0);
        let orbit = framing.orbit.unwrap();
        assert_relative_eq!(orbit.min_distance, framing.distance * 0.3);
        assert_relative_eq!(orbit.max_distance, framing.distance * 4.0);
    }

    #[test]
    fn test_shape_classification_order() {
        assert_eq!(ShapeClass::classify(Vec3::new(1.0, 0.1, 1.0)), ShapeClass::Flat);
        assert_eq!(ShapeClass::classify(Vec3::new(1.0, 3.0, 1.0)), ShapeClass::Tall);
        assert_eq!(ShapeClass::classify(Vec3::new(3.0, 1.0, 1.0)), ShapeClass::Wide);
        assert_eq!(ShapeClass::classify(Vec3::new(1.0, 1.0, 3.0)), ShapeClass::Deep);
        assert_eq!(ShapeClass::classify(Vec3::ONE), ShapeClass::Standard);
        // Wide and flat at once: flat is checked first.
        assert_eq!(ShapeClass::classify(Vec3::new(10.0, 0.1, 1.0)), ShapeClass::Flat);
    }

    #[test]
    fn test_small_objects_clamped() {
        let bounds = sized(Vec3::splat(0.1));
        let framing = frame_bounds(&bounds, &Projection::new(90.0, 1.0));
        assert_relative_eq!(framing.distance, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_camera_outside_box() {
        let sizes = [
            Vec3::new(10.0, 1.0, 1.0),
            Vec3::new(1.0, 10.0, 1.0),
            Vec3::new(1.0, 1.0, 10.0),
            Vec3::new(5.0, 0.2, 5.0),
            Vec3::new(0.01, 0.02, 0.03),
            Vec3::new(3.0, 2.0, 2.5),
            Vec3::new(1.0, 0.0, 1.0),
        ];
        for size in sizes {
            for aspect in [0.5, 1.0, 2.5] {
                let bounds = sized(size);
                let framing = frame_bounds(&bounds, &Projection::new(45.0, aspect));
                assert!(!bounds.contains_point(framing.position), "{size:?} {aspect}");
                assert_eq!(framing.target, bounds.center());
            }
        }
    }

    #[test]
    fn test_quick_position() {
        let bounds = sized(Vec3::new(2.0, 4.0, 1.0));
        let quick = quick_position(&bounds, &Projection::new(45.0, 1.0));
        let tan = (45.0f32.to_radians() / 2.0).tan();
        let fitted = 4.0 / (2.0 * tan) * 1.5;
        assert_relative_eq!(quick.distance, fitted.max(8.0), epsilon = 1e-4);
        assert_eq!(quick.position, quick.center + quick.distance * Vec3::new(0.7, 0.6, 0.8));
    }

    #[test]
    fn test_camera_matrices() {
        let camera = PerspectiveCamera::default();
        let view = camera.view_matrix();
        let origin = view.transform_point3(Vec3::ZERO);
        assert_relative_eq!(origin.z, -Vec3::splat(2.0).length(), epsilon = 1e-5);
        assert!(camera.projection_matrix().is_finite());
    }

    #[test]
    fn test_orbit_range_follows_distance() {
        let mut controls = OrbitControls::default();
        let framing = frame_bounds(&sized(Vec3::ONE), &Projection::default());
        controls.apply_framing(&framing);

        assert_eq!(controls.target, framing.center);
        assert_relative_eq!(controls.min_distance, framing.distance * 0.3);
        assert_relative_eq!(controls.max_distance, framing.distance * 4.0);
    }
}
