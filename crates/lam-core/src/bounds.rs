//! Axis-aligned bounding volumes.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
///
/// An empty box has `min = +inf` and `max = -inf`; its size is zero so that
/// callers treat "no geometry yet" the same as a degenerate box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// A box that contains nothing.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered at `center` with the given full extents.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing every point.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |bounds, p| bounds.expanded_by_point(p))
    }

    /// Smallest box containing a flat `[x, y, z, x, y, z, ...]` buffer.
    pub fn from_flat_positions(positions: &[f32]) -> Self {
        Self::from_points(
            positions
                .chunks_exact(3)
                .map(|c| Vec3::new(c[0], c[1], c[2])),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expanded_by_point(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Center point; the origin for an empty box.
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Full extents (width = x, height = y, depth = z); zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// Transform the eight corners and re-fit an axis-aligned box around them.
    pub fn transform(&self, matrix: &Mat4) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }

        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        Self::from_points(corners.iter().map(|c| matrix.transform_point3(*c)))
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Anything that can report a world-space bounding volume for its current pose.
pub trait Boundable {
    fn world_bounds(&self) -> BoundingBox;
}

impl Boundable for BoundingBox {
    fn world_bounds(&self) -> BoundingBox {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box_has_zero_size() {
        let bounds = BoundingBox::EMPTY;
        assert!(bounds.is_empty());
        assert_eq!(bounds.size(), Vec3::ZERO);
        assert_eq!(bounds.center(), Vec3::ZERO);
    }

    #[test]
    fn test_from_flat_positions() {
        let bounds = BoundingBox::from_flat_positions(&[0.0, 0.0, 0.0, 1.0, -2.0, 3.0]);
        assert_eq!(bounds.min, Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 0.0, 3.0));
        assert_eq!(bounds.max_dimension(), 3.0);
    }

    #[test]
    fn test_union_with_empty() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(a.union(&BoundingBox::EMPTY), a);
        assert_eq!(BoundingBox::EMPTY.union(&a), a);
    }

    #[test]
    fn test_transform_translation() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let moved = a.transform(&Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(3.0, 1.0, 1.0));
    }
}
