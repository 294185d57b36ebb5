//! Joint-related type definitions

use serde::{Deserialize, Serialize};

/// Joint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JointType {
    #[default]
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar,
}

impl JointType {
    /// Check if this joint type has an axis
    pub fn has_axis(&self) -> bool {
        matches!(
            self,
            JointType::Revolute | JointType::Continuous | JointType::Prismatic
        )
    }

    /// Check if this joint type has limits
    pub fn has_limits(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            JointType::Fixed => "Fixed",
            JointType::Revolute => "Revolute",
            JointType::Continuous => "Continuous",
            JointType::Prismatic => "Prismatic",
            JointType::Floating => "Floating",
            JointType::Planar => "Planar",
        }
    }
}

impl From<&urdf_rs::JointType> for JointType {
    fn from(urdf_type: &urdf_rs::JointType) -> Self {
        match urdf_type {
            urdf_rs::JointType::Fixed => JointType::Fixed,
            urdf_rs::JointType::Revolute => JointType::Revolute,
            urdf_rs::JointType::Continuous => JointType::Continuous,
            urdf_rs::JointType::Prismatic => JointType::Prismatic,
            urdf_rs::JointType::Floating => JointType::Floating,
            urdf_rs::JointType::Planar => JointType::Planar,
            urdf_rs::JointType::Spherical => JointType::Floating, // Approximate as floating
        }
    }
}

/// Joint limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    /// Lower position limit (rad or m)
    pub lower: f32,
    /// Upper position limit (rad or m)
    pub upper: f32,
    /// Maximum effort (N or Nm)
    pub effort: f32,
    /// Maximum velocity (rad/s or m/s)
    pub velocity: f32,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            lower: -std::f32::consts::PI,
            upper: std::f32::consts::PI,
            effort: 100.0,
            velocity: 1.0,
        }
    }
}

impl JointLimits {
    /// Create limits with specified range
    pub fn with_range(lower: f32, upper: f32) -> Self {
        Self {
            lower,
            upper,
            ..Self::default()
        }
    }

    /// Clamp a value into the range. An empty or inverted range leaves the value untouched.
    pub fn clamp(&self, value: f32) -> f32 {
        if self.lower < self.upper {
            value.clamp(self.lower, self.upper)
        } else {
            value
        }
    }
}

impl From<&urdf_rs::JointLimit> for JointLimits {
    fn from(limit: &urdf_rs::JointLimit) -> Self {
        Self {
            lower: limit.lower as f32,
            upper: limit.upper as f32,
            effort: limit.effort as f32,
            velocity: limit.velocity as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_joint_type() {
        assert_eq!(
            JointType::from(&urdf_rs::JointType::Fixed),
            JointType::Fixed
        );
        assert_eq!(
            JointType::from(&urdf_rs::JointType::Revolute),
            JointType::Revolute
        );
        assert_eq!(
            JointType::from(&urdf_rs::JointType::Spherical),
            JointType::Floating
        );
    }

    #[test]
    fn test_clamp_respects_range() {
        let limits = JointLimits::with_range(-1.0, 0.5);
        assert_eq!(limits.clamp(2.0), 0.5);
        assert_eq!(limits.clamp(-3.0), -1.0);
        assert_eq!(limits.clamp(0.2), 0.2);
    }

    #[test]
    fn test_clamp_ignores_empty_range() {
        let limits = JointLimits::with_range(0.0, 0.0);
        assert_eq!(limits.clamp(1.7), 1.7);
    }
}
