//! Joints and the name-indexed joint registry.

use std::collections::BTreeMap;

use glam::Vec3;
use thiserror::Error;
use tracing::trace;

use crate::types::{JointLimits, JointType, Pose};

use super::{ArticulatedGraph, NodeId, NodeKind};

/// Joint actuation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JointError {
    #[error("Joint not found: {0}")]
    NotFound(String),

    #[error("Joint {name} is {joint_type} and has no single actuated value")]
    NotActuated { name: String, joint_type: String },
}

/// A connector between a parent link and its child link.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    /// Transform from parent link to joint frame
    pub origin: Pose,
    /// Unit axis for revolute/prismatic motion
    pub axis: Vec3,
    pub limits: Option<JointLimits>,
    /// Current angle (rad) or offset (m)
    pub value: f32,
}

impl Joint {
    pub fn new(name: impl Into<String>, joint_type: JointType) -> Self {
        Self {
            name: name.into(),
            joint_type,
            origin: Pose::default(),
            axis: Vec3::X,
            limits: None,
            value: 0.0,
        }
    }

    pub fn with_origin(mut self, origin: Pose) -> Self {
        self.origin = origin;
        self
    }

    /// Set the motion axis; a zero axis keeps the default.
    pub fn with_axis(mut self, axis: Vec3) -> Self {
        if let Some(axis) = axis.try_normalize() {
            self.axis = axis;
        }
        self
    }

    pub fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Value actually applied for a request, after limit clamping.
    pub fn resolve_value(&self, requested: f32) -> Result<f32, JointError> {
        if !self.joint_type.has_axis() {
            return Err(JointError::NotActuated {
                name: self.name.clone(),
                joint_type: self.joint_type.display_name().to_string(),
            });
        }
        match self.limits {
            Some(limits) if self.joint_type.has_limits() => Ok(limits.clamp(requested)),
            _ => Ok(requested),
        }
    }
}

/// Names of all non-fixed joints, mapped to their nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointRegistry {
    by_name: BTreeMap<String, NodeId>,
}

impl JointRegistry {
    pub fn extract(graph: &ArticulatedGraph) -> Self {
        let by_name = graph
            .iter()
            .filter_map(|(id, node)| {
                let joint = node.as_joint()?;
                (joint.joint_type != JointType::Fixed).then(|| (joint.name.clone(), id))
            })
            .collect();
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Joint names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl ArticulatedGraph {
    /// Set a registered joint's value and return the value applied.
    ///
    /// Only the joint's local transform changes; calling twice with the same
    /// value leaves the graph as after the first call.
    pub fn set_joint_value(&mut self, name: &str, value: f32) -> Result<f32, JointError> {
        let id = self
            .joints
            .get(name)
            .ok_or_else(|| JointError::NotFound(name.to_string()))?;
        let Some(NodeKind::Joint(joint)) = self.node_mut(id).map(|node| &mut node.kind) else {
            return Err(JointError::NotFound(name.to_string()));
        };
        let applied = joint.resolve_value(value)?;
        joint.value = applied;
        trace!(joint = name, requested = value, applied, "Set joint value");
        Ok(applied)
    }

    pub fn joint_value(&self, name: &str) -> Option<f32> {
        let id = self.joints.get(name)?;
        self.node(id)?.as_joint().map(|joint| joint.value)
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.node(self.joints.get(name)?)?.as_joint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::two_link_graph;

    #[test]
    fn test_registry_skips_fixed() {
        let (mut graph, [_, arm], _) = two_link_graph();
        let wrist = Joint::new("wrist_mount", JointType::Fixed);
        graph.add_joint(arm, wrist).unwrap();

        let registry = graph.extract_joints();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["shoulder"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_joint_value_clamps() {
        let (mut graph, [base, _], _) = two_link_graph();
        let slide = Joint::new("slide", JointType::Prismatic)
            .with_axis(Vec3::Y)
            .with_limits(JointLimits::with_range(0.0, 0.5));
        graph.add_joint(base, slide).unwrap();
        graph.extract_joints();

        assert_eq!(graph.set_joint_value("slide", 2.0), Ok(0.5));
        assert_eq!(graph.set_joint_value("slide", 2.0), Ok(0.5));
        assert_eq!(graph.joint_value("slide"), Some(0.5));

        // No limits: value passes through.
        assert_eq!(graph.set_joint_value("shoulder", 7.0), Ok(7.0));
    }

    #[test]
    fn test_set_joint_value_errors() {
        let (mut graph, [base, _], _) = two_link_graph();
        graph
            .add_joint(base, Joint::new("float", JointType::Floating))
            .unwrap();
        graph.extract_joints();

        assert_eq!(
            graph.set_joint_value("missing", 1.0),
            Err(JointError::NotFound("missing".to_string()))
        );
        assert!(matches!(
            graph.set_joint_value("float", 1.0),
            Err(JointError::NotActuated { .. })
        ));
    }

    #[test]
    fn test_continuous_and_inverted_limits() {
        let spin = Joint::new("spin", JointType::Continuous)
            .with_limits(JointLimits::with_range(-1.0, 1.0));
        assert_eq!(spin.resolve_value(10.0), Ok(10.0));

        let hinge = Joint::new("hinge", JointType::Revolute)
            .with_limits(JointLimits::with_range(0.0, 0.0));
        assert_eq!(hinge.resolve_value(3.0), Ok(3.0));
    }

    #[test]
    fn test_zero_axis_keeps_default() {
        let joint = Joint::new("j", JointType::Revolute).with_axis(Vec3::ZERO);
        assert_eq!(joint.axis, Vec3::X);
        let joint = Joint::new("j", JointType::Revolute).with_axis(Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(joint.axis, Vec3::Z);
    }
}
