//! World transform and bounding volume calculations for the graph

use glam::{Mat4, Quat, Vec3};

use crate::bounds::{Boundable, BoundingBox};
use crate::types::JointType;

use super::{ArticulatedGraph, NodeId, NodeKind};

impl ArticulatedGraph {
    /// Transform of a node relative to its parent.
    pub fn local_transform(&self, id: NodeId) -> Mat4 {
        match self.node(id).map(|node| &node.kind) {
            Some(NodeKind::Joint(joint)) => {
                joint.origin.to_mat4()
                    * Self::compute_joint_transform(&joint.joint_type, joint.axis, joint.value)
            }
            Some(NodeKind::Visual { origin, scale }) => {
                origin.to_mat4() * Mat4::from_scale(*scale)
            }
            _ => Mat4::IDENTITY,
        }
    }

    /// Get the world transform of a node
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        // Build transform chain from node to root
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            chain.push(node_id);
            current = self.node(node_id).and_then(|node| node.parent);
        }

        // Apply transforms from root to node
        chain
            .into_iter()
            .rev()
            .fold(Mat4::IDENTITY, |acc, node_id| acc * self.local_transform(node_id))
    }

    /// World transforms of every node, indexed by arena position.
    pub fn world_transforms(&self) -> Vec<Mat4> {
        let mut transforms: Vec<Mat4> = Vec::with_capacity(self.len());
        for (id, node) in self.iter() {
            let parent = node
                .parent
                .map(|parent| transforms[parent.0])
                .unwrap_or(Mat4::IDENTITY);
            transforms.push(parent * self.local_transform(id));
        }
        transforms
    }

    /// Compute the transform for a joint at a given position
    pub fn compute_joint_transform(joint_type: &JointType, axis: Vec3, position: f32) -> Mat4 {
        match joint_type {
            JointType::Revolute | JointType::Continuous => {
                Mat4::from_quat(Quat::from_axis_angle(axis, position))
            }
            JointType::Prismatic => Mat4::from_translation(axis * position),
            // Floating/planar would need more DOFs
            JointType::Fixed | JointType::Floating | JointType::Planar => Mat4::IDENTITY,
        }
    }

    /// World-space bounds of the loaded geometry below `id` (inclusive).
    pub fn subtree_bounds(&self, id: NodeId) -> BoundingBox {
        let transforms = self.world_transforms();
        self.iter()
            .filter(|(node_id, _)| self.is_descendant(*node_id, id))
            .filter_map(|(node_id, node)| node.as_mesh().map(|mesh| (node_id, mesh)))
            .flat_map(|(node_id, mesh)| {
                let world = transforms[node_id.0];
                mesh.drawables()
                    .iter()
                    .map(move |drawable| drawable.local_bounds().transform(&world))
            })
            .fold(BoundingBox::EMPTY, |acc, b| acc.union(&b))
    }

    fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.node(node_id).and_then(|node| node.parent);
        }
        false
    }
}

impl Boundable for ArticulatedGraph {
    /// Recomputed from the current pose on every call.
    fn world_bounds(&self) -> BoundingBox {
        self.subtree_bounds(self.root())
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;
    use crate::graph::MeshNode;
    use crate::graph::tests::two_link_graph;
    use crate::mesh::box_drawable;
    use crate::types::Pose;

    #[test]
    fn test_joint_transform_kinds() {
        let rot =
            ArticulatedGraph::compute_joint_transform(&JointType::Revolute, Vec3::Z, FRAC_PI_2);
        let p = rot.transform_point3(Vec3::X);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-6);

        let slide =
            ArticulatedGraph::compute_joint_transform(&JointType::Prismatic, Vec3::Y, 0.25);
        assert_eq!(slide.transform_point3(Vec3::ZERO), Vec3::new(0.0, 0.25, 0.0));

        let fixed = ArticulatedGraph::compute_joint_transform(&JointType::Fixed, Vec3::Z, 1.0);
        assert_eq!(fixed, Mat4::IDENTITY);
    }

    #[test]
    fn test_world_transform_matches_batch() {
        let (graph, _, [_, arm_mesh]) = two_link_graph();
        let batch = graph.world_transforms();
        let single = graph.world_transform(arm_mesh);
        assert!(batch[arm_mesh.0].abs_diff_eq(single, 1e-6));
        assert_eq!(single.transform_point3(Vec3::ZERO), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_bounds_follow_pose() {
        let (mut graph, [_, arm], [base_mesh, arm_mesh]) = two_link_graph();
        assert!(graph.world_bounds().is_empty());

        graph.attach_mesh(base_mesh, vec![box_drawable("base", [1.0, 1.0, 1.0])]);
        let offset = graph
            .add_visual(arm, "offset", Pose::from_position([1.0, 0.0, 0.0]), Vec3::ONE)
            .unwrap();
        let tip = MeshNode::loaded("tip", vec![box_drawable("tip", [0.2; 3])]);
        graph.add_mesh(offset, tip).unwrap();
        graph.attach_mesh(arm_mesh, Vec::new());
        graph.extract_joints();

        let before = graph.world_bounds();
        assert_relative_eq!(before.max.x, 1.1, epsilon = 1e-5);

        // Rotating the shoulder swings the tip onto +Y.
        graph.set_joint_value("shoulder", FRAC_PI_2).unwrap();
        let after = graph.world_bounds();
        assert_relative_eq!(after.max.y, 1.1, epsilon = 1e-5);
        assert_relative_eq!(after.max.x, 0.5, epsilon = 1e-5);

        let arm_only = graph.subtree_bounds(arm);
        assert_relative_eq!(arm_only.min.y, 0.9, epsilon = 1e-5);
    }

    #[test]
    fn test_visual_scale() {
        let (mut graph, [base, _], _) = two_link_graph();
        let scaled = graph
            .add_visual(base, "scaled", Pose::default(), Vec3::splat(2.0))
            .unwrap();
        let cube = MeshNode::loaded("cube", vec![box_drawable("cube", [1.0; 3])]);
        let mesh = graph.add_mesh(scaled, cube).unwrap();
        let bounds = graph.subtree_bounds(mesh);
        assert_relative_eq!(bounds.max_dimension(), 2.0, epsilon = 1e-6);
    }
}
