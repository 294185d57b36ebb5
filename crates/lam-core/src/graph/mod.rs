//! Articulated node graph.
//!
//! An arena tree rooted at a single robot node. Nodes are appended parent
//! first, so a node's index is always greater than its parent's. Mesh slots
//! start out `Pending` and are filled in whenever their geometry arrives; the
//! graph is traversable at any point in between.

mod joints;
mod transforms;

use std::collections::HashMap;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::material::{DisplayMode, DisplayStyle};
use crate::mesh::Drawable;
use crate::types::Pose;

pub use joints::{Joint, JointError, JointRegistry};

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Geometry state of a mesh reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MeshSlot {
    #[default]
    Pending,
    Loaded(Vec<Drawable>),
    Failed(String),
}

/// A mesh reference owned by a link's visual.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub locator: String,
    pub slot: MeshSlot,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshNode {
    pub fn pending(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            slot: MeshSlot::Pending,
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn loaded(locator: impl Into<String>, drawables: Vec<Drawable>) -> Self {
        Self {
            slot: MeshSlot::Loaded(drawables),
            ..Self::pending(locator)
        }
    }

    /// Drawables currently attached, empty unless loaded.
    pub fn drawables(&self) -> &[Drawable] {
        match &self.slot {
            MeshSlot::Loaded(drawables) => drawables,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Robot,
    Link,
    Joint(Joint),
    /// Placement of a link's visual geometry.
    Visual { origin: Pose, scale: Vec3 },
    Mesh(MeshNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_link(&self) -> bool {
        matches!(self.kind, NodeKind::Link)
    }

    pub fn as_joint(&self) -> Option<&Joint> {
        match &self.kind {
            NodeKind::Joint(joint) => Some(joint),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// Color assigned to a link by the colorizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkColor {
    /// Position in the name-sorted link order.
    pub index: usize,
    pub hue: f32,
    pub rgb: [f32; 3],
}

/// The articulated model: structure, geometry slots and per-link side tables.
#[derive(Debug, Clone)]
pub struct ArticulatedGraph {
    nodes: Vec<Node>,
    pub(crate) link_colors: HashMap<NodeId, LinkColor>,
    pub(crate) joints: JointRegistry,
    pub(crate) display_mode: DisplayMode,
    pub(crate) display_style: DisplayStyle,
}

impl ArticulatedGraph {
    /// Create a graph holding only the robot root.
    pub fn new(robot_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                name: robot_name.into(),
                kind: NodeKind::Robot,
                parent: None,
                children: Vec::new(),
            }],
            link_colors: HashMap::new(),
            joints: JointRegistry::default(),
            display_mode: DisplayMode::default(),
            display_style: DisplayStyle::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn name(&self) -> &str {
        &self.nodes[0].name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Append a node under `parent`. Returns `None` if the parent does not exist.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
    ) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    pub fn add_link(&mut self, parent: NodeId, name: impl Into<String>) -> Option<NodeId> {
        self.add_node(parent, name, NodeKind::Link)
    }

    pub fn add_joint(&mut self, parent: NodeId, joint: Joint) -> Option<NodeId> {
        let name = joint.name.clone();
        self.add_node(parent, name, NodeKind::Joint(joint))
    }

    pub fn add_visual(
        &mut self,
        link: NodeId,
        name: impl Into<String>,
        origin: Pose,
        scale: Vec3,
    ) -> Option<NodeId> {
        self.add_node(link, name, NodeKind::Visual { origin, scale })
    }

    pub fn add_mesh(&mut self, visual: NodeId, mesh: MeshNode) -> Option<NodeId> {
        let name = mesh.locator.clone();
        self.add_node(visual, name, NodeKind::Mesh(mesh))
    }

    /// All link nodes in arena order.
    pub fn links(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.is_link())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn find_link(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.is_link() && node.name == name)
            .map(|(id, _)| id)
    }

    /// Walk parents from `id` (inclusive) to the nearest link.
    pub fn find_owning_link(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            if node.is_link() {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }

    /// All mesh nodes in arena order.
    pub fn mesh_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.as_mesh().is_some())
            .map(|(id, _)| id)
            .collect()
    }

    pub(crate) fn mesh_mut(&mut self, id: NodeId) -> Option<&mut MeshNode> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Store arrived geometry in a mesh slot, styling it from the link side
    /// table when colors have already been assigned. Returns false when `id`
    /// is not a mesh node.
    pub fn attach_mesh(&mut self, id: NodeId, drawables: Vec<Drawable>) -> bool {
        let Some(mesh) = self.mesh_mut(id) else {
            return false;
        };
        mesh.slot = MeshSlot::Loaded(drawables);
        if !self.link_colors.is_empty() {
            crate::colorize::style_mesh(self, id);
        }
        true
    }

    /// Mark a mesh slot as failed; the owning link stays geometry-less.
    pub fn fail_mesh(&mut self, id: NodeId, reason: impl Into<String>) -> bool {
        let Some(mesh) = self.mesh_mut(id) else {
            return false;
        };
        mesh.slot = MeshSlot::Failed(reason.into());
        true
    }

    /// Mesh nodes whose slot holds geometry (possibly zero drawables).
    pub fn loaded_mesh_count(&self) -> usize {
        self.iter()
            .filter_map(|(_, node)| node.as_mesh())
            .filter(|mesh| matches!(mesh.slot, MeshSlot::Loaded(_)))
            .count()
    }

    pub fn pending_mesh_count(&self) -> usize {
        self.iter()
            .filter_map(|(_, node)| node.as_mesh())
            .filter(|mesh| mesh.slot == MeshSlot::Pending)
            .count()
    }

    /// `(node, locator, reason)` for every failed mesh.
    pub fn failed_meshes(&self) -> Vec<(NodeId, &str, &str)> {
        self.iter()
            .filter_map(|(id, node)| match node.as_mesh() {
                Some(MeshNode {
                    locator,
                    slot: MeshSlot::Failed(reason),
                    ..
                }) => Some((id, locator.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Whether any mesh owned directly by `link` carries geometry.
    pub fn link_has_geometry(&self, link: NodeId) -> bool {
        self.mesh_nodes().into_iter().any(|id| {
            self.find_owning_link(id) == Some(link)
                && self
                    .node(id)
                    .and_then(Node::as_mesh)
                    .is_some_and(|mesh| !mesh.drawables().is_empty())
        })
    }

    pub fn link_color(&self, link: NodeId) -> Option<LinkColor> {
        self.link_colors.get(&link).copied()
    }

    pub fn link_colors(&self) -> &HashMap<NodeId, LinkColor> {
        &self.link_colors
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn joint_registry(&self) -> &JointRegistry {
        &self.joints
    }

    /// Index every non-fixed joint by name.
    pub fn extract_joints(&mut self) -> &JointRegistry {
        self.joints = JointRegistry::extract(self);
        &self.joints
    }

    /// Set visibility and shadow flags on every mesh node.
    pub fn enable_shadows(&mut self) {
        for node in &mut self.nodes {
            if let NodeKind::Mesh(mesh) = &mut node.kind {
                mesh.visible = true;
                mesh.cast_shadow = true;
                mesh.receive_shadow = true;
            }
        }
    }

    /// Fill flat normals on every loaded mesh drawable that has none.
    pub fn compute_missing_normals(&mut self) {
        for node in &mut self.nodes {
            if let NodeKind::Mesh(MeshNode {
                slot: MeshSlot::Loaded(drawables),
                ..
            }) = &mut node.kind
            {
                for drawable in drawables.iter_mut().filter(|d| !d.has_normals()) {
                    drawable.compute_vertex_normals();
                }
            }
        }
    }
}
