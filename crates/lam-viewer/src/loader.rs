//! Hierarchical model loading.
//!
//! Structure now, geometry later: [`ModelLoader::load_structure`] returns a
//! complete, traversable graph whose file meshes are still `Pending`, plus one
//! [`MeshJob`] per slot. [`spawn_mesh_jobs`] resolves them as independent local
//! tasks that write into the graph only while it is still alive.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use std::time::Duration;

use glam::Vec3;
use lam_core::{
    ArticulatedGraph, Drawable, Joint, JointLimits, JointType, MeshFormat, MeshNode, NodeId, Pose,
    box_drawable, cylinder_drawable, parse_obj, sphere_drawable,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{LoadError, MeshResolutionError};
use crate::fetch::ResourceFetcher;

/// A mesh slot waiting for its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshJob {
    pub node: NodeId,
    /// Locator as written in the model description
    pub reference: String,
    /// Locator handed to the fetcher
    pub locator: String,
}

/// Builds articulated graphs from robot descriptions.
pub struct ModelLoader {
    fetcher: Rc<dyn ResourceFetcher>,
    root_timeout: Duration,
}

impl ModelLoader {
    pub fn new(fetcher: Rc<dyn ResourceFetcher>, root_timeout: Duration) -> Self {
        Self {
            fetcher,
            root_timeout,
        }
    }

    /// Fetch and parse the root description under the root timeout.
    pub async fn load_structure(
        &self,
        locator: &str,
    ) -> Result<(ArticulatedGraph, Vec<MeshJob>), LoadError> {
        info!(locator, "Loading model description");
        let text = tokio::time::timeout(self.root_timeout, self.fetcher.fetch_text(locator))
            .await
            .map_err(|_| LoadError::Timeout {
                locator: locator.to_string(),
                after: self.root_timeout,
            })?
            .map_err(|source| LoadError::Fetch {
                locator: locator.to_string(),
                source,
            })?;

        build_graph(locator, &text)
    }
}

/// Parse a URDF document into a graph and its pending mesh jobs.
///
/// The arena is laid out robot -> root links -> joint -> child link, with each
/// link's visuals (and their meshes) directly below it.
pub fn build_graph(
    locator: &str,
    text: &str,
) -> Result<(ArticulatedGraph, Vec<MeshJob>), LoadError> {
    let invalid = |reason: String| LoadError::Invalid {
        locator: locator.to_string(),
        reason,
    };

    let robot = urdf_rs::read_from_string(text).map_err(|e| invalid(e.to_string()))?;
    if robot.links.is_empty() {
        return Err(LoadError::Empty {
            locator: locator.to_string(),
        });
    }

    let links: HashMap<&str, &urdf_rs::Link> =
        robot.links.iter().map(|l| (l.name.as_str(), l)).collect();

    // Joints grouped by parent link, in document order
    let mut children: HashMap<&str, Vec<&urdf_rs::Joint>> = HashMap::new();
    let mut child_links: HashSet<&str> = HashSet::new();
    for joint in &robot.joints {
        for name in [&joint.parent.link, &joint.child.link] {
            if !links.contains_key(name.as_str()) {
                return Err(invalid(format!(
                    "joint {} references unknown link {}",
                    joint.name, name
                )));
            }
        }
        if !child_links.insert(joint.child.link.as_str()) {
            return Err(invalid(format!(
                "link {} has more than one parent joint",
                joint.child.link
            )));
        }
        children
            .entry(joint.parent.link.as_str())
            .or_default()
            .push(joint);
    }

    let mut builder = GraphBuilder {
        graph: ArticulatedGraph::new(robot.name.clone()),
        jobs: Vec::new(),
        links: &links,
        children: &children,
        visited: HashSet::new(),
        root_locator: locator,
    };

    let root = builder.graph.root();
    for link in robot.links.iter().filter(|l| !child_links.contains(l.name.as_str())) {
        builder.add_link_tree(root, link);
    }

    if builder.visited.len() != robot.links.len() {
        return Err(invalid("kinematic loop: some links are unreachable from a root".into()));
    }

    let GraphBuilder { graph, jobs, .. } = builder;
    debug!(
        robot = graph.name(),
        links = robot.links.len(),
        joints = robot.joints.len(),
        meshes = jobs.len(),
        "Built model structure"
    );
    Ok((graph, jobs))
}

struct GraphBuilder<'a> {
    graph: ArticulatedGraph,
    jobs: Vec<MeshJob>,
    links: &'a HashMap<&'a str, &'a urdf_rs::Link>,
    children: &'a HashMap<&'a str, Vec<&'a urdf_rs::Joint>>,
    visited: HashSet<String>,
    root_locator: &'a str,
}

impl GraphBuilder<'_> {
    fn add_link_tree(&mut self, parent: NodeId, link: &urdf_rs::Link) {
        if !self.visited.insert(link.name.clone()) {
            return;
        }
        let Some(link_id) = self.graph.add_link(parent, link.name.clone()) else {
            return;
        };

        for (index, visual) in link.visual.iter().enumerate() {
            self.add_visual(link_id, &link.name, index, visual);
        }

        let joints = self.children.get(link.name.as_str()).cloned().unwrap_or_default();
        for urdf_joint in joints {
            let Some(child) = self.links.get(urdf_joint.child.link.as_str()).copied() else {
                continue;
            };
            let Some(joint_id) = self.graph.add_joint(link_id, convert_joint(urdf_joint)) else {
                continue;
            };
            self.add_link_tree(joint_id, child);
        }
    }

    fn add_visual(
        &mut self,
        link: NodeId,
        link_name: &str,
        index: usize,
        visual: &urdf_rs::Visual,
    ) {
        let name = visual
            .name
            .clone()
            .unwrap_or_else(|| format!("{link_name}_visual_{index}"));
        let origin = Pose::from(&visual.origin);

        let (scale, mesh) = match &visual.geometry {
            urdf_rs::Geometry::Mesh { filename, scale } => {
                let scale = scale
                    .as_ref()
                    .map(|s| Vec3::new(s.0[0] as f32, s.0[1] as f32, s.0[2] as f32))
                    .unwrap_or(Vec3::ONE);
                (scale, MeshSource::File(filename.clone()))
            }
            urdf_rs::Geometry::Box { size } => (
                Vec3::ONE,
                MeshSource::Primitive(box_drawable(
                    &name,
                    [size.0[0] as f32, size.0[1] as f32, size.0[2] as f32],
                )),
            ),
            urdf_rs::Geometry::Cylinder { radius, length }
            // Approximate capsule as cylinder
            | urdf_rs::Geometry::Capsule { radius, length } => (
                Vec3::ONE,
                MeshSource::Primitive(cylinder_drawable(&name, *radius as f32, *length as f32)),
            ),
            urdf_rs::Geometry::Sphere { radius } => (
                Vec3::ONE,
                MeshSource::Primitive(sphere_drawable(&name, *radius as f32)),
            ),
        };

        let Some(visual_id) = self.graph.add_visual(link, name.clone(), origin, scale) else {
            return;
        };

        match mesh {
            MeshSource::Primitive(drawable) => {
                self.graph
                    .add_mesh(visual_id, MeshNode::loaded(name, vec![drawable]));
            }
            MeshSource::File(reference) => {
                let resolved = resolve_mesh_locator(&reference, self.root_locator);
                let Some(node) = self
                    .graph
                    .add_mesh(visual_id, MeshNode::pending(reference.clone()))
                else {
                    return;
                };
                match resolved {
                    Ok(locator) => self.jobs.push(MeshJob {
                        node,
                        reference,
                        locator,
                    }),
                    Err(e) => {
                        warn!(link = link_name, "{e}");
                        self.graph.fail_mesh(node, e.to_string());
                    }
                }
            }
        }
    }
}

enum MeshSource {
    File(String),
    Primitive(Drawable),
}

fn convert_joint(urdf_joint: &urdf_rs::Joint) -> Joint {
    let joint_type = JointType::from(&urdf_joint.joint_type);
    let axis = Vec3::new(
        urdf_joint.axis.xyz.0[0] as f32,
        urdf_joint.axis.xyz.0[1] as f32,
        urdf_joint.axis.xyz.0[2] as f32,
    );

    let mut joint = Joint::new(urdf_joint.name.clone(), joint_type)
        .with_origin(Pose::from(&urdf_joint.origin))
        .with_axis(axis);
    if joint_type.has_limits() {
        joint = joint.with_limits(JointLimits::from(&urdf_joint.limit));
    }
    joint
}

/// Directory part of a locator, including the trailing separator.
fn locator_dir(locator: &str) -> &str {
    match locator.rfind('/') {
        Some(i) => &locator[..=i],
        None => "",
    }
}

/// Map a mesh reference from the description to a fetchable locator.
///
/// `./` and `file://` prefixes are stripped, absolute URLs are kept, and
/// relative paths are joined to the description's directory unless they
/// already start with it. `package://` is not supported.
pub fn resolve_mesh_locator(
    reference: &str,
    root_locator: &str,
) -> Result<String, MeshResolutionError> {
    if reference.starts_with("package://") {
        return Err(MeshResolutionError::UnsupportedUri {
            locator: reference.to_string(),
        });
    }
    if !MeshFormat::from_locator(reference).is_supported() {
        return Err(MeshResolutionError::UnsupportedFormat {
            locator: reference.to_string(),
        });
    }

    let path = reference.strip_prefix("file://").unwrap_or(reference);
    if path.contains("://") || path.starts_with('/') {
        return Ok(path.to_string());
    }

    let path = path.trim_start_matches("./");
    let dir = locator_dir(root_locator).trim_start_matches("./");
    if dir.is_empty() || path.starts_with(dir) {
        Ok(path.to_string())
    } else {
        Ok(format!("{dir}{path}"))
    }
}

/// Fetch and parse one mesh.
pub async fn resolve_mesh(
    fetcher: &dyn ResourceFetcher,
    job: &MeshJob,
) -> Result<Vec<Drawable>, MeshResolutionError> {
    let text = fetcher
        .fetch_text(&job.locator)
        .await
        .map_err(|source| MeshResolutionError::Fetch {
            locator: job.locator.clone(),
            source,
        })?;

    let model = parse_obj(&text).map_err(|source| MeshResolutionError::Parse {
        locator: job.locator.clone(),
        source,
    })?;

    if model.drawables.is_empty() {
        return Err(MeshResolutionError::Empty {
            locator: job.locator.clone(),
        });
    }

    let mut drawables = model.drawables;
    for drawable in drawables.iter_mut().filter(|d| !d.has_normals()) {
        drawable.compute_vertex_normals();
    }
    Ok(drawables)
}

/// Run every job as a local task writing into `graph` through a weak
/// reference. Completions after the graph is dropped are discarded.
pub fn spawn_mesh_jobs(
    graph: &Rc<RefCell<ArticulatedGraph>>,
    jobs: Vec<MeshJob>,
    fetcher: &Rc<dyn ResourceFetcher>,
) -> Vec<JoinHandle<()>> {
    jobs.into_iter()
        .map(|job| {
            let graph: Weak<RefCell<ArticulatedGraph>> = Rc::downgrade(graph);
            let fetcher = Rc::clone(fetcher);
            tokio::task::spawn_local(async move {
                debug!(locator = %job.locator, "Fetching mesh");
                let result = resolve_mesh(fetcher.as_ref(), &job).await;

                let Some(graph) = graph.upgrade() else {
                    debug!(locator = %job.locator, "Mesh arrived after dispose, dropping");
                    return;
                };
                let mut graph = graph.borrow_mut();
                match result {
                    Ok(drawables) => {
                        debug!(locator = %job.locator, drawables = drawables.len(), "Mesh loaded");
                        graph.attach_mesh(job.node, drawables);
                    }
                    Err(e) => {
                        warn!("{e}");
                        graph.fail_mesh(job.node, e.to_string());
                    }
                }
            })
        })
        .collect()
}
