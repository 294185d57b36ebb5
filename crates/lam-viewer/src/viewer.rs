//! Viewer lifecycle: load, finalize, frame, interact, dispose.

use std::cell::RefCell;
use std::rc::Rc;

use lam_core::{
    ArticulatedGraph, Boundable, BoundingBox, DisplayMode, Framing, JointError, MeshNode,
    OrbitControls, PerspectiveCamera, Pose, apply_link_materials, assign_link_colors,
    frame_object, parse_obj, set_display_mode,
};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::config::ViewerConfig;
use crate::error::LoadError;
use crate::fetch::ResourceFetcher;
use crate::loader::{ModelLoader, spawn_mesh_jobs};
use crate::readiness::{Readiness, ReadinessPoller};
use crate::scheduler::{Scheduler, TokioScheduler};

/// A mesh that could not be materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFailure {
    pub locator: String,
    pub reason: String,
}

/// Outcome of a successful [`Viewer::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub robot_name: String,
    /// How the wait for the first mesh ended
    pub mesh_phase: Readiness,
    /// How the wait for non-degenerate bounds ended
    pub framing_phase: Readiness,
    pub framing: Framing,
    pub meshes_total: usize,
    /// Meshes with geometry when the report was taken
    pub meshes_loaded: usize,
    pub mesh_failures: Vec<MeshFailure>,
}

struct State {
    graph: Option<Rc<RefCell<ArticulatedGraph>>>,
    tasks: Vec<JoinHandle<()>>,
    camera: PerspectiveCamera,
    controls: Option<OrbitControls>,
    display_mode: DisplayMode,
    /// Bumped whenever the current model is dropped
    generation: u64,
    disposed: bool,
}

impl State {
    fn release_model(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.graph = None;
        self.generation += 1;
    }
}

struct Inner {
    id: Uuid,
    config: ViewerConfig,
    fetcher: Rc<dyn ResourceFetcher>,
    scheduler: Rc<dyn Scheduler>,
    state: RefCell<State>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.state.get_mut().release_model();
    }
}

/// Loads articulated models and keeps a camera framed around them.
///
/// Cheap to clone; clones share the same model and camera. Must be used from
/// within a `tokio::task::LocalSet` since mesh fetches run as local tasks.
#[derive(Clone)]
pub struct Viewer {
    inner: Rc<Inner>,
}

impl Viewer {
    pub fn new(
        config: ViewerConfig,
        fetcher: Rc<dyn ResourceFetcher>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let camera = config.camera.build_camera();
        let controls = config.camera.orbit_controls.then(|| OrbitControls {
            damping_factor: config.camera.damping_factor,
            ..OrbitControls::default()
        });

        Self {
            inner: Rc::new(Inner {
                id: Uuid::new_v4(),
                config,
                fetcher,
                scheduler,
                state: RefCell::new(State {
                    graph: None,
                    tasks: Vec::new(),
                    camera,
                    controls,
                    display_mode: DisplayMode::Shaded,
                    generation: 0,
                    disposed: false,
                }),
            }),
        }
    }

    /// Default configuration on the tokio timer.
    pub fn with_fetcher(fetcher: Rc<dyn ResourceFetcher>) -> Self {
        Self::new(ViewerConfig::new(), fetcher, Rc::new(TokioScheduler))
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.inner.config
    }

    /// Load a model description and run the full pipeline.
    ///
    /// Only a missing or invalid root description fails the load; individual
    /// mesh failures are reported in [`LoadReport::mesh_failures`].
    pub async fn load(&self, locator: &str) -> Result<LoadReport, LoadError> {
        let span = info_span!("load", viewer = %self.inner.id, locator);
        self.load_inner(locator).instrument(span).await
    }

    async fn load_inner(&self, locator: &str) -> Result<LoadReport, LoadError> {
        let generation = self.begin_model()?;
        let config = &self.inner.config;
        let scheduler = self.inner.scheduler.as_ref();

        let loader = ModelLoader::new(Rc::clone(&self.inner.fetcher), config.loader.root_timeout);
        let (graph, jobs) = loader.load_structure(locator).await?;
        self.ensure_current(generation)?;

        let meshes_total = graph.mesh_nodes().len();
        let graph = Rc::new(RefCell::new(graph));
        let tasks = spawn_mesh_jobs(&graph, jobs, &self.inner.fetcher);
        {
            let mut state = self.inner.state.borrow_mut();
            state.graph = Some(Rc::clone(&graph));
            state.tasks = tasks;
        }

        let mesh_phase = ReadinessPoller::new(config.readiness.mesh_poll)
            .run(scheduler, || {
                let graph = graph.borrow();
                !self.is_current(generation)
                    || graph.loaded_mesh_count() > 0
                    || graph.pending_mesh_count() == 0
            })
            .await;
        self.ensure_current(generation)?;
        debug!(?mesh_phase, "Mesh phase settled");

        self.finalize(&graph);

        let epsilon = config.readiness.epsilon;
        let framing_phase = ReadinessPoller::new(config.readiness.framing_poll)
            .run(scheduler, || {
                !self.is_current(generation)
                    || graph.borrow().world_bounds().max_dimension() > epsilon
            })
            .await;
        self.ensure_current(generation)?;

        let framing = self.frame(&graph.borrow());

        let graph = graph.borrow();
        let report = LoadReport {
            robot_name: graph.name().to_string(),
            mesh_phase,
            framing_phase,
            framing,
            meshes_total,
            meshes_loaded: graph.loaded_mesh_count(),
            mesh_failures: graph
                .failed_meshes()
                .into_iter()
                .map(|(_, locator, reason)| MeshFailure {
                    locator: locator.to_string(),
                    reason: reason.to_string(),
                })
                .collect(),
        };
        info!(
            robot = %report.robot_name,
            loaded = report.meshes_loaded,
            total = report.meshes_total,
            failed = report.mesh_failures.len(),
            "Model ready"
        );
        Ok(report)
    }

    /// Show an already-complete OBJ asset and frame it directly.
    pub fn show_static(&self, name: &str, text: &str) -> Result<Framing, LoadError> {
        self.begin_model()?;

        let model = parse_obj(text).map_err(|source| LoadError::Geometry {
            locator: name.to_string(),
            source,
        })?;

        let mut graph = ArticulatedGraph::new(name);
        let root = graph.root();
        let mut drawables = model.drawables;
        for drawable in drawables.iter_mut().filter(|d| !d.has_normals()) {
            drawable.compute_vertex_normals();
        }
        if let Some(link) = graph.add_link(root, name)
            && let Some(visual) = graph.add_visual(link, name, Pose::default(), glam::Vec3::ONE)
        {
            graph.add_mesh(visual, MeshNode::loaded(name, drawables));
        }
        graph.enable_shadows();

        let framing = self.frame(&graph);
        self.inner.state.borrow_mut().graph = Some(Rc::new(RefCell::new(graph)));
        Ok(framing)
    }

    /// Colorize, style and index the graph. Runs once per load, after the
    /// mesh phase has settled.
    fn finalize(&self, graph: &RefCell<ArticulatedGraph>) {
        let config = &self.inner.config;
        let mode = self.inner.state.borrow().display_mode;
        let mut graph = graph.borrow_mut();

        graph.compute_missing_normals();
        let links = assign_link_colors(&mut graph, &config.palette);
        let meshes = apply_link_materials(&mut graph);
        graph.enable_shadows();
        set_display_mode(&mut graph, mode, &config.display);
        let joints = graph.extract_joints().len();

        info!(links, meshes, joints, "Finalized model");
    }

    fn frame(&self, graph: &ArticulatedGraph) -> Framing {
        let mut state = self.inner.state.borrow_mut();
        let framing = frame_object(graph, &state.camera.projection());
        state.camera.apply_framing(&framing);
        if let Some(controls) = state.controls.as_mut() {
            controls.apply_framing(&framing);
        }
        info!(
            shape = framing.shape.name(),
            distance = framing.distance,
            size = ?framing.size,
            "Framed camera"
        );
        framing
    }

    /// Drop the current model and start a new generation.
    fn begin_model(&self) -> Result<u64, LoadError> {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return Err(LoadError::Disposed);
        }
        state.release_model();
        Ok(state.generation)
    }

    fn is_current(&self, generation: u64) -> bool {
        let state = self.inner.state.borrow();
        !state.disposed && state.generation == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), LoadError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            debug!("Load abandoned");
            Err(LoadError::Disposed)
        }
    }

    fn graph(&self) -> Option<Rc<RefCell<ArticulatedGraph>>> {
        self.inner.state.borrow().graph.clone()
    }

    /// Run `f` against the current model, if any.
    pub fn with_graph<R>(&self, f: impl FnOnce(&ArticulatedGraph) -> R) -> Option<R> {
        self.graph().map(|graph| f(&graph.borrow()))
    }

    /// Set a joint by name; returns the value applied after clamping.
    pub fn set_joint_value(&self, name: &str, value: f32) -> Result<f32, JointError> {
        let graph = self
            .graph()
            .ok_or_else(|| JointError::NotFound(name.to_string()))?;
        let mut graph = graph.borrow_mut();
        graph.set_joint_value(name, value)
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.with_graph(|graph| graph.joint_registry().names().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Flip between shaded and wireframe presentation.
    pub fn toggle_wireframe(&self) -> DisplayMode {
        let mode = {
            let mut state = self.inner.state.borrow_mut();
            state.display_mode = state.display_mode.toggled();
            state.display_mode
        };
        if let Some(graph) = self.graph() {
            set_display_mode(&mut graph.borrow_mut(), mode, &self.inner.config.display);
        }
        mode
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.inner.state.borrow().display_mode
    }

    /// Frame the camera around the model's current pose.
    pub fn refit_camera(&self) -> Option<Framing> {
        let graph = self.graph()?;
        let graph = graph.borrow();
        Some(self.frame(&graph))
    }

    /// World bounds of the current model at its current pose.
    pub fn bounds(&self) -> BoundingBox {
        self.with_graph(|graph| graph.world_bounds())
            .unwrap_or(BoundingBox::EMPTY)
    }

    pub fn camera(&self) -> PerspectiveCamera {
        self.inner.state.borrow().camera
    }

    pub fn controls(&self) -> Option<OrbitControls> {
        self.inner.state.borrow().controls
    }

    /// Cancel outstanding mesh tasks and release the model. Idempotent.
    pub fn dispose(&self) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.release_model();
        info!(viewer = %self.inner.id, "Viewer disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use lam_core::ShapeClass;

    use super::*;
    use crate::fetch::MemoryFetcher;

    fn viewer() -> Viewer {
        Viewer::with_fetcher(Rc::new(MemoryFetcher::new()))
    }

    #[test]
    fn test_show_static_frames_directly() {
        let text = "v 0 0 0\nv 10 0 0\nv 10 1 1\nv 0 1 1\nf 1 2 3 4\n";
        let viewer = viewer();
        let framing = viewer.show_static("plank.obj", text).unwrap();

        assert_eq!(framing.shape, ShapeClass::Wide);
        assert_eq!(viewer.camera().position, framing.position);
        assert_relative_eq!(viewer.camera().near, framing.distance * 0.01);
        assert_eq!(viewer.controls().unwrap().target, framing.center);
        assert_eq!(viewer.bounds().max_dimension(), 10.0);
    }

    #[test]
    fn test_show_static_parse_error() {
        let err = viewer().show_static("bad.obj", "v 0 0\n").unwrap_err();
        assert!(matches!(err, LoadError::Geometry { .. }));
    }

    #[test]
    fn test_refit_is_idempotent() {
        let viewer = viewer();
        viewer
            .show_static("tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
            .unwrap();
        let first = viewer.refit_camera().unwrap();
        let camera = viewer.camera();
        let second = viewer.refit_camera().unwrap();
        assert_eq!(first, second);
        assert_eq!(camera, viewer.camera());
    }

    #[test]
    fn test_dispose() {
        let viewer = viewer();
        viewer
            .show_static("tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
            .unwrap();
        viewer.dispose();
        viewer.dispose();

        assert!(viewer.is_disposed());
        assert!(viewer.bounds().is_empty());
        assert!(viewer.refit_camera().is_none());
        assert_eq!(
            viewer.set_joint_value("any", 0.0),
            Err(JointError::NotFound("any".to_string()))
        );
        assert!(matches!(
            viewer.show_static("x.obj", ""),
            Err(LoadError::Disposed)
        ));
    }

    #[test]
    fn test_toggle_without_model() {
        let viewer = viewer();
        assert_eq!(viewer.toggle_wireframe(), DisplayMode::Wireframe);
        assert_eq!(viewer.toggle_wireframe(), DisplayMode::Shaded);
        assert!(viewer.joint_names().is_empty());
    }
}
