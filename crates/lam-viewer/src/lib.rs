//! LAM Viewer
//!
//! Asynchronous side of the asset viewer:
//! - loader: robot descriptions into articulated graphs, meshes fetched as local tasks
//! - readiness: bounded polling for geometry to arrive
//! - viewer: load pipeline, camera framing, joint control and disposal
//! - config: persisted viewer settings

pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod logging;
pub mod readiness;
pub mod scheduler;
mod viewer;

pub use config::{ConfigError, ConfigManager, ViewerConfig};
pub use error::{FetchError, LoadError, MeshResolutionError};
pub use fetch::{FsFetcher, MemoryFetcher, ResourceFetcher};
pub use loader::{MeshJob, ModelLoader};
pub use readiness::{Readiness, ReadinessPoller, RetryPolicy};
pub use scheduler::{Scheduler, TokioScheduler};
pub use viewer::{LoadReport, MeshFailure, Viewer};
