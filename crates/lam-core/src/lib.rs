//! LAM Viewer Core
//!
//! Synchronous building blocks of the asset viewer:
//! - obj: line-oriented geometry text parser
//! - graph: articulated node graph with joint registry
//! - colorize: deterministic per-link colors and display modes
//! - framing: camera fitting around bounded objects

pub mod bounds;
pub mod colorize;
pub mod framing;
pub mod graph;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod types;

pub use bounds::*;
pub use colorize::*;
pub use framing::*;
pub use graph::*;
pub use material::*;
pub use mesh::*;
pub use obj::{ObjError, ObjModel, VertexPool, parse_obj, parse_obj_with_materials};
pub use types::*;
