//! Drawable geometry produced by the parsers and primitive generators.

mod normals;
mod primitive;

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounds::BoundingBox;
use crate::material::Material;

pub use normals::{calculate_triangle_normal, flat_vertex_normals};
pub use primitive::{box_drawable, cylinder_drawable, sphere_drawable};

/// Primitive topology of a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawableKind {
    /// Triangle list.
    Mesh,
    /// Pairs of vertices forming independent segments.
    LineSegments,
}

/// A contiguous vertex range drawn with one material.
///
/// `start` and `count` are in expanded-vertex units (a triangle spans 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSlice {
    pub material_name: String,
    pub start: usize,
    pub count: usize,
    pub smooth: bool,
}

impl MaterialSlice {
    /// `(first_triangle, triangle_count)`
    pub fn triangles(&self) -> (usize, usize) {
        (self.start / 3, self.count / 3)
    }
}

/// Material binding of a drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaterialAssignment {
    /// One material for the whole drawable.
    Single(Material),
    /// One material per slice, in declaration order.
    PerSlice(Vec<(MaterialSlice, Material)>),
}

impl MaterialAssignment {
    pub fn materials(&self) -> Vec<&Material> {
        match self {
            MaterialAssignment::Single(material) => vec![material],
            MaterialAssignment::PerSlice(slices) => slices.iter().map(|(_, m)| m).collect(),
        }
    }

    pub fn materials_mut(&mut self) -> Vec<&mut Material> {
        match self {
            MaterialAssignment::Single(material) => vec![material],
            MaterialAssignment::PerSlice(slices) => slices.iter_mut().map(|(_, m)| m).collect(),
        }
    }

    /// Replace every material with one produced by `make`, keeping slice ranges.
    pub fn replace_all(&mut self, mut make: impl FnMut(&Material) -> Material) {
        for material in self.materials_mut() {
            *material = make(material);
        }
    }
}

/// One named mesh-plus-materials unit with expanded (non-indexed) attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub id: Uuid,
    pub name: String,
    pub kind: DrawableKind,
    /// Flat `[x, y, z, ...]` positions.
    pub positions: Vec<f32>,
    /// Flat normals; empty when the source had none.
    pub normals: Vec<f32>,
    /// Flat `[u, v, ...]` texture coordinates; empty when absent.
    pub uvs: Vec<f32>,
    /// Flat RGB vertex colors; empty when absent.
    pub colors: Vec<f32>,
    pub material: MaterialAssignment,
}

impl Drawable {
    /// Create a triangle mesh with a single fallback material.
    pub fn new(name: impl Into<String>, positions: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: DrawableKind::Mesh,
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            material: MaterialAssignment::Single(Material::fallback("default")),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        match self.kind {
            DrawableKind::Mesh => self.vertex_count() / 3,
            DrawableKind::LineSegments => 0,
        }
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// Bounds in the drawable's own frame, computed from the current buffers.
    pub fn local_bounds(&self) -> BoundingBox {
        BoundingBox::from_flat_positions(&self.positions)
    }

    /// Fill in flat per-face normals when the source provided none.
    pub fn compute_vertex_normals(&mut self) {
        if self.kind == DrawableKind::Mesh {
            self.normals = flat_vertex_normals(&self.positions);
        }
    }

    /// Raw bytes of the position buffer for upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

/// Detect mesh format from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Unknown,
}

impl MeshFormat {
    /// Detect format from a locator (path or URL)
    pub fn from_locator(locator: &str) -> Self {
        let path = locator.split(['?', '#']).next().unwrap_or(locator);
        match Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("obj") => MeshFormat::Obj,
            _ => MeshFormat::Unknown,
        }
    }

    /// Check if the format is supported
    pub fn is_supported(&self) -> bool {
        matches!(self, MeshFormat::Obj)
    }
}
