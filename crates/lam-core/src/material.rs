//! Surface materials and display modes.
//!
//! Materials are plain values swapped by reference on drawables; the rendering
//! collaborator reads them on the next draw.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Phong-style surface description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Display name, kept from the source `usemtl` directive.
    pub name: String,
    pub color: [f32; 3],
    pub emissive: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
    pub flat_shading: bool,
    pub double_sided: bool,
    pub wireframe: bool,
    pub wireframe_linewidth: f32,
}

impl Material {
    /// Default visual material used when no definition exists for `name`.
    ///
    /// White diffuse, `0x111111` specular, shininess 30.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: [1.0, 1.0, 1.0],
            emissive: [0.0, 0.0, 0.0],
            specular: [17.0 / 255.0; 3],
            shininess: 30.0,
            opacity: 1.0,
            flat_shading: false,
            double_sided: false,
            wireframe: false,
            wireframe_linewidth: 1.0,
        }
    }

    /// Material assigned to every mesh of a colorized link.
    pub fn for_link(name: impl Into<String>, color: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            color,
            emissive: [color[0] * 0.1, color[1] * 0.1, color[2] * 0.1],
            specular: [102.0 / 255.0; 3],
            shininess: 60.0,
            opacity: 1.0,
            flat_shading: false,
            double_sided: true,
            wireframe: false,
            wireframe_linewidth: 1.0,
        }
    }
}

/// Externally supplied material definitions, keyed by name.
pub type MaterialCatalog = HashMap<String, Material>;

/// Resolve a slice's material name against the catalog, substituting the
/// fallback material (with the same name) when no definition is present.
pub fn resolve_material(catalog: &MaterialCatalog, name: &str) -> Material {
    catalog
        .get(name)
        .cloned()
        .unwrap_or_else(|| Material::fallback(name))
}

/// How meshes are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Shaded,
    Wireframe,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Shaded => DisplayMode::Wireframe,
            DisplayMode::Wireframe => DisplayMode::Shaded,
        }
    }
}

/// Styling applied in wireframe mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayStyle {
    pub wireframe_color: [f32; 3],
    pub wireframe_linewidth: f32,
}

impl Default for DisplayStyle {
    fn default() -> Self {
        Self {
            wireframe_color: [0.2, 0.4, 0.8],
            wireframe_linewidth: 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_preserves_name() {
        let catalog = MaterialCatalog::new();
        let material = resolve_material(&catalog, "brushed_steel");
        assert_eq!(material.name, "brushed_steel");
        assert_eq!(material.color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_catalog_definition_wins() {
        let mut catalog = MaterialCatalog::new();
        let mut red = Material::fallback("red");
        red.color = [1.0, 0.0, 0.0];
        catalog.insert("red".to_string(), red.clone());

        assert_eq!(resolve_material(&catalog, "red"), red);
    }

    #[test]
    fn test_link_material_emissive() {
        let material = Material::for_link("base_link", [0.5, 1.0, 0.0]);
        assert_eq!(material.emissive, [0.05, 0.1, 0.0]);
        assert!(material.double_sided);
    }
}
