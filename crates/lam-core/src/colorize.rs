//! Per-link coloring with a golden-ratio hue sequence.
//!
//! Links are ordered by name before hues are handed out, so the colors do not
//! depend on the order in which meshes arrived. Colors live in the graph's
//! side table; materials are derived from it and can be rebuilt at any time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{ArticulatedGraph, LinkColor, NodeId};
use crate::material::{DisplayMode, DisplayStyle, Material};

/// Golden ratio conjugate, `(sqrt(5) - 1) / 2`.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_9;

/// Fixed saturation and lightness of link colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub saturation: f32,
    pub lightness: f32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            saturation: 0.70,
            lightness: 0.70,
        }
    }
}

impl Palette {
    /// Color for the `index`-th link in sorted order.
    pub fn color(&self, index: usize) -> LinkColor {
        let hue = golden_hue(index);
        LinkColor {
            index,
            hue,
            rgb: hsl_to_rgb(hue, self.saturation, self.lightness),
        }
    }
}

/// `frac(index * phi)`
pub fn golden_hue(index: usize) -> f32 {
    (index as f64 * GOLDEN_RATIO_CONJUGATE).fract() as f32
}

/// HSL to RGB, all components in `[0, 1]`.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return [l, l, l];
    }

    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let channel = |t: f32| {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * 6.0 * (2.0 / 3.0 - t)
        } else {
            p
        }
    };

    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

/// Links sorted by name, ties broken by arena index.
pub fn sorted_links(graph: &ArticulatedGraph) -> Vec<NodeId> {
    let mut links = graph.links();
    links.sort_by(|a, b| {
        let name = |id: &NodeId| graph.node(*id).map(|n| n.name.as_str()).unwrap_or_default();
        name(a).cmp(name(b)).then(a.cmp(b))
    });
    links
}

/// Fill the link color side table. Returns the number of links colored.
pub fn assign_link_colors(graph: &mut ArticulatedGraph, palette: &Palette) -> usize {
    let links = sorted_links(graph);
    graph.link_colors = links
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, palette.color(index)))
        .collect();
    debug!(links = links.len(), "Assigned link colors");
    links.len()
}

/// Give every loaded mesh its owning link's material. Returns the number of
/// meshes styled.
pub fn apply_link_materials(graph: &mut ArticulatedGraph) -> usize {
    let styled = graph
        .mesh_nodes()
        .into_iter()
        .filter(|id| style_mesh(graph, *id))
        .count();
    debug!(meshes = styled, "Applied link materials");
    styled
}

/// Switch every mesh between shaded and wireframe presentation.
pub fn set_display_mode(graph: &mut ArticulatedGraph, mode: DisplayMode, style: &DisplayStyle) {
    graph.display_mode = mode;
    graph.display_style = *style;
    for id in graph.mesh_nodes() {
        apply_display_mode(graph, id);
    }
    debug!(?mode, "Display mode changed");
}

/// Style one mesh from its link color and the current display mode.
/// Returns false when the mesh has no colored owning link.
pub(crate) fn style_mesh(graph: &mut ArticulatedGraph, id: NodeId) -> bool {
    let Some(color) = graph
        .find_owning_link(id)
        .and_then(|link| graph.link_color(link))
    else {
        return false;
    };
    let Some(mesh) = graph.mesh_mut(id) else {
        return false;
    };

    mesh.visible = true;
    mesh.cast_shadow = true;
    mesh.receive_shadow = true;
    if let crate::graph::MeshSlot::Loaded(drawables) = &mut mesh.slot {
        for drawable in drawables {
            drawable
                .material
                .replace_all(|m| Material::for_link(m.name.clone(), color.rgb));
        }
    }

    apply_display_mode(graph, id);
    true
}

fn apply_display_mode(graph: &mut ArticulatedGraph, id: NodeId) {
    let mode = graph.display_mode;
    let style = graph.display_style;
    let link_color = graph
        .find_owning_link(id)
        .and_then(|link| graph.link_color(link));
    let Some(mesh) = graph.mesh_mut(id) else {
        return;
    };
    let crate::graph::MeshSlot::Loaded(drawables) = &mut mesh.slot else {
        return;
    };

    for material in drawables
        .iter_mut()
        .flat_map(|d| d.material.materials_mut())
    {
        match mode {
            DisplayMode::Wireframe => {
                material.wireframe = true;
                material.wireframe_linewidth = style.wireframe_linewidth;
                material.color = style.wireframe_color;
            }
            DisplayMode::Shaded => {
                material.wireframe = false;
                material.wireframe_linewidth = 1.0;
                if let Some(color) = link_color {
                    material.color = color.rgb;
                }
            }
        }
    }
}
