//! Parser state: the vertex pool, per-object accumulators and slice bookkeeping.

use tracing::warn;

use crate::material::{MaterialCatalog, resolve_material};
use crate::mesh::{Drawable, DrawableKind, MaterialAssignment, MaterialSlice};

use super::ObjModel;

pub(crate) const DEFAULT_OBJECT_NAME: &str = "untitled_object";

/// Shared vertex pools, referenced by 1-based index from face records.
#[derive(Debug, Default)]
pub(crate) struct AttributePool {
    pub positions: Vec<[f32; 3]>,
    /// Parallel to `positions`; `None` for vertices declared without a color.
    pub colors: Vec<Option<[f32; 3]>>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
}

/// Expanded attribute buffers of one object.
#[derive(Debug)]
pub(crate) struct GeometryGroup {
    pub kind: DrawableKind,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub colors: Vec<f32>,
    /// Set once any expanded vertex lacked a color.
    pub colors_incomplete: bool,
}

impl GeometryGroup {
    fn new(kind: DrawableKind) -> Self {
        Self {
            kind,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            colors_incomplete: false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn push_position(&mut self, position: [f32; 3], color: Option<[f32; 3]>) {
        self.positions.extend_from_slice(&position);
        match color {
            Some(c) => self.colors.extend_from_slice(&c),
            None => self.colors_incomplete = true,
        }
    }
}

/// A `usemtl` directive as seen during the parse; its end is not known yet.
#[derive(Debug)]
struct SliceOpen {
    name: String,
    start: usize,
    smooth: bool,
}

/// Collects slice-open events and closes all ranges in one post-pass.
#[derive(Debug, Default)]
pub(crate) struct SliceBuilder {
    events: Vec<SliceOpen>,
}

impl SliceBuilder {
    /// Open a slice at `start`; the first slice is smooth, later ones inherit.
    pub fn open(&mut self, name: impl Into<String>, start: usize) {
        let smooth = self.events.last().is_none_or(|prev| prev.smooth);
        self.events.push(SliceOpen {
            name: name.into(),
            start,
            smooth,
        });
    }

    /// Returns false when no slice is open.
    pub fn set_smooth(&mut self, smooth: bool) -> bool {
        match self.events.last_mut() {
            Some(slice) => {
                slice.smooth = smooth;
                true
            }
            None => false,
        }
    }

    /// Close every slice: each ends where the next starts, the last at `end`.
    pub fn finish(self, end: usize) -> Vec<MaterialSlice> {
        let starts: Vec<usize> = self.events.iter().map(|e| e.start.min(end)).collect();
        self.events
            .into_iter()
            .enumerate()
            .map(|(i, event)| {
                let start = starts[i];
                let stop = starts.get(i + 1).copied().unwrap_or(end).max(start);
                MaterialSlice {
                    material_name: event.name,
                    start,
                    count: stop - start,
                    smooth: event.smooth,
                }
            })
            .collect()
    }
}

/// One structural object under construction.
#[derive(Debug)]
pub(crate) struct ObjectBuilder {
    pub name: String,
    pub geometry: GeometryGroup,
    pub slices: SliceBuilder,
}

impl ObjectBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: GeometryGroup::new(DrawableKind::Mesh),
            slices: SliceBuilder::default(),
        }
    }

    /// Make sure the accumulator has the requested kind, discarding
    /// geometry gathered under a different kind.
    pub fn ensure_kind(&mut self, kind: DrawableKind) -> &mut GeometryGroup {
        if self.geometry.kind != kind {
            self.geometry = GeometryGroup::new(kind);
        }
        &mut self.geometry
    }

    fn into_drawable(self, catalog: &MaterialCatalog) -> Option<Drawable> {
        let ObjectBuilder {
            name,
            geometry,
            slices,
        } = self;

        let vertex_count = geometry.vertex_count();
        if vertex_count == 0 {
            return None;
        }

        let normals = if geometry.normals.len() == geometry.positions.len() {
            geometry.normals
        } else {
            if !geometry.normals.is_empty() {
                warn!(object = %name, "Dropping normals: not every face vertex has one");
            }
            Vec::new()
        };

        let uvs = if geometry.uvs.len() / 2 == vertex_count {
            geometry.uvs
        } else {
            if !geometry.uvs.is_empty() {
                warn!(object = %name, "Dropping uvs: not every face vertex has one");
            }
            Vec::new()
        };

        let colors = if geometry.colors_incomplete {
            Vec::new()
        } else {
            geometry.colors
        };

        let slices = slices.finish(vertex_count);
        let material = match slices.len() {
            0 => MaterialAssignment::Single(resolve_material(catalog, "default")),
            1 => MaterialAssignment::Single(resolve_material(catalog, &slices[0].material_name)),
            _ => MaterialAssignment::PerSlice(
                slices
                    .into_iter()
                    .map(|slice| {
                        let material = resolve_material(catalog, &slice.material_name);
                        (slice, material)
                    })
                    .collect(),
            ),
        };

        let mut drawable = Drawable::new(name, geometry.positions);
        drawable.kind = geometry.kind;
        drawable.normals = normals;
        drawable.uvs = uvs;
        drawable.colors = colors;
        drawable.material = material;
        Some(drawable)
    }
}

/// Single-owner state threaded through the line handlers.
#[derive(Debug, Default)]
pub(crate) struct ParserState {
    pub pool: AttributePool,
    pub objects: Vec<ObjectBuilder>,
    pub material_libraries: Vec<String>,
}

impl ParserState {
    pub fn open_object(&mut self, name: impl Into<String>) {
        self.objects.push(ObjectBuilder::new(name));
    }

    /// The currently open object, implicitly opening `untitled_object`.
    pub fn current_object(&mut self) -> &mut ObjectBuilder {
        if self.objects.is_empty() {
            self.open_object(DEFAULT_OBJECT_NAME);
        }
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    /// Pool plus the open object's accumulator, coerced to `kind`.
    pub fn accumulator(&mut self, kind: DrawableKind) -> (&AttributePool, &mut GeometryGroup) {
        if self.objects.is_empty() {
            self.open_object(DEFAULT_OBJECT_NAME);
        }
        let last = self.objects.len() - 1;
        (&self.pool, self.objects[last].ensure_kind(kind))
    }

    /// Assemble drawables; objects without vertices are dropped.
    pub fn into_model(self, catalog: &MaterialCatalog) -> ObjModel {
        let drawables = self
            .objects
            .into_iter()
            .filter_map(|object| object.into_drawable(catalog))
            .collect();

        ObjModel {
            drawables,
            material_libraries: self.material_libraries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_ranges_closed_by_next_start() {
        let mut slices = SliceBuilder::default();
        slices.open("a", 0);
        slices.open("b", 6);
        slices.open("c", 9);

        let closed = slices.finish(15);
        let ranges: Vec<(usize, usize)> = closed.iter().map(|s| (s.start, s.count)).collect();
        assert_eq!(ranges, vec![(0, 6), (6, 3), (9, 6)]);
    }

    #[test]
    fn test_smooth_flag_inherits() {
        let mut slices = SliceBuilder::default();
        slices.open("a", 0);
        assert!(slices.set_smooth(false));
        slices.open("b", 3);

        let closed = slices.finish(6);
        assert!(!closed[0].smooth);
        assert!(!closed[1].smooth);
    }

    #[test]
    fn test_set_smooth_without_slice() {
        let mut slices = SliceBuilder::default();
        assert!(!slices.set_smooth(true));
        assert!(slices.finish(3).is_empty());
    }

    #[test]
    fn test_stale_starts_are_clamped() {
        let mut slices = SliceBuilder::default();
        slices.open("a", 12);
        let closed = slices.finish(3);
        assert_eq!((closed[0].start, closed[0].count), (3, 0));
    }
}
