//! Wavefront OBJ text parser.
//!
//! Streaming and single pass: face indices resolve against the vertex pool
//! as it stands when the face line is read. Any malformed line aborts the
//! whole parse.

mod number;
mod state;

use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use crate::material::MaterialCatalog;
use crate::mesh::{Drawable, DrawableKind};

use number::{parse_float, parse_index};
use state::{AttributePool, GeometryGroup, ParserState};

/// Which pool a face index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexPool {
    Position,
    TexCoord,
    Normal,
}

impl fmt::Display for VertexPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexPool::Position => write!(f, "vertex"),
            VertexPool::TexCoord => write!(f, "texture coordinate"),
            VertexPool::Normal => write!(f, "normal"),
        }
    }
}

/// OBJ parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObjError {
    #[error("line {line}: {reason}: `{text}`")]
    Parse {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("line {line}: {pool} index {index} out of range (pool has {len}): `{text}`")]
    IndexOutOfRange {
        line: usize,
        text: String,
        pool: VertexPool,
        index: i64,
        len: usize,
    },
}

impl ObjError {
    pub fn line(&self) -> usize {
        match self {
            ObjError::Parse { line, .. } | ObjError::IndexOutOfRange { line, .. } => *line,
        }
    }
}

/// Result of parsing one OBJ resource.
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    pub drawables: Vec<Drawable>,
    /// `mtllib` names in declaration order, unresolved.
    pub material_libraries: Vec<String>,
}

/// Whether a handler claimed the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Consumed,
    NotRecognized,
}

/// One trimmed source line split into directive and remainder.
struct Line<'a> {
    number: usize,
    text: &'a str,
    directive: &'a str,
    rest: &'a str,
}

impl Line<'_> {
    fn parse_error(&self, reason: impl Into<String>) -> ObjError {
        ObjError::Parse {
            line: self.number,
            text: self.text.to_string(),
            reason: reason.into(),
        }
    }

    fn floats<const N: usize>(&self) -> Result<([f32; N], Vec<f32>), ObjError> {
        let mut values = [0.0; N];
        let mut extra = Vec::new();
        let mut count = 0;
        for token in self.rest.split_whitespace() {
            let value = parse_float(token)
                .ok_or_else(|| self.parse_error(format!("invalid number `{token}`")))?;
            if count < N {
                values[count] = value;
            } else {
                extra.push(value);
            }
            count += 1;
        }
        if count < N {
            return Err(self.parse_error(format!("expected {N} numbers, found {count}")));
        }
        Ok((values, extra))
    }
}

/// Parse OBJ text with no external material definitions.
pub fn parse_obj(text: &str) -> Result<ObjModel, ObjError> {
    parse_obj_with_materials(text, &MaterialCatalog::new())
}

/// Parse OBJ text, resolving `usemtl` names against `catalog`.
pub fn parse_obj_with_materials(
    text: &str,
    catalog: &MaterialCatalog,
) -> Result<ObjModel, ObjError> {
    let mut state = ParserState::default();

    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (directive, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((directive, rest)) => (directive, rest.trim()),
            None => (trimmed, ""),
        };
        let line = Line {
            number: index + 1,
            text: trimmed,
            directive,
            rest,
        };

        let mut outcome = handle_vertex(&mut state, &line)?;
        if outcome == LineOutcome::NotRecognized {
            outcome = handle_element(&mut state, &line)?;
        }
        if outcome == LineOutcome::NotRecognized {
            outcome = handle_directive(&mut state, &line);
        }
        if outcome == LineOutcome::NotRecognized {
            trace!(line = line.number, directive = line.directive, "Ignoring OBJ directive");
        }
    }

    let model = state.into_model(catalog);
    debug!(
        drawables = model.drawables.len(),
        material_libraries = model.material_libraries.len(),
        "Parsed OBJ"
    );
    Ok(model)
}

fn handle_vertex(state: &mut ParserState, line: &Line) -> Result<LineOutcome, ObjError> {
    match line.directive {
        "v" => {
            let (position, extra) = line.floats::<3>()?;
            let color = (extra.len() >= 3).then(|| [extra[0], extra[1], extra[2]]);
            state.pool.positions.push(position);
            state.pool.colors.push(color);
        }
        "vn" => {
            let (normal, _) = line.floats::<3>()?;
            state.pool.normals.push(normal);
        }
        "vt" => {
            let (uv, _) = line.floats::<2>()?;
            state.pool.uvs.push(uv);
        }
        _ => return Ok(LineOutcome::NotRecognized),
    }
    Ok(LineOutcome::Consumed)
}

fn handle_element(state: &mut ParserState, line: &Line) -> Result<LineOutcome, ObjError> {
    match line.directive {
        "f" => {
            let tokens: Vec<&str> = line.rest.split_whitespace().collect();
            if tokens.is_empty() {
                return Ok(LineOutcome::Consumed);
            }
            let corners = tokens
                .iter()
                .map(|token| resolve_corner(state, line, token))
                .collect::<Result<Vec<_>, _>>()?;

            // Only quads are split. Any other corner count is emitted as one
            // polygon in token order, which is a valid triangle only for n = 3.
            let order: Vec<usize> = if corners.len() == 4 {
                vec![0, 1, 2, 0, 2, 3]
            } else {
                (0..corners.len()).collect()
            };
            let (pool, geometry) = state.accumulator(DrawableKind::Mesh);
            for i in order {
                push_corner(geometry, pool, &corners[i]);
            }
        }
        "l" => {
            let tokens: Vec<&str> = line.rest.split_whitespace().collect();
            if tokens.len() < 2 {
                return Err(line.parse_error("line element needs at least two vertices"));
            }
            let corners = tokens
                .iter()
                .map(|token| resolve_corner(state, line, token))
                .collect::<Result<Vec<_>, _>>()?;

            let (pool, geometry) = state.accumulator(DrawableKind::LineSegments);
            for pair in corners.windows(2) {
                push_corner(geometry, pool, &pair[0]);
                push_corner(geometry, pool, &pair[1]);
            }
        }
        _ => return Ok(LineOutcome::NotRecognized),
    }
    Ok(LineOutcome::Consumed)
}

fn handle_directive(state: &mut ParserState, line: &Line) -> LineOutcome {
    match line.directive {
        "o" => state.open_object(line.rest),
        // Grouping is accepted without geometric effect.
        "g" => {}
        "usemtl" => {
            let object = state.current_object();
            let start = object.geometry.vertex_count();
            object.slices.open(line.rest, start);
        }
        "mtllib" => state.material_libraries.push(line.rest.to_string()),
        "s" => {
            let smooth = !matches!(line.rest.to_ascii_lowercase().as_str(), "off" | "0");
            if let Some(object) = state.objects.last_mut() {
                object.slices.set_smooth(smooth);
            }
        }
        _ => return LineOutcome::NotRecognized,
    }
    LineOutcome::Consumed
}

/// Resolved pool offsets of one face corner.
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

fn resolve_corner(state: &ParserState, line: &Line, token: &str) -> Result<Corner, ObjError> {
    let mut parts = token.split('/');
    let position = parts.next().unwrap_or_default();
    let uv = parts.next().filter(|s| !s.is_empty());
    let normal = parts.next().filter(|s| !s.is_empty());

    if position.is_empty() {
        return Err(line.parse_error(format!("missing vertex index in `{token}`")));
    }

    let pool = &state.pool;
    Ok(Corner {
        position: resolve_index(line, position, VertexPool::Position, pool.positions.len())?,
        uv: uv
            .map(|s| resolve_index(line, s, VertexPool::TexCoord, pool.uvs.len()))
            .transpose()?,
        normal: normal
            .map(|s| resolve_index(line, s, VertexPool::Normal, pool.normals.len()))
            .transpose()?,
    })
}

/// 1-based `k` maps to offset `k - 1`; relative (negative) indices are rejected.
fn resolve_index(
    line: &Line,
    token: &str,
    pool: VertexPool,
    len: usize,
) -> Result<usize, ObjError> {
    let index =
        parse_index(token).ok_or_else(|| line.parse_error(format!("invalid index `{token}`")))?;
    if index < 1 || index as u64 > len as u64 {
        return Err(ObjError::IndexOutOfRange {
            line: line.number,
            text: line.text.to_string(),
            pool,
            index,
            len,
        });
    }
    Ok(index as usize - 1)
}

fn push_corner(geometry: &mut GeometryGroup, pool: &AttributePool, corner: &Corner) {
    geometry.push_position(pool.positions[corner.position], pool.colors[corner.position]);
    if let Some(uv) = corner.uv {
        geometry.uvs.extend_from_slice(&pool.uvs[uv]);
    }
    if let Some(normal) = corner.normal {
        geometry.normals.extend_from_slice(&pool.normals[normal]);
    }
}
