//! Face-indexed mesh files (`v`, `vt`, `vn` and `f` records).
//!
//! Faces refer to the positions, texture coordinates and normals declared
//! above them with 1-based indices in the forms `p`, `p/t`, `p/t/n` and
//! `p//n`. Every other record is ignored.

use std::{
    io::BufRead,
    path::Path,
};

use crate::{
    data_structures::{mesh::MeshData, vertex::ModelVertex},
    error::LoadError,
};

const DEFAULT_TEX_COORDS: [f32; 2] = [0.0, 0.0];
const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

#[derive(Default)]
struct Attributes {
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

/// Parse a mesh in a single pass over `reader`.
///
/// `source` is only used to report read errors. The result may be empty if
/// the input declares no faces; it is up to the caller to decide what that means.
pub fn parse_obj<R: BufRead>(mut reader: R, source: &Path) -> Result<MeshData, LoadError> {
    let mut attributes = Attributes::default();
    let mut mesh = MeshData::new();
    let mut corners = Vec::new();

    let mut raw = Vec::new();
    let mut line_no = 0;
    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|err| LoadError::unavailable(source, err))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        // only geometry records get decoded, comments may be in any encoding
        let Some(kind) = record_kind(&raw) else {
            continue;
        };
        let line = std::str::from_utf8(&raw)
            .map_err(|_| LoadError::malformed(line_no, "line isn't valid UTF-8"))?;
        let mut tokens = line.split_whitespace();
        tokens.next();
        match kind {
            Record::Position => attributes.positions.push(parse_floats(tokens, line_no, "v")?),
            Record::TexCoords => attributes.tex_coords.push(parse_floats(tokens, line_no, "vt")?),
            Record::Normal => attributes
                .normals
                .push(normalize(parse_floats(tokens, line_no, "vn")?)),
            Record::Face => {
                corners.clear();
                for reference in tokens {
                    let vertex = attributes.resolve(reference, line_no)?;
                    corners.push(mesh.add_vertex(vertex));
                }
                if corners.len() < 3 {
                    return Err(LoadError::malformed(
                        line_no,
                        format!("a face needs at least 3 vertices, got {}", corners.len()),
                    ));
                }
                mesh.push_polygon(&corners);
            }
        }
    }
    Ok(mesh)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    Position,
    TexCoords,
    Normal,
    Face,
}

/// The geometry record a raw line starts with, if any.
fn record_kind(raw: &[u8]) -> Option<Record> {
    let start = raw.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = &raw[start..];
    let end = rest
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    match &rest[..end] {
        b"v" => Some(Record::Position),
        b"vt" => Some(Record::TexCoords),
        b"vn" => Some(Record::Normal),
        b"f" => Some(Record::Face),
        // comments and records we don't use
        _ => None,
    }
}

fn parse_floats<'a, const N: usize>(
    mut tokens: impl Iterator<Item = &'a str>,
    line_no: usize,
    kind: &str,
) -> Result<[f32; N], LoadError> {
    let mut values = [0.0; N];
    for value in values.iter_mut() {
        let token = tokens.next().ok_or_else(|| {
            LoadError::malformed(line_no, format!("`{kind}` needs {N} numbers"))
        })?;
        *value = token.parse().map_err(|_| {
            LoadError::malformed(line_no, format!("`{token}` isn't a number"))
        })?;
    }
    Ok(values)
}

fn normalize([x, y, z]: [f32; 3]) -> [f32; 3] {
    let length = (x * x + y * y + z * z).sqrt();
    if length > 0.0 {
        [x / length, y / length, z / length]
    } else {
        [x, y, z]
    }
}

impl Attributes {
    fn resolve(&self, reference: &str, line_no: usize) -> Result<ModelVertex, LoadError> {
        let mut parts = reference.split('/');
        let position = parts.next().unwrap_or_default();
        let tex_coords = parts.next().unwrap_or_default();
        let normal = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            return Err(LoadError::malformed(
                line_no,
                format!("`{reference}` has more than three parts"),
            ));
        }

        let position = match lookup(&self.positions, position, line_no, "position")? {
            Some(position) => position,
            None => {
                return Err(LoadError::malformed(
                    line_no,
                    format!("`{reference}` has no position"),
                ));
            }
        };
        let tex_coords =
            lookup(&self.tex_coords, tex_coords, line_no, "texture coordinate")?.unwrap_or(DEFAULT_TEX_COORDS);
        let normal = lookup(&self.normals, normal, line_no, "normal")?.unwrap_or(DEFAULT_NORMAL);
        Ok(ModelVertex::new(position, tex_coords, normal))
    }
}

/// Resolve a 1-based index. An empty token or index 0 means "not given".
fn lookup<T: Copy>(
    values: &[T],
    token: &str,
    line_no: usize,
    what: &str,
) -> Result<Option<T>, LoadError> {
    if token.is_empty() {
        return Ok(None);
    }
    let index: usize = token.parse().map_err(|_| {
        LoadError::malformed(line_no, format!("`{token}` isn't a valid {what} index"))
    })?;
    if index == 0 {
        return Ok(None);
    }
    values.get(index - 1).copied().map(Some).ok_or_else(|| {
        LoadError::malformed(
            line_no,
            format!("{what} {index} is referenced but only {} are declared", values.len()),
        )
    })
}
