//! Plain-text tessellation dump.
//!
//! ```text
//! nNode nEdge nFace
//! x y z                      (nNode lines)
//! nPoint                     (per edge, followed by nPoint lines of `x y z u`)
//! nPoint nTri                (per face, followed by nPoint lines of
//!                             `x y z u v i j` and nTri lines of 6 integers)
//! ```

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::geom::Point3;

pub type TessDumpResult<T> = Result<T, TessDumpError>;

#[derive(Debug, Error)]
pub enum TessDumpError {
    #[error("could not read tessellation dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEof { line: usize, expected: &'static str },

    #[error("line {line}: expected {expected} values, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid number `{token}`")]
    Number { line: usize, token: String },

    #[error("line {line}: trailing content after the last face")]
    Trailing { line: usize },
}

/// Sampled points of one edge with their curve parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EdgeTess {
    pub points: Vec<Point3>,
    pub params: Vec<f64>,
}

/// Triangulated face: vertices with `(u, v)` and the `(i, j)` point-type pair,
/// and triangles as three 1-based vertex indices followed by three neighbours.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FaceTess {
    pub points: Vec<Point3>,
    pub uvs: Vec<(f64, f64)>,
    pub point_types: Vec<(i32, i32)>,
    pub tris: Vec<[i32; 6]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TessDump {
    pub nodes: Vec<Point3>,
    pub edges: Vec<EdgeTess>,
    pub faces: Vec<FaceTess>,
}

impl TessDump {
    /// Every point of the dump: nodes first, then edge points, then face points.
    pub fn points(&self) -> impl Iterator<Item = Point3> + '_ {
        self.nodes
            .iter()
            .copied()
            .chain(self.edges.iter().flat_map(|e| e.points.iter().copied()))
            .chain(self.faces.iter().flat_map(|f| f.points.iter().copied()))
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.nodes.len()
            + self.edges.iter().map(|e| e.points.len()).sum::<usize>()
            + self.faces.iter().map(|f| f.points.len()).sum::<usize>()
    }
}

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> Lines<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.lines().enumerate(),
            line: 0,
        }
    }

    /// Next non-blank line split into whitespace-separated tokens.
    fn next_fields(&mut self, expected: &'static str) -> TessDumpResult<Vec<&'a str>> {
        for (index, text) in self.inner.by_ref() {
            self.line = index + 1;
            let fields: Vec<&str> = text.split_whitespace().collect();
            if !fields.is_empty() {
                return Ok(fields);
            }
        }
        Err(TessDumpError::UnexpectedEof {
            line: self.line + 1,
            expected,
        })
    }

    fn record<const N: usize>(&mut self, expected: &'static str) -> TessDumpResult<[&'a str; N]> {
        let fields = self.next_fields(expected)?;
        let found = fields.len();
        fields.try_into().map_err(|_| TessDumpError::FieldCount {
            line: self.line,
            expected: N,
            found,
        })
    }

    fn float(&self, token: &str) -> TessDumpResult<f64> {
        token.parse().map_err(|_| TessDumpError::Number {
            line: self.line,
            token: token.to_owned(),
        })
    }

    fn int<T: std::str::FromStr>(&self, token: &str) -> TessDumpResult<T> {
        token.parse().map_err(|_| TessDumpError::Number {
            line: self.line,
            token: token.to_owned(),
        })
    }

    fn point(&self, x: &str, y: &str, z: &str) -> TessDumpResult<Point3> {
        Ok(Point3::new(self.float(x)?, self.float(y)?, self.float(z)?))
    }
}

/// Parses a dump from text.
pub fn parse_str(input: &str) -> TessDumpResult<TessDump> {
    let mut lines = Lines::new(input);

    let [n_node, n_edge, n_face] = lines.record::<3>("the `nNode nEdge nFace` header")?;
    let n_node: usize = lines.int(n_node)?;
    let n_edge: usize = lines.int(n_edge)?;
    let n_face: usize = lines.int(n_face)?;

    let mut dump = TessDump::default();
    for _ in 0..n_node {
        let [x, y, z] = lines.record::<3>("a node `x y z` line")?;
        dump.nodes.push(lines.point(x, y, z)?);
    }

    for _ in 0..n_edge {
        let [count] = lines.record::<1>("an edge point count")?;
        let count: usize = lines.int(count)?;
        let mut edge = EdgeTess::default();
        for _ in 0..count {
            let [x, y, z, u] = lines.record::<4>("an edge `x y z u` line")?;
            edge.points.push(lines.point(x, y, z)?);
            edge.params.push(lines.float(u)?);
        }
        dump.edges.push(edge);
    }

    for _ in 0..n_face {
        let [n_point, n_tri] = lines.record::<2>("a face `nPoint nTri` line")?;
        let n_point: usize = lines.int(n_point)?;
        let n_tri: usize = lines.int(n_tri)?;
        let mut face = FaceTess::default();
        for _ in 0..n_point {
            let [x, y, z, u, v, i, j] = lines.record::<7>("a face `x y z u v i j` line")?;
            face.points.push(lines.point(x, y, z)?);
            face.uvs.push((lines.float(u)?, lines.float(v)?));
            face.point_types.push((lines.int(i)?, lines.int(j)?));
        }
        for _ in 0..n_tri {
            let fields = lines.record::<6>("a triangle line of 6 integers")?;
            let mut tri = [0_i32; 6];
            for (slot, token) in tri.iter_mut().zip(fields) {
                *slot = lines.int(token)?;
            }
            face.tris.push(tri);
        }
        dump.faces.push(face);
    }

    if lines.next_fields("").is_ok() {
        return Err(TessDumpError::Trailing { line: lines.line });
    }

    log::debug!(
        "parsed tessellation dump: {} nodes, {} edges, {} faces, {} points",
        dump.nodes.len(),
        dump.edges.len(),
        dump.faces.len(),
        dump.point_count()
    );
    Ok(dump)
}

pub fn read_file(path: impl AsRef<Path>) -> TessDumpResult<TessDump> {
    let text = std::fs::read_to_string(path)?;
    parse_str(&text)
}

/// Renders `dump` in the text format [`parse_str`] reads.
#[must_use]
pub fn write_string(dump: &TessDump) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {}",
        dump.nodes.len(),
        dump.edges.len(),
        dump.faces.len()
    );
    for p in &dump.nodes {
        let _ = writeln!(out, "{:.15e} {:.15e} {:.15e}", p.x, p.y, p.z);
    }
    for edge in &dump.edges {
        let _ = writeln!(out, "{}", edge.points.len());
        for (p, t) in edge.points.iter().zip(&edge.params) {
            let _ = writeln!(out, "{:.15e} {:.15e} {:.15e} {:.15e}", p.x, p.y, p.z, t);
        }
    }
    for face in &dump.faces {
        let _ = writeln!(out, "{} {}", face.points.len(), face.tris.len());
        for ((p, (u, v)), (i, j)) in face.points.iter().zip(&face.uvs).zip(&face.point_types) {
            let _ = writeln!(
                out,
                "{:.15e} {:.15e} {:.15e} {:.15e} {:.15e} {i} {j}",
                p.x, p.y, p.z, u, v
            );
        }
        for tri in &face.tris {
            let line: Vec<String> = tri.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "{}", line.join(" "));
        }
    }
    out
}
