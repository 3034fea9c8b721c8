//! The geometry-kernel collaborator.
//!
//! Every B-rep query the search, matching and blend code performs goes through
//! [`GeometryKernel`]. The trait is deliberately narrow: bounding boxes,
//! evaluation, inverse evaluation, a handful of topology lookups, attribute
//! storage, and the three constructors the blend pipeline needs
//! (approximating surface, face from surface, sew).
//!
//! [`memory::MemoryKernel`] is the in-crate reference implementation.

pub mod memory;

#[cfg(test)]
mod tests;

use std::fmt;

use serde::Serialize;

use crate::geom::{BBox, Point3, Vec3};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub u32);

        impl $name {
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

handle!(
    /// Topological vertex.
    NodeId,
    "node#"
);
handle!(
    /// Topological edge with an underlying curve.
    EdgeId,
    "edge#"
);
handle!(
    /// Trimmed surface patch.
    FaceId,
    "face#"
);
handle!(
    /// Untrimmed surface geometry.
    SurfaceId,
    "surface#"
);
handle!(
    /// Closed solid or open sheet assembled from faces.
    BodyId,
    "body#"
);

/// Anything the kernel can bound, evaluate or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Entity {
    Node(NodeId),
    Edge(EdgeId),
    Face(FaceId),
    Surface(SurfaceId),
    Body(BodyId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "{id}"),
            Self::Edge(id) => write!(f, "{id}"),
            Self::Face(id) => write!(f, "{id}"),
            Self::Surface(id) => write!(f, "{id}"),
            Self::Body(id) => write!(f, "{id}"),
        }
    }
}

/// Orientation of an edge within a loop, relative to its parametric direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sense {
    Forward,
    Reverse,
}

impl Sense {
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// Whether a face's outward normal follows `du x dv` of its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FaceOrientation {
    Forward,
    Reverse,
}

impl FaceOrientation {
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }
}

/// Parametric coordinates for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Params {
    /// Nodes carry no parameters.
    None,
    Curve(f64),
    Surface(f64, f64),
}

/// Result of [`GeometryKernel::evaluate`]. For curves `dv` is zero; for nodes
/// both derivatives are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub point: Point3,
    pub du: Vec3,
    pub dv: Vec3,
}

/// Result of [`GeometryKernel::inverse_evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub params: Params,
    pub point: Point3,
}

/// Static description of an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeInfo {
    /// Start and end nodes in parametric order.
    pub nodes: [NodeId; 2],
    pub range: (f64, f64),
    /// Zero-length edge (seam artifact); it has no usable curve.
    pub degenerate: bool,
}

impl EdgeInfo {
    /// Node reached first when walking the edge in `sense`.
    #[must_use]
    pub const fn start_node(&self, sense: Sense) -> NodeId {
        match sense {
            Sense::Forward => self.nodes[0],
            Sense::Reverse => self.nodes[1],
        }
    }

    #[must_use]
    pub const fn end_node(&self, sense: Sense) -> NodeId {
        match sense {
            Sense::Forward => self.nodes[1],
            Sense::Reverse => self.nodes[0],
        }
    }

    /// Parameter at fraction `f` of the range, walking in `sense`.
    #[must_use]
    pub fn param_at(&self, fraction: f64, sense: Sense) -> f64 {
        let (t0, t1) = self.range;
        match sense {
            Sense::Forward => t0 + fraction * (t1 - t0),
            Sense::Reverse => t1 - fraction * (t1 - t0),
        }
    }
}

/// Input rows for [`GeometryKernel::build_approximating_surface`].
///
/// The surface runs from the west row (`v = 0`) to the east row (`v = 1`);
/// tangents are the `d/dv` derivatives the surface must have along each row.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRows {
    pub west: Vec<Point3>,
    pub east: Vec<Point3>,
    pub west_tangents: Vec<Vec3>,
    pub east_tangents: Vec<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BodyKind {
    Solid,
    Sheet,
}

/// Outcome of a sew: the new body plus the facts callers must check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SewResult {
    pub body: BodyId,
    /// Number of connected shells produced.
    pub children: usize,
    pub kind: BodyKind,
}

/// Typed attribute payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttrValue {
    Int(Vec<i32>),
    Real(Vec<f64>),
    Text(String),
    /// Real values paired with their parametric sensitivities.
    RealSens { values: Vec<f64>, dots: Vec<f64> },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum KernelError {
    #[error("unknown {0}")]
    UnknownEntity(Entity),

    #[error("{entity} does not support {operation}")]
    Unsupported {
        entity: Entity,
        operation: &'static str,
    },

    #[error("{entity} is degenerate and cannot be evaluated")]
    Degenerate { entity: Entity },

    #[error("parameters {params:?} do not apply to {entity}")]
    BadParams { entity: Entity, params: Params },

    #[error("surface construction failed: {0}")]
    Construction(String),

    #[error("sew failed: {0}")]
    Sew(String),
}

/// Operations the core consumes from a B-rep kernel.
pub trait GeometryKernel {
    fn bounding_box(&self, entity: Entity) -> Result<BBox, KernelError>;

    /// Nearest point on a node, edge, trimmed face or untrimmed surface.
    fn inverse_evaluate(&self, entity: Entity, point: Point3) -> Result<Projection, KernelError>;

    fn evaluate(&self, entity: Entity, params: Params) -> Result<Evaluation, KernelError>;

    fn underlying_surface(&self, face: FaceId) -> Result<SurfaceId, KernelError>;

    fn build_approximating_surface(
        &mut self,
        rows: &SurfaceRows,
        tolerance: f64,
    ) -> Result<SurfaceId, KernelError>;

    fn make_face(
        &mut self,
        surface: SurfaceId,
        orientation: FaceOrientation,
    ) -> Result<FaceId, KernelError>;

    fn sew_faces(&mut self, faces: &[FaceId], tolerance: f64) -> Result<SewResult, KernelError>;

    fn body_nodes(&self, body: BodyId) -> Result<Vec<NodeId>, KernelError>;

    fn body_edges(&self, body: BodyId) -> Result<Vec<EdgeId>, KernelError>;

    fn body_faces(&self, body: BodyId) -> Result<Vec<FaceId>, KernelError>;

    fn edge_info(&self, edge: EdgeId) -> Result<EdgeInfo, KernelError>;

    /// Faces bounded by `edge`.
    fn edge_faces(&self, edge: EdgeId) -> Result<Vec<FaceId>, KernelError>;

    /// Boundary loops of `face`, each an ordered cycle of edges with senses.
    fn face_loops(&self, face: FaceId) -> Result<Vec<Vec<(EdgeId, Sense)>>, KernelError>;

    fn face_orientation(&self, face: FaceId) -> Result<FaceOrientation, KernelError>;

    /// Surface parameters on `face` of the point at parameter `t` of `edge`.
    fn edge_uv(&self, face: FaceId, edge: EdgeId, sense: Sense, t: f64)
    -> Result<(f64, f64), KernelError>;

    fn arc_length(&self, edge: EdgeId, t0: f64, t1: f64) -> Result<f64, KernelError>;

    fn attribute(&self, entity: Entity, name: &str) -> Option<&AttrValue>;

    fn attribute_names(&self, entity: Entity) -> Vec<String>;

    fn set_attribute(
        &mut self,
        entity: Entity,
        name: &str,
        value: AttrValue,
    ) -> Result<(), KernelError>;

    /// Coordinates of a node.
    fn node_point(&self, node: NodeId) -> Result<Point3, KernelError> {
        self.evaluate(Entity::Node(node), Params::None)
            .map(|eval| eval.point)
    }

    /// Outward unit normal of `face` at `(u, v)`.
    fn face_normal(&self, face: FaceId, u: f64, v: f64) -> Result<Vec3, KernelError> {
        let eval = self.evaluate(Entity::Face(face), Params::Surface(u, v))?;
        let orientation = self.face_orientation(face)?;
        eval.du
            .cross(eval.dv)
            .normalized()
            .map(|n| n.mul_scalar(orientation.sign()))
            .ok_or(KernelError::Degenerate {
                entity: Entity::Face(face),
            })
    }
}
