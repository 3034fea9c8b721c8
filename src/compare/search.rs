//! Nearest-feature distance from a point to a captured solid.
//!
//! Nodes are scanned first (they are cheap), then edges, then faces; every
//! record whose box, grown by the current best distance, does not contain the
//! query point is skipped without a kernel call. The best distance only ever
//! shrinks, so a record rejected early could not have won later either.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::geom::{BBox, Point3};
use crate::kernel::{BodyId, EdgeId, Entity, FaceId, GeometryKernel, KernelError, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchPhase {
    Node,
    Edge,
    Face,
    Refine,
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Face => "face",
            Self::Refine => "surface refinement",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query point {0:?} is not finite")]
    NonFinitePoint(Point3),

    #[error("{phase} phase failed at record {index}: {source}")]
    Kernel {
        phase: SearchPhase,
        index: usize,
        #[source]
        source: KernelError,
    },

    #[error("snapshot capture failed: {0}")]
    Capture(#[from] KernelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeRecord {
    pub node: NodeId,
    pub point: Point3,
}

impl NodeRecord {
    /// A node is its own bounding box.
    #[must_use]
    pub const fn bbox(&self) -> BBox {
        BBox::from_point(self.point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeRecord {
    pub edge: EdgeId,
    pub bbox: BBox,
    /// Zero-length edges never take part in a search.
    pub degenerate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceRecord {
    pub face: FaceId,
    pub bbox: BBox,
}

/// Read-only records of one solid, captured once and shared by every query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolidSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub faces: Vec<FaceRecord>,
}

impl SolidSnapshot {
    pub fn capture<K: GeometryKernel + ?Sized>(
        kernel: &K,
        body: BodyId,
    ) -> Result<Self, KernelError> {
        let mut snapshot = Self::default();
        for node in kernel.body_nodes(body)? {
            snapshot.nodes.push(NodeRecord {
                node,
                point: kernel.node_point(node)?,
            });
        }
        for edge in kernel.body_edges(body)? {
            snapshot.edges.push(EdgeRecord {
                edge,
                bbox: kernel.bounding_box(Entity::Edge(edge))?,
                degenerate: kernel.edge_info(edge)?.degenerate,
            });
        }
        for face in kernel.body_faces(body)? {
            snapshot.faces.push(FaceRecord {
                face,
                bbox: kernel.bounding_box(Entity::Face(face))?,
            });
        }
        log::debug!(
            "captured {body}: {} nodes, {} edges, {} faces",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            snapshot.faces.len()
        );
        Ok(snapshot)
    }

    #[must_use]
    pub const fn from_records(
        nodes: Vec<NodeRecord>,
        edges: Vec<EdgeRecord>,
        faces: Vec<FaceRecord>,
    ) -> Self {
        Self {
            nodes,
            edges,
            faces,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.faces.is_empty()
    }
}

/// Tuning of the untrimmed-surface refinement that follows the face phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchOptions {
    pub refine: bool,
    /// Refinement is only tried when the best distance exceeds this.
    pub refine_threshold: f64,
    /// The surface distance must undercut `refine_ratio * best` to be accepted.
    pub refine_ratio: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            refine: true,
            refine_threshold: 1e-3,
            refine_ratio: 0.99,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    #[must_use]
    pub fn with_refine_threshold(mut self, threshold: f64) -> Self {
        self.refine_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_refine_ratio(mut self, ratio: f64) -> Self {
        self.refine_ratio = ratio;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceResult {
    /// `f64::INFINITY` for an empty snapshot.
    pub distance: f64,
    /// Index into [`SolidSnapshot::faces`] of the best face, if any face was
    /// evaluated.
    pub face_index: Option<usize>,
    pub nearest: Option<Point3>,
    /// The untrimmed surface overrode the trimmed-face answer.
    pub refined: bool,
}

impl DistanceResult {
    #[must_use]
    pub fn face(&self, snapshot: &SolidSnapshot) -> Option<FaceId> {
        self.face_index
            .and_then(|i| snapshot.faces.get(i))
            .map(|record| record.face)
    }
}

/// Per-query state; `dbest` only decreases.
struct QueryState {
    dbest: f64,
    ifbest: Option<usize>,
    nearest: Option<Point3>,
}

impl QueryState {
    const fn new() -> Self {
        Self {
            dbest: f64::INFINITY,
            ifbest: None,
            nearest: None,
        }
    }

    /// First candidate reaching a new minimum wins.
    fn offer(&mut self, point: Point3, candidate: Point3) -> bool {
        let d = point.distance_to(candidate);
        if d < self.dbest {
            self.dbest = d;
            self.nearest = Some(candidate);
            true
        } else {
            false
        }
    }
}

/// Minimum distance from `point` to any node, edge or face of `snapshot`.
pub fn distance_to_solid<K: GeometryKernel + ?Sized>(
    kernel: &K,
    snapshot: &SolidSnapshot,
    point: Point3,
    options: &SearchOptions,
) -> Result<DistanceResult, SearchError> {
    search(kernel, snapshot, point, options, true)
}

/// Same answer as [`distance_to_solid`] without bounding-box pruning: every
/// non-degenerate record is inverse-evaluated.
pub fn distance_to_solid_exhaustive<K: GeometryKernel + ?Sized>(
    kernel: &K,
    snapshot: &SolidSnapshot,
    point: Point3,
    options: &SearchOptions,
) -> Result<DistanceResult, SearchError> {
    search(kernel, snapshot, point, options, false)
}

fn search<K: GeometryKernel + ?Sized>(
    kernel: &K,
    snapshot: &SolidSnapshot,
    point: Point3,
    options: &SearchOptions,
    prune: bool,
) -> Result<DistanceResult, SearchError> {
    if !point.is_finite() {
        return Err(SearchError::NonFinitePoint(point));
    }

    let mut state = QueryState::new();
    let skip = |bbox: BBox, dbest: f64| prune && bbox.rejects(point, dbest);

    for record in &snapshot.nodes {
        if skip(record.bbox(), state.dbest) {
            continue;
        }
        state.offer(point, record.point);
    }

    for (index, record) in snapshot.edges.iter().enumerate() {
        if record.degenerate || skip(record.bbox, state.dbest) {
            continue;
        }
        let projection = kernel
            .inverse_evaluate(Entity::Edge(record.edge), point)
            .map_err(|source| SearchError::Kernel {
                phase: SearchPhase::Edge,
                index,
                source,
            })?;
        state.offer(point, projection.point);
    }

    for (index, record) in snapshot.faces.iter().enumerate() {
        if skip(record.bbox, state.dbest) {
            continue;
        }
        let projection = kernel
            .inverse_evaluate(Entity::Face(record.face), point)
            .map_err(|source| SearchError::Kernel {
                phase: SearchPhase::Face,
                index,
                source,
            })?;
        if state.offer(point, projection.point) {
            state.ifbest = Some(index);
        }
    }

    let mut refined = false;
    let wants_refine = options.refine && state.dbest > options.refine_threshold;
    if let Some(index) = state.ifbest.filter(|_| wants_refine) {
        let refine_err = |source| SearchError::Kernel {
            phase: SearchPhase::Refine,
            index,
            source,
        };
        let face = snapshot.faces[index].face;
        let surface = kernel.underlying_surface(face).map_err(refine_err)?;
        let projection = kernel
            .inverse_evaluate(Entity::Surface(surface), point)
            .map_err(refine_err)?;
        let d = point.distance_to(projection.point);
        if d < options.refine_ratio * state.dbest {
            log::warn!(
                "{face}: untrimmed surface is closer than the trimmed face ({d:.6e} < {:.6e}) at {point:?}",
                state.dbest
            );
            state.dbest = d;
            state.nearest = Some(projection.point);
            refined = true;
        }
    }

    Ok(DistanceResult {
        distance: state.dbest,
        face_index: state.ifbest,
        nearest: state.nearest,
        refined,
    })
}
