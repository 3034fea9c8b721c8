//! Entity correspondence between two bodies and attribute transfer.
//!
//! Matching cascades: nodes by position, then edges whose end nodes are
//! matched and whose midpoints agree, then faces whose boxes agree and whose
//! centres project onto each other. Each entity of the second body is claimed
//! at most once; the first candidate in body order wins.

use serde::Serialize;
use thiserror::Error;

use crate::geom::Point3;
use crate::kernel::{
    BodyId, EdgeId, Entity, FaceId, GeometryKernel, KernelError, NodeId, Params, Sense,
};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("match tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f64),

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchOptions {
    pub tolerance: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl MatchOptions {
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Matched pairs, `(entity of A, entity of B)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BodyMatches {
    pub nodes: Vec<(NodeId, NodeId)>,
    pub edges: Vec<(EdgeId, EdgeId)>,
    pub faces: Vec<(FaceId, FaceId)>,
}

impl BodyMatches {
    #[must_use]
    pub fn node_partner(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.iter().find(|(a, _)| *a == node).map(|(_, b)| *b)
    }

    /// All matched pairs as generic entities.
    pub fn entity_pairs(&self) -> impl Iterator<Item = (Entity, Entity)> + '_ {
        let nodes = self
            .nodes
            .iter()
            .map(|&(a, b)| (Entity::Node(a), Entity::Node(b)));
        let edges = self
            .edges
            .iter()
            .map(|&(a, b)| (Entity::Edge(a), Entity::Edge(b)));
        let faces = self
            .faces
            .iter()
            .map(|&(a, b)| (Entity::Face(a), Entity::Face(b)));
        nodes.chain(edges).chain(faces)
    }
}

fn within<K: GeometryKernel + ?Sized>(
    kernel: &K,
    entity: Entity,
    point: Point3,
    tol: f64,
) -> Result<bool, KernelError> {
    let projection = kernel.inverse_evaluate(entity, point)?;
    Ok(projection.point.distance_to(point) <= tol)
}

pub fn match_bodies<K: GeometryKernel + ?Sized>(
    kernel: &K,
    body_a: BodyId,
    body_b: BodyId,
    options: &MatchOptions,
) -> Result<BodyMatches, MatchError> {
    let tol = options.tolerance;
    if !tol.is_finite() || tol <= 0.0 {
        return Err(MatchError::InvalidTolerance(tol));
    }
    let mut matches = BodyMatches::default();

    let nodes_b = kernel.body_nodes(body_b)?;
    let mut claimed = vec![false; nodes_b.len()];
    for node_a in kernel.body_nodes(body_a)? {
        let pa = kernel.node_point(node_a)?;
        for (slot, &node_b) in nodes_b.iter().enumerate() {
            if !claimed[slot] && kernel.node_point(node_b)?.distance_to(pa) <= tol {
                claimed[slot] = true;
                matches.nodes.push((node_a, node_b));
                break;
            }
        }
    }

    let edges_b = kernel.body_edges(body_b)?;
    let mut claimed = vec![false; edges_b.len()];
    for edge_a in kernel.body_edges(body_a)? {
        let info_a = kernel.edge_info(edge_a)?;
        let ends = info_a.nodes.map(|n| matches.node_partner(n));
        let [Some(start), Some(end)] = ends else {
            continue;
        };
        let midpoint = if info_a.degenerate {
            None
        } else {
            let t = info_a.param_at(0.5, Sense::Forward);
            Some(kernel.evaluate(Entity::Edge(edge_a), Params::Curve(t))?.point)
        };

        for (slot, &edge_b) in edges_b.iter().enumerate() {
            if claimed[slot] {
                continue;
            }
            let info_b = kernel.edge_info(edge_b)?;
            let same_ends = info_b.nodes == [start, end] || info_b.nodes == [end, start];
            if !same_ends || info_b.degenerate != info_a.degenerate {
                continue;
            }
            let agrees = match midpoint {
                Some(p) => within(kernel, Entity::Edge(edge_b), p, tol)?,
                None => true,
            };
            if agrees {
                claimed[slot] = true;
                matches.edges.push((edge_a, edge_b));
                break;
            }
        }
    }

    let faces_b = kernel.body_faces(body_b)?;
    let boxes_b = faces_b
        .iter()
        .map(|&f| kernel.bounding_box(Entity::Face(f)))
        .collect::<Result<Vec<_>, _>>()?;
    let mut claimed = vec![false; faces_b.len()];
    for face_a in kernel.body_faces(body_a)? {
        let box_a = kernel.bounding_box(Entity::Face(face_a))?;
        let centre = kernel
            .inverse_evaluate(Entity::Face(face_a), box_a.center())?
            .point;
        for (slot, &face_b) in faces_b.iter().enumerate() {
            if claimed[slot] || !box_a.approx_eq(boxes_b[slot], tol) {
                continue;
            }
            if within(kernel, Entity::Face(face_b), centre, tol)? {
                claimed[slot] = true;
                matches.faces.push((face_a, face_b));
                break;
            }
        }
    }

    log::debug!(
        "matched {body_a} to {body_b}: {} nodes, {} edges, {} faces",
        matches.nodes.len(),
        matches.edges.len(),
        matches.faces.len()
    );
    Ok(matches)
}

/// Copies attributes of every matched A entity onto its B partner, optionally
/// restricted to `names`. Returns the number of attributes written.
pub fn transfer_attributes<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    matches: &BodyMatches,
    names: Option<&[&str]>,
) -> Result<usize, KernelError> {
    let mut written = 0;
    for (from, to) in matches.entity_pairs() {
        for name in kernel.attribute_names(from) {
            if names.is_some_and(|wanted| !wanted.contains(&name.as_str())) {
                continue;
            }
            if let Some(value) = kernel.attribute(from, &name).cloned() {
                kernel.set_attribute(to, &name, value)?;
                written += 1;
            }
        }
    }
    Ok(written)
}
