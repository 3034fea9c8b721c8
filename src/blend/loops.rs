//! Exposed-loop extraction and twist-minimising alignment.

use serde::Serialize;

use crate::geom::Point3;
use crate::kernel::{BodyId, Entity, FaceId, GeometryKernel, NodeId, Params};

use super::{BlendError, BlendLoop, BlendStage, LoopEdge};

/// Faces of `bodies` not tagged with `marker`, in body order.
pub(crate) fn kept_faces<K: GeometryKernel + ?Sized>(
    kernel: &K,
    bodies: &[BodyId],
    marker: &str,
) -> Result<Vec<FaceId>, BlendError> {
    let mut kept = Vec::new();
    for &body in bodies {
        let faces = kernel
            .body_faces(body)
            .map_err(BlendError::kernel(BlendStage::LoopsExtracted))?;
        kept.extend(
            faces
                .into_iter()
                .filter(|&f| kernel.attribute(Entity::Face(f), marker).is_none()),
        );
    }
    Ok(kept)
}

/// Exposed loops of `body` once faces tagged `marker` are removed.
///
/// An edge is exposed when exactly one kept face borders it. Exposed edges
/// are chained in the direction their kept face walks them. Degenerate edges
/// never appear in a loop.
pub fn extract_exposed_loops<K: GeometryKernel + ?Sized>(
    kernel: &K,
    body: BodyId,
    marker: &str,
) -> Result<Vec<BlendLoop>, BlendError> {
    let err = BlendError::kernel(BlendStage::LoopsExtracted);
    let kept = kept_faces(kernel, &[body], marker)?;

    // (edge, start node, end node) in the face's walking direction.
    let mut exposed: Vec<(LoopEdge, NodeId, NodeId)> = Vec::new();
    for &face in &kept {
        for (edge, face_sense) in kernel.face_loops(face).map_err(&err)?.into_iter().flatten() {
            let info = kernel.edge_info(edge).map_err(&err)?;
            if info.degenerate {
                continue;
            }
            let bordering = kernel
                .edge_faces(edge)
                .map_err(&err)?
                .into_iter()
                .filter(|f| kept.contains(f))
                .count();
            if bordering == 1 && !exposed.iter().any(|(le, _, _)| le.edge == edge) {
                let le = LoopEdge {
                    edge,
                    sense: face_sense,
                    face,
                    face_sense,
                };
                exposed.push((le, info.start_node(face_sense), info.end_node(face_sense)));
            }
        }
    }

    let mut used = vec![false; exposed.len()];
    let mut loops = Vec::new();
    while let Some(first) = used.iter().position(|u| !u) {
        used[first] = true;
        let (head, loop_start, mut at) = exposed[first];
        let mut chain = vec![head];

        while at != loop_start {
            let unused = |i: &usize| !used[*i];
            let step = (0..exposed.len())
                .filter(unused)
                .find(|&i| exposed[i].1 == at)
                .map(|i| (i, false))
                .or_else(|| {
                    (0..exposed.len())
                        .filter(unused)
                        .find(|&i| exposed[i].2 == at)
                        .map(|i| (i, true))
                });
            let Some((i, flip)) = step else {
                return Err(BlendError::OpenLoop { edge: head.edge });
            };
            used[i] = true;
            let (le, start, end) = exposed[i];
            if flip {
                chain.push(le.reversed());
                at = start;
            } else {
                chain.push(le);
                at = end;
            }
        }
        loops.push(BlendLoop { edges: chain });
    }

    log::debug!(
        "{body}: {} exposed edges in {} loop(s)",
        exposed.len(),
        loops.len()
    );
    Ok(loops)
}

/// Points characterising a loop edge in its walking direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeKeys {
    pub start: Point3,
    pub mid: Point3,
    pub end: Point3,
}

impl EdgeKeys {
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            start: self.end,
            mid: self.mid,
            end: self.start,
        }
    }
}

pub fn edge_keys<K: GeometryKernel + ?Sized>(
    kernel: &K,
    lp: &BlendLoop,
) -> Result<Vec<EdgeKeys>, BlendError> {
    let err = BlendError::kernel(BlendStage::EdgesAligned);
    lp.edges
        .iter()
        .map(|le| {
            let info = kernel.edge_info(le.edge).map_err(&err)?;
            let at = |fraction: f64| {
                kernel
                    .evaluate(
                        Entity::Edge(le.edge),
                        Params::Curve(info.param_at(fraction, le.sense)),
                    )
                    .map(|e| e.point)
                    .map_err(&err)
            };
            Ok(EdgeKeys {
                start: at(0.0)?,
                mid: at(0.5)?,
                end: at(1.0)?,
            })
        })
        .collect()
}

/// One of the `2n` ways to pair loop B with loop A.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Alignment {
    /// Edge `i` of A pairs with edge `(shift + i) % n` of B, or
    /// `(shift - i) mod n` walked backwards when `reversed`.
    pub shift: usize,
    pub reversed: bool,
    pub cost: f64,
}

impl Alignment {
    #[must_use]
    pub const fn index(&self, i: usize, n: usize) -> usize {
        if self.reversed {
            (self.shift + n - i % n) % n
        } else {
            (self.shift + i) % n
        }
    }
}

/// Summed start and midpoint distances of A against B under one alignment.
#[must_use]
pub fn alignment_cost(a: &[EdgeKeys], b: &[EdgeKeys], shift: usize, reversed: bool) -> f64 {
    let n = b.len();
    let candidate = Alignment {
        shift,
        reversed,
        cost: 0.0,
    };
    a.iter()
        .enumerate()
        .map(|(i, ka)| {
            let kb = b[candidate.index(i, n)];
            let kb = if reversed { kb.reversed() } else { kb };
            ka.start.distance_to(kb.start) + ka.mid.distance_to(kb.mid)
        })
        .sum()
}

/// Cheapest of the `2n` alignments. Shifts are tried in order, forward before
/// reversed, and only a strictly cheaper candidate replaces the incumbent.
#[must_use]
pub fn best_alignment(a: &[EdgeKeys], b: &[EdgeKeys]) -> Alignment {
    let mut best = Alignment {
        shift: 0,
        reversed: false,
        cost: f64::INFINITY,
    };
    for shift in 0..b.len() {
        for reversed in [false, true] {
            let cost = alignment_cost(a, b, shift, reversed);
            if cost < best.cost {
                best = Alignment {
                    shift,
                    reversed,
                    cost,
                };
            }
        }
    }
    best
}

/// Rebuilds `loop_b` so that its edge `i` pairs with edge `i` of `loop_a`.
pub fn reorder_for_minimal_twist<K: GeometryKernel + ?Sized>(
    kernel: &K,
    loop_a: &BlendLoop,
    loop_b: &BlendLoop,
) -> Result<(BlendLoop, Alignment), BlendError> {
    let n = loop_a.len();
    if loop_b.len() != n {
        return Err(BlendError::EdgeCountMismatch {
            a: n,
            b: loop_b.len(),
        });
    }

    let keys_a = edge_keys(kernel, loop_a)?;
    let keys_b = edge_keys(kernel, loop_b)?;
    let alignment = best_alignment(&keys_a, &keys_b);

    let edges = (0..n)
        .map(|i| {
            let le = loop_b.edges[alignment.index(i, n)];
            if alignment.reversed { le.reversed() } else { le }
        })
        .collect();
    log::debug!(
        "aligned loops of {n} edges: shift {}, reversed {}, cost {:.6e}",
        alignment.shift,
        alignment.reversed,
        alignment.cost
    );
    Ok((BlendLoop { edges }, alignment))
}
