//! Cross-boundary slopes along loop edges.
//!
//! A slope is the unit vector lying in the kept face, perpendicular to the
//! edge, pointing out of the face across the boundary. Transition surfaces
//! leave side A along its slopes and arrive at side B against its slopes.

use serde::Serialize;

use crate::geom::{Point3, Vec3};
use crate::kernel::{EdgeId, Entity, GeometryKernel, KernelError, NodeId, Params};

use super::profile::EdgeProfile;
use super::{BlendError, BlendLoop, BlendStage, CornerFade, LoopEdge};

/// Direction components below this mark the tangent planes as parallel.
const PLANE_PARALLEL_TOL: f64 = 1e-3;
const RELAX_PASSES: usize = 100;
const RELAX_TOL: f64 = 1e-6;
const SINGULAR_DET: f64 = 1e-12;

/// In-face slopes and outward face normals at the samples of one loop edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSlopes {
    pub slopes: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

/// Slopes evaluated at parameters `ts` of `le`.
pub fn sample_edge_slopes<K: GeometryKernel + ?Sized>(
    kernel: &K,
    le: &LoopEdge,
    ts: &[f64],
) -> Result<EdgeSlopes, BlendError> {
    let err = BlendError::kernel(BlendStage::SlopesComputed);
    let mut slopes = Vec::with_capacity(ts.len());
    let mut normals = Vec::with_capacity(ts.len());
    for &t in ts {
        let tangent = kernel
            .evaluate(Entity::Edge(le.edge), Params::Curve(t))
            .map_err(&err)?
            .du;
        let (u, v) = kernel
            .edge_uv(le.face, le.edge, le.face_sense, t)
            .map_err(&err)?;
        let normal = kernel.face_normal(le.face, u, v).map_err(&err)?;
        let slope = tangent
            .mul_scalar(le.face_sense.sign())
            .cross(normal)
            .normalized()
            .ok_or_else(|| {
                err(KernelError::Degenerate {
                    entity: Entity::Edge(le.edge),
                })
            })?;
        slopes.push(slope);
        normals.push(normal);
    }
    Ok(EdgeSlopes { slopes, normals })
}

/// Blends each edge's slopes toward the corner directions at both its ends.
///
/// `corners[k]` is the direction shared by the end of edge `k` and the start
/// of edge `k + 1`. The correction at a corner is carried into the edge with
/// weight `fade(x)`, `x` running from 0 at the far end to 1 at the corner, and
/// every slope is renormalised afterwards.
pub fn fade_corners(rows: &mut [Vec<Vec3>], corners: &[Vec3], fade: CornerFade) {
    let n = rows.len();
    if n == 0 || corners.len() != n {
        return;
    }
    let deltas: Vec<(Vec3, Vec3)> = (0..n)
        .map(|k| {
            let row = &rows[k];
            let (Some(&first), Some(&last)) = (row.first(), row.last()) else {
                return (Vec3::ZERO, Vec3::ZERO);
            };
            (corners[(k + n - 1) % n] - first, corners[k] - last)
        })
        .collect();

    for (row, (start_delta, end_delta)) in rows.iter_mut().zip(deltas) {
        let last = row.len().saturating_sub(1).max(1) as f64;
        for (j, slope) in row.iter_mut().enumerate() {
            let x = j as f64 / last;
            let corrected = *slope + start_delta * fade.weight(1.0 - x) + end_delta * fade.weight(x);
            *slope = corrected.normalized_or_self();
        }
    }
}

/// Unit tangent of `edge` at `node`, pointing away from it.
fn tangent_leaving<K: GeometryKernel + ?Sized>(
    kernel: &K,
    edge: EdgeId,
    node: NodeId,
) -> Result<Option<Vec3>, KernelError> {
    let info = kernel.edge_info(edge)?;
    let (t, sign) = if info.nodes[0] == node {
        (info.range.0, 1.0)
    } else if info.nodes[1] == node {
        (info.range.1, -1.0)
    } else {
        return Ok(None);
    };
    let du = kernel.evaluate(Entity::Edge(edge), Params::Curve(t))?.du;
    Ok(du.mul_scalar(sign).normalized())
}

/// Direction shared by both slopes meeting at corner `k` of `lp`.
///
/// Inside one face the corner takes the normalised sum of the two slopes.
/// Across two faces it follows the edge that leaves the corner between them,
/// oriented to agree with that sum.
fn corner_direction<K: GeometryKernel + ?Sized>(
    kernel: &K,
    lp: &BlendLoop,
    k: usize,
    end_slope: Vec3,
    start_slope: Vec3,
    warnings: &mut Vec<String>,
) -> Result<Vec3, BlendError> {
    let err = BlendError::kernel(BlendStage::SlopesComputed);
    let n = lp.len();
    let (here, next) = (lp.edges[k], lp.edges[(k + 1) % n]);
    let sum = end_slope + start_slope;
    if here.face == next.face {
        return Ok(sum.normalized_or_self());
    }

    let node = kernel.edge_info(here.edge).map_err(&err)?.end_node(here.sense);
    let in_loop = |edge: EdgeId| lp.edges.iter().any(|le| le.edge == edge);
    let next_edges: Vec<EdgeId> = kernel
        .face_loops(next.face)
        .map_err(&err)?
        .into_iter()
        .flatten()
        .map(|(edge, _)| edge)
        .collect();
    let shared = kernel
        .face_loops(here.face)
        .map_err(&err)?
        .into_iter()
        .flatten()
        .map(|(edge, _)| edge)
        .find(|&edge| !in_loop(edge) && next_edges.contains(&edge));

    let direction = match shared {
        Some(edge) => tangent_leaving(kernel, edge, node).map_err(&err)?,
        None => None,
    };
    match direction {
        Some(dir) if dir.dot(sum) < 0.0 => Ok(-dir),
        Some(dir) => Ok(dir),
        None => {
            let message = format!(
                "no edge between {} and {} at corner {k}; using the averaged slope",
                here.face, next.face
            );
            log::warn!("{message}");
            warnings.push(message);
            Ok(sum.normalized_or_self())
        }
    }
}

/// Unifies the slopes of adjacent edges at every corner of `lp` and fades the
/// correction along each edge. Returns the warnings raised on the way.
pub fn correct_corner_slopes<K: GeometryKernel + ?Sized>(
    kernel: &K,
    lp: &BlendLoop,
    slopes: &mut [EdgeSlopes],
    fade: CornerFade,
) -> Result<Vec<String>, BlendError> {
    let n = lp.len();
    if slopes.len() != n || slopes.iter().any(|s| s.slopes.is_empty()) {
        return Err(BlendError::InvalidOption(format!(
            "corner correction needs non-empty slopes for all {n} edges"
        )));
    }

    let mut warnings = Vec::new();
    let mut corners = Vec::with_capacity(n);
    for k in 0..n {
        let end_slope = slopes[k].slopes[slopes[k].slopes.len() - 1];
        let start_slope = slopes[(k + 1) % n].slopes[0];
        corners.push(corner_direction(
            kernel,
            lp,
            k,
            end_slope,
            start_slope,
            &mut warnings,
        )?);
    }

    let mut rows: Vec<Vec<Vec3>> = slopes.iter().map(|s| s.slopes.clone()).collect();
    fade_corners(&mut rows, &corners, fade);
    for (edge, row) in slopes.iter_mut().zip(rows) {
        edge.slopes = row;
    }
    Ok(warnings)
}

/// Corner directions taken as the normalised sum of the slopes meeting there.
pub(crate) fn averaged_corners(rows: &[Vec<Vec3>]) -> Vec<Vec3> {
    let n = rows.len();
    (0..n)
        .map(|k| {
            let end = rows[k].last().copied().unwrap_or(Vec3::ZERO);
            let start = rows[(k + 1) % n].first().copied().unwrap_or(Vec3::ZERO);
            (end + start).normalized_or_self()
        })
        .collect()
}

/// Final slopes and tangent lengths for one edge pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideSlopes {
    pub slopes_a: Vec<Vec3>,
    pub slopes_b: Vec<Vec3>,
    /// Tangent length leaving side A, before the slope multiplier.
    pub reach_a: Vec<f64>,
    pub reach_b: Vec<f64>,
    /// Outward normals of side A's kept face at the samples.
    pub normals_a: Vec<Vec3>,
    /// Relaxed guide points, for the plane-intersection method only.
    pub guide: Vec<Point3>,
    pub passes: usize,
    pub warnings: Vec<String>,
}

impl GuideSlopes {
    /// Slopes used as given, reaching across the straight gap.
    pub(crate) fn direct(profile: &EdgeProfile, a: &EdgeSlopes, b: &EdgeSlopes) -> Self {
        let reach: Vec<f64> = (0..profile.len()).map(|i| profile.gap(i)).collect();
        Self {
            slopes_a: a.slopes.clone(),
            slopes_b: b.slopes.clone(),
            reach_a: reach.clone(),
            reach_b: reach,
            normals_a: a.normals.clone(),
            guide: Vec::new(),
            passes: 0,
            warnings: Vec::new(),
        }
    }
}

/// Line where the tangent planes at `pa` and `pb` meet, as a base point and
/// unit direction. `None` when the planes are parallel.
fn plane_line(pa: Point3, na: Vec3, pb: Point3, nb: Vec3) -> Option<(Point3, Vec3)> {
    let dir = na.cross(nb);
    let fixed = (0..3).max_by(|&i, &j| dir.axis(i).abs().total_cmp(&dir.axis(j).abs()))?;
    if dir.axis(fixed).abs() < PLANE_PARALLEL_TOL {
        return None;
    }

    // Solve both plane equations with the fixed coordinate pinned to zero.
    let (j, k) = ((fixed + 1) % 3, (fixed + 2) % 3);
    let (da, db) = (na.dot(pa.to_vec3()), nb.dot(pb.to_vec3()));
    let det = na.axis(j) * nb.axis(k) - na.axis(k) * nb.axis(j);
    let xj = (da * nb.axis(k) - db * na.axis(k)) / det;
    let xk = (na.axis(j) * db - nb.axis(j) * da) / det;

    let mut base = [0.0; 3];
    base[j] = xj;
    base[k] = xk;
    Some((Point3::from(base), dir.normalized_or_self()))
}

/// Aims both slopes at guide points on the intersection of the two tangent
/// planes.
///
/// Each guide point starts at the spot on its line closest to the midpoint of
/// the gap. Interior guide points are then relaxed, Gauss-Seidel style, toward
/// the midpoint of their neighbours while staying on their lines; the corner
/// guide points stay fixed.
pub fn compute_plane_intersection_guide(
    edge: usize,
    profile: &EdgeProfile,
    a: &EdgeSlopes,
    b: &EdgeSlopes,
) -> Result<GuideSlopes, BlendError> {
    let n = profile.len();
    let mut lines = Vec::with_capacity(n);
    let mut offsets = Vec::with_capacity(n);
    for i in 0..n {
        let (pa, pb) = (profile.pnt_a[i], profile.pnt_b[i]);
        let (base, dir) = plane_line(pa, a.normals[i], pb, b.normals[i])
            .ok_or(BlendError::SingularPlaneIntersection { edge, sample: i })?;
        offsets.push(pa.midpoint(pb).sub_point(base).dot(dir));
        lines.push((base, dir));
    }
    let at = |i: usize, s: f64| lines[i].0.add_vec(lines[i].1.mul_scalar(s));

    let mut passes = 0;
    while passes < RELAX_PASSES && n > 2 {
        passes += 1;
        let mut worst: f64 = 0.0;
        for i in 1..n - 1 {
            let target = at(i - 1, offsets[i - 1]).midpoint(at(i + 1, offsets[i + 1]));
            let s = target.sub_point(lines[i].0).dot(lines[i].1);
            worst = worst.max((s - offsets[i]).abs());
            offsets[i] = s;
        }
        if worst < RELAX_TOL {
            break;
        }
    }

    let guide: Vec<Point3> = (0..n).map(|i| at(i, offsets[i])).collect();
    let aim = |from: Point3, to: Point3, fallback: Vec3| {
        to.sub_point(from).normalized().unwrap_or(fallback)
    };
    let slopes_a = (0..n)
        .map(|i| aim(profile.pnt_a[i], guide[i], a.slopes[i]))
        .collect();
    let slopes_b = (0..n)
        .map(|i| aim(profile.pnt_b[i], guide[i], b.slopes[i]))
        .collect();
    let reach: Vec<f64> = (0..n).map(|i| profile.gap(i)).collect();

    log::debug!("edge {edge}: guide relaxed in {passes} pass(es)");
    Ok(GuideSlopes {
        slopes_a,
        slopes_b,
        reach_a: reach.clone(),
        reach_b: reach,
        normals_a: a.normals.clone(),
        guide,
        passes,
        warnings: Vec::new(),
    })
}

/// Projects the gap vector into each tangent plane and sizes the tangents
/// from the least-squares meeting point of the two projected rays.
///
/// The rays `pa + alpha * da` and `pb + beta * db` meet (or pass closest) at
/// `alpha`, `beta`; the tangents reach `2 alpha` and `2 beta`. A singular
/// system or a meeting point behind either side falls back to the straight
/// gap length.
#[must_use]
pub fn compute_projection_guide(
    edge: usize,
    profile: &EdgeProfile,
    a: &EdgeSlopes,
    b: &EdgeSlopes,
) -> GuideSlopes {
    let n = profile.len();
    let mut out = GuideSlopes {
        slopes_a: Vec::with_capacity(n),
        slopes_b: Vec::with_capacity(n),
        reach_a: Vec::with_capacity(n),
        reach_b: Vec::with_capacity(n),
        normals_a: a.normals.clone(),
        guide: Vec::new(),
        passes: 0,
        warnings: Vec::new(),
    };
    let mut fallbacks = 0;

    for i in 0..n {
        let d = profile.pnt_b[i].sub_point(profile.pnt_a[i]);
        let (na, nb) = (a.normals[i], b.normals[i]);
        let da = (d - na * d.dot(na)).normalized().unwrap_or(a.slopes[i]);
        let db = (-d - nb * (-d).dot(nb)).normalized().unwrap_or(b.slopes[i]);

        let (aa, ab, bb) = (da.dot(da), da.dot(db), db.dot(db));
        let (ra, rb) = (da.dot(d), db.dot(d));
        // alpha * aa - beta * ab = ra
        // alpha * ab - beta * bb = rb
        let det = -aa * bb + ab * ab;
        let solved = (det.abs() > SINGULAR_DET).then(|| {
            let alpha = (-ra * bb + ab * rb) / det;
            let beta = (aa * rb - ab * ra) / det;
            (alpha, beta)
        });
        let (reach_a, reach_b) = match solved {
            Some((alpha, beta)) if alpha > 0.0 && beta > 0.0 => (2.0 * alpha, 2.0 * beta),
            _ => {
                fallbacks += 1;
                (d.length(), d.length())
            }
        };

        out.slopes_a.push(da);
        out.slopes_b.push(db);
        out.reach_a.push(reach_a);
        out.reach_b.push(reach_b);
    }

    if fallbacks > 0 {
        let message = format!(
            "edge {edge}: {fallbacks} of {n} samples had no ray intersection; using the gap length"
        );
        log::warn!("{message}");
        out.warnings.push(message);
    }
    out
}
