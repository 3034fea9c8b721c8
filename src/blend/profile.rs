//! Sample correspondence along a pair of loop edges.

use serde::Serialize;

use crate::geom::Point3;
use crate::kernel::{Entity, GeometryKernel, Params, Sense};

use super::{BlendError, BlendStage, LoopEdge, SampleMode};

/// Bisection stops once the fraction bracket is this narrow.
const ARC_FRACTION_TOL: f64 = 1e-7;

/// Matched samples on edge A and edge B, corners included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeProfile {
    pub t_a: Vec<f64>,
    pub pnt_a: Vec<Point3>,
    pub t_b: Vec<f64>,
    pub pnt_b: Vec<Point3>,
}

impl EdgeProfile {
    #[must_use]
    pub fn len(&self) -> usize {
        self.t_a.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.t_a.is_empty()
    }

    /// Straight-line gap between the two sides at sample `i`.
    #[must_use]
    pub fn gap(&self, i: usize) -> f64 {
        self.pnt_a[i].distance_to(self.pnt_b[i])
    }
}

fn length_from_start<K: GeometryKernel + ?Sized>(
    kernel: &K,
    le: &LoopEdge,
    range: (f64, f64),
    t: f64,
) -> Result<f64, BlendError> {
    let start = range_start(range, le);
    let (lo, hi) = if start <= t { (start, t) } else { (t, start) };
    kernel
        .arc_length(le.edge, lo, hi)
        .map(f64::abs)
        .map_err(BlendError::kernel(BlendStage::ProfilesSampled))
}

const fn range_start(range: (f64, f64), le: &LoopEdge) -> f64 {
    match le.sense {
        Sense::Forward => range.0,
        Sense::Reverse => range.1,
    }
}

/// Parameter of `le` at arc-length fraction `fraction`, measured from the
/// end the loop walks first.
pub fn arc_length_fraction<K: GeometryKernel + ?Sized>(
    kernel: &K,
    le: &LoopEdge,
    fraction: f64,
) -> Result<f64, BlendError> {
    let info = kernel
        .edge_info(le.edge)
        .map_err(BlendError::kernel(BlendStage::ProfilesSampled))?;
    let fraction = fraction.clamp(0.0, 1.0);
    let total = length_from_start(kernel, le, info.range, range_end(info.range, le))?;
    if total <= 0.0 || fraction == 0.0 || fraction == 1.0 {
        return Ok(info.param_at(fraction, le.sense));
    }

    let target = fraction * total;
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    while hi - lo > ARC_FRACTION_TOL {
        let mid = 0.5 * (lo + hi);
        let length = length_from_start(kernel, le, info.range, info.param_at(mid, le.sense))?;
        if length < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(info.param_at(0.5 * (lo + hi), le.sense))
}

const fn range_end(range: (f64, f64), le: &LoopEdge) -> f64 {
    match le.sense {
        Sense::Forward => range.1,
        Sense::Reverse => range.0,
    }
}

/// Arc-length fraction reached at parameter fraction `f` of `le`. Corners
/// map to themselves.
fn fraction_at<K: GeometryKernel + ?Sized>(
    kernel: &K,
    le: &LoopEdge,
    f: f64,
    t: f64,
) -> Result<f64, BlendError> {
    if f == 0.0 || f == 1.0 {
        return Ok(f);
    }
    let info = kernel
        .edge_info(le.edge)
        .map_err(BlendError::kernel(BlendStage::ProfilesSampled))?;
    let total = length_from_start(kernel, le, info.range, range_end(info.range, le))?;
    if total <= 0.0 {
        return Ok(0.0);
    }
    Ok(length_from_start(kernel, le, info.range, t)? / total)
}

fn parametric<K: GeometryKernel + ?Sized>(
    kernel: &K,
    le: &LoopEdge,
    fraction: f64,
) -> Result<f64, BlendError> {
    kernel
        .edge_info(le.edge)
        .map(|info| info.param_at(fraction, le.sense))
        .map_err(BlendError::kernel(BlendStage::ProfilesSampled))
}

/// Samples `npnt` corresponding parameters on `a` and `b`.
///
/// Sample `i` sits at fraction `i / (npnt - 1)` of each edge, measured either
/// in parameter or in arc length depending on `mode`. In the mixed modes the
/// arc-length side follows the arc-length fraction the parametric side
/// actually reaches, so matched samples stay at equal relative length.
pub fn sample_edge_profile<K: GeometryKernel + ?Sized>(
    kernel: &K,
    a: &LoopEdge,
    b: &LoopEdge,
    npnt: usize,
    mode: SampleMode,
) -> Result<EdgeProfile, BlendError> {
    if npnt < 2 {
        return Err(BlendError::InvalidOption(format!(
            "an edge profile needs at least 2 samples, got {npnt}"
        )));
    }

    let mut t_a = Vec::with_capacity(npnt);
    let mut t_b = Vec::with_capacity(npnt);
    for i in 0..npnt {
        let f = i as f64 / (npnt - 1) as f64;
        let (ta, tb) = match mode {
            SampleMode::ParametricBoth => (parametric(kernel, a, f)?, parametric(kernel, b, f)?),
            SampleMode::ArcLengthBoth => (
                arc_length_fraction(kernel, a, f)?,
                arc_length_fraction(kernel, b, f)?,
            ),
            SampleMode::ParametricAArcB => {
                let ta = parametric(kernel, a, f)?;
                let reached = fraction_at(kernel, a, f, ta)?;
                (ta, arc_length_fraction(kernel, b, reached)?)
            }
            SampleMode::ArcAParametricB => {
                let tb = parametric(kernel, b, f)?;
                let reached = fraction_at(kernel, b, f, tb)?;
                (arc_length_fraction(kernel, a, reached)?, tb)
            }
        };
        t_a.push(ta);
        t_b.push(tb);
    }

    let points = |le: &LoopEdge, ts: &[f64]| -> Result<Vec<Point3>, BlendError> {
        ts.iter()
            .map(|&t| {
                kernel
                    .evaluate(Entity::Edge(le.edge), Params::Curve(t))
                    .map(|e| e.point)
                    .map_err(BlendError::kernel(BlendStage::ProfilesSampled))
            })
            .collect()
    };
    let pnt_a = points(a, &t_a)?;
    let pnt_b = points(b, &t_b)?;
    Ok(EdgeProfile {
        t_a,
        pnt_a,
        t_b,
        pnt_b,
    })
}
