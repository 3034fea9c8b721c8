use super::core::{BBox, Point3, Tolerance, Vec3};

/// Samples used to seed closest-point searches and sampled bounding boxes.
const SEED_SAMPLES: usize = 32;
const GOLDEN_ITERATIONS: usize = 80;

pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn derivative_at(&self, t: f64) -> Vec3 {
        let (a, b) = self.domain();
        let span = b - a;
        if !span.is_finite() || span == 0.0 {
            return Vec3::ZERO;
        }

        let h = Tolerance::DERIVATIVE.relative_to(span);
        let t0 = (t - h).max(a);
        let t1 = (t + h).min(b);
        if t1 == t0 {
            return Vec3::ZERO;
        }

        let p0 = self.point_at(t0);
        let p1 = self.point_at(t1);
        p1.sub_point(p0).mul_scalar(1.0 / (t1 - t0))
    }

    /// Returns the unit tangent vector at parameter `t`.
    /// Returns `None` if the derivative is zero or degenerate.
    #[must_use]
    fn tangent_at(&self, t: f64) -> Option<Vec3> {
        self.derivative_at(t).normalized()
    }

    /// Parameter of the point on the curve closest to `point`, within the domain.
    ///
    /// The default seeds from uniform samples and refines with a golden-section
    /// search inside the bracket around the best sample.
    #[must_use]
    fn closest_parameter(&self, point: Point3) -> f64 {
        sampled_closest_parameter(self, point)
    }

    /// Axis-aligned box enclosing the curve over its domain.
    ///
    /// The default samples the curve and pads by a quarter of the longest chord,
    /// which bounds the sagitta of any smooth arc no longer than its diameter.
    #[must_use]
    fn bounding_box(&self) -> BBox {
        let (t0, t1) = self.domain();
        let step = (t1 - t0) / SEED_SAMPLES as f64;
        let mut prev = self.point_at(t0);
        let mut bbox = BBox::from_point(prev);
        let mut longest: f64 = 0.0;
        for i in 1..=SEED_SAMPLES {
            let p = self.point_at(t0 + step * i as f64);
            longest = longest.max(p.distance_to(prev));
            bbox = bbox.expand_point(p);
            prev = p;
        }
        bbox.expand_by(0.25 * longest)
    }
}

/// Closest parameter by uniform seeding plus golden-section refinement.
pub(crate) fn sampled_closest_parameter<C: Curve3 + ?Sized>(curve: &C, point: Point3) -> f64 {
    let (t0, t1) = curve.domain();
    let step = (t1 - t0) / SEED_SAMPLES as f64;
    let dist2 = |t: f64| curve.point_at(t).sub_point(point).length_squared();

    let mut best_i = 0;
    let mut best_d = f64::INFINITY;
    for i in 0..=SEED_SAMPLES {
        let d = dist2(t0 + step * i as f64);
        if d < best_d {
            best_d = d;
            best_i = i;
        }
    }

    let lo = t0 + step * best_i.saturating_sub(1) as f64;
    let hi = (t0 + step * (best_i + 1) as f64).min(t1);
    golden_section_min(lo, hi, dist2)
}

/// Minimizes `f` over `[lo, hi]` assuming it is unimodal there.
pub(crate) fn golden_section_min(mut lo: f64, mut hi: f64, f: impl Fn(f64) -> f64) -> f64 {
    const INV_PHI: f64 = 0.618_033_988_749_894_8;
    let mut x1 = hi - INV_PHI * (hi - lo);
    let mut x2 = lo + INV_PHI * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);
    for _ in 0..GOLDEN_ITERATIONS {
        if (hi - lo).abs() <= Tolerance::ZERO_LENGTH.eps {
            break;
        }
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_PHI * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_PHI * (hi - lo);
            f2 = f(x2);
        }
    }

    // The endpoints are not visited by the interior probes.
    let mid = 0.5 * (lo + hi);
    [lo, mid, hi]
        .into_iter()
        .min_by(|a, b| f(*a).total_cmp(&f(*b)))
        .unwrap_or(mid)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line3 {
    pub start: Point3,
    pub end: Point3,
}

impl Line3 {
    #[must_use]
    pub const fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn direction(self) -> Vec3 {
        self.end.sub_point(self.start)
    }
}

impl Curve3 for Line3 {
    fn point_at(&self, t: f64) -> Point3 {
        self.start.add_vec(self.direction().mul_scalar(t))
    }

    fn derivative_at(&self, _t: f64) -> Vec3 {
        self.direction()
    }

    fn closest_parameter(&self, point: Point3) -> f64 {
        let dir = self.direction();
        let len2 = dir.length_squared();
        if len2 <= Tolerance::ZERO_LENGTH.eps {
            return 0.0;
        }
        (point.sub_point(self.start).dot(dir) / len2).clamp(0.0, 1.0)
    }

    fn bounding_box(&self) -> BBox {
        BBox::from_point(self.start).expand_point(self.end)
    }
}

/// Circular arc over the unit domain, sweeping `sweep_angle` from `start_angle`
/// about `x_axis`/`y_axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc3 {
    pub center: Point3,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep_angle: f64,
}

impl Arc3 {
    #[must_use]
    pub fn from_center_xaxis_normal(
        center: Point3,
        x_axis: Vec3,
        normal: Vec3,
        radius: f64,
        start_angle: f64,
        sweep_angle: f64,
    ) -> Self {
        let z = normal.normalized().unwrap_or(Vec3::Z);
        let x = x_axis
            .sub(z.mul_scalar(x_axis.dot(z)))
            .normalized()
            .unwrap_or(Vec3::X);
        let y = z.cross(x).normalized().unwrap_or(Vec3::Y);
        Self {
            center,
            x_axis: x,
            y_axis: y,
            radius,
            start_angle,
            sweep_angle,
        }
    }

    fn angle_at(&self, t: f64) -> f64 {
        self.start_angle + self.sweep_angle * t.clamp(0.0, 1.0)
    }
}

impl Curve3 for Arc3 {
    fn point_at(&self, t: f64) -> Point3 {
        let angle = self.angle_at(t);
        self.center
            .add_vec(self.x_axis.mul_scalar(self.radius * angle.cos()))
            .add_vec(self.y_axis.mul_scalar(self.radius * angle.sin()))
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        let angle = self.angle_at(t);
        let dx = self.x_axis.mul_scalar(-self.radius * angle.sin());
        let dy = self.y_axis.mul_scalar(self.radius * angle.cos());
        dx.add(dy).mul_scalar(self.sweep_angle)
    }

    fn closest_parameter(&self, point: Point3) -> f64 {
        if self.sweep_angle == 0.0 {
            return 0.0;
        }
        let rel = point.sub_point(self.center);
        let (x, y) = (rel.dot(self.x_axis), rel.dot(self.y_axis));
        if x.hypot(y) <= Tolerance::ZERO_LENGTH.eps {
            // Every point of the arc is equidistant from its center.
            return 0.0;
        }

        let tau = std::f64::consts::TAU;
        let offset = (y.atan2(x) - self.start_angle) * self.sweep_angle.signum();
        let offset = offset.rem_euclid(tau);
        let t = offset / self.sweep_angle.abs();
        if t <= 1.0 {
            return t;
        }

        // Outside the swept range: whichever end is nearer.
        let d0 = self.point_at(0.0).distance_to(point);
        let d1 = self.point_at(1.0).distance_to(point);
        if d0 <= d1 { 0.0 } else { 1.0 }
    }
}

/// Arc length of `curve` between `t0` and `t1` (signed by parameter order).
///
/// Composite five-point Gauss-Legendre quadrature of the speed `|C'(t)|`.
#[must_use]
pub fn arc_length_between<C: Curve3 + ?Sized>(curve: &C, t0: f64, t1: f64) -> f64 {
    const NODES: [f64; 5] = [
        -0.906_179_845_938_664,
        -0.538_469_310_105_683,
        0.0,
        0.538_469_310_105_683,
        0.906_179_845_938_664,
    ];
    const WEIGHTS: [f64; 5] = [
        0.236_926_885_056_189,
        0.478_628_670_499_366,
        0.568_888_888_888_889,
        0.478_628_670_499_366,
        0.236_926_885_056_189,
    ];
    const SEGMENTS: usize = 16;

    let span = t1 - t0;
    if span == 0.0 || !span.is_finite() {
        return 0.0;
    }

    let h = span / SEGMENTS as f64;
    let mut total = 0.0;
    for s in 0..SEGMENTS {
        let mid = t0 + h * (s as f64 + 0.5);
        for (node, weight) in NODES.iter().zip(WEIGHTS.iter()) {
            total += weight * curve.derivative_at(mid + 0.5 * h * node).length();
        }
    }
    total * 0.5 * h
}
