use super::core::{BBox, Point3, Tolerance, Vec3};

const SEED_GRID: usize = 8;
const NEWTON_ITERATIONS: usize = 40;
const BOX_GRID: usize = 16;

/// Rectangular parameter window `[u0, u1] x [v0, v1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvDomain {
    pub u: (f64, f64),
    pub v: (f64, f64),
}

impl UvDomain {
    pub const UNIT: Self = Self::new((0.0, 1.0), (0.0, 1.0));

    #[must_use]
    pub const fn new(u: (f64, f64), v: (f64, f64)) -> Self {
        Self { u, v }
    }

    #[must_use]
    pub fn clamp(self, u: f64, v: f64) -> (f64, f64) {
        (u.clamp(self.u.0, self.u.1), v.clamp(self.v.0, self.v.1))
    }

    #[must_use]
    pub fn lerp(self, fu: f64, fv: f64) -> (f64, f64) {
        (
            self.u.0 + (self.u.1 - self.u.0) * fu,
            self.v.0 + (self.v.1 - self.v.0) * fv,
        )
    }

    #[must_use]
    pub fn center(self) -> (f64, f64) {
        self.lerp(0.5, 0.5)
    }
}

pub trait Surface {
    fn point_at(&self, u: f64, v: f64) -> Point3;

    #[must_use]
    fn domain_u(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn domain_v(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Parameter window of the untrimmed surface; `None` when unbounded.
    #[must_use]
    fn natural_domain(&self) -> Option<UvDomain> {
        Some(UvDomain::new(self.domain_u(), self.domain_v()))
    }

    #[must_use]
    fn partial_derivatives_at(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let hu = Tolerance::DERIVATIVE.relative_to(u1 - u0);
        let hv = Tolerance::DERIVATIVE.relative_to(v1 - v0);

        let (ua, ub) = ((u - hu).max(u0), (u + hu).min(u1));
        let (va, vb) = ((v - hv).max(v0), (v + hv).min(v1));

        let du = if ub > ua {
            self.point_at(ub, v)
                .sub_point(self.point_at(ua, v))
                .mul_scalar(1.0 / (ub - ua))
        } else {
            Vec3::ZERO
        };
        let dv = if vb > va {
            self.point_at(u, vb)
                .sub_point(self.point_at(u, va))
                .mul_scalar(1.0 / (vb - va))
        } else {
            Vec3::ZERO
        };
        (du, dv)
    }

    #[must_use]
    fn normal_at(&self, u: f64, v: f64) -> Option<Vec3> {
        let (du, dv) = self.partial_derivatives_at(u, v);
        du.cross(dv).normalized()
    }

    /// Parameters of the point closest to `point`, restricted to `window`
    /// (or the natural domain when `window` is `None`).
    ///
    /// The default seeds from a coarse grid and refines with clamped
    /// Gauss-Newton steps.
    #[must_use]
    fn closest_uv(&self, point: Point3, window: Option<UvDomain>) -> (f64, f64) {
        let window = window
            .or_else(|| self.natural_domain())
            .unwrap_or_else(|| UvDomain::new(self.domain_u(), self.domain_v()));

        let mut best = window.center();
        let mut best_d = f64::INFINITY;
        for i in 0..=SEED_GRID {
            for j in 0..=SEED_GRID {
                let (u, v) = window.lerp(i as f64 / SEED_GRID as f64, j as f64 / SEED_GRID as f64);
                let d = self.point_at(u, v).sub_point(point).length_squared();
                if d < best_d {
                    best_d = d;
                    best = (u, v);
                }
            }
        }

        let (mut u, mut v) = best;
        for _ in 0..NEWTON_ITERATIONS {
            let r = self.point_at(u, v).sub_point(point);
            let (su, sv) = self.partial_derivatives_at(u, v);
            let a11 = su.dot(su);
            let a12 = su.dot(sv);
            let a22 = sv.dot(sv);
            let det = a11 * a22 - a12 * a12;
            if det.abs() <= Tolerance::ZERO_LENGTH.eps {
                break;
            }
            let b1 = -r.dot(su);
            let b2 = -r.dot(sv);
            let du = (b1 * a22 - b2 * a12) / det;
            let dv = (a11 * b2 - a12 * b1) / det;
            let (nu, nv) = window.clamp(u + du, v + dv);
            let moved = (nu - u).abs() + (nv - v).abs();
            (u, v) = (nu, nv);
            if moved <= Tolerance::ZERO_LENGTH.eps {
                break;
            }
        }
        (u, v)
    }

    /// Axis-aligned box of the surface over `window`.
    #[must_use]
    fn bounding_box_over(&self, window: UvDomain) -> BBox {
        let mut bbox = BBox::from_point(self.point_at(window.u.0, window.v.0));
        let mut longest: f64 = 0.0;
        for i in 0..=BOX_GRID {
            let mut prev: Option<Point3> = None;
            for j in 0..=BOX_GRID {
                let (u, v) = window.lerp(i as f64 / BOX_GRID as f64, j as f64 / BOX_GRID as f64);
                let p = self.point_at(u, v);
                if let Some(q) = prev {
                    longest = longest.max(p.distance_to(q));
                }
                bbox = bbox.expand_point(p);
                prev = Some(p);
            }
        }
        bbox.expand_by(0.25 * longest)
    }
}

/// Parametric plane `origin + u * u_axis + v * v_axis`, unbounded in both
/// directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneSurface {
    pub origin: Point3,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl PlaneSurface {
    #[must_use]
    pub const fn new(origin: Point3, u_axis: Vec3, v_axis: Vec3) -> Self {
        Self {
            origin,
            u_axis,
            v_axis,
        }
    }
}

impl Surface for PlaneSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.origin
            .add_vec(self.u_axis.mul_scalar(u))
            .add_vec(self.v_axis.mul_scalar(v))
    }

    fn natural_domain(&self) -> Option<UvDomain> {
        None
    }

    fn partial_derivatives_at(&self, _u: f64, _v: f64) -> (Vec3, Vec3) {
        (self.u_axis, self.v_axis)
    }

    /// Exact projection, clamped per axis to `window` when one is given.
    fn closest_uv(&self, point: Point3, window: Option<UvDomain>) -> (f64, f64) {
        let r = point.sub_point(self.origin);
        let a11 = self.u_axis.dot(self.u_axis);
        let a12 = self.u_axis.dot(self.v_axis);
        let a22 = self.v_axis.dot(self.v_axis);
        let det = a11 * a22 - a12 * a12;
        if det.abs() <= Tolerance::ZERO_LENGTH.eps {
            return (0.0, 0.0);
        }
        let b1 = r.dot(self.u_axis);
        let b2 = r.dot(self.v_axis);
        let u = (b1 * a22 - b2 * a12) / det;
        let v = (a11 * b2 - a12 * b1) / det;
        match window {
            Some(w) => w.clamp(u, v),
            None => (u, v),
        }
    }

    fn bounding_box_over(&self, window: UvDomain) -> BBox {
        let corners = [
            self.point_at(window.u.0, window.v.0),
            self.point_at(window.u.1, window.v.0),
            self.point_at(window.u.1, window.v.1),
            self.point_at(window.u.0, window.v.1),
        ];
        BBox::from_points(&corners).unwrap_or_else(|| BBox::from_point(self.origin))
    }
}

/// Transition patch between two sampled rows.
///
/// Along `u` each row is a uniform Catmull-Rom spline through its samples;
/// across `v` the patch is the cubic Hermite blend from the west row
/// (`v = 0`) to the east row (`v = 1`) with the given end derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct HermiteBlendSurface {
    west: Vec<Point3>,
    east: Vec<Point3>,
    west_tangents: Vec<Vec3>,
    east_tangents: Vec<Vec3>,
}

impl HermiteBlendSurface {
    pub fn new(
        west: Vec<Point3>,
        east: Vec<Point3>,
        west_tangents: Vec<Vec3>,
        east_tangents: Vec<Vec3>,
    ) -> Result<Self, String> {
        let n = west.len();
        if n < 2 {
            return Err(format!("blend rows need at least 2 samples, got {n}"));
        }
        if east.len() != n || west_tangents.len() != n || east_tangents.len() != n {
            return Err(format!(
                "blend rows differ in length: west {n}, east {}, west tangents {}, east tangents {}",
                east.len(),
                west_tangents.len(),
                east_tangents.len()
            ));
        }
        Ok(Self {
            west,
            east,
            west_tangents,
            east_tangents,
        })
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.west.len()
    }
}

fn hermite_basis(s: f64) -> [f64; 4] {
    let s2 = s * s;
    let s3 = s2 * s;
    [
        2.0 * s3 - 3.0 * s2 + 1.0,
        s3 - 2.0 * s2 + s,
        -2.0 * s3 + 3.0 * s2,
        s3 - s2,
    ]
}

fn catmull_rom(values: &[Vec3], u: f64) -> Vec3 {
    let last = values.len() - 1;
    let x = u.clamp(0.0, 1.0) * last as f64;
    let i = (x.floor() as usize).min(last - 1);
    let s = x - i as f64;

    let slope = |k: usize| -> Vec3 {
        if k == 0 {
            values[1] - values[0]
        } else if k == last {
            values[last] - values[last - 1]
        } else {
            (values[k + 1] - values[k - 1]) * 0.5
        }
    };

    let [h00, h10, h01, h11] = hermite_basis(s);
    values[i] * h00 + slope(i) * h10 + values[i + 1] * h01 + slope(i + 1) * h11
}

impl Surface for HermiteBlendSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        let west: Vec<Vec3> = self.west.iter().map(|p| p.to_vec3()).collect();
        let east: Vec<Vec3> = self.east.iter().map(|p| p.to_vec3()).collect();
        let a = catmull_rom(&west, u);
        let b = catmull_rom(&east, u);
        let ta = catmull_rom(&self.west_tangents, u);
        let tb = catmull_rom(&self.east_tangents, u);

        let [h00, h10, h01, h11] = hermite_basis(v.clamp(0.0, 1.0));
        let p = a * h00 + ta * h10 + b * h01 + tb * h11;
        Point3::new(p.x, p.y, p.z)
    }
}
