mod core;
mod curve;
mod surface;

pub use core::{BBox, Point3, Tolerance, Vec3};
pub use curve::{Arc3, Curve3, Line3, arc_length_between};
pub(crate) use curve::sampled_closest_parameter;
pub use surface::{HermiteBlendSurface, PlaneSurface, Surface, UvDomain};
