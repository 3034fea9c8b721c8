mod test_profile_basic;
mod test_slopes_basic;

use std::f64::consts::PI;

use crate::geom::{Arc3, PlaneSurface, Point3, UvDomain, Vec3};
use crate::kernel::memory::{BoxSide, BoxTopology, MemoryKernel, SurfaceGeom};
use crate::kernel::{
    AttrValue, BodyId, BodyKind, EdgeId, Entity, FaceOrientation, GeometryKernel, Sense,
};

pub(super) const MARKER: &str = "_flend";

pub(super) fn mark(kernel: &mut MemoryKernel, cube: &BoxTopology, side: BoxSide) {
    kernel
        .set_attribute(Entity::Face(cube.face(side)), MARKER, AttrValue::Int(vec![1]))
        .unwrap();
}

/// Unit cube with its top removed, and a unit cube one gap above it with its
/// bottom removed.
pub(super) fn stacked_boxes(kernel: &mut MemoryKernel) -> (BoxTopology, BoxTopology) {
    let lower = kernel
        .make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))
        .unwrap();
    let upper = kernel
        .make_box(Point3::new(0.0, 0.0, 2.0), Point3::new(1.0, 1.0, 3.0))
        .unwrap();
    mark(kernel, &lower, BoxSide::ZMax);
    mark(kernel, &upper, BoxSide::ZMin);
    (lower, upper)
}

/// Unit disk in the `xy` plane bounded by two half-circle arcs.
pub(super) fn disk(kernel: &mut MemoryKernel) -> BodyId {
    disk_at(kernel, 0.0)
}

fn half_circle(z: f64, start: f64) -> Arc3 {
    Arc3::from_center_xaxis_normal(Point3::new(0.0, 0.0, z), Vec3::X, Vec3::Z, 1.0, start, PI)
}

/// Sheet on the plane at height `z`, trimmed by a single loop.
fn plane_sheet(kernel: &mut MemoryKernel, z: f64, face_loop: Vec<(EdgeId, Sense)>) -> BodyId {
    let plane = PlaneSurface::new(
        Point3::new(-2.0, -2.0, z),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(0.0, 4.0, 0.0),
    );
    let surface = kernel.add_surface(SurfaceGeom::Plane(plane));
    let face = kernel
        .add_face(surface, UvDomain::UNIT, FaceOrientation::Forward, vec![face_loop])
        .unwrap();
    kernel.add_body(vec![face], BodyKind::Sheet).unwrap()
}

/// Unit disk at height `z` bounded by two half-circle arcs meeting at
/// `x = 1` and `x = -1`.
pub(super) fn disk_at(kernel: &mut MemoryKernel, z: f64) -> BodyId {
    let east = kernel.add_node(Point3::new(1.0, 0.0, z));
    let west = kernel.add_node(Point3::new(-1.0, 0.0, z));
    let upper = kernel.add_arc_edge(east, west, half_circle(z, 0.0)).unwrap();
    let lower = kernel.add_arc_edge(west, east, half_circle(z, PI)).unwrap();
    plane_sheet(kernel, z, vec![(upper, Sense::Forward), (lower, Sense::Forward)])
}

/// Upper half of the unit disk at height `z`: an arc closed by its diameter.
pub(super) fn half_disk_at(kernel: &mut MemoryKernel, z: f64) -> BodyId {
    let east = kernel.add_node(Point3::new(1.0, 0.0, z));
    let west = kernel.add_node(Point3::new(-1.0, 0.0, z));
    let arc = kernel.add_arc_edge(east, west, half_circle(z, 0.0)).unwrap();
    let diameter = kernel.add_line_edge(west, east).unwrap();
    plane_sheet(kernel, z, vec![(arc, Sense::Forward), (diameter, Sense::Forward)])
}
