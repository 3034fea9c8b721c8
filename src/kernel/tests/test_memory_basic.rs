use std::f64::consts::{FRAC_PI_2, PI};

use crate::geom::{Arc3, PlaneSurface, Point3, UvDomain, Vec3};
use crate::kernel::memory::{BoxSide, MemoryKernel, SurfaceGeom};
use crate::kernel::{
    AttrValue, Entity, FaceId, FaceOrientation, GeometryKernel, KernelError, Params, Sense,
    SurfaceRows,
};
use crate::parse::tess_dump;

fn unit_box(kernel: &mut MemoryKernel) -> crate::kernel::memory::BoxTopology {
    kernel
        .make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))
        .unwrap()
}

#[test]
fn box_topology_counts() {
    let mut kernel = MemoryKernel::new();
    let cube = unit_box(&mut kernel);

    assert_eq!(kernel.body_nodes(cube.body).unwrap().len(), 8);
    assert_eq!(kernel.body_edges(cube.body).unwrap().len(), 12);
    assert_eq!(kernel.body_faces(cube.body).unwrap().len(), 6);
    for edge in kernel.body_edges(cube.body).unwrap() {
        assert_eq!(kernel.edge_faces(edge).unwrap().len(), 2, "{edge}");
    }
}

#[test]
fn box_face_normals_point_outward() {
    let mut kernel = MemoryKernel::new();
    let cube = unit_box(&mut kernel);
    let center = Point3::new(0.5, 0.5, 0.5);

    for side in BoxSide::ALL {
        let face = cube.face(side);
        let normal = kernel.face_normal(face, 0.5, 0.5).unwrap();
        let eval = kernel
            .evaluate(Entity::Face(face), Params::Surface(0.5, 0.5))
            .unwrap();
        let outward = eval.point.sub_point(center);
        assert!(normal.dot(outward) > 0.49, "{side:?}: {normal:?}");
    }
}

#[test]
fn face_projection_is_trimmed_surface_projection_is_not() {
    let mut kernel = MemoryKernel::new();
    let cube = unit_box(&mut kernel);
    let top = cube.face(BoxSide::ZMax);
    let query = Point3::new(3.0, 0.5, 1.0);

    let on_face = kernel.inverse_evaluate(Entity::Face(top), query).unwrap();
    assert!(on_face.point.distance_to(Point3::new(1.0, 0.5, 1.0)) < 1e-12);

    let surface = kernel.underlying_surface(top).unwrap();
    let on_surface = kernel
        .inverse_evaluate(Entity::Surface(surface), query)
        .unwrap();
    assert!(on_surface.point.distance_to(query) < 1e-12);
}

/// Unit disk at `z = 0` on a plane window spanning `[-2, 2]` in `x` and `y`.
fn unit_disk_face(kernel: &mut MemoryKernel) -> FaceId {
    let east = kernel.add_node(Point3::new(1.0, 0.0, 0.0));
    let west = kernel.add_node(Point3::new(-1.0, 0.0, 0.0));
    let half = |start| Arc3::from_center_xaxis_normal(Point3::ORIGIN, Vec3::X, Vec3::Z, 1.0, start, PI);
    let upper = kernel.add_arc_edge(east, west, half(0.0)).unwrap();
    let lower = kernel.add_arc_edge(west, east, half(PI)).unwrap();
    let surface = kernel.add_surface(SurfaceGeom::Plane(PlaneSurface::new(
        Point3::new(-2.0, -2.0, 0.0),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(0.0, 4.0, 0.0),
    )));
    kernel
        .add_face(
            surface,
            UvDomain::UNIT,
            FaceOrientation::Forward,
            vec![vec![(upper, Sense::Forward), (lower, Sense::Forward)]],
        )
        .unwrap()
}

#[test]
fn loop_trimmed_face_projects_inside_its_loop() {
    let mut kernel = MemoryKernel::new();
    let face = unit_disk_face(&mut kernel);

    let inside = kernel
        .inverse_evaluate(Entity::Face(face), Point3::new(0.3, -0.4, 2.0))
        .unwrap();
    assert!(inside.point.distance_to(Point3::new(0.3, -0.4, 0.0)) < 1e-12);

    // Inside the window but outside the disk: lands on the rim.
    let query = Point3::new(1.5, 0.0, 1.0);
    let outside = kernel.inverse_evaluate(Entity::Face(face), query).unwrap();
    assert!(outside.point.distance_to(Point3::new(1.0, 0.0, 0.0)) < 1e-9);

    let surface = kernel.underlying_surface(face).unwrap();
    let bare = kernel
        .inverse_evaluate(Entity::Surface(surface), query)
        .unwrap();
    assert!(bare.point.distance_to(Point3::new(1.5, 0.0, 0.0)) < 1e-12);
}

#[test]
fn loop_trimmed_plane_face_is_boxed_by_its_edges() {
    let mut kernel = MemoryKernel::new();
    let face = unit_disk_face(&mut kernel);

    let bbox = kernel.bounding_box(Entity::Face(face)).unwrap();
    assert!(bbox.contains_point(Point3::new(0.0, 0.99, 0.0)));
    assert!(bbox.contains_point(Point3::new(-0.99, 0.0, 0.0)));
    assert!(bbox.max.x < 1.2 && bbox.min.x > -1.2);
    assert!(bbox.max.y < 1.2 && bbox.min.y > -1.2);
}

#[test]
fn degenerate_edge_cannot_be_projected() {
    let mut kernel = MemoryKernel::new();
    let node = kernel.add_node(Point3::new(1.0, 2.0, 3.0));
    let edge = kernel.add_degenerate_edge(node).unwrap();

    assert!(kernel.edge_info(edge).unwrap().degenerate);
    let bbox = kernel.bounding_box(Entity::Edge(edge)).unwrap();
    assert_eq!(bbox.min, Point3::new(1.0, 2.0, 3.0));
    assert_eq!(kernel.arc_length(edge, 0.0, 1.0).unwrap(), 0.0);
    assert!(matches!(
        kernel.inverse_evaluate(Entity::Edge(edge), Point3::ORIGIN),
        Err(KernelError::Degenerate { .. })
    ));
}

#[test]
fn arc_edge_length_and_projection() {
    let mut kernel = MemoryKernel::new();
    let start = kernel.add_node(Point3::new(2.0, 0.0, 0.0));
    let end = kernel.add_node(Point3::new(0.0, 2.0, 0.0));
    let arc = Arc3::from_center_xaxis_normal(Point3::ORIGIN, Vec3::X, Vec3::Z, 2.0, 0.0, FRAC_PI_2);
    let edge = kernel.add_arc_edge(start, end, arc).unwrap();

    let length = kernel.arc_length(edge, 0.0, 1.0).unwrap();
    assert!((length - FRAC_PI_2 * 2.0).abs() < 1e-9, "length = {length}");

    let proj = kernel
        .inverse_evaluate(Entity::Edge(edge), Point3::new(5.0, 5.0, 1.0))
        .unwrap();
    let expected = Point3::new(2.0_f64.sqrt(), 2.0_f64.sqrt(), 0.0);
    assert!(proj.point.distance_to(expected) < 1e-9);
}

#[test]
fn evaluate_rejects_mismatched_params() {
    let mut kernel = MemoryKernel::new();
    let cube = unit_box(&mut kernel);
    let err = kernel
        .evaluate(Entity::Face(cube.face(BoxSide::XMin)), Params::Curve(0.5))
        .unwrap_err();
    assert!(matches!(err, KernelError::BadParams { .. }));
}

#[test]
fn make_face_needs_a_bounded_surface() {
    let mut kernel = MemoryKernel::new();
    let cube = unit_box(&mut kernel);
    let plane = kernel.underlying_surface(cube.face(BoxSide::ZMin)).unwrap();
    assert!(matches!(
        kernel.make_face(plane, FaceOrientation::Forward),
        Err(KernelError::Unsupported { .. })
    ));

    let rows = SurfaceRows {
        west: vec![Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)],
        east: vec![Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
        west_tangents: vec![Vec3::Y; 2],
        east_tangents: vec![Vec3::Y; 2],
    };
    let surface = kernel.build_approximating_surface(&rows, 1e-6).unwrap();
    let face = kernel.make_face(surface, FaceOrientation::Reverse).unwrap();
    assert!(kernel.face_loops(face).unwrap().is_empty());
    let normal = kernel.face_normal(face, 0.5, 0.5).unwrap();
    assert!((normal.z + 1.0).abs() < 1e-6);
}

#[test]
fn approximating_surface_rejects_bad_input() {
    let mut kernel = MemoryKernel::new();
    let rows = SurfaceRows {
        west: vec![Point3::ORIGIN],
        east: vec![Point3::ORIGIN],
        west_tangents: vec![Vec3::Z],
        east_tangents: vec![Vec3::Z],
    };
    assert!(matches!(
        kernel.build_approximating_surface(&rows, 1e-6),
        Err(KernelError::Construction(_))
    ));
    assert!(matches!(
        kernel.build_approximating_surface(&rows, -1.0),
        Err(KernelError::Construction(_))
    ));
}

#[test]
fn attributes_are_typed_and_per_entity() {
    let mut kernel = MemoryKernel::new();
    let cube = unit_box(&mut kernel);
    let top = Entity::Face(cube.face(BoxSide::ZMax));

    kernel
        .set_attribute(top, "_flend", AttrValue::Text("remove".into()))
        .unwrap();
    kernel
        .set_attribute(top, "weight", AttrValue::Real(vec![0.5]))
        .unwrap();

    assert_eq!(
        kernel.attribute(top, "_flend"),
        Some(&AttrValue::Text("remove".into()))
    );
    assert_eq!(kernel.attribute_names(top), vec!["_flend", "weight"]);
    assert!(kernel.attribute(Entity::Face(cube.face(BoxSide::ZMin)), "_flend").is_none());

    let missing = Entity::Face(FaceId(99));
    assert_eq!(
        kernel.set_attribute(missing, "x", AttrValue::Int(vec![1])),
        Err(KernelError::UnknownEntity(missing))
    );
}

#[test]
fn tessellation_has_expected_shape_and_parses_back() {
    let mut kernel = MemoryKernel::new();
    let cube = unit_box(&mut kernel);
    let dump = kernel.tessellate_body(cube.body, 2).unwrap();

    assert_eq!(dump.nodes.len(), 8);
    assert_eq!(dump.edges.len(), 12);
    assert!(dump.edges.iter().all(|e| e.points.len() == 3));
    assert_eq!(dump.faces.len(), 6);
    assert!(dump.faces.iter().all(|f| f.points.len() == 9 && f.tris.len() == 8));
    assert_eq!(dump.point_count(), 8 + 12 * 3 + 6 * 9);

    // Shared diagonal of cell (0, 0) links its two triangles.
    let tris = &dump.faces[0].tris;
    assert_eq!(tris[0][4], 2);
    assert_eq!(tris[1][5], 1);

    let parsed = tess_dump::parse_str(&tess_dump::write_string(&dump)).unwrap();
    assert_eq!(parsed.point_count(), dump.point_count());
}
