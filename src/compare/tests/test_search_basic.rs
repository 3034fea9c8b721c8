use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::compare::search::{
    EdgeRecord, FaceRecord, NodeRecord, SearchError, SearchOptions, SearchPhase, SolidSnapshot,
    distance_to_solid, distance_to_solid_exhaustive,
};
use crate::geom::{Arc3, BBox, PlaneSurface, Point3, UvDomain, Vec3};
use crate::kernel::memory::{MemoryKernel, SurfaceGeom};
use crate::kernel::{BodyKind, Entity, FaceOrientation, GeometryKernel, NodeId, Sense};

fn unit_cube() -> (MemoryKernel, SolidSnapshot) {
    let mut kernel = MemoryKernel::new();
    let cube = kernel
        .make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))
        .unwrap();
    let snapshot = SolidSnapshot::capture(&kernel, cube.body).unwrap();
    (kernel, snapshot)
}

#[test]
fn single_node_gives_pythagorean_distance() {
    let kernel = MemoryKernel::new();
    let snapshot = SolidSnapshot::from_records(
        vec![NodeRecord {
            node: NodeId(0),
            point: Point3::ORIGIN,
        }],
        Vec::new(),
        Vec::new(),
    );
    let result = distance_to_solid(
        &kernel,
        &snapshot,
        Point3::new(3.0, 4.0, 0.0),
        &SearchOptions::default(),
    )
    .unwrap();
    assert_eq!(result.distance, 5.0);
    assert_eq!(result.face_index, None);
    assert!(!result.refined);
}

#[test]
fn empty_snapshot_is_infinitely_far() {
    let kernel = MemoryKernel::new();
    let result = distance_to_solid(
        &kernel,
        &SolidSnapshot::default(),
        Point3::ORIGIN,
        &SearchOptions::default(),
    )
    .unwrap();
    assert!(result.distance.is_infinite());
    assert!(result.nearest.is_none());
}

#[test]
fn capture_records_every_entity() {
    let (_, snapshot) = unit_cube();
    assert_eq!(snapshot.nodes.len(), 8);
    assert_eq!(snapshot.edges.len(), 12);
    assert_eq!(snapshot.faces.len(), 6);
    assert!(snapshot.edges.iter().all(|e| !e.degenerate));
}

#[test]
fn pruned_search_matches_exhaustive_search() {
    let mut kernel = MemoryKernel::new();
    let cube = kernel
        .make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))
        .unwrap();
    let plate = kernel
        .make_plate(
            Point3::new(2.0, -1.0, 0.5),
            Vec3::new(1.0, 0.0, 0.5),
            Vec3::new(0.0, 2.0, 0.0),
        )
        .unwrap();
    let mut snapshot = SolidSnapshot::capture(&kernel, cube.body).unwrap();
    let extra = SolidSnapshot::capture(&kernel, plate.body).unwrap();
    snapshot.nodes.extend(extra.nodes);
    snapshot.edges.extend(extra.edges);
    snapshot.faces.extend(extra.faces);

    let options = SearchOptions::default().with_refine(false);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let p = Point3::new(
            rng.random_range(-2.0..4.0),
            rng.random_range(-2.0..3.0),
            rng.random_range(-2.0..3.0),
        );
        let pruned = distance_to_solid(&kernel, &snapshot, p, &options).unwrap();
        let full = distance_to_solid_exhaustive(&kernel, &snapshot, p, &options).unwrap();
        assert!(
            (pruned.distance - full.distance).abs() < 1e-12,
            "{p:?}: {} vs {}",
            pruned.distance,
            full.distance
        );
    }
}

#[test]
fn points_inside_faces_project_exactly() {
    let (kernel, snapshot) = unit_cube();
    let result = distance_to_solid(
        &kernel,
        &snapshot,
        Point3::new(0.5, 0.25, 3.0),
        &SearchOptions::default(),
    )
    .unwrap();
    assert!((result.distance - 2.0).abs() < 1e-12);
    let face = result.face(&snapshot).unwrap();
    let normal = kernel.face_normal(face, 0.5, 0.5).unwrap();
    assert!((normal.z - 1.0).abs() < 1e-12);
}

#[test]
fn degenerate_edges_are_never_queried() {
    let mut kernel = MemoryKernel::new();
    let cube = kernel
        .make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))
        .unwrap();
    let plain = SolidSnapshot::capture(&kernel, cube.body).unwrap();

    let corner = cube.nodes[0];
    let seam = kernel.add_degenerate_edge(corner).unwrap();
    let mut with_seam = plain.clone();
    with_seam.edges.insert(
        0,
        EdgeRecord {
            edge: seam,
            bbox: kernel.bounding_box(Entity::Edge(seam)).unwrap(),
            degenerate: true,
        },
    );

    let options = SearchOptions::default();
    for p in [
        Point3::new(-0.5, -0.5, -0.5),
        Point3::new(0.2, -1.0, 0.1),
        Point3::new(3.0, 3.0, 3.0),
    ] {
        let a = distance_to_solid(&kernel, &plain, p, &options).unwrap();
        let b = distance_to_solid(&kernel, &with_seam, p, &options).unwrap();
        assert_eq!(a.distance, b.distance);
    }
}

#[test]
fn kernel_failure_aborts_the_query() {
    let mut kernel = MemoryKernel::new();
    let node = kernel.add_node(Point3::ORIGIN);
    let seam = kernel.add_degenerate_edge(node).unwrap();
    let snapshot = SolidSnapshot::from_records(
        Vec::new(),
        vec![EdgeRecord {
            edge: seam,
            bbox: BBox::from_point(Point3::ORIGIN),
            degenerate: false,
        }],
        Vec::new(),
    );

    let err = distance_to_solid(
        &kernel,
        &snapshot,
        Point3::new(1.0, 0.0, 0.0),
        &SearchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SearchError::Kernel {
            phase: SearchPhase::Edge,
            index: 0,
            ..
        }
    ));
}

#[test]
fn non_finite_query_is_rejected() {
    let (kernel, snapshot) = unit_cube();
    let err = distance_to_solid(
        &kernel,
        &snapshot,
        Point3::new(f64::NAN, 0.0, 0.0),
        &SearchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SearchError::NonFinitePoint(_)));
}

fn plate_faces_only() -> (MemoryKernel, SolidSnapshot) {
    let mut kernel = MemoryKernel::new();
    let plate = kernel
        .make_plate(Point3::ORIGIN, Vec3::X, Vec3::Y)
        .unwrap();
    let face = FaceRecord {
        face: plate.face,
        bbox: kernel.bounding_box(Entity::Face(plate.face)).unwrap(),
    };
    let snapshot = SolidSnapshot::from_records(Vec::new(), Vec::new(), vec![face]);
    (kernel, snapshot)
}

#[test]
fn untrimmed_surface_overrides_clamped_face() {
    let (kernel, snapshot) = plate_faces_only();
    let p = Point3::new(0.5, 3.0, 0.1);

    let refined = distance_to_solid(&kernel, &snapshot, p, &SearchOptions::default()).unwrap();
    assert!(refined.refined);
    assert!((refined.distance - 0.1).abs() < 1e-12);
    assert_eq!(refined.face_index, Some(0));

    let plain = distance_to_solid(
        &kernel,
        &snapshot,
        p,
        &SearchOptions::default().with_refine(false),
    )
    .unwrap();
    assert!(!plain.refined);
    assert!((plain.distance - 4.01_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn refinement_respects_threshold_and_ratio() {
    let (kernel, snapshot) = plate_faces_only();

    let close = Point3::new(0.5, 0.5, 5e-4);
    let result = distance_to_solid(&kernel, &snapshot, close, &SearchOptions::default()).unwrap();
    assert!(!result.refined);

    // Surface answer 0.1 against a trimmed answer of about 0.1005: not a 1% gain.
    let marginal = Point3::new(0.5, 1.01, 0.1);
    let result =
        distance_to_solid(&kernel, &snapshot, marginal, &SearchOptions::default()).unwrap();
    assert!(!result.refined);

    let eager = SearchOptions::default().with_refine_ratio(1.0);
    let result = distance_to_solid(&kernel, &snapshot, marginal, &eager).unwrap();
    assert!(result.refined);
}

#[test]
fn first_face_wins_ties() {
    let mut kernel = MemoryKernel::new();
    let a = kernel.make_plate(Point3::ORIGIN, Vec3::X, Vec3::Y).unwrap();
    let b = kernel.make_plate(Point3::ORIGIN, Vec3::X, Vec3::Y).unwrap();
    let faces = [a.face, b.face]
        .into_iter()
        .map(|face| FaceRecord {
            face,
            bbox: kernel.bounding_box(Entity::Face(face)).unwrap(),
        })
        .collect();
    let snapshot = SolidSnapshot::from_records(Vec::new(), Vec::new(), faces);

    let result = distance_to_solid(
        &kernel,
        &snapshot,
        Point3::new(0.5, 0.5, 1.0),
        &SearchOptions::default(),
    )
    .unwrap();
    assert_eq!(result.face_index, Some(0));
    assert_eq!(result.face(&snapshot), Some(a.face));
}

#[test]
fn disk_distance_ignores_the_plane_outside_its_rim() {
    let mut kernel = MemoryKernel::new();
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
    let face = kernel
        .add_face(
            surface,
            UvDomain::UNIT,
            FaceOrientation::Forward,
            vec![vec![(upper, Sense::Forward), (lower, Sense::Forward)]],
        )
        .unwrap();
    let body = kernel.add_body(vec![face], BodyKind::Sheet).unwrap();
    let snapshot = SolidSnapshot::capture(&kernel, body).unwrap();
    let options = SearchOptions::default().with_refine(false);

    let above = distance_to_solid(&kernel, &snapshot, Point3::new(0.2, 0.3, 0.5), &options).unwrap();
    assert!((above.distance - 0.5).abs() < 1e-12);

    let beside = distance_to_solid(&kernel, &snapshot, Point3::new(1.5, 0.0, 1.0), &options).unwrap();
    assert!((beside.distance - 1.25_f64.sqrt()).abs() < 1e-9);
}
