use super::{MARKER, disk, stacked_boxes};
use crate::blend::{
    BlendError, CornerFade, EdgeProfile, EdgeSlopes, SampleMode, compute_plane_intersection_guide,
    compute_projection_guide, correct_corner_slopes, extract_exposed_loops, fade_corners,
    sample_edge_profile, sample_edge_slopes,
};
use crate::geom::{Point3, Vec3};
use crate::kernel::memory::MemoryKernel;

const NPNT: usize = 5;

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-6
}

fn loop_slopes(kernel: &MemoryKernel, lp: &crate::blend::BlendLoop) -> Vec<EdgeSlopes> {
    lp.edges
        .iter()
        .map(|le| {
            let profile = sample_edge_profile(kernel, le, le, NPNT, SampleMode::ParametricBoth).unwrap();
            sample_edge_slopes(kernel, le, &profile.t_a).unwrap()
        })
        .collect()
}

#[test]
fn open_box_rim_slopes_point_up() {
    let mut kernel = MemoryKernel::new();
    let (lower, upper) = stacked_boxes(&mut kernel);

    let rim = extract_exposed_loops(&kernel, lower.body, MARKER).unwrap().remove(0);
    for edge in loop_slopes(&kernel, &rim) {
        for (slope, normal) in edge.slopes.iter().zip(&edge.normals) {
            assert!(close(*slope, Vec3::Z));
            assert!(normal.dot(Vec3::Z).abs() < 1e-12);
        }
    }

    let rim = extract_exposed_loops(&kernel, upper.body, MARKER).unwrap().remove(0);
    for edge in loop_slopes(&kernel, &rim) {
        assert!(edge.slopes.iter().all(|s| close(*s, -Vec3::Z)));
    }
}

#[test]
fn corner_fix_keeps_consistent_box_slopes() {
    let mut kernel = MemoryKernel::new();
    let (lower, _) = stacked_boxes(&mut kernel);
    let rim = extract_exposed_loops(&kernel, lower.body, MARKER).unwrap().remove(0);
    let mut slopes = loop_slopes(&kernel, &rim);

    let warnings = correct_corner_slopes(&kernel, &rim, &mut slopes, CornerFade::Cosine).unwrap();
    assert!(warnings.is_empty());
    for edge in &slopes {
        assert!(edge.slopes.iter().all(|s| close(*s, Vec3::Z)));
    }
}

#[test]
fn smooth_circle_slopes_are_unchanged() {
    let mut kernel = MemoryKernel::new();
    let body = disk(&mut kernel);
    let circle = extract_exposed_loops(&kernel, body, MARKER).unwrap().remove(0);
    let original = loop_slopes(&kernel, &circle);

    // Slopes on a flat disk point radially outward.
    let first = original[0].slopes[0];
    assert!(close(first, Vec3::X));

    let mut corrected = original.clone();
    correct_corner_slopes(&kernel, &circle, &mut corrected, CornerFade::Linear).unwrap();
    for (before, after) in original.iter().zip(&corrected) {
        for (b, a) in before.slopes.iter().zip(&after.slopes) {
            assert!(close(*b, *a));
        }
    }
}

#[test]
fn plate_corners_take_the_diagonal() {
    let mut kernel = MemoryKernel::new();
    let plate = kernel
        .make_plate(Point3::ORIGIN, Vec3::X, Vec3::Y)
        .unwrap();
    let boundary = extract_exposed_loops(&kernel, plate.body, MARKER).unwrap().remove(0);
    let mut slopes = loop_slopes(&kernel, &boundary);
    assert!(slopes[0].slopes.iter().all(|s| close(*s, -Vec3::Y)));

    correct_corner_slopes(&kernel, &boundary, &mut slopes, CornerFade::Linear).unwrap();
    let diagonal = |x: f64, y: f64| Vec3::new(x, y, 0.0).normalized().unwrap();
    let bottom = &slopes[0].slopes;
    assert!(close(bottom[0], diagonal(-1.0, -1.0)));
    assert!(close(bottom[NPNT - 1], diagonal(1.0, -1.0)));
    assert!(close(bottom[NPNT / 2], -Vec3::Y));
    // Adjacent edges agree at their shared corner.
    assert!(close(slopes[0].slopes[NPNT - 1], slopes[1].slopes[0]));
}

#[test]
fn fade_profiles_differ_between_corners() {
    // Only the start corner of the first row needs a correction.
    let corners = vec![Vec3::Y, Vec3::X];
    let row = vec![Vec3::Y; 5];

    let mut linear = vec![row.clone(), row.clone()];
    fade_corners(&mut linear, &corners, CornerFade::Linear);
    let mut cosine = vec![row.clone(), row];
    fade_corners(&mut cosine, &corners, CornerFade::Cosine);

    for faded in [&linear, &cosine] {
        assert!(close(faded[0][0], Vec3::X));
        assert!(close(faded[0][4], Vec3::Y));
    }
    // Halfway along, both profiles weigh the corner equally.
    assert!(close(linear[0][2], cosine[0][2]));
    // Near the corner the cosine profile holds on to more of the correction.
    assert!(cosine[0][1].x > linear[0][1].x);
    assert!((CornerFade::Cosine.weight(0.5) - 0.5).abs() < 1e-12);
    assert_eq!(CornerFade::Linear.weight(2.0), 1.0);
}

/// Side A along the `x` axis on the floor `z = 0`, side B one unit up on the
/// wall `y = 2`.
fn floor_to_wall() -> (EdgeProfile, EdgeSlopes, EdgeSlopes) {
    let n = 4;
    let profile = EdgeProfile {
        t_a: (0..n).map(|i| i as f64).collect(),
        pnt_a: (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect(),
        t_b: (0..n).map(|i| i as f64).collect(),
        pnt_b: (0..n).map(|i| Point3::new(i as f64, 2.0, 1.0)).collect(),
    };
    let a = EdgeSlopes {
        slopes: vec![Vec3::Y; n],
        normals: vec![Vec3::Z; n],
    };
    let b = EdgeSlopes {
        slopes: vec![-Vec3::Z; n],
        normals: vec![Vec3::Y; n],
    };
    (profile, a, b)
}

#[test]
fn plane_intersection_aims_at_the_crease() {
    let (profile, a, b) = floor_to_wall();
    let guide = compute_plane_intersection_guide(0, &profile, &a, &b).unwrap();

    for i in 0..profile.len() {
        assert!(guide.guide[i].distance_to(Point3::new(i as f64, 2.0, 0.0)) < 1e-9);
        assert!(close(guide.slopes_a[i], Vec3::Y));
        assert!(close(guide.slopes_b[i], -Vec3::Z));
        assert!((guide.reach_a[i] - 5f64.sqrt()).abs() < 1e-12);
    }
    assert_eq!(guide.passes, 1);
}

#[test]
fn relaxation_straightens_a_kinked_guide() {
    let (mut profile, a, b) = floor_to_wall();
    // Pull one wall sample sideways; its nearest crease point moves with it.
    profile.pnt_b[1] = Point3::new(1.6, 2.0, 1.0);
    let guide = compute_plane_intersection_guide(0, &profile, &a, &b).unwrap();

    assert!(guide.passes > 1);
    // Interior guide points settle evenly between the fixed ends.
    assert!((guide.guide[1].x - 1.0).abs() < 1e-5);
    assert!((guide.guide[2].x - 2.0).abs() < 1e-5);
}

#[test]
fn parallel_tangent_planes_are_singular() {
    let (profile, a, mut b) = floor_to_wall();
    b.normals[2] = Vec3::Z;
    let err = compute_plane_intersection_guide(3, &profile, &a, &b).unwrap_err();
    assert!(matches!(
        err,
        BlendError::SingularPlaneIntersection { edge: 3, sample: 2 }
    ));
    assert_eq!(err.code(), -13);
}

#[test]
fn projection_meets_where_the_rays_cross() {
    let nb = Vec3::new(1.0, 1.0, 0.0).normalized().unwrap();
    let na = Vec3::new(-1.0, 1.0, 0.0).normalized().unwrap();
    let profile = EdgeProfile {
        t_a: vec![0.0],
        pnt_a: vec![Point3::ORIGIN],
        t_b: vec![0.0],
        pnt_b: vec![Point3::new(2.0, 0.0, 0.0)],
    };
    let a = EdgeSlopes {
        slopes: vec![Vec3::X],
        normals: vec![na],
    };
    let b = EdgeSlopes {
        slopes: vec![-Vec3::X],
        normals: vec![nb],
    };

    let guide = compute_projection_guide(0, &profile, &a, &b);
    assert!(guide.warnings.is_empty());
    assert!(close(guide.slopes_a[0], Vec3::new(1.0, 1.0, 0.0).normalized().unwrap()));
    assert!(close(guide.slopes_b[0], Vec3::new(-1.0, 1.0, 0.0).normalized().unwrap()));
    assert!((guide.reach_a[0] - 2.0 * 2f64.sqrt()).abs() < 1e-9);
    assert!((guide.reach_b[0] - 2.0 * 2f64.sqrt()).abs() < 1e-9);
}

#[test]
fn projection_falls_back_to_the_gap_for_parallel_rays() {
    let profile = EdgeProfile {
        t_a: vec![0.0, 1.0],
        pnt_a: vec![Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)],
        t_b: vec![0.0, 1.0],
        pnt_b: vec![Point3::new(0.0, 0.0, 3.0), Point3::new(1.0, 0.0, 3.0)],
    };
    let side = EdgeSlopes {
        slopes: vec![Vec3::Z; 2],
        normals: vec![-Vec3::Y; 2],
    };

    let guide = compute_projection_guide(4, &profile, &side, &side);
    assert_eq!(guide.reach_a, vec![3.0, 3.0]);
    assert_eq!(guide.reach_b, vec![3.0, 3.0]);
    assert!(close(guide.slopes_a[0], Vec3::Z));
    assert!(close(guide.slopes_b[0], -Vec3::Z));
    assert_eq!(guide.warnings.len(), 1);
}
