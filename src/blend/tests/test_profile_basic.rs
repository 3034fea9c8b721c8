use super::{MARKER, disk, stacked_boxes};
use crate::blend::{
    BlendError, LoopEdge, SampleMode, arc_length_fraction, extract_exposed_loops,
    reorder_for_minimal_twist, sample_edge_profile,
};
use crate::geom::{Point3, Vec3};
use crate::kernel::memory::MemoryKernel;
use crate::kernel::Sense;

const MODES: [SampleMode; 4] = [
    SampleMode::ArcLengthBoth,
    SampleMode::ParametricAArcB,
    SampleMode::ArcAParametricB,
    SampleMode::ParametricBoth,
];

fn aligned_rims(kernel: &mut MemoryKernel) -> (Vec<LoopEdge>, Vec<LoopEdge>) {
    let (lower, upper) = stacked_boxes(kernel);
    let a = extract_exposed_loops(&*kernel, lower.body, MARKER).unwrap().remove(0);
    let b = extract_exposed_loops(&*kernel, upper.body, MARKER).unwrap().remove(0);
    let (b, _) = reorder_for_minimal_twist(&*kernel, &a, &b).unwrap();
    (a.edges, b.edges)
}

#[test]
fn parametric_samples_are_uniform_and_include_corners() {
    let mut kernel = MemoryKernel::new();
    let (a, b) = aligned_rims(&mut kernel);

    let profile = sample_edge_profile(&kernel, &a[0], &b[0], 5, SampleMode::ParametricBoth).unwrap();
    assert_eq!(profile.len(), 5);
    let expected_a: Vec<f64> = (0..5)
        .map(|i| match a[0].sense {
            Sense::Forward => i as f64 / 4.0,
            Sense::Reverse => 1.0 - i as f64 / 4.0,
        })
        .collect();
    assert_eq!(profile.t_a, expected_a);
    for i in 0..5 {
        // The aligned upper rim sits directly above the lower one.
        assert!((profile.gap(i) - 1.0).abs() < 1e-12);
        let offset = profile.pnt_b[i].sub_point(profile.pnt_a[i]);
        assert!((offset.dot(Vec3::Z) - 1.0).abs() < 1e-12);
    }
}

#[test]
fn uniform_speed_edges_sample_alike_in_every_mode() {
    let mut kernel = MemoryKernel::new();
    let (a, b) = aligned_rims(&mut kernel);
    let reference = sample_edge_profile(&kernel, &a[1], &b[1], 7, SampleMode::ParametricBoth).unwrap();

    for mode in MODES {
        let profile = sample_edge_profile(&kernel, &a[1], &b[1], 7, mode).unwrap();
        for i in 0..7 {
            assert!(
                profile.pnt_a[i].distance_to(reference.pnt_a[i]) < 1e-6,
                "{mode:?} sample {i} on A"
            );
            assert!(
                profile.pnt_b[i].distance_to(reference.pnt_b[i]) < 1e-6,
                "{mode:?} sample {i} on B"
            );
        }
    }
}

#[test]
fn arc_length_fraction_walks_from_the_loop_start() {
    let mut kernel = MemoryKernel::new();
    let body = disk(&mut kernel);
    let circle = extract_exposed_loops(&kernel, body, MARKER).unwrap().remove(0);
    let forward = circle.edges[0];
    let backward = forward.reversed();

    let t = arc_length_fraction(&kernel, &forward, 0.25).unwrap();
    assert!((t - 0.25).abs() < 1e-6);
    let t = arc_length_fraction(&kernel, &backward, 0.25).unwrap();
    assert!((t - 0.75).abs() < 1e-6);

    assert_eq!(arc_length_fraction(&kernel, &forward, 0.0).unwrap(), 0.0);
    assert_eq!(arc_length_fraction(&kernel, &backward, 0.0).unwrap(), 1.0);
    assert_eq!(arc_length_fraction(&kernel, &forward, 2.0).unwrap(), 1.0);
}

#[test]
fn arc_samples_follow_the_circle() {
    let mut kernel = MemoryKernel::new();
    let body = disk(&mut kernel);
    let circle = extract_exposed_loops(&kernel, body, MARKER).unwrap().remove(0);
    let (upper, lower) = (circle.edges[0], circle.edges[1]);

    let profile = sample_edge_profile(&kernel, &upper, &lower, 9, SampleMode::ArcLengthBoth).unwrap();
    for (pa, pb) in profile.pnt_a.iter().zip(&profile.pnt_b) {
        assert!((pa.distance_to(Point3::ORIGIN) - 1.0).abs() < 1e-9);
        assert!(pa.y >= -1e-9 && pb.y <= 1e-9);
        // Half circles walked from opposite ends mirror each other.
        assert!(pa.distance_to(Point3::new(-pb.x, -pb.y, 0.0)) < 1e-6);
    }
}

#[test]
fn too_few_samples_are_rejected() {
    let mut kernel = MemoryKernel::new();
    let (a, b) = aligned_rims(&mut kernel);
    let err = sample_edge_profile(&kernel, &a[0], &b[0], 1, SampleMode::ParametricBoth).unwrap_err();
    assert!(matches!(err, BlendError::InvalidOption(_)));
}
