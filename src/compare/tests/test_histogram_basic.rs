use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::compare::histogram::{Histogram, HistogramError, classify};

#[test]
fn classify_follows_binary_search_buckets() {
    let thresholds = [1.0, 2.0, 5.0, 10.0];
    let buckets: Vec<usize> = [0.5, 1.5, 7.0, 20.0]
        .into_iter()
        .map(|v| classify(v, &thresholds))
        .collect();
    assert_eq!(buckets, vec![0, 1, 3, 4]);
}

#[test]
fn upper_thresholds_are_inclusive() {
    let thresholds = [1.0, 2.0, 5.0, 10.0];
    assert_eq!(classify(1.0, &thresholds), 0);
    assert_eq!(classify(2.0, &thresholds), 1);
    assert_eq!(classify(5.0, &thresholds), 2);
    assert_eq!(classify(10.0, &thresholds), 3);
    assert_eq!(classify(10.000_001, &thresholds), 4);
}

#[test]
fn four_sample_scenario_counts() {
    let mut histogram = Histogram::new(vec![1.0, 2.0, 5.0, 10.0]).unwrap();
    histogram.extend([0.5, 1.5, 7.0, 20.0]);
    assert_eq!(histogram.counts(), &[1, 1, 0, 1, 1]);
    assert_eq!(histogram.total(), 4);
}

#[test]
fn counts_are_conserved_and_classification_is_stable() {
    let thresholds = vec![1e-6, 1e-4, 1e-2, 1.0];
    let mut histogram = Histogram::new(thresholds.clone()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let samples: Vec<f64> = (0..500)
        .map(|_| 10f64.powf(rng.random_range(-8.0..1.0)))
        .collect();

    for &s in &samples {
        let bucket = histogram.add(s);
        assert_eq!(bucket, classify(s, &thresholds));
    }
    assert_eq!(histogram.total(), samples.len() as u64);
}

#[test]
fn merge_adds_counts_of_matching_layouts() {
    let mut a = Histogram::new(vec![1.0, 2.0]).unwrap();
    let mut b = a.clone();
    a.extend([0.5, 1.5]);
    b.extend([1.5, 3.0, 4.0]);
    a.merge(&b).unwrap();
    assert_eq!(a.counts(), &[1, 2, 2]);

    let other = Histogram::new(vec![1.0, 3.0]).unwrap();
    assert_eq!(a.merge(&other), Err(HistogramError::ThresholdMismatch));
}

#[test]
fn thresholds_must_increase() {
    assert_eq!(Histogram::new(Vec::new()), Err(HistogramError::NoThresholds));
    assert_eq!(
        Histogram::new(vec![1.0, 1.0, 2.0]),
        Err(HistogramError::NotIncreasing { index: 1 })
    );
    assert_eq!(
        Histogram::new(vec![1.0, f64::NAN]),
        Err(HistogramError::NotIncreasing { index: 1 })
    );
}

#[test]
fn render_shows_ranges_percentages_and_bars() {
    let mut histogram = Histogram::new(vec![1.0, 2.0]).unwrap();
    histogram.extend([0.5, 0.6, 0.7, 1.5]);
    let text = histogram.render();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("75.00%"), "{}", lines[0]);
    assert!(lines[0].contains("x <= 1e0"));
    assert!(lines[0].ends_with("|****+****+****+"), "{}", lines[0]);
    assert!(lines[1].contains("1e0 < x <= 2e0"));
    assert!(lines[1].ends_with("|****+"));
    assert!(lines[2].contains("x > 2e0"));
    assert!(lines[2].ends_with('|'));
    assert_eq!(histogram.to_string(), text);
}
