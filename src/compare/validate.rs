//! Point-cloud validation: distance from every tessellation point of one
//! model to a captured solid, summarised as a histogram plus moments.

use serde::Serialize;
use thiserror::Error;

use crate::geom::Point3;
use crate::kernel::GeometryKernel;
use crate::parse::TessDump;

use super::histogram::{Histogram, HistogramError};
use super::search::{SearchError, SearchOptions, SolidSnapshot, distance_to_solid};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Histogram(#[from] HistogramError),

    #[error("point {index}: {source}")]
    Search {
        index: usize,
        #[source]
        source: SearchError,
    },

    #[error("tessellation dump has no points")]
    NoPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidateOptions {
    pub thresholds: Vec<f64>,
    pub search: SearchOptions,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            thresholds: vec![1e-8, 1e-7, 1e-6, 1e-5, 1e-4, 1e-3, 1e-2],
            search: SearchOptions::default(),
        }
    }
}

impl ValidateOptions {
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidateReport {
    pub histogram: Histogram,
    pub count: u64,
    pub max: f64,
    pub mean: f64,
    pub rms: f64,
    /// Queries whose answer came from the untrimmed surface.
    pub refined: u64,
    pub warnings: Vec<String>,
}

/// Running sums for one batch of queries; batches merge associatively.
#[derive(Debug, Clone)]
struct Tally {
    histogram: Histogram,
    sum: f64,
    sum_sq: f64,
    max: f64,
    refined: u64,
}

impl Tally {
    fn new(thresholds: &[f64]) -> Result<Self, HistogramError> {
        Ok(Self {
            histogram: Histogram::new(thresholds.to_vec())?,
            sum: 0.0,
            sum_sq: 0.0,
            max: 0.0,
            refined: 0,
        })
    }

    fn record(mut self, distance: f64, refined: bool) -> Self {
        self.histogram.add(distance);
        self.sum += distance;
        self.sum_sq += distance * distance;
        self.max = self.max.max(distance);
        self.refined += u64::from(refined);
        self
    }

    #[cfg(feature = "parallel")]
    fn merge(mut self, other: &Self) -> Result<Self, HistogramError> {
        self.histogram.merge(&other.histogram)?;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.max = self.max.max(other.max);
        self.refined += other.refined;
        Ok(self)
    }
}

/// Runs [`distance_to_solid`] for every node, edge and face point of `dump`.
pub fn validate_dump<K: GeometryKernel + Sync + ?Sized>(
    kernel: &K,
    snapshot: &SolidSnapshot,
    dump: &TessDump,
    options: &ValidateOptions,
) -> Result<ValidateReport, ValidateError> {
    let points: Vec<Point3> = dump.points().collect();
    if points.is_empty() {
        return Err(ValidateError::NoPoints);
    }
    let empty = Tally::new(&options.thresholds)?;

    let tally = tally_points(kernel, snapshot, &points, &options.search, &empty)?;

    let count = tally.histogram.total();
    let n = count as f64;
    let mut warnings = Vec::new();
    if tally.refined > 0 {
        warnings.push(format!(
            "{} of {count} distances came from the untrimmed surface",
            tally.refined
        ));
    }
    log::debug!(
        "validated {count} points: max {:.3e}, mean {:.3e}",
        tally.max,
        tally.sum / n
    );
    Ok(ValidateReport {
        count,
        max: tally.max,
        mean: tally.sum / n,
        rms: (tally.sum_sq / n).sqrt(),
        refined: tally.refined,
        histogram: tally.histogram,
        warnings,
    })
}

fn query<K: GeometryKernel + ?Sized>(
    kernel: &K,
    snapshot: &SolidSnapshot,
    index: usize,
    point: Point3,
    search: &SearchOptions,
) -> Result<(f64, bool), ValidateError> {
    distance_to_solid(kernel, snapshot, point, search)
        .map(|result| (result.distance, result.refined))
        .map_err(|source| ValidateError::Search { index, source })
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        fn tally_points<K: GeometryKernel + Sync + ?Sized>(
            kernel: &K,
            snapshot: &SolidSnapshot,
            points: &[Point3],
            search: &SearchOptions,
            empty: &Tally,
        ) -> Result<Tally, ValidateError> {
            points
                .par_iter()
                .enumerate()
                .try_fold(
                    || empty.clone(),
                    |tally, (index, &point)| {
                        let (distance, refined) = query(kernel, snapshot, index, point, search)?;
                        Ok(tally.record(distance, refined))
                    },
                )
                .try_reduce(
                    || empty.clone(),
                    |a, b| a.merge(&b).map_err(ValidateError::from),
                )
        }
    } else {
        fn tally_points<K: GeometryKernel + ?Sized>(
            kernel: &K,
            snapshot: &SolidSnapshot,
            points: &[Point3],
            search: &SearchOptions,
            empty: &Tally,
        ) -> Result<Tally, ValidateError> {
            points
                .iter()
                .enumerate()
                .try_fold(empty.clone(), |tally, (index, &point)| {
                    let (distance, refined) = query(kernel, snapshot, index, point, search)?;
                    Ok(tally.record(distance, refined))
                })
        }
    }
}
