//! Cross-blend transition surfaces between two boundary loops.
//!
//! Faces tagged with a removal marker are dropped from one or two bodies; the
//! edges left bordering a single kept face form the exposed loops. The two
//! loops are aligned, sampled edge by edge, given in-face slopes, and bridged
//! by one Hermite transition face per edge pair. The transition faces are
//! sewn with the kept faces into a single solid.
//!
//! # Pipeline
//! `Init -> LoopsExtracted -> EdgesAligned -> ProfilesSampled ->
//! SlopesComputed -> SurfacesBuilt -> Stitched -> Done`, with `Failed`
//! reachable from every stage. Nothing is retried.
//!
//! # Slope methods
//! - `Raw`: per-edge in-face slopes as sampled.
//! - `CornerFix` (default): slopes unified at loop corners and faded inward.
//! - `PlaneIntersection`: slopes aimed at a relaxed guide line on the
//!   intersection of the two tangent planes.
//! - `Projection`: the connecting vector projected into each tangent plane,
//!   scaled by a least-squares ray intersection.

mod build;
mod loops;
mod profile;
mod slopes;

pub use build::{BlendInput, BlendOutcome, CrossBlendBuilder, build_and_stitch};
pub use loops::{
    Alignment, EdgeKeys, alignment_cost, best_alignment, edge_keys, extract_exposed_loops,
    reorder_for_minimal_twist,
};
pub use profile::{EdgeProfile, arc_length_fraction, sample_edge_profile};
pub use slopes::{
    EdgeSlopes, GuideSlopes, compute_plane_intersection_guide, compute_projection_guide,
    correct_corner_slopes, fade_corners, sample_edge_slopes,
};

use std::fmt;

use serde::Serialize;

use crate::kernel::{EdgeId, FaceId, KernelError, Sense};

// ============================================================================
// Types and Options
// ============================================================================

/// How slopes along the seams are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SlopeMethod {
    /// In-face slopes exactly as sampled.
    Raw,
    /// Unify slopes at corners and fade the correction along each edge.
    #[default]
    CornerFix,
    /// Aim both slopes at a guide line where the two tangent planes meet.
    PlaneIntersection,
    /// Project the connecting vector into each tangent plane.
    Projection,
}

/// Parameter correspondence between the two sides of an edge pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SampleMode {
    /// Equal arc length on each edge independently.
    ArcLengthBoth,
    /// Uniform parameter on A, arc-length matched on B.
    ParametricAArcB,
    /// Arc length on A, uniform parameter on B.
    ArcAParametricB,
    /// Uniform parameter on both edges.
    #[default]
    ParametricBoth,
}

/// Weight profile of a corner correction from the corner (1) to the far end
/// of the edge (0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CornerFade {
    #[default]
    Linear,
    Cosine,
}

impl CornerFade {
    /// Weight at fraction `x` of the way from the far end to the corner.
    #[must_use]
    pub fn weight(self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match self {
            Self::Linear => x,
            Self::Cosine => 0.5 * (1.0 - (std::f64::consts::PI * x).cos()),
        }
    }
}

/// Options for [`CrossBlendBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendOptions {
    pub method: SlopeMethod,
    pub sample_mode: SampleMode,
    /// Samples per edge, corners included.
    pub npnt: usize,
    /// Surface fitting and sewing tolerance.
    pub tolerance: f64,
    /// Slope multiplier on side A.
    pub slope_a: f64,
    /// Slope multiplier on side B.
    pub slope_b: f64,
    /// Align loop B to loop A before sampling.
    pub reorder: bool,
    pub fade: CornerFade,
    /// Attribute name tagging faces to remove.
    pub removal_marker: String,
}

impl Default for BlendOptions {
    fn default() -> Self {
        Self {
            method: SlopeMethod::CornerFix,
            sample_mode: SampleMode::ParametricBoth,
            npnt: 9,
            tolerance: 1e-6,
            slope_a: 1.0,
            slope_b: 1.0,
            reorder: true,
            fade: CornerFade::Linear,
            removal_marker: "_flend".to_string(),
        }
    }
}

impl BlendOptions {
    #[must_use]
    pub fn with_method(mut self, method: SlopeMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_sample_mode(mut self, mode: SampleMode) -> Self {
        self.sample_mode = mode;
        self
    }

    #[must_use]
    pub fn with_npnt(mut self, npnt: usize) -> Self {
        self.npnt = npnt;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_slopes(mut self, slope_a: f64, slope_b: f64) -> Self {
        self.slope_a = slope_a;
        self.slope_b = slope_b;
        self
    }

    #[must_use]
    pub fn with_reorder(mut self, reorder: bool) -> Self {
        self.reorder = reorder;
        self
    }

    #[must_use]
    pub fn with_fade(mut self, fade: CornerFade) -> Self {
        self.fade = fade;
        self
    }

    #[must_use]
    pub fn with_removal_marker(mut self, marker: impl Into<String>) -> Self {
        self.removal_marker = marker.into();
        self
    }

    /// Rejects options no blend could run with.
    pub fn validate(&self) -> Result<(), BlendError> {
        if self.npnt < 3 {
            return Err(BlendError::InvalidOption(format!(
                "npnt must be at least 3, got {}",
                self.npnt
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(BlendError::InvalidOption(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        for (name, value) in [("slope_a", self.slope_a), ("slope_b", self.slope_b)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BlendError::InvalidOption(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if self.removal_marker.is_empty() {
            return Err(BlendError::InvalidOption(
                "removal marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum BlendStage {
    Init,
    LoopsExtracted,
    EdgesAligned,
    ProfilesSampled,
    SlopesComputed,
    SurfacesBuilt,
    Stitched,
    Done,
    Failed,
}

impl fmt::Display for BlendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::LoopsExtracted => "loop extraction",
            Self::EdgesAligned => "edge alignment",
            Self::ProfilesSampled => "profile sampling",
            Self::SlopesComputed => "slope computation",
            Self::SurfacesBuilt => "surface construction",
            Self::Stitched => "stitching",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors of the blend pipeline. Every geometric-consistency failure has its
/// own variant and [`BlendError::code`].
#[derive(Debug, thiserror::Error)]
pub enum BlendError {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("kernel call failed during {stage}: {source}")]
    Kernel {
        stage: BlendStage,
        #[source]
        source: KernelError,
    },

    #[error("expected {expected} exposed loop(s), found {found}")]
    LoopCount { expected: usize, found: usize },

    #[error("loops differ in edge count: {a} against {b}")]
    EdgeCountMismatch { a: usize, b: usize },

    #[error("exposed edges starting at {edge} do not close into a loop")]
    OpenLoop { edge: EdgeId },

    #[error("tangent planes are parallel at edge {edge}, sample {sample}")]
    SingularPlaneIntersection { edge: usize, sample: usize },

    #[error("sewing produced {0} shells instead of one")]
    SewChildCount(usize),

    #[error("sewing produced an open sheet instead of a solid")]
    SewNotSolid,
}

impl BlendError {
    /// Stable numeric code distinguishing the failure site.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidOption(_) => -1,
            Self::Kernel { .. } => -2,
            Self::LoopCount { .. } => -10,
            Self::EdgeCountMismatch { .. } => -11,
            Self::OpenLoop { .. } => -12,
            Self::SingularPlaneIntersection { .. } => -13,
            Self::SewChildCount(_) => -14,
            Self::SewNotSolid => -15,
        }
    }

    pub(crate) fn kernel(stage: BlendStage) -> impl Fn(KernelError) -> Self {
        move |source| Self::Kernel { stage, source }
    }
}

/// One edge of an exposed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopEdge {
    pub edge: EdgeId,
    /// Direction the loop walks the edge.
    pub sense: Sense,
    /// The single kept face bordering the edge.
    pub face: FaceId,
    /// Sense of the edge within `face`'s own loop.
    pub face_sense: Sense,
}

impl LoopEdge {
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            sense: self.sense.flipped(),
            ..self
        }
    }
}

/// Closed chain of exposed edges; edge `i` ends where edge `i + 1` starts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BlendLoop {
    pub edges: Vec<LoopEdge>,
}

impl BlendLoop {
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests;
