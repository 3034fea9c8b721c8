//! The blend pipeline driver.

use serde::Serialize;

use crate::geom::Vec3;
use crate::kernel::{
    BodyId, BodyKind, Entity, FaceId, FaceOrientation, GeometryKernel, Params, SurfaceRows,
};

use super::loops::{extract_exposed_loops, kept_faces, reorder_for_minimal_twist};
use super::profile::{EdgeProfile, sample_edge_profile};
use super::slopes::{
    EdgeSlopes, GuideSlopes, averaged_corners, compute_plane_intersection_guide,
    compute_projection_guide, correct_corner_slopes, fade_corners, sample_edge_slopes,
};
use super::{Alignment, BlendError, BlendLoop, BlendOptions, BlendStage, SlopeMethod};

/// Where the two loops come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlendInput {
    /// One body whose removed faces leave exactly two loops.
    Single(BodyId),
    /// Two bodies, each left with exactly one loop.
    Dual(BodyId, BodyId),
}

impl BlendInput {
    fn bodies(self) -> Vec<BodyId> {
        match self {
            Self::Single(body) => vec![body],
            Self::Dual(a, b) => vec![a, b],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendOutcome {
    /// The sewn solid.
    pub body: BodyId,
    pub transition_faces: Vec<FaceId>,
    /// How loop B was rotated onto loop A, when reordering ran.
    pub alignment: Option<Alignment>,
    pub warnings: Vec<String>,
}

/// Runs the blend pipeline once, tracking the stage it reached.
#[derive(Debug, Clone)]
pub struct CrossBlendBuilder {
    options: BlendOptions,
    stage: BlendStage,
}

impl CrossBlendBuilder {
    #[must_use]
    pub const fn new(options: BlendOptions) -> Self {
        Self {
            options,
            stage: BlendStage::Init,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &BlendOptions {
        &self.options
    }

    /// Last stage completed, or `Failed`.
    #[must_use]
    pub const fn stage(&self) -> BlendStage {
        self.stage
    }

    fn advance(&mut self, stage: BlendStage) {
        log::debug!("blend: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    pub fn build<K: GeometryKernel + ?Sized>(
        &mut self,
        kernel: &mut K,
        input: BlendInput,
    ) -> Result<BlendOutcome, BlendError> {
        self.stage = BlendStage::Init;
        let result = self.run(kernel, input);
        if let Err(error) = &result {
            log::error!(
                "blend failed after {} (code {}): {error}",
                self.stage,
                error.code()
            );
            self.stage = BlendStage::Failed;
        }
        result
    }

    fn run<K: GeometryKernel + ?Sized>(
        &mut self,
        kernel: &mut K,
        input: BlendInput,
    ) -> Result<BlendOutcome, BlendError> {
        self.options.validate()?;
        let options = self.options.clone();
        let mut warnings = Vec::new();

        let (loop_a, loop_b) = extract_pair(&*kernel, input, &options.removal_marker)?;
        self.advance(BlendStage::LoopsExtracted);

        let (loop_b, alignment) = if options.reorder {
            let (aligned, alignment) = reorder_for_minimal_twist(&*kernel, &loop_a, &loop_b)?;
            (aligned, Some(alignment))
        } else if loop_a.len() == loop_b.len() {
            (loop_b, None)
        } else {
            return Err(BlendError::EdgeCountMismatch {
                a: loop_a.len(),
                b: loop_b.len(),
            });
        };
        self.advance(BlendStage::EdgesAligned);

        let profiles = loop_a
            .edges
            .iter()
            .zip(&loop_b.edges)
            .map(|(a, b)| sample_edge_profile(&*kernel, a, b, options.npnt, options.sample_mode))
            .collect::<Result<Vec<_>, _>>()?;
        self.advance(BlendStage::ProfilesSampled);

        let guides = edge_guides(&*kernel, &options, &loop_a, &loop_b, &profiles, &mut warnings)?;
        self.advance(BlendStage::SlopesComputed);

        let mut transition_faces = Vec::with_capacity(profiles.len());
        for (profile, guide) in profiles.iter().zip(&guides) {
            transition_faces.push(transition_face(kernel, &options, profile, guide)?);
        }
        self.advance(BlendStage::SurfacesBuilt);

        let mut faces = kept_faces(&*kernel, &input.bodies(), &options.removal_marker)?;
        faces.extend_from_slice(&transition_faces);
        let sewn = kernel
            .sew_faces(&faces, options.tolerance)
            .map_err(BlendError::kernel(BlendStage::Stitched))?;
        if sewn.children != 1 {
            return Err(BlendError::SewChildCount(sewn.children));
        }
        if sewn.kind != BodyKind::Solid {
            return Err(BlendError::SewNotSolid);
        }
        self.advance(BlendStage::Stitched);

        log::info!(
            "blended {} edge pair(s) into {} ({} warning(s))",
            transition_faces.len(),
            sewn.body,
            warnings.len()
        );
        self.advance(BlendStage::Done);
        Ok(BlendOutcome {
            body: sewn.body,
            transition_faces,
            alignment,
            warnings,
        })
    }
}

/// Runs a fresh [`CrossBlendBuilder`] with `options`.
pub fn build_and_stitch<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    input: BlendInput,
    options: &BlendOptions,
) -> Result<BlendOutcome, BlendError> {
    CrossBlendBuilder::new(options.clone()).build(kernel, input)
}

fn single_loop(mut loops: Vec<BlendLoop>) -> Result<BlendLoop, BlendError> {
    match loops.len() {
        1 => Ok(loops.remove(0)),
        found => Err(BlendError::LoopCount { expected: 1, found }),
    }
}

fn extract_pair<K: GeometryKernel + ?Sized>(
    kernel: &K,
    input: BlendInput,
    marker: &str,
) -> Result<(BlendLoop, BlendLoop), BlendError> {
    match input {
        BlendInput::Single(body) => {
            let mut loops = extract_exposed_loops(kernel, body, marker)?;
            if loops.len() != 2 {
                return Err(BlendError::LoopCount {
                    expected: 2,
                    found: loops.len(),
                });
            }
            let second = loops.remove(1);
            Ok((loops.remove(0), second))
        }
        BlendInput::Dual(a, b) => Ok((
            single_loop(extract_exposed_loops(kernel, a, marker)?)?,
            single_loop(extract_exposed_loops(kernel, b, marker)?)?,
        )),
    }
}

fn sample_loop_slopes<K: GeometryKernel + ?Sized>(
    kernel: &K,
    lp: &BlendLoop,
    params: impl Fn(&EdgeProfile) -> &[f64],
    profiles: &[EdgeProfile],
) -> Result<Vec<EdgeSlopes>, BlendError> {
    lp.edges
        .iter()
        .zip(profiles)
        .map(|(le, profile)| sample_edge_slopes(kernel, le, params(profile)))
        .collect()
}

/// Slopes and tangent lengths per edge pair for the configured method.
fn edge_guides<K: GeometryKernel + ?Sized>(
    kernel: &K,
    options: &BlendOptions,
    loop_a: &BlendLoop,
    loop_b: &BlendLoop,
    profiles: &[EdgeProfile],
    warnings: &mut Vec<String>,
) -> Result<Vec<GuideSlopes>, BlendError> {
    let mut slopes_a = sample_loop_slopes(kernel, loop_a, |p| p.t_a.as_slice(), profiles)?;
    let mut slopes_b = sample_loop_slopes(kernel, loop_b, |p| p.t_b.as_slice(), profiles)?;

    let mut guides = match options.method {
        SlopeMethod::Raw => direct_guides(profiles, &slopes_a, &slopes_b),
        SlopeMethod::CornerFix => {
            warnings.extend(correct_corner_slopes(kernel, loop_a, &mut slopes_a, options.fade)?);
            warnings.extend(correct_corner_slopes(kernel, loop_b, &mut slopes_b, options.fade)?);
            direct_guides(profiles, &slopes_a, &slopes_b)
        }
        SlopeMethod::PlaneIntersection => profiles
            .iter()
            .enumerate()
            .map(|(k, profile)| {
                compute_plane_intersection_guide(k, profile, &slopes_a[k], &slopes_b[k])
            })
            .collect::<Result<Vec<_>, _>>()?,
        SlopeMethod::Projection => {
            let mut guides: Vec<GuideSlopes> = profiles
                .iter()
                .enumerate()
                .map(|(k, profile)| compute_projection_guide(k, profile, &slopes_a[k], &slopes_b[k]))
                .collect();
            fade_guide_corners(&mut guides, options);
            guides
        }
    };

    for guide in &mut guides {
        warnings.append(&mut guide.warnings);
    }
    Ok(guides)
}

fn direct_guides(
    profiles: &[EdgeProfile],
    slopes_a: &[EdgeSlopes],
    slopes_b: &[EdgeSlopes],
) -> Vec<GuideSlopes> {
    profiles
        .iter()
        .zip(slopes_a.iter().zip(slopes_b))
        .map(|(profile, (a, b))| GuideSlopes::direct(profile, a, b))
        .collect()
}

/// Projected slopes disagree at corners; average them there on both sides.
fn fade_guide_corners(guides: &mut [GuideSlopes], options: &BlendOptions) {
    let mut rows_a: Vec<Vec<Vec3>> = guides.iter().map(|g| g.slopes_a.clone()).collect();
    let mut rows_b: Vec<Vec<Vec3>> = guides.iter().map(|g| g.slopes_b.clone()).collect();
    let corners_a = averaged_corners(&rows_a);
    let corners_b = averaged_corners(&rows_b);
    fade_corners(&mut rows_a, &corners_a, options.fade);
    fade_corners(&mut rows_b, &corners_b, options.fade);
    for (guide, (a, b)) in guides.iter_mut().zip(rows_a.into_iter().zip(rows_b)) {
        guide.slopes_a = a;
        guide.slopes_b = b;
    }
}

/// Builds the Hermite patch for one edge pair and wraps it in a face whose
/// normal agrees with side A's kept face.
fn transition_face<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    options: &BlendOptions,
    profile: &EdgeProfile,
    guide: &GuideSlopes,
) -> Result<FaceId, BlendError> {
    let err = BlendError::kernel(BlendStage::SurfacesBuilt);
    let n = profile.len();
    let rows = SurfaceRows {
        west: profile.pnt_a.clone(),
        east: profile.pnt_b.clone(),
        west_tangents: (0..n)
            .map(|i| guide.slopes_a[i] * (guide.reach_a[i] * options.slope_a))
            .collect(),
        east_tangents: (0..n)
            .map(|i| -(guide.slopes_b[i] * (guide.reach_b[i] * options.slope_b)))
            .collect(),
    };
    let surface = kernel
        .build_approximating_surface(&rows, options.tolerance)
        .map_err(&err)?;

    // Compare against side A's normal halfway along the seam.
    let mid = n / 2;
    let u = mid as f64 / (n - 1).max(1) as f64;
    let eval = kernel
        .evaluate(Entity::Surface(surface), Params::Surface(u, 0.0))
        .map_err(&err)?;
    let orientation = if eval.du.cross(eval.dv).dot(guide.normals_a[mid]) > 0.0 {
        FaceOrientation::Forward
    } else {
        FaceOrientation::Reverse
    };
    kernel.make_face(surface, orientation).map_err(err)
}
