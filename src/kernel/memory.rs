//! In-memory reference kernel.
//!
//! Curves are lines or circular arcs over the unit domain; surfaces are
//! unbounded planes or [`HermiteBlendSurface`] patches. Faces trim their
//! surface to a rectangular parameter window and carry explicit edge loops
//! (faces created by [`GeometryKernel::make_face`] have none and are bounded by
//! their four iso-parametric sides instead). Projection onto a face honours
//! its loops; tessellation covers the whole window.
//!
//! Sewing matches boundary segments geometrically: two segments pair up when
//! their end points coincide (in either direction) and every interior sample of
//! each lies within tolerance of the other. Faces joined by a pair share a
//! shell; a result with every segment paired is a solid.

use std::collections::{BTreeMap, HashMap};

use crate::geom::{
    Arc3, BBox, Curve3, HermiteBlendSurface, Line3, PlaneSurface, Point3, Surface, UvDomain,
    Vec3, arc_length_between, sampled_closest_parameter,
};

use super::{
    AttrValue, BodyId, BodyKind, EdgeId, EdgeInfo, Entity, Evaluation, FaceId, FaceOrientation,
    GeometryKernel, KernelError, NodeId, Params, Projection, Sense, SewResult, SurfaceId,
    SurfaceRows,
};

mod primitives;

pub use primitives::{BoxSide, BoxTopology, PlateTopology};

const SEW_SAMPLES: usize = 32;

/// Samples per loop edge when classifying a point against a trimmed face.
const LOOP_SAMPLES: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum CurveGeom {
    Line(Line3),
    Arc(Arc3),
}

impl Curve3 for CurveGeom {
    fn point_at(&self, t: f64) -> Point3 {
        match self {
            Self::Line(c) => c.point_at(t),
            Self::Arc(c) => c.point_at(t),
        }
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        match self {
            Self::Line(c) => c.derivative_at(t),
            Self::Arc(c) => c.derivative_at(t),
        }
    }

    fn closest_parameter(&self, point: Point3) -> f64 {
        match self {
            Self::Line(c) => c.closest_parameter(point),
            Self::Arc(c) => c.closest_parameter(point),
        }
    }

    fn bounding_box(&self) -> BBox {
        match self {
            Self::Line(c) => c.bounding_box(),
            Self::Arc(c) => c.bounding_box(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceGeom {
    Plane(PlaneSurface),
    Hermite(HermiteBlendSurface),
}

impl Surface for SurfaceGeom {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        match self {
            Self::Plane(s) => s.point_at(u, v),
            Self::Hermite(s) => s.point_at(u, v),
        }
    }

    fn natural_domain(&self) -> Option<UvDomain> {
        match self {
            Self::Plane(s) => s.natural_domain(),
            Self::Hermite(s) => s.natural_domain(),
        }
    }

    fn partial_derivatives_at(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        match self {
            Self::Plane(s) => s.partial_derivatives_at(u, v),
            Self::Hermite(s) => s.partial_derivatives_at(u, v),
        }
    }

    fn closest_uv(&self, point: Point3, window: Option<UvDomain>) -> (f64, f64) {
        match self {
            Self::Plane(s) => s.closest_uv(point, window),
            Self::Hermite(s) => s.closest_uv(point, window),
        }
    }

    fn bounding_box_over(&self, window: UvDomain) -> BBox {
        match self {
            Self::Plane(s) => s.bounding_box_over(window),
            Self::Hermite(s) => s.bounding_box_over(window),
        }
    }
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    /// `None` for degenerate edges.
    curve: Option<CurveGeom>,
    nodes: [NodeId; 2],
}

#[derive(Debug, Clone)]
struct FaceRecord {
    surface: SurfaceId,
    window: UvDomain,
    orientation: FaceOrientation,
    loops: Vec<Vec<(EdgeId, Sense)>>,
}

#[derive(Debug, Clone)]
struct BodyRecord {
    faces: Vec<FaceId>,
    kind: BodyKind,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKernel {
    nodes: Vec<Point3>,
    edges: Vec<EdgeRecord>,
    surfaces: Vec<SurfaceGeom>,
    faces: Vec<FaceRecord>,
    bodies: Vec<BodyRecord>,
    edge_faces: Vec<Vec<FaceId>>,
    attributes: HashMap<Entity, BTreeMap<String, AttrValue>>,
}

fn to_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl MemoryKernel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, point: Point3) -> NodeId {
        self.nodes.push(point);
        NodeId(to_u32(self.nodes.len() - 1))
    }

    /// Straight edge between two existing nodes.
    pub fn add_line_edge(&mut self, start: NodeId, end: NodeId) -> Result<EdgeId, KernelError> {
        let line = Line3::new(self.node(start)?, self.node(end)?);
        Ok(self.push_edge(Some(CurveGeom::Line(line)), [start, end]))
    }

    /// Arc edge; its end points must coincide with the node coordinates.
    pub fn add_arc_edge(
        &mut self,
        start: NodeId,
        end: NodeId,
        arc: Arc3,
    ) -> Result<EdgeId, KernelError> {
        self.node(start)?;
        self.node(end)?;
        Ok(self.push_edge(Some(CurveGeom::Arc(arc)), [start, end]))
    }

    /// Zero-length edge collapsed onto `node`.
    pub fn add_degenerate_edge(&mut self, node: NodeId) -> Result<EdgeId, KernelError> {
        self.node(node)?;
        Ok(self.push_edge(None, [node, node]))
    }

    fn push_edge(&mut self, curve: Option<CurveGeom>, nodes: [NodeId; 2]) -> EdgeId {
        self.edges.push(EdgeRecord { curve, nodes });
        self.edge_faces.push(Vec::new());
        EdgeId(to_u32(self.edges.len() - 1))
    }

    pub fn add_surface(&mut self, surface: SurfaceGeom) -> SurfaceId {
        self.surfaces.push(surface);
        SurfaceId(to_u32(self.surfaces.len() - 1))
    }

    /// Face trimmed to `window` and bounded by `loops`.
    ///
    /// Projection onto a face with loops stays inside the loops; a point whose
    /// window projection falls outside them lands on the nearest loop edge.
    /// Plane faces with loops are boxed by their edges. Other faces are boxed
    /// by their window, as are all faces when tessellated.
    pub fn add_face(
        &mut self,
        surface: SurfaceId,
        window: UvDomain,
        orientation: FaceOrientation,
        loops: Vec<Vec<(EdgeId, Sense)>>,
    ) -> Result<FaceId, KernelError> {
        self.surface(surface)?;
        for &(edge, _) in loops.iter().flatten() {
            self.edge(edge)?;
        }

        let id = FaceId(to_u32(self.faces.len()));
        for &(edge, _) in loops.iter().flatten() {
            let adjacent = &mut self.edge_faces[edge.index()];
            if !adjacent.contains(&id) {
                adjacent.push(id);
            }
        }
        self.faces.push(FaceRecord {
            surface,
            window,
            orientation,
            loops,
        });
        Ok(id)
    }

    pub fn add_body(&mut self, faces: Vec<FaceId>, kind: BodyKind) -> Result<BodyId, KernelError> {
        for &face in &faces {
            self.face(face)?;
        }
        self.bodies.push(BodyRecord { faces, kind });
        Ok(BodyId(to_u32(self.bodies.len() - 1)))
    }

    pub fn body_kind(&self, body: BodyId) -> Result<BodyKind, KernelError> {
        self.body(body).map(|b| b.kind)
    }

    /// Parameter window a face trims its surface to.
    pub fn face_window(&self, face: FaceId) -> Result<UvDomain, KernelError> {
        self.face(face).map(|f| f.window)
    }

    fn node(&self, id: NodeId) -> Result<Point3, KernelError> {
        self.nodes
            .get(id.index())
            .copied()
            .ok_or(KernelError::UnknownEntity(Entity::Node(id)))
    }

    fn edge(&self, id: EdgeId) -> Result<&EdgeRecord, KernelError> {
        self.edges
            .get(id.index())
            .ok_or(KernelError::UnknownEntity(Entity::Edge(id)))
    }

    fn curve(&self, id: EdgeId) -> Result<&CurveGeom, KernelError> {
        self.edge(id)?.curve.as_ref().ok_or(KernelError::Degenerate {
            entity: Entity::Edge(id),
        })
    }

    fn surface(&self, id: SurfaceId) -> Result<&SurfaceGeom, KernelError> {
        self.surfaces
            .get(id.index())
            .ok_or(KernelError::UnknownEntity(Entity::Surface(id)))
    }

    fn face(&self, id: FaceId) -> Result<&FaceRecord, KernelError> {
        self.faces
            .get(id.index())
            .ok_or(KernelError::UnknownEntity(Entity::Face(id)))
    }

    fn body(&self, id: BodyId) -> Result<&BodyRecord, KernelError> {
        self.bodies
            .get(id.index())
            .ok_or(KernelError::UnknownEntity(Entity::Body(id)))
    }

    fn exists(&self, entity: Entity) -> bool {
        match entity {
            Entity::Node(id) => id.index() < self.nodes.len(),
            Entity::Edge(id) => id.index() < self.edges.len(),
            Entity::Face(id) => id.index() < self.faces.len(),
            Entity::Surface(id) => id.index() < self.surfaces.len(),
            Entity::Body(id) => id.index() < self.bodies.len(),
        }
    }

    /// Even-odd classification of `uv` against the loops of `record`, each
    /// loop taken as a polygon through samples of its edges in parameter space.
    fn loops_contain(
        &self,
        record: &FaceRecord,
        surface: &SurfaceGeom,
        uv: (f64, f64),
    ) -> Result<bool, KernelError> {
        let mut inside = false;
        for face_loop in &record.loops {
            let mut polygon = Vec::new();
            for &(edge, sense) in face_loop {
                let Some(curve) = self.edge(edge)?.curve.as_ref() else {
                    continue;
                };
                for i in 0..LOOP_SAMPLES {
                    let f = i as f64 / LOOP_SAMPLES as f64;
                    let t = match sense {
                        Sense::Forward => f,
                        Sense::Reverse => 1.0 - f,
                    };
                    polygon.push(surface.closest_uv(curve.point_at(t), Some(record.window)));
                }
            }
            if polygon_contains(&polygon, uv) {
                inside = !inside;
            }
        }
        Ok(inside)
    }

    fn nearest_on_loops(
        &self,
        record: &FaceRecord,
        point: Point3,
    ) -> Result<Option<Point3>, KernelError> {
        let mut best: Option<(f64, Point3)> = None;
        for &(edge, _) in record.loops.iter().flatten() {
            let Some(curve) = self.edge(edge)?.curve.as_ref() else {
                continue;
            };
            let candidate = curve.point_at(curve.closest_parameter(point));
            let distance = candidate.distance_to(point);
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, candidate));
            }
        }
        Ok(best.map(|(_, p)| p))
    }

    fn loop_bounding_box(&self, record: &FaceRecord) -> Result<Option<BBox>, KernelError> {
        let mut bbox: Option<BBox> = None;
        for &(edge, _) in record.loops.iter().flatten() {
            let edge_box = self.bounding_box(Entity::Edge(edge))?;
            bbox = Some(bbox.map_or(edge_box, |b| b.union(edge_box)));
        }
        Ok(bbox)
    }

    /// Boundary pieces of `face`: its loop edges, or its four iso sides when
    /// it has no loops.
    fn boundary_segments(&self, face: FaceId) -> Result<Vec<BoundaryCurve<'_>>, KernelError> {
        let record = self.face(face)?;
        if !record.loops.is_empty() {
            let mut segments = Vec::new();
            for &(edge, _) in record.loops.iter().flatten() {
                if let Some(curve) = self.edge(edge)?.curve.as_ref() {
                    segments.push(BoundaryCurve::Edge(curve));
                }
            }
            return Ok(segments);
        }

        let surface = self.surface(record.surface)?;
        Ok([IsoSide::U0, IsoSide::U1, IsoSide::V0, IsoSide::V1]
            .into_iter()
            .map(|side| BoundaryCurve::Iso {
                surface,
                window: record.window,
                side,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IsoSide {
    U0,
    U1,
    V0,
    V1,
}

/// One boundary piece of a face, parameterized over `[0, 1]`.
enum BoundaryCurve<'a> {
    Edge(&'a CurveGeom),
    Iso {
        surface: &'a SurfaceGeom,
        window: UvDomain,
        side: IsoSide,
    },
}

impl Curve3 for BoundaryCurve<'_> {
    fn point_at(&self, t: f64) -> Point3 {
        match self {
            Self::Edge(curve) => curve.point_at(t),
            Self::Iso {
                surface,
                window,
                side,
            } => {
                let (u, v) = match side {
                    IsoSide::U0 => window.lerp(0.0, t),
                    IsoSide::U1 => window.lerp(1.0, t),
                    IsoSide::V0 => window.lerp(t, 0.0),
                    IsoSide::V1 => window.lerp(t, 1.0),
                };
                surface.point_at(u, v)
            }
        }
    }

    fn closest_parameter(&self, point: Point3) -> f64 {
        match self {
            Self::Edge(curve) => curve.closest_parameter(point),
            Self::Iso { .. } => sampled_closest_parameter(self, point),
        }
    }
}

/// A boundary piece with its cached samples.
///
/// Besides the two end points a segment is sampled at interval midpoints, so
/// the checks fall between the knots of an interpolating curve instead of on
/// them.
struct Segment<'a> {
    slot: usize,
    curve: BoundaryCurve<'a>,
    start: Point3,
    end: Point3,
    samples: Vec<Point3>,
}

impl<'a> Segment<'a> {
    fn new(slot: usize, curve: BoundaryCurve<'a>) -> Self {
        let step = 1.0 / SEW_SAMPLES as f64;
        let interior = (0..SEW_SAMPLES).map(|i| (i as f64 + 0.5) * step);
        let samples = std::iter::once(0.0)
            .chain(interior)
            .chain(std::iter::once(1.0))
            .map(|t| curve.point_at(t))
            .collect();
        Self {
            slot,
            start: curve.point_at(0.0),
            end: curve.point_at(1.0),
            curve,
            samples,
        }
    }

    fn length(&self) -> f64 {
        self.samples.windows(2).map(|w| w[0].distance_to(w[1])).sum()
    }

    /// Whether every sample of `self` lies within `tol` of `other`.
    fn lies_on(&self, other: &Self, tol: f64) -> bool {
        self.samples.iter().all(|&p| {
            let t = other.curve.closest_parameter(p);
            other.curve.point_at(t).distance_to(p) <= tol
        })
    }

    fn matches(&self, other: &Self, tol: f64) -> bool {
        let (a0, a1) = (self.start, self.end);
        let (b0, b1) = (other.start, other.end);
        let ends = (a0.distance_to(b0) <= tol && a1.distance_to(b1) <= tol)
            || (a0.distance_to(b1) <= tol && a1.distance_to(b0) <= tol);
        ends && self.lies_on(other, tol) && other.lies_on(self, tol)
    }
}

fn polygon_contains(polygon: &[(f64, f64)], (u, v): (f64, f64)) -> bool {
    let n = polygon.len();
    let crossings = (0..n)
        .filter(|&i| {
            let (ui, vi) = polygon[i];
            let (uj, vj) = polygon[(i + n - 1) % n];
            (vi > v) != (vj > v) && u < (uj - ui) * (v - vi) / (vj - vi) + ui
        })
        .count();
    crossings % 2 == 1
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

impl GeometryKernel for MemoryKernel {
    fn bounding_box(&self, entity: Entity) -> Result<BBox, KernelError> {
        match entity {
            Entity::Node(id) => self.node(id).map(BBox::from_point),
            Entity::Edge(id) => {
                let record = self.edge(id)?;
                match &record.curve {
                    Some(curve) => Ok(curve.bounding_box()),
                    None => self.node(record.nodes[0]).map(BBox::from_point),
                }
            }
            Entity::Face(id) => {
                let record = self.face(id)?;
                let surface = self.surface(record.surface)?;
                let loop_box = match surface {
                    SurfaceGeom::Plane(_) => self.loop_bounding_box(record)?,
                    SurfaceGeom::Hermite(_) => None,
                };
                Ok(loop_box.unwrap_or_else(|| surface.bounding_box_over(record.window)))
            }
            Entity::Surface(id) => {
                let surface = self.surface(id)?;
                surface
                    .natural_domain()
                    .map(|window| surface.bounding_box_over(window))
                    .ok_or(KernelError::Unsupported {
                        entity,
                        operation: "bounding box of an unbounded surface",
                    })
            }
            Entity::Body(id) => {
                let mut bbox: Option<BBox> = None;
                for &face in &self.body(id)?.faces {
                    let face_box = self.bounding_box(Entity::Face(face))?;
                    bbox = Some(bbox.map_or(face_box, |b| b.union(face_box)));
                }
                bbox.ok_or(KernelError::Unsupported {
                    entity,
                    operation: "bounding box of an empty body",
                })
            }
        }
    }

    fn inverse_evaluate(&self, entity: Entity, point: Point3) -> Result<Projection, KernelError> {
        match entity {
            Entity::Node(id) => Ok(Projection {
                params: Params::None,
                point: self.node(id)?,
            }),
            Entity::Edge(id) => {
                let curve = self.curve(id)?;
                let t = curve.closest_parameter(point);
                Ok(Projection {
                    params: Params::Curve(t),
                    point: curve.point_at(t),
                })
            }
            Entity::Face(id) => {
                let record = self.face(id)?;
                let surface = self.surface(record.surface)?;
                let mut uv = surface.closest_uv(point, Some(record.window));
                let outside = !record.loops.is_empty() && !self.loops_contain(record, surface, uv)?;
                let boundary = if outside {
                    self.nearest_on_loops(record, point)?
                } else {
                    None
                };
                if let Some(boundary) = boundary {
                    uv = surface.closest_uv(boundary, Some(record.window));
                }
                let (u, v) = uv;
                Ok(Projection {
                    params: Params::Surface(u, v),
                    point: surface.point_at(u, v),
                })
            }
            Entity::Surface(id) => {
                let surface = self.surface(id)?;
                let (u, v) = surface.closest_uv(point, None);
                Ok(Projection {
                    params: Params::Surface(u, v),
                    point: surface.point_at(u, v),
                })
            }
            Entity::Body(_) => Err(KernelError::Unsupported {
                entity,
                operation: "inverse evaluation",
            }),
        }
    }

    fn evaluate(&self, entity: Entity, params: Params) -> Result<Evaluation, KernelError> {
        match (entity, params) {
            (Entity::Node(id), Params::None) => Ok(Evaluation {
                point: self.node(id)?,
                du: Vec3::ZERO,
                dv: Vec3::ZERO,
            }),
            (Entity::Edge(id), Params::Curve(t)) => {
                let curve = self.curve(id)?;
                Ok(Evaluation {
                    point: curve.point_at(t),
                    du: curve.derivative_at(t),
                    dv: Vec3::ZERO,
                })
            }
            (Entity::Face(id), Params::Surface(u, v)) => {
                let surface = self.surface(self.face(id)?.surface)?;
                let (du, dv) = surface.partial_derivatives_at(u, v);
                Ok(Evaluation {
                    point: surface.point_at(u, v),
                    du,
                    dv,
                })
            }
            (Entity::Surface(id), Params::Surface(u, v)) => {
                let surface = self.surface(id)?;
                let (du, dv) = surface.partial_derivatives_at(u, v);
                Ok(Evaluation {
                    point: surface.point_at(u, v),
                    du,
                    dv,
                })
            }
            _ => Err(KernelError::BadParams { entity, params }),
        }
    }

    fn underlying_surface(&self, face: FaceId) -> Result<SurfaceId, KernelError> {
        self.face(face).map(|f| f.surface)
    }

    fn build_approximating_surface(
        &mut self,
        rows: &SurfaceRows,
        tolerance: f64,
    ) -> Result<SurfaceId, KernelError> {
        // The patch interpolates the rows; how far it strays from the edges
        // between rows is caught by sewing at `tolerance`.
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(KernelError::Construction(format!(
                "tolerance must be finite and non-negative, got {tolerance}"
            )));
        }
        let surface = HermiteBlendSurface::new(
            rows.west.clone(),
            rows.east.clone(),
            rows.west_tangents.clone(),
            rows.east_tangents.clone(),
        )
        .map_err(KernelError::Construction)?;
        Ok(self.add_surface(SurfaceGeom::Hermite(surface)))
    }

    fn make_face(
        &mut self,
        surface: SurfaceId,
        orientation: FaceOrientation,
    ) -> Result<FaceId, KernelError> {
        let window = self
            .surface(surface)?
            .natural_domain()
            .ok_or(KernelError::Unsupported {
                entity: Entity::Surface(surface),
                operation: "face without trimming of an unbounded surface",
            })?;
        self.add_face(surface, window, orientation, Vec::new())
    }

    fn sew_faces(&mut self, faces: &[FaceId], tolerance: f64) -> Result<SewResult, KernelError> {
        if faces.is_empty() {
            return Err(KernelError::Sew("no faces to sew".to_string()));
        }

        let mut segments = Vec::new();
        for (slot, &face) in faces.iter().enumerate() {
            for curve in self.boundary_segments(face)? {
                let segment = Segment::new(slot, curve);
                if segment.length() > tolerance {
                    segments.push(segment);
                }
            }
        }

        let mut parent: Vec<usize> = (0..faces.len()).collect();
        let mut partner: Vec<Option<usize>> = vec![None; segments.len()];
        for i in 0..segments.len() {
            if partner[i].is_some() {
                continue;
            }
            for j in (i + 1)..segments.len() {
                if partner[j].is_none() && segments[i].matches(&segments[j], tolerance) {
                    partner[i] = Some(j);
                    partner[j] = Some(i);
                    let ri = find_root(&mut parent, segments[i].slot);
                    let rj = find_root(&mut parent, segments[j].slot);
                    parent[ri] = rj;
                    break;
                }
            }
        }

        let children = (0..faces.len())
            .filter(|&i| find_root(&mut parent, i) == i)
            .count();
        let unmatched = partner.iter().filter(|p| p.is_none()).count();
        let kind = if unmatched == 0 {
            BodyKind::Solid
        } else {
            BodyKind::Sheet
        };
        log::debug!(
            "sewed {} faces: {} boundary segments, {} unmatched, {} shell(s)",
            faces.len(),
            segments.len(),
            unmatched,
            children
        );

        let body = self.add_body(faces.to_vec(), kind)?;
        Ok(SewResult {
            body,
            children,
            kind,
        })
    }

    fn body_nodes(&self, body: BodyId) -> Result<Vec<NodeId>, KernelError> {
        let mut nodes = Vec::new();
        for edge in self.body_edges(body)? {
            for node in self.edge(edge)?.nodes {
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
        }
        Ok(nodes)
    }

    fn body_edges(&self, body: BodyId) -> Result<Vec<EdgeId>, KernelError> {
        let mut edges = Vec::new();
        for &face in &self.body(body)?.faces {
            for &(edge, _) in self.face(face)?.loops.iter().flatten() {
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
        Ok(edges)
    }

    fn body_faces(&self, body: BodyId) -> Result<Vec<FaceId>, KernelError> {
        self.body(body).map(|b| b.faces.clone())
    }

    fn edge_info(&self, edge: EdgeId) -> Result<EdgeInfo, KernelError> {
        let record = self.edge(edge)?;
        Ok(EdgeInfo {
            nodes: record.nodes,
            range: (0.0, 1.0),
            degenerate: record.curve.is_none(),
        })
    }

    fn edge_faces(&self, edge: EdgeId) -> Result<Vec<FaceId>, KernelError> {
        self.edge(edge)?;
        Ok(self.edge_faces[edge.index()].clone())
    }

    fn face_loops(&self, face: FaceId) -> Result<Vec<Vec<(EdgeId, Sense)>>, KernelError> {
        self.face(face).map(|f| f.loops.clone())
    }

    fn face_orientation(&self, face: FaceId) -> Result<FaceOrientation, KernelError> {
        self.face(face).map(|f| f.orientation)
    }

    fn edge_uv(
        &self,
        face: FaceId,
        edge: EdgeId,
        _sense: Sense,
        t: f64,
    ) -> Result<(f64, f64), KernelError> {
        let point = self.curve(edge)?.point_at(t);
        let record = self.face(face)?;
        let surface = self.surface(record.surface)?;
        Ok(surface.closest_uv(point, Some(record.window)))
    }

    fn arc_length(&self, edge: EdgeId, t0: f64, t1: f64) -> Result<f64, KernelError> {
        match self.edge(edge)?.curve.as_ref() {
            Some(curve) => Ok(arc_length_between(curve, t0, t1)),
            None => Ok(0.0),
        }
    }

    fn attribute(&self, entity: Entity, name: &str) -> Option<&AttrValue> {
        self.attributes.get(&entity)?.get(name)
    }

    fn attribute_names(&self, entity: Entity) -> Vec<String> {
        self.attributes
            .get(&entity)
            .map(|attrs| attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn set_attribute(
        &mut self,
        entity: Entity,
        name: &str,
        value: AttrValue,
    ) -> Result<(), KernelError> {
        if !self.exists(entity) {
            return Err(KernelError::UnknownEntity(entity));
        }
        self.attributes
            .entry(entity)
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }
}
