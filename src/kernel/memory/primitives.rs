//! Builders for simple test bodies and the sampling tessellator.

use std::collections::BTreeMap;

use crate::geom::{PlaneSurface, Point3, UvDomain, Vec3};
use crate::kernel::{
    BodyId, BodyKind, EdgeId, Entity, FaceId, FaceOrientation, GeometryKernel, KernelError,
    NodeId, Params, Sense,
};
use crate::parse::{EdgeTess, FaceTess, TessDump};

use super::{MemoryKernel, SurfaceGeom};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxSide {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl BoxSide {
    pub const ALL: [Self; 6] = [
        Self::XMin,
        Self::XMax,
        Self::YMin,
        Self::YMax,
        Self::ZMin,
        Self::ZMax,
    ];

    /// Corner indices counter-clockwise seen from outside. Corner `i` sits at
    /// `x = i & 1`, `y = (i >> 1) & 1`, `z = (i >> 2) & 1` of the unit cell.
    const fn corners(self) -> [usize; 4] {
        match self {
            Self::XMin => [0, 4, 6, 2],
            Self::XMax => [1, 3, 7, 5],
            Self::YMin => [0, 1, 5, 4],
            Self::YMax => [2, 6, 7, 3],
            Self::ZMin => [0, 2, 3, 1],
            Self::ZMax => [4, 5, 7, 6],
        }
    }
}

/// Handles of a box built by [`MemoryKernel::make_box`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxTopology {
    pub body: BodyId,
    pub nodes: [NodeId; 8],
    pub faces: [FaceId; 6],
    pub edges: Vec<EdgeId>,
}

impl BoxTopology {
    #[must_use]
    pub fn face(&self, side: BoxSide) -> FaceId {
        let index = BoxSide::ALL.iter().position(|s| *s == side).unwrap_or(0);
        self.faces[index]
    }
}

/// Handles of a single-face sheet built by [`MemoryKernel::make_plate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateTopology {
    pub body: BodyId,
    pub face: FaceId,
    pub edges: [EdgeId; 4],
}

impl MemoryKernel {
    /// Axis-aligned box solid. Every face is a trimmed plane whose outward
    /// normal is `du x dv`; loops run counter-clockwise seen from outside.
    pub fn make_box(&mut self, min: Point3, max: Point3) -> Result<BoxTopology, KernelError> {
        if !(min.x < max.x && min.y < max.y && min.z < max.z) {
            return Err(KernelError::Construction(format!(
                "box corners must be strictly ordered, got {min:?} and {max:?}"
            )));
        }

        let pick = |bit: usize, lo: f64, hi: f64| if bit == 0 { lo } else { hi };
        let nodes: [NodeId; 8] = std::array::from_fn(|i| {
            self.add_node(Point3::new(
                pick(i & 1, min.x, max.x),
                pick((i >> 1) & 1, min.y, max.y),
                pick((i >> 2) & 1, min.z, max.z),
            ))
        });

        let mut edge_by_pair: BTreeMap<(usize, usize), EdgeId> = BTreeMap::new();
        let mut faces = Vec::with_capacity(6);
        for side in BoxSide::ALL {
            let c = side.corners();
            let mut lp = Vec::with_capacity(4);
            for k in 0..4 {
                let (a, b) = (c[k], c[(k + 1) % 4]);
                let key = (a.min(b), a.max(b));
                let edge = match edge_by_pair.get(&key) {
                    Some(&edge) => edge,
                    None => {
                        let edge = self.add_line_edge(nodes[key.0], nodes[key.1])?;
                        edge_by_pair.insert(key, edge);
                        edge
                    }
                };
                let sense = if a < b { Sense::Forward } else { Sense::Reverse };
                lp.push((edge, sense));
            }

            let corner = |i: usize| self.node_point(nodes[c[i]]);
            let origin = corner(0)?;
            let plane = PlaneSurface::new(
                origin,
                corner(1)?.sub_point(origin),
                corner(3)?.sub_point(origin),
            );
            let surface = self.add_surface(SurfaceGeom::Plane(plane));
            faces.push(self.add_face(
                surface,
                UvDomain::UNIT,
                FaceOrientation::Forward,
                vec![lp],
            )?);
        }

        let faces: [FaceId; 6] = faces
            .try_into()
            .map_err(|_| KernelError::Construction("box must have six faces".to_string()))?;
        let body = self.add_body(faces.to_vec(), BodyKind::Solid)?;
        log::debug!("built box {body} from {min:?} to {max:?}");
        Ok(BoxTopology {
            body,
            nodes,
            faces,
            edges: edge_by_pair.into_values().collect(),
        })
    }

    /// Parallelogram sheet `origin + s * u_axis + t * v_axis`, `s, t` in
    /// `[0, 1]`, with a single counter-clockwise loop about `u_axis x v_axis`.
    pub fn make_plate(
        &mut self,
        origin: Point3,
        u_axis: Vec3,
        v_axis: Vec3,
    ) -> Result<PlateTopology, KernelError> {
        if u_axis.cross(v_axis).normalized().is_none() {
            return Err(KernelError::Construction(
                "plate axes must span a plane".to_string(),
            ));
        }

        let corners = [
            origin,
            origin.add_vec(u_axis),
            origin.add_vec(u_axis).add_vec(v_axis),
            origin.add_vec(v_axis),
        ];
        let nodes = corners.map(|p| self.add_node(p));
        let mut edges = Vec::with_capacity(4);
        for k in 0..4 {
            edges.push(self.add_line_edge(nodes[k], nodes[(k + 1) % 4])?);
        }
        let edges: [EdgeId; 4] = edges
            .try_into()
            .map_err(|_| KernelError::Construction("plate must have four edges".to_string()))?;

        let surface = self.add_surface(SurfaceGeom::Plane(PlaneSurface::new(
            origin, u_axis, v_axis,
        )));
        let face = self.add_face(
            surface,
            UvDomain::UNIT,
            FaceOrientation::Forward,
            vec![edges.iter().map(|&e| (e, Sense::Forward)).collect()],
        )?;
        let body = self.add_body(vec![face], BodyKind::Sheet)?;
        Ok(PlateTopology { body, face, edges })
    }

    /// Samples `body` into a [`TessDump`]: every edge at `n + 1` uniform
    /// parameters and every face on an `(n + 1) x (n + 1)` grid over its
    /// window, split into two triangles per cell.
    pub fn tessellate_body(&self, body: BodyId, n: usize) -> Result<TessDump, KernelError> {
        let n = n.max(1);
        let mut dump = TessDump::default();

        for node in self.body_nodes(body)? {
            dump.nodes.push(self.node_point(node)?);
        }

        for edge in self.body_edges(body)? {
            let info = self.edge_info(edge)?;
            let mut tess = EdgeTess::default();
            for i in 0..=n {
                let t = info.param_at(i as f64 / n as f64, Sense::Forward);
                let point = if info.degenerate {
                    self.node_point(info.nodes[0])?
                } else {
                    self.evaluate(Entity::Edge(edge), Params::Curve(t))?.point
                };
                tess.points.push(point);
                tess.params.push(t);
            }
            dump.edges.push(tess);
        }

        for face in self.body_faces(body)? {
            dump.faces.push(self.tessellate_face(face, n)?);
        }
        Ok(dump)
    }

    fn tessellate_face(&self, face: FaceId, n: usize) -> Result<FaceTess, KernelError> {
        let window = self.face_window(face)?;
        let mut tess = FaceTess::default();
        for j in 0..=n {
            for i in 0..=n {
                let (u, v) = window.lerp(i as f64 / n as f64, j as f64 / n as f64);
                let eval = self.evaluate(Entity::Face(face), Params::Surface(u, v))?;
                tess.points.push(eval.point);
                tess.uvs.push((u, v));
                tess.point_types.push((-1, -1));
            }
        }

        // Vertex (i, j) is 1-based index `j * (n + 1) + i + 1`; cell (i, j)
        // holds triangles 2k + 1 and 2k + 2 with k = j * n + i.
        let vertex = |i: usize, j: usize| to_i32(j * (n + 1) + i + 1);
        let tri = |i: usize, j: usize, second: bool| to_i32(2 * (j * n + i) + usize::from(second) + 1);
        for j in 0..n {
            for i in 0..n {
                let right = if i + 1 < n { tri(i + 1, j, true) } else { 0 };
                let below = if j > 0 { tri(i, j - 1, true) } else { 0 };
                let above = if j + 1 < n { tri(i, j + 1, false) } else { 0 };
                let left = if i > 0 { tri(i - 1, j, false) } else { 0 };
                tess.tris.push([
                    vertex(i, j),
                    vertex(i + 1, j),
                    vertex(i + 1, j + 1),
                    right,
                    tri(i, j, true),
                    below,
                ]);
                tess.tris.push([
                    vertex(i, j),
                    vertex(i + 1, j + 1),
                    vertex(i, j + 1),
                    above,
                    left,
                    tri(i, j, false),
                ]);
            }
        }
        Ok(tess)
    }
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
