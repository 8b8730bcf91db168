// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall segment mesh generation
//!
//! A wall segment is built in its own local frame: `x` runs along the wall
//! from the start vertex, `y` is up, the front face lies at `z = 0` and the
//! back face at `z = -thickness`. The placement matrix maps that frame into
//! the coordinate space of the segment's owner.
//!
//! Doors are notches in the front outline, windows are interior holes. The
//! back outline is the front outline shifted by the thickness, with its end
//! x-coordinates skewed by the miter angles so adjoining walls meet flush.

use nalgebra::{Matrix4, Point2, Point3, Rotation3, Vector3};
use smallvec::SmallVec;

use crate::bounds::BoundingBox;
use crate::error::{Error, Result};
use crate::mesh::MeshBuffers;
use crate::normals::smooth_normals;
use crate::opening::Opening;
use crate::tangents::compute_tangents;
use crate::texcoords::{side_tex_coords, PlanarMapping, TexCoordMode};
use crate::triangulation::triangulate_contours;

/// Walls shorter than this (in the floor plane) produce no geometry
const MIN_WIDTH: f64 = 1e-9;

/// Miter angles are clamped below a right angle so `tan` stays finite
const MAX_MITER: f64 = 1.4;

/// Geometric inputs of one wall segment.
///
/// Positions are in the owner's local space with `y` up; the floor plane is
/// `x/z`. Miter angles are in radians, positive when the back face is
/// longer than the front face at that end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentParams {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    pub start_height: f64,
    pub end_height: f64,
    pub start_miter: f64,
    pub end_miter: f64,
    pub thickness: f64,
}

impl SegmentParams {
    pub fn new(start: Point3<f64>, end: Point3<f64>, height: f64, thickness: f64) -> Self {
        Self {
            start,
            end,
            start_height: height,
            end_height: height,
            start_miter: 0.0,
            end_miter: 0.0,
            thickness,
        }
    }

    pub fn with_heights(mut self, start: f64, end: f64) -> Self {
        self.start_height = start;
        self.end_height = end;
        self
    }

    pub fn with_miters(mut self, start: f64, end: f64) -> Self {
        self.start_miter = start;
        self.end_miter = end;
        self
    }

    /// Horizontal length of the wall
    #[inline]
    pub fn width(&self) -> f64 {
        (self.end.x - self.start.x).hypot(self.end.z - self.start.z)
    }

    /// Placement of the wall-local frame in owner space
    pub fn placement(&self) -> Matrix4<f64> {
        let dx = self.end.x - self.start.x;
        let dz = self.end.z - self.start.z;
        let angle = (-dz).atan2(dx);
        Matrix4::new_translation(&self.start.coords)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), angle).to_homogeneous()
    }
}

/// Miter angle shared by two segments meeting at a vertex.
///
/// `incoming` is the direction of the segment ending at the vertex,
/// `outgoing` the direction of the one starting there, both in the floor
/// plane. The result is half the signed turn angle, which skews the back
/// corners of both walls onto the same point.
pub fn joint_miter(incoming: &Vector3<f64>, outgoing: &Vector3<f64>) -> f64 {
    let cross = incoming.x * outgoing.z - incoming.z * outgoing.x;
    let dot = incoming.x * outgoing.x + incoming.z * outgoing.z;
    if cross.abs() < 1e-12 && dot.abs() < 1e-12 {
        return 0.0;
    }
    (cross.atan2(dot) * 0.5).clamp(-MAX_MITER, MAX_MITER)
}

/// Generated wall geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMesh {
    /// Wall-local to owner-space placement
    pub matrix: Matrix4<f64>,
    /// Front, back and side faces
    pub mesh: MeshBuffers,
    /// Front face only
    pub facade: MeshBuffers,
    /// Local bounds of `mesh`
    pub bounds: BoundingBox,
    pub width: f64,
    /// Front-face triangle count as reported by the triangulator (negative when partial)
    pub front_triangle_count: i64,
    /// Vertices in the front outline plus all window contours
    pub contour_vertex_count: usize,
}

impl SegmentMesh {
    pub fn empty() -> Self {
        Self {
            matrix: Matrix4::identity(),
            mesh: MeshBuffers::new(),
            facade: MeshBuffers::new(),
            bounds: BoundingBox::empty(),
            width: 0.0,
            front_triangle_count: 0,
            contour_vertex_count: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }

    #[inline]
    pub fn is_partial(&self) -> bool {
        self.front_triangle_count < 0
    }

    /// Front-face normal in owner space
    pub fn face_normal(&self) -> Vector3<f64> {
        self.matrix
            .transform_vector(&Vector3::z())
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z)
    }

    /// Center of the wall bounds in owner space
    pub fn face_center(&self) -> Point3<f64> {
        if self.bounds.is_empty() {
            return self.matrix.transform_point(&Point3::origin());
        }
        let c = self.bounds.center();
        self.matrix
            .transform_point(&Point3::new(c.x as f64, c.y as f64, c.z as f64))
    }
}

#[derive(Debug, Default)]
struct Scratch {
    exterior: Vec<Point2<f64>>,
    back_exterior: Vec<Point2<f64>>,
    holes: Vec<Vec<Point2<f64>>>,
    front_points: Vec<Point2<f64>>,
    back_points: Vec<Point2<f64>>,
    doors: SmallVec<[Opening; 4]>,
    windows: SmallVec<[Opening; 4]>,
}

/// Builds wall meshes, reusing its contour buffers between calls.
///
/// Output is a pure function of the inputs: the scratch buffers are cleared
/// before every build.
#[derive(Debug, Default)]
pub struct SegmentMeshBuilder {
    tex_coord_mode: TexCoordMode,
    crease_angle: f64,
    scratch: Scratch,
}

impl SegmentMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tex_coord_mode(mut self, mode: TexCoordMode) -> Self {
        self.tex_coord_mode = mode;
        self
    }

    /// Smoothing threshold in radians; zero keeps flat shading
    pub fn with_crease_angle(mut self, crease_angle: f64) -> Self {
        self.crease_angle = crease_angle;
        self
    }

    pub fn tex_coord_mode(&self) -> TexCoordMode {
        self.tex_coord_mode
    }

    /// Build the wall, logging and returning empty geometry when degenerate
    pub fn build(&mut self, params: &SegmentParams, openings: &[Opening]) -> SegmentMesh {
        match self.try_build(params, openings) {
            Ok(mesh) => mesh,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    start = ?params.start,
                    end = ?params.end,
                    "wall segment produced no geometry"
                );
                SegmentMesh::empty()
            }
        }
    }

    pub fn try_build(&mut self, params: &SegmentParams, openings: &[Opening]) -> Result<SegmentMesh> {
        let width = params.width();
        if width.is_nan() || width <= MIN_WIDTH {
            return Err(Error::DegenerateSegment);
        }
        let thickness = params.thickness;

        self.build_outlines(params, width, openings);
        let s = &self.scratch;

        let triangulation = triangulate_contours(&s.exterior, &s.holes, true);
        if triangulation.is_partial() {
            tracing::warn!(
                triangles = triangulation.triangle_count,
                contour = s.exterior.len(),
                windows = s.holes.len(),
                "wall face triangulation is partial"
            );
        }

        let front_map = PlanarMapping::new(&s.exterior, self.tex_coord_mode, false);
        let back_map = PlanarMapping::new(&s.back_exterior, self.tex_coord_mode, true);

        let face_vertices = triangulation.indices.len();
        let side_vertices = s.front_points.len() * 6;
        let mut facade = MeshBuffers::with_capacity(face_vertices);
        let mut mesh = MeshBuffers::with_capacity(face_vertices * 2 + side_vertices);

        for &i in &triangulation.indices {
            let p = &s.front_points[i];
            facade.push_vertex(Point3::new(p.x, p.y, 0.0), front_map.uv(p));
        }
        mesh.coords.extend_from_slice(&facade.coords);
        mesh.tex_coords.extend_from_slice(&facade.tex_coords);

        // Back face: same topology, opposite winding
        for tri in triangulation.indices.chunks_exact(3) {
            for &i in &[tri[0], tri[2], tri[1]] {
                let p = &s.back_points[i];
                mesh.push_vertex(Point3::new(p.x, p.y, -thickness), back_map.uv(p));
            }
        }

        create_side_strips(&s.exterior, &s.back_exterior, thickness, self.tex_coord_mode, &mut mesh);
        for hole in &s.holes {
            create_side_strips(hole, hole, thickness, self.tex_coord_mode, &mut mesh);
        }

        self.finish(&mut facade);
        self.finish(&mut mesh);

        Ok(SegmentMesh {
            matrix: params.placement(),
            bounds: mesh.bounds(),
            mesh,
            facade,
            width,
            front_triangle_count: triangulation.triangle_count,
            contour_vertex_count: s.front_points.len(),
        })
    }

    /// Fill the outline scratch buffers for the front and back faces
    fn build_outlines(&mut self, params: &SegmentParams, width: f64, openings: &[Opening]) {
        let s = &mut self.scratch;
        s.doors.clear();
        s.windows.clear();
        for opening in openings {
            if opening.is_door() {
                s.doors.push(*opening);
            } else {
                s.windows.push(*opening);
            }
        }
        s.doors.sort_by(|a, b| a.center.x.total_cmp(&b.center.x));
        s.windows.sort_by(|a, b| a.center.x.total_cmp(&b.center.x));

        // Counter-clockwise: base line with door notches, then the top edge
        s.exterior.clear();
        s.exterior.push(Point2::new(0.0, 0.0));
        for door in &s.doors {
            s.exterior.extend_from_slice(&door.notch_contour());
        }
        s.exterior.push(Point2::new(width, 0.0));
        s.exterior.push(Point2::new(width, params.end_height));
        s.exterior.push(Point2::new(0.0, params.start_height));

        let n = s.exterior.len();
        let left = -params.thickness * params.start_miter.tan();
        let right = width + params.thickness * params.end_miter.tan();
        s.back_exterior.clear();
        s.back_exterior.extend_from_slice(&s.exterior);
        s.back_exterior[0].x = left;
        s.back_exterior[n - 1].x = left;
        s.back_exterior[n - 3].x = right;
        s.back_exterior[n - 2].x = right;

        s.holes.clear();
        s.holes
            .extend(s.windows.iter().map(|w| w.hole_contour().to_vec()));

        s.front_points.clear();
        s.front_points.extend_from_slice(&s.exterior);
        s.back_points.clear();
        s.back_points.extend_from_slice(&s.back_exterior);
        for hole in &s.holes {
            s.front_points.extend_from_slice(hole);
            s.back_points.extend_from_slice(hole);
        }
    }

    fn finish(&self, mesh: &mut MeshBuffers) {
        mesh.normals = smooth_normals(&mesh.coords, self.crease_angle);
        mesh.tangents = compute_tangents(&mesh.coords, &mesh.normals, &mesh.tex_coords);
    }
}

/// Two triangles per contour edge joining the front and back outlines.
///
/// Faces point away from the wall material: outward on a counter-clockwise
/// exterior, into the opening on a clockwise hole.
fn create_side_strips(
    front: &[Point2<f64>],
    back: &[Point2<f64>],
    thickness: f64,
    mode: TexCoordMode,
    mesh: &mut MeshBuffers,
) {
    let n = front.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let quad = [
            Point3::new(front[i].x, front[i].y, 0.0),
            Point3::new(front[j].x, front[j].y, 0.0),
            Point3::new(back[i].x, back[i].y, -thickness),
            Point3::new(back[j].x, back[j].y, -thickness),
        ];
        let uv = side_tex_coords(mode, &quad, thickness);
        // (front_a, back_a, back_b) (front_a, back_b, front_b)
        for &k in &[0usize, 2, 3, 0, 3, 1] {
            mesh.push_vertex(quad[k], uv[k]);
        }
    }
}
