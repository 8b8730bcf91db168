// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simple primitive meshes: boxes and floor quads.
//!
//! Used for bounds proxies, vertex markers, model placeholders and zones.

use nalgebra::{Point2, Point3};

use crate::bounds::BoundingBox;
use crate::mesh::MeshBuffers;
use crate::normals::flat_normals;
use crate::tangents::compute_tangents;
use crate::texcoords::bounding_box_tex_coords;

const QUAD_UVS: [[f64; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

fn push_quad(mesh: &mut MeshBuffers, corners: [Point3<f64>; 4], uvs: Option<[[f64; 2]; 4]>) {
    let uvs = uvs.unwrap_or(QUAD_UVS);
    for &i in &[0usize, 1, 2, 0, 2, 3] {
        mesh.push_vertex(corners[i], Point2::new(uvs[i][0], uvs[i][1]));
    }
}

fn finish(mut mesh: MeshBuffers) -> MeshBuffers {
    mesh.normals = flat_normals(&mesh.coords);
    mesh.tangents = compute_tangents(&mesh.coords, &mesh.normals, &mesh.tex_coords);
    mesh
}

/// Closed box covering `bounds`, faces wound outward. Empty bounds give an
/// empty mesh.
pub fn box_mesh(bounds: &BoundingBox) -> MeshBuffers {
    if bounds.is_empty() {
        return MeshBuffers::new();
    }
    let (lo, hi) = (bounds.min.cast::<f64>(), bounds.max.cast::<f64>());
    let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);

    let mut mesh = MeshBuffers::with_capacity(36);
    // +X, -X
    push_quad(&mut mesh, [p(hi.x, lo.y, hi.z), p(hi.x, lo.y, lo.z), p(hi.x, hi.y, lo.z), p(hi.x, hi.y, hi.z)], None);
    push_quad(&mut mesh, [p(lo.x, lo.y, lo.z), p(lo.x, lo.y, hi.z), p(lo.x, hi.y, hi.z), p(lo.x, hi.y, lo.z)], None);
    // +Y, -Y
    push_quad(&mut mesh, [p(lo.x, hi.y, hi.z), p(hi.x, hi.y, hi.z), p(hi.x, hi.y, lo.z), p(lo.x, hi.y, lo.z)], None);
    push_quad(&mut mesh, [p(lo.x, lo.y, lo.z), p(hi.x, lo.y, lo.z), p(hi.x, lo.y, hi.z), p(lo.x, lo.y, hi.z)], None);
    // +Z, -Z
    push_quad(&mut mesh, [p(lo.x, lo.y, hi.z), p(hi.x, lo.y, hi.z), p(hi.x, hi.y, hi.z), p(lo.x, hi.y, hi.z)], None);
    push_quad(&mut mesh, [p(hi.x, lo.y, lo.z), p(lo.x, lo.y, lo.z), p(lo.x, hi.y, lo.z), p(hi.x, hi.y, lo.z)], None);
    finish(mesh)
}

/// Upward-facing rectangle of `width` (x) by `depth` (z) centered on the
/// origin at `y = elevation`, with bounding-box texture coordinates.
pub fn floor_quad(width: f64, depth: f64, elevation: f64) -> MeshBuffers {
    let (hw, hd) = (width * 0.5, depth * 0.5);
    let mut mesh = MeshBuffers::with_capacity(6);
    push_quad(
        &mut mesh,
        [
            Point3::new(-hw, elevation, hd),
            Point3::new(hw, elevation, hd),
            Point3::new(hw, elevation, -hd),
            Point3::new(-hw, elevation, -hd),
        ],
        None,
    );
    mesh.tex_coords = bounding_box_tex_coords(&mesh.coords);
    finish(mesh)
}
