// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-vertex tangent frames for normal mapping
//!
//! Tangents are derived per triangle from the texture-coordinate gradients
//! (Lengyel's method), orthogonalized against the vertex normal and stored
//! as `(x, y, z, w)` with `w` the bitangent handedness.

use nalgebra::{Point2, Vector3};

/// Texture-space determinants below this mark a degenerate UV mapping
const DEGENERATE_UV: f64 = 1e-12;

#[inline]
fn vec3(data: &[f32], i: usize) -> Vector3<f64> {
    Vector3::new(data[i * 3] as f64, data[i * 3 + 1] as f64, data[i * 3 + 2] as f64)
}

#[inline]
fn uv(data: &[f32], i: usize) -> Point2<f64> {
    Point2::new(data[i * 2] as f64, data[i * 2 + 1] as f64)
}

/// Any unit vector perpendicular to `n`
fn perpendicular(n: &Vector3<f64>) -> Vector3<f64> {
    let axis = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let t = axis - n * n.dot(&axis);
    t.try_normalize(1e-12).unwrap_or_else(Vector3::x)
}

/// Compute tangents for a non-indexed triangle array.
///
/// `coords` and `normals` hold three floats per vertex, `tex_coords` two.
/// Returns four floats per vertex.
pub fn compute_tangents(coords: &[f32], normals: &[f32], tex_coords: &[f32]) -> Vec<f32> {
    let vertex_count = coords.len() / 3;
    let mut tangents = Vec::with_capacity(vertex_count * 4);

    for t in 0..vertex_count / 3 {
        let base = t * 3;
        let (p0, p1, p2) = (vec3(coords, base), vec3(coords, base + 1), vec3(coords, base + 2));
        let (w0, w1, w2) = (uv(tex_coords, base), uv(tex_coords, base + 1), uv(tex_coords, base + 2));

        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let (du1, dv1) = (w1.x - w0.x, w1.y - w0.y);
        let (du2, dv2) = (w2.x - w0.x, w2.y - w0.y);
        let det = du1 * dv2 - du2 * dv1;

        let gradients = if det.abs() > DEGENERATE_UV {
            let r = 1.0 / det;
            Some(((e1 * dv2 - e2 * dv1) * r, (e2 * du1 - e1 * du2) * r))
        } else {
            None
        };

        for v in base..base + 3 {
            let n = vec3(normals, v)
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::z);

            let (tangent, w) = match gradients {
                Some((sdir, tdir)) => match (sdir - n * n.dot(&sdir)).try_normalize(1e-12) {
                    Some(t) => {
                        let w = if n.cross(&t).dot(&tdir) < 0.0 { -1.0 } else { 1.0 };
                        (t, w)
                    }
                    None => (perpendicular(&n), 1.0),
                },
                None => (perpendicular(&n), 1.0),
            };

            tangents.push(tangent.x as f32);
            tangents.push(tangent.y as f32);
            tangents.push(tangent.z as f32);
            tangents.push(w as f32);
        }
    }

    tangents
}
