// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normal generation for non-indexed triangle arrays
//!
//! Flat shading uses one Newell normal per triangle. Crease-angle smoothing
//! averages the face normals of triangles meeting at a shared vertex position
//! when the angle between them does not exceed the crease angle.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::triangulation::calculate_polygon_normal;

/// Positions closer than this are considered the same vertex when smoothing
const WELD_SCALE: f64 = 1e5;

#[inline]
fn triangle(coords: &[f32], t: usize) -> [Point3<f64>; 3] {
    let p = |i: usize| {
        let o = (t * 3 + i) * 3;
        Point3::new(coords[o] as f64, coords[o + 1] as f64, coords[o + 2] as f64)
    };
    [p(0), p(1), p(2)]
}

#[inline]
fn weld_key(coords: &[f32], v: usize) -> (i64, i64, i64) {
    let o = v * 3;
    (
        (coords[o] as f64 * WELD_SCALE).round() as i64,
        (coords[o + 1] as f64 * WELD_SCALE).round() as i64,
        (coords[o + 2] as f64 * WELD_SCALE).round() as i64,
    )
}

fn face_normals(coords: &[f32]) -> Vec<Vector3<f64>> {
    let triangles = coords.len() / 9;
    (0..triangles)
        .map(|t| calculate_polygon_normal(&triangle(coords, t)))
        .collect()
}

/// One normal per triangle, repeated for its three vertices.
pub fn flat_normals(coords: &[f32]) -> Vec<f32> {
    let faces = face_normals(coords);
    let mut normals = Vec::with_capacity(faces.len() * 9);
    for n in &faces {
        for _ in 0..3 {
            normals.push(n.x as f32);
            normals.push(n.y as f32);
            normals.push(n.z as f32);
        }
    }
    normals
}

/// Per-vertex normals smoothed across faces within `crease_angle` radians.
///
/// A crease angle of zero (or less) is flat shading.
pub fn smooth_normals(coords: &[f32], crease_angle: f64) -> Vec<f32> {
    if crease_angle <= 0.0 {
        return flat_normals(coords);
    }

    let faces = face_normals(coords);
    let vertex_count = faces.len() * 3;
    let cos_crease = crease_angle.min(std::f64::consts::PI).cos() - 1e-9;

    let mut shared: FxHashMap<(i64, i64, i64), Vec<usize>> = FxHashMap::default();
    for v in 0..vertex_count {
        shared.entry(weld_key(coords, v)).or_default().push(v / 3);
    }

    let mut normals = Vec::with_capacity(vertex_count * 3);
    for v in 0..vertex_count {
        let own = faces[v / 3];
        let mut sum = Vector3::<f64>::zeros();
        if let Some(neighbours) = shared.get(&weld_key(coords, v)) {
            for &f in neighbours {
                if faces[f].dot(&own) >= cos_crease {
                    sum += faces[f];
                }
            }
        }
        let n = sum.try_normalize(1e-12).unwrap_or(own);
        normals.push(n.x as f32);
        normals.push(n.y as f32);
        normals.push(n.z as f32);
    }
    normals
}
