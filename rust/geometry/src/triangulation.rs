// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D polygon-with-holes triangulation. Convex,
//! hole-free contours take a fan fast path. Output triangles are checked and
//! re-wound to the requested orientation; degenerate triangles are dropped
//! and reported through a negative triangle count rather than an error.

use crate::{Error, Point2, Point3, Result, Vector3};

/// Triangles whose doubled area is below this are treated as degenerate
const DEGENERATE_AREA: f64 = 1e-12;

/// Indexed triangulation of a contour set.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    /// Triangle indices into the combined point list (exterior, then holes in order)
    pub indices: Vec<usize>,
    /// Number of triangles in `indices`, negated when some triangles had to be
    /// discarded or the triangulator fell back to a fan.
    pub triangle_count: i64,
}

impl Triangulation {
    /// Whether part of the polygon could not be triangulated
    #[inline]
    pub fn is_partial(&self) -> bool {
        self.triangle_count < 0
    }

    /// Number of usable triangles
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        // Cross product of edges
        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false; // Sign changed - not convex
            }
        }
    }

    true
}

/// Simple fan triangulation for convex polygons
#[inline]
fn fan_triangulate(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(n.saturating_sub(2) * 3);
    for i in 1..n.saturating_sub(1) {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Twice the signed area of a triangle (positive when counter-clockwise)
#[inline]
fn signed_area2(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Triangulate a simple polygon (no holes)
/// Returns triangle indices into the input points
#[inline]
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    // FAST PATH: Triangle - no triangulation needed
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }

    // FAST PATH: Convex polygon - use fan triangulation
    if n <= 8 && is_convex(points) {
        return Ok(fan_triangulate(n));
    }

    // Flatten points for earcutr
    let mut vertices = Vec::with_capacity(n * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    let indices = earcutr::earcut(&vertices, &[], 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices)
}

/// Triangulate a polygon with holes
/// Returns triangle indices into the combined vertex array (outer + all holes)
#[inline]
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }
    if let Some(bad) = holes.iter().find(|h| h.len() < 3) {
        return Err(Error::InvalidContour(format!(
            "hole contour has {} points",
            bad.len()
        )));
    }

    if holes.is_empty() {
        return triangulate_polygon(outer);
    }

    // Flatten vertices for earcutr
    let total_points: usize = outer.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total_points * 2);

    for p in outer {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    // Add holes and track their start indices
    let mut hole_indices = Vec::with_capacity(holes.len());
    for hole in holes {
        hole_indices.push(vertices.len() / 2);
        for p in hole {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    let indices = earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices)
}

/// Triangulate an exterior contour with interior hole contours.
///
/// Never fails: if the triangulator rejects the input, the exterior is fanned
/// and the result is flagged partial. Every emitted triangle is wound
/// counter-clockwise when `ccw` is set, clockwise otherwise.
pub fn triangulate_contours(
    exterior: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
    ccw: bool,
) -> Triangulation {
    let total: usize = exterior.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut partial = false;

    let raw = match triangulate_polygon_with_holes(exterior, holes) {
        Ok(indices) => indices,
        Err(e) => {
            tracing::warn!(
                error = %e,
                exterior = exterior.len(),
                holes = holes.len(),
                "polygon triangulation failed, falling back to fan"
            );
            partial = true;
            fan_triangulate(exterior.len())
        }
    };

    let points: Vec<&Point2<f64>> = exterior.iter().chain(holes.iter().flatten()).collect();
    let mut indices = Vec::with_capacity(raw.len());
    let mut rejected = 0usize;

    for tri in raw.chunks(3) {
        if tri.len() < 3 || tri.iter().any(|&i| i >= total) {
            rejected += 1;
            continue;
        }
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let area = signed_area2(points[a], points[b], points[c]);
        if area.abs() < DEGENERATE_AREA {
            rejected += 1;
            continue;
        }
        if (area > 0.0) == ccw {
            indices.extend_from_slice(&[a, b, c]);
        } else {
            indices.extend_from_slice(&[a, c, b]);
        }
    }

    if rejected > 0 {
        tracing::warn!(rejected, "discarded invalid triangles");
        partial = true;
    }

    let count = (indices.len() / 3) as i64;
    Triangulation {
        indices,
        triangle_count: if partial { -count } else { count },
    }
}

/// Calculate the normal of a polygon from its vertices
/// Optimized for triangles and quads using simple cross product
#[inline]
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();

    if n < 3 {
        return Vector3::new(0.0, 0.0, 1.0);
    }

    // Use Newell's method for robust normal calculation
    let mut normal = Vector3::<f64>::zeros();

    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    let len = normal.norm();
    if len > 1e-10 {
        normal / len
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ]
    }

    #[test]
    fn test_triangulate_square() {
        let indices = triangulate_polygon(&square(1.0)).unwrap();

        // Square should be split into 2 triangles = 6 indices
        assert_eq!(indices.len(), 6);
    }

    #[test]
    fn test_triangulate_insufficient_points() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];

        let result = triangulate_polygon(&points);
        assert!(result.is_err());
    }

    #[test]
    fn test_contours_square_with_hole() {
        // Hole is clockwise
        let hole = vec![
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 7.0),
            Point2::new(7.0, 7.0),
            Point2::new(7.0, 3.0),
        ];

        let tri = triangulate_contours(&square(10.0), &[hole], true);

        assert!(!tri.is_partial());
        assert!(tri.len() > 2);
        assert_eq!(tri.triangle_count, tri.len() as i64);
        assert!(tri.indices.iter().all(|&i| i < 8));
    }

    #[test]
    fn test_contours_winding_follows_hint() {
        let outer = square(2.0);
        for ccw in [true, false] {
            let tri = triangulate_contours(&outer, &[], ccw);
            for t in tri.indices.chunks(3) {
                let area = signed_area2(&outer[t[0]], &outer[t[1]], &outer[t[2]]);
                assert_eq!(area > 0.0, ccw);
            }
        }
    }

    #[test]
    fn test_concave_notch_outline() {
        // Wall outline with a door notch cut into the bottom edge
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.55, 0.0),
            Point2::new(1.55, 2.1),
            Point2::new(2.45, 2.1),
            Point2::new(2.45, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.4),
            Point2::new(0.0, 2.4),
        ];

        let tri = triangulate_contours(&outline, &[], true);
        assert!(tri.triangle_count >= 0);
        assert_eq!(tri.len(), outline.len() - 2);

        // Triangles cover exactly the notched area
        let area: f64 = tri
            .indices
            .chunks(3)
            .map(|t| signed_area2(&outline[t[0]], &outline[t[1]], &outline[t[2]]) * 0.5)
            .sum();
        let expected = 4.0 * 2.4 - 0.9 * 2.1;
        assert!((area - expected).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_input_yields_nothing() {
        // All points collinear: nothing usable comes out
        let line = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ];
        let tri = triangulate_contours(&line, &[], true);
        assert!(tri.is_empty());
        assert_eq!(tri.triangle_count, 0);
    }

    #[test]
    fn test_invalid_hole_falls_back() {
        let bad_hole = vec![Point2::new(1.0, 1.0)];
        let tri = triangulate_contours(&square(4.0), &[bad_hole], true);
        assert!(tri.is_partial());
        assert_eq!(tri.len(), 2);
        assert_eq!(tri.triangle_count, -2);
    }

    #[test]
    fn test_calculate_polygon_normal() {
        // XY plane polygon - normal should be Z
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];

        let normal = calculate_polygon_normal(&points);
        assert!((normal.z - 1.0).abs() < 0.001);
    }
}
