// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Texture coordinate synthesis
//!
//! Wall faces are mapped planar in the wall-local x/y plane, either
//! normalized to the face bounding box or in real-world units for tiling
//! and bump textures. Side strips use the wall thickness as one axis.

use nalgebra::{Point2, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Extent below which a mapping axis is considered collapsed
const MIN_EXTENT: f64 = 1e-12;

/// How face texture coordinates are scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TexCoordMode {
    /// Each face spans `[0, 1] x [0, 1]` over its bounding box
    #[default]
    Normalized,
    /// Coordinates in model units, so textures tile with wall size
    #[cfg_attr(feature = "serde", serde(rename = "bump", alias = "realworld"))]
    RealWorld,
}

impl TexCoordMode {
    /// Parse a configuration value (`normalized`, `bump`, `realworld`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normalized" | "default" => Some(Self::Normalized),
            "bump" | "realworld" | "real_world" => Some(Self::RealWorld),
            _ => None,
        }
    }
}

/// Planar mapping for one wall face.
#[derive(Debug, Clone, Copy)]
pub struct PlanarMapping {
    mode: TexCoordMode,
    min: Point2<f64>,
    max: Point2<f64>,
    mirrored: bool,
}

impl PlanarMapping {
    /// Mapping over the bounding rectangle of `outline`.
    ///
    /// A mirrored mapping runs `u` from the right edge, so the back face of a
    /// wall shows the same panel progression as the front seen from behind.
    pub fn new(outline: &[Point2<f64>], mode: TexCoordMode, mirrored: bool) -> Self {
        let mut min = Point2::new(f64::MAX, f64::MAX);
        let mut max = Point2::new(f64::MIN, f64::MIN);
        for p in outline {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        if outline.is_empty() {
            min = Point2::origin();
            max = Point2::origin();
        }
        Self {
            mode,
            min,
            max,
            mirrored,
        }
    }

    pub fn uv(&self, p: &Point2<f64>) -> Point2<f64> {
        let u = if self.mirrored {
            self.max.x - p.x
        } else {
            p.x - self.min.x
        };
        match self.mode {
            TexCoordMode::RealWorld => Point2::new(u, p.y),
            TexCoordMode::Normalized => {
                let dx = self.max.x - self.min.x;
                let dy = self.max.y - self.min.y;
                Point2::new(
                    if dx > MIN_EXTENT { u / dx } else { 0.0 },
                    if dy > MIN_EXTENT { (p.y - self.min.y) / dy } else { 0.0 },
                )
            }
        }
    }
}

/// Texture coordinates for one side-strip quad.
///
/// `quad` is `[front_a, front_b, back_a, back_b]` for the contour edge
/// `a -> b`. In real-world mode `v` runs from the front (0) to the back
/// (`thickness`) and `u` along the edge. Horizontal edges whose front and back
/// widths differ (mitered top and bottom strips) measure `u` from the
/// smallest x of the quad instead, which keeps both ends of the strip on the
/// same scale as the adjoining face.
pub fn side_tex_coords(
    mode: TexCoordMode,
    quad: &[Point3<f64>; 4],
    thickness: f64,
) -> [Point2<f64>; 4] {
    let [fa, fb, ba, bb] = quad;

    if mode == TexCoordMode::Normalized {
        return [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
        ];
    }

    let front_width = (fb.x - fa.x).abs();
    let back_width = (bb.x - ba.x).abs();
    let horizontal = (fa.y - fb.y).abs() < MIN_EXTENT;

    if horizontal && (front_width - back_width).abs() > MIN_EXTENT {
        let min_x = quad.iter().map(|p| p.x).fold(f64::MAX, f64::min);
        return [
            Point2::new(fa.x - min_x, 0.0),
            Point2::new(fb.x - min_x, 0.0),
            Point2::new(ba.x - min_x, thickness),
            Point2::new(bb.x - min_x, thickness),
        ];
    }

    [
        Point2::new(0.0, 0.0),
        Point2::new((fb - fa).norm(), 0.0),
        Point2::new(0.0, thickness),
        Point2::new((bb - ba).norm(), thickness),
    ]
}

/// Default texture coordinates for a mesh without explicit UVs.
///
/// Positions are projected onto the two axes with the largest extent and
/// normalized to the mesh bounding box.
pub fn bounding_box_tex_coords(coords: &[f32]) -> Vec<f32> {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for c in coords.chunks_exact(3) {
        for axis in 0..3 {
            min[axis] = min[axis].min(c[axis]);
            max[axis] = max[axis].max(c[axis]);
        }
    }

    let extent = |axis: usize| (max[axis] - min[axis]).max(0.0);
    let mut axes = [0usize, 1, 2];
    // Stable: ties keep x before y before z
    axes.sort_by(|&a, &b| extent(b).total_cmp(&extent(a)));
    let (u_axis, v_axis) = (axes[0].min(axes[1]), axes[0].max(axes[1]));

    let scale = |axis: usize, value: f32| {
        let e = extent(axis);
        if e > 0.0 {
            (value - min[axis]) / e
        } else {
            0.0
        }
    };

    let mut tex_coords = Vec::with_capacity(coords.len() / 3 * 2);
    for c in coords.chunks_exact(3) {
        tex_coords.push(scale(u_axis, c[u_axis]));
        tex_coords.push(scale(v_axis, c[v_axis]));
    }
    tex_coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(w: f64, h: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
    }

    #[test]
    fn normalized_mapping_spans_unit_square() {
        let outline = rect(4.0, 2.0);
        let mapping = PlanarMapping::new(&outline, TexCoordMode::Normalized, false);
        let uv = mapping.uv(&Point2::new(4.0, 2.0));
        assert_relative_eq!(uv.x, 1.0);
        assert_relative_eq!(uv.y, 1.0);
        let uv = mapping.uv(&Point2::new(1.0, 0.5));
        assert_relative_eq!(uv.x, 0.25);
        assert_relative_eq!(uv.y, 0.25);
    }

    #[test]
    fn mirrored_mapping_runs_from_right() {
        let outline = rect(4.0, 2.0);
        let mapping = PlanarMapping::new(&outline, TexCoordMode::RealWorld, true);
        let uv = mapping.uv(&Point2::new(1.0, 1.5));
        assert_relative_eq!(uv.x, 3.0);
        assert_relative_eq!(uv.y, 1.5);
    }

    #[test]
    fn collapsed_extent_maps_to_zero() {
        let outline = vec![Point2::new(1.0, 0.0), Point2::new(1.0, 2.0)];
        let mapping = PlanarMapping::new(&outline, TexCoordMode::Normalized, false);
        let uv = mapping.uv(&Point2::new(1.0, 1.0));
        assert_relative_eq!(uv.x, 0.0);
        assert_relative_eq!(uv.y, 0.5);
    }

    #[test]
    fn side_strip_uses_thickness_axis() {
        let quad = [
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 2.4, 0.0),
            Point3::new(4.1, 0.0, -0.1),
            Point3::new(4.1, 2.4, -0.1),
        ];
        let uv = side_tex_coords(TexCoordMode::RealWorld, &quad, 0.1);
        assert_relative_eq!(uv[1].x, 2.4, epsilon = 1e-12);
        assert_relative_eq!(uv[2].y, 0.1);
        assert_relative_eq!(uv[3].x, 2.4, epsilon = 1e-12);
    }

    #[test]
    fn mitered_horizontal_strip_measures_from_min_x() {
        // Bottom strip of a wall mitered outward at both ends
        let quad = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(-0.1, 0.0, -0.1),
            Point3::new(4.1, 0.0, -0.1),
        ];
        let uv = side_tex_coords(TexCoordMode::RealWorld, &quad, 0.1);
        assert_relative_eq!(uv[0].x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(uv[1].x, 4.1, epsilon = 1e-12);
        assert_relative_eq!(uv[2].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(uv[3].x, 4.2, epsilon = 1e-12);
    }

    #[test]
    fn normalized_side_strip_is_unit_quad() {
        let quad = [Point3::origin(); 4];
        let uv = side_tex_coords(TexCoordMode::Normalized, &quad, 0.1);
        assert_eq!(uv[3], Point2::new(1.0, 1.0));
    }

    #[test]
    fn bounding_box_uvs_use_largest_axes() {
        // Floor quad in x/z, flat in y
        let coords = [0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 2.0, 0.0, 4.0];
        let uv = bounding_box_tex_coords(&coords);
        assert_eq!(uv.len(), 6);
        assert_relative_eq!(uv[2], 1.0);
        assert_relative_eq!(uv[3], 0.0);
        assert_relative_eq!(uv[5], 1.0);
    }

    #[test]
    fn parse_mode_names() {
        assert_eq!(TexCoordMode::parse("bump"), Some(TexCoordMode::RealWorld));
        assert_eq!(TexCoordMode::parse(" Normalized "), Some(TexCoordMode::Normalized));
        assert_eq!(TexCoordMode::parse("planar"), None);
    }
}
