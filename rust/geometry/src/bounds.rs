// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes in local space

use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned box, stored as min/max corners.
///
/// An empty box has `min > max` on every axis; it absorbs nothing and
/// reports zero dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with full edge lengths `size`.
    pub fn from_center_size(center: Point3<f32>, size: Vector3<f32>) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Bounds of a flat `x, y, z` coordinate array.
    pub fn from_coords(coords: &[f32]) -> Self {
        let mut bounds = Self::empty();
        coords.chunks_exact(3).for_each(|c| {
            bounds.include(Point3::new(c[0], c[1], c[2]));
        });
        bounds
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn include(&mut self, p: Point3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if other.is_empty() {
            return *self;
        }
        let mut out = *self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    pub fn center(&self) -> Point3<f32> {
        if self.is_empty() {
            return Point3::origin();
        }
        nalgebra::center(&self.min, &self.max)
    }

    /// Full edge lengths along each axis.
    pub fn dimensions(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        let m = Vector3::new(margin, margin, margin);
        BoundingBox::new(self.min - m, self.max + m)
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        let mut out = BoundingBox::empty();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x } as f64,
                if i & 2 == 0 { self.min.y } else { self.max.y } as f64,
                if i & 4 == 0 { self.min.z } else { self.max.z } as f64,
            );
            let p = matrix.transform_point(&corner);
            out.include(Point3::new(p.x as f32, p.y as f32, p.z as f32));
        }
        out
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}
