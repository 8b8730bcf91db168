// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Point2, Point3, Vector3};

use crate::bounds::BoundingBox;

/// Non-indexed triangle mesh.
///
/// Every three consecutive vertices form one triangle. Arrays are flat:
/// three floats per coordinate and normal, four per tangent (`w` carries the
/// bitangent handedness) and two per texture coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    /// Vertex positions (x, y, z)
    pub coords: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Vertex tangents (tx, ty, tz, w)
    pub tangents: Vec<f32>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<f32>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity for `vertex_count` vertices
    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            coords: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            tangents: Vec::with_capacity(vertex_count * 4),
            tex_coords: Vec::with_capacity(vertex_count * 2),
        }
    }

    /// Add a vertex position and its texture coordinate.
    ///
    /// Normals and tangents are generated afterwards for the whole mesh.
    #[inline]
    pub fn push_vertex(&mut self, position: Point3<f64>, uv: Point2<f64>) {
        self.coords.push(position.x as f32);
        self.coords.push(position.y as f32);
        self.coords.push(position.z as f32);

        self.tex_coords.push(uv.x as f32);
        self.tex_coords.push(uv.y as f32);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Point3<f32> {
        Point3::new(self.coords[i * 3], self.coords[i * 3 + 1], self.coords[i * 3 + 2])
    }

    /// Normal of vertex `i`.
    #[inline]
    pub fn normal(&self, i: usize) -> Vector3<f32> {
        Vector3::new(self.normals[i * 3], self.normals[i * 3 + 1], self.normals[i * 3 + 2])
    }

    /// Append another mesh
    pub fn extend(&mut self, other: &MeshBuffers) {
        self.coords.extend_from_slice(&other.coords);
        self.normals.extend_from_slice(&other.normals);
        self.tangents.extend_from_slice(&other.tangents);
        self.tex_coords.extend_from_slice(&other.tex_coords);
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_coords(&self.coords)
    }

    pub fn clear(&mut self) {
        self.coords.clear();
        self.normals.clear();
        self.tangents.clear();
        self.tex_coords.clear();
    }
}
