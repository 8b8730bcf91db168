// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RoomView Geometry
//!
//! Procedural wall geometry for the RoomView scene layer: polygon-with-holes
//! triangulation (earcutr), flat and crease-angle normals, tangent frames,
//! texture-coordinate synthesis and the wall segment mesh builder.

pub mod bounds;
pub mod error;
pub mod mesh;
pub mod normals;
pub mod opening;
pub mod primitives;
pub mod segment;
pub mod tangents;
pub mod texcoords;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use bounds::BoundingBox;
pub use error::{Error, Result};
pub use mesh::MeshBuffers;
pub use normals::{flat_normals, smooth_normals};
pub use opening::{Alignment, Opening, OpeningKind};
pub use primitives::{box_mesh, floor_quad};
pub use segment::{joint_miter, SegmentMesh, SegmentMeshBuilder, SegmentParams};
pub use tangents::compute_tangents;
pub use texcoords::{bounding_box_tex_coords, side_tex_coords, PlanarMapping, TexCoordMode};
pub use triangulation::{triangulate_contours, Triangulation};
