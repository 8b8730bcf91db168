// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # RoomView Scene
//!
//! Deferred synchronization of domain entities into a retained scene graph.
//!
//! [`SceneSyncManager`] listens to [`ModelEvent`](roomview_core::ModelEvent)s
//! and keeps one [`EntityBinding`] per visual entity. Bindings never touch
//! live scene nodes directly: every change becomes an [`UpdateRequest`]
//! that the [`FrameScheduler`] hands back at the next synchronization
//! point, bounds-affecting commits first, then data-only commits.
//!
//! ```text
//! model events ──► SceneSyncManager ──► EntityBinding ──► FrameScheduler
//!                                            │                  │
//!                                            ▼                  ▼
//!                                   SegmentMeshBuilder     SceneGraph
//! ```
//!
//! Wall segments regenerate their mesh through
//! [`roomview_geometry::SegmentMeshBuilder`] whenever an endpoint, a height,
//! a neighbouring wall, the thickness or an embedded opening changes.

pub mod binding;
pub mod config;
pub mod error;
pub mod graph;
pub mod keys;
pub mod kinds;
pub mod manager;
pub mod relations;
pub mod resources;
pub mod scheduler;
pub mod segment_binding;
pub mod tree;

pub use binding::{BindingNodes, DisplayVariant, EntityBinding, Specialization};
pub use config::SceneConfig;
pub use error::{Error, Result};
pub use graph::{CommitPhase, Material, Node, NodeKind, SceneGraph, Shape};
pub use keys::{BindingKey, NodeKey};
pub use kinds::{BindingKind, Constructor, KindGeometry};
pub use manager::SceneSyncManager;
pub use relations::{SegmentChains, SegmentList, SegmentRelations};
pub use resources::{SharedResources, Texture, TextureSource};
pub use scheduler::{Frame, FrameScheduler, FrameStats, Owner, UpdateRequest, UpdateTarget};
pub use segment_binding::SegmentState;
pub use tree::{EntityTree, Order};
