// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene synchronization.

use roomview_core::EntityId;

use crate::graph::CommitPhase;
use crate::keys::NodeKey;

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised inside the scene layer.
///
/// None of these escape the manager's event entry points: they are logged and
/// the affected entity is skipped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A live scene node was written outside the matching commit phase.
    #[error("scene node {node:?} written during {phase:?} phase")]
    InvalidWriteTiming { node: NodeKey, phase: CommitPhase },

    /// A scene node key does not resolve.
    #[error("scene node not found: {0:?}")]
    NodeNotFound(NodeKey),

    /// Attaching a node would give it a second parent or create a cycle.
    #[error("scene node {child:?} cannot be attached to {parent:?}")]
    InvalidAttachment { parent: NodeKey, child: NodeKey },

    /// The bound entity is no longer part of the model.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A segment entity has no start/end vertices.
    #[error("segment {0} has no endpoints")]
    MissingEndpoints(EntityId),

    /// A texture could not be loaded.
    #[error("texture error: {0}")]
    Texture(String),

    #[error(transparent)]
    Geometry(#[from] roomview_geometry::Error),
}
