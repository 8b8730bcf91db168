// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for domain model operations.

use crate::entity::EntityId;

/// Result type alias for domain model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mutating the world model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced entity does not exist in the model.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with this ID is already part of the model.
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    /// The child cannot be attached under the requested parent.
    #[error("entity {child} cannot be attached to {parent}")]
    InvalidParent { parent: EntityId, child: EntityId },

    /// The root entity cannot be removed.
    #[error("the root entity cannot be removed")]
    RootRemoval,
}
