// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events emitted by the world model.

use crate::entity::EntityId;

/// A structural or property change of the world model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    ChildAdded {
        parent: EntityId,
        child: EntityId,
    },
    ChildInserted {
        parent: EntityId,
        child: EntityId,
        index: usize,
    },
    /// Emitted once for the root of a removed subtree.
    ChildRemoved {
        parent: EntityId,
        child: EntityId,
    },
    PropertyAdded {
        entity: EntityId,
        sheet: String,
        name: String,
    },
    PropertyRemoved {
        entity: EntityId,
        sheet: String,
        name: String,
    },
    /// `ongoing` is set while an interactive drag is still in progress.
    PropertyUpdated {
        entity: EntityId,
        sheet: String,
        name: String,
        ongoing: bool,
    },
}

impl ModelEvent {
    /// The entity the event is about (the child for structural events).
    pub fn entity(&self) -> EntityId {
        match self {
            ModelEvent::ChildAdded { child, .. }
            | ModelEvent::ChildInserted { child, .. }
            | ModelEvent::ChildRemoved { child, .. } => *child,
            ModelEvent::PropertyAdded { entity, .. }
            | ModelEvent::PropertyRemoved { entity, .. }
            | ModelEvent::PropertyUpdated { entity, .. } => *entity,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ModelEvent::ChildAdded { .. }
                | ModelEvent::ChildInserted { .. }
                | ModelEvent::ChildRemoved { .. }
        )
    }
}
