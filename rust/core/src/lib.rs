// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # RoomView Core
//!
//! Domain model contracts consumed by the RoomView scene layer.
//!
//! The editor's world model is a tree of entities (walls, vertices, zones,
//! products) identified by stable integer IDs. The scene layer never owns
//! entities; it reads them through the [`EntityModel`] query trait and reacts
//! to [`ModelEvent`]s describing structural and property changes.
//!
//! [`WorldModel`] is an in-memory implementation that records every mutation
//! as an event. Hosts drain those events once per input cycle and hand them to
//! the scene synchronizer.
//!
//! ```
//! use roomview_core::{Entity, EntityModel, EntityType, WorldModel};
//!
//! let mut model = WorldModel::new();
//! let root = model.root();
//! let id = model.allocate_id();
//! model.add_entity(root, Entity::new(id, EntityType::MultiSegment)).unwrap();
//!
//! assert_eq!(model.children(root), &[id]);
//! assert_eq!(model.take_events().len(), 1);
//! ```

pub mod entity;
pub mod error;
pub mod events;
pub mod model;
pub mod properties;

pub use entity::{category, Entity, EntityId, EntityType, SegmentEndpoints};
pub use error::{Error, Result};
pub use events::ModelEvent;
pub use model::{EntityModel, WorldModel};
pub use properties::{property, PropertySheets, PropertyValue, DEFAULT_SHEET};
