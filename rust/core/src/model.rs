// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity query trait and the in-memory world model.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::entity::{Entity, EntityId, EntityType};
use crate::error::{Error, Result};
use crate::events::ModelEvent;
use crate::properties::{property, PropertyValue, DEFAULT_SHEET};

/// Read access to the domain model.
///
/// This is the only surface the scene layer uses to look at entities. IDs
/// stay meaningful after an entity is removed: lookups simply return `None`.
pub trait EntityModel {
    /// Returns the entity with the given ID, if it is still part of the model.
    fn entity(&self, id: EntityId) -> Option<&Entity>;

    /// Returns the ID of the model root.
    fn root(&self) -> EntityId;

    /// Returns the children of an entity, or an empty slice if it is gone.
    fn children(&self, id: EntityId) -> &[EntityId] {
        self.entity(id).map(Entity::children).unwrap_or(&[])
    }

    /// Returns the parent of an entity.
    fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id).and_then(Entity::parent)
    }

    /// Returns the segment children of a multi-segment entity.
    fn segments_of(&self, multisegment: EntityId) -> SmallVec<[EntityId; 8]> {
        self.children(multisegment)
            .iter()
            .copied()
            .filter(|&c| {
                self.entity(c)
                    .map(|e| e.entity_type() == EntityType::Segment)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Returns the vertex children of a multi-segment entity.
    fn vertices_of(&self, multisegment: EntityId) -> SmallVec<[EntityId; 8]> {
        self.children(multisegment)
            .iter()
            .copied()
            .filter(|&c| {
                self.entity(c)
                    .map(|e| e.entity_type() == EntityType::Vertex)
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// In-memory world model that records every mutation as a [`ModelEvent`].
#[derive(Debug)]
pub struct WorldModel {
    entities: FxHashMap<EntityId, Entity>,
    root: EntityId,
    next_id: u32,
    events: Vec<ModelEvent>,
}

impl WorldModel {
    /// Creates a model containing only the world root (ID 0).
    pub fn new() -> Self {
        let root = EntityId(0);
        let mut entities = FxHashMap::default();
        entities.insert(root, Entity::new(root, EntityType::World));
        Self {
            entities,
            root,
            next_id: 1,
            events: Vec::new(),
        }
    }

    /// Reserves a fresh entity ID.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Number of live entities, including the root.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.len() <= 1
    }

    /// Appends an entity as the last child of `parent`.
    pub fn add_entity(&mut self, parent: EntityId, entity: Entity) -> Result<EntityId> {
        let index = self.children(parent).len();
        let child = self.attach(parent, entity, index)?;
        self.events.push(ModelEvent::ChildAdded { parent, child });
        Ok(child)
    }

    /// Inserts an entity at `index` among the children of `parent`.
    pub fn insert_entity(
        &mut self,
        parent: EntityId,
        entity: Entity,
        index: usize,
    ) -> Result<EntityId> {
        let child = self.attach(parent, entity, index)?;
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == child)
            .unwrap_or(index);
        self.events
            .push(ModelEvent::ChildInserted { parent, child, index });
        Ok(child)
    }

    fn attach(&mut self, parent: EntityId, mut entity: Entity, index: usize) -> Result<EntityId> {
        let child = entity.id();
        if self.entities.contains_key(&child) {
            return Err(Error::DuplicateEntity(child));
        }
        if entity.entity_type() == EntityType::World {
            return Err(Error::InvalidParent { parent, child });
        }
        let parent_entity = self
            .entities
            .get_mut(&parent)
            .ok_or(Error::EntityNotFound(parent))?;

        let index = index.min(parent_entity.children.len());
        parent_entity.children.insert(index, child);

        entity.parent = Some(parent);
        entity.children.clear();
        self.next_id = self.next_id.max(child.0 + 1);
        self.entities.insert(child, entity);
        Ok(child)
    }

    /// Removes an entity and its whole subtree.
    ///
    /// A single `ChildRemoved` event is recorded for the subtree root. Returns
    /// the removed IDs, children before parents.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Vec<EntityId>> {
        if id == self.root {
            return Err(Error::RootRemoval);
        }
        let parent = self
            .entities
            .get(&id)
            .ok_or(Error::EntityNotFound(id))?
            .parent;

        let mut removed = Vec::new();
        self.collect_post_order(id, &mut removed);
        for rid in &removed {
            self.entities.remove(rid);
        }

        if let Some(parent) = parent {
            if let Some(p) = self.entities.get_mut(&parent) {
                p.children.retain(|&c| c != id);
            }
            self.events
                .push(ModelEvent::ChildRemoved { parent, child: id });
        }
        Ok(removed)
    }

    fn collect_post_order(&self, id: EntityId, out: &mut Vec<EntityId>) {
        if let Some(entity) = self.entities.get(&id) {
            for &child in &entity.children {
                self.collect_post_order(child, out);
            }
            out.push(id);
        }
    }

    pub fn set_position(&mut self, id: EntityId, position: [f64; 3], ongoing: bool) -> Result<()> {
        self.entity_mut(id)?.position = position;
        self.updated(id, property::POSITION, ongoing);
        Ok(())
    }

    pub fn set_rotation(&mut self, id: EntityId, rotation: [f32; 4], ongoing: bool) -> Result<()> {
        self.entity_mut(id)?.rotation = rotation;
        self.updated(id, property::ROTATION, ongoing);
        Ok(())
    }

    pub fn set_scale(&mut self, id: EntityId, scale: [f32; 3], ongoing: bool) -> Result<()> {
        self.entity_mut(id)?.scale = scale;
        self.updated(id, property::SCALE, ongoing);
        Ok(())
    }

    pub fn set_size(&mut self, id: EntityId, size: [f32; 3], ongoing: bool) -> Result<()> {
        self.entity_mut(id)?.size = size;
        self.updated(id, property::SIZE, ongoing);
        Ok(())
    }

    /// Sets a named property, recording `PropertyAdded` or `PropertyUpdated`.
    pub fn set_property(
        &mut self,
        id: EntityId,
        sheet: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let previous = self.entity_mut(id)?.properties.set(sheet, name, value);
        let event = if previous.is_some() {
            ModelEvent::PropertyUpdated {
                entity: id,
                sheet: sheet.to_string(),
                name: name.to_string(),
                ongoing: false,
            }
        } else {
            ModelEvent::PropertyAdded {
                entity: id,
                sheet: sheet.to_string(),
                name: name.to_string(),
            }
        };
        self.events.push(event);
        Ok(())
    }

    pub fn remove_property(&mut self, id: EntityId, sheet: &str, name: &str) -> Result<Option<PropertyValue>> {
        let removed = self.entity_mut(id)?.properties.remove(sheet, name);
        if removed.is_some() {
            self.events.push(ModelEvent::PropertyRemoved {
                entity: id,
                sheet: sheet.to_string(),
                name: name.to_string(),
            });
        }
        Ok(removed)
    }

    /// Drains the recorded events in emission order.
    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut crate::entity::Entity> {
        self.entities.get_mut(&id).ok_or(Error::EntityNotFound(id))
    }

    fn updated(&mut self, id: EntityId, name: &str, ongoing: bool) {
        self.events.push(ModelEvent::PropertyUpdated {
            entity: id,
            sheet: DEFAULT_SHEET.to_string(),
            name: name.to_string(),
            ongoing,
        });
    }
}

impl Default for WorldModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityModel for WorldModel {
    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn root(&self) -> EntityId {
        self.root
    }
}
