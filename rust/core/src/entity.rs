// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Domain entities and their type tags.

use std::fmt;

use crate::properties::{property, PropertySheets, PropertyValue, DEFAULT_SHEET};

/// Stable integer identity of a domain entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityType {
    /// The model root.
    World,
    /// Root of the editable content (a location).
    ContentRoot,
    /// Structural grouping without a visual form.
    Container,
    /// Owner of a chain of vertices and the segments joining them.
    MultiSegment,
    /// Wall endpoint.
    Vertex,
    /// Wall between two vertices.
    Segment,
    /// Floor or placement region.
    Zone,
    /// Placed product (furniture, doors, windows, ...).
    Model,
    /// Group of products instantiated from a template.
    Template,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::World => "World",
            EntityType::ContentRoot => "ContentRoot",
            EntityType::Container => "Container",
            EntityType::MultiSegment => "MultiSegment",
            EntityType::Vertex => "Vertex",
            EntityType::Segment => "Segment",
            EntityType::Zone => "Zone",
            EntityType::Model => "Model",
            EntityType::Template => "Template",
        }
    }

    /// Check if this type only groups other entities
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            EntityType::World
                | EntityType::ContentRoot
                | EntityType::Container
                | EntityType::MultiSegment
        )
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tags refining an entity type.
pub mod category {
    pub const WINDOW: &str = "Window";
    pub const DOOR: &str = "Door";
    pub const EXTRUSION: &str = "Extrusion";
    pub const GROUND_PLANE: &str = "GroundPlane";
    pub const PRODUCT_ZONE: &str = "ProductZone";
}

/// Start and end vertex of a wall segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentEndpoints {
    pub start: EntityId,
    pub end: EntityId,
}

/// A domain entity.
///
/// Identity, type and category are fixed at construction. Transform fields
/// and properties are mutated through the owning model so that every change
/// is reported as an event.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    entity_type: EntityType,
    category: Option<String>,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) position: [f64; 3],
    pub(crate) rotation: [f32; 4],
    pub(crate) scale: [f32; 3],
    pub(crate) size: [f32; 3],
    pub(crate) properties: PropertySheets,
    endpoints: Option<SegmentEndpoints>,
}

impl Entity {
    pub fn new(id: EntityId, entity_type: EntityType) -> Self {
        Self {
            id,
            entity_type,
            category: None,
            parent: None,
            children: Vec::new(),
            position: [0.0; 3],
            rotation: [0.0, 1.0, 0.0, 0.0],
            scale: [1.0; 3],
            size: [1.0; 3],
            properties: PropertySheets::new(),
            endpoints: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_position(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_size(mut self, size: [f32; 3]) -> Self {
        self.size = size;
        self
    }

    /// Adds a property to the default sheet.
    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(DEFAULT_SHEET, name, value.into());
        self
    }

    /// Connects a segment to its start and end vertices.
    pub fn with_endpoints(mut self, start: EntityId, end: EntityId) -> Self {
        self.endpoints = Some(SegmentEndpoints { start, end });
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.category.as_deref() == Some(category)
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    /// Axis-angle rotation `[x, y, z, angle]`.
    pub fn rotation(&self) -> [f32; 4] {
        self.rotation
    }

    pub fn scale(&self) -> [f32; 3] {
        self.scale
    }

    pub fn size(&self) -> [f32; 3] {
        self.size
    }

    pub fn endpoints(&self) -> Option<SegmentEndpoints> {
        self.endpoints
    }

    pub fn properties(&self) -> &PropertySheets {
        &self.properties
    }

    pub fn property(&self, sheet: &str, name: &str) -> Option<&PropertyValue> {
        self.properties.get(sheet, name)
    }

    /// Numeric property from the default sheet.
    pub fn float_property(&self, name: &str) -> Option<f64> {
        self.property(DEFAULT_SHEET, name).and_then(PropertyValue::as_f64)
    }

    /// Whether the entity is a provisional placement preview.
    pub fn is_shadow(&self) -> bool {
        self.property(DEFAULT_SHEET, property::SHADOW_ENTITY)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }
}
