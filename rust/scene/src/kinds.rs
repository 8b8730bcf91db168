// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binding kinds and the kind-to-constructor dispatch table.
//!
//! Classification looks at an entity's type, category, shadow flag and
//! parent. Pure containers classify as `None` and get no binding.

use nalgebra::{Point3, Vector3};
use roomview_core::{category, Entity, EntityModel, EntityType};
use roomview_geometry::{box_mesh, floor_quad, BoundingBox, MeshBuffers};

use crate::config::SceneConfig;

/// Every kind of entity that has a visual representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Vertex,
    Segment,
    GroundPlaneZone,
    ProductZone,
    GenericZone,
    Model,
    ShadowModel,
    ExtrusionModel,
    TemplateContainer,
}

/// Initial content of a new binding.
#[derive(Debug, Clone, Default)]
pub struct KindGeometry {
    pub content: MeshBuffers,
    pub bounds: BoundingBox,
    pub transparency: f32,
}

/// Builds the initial content for one kind.
pub type Constructor = fn(&Entity, &SceneConfig) -> KindGeometry;

const CONSTRUCTORS: [Constructor; 9] = [
    vertex_marker,
    segment_placeholder,
    zone_floor,
    zone_floor,
    zone_floor,
    model_proxy,
    shadow_proxy,
    model_proxy,
    empty_container,
];

impl BindingKind {
    pub const ALL: [BindingKind; 9] = [
        BindingKind::Vertex,
        BindingKind::Segment,
        BindingKind::GroundPlaneZone,
        BindingKind::ProductZone,
        BindingKind::GenericZone,
        BindingKind::Model,
        BindingKind::ShadowModel,
        BindingKind::ExtrusionModel,
        BindingKind::TemplateContainer,
    ];

    /// Resolve the kind for `entity`, or `None` if it has no visual form.
    pub fn classify(model: &dyn EntityModel, entity: &Entity, shadow_enabled: bool) -> Option<Self> {
        let parent_type = entity
            .parent()
            .and_then(|p| model.entity(p))
            .map(Entity::entity_type);

        match entity.entity_type() {
            EntityType::World
            | EntityType::ContentRoot
            | EntityType::Container
            | EntityType::MultiSegment => None,
            EntityType::Vertex => Some(BindingKind::Vertex),
            EntityType::Segment => {
                (parent_type == Some(EntityType::MultiSegment)).then_some(BindingKind::Segment)
            }
            EntityType::Zone => Some(if entity.has_category(category::GROUND_PLANE) {
                BindingKind::GroundPlaneZone
            } else if entity.has_category(category::PRODUCT_ZONE)
                || parent_type == Some(EntityType::Model)
            {
                BindingKind::ProductZone
            } else {
                BindingKind::GenericZone
            }),
            EntityType::Model if entity.is_shadow() => {
                shadow_enabled.then_some(BindingKind::ShadowModel)
            }
            EntityType::Model if entity.has_category(category::EXTRUSION) => {
                Some(BindingKind::ExtrusionModel)
            }
            EntityType::Model => Some(BindingKind::Model),
            EntityType::Template => Some(BindingKind::TemplateContainer),
        }
    }

    /// Constructor for this kind's initial content.
    pub fn constructor(self) -> Constructor {
        CONSTRUCTORS[self as usize]
    }

    pub fn is_zone(self) -> bool {
        matches!(
            self,
            BindingKind::GroundPlaneZone | BindingKind::ProductZone | BindingKind::GenericZone
        )
    }

    pub fn is_model(self) -> bool {
        matches!(
            self,
            BindingKind::Model | BindingKind::ShadowModel | BindingKind::ExtrusionModel
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BindingKind::Vertex => "Vertex",
            BindingKind::Segment => "Segment",
            BindingKind::GroundPlaneZone => "GroundPlaneZone",
            BindingKind::ProductZone => "ProductZone",
            BindingKind::GenericZone => "GenericZone",
            BindingKind::Model => "Model",
            BindingKind::ShadowModel => "ShadowModel",
            BindingKind::ExtrusionModel => "ExtrusionModel",
            BindingKind::TemplateContainer => "TemplateContainer",
        }
    }
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn with_box(bounds: BoundingBox, transparency: f32) -> KindGeometry {
    KindGeometry {
        content: box_mesh(&bounds),
        bounds,
        transparency,
    }
}

fn vertex_marker(_entity: &Entity, config: &SceneConfig) -> KindGeometry {
    let s = config.vertex_marker_size as f32;
    with_box(
        BoundingBox::from_center_size(Point3::origin(), Vector3::new(s, s, s)),
        0.0,
    )
}

/// Walls get their geometry from the segment update.
fn segment_placeholder(_entity: &Entity, _config: &SceneConfig) -> KindGeometry {
    KindGeometry::default()
}

fn zone_floor(entity: &Entity, _config: &SceneConfig) -> KindGeometry {
    let [w, _, d] = entity.size();
    let content = floor_quad(w as f64, d as f64, 0.0);
    KindGeometry {
        bounds: content.bounds(),
        content,
        transparency: 0.0,
    }
}

/// Box standing on the origin with the entity's size.
fn proxy_bounds(entity: &Entity) -> BoundingBox {
    let [w, h, d] = entity.size();
    BoundingBox::from_center_size(Point3::new(0.0, h * 0.5, 0.0), Vector3::new(w, h, d))
}

fn model_proxy(entity: &Entity, _config: &SceneConfig) -> KindGeometry {
    with_box(proxy_bounds(entity), 0.0)
}

fn shadow_proxy(entity: &Entity, _config: &SceneConfig) -> KindGeometry {
    with_box(proxy_bounds(entity), 0.5)
}

fn empty_container(_entity: &Entity, _config: &SceneConfig) -> KindGeometry {
    KindGeometry::default()
}
