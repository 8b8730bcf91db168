// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end synchronization scenarios driven through model events.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use roomview_core::{
    category, property, Entity, EntityId, EntityModel, EntityType, PropertyValue, WorldModel,
    DEFAULT_SHEET,
};
use roomview_scene::{
    BindingKind, DisplayVariant, EntityBinding, FrameStats, Result, SceneConfig, SceneSyncManager,
    SharedResources, Texture, TextureSource,
};

struct Fixture {
    model: WorldModel,
    manager: SceneSyncManager,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    fn with_config(config: SceneConfig) -> Self {
        Self::with_resources(config, SharedResources::new())
    }

    fn with_resources(config: SceneConfig, resources: SharedResources) -> Self {
        let model = WorldModel::new();
        let manager = SceneSyncManager::new(&model, config, Arc::new(resources));
        Self { model, manager }
    }

    fn add(&mut self, parent: EntityId, build: impl FnOnce(EntityId) -> Entity) -> EntityId {
        let id = self.model.allocate_id();
        self.model.add_entity(parent, build(id)).unwrap()
    }

    /// Deliver pending model events without committing.
    fn deliver(&mut self) {
        for event in self.model.take_events() {
            self.manager.handle_event(&self.model, &event);
        }
    }

    /// Deliver events and run one frame.
    fn pump(&mut self) -> FrameStats {
        self.deliver();
        self.manager.synchronize(&self.model)
    }

    fn binding(&self, id: EntityId) -> &EntityBinding {
        self.manager.binding_for(id).unwrap()
    }

    fn content_triangles(&self, id: EntityId) -> usize {
        let nodes = self.binding(id).nodes();
        self.manager.graph().shape(nodes.content).unwrap().mesh.triangle_count()
    }

    fn facade_triangles(&self, id: EntityId) -> usize {
        let nodes = self.binding(id).nodes();
        self.manager.graph().shape(nodes.facade).unwrap().mesh.triangle_count()
    }

    fn multisegment(&mut self) -> EntityId {
        let root = self.model.root();
        self.add(root, |id| Entity::new(id, EntityType::MultiSegment))
    }

    fn vertex(&mut self, owner: EntityId, position: [f64; 3]) -> EntityId {
        self.add(owner, |id| {
            Entity::new(id, EntityType::Vertex)
                .with_position(position)
                .with_property(property::HEIGHT, 2.4)
        })
    }

    fn segment(&mut self, owner: EntityId, start: EntityId, end: EntityId) -> EntityId {
        self.add(owner, |id| {
            Entity::new(id, EntityType::Segment)
                .with_endpoints(start, end)
                .with_property(property::THICKNESS, 0.1)
        })
    }

    /// Four walls in a ring around (0,0)-(4,4).
    fn square_room(&mut self) -> (Vec<EntityId>, Vec<EntityId>) {
        let owner = self.multisegment();
        let corners = [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 0.0, 4.0], [0.0, 0.0, 4.0]];
        let vertices: Vec<EntityId> = corners.iter().map(|&p| self.vertex(owner, p)).collect();
        let segments = (0..4)
            .map(|i| self.segment(owner, vertices[i], vertices[(i + 1) % 4]))
            .collect();
        (vertices, segments)
    }

    /// One 4 m wall along +X.
    fn single_wall(&mut self) -> (EntityId, EntityId) {
        let owner = self.multisegment();
        let a = self.vertex(owner, [0.0, 0.0, 0.0]);
        let b = self.vertex(owner, [4.0, 0.0, 0.0]);
        (owner, self.segment(owner, a, b))
    }
}

#[test]
fn nothing_reaches_the_scene_before_synchronize() {
    let mut fx = Fixture::new();
    let root = fx.model.root();
    let chair = fx.add(root, |id| {
        Entity::new(id, EntityType::Model)
            .with_position([1.0, 0.0, 2.0])
            .with_size([0.5, 1.0, 0.5])
    });
    fx.deliver();

    let binding_root = fx.binding(chair).root();
    assert!(!fx.manager.graph().is_live(binding_root));
    assert!(fx.manager.graph().children(fx.manager.graph().root()).is_empty());

    fx.manager.synchronize(&fx.model);
    assert!(fx.manager.graph().is_live(binding_root));
    let m = fx.manager.graph().transform(binding_root).unwrap();
    assert_eq!((m[(0, 3)], m[(2, 3)]), (1.0, 2.0));
}

#[test]
fn second_frame_without_changes_is_a_no_op() {
    let mut fx = Fixture::new();
    fx.square_room();
    let first = fx.pump();
    assert!(first.bounds_commits > 0);
    let before = fx.manager.graph().describe(fx.manager.graph().root());

    let second = fx.manager.synchronize(&fx.model);
    assert_eq!(second.bounds_commits + second.data_commits, 0);
    assert_eq!(fx.manager.graph().describe(fx.manager.graph().root()), before);
}

#[test]
fn disposal_runs_descendants_before_ancestors() {
    let mut fx = Fixture::new();
    let root = fx.model.root();
    let template = fx.add(root, |id| Entity::new(id, EntityType::Template));
    let product = fx.add(template, |id| Entity::new(id, EntityType::Model));
    let zone = fx.add(product, |id| Entity::new(id, EntityType::Zone));
    fx.pump();
    assert_eq!(fx.binding(zone).kind(), BindingKind::ProductZone);
    assert_eq!(fx.binding(template).kind(), BindingKind::TemplateContainer);

    fx.model.remove_entity(template).unwrap();
    fx.model.take_events();
    let order = fx.manager.on_child_removed(&fx.model, root, template);
    assert_eq!(order, vec![zone, product, template]);
    assert!(fx.manager.is_empty());

    let stats = fx.manager.synchronize(&fx.model);
    assert!(stats.freed_nodes >= 18);
    assert_eq!(fx.manager.graph().len(), 1);
}

#[test]
fn batched_events_bind_each_entity_once() {
    let mut fx = Fixture::new();
    let root = fx.model.root();
    let template = fx.add(root, |id| Entity::new(id, EntityType::Template));
    fx.add(template, |id| Entity::new(id, EntityType::Model));
    // Both ChildAdded events arrive after the whole subtree exists
    fx.pump();
    assert_eq!(fx.manager.len(), 2);
    assert!(fx.manager.has_hierarchy_changed());
    assert!(!fx.manager.has_hierarchy_changed());
}

#[test]
fn square_room_produces_four_mitered_walls() {
    let mut fx = Fixture::new();
    let (_, segments) = fx.square_room();
    fx.pump();

    assert_eq!(fx.manager.segment_binding_ids(), segments);
    for &s in &segments {
        assert_eq!(fx.content_triangles(s), 12);
        let state = fx.binding(s).segment().unwrap();
        assert_eq!(state.front_triangle_count(), 2);
        assert_abs_diff_eq!(state.width(), 4.0, epsilon = 1e-9);
    }

    // Walls extend outward by the thickness and meet at the corners
    let walls = segments.iter().fold(roomview_geometry::BoundingBox::empty(), |acc, &s| {
        acc.union(&fx.binding(s).extended_bounds(fx.manager.graph()))
    });
    assert_abs_diff_eq!(walls.min.x, -0.1, epsilon = 1e-4);
    assert_abs_diff_eq!(walls.max.x, 4.1, epsilon = 1e-4);
    assert_abs_diff_eq!(walls.min.z, -0.1, epsilon = 1e-4);
    assert_abs_diff_eq!(walls.max.z, 4.1, epsilon = 1e-4);
    assert_abs_diff_eq!(walls.max.y, 2.4, epsilon = 1e-4);
}

#[test]
fn wall_normal_and_center_follow_placement() {
    let mut fx = Fixture::new();
    let (_, segments) = fx.square_room();
    fx.pump();

    // Second wall runs from (4,0) to (4,4); its front faces back into the room
    let state = fx.binding(segments[1]).segment().unwrap();
    assert_abs_diff_eq!(state.world_normal().x, -1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(state.world_center().z, 2.0, epsilon = 1e-4);
    assert_abs_diff_eq!(state.world_center().y, 1.2, epsilon = 1e-4);
}

#[test]
fn moving_a_vertex_rebuilds_its_walls() {
    let mut fx = Fixture::new();
    let owner = fx.multisegment();
    let a = fx.vertex(owner, [0.0, 0.0, 0.0]);
    let b = fx.vertex(owner, [4.0, 0.0, 0.0]);
    let wall = fx.segment(owner, a, b);
    fx.pump();

    fx.model.set_position(b, [6.0, 0.0, 0.0], true).unwrap();
    fx.pump();
    let state = fx.binding(wall).segment().unwrap();
    assert_abs_diff_eq!(state.width(), 6.0, epsilon = 1e-9);
    let m = fx.manager.graph().transform(fx.binding(b).root()).unwrap();
    assert_eq!(m[(0, 3)], 6.0);
}

#[test]
fn door_cuts_the_wall_and_hangs_under_it() {
    let mut fx = Fixture::new();
    let (_, wall) = fx.single_wall();
    fx.pump();
    assert_eq!(fx.content_triangles(wall), 12);

    let door = fx.add(wall, |id| {
        Entity::new(id, EntityType::Model)
            .with_category(category::DOOR)
            .with_position([2.0, 0.0, 0.0])
            .with_size([0.9, 2.1, 0.1])
    });
    fx.pump();

    let binding = fx.binding(wall);
    assert!(binding.segment().unwrap().contains(door));
    assert_eq!(binding.segment().unwrap().doors(), &[door]);
    assert!(binding.segment().unwrap().front_triangle_count() > 2);

    let graph = fx.manager.graph();
    let content = graph.shape(binding.nodes().content).unwrap().mesh.vertex_count();
    let facade = graph.shape(binding.nodes().facade).unwrap().mesh.vertex_count();
    assert!(facade > 0 && facade < content);
    assert_eq!(graph.parent(fx.binding(door).root()), Some(binding.root()));

    fx.model.remove_entity(door).unwrap();
    fx.pump();
    assert!(!fx.binding(wall).segment().unwrap().contains(door));
    assert_eq!(fx.content_triangles(wall), 12);
}

#[test]
fn window_round_trip_restores_the_wall() {
    let mut fx = Fixture::new();
    let (_, wall) = fx.single_wall();
    fx.pump();
    let plain = fx.content_triangles(wall);

    let window = fx.add(wall, |id| {
        Entity::new(id, EntityType::Model)
            .with_category(category::WINDOW)
            .with_position([2.0, 1.2, 0.0])
            .with_size([1.0, 1.0, 0.1])
    });
    fx.pump();
    assert!(fx.binding(wall).segment().unwrap().windows().contains(&window));
    // Front and back faces, plus a side quad per outline and hole edge
    assert_eq!(
        fx.content_triangles(wall),
        2 * fx.facade_triangles(wall) + 2 * (4 + 4)
    );

    // A shadowed opening no longer cuts the wall
    fx.model
        .set_property(window, DEFAULT_SHEET, property::SHADOW_ENTITY, PropertyValue::Bool(true))
        .unwrap();
    fx.pump();
    assert!(!fx.binding(wall).segment().unwrap().contains(window));
    assert_eq!(fx.content_triangles(wall), plain);
}

#[test]
fn lone_vertex_is_transparent_until_joined() {
    let mut fx = Fixture::new();
    let owner = fx.multisegment();
    let first = fx.vertex(owner, [0.0, 0.0, 0.0]);
    fx.pump();
    assert_eq!(fx.binding(first).transparency(), 1.0);

    let second = fx.vertex(owner, [3.0, 0.0, 0.0]);
    let wall = fx.segment(owner, first, second);
    fx.pump();
    assert_eq!(fx.binding(first).transparency(), 0.0);
    assert_eq!(fx.binding(second).transparency(), 0.0);

    fx.model.remove_entity(wall).unwrap();
    fx.model.remove_entity(second).unwrap();
    fx.pump();
    assert_eq!(fx.binding(first).transparency(), 1.0);

    let shape = fx.manager.graph().shape(fx.binding(first).nodes().content).unwrap();
    assert_eq!(shape.material.transparency, 1.0);
}

#[test]
fn debug_flag_pins_vertex_transparency() {
    let config = SceneConfig {
        debug_vertices: true,
        ..SceneConfig::default()
    };
    let mut fx = Fixture::with_config(config);
    let owner = fx.multisegment();
    let first = fx.vertex(owner, [0.0, 0.0, 0.0]);
    let second = fx.vertex(owner, [3.0, 0.0, 0.0]);
    fx.segment(owner, first, second);
    fx.pump();
    assert_eq!(fx.binding(first).transparency(), 1.0);
}

#[test]
fn shadow_entities_follow_the_toggle() {
    let mut fx = Fixture::new();
    let root = fx.model.root();
    let preview = fx.add(root, |id| {
        Entity::new(id, EntityType::Model).with_property(property::SHADOW_ENTITY, true)
    });
    fx.pump();
    assert_eq!(fx.binding(preview).kind(), BindingKind::ShadowModel);
    assert_eq!(fx.binding(preview).transparency(), 0.5);

    fx.manager.set_shadow_entity_enabled(false);
    let hidden = fx.add(root, |id| {
        Entity::new(id, EntityType::Model).with_property(property::SHADOW_ENTITY, true)
    });
    fx.pump();
    assert!(fx.manager.binding_for(hidden).is_none());
    // Existing bindings are kept
    assert!(fx.manager.binding_for(preview).is_some());
}

#[test]
fn shadow_wall_is_half_transparent() {
    let mut fx = Fixture::new();
    let owner = fx.multisegment();
    let a = fx.vertex(owner, [0.0, 0.0, 0.0]);
    let b = fx.vertex(owner, [2.0, 0.0, 0.0]);
    let wall = fx.add(owner, |id| {
        Entity::new(id, EntityType::Segment)
            .with_endpoints(a, b)
            .with_property(property::SHADOW_ENTITY, true)
    });
    fx.pump();
    assert_eq!(fx.binding(wall).transparency(), 0.5);
}

#[test]
fn zero_length_wall_renders_nothing() {
    let mut fx = Fixture::new();
    let owner = fx.multisegment();
    let a = fx.vertex(owner, [1.0, 0.0, 1.0]);
    let b = fx.vertex(owner, [1.0, 0.0, 1.0]);
    let wall = fx.segment(owner, a, b);
    let stats = fx.pump();
    assert_eq!(stats.failed, 0);

    let graph = fx.manager.graph();
    let content = graph.shape(fx.binding(wall).nodes().content).unwrap();
    assert!(content.mesh.is_empty());
    assert!(!content.material.visible);
}

#[test]
fn clear_releases_everything_and_is_idempotent() {
    let mut fx = Fixture::new();
    fx.square_room();
    fx.pump();
    assert_eq!(fx.manager.len(), 8);

    fx.manager.clear();
    fx.manager.clear();
    assert!(fx.manager.is_empty());
    assert!(fx.manager.segment_binding_ids().is_empty());

    fx.manager.synchronize(&fx.model);
    assert_eq!(fx.manager.graph().len(), 1);
}

#[test]
fn lookups_and_pick_state() {
    let mut fx = Fixture::new();
    let root = fx.model.root();
    let floor = fx.add(root, |id| {
        Entity::new(id, EntityType::Zone)
            .with_category(category::GROUND_PLANE)
            .with_size([5.0, 0.0, 5.0])
    });
    let product = fx.add(root, |id| {
        Entity::new(id, EntityType::Model).with_category(category::EXTRUSION)
    });
    fx.pump();

    assert_eq!(fx.manager.zone_binding_ids(), vec![floor]);
    assert_eq!(fx.manager.model_binding_ids(), vec![product]);
    assert_eq!(fx.binding(product).kind(), BindingKind::ExtrusionModel);

    assert!(fx.manager.is_pickable(product));
    assert!(fx.manager.set_enabled(product, false));
    assert!(!fx.manager.is_pickable(product));
    assert!(!fx.manager.set_enabled(EntityId(999), false));
}

#[test]
fn display_variant_switches_to_bounds_proxy() {
    let mut fx = Fixture::new();
    let root = fx.model.root();
    let product = fx.add(root, |id| Entity::new(id, EntityType::Model));
    fx.pump();

    assert!(fx.manager.set_display_variant(product, DisplayVariant::Bounds));
    let stats = fx.manager.synchronize(&fx.model);
    assert_eq!(stats.data_commits, 1);
    let switch = fx.binding(product).nodes().switch;
    assert_eq!(fx.manager.graph().switch_active(switch), Some(1));
}

#[test]
fn resizing_a_zone_restages_its_floor() {
    let mut fx = Fixture::new();
    let root = fx.model.root();
    let zone = fx.add(root, |id| Entity::new(id, EntityType::Zone).with_size([2.0, 0.0, 2.0]));
    fx.pump();

    fx.model.set_size(zone, [6.0, 0.0, 3.0], false).unwrap();
    fx.pump();
    let bounds = fx.binding(zone).bounds();
    assert_abs_diff_eq!(bounds.max.x - bounds.min.x, 6.0, epsilon = 1e-5);
    assert_abs_diff_eq!(bounds.max.z - bounds.min.z, 3.0, epsilon = 1e-5);
}

struct SolidColor;

impl TextureSource for SolidColor {
    fn load(&self, url: &str) -> Result<Texture> {
        Ok(Texture {
            url: url.to_string(),
            width: 1,
            height: 1,
            pixels: Arc::from(vec![255u8; 4]),
        })
    }
}

#[test]
fn textures_load_once_and_fall_back_to_placeholder() {
    let resources = SharedResources::new().with_texture_source(SolidColor);
    let mut fx = Fixture::with_resources(SceneConfig::default(), resources);
    let root = fx.model.root();
    let a = fx.add(root, |id| Entity::new(id, EntityType::Model).with_property(property::TEXTURE, "oak.png"));
    let b = fx.add(root, |id| Entity::new(id, EntityType::Model).with_property(property::TEXTURE, "oak.png"));
    fx.pump();
    assert_eq!(fx.binding(a).texture().unwrap().url, "oak.png");
    assert!(Arc::ptr_eq(fx.binding(a).texture().unwrap(), fx.binding(b).texture().unwrap()));

    let mut bare = Fixture::new();
    let root = bare.model.root();
    let c = bare.add(root, |id| Entity::new(id, EntityType::Model).with_property(property::TEXTURE, "oak.png"));
    bare.pump();
    assert_eq!(bare.binding(c).texture().unwrap().url, Texture::placeholder().url);
}
