// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene synchronization manager.
//!
//! Keeps one [`EntityBinding`] per visual entity in step with the domain
//! model. Model events are turned into bindings and deferred update
//! requests; [`SceneSyncManager::synchronize`] applies them to the scene
//! graph once per frame.

use std::sync::Arc;

use roomview_core::{category, property, EntityId, EntityModel, EntityType, ModelEvent, DEFAULT_SHEET};
use roomview_geometry::SegmentMeshBuilder;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::binding::{DisplayVariant, EntityBinding};
use crate::config::SceneConfig;
use crate::graph::{CommitPhase, SceneGraph};
use crate::keys::{BindingKey, NodeKey};
use crate::kinds::BindingKind;
use crate::relations::{SegmentChains, SegmentRelations};
use crate::resources::SharedResources;
use crate::scheduler::{FrameScheduler, FrameStats, Owner, UpdateTarget};
use crate::tree::{collect, EntityTree, Order};

/// Transparency of a shadow wall.
const SHADOW_TRANSPARENCY: f32 = 0.5;

/// Work collected while handling one structural event.
#[derive(Default)]
struct Followups {
    walls: FxHashSet<EntityId>,
    multisegments: FxHashSet<EntityId>,
}

/// Mirrors the domain hierarchy into the scene graph.
pub struct SceneSyncManager {
    graph: SceneGraph,
    scheduler: FrameScheduler,
    bindings: SlotMap<BindingKey, EntityBinding>,
    by_entity: FxHashMap<EntityId, BindingKey>,
    /// Window/door entity -> host wall, shadowed openings included
    opening_hosts: FxHashMap<EntityId, EntityId>,
    tree: EntityTree,
    chains: SegmentChains,
    builder: SegmentMeshBuilder,
    config: SceneConfig,
    resources: Arc<SharedResources>,
    root_entity: EntityId,
    root_add: SmallVec<[NodeKey; 8]>,
    root_remove: SmallVec<[NodeKey; 8]>,
    hierarchy_changed: bool,
    shadow_enabled: bool,
}

impl std::fmt::Debug for SceneSyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneSyncManager")
            .field("root_entity", &self.root_entity)
            .field("bindings", &self.bindings.len())
            .field("nodes", &self.graph.len())
            .field("pending", &self.scheduler.pending())
            .finish()
    }
}

impl SceneSyncManager {
    /// Mirror everything below the model root.
    pub fn new(model: &dyn EntityModel, config: SceneConfig, resources: Arc<SharedResources>) -> Self {
        Self::with_root(model, model.root(), config, resources)
    }

    /// Mirror everything below `root_entity`. Existing children are bound
    /// immediately; nothing reaches the scene before the first
    /// [`synchronize`](Self::synchronize).
    pub fn with_root(
        model: &dyn EntityModel,
        root_entity: EntityId,
        config: SceneConfig,
        resources: Arc<SharedResources>,
    ) -> Self {
        let builder = SegmentMeshBuilder::new()
            .with_tex_coord_mode(config.tex_coord_mode)
            .with_crease_angle(config.crease_angle);
        let mut manager = Self {
            graph: SceneGraph::new(),
            scheduler: FrameScheduler::new(),
            bindings: SlotMap::with_key(),
            by_entity: FxHashMap::default(),
            opening_hosts: FxHashMap::default(),
            tree: EntityTree::new(),
            chains: SegmentChains::new(),
            builder,
            shadow_enabled: config.shadow_entities,
            config,
            resources,
            root_entity,
            root_add: SmallVec::new(),
            root_remove: SmallVec::new(),
            hierarchy_changed: false,
        };
        for &child in model.children(root_entity) {
            manager.on_child_added(model, root_entity, child);
        }
        manager
    }

    // --- Accessors ---

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn root_entity(&self) -> EntityId {
        self.root_entity
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn binding_for(&self, entity: EntityId) -> Option<&EntityBinding> {
        self.by_entity.get(&entity).and_then(|&k| self.bindings.get(k))
    }

    pub fn binding(&self, key: BindingKey) -> Option<&EntityBinding> {
        self.bindings.get(key)
    }

    fn ids_where(&self, pred: impl Fn(BindingKind) -> bool) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .bindings
            .values()
            .filter(|b| pred(b.kind()))
            .map(EntityBinding::entity)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Entities with a wall binding, ascending.
    pub fn segment_binding_ids(&self) -> Vec<EntityId> {
        self.ids_where(|k| k == BindingKind::Segment)
    }

    pub fn vertex_binding_ids(&self) -> Vec<EntityId> {
        self.ids_where(|k| k == BindingKind::Vertex)
    }

    pub fn zone_binding_ids(&self) -> Vec<EntityId> {
        self.ids_where(BindingKind::is_zone)
    }

    pub fn model_binding_ids(&self) -> Vec<EntityId> {
        self.ids_where(BindingKind::is_model)
    }

    /// Whether picking should consider `entity`.
    pub fn is_pickable(&self, entity: EntityId) -> bool {
        self.binding_for(entity)
            .map(|b| b.is_enabled() && b.is_listening())
            .unwrap_or(false)
    }

    /// Read-and-reset flag raised by every structural change.
    pub fn has_hierarchy_changed(&mut self) -> bool {
        std::mem::take(&mut self.hierarchy_changed)
    }

    /// Affects entities added from now on; existing bindings are kept.
    pub fn set_shadow_entity_enabled(&mut self, enabled: bool) {
        self.shadow_enabled = enabled;
    }

    pub fn is_shadow_entity_enabled(&self) -> bool {
        self.shadow_enabled
    }

    // --- Binding controls ---

    /// Returns false if `entity` has no binding.
    pub fn set_enabled(&mut self, entity: EntityId, enabled: bool) -> bool {
        match self.binding_mut(entity) {
            Some(b) => {
                b.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    pub fn set_transparency(&mut self, entity: EntityId, value: f32) -> bool {
        let Some(&key) = self.by_entity.get(&entity) else {
            return false;
        };
        match self.bindings.get_mut(key) {
            Some(b) => {
                b.set_transparency(value, &mut self.scheduler);
                true
            }
            None => false,
        }
    }

    pub fn set_display_variant(&mut self, entity: EntityId, variant: DisplayVariant) -> bool {
        let Some(&key) = self.by_entity.get(&entity) else {
            return false;
        };
        match self.bindings.get_mut(key) {
            Some(b) => {
                b.set_display_variant(variant, &mut self.scheduler);
                true
            }
            None => false,
        }
    }

    fn binding_mut(&mut self, entity: EntityId) -> Option<&mut EntityBinding> {
        let key = *self.by_entity.get(&entity)?;
        self.bindings.get_mut(key)
    }

    // --- Model events ---

    /// Route one model event.
    pub fn handle_event(&mut self, model: &dyn EntityModel, event: &ModelEvent) {
        match event {
            ModelEvent::ChildAdded { parent, child } => self.on_child_added(model, *parent, *child),
            ModelEvent::ChildInserted { parent, child, index } => {
                self.on_child_inserted(model, *parent, *child, *index)
            }
            ModelEvent::ChildRemoved { parent, child } => {
                self.on_child_removed(model, *parent, *child);
            }
            ModelEvent::PropertyAdded { entity, sheet, name }
            | ModelEvent::PropertyRemoved { entity, sheet, name } => {
                self.on_property_updated(model, *entity, sheet, name, false)
            }
            ModelEvent::PropertyUpdated {
                entity,
                sheet,
                name,
                ongoing,
            } => self.on_property_updated(model, *entity, sheet, name, *ongoing),
        }
    }

    /// Bind `child` and everything below it, parents first.
    ///
    /// Entities already known are skipped, so batched events that repeat a
    /// subtree are harmless. Entities outside the mirrored root are ignored.
    pub fn on_child_added(&mut self, model: &dyn EntityModel, parent: EntityId, child: EntityId) {
        if self.tree.contains(child) || (parent != self.root_entity && !self.tree.contains(parent)) {
            return;
        }
        if model.entity(child).is_none() {
            tracing::debug!(parent = %parent, child = %child, "added entity no longer in model");
            return;
        }

        let mut followups = Followups::default();
        for id in collect(child, |id| model.children(id), Order::Pre) {
            let owner = if id == child {
                parent
            } else {
                model.parent(id).unwrap_or(parent)
            };
            if !self.tree.insert(owner, id) {
                continue;
            }
            self.bind_entity(model, id, &mut followups);
        }
        self.run_followups(model, followups);
        self.hierarchy_changed = true;
    }

    /// Same as [`on_child_added`](Self::on_child_added); sibling order has
    /// no meaning in the scene.
    pub fn on_child_inserted(
        &mut self,
        model: &dyn EntityModel,
        parent: EntityId,
        child: EntityId,
        _index: usize,
    ) {
        self.on_child_added(model, parent, child);
    }

    /// Dispose the bindings of `child` and its descendants, children before
    /// parents. Returns the entities whose bindings were disposed, in order.
    pub fn on_child_removed(
        &mut self,
        model: &dyn EntityModel,
        parent: EntityId,
        child: EntityId,
    ) -> Vec<EntityId> {
        if self.tree.parent(child) != Some(parent) {
            return Vec::new();
        }
        let mut followups = Followups::default();
        let mut disposed = Vec::new();

        for (id, owner) in self.tree.remove_subtree(child) {
            if let Some(host) = self.opening_hosts.remove(&id) {
                self.remove_opening(host, id, &mut followups);
            }
            if self.chains.endpoints(id).is_some() {
                followups.walls.extend(self.chains.neighbours(id));
                self.chains.untrack(id);
            }
            let Some(key) = self.by_entity.remove(&id) else {
                continue;
            };
            if self.bindings.get(key).map(EntityBinding::kind) == Some(BindingKind::Vertex) {
                followups.multisegments.insert(owner);
            }
            self.dispose_binding(key);
            disposed.push(id);
        }

        followups.walls.retain(|w| self.by_entity.contains_key(w));
        self.run_followups(model, followups);
        self.hierarchy_changed = true;
        disposed
    }

    /// React to a property change on `entity`.
    pub fn on_property_updated(
        &mut self,
        model: &dyn EntityModel,
        entity: EntityId,
        sheet: &str,
        name: &str,
        ongoing: bool,
    ) {
        if sheet != DEFAULT_SHEET || !self.tree.contains(entity) {
            return;
        }
        tracing::trace!(entity = %entity, name, ongoing, "property updated");
        let mut followups = Followups::default();

        if let Some(&host) = self.opening_hosts.get(&entity) {
            match name {
                property::POSITION | property::SIZE | property::ALIGNMENT => {
                    followups.walls.insert(host);
                }
                property::SHADOW_ENTITY => {
                    self.remove_opening(host, entity, &mut followups);
                    self.add_opening(model, host, entity, &mut followups);
                }
                _ => {}
            }
        }

        let Some(&key) = self.by_entity.get(&entity) else {
            self.run_followups(model, followups);
            return;
        };
        let kind = self.bindings.get(key).map(EntityBinding::kind);

        match (kind, name) {
            (Some(BindingKind::Vertex), property::POSITION | property::HEIGHT) => {
                self.walls_around_vertex(entity, &mut followups);
                if name == property::POSITION {
                    self.update_transform(key);
                }
            }
            (Some(BindingKind::Segment), property::THICKNESS) => {
                followups.walls.insert(entity);
                followups.walls.extend(self.chains.neighbours(entity));
            }
            (Some(_), property::POSITION | property::ROTATION | property::SCALE) => {
                self.update_transform(key);
            }
            (Some(kind), property::SIZE) => {
                if let (Some(e), Some(b)) = (model.entity(entity), self.bindings.get_mut(key)) {
                    b.set_geometry(kind.constructor()(e, &self.config), &mut self.scheduler);
                }
            }
            (Some(_), property::TEXTURE) => self.apply_texture(model, key),
            _ => {}
        }
        self.run_followups(model, followups);
    }

    // --- Binding lifecycle ---

    fn bind_entity(&mut self, model: &dyn EntityModel, id: EntityId, followups: &mut Followups) {
        let Some(entity) = model.entity(id) else {
            return;
        };

        // Openings are tracked by their host wall whether or not they are drawn
        if let Some(host) = self.tree.parent(id) {
            if (entity.has_category(category::WINDOW) || entity.has_category(category::DOOR))
                && self.chains.endpoints(host).is_some()
            {
                self.opening_hosts.insert(id, host);
                self.add_opening(model, host, id, followups);
            }
        }

        let Some(kind) = BindingKind::classify(model, entity, self.shadow_enabled) else {
            return;
        };
        if self.by_entity.contains_key(&id) {
            return;
        }

        let geometry = kind.constructor()(entity, &self.config);
        let material = self.resources.material(kind);
        let (graph, scheduler) = (&mut self.graph, &mut self.scheduler);
        let key = self.bindings.insert_with_key(|key| {
            EntityBinding::new(key, entity, kind, geometry, material, graph, scheduler)
        });
        self.by_entity.insert(id, key);

        let scene_parent = self
            .tree
            .ancestors(id)
            .find_map(|a| self.by_entity.get(&a).copied());
        let Some(binding) = self.bindings.get_mut(key) else {
            return;
        };
        binding.scene_parent = scene_parent;
        let root = binding.root();
        match scene_parent.and_then(|p| self.bindings.get_mut(p)) {
            Some(parent) => parent.add_child(root, &mut self.scheduler),
            None => self.attach_to_root(root),
        }

        match kind {
            BindingKind::Vertex => {
                if let Some(owner) = self.tree.parent(id) {
                    followups.multisegments.insert(owner);
                }
                self.walls_around_vertex(id, followups);
            }
            BindingKind::Segment => {
                if let Some(ends) = entity.endpoints() {
                    self.chains.track(id, ends.start, ends.end);
                }
                followups.walls.insert(id);
                followups.walls.extend(self.chains.neighbours(id));
                if entity.is_shadow() {
                    if let Some(b) = self.bindings.get_mut(key) {
                        b.set_transparency(SHADOW_TRANSPARENCY, &mut self.scheduler);
                    }
                }
            }
            _ => {}
        }
        self.apply_texture(model, key);

        tracing::debug!(entity = %id, kind = %kind, "binding created");
    }

    fn dispose_binding(&mut self, key: BindingKey) {
        let Some(mut binding) = self.bindings.remove(key) else {
            return;
        };
        let root = binding.dispose();
        match binding.scene_parent.and_then(|p| self.bindings.get_mut(p)) {
            Some(parent) => parent.remove_child(root, &mut self.scheduler),
            None => self.detach_from_root(root),
        }
        self.scheduler.retire(root);
        tracing::debug!(entity = %binding.entity(), kind = %binding.kind(), "binding disposed");
    }

    /// Dispose every binding. Safe to call repeatedly.
    pub fn clear(&mut self) {
        if self.bindings.is_empty() && self.tree.is_empty() {
            return;
        }
        let mut order: Vec<EntityId> = Vec::with_capacity(self.by_entity.len());
        for &top in self.tree.children(self.root_entity) {
            order.extend(collect(top, |id| self.tree.children(id), Order::Post));
        }
        for id in order {
            if let Some(key) = self.by_entity.remove(&id) {
                self.dispose_binding(key);
            }
        }
        // Anything not reachable through the mirror
        let rest: Vec<BindingKey> = self.bindings.keys().collect();
        for key in rest {
            self.dispose_binding(key);
        }
        self.by_entity.clear();
        self.opening_hosts.clear();
        self.tree.clear();
        self.chains.clear();
        self.hierarchy_changed = true;
    }

    fn attach_to_root(&mut self, node: NodeKey) {
        if let Some(i) = self.root_remove.iter().position(|&n| n == node) {
            self.root_remove.remove(i);
        }
        if !self.root_add.contains(&node) {
            self.root_add.push(node);
        }
        self.scheduler
            .request_bounds_update(UpdateTarget::OuterTransform, Owner::Root);
    }

    fn detach_from_root(&mut self, node: NodeKey) {
        if let Some(i) = self.root_add.iter().position(|&n| n == node) {
            self.root_add.remove(i);
            return;
        }
        if !self.root_remove.contains(&node) {
            self.root_remove.push(node);
        }
        self.scheduler
            .request_bounds_update(UpdateTarget::OuterTransform, Owner::Root);
    }

    fn update_transform(&mut self, key: BindingKey) {
        if let Some(b) = self.bindings.get_mut(key) {
            b.update_transform(&mut self.scheduler);
        }
    }

    fn apply_texture(&mut self, model: &dyn EntityModel, key: BindingKey) {
        let Some(binding) = self.bindings.get_mut(key) else {
            return;
        };
        let url = model
            .entity(binding.entity())
            .and_then(|e| e.property(DEFAULT_SHEET, property::TEXTURE))
            .and_then(|v| v.as_str());
        let texture = url.map(|url| self.resources.texture(url));
        if texture.is_some() || binding.texture().is_some() {
            binding.set_texture(texture, &mut self.scheduler);
        }
    }

    // --- Walls and vertices ---

    fn add_opening(
        &mut self,
        model: &dyn EntityModel,
        host: EntityId,
        opening: EntityId,
        followups: &mut Followups,
    ) {
        let Some(entity) = model.entity(opening) else {
            return;
        };
        if entity.is_shadow() {
            return;
        }
        let is_door = entity.has_category(category::DOOR);
        let Some(state) = self.binding_mut(host).and_then(EntityBinding::segment_mut) else {
            return;
        };
        let added = if is_door {
            state.add_door(opening)
        } else {
            state.add_window(opening)
        };
        if added {
            followups.walls.insert(host);
        }
    }

    fn remove_opening(&mut self, host: EntityId, opening: EntityId, followups: &mut Followups) {
        let removed = self
            .binding_mut(host)
            .and_then(EntityBinding::segment_mut)
            .map(|state| state.remove_opening(opening))
            .unwrap_or(false);
        if removed {
            followups.walls.insert(host);
        }
    }

    /// Walls at `vertex` and their neighbours, whose miters depend on it.
    fn walls_around_vertex(&self, vertex: EntityId, followups: &mut Followups) {
        for wall in self.chains.segments_at(vertex) {
            followups.walls.insert(wall);
            followups.walls.extend(self.chains.neighbours(wall));
        }
    }

    fn run_followups(&mut self, model: &dyn EntityModel, followups: Followups) {
        let mut walls: Vec<EntityId> = followups.walls.into_iter().collect();
        walls.sort_unstable();
        for wall in walls {
            self.rebuild_wall(model, wall);
        }
        let mut owners: Vec<EntityId> = followups.multisegments.into_iter().collect();
        owners.sort_unstable();
        for owner in owners {
            self.refresh_vertex_visibility(model, owner);
        }
    }

    fn rebuild_wall(&mut self, model: &dyn EntityModel, wall: EntityId) {
        let Some(&key) = self.by_entity.get(&wall) else {
            return;
        };
        let Some(binding) = self.bindings.get_mut(key) else {
            return;
        };
        if let Err(e) = binding.update_segment(
            model,
            &self.chains,
            &mut self.builder,
            &self.config,
            &mut self.scheduler,
        ) {
            tracing::warn!(segment = %wall, error = %e, "wall update skipped");
        }
    }

    /// A lone vertex is hidden; with two or more they all show. Debug mode
    /// keeps every vertex at full transparency.
    fn refresh_vertex_visibility(&mut self, model: &dyn EntityModel, owner: EntityId) {
        let is_chain = owner == self.root_entity
            || model
                .entity(owner)
                .map(|e| e.entity_type() == EntityType::MultiSegment)
                .unwrap_or(true);
        if !is_chain {
            return;
        }
        let vertices: SmallVec<[BindingKey; 8]> = self
            .tree
            .children(owner)
            .iter()
            .filter_map(|id| self.by_entity.get(id).copied())
            .filter(|&k| self.bindings.get(k).map(EntityBinding::kind) == Some(BindingKind::Vertex))
            .collect();
        let target = if self.config.debug_vertices || vertices.len() == 1 {
            1.0
        } else {
            0.0
        };
        for key in vertices {
            if let Some(b) = self.bindings.get_mut(key) {
                if b.transparency() != target {
                    b.set_transparency(target, &mut self.scheduler);
                }
            }
        }
    }

    // --- Frame ---

    /// Apply every queued request: bounds-affecting commits, then data-only
    /// commits, then release retired subtrees.
    pub fn synchronize(&mut self, model: &dyn EntityModel) -> FrameStats {
        let frame = self.scheduler.take_frame();
        let mut stats = FrameStats {
            frame: frame.number,
            ..FrameStats::default()
        };

        self.graph.set_phase(CommitPhase::Bounds);
        for request in &frame.bounds {
            let result = match request.owner {
                Owner::Root => {
                    self.commit_root();
                    Ok(())
                }
                Owner::Binding(key) => match self.bindings.get_mut(key) {
                    Some(b) => b.commit_bounds(request.target, &mut self.graph, model),
                    None => {
                        stats.skipped += 1;
                        continue;
                    }
                },
            };
            match result {
                Ok(()) => stats.bounds_commits += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(update = ?request.target, error = %e, "bounds commit abandoned");
                }
            }
        }

        self.graph.set_phase(CommitPhase::Data);
        for request in &frame.data {
            let Owner::Binding(key) = request.owner else {
                continue;
            };
            let Some(b) = self.bindings.get_mut(key) else {
                stats.skipped += 1;
                continue;
            };
            match b.commit_data(request.target, &mut self.graph) {
                Ok(()) => stats.data_commits += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(update = ?request.target, error = %e, "data commit abandoned");
                }
            }
        }
        self.graph.set_phase(CommitPhase::Idle);

        for node in frame.retired {
            stats.freed_nodes += self.graph.free_subtree(node);
        }
        tracing::trace!(
            frame = stats.frame,
            bounds = stats.bounds_commits,
            data = stats.data_commits,
            skipped = stats.skipped,
            failed = stats.failed,
            freed = stats.freed_nodes,
            "frame synchronized"
        );
        stats
    }

    fn commit_root(&mut self) {
        let root = self.graph.root();
        for node in std::mem::take(&mut self.root_remove) {
            if let Err(e) = self.graph.remove_child(root, node) {
                tracing::warn!(error = %e, "root detach failed");
            }
        }
        for node in std::mem::take(&mut self.root_add) {
            if self.graph.parent(node) == Some(root) {
                continue;
            }
            let attached = self
                .graph
                .detach(node)
                .and_then(|_| self.graph.add_child(root, node));
            if let Err(e) = attached {
                tracing::warn!(error = %e, "root attach failed");
            }
        }
    }
}
