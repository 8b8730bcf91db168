// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-entity scene bindings.
//!
//! An [`EntityBinding`] owns one scene subtree:
//!
//! ```text
//! Transform (position + rotation)      <- root, child bindings attach here
//! └── Transform (scale)
//!     └── Switch
//!         ├── Shape  content
//!         ├── Shape  bounds proxy
//!         └── Shape  facade
//! ```
//!
//! Every change is staged on the binding and applied from the frame
//! scheduler's commit callbacks, never inline.

use std::sync::Arc;

use nalgebra::{Matrix4, Rotation3, Unit, Vector3};
use roomview_core::{Entity, EntityId, EntityModel};
use roomview_geometry::{box_mesh, BoundingBox, MeshBuffers};
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::graph::{Material, SceneGraph, Shape};
use crate::keys::{BindingKey, NodeKey};
use crate::kinds::{BindingKind, KindGeometry};
use crate::resources::Texture;
use crate::scheduler::{FrameScheduler, Owner, UpdateTarget};
use crate::segment_binding::SegmentState;

/// Which variant the switch node shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayVariant {
    #[default]
    Content,
    Bounds,
    Facade,
}

impl DisplayVariant {
    pub fn index(self) -> usize {
        match self {
            DisplayVariant::Content => 0,
            DisplayVariant::Bounds => 1,
            DisplayVariant::Facade => 2,
        }
    }
}

/// Scene nodes owned by a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingNodes {
    pub transform: NodeKey,
    pub model_transform: NodeKey,
    pub switch: NodeKey,
    pub content: NodeKey,
    pub bounds: NodeKey,
    pub facade: NodeKey,
}

impl BindingNodes {
    fn shapes(&self) -> [NodeKey; 3] {
        [self.content, self.bounds, self.facade]
    }
}

/// Kind-specific state.
#[derive(Debug)]
pub enum Specialization {
    Plain,
    Segment(Box<SegmentState>),
}

/// Geometry waiting for the next bounds commit.
#[derive(Debug, Default)]
pub(crate) struct Staged {
    pub(crate) content: Option<MeshBuffers>,
    pub(crate) facade: Option<MeshBuffers>,
    pub(crate) bounds: Option<MeshBuffers>,
}

/// Adapter between one domain entity and its scene subtree.
#[derive(Debug)]
pub struct EntityBinding {
    pub(crate) key: BindingKey,
    /// Back-reference by ID: stays readable after disposal, lookups through
    /// the model just stop resolving once the entity is gone.
    pub(crate) entity: EntityId,
    pub(crate) kind: BindingKind,
    pub(crate) nodes: BindingNodes,
    pub(crate) scene_parent: Option<BindingKey>,
    pending_add: SmallVec<[NodeKey; 4]>,
    pending_remove: SmallVec<[NodeKey; 4]>,
    transparency: f32,
    texture: Option<Arc<Texture>>,
    enabled: bool,
    listening: bool,
    pub(crate) outer_dirty: bool,
    inner_dirty: bool,
    display: DisplayVariant,
    pub(crate) local_bounds: BoundingBox,
    pub(crate) staged: Staged,
    pub(crate) specialization: Specialization,
}

impl EntityBinding {
    /// Build the detached subtree for `entity` and queue its first
    /// transform commit.
    pub(crate) fn new(
        key: BindingKey,
        entity: &Entity,
        kind: BindingKind,
        geometry: KindGeometry,
        material: Material,
        graph: &mut SceneGraph,
        scheduler: &mut FrameScheduler,
    ) -> Self {
        let material = Material {
            transparency: geometry.transparency,
            ..material
        };

        let transform = graph.create_transform(Matrix4::identity());
        let model_transform = graph.create_transform(Matrix4::identity());
        let switch = graph.create_switch(Some(DisplayVariant::Content.index()));
        let content = graph.create_shape(Shape::new(geometry.content, material.clone()));
        let bounds = graph.create_shape(Shape::new(box_mesh(&geometry.bounds), material.clone()));
        let facade = graph.create_shape(Shape::new(MeshBuffers::new(), material));

        // All nodes are detached, so these cannot fail on timing
        let links = [
            (transform, model_transform),
            (model_transform, switch),
            (switch, content),
            (switch, bounds),
            (switch, facade),
        ];
        for (parent, child) in links {
            if let Err(e) = graph.add_child(parent, child) {
                tracing::warn!(entity = %entity.id(), error = %e, "failed to assemble binding subtree");
            }
        }

        let specialization = match kind {
            BindingKind::Segment => Specialization::Segment(Box::default()),
            _ => Specialization::Plain,
        };

        let mut binding = Self {
            key,
            entity: entity.id(),
            kind,
            nodes: BindingNodes {
                transform,
                model_transform,
                switch,
                content,
                bounds,
                facade,
            },
            scene_parent: None,
            pending_add: SmallVec::new(),
            pending_remove: SmallVec::new(),
            transparency: geometry.transparency,
            texture: None,
            enabled: true,
            listening: true,
            outer_dirty: false,
            inner_dirty: false,
            display: DisplayVariant::Content,
            local_bounds: geometry.bounds,
            staged: Staged::default(),
            specialization,
        };
        binding.update_transform(scheduler);
        binding
    }

    #[inline]
    pub fn key(&self) -> BindingKey {
        self.key
    }

    #[inline]
    pub(crate) fn owner(&self) -> Owner {
        Owner::Binding(self.key)
    }

    /// The bound entity's ID.
    #[inline]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    #[inline]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn nodes(&self) -> &BindingNodes {
        &self.nodes
    }

    /// Root node of the subtree, the one a scene parent attaches.
    #[inline]
    pub fn root(&self) -> NodeKey {
        self.nodes.transform
    }

    /// Binding whose subtree this one hangs under, `None` for the scene root.
    pub fn scene_parent(&self) -> Option<BindingKey> {
        self.scene_parent
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn segment(&self) -> Option<&SegmentState> {
        match &self.specialization {
            Specialization::Segment(state) => Some(state),
            Specialization::Plain => None,
        }
    }

    pub fn segment_mut(&mut self) -> Option<&mut SegmentState> {
        match &mut self.specialization {
            Specialization::Segment(state) => Some(state),
            Specialization::Plain => None,
        }
    }

    /// Local bounds of the content.
    pub fn bounds(&self) -> BoundingBox {
        self.local_bounds
    }

    /// Bounds of the whole subtree, child bindings included, in root space.
    pub fn extended_bounds(&self, graph: &SceneGraph) -> BoundingBox {
        graph.world_bounds(self.nodes.transform)
    }

    // --- Children ---

    /// Queue a child subtree for attachment under this binding.
    pub fn add_child(&mut self, child: NodeKey, scheduler: &mut FrameScheduler) {
        if let Some(i) = self.pending_remove.iter().position(|&c| c == child) {
            self.pending_remove.remove(i);
        }
        if !self.pending_add.contains(&child) {
            self.pending_add.push(child);
        }
        scheduler.request_bounds_update(UpdateTarget::OuterTransform, self.owner());
    }

    /// Queue a child subtree for detachment. A child still waiting to be
    /// attached is simply dropped from the pending list.
    pub fn remove_child(&mut self, child: NodeKey, scheduler: &mut FrameScheduler) {
        if let Some(i) = self.pending_add.iter().position(|&c| c == child) {
            self.pending_add.remove(i);
            return;
        }
        if !self.pending_remove.contains(&child) {
            self.pending_remove.push(child);
        }
        scheduler.request_bounds_update(UpdateTarget::OuterTransform, self.owner());
    }

    pub fn pending_adds(&self) -> &[NodeKey] {
        &self.pending_add
    }

    pub fn pending_removals(&self) -> &[NodeKey] {
        &self.pending_remove
    }

    // --- Appearance ---

    /// Set transparency, 0.0 opaque to 1.0 invisible.
    pub fn set_transparency(&mut self, value: f32, scheduler: &mut FrameScheduler) {
        self.transparency = value.clamp(0.0, 1.0);
        scheduler.request_data_update(UpdateTarget::Material, self.owner());
    }

    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    pub fn set_texture(&mut self, texture: Option<Arc<Texture>>, scheduler: &mut FrameScheduler) {
        self.texture = texture;
        scheduler.request_data_update(UpdateTarget::Material, self.owner());
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    pub fn set_display_variant(&mut self, variant: DisplayVariant, scheduler: &mut FrameScheduler) {
        self.display = variant;
        scheduler.request_data_update(UpdateTarget::Switch, self.owner());
    }

    pub fn display_variant(&self) -> DisplayVariant {
        self.display
    }

    /// Whether picking and selection consider this binding.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the kind geometry after a size change. Walls rebuild through
    /// the segment update instead.
    pub fn set_geometry(&mut self, geometry: KindGeometry, scheduler: &mut FrameScheduler) {
        if matches!(self.specialization, Specialization::Segment(_)) {
            return;
        }
        self.local_bounds = geometry.bounds;
        self.staged.bounds = Some(box_mesh(&geometry.bounds));
        self.staged.content = Some(geometry.content);
        for target in [UpdateTarget::ContentGeom, UpdateTarget::BoundsGeom] {
            scheduler.request_bounds_update(target, self.owner());
            scheduler.request_data_update(target, self.owner());
        }
    }

    // --- Transforms ---

    /// Mark both transforms dirty and queue their commits.
    ///
    /// Walls ignore this: their placement comes from the segment update.
    pub fn update_transform(&mut self, scheduler: &mut FrameScheduler) {
        if matches!(self.specialization, Specialization::Segment(_)) {
            return;
        }
        self.outer_dirty = true;
        self.inner_dirty = true;
        scheduler.request_bounds_update(UpdateTarget::OuterTransform, self.owner());
        scheduler.request_bounds_update(UpdateTarget::InnerTransform, self.owner());
    }

    fn outer_matrix(&self, model: &dyn EntityModel) -> Result<Matrix4<f64>> {
        if let Specialization::Segment(state) = &self.specialization {
            return Ok(state.placement);
        }
        let entity = model
            .entity(self.entity)
            .ok_or(Error::EntityNotFound(self.entity))?;
        let [x, y, z] = entity.position();
        let [ax, ay, az, angle] = entity.rotation();
        let rotation = Unit::try_new(Vector3::new(ax as f64, ay as f64, az as f64), 1e-12)
            .map(|axis| Rotation3::from_axis_angle(&axis, angle as f64).to_homogeneous())
            .unwrap_or_else(Matrix4::identity);
        Ok(Matrix4::new_translation(&Vector3::new(x, y, z)) * rotation)
    }

    fn inner_matrix(&self, model: &dyn EntityModel) -> Result<Matrix4<f64>> {
        if let Specialization::Segment(_) = &self.specialization {
            return Ok(Matrix4::identity());
        }
        let entity = model
            .entity(self.entity)
            .ok_or(Error::EntityNotFound(self.entity))?;
        let [sx, sy, sz] = entity.scale();
        Ok(Matrix4::new_nonuniform_scaling(&Vector3::new(
            sx as f64, sy as f64, sz as f64,
        )))
    }

    // --- Commit callbacks ---

    /// Apply a bounds-affecting change. Only called by the frame scheduler.
    ///
    /// For the outer transform the order is fixed: matrix, then removals,
    /// then additions. A missing entity abandons the matrix update but still
    /// drains the child lists.
    pub(crate) fn commit_bounds(
        &mut self,
        target: UpdateTarget,
        graph: &mut SceneGraph,
        model: &dyn EntityModel,
    ) -> Result<()> {
        match target {
            UpdateTarget::OuterTransform => {
                let mut result = Ok(());
                if self.outer_dirty {
                    match self.outer_matrix(model) {
                        Ok(matrix) => {
                            graph.set_transform(self.nodes.transform, matrix)?;
                            self.outer_dirty = false;
                            self.placement_applied(graph);
                        }
                        Err(e) => result = Err(e),
                    }
                }
                self.apply_child_lists(graph);
                result
            }
            UpdateTarget::InnerTransform => {
                if self.inner_dirty {
                    let matrix = self.inner_matrix(model)?;
                    graph.set_transform(self.nodes.model_transform, matrix)?;
                    self.inner_dirty = false;
                }
                Ok(())
            }
            UpdateTarget::ContentGeom => match self.staged.content.take() {
                Some(mesh) => graph.set_mesh(self.nodes.content, mesh),
                None => Ok(()),
            },
            UpdateTarget::FacadeGeom => match self.staged.facade.take() {
                Some(mesh) => graph.set_mesh(self.nodes.facade, mesh),
                None => Ok(()),
            },
            UpdateTarget::BoundsGeom => match self.staged.bounds.take() {
                Some(mesh) => graph.set_mesh(self.nodes.bounds, mesh),
                None => Ok(()),
            },
            UpdateTarget::Switch | UpdateTarget::Material => self.commit_data(target, graph),
        }
    }

    fn apply_child_lists(&mut self, graph: &mut SceneGraph) {
        let transform = self.nodes.transform;
        for child in std::mem::take(&mut self.pending_remove) {
            if let Err(e) = graph.remove_child(transform, child) {
                tracing::warn!(entity = %self.entity, error = %e, "child detach failed");
            }
        }
        for child in std::mem::take(&mut self.pending_add) {
            if graph.parent(child) == Some(transform) {
                continue;
            }
            // Relocated from a parent whose removal has not been committed yet
            let attached = graph.detach(child).and_then(|_| graph.add_child(transform, child));
            if let Err(e) = attached {
                tracing::warn!(entity = %self.entity, error = %e, "child attach failed");
            }
        }
    }

    fn placement_applied(&mut self, graph: &SceneGraph) {
        let bounds = self.local_bounds;
        if let Specialization::Segment(state) = &mut self.specialization {
            state.update_world_frame(&graph.world_matrix(self.nodes.transform), &bounds);
        }
    }

    /// Apply an appearance change. Only called by the frame scheduler.
    pub(crate) fn commit_data(&mut self, target: UpdateTarget, graph: &mut SceneGraph) -> Result<()> {
        match target {
            UpdateTarget::Material => {
                for shape in self.nodes.shapes() {
                    let transparency = self.transparency;
                    let texture = self.texture.clone();
                    graph.update_material(shape, |m| {
                        m.transparency = transparency;
                        m.texture = texture;
                    })?;
                }
                Ok(())
            }
            UpdateTarget::Switch => graph.set_switch(self.nodes.switch, Some(self.display.index())),
            UpdateTarget::ContentGeom | UpdateTarget::FacadeGeom | UpdateTarget::BoundsGeom => {
                let shape = match target {
                    UpdateTarget::ContentGeom => self.nodes.content,
                    UpdateTarget::FacadeGeom => self.nodes.facade,
                    _ => self.nodes.bounds,
                };
                // Empty geometry (a degenerate wall) renders as nothing
                let visible = graph
                    .shape(shape)
                    .map(|s| !s.mesh.is_empty())
                    .unwrap_or(false);
                graph.update_material(shape, |m| m.visible = visible)
            }
            UpdateTarget::OuterTransform | UpdateTarget::InnerTransform => Ok(()),
        }
    }

    /// Stop listening and drop pending child changes. Returns the subtree
    /// root for release once it is detached.
    pub(crate) fn dispose(&mut self) -> NodeKey {
        self.listening = false;
        self.pending_add.clear();
        self.pending_remove.clear();
        self.nodes.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CommitPhase;
    use crate::keys::BindingKey;
    use roomview_core::{Entity, EntityType, WorldModel};
    use slotmap::SlotMap;

    struct Fixture {
        model: WorldModel,
        graph: SceneGraph,
        scheduler: FrameScheduler,
        keys: SlotMap<BindingKey, ()>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                model: WorldModel::new(),
                graph: SceneGraph::new(),
                scheduler: FrameScheduler::new(),
                keys: SlotMap::with_key(),
            }
        }

        fn binding(&mut self, entity: Entity) -> EntityBinding {
            let root = self.model.root();
            let id = self.model.add_entity(root, entity).unwrap();
            let entity = self.model.entity(id).unwrap().clone();
            let kind = BindingKind::Model;
            let geometry = kind.constructor()(&entity, &Default::default());
            EntityBinding::new(
                self.keys.insert(()),
                &entity,
                kind,
                geometry,
                Material::default(),
                &mut self.graph,
                &mut self.scheduler,
            )
        }

        /// Run every queued request against `bindings` in one frame.
        fn run(&mut self, bindings: &mut [&mut EntityBinding]) {
            let frame = self.scheduler.take_frame();
            self.graph.set_phase(CommitPhase::Bounds);
            for request in &frame.bounds {
                for b in bindings.iter_mut() {
                    if request.owner == b.owner() {
                        b.commit_bounds(request.target, &mut self.graph, &self.model).unwrap();
                    }
                }
            }
            self.graph.set_phase(CommitPhase::Data);
            for request in &frame.data {
                for b in bindings.iter_mut() {
                    if request.owner == b.owner() {
                        b.commit_data(request.target, &mut self.graph).unwrap();
                    }
                }
            }
            self.graph.set_phase(CommitPhase::Idle);
        }
    }

    fn model_entity(fx: &mut Fixture, position: [f64; 3]) -> Entity {
        let id = fx.model.allocate_id();
        Entity::new(id, EntityType::Model).with_position(position)
    }

    #[test]
    fn first_commit_applies_position() {
        let mut fx = Fixture::new();
        let e = model_entity(&mut fx, [1.0, 0.0, 2.0]);
        let mut b = fx.binding(e);
        fx.run(&mut [&mut b]);
        let m = fx.graph.transform(b.root()).unwrap();
        assert_eq!(m[(0, 3)], 1.0);
        assert_eq!(m[(2, 3)], 2.0);
    }

    #[test]
    fn removing_pending_child_cancels_add() {
        let mut fx = Fixture::new();
        let e = model_entity(&mut fx, [0.0; 3]);
        let mut parent = fx.binding(e);
        let e = model_entity(&mut fx, [0.0; 3]);
        let child = fx.binding(e);

        parent.add_child(child.root(), &mut fx.scheduler);
        parent.remove_child(child.root(), &mut fx.scheduler);
        assert!(parent.pending_adds().is_empty());
        assert!(parent.pending_removals().is_empty());

        fx.run(&mut [&mut parent]);
        assert!(fx.graph.parent(child.root()).is_none());
    }

    #[test]
    fn bounds_commit_is_idempotent() {
        let mut fx = Fixture::new();
        let e = model_entity(&mut fx, [3.0, 0.0, 0.0]);
        let mut parent = fx.binding(e);
        let e = model_entity(&mut fx, [0.0, 0.0, 1.0]);
        let mut child = fx.binding(e);
        parent.add_child(child.root(), &mut fx.scheduler);
        fx.run(&mut [&mut parent, &mut child]);

        let before = fx.graph.describe(parent.root());
        fx.graph.set_phase(CommitPhase::Bounds);
        for target in [UpdateTarget::OuterTransform, UpdateTarget::InnerTransform] {
            parent.commit_bounds(target, &mut fx.graph, &fx.model).unwrap();
            parent.commit_bounds(target, &mut fx.graph, &fx.model).unwrap();
        }
        fx.graph.set_phase(CommitPhase::Idle);
        assert_eq!(fx.graph.describe(parent.root()), before);
        assert_eq!(fx.graph.parent(child.root()), Some(parent.root()));
    }

    #[test]
    fn relocation_between_parents_in_one_frame() {
        let mut fx = Fixture::new();
        let e = model_entity(&mut fx, [0.0; 3]);
        let mut a = fx.binding(e);
        let e = model_entity(&mut fx, [0.0; 3]);
        let mut b = fx.binding(e);
        let e = model_entity(&mut fx, [0.0; 3]);
        let child = fx.binding(e);

        a.add_child(child.root(), &mut fx.scheduler);
        fx.run(&mut [&mut a, &mut b]);

        // Queue the add first so it commits before the removal
        b.add_child(child.root(), &mut fx.scheduler);
        a.remove_child(child.root(), &mut fx.scheduler);
        fx.run(&mut [&mut a, &mut b]);

        assert_eq!(fx.graph.parent(child.root()), Some(b.root()));
        assert!(!fx.graph.children(a.root()).contains(&child.root()));
    }

    #[test]
    fn transparency_and_switch_are_data_commits() {
        let mut fx = Fixture::new();
        let e = model_entity(&mut fx, [0.0; 3]);
        let mut b = fx.binding(e);
        fx.run(&mut [&mut b]);

        b.set_transparency(1.5, &mut fx.scheduler);
        b.set_display_variant(DisplayVariant::Bounds, &mut fx.scheduler);
        assert_eq!(b.transparency(), 1.0);
        fx.run(&mut [&mut b]);

        let shape = fx.graph.shape(b.nodes().content).unwrap();
        assert_eq!(shape.material.transparency, 1.0);
        assert_eq!(fx.graph.switch_active(b.nodes().switch), Some(1));
    }

    #[test]
    fn dispose_clears_pending_lists() {
        let mut fx = Fixture::new();
        let e = model_entity(&mut fx, [0.0; 3]);
        let mut parent = fx.binding(e);
        let e = model_entity(&mut fx, [0.0; 3]);
        let child = fx.binding(e);
        parent.add_child(child.root(), &mut fx.scheduler);

        let root = parent.dispose();
        assert_eq!(root, parent.root());
        assert!(!parent.is_listening());
        assert!(parent.pending_adds().is_empty());
        // Entity ID stays readable after disposal
        assert_eq!(parent.entity(), EntityId(1));
    }

    #[test]
    fn vanished_entity_abandons_matrix_but_drains_lists() {
        let mut fx = Fixture::new();
        let e = model_entity(&mut fx, [2.0, 0.0, 0.0]);
        let mut parent = fx.binding(e);
        let e = model_entity(&mut fx, [0.0; 3]);
        let child = fx.binding(e);
        fx.model.remove_entity(parent.entity()).unwrap();

        parent.add_child(child.root(), &mut fx.scheduler);
        fx.graph.set_phase(CommitPhase::Bounds);
        let result = parent.commit_bounds(UpdateTarget::OuterTransform, &mut fx.graph, &fx.model);
        fx.graph.set_phase(CommitPhase::Idle);

        assert!(matches!(result, Err(Error::EntityNotFound(_))));
        assert_eq!(fx.graph.parent(child.root()), Some(parent.root()));
    }
}
