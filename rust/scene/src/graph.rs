// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retained scene graph.
//!
//! Nodes live in a slot map owned by [`SceneGraph`]. A node is *live* once it
//! is reachable from the root group; live nodes may only be written while the
//! frame scheduler runs a commit phase. Structural writes (parenting,
//! transforms, geometry) need the bounds phase, appearance writes (material,
//! switch selection) are accepted in either phase. Nodes that are not yet
//! attached can be prepared freely.

use std::fmt::Write as _;
use std::sync::Arc;

use nalgebra::{Matrix4, Vector3};
use roomview_geometry::{BoundingBox, MeshBuffers};
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::keys::NodeKey;
use crate::resources::Texture;

/// Which part of the frame is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitPhase {
    /// Outside synchronization: live nodes are read-only.
    Idle,
    /// Bounds-affecting commits: anything may change.
    Bounds,
    /// Data-only commits: appearance only.
    Data,
}

/// Appearance of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub diffuse: [f32; 3],
    /// 0.0 is opaque, 1.0 fully transparent.
    pub transparency: f32,
    pub texture: Option<Arc<Texture>>,
    pub visible: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: [0.8, 0.8, 0.8],
            transparency: 0.0,
            texture: None,
            visible: true,
        }
    }
}

/// Geometry plus appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub mesh: MeshBuffers,
    pub bounds: BoundingBox,
    pub material: Material,
}

impl Shape {
    pub fn new(mesh: MeshBuffers, material: Material) -> Self {
        let bounds = mesh.bounds();
        Self {
            mesh,
            bounds,
            material,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Transform(Matrix4<f64>),
    /// Renders only the child at `active`, or nothing.
    Switch { active: Option<usize> },
    Shape(Box<Shape>),
}

impl NodeKind {
    fn label(&self) -> &'static str {
        match self {
            NodeKind::Group => "Group",
            NodeKind::Transform(_) => "Transform",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::Shape(_) => "Shape",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }
}

/// Arena of scene nodes with a fixed root group.
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    root: NodeKey,
    phase: CommitPhase,
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Group));
        Self {
            nodes,
            root,
            phase: CommitPhase::Idle,
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn phase(&self) -> CommitPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: CommitPhase) {
        self.phase = phase;
    }

    /// Number of nodes, including detached ones and the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    // --- Creation (detached nodes) ---

    pub fn create_group(&mut self) -> NodeKey {
        self.nodes.insert(Node::new(NodeKind::Group))
    }

    pub fn create_transform(&mut self, matrix: Matrix4<f64>) -> NodeKey {
        self.nodes.insert(Node::new(NodeKind::Transform(matrix)))
    }

    pub fn create_switch(&mut self, active: Option<usize>) -> NodeKey {
        self.nodes.insert(Node::new(NodeKind::Switch { active }))
    }

    pub fn create_shape(&mut self, shape: Shape) -> NodeKey {
        self.nodes.insert(Node::new(NodeKind::Shape(Box::new(shape))))
    }

    // --- Queries ---

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn transform(&self, key: NodeKey) -> Option<Matrix4<f64>> {
        match self.nodes.get(key).map(|n| &n.kind) {
            Some(NodeKind::Transform(m)) => Some(*m),
            _ => None,
        }
    }

    pub fn switch_active(&self, key: NodeKey) -> Option<usize> {
        match self.nodes.get(key).map(|n| &n.kind) {
            Some(NodeKind::Switch { active }) => *active,
            _ => None,
        }
    }

    pub fn shape(&self, key: NodeKey) -> Option<&Shape> {
        match self.nodes.get(key).map(|n| &n.kind) {
            Some(NodeKind::Shape(shape)) => Some(shape),
            _ => None,
        }
    }

    /// Whether `key` is reachable from the root.
    pub fn is_live(&self, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == self.root {
                return true;
            }
            current = self.parent(k);
        }
        false
    }

    fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.parent(k);
        }
        false
    }

    /// Product of all transforms from the root down to and including `key`.
    pub fn world_matrix(&self, key: NodeKey) -> Matrix4<f64> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(key);
        while let Some(k) = current {
            if let Some(NodeKind::Transform(m)) = self.nodes.get(k).map(|n| &n.kind) {
                matrix = m * matrix;
            }
            current = self.parent(k);
        }
        matrix
    }

    /// Bounds of everything rendered below `key`, in root space.
    ///
    /// Inactive switch children are skipped.
    pub fn world_bounds(&self, key: NodeKey) -> BoundingBox {
        let parent_matrix = self
            .parent(key)
            .map(|p| self.world_matrix(p))
            .unwrap_or_else(Matrix4::identity);
        let mut bounds = BoundingBox::empty();
        self.accumulate_bounds(key, &parent_matrix, &mut bounds);
        bounds
    }

    fn accumulate_bounds(&self, key: NodeKey, parent: &Matrix4<f64>, out: &mut BoundingBox) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        match &node.kind {
            NodeKind::Transform(m) => {
                let matrix = parent * m;
                for &child in &node.children {
                    self.accumulate_bounds(child, &matrix, out);
                }
            }
            NodeKind::Switch { active } => {
                if let Some(&child) = active.and_then(|i| node.children.get(i)) {
                    self.accumulate_bounds(child, parent, out);
                }
            }
            NodeKind::Shape(shape) => {
                if shape.material.visible && !shape.bounds.is_empty() {
                    *out = out.union(&shape.bounds.transformed(parent));
                }
            }
            NodeKind::Group => {
                for &child in &node.children {
                    self.accumulate_bounds(child, parent, out);
                }
            }
        }
    }

    // --- Writes ---

    fn check_write(&self, key: NodeKey, structural: bool) -> Result<()> {
        if !self.nodes.contains_key(key) {
            return Err(Error::NodeNotFound(key));
        }
        if !self.is_live(key) {
            return Ok(());
        }
        match (self.phase, structural) {
            (CommitPhase::Bounds, _) | (CommitPhase::Data, false) => Ok(()),
            (phase, _) => Err(Error::InvalidWriteTiming { node: key, phase }),
        }
    }

    /// Attach a detached node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.check_write(parent, true)?;
        if !self.nodes.contains_key(child) {
            return Err(Error::NodeNotFound(child));
        }
        if self.parent(child).is_some() || child == self.root || self.is_ancestor(child, parent) {
            return Err(Error::InvalidAttachment { parent, child });
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Detach `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<bool> {
        self.check_write(parent, true)?;
        if self.parent(child) != Some(parent) {
            return Ok(false);
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        Ok(true)
    }

    /// Detach `child` from whatever parent it has.
    pub fn detach(&mut self, child: NodeKey) -> Result<bool> {
        match self.parent(child) {
            Some(parent) => self.remove_child(parent, child),
            None => Ok(false),
        }
    }

    pub fn set_transform(&mut self, key: NodeKey, matrix: Matrix4<f64>) -> Result<()> {
        self.check_write(key, true)?;
        match self.nodes.get_mut(key).map(|n| &mut n.kind) {
            Some(NodeKind::Transform(m)) => {
                *m = matrix;
                Ok(())
            }
            _ => Err(Error::NodeNotFound(key)),
        }
    }

    pub fn set_switch(&mut self, key: NodeKey, active: Option<usize>) -> Result<()> {
        self.check_write(key, false)?;
        match self.nodes.get_mut(key).map(|n| &mut n.kind) {
            Some(NodeKind::Switch { active: current }) => {
                *current = active;
                Ok(())
            }
            _ => Err(Error::NodeNotFound(key)),
        }
    }

    /// Replace the geometry of a shape, recomputing its bounds.
    pub fn set_mesh(&mut self, key: NodeKey, mesh: MeshBuffers) -> Result<()> {
        self.check_write(key, true)?;
        let shape = self.shape_mut(key)?;
        shape.bounds = mesh.bounds();
        shape.mesh = mesh;
        Ok(())
    }

    /// Update a shape's material in place.
    pub fn update_material(&mut self, key: NodeKey, update: impl FnOnce(&mut Material)) -> Result<()> {
        self.check_write(key, false)?;
        update(&mut self.shape_mut(key)?.material);
        Ok(())
    }

    fn shape_mut(&mut self, key: NodeKey) -> Result<&mut Shape> {
        match self.nodes.get_mut(key).map(|n| &mut n.kind) {
            Some(NodeKind::Shape(shape)) => Ok(shape),
            _ => Err(Error::NodeNotFound(key)),
        }
    }

    /// Free a detached subtree. Returns the number of nodes released.
    ///
    /// Live or still-parented nodes are left alone.
    pub fn free_subtree(&mut self, key: NodeKey) -> usize {
        if key == self.root || self.parent(key).is_some() || !self.nodes.contains_key(key) {
            return 0;
        }
        let mut stack = vec![key];
        let mut freed = 0;
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        freed
    }

    /// Indented outline of the subtree under `key`, for diagnostics and
    /// state comparisons.
    pub fn describe(&self, key: NodeKey) -> String {
        let mut out = String::new();
        self.describe_into(key, 0, &mut out);
        out
    }

    fn describe_into(&self, key: NodeKey, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let _ = write!(out, "{:indent$}{}", "", node.kind.label(), indent = depth * 2);
        match &node.kind {
            NodeKind::Transform(m) => {
                let t: Vector3<f64> = m.fixed_view::<3, 1>(0, 3).into_owned();
                let _ = write!(out, " t=({:.4},{:.4},{:.4})", t.x, t.y, t.z);
            }
            NodeKind::Switch { active } => {
                let _ = write!(out, " active={:?}", active);
            }
            NodeKind::Shape(shape) => {
                let _ = write!(
                    out,
                    " vertices={} transparency={:.2} visible={}",
                    shape.mesh.vertex_count(),
                    shape.material.transparency,
                    shape.material.visible
                );
            }
            NodeKind::Group => {}
        }
        out.push('\n');
        for &child in &node.children {
            self.describe_into(child, depth + 1, out);
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};
    use roomview_geometry::MeshBuffers;

    fn triangle() -> MeshBuffers {
        let mut mesh = MeshBuffers::new();
        mesh.push_vertex(Point3::new(0.0, 0.0, 0.0), Point2::origin());
        mesh.push_vertex(Point3::new(1.0, 0.0, 0.0), Point2::origin());
        mesh.push_vertex(Point3::new(0.0, 1.0, 0.0), Point2::origin());
        mesh
    }

    #[test]
    fn detached_nodes_are_writable() {
        let mut graph = SceneGraph::new();
        let t = graph.create_transform(Matrix4::identity());
        assert!(graph.set_transform(t, Matrix4::new_scaling(2.0)).is_ok());
        assert!(!graph.is_live(t));
    }

    #[test]
    fn live_writes_require_commit_phase() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let t = graph.create_transform(Matrix4::identity());

        assert!(matches!(
            graph.add_child(root, t),
            Err(Error::InvalidWriteTiming { phase: CommitPhase::Idle, .. })
        ));

        graph.set_phase(CommitPhase::Bounds);
        graph.add_child(root, t).unwrap();
        graph.set_phase(CommitPhase::Data);
        assert!(matches!(
            graph.set_transform(t, Matrix4::identity()),
            Err(Error::InvalidWriteTiming { phase: CommitPhase::Data, .. })
        ));

        let shape = graph.create_shape(Shape::new(triangle(), Material::default()));
        graph.set_phase(CommitPhase::Bounds);
        graph.add_child(t, shape).unwrap();
        graph.set_phase(CommitPhase::Data);
        graph
            .update_material(shape, |m| m.transparency = 0.5)
            .unwrap();
        assert_eq!(graph.shape(shape).unwrap().material.transparency, 0.5);
    }

    #[test]
    fn attach_rejects_second_parent_and_cycles() {
        let mut graph = SceneGraph::new();
        let a = graph.create_group();
        let b = graph.create_group();
        let c = graph.create_group();
        graph.add_child(a, b).unwrap();
        assert!(graph.add_child(c, b).is_err());
        assert!(graph.add_child(b, a).is_err());
    }

    #[test]
    fn world_bounds_follow_transforms_and_switches() {
        let mut graph = SceneGraph::new();
        let t = graph.create_transform(Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0)));
        let s = graph.create_switch(Some(1));
        let hidden = graph.create_shape(Shape::new(triangle(), Material::default()));
        let shown = graph.create_shape(Shape::new(triangle(), Material::default()));
        graph.add_child(t, s).unwrap();
        graph.add_child(s, hidden).unwrap();
        graph.add_child(s, shown).unwrap();
        graph.set_mesh(hidden, {
            let mut m = triangle();
            m.coords[0] = -10.0;
            m
        })
        .unwrap();

        let bounds = graph.world_bounds(t);
        assert_relative_eq!(bounds.min.x, 5.0);
        assert_relative_eq!(bounds.max.x, 6.0);

        let m = graph.world_matrix(shown);
        assert_relative_eq!(m[(0, 3)], 5.0);
    }

    #[test]
    fn free_subtree_only_releases_detached_nodes() {
        let mut graph = SceneGraph::new();
        let a = graph.create_group();
        let b = graph.create_group();
        graph.add_child(a, b).unwrap();
        assert_eq!(graph.free_subtree(b), 0);
        assert_eq!(graph.free_subtree(a), 2);
        assert!(!graph.contains(b));
        assert_eq!(graph.len(), 1);
    }
}
