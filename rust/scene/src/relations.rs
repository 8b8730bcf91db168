// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment chain relations.
//!
//! Walls read their endpoint positions and miter angles through the
//! [`SegmentRelations`] trait. [`SegmentChains`] is the default implementation:
//! it tracks which segments meet at each vertex so adjacency survives the
//! removal of entities from the model.

use nalgebra::{Point3, Vector3};
use roomview_core::{EntityId, EntityModel};
use roomview_geometry::joint_miter;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

pub type SegmentList = SmallVec<[EntityId; 4]>;

/// Relational queries over the vertex/segment chains of a multi-segment.
pub trait SegmentRelations {
    /// Vertex position in the space of the segment owner.
    fn to_local(&self, model: &dyn EntityModel, vertex: EntityId) -> Option<Point3<f64>>;

    /// Miter angles `[start, end]` of a segment, from its adjoining segments.
    fn segment_miter(&self, model: &dyn EntityModel, segment: EntityId) -> [f64; 2];

    /// Segments meeting at a vertex.
    fn segments_at(&self, vertex: EntityId) -> SegmentList;

    /// Segments sharing a vertex with `segment`.
    fn neighbours(&self, segment: EntityId) -> SegmentList;
}

/// Vertex-to-segment adjacency for every tracked wall.
#[derive(Debug, Default)]
pub struct SegmentChains {
    endpoints: FxHashMap<EntityId, (EntityId, EntityId)>,
    at_vertex: FxHashMap<EntityId, SegmentList>,
}

impl SegmentChains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a segment between `start` and `end`.
    pub fn track(&mut self, segment: EntityId, start: EntityId, end: EntityId) {
        self.untrack(segment);
        self.endpoints.insert(segment, (start, end));
        for vertex in [start, end] {
            let list = self.at_vertex.entry(vertex).or_default();
            if !list.contains(&segment) {
                list.push(segment);
            }
        }
    }

    /// Stop tracking a segment. Returns its endpoints if it was tracked.
    pub fn untrack(&mut self, segment: EntityId) -> Option<(EntityId, EntityId)> {
        let (start, end) = self.endpoints.remove(&segment)?;
        for vertex in [start, end] {
            if let Some(list) = self.at_vertex.get_mut(&vertex) {
                list.retain(|s| *s != segment);
                if list.is_empty() {
                    self.at_vertex.remove(&vertex);
                }
            }
        }
        Some((start, end))
    }

    pub fn endpoints(&self, segment: EntityId) -> Option<(EntityId, EntityId)> {
        self.endpoints.get(&segment).copied()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn clear(&mut self) {
        self.endpoints.clear();
        self.at_vertex.clear();
    }

    fn direction(&self, model: &dyn EntityModel, segment: EntityId) -> Option<Vector3<f64>> {
        let (start, end) = self.endpoints(segment)?;
        let d = self.to_local(model, end)? - self.to_local(model, start)?;
        Some(Vector3::new(d.x, 0.0, d.z))
    }

    /// The single other segment at `vertex`, if exactly one exists.
    fn sole_partner(&self, vertex: EntityId, segment: EntityId) -> Option<EntityId> {
        let list = self.at_vertex.get(&vertex)?;
        let mut others = list.iter().filter(|&&s| s != segment);
        let partner = *others.next()?;
        others.next().is_none().then_some(partner)
    }
}

impl SegmentRelations for SegmentChains {
    fn to_local(&self, model: &dyn EntityModel, vertex: EntityId) -> Option<Point3<f64>> {
        let [x, y, z] = model.entity(vertex)?.position();
        Some(Point3::new(x, y, z))
    }

    fn segment_miter(&self, model: &dyn EntityModel, segment: EntityId) -> [f64; 2] {
        let (Some((start, end)), Some(dir)) = (self.endpoints(segment), self.direction(model, segment)) else {
            return [0.0, 0.0];
        };

        // Partner direction oriented to flow through the shared vertex, and
        // whether it had to be flipped to do so. A flipped partner keeps its
        // back face on the other side of the chain, so the miter changes sign.
        let flowing = |vertex: EntityId, into: bool| -> Option<(Vector3<f64>, bool)> {
            let partner = self.sole_partner(vertex, segment)?;
            let (p_start, _) = self.endpoints(partner)?;
            let d = self.direction(model, partner)?;
            let ends_here = p_start != vertex;
            Some(if ends_here == into { (d, false) } else { (-d, true) })
        };
        let signed = |miter: f64, flipped: bool| if flipped { -miter } else { miter };

        let start_miter = flowing(start, true)
            .map(|(incoming, flipped)| signed(joint_miter(&incoming, &dir), flipped))
            .unwrap_or(0.0);
        let end_miter = flowing(end, false)
            .map(|(outgoing, flipped)| signed(joint_miter(&dir, &outgoing), flipped))
            .unwrap_or(0.0);
        [start_miter, end_miter]
    }

    fn segments_at(&self, vertex: EntityId) -> SegmentList {
        self.at_vertex.get(&vertex).cloned().unwrap_or_default()
    }

    fn neighbours(&self, segment: EntityId) -> SegmentList {
        let mut out = SegmentList::new();
        if let Some((start, end)) = self.endpoints(segment) {
            for vertex in [start, end] {
                for s in self.segments_at(vertex) {
                    if s != segment && !out.contains(&s) {
                        out.push(s);
                    }
                }
            }
        }
        out
    }
}
