// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall specialization of [`EntityBinding`].
//!
//! A segment binding tracks the windows and doors hosted by its wall and
//! regenerates the wall mesh through [`SegmentMeshBuilder`] whenever the
//! wall, its endpoints or its openings change.

use nalgebra::{Matrix4, Point2, Point3, Vector3};
use roomview_core::{category, property, DEFAULT_SHEET, EntityId, EntityModel};
use roomview_geometry::{
    box_mesh, Alignment, BoundingBox, Opening, SegmentMeshBuilder, SegmentParams,
};
use smallvec::SmallVec;

use crate::binding::{EntityBinding, Specialization};
use crate::config::SceneConfig;
use crate::error::{Error, Result};
use crate::relations::SegmentRelations;
use crate::scheduler::{FrameScheduler, Owner, UpdateTarget};

/// Wall-specific state of a segment binding.
#[derive(Debug, Clone)]
pub struct SegmentState {
    windows: Vec<EntityId>,
    doors: Vec<EntityId>,
    pub(crate) placement: Matrix4<f64>,
    world_normal: Vector3<f64>,
    world_center: Point3<f64>,
    width: f64,
    front_triangles: i64,
}

impl Default for SegmentState {
    fn default() -> Self {
        Self {
            windows: Vec::new(),
            doors: Vec::new(),
            placement: Matrix4::identity(),
            world_normal: Vector3::z(),
            world_center: Point3::origin(),
            width: 0.0,
            front_triangles: 0,
        }
    }
}

impl SegmentState {
    /// Returns false if the window was already tracked.
    pub fn add_window(&mut self, id: EntityId) -> bool {
        if self.windows.contains(&id) {
            return false;
        }
        self.windows.push(id);
        true
    }

    pub fn remove_window(&mut self, id: EntityId) -> bool {
        let before = self.windows.len();
        self.windows.retain(|&w| w != id);
        self.windows.len() != before
    }

    /// Returns false if the door was already tracked.
    pub fn add_door(&mut self, id: EntityId) -> bool {
        if self.doors.contains(&id) {
            return false;
        }
        self.doors.push(id);
        true
    }

    pub fn remove_door(&mut self, id: EntityId) -> bool {
        let before = self.doors.len();
        self.doors.retain(|&d| d != id);
        self.doors.len() != before
    }

    /// Drop `id` from whichever list holds it.
    pub fn remove_opening(&mut self, id: EntityId) -> bool {
        self.remove_window(id) | self.remove_door(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.windows.contains(&id) || self.doors.contains(&id)
    }

    pub fn windows(&self) -> &[EntityId] {
        &self.windows
    }

    pub fn doors(&self) -> &[EntityId] {
        &self.doors
    }

    /// Wall-local to owner-space placement of the last build.
    pub fn placement(&self) -> &Matrix4<f64> {
        &self.placement
    }

    /// Front-face normal in root space, as of the last transform commit.
    pub fn world_normal(&self) -> Vector3<f64> {
        self.world_normal
    }

    /// Center of the wall in root space, as of the last transform commit.
    pub fn world_center(&self) -> Point3<f64> {
        self.world_center
    }

    /// Wall length of the last build.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Front-face triangle count of the last build, negative when partial.
    pub fn front_triangle_count(&self) -> i64 {
        self.front_triangles
    }

    pub(crate) fn update_world_frame(&mut self, world: &Matrix4<f64>, local_bounds: &BoundingBox) {
        self.world_normal = world
            .transform_vector(&Vector3::z())
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z);
        let center = if local_bounds.is_empty() {
            Point3::origin()
        } else {
            let c = local_bounds.center();
            Point3::new(c.x as f64, c.y as f64, c.z as f64)
        };
        self.world_center = world.transform_point(&center);
    }
}

/// Opening for a window or door entity, in wall-local coordinates.
fn opening_for(model: &dyn EntityModel, id: EntityId) -> Option<Opening> {
    let entity = model.entity(id)?;
    let [x, y, _] = entity.position();
    let [w, h, _] = entity.size();
    let center = Point2::new(x, y);
    let (half_width, half_height) = (w as f64 * 0.5, h as f64 * 0.5);

    let opening = if entity.has_category(category::DOOR) {
        Opening::door(center, half_width, half_height)
    } else {
        Opening::window(center, half_width, half_height)
    };
    let alignment = entity
        .property(DEFAULT_SHEET, property::ALIGNMENT)
        .and_then(|v| v.as_str())
        .and_then(Alignment::parse);
    Some(match alignment {
        Some(alignment) => opening.with_alignment(alignment),
        None => opening,
    })
}

impl EntityBinding {
    /// Regenerate the wall mesh and queue its geometry and placement commits.
    ///
    /// Does nothing for bindings that are not walls.
    pub fn update_segment(
        &mut self,
        model: &dyn EntityModel,
        relations: &dyn SegmentRelations,
        builder: &mut SegmentMeshBuilder,
        config: &SceneConfig,
        scheduler: &mut FrameScheduler,
    ) -> Result<()> {
        let Specialization::Segment(state) = &mut self.specialization else {
            return Ok(());
        };
        let entity = model
            .entity(self.entity)
            .ok_or(Error::EntityNotFound(self.entity))?;
        let ends = entity
            .endpoints()
            .ok_or(Error::MissingEndpoints(self.entity))?;
        let start = relations
            .to_local(model, ends.start)
            .ok_or(Error::EntityNotFound(ends.start))?;
        let end = relations
            .to_local(model, ends.end)
            .ok_or(Error::EntityNotFound(ends.end))?;

        let height_at = |vertex: EntityId| {
            model
                .entity(vertex)
                .and_then(|v| v.float_property(property::HEIGHT))
                .unwrap_or(config.default_wall_height)
        };
        let thickness = entity
            .float_property(property::THICKNESS)
            .unwrap_or(config.default_wall_thickness);
        let [start_miter, end_miter] = relations.segment_miter(model, self.entity);

        let params = SegmentParams::new(start, end, config.default_wall_height, thickness)
            .with_heights(height_at(ends.start), height_at(ends.end))
            .with_miters(start_miter, end_miter);

        let openings: SmallVec<[Opening; 4]> = state
            .doors
            .iter()
            .chain(state.windows.iter())
            .filter_map(|&id| opening_for(model, id))
            .collect();

        let wall = builder.build(&params, &openings);
        tracing::debug!(
            segment = %self.entity,
            width = wall.width,
            triangles = wall.front_triangle_count,
            openings = openings.len(),
            "wall rebuilt"
        );

        state.placement = wall.matrix;
        state.width = wall.width;
        state.front_triangles = wall.front_triangle_count;
        self.local_bounds = wall.bounds;
        self.staged.bounds = Some(box_mesh(&wall.bounds));
        self.staged.content = Some(wall.mesh);
        self.staged.facade = Some(wall.facade);
        self.outer_dirty = true;

        let owner = Owner::Binding(self.key);
        for target in [
            UpdateTarget::ContentGeom,
            UpdateTarget::FacadeGeom,
            UpdateTarget::BoundsGeom,
        ] {
            scheduler.request_bounds_update(target, owner);
            scheduler.request_data_update(target, owner);
        }
        scheduler.request_bounds_update(UpdateTarget::OuterTransform, owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_lists_deduplicate() {
        let mut state = SegmentState::default();
        assert!(state.add_window(EntityId(4)));
        assert!(!state.add_window(EntityId(4)));
        assert!(state.add_door(EntityId(5)));
        assert!(state.contains(EntityId(5)));

        assert!(state.remove_opening(EntityId(4)));
        assert!(!state.remove_opening(EntityId(4)));
        assert_eq!(state.doors(), &[EntityId(5)]);
        assert!(state.windows().is_empty());
    }

    #[test]
    fn world_frame_follows_placement() {
        let mut state = SegmentState::default();
        let bounds = BoundingBox::from_center_size(
            Point3::new(2.0, 1.0, -0.05),
            Vector3::new(4.0, 2.0, 0.1),
        );
        // Quarter turn about +Y
        let placement = Matrix4::new_rotation(Vector3::new(0.0, std::f64::consts::FRAC_PI_2, 0.0));
        state.update_world_frame(&placement, &bounds);

        assert!((state.world_normal() - Vector3::x()).norm() < 1e-6);
        assert!((state.world_center().z + 2.0).abs() < 1e-5);
    }
}
