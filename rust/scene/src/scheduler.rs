// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-frame commit scheduling.
//!
//! Bindings never touch live scene nodes directly. They register a request
//! naming the part of their subtree that changed and themselves as owner; at
//! the next synchronization point the manager drains the queues and calls
//! each owner back, bounds-affecting requests first, then data-only ones.

use rustc_hash::FxHashSet;

use crate::keys::{BindingKey, NodeKey};

/// The part of a binding's subtree a request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTarget {
    /// Position/rotation transform, and the child attachment lists under it
    OuterTransform,
    /// Scale transform
    InnerTransform,
    /// Content/bounds/facade selection
    Switch,
    /// Transparency, texture and visibility
    Material,
    /// Bounds proxy geometry
    BoundsGeom,
    /// Full content geometry
    ContentGeom,
    /// Front-only facade geometry
    FacadeGeom,
}

/// Who gets called back for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The manager's own root attachment lists
    Root,
    Binding(BindingKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateRequest {
    pub target: UpdateTarget,
    pub owner: Owner,
}

/// Requests drained for one frame, in registration order.
#[derive(Debug, Default)]
pub struct Frame {
    pub number: u64,
    pub bounds: Vec<UpdateRequest>,
    pub data: Vec<UpdateRequest>,
    pub retired: Vec<NodeKey>,
}

/// What one synchronization did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub bounds_commits: usize,
    pub data_commits: usize,
    /// Requests whose owner was disposed before the frame ran
    pub skipped: usize,
    /// Commits that failed and were abandoned
    pub failed: usize,
    pub freed_nodes: usize,
}

/// Deduplicating request queues.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    bounds: Vec<UpdateRequest>,
    data: Vec<UpdateRequest>,
    queued_bounds: FxHashSet<UpdateRequest>,
    queued_data: FxHashSet<UpdateRequest>,
    retired: Vec<NodeKey>,
    frame: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a bounds-affecting commit. Returns false if already queued.
    pub fn request_bounds_update(&mut self, target: UpdateTarget, owner: Owner) -> bool {
        let request = UpdateRequest { target, owner };
        if self.queued_bounds.insert(request) {
            self.bounds.push(request);
            true
        } else {
            false
        }
    }

    /// Queue a data-only commit. Returns false if already queued.
    pub fn request_data_update(&mut self, target: UpdateTarget, owner: Owner) -> bool {
        let request = UpdateRequest { target, owner };
        if self.queued_data.insert(request) {
            self.data.push(request);
            true
        } else {
            false
        }
    }

    /// Hand a detached subtree root over for release at the end of the frame.
    pub fn retire(&mut self, node: NodeKey) {
        self.retired.push(node);
    }

    /// Number of queued requests.
    pub fn pending(&self) -> usize {
        self.bounds.len() + self.data.len()
    }

    pub fn is_idle(&self) -> bool {
        self.bounds.is_empty() && self.data.is_empty() && self.retired.is_empty()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame
    }

    /// Drain everything queued so far into a new frame.
    ///
    /// Requests made while the frame's commits run land in the next frame.
    pub fn take_frame(&mut self) -> Frame {
        self.frame += 1;
        self.queued_bounds.clear();
        self.queued_data.clear();
        Frame {
            number: self.frame,
            bounds: std::mem::take(&mut self.bounds),
            data: std::mem::take(&mut self.data),
            retired: std::mem::take(&mut self.retired),
        }
    }

    /// Forget all queued work.
    pub fn clear(&mut self) {
        self.bounds.clear();
        self.data.clear();
        self.queued_bounds.clear();
        self.queued_data.clear();
        self.retired.clear();
    }
}
