// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity tree traversal and the manager's mirror of the hierarchy.

use roomview_core::EntityId;
use rustc_hash::FxHashMap;

/// Visit order for [`walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Parents before children
    Pre,
    /// Children before parents
    Post,
}

/// Depth-first walk from `root`, children in list order.
///
/// `children` resolves the child list of a node; `visit` receives each node
/// with its depth below `root`.
pub fn walk<'a, C, V>(root: EntityId, children: C, order: Order, mut visit: V)
where
    C: Fn(EntityId) -> &'a [EntityId],
    V: FnMut(EntityId, usize),
{
    match order {
        Order::Pre => {
            let mut stack = vec![(root, 0)];
            while let Some((id, depth)) = stack.pop() {
                visit(id, depth);
                stack.extend(children(id).iter().rev().map(|&c| (c, depth + 1)));
            }
        }
        Order::Post => {
            // (node, depth, children already pushed)
            let mut stack = vec![(root, 0, false)];
            while let Some((id, depth, expanded)) = stack.pop() {
                if expanded {
                    visit(id, depth);
                    continue;
                }
                stack.push((id, depth, true));
                stack.extend(children(id).iter().rev().map(|&c| (c, depth + 1, false)));
            }
        }
    }
}

/// Collect the nodes under `root` in the given order.
pub fn collect<'a, C>(root: EntityId, children: C, order: Order) -> Vec<EntityId>
where
    C: Fn(EntityId) -> &'a [EntityId],
{
    let mut out = Vec::new();
    walk(root, children, order, |id, _| out.push(id));
    out
}

/// The entity hierarchy as last reported by model events.
///
/// Removal events arrive after the model has already dropped the subtree,
/// so disposal walks this copy instead of the model.
#[derive(Debug, Default)]
pub struct EntityTree {
    parents: FxHashMap<EntityId, EntityId>,
    children: FxHashMap<EntityId, Vec<EntityId>>,
}

impl EntityTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `child` under `parent`. Returns false if it was already known.
    pub fn insert(&mut self, parent: EntityId, child: EntityId) -> bool {
        if self.parents.contains_key(&child) {
            return false;
        }
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parents.get(&id).copied()
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Forget `root` and everything below it.
    ///
    /// Returns `(id, parent)` pairs, children before parents. Unknown roots
    /// yield nothing.
    pub fn remove_subtree(&mut self, root: EntityId) -> Vec<(EntityId, EntityId)> {
        let Some(parent) = self.parent(root) else {
            return Vec::new();
        };
        let removed: Vec<(EntityId, EntityId)> = collect(root, |id| self.children(id), Order::Post)
            .into_iter()
            .map(|id| (id, self.parent(id).unwrap_or(parent)))
            .collect();
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|&c| c != root);
        }
        for (id, _) in &removed {
            self.parents.remove(id);
            self.children.remove(id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn clear(&mut self) {
        self.parents.clear();
        self.children.clear();
    }
}
