// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena keys for scene nodes and bindings.
//!
//! Keys are generational: a key to a freed node or a disposed binding simply
//! stops resolving, which is what makes late commit requests harmless.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a node in the [`SceneGraph`](crate::graph::SceneGraph).
    pub struct NodeKey;

    /// Key for an [`EntityBinding`](crate::binding::EntityBinding).
    pub struct BindingKey;
}
