//! Scene graph hierarchy and the per-frame update pass
//!
//! The graph owns its nodes in a keyed arena; parent and child links are
//! plain handles, so there are no ownership cycles to manage. The update
//! pass is recursive, depth-first and parent-before-children: it settles
//! each node's transform per the dirty protocol, re-aggregates bounding
//! spheres bottom-up, and reconciles poseable membership in the cell's
//! spatial index.

use slotmap::SlotMap;

use crate::foundation::math::{invert_transform, rotation_inverse_transpose, Mat4};
use crate::scene::bounds::BoundingSphere;
use crate::scene::node::{NodeFlags, NodeKey, SceneNode};
use crate::scene::registry::NameRegistry;
use crate::spatial::{MemberShape, OcclusionIndex};

/// Pre/post notifications fired around each node's update.
///
/// Passed explicitly into the update pass so dependents (portal and mirror
/// anchoring, editor gizmos) see a deterministic, testable ordering instead
/// of subscribing behind the scene's back. `end_update` fires only for nodes
/// whose subtree actually changed.
pub trait UpdateObserver {
    /// Called before a node's transforms are updated.
    fn begin_update(&mut self, _node: NodeKey) {}

    /// Called after a node's subtree finished updating with changes.
    fn end_update(&mut self, _node: NodeKey) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoObserver;

impl UpdateObserver for NoObserver {}

/// A tree of scene nodes with incremental transform propagation.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, SceneNode>,
}

impl SceneGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a node, optionally attaching it under `parent`.
    pub fn insert(&mut self, mut node: SceneNode, parent: Option<NodeKey>) -> NodeKey {
        node.parent = parent;
        let key = self.nodes.insert(node);
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.push(key);
            } else {
                debug_assert!(false, "insert under a parent that is not in the graph");
                self.nodes[key].parent = None;
            }
        }
        key
    }

    /// Borrow a node.
    pub fn get(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Mutably borrow a node.
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Re-parent a node. The node's local transform is marked dirty so its
    /// world transform re-derives under the new parent on the next update.
    pub fn attach(&mut self, child: NodeKey, new_parent: Option<NodeKey>) {
        let Some(old_parent) = self.nodes.get(child).map(|n| n.parent) else {
            debug_assert!(false, "attach of a node that is not in the graph");
            return;
        };

        if let Some(old) = old_parent {
            if let Some(old_node) = self.nodes.get_mut(old) {
                old_node.children.retain(|&c| c != child);
            }
        }
        if let Some(new) = new_parent {
            if let Some(new_node) = self.nodes.get_mut(new) {
                new_node.children.push(child);
            }
        }

        let node = &mut self.nodes[child];
        node.parent = new_parent;
        node.flags.insert(NodeFlags::LOCAL_DIRTY);
    }

    /// Destroy a node and its whole subtree.
    ///
    /// Members of the spatial index are removed from it as they go; this is
    /// part of node destruction, not an optional courtesy, or the index
    /// would be left holding dangling handles.
    pub fn remove_subtree(&mut self, root: NodeKey, mut index: Option<&mut OcclusionIndex>) {
        if let Some(parent) = self.nodes.get(root).and_then(|n| n.parent) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&c| c != root);
            }
        }

        let mut pending = vec![root];
        while let Some(key) = pending.pop() {
            let Some(node) = self.nodes.remove(key) else {
                continue;
            };
            if let (Some(index), Some(poseable)) = (index.as_deref_mut(), &node.poseable) {
                if let Some(member) = poseable.membership {
                    index.remove(member);
                }
            }
            pending.extend(node.children);
        }
    }

    /// Enable or disable posing for a node and all of its descendants.
    ///
    /// Index membership is reconciled on the next update pass.
    pub fn set_posing_enabled(&mut self, root: NodeKey, enabled: bool) {
        let mut pending = vec![root];
        while let Some(key) = pending.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if let Some(poseable) = node.poseable.as_mut() {
                if poseable.enable_posing != enabled {
                    poseable.enable_posing = enabled;
                    node.flags.insert(NodeFlags::POSEABLE_DIRTY);
                }
            }
            pending.extend(node.children.iter().copied());
        }
    }

    /// Deep-copy a subtree under `new_parent`.
    ///
    /// Local transforms and poseable payloads are copied; index membership
    /// is not; clones join the index on their first update. Named nodes
    /// register their suffixed name in `registry` when one is supplied.
    pub fn clone_subtree(
        &mut self,
        source: NodeKey,
        new_parent: Option<NodeKey>,
        name_suffix: &str,
        mut registry: Option<&mut NameRegistry>,
    ) -> Option<NodeKey> {
        self.clone_node(source, new_parent, name_suffix, &mut registry)
    }

    fn clone_node(
        &mut self,
        source: NodeKey,
        new_parent: Option<NodeKey>,
        suffix: &str,
        registry: &mut Option<&mut NameRegistry>,
    ) -> Option<NodeKey> {
        let (clone, children) = {
            let src = self.nodes.get(source)?;

            let mut poseable = src.poseable.clone();
            if let Some(poseable) = poseable.as_mut() {
                poseable.membership = None;
                poseable.last_pose_tick = 0;
            }

            let mut flags = src.flags;
            flags.insert(NodeFlags::LOCAL_DIRTY);
            flags.remove(NodeFlags::WORLD_DIRTY);
            if poseable.is_some() {
                flags.insert(NodeFlags::POSEABLE_DIRTY);
            }

            let clone = SceneNode {
                parent: new_parent,
                children: Vec::new(),
                flags,
                local: src.local,
                world: src.world,
                it_world: src.it_world,
                world_bounding: None,
                dirty: false,
                name: src.name.as_ref().map(|n| format!("{n}{suffix}")),
                poseable,
            };
            (clone, src.children.clone())
        };

        let name = clone.name.clone();
        let key = self.nodes.insert(clone);
        if let Some(parent) = new_parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.push(key);
            }
        }
        if let (Some(registry), Some(name)) = (registry.as_deref_mut(), name) {
            registry.register(name, key);
        }

        for child in children {
            self.clone_node(child, Some(key), suffix, registry);
        }

        Some(key)
    }

    /// Run the update pass over the subtree rooted at `root`.
    ///
    /// `parent_world` is the transform the subtree hangs from (a cell passes
    /// its cell-to-world transform); `parent_changed` forces world re-derive
    /// even on clean nodes. When `index` is supplied, poseable membership is
    /// reconciled as nodes settle. Returns true when anything in the subtree
    /// changed.
    pub fn update(
        &mut self,
        root: NodeKey,
        parent_world: &Mat4,
        parent_changed: bool,
        mut index: Option<&mut OcclusionIndex>,
        observer: &mut dyn UpdateObserver,
    ) -> bool {
        self.update_node(root, parent_world, parent_changed, &mut index, observer)
    }

    fn update_node(
        &mut self,
        key: NodeKey,
        parent_world: &Mat4,
        parent_changed: bool,
        index: &mut Option<&mut OcclusionIndex>,
        observer: &mut dyn UpdateObserver,
    ) -> bool {
        observer.begin_update(key);

        let Some(node) = self.nodes.get_mut(key) else {
            debug_assert!(false, "update of a node that is not in the graph");
            return false;
        };

        let mut changed = false;
        if !node.flags.contains(NodeFlags::IGNORE_PARENT) {
            if node.flags.contains(NodeFlags::WORLD_DIRTY) {
                // The world transform is authoritative: re-derive local.
                node.it_world = rotation_inverse_transpose(&node.world);
                node.local = invert_transform(parent_world) * node.world;
                node.flags
                    .remove(NodeFlags::WORLD_DIRTY | NodeFlags::LOCAL_DIRTY);
                changed = true;
            } else if parent_changed || node.flags.contains(NodeFlags::LOCAL_DIRTY) {
                node.world = parent_world * node.local;
                node.it_world = rotation_inverse_transpose(&node.world);
                node.flags.remove(NodeFlags::LOCAL_DIRTY);
                changed = true;
            }
        } else if node.flags.contains(NodeFlags::WORLD_DIRTY) {
            node.it_world = rotation_inverse_transpose(&node.world);
            node.local = node.world;
            node.flags
                .remove(NodeFlags::WORLD_DIRTY | NodeFlags::LOCAL_DIRTY);
            changed = true;
        } else if node.flags.contains(NodeFlags::LOCAL_DIRTY) {
            node.world = node.local;
            node.it_world = rotation_inverse_transpose(&node.world);
            node.flags.remove(NodeFlags::LOCAL_DIRTY);
            changed = true;
        }

        if changed {
            let world = node.world;
            if let Some(poseable) = node.poseable.as_mut() {
                poseable.aabb = poseable.local_bounds.transformed(&world);
            }
        }

        let world = node.world;
        let children = node.children.clone();

        let mut subtree_changed = changed;
        for child in children {
            subtree_changed |= self.update_node(child, &world, changed, index, observer);
        }

        if subtree_changed {
            self.refresh_bounding(key);
        }
        self.nodes[key].dirty = subtree_changed;

        if let Some(index) = index.as_deref_mut() {
            self.refresh_membership(key, subtree_changed, index);
        }

        if subtree_changed {
            observer.end_update(key);
        }

        subtree_changed
    }

    /// Re-aggregate a node's bounding sphere from its own poseable content
    /// and its non-excluded children. An empty union leaves the node with no
    /// valid bounds.
    fn refresh_bounding(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        let mut bounding = node
            .poseable
            .as_ref()
            .map(|poseable| BoundingSphere::from_aabb(&poseable.aabb));

        for &child in &node.children {
            let Some(child_node) = self.nodes.get(child) else {
                continue;
            };
            if child_node.flags.contains(NodeFlags::EXCLUDE_FROM_BOUNDING) {
                continue;
            }
            if let Some(child_bounds) = child_node.world_bounding {
                bounding = Some(match bounding {
                    Some(current) => current.merged(&child_bounds),
                    None => child_bounds,
                });
            }
        }

        self.nodes[key].world_bounding = bounding;
    }

    /// Reconcile a poseable node's membership in the spatial index.
    fn refresh_membership(&mut self, key: NodeKey, changed: bool, index: &mut OcclusionIndex) {
        let node = &mut self.nodes[key];
        let flags = node.flags;
        let Some(poseable) = node.poseable.as_mut() else {
            return;
        };
        if !changed && !flags.contains(NodeFlags::POSEABLE_DIRTY) {
            // The member did not move this pass; its shadow contribution,
            // if it was flagged stale, is settled now.
            if let Some(member) = poseable.membership {
                index.set_member_shadow_clean(member);
            }
            return;
        }

        let shape = MemberShape {
            node: key,
            aabb: poseable.aabb,
            face_count: poseable.face_count,
            light_mask: poseable.light_mask,
            shadow_mask: poseable.shadow_mask,
            exclude_from_build: flags.contains(NodeFlags::EXCLUDE_FROM_BOUNDING),
            shadow_dirty: changed,
        };

        match (poseable.membership, poseable.enable_posing) {
            (Some(member), true) => {
                index.update(member, &shape);
            }
            (Some(member), false) => {
                index.remove(member);
                poseable.membership = None;
            }
            (None, true) => {
                poseable.membership = Some(index.insert(&shape));
            }
            (None, false) => {}
        }

        node.flags.remove(NodeFlags::POSEABLE_DIRTY);
    }
}
