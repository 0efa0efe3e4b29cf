//! Scene node representation
//!
//! A scene node is a spatial instance: anything with a transform that lives
//! in a cell's hierarchy. Nodes that can be drawn additionally carry a
//! [`Poseable`] payload that makes them candidates for culling and posing.

use bitflags::bitflags;

use crate::foundation::math::{Mat3, Mat4};
use crate::render::backend::DrawPayload;
use crate::scene::bounds::{Aabb, BoundingSphere};
use crate::spatial::MemberKey;

slotmap::new_key_type! {
    /// Stable handle to a node inside a [`SceneGraph`](crate::scene::SceneGraph)
    pub struct NodeKey;
}

bitflags! {
    /// Dirty-state and behavior flags for a scene node
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u32 {
        /// Local transform changed; world must be recomputed top-down
        const LOCAL_DIRTY = 1 << 0;
        /// World transform was set directly; local must be re-derived
        const WORLD_DIRTY = 1 << 1;
        /// Skip this node when aggregating parent bounds and rebuilding the index
        const EXCLUDE_FROM_BOUNDING = 1 << 2;
        /// Spatial-index membership must be reconciled on the next update
        const POSEABLE_DIRTY = 1 << 3;
        /// Skip this node for shadow-affinity purposes
        const EXCLUDE_FROM_SHADOWING = 1 << 4;
        /// World transform is independent of the parent (e.g. a sky dome)
        const IGNORE_PARENT = 1 << 5;
    }
}

/// Default light/shadow affinity mask
pub const DEFAULT_AFFINITY_MASK: u64 = 1 << 0;

/// Render payload of a node that is a candidate for posing.
///
/// The world-space AABB is derived from `local_bounds` whenever the node's
/// transforms update; `membership` is the node's handle into its cell's
/// spatial index and is valid exactly while the node is a member there.
#[derive(Debug, Clone)]
pub struct Poseable {
    /// Bounding box of the renderable content in node-local space
    pub local_bounds: Aabb,
    /// Derived world-space bounding box (updated by the update pass)
    pub aabb: Aabb,
    /// Total face count of the renderable content
    pub face_count: u32,
    /// Bitmask matched against a light's light mask
    pub light_mask: u64,
    /// Bitmask matched against a light's shadow mask
    pub shadow_mask: u64,
    /// Whether this node currently participates in posing
    pub enable_posing: bool,
    /// What to submit to the render batch trees when posed
    pub payload: DrawPayload,
    pub(crate) membership: Option<MemberKey>,
    pub(crate) last_pose_tick: u64,
}

impl Poseable {
    /// Create a poseable payload from local bounds and draw data.
    pub fn new(local_bounds: Aabb, face_count: u32, payload: DrawPayload) -> Self {
        Self {
            local_bounds,
            aabb: local_bounds,
            face_count,
            light_mask: DEFAULT_AFFINITY_MASK,
            shadow_mask: DEFAULT_AFFINITY_MASK,
            enable_posing: true,
            payload,
            membership: None,
            last_pose_tick: 0,
        }
    }

    /// True while the node is a member of a spatial index.
    pub fn is_posed(&self) -> bool {
        self.membership.is_some()
    }
}

/// A node in a cell's scene hierarchy.
///
/// Transform state follows a strict dirty protocol: at most one of
/// `LOCAL_DIRTY` / `WORLD_DIRTY` is meaningful at a time and decides which
/// direction the next update recomputes. Setters maintain that invariant.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) flags: NodeFlags,
    pub(crate) local: Mat4,
    pub(crate) world: Mat4,
    pub(crate) it_world: Mat3,
    pub(crate) world_bounding: Option<BoundingSphere>,
    pub(crate) dirty: bool,
    /// Optional name used by the owning subgraph's registry
    pub name: Option<String>,
    /// Render payload, present on nodes that can be drawn
    pub poseable: Option<Poseable>,
}

impl SceneNode {
    /// Create a new node with an identity transform.
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            flags: NodeFlags::LOCAL_DIRTY,
            local: Mat4::identity(),
            world: Mat4::identity(),
            it_world: Mat3::identity(),
            world_bounding: None,
            dirty: false,
            name: None,
            poseable: None,
        }
    }

    /// Create a named node with an identity transform.
    pub fn named(name: impl Into<String>) -> Self {
        let mut node = Self::new();
        node.name = Some(name.into());
        node
    }

    /// Builder-style helper attaching a poseable payload.
    pub fn with_poseable(mut self, poseable: Poseable) -> Self {
        self.poseable = Some(poseable);
        self
    }

    /// Parent node handle, if any.
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Read-only slice of child node handles.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Current flags.
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Set or clear a behavior flag (`EXCLUDE_FROM_BOUNDING`,
    /// `EXCLUDE_FROM_SHADOWING`, `IGNORE_PARENT`).
    pub fn set_flag(&mut self, flag: NodeFlags, value: bool) {
        self.flags.set(flag, value);
    }

    /// Local transform relative to the parent.
    pub fn local_transform(&self) -> &Mat4 {
        &self.local
    }

    /// Replace the local transform; the world transform is re-derived on the
    /// next update pass.
    pub fn set_local_transform(&mut self, local: Mat4) {
        self.local = local;
        self.flags.insert(NodeFlags::LOCAL_DIRTY);
    }

    /// Cached world transform from the last update pass.
    pub fn world_transform(&self) -> &Mat4 {
        &self.world
    }

    /// Overwrite the world transform directly; the local transform is
    /// re-derived from the parent on the next update pass.
    pub fn set_world_transform(&mut self, world: Mat4) {
        self.world = world;
        self.flags.insert(NodeFlags::WORLD_DIRTY);
    }

    /// Inverse-transpose of the world rotation, for normal transforms.
    pub fn normal_transform(&self) -> &Mat3 {
        &self.it_world
    }

    /// Aggregated world bounding sphere; `None` when the node has no
    /// boundable content.
    pub fn world_bounding(&self) -> Option<BoundingSphere> {
        self.world_bounding
    }

    /// True when this node or any descendant changed during the last update.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_new_node_starts_local_dirty() {
        let node = SceneNode::new();
        assert!(node.flags().contains(NodeFlags::LOCAL_DIRTY));
        assert!(!node.flags().contains(NodeFlags::WORLD_DIRTY));
    }

    #[test]
    fn test_setters_raise_dirty_flags() {
        let mut node = SceneNode::new();
        node.flags.remove(NodeFlags::LOCAL_DIRTY);

        node.set_local_transform(Mat4::new_translation(&Vec3::x()));
        assert!(node.flags().contains(NodeFlags::LOCAL_DIRTY));

        node.set_world_transform(Mat4::new_translation(&Vec3::y()));
        assert!(node.flags().contains(NodeFlags::WORLD_DIRTY));
    }
}
