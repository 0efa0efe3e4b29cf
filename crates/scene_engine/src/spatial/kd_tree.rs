//! Flat-array kd-tree for spatial indexing
//!
//! A space-partitioning structure storing the axis-aligned bounds of scene
//! members. The tree is stackless: all nodes are tightly packed at the front
//! of a flat array, and every slot records the index just past its own
//! subtree, so "skip this subtree" is a single index assignment and whole-tree
//! operations are a linear scan.
//!
//! The splitting heuristic is a surface-area-heuristic variant with two extra
//! weighted terms: a localization term favoring short axes and a split-count
//! term penalizing positions that force straddling members up toward the
//! root (every member must be fully contained by its slot, so a straddler
//! stays with the parent).

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::scene::bounds::{Aabb, BoundingSphere, Ray};
use crate::scene::node::NodeKey;

slotmap::new_key_type! {
    /// Stable handle to a member of a [`KdTree`]
    pub struct MemberKey;
}

/// Shallowest permitted tree depth
pub const MIN_DEPTH: usize = 0;
/// Deepest permitted tree depth
pub const MAX_DEPTH: usize = 10;
/// Minimum number of members a slot must hold before a split is considered
pub const MIN_SPLIT_COUNT: usize = 2;

/// Tolerance pushed onto split positions so box edges land strictly inside.
const EDGE_TOLERANCE: f32 = 1.0e-4;

/// Weights of the split-policy cost terms.
///
/// The policy is a constructor parameter: callers tune which pressures
/// dominate partitioning without touching the build loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KdCoefficients {
    /// Importance of reducing surface area and face count per slot
    pub intersection: f32,
    /// Importance of splitting the longest axis
    pub localization: f32,
    /// Importance of reducing the number of members straddling a split
    pub split: f32,
}

impl Default for KdCoefficients {
    fn default() -> Self {
        Self {
            intersection: 1.0,
            localization: 1.0,
            split: 1.0,
        }
    }
}

/// Shape of a member as supplied by the scene graph.
#[derive(Debug, Clone, Copy)]
pub struct MemberShape {
    /// Owning scene node
    pub node: NodeKey,
    /// World-space bounding box
    pub aabb: Aabb,
    /// Total face count of the member's content
    pub face_count: u32,
    /// Light-affinity bitmask
    pub light_mask: u64,
    /// Shadow-affinity bitmask
    pub shadow_mask: u64,
    /// Re-add this member verbatim instead of partitioning it during builds
    pub exclude_from_build: bool,
    /// Whether the member's shadow contribution changed this frame
    pub shadow_dirty: bool,
}

/// A tracked member of the tree.
#[derive(Debug, Clone)]
pub struct Member {
    /// Owning scene node
    pub node: NodeKey,
    /// World-space bounding box
    pub aabb: Aabb,
    /// Total face count of the member's content
    pub face_count: u32,
    /// Light-affinity bitmask
    pub light_mask: u64,
    /// Shadow-affinity bitmask
    pub shadow_mask: u64,
    /// Re-add this member verbatim instead of partitioning it during builds
    pub exclude_from_build: bool,
    /// Whether the member's shadow contribution changed this frame
    pub shadow_dirty: bool,
    pub(crate) slot: usize,
    pub(crate) position: usize,
}

impl Member {
    fn new(shape: &MemberShape) -> Self {
        Self {
            node: shape.node,
            aabb: shape.aabb,
            face_count: shape.face_count,
            light_mask: shape.light_mask,
            shadow_mask: shape.shadow_mask,
            exclude_from_build: shape.exclude_from_build,
            shadow_dirty: shape.shadow_dirty,
            slot: 0,
            position: 0,
        }
    }

    /// Index of the slot this member is stored in.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Position within the slot's member list.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// One slot of the flat tree.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub aabb: Aabb,
    pub members: Vec<MemberKey>,
    /// Index just past this slot's subtree; jumping here skips it entirely.
    pub sibling: usize,
    pub faces_in_subtree: u32,
}

/// Candidate split retained while sweeping edge positions.
struct SplitCandidate {
    axis: usize,
    position: f32,
    back_aabb: Aabb,
    front_aabb: Aabb,
    back_faces: i64,
    front_faces: i64,
    cost: f32,
}

/// Min/max box edge used by the sweep.
struct Edge {
    key: MemberKey,
    value: f32,
    is_min: bool,
}

/// A kd-tree over the bounding boxes of scene members.
///
/// Members are referenced through a separate object table keyed by
/// [`MemberKey`]; each record stores its `(slot, position)` coordinate as
/// plain data, so there is no ownership cycle between the tree and the scene.
/// A member lives at the shallowest slot whose box fully contains its AABB;
/// sibling boxes may overlap, so first-fit-by-depth breaks ties.
#[derive(Debug)]
pub struct KdTree {
    coeff: KdCoefficients,
    max_depth: usize,
    pub(crate) slots: Vec<Slot>,
    pub(crate) members: SlotMap<MemberKey, Member>,
}

impl KdTree {
    /// Create an empty tree with the given split policy and maximum depth.
    ///
    /// The depth is clamped to `[MIN_DEPTH, MAX_DEPTH]`. Until the first
    /// [`build`](Self::build), the tree is a single all-encompassing root
    /// slot, and queries return nothing because it holds no members.
    pub fn new(coeff: KdCoefficients, max_depth: usize) -> Self {
        Self {
            coeff,
            max_depth: max_depth.clamp(MIN_DEPTH, MAX_DEPTH),
            slots: vec![Slot {
                aabb: Aabb::max_bounds(),
                members: Vec::new(),
                sibling: 1,
                faces_in_subtree: 0,
            }],
            members: SlotMap::with_key(),
        }
    }

    /// Bounding box of the whole tree.
    pub fn root_aabb(&self) -> Aabb {
        self.slots[0].aabb
    }

    /// Total face count captured by the last build.
    pub fn root_face_count(&self) -> u32 {
        self.slots[0].faces_in_subtree
    }

    /// Number of slots in the tree.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of tracked members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Look up a member record.
    pub fn member(&self, key: MemberKey) -> Option<&Member> {
        self.members.get(key)
    }

    pub(crate) fn is_leaf(&self, slot: usize) -> bool {
        self.slots[slot].sibling == slot + 1
    }

    pub(crate) fn next(&self, slot: usize, descend: bool) -> usize {
        if descend {
            slot + 1
        } else {
            self.slots[slot].sibling
        }
    }

    /// Insert a member, returning its stable handle.
    ///
    /// The member lands at the shallowest slot whose box fully contains its
    /// AABB. A box bigger than the root's bounds falls back to the root slot
    /// so it stays trackable; a zero- or negative-volume box is permitted.
    pub fn insert(&mut self, shape: &MemberShape) -> MemberKey {
        let key = self.members.insert(Member::new(shape));
        self.place(key);
        key
    }

    /// Remove a member. The vacated list position is refilled by swapping in
    /// the slot's last member, whose coordinate is refreshed; no other
    /// member is touched.
    pub fn remove(&mut self, key: MemberKey) -> Option<Member> {
        let member = self.members.remove(key)?;
        self.detach(member.slot, member.position);
        Some(member)
    }

    /// Refresh a member's shape after its node moved or changed.
    ///
    /// While the member's current slot box still fully contains the new
    /// AABB this is a pure field update; otherwise the member is detached
    /// and re-placed from the root. Returns true when a re-placement
    /// happened.
    pub fn update(&mut self, key: MemberKey, shape: &MemberShape) -> bool {
        let Some(member) = self.members.get_mut(key) else {
            debug_assert!(false, "update of a member that is not tracked");
            return false;
        };

        member.aabb = shape.aabb;
        member.face_count = shape.face_count;
        member.light_mask = shape.light_mask;
        member.shadow_mask = shape.shadow_mask;
        member.exclude_from_build = shape.exclude_from_build;
        member.shadow_dirty = shape.shadow_dirty;

        let slot = member.slot;
        let position = member.position;
        if self.slots[slot].aabb.contains_aabb(&shape.aabb) {
            return false;
        }

        self.detach(slot, position);
        self.place(key);
        true
    }

    pub(crate) fn set_shadow_dirty(&mut self, key: MemberKey, dirty: bool) {
        if let Some(member) = self.members.get_mut(key) {
            member.shadow_dirty = dirty;
        }
    }

    /// Rebuild the tree from its current members.
    ///
    /// Members flagged `exclude_from_build` are set aside and re-added
    /// verbatim afterward; the rest drive a fresh top-down partition. Called
    /// when gross topology changes, e.g. a whole cell's transform moves.
    pub fn build(&mut self) {
        let mut build_members = Vec::new();
        let mut excluded = Vec::new();

        for slot in &mut self.slots {
            for key in slot.members.drain(..) {
                if self.members[key].exclude_from_build {
                    excluded.push(key);
                } else {
                    build_members.push(key);
                }
            }
        }

        let mut root_aabb = Aabb::inverted();
        let mut total_faces: i64 = 0;
        for &key in &build_members {
            let member = &self.members[key];
            root_aabb = root_aabb.merged(&member.aabb);
            total_faces += i64::from(member.face_count);
        }
        if build_members.is_empty() {
            root_aabb = Aabb::max_bounds();
        }

        self.slots.clear();
        self.slots.push(Slot {
            aabb: root_aabb,
            members: Vec::new(),
            sibling: usize::MAX,
            faces_in_subtree: clamp_faces(total_faces),
        });

        self.split(0, 1, build_members, total_faces);

        log::debug!(
            "kd-tree rebuilt: {} slots, {} members, {} faces",
            self.slots.len(),
            self.members.len(),
            self.slots[0].faces_in_subtree
        );

        for key in excluded {
            self.place(key);
        }
    }

    /// Collect the nodes of members whose boxes contain `point`.
    pub fn query_point(&self, point: crate::foundation::math::Vec3, out: &mut Vec<NodeKey>) {
        let mut i = 0;
        while i < self.slots.len() {
            let hit = self.slots[i].aabb.contains_point(point);
            if hit {
                for &key in &self.slots[i].members {
                    let member = &self.members[key];
                    if member.aabb.contains_point(point) {
                        out.push(member.node);
                    }
                }
            }
            i = self.next(i, hit);
        }
    }

    /// Collect the nodes of members whose boxes overlap `sphere`.
    pub fn query_sphere(&self, sphere: &BoundingSphere, out: &mut Vec<NodeKey>) {
        let mut i = 0;
        while i < self.slots.len() {
            let hit = sphere.intersects_aabb(&self.slots[i].aabb);
            if hit {
                for &key in &self.slots[i].members {
                    let member = &self.members[key];
                    if sphere.intersects_aabb(&member.aabb) {
                        out.push(member.node);
                    }
                }
            }
            i = self.next(i, hit);
        }
    }

    /// Collect the nodes of members whose boxes overlap `aabb`.
    pub fn query_aabb(&self, aabb: &Aabb, out: &mut Vec<NodeKey>) {
        let mut i = 0;
        while i < self.slots.len() {
            let hit = self.slots[i].aabb.intersects(aabb);
            if hit {
                for &key in &self.slots[i].members {
                    let member = &self.members[key];
                    if member.aabb.intersects(aabb) {
                        out.push(member.node);
                    }
                }
            }
            i = self.next(i, hit);
        }
    }

    /// Collect the nodes of members whose boxes are crossed by `ray`.
    pub fn query_ray(&self, ray: &Ray, out: &mut Vec<NodeKey>) {
        let mut i = 0;
        while i < self.slots.len() {
            let hit = self.slots[i].aabb.intersect_ray(ray).is_some();
            if hit {
                for &key in &self.slots[i].members {
                    let member = &self.members[key];
                    if member.aabb.intersect_ray(ray).is_some() {
                        out.push(member.node);
                    }
                }
            }
            i = self.next(i, hit);
        }
    }

    /// Walk from the root looking for the shallowest containing slot.
    fn place(&mut self, key: MemberKey) {
        let aabb = self.members[key].aabb;

        // Starting at the root matters: a box bigger than the whole tree
        // still needs a home, and the root is the fallback.
        let mut insert_index = 0;
        let mut i = 0;
        while i < self.slots.len() {
            let contains = self.slots[i].aabb.contains_aabb(&aabb);
            if contains {
                insert_index = i;
                if self.is_leaf(i) {
                    break;
                }
            }
            i = self.next(i, contains);
        }

        let position = self.slots[insert_index].members.len();
        self.slots[insert_index].members.push(key);
        let member = &mut self.members[key];
        member.slot = insert_index;
        member.position = position;
    }

    fn detach(&mut self, slot: usize, position: usize) {
        self.slots[slot].members.swap_remove(position);
        if let Some(&moved) = self.slots[slot].members.get(position) {
            self.members[moved].position = position;
        }
    }

    fn assign_members(&mut self, slot: usize, keys: Vec<MemberKey>) {
        for (position, &key) in keys.iter().enumerate() {
            let member = &mut self.members[key];
            member.slot = slot;
            member.position = position;
        }
        self.slots[slot].members = keys;
    }

    fn split_cost(
        &self,
        parent_inv_sa: f32,
        back: &Aabb,
        front: &Aabb,
        back_faces: i64,
        front_faces: i64,
        split_count: i64,
        axis: usize,
    ) -> f32 {
        let back_sa = back.surface_area();
        let front_sa = front.surface_area();

        let axis_length = front.max[axis] - back.min[axis];
        let axis_cost = if axis_length > EDGE_TOLERANCE {
            1.0 / axis_length
        } else {
            1.0
        };

        self.coeff.localization * axis_cost
            + self.coeff.split * split_count as f32
            + self.coeff.intersection
                * parent_inv_sa
                * (back_sa * back_faces as f32 + front_sa * front_faces as f32)
    }

    /// Recursively partition `objects` under `parent`, creating back/front
    /// child slots whenever a split position beats keeping the slot whole.
    /// Members straddling the chosen plane stay with the parent.
    fn split(&mut self, parent: usize, depth: usize, objects: Vec<MemberKey>, parent_faces: i64) {
        if depth >= self.max_depth || objects.len() < MIN_SPLIT_COUNT {
            self.assign_members(parent, objects);
            self.slots[parent].sibling = self.slots.len();
            return;
        }

        let parent_aabb = self.slots[parent].aabb;
        let parent_sa = parent_aabb.surface_area();
        let parent_inv_sa = if parent_sa > EDGE_TOLERANCE {
            1.0 / parent_sa
        } else {
            1.0
        };
        let parent_cost = self.coeff.intersection * parent_faces as f32;

        let mut best: Option<SplitCandidate> = None;

        for axis in 0..3 {
            let mut edges = Vec::with_capacity(objects.len() * 2);
            for &key in &objects {
                let aabb = self.members[key].aabb;
                edges.push(Edge { key, value: aabb.min[axis], is_min: true });
                edges.push(Edge { key, value: aabb.max[axis], is_min: false });
            }

            // Sweep-and-prune ordering: min edges sort before max edges at
            // equal coordinates so a box is "entered" before it is "left".
            edges.sort_by(|a, b| {
                a.value
                    .partial_cmp(&b.value)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| match (a.is_min, b.is_min) {
                        (true, false) => std::cmp::Ordering::Less,
                        (false, true) => std::cmp::Ordering::Greater,
                        _ => std::cmp::Ordering::Equal,
                    })
            });

            let mut back_faces: i64 = 0;
            let mut front_faces: i64 = parent_faces;
            let mut split_count: i64 = 0;
            let mut back_aabb = parent_aabb;
            let mut front_aabb = parent_aabb;

            for edge in &edges {
                let faces = i64::from(self.members[edge.key].face_count);

                // A max edge means the box is fully behind this position: its
                // faces stop straddling and join the back side.
                if !edge.is_min {
                    split_count = (split_count - faces).clamp(0, parent_faces);
                    back_faces = (back_faces + faces).clamp(0, parent_faces);
                }

                let position = if edge.is_min {
                    edge.value - EDGE_TOLERANCE
                } else {
                    edge.value + EDGE_TOLERANCE
                };
                back_aabb.max[axis] = position;
                front_aabb.min[axis] = position;

                let cost = self.split_cost(
                    parent_inv_sa,
                    &back_aabb,
                    &front_aabb,
                    back_faces,
                    front_faces,
                    split_count,
                    axis,
                );

                if best.as_ref().map_or(true, |b| cost < b.cost) {
                    best = Some(SplitCandidate {
                        axis,
                        position,
                        back_aabb,
                        front_aabb,
                        back_faces,
                        front_faces,
                        cost,
                    });
                }

                // A min edge means the box starts straddling from here on,
                // and its faces are no longer guaranteed to the front side.
                if edge.is_min {
                    split_count += faces;
                    front_faces = (front_faces - faces).clamp(0, parent_faces);
                }
            }
        }

        let candidate = match best {
            Some(candidate) if candidate.cost < parent_cost => candidate,
            _ => {
                self.assign_members(parent, objects);
                self.slots[parent].sibling = self.slots.len();
                return;
            }
        };

        let mut back_objects = Vec::new();
        let mut front_objects = Vec::new();
        let mut straddling = Vec::new();
        for key in objects {
            let aabb = self.members[key].aabb;
            if aabb.max[candidate.axis] <= candidate.position {
                back_objects.push(key);
            } else if aabb.min[candidate.axis] >= candidate.position {
                front_objects.push(key);
            } else {
                straddling.push(key);
            }
        }

        self.assign_members(parent, straddling);

        let back = self.slots.len();
        self.slots.push(Slot {
            aabb: candidate.back_aabb,
            members: Vec::new(),
            sibling: usize::MAX,
            faces_in_subtree: clamp_faces(candidate.back_faces),
        });
        self.split(back, depth + 1, back_objects, candidate.back_faces);

        let front = self.slots.len();
        self.slots.push(Slot {
            aabb: candidate.front_aabb,
            members: Vec::new(),
            sibling: usize::MAX,
            faces_in_subtree: clamp_faces(candidate.front_faces),
        });
        self.split(front, depth + 1, front_objects, candidate.front_faces);

        self.slots[parent].sibling = self.slots.len();
    }
}

fn clamp_faces(faces: i64) -> u32 {
    faces.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn shape(aabb: Aabb, faces: u32) -> MemberShape {
        MemberShape {
            node: NodeKey::default(),
            aabb,
            face_count: faces,
            light_mask: 1,
            shadow_mask: 1,
            exclude_from_build: false,
            shadow_dirty: false,
        }
    }

    fn box_at(center: Vec3) -> Aabb {
        Aabb::from_center_extents(center, Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_query_before_build_returns_nothing() {
        let tree = KdTree::new(KdCoefficients::default(), 4);
        let mut out = Vec::new();
        tree.query_point(Vec3::zeros(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_build_subdivides_clustered_members() {
        let mut tree = KdTree::new(KdCoefficients::default(), 6);
        for i in 0..4 {
            tree.insert(&shape(box_at(Vec3::new(-40.0 + i as f32 * 4.0, 0.0, 0.0)), 100));
            tree.insert(&shape(box_at(Vec3::new(40.0 + i as f32 * 4.0, 0.0, 0.0)), 100));
        }
        tree.build();

        assert!(tree.slot_count() > 1, "two clusters should force a split");
        assert_eq!(tree.root_face_count(), 800);
    }

    #[test]
    fn test_build_containment_invariant() {
        let mut tree = KdTree::new(KdCoefficients::default(), 6);
        let mut keys = Vec::new();
        for i in 0..8 {
            for j in 0..2 {
                let center = Vec3::new(i as f32 * 10.0, j as f32 * 25.0, 0.0);
                keys.push(tree.insert(&shape(box_at(center), 10 + i)));
            }
        }
        tree.build();

        for key in keys {
            let member = tree.member(key).unwrap();
            assert!(
                tree.slots[member.slot()].aabb.contains_aabb(&member.aabb),
                "member stored in a slot that does not contain it"
            );
            assert_eq!(tree.slots[member.slot()].members[member.position()], key);
        }
    }

    #[test]
    fn test_oversized_member_falls_back_to_root() {
        let mut tree = KdTree::new(KdCoefficients::default(), 6);
        for i in 0..6 {
            tree.insert(&shape(box_at(Vec3::new(i as f32 * 10.0, 0.0, 0.0)), 50));
        }
        tree.build();

        let huge = tree.insert(&shape(
            Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0e6)),
            10,
        ));
        assert_eq!(tree.member(huge).unwrap().slot(), 0);
    }

    #[test]
    fn test_remove_refreshes_swapped_member() {
        let mut tree = KdTree::new(KdCoefficients::default(), 0);
        let a = tree.insert(&shape(box_at(Vec3::zeros()), 1));
        let b = tree.insert(&shape(box_at(Vec3::new(3.0, 0.0, 0.0)), 1));
        let c = tree.insert(&shape(box_at(Vec3::new(6.0, 0.0, 0.0)), 1));

        assert!(tree.remove(a).is_some());
        assert!(tree.member(a).is_none());

        // Remaining members keep valid, distinct, in-range coordinates.
        for key in [b, c] {
            let member = tree.member(key).unwrap();
            assert_eq!(tree.slots[member.slot()].members[member.position()], key);
        }
        let (mb, mc) = (tree.member(b).unwrap(), tree.member(c).unwrap());
        assert_ne!((mb.slot(), mb.position()), (mc.slot(), mc.position()));
        assert_eq!(tree.member_count(), 2);
    }

    #[test]
    fn test_update_in_place_keeps_slot() {
        let mut tree = KdTree::new(KdCoefficients::default(), 6);
        let mut keys = Vec::new();
        for i in 0..4 {
            keys.push(tree.insert(&shape(box_at(Vec3::new(-40.0 + i as f32 * 4.0, 0.0, 0.0)), 100)));
            keys.push(tree.insert(&shape(box_at(Vec3::new(40.0 + i as f32 * 4.0, 0.0, 0.0)), 100)));
        }
        tree.build();

        let key = keys[0];
        let member = tree.member(key).unwrap().clone();
        let slot_box = tree.slots[member.slot()].aabb;

        // Shrink the member slightly: still fits its slot, no relocation.
        let nudged = Aabb::new(member.aabb.min, member.aabb.max - Vec3::repeat(0.01));
        assert!(slot_box.contains_aabb(&nudged));
        let mut nudge = shape(nudged, 100);
        nudge.node = member.node;
        assert!(!tree.update(key, &nudge));

        // Move it outside the slot: exactly one remove + add.
        let mut moved = shape(box_at(Vec3::new(0.0, 50.0, 0.0)), 100);
        moved.node = member.node;
        assert!(tree.update(key, &moved));
        let relocated = tree.member(key).unwrap();
        assert!(tree.slots[relocated.slot()].aabb.contains_aabb(&relocated.aabb));
    }

    #[test]
    fn test_excluded_members_survive_build() {
        let mut tree = KdTree::new(KdCoefficients::default(), 6);
        for i in 0..6 {
            tree.insert(&shape(box_at(Vec3::new(i as f32 * 10.0, 0.0, 0.0)), 50));
        }
        let mut excluded_shape = shape(box_at(Vec3::new(0.0, 90.0, 0.0)), 5);
        excluded_shape.exclude_from_build = true;
        let excluded = tree.insert(&excluded_shape);

        tree.build();

        // Still tracked, but its box did not widen the partitioned bounds.
        assert!(tree.member(excluded).is_some());
        assert!(tree.root_aabb().max.y < 50.0);
    }

    #[test]
    fn test_query_aabb_filters_members() {
        let mut tree = KdTree::new(KdCoefficients::default(), 6);
        for i in 0..6 {
            tree.insert(&shape(box_at(Vec3::new(i as f32 * 10.0, 0.0, 0.0)), 50));
        }
        tree.build();

        let mut out = Vec::new();
        tree.query_aabb(
            &Aabb::new(Vec3::new(-2.0, -2.0, -2.0), Vec3::new(12.0, 2.0, 2.0)),
            &mut out,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_query_ray_walks_tree() {
        let mut tree = KdTree::new(KdCoefficients::default(), 6);
        for i in 0..6 {
            tree.insert(&shape(box_at(Vec3::new(i as f32 * 10.0, 0.0, 0.0)), 50));
        }
        tree.build();

        let mut out = Vec::new();
        tree.query_ray(&Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::x()), &mut out);
        assert_eq!(out.len(), 6);

        out.clear();
        tree.query_ray(&Ray::new(Vec3::new(-10.0, 30.0, 0.0), Vec3::x()), &mut out);
        assert!(out.is_empty());
    }
}
