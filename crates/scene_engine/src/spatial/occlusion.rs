//! Occlusion-culled spatial index
//!
//! Wraps the kd-tree with per-slot hardware occlusion queries. Once per
//! frame, every internal slot whose subtree is heavy enough gets (or reuses)
//! a query covering its bounding box; the verdict of the *previous completed*
//! query gates whether this frame's pose traversals skip that slot's subtree.
//! The staleness is deliberate, and the bias is always toward false-visible:
//! a slot straddling the near plane is forced visible and its result
//! discarded, and a slot that cannot get a query object is never culled.
//!
//! Hardware occlusion queries are not safe to issue from a background
//! thread; ticking and building must happen on the render thread.

use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{OcclusionQueryBackend, QueryId};
use crate::scene::bounds::{planes_intersect_aabb, Aabb, BoundingSphere, PlaneSide, Ray};
use crate::scene::light::Light;
use crate::scene::node::NodeKey;
use crate::scene::view::ViewState;
use crate::spatial::kd_tree::{KdCoefficients, KdTree, Member, MemberKey, MemberShape};

/// Fewer visible pixels than this means a slot is occluded
pub const DEFAULT_MIN_VISIBLE_PIXELS: u32 = 1;

/// Fraction of the root's face count a subtree must carry to earn a query
pub const DEFAULT_QUERY_FRACTION: f32 = 0.05;

/// Which pose a lighting traversal is requesting for a member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPoseKind {
    /// The member should contribute to the light's shadow map
    Shadow,
    /// The member should be drawn lit by the light
    Lit,
}

#[derive(Debug, Clone)]
struct QueryEntry {
    query: Option<QueryId>,
    last_tick: u64,
    last_occluded: bool,
    needs_issue: bool,
}

impl Default for QueryEntry {
    fn default() -> Self {
        Self {
            query: None,
            last_tick: 0,
            last_occluded: false,
            needs_issue: true,
        }
    }
}

/// Spatial index with per-slot hardware occlusion culling.
pub struct OcclusionIndex {
    tree: KdTree,
    entries: Vec<QueryEntry>,
    proxies: Vec<Mat4>,
    query_fraction: f32,
    min_visible_pixels: u32,
    queries_issued: usize,
}

impl OcclusionIndex {
    /// Create an index with the given split policy, depth, and thresholds.
    pub fn new(
        coeff: KdCoefficients,
        max_depth: usize,
        query_fraction: f32,
        min_visible_pixels: u32,
    ) -> Self {
        let tree = KdTree::new(coeff, max_depth);
        let slots = tree.slot_count();
        Self {
            tree,
            entries: vec![QueryEntry::default(); slots],
            proxies: vec![Mat4::identity(); slots],
            query_fraction,
            min_visible_pixels,
            queries_issued: 0,
        }
    }

    /// Bounding box of the whole index.
    pub fn root_aabb(&self) -> Aabb {
        self.tree.root_aabb()
    }

    /// Number of tracked members.
    pub fn member_count(&self) -> usize {
        self.tree.member_count()
    }

    /// Look up a member record.
    pub fn member(&self, key: MemberKey) -> Option<&Member> {
        self.tree.member(key)
    }

    /// Number of hardware queries issued by the last [`tick`](Self::tick).
    pub fn queries_issued(&self) -> usize {
        self.queries_issued
    }

    /// Insert a member. See [`KdTree::insert`].
    pub fn insert(&mut self, shape: &MemberShape) -> MemberKey {
        self.tree.insert(shape)
    }

    /// Remove a member. See [`KdTree::remove`].
    pub fn remove(&mut self, key: MemberKey) -> Option<Member> {
        self.tree.remove(key)
    }

    /// Refresh a member's shape, relocating it only when it outgrew its
    /// slot. See [`KdTree::update`].
    pub fn update(&mut self, key: MemberKey, shape: &MemberShape) -> bool {
        self.tree.update(key, shape)
    }

    /// Mark a member's shadow contribution as up to date; called by the
    /// update pass for members that did not change this frame.
    pub fn set_member_shadow_clean(&mut self, key: MemberKey) {
        self.tree.set_shadow_dirty(key, false);
    }

    /// Rebuild the partition from current members and refresh query state.
    ///
    /// Query entries for surviving slot indices keep their verdicts (one
    /// more frame of approximation); queries for slots that no longer exist
    /// are returned to the backend.
    pub fn build(&mut self, backend: &mut dyn OcclusionQueryBackend) {
        self.tree.build();

        let slots = self.tree.slot_count();
        for entry in self.entries.iter_mut().skip(slots) {
            if let Some(query) = entry.query.take() {
                backend.destroy_query(query);
            }
        }
        self.entries.resize(slots, QueryEntry::default());

        self.proxies.clear();
        self.proxies
            .extend(self.tree.slots.iter().map(|slot| proxy_transform(&slot.aabb)));
    }

    /// Return every live query object to the backend.
    ///
    /// Called when the index's owner unloads; verdicts reset to visible.
    pub fn release_queries(&mut self, backend: &mut dyn OcclusionQueryBackend) {
        for entry in &mut self.entries {
            if let Some(query) = entry.query.take() {
                backend.destroy_query(query);
            }
            *entry = QueryEntry::default();
        }
    }

    /// Collect the nodes of members containing `point`.
    pub fn query_point(&self, point: Vec3, out: &mut Vec<NodeKey>) {
        self.tree.query_point(point, out);
    }

    /// Collect the nodes of members overlapping `sphere`.
    pub fn query_sphere(&self, sphere: &BoundingSphere, out: &mut Vec<NodeKey>) {
        self.tree.query_sphere(sphere, out);
    }

    /// Collect the nodes of members overlapping `aabb`.
    pub fn query_aabb(&self, aabb: &Aabb, out: &mut Vec<NodeKey>) {
        self.tree.query_aabb(aabb, out);
    }

    /// Collect the nodes of members crossed by `ray`.
    pub fn query_ray(&self, ray: &Ray, out: &mut Vec<NodeKey>) {
        self.tree.query_ray(ray, out);
    }

    fn is_occluded(&self, slot: usize) -> bool {
        let entry = &self.entries[slot];
        entry.query.is_some() && entry.last_occluded
    }

    /// Visit every member visible in the active view frustum.
    ///
    /// Subtrees that are frustum-disjoint or occlusion-culled are skipped
    /// wholesale via the slot skip-index; surviving members are individually
    /// frustum-tested before the sink fires.
    pub fn frustum_pose(&self, view: &ViewState, mut sink: impl FnMut(MemberKey, &Member)) {
        let mut i = 0;
        while i < self.tree.slots.len() {
            let slot = &self.tree.slots[i];
            let enter = view.frustum.intersects_aabb(&slot.aabb) && !self.is_occluded(i);
            if enter {
                for &key in &slot.members {
                    let member = &self.tree.members[key];
                    if view.frustum.intersects_aabb(&member.aabb) {
                        sink(key, member);
                    }
                }
            }
            i = self.tree.next(i, enter);
        }
    }

    /// Visit every member affected by `light`.
    ///
    /// For shadow-casting lights the traversal follows the shadow volume:
    /// occluded geometry still casts shadows, so occlusion only gates the
    /// `Lit` callback, never the `Shadow` one. Members are filtered by
    /// affinity-mask intersection before any bounding test of their own.
    /// Returns true when any member in the shadow volume has an out-of-date
    /// shadow contribution.
    pub fn lighting_pose(
        &self,
        light: &Light,
        mut sink: impl FnMut(LightPoseKind, MemberKey, &Member),
    ) -> bool {
        let mut shadows_stale = false;

        if light.casts_shadow {
            let mut i = 0;
            while i < self.tree.slots.len() {
                let slot = &self.tree.slots[i];
                let enter = planes_intersect_aabb(&light.shadow_planes, &slot.aabb);
                let occluded = self.is_occluded(i);
                if enter {
                    for &key in &slot.members {
                        let member = &self.tree.members[key];
                        if member.shadow_mask & light.shadow_mask == 0 {
                            continue;
                        }
                        if !planes_intersect_aabb(&light.shadow_planes, &member.aabb) {
                            continue;
                        }

                        shadows_stale = shadows_stale || member.shadow_dirty;
                        if light.shadows_dirty {
                            sink(LightPoseKind::Shadow, key, member);
                        }

                        if !occluded
                            && member.light_mask & light.light_mask != 0
                            && planes_intersect_aabb(&light.light_planes, &member.aabb)
                        {
                            sink(LightPoseKind::Lit, key, member);
                        }
                    }
                }
                i = self.tree.next(i, enter);
            }
        } else {
            let mut i = 0;
            while i < self.tree.slots.len() {
                let slot = &self.tree.slots[i];
                let enter = planes_intersect_aabb(&light.light_planes, &slot.aabb)
                    && !self.is_occluded(i);
                if enter {
                    for &key in &slot.members {
                        let member = &self.tree.members[key];
                        if member.light_mask & light.light_mask == 0 {
                            continue;
                        }
                        if light.bounds.intersects_aabb(&member.aabb)
                            && planes_intersect_aabb(&light.light_planes, &member.aabb)
                        {
                            sink(LightPoseKind::Lit, key, member);
                        }
                    }
                }
                i = self.tree.next(i, enter);
            }
        }

        shadows_stale
    }

    /// Visit every member whose box is crossed by `ray`.
    pub fn pick(&self, ray: &Ray, mut sink: impl FnMut(MemberKey, &Member)) {
        let mut i = 0;
        while i < self.tree.slots.len() {
            let slot = &self.tree.slots[i];
            let enter = slot.aabb.intersect_ray(ray).is_some();
            if enter {
                for &key in &slot.members {
                    let member = &self.tree.members[key];
                    if member.aabb.intersect_ray(ray).is_some() {
                        sink(key, member);
                    }
                }
            }
            i = self.tree.next(i, enter);
        }
    }

    /// Advance occlusion queries for this frame.
    ///
    /// Issues (or re-issues) a query for every slot heavy enough to be worth
    /// testing, consumes results completed since the last issue, and
    /// releases query objects for subtrees that fell below the threshold.
    /// The verdict recorded here is consulted by next frame's traversals.
    pub fn tick(&mut self, view: &ViewState, backend: &mut dyn OcclusionQueryBackend) {
        self.queries_issued = 0;

        debug_assert_eq!(
            self.entries.len(),
            self.tree.slots.len(),
            "query entries out of sync with slots; was build() skipped?"
        );

        let threshold = self.tree.slots[0].faces_in_subtree as f32 * self.query_fraction;

        for i in 0..self.tree.slots.len() {
            let faces = self.tree.slots[i].faces_in_subtree as f32;

            if threshold < faces {
                let slot_aabb = self.tree.slots[i].aabb;
                let entry = &mut self.entries[i];

                if entry.query.is_none() {
                    entry.query = backend.create_query();
                    if entry.query.is_none() {
                        // Query budget exhausted: this slot degrades to
                        // always-visible rather than failing.
                        entry.last_occluded = false;
                        continue;
                    }
                    entry.needs_issue = true;
                }

                debug_assert_ne!(entry.last_tick, view.tick, "tick ran twice this frame");
                entry.last_tick = view.tick;

                if view.frustum.near_plane().classify_aabb(&slot_aabb) == PlaneSide::Intersecting {
                    // Queries against near-straddling volumes are unreliable:
                    // force visible and throw the in-flight result away.
                    entry.needs_issue = true;
                    entry.last_occluded = false;
                } else if let Some(query) = entry.query {
                    if backend.is_complete(query) && !entry.needs_issue {
                        entry.needs_issue = true;
                        entry.last_occluded =
                            backend.visible_pixels(query) < self.min_visible_pixels;
                    }

                    if entry.needs_issue && view.frustum.intersects_aabb(&slot_aabb) {
                        backend.issue_query(query, &self.proxies[i]);
                        self.queries_issued += 1;
                        entry.needs_issue = false;
                    }
                }
            } else if let Some(query) = self.entries[i].query.take() {
                // Subtree no longer worth querying; return the object.
                backend.destroy_query(query);
                self.entries[i].last_occluded = false;
            }
        }

        log::trace!("occlusion tick issued {} queries", self.queries_issued);
    }
}

/// World transform rendering a unit box over a slot's bounds.
fn proxy_transform(aabb: &Aabb) -> Mat4 {
    Mat4::new_translation(&aabb.center()) * Mat4::new_nonuniform_scaling(&aabb.half_extents())
}
