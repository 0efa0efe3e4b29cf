//! Cells: independently loaded regions of the world
//!
//! A cell owns one scene subgraph and one occlusion-culled spatial index,
//! plus its own content load state. Cells update and pose at most once per
//! frame tick, so a cell reachable through several portals does the work
//! once; a cell whose content has not finished loading simply contributes
//! nothing this frame and retries on the next.

use std::sync::Arc;

use crate::assets::{empty_slot, ContentId, ContentProvider, LoadSlot, Subgraph, SubgraphSlot};
use crate::config::EngineTuning;
use crate::foundation::math::{about_equal, invert_transform, Mat4, Vec3};
use crate::render::backend::OcclusionQueryBackend;
use crate::scene::bounds::{Aabb, BoundingSphere, Ray};
use crate::scene::graph::{NoObserver, SceneGraph, UpdateObserver};
use crate::scene::light::Light;
use crate::scene::node::{NodeKey, SceneNode};
use crate::scene::registry::NameRegistry;
use crate::scene::view::ViewState;
use crate::spatial::{LightPoseKind, Member, MemberKey, OcclusionIndex};

/// An axis-aligned region of the world with its own subgraph and index.
pub struct Cell {
    content: ContentId,
    tuning: EngineTuning,
    state: Option<Subgraph>,
    index: Option<OcclusionIndex>,
    cell_to_world: Mat4,
    inverse_cell_to_world: Mat4,
    world_bounding: Aabb,
    loading: bool,
    inbox: SubgraphSlot,
    last_update_tick: u64,
    last_pose_tick: u64,
    last_pick_tick: u64,
}

impl Cell {
    /// Create an unloaded cell for `content`.
    pub fn new(content: ContentId, tuning: &EngineTuning) -> Self {
        Self {
            content,
            tuning: tuning.clone(),
            state: None,
            index: None,
            cell_to_world: Mat4::identity(),
            inverse_cell_to_world: Mat4::identity(),
            world_bounding: Aabb::inverted(),
            loading: false,
            inbox: empty_slot(),
            last_update_tick: 0,
            last_pose_tick: 0,
            last_pick_tick: 0,
        }
    }

    /// The content identifier this cell loads.
    pub fn content(&self) -> &ContentId {
        &self.content
    }

    /// True once content is installed and spatially integrated.
    pub fn is_loaded(&self) -> bool {
        self.state.is_some() && self.index.is_some()
    }

    /// Root node of the installed subgraph, if loaded.
    pub fn root(&self) -> Option<NodeKey> {
        self.state.as_ref().map(|s| s.root)
    }

    /// The installed scene graph, if loaded.
    pub fn graph(&self) -> Option<&SceneGraph> {
        self.state.as_ref().map(|s| &s.graph)
    }

    /// Mutable access to the installed scene graph, if loaded.
    pub fn graph_mut(&mut self) -> Option<&mut SceneGraph> {
        self.state.as_mut().map(|s| &mut s.graph)
    }

    /// Names registered by this cell's content, if loaded.
    pub fn names(&self) -> Option<&NameRegistry> {
        self.state.as_ref().map(|s| &s.names)
    }

    /// The installed spatial index, if loaded.
    pub fn index(&self) -> Option<&OcclusionIndex> {
        self.index.as_ref()
    }

    /// Cell-to-world transform.
    pub fn cell_to_world(&self) -> &Mat4 {
        &self.cell_to_world
    }

    /// World-to-cell transform.
    pub fn inverse_cell_to_world(&self) -> &Mat4 {
        &self.inverse_cell_to_world
    }

    /// World bounds of the cell's content as of the last index build.
    pub fn world_bounding(&self) -> Aabb {
        self.world_bounding
    }

    /// Destroy a node and its subtree, clearing index membership.
    pub fn remove_node(&mut self, node: NodeKey) {
        if let Some(state) = &mut self.state {
            state.graph.remove_subtree(node, self.index.as_mut());
        }
    }

    /// Drop the cell's content and index, returning query objects.
    pub fn unload(&mut self, backend: &mut dyn OcclusionQueryBackend) {
        if let Some(index) = &mut self.index {
            index.release_queries(backend);
        }
        if self.state.take().is_some() {
            log::info!("cell '{}' unloaded", self.content);
        }
        self.index = None;
        self.loading = false;
        self.inbox = empty_slot();
        self.world_bounding = Aabb::inverted();
    }

    /// Advance the cell for this frame: poll loading, settle transforms,
    /// reconcile index membership, and tick occlusion queries.
    ///
    /// Runs at most once per frame tick. A change of `cell_to_world` forces
    /// a world re-derive of the whole subtree and a full index rebuild.
    pub fn update(
        &mut self,
        cell_to_world: &Mat4,
        view: &ViewState,
        provider: &mut dyn ContentProvider,
        backend: &mut dyn OcclusionQueryBackend,
        observer: &mut dyn UpdateObserver,
    ) {
        if self.last_update_tick == view.tick {
            return;
        }
        self.last_update_tick = view.tick;

        let moved = !about_equal(&self.cell_to_world, cell_to_world);
        if moved {
            self.cell_to_world = *cell_to_world;
            self.inverse_cell_to_world = invert_transform(cell_to_world);
        }

        self.poll_content(provider, backend);

        if let (Some(state), Some(index)) = (&mut self.state, &mut self.index) {
            state
                .graph
                .update(state.root, &self.cell_to_world, moved, Some(index), observer);
        }

        if let Some(index) = &mut self.index {
            if moved {
                index.build(backend);
                self.world_bounding = index.root_aabb();
            }
            index.tick(view, backend);
        }
    }

    /// Visit every member visible in the frame's frustum, at most once per
    /// frame tick per cell and per node. The sink receives the member record
    /// and its scene node, so it can submit straight into the batch trees.
    pub fn frustum_pose(
        &mut self,
        view: &ViewState,
        mut sink: impl FnMut(MemberKey, &Member, &SceneNode),
    ) {
        if self.last_pose_tick == view.tick {
            return;
        }
        self.last_pose_tick = view.tick;

        let (Some(state), Some(index)) = (&mut self.state, &self.index) else {
            return;
        };

        let graph = &mut state.graph;
        index.frustum_pose(view, |key, member| {
            if !mark_posed(graph, member.node, view.tick) {
                return;
            }
            if let Some(node) = graph.get(member.node) {
                sink(key, member, node);
            }
        });
    }

    /// Visit every member affected by `light`. Returns true when a member in
    /// the shadow volume has an out-of-date shadow contribution.
    pub fn lighting_pose(
        &self,
        light: &Light,
        mut sink: impl FnMut(LightPoseKind, MemberKey, &Member, &SceneNode),
    ) -> bool {
        let (Some(state), Some(index)) = (&self.state, &self.index) else {
            return false;
        };

        let graph = &state.graph;
        index.lighting_pose(light, |kind, key, member| {
            if let Some(node) = graph.get(member.node) {
                sink(kind, key, member, node);
            }
        })
    }

    /// Visit every member crossed by a world-space ray, at most once per
    /// frame tick.
    pub fn pick(
        &mut self,
        view: &ViewState,
        ray: &Ray,
        mut sink: impl FnMut(MemberKey, &Member, &SceneNode),
    ) {
        if self.last_pick_tick == view.tick {
            return;
        }
        self.last_pick_tick = view.tick;

        let (Some(state), Some(index)) = (&self.state, &self.index) else {
            return;
        };

        let graph = &state.graph;
        index.pick(ray, |key, member| {
            if let Some(node) = graph.get(member.node) {
                sink(key, member, node);
            }
        });
    }

    /// Collect the nodes of members containing `point`. An unloaded cell
    /// returns nothing.
    pub fn query_point(&self, point: Vec3, out: &mut Vec<NodeKey>) {
        if let Some(index) = &self.index {
            index.query_point(point, out);
        }
    }

    /// Collect the nodes of members overlapping `sphere`. An unloaded cell
    /// returns nothing.
    pub fn query_sphere(&self, sphere: &BoundingSphere, out: &mut Vec<NodeKey>) {
        if let Some(index) = &self.index {
            index.query_sphere(sphere, out);
        }
    }

    /// Poll the provider while unloaded; install delivered content.
    fn poll_content(&mut self, provider: &mut dyn ContentProvider, backend: &mut dyn OcclusionQueryBackend) {
        if self.state.is_some() {
            return;
        }

        if !self.loading {
            self.loading = true;
            log::debug!("cell '{}' load requested", self.content);
        }
        // Requests are idempotent, so a still-loading cell just asks again.
        provider.request(&self.content, Arc::clone(&self.inbox));

        // The lock is the visibility gate for a root installed by a
        // provider's worker thread.
        let delivered = {
            let mut slot = self.inbox.lock().unwrap();
            std::mem::take(&mut *slot)
        };

        match delivered {
            LoadSlot::Pending => {}
            LoadSlot::Ready(subgraph) => {
                self.install(subgraph, backend);
                self.loading = false;
            }
            LoadSlot::Failed(error) => {
                log::error!("cell '{}' failed to load: {error}", self.content);
                self.loading = false;
            }
        }
    }

    /// First integration of freshly loaded content.
    ///
    /// Must run on the calling (render) thread: the initial index build
    /// allocates occlusion queries, which are not thread-safe.
    fn install(&mut self, mut subgraph: Subgraph, backend: &mut dyn OcclusionQueryBackend) {
        let mut index = OcclusionIndex::new(
            self.tuning.kd_coefficients,
            self.tuning.kd_depth,
            self.tuning.occlusion_query_fraction,
            self.tuning.min_visible_pixels,
        );

        subgraph.graph.update(
            subgraph.root,
            &self.cell_to_world,
            true,
            Some(&mut index),
            &mut NoObserver,
        );
        index.build(backend);
        self.world_bounding = index.root_aabb();

        log::info!(
            "cell '{}' installed: {} nodes, {} members",
            self.content,
            subgraph.graph.len(),
            index.member_count()
        );

        self.state = Some(subgraph);
        self.index = Some(index);
    }
}

/// Record that a node posed this tick; false when it already did.
fn mark_posed(graph: &mut SceneGraph, node: NodeKey, tick: u64) -> bool {
    let Some(poseable) = graph.get_mut(node).and_then(|n| n.poseable.as_mut()) else {
        return true;
    };
    if poseable.last_pose_tick == tick {
        return false;
    }
    poseable.last_pose_tick = tick;
    true
}
