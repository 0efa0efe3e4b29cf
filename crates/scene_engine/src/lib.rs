//! # Scene Engine
//!
//! The per-frame scene-management core of a real-time 3D renderer: it turns
//! a hierarchy of spatial objects into a minimal, state-change-optimal
//! sequence of draw operations, skipping objects that are off-screen or
//! hidden behind other geometry.
//!
//! ## Components
//!
//! - **Scene graph** ([`scene`]): spatial nodes with lazy dirty-flag
//!   transform propagation and bottom-up bounding aggregation
//! - **Spatial index** ([`spatial`]): a flat-array kd-tree with hardware
//!   occlusion queries per internal slot
//! - **Render batching** ([`render`]): pooled command trees that
//!   deduplicate GPU state changes across objects
//!
//! GPU work, asset decoding, physics, and windowing are consumed through
//! the narrow traits in [`render::backend`] and [`assets`]; this crate
//! decides *what* to draw, *in what order*, and *whether to skip it*.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! # fn frame(cell: &mut Cell, provider: &mut dyn ContentProvider,
//! #          queries: &mut dyn OcclusionQueryBackend, backend: &mut impl DrawBackend,
//! #          batches: &mut RenderRoot, tick: u64) {
//! let view = ViewState::new(tick, Mat4::identity(), Mat4::identity());
//!
//! // Update: settle transforms and the spatial index.
//! cell.update(&Mat4::identity(), &view, provider, queries, &mut NoObserver);
//!
//! // Pose: visible members submit into the batch trees.
//! batches.reset_all();
//! cell.frustum_pose(&view, |_, _, node| {
//!     if let Some(poseable) = &node.poseable {
//!         batches.pose(
//!             &poseable.payload,
//!             node.world_transform(),
//!             node.normal_transform(),
//!             0.0,
//!         );
//!     }
//! });
//!
//! // Draw: one pass over the trees, then they reset for the next frame.
//! batches.draw(backend);
//! # }
//! ```
//!
//! Update must complete for a subgraph before its members are queried, and
//! posing must complete before any tree is drawn; all three passes belong
//! to a single thread.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod spatial;

#[cfg(test)]
mod pipeline_tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{ContentId, ContentProvider, LoadSlot, Subgraph},
        config::EngineTuning,
        foundation::math::{Mat3, Mat4, Vec3},
        render::{DrawBackend, DrawPayload, OcclusionQueryBackend, RenderRoot, RenderTree},
        scene::{
            Aabb, BoundingSphere, Cell, Frustum, Light, NameRegistry, NoObserver, NodeFlags,
            NodeKey, Poseable, Ray, SceneGraph, SceneNode, UpdateObserver, ViewState,
        },
        spatial::{KdCoefficients, OcclusionIndex},
    };
}
