//! Scene management
//!
//! The scene graph (hierarchy + incremental transform propagation), the
//! bounding primitives it culls with, and the cell abstraction tying a
//! subgraph to its spatial index and content loading.
//!
//! ## Per-frame control flow
//!
//! ```text
//! Update  - settle dirty transforms, aggregate bounds, sync the index
//! Pose    - query the index against the frustum/lights, fill batch trees
//! Draw    - execute the batch trees, state changes top-down
//! ```

pub mod bounds;
pub mod cell;
pub mod graph;
pub mod light;
pub mod node;
pub mod registry;
pub mod view;

pub use bounds::{planes_intersect_aabb, Aabb, BoundingSphere, Frustum, Plane, PlaneSide, Ray};
pub use cell::Cell;
pub use graph::{NoObserver, SceneGraph, UpdateObserver};
pub use light::Light;
pub use node::{NodeFlags, NodeKey, Poseable, SceneNode, DEFAULT_AFFINITY_MASK};
pub use registry::{Lookup, NameRegistry};
pub use view::ViewState;
