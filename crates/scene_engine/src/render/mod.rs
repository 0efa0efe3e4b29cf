//! Render batching
//!
//! The command-deduplication trees that turn the pose pass's submissions
//! into a minimal, state-change-optimal draw sequence, and the backend
//! traits those commands execute against.

pub mod backend;
pub mod batch_tree;
pub mod ops;
pub mod root;

pub use backend::{
    DrawBackend, DrawPayload, MaterialKey, MeshHandle, OcclusionQueryBackend, PrimitiveRange,
    QueryId, ShaderStateKey, StencilStateKey,
};
pub use batch_tree::{BatchNodeId, Children, RenderCommand, RenderTree};
pub use ops::DrawOp;
pub use root::{view_depth, RenderRoot};
