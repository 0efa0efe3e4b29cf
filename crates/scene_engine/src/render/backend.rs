//! Draw backend interface
//!
//! The scene core decides *what* to draw and *in what order*; actually
//! issuing GPU work is the backend's job. These traits are the entire
//! surface the core consumes: a handful of state binds, an indexed draw,
//! and hardware occlusion queries. Handles are opaque keys minted by the
//! backend's own resource management.

use crate::foundation::math::{Mat3, Mat4};

/// Opaque handle to a compiled shader/effect state block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderStateKey(pub u64);

/// Opaque handle to a material constant/texture set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey(pub u64);

/// Opaque handle to a mesh's vertex/index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Opaque handle to a stencil state block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilStateKey(pub u64);

/// Opaque handle to a hardware occlusion query object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(pub u32);

/// Range of indices forming one primitive batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveRange {
    /// First index into the bound index buffer
    pub first_index: u32,
    /// Number of indices to draw
    pub index_count: u32,
    /// Value added to each index before vertex lookup
    pub base_vertex: i32,
}

/// Everything a poseable node submits when it decides to be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawPayload {
    /// Shader/effect state shared with other users of the same effect
    pub shader: ShaderStateKey,
    /// Material constants for this object
    pub material: MaterialKey,
    /// Mesh buffers to bind
    pub mesh: MeshHandle,
    /// Indexed primitive range within the mesh
    pub range: PrimitiveRange,
    /// Whether the object requires back-to-front blending
    pub transparent: bool,
}

/// GPU state-change and draw sink executed by the render batch trees.
///
/// Implementations are expected to be cheap to call with redundant state:
/// the batch trees already deduplicate identical state per level per frame,
/// so every call here represents a state change that actually happens.
pub trait DrawBackend {
    /// Bind a shader/effect state block.
    fn bind_shader_state(&mut self, key: ShaderStateKey);

    /// Bind a material's constants and textures.
    fn bind_material(&mut self, key: MaterialKey);

    /// Bind a mesh's vertex and index buffers.
    fn bind_mesh_buffers(&mut self, mesh: MeshHandle);

    /// Upload the world transform constant.
    fn set_world_transform(&mut self, world: &Mat4);

    /// Upload the normal (inverse-transpose world rotation) constant.
    fn set_normal_transform(&mut self, normal: &Mat3);

    /// Bind a stencil state block, or restore the default with `None`.
    fn set_stencil_state(&mut self, key: Option<StencilStateKey>);

    /// Draw an indexed primitive range with the currently bound state.
    fn draw_indexed(&mut self, range: PrimitiveRange);
}

/// Hardware occlusion query interface.
///
/// Query objects are a bounded resource: `create_query` may return `None`
/// when the budget is exhausted, in which case the caller degrades to
/// treating the covered region as always visible. Results lag issuance by at
/// least one frame; `is_complete` reports whether a previously issued query
/// has a consumable result.
pub trait OcclusionQueryBackend {
    /// Allocate a query object, or `None` when the budget is exhausted.
    fn create_query(&mut self) -> Option<QueryId>;

    /// Return a query object to the backend.
    fn destroy_query(&mut self, query: QueryId);

    /// Render the proxy volume under `proxy_world` with the query active.
    fn issue_query(&mut self, query: QueryId, proxy_world: &Mat4);

    /// Whether the most recently issued pass of this query has a result.
    fn is_complete(&self, query: QueryId) -> bool;

    /// Pixel count of the most recently completed pass.
    fn visible_pixels(&self, query: QueryId) -> u32;
}
