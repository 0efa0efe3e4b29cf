//! Concrete draw operations for the render batch trees
//!
//! The command vocabulary adopted into [`RenderTree`](crate::render::RenderTree)
//! levels. Equality is what drives deduplication: two objects sharing an
//! effect produce equal `ShaderState` commands and therefore one bind.

use crate::foundation::math::{Mat3, Mat4};
use crate::render::backend::{
    DrawBackend, MaterialKey, MeshHandle, PrimitiveRange, ShaderStateKey, StencilStateKey,
};
use crate::render::batch_tree::{Children, RenderCommand};

/// One GPU state change or draw executed by a render tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Bind a shader/effect state block
    ShaderState(ShaderStateKey),
    /// Bind a material's constants and textures
    Material(MaterialKey),
    /// Bind a mesh's vertex and index buffers
    MeshBuffers(MeshHandle),
    /// Upload world and normal transform constants
    WorldTransform {
        /// World transform of the object
        world: Mat4,
        /// Inverse-transpose rotation for normals
        it_world: Mat3,
    },
    /// Bind a stencil state for the duration of the subtree, then restore
    StencilState(StencilStateKey),
    /// Draw an indexed primitive range
    DrawIndexed(PrimitiveRange),
}

impl<B: DrawBackend> RenderCommand<B> for DrawOp {
    fn render(&self, backend: &mut B, children: Children<'_, Self>) {
        match self {
            Self::ShaderState(key) => {
                backend.bind_shader_state(*key);
                children.render_all(backend);
            }
            Self::Material(key) => {
                backend.bind_material(*key);
                children.render_all(backend);
            }
            Self::MeshBuffers(mesh) => {
                backend.bind_mesh_buffers(*mesh);
                children.render_all(backend);
            }
            Self::WorldTransform { world, it_world } => {
                backend.set_world_transform(world);
                backend.set_normal_transform(it_world);
                children.render_all(backend);
            }
            Self::StencilState(key) => {
                // Stencil state is not safe to leave set for sibling
                // subtrees; restore the default once descendants finish.
                backend.set_stencil_state(Some(*key));
                children.render_all(backend);
                backend.set_stencil_state(None);
            }
            Self::DrawIndexed(range) => {
                backend.draw_indexed(*range);
                children.render_all(backend);
            }
        }
    }
}
