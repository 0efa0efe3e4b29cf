//! Per-frame fan-out of render batch trees
//!
//! Every pass that needs its own state-change ordering gets an independent
//! tree: shadow maps cannot share effect ordering with the opaque base pass,
//! and transparency needs back-to-front keys that would fight the opaque
//! front-to-back keys. One object's pose step may adopt into several trees
//! in the same frame.

use crate::foundation::math::{Mat3, Mat4};
use crate::render::backend::{DrawBackend, DrawPayload};
use crate::render::batch_tree::RenderTree;
use crate::render::ops::DrawOp;
use crate::scene::view::ViewState;

/// View-space depth of a world transform's origin, used as an opaque
/// front-to-back sort key (negate it for back-to-front transparency).
pub fn view_depth(view: &ViewState, world: &Mat4) -> f32 {
    let combined = view.view * world;
    combined[(2, 3)]
}

/// The frame's render batch trees, drawn in pass order.
#[derive(Debug)]
pub struct RenderRoot {
    /// Shadow-map pass commands
    pub shadow: RenderTree<DrawOp>,
    /// Opaque base (depth/ambient) pass commands
    pub base_opaque: RenderTree<DrawOp>,
    /// Per-light opaque lighting commands
    pub lit_opaque: RenderTree<DrawOp>,
    /// Sky pass commands, drawn after opaque geometry settles depth
    pub sky: RenderTree<DrawOp>,
    /// Back-to-front transparent commands
    pub transparent: RenderTree<DrawOp>,
    /// Picking pass commands
    pub picking: RenderTree<DrawOp>,
}

impl RenderRoot {
    /// Create the tree fan-out with per-tree arena capacity.
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            shadow: RenderTree::with_capacity(pool_capacity),
            base_opaque: RenderTree::with_capacity(pool_capacity),
            lit_opaque: RenderTree::with_capacity(pool_capacity),
            sky: RenderTree::with_capacity(pool_capacity),
            transparent: RenderTree::with_capacity(pool_capacity),
            picking: RenderTree::with_capacity(pool_capacity),
        }
    }

    /// Reset every tree; called once before posing begins.
    pub fn reset_all(&mut self) {
        self.shadow.reset();
        self.base_opaque.reset();
        self.lit_opaque.reset();
        self.sky.reset();
        self.transparent.reset();
        self.picking.reset();
    }

    /// Submit an object into the pass matching its payload.
    ///
    /// Opaque objects take the base pass with front-to-back effect ordering;
    /// transparent ones take the transparent pass back-to-front.
    pub fn pose(&mut self, payload: &DrawPayload, world: &Mat4, it_world: &Mat3, depth: f32) {
        if payload.transparent {
            self.pose_transparent(payload, world, it_world, depth);
        } else {
            self.pose_opaque(payload, world, it_world, depth);
        }
    }

    /// Submit an opaque object into the base pass.
    ///
    /// The effect level carries a front-to-back key so early-z gets the
    /// nearest geometry first; equal effects discovered at different depths
    /// collapse to one bind at the smallest key seen.
    pub fn pose_opaque(&mut self, payload: &DrawPayload, world: &Mat4, it_world: &Mat3, depth: f32) {
        let tree = &mut self.base_opaque;
        let effect = tree.adopt_and_update_sort(tree.root(), DrawOp::ShaderState(payload.shader), depth);
        let material = tree.adopt(effect, DrawOp::Material(payload.material));
        let mesh = tree.adopt(material, DrawOp::MeshBuffers(payload.mesh));
        let transform = tree.adopt_front(
            mesh,
            DrawOp::WorldTransform {
                world: *world,
                it_world: *it_world,
            },
        );
        tree.adopt_front(transform, DrawOp::DrawIndexed(payload.range));
    }

    /// Submit a transparent object, ordered back-to-front.
    pub fn pose_transparent(
        &mut self,
        payload: &DrawPayload,
        world: &Mat4,
        it_world: &Mat3,
        depth: f32,
    ) {
        let tree = &mut self.transparent;
        // Larger depth draws earlier: negate for an ascending key walk.
        let effect = tree.adopt_sorted(tree.root(), DrawOp::ShaderState(payload.shader), -depth);
        let material = tree.adopt(effect, DrawOp::Material(payload.material));
        let mesh = tree.adopt(material, DrawOp::MeshBuffers(payload.mesh));
        let transform = tree.adopt_front(
            mesh,
            DrawOp::WorldTransform {
                world: *world,
                it_world: *it_world,
            },
        );
        tree.adopt_front(transform, DrawOp::DrawIndexed(payload.range));
    }

    /// Submit an object lit by the active light into the lighting pass.
    pub fn pose_lit(&mut self, payload: &DrawPayload, world: &Mat4, it_world: &Mat3, depth: f32) {
        let tree = &mut self.lit_opaque;
        let effect = tree.adopt_and_update_sort(tree.root(), DrawOp::ShaderState(payload.shader), depth);
        let material = tree.adopt(effect, DrawOp::Material(payload.material));
        let mesh = tree.adopt(material, DrawOp::MeshBuffers(payload.mesh));
        let transform = tree.adopt_front(
            mesh,
            DrawOp::WorldTransform {
                world: *world,
                it_world: *it_world,
            },
        );
        tree.adopt_front(transform, DrawOp::DrawIndexed(payload.range));
    }

    /// Submit a shadow caster into the shadow-map pass. Materials are
    /// irrelevant to depth-only rendering and are skipped.
    pub fn pose_shadow(&mut self, payload: &DrawPayload, world: &Mat4) {
        let tree = &mut self.shadow;
        let effect = tree.adopt(tree.root(), DrawOp::ShaderState(payload.shader));
        let mesh = tree.adopt(effect, DrawOp::MeshBuffers(payload.mesh));
        let transform = tree.adopt_front(
            mesh,
            DrawOp::WorldTransform {
                world: *world,
                it_world: Mat3::identity(),
            },
        );
        tree.adopt_front(transform, DrawOp::DrawIndexed(payload.range));
    }

    /// Submit a sky object; drawn after opaque geometry settles depth.
    pub fn pose_sky(&mut self, payload: &DrawPayload, world: &Mat4, it_world: &Mat3) {
        let tree = &mut self.sky;
        let effect = tree.adopt(tree.root(), DrawOp::ShaderState(payload.shader));
        let mesh = tree.adopt(effect, DrawOp::MeshBuffers(payload.mesh));
        let transform = tree.adopt_front(
            mesh,
            DrawOp::WorldTransform {
                world: *world,
                it_world: *it_world,
            },
        );
        tree.adopt_front(transform, DrawOp::DrawIndexed(payload.range));
    }

    /// Submit an object into the picking pass.
    pub fn pose_picking(&mut self, payload: &DrawPayload, world: &Mat4) {
        let tree = &mut self.picking;
        let effect = tree.adopt(tree.root(), DrawOp::ShaderState(payload.shader));
        let mesh = tree.adopt(effect, DrawOp::MeshBuffers(payload.mesh));
        let transform = tree.adopt_front(
            mesh,
            DrawOp::WorldTransform {
                world: *world,
                it_world: Mat3::identity(),
            },
        );
        tree.adopt_front(transform, DrawOp::DrawIndexed(payload.range));
    }

    /// Draw every tree in pass order, resetting each as it completes so no
    /// tree carries state into the next frame.
    pub fn draw(&mut self, backend: &mut impl DrawBackend) {
        self.shadow.render(backend);
        self.shadow.reset();

        self.base_opaque.render(backend);
        self.base_opaque.reset();

        self.lit_opaque.render(backend);
        self.lit_opaque.reset();

        self.sky.render(backend);
        self.sky.reset();

        self.transparent.render(backend);
        self.transparent.reset();

        self.picking.render(backend);
        self.picking.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::backend::{
        MaterialKey, MeshHandle, PrimitiveRange, ShaderStateKey, StencilStateKey,
    };

    fn payload(shader: u64, transparent: bool) -> DrawPayload {
        DrawPayload {
            shader: ShaderStateKey(shader),
            material: MaterialKey(1),
            mesh: MeshHandle(1),
            range: PrimitiveRange {
                first_index: 0,
                index_count: 36,
                base_vertex: 0,
            },
            transparent,
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl DrawBackend for Recorder {
        fn bind_shader_state(&mut self, key: ShaderStateKey) {
            self.events.push(format!("shader {}", key.0));
        }
        fn bind_material(&mut self, _key: MaterialKey) {
            self.events.push("material".into());
        }
        fn bind_mesh_buffers(&mut self, _mesh: MeshHandle) {
            self.events.push("mesh".into());
        }
        fn set_world_transform(&mut self, world: &Mat4) {
            self.events.push(format!("world {}", world[(0, 3)]));
        }
        fn set_normal_transform(&mut self, _normal: &Mat3) {}
        fn set_stencil_state(&mut self, _key: Option<StencilStateKey>) {}
        fn draw_indexed(&mut self, _range: PrimitiveRange) {
            self.events.push("draw".into());
        }
    }

    #[test]
    fn test_shared_effect_collapses_to_one_chain() {
        let mut root = RenderRoot::new(64);
        let identity = Mat3::identity();

        for x in [1.0_f32, 2.0] {
            root.pose_opaque(
                &payload(5, false),
                &Mat4::new_translation(&Vec3::new(x, 0.0, 0.0)),
                &identity,
                x,
            );
        }

        let tree = &root.base_opaque;
        let effects = tree.children(tree.root());
        assert_eq!(effects.len(), 1, "one effect bind for both objects");

        let materials = tree.children(effects[0]);
        assert_eq!(materials.len(), 1);
        let meshes = tree.children(materials[0]);
        assert_eq!(meshes.len(), 1);
        let transforms = tree.children(meshes[0]);
        assert_eq!(transforms.len(), 2, "one transform+draw chain per object");
    }

    #[test]
    fn test_transparent_orders_back_to_front() {
        let mut root = RenderRoot::new(64);
        let identity = Mat3::identity();

        // Near object posed first; the far one must still draw first.
        for (x, depth) in [(1.0_f32, 2.0_f32), (2.0, 50.0)] {
            root.pose_transparent(
                &payload(x as u64, true),
                &Mat4::new_translation(&Vec3::new(x, 0.0, 0.0)),
                &identity,
                depth,
            );
        }

        let mut recorder = Recorder::default();
        root.draw(&mut recorder);

        let worlds: Vec<&String> = recorder
            .events
            .iter()
            .filter(|e| e.starts_with("world"))
            .collect();
        assert_eq!(worlds, ["world 2", "world 1"]);
    }

    #[test]
    fn test_draw_resets_every_tree() {
        let mut root = RenderRoot::new(64);
        let identity = Mat3::identity();

        root.pose(&payload(1, false), &Mat4::identity(), &identity, 1.0);
        root.pose(&payload(1, true), &Mat4::identity(), &identity, 1.0);
        root.pose_shadow(&payload(1, false), &Mat4::identity());

        let mut recorder = Recorder::default();
        root.draw(&mut recorder);
        assert!(recorder.events.iter().any(|e| e == "draw"));

        let mut empty = Recorder::default();
        root.draw(&mut empty);
        assert!(empty.events.is_empty(), "trees must not carry state across frames");
    }
}
