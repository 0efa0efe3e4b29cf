//! End-to-end frame pipeline tests
//!
//! Drives whole frames through a cell: content install, update, frustum
//! pose, batch-tree population, and draw, against scripted backends.

#[cfg(test)]
mod tests {
    use crate::assets::{ContentId, ContentProvider, LoadSlot, Subgraph, SubgraphSlot};
    use crate::config::EngineTuning;
    use crate::foundation::math::{Mat3, Mat4, Mat4Ext, Vec3};
    use crate::render::backend::{
        DrawBackend, DrawPayload, MaterialKey, MeshHandle, OcclusionQueryBackend, PrimitiveRange,
        QueryId, ShaderStateKey, StencilStateKey,
    };
    use crate::render::root::{view_depth, RenderRoot};
    use crate::scene::bounds::Aabb;
    use crate::scene::cell::Cell;
    use crate::scene::graph::{NoObserver, SceneGraph};
    use crate::scene::node::{Poseable, SceneNode};
    use crate::scene::registry::NameRegistry;
    use crate::scene::view::ViewState;

    /// Unlimited query backend that never completes a query.
    #[derive(Debug, Default)]
    struct IdleQueries {
        next_id: u32,
    }

    impl OcclusionQueryBackend for IdleQueries {
        fn create_query(&mut self) -> Option<QueryId> {
            let id = QueryId(self.next_id);
            self.next_id += 1;
            Some(id)
        }
        fn destroy_query(&mut self, _query: QueryId) {}
        fn issue_query(&mut self, _query: QueryId, _proxy_world: &Mat4) {}
        fn is_complete(&self, _query: QueryId) -> bool {
            false
        }
        fn visible_pixels(&self, _query: QueryId) -> u32 {
            0
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
        fn bind_material(&mut self, key: MaterialKey) {
            self.events.push(format!("material {}", key.0));
        }
        fn bind_mesh_buffers(&mut self, mesh: MeshHandle) {
            self.events.push(format!("mesh {}", mesh.0));
        }
        fn set_world_transform(&mut self, _world: &Mat4) {
            self.events.push("world".into());
        }
        fn set_normal_transform(&mut self, _normal: &Mat3) {}
        fn set_stencil_state(&mut self, _key: Option<StencilStateKey>) {}
        fn draw_indexed(&mut self, _range: PrimitiveRange) {
            self.events.push("draw".into());
        }
    }

    /// Provider that delivers a prepared subgraph after a number of polls.
    struct ScriptedProvider {
        subgraph: Option<Subgraph>,
        polls_until_ready: u32,
    }

    impl ContentProvider for ScriptedProvider {
        fn request(&mut self, _id: &ContentId, slot: SubgraphSlot) {
            if self.polls_until_ready > 0 {
                self.polls_until_ready -= 1;
                return;
            }
            if let Some(subgraph) = self.subgraph.take() {
                *slot.lock().unwrap() = LoadSlot::Ready(subgraph);
            }
        }
    }

    fn payload(shader: u64) -> DrawPayload {
        DrawPayload {
            shader: ShaderStateKey(shader),
            material: MaterialKey(1),
            mesh: MeshHandle(1),
            range: PrimitiveRange {
                first_index: 0,
                index_count: 36,
                base_vertex: 0,
            },
            transparent: false,
        }
    }

    fn poseable_node(shader: u64, position: Vec3) -> SceneNode {
        let mut node = SceneNode::new().with_poseable(Poseable::new(
            Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0)),
            12,
            payload(shader),
        ));
        node.set_local_transform(Mat4::new_translation(&position));
        node
    }

    fn subgraph_with(children: Vec<SceneNode>) -> Subgraph {
        let mut graph = SceneGraph::new();
        let mut names = NameRegistry::new();
        let root = graph.insert(SceneNode::named("cell_root"), None);
        names.register("cell_root", root);
        for child in children {
            graph.insert(child, Some(root));
        }
        Subgraph { graph, root, names }
    }

    /// Camera at -Z looking down +Z, wide enough to contain the test scene.
    fn view_for_tick(tick: u64) -> ViewState {
        ViewState::new(
            tick,
            Mat4::new_translation(&Vec3::new(0.0, 0.0, 50.0)),
            Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 1000.0),
        )
    }

    fn loaded_cell(children: Vec<SceneNode>) -> (Cell, IdleQueries) {
        let mut cell = Cell::new(ContentId::from("test_cell"), &EngineTuning::default());
        let mut provider = ScriptedProvider {
            subgraph: Some(subgraph_with(children)),
            polls_until_ready: 0,
        };
        let mut queries = IdleQueries::default();
        cell.update(
            &Mat4::identity(),
            &view_for_tick(1),
            &mut provider,
            &mut queries,
            &mut NoObserver,
        );
        assert!(cell.is_loaded());
        (cell, queries)
    }

    #[test]
    fn test_single_poseable_poses_exactly_once() {
        let (mut cell, _queries) = loaded_cell(vec![poseable_node(1, Vec3::zeros())]);

        let view = view_for_tick(2);
        let mut poses = 0;
        cell.frustum_pose(&view, |_, _, _| poses += 1);
        assert_eq!(poses, 1);

        // A second pose in the same tick (another portal path) is a no-op.
        cell.frustum_pose(&view, |_, _, _| poses += 1);
        assert_eq!(poses, 1);

        // The next frame poses again.
        cell.frustum_pose(&view_for_tick(3), |_, _, _| poses += 1);
        assert_eq!(poses, 2);
    }

    #[test]
    fn test_moved_member_lands_in_containing_slot() {
        let mut scene = vec![poseable_node(1, Vec3::zeros())];
        // Extra static content spreading the cell's bounds so the moved box
        // stays inside them.
        for i in 0..6 {
            scene.push(poseable_node(
                2,
                Vec3::new(-20.0 + i as f32 * 8.0, (i % 2) as f32 * 10.0, 20.0),
            ));
        }
        let (mut cell, mut queries) = loaded_cell(scene);
        let members_before = cell.index().unwrap().member_count();

        // Move the first object to [(5,5,5), (7,7,7)], still inside the cell.
        let target = cell
            .graph()
            .unwrap()
            .get(cell.root().unwrap())
            .unwrap()
            .children()[0];
        cell.graph_mut()
            .unwrap()
            .get_mut(target)
            .unwrap()
            .set_local_transform(Mat4::new_translation(&Vec3::new(6.0, 6.0, 6.0)));

        let mut provider = ScriptedProvider {
            subgraph: None,
            polls_until_ready: 0,
        };
        cell.update(
            &Mat4::identity(),
            &view_for_tick(2),
            &mut provider,
            &mut queries,
            &mut NoObserver,
        );

        let index = cell.index().unwrap();
        assert_eq!(index.member_count(), members_before);

        let member_key = cell
            .graph()
            .unwrap()
            .get(target)
            .unwrap()
            .poseable
            .as_ref()
            .unwrap()
            .membership
            .unwrap();
        let member = index.member(member_key).unwrap();
        let expected = Aabb::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(7.0, 7.0, 7.0));
        assert!((member.aabb.min - expected.min).norm() < 1.0e-4);
        assert!((member.aabb.max - expected.max).norm() < 1.0e-4);

        // Wherever it ended up, its recorded slot must contain the new box.
        assert!(index.root_aabb().contains_aabb(&member.aabb));
    }

    #[test]
    fn test_shared_effect_draws_two_objects_under_one_bind() {
        let (mut cell, _queries) = loaded_cell(vec![
            poseable_node(7, Vec3::new(-2.0, 0.0, 0.0)),
            poseable_node(7, Vec3::new(2.0, 0.0, 0.0)),
        ]);

        let view = view_for_tick(2);
        let mut batches = RenderRoot::new(64);
        batches.reset_all();

        cell.frustum_pose(&view, |_, _, node| {
            let poseable = node.poseable.as_ref().unwrap();
            batches.pose(
                &poseable.payload,
                node.world_transform(),
                node.normal_transform(),
                view_depth(&view, node.world_transform()),
            );
        });

        // One effect chain: effect -> material -> mesh -> two transforms.
        let tree = &batches.base_opaque;
        let effects = tree.children(tree.root());
        assert_eq!(effects.len(), 1);
        let materials = tree.children(effects[0]);
        assert_eq!(materials.len(), 1);
        let meshes = tree.children(materials[0]);
        assert_eq!(meshes.len(), 1);
        assert_eq!(tree.child_count(meshes[0]), 2);

        let mut recorder = Recorder::default();
        batches.draw(&mut recorder);

        let binds = recorder
            .events
            .iter()
            .filter(|e| e.starts_with("shader"))
            .count();
        let draws = recorder.events.iter().filter(|e| *e == "draw").count();
        assert_eq!(binds, 1, "one state bind for both objects");
        assert_eq!(draws, 2, "one draw per object");
    }

    #[test]
    fn test_loading_cell_contributes_nothing_until_ready() {
        let mut cell = Cell::new(ContentId::from("slow_cell"), &EngineTuning::default());
        let mut provider = ScriptedProvider {
            subgraph: Some(subgraph_with(vec![poseable_node(1, Vec3::zeros())])),
            polls_until_ready: 2,
        };
        let mut queries = IdleQueries::default();

        for tick in 1..=2 {
            cell.update(
                &Mat4::identity(),
                &view_for_tick(tick),
                &mut provider,
                &mut queries,
                &mut NoObserver,
            );
            assert!(!cell.is_loaded());

            let mut poses = 0;
            cell.frustum_pose(&view_for_tick(tick), |_, _, _| poses += 1);
            assert_eq!(poses, 0, "a loading cell contributes nothing");
        }

        // Third frame: content arrives and integrates on this thread.
        cell.update(
            &Mat4::identity(),
            &view_for_tick(3),
            &mut provider,
            &mut queries,
            &mut NoObserver,
        );
        assert!(cell.is_loaded());

        let mut poses = 0;
        cell.frustum_pose(&view_for_tick(3), |_, _, _| poses += 1);
        assert_eq!(poses, 1);
    }

    #[test]
    fn test_cell_transform_change_rebuilds_index() {
        let (mut cell, mut queries) = loaded_cell(vec![
            poseable_node(1, Vec3::zeros()),
            poseable_node(1, Vec3::new(4.0, 0.0, 0.0)),
        ]);
        let bounds_before = cell.world_bounding();

        let mut provider = ScriptedProvider {
            subgraph: None,
            polls_until_ready: 0,
        };
        let shifted = Mat4::new_translation(&Vec3::new(100.0, 0.0, 0.0));
        cell.update(
            &shifted,
            &view_for_tick(2),
            &mut provider,
            &mut queries,
            &mut NoObserver,
        );

        let bounds_after = cell.world_bounding();
        assert!(bounds_after.min.x > bounds_before.max.x);

        // Members still pose after the rebuild, under the shifted frustum.
        let moved_view = ViewState::new(
            3,
            Mat4::new_translation(&Vec3::new(-100.0, 0.0, 50.0)),
            Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 1000.0),
        );
        cell.update(&shifted, &moved_view, &mut provider, &mut queries, &mut NoObserver);
        let mut poses = 0;
        cell.frustum_pose(&moved_view, |_, _, _| poses += 1);
        assert_eq!(poses, 2);
    }

    #[test]
    fn test_pick_hits_member_once_per_tick() {
        use crate::scene::bounds::Ray;

        let (mut cell, _queries) = loaded_cell(vec![
            poseable_node(1, Vec3::zeros()),
            poseable_node(1, Vec3::new(0.0, 30.0, 0.0)),
        ]);

        let ray = Ray::new(Vec3::new(-20.0, 0.0, 0.0), Vec3::x());
        let view = view_for_tick(2);

        let mut hits = 0;
        cell.pick(&view, &ray, |_, _, _| hits += 1);
        assert_eq!(hits, 1, "only the object on the ray is picked");

        cell.pick(&view, &ray, |_, _, _| hits += 1);
        assert_eq!(hits, 1, "picking repeats only on a new tick");
    }

    #[test]
    fn test_lighting_pose_fans_into_shadow_and_lit_trees() {
        use crate::scene::bounds::BoundingSphere;
        use crate::scene::light::Light;
        use crate::spatial::LightPoseKind;

        let (mut cell, mut queries) = loaded_cell(vec![
            poseable_node(3, Vec3::zeros()),
            poseable_node(3, Vec3::new(4.0, 0.0, 0.0)),
        ]);

        // Second frame marks members' shadow state clean.
        let mut provider = ScriptedProvider {
            subgraph: None,
            polls_until_ready: 0,
        };
        cell.update(
            &Mat4::identity(),
            &view_for_tick(2),
            &mut provider,
            &mut queries,
            &mut NoObserver,
        );

        let light = Light::with_shadows(
            BoundingSphere::new(Vec3::zeros(), 50.0),
            Vec::new(),
            Vec::new(),
        );

        let view = view_for_tick(2);
        let mut batches = RenderRoot::new(64);
        batches.reset_all();

        let stale = cell.lighting_pose(&light, |kind, _, _, node| {
            let poseable = node.poseable.as_ref().unwrap();
            match kind {
                LightPoseKind::Shadow => {
                    batches.pose_shadow(&poseable.payload, node.world_transform());
                }
                LightPoseKind::Lit => batches.pose_lit(
                    &poseable.payload,
                    node.world_transform(),
                    node.normal_transform(),
                    view_depth(&view, node.world_transform()),
                ),
            }
        });

        // Both members reached both trees, sharing one effect chain each.
        let shadow_effects = batches.shadow.children(batches.shadow.root());
        assert_eq!(shadow_effects.len(), 1);
        let lit_effects = batches.lit_opaque.children(batches.lit_opaque.root());
        assert_eq!(lit_effects.len(), 1);

        // Nothing moved since install, so no shadow contribution is stale.
        assert!(!stale);
    }

    #[test]
    fn test_unload_then_queries_return_nothing() {
        let (mut cell, mut queries) = loaded_cell(vec![poseable_node(1, Vec3::zeros())]);
        cell.unload(&mut queries);
        assert!(!cell.is_loaded());

        let mut out = Vec::new();
        cell.query_point(Vec3::zeros(), &mut out);
        assert!(out.is_empty());

        let mut poses = 0;
        cell.frustum_pose(&view_for_tick(5), |_, _, _| poses += 1);
        assert_eq!(poses, 0);
    }
}
