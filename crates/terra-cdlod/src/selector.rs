//! Per-frame node selection.
//!
//! The tree is walked from the root every frame. A node is split into its
//! children while the camera is within its refinement distance; otherwise it
//! is drawn whole at its own level. Leaves are always drawn at level 0.

use crate::batch::{ProgramFactory, RenderList};
use crate::camera::TerrainCamera;
use crate::detail::DetailLevelTable;
use crate::quadtree::{Node, Quadtree};

/// Counters for one selection pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionStats {
    /// Nodes examined, including culled ones.
    pub visited: usize,
    /// Subtrees rejected by the camera's view volume.
    pub culled: usize,
    /// Nodes queued for drawing.
    pub selected: usize,
    /// Nodes dropped because their batch has no program.
    pub skipped: usize,
    /// Nodes dropped by the draw distance.
    pub beyond_draw_distance: usize,
}

/// Selection settings for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LodSelector {
    /// Nodes farther than this are not drawn.
    pub draw_distance: Option<f32>,
    /// Use detail level 0 for every node.
    pub low_detail: bool,
}

impl LodSelector {
    pub fn new(draw_distance: Option<f32>, low_detail: bool) -> Self {
        Self {
            draw_distance,
            low_detail,
        }
    }

    /// Walk `tree` and queue the selected nodes in `list`.
    ///
    /// `list` is not cleared first.
    pub fn select(
        &self,
        tree: &Quadtree,
        detail: &DetailLevelTable,
        camera: &dyn TerrainCamera,
        list: &mut RenderList,
        factory: &mut dyn ProgramFactory,
    ) -> SelectionStats {
        let mut pass = SelectionPass {
            settings: self,
            tree,
            detail,
            camera,
            list,
            factory,
            stats: SelectionStats::default(),
        };
        if let Some(root) = tree.root_node() {
            pass.process_node(root);
        }
        pass.stats
    }
}

struct SelectionPass<'a> {
    settings: &'a LodSelector,
    tree: &'a Quadtree,
    detail: &'a DetailLevelTable,
    camera: &'a dyn TerrainCamera,
    list: &'a mut RenderList,
    factory: &'a mut dyn ProgramFactory,
    stats: SelectionStats,
}

impl SelectionPass<'_> {
    fn process_node(&mut self, node: &Node) {
        self.stats.visited += 1;

        if self.camera.cull(&node.bounding_box) {
            self.stats.culled += 1;
            return;
        }

        let distance = node.bounding_box.distance_to_point(self.camera.position());

        if node.level > 0 && distance <= self.tree.params().refine_distance(node.level) {
            let tree = self.tree;
            for child in tree.children(node) {
                self.process_node(child);
            }
            return;
        }

        if self
            .settings
            .draw_distance
            .is_some_and(|limit| distance > limit)
        {
            self.stats.beyond_draw_distance += 1;
            return;
        }

        let detail_level = if self.settings.low_detail {
            0
        } else {
            self.detail.detail_level_at(distance as f64)
        };

        if self.list.add_node(node, node.level, detail_level, self.factory) {
            self.stats.selected += 1;
        } else {
            self.stats.skipped += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ProgramHandle, ProgramVariant};
    use crate::camera::OmniCamera;
    use crate::elevation::HeightField;
    use crate::error::RenderError;
    use crate::material::MaterialMask;
    use crate::material_map::{MaterialLayer, MaterialMap, MaterialRaster};
    use crate::params::LodParams;
    use glam::{DVec2, Vec3};
    use terra_math::Aabb;

    struct Factory;

    impl ProgramFactory for Factory {
        fn create_program(
            &mut self,
            variant: &ProgramVariant,
        ) -> Result<ProgramHandle, RenderError> {
            Ok(ProgramHandle(variant.key.detail_level as u64))
        }
    }

    /// Culls everything whose box lies entirely at x > `max_x`.
    struct HalfSpaceCamera {
        position: Vec3,
        max_x: f32,
    }

    impl TerrainCamera for HalfSpaceCamera {
        fn position(&self) -> Vec3 {
            self.position
        }

        fn cull(&self, aabb: &Aabb) -> bool {
            aabb.min.x > self.max_x
        }
    }

    /// 3 levels, 4x4 grid cells of 100 m per leaf: leaves are 400 m, root 3200 m.
    fn tree() -> Quadtree {
        let params = LodParams {
            max_level: 3,
            mesh_grid_size: 4,
            meters_per_grid: 100,
            base_lod_distance: 500.0,
        };
        let field = HeightField::flat(32, 32, 0.0).unwrap();
        let raster = MaterialRaster::filled(1, 1, MaterialMask::LAND).unwrap();
        let map = MaterialMap::new(MaterialLayer::new(raster, DVec2::ZERO, 3_200.0).unwrap());
        Quadtree::build(&params, DVec2::ZERO, &field, &map).unwrap()
    }

    fn run(
        selector: &LodSelector,
        tree: &Quadtree,
        camera: &dyn TerrainCamera,
    ) -> (RenderList, SelectionStats) {
        let detail = DetailLevelTable::default();
        let mut list = RenderList::new("terrain", &detail, false);
        let stats = selector.select(tree, &detail, camera, &mut list, &mut Factory);
        (list, stats)
    }

    #[test]
    fn test_far_camera_selects_root() {
        let tree = tree();
        let camera = OmniCamera::new(Vec3::new(1_600.0, 1_600.0, 100_000.0));
        let (list, stats) = run(&LodSelector::default(), &tree, &camera);
        assert_eq!(stats.selected, 1);
        assert_eq!(stats.visited, 1);
        let batch = list.active_batches().next().unwrap();
        assert_eq!(batch.lods(), &[3]);
        assert_eq!(batch.key().detail_level, 0);
    }

    #[test]
    fn test_camera_on_surface_refines_to_leaves() {
        let tree = tree();
        let camera = OmniCamera::new(Vec3::new(0.0, 0.0, 0.0));
        let (list, stats) = run(&LodSelector::default(), &tree, &camera);
        // The leaf under the camera is at distance 0 and gets the finest detail.
        let finest = list
            .active_batches()
            .find(|b| b.key().detail_level == 4)
            .unwrap();
        let under_camera = finest
            .positions()
            .iter()
            .position(|p| *p == glam::Vec2::ZERO)
            .unwrap();
        assert_eq!(finest.lods()[under_camera], 0);
        assert!(stats.selected > 1);
        assert_eq!(stats.culled, 0);
    }

    #[test]
    fn test_selected_nodes_tile_the_terrain() {
        let tree = tree();
        let camera = OmniCamera::new(Vec3::new(200.0, 200.0, 50.0));
        let (list, _) = run(&LodSelector::default(), &tree, &camera);
        let covered: f64 = list
            .active_batches()
            .flat_map(|b| b.lods().iter())
            .map(|&lod| (400.0 * f64::from(1u32 << lod)).powi(2))
            .sum();
        assert_eq!(covered, 3_200.0 * 3_200.0);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let tree = tree();
        let camera = OmniCamera::new(Vec3::new(900.0, 1_300.0, 120.0));
        let (first, first_stats) = run(&LodSelector::default(), &tree, &camera);
        let (second, second_stats) = run(&LodSelector::default(), &tree, &camera);
        assert_eq!(first_stats, second_stats);
        let contents = |list: &RenderList| -> Vec<_> {
            list.active_batches()
                .map(|b| (b.key(), b.positions().to_vec()))
                .collect()
        };
        assert_eq!(contents(&first), contents(&second));
    }

    #[test]
    fn test_culling_discards_subtrees() {
        let tree = tree();
        let camera = HalfSpaceCamera {
            position: Vec3::new(0.0, 0.0, 10.0),
            max_x: 1_000.0,
        };
        let (list, stats) = run(&LodSelector::default(), &tree, &camera);
        assert!(stats.culled > 0);
        assert!(
            list.active_batches()
                .flat_map(|b| b.positions().iter())
                .all(|p| p.x * 100.0 <= 1_000.0)
        );

        let blind = HalfSpaceCamera {
            position: Vec3::ZERO,
            max_x: -1.0,
        };
        let (list, stats) = run(&LodSelector::default(), &tree, &blind);
        assert!(list.is_empty());
        assert_eq!(stats.culled, 1);
    }

    #[test]
    fn test_draw_distance_drops_far_nodes() {
        let tree = tree();
        let camera = OmniCamera::new(Vec3::new(0.0, 0.0, 10.0));
        let selector = LodSelector::new(Some(1_000.0), false);
        let (list, stats) = run(&selector, &tree, &camera);
        assert!(stats.beyond_draw_distance > 0);
        for batch in list.active_batches() {
            for (position, &lod) in batch.positions().iter().zip(batch.lods()) {
                let size = 400.0 * (1u32 << lod) as f32;
                let min = Vec3::new(position.x * 100.0, position.y * 100.0, 0.0);
                let aabb = Aabb::new(min, min + Vec3::new(size, size, 0.0));
                assert!(aabb.distance_to_point(camera.position) <= 1_000.0);
            }
        }
    }

    #[test]
    fn test_low_detail_forces_level_zero() {
        let tree = tree();
        let camera = OmniCamera::new(Vec3::new(200.0, 200.0, 0.0));
        let (list, stats) = run(&LodSelector::new(None, true), &tree, &camera);
        assert!(stats.selected > 1);
        assert!(list.active_batches().all(|b| b.key().detail_level == 0));
    }
}
