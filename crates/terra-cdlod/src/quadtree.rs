//! Immutable CDLOD quadtree built once from the elevation and material inputs.

use std::collections::BTreeSet;

use glam::{DVec2, IVec2, Vec2, Vec3};
use terra_math::{Aabb, Rect};
use tracing::debug;

use crate::arena::{BlockArena, NodeRef};
use crate::elevation::{ElevationSource, validate_power_of_two};
use crate::error::TerrainError;
use crate::material::MaterialMask;
use crate::material_map::MaterialMap;
use crate::params::LodParams;

/// One quadtree cell.
#[derive(Clone, Debug)]
pub struct Node {
    /// Minimum corner in world metres. Always a whole number of grid cells.
    pub position: DVec2,
    /// `position / meters_per_grid`, the per-instance value sent to the GPU.
    pub grid_position: Vec2,
    /// Edge length in metres.
    pub size: f64,
    /// 0 at leaves, `max_level` at the root.
    pub level: u8,
    /// Upper bound of elevation inside the footprint, never below 0.
    pub max_height: f32,
    /// `[position, position + size] x [0, max_height]`, z up.
    pub bounding_box: Aabb,
    /// OR of every material in the footprint. Never empty.
    pub material: MaterialMask,
    /// Quadrants `(0,h)`, `(h,h)`, `(0,0)`, `(h,0)`; `None` at leaves.
    pub children: Option<[NodeRef; 4]>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Footprint on the ground plane.
    pub fn footprint(&self) -> Rect {
        Rect::square(self.position, self.size)
    }
}

/// Quadtree over the terrain, stored in a [`BlockArena`].
#[derive(Debug)]
pub struct Quadtree {
    arena: BlockArena<Node>,
    root: Option<NodeRef>,
    params: LodParams,
    origin: DVec2,
    materials: BTreeSet<MaterialMask>,
    leaf_count: usize,
}

impl Quadtree {
    /// Build a tree whose root's minimum corner sits at `origin`.
    pub fn build(
        params: &LodParams,
        origin: DVec2,
        elevation: &dyn ElevationSource,
        materials: &MaterialMap,
    ) -> Result<Self, TerrainError> {
        let mut tree = Self {
            arena: BlockArena::with_capacity_limit(0),
            root: None,
            params: *params,
            origin,
            materials: BTreeSet::new(),
            leaf_count: 0,
        };
        tree.rebuild(params, origin, elevation, materials)?;
        Ok(tree)
    }

    /// Discard the current nodes and build again, reusing the arena's first block.
    ///
    /// On error the tree is left empty.
    pub fn rebuild(
        &mut self,
        params: &LodParams,
        origin: DVec2,
        elevation: &dyn ElevationSource,
        materials: &MaterialMap,
    ) -> Result<(), TerrainError> {
        self.arena.clear();
        self.root = None;
        self.materials.clear();
        self.leaf_count = 0;

        params.validate()?;
        params.validate_origin(origin)?;
        validate_power_of_two(elevation)?;

        self.params = *params;
        self.origin = origin;
        self.arena.set_capacity_limit(params.node_count_limit());

        let mut builder = Builder {
            arena: &mut self.arena,
            params,
            elevation,
            materials,
            present: &mut self.materials,
            leaves: 0,
        };
        let root = match builder.create_node(origin, params.max_level) {
            Ok(root) => root,
            Err(err) => {
                self.arena.clear();
                self.materials.clear();
                return Err(err);
            }
        };
        self.leaf_count = builder.leaves;
        self.root = Some(root);

        debug!(
            nodes = self.arena.len(),
            leaves = self.leaf_count,
            blocks = self.arena.block_count(),
            materials = self.materials.len(),
            max_level = params.max_level,
            "quadtree built"
        );
        Ok(())
    }

    /// Handle of the root node, `None` when the last build failed.
    pub fn root(&self) -> Option<NodeRef> {
        self.root
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.root.and_then(|root| self.arena.get(root))
    }

    /// Resolve a node handle issued by this tree.
    pub fn get(&self, node: NodeRef) -> Option<&Node> {
        self.arena.get(node)
    }

    /// # Panics
    ///
    /// Panics on a handle from an earlier build.
    pub fn node(&self, node: NodeRef) -> &Node {
        &self.arena[node]
    }

    /// Children of `node`, empty for leaves.
    pub fn children<'a>(&'a self, node: &Node) -> impl Iterator<Item = &'a Node> + use<'a> {
        node.children
            .into_iter()
            .flatten()
            .filter_map(move |child| self.arena.get(child))
    }

    /// All nodes in allocation order (children before their parent).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.arena.iter()
    }

    pub fn params(&self) -> &LodParams {
        &self.params
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn max_level(&self) -> u8 {
        self.params.max_level
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Distinct leaf material masks, used to pre-create programs.
    pub fn materials(&self) -> &BTreeSet<MaterialMask> {
        &self.materials
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

struct Builder<'a> {
    arena: &'a mut BlockArena<Node>,
    params: &'a LodParams,
    elevation: &'a dyn ElevationSource,
    materials: &'a MaterialMap,
    present: &'a mut BTreeSet<MaterialMask>,
    leaves: usize,
}

impl Builder<'_> {
    /// Create the subtree rooted at `position`. Children are allocated before
    /// their parent so the parent can aggregate them.
    fn create_node(&mut self, position: DVec2, level: u8) -> Result<NodeRef, TerrainError> {
        let size = self.params.node_size(level);
        let cell = self.params.meters_per_grid as f64;

        let (max_height, material, children) = if level == 0 {
            let (max_height, material) = self.sample_leaf(position, size);
            (max_height, material, None)
        } else {
            let half = size / 2.0;
            let offsets = [
                DVec2::new(0.0, half),
                DVec2::new(half, half),
                DVec2::new(0.0, 0.0),
                DVec2::new(half, 0.0),
            ];
            let mut refs = [None; 4];
            let mut max_height = 0.0f32;
            let mut material = MaterialMask::empty();
            for (slot, offset) in refs.iter_mut().zip(offsets) {
                let child = self.create_node(position + offset, level - 1)?;
                let node = &self.arena[child];
                max_height = max_height.max(node.max_height);
                material |= node.material;
                *slot = Some(child);
            }
            (max_height, material, children_or_none(refs))
        };

        let min = Vec3::new(position.x as f32, position.y as f32, 0.0);
        let end = position + DVec2::splat(size);
        let max = Vec3::new(end.x as f32, end.y as f32, max_height);

        let node = Node {
            position,
            grid_position: (position / cell).as_vec2(),
            size,
            level,
            max_height,
            bounding_box: Aabb::new(min, max),
            material,
            children,
        };
        Ok(self.arena.allocate(node)?)
    }

    fn sample_leaf(&mut self, position: DVec2, size: f64) -> (f32, MaterialMask) {
        let material = self.materials.classify(&Rect::square(position, size));
        self.present.insert(material);
        self.leaves += 1;

        // Vertex range of the leaf mesh, both ends inclusive.
        let cell = self.params.meters_per_grid as f64;
        let begin = (position / cell).round();
        let begin = IVec2::new(clamp_i32(begin.x), clamp_i32(begin.y));
        let span = i32::try_from(self.params.mesh_grid_size)
            .unwrap_or(i32::MAX)
            .saturating_add(1);
        let end = begin.saturating_add(IVec2::splat(span));
        let max_height = self
            .elevation
            .max_elevation(begin, end)
            .unwrap_or(0.0)
            .max(0.0);
        (max_height, material)
    }
}

fn children_or_none(children: [Option<NodeRef>; 4]) -> Option<[NodeRef; 4]> {
    match children {
        [Some(a), Some(b), Some(c), Some(d)] => Some([a, b, c, d]),
        _ => None,
    }
}

fn clamp_i32(v: f64) -> i32 {
    v.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}
