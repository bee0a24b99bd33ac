//! Quadtree sizing constants, fixed for the lifetime of a built terrain.

use glam::DVec2;
use terra_config::TerrainConfig;
use terra_math::{is_power_of_two, pow2_f32, pow2_f64};

use crate::error::TerrainError;

/// Deepest root level accepted. `4^12` leaves already covers a continent at
/// the default grid spacing.
pub const MAX_SUPPORTED_LEVEL: u8 = 12;

/// Grid cells along the root edge must fit signed 32-bit vertex coordinates.
pub const MAX_ROOT_GRID_CELLS: u64 = i32::MAX as u64;

/// Tile and distance parameters of the quadtree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodParams {
    /// Level of the root node; leaves are level 0.
    pub max_level: u8,
    /// Grid cells along one edge of a leaf tile.
    pub mesh_grid_size: u32,
    /// World metres per grid cell.
    pub meters_per_grid: u32,
    /// Refinement distance of level-1 nodes.
    pub base_lod_distance: f32,
}

impl Default for LodParams {
    fn default() -> Self {
        Self::from_terrain_config(&TerrainConfig::default())
    }
}

impl LodParams {
    fn from_terrain_config(config: &TerrainConfig) -> Self {
        Self {
            max_level: config.max_level,
            mesh_grid_size: config.mesh_grid_size,
            meters_per_grid: config.meters_per_grid,
            base_lod_distance: config.base_lod_distance_m,
        }
    }

    /// Read the constants from `config` and validate them.
    pub fn from_config(config: &TerrainConfig) -> Result<Self, TerrainError> {
        let params = Self::from_terrain_config(config);
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.max_level > MAX_SUPPORTED_LEVEL {
            return Err(TerrainError::DepthTooLarge {
                level: self.max_level,
                max: MAX_SUPPORTED_LEVEL,
            });
        }
        if !is_power_of_two(self.mesh_grid_size) {
            return Err(TerrainError::NotPowerOfTwo {
                what: "mesh_grid_size",
                value: self.mesh_grid_size,
            });
        }
        let cells = u64::from(self.mesh_grid_size) << self.max_level;
        if cells > MAX_ROOT_GRID_CELLS {
            return Err(TerrainError::GridTooLarge {
                cells,
                max: MAX_ROOT_GRID_CELLS,
            });
        }
        if self.meters_per_grid == 0 {
            return Err(TerrainError::ZeroGridResolution);
        }
        if !self.base_lod_distance.is_finite() || self.base_lod_distance <= 0.0 {
            return Err(TerrainError::InvalidLodDistance(self.base_lod_distance));
        }
        Ok(())
    }

    /// Edge length of a leaf tile in metres.
    pub fn leaf_size(&self) -> f64 {
        self.mesh_grid_size as f64 * self.meters_per_grid as f64
    }

    /// Edge length of a node at `level`.
    pub fn node_size(&self, level: u8) -> f64 {
        self.leaf_size() * pow2_f64(level as u32)
    }

    /// Edge length of the root node.
    pub fn root_size(&self) -> f64 {
        self.node_size(self.max_level)
    }

    /// Per-instance mesh scale for a node drawn at `lod`.
    pub fn node_scale(&self, lod: u8) -> f32 {
        pow2_f32(lod as u32)
    }

    /// Morph distance sent with each instance drawn at `lod`.
    pub fn lod_distance(&self, lod: u8) -> f32 {
        self.base_lod_distance * pow2_f32(lod as u32)
    }

    /// Distance below which a node at `level > 0` is split into its children.
    pub fn refine_distance(&self, level: u8) -> f32 {
        debug_assert!(level > 0);
        self.base_lod_distance * pow2_f32(level.saturating_sub(1) as u32)
    }

    /// Number of leaves in a full tree.
    pub fn leaf_count(&self) -> usize {
        1usize << (2 * self.max_level as u32)
    }

    /// Number of nodes in a full tree, `(4^(max_level+1) - 1) / 3`.
    pub fn node_count_limit(&self) -> usize {
        ((1usize << (2 * (self.max_level as u32 + 1))) - 1) / 3
    }

    /// Root origin that centres the tree on the world origin, snapped to the grid.
    pub fn centered_origin(&self) -> DVec2 {
        let cell = self.meters_per_grid.max(1) as f64;
        let half = self.root_size() / 2.0;
        DVec2::splat((-half / cell).floor() * cell)
    }

    /// Reject an origin that is not a whole number of grid cells.
    pub(crate) fn validate_origin(&self, origin: DVec2) -> Result<(), TerrainError> {
        let cell = self.meters_per_grid as f64;
        let grid = origin / cell;
        if !grid.is_finite() || grid != grid.floor() {
            return Err(TerrainError::MisalignedOrigin {
                x: origin.x,
                y: origin.y,
                cell: self.meters_per_grid,
            });
        }
        Ok(())
    }
}
