//! Continuous distance-dependent level of detail (CDLOD) terrain.
//!
//! A [`Quadtree`] is built once from an [`ElevationSource`] and a
//! [`MaterialMap`]. Every frame the [`LodSelector`] walks it from the root
//! with the current camera and queues the visible nodes into a [`RenderList`],
//! which groups them by material and detail level so that each group is drawn
//! with one instanced call. [`CdlodTerrain`] wires these together behind the
//! [`TerrainRenderer`] trait.

pub mod arena;
pub mod batch;
pub mod camera;
pub mod detail;
pub mod elevation;
pub mod error;
pub mod layers;
pub mod material;
pub mod material_map;
pub mod params;
pub mod quadtree;
pub mod selector;
pub mod terrain;

pub use arena::{ArenaError, BLOCK_SIZE, BlockArena, NodeRef};
pub use batch::{
    BatchKey, NodeInstance, ProgramFactory, ProgramHandle, ProgramVariant, RenderBatch,
    RenderList,
};
pub use camera::{OmniCamera, TerrainCamera};
pub use detail::{DetailLevel, DetailLevelTable};
pub use elevation::{ElevationSource, HeightField};
pub use error::{RenderError, TerrainError};
pub use layers::{
    BASE_LAYER_PREFIX, DETAIL_LAYER_PREFIX, LayerSource, TerrainLayer, TextureMapBinding,
    TextureUnitAllocator,
};
pub use material::{DetailFeatures, MaterialMask};
pub use material_map::{MaterialLayer, MaterialMap, MaterialRaster};
pub use params::{LodParams, MAX_SUPPORTED_LEVEL};
pub use quadtree::{Node, Quadtree};
pub use selector::{LodSelector, SelectionStats};
pub use terrain::{
    BuildParameters, CdlodTerrain, DrawCommand, DrawStats, FrameStats, TerrainClient,
    TerrainRenderer, TerrainUniforms,
};
