//! Error types for terrain construction and rendering.

use thiserror::Error;

use crate::arena::ArenaError;

/// Fatal errors raised while building a terrain. A terrain whose build failed
/// stays unbuilt and draws nothing.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("{what} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo { what: &'static str, value: u32 },

    #[error("max_level {level} exceeds the supported maximum of {max}")]
    DepthTooLarge { level: u8, max: u8 },

    #[error("root tile spans {cells} grid cells, more than the {max} addressable")]
    GridTooLarge { cells: u64, max: u64 },

    #[error("meters_per_grid must be positive")]
    ZeroGridResolution,

    #[error("base LOD distance must be positive and finite, got {0}")]
    InvalidLodDistance(f32),

    #[error("terrain origin ({x}, {y}) is not a multiple of the {cell} m grid")]
    MisalignedOrigin { x: f64, y: f64, cell: u32 },

    #[error("{layer} raster is malformed: {reason}")]
    InvalidRaster { layer: &'static str, reason: String },

    #[error("invalid detail level table: {0}")]
    InvalidDetailTable(String),

    #[error("terrain layers need {required} texture units but only {available} are available")]
    TooManyTextureUnits { required: u32, available: u32 },

    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Recoverable per-batch failures reported by the program factory or the client.
/// They leave a gap for one (material, detail level) pair and never abort a frame.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    #[error("program '{name}' failed to build: {message}")]
    ProgramCreation { name: String, message: String },

    #[error("unknown program handle {0}")]
    UnknownProgram(u64),

    #[error("draw failed: {0}")]
    Draw(String),
}
