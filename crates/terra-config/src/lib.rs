//! Configuration for the terrain workspace.
//!
//! Settings persist to disk as RON files and can be overridden from the command
//! line. Terrain constants are read once when a terrain is built and stay fixed
//! for the lifetime of that build.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, DetailFeature, DetailLevelConfig, RenderConfig, TerrainConfig,
    default_config_dir,
};
pub use error::ConfigError;
