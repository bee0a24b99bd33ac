//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments shared by the terrain tools.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "terra", about = "CDLOD terrain tools")]
pub struct CliArgs {
    /// Level of the quadtree root.
    #[arg(long)]
    pub max_level: Option<u8>,

    /// Distance at which level-1 nodes refine into leaves, in metres.
    #[arg(long)]
    pub base_lod_distance: Option<f32>,

    /// Draw distance in metres (0 disables the limit).
    #[arg(long)]
    pub draw_distance: Option<f32>,

    /// Force the coarsest detail level.
    #[arg(long)]
    pub low_detail: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(level) = args.max_level {
            self.terrain.max_level = level;
        }
        if let Some(distance) = args.base_lod_distance {
            self.terrain.base_lod_distance_m = distance;
        }
        if let Some(distance) = args.draw_distance {
            self.render.draw_distance_m = distance;
        }
        if let Some(low) = args.low_detail {
            self.render.low_detail = low;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            max_level: Some(6),
            draw_distance: Some(250_000.0),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.terrain.max_level, 6);
        assert_eq!(config.render.draw_distance_m, 250_000.0);
        // Non-overridden fields retain defaults
        assert_eq!(config.terrain.mesh_grid_size, 64);
        assert!(!config.render.low_detail);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "terra",
            "--max-level",
            "3",
            "--low-detail",
            "true",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.max_level, Some(3));
        assert_eq!(args.low_detail, Some(true));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.config.is_none());
    }
}
