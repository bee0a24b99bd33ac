//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Terrain build constants.
    pub terrain: TerrainConfig,
    /// Per-frame rendering settings.
    pub render: RenderConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Constants that shape the terrain quadtree. Read once at build time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Level of the root node. The tree holds `4^max_level` leaves.
    pub max_level: u8,
    /// Grid cells along one edge of a leaf tile. Must be a power of two.
    pub mesh_grid_size: u32,
    /// World metres covered by one grid cell.
    pub meters_per_grid: u32,
    /// Distance at which level-1 nodes refine into leaves; doubles per level.
    pub base_lod_distance_m: f32,
    /// Distance-to-feature table, coarsest entry first.
    pub detail_levels: Vec<DetailLevelConfig>,
    /// Upper bound on texture units the terrain layers may claim.
    pub max_texture_units: u32,
    /// Extra material raster cells gathered around each leaf footprint.
    pub material_margin_cells: u32,
}

/// Optional rendering feature groups enabled by a detail level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DetailFeature {
    Land,
    Water,
    Forest,
    Coast,
}

/// One row of the detail-level table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailLevelConfig {
    /// Nodes closer than this (inclusive) may use this level.
    pub distance_m: f64,
    /// Feature groups enabled at this level.
    pub features: Vec<DetailFeature>,
}

/// Per-frame rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Nodes farther than this are not drawn. 0 disables the limit.
    pub draw_distance_m: f32,
    /// Force the coarsest detail level for every node.
    pub low_detail: bool,
    /// Base name handed to the program factory (`<name>_cdlod`).
    pub program_name: String,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log selection statistics every frame.
    pub log_frame_stats: bool,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            max_level: 8,
            mesh_grid_size: 64,
            meters_per_grid: 200,
            base_lod_distance_m: 40_000.0,
            detail_levels: vec![
                DetailLevelConfig {
                    distance_m: 0.0,
                    features: vec![],
                },
                DetailLevelConfig {
                    distance_m: 40_000.0,
                    features: vec![DetailFeature::Land],
                },
                DetailLevelConfig {
                    distance_m: 15_000.0,
                    features: vec![DetailFeature::Land, DetailFeature::Forest],
                },
                DetailLevelConfig {
                    distance_m: 5_000.0,
                    features: vec![
                        DetailFeature::Land,
                        DetailFeature::Water,
                        DetailFeature::Forest,
                    ],
                },
                DetailLevelConfig {
                    distance_m: 2_000.0,
                    features: vec![
                        DetailFeature::Land,
                        DetailFeature::Water,
                        DetailFeature::Forest,
                        DetailFeature::Coast,
                    ],
                },
            ],
            max_texture_units: 16,
            material_margin_cells: 1,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            draw_distance_m: 0.0,
            low_detail: false,
            program_name: "terrain".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_frame_stats: false,
        }
    }
}

/// Platform config directory for this workspace (`<config_dir>/terra`).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("terra"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::Parse)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::Write)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::Write)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    ///
    /// Terrain constants in the new config only take effect on the next rebuild.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::Parse)?;

        if &new_config != self {
            if new_config.terrain != self.terrain {
                log::info!("Terrain constants changed; a rebuild is required to apply them");
            }
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("mesh_grid_size: 64"));
        assert!(ron_str.contains("Forest"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_default_detail_table_matches_reference_distances() {
        let terrain = TerrainConfig::default();
        let distances: Vec<f64> = terrain.detail_levels.iter().map(|l| l.distance_m).collect();
        assert_eq!(distances, vec![0.0, 40_000.0, 15_000.0, 5_000.0, 2_000.0]);
        assert!(terrain.detail_levels[0].features.is_empty());
        assert_eq!(terrain.detail_levels[4].features.len(), 4);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(terrain: (max_level: 4))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.terrain.max_level, 4);
        assert_eq!(config.terrain.mesh_grid_size, 64);
        assert_eq!(config.render, RenderConfig::default());
    }

    #[test]
    fn test_custom_detail_levels_parse() {
        let ron_str = "(terrain: (detail_levels: [\
            (distance_m: 0.0, features: []),\
            (distance_m: 500.0, features: [Land, Water]),\
        ]))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.terrain.detail_levels.len(), 2);
        assert_eq!(
            config.terrain.detail_levels[1].features,
            vec![DetailFeature::Land, DetailFeature::Water]
        );
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.terrain.max_level = 5;
        config.render.draw_distance_m = 150_000.0;
        config.render.program_name = "editor_terrain".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.render.low_detail = true;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert!(result.unwrap().render.low_detail);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
