//! Distance-to-feature table deciding which optional shader features a node gets.

use terra_config::TerrainConfig;

use crate::error::TerrainError;
use crate::material::DetailFeatures;

/// One row of the table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetailLevel {
    /// Nodes at or closer than this distance may use the level.
    pub distance: f64,
    pub features: DetailFeatures,
}

impl DetailLevel {
    pub const fn new(distance: f64, features: DetailFeatures) -> Self {
        Self { distance, features }
    }
}

/// Ordered detail levels, coarsest first.
///
/// Entry 0 has threshold 0 and is the fallback for every distance; later
/// entries have strictly decreasing thresholds and enable more features.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailLevelTable {
    levels: Vec<DetailLevel>,
}

impl Default for DetailLevelTable {
    fn default() -> Self {
        Self {
            levels: vec![
                DetailLevel::new(0.0, DetailFeatures::empty()),
                DetailLevel::new(40_000.0, DetailFeatures::LAND),
                DetailLevel::new(15_000.0, DetailFeatures::LAND.union(DetailFeatures::FOREST)),
                DetailLevel::new(
                    5_000.0,
                    DetailFeatures::LAND
                        .union(DetailFeatures::WATER)
                        .union(DetailFeatures::FOREST),
                ),
                DetailLevel::new(2_000.0, DetailFeatures::all()),
            ],
        }
    }
}

impl DetailLevelTable {
    pub fn new(levels: Vec<DetailLevel>) -> Result<Self, TerrainError> {
        let Some(first) = levels.first() else {
            return Err(TerrainError::InvalidDetailTable("table is empty".into()));
        };
        if first.distance != 0.0 {
            return Err(TerrainError::InvalidDetailTable(format!(
                "first entry must have distance 0, got {}",
                first.distance
            )));
        }
        for (i, pair) in levels.windows(2).enumerate() {
            let (prev, next) = (pair[0].distance, pair[1].distance);
            if !next.is_finite() || next <= 0.0 {
                return Err(TerrainError::InvalidDetailTable(format!(
                    "entry {} has non-positive distance {next}",
                    i + 1
                )));
            }
            if i > 0 && next >= prev {
                return Err(TerrainError::InvalidDetailTable(format!(
                    "entry {} distance {next} is not below {prev}",
                    i + 1
                )));
            }
        }
        Ok(Self { levels })
    }

    pub fn from_config(config: &TerrainConfig) -> Result<Self, TerrainError> {
        let levels = config
            .detail_levels
            .iter()
            .map(|row| DetailLevel::new(row.distance_m, row.features.iter().copied().collect()))
            .collect();
        Self::new(levels)
    }

    /// Highest level whose threshold is at least `distance`, or 0.
    pub fn detail_level_at(&self, distance: f64) -> usize {
        self.levels
            .iter()
            .rposition(|level| level.distance >= distance)
            .unwrap_or(0)
    }

    pub fn get(&self, index: usize) -> Option<&DetailLevel> {
        self.levels.get(index)
    }

    /// Features of level `index`, empty for an index past the table.
    pub fn features(&self, index: usize) -> DetailFeatures {
        self.get(index).map(|l| l.features).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false for a validated table.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[DetailLevel] {
        &self.levels
    }
}
