//! Procedural elevation and material rasters for the headless run.

use glam::{DVec2, UVec2};
use noise::{NoiseFn, Simplex};
use terra_cdlod::{
    ElevationSource, HeightField, LayerSource, MaterialLayer, MaterialMap, MaterialMask,
    MaterialRaster, TerrainError,
};

/// Height samples per material raster cell along each axis.
pub const MATERIAL_CELL_SAMPLES: u32 = 4;
/// Base layer pixels are this many material cells wide.
pub const BASE_LAYER_FACTOR: u32 = 8;
/// Heights below this are water.
pub const SEA_LEVEL_M: f32 = 0.0;

/// Fractal Brownian motion over simplex noise.
pub struct Fbm {
    noise: Simplex,
    pub octaves: u32,
    pub base_frequency: f64,
    pub amplitude: f64,
}

impl Fbm {
    pub fn new(seed: u32, base_frequency: f64, amplitude: f64) -> Self {
        Self {
            noise: Simplex::new(seed),
            octaves: 6,
            base_frequency,
            amplitude,
        }
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.base_frequency;
        let mut amplitude = self.amplitude;
        for _ in 0..self.octaves {
            total += self.noise.get([x * frequency, y * frequency]) * amplitude;
            frequency *= 2.0;
            amplitude *= 0.5;
        }
        total
    }
}

/// Everything the terrain is built from.
pub struct World {
    pub elevation: HeightField,
    pub materials: MaterialMap,
    pub base_layer: LayerSource,
}

/// `size x size` height samples, `meters_per_grid` apart, starting at the world
/// origin. Sizes that are not a power of two are padded with sea-level samples.
pub fn generate(
    seed: u32,
    size: u32,
    meters_per_grid: f64,
    margin: u32,
) -> Result<World, TerrainError> {
    let relief = Fbm::new(seed, 1.0 / 40_000.0, 1_500.0);
    let elevation = HeightField::from_fn(size, size, |x, y| {
        relief.sample(f64::from(x) * meters_per_grid, f64::from(y) * meters_per_grid) as f32
    })?
    .padded_to_power_of_two();
    let side = elevation.size().x.max(elevation.size().y);

    let forest = Fbm::new(seed.wrapping_add(1), 1.0 / 15_000.0, 1.0);
    let cell_m = meters_per_grid * f64::from(MATERIAL_CELL_SAMPLES);

    let detail_side = side.div_ceil(MATERIAL_CELL_SAMPLES);
    let detail = MaterialRaster::from_fn(detail_side, detail_side, |x, y| {
        classify_block(&elevation, &forest, x, y, MATERIAL_CELL_SAMPLES, meters_per_grid)
    })?;

    let materials =
        MaterialMap::new(MaterialLayer::new(detail, DVec2::ZERO, cell_m)?.with_margin(margin));

    // Overview texture: one pixel per BASE_LAYER_FACTOR detail cells.
    let base_side = detail_side.div_ceil(BASE_LAYER_FACTOR);
    let base_layer = LayerSource::new(
        UVec2::splat(base_side),
        cell_m * f64::from(BASE_LAYER_FACTOR),
    );

    Ok(World {
        elevation,
        materials,
        base_layer,
    })
}

/// Material bits of the `samples x samples` block of height samples at cell `(cx, cy)`.
fn classify_block(
    field: &HeightField,
    forest: &Fbm,
    cx: u32,
    cy: u32,
    samples: u32,
    meters_per_grid: f64,
) -> MaterialMask {
    let size = field.size();
    let mut mask = MaterialMask::empty();
    for y in cy * samples..((cy + 1) * samples).min(size.y) {
        for x in cx * samples..((cx + 1) * samples).min(size.x) {
            if field.elevation(x, y) < SEA_LEVEL_M {
                mask |= MaterialMask::WATER;
            } else {
                mask |= MaterialMask::LAND;
                let wx = f64::from(x) * meters_per_grid;
                let wy = f64::from(y) * meters_per_grid;
                if forest.sample(wx, wy) > 0.25 {
                    mask |= MaterialMask::FOREST;
                }
            }
        }
    }
    if mask.contains(MaterialMask::LAND | MaterialMask::WATER) {
        mask |= MaterialMask::COAST;
    }
    mask
}
