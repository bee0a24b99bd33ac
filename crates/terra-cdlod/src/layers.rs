//! Height/normal map layers bound alongside the terrain programs, and the
//! texture units they occupy.

use glam::{DVec2, UVec2};

use crate::error::TerrainError;

pub const DETAIL_LAYER_PREFIX: &str = "terrain.detail_layer.";
pub const BASE_LAYER_PREFIX: &str = "terrain.base_layer.";

/// Texture maps every layer carries, in binding order.
pub const LAYER_MAPS: [&str; 2] = ["height_map", "normal_map"];

/// Dimensions of the raster a layer's maps are generated from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerSource {
    pub size_px: UVec2,
    /// World metres per pixel.
    pub resolution_m: f64,
}

impl LayerSource {
    pub fn new(size_px: UVec2, resolution_m: f64) -> Self {
        Self {
            size_px,
            resolution_m,
        }
    }

    pub fn size_m(&self) -> DVec2 {
        self.size_px.as_dvec2() * self.resolution_m
    }
}

/// One texture of a layer and the unit it is bound to.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureMapBinding {
    pub name: &'static str,
    pub unit: u32,
    pub resolution_m: f64,
    pub size_px: UVec2,
    pub size_m: DVec2,
}

/// A group of terrain textures sharing a world placement and uniform prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainLayer {
    pub uniform_prefix: &'static str,
    pub origin_m: DVec2,
    pub size_m: DVec2,
    pub texture_maps: Vec<TextureMapBinding>,
}

impl TerrainLayer {
    /// Uniform name of a layer-wide field, e.g. `terrain.base_layer.origin_m`.
    pub fn uniform(&self, field: &str) -> String {
        format!("{}{field}", self.uniform_prefix)
    }

    /// Uniform name of a per-map field, e.g. `terrain.detail_layer.height_map.sampler`.
    pub fn map_uniform(&self, map: &TextureMapBinding, field: &str) -> String {
        format!("{}{}.{field}", self.uniform_prefix, map.name)
    }

    pub fn map(&self, name: &str) -> Option<&TextureMapBinding> {
        self.texture_maps.iter().find(|map| map.name == name)
    }
}

/// Hands out consecutive texture units up to a fixed ceiling.
#[derive(Clone, Copy, Debug)]
pub struct TextureUnitAllocator {
    next: u32,
    max_units: u32,
}

impl TextureUnitAllocator {
    pub fn new(max_units: u32) -> Self {
        Self { next: 0, max_units }
    }

    /// Reserve `count` units. Fails without reserving anything if they do not fit.
    pub fn reserve(&mut self, count: u32) -> Result<u32, TerrainError> {
        let required = self.next.saturating_add(count);
        if required > self.max_units {
            return Err(TerrainError::TooManyTextureUnits {
                required,
                available: self.max_units,
            });
        }
        let first = self.next;
        self.next = required;
        Ok(first)
    }

    pub fn used(&self) -> u32 {
        self.next
    }
}

/// Lay out the detail layer at the world origin and the optional base layer
/// at `base_origin`, reserving one texture unit per map.
pub fn build_layers(
    detail: LayerSource,
    base: Option<LayerSource>,
    base_origin: DVec2,
    units: &mut TextureUnitAllocator,
) -> Result<Vec<TerrainLayer>, TerrainError> {
    let layer_count = 1 + u32::from(base.is_some());
    let first = units.reserve(layer_count * LAYER_MAPS.len() as u32)?;

    let mut layers = Vec::with_capacity(layer_count as usize);
    let mut unit = first;
    let mut push_layer = |prefix: &'static str, source: LayerSource, origin: DVec2| {
        let texture_maps = LAYER_MAPS
            .iter()
            .map(|&name| {
                let binding = TextureMapBinding {
                    name,
                    unit,
                    resolution_m: source.resolution_m,
                    size_px: source.size_px,
                    size_m: source.size_m(),
                };
                unit += 1;
                binding
            })
            .collect();
        layers.push(TerrainLayer {
            uniform_prefix: prefix,
            origin_m: origin,
            size_m: source.size_m(),
            texture_maps,
        });
    };

    push_layer(DETAIL_LAYER_PREFIX, detail, DVec2::ZERO);
    if let Some(base) = base {
        push_layer(BASE_LAYER_PREFIX, base, base_origin);
    }
    Ok(layers)
}
