//! Material raster sampling.
//!
//! Material identity is a hard classification, so sampling ORs every raster
//! cell a query rectangle touches and never interpolates.

use glam::{DVec2, IVec2};
use terra_math::Rect;

use crate::error::TerrainError;
use crate::material::MaterialMask;

/// A 2D grid of material masks, row-major.
#[derive(Clone, Debug)]
pub struct MaterialRaster {
    width: u32,
    height: u32,
    cells: Vec<MaterialMask>,
}

impl MaterialRaster {
    /// Wrap row-major `cells` of a `width` x `height` raster.
    pub fn new(width: u32, height: u32, cells: Vec<MaterialMask>) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidRaster {
                layer: "material",
                reason: format!("empty raster {width}x{height}"),
            });
        }
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(TerrainError::InvalidRaster {
                layer: "material",
                reason: format!("expected {expected} cells, got {}", cells.len()),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// A raster where every cell has the same mask.
    pub fn filled(width: u32, height: u32, mask: MaterialMask) -> Result<Self, TerrainError> {
        Self::new(width, height, vec![mask; width as usize * height as usize])
    }

    /// Build a raster by evaluating `f(x, y)` for every cell.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> MaterialMask,
    ) -> Result<Self, TerrainError> {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self::new(width, height, cells)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Mask at a cell, or `None` outside the raster.
    pub fn get(&self, x: u32, y: u32) -> Option<MaterialMask> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// OR of all cells in `[begin, end)`, clamped to the raster bounds.
    pub fn gather(&self, begin: IVec2, end: IVec2) -> MaterialMask {
        let size = IVec2::new(self.width as i32, self.height as i32);
        let begin = begin.clamp(IVec2::ZERO, size);
        let end = end.clamp(IVec2::ZERO, size);

        let mut mask = MaterialMask::empty();
        for y in begin.y..end.y {
            let row = y as usize * self.width as usize;
            for x in begin.x..end.x {
                mask |= self.cells[row + x as usize];
            }
        }
        mask
    }
}

/// A material raster placed in world space.
#[derive(Clone, Debug)]
pub struct MaterialLayer {
    raster: MaterialRaster,
    origin: DVec2,
    resolution: f64,
    margin: u32,
}

impl MaterialLayer {
    /// Place `raster` with its first cell at `origin`, each cell `resolution` metres wide.
    pub fn new(
        raster: MaterialRaster,
        origin: DVec2,
        resolution: f64,
    ) -> Result<Self, TerrainError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(TerrainError::InvalidRaster {
                layer: "material",
                reason: format!("resolution must be positive and finite, got {resolution}"),
            });
        }
        if !origin.is_finite() {
            return Err(TerrainError::InvalidRaster {
                layer: "material",
                reason: "origin is not finite".to_string(),
            });
        }
        Ok(Self {
            raster,
            origin,
            resolution,
            margin: 0,
        })
    }

    /// Gather `margin` extra cells on every side of a query, so tiles also see
    /// the classification of the cells they share an edge with.
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn raster(&self) -> &MaterialRaster {
        &self.raster
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World rectangle covered by the raster.
    pub fn bounds(&self) -> Rect {
        let size = DVec2::new(self.raster.width as f64, self.raster.height as f64);
        Rect::new(self.origin, size * self.resolution)
    }

    /// OR of every raster cell covered by `area`. Empty when `area` lies outside the raster.
    pub fn material_bits(&self, area: &Rect) -> MaterialMask {
        let begin = ((area.origin - self.origin) / self.resolution).floor();
        let end = ((area.end() - self.origin) / self.resolution).ceil();

        let margin = IVec2::splat(i32::try_from(self.margin).unwrap_or(i32::MAX));
        let begin = to_cell(begin).saturating_sub(margin);
        let end = to_cell(end).saturating_add(margin);
        self.raster.gather(begin, end)
    }
}

/// Saturating conversion of an already-rounded cell coordinate.
fn to_cell(v: DVec2) -> IVec2 {
    let clamp = |c: f64| c.clamp(i32::MIN as f64 / 2.0, i32::MAX as f64 / 2.0) as i32;
    IVec2::new(clamp(v.x), clamp(v.y))
}

/// Material classification for the whole terrain: a detail layer plus an
/// optional coarser base layer covering a wider area.
#[derive(Clone, Debug)]
pub struct MaterialMap {
    detail: MaterialLayer,
    base: Option<MaterialLayer>,
}

impl MaterialMap {
    pub fn new(detail: MaterialLayer) -> Self {
        Self { detail, base: None }
    }

    /// Add a base layer whose classification is ORed with the detail layer.
    pub fn with_base_layer(mut self, base: MaterialLayer) -> Self {
        self.base = Some(base);
        self
    }

    pub fn detail_layer(&self) -> &MaterialLayer {
        &self.detail
    }

    pub fn base_layer(&self) -> Option<&MaterialLayer> {
        self.base.as_ref()
    }

    /// OR of both layers over `area`. May be empty.
    pub fn material_bits(&self, area: &Rect) -> MaterialMask {
        let mut mask = self.detail.material_bits(area);
        if let Some(base) = &self.base {
            mask |= base.material_bits(area);
        }
        mask
    }

    /// Like [`material_bits`](Self::material_bits) but never empty: unclassified
    /// areas are treated as water.
    pub fn classify(&self, area: &Rect) -> MaterialMask {
        self.material_bits(area).or_water()
    }
}
