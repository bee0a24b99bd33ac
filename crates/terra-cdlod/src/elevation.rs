//! Elevation input consumed once at build time.

use glam::{IVec2, UVec2};
use terra_math::ceil_power_of_two;

use crate::error::TerrainError;

/// A 2D height field addressed by integer grid coordinate.
///
/// Grid cell `(0, 0)` sits at the world origin; one cell spans
/// `meters_per_grid` metres.
pub trait ElevationSource {
    /// Number of samples along x and y.
    fn size(&self) -> UVec2;

    /// Height in metres at a sample inside [`size`](Self::size).
    fn elevation(&self, x: u32, y: u32) -> f32;

    /// Highest sample in `[begin, end)`, clamped to the field.
    /// Returns `None` when the range does not overlap the field.
    fn max_elevation(&self, begin: IVec2, end: IVec2) -> Option<f32> {
        let size = self.size().as_ivec2();
        let begin = begin.clamp(IVec2::ZERO, size);
        let end = end.clamp(IVec2::ZERO, size);

        let mut max: Option<f32> = None;
        for y in begin.y..end.y {
            for x in begin.x..end.x {
                let h = self.elevation(x as u32, y as u32);
                max = Some(max.map_or(h, |m| m.max(h)));
            }
        }
        max
    }
}

/// In-memory row-major height field.
#[derive(Clone, Debug)]
pub struct HeightField {
    size: UVec2,
    samples: Vec<f32>,
}

impl HeightField {
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, TerrainError> {
        let expected = width as usize * height as usize;
        if width == 0 || height == 0 || samples.len() != expected {
            return Err(TerrainError::InvalidRaster {
                layer: "elevation",
                reason: format!(
                    "{width}x{height} field needs {expected} samples, got {}",
                    samples.len()
                ),
            });
        }
        Ok(Self {
            size: UVec2::new(width, height),
            samples,
        })
    }

    /// A field where every sample has the same height.
    pub fn flat(width: u32, height: u32, value: f32) -> Result<Self, TerrainError> {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    /// Build a field by evaluating `f(x, y)` for every sample.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> Result<Self, TerrainError> {
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self::new(width, height, samples)
    }

    /// Extend the field to the next power-of-two size on each axis, filling new
    /// samples with 0. Existing samples keep their coordinates.
    pub fn padded_to_power_of_two(&self) -> Self {
        let new_size = UVec2::new(ceil_power_of_two(self.size.x), ceil_power_of_two(self.size.y));
        if new_size == self.size {
            return self.clone();
        }

        let mut samples = vec![0.0; new_size.x as usize * new_size.y as usize];
        for y in 0..self.size.y as usize {
            let src = y * self.size.x as usize;
            let dst = y * new_size.x as usize;
            samples[dst..dst + self.size.x as usize]
                .copy_from_slice(&self.samples[src..src + self.size.x as usize]);
        }
        Self {
            size: new_size,
            samples,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl ElevationSource for HeightField {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn elevation(&self, x: u32, y: u32) -> f32 {
        self.samples[y as usize * self.size.x as usize + x as usize]
    }
}

/// Reject fields that are not a power of two on both axes.
pub(crate) fn validate_power_of_two(source: &dyn ElevationSource) -> Result<(), TerrainError> {
    let size = source.size();
    for (what, value) in [("elevation width", size.x), ("elevation height", size.y)] {
        if !value.is_power_of_two() {
            return Err(TerrainError::NotPowerOfTwo { what, value });
        }
    }
    Ok(())
}
