use glam::DVec2;

/// Axis-aligned rectangle on the ground plane, in f64 world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Minimum corner.
    pub origin: DVec2,
    /// Size along x and y. Never negative.
    pub extent: DVec2,
}

impl Rect {
    /// Create a rectangle from its minimum corner and size.
    pub fn new(origin: DVec2, extent: DVec2) -> Self {
        Self {
            origin,
            extent: extent.abs(),
        }
    }

    /// A square of edge length `size` starting at `origin`.
    pub fn square(origin: DVec2, size: f64) -> Self {
        Self::new(origin, DVec2::splat(size))
    }

    /// Maximum corner.
    pub fn end(&self) -> DVec2 {
        self.origin + self.extent
    }

    /// Returns true if `other` overlaps this rectangle with a non-zero area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.origin.cmplt(other.end()).all() && other.origin.cmplt(self.end()).all()
    }
}
