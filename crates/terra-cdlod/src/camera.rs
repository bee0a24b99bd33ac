use glam::Vec3;
use terra_math::Aabb;

/// What node selection needs to know about the viewer.
pub trait TerrainCamera {
    /// Eye position in world space, same frame as the node bounding boxes.
    fn position(&self) -> Vec3;

    /// True if `aabb` is entirely outside the view volume.
    fn cull(&self, aabb: &Aabb) -> bool;
}

/// Camera that sees everything. Handy for tools and tests that only care
/// about distance-based selection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OmniCamera {
    pub position: Vec3,
}

impl OmniCamera {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }
}

impl TerrainCamera for OmniCamera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn cull(&self, _aabb: &Aabb) -> bool {
        false
    }
}
