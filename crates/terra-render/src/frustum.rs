//! View frustum culling of quadtree node boxes.

use glam::{Mat4, Vec3, Vec4};
use terra_math::Aabb;

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Six inward-facing planes extracted from a reverse-Z view-projection matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Frustum {
    /// `(a, b, c, d)`: unit inward normal and offset. A degenerate plane (the
    /// far plane of an infinite projection) is all zero except `d` and accepts
    /// every point.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Griggs-Hartmann plane extraction for clip depth in `[0, w]` with the
    /// near plane at `z = w`.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[3] - rows[2];
        planes[FAR] = rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// True if `aabb` is at least partially inside. Conservative near the
    /// frustum corners.
    pub fn is_visible(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            // Corner furthest along the normal.
            let p = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            normal.dot(p) + plane.w >= 0.0
        })
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }
}
