//! Perspective camera for terrain rendering. World space is z-up.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3};
use terra_cdlod::TerrainCamera;
use terra_math::Aabb;

use crate::frustum::Frustum;

/// Camera uniform uploaded once per frame.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
}

/// A perspective camera with reverse-Z depth.
#[derive(Debug, Clone)]
pub struct ViewCamera {
    pub position: Vec3,
    /// Rotation from camera space (-Z forward, +Y up) to world space.
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl ViewCamera {
    /// Turn the camera to face `target`, keeping world +Z as up when possible.
    pub fn look_at(&mut self, target: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward == Vec3::ZERO {
            return;
        }
        // Straight up or down: fall back to +Y so the basis stays defined.
        let up = if forward.cross(Vec3::Z).length_squared() < 1e-8 {
            Vec3::Y
        } else {
            Vec3::Z
        };
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward));
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    /// Reverse-Z: near maps to depth 1, far to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y,
            self.aspect_ratio,
            self.far,  // swapped
            self.near, // swapped
        )
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    /// Snapshot of the camera for LOD selection.
    pub fn terrain_view(&self) -> TerrainView {
        TerrainView {
            position: self.position,
            frustum: Frustum::from_view_projection(&self.view_projection_matrix()),
        }
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            camera_pos: self.position.extend(1.0).to_array(),
        }
    }
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1_000.0),
            rotation: Quat::IDENTITY,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 16.0 / 9.0,
            near: 1.0,
            far: 200_000.0,
        }
    }
}

/// Position and frustum of a [`ViewCamera`] at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainView {
    pub position: Vec3,
    pub frustum: Frustum,
}

impl TerrainCamera for TerrainView {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn cull(&self, aabb: &Aabb) -> bool {
        !self.frustum.is_visible(aabb)
    }
}
