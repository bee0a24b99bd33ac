//! Scripted camera path: one lap around the terrain centre, descending from
//! a high overview to low altitude.

use std::f32::consts::TAU;

use glam::Vec3;
use terra_render::ViewCamera;

pub struct Flight {
    center: Vec3,
    radius: f32,
    frames: u32,
    camera: ViewCamera,
}

impl Flight {
    pub fn new(extent_m: f32, frames: u32) -> Self {
        let camera = ViewCamera {
            far: extent_m * 4.0,
            ..ViewCamera::default()
        };
        Self {
            center: Vec3::new(extent_m * 0.5, extent_m * 0.5, 0.0),
            radius: extent_m * 0.35,
            frames: frames.max(1),
            camera,
        }
    }

    /// Fraction of the lap completed at `frame`, in `[0, 1)`.
    pub fn progress(&self, frame: u32) -> f32 {
        (frame % self.frames) as f32 / self.frames as f32
    }

    pub fn camera(&mut self, frame: u32) -> &ViewCamera {
        let t = self.progress(frame);
        let angle = t * TAU;
        let altitude = self.radius * (1.0 - t).max(0.02);
        let orbit = Vec3::new(angle.cos(), angle.sin(), 0.0) * self.radius;
        self.camera.position = self.center + orbit + Vec3::Z * altitude;
        // Look a quarter lap ahead, down at the ground.
        let ahead = angle + TAU / 4.0;
        let target = self.center + Vec3::new(ahead.cos(), ahead.sin(), 0.0) * self.radius;
        self.camera.look_at(target);
        &self.camera
    }
}
