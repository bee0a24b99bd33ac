//! Geometry primitives shared by the terrain crates: bounding boxes, world-space
//! rectangles and power-of-two helpers.

mod aabb;
mod pow2;
mod rect;

pub use aabb::Aabb;
pub use pow2::{ceil_power_of_two, is_power_of_two, pow2_f32, pow2_f64};
pub use rect::Rect;
