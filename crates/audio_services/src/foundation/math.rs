//! Math utilities and types
//!
//! Provides the small set of math types the audio layer needs for placing
//! sound emitters in world space.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Math utility functions
pub mod utils {
    /// Clamp a value between min and max
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        if value < min { min } else if value > max { max } else { value }
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Linear interpolation with `t` clamped to `[0, 1]`
    pub fn lerp_clamped(a: f32, b: f32, t: f32) -> f32 {
        lerp(a, b, clamp(t, 0.0, 1.0))
    }
}
