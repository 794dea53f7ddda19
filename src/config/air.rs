//! Configuration for airborne movement.

use bevy::prelude::*;

use super::TARGET_FPS;

/// Configuration for airborne movement.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct AirConfig {
    /// Horizontal acceleration while airborne (px/s^2).
    pub acceleration: f32,

    /// Gravity (px/s^2).
    pub gravity: f32,

    /// Terminal fall speed (px/s).
    pub top_y_speed: f32,

    /// Horizontal drag ratio applied per 1/60 s while rising near the
    /// apex, in [0, 1]. 1 disables drag; 0 kills horizontal speed on the
    /// first qualifying tick. Set through
    /// [`ActorConfig::set_air_drag`](super::ActorConfig::set_air_drag) so
    /// the linearized coefficients stay in sync.
    pub drag: f32,

    /// Drag only applies while rising slower than this (px/s, negative).
    pub drag_threshold: f32,

    /// Drag only applies at horizontal speeds at or above this (px/s).
    pub drag_x_threshold: f32,
}

impl Default for AirConfig {
    fn default() -> Self {
        Self {
            acceleration: (6.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            gravity: (14.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            top_y_speed: 16.0 * TARGET_FPS,
            drag: 31.0 / 32.0,
            drag_threshold: -4.0 * TARGET_FPS,
            drag_x_threshold: (8.0 / 64.0) * TARGET_FPS,
        }
    }
}
