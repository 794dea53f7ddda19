//! Configuration for jump impulses.

use bevy::prelude::*;

use super::TARGET_FPS;

/// Configuration for jump impulses. Negative is upward (y grows down).
#[derive(Reflect, Debug, Clone, Copy)]
pub struct JumpingConfig {
    /// Initial jump velocity (px/s).
    pub impulse: f32,

    /// Velocity the jump is clamped to when the button is released
    /// before the apex (px/s). Enables short hops.
    pub release_speed: f32,

    /// Launch velocity of the death bounce (px/s), applied by the caller.
    pub death_impulse: f32,

    /// Launch velocity of the knockback after getting hit (px/s),
    /// applied by the caller.
    pub hit_impulse: f32,
}

impl Default for JumpingConfig {
    fn default() -> Self {
        Self {
            impulse: -6.5 * TARGET_FPS,
            release_speed: -4.0 * TARGET_FPS,
            death_impulse: -7.0 * TARGET_FPS,
            hit_impulse: -4.0 * TARGET_FPS,
        }
    }
}
