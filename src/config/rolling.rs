//! Configuration for rolling and the spin charge.

use bevy::prelude::*;

use super::TARGET_FPS;

/// Configuration for rolling and the charge-and-release spin.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct RollingConfig {
    /// Rolling friction (px/s^2). Lower than walking friction, so a
    /// ball keeps its momentum longer.
    pub friction: f32,

    /// Deceleration while steering against the roll (px/s^2).
    pub deceleration: f32,

    /// Slope force while rolling uphill (px/s^2).
    pub uphill_slope_factor: f32,

    /// Slope force while rolling downhill (px/s^2).
    pub downhill_slope_factor: f32,

    /// Minimum ground speed to curl into a roll (px/s).
    pub roll_threshold: f32,

    /// Ground speed below which the roll ends (px/s).
    pub unroll_threshold: f32,

    /// Release speed of a fully charged spin (px/s). Zero disables the
    /// charge move entirely.
    pub charge_speed: f32,

    /// Charge intensity below which the stored charge stops decaying.
    pub charge_threshold: f32,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            friction: (3.0 / 128.0) * TARGET_FPS * TARGET_FPS,
            deceleration: (8.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            uphill_slope_factor: (5.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            downhill_slope_factor: (20.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            roll_threshold: 1.0 * TARGET_FPS,
            unroll_threshold: 0.5 * TARGET_FPS,
            charge_speed: 12.0 * TARGET_FPS,
            charge_threshold: 1.0 / 64.0,
        }
    }
}
