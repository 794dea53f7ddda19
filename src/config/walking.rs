//! Configuration for grounded movement.

use bevy::prelude::*;

use super::TARGET_FPS;

/// Configuration for grounded movement.
///
/// Units are pixels/second and pixels/second^2; the defaults reproduce
/// the classic 60 fps tuning independently of the simulated timestep.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct WalkingConfig {
    /// Ground acceleration while holding a direction (px/s^2).
    pub acceleration: f32,

    /// Deceleration while holding the opposite direction (px/s^2).
    pub deceleration: f32,

    /// Friction with no directional input (px/s^2).
    pub friction: f32,

    /// Top speed reachable under the actor's own power (px/s).
    pub top_speed: f32,

    /// Hard cap on ground speed, slopes and springs included (px/s).
    pub cap_speed: f32,

    /// Slope force pulling the actor downhill (px/s^2).
    pub slope_factor: f32,

    /// Ground speed below which the actor counts as standing (px/s).
    pub walk_threshold: f32,

    /// Ground speed at which turning around plays the brake skid (px/s).
    pub braking_threshold: f32,

    /// Ground speed below which the actor falls off walls and ceilings
    /// (px/s).
    pub fall_off_threshold: f32,

    /// Seconds of stillness before the impatient animation.
    pub wait_time: f32,
}

impl Default for WalkingConfig {
    fn default() -> Self {
        Self {
            acceleration: (3.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            deceleration: 0.5 * TARGET_FPS * TARGET_FPS,
            friction: (3.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            top_speed: 6.0 * TARGET_FPS,
            cap_speed: 16.0 * TARGET_FPS,
            slope_factor: (8.0 / 64.0) * TARGET_FPS * TARGET_FPS,
            walk_threshold: 0.5 * TARGET_FPS,
            braking_threshold: 4.0 * TARGET_FPS,
            fall_off_threshold: 2.5 * TARGET_FPS,
            wait_time: 3.0,
        }
    }
}
