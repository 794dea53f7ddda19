//! Tunable physics parameters, grouped by concern.
//!
//! Every parameter is a plain float with a 60 fps default; all units are
//! pixels/second or pixels/second^2, so the same values behave the same
//! at any simulated timestep.

mod air;
mod jumping;
mod rolling;
mod walking;

pub use air::AirConfig;
pub use jumping::JumpingConfig;
pub use rolling::RollingConfig;
pub use walking::WalkingConfig;

use bevy::prelude::*;

/// Frame rate the model parameters are tuned at.
pub const TARGET_FPS: f32 = 60.0;

/// The fixed simulation timestep.
pub const FIXED_TIMESTEP: f32 = 1.0 / TARGET_FPS;

/// The complete physics model of an actor.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct ActorConfig {
    /// Grounded movement.
    pub walking: WalkingConfig,
    /// Airborne movement.
    pub air: AirConfig,
    /// Jump impulses.
    pub jumping: JumpingConfig,
    /// Rolling and the spin charge.
    pub rolling: RollingConfig,

    /// Linearization `drag_rate(dt) = c0 * dt + c1` of
    /// `drag.powf(60 * dt)`, kept in sync with `air.drag`.
    air_drag_coefficient: [f32; 2],
}

impl Default for ActorConfig {
    fn default() -> Self {
        let mut config = Self {
            walking: WalkingConfig::default(),
            air: AirConfig::default(),
            jumping: JumpingConfig::default(),
            rolling: RollingConfig::default(),
            air_drag_coefficient: [0.0, 1.0],
        };
        config.set_air_drag(config.air.drag);
        config
    }
}

impl ActorConfig {
    /// Set the air drag ratio, clamped to [0, 1], and recompute the
    /// linearized per-tick coefficients.
    ///
    /// With `a = drag` in (0, 1), the exact per-tick rate is
    /// `a.powf(60 * dt)`; its first-order expansion around `dt = 1/60`
    /// is `c0 * dt + c1` with `c0 = 60 * a * ln(a)` and
    /// `c1 = a * (1 - ln(a))`, one multiply and one add on the hot path.
    pub fn set_air_drag(&mut self, drag: f32) {
        self.air.drag = drag.clamp(0.0, 1.0);

        if self.air.drag > 0.0 && self.air.drag < 1.0 {
            let ln = self.air.drag.ln();
            self.air_drag_coefficient = [
                TARGET_FPS * self.air.drag * ln,
                self.air.drag * (1.0 - ln),
            ];
        } else if self.air.drag > 0.0 {
            self.air_drag_coefficient = [0.0, 1.0];
        } else {
            self.air_drag_coefficient = [0.0, 0.0];
        }
    }

    /// The linearized air drag coefficients `[c0, c1]`.
    pub fn air_drag_coefficient(&self) -> [f32; 2] {
        self.air_drag_coefficient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_defaults() {
        let config = ActorConfig::default();
        assert_eq!(config.walking.top_speed, 360.0);
        assert_eq!(config.walking.cap_speed, 960.0);
        assert_eq!(config.jumping.impulse, -390.0);
        assert_eq!(config.jumping.release_speed, -240.0);
        assert_eq!(config.rolling.roll_threshold, 60.0);
        assert_eq!(config.rolling.unroll_threshold, 30.0);
        assert_eq!(config.air.gravity, 787.5);
        assert_eq!(config.air.drag, 31.0 / 32.0);
    }

    #[test]
    fn air_drag_is_clamped() {
        let mut config = ActorConfig::default();
        config.set_air_drag(2.0);
        assert_eq!(config.air.drag, 1.0);
        config.set_air_drag(-0.5);
        assert_eq!(config.air.drag, 0.0);
    }

    #[test]
    fn air_drag_coefficients_match_the_formula() {
        let mut config = ActorConfig::default();

        config.set_air_drag(0.5);
        let [c0, c1] = config.air_drag_coefficient();
        assert!((c0 - 60.0 * 0.5 * 0.5f32.ln()).abs() < 1e-4);
        assert!((c1 - 0.5 * (1.0 - 0.5f32.ln())).abs() < 1e-4);

        // The linearization is exact at dt = 1/60.
        let rate = c0 * FIXED_TIMESTEP + c1;
        assert!((rate - 0.5).abs() < 1e-4);
    }

    #[test]
    fn degenerate_air_drag_coefficients() {
        let mut config = ActorConfig::default();

        config.set_air_drag(1.0);
        assert_eq!(config.air_drag_coefficient(), [0.0, 1.0]);

        config.set_air_drag(0.0);
        assert_eq!(config.air_drag_coefficient(), [0.0, 0.0]);
    }
}
