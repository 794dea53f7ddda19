//! The per-tick physics simulation.
//!
//! One tick runs a fixed sequence: read sensors, apply the special
//! states, resolve grounded/airborne dynamics, integrate, translate in
//! small sub-steps, respond to wall and ceiling hits, run sticky
//! physics, snap to the ground, reacquire the slope angle, and fix up
//! timers and states. Later stages consult flags cached by earlier ones
//! (sticky physics needs the previous tick's midair flag, for example),
//! so the order must not change.

use bevy::prelude::*;

use crate::actor::PhysicsActor;
use crate::angles::{self, SLOPE_LIMIT};
use crate::config::TARGET_FPS;
use crate::input::Button;
use crate::obstacle::{same_obstacle, GroundDirection, Obstacle, ObstacleMap};
use crate::sensor::SensorPose;
use crate::state::{ActorState, MovMode};

/// Clouds catch a foot sensor up to this many pixels past their surface.
const CLOUD_OFFSET: i32 = 12;

/// Reduce the jump impulse when jumping uphill. Kept off: the classic
/// tuning never shipped with it.
const WANT_JUMP_ATTENUATION: bool = false;

/// Sticky physics probes from this offset; a fraction of the sensor
/// height may behave better with resized sensors.
const STICKY_BASE_OFFSET: i32 = 4;

/// Sticky physics never probes farther than this below the feet.
const STICKY_MAX_OFFSET: i32 = 12;

const EPSILON: f32 = 1e-5;

#[inline]
fn nearly_zero(x: f32) -> bool {
    x.abs() < EPSILON
}

#[inline]
fn sign(x: f32) -> f32 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// What the six gated sensors saw after cloud filtering. Borrowed from
/// the obstacle map for the duration of the tick.
struct SensorReadings<'m> {
    at_a: Option<&'m dyn Obstacle>,
    at_b: Option<&'m dyn Obstacle>,
    at_c: Option<&'m dyn Obstacle>,
    at_d: Option<&'m dyn Obstacle>,
    at_m: Option<&'m dyn Obstacle>,
    at_n: Option<&'m dyn Obstacle>,
}

impl PhysicsActor {
    /// One simulation tick with timestep `dt`.
    pub(crate) fn run_simulation(&mut self, map: &dyn ObstacleMap, dt: f32) {
        let mut sensors = self.read_sensors(map);
        self.was_midair = self.midair;

        // Death: only gravity applies.
        if self.state.is_terminal() {
            self.ysp = (self.ysp + self.config.air.gravity * dt).min(self.config.air.top_y_speed);
            self.position.y += self.ysp * dt;
            self.facing_right = true;
            return;
        }

        self.getting_hit();
        self.waiting(dt);
        self.winning_brake();
        self.horizontal_control_lock(dt);
        self.update_facing();
        self.walk_and_run(dt);
        self.duck_and_look_up();
        self.springing();
        self.breathing(dt);
        self.balance_on_ledges(map, &sensors);
        self.rolling(dt);
        self.charge_and_release(dt);
        self.project_ground_speed();
        self.air_physics(dt);
        self.jumping(map, &mut sensors, dt);
        self.move_and_collide(map, &mut sensors, dt);
        self.land_after_getting_hit();
        self.wall_collision_response(map, &mut sensors);
        self.ceiling_collision_response(map, &mut sensors);
        self.sticky_physics(map, &mut sensors);
        self.snap_to_ground(map, &mut sensors);
        self.reacquire_ground();
        self.fall_off_walls_and_ceilings(map, &mut sensors);
        self.update_timers_and_fix_states(map, &mut sensors, dt);
    }

    // ==================== sensor reading & filtering ====================

    /// Gate, probe and filter the six collision sensors, then refresh the
    /// midair and ceiling flags. Must be called again after every change
    /// to the position or the angle.
    fn read_sensors<'m>(&mut self, map: &'m dyn ObstacleMap) -> SensorReadings<'m> {
        let (gsp, xsp, ysp, midair) = (self.gsp, self.xsp, self.ysp, self.midair);

        // A sensor that cannot cause a transition is not worth probing.
        let sensors = self.sensors_mut();
        if !midair {
            sensors.a.set_enabled(true);
            sensors.b.set_enabled(true);
            sensors.c.set_enabled(false);
            sensors.d.set_enabled(false);
            sensors.m.set_enabled(gsp < 0.0);
            sensors.n.set_enabled(gsp > 0.0);
        } else {
            sensors.a.set_enabled(ysp >= 0.0);
            sensors.b.set_enabled(ysp >= 0.0);
            sensors.c.set_enabled(ysp < 0.0);
            sensors.d.set_enabled(ysp < 0.0);
            sensors.m.set_enabled(xsp < 0.0);
            sensors.n.set_enabled(xsp > 0.0);
        }

        let position = self.position;
        let movmode = self.movmode;
        let layer = self.layer;

        let sensors = self.sensors();
        let mut at_a = sensors.a.check(position, movmode, layer, map);
        let mut at_b = sensors.b.check(position, movmode, layer, map);
        let at_c = sensors.c.check(position, movmode, layer, map);
        let at_d = sensors.d.check(position, movmode, layer, map);
        let at_m = sensors.m.check(position, movmode, layer, map);
        let at_n = sensors.n.check(position, movmode, layer, map);

        // C, D, M, N: clouds are not walls or ceilings.
        let at_c = at_c.filter(|o| o.is_solid());
        let at_d = at_d.filter(|o| o.is_solid());
        let at_m = at_m.filter(|o| o.is_solid());
        let at_n = at_n.filter(|o| o.is_solid());

        // A, B: never catch a cloud while jumping up through it.
        if ysp < 0.0 && -ysp > xsp.abs() {
            at_a = at_a.filter(|o| o.is_solid());
            at_b = at_b.filter(|o| o.is_solid());
        }

        // A, B: a cloud only counts while the sensor tail is inside it
        // and the actor has not already fallen through.
        if let Some(cloud) = at_a.filter(|o| !o.is_solid()) {
            let tail = sensors.a.tail(position, movmode);
            if !cloud.contains_point(tail.x, tail.y) {
                at_a = None;
            } else if midair && movmode == MovMode::Floor && self.angle == 0x0 {
                let ygnd = cloud.ground_position(tail.x, tail.y, GroundDirection::Down);
                if tail.y >= ygnd + CLOUD_OFFSET {
                    at_a = None;
                }
            }
        }
        if let Some(cloud) = at_b.filter(|o| !o.is_solid()) {
            let tail = sensors.b.tail(position, movmode);
            if !cloud.contains_point(tail.x, tail.y) {
                at_b = None;
            } else if midair && movmode == MovMode::Floor && self.angle == 0x0 {
                let ygnd = cloud.ground_position(tail.x, tail.y, GroundDirection::Down);
                if tail.y >= ygnd + CLOUD_OFFSET {
                    at_b = None;
                }
            }
        }

        // Two different clouds at very different heights: drop the one
        // the actor should not attach to.
        if let (Some(a), Some(b)) = (at_a, at_b) {
            if !same_obstacle(a, b)
                && !a.is_solid()
                && !b.is_solid()
                && movmode == MovMode::Floor
            {
                let tail_a = sensors.a.tail(position, movmode);
                let tail_b = sensors.b.tail(position, movmode);
                let gnd_a = a.ground_position(tail_a.x, tail_a.y, GroundDirection::Down);
                let gnd_b = b.ground_position(tail_b.x, tail_b.y, GroundDirection::Down);
                if (gnd_a - gnd_b).abs() > 8 {
                    if gnd_a < gnd_b {
                        at_a = None;
                    } else {
                        at_b = None;
                    }
                }
            }
        }

        self.midair = at_a.is_none() && at_b.is_none();
        self.touching_ceiling = at_c.is_some() || at_d.is_some();

        SensorReadings {
            at_a,
            at_b,
            at_c,
            at_d,
            at_m,
            at_n,
        }
    }

    // ==================== movement mode & angle ====================

    /// Derive the movement mode from the angle. The four boundary angles
    /// keep the previous mode; crossing from the ceiling back to the
    /// floor flips the tangent, so the ground speed is negated.
    fn update_movmode(&mut self) {
        if self.angle < 0x20 || self.angle > 0xE0 {
            if self.movmode == MovMode::Ceiling {
                self.gsp = -self.gsp;
            }
            self.movmode = MovMode::Floor;
        } else if self.angle > 0x20 && self.angle < 0x60 {
            self.movmode = MovMode::LeftWall;
        } else if self.angle > 0x60 && self.angle < 0xA0 {
            self.movmode = MovMode::Ceiling;
        } else if self.angle > 0xA0 && self.angle < 0xE0 {
            self.movmode = MovMode::RightWall;
        }
    }

    /// Set the angle to a known value and refresh everything derived
    /// from it.
    fn force_angle<'m>(
        &mut self,
        angle: u8,
        map: &'m dyn ObstacleMap,
        sensors: &mut SensorReadings<'m>,
    ) {
        self.angle = angle;
        self.update_movmode();
        *sensors = self.read_sensors(map);
    }

    /// Reacquire the angle from the ground below and refresh everything
    /// derived from it.
    fn set_auto_angle<'m>(&mut self, map: &'m dyn ObstacleMap, sensors: &mut SensorReadings<'m>) {
        self.update_angle(map, sensors);
        self.update_movmode();
        *sensors = self.read_sensors(map);
    }

    /// Lateral half-distance of the two-point angle probe. Always taken
    /// from the standing foot sensors; varying it with the pose makes
    /// the reacquired angle inconsistent.
    fn angle_probe_half_distance(&self) -> i32 {
        let sensor = &self.bank.set(SensorPose::Normal).a;
        (1 - sensor.x1()) / 2
    }

    /// Two-point ground probe: walk down in local "down" from the foot
    /// sensors looking for ground on both sides, then map the found
    /// displacement through the slope table. Retried at narrower widths
    /// when the result looks unstable.
    fn update_angle<'m>(&mut self, map: &'m dyn ObstacleMap, sensors: &SensorReadings<'m>) {
        let sensor = &self.sensors().a;
        let sensor_height = sensor.y2() - sensor.y1();
        let search_base = sensor.y2() - 1;
        let max_iterations = sensor_height * 3;

        let half_dist = self.angle_probe_half_distance();
        let mut hoff = half_dist + (1 - half_dist % 2); // odd number
        let min_hoff = if self.was_midair { 3 } else { 1 };
        let max_delta = (hoff * 2).min(SLOPE_LIMIT);
        let angular_tolerance = 0x14;
        let current_angle = self.angle;

        loop {
            self.angle = current_angle; // assume continuity
            let (dx, dy) = self.probe_angle(map, hoff, search_base, max_iterations);
            hoff -= 2; // increase precision

            let unstable = dx < -max_delta
                || dx > max_delta
                || dy < -max_delta
                || dy > max_delta
                || angles::delta_angle(self.angle, current_angle) > angular_tolerance;
            let may_retry =
                hoff >= min_hoff && sensors.at_m.is_none() && sensors.at_n.is_none();
            if !(may_retry && unstable) {
                break;
            }
        }
    }

    /// One probe pass at lateral half-distance `hoff`. On success sets
    /// the angle and the debug contact points; returns the accepted
    /// ground displacement, or (0, 0).
    fn probe_angle(
        &mut self,
        map: &dyn ObstacleMap,
        hoff: i32,
        search_base: i32,
        max_iterations: i32,
    ) -> (i32, i32) {
        let sin = angles::sin(self.angle);
        let cos = angles::cos(self.angle);
        let hoff_f = hoff as f32;

        let (mut found_a, mut found_b) = (false, false);
        let (mut xa, mut ya, mut xb, mut yb) = (0, 0, 0, 0);

        for i in 0..max_iterations {
            if found_a && found_b {
                break;
            }

            let h = (search_base + i) as f32;
            let x = (self.position.x + h * sin + 0.5) as i32;
            let y = (self.position.y + h * cos + 0.5) as i32;

            if !found_a {
                xa = (x as f32 - hoff_f * cos) as i32;
                ya = (y as f32 + hoff_f * sin) as i32;
                found_a = self.accepts_ground_point(map, xa, ya);
            }
            if !found_b {
                xb = (x as f32 + hoff_f * cos) as i32;
                yb = (y as f32 - hoff_f * sin) as i32;
                found_b = self.accepts_ground_point(map, xb, yb);
            }
        }

        self.angle_probe = [self.position; 2];
        if !(found_a && found_b) {
            return (0, 0);
        }

        let ga = map.best_obstacle_at(xa, ya, xa, ya, self.movmode, self.layer);
        let gb = map.best_obstacle_at(xb, yb, xb, yb, self.movmode, self.layer);
        let (Some(ga), Some(gb)) = (ga, gb) else {
            return (0, 0);
        };

        match self.movmode {
            MovMode::Floor => {
                ya = ga.ground_position(xa, ya, GroundDirection::Down);
                yb = gb.ground_position(xb, yb, GroundDirection::Down);
            }
            MovMode::LeftWall => {
                xa = ga.ground_position(xa, ya, GroundDirection::Left);
                xb = gb.ground_position(xb, yb, GroundDirection::Left);
            }
            MovMode::Ceiling => {
                ya = ga.ground_position(xa, ya, GroundDirection::Up);
                yb = gb.ground_position(xb, yb, GroundDirection::Up);
            }
            MovMode::RightWall => {
                xa = ga.ground_position(xa, ya, GroundDirection::Right);
                xb = gb.ground_position(xb, yb, GroundDirection::Right);
            }
        }

        let (dx, dy) = (xb - xa, yb - ya);
        if dx == 0 && dy == 0 {
            return (0, 0);
        }

        // Reject a big angular jump across an obstacle boundary.
        let ang = angles::slope_angle(dy, dx);
        if same_obstacle(ga, gb) || angles::delta_angle(ang, self.angle) <= 0x25 {
            self.angle = ang;
            self.angle_probe = [
                Vec2::new(xa as f32, ya as f32),
                Vec2::new(xb as f32, yb as f32),
            ];
            (dx, dy)
        } else {
            (0, 0)
        }
    }

    /// A probe point accepts solid ground anywhere, and a cloud only
    /// within `CLOUD_OFFSET` of its surface in the current mode.
    fn accepts_ground_point(&self, map: &dyn ObstacleMap, x: i32, y: i32) -> bool {
        let Some(gnd) = map.best_obstacle_at(x, y, x, y, self.movmode, self.layer) else {
            return false;
        };

        gnd.is_solid()
            || match self.movmode {
                MovMode::Floor => y < gnd.ground_position(x, y, GroundDirection::Down) + CLOUD_OFFSET,
                MovMode::Ceiling => y > gnd.ground_position(x, y, GroundDirection::Up) - CLOUD_OFFSET,
                MovMode::LeftWall => {
                    x > gnd.ground_position(x, y, GroundDirection::Left) - CLOUD_OFFSET
                }
                MovMode::RightWall => {
                    x < gnd.ground_position(x, y, GroundDirection::Right) + CLOUD_OFFSET
                }
            }
    }

    // ==================== special states ====================

    fn getting_hit(&mut self) {
        if self.state == ActorState::GettingHit {
            self.input.reset();
            if !nearly_zero(self.xsp) {
                self.facing_right = self.xsp < 0.0;
            }
        }
    }

    fn waiting(&mut self, dt: f32) {
        if self.state == ActorState::Stopped {
            self.wait_timer += dt;
            if self.wait_timer >= self.config.walking.wait_time {
                self.state = ActorState::Waiting;
            }
        } else {
            self.wait_timer = 0.0;
        }
    }

    /// Brake on level clear: steer against the motion, then strike the
    /// pose once slow and grounded.
    fn winning_brake(&mut self) {
        if !self.winning_pose {
            return;
        }

        let steer_threshold = 60.0;
        self.input.reset();

        let cap = self.config.walking.cap_speed;
        self.gsp = self.gsp.clamp(-0.67 * cap, 0.67 * cap);
        if self.state == ActorState::Rolling {
            self.state = ActorState::Braking;
        }

        if self.gsp > steer_threshold {
            self.input.simulate_down(Button::Left);
        } else if self.gsp < -steer_threshold {
            self.input.simulate_down(Button::Right);
        } else {
            self.input.disable();
        }

        if !self.midair && self.gsp.abs() < self.config.walking.walk_threshold {
            self.state = ActorState::Winning;
        }
    }

    /// While the lock is armed, left/right are masked but facing still
    /// tracks the actual motion.
    fn horizontal_control_lock(&mut self, dt: f32) {
        if self.hlock_timer <= 0.0 {
            return;
        }

        self.hlock_timer -= dt;
        if self.hlock_timer < 0.0 {
            self.hlock_timer = 0.0;
        }

        self.input.simulate_up(Button::Left);
        self.input.simulate_up(Button::Right);

        if !self.midair && !nearly_zero(self.gsp) {
            self.facing_right = self.gsp > 0.0;
        } else if self.midair && !nearly_zero(self.xsp) {
            self.facing_right = self.xsp > 0.0;
        }
    }

    fn update_facing(&mut self) {
        if self.state != ActorState::Rolling
            && (!nearly_zero(self.gsp) || !nearly_zero(self.xsp))
        {
            if (self.gsp > 0.0 || self.midair) && self.input.down(Button::Right) {
                self.facing_right = true;
            } else if (self.gsp < 0.0 || self.midair) && self.input.down(Button::Left) {
                self.facing_right = false;
            }
        }
    }

    // ==================== grounded dynamics ====================

    fn walking_or_running(&self) -> ActorState {
        if self.gsp.abs() >= self.config.walking.top_speed {
            ActorState::Running
        } else {
            ActorState::Walking
        }
    }

    fn walk_and_run(&mut self, dt: f32) {
        if self.midair
            || self.state == ActorState::Rolling
            || self.state == ActorState::Charging
        {
            return;
        }

        let left = self.input.down(Button::Left);
        let right = self.input.down(Button::Right);
        let walking = &self.config.walking;
        let (acc, dec, frc) = (walking.acceleration, walking.deceleration, walking.friction);
        let top_speed = walking.top_speed;
        let sin = angles::sin(self.angle);

        // Slope factor.
        if self.gsp.abs() >= walking.walk_threshold || sin.abs() >= 0.707 {
            self.gsp += walking.slope_factor * -sin * dt;
        }

        // Acceleration.
        if right && !left && self.gsp >= 0.0 {
            if self.gsp < top_speed {
                self.gsp += acc * dt;
                if self.gsp >= top_speed {
                    self.gsp = top_speed;
                    self.state = ActorState::Running;
                } else if !(self.state == ActorState::Pushing && self.facing_right) {
                    self.state = ActorState::Walking;
                }
            }
        } else if left && !right && self.gsp <= 0.0 {
            if self.gsp > -top_speed {
                self.gsp -= acc * dt;
                if self.gsp <= -top_speed {
                    self.gsp = -top_speed;
                    self.state = ActorState::Running;
                } else if !(self.state == ActorState::Pushing && !self.facing_right) {
                    self.state = ActorState::Walking;
                }
            }
        }

        // Deceleration.
        if right && self.gsp < 0.0 {
            self.gsp += dec * dt;
            if self.gsp >= 0.0 {
                self.gsp = 0.0;
                self.state = ActorState::Stopped;
            } else if self.gsp.abs() >= self.config.walking.braking_threshold
                && self.movmode == MovMode::Floor
            {
                self.state = ActorState::Braking;
            }
        } else if left && self.gsp > 0.0 {
            self.gsp -= dec * dt;
            if self.gsp <= 0.0 {
                self.gsp = 0.0;
                self.state = ActorState::Stopped;
            } else if self.gsp.abs() >= self.config.walking.braking_threshold
                && self.movmode == MovMode::Floor
            {
                self.state = ActorState::Braking;
            }
        }

        if self.state == ActorState::Braking {
            // Brake harder downhill.
            let brk = frc * (1.5 + 3.0 * sin.abs());
            if self.gsp.abs() <= brk * dt {
                self.gsp = 0.0;
                self.state = ActorState::Stopped;
            } else {
                self.gsp -= brk * sign(self.gsp) * dt;
            }
        } else if !left && !right {
            // Friction.
            if self.gsp.abs() <= frc * dt {
                self.gsp = 0.0;
                if self.state != ActorState::Winning {
                    self.state = ActorState::Stopped;
                }
            } else {
                self.gsp -= frc * sign(self.gsp) * dt;
            }
        }

        // Animation fixup around the standing threshold.
        if self.gsp.abs() < self.config.walking.walk_threshold {
            if self.state == ActorState::Pushing && !left && !right {
                self.state = ActorState::Stopped;
            } else if matches!(
                self.state,
                ActorState::Pushing | ActorState::LookingUp | ActorState::Ducking
            ) {
                // keep
            } else if left || right {
                self.state = if left && right {
                    ActorState::Stopped
                } else {
                    ActorState::Walking
                };
            } else if !matches!(self.state, ActorState::Waiting | ActorState::Winning) {
                self.state = ActorState::Stopped;
            } else if self.state == ActorState::Waiting && !nearly_zero(self.gsp) {
                self.state = ActorState::Walking;
            }
        } else {
            match self.state {
                ActorState::Stopped
                | ActorState::Waiting
                | ActorState::Ledge
                | ActorState::Walking
                | ActorState::Running
                | ActorState::Ducking
                | ActorState::LookingUp => self.state = self.walking_or_running(),
                ActorState::Pushing => self.state = ActorState::Walking,
                _ => {}
            }
        }
    }

    fn duck_and_look_up(&mut self) {
        if self.midair
            || matches!(
                self.state,
                ActorState::Pushing | ActorState::Rolling | ActorState::Charging
            )
            || !nearly_zero(self.gsp)
        {
            return;
        }

        if self.input.down(Button::Down) {
            self.state = ActorState::Ducking;
        } else if self.input.down(Button::Up) {
            self.state = ActorState::LookingUp;
        }
    }

    fn springing(&mut self) {
        if self.state == ActorState::Springing && self.midair && self.ysp > 0.0 {
            self.state = ActorState::Walking;
        }
    }

    fn breathing(&mut self, dt: f32) {
        if self.breathe_timer > 0.0 {
            self.breathe_timer -= dt;
            self.state = ActorState::Breathing;
        } else if self.state == ActorState::Breathing && self.midair {
            self.breathe_timer = 0.0;
            self.state = ActorState::Walking;
        }
    }

    /// Standing still with one foot over the edge and nothing below the
    /// center: balance on the ledge, facing the drop.
    fn balance_on_ledges<'m>(&mut self, map: &'m dyn ObstacleMap, sensors: &SensorReadings<'m>) {
        if self.midair
            || self.movmode != MovMode::Floor
            || !nearly_zero(self.gsp)
            || matches!(self.state, ActorState::Ledge | ActorState::Pushing)
        {
            return;
        }

        let foot_y2 = if sensors.at_a.is_some() {
            self.sensors().a.y2()
        } else {
            self.sensors().b.y2()
        };
        let x = self.position.x as i32;
        let y = self.position.y as i32 + foot_y2 + 8;
        let nothing_below = map
            .best_obstacle_at(x, y, x, y, self.movmode, self.layer)
            .is_none();

        if sensors.at_a.is_some() && sensors.at_b.is_none() && nothing_below {
            self.state = ActorState::Ledge;
            self.facing_right = true;
        } else if sensors.at_a.is_none() && sensors.at_b.is_some() && nothing_below {
            self.state = ActorState::Ledge;
            self.facing_right = false;
        }
    }

    fn rolling(&mut self, dt: f32) {
        // Curl up at speed while holding down.
        if !self.midair
            && matches!(self.state, ActorState::Walking | ActorState::Running)
            && self.gsp.abs() >= self.config.rolling.roll_threshold
            && self.input.down(Button::Down)
        {
            self.state = ActorState::Rolling;
        }

        if self.midair || self.state != ActorState::Rolling {
            return;
        }

        let rolling = &self.config.rolling;
        let sin = angles::sin(self.angle);

        // Slope factor: stronger downhill than uphill.
        if self.gsp * sin >= 0.0 {
            self.gsp += rolling.uphill_slope_factor * -sin * dt;
        } else {
            self.gsp += rolling.downhill_slope_factor * -sin * dt;
        }

        // Steering against the roll decelerates it.
        if self.input.down(Button::Right) && self.gsp < 0.0 {
            self.gsp = (self.gsp + rolling.deceleration * dt).min(0.0);
        } else if self.input.down(Button::Left) && self.gsp > 0.0 {
            self.gsp = (self.gsp - rolling.deceleration * dt).max(0.0);
        }

        // Friction.
        if self.gsp.abs() > rolling.friction * dt {
            self.gsp -= rolling.friction * sign(self.gsp) * dt;
        } else {
            self.gsp = 0.0;
        }

        // Unroll once too slow.
        if self.gsp.abs() < rolling.unroll_threshold {
            self.state = ActorState::Stopped;
        }

        if !nearly_zero(self.gsp) {
            self.facing_right = self.gsp > 0.0;
        }
    }

    fn charge_and_release(&mut self, dt: f32) {
        // Begin to charge from a duck.
        if self.state == ActorState::Ducking
            && self.input.down(Button::Down)
            && self.input.pressed(Button::Fire1)
            && !nearly_zero(self.config.rolling.charge_speed)
        {
            self.state = ActorState::Charging;
        }

        if self.state != ActorState::Charging {
            return;
        }

        // Mashing the button stores more charge; an idle charge decays.
        if self.input.pressed(Button::Fire1) {
            self.charge_intensity = (self.charge_intensity + 0.25).min(1.0);
        } else if self.charge_intensity.abs() >= self.config.rolling.charge_threshold {
            self.charge_intensity *= 0.999_506_551 - 1.845_393_09 * dt;
        }

        if !self.input.down(Button::Down) {
            // Release!
            let s = if self.facing_right { 1.0 } else { -1.0 };
            self.gsp =
                (s * self.config.rolling.charge_speed) * (0.67 + self.charge_intensity * 0.33);
            self.state = ActorState::Rolling;
            self.charge_intensity = 0.0;
            self.jump_lock_timer = 0.09375;
        } else {
            self.gsp = 0.0;
        }
    }

    /// Cap the ground speed and project it onto the world axes.
    fn project_ground_speed(&mut self) {
        if self.midair {
            return;
        }

        let cap = self.config.walking.cap_speed;
        self.gsp = self.gsp.clamp(-cap, cap);
        self.xsp = self.gsp * angles::cos(self.angle);
        self.ysp = self.gsp * -angles::sin(self.angle);
    }

    // ==================== airborne dynamics ====================

    fn air_physics(&mut self, dt: f32) {
        if !self.midair {
            return;
        }

        let air = &self.config.air;
        let top_speed = self.config.walking.top_speed;

        // Air acceleration.
        if self.input.down(Button::Right) && !self.input.down(Button::Left) && self.xsp < top_speed
        {
            self.xsp = (self.xsp + air.acceleration * dt).min(top_speed);
        }
        if self.input.down(Button::Left) && !self.input.down(Button::Right) && self.xsp > -top_speed
        {
            self.xsp = (self.xsp - air.acceleration * dt).max(-top_speed);
        }

        // Air drag near the apex of a fast rise.
        if self.state != ActorState::GettingHit
            && self.ysp < 0.0
            && self.ysp > air.drag_threshold
            && self.xsp.abs() >= air.drag_x_threshold
        {
            let [c0, c1] = self.config.air_drag_coefficient();
            self.xsp *= c0 * dt + c1;
        }

        // Gravity, weakened while hurt.
        let gravity = if self.state != ActorState::GettingHit {
            air.gravity
        } else {
            (air.gravity / 7.0) * 6.0
        };
        self.ysp += gravity * dt;
        if self.ysp > air.top_y_speed {
            self.ysp = air.top_y_speed;
        }
    }

    fn jumping<'m>(
        &mut self,
        map: &'m dyn ObstacleMap,
        sensors: &mut SensorReadings<'m>,
        dt: f32,
    ) {
        if !self.midair {
            self.jump_lock_timer -= dt;
            if self.jump_lock_timer > 0.0 {
                return;
            }
            self.jump_lock_timer = 0.0;

            let allowed = (!self.input.down(Button::Up) && !self.input.down(Button::Down))
                || self.state == ActorState::Rolling;
            // Don't bother jumping under a ceiling.
            if self.input.pressed(Button::Fire1) && allowed && !self.touching_ceiling {
                let sin = angles::sin(self.angle);
                let cos = angles::cos(self.angle);
                let jmp = self.config.jumping.impulse;
                let attenuation = if WANT_JUMP_ATTENUATION && self.gsp * sin >= 0.0 {
                    0.5
                } else {
                    1.0
                };

                self.xsp = jmp * sin + self.gsp * cos;
                self.ysp = jmp * cos - self.gsp * sin * attenuation;
                self.gsp = 0.0;
                self.state = ActorState::Jumping;
                self.force_angle(0x0, map, sensors);
            }
        } else if self.state == ActorState::Jumping {
            // Short hop: releasing the button caps the rise.
            if !self.input.down(Button::Fire1) && self.ysp < self.config.jumping.release_speed {
                self.ysp = self.config.jumping.release_speed;
            }
        }
    }

    // ==================== motion & collision ====================

    /// Translate in small sub-steps, re-reading the sensors after each
    /// one and zeroing the blocked axis of the remaining increment. The
    /// sub-step length bounds the tunneling error on the fast axis.
    fn move_and_collide<'m>(
        &mut self,
        map: &'m dyn ObstacleMap,
        sensors: &mut SensorReadings<'m>,
        dt: f32,
    ) {
        let ds = Vec2::new(self.xsp, self.ysp) * dt;
        let sx = (ds.x > 0.0) as i32 - ((ds.x < 0.0) as i32);
        let sy = (ds.y > 0.0) as i32 - ((ds.y < 0.0) as i32);

        let max_increment = 2.0_f32; // px; smaller is more robust, but more iterations
        let max_ds_length =
            self.config.walking.cap_speed.max(self.config.air.top_y_speed) / TARGET_FPS;
        let max_increments = (max_ds_length / max_increment).ceil() as i32;
        let mut num_increments = max_increments.min(ds.length().ceil() as i32);
        let mut increment = if num_increments > 0 {
            ds / num_increments as f32
        } else {
            Vec2::ZERO
        };

        while num_increments > 0 {
            num_increments -= 1;
            self.position += increment;
            *sensors = self.read_sensors(map);

            match self.movmode {
                MovMode::Floor => {
                    if sensors.at_m.is_some() && sx < 0 {
                        increment.x = 0.0;
                    }
                    if sensors.at_n.is_some() && sx > 0 {
                        increment.x = 0.0;
                    }
                    if (sensors.at_c.is_some() || sensors.at_d.is_some()) && sy < 0 {
                        increment.y = 0.0;
                    }
                }
                MovMode::RightWall => {
                    if sensors.at_m.is_some() && sy > 0 {
                        increment.y = 0.0;
                    }
                    if sensors.at_n.is_some() && sy < 0 {
                        increment.y = 0.0;
                    }
                    if (sensors.at_c.is_some() || sensors.at_d.is_some()) && sx < 0 {
                        increment.x = 0.0;
                    }
                }
                MovMode::Ceiling => {
                    if sensors.at_m.is_some() && sx > 0 {
                        increment.x = 0.0;
                    }
                    if sensors.at_n.is_some() && sx < 0 {
                        increment.x = 0.0;
                    }
                    if (sensors.at_c.is_some() || sensors.at_d.is_some()) && sy > 0 {
                        increment.y = 0.0;
                    }
                }
                MovMode::LeftWall => {
                    if sensors.at_m.is_some() && sy < 0 {
                        increment.y = 0.0;
                    }
                    if sensors.at_n.is_some() && sy > 0 {
                        increment.y = 0.0;
                    }
                    if (sensors.at_c.is_some() || sensors.at_d.is_some()) && sx > 0 {
                        increment.x = 0.0;
                    }
                }
            }

            if increment.x == 0.0 && increment.y == 0.0 {
                break;
            }
        }
    }

    fn land_after_getting_hit(&mut self) {
        if !self.midair && self.was_midair && self.state == ActorState::GettingHit {
            self.gsp = 0.0;
            self.xsp = 0.0;
            self.state = ActorState::Stopped;
        }
    }

    /// Resolve side sensor hits: kill the tangential speed, push the
    /// sensor just outside the wall and clamp the blocked velocity
    /// component. Off the floor mode, the angle is also reset.
    fn wall_collision_response<'m>(
        &mut self,
        map: &'m dyn ObstacleMap,
        sensors: &mut SensorReadings<'m>,
    ) {
        // Right side (sensor N).
        if let Some(wall) = sensors.at_n {
            let position = self.position.floor();
            let tail = self.sensors().n.tail(position, self.movmode);
            let local_tail = tail - IVec2::new(position.x as i32, position.y as i32);

            if self.gsp > 0.0 {
                self.gsp = 0.0;
            }

            let mut reset_angle = true;
            match self.movmode {
                MovMode::Floor => {
                    let edge = wall.ground_position(tail.x, tail.y, GroundDirection::Right);
                    self.position.x = (edge - local_tail.x - 1) as f32;
                    self.xsp = self.xsp.min(0.0);
                    reset_angle = false;
                }
                MovMode::Ceiling => {
                    let edge = wall.ground_position(tail.x, tail.y, GroundDirection::Left);
                    self.position.x = (edge - local_tail.x + 1) as f32;
                    self.xsp = self.xsp.max(0.0);
                }
                MovMode::RightWall => {
                    let edge = wall.ground_position(tail.x, tail.y, GroundDirection::Up);
                    self.position.y = (edge - local_tail.y - 1) as f32;
                    self.ysp = self.ysp.max(0.0);
                }
                MovMode::LeftWall => {
                    let edge = wall.ground_position(tail.x, tail.y, GroundDirection::Down);
                    self.position.y = (edge - local_tail.y + 1) as f32;
                    self.ysp = self.ysp.min(0.0);
                }
            }

            if reset_angle {
                self.force_angle(0x0, map, sensors);
            } else {
                *sensors = self.read_sensors(map);
            }

            if !self.midair && self.movmode == MovMode::Floor && self.state != ActorState::Rolling
            {
                if self.input.down(Button::Right) {
                    self.state = ActorState::Pushing;
                    self.facing_right = true;
                } else {
                    self.state = ActorState::Stopped;
                }
            }
        }

        // Left side (sensor M), mirrored.
        if let Some(wall) = sensors.at_m {
            let position = self.position.floor();
            let head = self.sensors().m.head(position, self.movmode);
            let local_head = head - IVec2::new(position.x as i32, position.y as i32);

            if self.gsp < 0.0 {
                self.gsp = 0.0;
            }

            let mut reset_angle = true;
            match self.movmode {
                MovMode::Floor => {
                    let edge = wall.ground_position(head.x, head.y, GroundDirection::Left);
                    self.position.x = (edge - local_head.x + 1) as f32;
                    self.xsp = self.xsp.max(0.0);
                    reset_angle = false;
                }
                MovMode::Ceiling => {
                    let edge = wall.ground_position(head.x, head.y, GroundDirection::Right);
                    self.position.x = (edge - local_head.x - 1) as f32;
                    self.xsp = self.xsp.min(0.0);
                }
                MovMode::RightWall => {
                    let edge = wall.ground_position(head.x, head.y, GroundDirection::Down);
                    self.position.y = (edge - local_head.y - 1) as f32;
                    self.ysp = self.ysp.min(0.0);
                }
                MovMode::LeftWall => {
                    let edge = wall.ground_position(head.x, head.y, GroundDirection::Up);
                    self.position.y = (edge - local_head.y + 1) as f32;
                    self.ysp = self.ysp.max(0.0);
                }
            }

            if reset_angle {
                self.force_angle(0x0, map, sensors);
            } else {
                *sensors = self.read_sensors(map);
            }

            if !self.midair && self.movmode == MovMode::Floor && self.state != ActorState::Rolling
            {
                if self.input.down(Button::Left) {
                    self.state = ActorState::Pushing;
                    self.facing_right = false;
                } else {
                    self.state = ActorState::Stopped;
                }
            }
        }
    }

    /// Hitting a ceiling midair: either reattach to a steep ceiling
    /// slope (turning vertical speed into ground speed) or stop rising
    /// and snap just below the ceiling.
    fn ceiling_collision_response<'m>(
        &mut self,
        map: &'m dyn ObstacleMap,
        sensors: &mut SensorReadings<'m>,
    ) {
        if !self.midair || !self.touching_ceiling {
            return;
        }

        let use_c = self.pick_best_ceiling(sensors);
        let (ceiling, ceiling_sensor) = if use_c {
            (sensors.at_c, self.sensors().c.clone())
        } else {
            (sensors.at_d, self.sensors().d.clone())
        };

        // Moving into the ceiling for the first time?
        let mut must_reattach = false;
        if self.ysp < 0.0 {
            self.force_angle(0x80, map, sensors);
            self.set_auto_angle(map, sensors);

            let steep = (self.angle >= 0xA0 && self.angle <= 0xBF)
                || (self.angle >= 0x40 && self.angle <= 0x5F);
            if steep {
                must_reattach = !self.midair;
                if must_reattach {
                    self.gsp = if self.xsp.abs() > -self.ysp {
                        -self.xsp
                    } else {
                        self.ysp * -sign(angles::sin(self.angle))
                    };
                    self.xsp = 0.0;
                    self.ysp = 0.0;
                    if self.state != ActorState::Rolling {
                        self.state = self.walking_or_running();
                    }
                }
            }
        }

        if !must_reattach {
            // Stop rising and sit just below the ceiling.
            self.ysp = self.ysp.max(0.0);
            self.force_angle(0x0, map, sensors);

            if let Some(ceiling) = ceiling {
                let position = self.position.floor();
                let head = ceiling_sensor.head(position, self.movmode);
                let local_head = head - IVec2::new(position.x as i32, position.y as i32);

                let surface = ceiling.ground_position(head.x, head.y, GroundDirection::Up);
                self.position.y = (surface - local_head.y + 1) as f32;
                *sensors = self.read_sensors(map);
            }
        }
    }

    // ==================== sticky physics ====================

    /// Just lost ground contact without jumping (or rolling fast over a
    /// bump): probe a short band below the feet and glue the actor back
    /// to convex slopes.
    fn sticky_physics<'m>(&mut self, map: &'m dyn ObstacleMap, sensors: &mut SensorReadings<'m>) {
        let lost_ground = !self.was_midair
            && !matches!(
                self.state,
                ActorState::Jumping
                    | ActorState::GettingHit
                    | ActorState::Springing
                    | ActorState::Drowned
                    | ActorState::Dead
            );
        let rolling_unlocked = self.state == ActorState::Rolling && !self.sticky_lock;

        if self.midair && (lost_ground || rolling_unlocked) {
            let mut u = STICKY_BASE_OFFSET;

            if self.xsp.abs() > self.config.walking.top_speed
                || self.state == ActorState::Rolling
            {
                let sensor = if self.xsp > 0.0 {
                    &self.sensors().b
                } else {
                    &self.sensors().a
                };
                let tail = sensor.tail(self.position, self.movmode);
                let down = self.movmode.local_down();

                while u < STICKY_MAX_OFFSET {
                    let probe = tail + down * u;
                    if map.obstacle_exists(probe.x, probe.y, self.layer) {
                        break;
                    }
                    u += 1;
                }
            }

            let offset = (self.movmode.local_down() * u).as_vec2();
            self.position += offset;
            self.midair = false; // let clouds catch the sensors again
            self.set_auto_angle(map, sensors);

            // Nothing down there: undo.
            if self.midair {
                self.position -= offset;
                self.set_auto_angle(map, sensors);

                if self.state == ActorState::Rolling {
                    self.sticky_lock = true;
                }
            }
        } else if !self.midair && self.state == ActorState::Rolling {
            self.sticky_lock = false;
        }
    }

    // ==================== ground snapping ====================

    /// Which foot found the better ground, relative to the mode's local
    /// up? Returns true for A.
    fn pick_best_ground<'m>(&self, sensors: &SensorReadings<'m>) -> bool {
        let (Some(a), Some(b)) = (sensors.at_a, sensors.at_b) else {
            return sensors.at_a.is_some();
        };

        let feet = self.sensors();
        let (sa, sb) = (&feet.a, &feet.b);
        let px = self.position.x as i32;
        let py = self.position.y as i32;

        match self.movmode {
            MovMode::Floor => {
                let ha = a.ground_position(px + sa.x2(), py + sa.y2(), GroundDirection::Down);
                let hb = b.ground_position(px + sb.x2(), py + sb.y2(), GroundDirection::Down);
                ha < hb
            }
            MovMode::LeftWall => {
                let ha = a.ground_position(px - sa.y2(), py + sa.x2(), GroundDirection::Left);
                let hb = b.ground_position(px - sb.y2(), py + sb.x2(), GroundDirection::Left);
                ha >= hb
            }
            MovMode::Ceiling => {
                let ha = a.ground_position(px - sa.x2(), py - sa.y2(), GroundDirection::Up);
                let hb = b.ground_position(px - sb.x2(), py - sb.y2(), GroundDirection::Up);
                ha >= hb
            }
            MovMode::RightWall => {
                let ha = a.ground_position(px + sa.y2(), py - sa.x2(), GroundDirection::Right);
                let hb = b.ground_position(px + sb.y2(), py - sb.x2(), GroundDirection::Right);
                ha < hb
            }
        }
    }

    /// Which head sensor found the nearer ceiling? Returns true for C.
    fn pick_best_ceiling<'m>(&self, sensors: &SensorReadings<'m>) -> bool {
        let (Some(c), Some(d)) = (sensors.at_c, sensors.at_d) else {
            return sensors.at_c.is_some();
        };

        let heads = self.sensors();
        let (sc, sd) = (&heads.c, &heads.d);
        let px = self.position.x as i32;
        let py = self.position.y as i32;

        match self.movmode {
            MovMode::Floor => {
                let hc = c.ground_position(px + sc.x1(), py + sc.y1(), GroundDirection::Up);
                let hd = d.ground_position(px + sd.x1(), py + sd.y1(), GroundDirection::Up);
                hc >= hd
            }
            MovMode::LeftWall => {
                let hc = c.ground_position(px - sc.y1(), py + sc.x1(), GroundDirection::Right);
                let hd = d.ground_position(px - sd.y1(), py + sd.x1(), GroundDirection::Right);
                hc < hd
            }
            MovMode::Ceiling => {
                let hc = c.ground_position(px - sc.x1(), py - sc.y1(), GroundDirection::Down);
                let hd = d.ground_position(px - sd.x1(), py - sd.y1(), GroundDirection::Down);
                hc < hd
            }
            MovMode::RightWall => {
                let hc = c.ground_position(px + sc.y1(), py - sc.x1(), GroundDirection::Left);
                let hd = d.ground_position(px + sd.y1(), py - sd.x1(), GroundDirection::Left);
                hc >= hd
            }
        }
    }

    /// Snap the better foot sensor onto its ground and refresh the
    /// angle. On the frame the actor lands, also fix the speed and
    /// animation.
    fn snap_to_ground<'m>(&mut self, map: &'m dyn ObstacleMap, sensors: &mut SensorReadings<'m>) {
        let rising_special = matches!(
            self.state,
            ActorState::Jumping
                | ActorState::GettingHit
                | ActorState::Springing
                | ActorState::Drowned
                | ActorState::Dead
        ) && self.ysp < 0.0;
        if self.midair || rising_special {
            return;
        }

        let use_a = self.pick_best_ground(sensors);
        let (ground, foot) = if use_a {
            (sensors.at_a, self.sensors().a.clone())
        } else {
            (sensors.at_b, self.sensors().b.clone())
        };
        let Some(ground) = ground else {
            return;
        };

        // Keep one pixel of overlap so the sensor stays in contact.
        let offset = foot.y2() - 1;
        let px = self.position.x as i32;
        let py = self.position.y as i32;

        match self.movmode {
            MovMode::LeftWall => {
                let surface = ground.ground_position(
                    px - foot.y2(),
                    py + foot.x2(),
                    GroundDirection::Left,
                );
                self.position.x = (surface + offset) as f32;
            }
            MovMode::Ceiling => {
                let surface =
                    ground.ground_position(px - foot.x2(), py - foot.y2(), GroundDirection::Up);
                self.position.y = (surface + offset) as f32;
            }
            MovMode::RightWall => {
                let surface = ground.ground_position(
                    px + foot.y2(),
                    py - foot.x2(),
                    GroundDirection::Right,
                );
                self.position.x = (surface - offset) as f32;
            }
            MovMode::Floor => {
                let surface = ground.ground_position(
                    px + foot.x2(),
                    py + foot.y2(),
                    GroundDirection::Down,
                );
                self.position.y = (surface - offset) as f32;
            }
        }

        // First contact after a fall.
        if self.was_midair && self.movmode == MovMode::Floor {
            // The ground reacquisition right after refines this.
            self.gsp = self.xsp;

            if self.state == ActorState::Rolling {
                // Unroll after rolling midair for a while.
                if self.midair_timer >= 0.2 && !self.input.down(Button::Down) {
                    self.state = self.walking_or_running();
                    if !nearly_zero(self.gsp) {
                        self.facing_right = self.gsp > 0.0;
                    }
                }
            } else {
                // Animation fix, e.g. when jumping near edges.
                self.state = self.walking_or_running();
            }
        }

        self.set_auto_angle(map, sensors);
    }

    /// Turn the airborne velocity into ground speed according to the
    /// landing angle.
    fn reacquire_ground(&mut self) {
        if self.midair || !self.was_midair {
            return;
        }

        let a = self.angle;
        if a >= 0xF0 || a <= 0x0F {
            self.gsp = self.xsp;
        } else if (0xE0..=0xEF).contains(&a) || (0x10..=0x1F).contains(&a) {
            self.gsp = if self.xsp.abs() > self.ysp {
                self.xsp
            } else {
                self.ysp * 0.5 * -sign(angles::sin(a))
            };
        } else if (0xC0..=0xDF).contains(&a) || (0x20..=0x3F).contains(&a) {
            self.gsp = if self.xsp.abs() > self.ysp {
                self.xsp
            } else {
                self.ysp * -sign(angles::sin(a))
            };
        }

        self.xsp = 0.0;
        self.ysp = 0.0;
        if self.state != ActorState::Rolling {
            self.state = self.walking_or_running();
        }
    }

    /// Too slow on a wall or ceiling: lock the controls, and on steep
    /// angles detach back to the floor orientation.
    fn fall_off_walls_and_ceilings<'m>(
        &mut self,
        map: &'m dyn ObstacleMap,
        sensors: &mut SensorReadings<'m>,
    ) {
        if self.midair || self.movmode == MovMode::Floor || self.hlock_timer != 0.0 {
            return;
        }

        if self.gsp.abs() < self.config.walking.fall_off_threshold {
            self.hlock_timer = 0.5;
            if self.angle >= 0x40 && self.angle <= 0xC0 {
                self.gsp = 0.0;
                self.force_angle(0x0, map, sensors);
            }
        }
    }

    // ==================== timers & state fixup ====================

    fn update_timers_and_fix_states<'m>(
        &mut self,
        map: &'m dyn ObstacleMap,
        sensors: &mut SensorReadings<'m>,
        dt: f32,
    ) {
        if self.midair {
            self.midair_timer += dt;
            self.force_angle(0x0, map, sensors);

            // Never restore a stale ground speed on landing from a rise.
            if self.ysp < 0.0 {
                self.gsp = 0.0;
            }
        } else {
            self.midair_timer = 0.0;
        }

        // States that make no sense given the midair flag.
        if self.midair {
            if matches!(
                self.state,
                ActorState::Pushing
                    | ActorState::Stopped
                    | ActorState::Waiting
                    | ActorState::Ducking
                    | ActorState::LookingUp
            ) {
                self.state = self.walking_or_running();
            }
        } else if self.state == ActorState::Walking && nearly_zero(self.gsp) {
            self.state = ActorState::Stopped;
        }
    }
}
