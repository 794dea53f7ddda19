//! The physics actor.
//!
//! [`PhysicsActor`] is the single controllable body of the simulation: a
//! sprite center, world/ground velocities, a binary-angle orientation,
//! a bank of collision sensors and a six-button input handle. Call
//! [`PhysicsActor::update`] once per frame with the obstacle map; the
//! actor runs its own fixed-timestep simulation internally.

use bevy::prelude::*;

use crate::angles;
use crate::config::{ActorConfig, FIXED_TIMESTEP};
use crate::input::{ActorInput, Button};
use crate::obstacle::{Obstacle, ObstacleLayer, ObstacleMap};
use crate::sensor::{SensorBank, SensorPose, SensorSet};
use crate::state::{ActorState, MovMode};

/// Generates delegating getter/setter pairs for the tunable parameters,
/// mirroring how the physics model is exposed one scalar at a time.
macro_rules! parameter_accessors {
    ($($group:ident . $member:ident => $getter:ident, $setter:ident);* $(;)?) => {
        $(
            #[doc = concat!("The `", stringify!($member), "` parameter of the ",
                stringify!($group), " model.")]
            #[must_use]
            pub fn $getter(&self) -> f32 {
                self.config.$group.$member
            }

            #[doc = concat!("Set the `", stringify!($member), "` parameter of the ",
                stringify!($group), " model.")]
            pub fn $setter(&mut self, value: f32) {
                self.config.$group.$member = value;
            }
        )*
    };
}

/// A sensor-driven platformer physics body.
///
/// Coordinates follow the classic screen convention: x grows right,
/// y grows **down**, so gravity is positive y and jump impulses are
/// negative.
#[derive(Component, Debug, Clone)]
pub struct PhysicsActor {
    pub(crate) position: Vec2,
    pub(crate) xsp: f32,
    pub(crate) ysp: f32,
    pub(crate) gsp: f32,
    pub(crate) angle: u8,
    pub(crate) movmode: MovMode,
    pub(crate) state: ActorState,
    pub(crate) layer: ObstacleLayer,

    pub(crate) midair: bool,
    pub(crate) was_midair: bool,
    pub(crate) facing_right: bool,
    pub(crate) touching_ceiling: bool,
    pub(crate) inside_wall: bool,
    pub(crate) winning_pose: bool,
    pub(crate) sticky_lock: bool,

    pub(crate) hlock_timer: f32,
    pub(crate) jump_lock_timer: f32,
    pub(crate) wait_timer: f32,
    pub(crate) midair_timer: f32,
    pub(crate) breathe_timer: f32,
    pub(crate) charge_intensity: f32,

    pub(crate) config: ActorConfig,
    pub(crate) input: ActorInput,
    pub(crate) bank: SensorBank,

    /// Ground contact points of the last angle probe, for debug drawing.
    pub(crate) angle_probe: [Vec2; 2],

    reference_time: f32,
    fixed_time: f32,
}

impl Default for PhysicsActor {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl PhysicsActor {
    /// Create an actor with its sprite center at `position`.
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            xsp: 0.0,
            ysp: 0.0,
            gsp: 0.0,
            angle: 0x0,
            movmode: MovMode::Floor,
            state: ActorState::Stopped,
            layer: ObstacleLayer::Default,
            midair: true,
            was_midair: true,
            facing_right: true,
            touching_ceiling: false,
            inside_wall: false,
            winning_pose: false,
            sticky_lock: false,
            hlock_timer: 0.0,
            jump_lock_timer: 0.0,
            wait_timer: 0.0,
            midair_timer: 0.0,
            breathe_timer: 0.0,
            charge_intensity: 0.0,
            config: ActorConfig::default(),
            input: ActorInput::new(),
            bank: SensorBank::default(),
            angle_probe: [position; 2],
            reference_time: 0.0,
            fixed_time: 0.0,
        }
    }

    /// Drive one outer frame.
    ///
    /// At 60 fps the simulation runs frame-exact with a fixed 1/60 s
    /// step; when the real delta falls behind, it runs once with the
    /// real delta instead, trading precision for stability. The map is
    /// only borrowed for the duration of the call.
    pub fn update(&mut self, map: &dyn ObstacleMap, dt: f32) {
        // Smash check: is the center buried in a solid brick?
        let at_u = self
            .sensors()
            .u
            .check(self.position, self.movmode, self.layer, map);
        self.inside_wall = at_u.is_some_and(|o| o.is_solid());

        self.reference_time += dt;
        if self.reference_time <= self.fixed_time + FIXED_TIMESTEP {
            self.run_simulation(map, FIXED_TIMESTEP);
            self.fixed_time += FIXED_TIMESTEP;
        } else {
            // Prevent jittering at lower frame rates.
            self.run_simulation(map, dt);
            self.fixed_time = self.reference_time;
        }

        self.input.advance();
    }

    // ==================== kinematic surface ====================

    /// Sprite center, in world pixels.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Teleport the sprite center.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Current animation/control state.
    #[must_use]
    pub fn state(&self) -> ActorState {
        self.state
    }

    /// Raw binary angle: 0-255, clockwise, 0 on the floor.
    #[must_use]
    pub fn angle(&self) -> u8 {
        self.angle
    }

    /// Orientation in whole counter-clockwise degrees.
    #[must_use]
    pub fn angle_degrees(&self) -> i32 {
        angles::to_degrees(self.angle)
    }

    /// Which cardinal surface the actor is attached to.
    #[must_use]
    pub fn movmode(&self) -> MovMode {
        self.movmode
    }

    /// Current obstacle layer.
    #[must_use]
    pub fn layer(&self) -> ObstacleLayer {
        self.layer
    }

    /// Switch the obstacle layer.
    pub fn set_layer(&mut self, layer: ObstacleLayer) {
        self.layer = layer;
    }

    /// Is the actor airborne (no foot sensor touching ground)?
    #[must_use]
    pub fn is_midair(&self) -> bool {
        self.midair
    }

    /// Is a head sensor touching a ceiling?
    #[must_use]
    pub fn is_touching_ceiling(&self) -> bool {
        self.touching_ceiling
    }

    /// Is the actor facing right?
    #[must_use]
    pub fn is_facing_right(&self) -> bool {
        self.facing_right
    }

    /// Is the actor's center inside a solid obstacle (being smashed)?
    #[must_use]
    pub fn is_inside_wall(&self) -> bool {
        self.inside_wall
    }

    /// Engage the level-clear behavior: the actor brakes on its own and
    /// strikes the winning pose once slow and grounded.
    pub fn enable_winning_pose(&mut self) {
        self.winning_pose = true;
    }

    /// Bring a dead or drowned actor back at `position`. Returns false
    /// (and does nothing) in any other state.
    pub fn resurrect(&mut self, position: Vec2) -> bool {
        if self.state.is_terminal() {
            self.gsp = 0.0;
            self.xsp = 0.0;
            self.ysp = 0.0;
            self.facing_right = true;
            self.state = ActorState::Stopped;
            self.set_position(position);
            return true;
        }

        false
    }

    /// Suppress left/right input for at least `seconds` (never shortens
    /// an ongoing lock). Facing still tracks the actual motion.
    pub fn lock_horizontally_for(&mut self, seconds: f32) {
        let seconds = seconds.max(0.0);
        if seconds > self.hlock_timer {
            self.hlock_timer = seconds;
        }
    }

    /// Width, height and center of the sensor-derived bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> (i32, i32, Vec2) {
        // The box width never follows the shrunk jump/roll feet.
        let sensor_a = &self.bank.set(SensorPose::Normal).a;
        let sensors = self.sensors();

        let a = sensor_a.tail(self.position, self.movmode);
        let d = sensors.d.head(self.position, self.movmode);
        let m = sensors.m.head(self.position, self.movmode);
        let n = sensors.n.tail(self.position, self.movmode);

        let (width, height) = match self.movmode {
            MovMode::Floor => (n.x - m.x + 1, a.y - d.y + 1),
            MovMode::Ceiling => (m.x - n.x + 1, d.y - a.y + 1),
            MovMode::RightWall => (a.x - d.x + 1, m.y - n.y + 1),
            MovMode::LeftWall => (d.x - a.x + 1, n.y - m.y + 1),
        };

        (width, height, self.position)
    }

    /// Is either foot sensor overlapping this obstacle?
    #[must_use]
    pub fn is_standing_on_platform(&self, obstacle: &dyn Obstacle) -> bool {
        let sensors = self.sensors();

        for sensor in [&sensors.a, &sensors.b] {
            let (min, max) = sensor.world_extent(self.position, self.movmode);
            if obstacle.overlaps_box(min.x, min.y, max.x, max.y) {
                return true;
            }
        }

        false
    }

    /// Difference between the standing and rolling foot sensor heights,
    /// in pixels. Sprites use it to keep the feet anchored when curling.
    #[must_use]
    pub fn roll_delta(&self) -> i32 {
        self.bank.set(SensorPose::Normal).a.y2() - self.bank.set(SensorPose::JumpRoll).a.y2()
    }

    /// Stored spin charge, in [0, 1].
    #[must_use]
    pub fn charge_intensity(&self) -> f32 {
        self.charge_intensity
    }

    /// Restore every tunable parameter to the classic 60 fps model.
    pub fn reset_model_parameters(&mut self) {
        self.config = ActorConfig::default();
    }

    /// Read-only view of the physics model.
    #[must_use]
    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    /// The actor's input handle, for direct button injection.
    pub fn input_mut(&mut self) -> &mut ActorInput {
        &mut self.input
    }

    /// Ground contact points found by the last angle probe (debug).
    #[must_use]
    pub fn angle_probe_points(&self) -> [Vec2; 2] {
        self.angle_probe
    }

    // ==================== input injection ====================

    /// Hold LEFT for this frame.
    pub fn walk_left(&mut self) {
        self.input.simulate_down(Button::Left);
    }

    /// Hold RIGHT for this frame.
    pub fn walk_right(&mut self) {
        self.input.simulate_down(Button::Right);
    }

    /// Hold DOWN for this frame.
    pub fn duck(&mut self) {
        self.input.simulate_down(Button::Down);
    }

    /// Hold UP for this frame.
    pub fn look_up(&mut self) {
        self.input.simulate_down(Button::Up);
    }

    /// Hold the jump button for this frame.
    pub fn jump(&mut self) {
        self.input.simulate_down(Button::Fire1);
    }

    // ==================== state setters ====================

    /// Kill the actor. Callers typically launch it with
    /// [`death_impulse`](Self::death_impulse) through
    /// [`set_ysp`](Self::set_ysp).
    pub fn kill(&mut self) {
        self.state = ActorState::Dead;
    }

    /// Knock the actor back. Callers typically launch it with
    /// [`hit_impulse`](Self::hit_impulse).
    pub fn hit(&mut self) {
        self.state = ActorState::GettingHit;
    }

    /// Re-enter the jumping state (e.g. bouncing off an enemy).
    pub fn bounce(&mut self) {
        self.state = ActorState::Jumping;
    }

    /// Launch by a spring.
    pub fn spring(&mut self) {
        self.state = ActorState::Springing;
    }

    /// Curl into a roll.
    pub fn roll(&mut self) {
        self.state = ActorState::Rolling;
    }

    /// Drown the actor.
    pub fn drown(&mut self) {
        self.state = ActorState::Drowned;
    }

    /// Breathe an air bubble (plays for half a second).
    pub fn breathe(&mut self) {
        self.state = ActorState::Breathing;
        self.breathe_timer = 0.5;
    }

    // ==================== speeds ====================

    /// Horizontal world-frame velocity (px/s).
    #[must_use]
    pub fn xsp(&self) -> f32 {
        self.xsp
    }

    /// Set the horizontal world-frame velocity (px/s).
    pub fn set_xsp(&mut self, xsp: f32) {
        self.xsp = xsp;
    }

    /// Vertical world-frame velocity (px/s, positive is down).
    #[must_use]
    pub fn ysp(&self) -> f32 {
        self.ysp
    }

    /// Set the vertical world-frame velocity (px/s, positive is down).
    pub fn set_ysp(&mut self, ysp: f32) {
        self.ysp = ysp;
    }

    /// Signed ground speed along the surface tangent (px/s).
    #[must_use]
    pub fn gsp(&self) -> f32 {
        self.gsp
    }

    /// Set the ground speed (px/s).
    pub fn set_gsp(&mut self, gsp: f32) {
        self.gsp = gsp;
    }

    // ==================== tunable parameters ====================

    parameter_accessors! {
        walking.acceleration => acceleration, set_acceleration;
        walking.deceleration => deceleration, set_deceleration;
        walking.friction => friction, set_friction;
        walking.top_speed => top_speed, set_top_speed;
        walking.cap_speed => cap_speed, set_cap_speed;
        walking.slope_factor => slope_factor, set_slope_factor;
        walking.walk_threshold => walk_threshold, set_walk_threshold;
        walking.braking_threshold => braking_threshold, set_braking_threshold;
        walking.fall_off_threshold => fall_off_threshold, set_fall_off_threshold;
        walking.wait_time => wait_time, set_wait_time;
        air.acceleration => air_acceleration, set_air_acceleration;
        air.gravity => gravity, set_gravity;
        air.top_y_speed => top_y_speed, set_top_y_speed;
        air.drag_threshold => air_drag_threshold, set_air_drag_threshold;
        air.drag_x_threshold => air_drag_x_threshold, set_air_drag_x_threshold;
        jumping.impulse => jump_impulse, set_jump_impulse;
        jumping.release_speed => jump_release_speed, set_jump_release_speed;
        jumping.death_impulse => death_impulse, set_death_impulse;
        jumping.hit_impulse => hit_impulse, set_hit_impulse;
        rolling.friction => roll_friction, set_roll_friction;
        rolling.deceleration => roll_deceleration, set_roll_deceleration;
        rolling.uphill_slope_factor => roll_uphill_slope_factor, set_roll_uphill_slope_factor;
        rolling.downhill_slope_factor => roll_downhill_slope_factor, set_roll_downhill_slope_factor;
        rolling.roll_threshold => roll_threshold, set_roll_threshold;
        rolling.unroll_threshold => unroll_threshold, set_unroll_threshold;
        rolling.charge_speed => charge_speed, set_charge_speed;
        rolling.charge_threshold => charge_threshold, set_charge_threshold;
    }

    /// The air drag ratio.
    #[must_use]
    pub fn air_drag(&self) -> f32 {
        self.config.air.drag
    }

    /// Set the air drag ratio (clamped to [0, 1]; the linearized
    /// coefficients are recomputed).
    pub fn set_air_drag(&mut self, drag: f32) {
        self.config.set_air_drag(drag);
    }

    // ==================== sensors ====================

    /// The sensor set of the current pose.
    #[must_use]
    pub fn sensors(&self) -> &SensorSet {
        self.bank.set(self.active_pose())
    }

    pub(crate) fn sensors_mut(&mut self) -> &mut SensorSet {
        let pose = self.active_pose();
        self.bank.set_mut(pose)
    }

    pub(crate) fn active_pose(&self) -> SensorPose {
        SensorPose::select(self.state, self.midair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trip() {
        let mut actor = PhysicsActor::new(Vec2::new(3.0, 4.0));
        assert_eq!(actor.position(), Vec2::new(3.0, 4.0));

        actor.set_position(Vec2::new(-7.5, 12.0));
        assert_eq!(actor.position(), Vec2::new(-7.5, 12.0));
    }

    #[test]
    fn spawns_stopped_and_midair() {
        let actor = PhysicsActor::default();
        assert_eq!(actor.state(), ActorState::Stopped);
        assert_eq!(actor.movmode(), MovMode::Floor);
        assert!(actor.is_midair());
        assert!(actor.is_facing_right());
    }

    #[test]
    fn angle_degrees_at_cardinals() {
        let mut actor = PhysicsActor::default();
        assert_eq!(actor.angle_degrees(), 0);
        actor.angle = 0x40;
        assert_eq!(actor.angle_degrees(), 270);
        actor.angle = 0x80;
        assert_eq!(actor.angle_degrees(), 180);
        actor.angle = 0xC0;
        assert_eq!(actor.angle_degrees(), 90);
    }

    #[test]
    fn resurrect_only_from_terminal_states() {
        let mut actor = PhysicsActor::default();
        assert!(!actor.resurrect(Vec2::ZERO));

        actor.kill();
        actor.set_ysp(-100.0);
        assert!(actor.resurrect(Vec2::new(8.0, 8.0)));
        assert_eq!(actor.state(), ActorState::Stopped);
        assert_eq!(actor.position(), Vec2::new(8.0, 8.0));
        assert_eq!(actor.ysp(), 0.0);

        actor.drown();
        assert!(actor.resurrect(Vec2::ZERO));
    }

    #[test]
    fn horizontal_lock_never_shortens() {
        let mut actor = PhysicsActor::default();
        actor.lock_horizontally_for(0.5);
        actor.lock_horizontally_for(0.2);
        assert_eq!(actor.hlock_timer, 0.5);

        actor.lock_horizontally_for(-1.0);
        assert_eq!(actor.hlock_timer, 0.5);

        actor.lock_horizontally_for(0.8);
        assert_eq!(actor.hlock_timer, 0.8);
    }

    #[test]
    fn bounding_box_on_the_floor() {
        let mut actor = PhysicsActor::default();
        actor.midair = false;

        let (width, height, center) = actor.bounding_box();
        assert_eq!(width, 21);
        assert_eq!(height, 45);
        assert_eq!(center, actor.position());
    }

    #[test]
    fn roll_delta_is_the_foot_sensor_difference() {
        let actor = PhysicsActor::default();
        assert_eq!(actor.roll_delta(), 1);
    }

    #[test]
    fn parameter_accessors_delegate_to_the_config() {
        let mut actor = PhysicsActor::default();
        assert_eq!(actor.top_speed(), 360.0);

        actor.set_top_speed(420.0);
        assert_eq!(actor.top_speed(), 420.0);
        assert_eq!(actor.config().walking.top_speed, 420.0);

        actor.reset_model_parameters();
        assert_eq!(actor.top_speed(), 360.0);
    }

    #[test]
    fn set_air_drag_recomputes_coefficients() {
        let mut actor = PhysicsActor::default();
        actor.set_air_drag(1.0);
        assert_eq!(actor.config().air_drag_coefficient(), [0.0, 1.0]);

        actor.set_air_drag(5.0);
        assert_eq!(actor.air_drag(), 1.0);
    }

    #[test]
    fn breathe_arms_the_timer() {
        let mut actor = PhysicsActor::default();
        actor.breathe();
        assert_eq!(actor.state(), ActorState::Breathing);
        assert_eq!(actor.breathe_timer, 0.5);
    }
}
