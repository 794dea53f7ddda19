//! Actor state enums.
//!
//! `ActorState` is the animation/control state of the actor and `MovMode`
//! is the cardinal surface the actor is currently attached to. Both are
//! plain enums so that collision response, ground snapping and sensor
//! rotation can match on them exhaustively.

use bevy::prelude::*;

/// Animation / control state of the physics actor.
///
/// The simulation derives this from inputs and kinematics every tick;
/// external code may force a few of them (see the state setters on
/// [`PhysicsActor`](crate::actor::PhysicsActor)).
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActorState {
    /// Standing still.
    #[default]
    Stopped,
    /// Idle for a while (plays the impatient animation).
    Waiting,
    /// Moving on the ground below top speed.
    Walking,
    /// Moving on the ground at top speed.
    Running,
    /// Airborne after a jump.
    Jumping,
    /// Launched upward by a spring.
    Springing,
    /// Curled into a ball.
    Rolling,
    /// Crouched and charging a spin release.
    Charging,
    /// Pressing against a wall.
    Pushing,
    /// Knocked back after taking damage.
    GettingHit,
    /// Dead (falls out of the world).
    Dead,
    /// Skidding to a halt.
    Braking,
    /// Balancing on the edge of a platform.
    Ledge,
    /// Drowned (falls out of the world).
    Drowned,
    /// Taking a breath (air bubble).
    Breathing,
    /// Crouched down.
    Ducking,
    /// Looking up.
    LookingUp,
    /// Level-clear pose.
    Winning,
}

impl ActorState {
    /// States in which the actor no longer responds to the simulation
    /// (only gravity applies).
    pub fn is_terminal(self) -> bool {
        matches!(self, ActorState::Dead | ActorState::Drowned)
    }
}

/// Which of the four cardinal surfaces the actor is oriented to.
///
/// This is always the quadrant of the actor's binary angle: an angle
/// below 0x20 or above 0xE0 means the floor, and so on around the circle.
/// The four boundary angles (0x20, 0x60, 0xA0, 0xE0) keep the previous
/// mode.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovMode {
    /// Standing on a floor; local down is world down.
    #[default]
    Floor,
    /// Standing on a wall to the right; local down is world right.
    RightWall,
    /// Standing on a ceiling; local down is world up.
    Ceiling,
    /// Standing on a wall to the left; local down is world left.
    LeftWall,
}

impl MovMode {
    /// Rotate sprite-local coordinates into world offsets.
    #[inline]
    pub fn rotate(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            MovMode::Floor => (x, y),
            MovMode::RightWall => (y, -x),
            MovMode::Ceiling => (-x, -y),
            MovMode::LeftWall => (-y, x),
        }
    }

    /// Unit vector of the actor's local "down" axis, in world space.
    #[inline]
    pub fn local_down(self) -> IVec2 {
        match self {
            MovMode::Floor => IVec2::new(0, 1),
            MovMode::RightWall => IVec2::new(1, 0),
            MovMode::Ceiling => IVec2::new(0, -1),
            MovMode::LeftWall => IVec2::new(-1, 0),
        }
    }
}
