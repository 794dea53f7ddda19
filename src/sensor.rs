//! Collision sensors.
//!
//! The actor is not a bitmask: it probes the obstacle map with seven
//! short axis-aligned segments (A/B at the feet, C/D at the head, M/N at
//! the sides, U above the center). Sensor coordinates are sprite-local
//! and rotated into world space by the current movement mode.
//!
//! The sensor positions depend on the actor's pose. Instead of mutating
//! coordinates every frame, the bank stores three immutable sets (normal,
//! airborne, jump/roll) and selection is a pure function of state.

use bevy::prelude::*;

use crate::obstacle::{Obstacle, ObstacleLayer, ObstacleMap};
use crate::state::{ActorState, MovMode};

/// An axis-aligned probe segment in sprite-local coordinates.
///
/// The endpoints are immutable after construction; only the enabled flag
/// changes at runtime (disabled sensors report no obstacle).
#[derive(Reflect, Debug, Clone)]
pub struct Sensor {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    color: Color,
    enabled: bool,
}

impl Sensor {
    /// A vertical segment at local `x` spanning `y1..=y2`.
    pub fn vertical(x: i32, y1: i32, y2: i32, color: Color) -> Self {
        Self {
            x1: x,
            y1,
            x2: x,
            y2,
            color,
            enabled: true,
        }
    }

    /// A horizontal segment at local `y` spanning `x1..=x2`.
    pub fn horizontal(y: i32, x1: i32, x2: i32, color: Color) -> Self {
        Self {
            x1,
            y1: y,
            x2,
            y2: y,
            color,
            enabled: true,
        }
    }

    /// Local x of the first endpoint.
    pub fn x1(&self) -> i32 {
        self.x1
    }

    /// Local y of the first endpoint.
    pub fn y1(&self) -> i32 {
        self.y1
    }

    /// Local x of the second endpoint.
    pub fn x2(&self) -> i32 {
        self.x2
    }

    /// Local y of the second endpoint.
    pub fn y2(&self) -> i32 {
        self.y2
    }

    /// Debug color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Is the sensor currently probing?
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the sensor.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// World position of the first endpoint, rotated by `movmode`.
    pub fn head(&self, position: Vec2, movmode: MovMode) -> IVec2 {
        let (x, y) = movmode.rotate(self.x1, self.y1);
        IVec2::new(position.x as i32 + x, position.y as i32 + y)
    }

    /// World position of the second endpoint, rotated by `movmode`.
    pub fn tail(&self, position: Vec2, movmode: MovMode) -> IVec2 {
        let (x, y) = movmode.rotate(self.x2, self.y2);
        IVec2::new(position.x as i32 + x, position.y as i32 + y)
    }

    /// World extent of the segment as a normalized (min, max) pixel box.
    pub fn world_extent(&self, position: Vec2, movmode: MovMode) -> (IVec2, IVec2) {
        let head = self.head(position, movmode);
        let tail = self.tail(position, movmode);
        (head.min(tail), head.max(tail))
    }

    /// Probe the obstacle map along the segment. Disabled sensors see
    /// nothing.
    pub fn check<'m>(
        &self,
        position: Vec2,
        movmode: MovMode,
        layer: ObstacleLayer,
        map: &'m dyn ObstacleMap,
    ) -> Option<&'m dyn Obstacle> {
        if !self.enabled {
            return None;
        }

        let (min, max) = self.world_extent(position, movmode);
        map.best_obstacle_at(min.x, min.y, max.x, max.y, movmode, layer)
    }
}

/// Which of the three precomputed sensor sets is active.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPose {
    /// Standing, walking, every grounded non-rolling state.
    Normal,
    /// Airborne (and springing).
    Airborne,
    /// Jumping or rolling: the hitbox shrinks into a ball.
    JumpRoll,
}

impl SensorPose {
    /// Pose selection is a pure function of the animation state and the
    /// midair flag.
    pub fn select(state: ActorState, midair: bool) -> Self {
        if matches!(state, ActorState::Jumping | ActorState::Rolling) {
            SensorPose::JumpRoll
        } else if midair || state == ActorState::Springing {
            SensorPose::Airborne
        } else {
            SensorPose::Normal
        }
    }
}

/// The seven sensors of one pose.
#[derive(Reflect, Debug, Clone)]
pub struct SensorSet {
    /// Left foot (vertical).
    pub a: Sensor,
    /// Right foot (vertical).
    pub b: Sensor,
    /// Left head (vertical).
    pub c: Sensor,
    /// Right head (vertical).
    pub d: Sensor,
    /// Left side (horizontal).
    pub m: Sensor,
    /// Right side (horizontal).
    pub n: Sensor,
    /// Upward smash probe (degenerate point).
    pub u: Sensor,
}

impl SensorSet {
    /// All seven sensors, for iteration (debug rendering).
    pub fn all(&self) -> [&Sensor; 7] {
        [
            &self.a, &self.b, &self.c, &self.d, &self.m, &self.n, &self.u,
        ]
    }
}

/// The three immutable sensor sets, indexed by pose.
#[derive(Reflect, Debug, Clone)]
pub struct SensorBank {
    normal: SensorSet,
    airborne: SensorSet,
    jump_roll: SensorSet,
}

fn foot_color() -> (Color, Color) {
    (Color::srgb_u8(0, 255, 0), Color::srgb_u8(255, 255, 0))
}

impl Default for SensorBank {
    fn default() -> Self {
        let (left, right) = foot_color();
        let side_left = Color::srgb_u8(255, 0, 0);
        let side_right = Color::srgb_u8(255, 64, 255);
        let smash = Color::WHITE;

        Self {
            normal: SensorSet {
                a: Sensor::vertical(-9, 0, 20, left),
                b: Sensor::vertical(9, 0, 20, right),
                c: Sensor::vertical(-9, -24, 0, left),
                d: Sensor::vertical(9, -24, 0, right),
                m: Sensor::horizontal(4, -10, 0, side_left),
                n: Sensor::horizontal(4, 0, 10, side_right),
                u: Sensor::horizontal(-4, 0, 0, smash),
            },
            airborne: SensorSet {
                a: Sensor::vertical(-9, 0, 20, left),
                b: Sensor::vertical(9, 0, 20, right),
                c: Sensor::vertical(-9, -24, 0, left),
                d: Sensor::vertical(9, -24, 0, right),
                m: Sensor::horizontal(0, -11, 0, side_left),
                n: Sensor::horizontal(0, 0, 11, side_right),
                u: Sensor::horizontal(-4, 0, 0, smash),
            },
            jump_roll: SensorSet {
                a: Sensor::vertical(-5, 0, 19, left),
                b: Sensor::vertical(5, 0, 19, right),
                c: Sensor::vertical(-5, -10, 0, left),
                d: Sensor::vertical(5, -10, 0, right),
                m: Sensor::horizontal(0, -11, 0, side_left),
                n: Sensor::horizontal(0, 0, 11, side_right),
                u: Sensor::horizontal(-4, 0, 0, smash),
            },
        }
    }
}

impl SensorBank {
    /// The sensor set of a pose.
    pub fn set(&self, pose: SensorPose) -> &SensorSet {
        match pose {
            SensorPose::Normal => &self.normal,
            SensorPose::Airborne => &self.airborne,
            SensorPose::JumpRoll => &self.jump_roll,
        }
    }

    /// Mutable access, used by the simulation to gate sensors.
    pub(crate) fn set_mut(&mut self, pose: SensorPose) -> &mut SensorSet {
        match pose {
            SensorPose::Normal => &mut self.normal,
            SensorPose::Airborne => &mut self.airborne,
            SensorPose::JumpRoll => &mut self.jump_roll,
        }
    }
}
