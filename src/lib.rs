//! A sensor-based 2D platformer physics controller for Bevy.
//!
//! One [`PhysicsActor`](actor::PhysicsActor) slides along arbitrarily
//! sloped terrain, runs around loops and up walls, jumps and rolls,
//! charges and releases a spin, pushes against walls, reattaches to
//! steep ceilings and balances on ledges. Motion, collision response
//! and the animation state all come out of a deterministic fixed-
//! timestep simulation over a static obstacle map, probed by seven
//! short line sensors instead of a collision shape.
//!
//! The obstacle map is yours: implement
//! [`ObstacleMap`](obstacle::ObstacleMap) over your level geometry, or
//! start with the built-in [`StaticObstacleMap`](map::StaticObstacleMap).
//!
//! Coordinates use the classic screen convention (y grows down); flip
//! on the rendering side if your camera looks the other way.
//!
//! # Example
//!
//! ```
//! use bevy::prelude::*;
//! use pixel_platformer_controller::prelude::*;
//!
//! let mut map = StaticObstacleMap::new();
//! map.add_solid(-320, 16, 640, 64);
//!
//! let mut actor = PhysicsActor::new(Vec2::ZERO);
//! for _ in 0..60 {
//!     actor.walk_right();
//!     actor.update(&map, 1.0 / 60.0);
//! }
//!
//! assert!(!actor.is_midair());
//! assert!(actor.gsp() > 0.0);
//! ```
//!
//! Inside a Bevy app, add [`PhysicsActorPlugin`] parameterized over your
//! obstacle-map resource and spawn entities with a `PhysicsActor`
//! component; the plugin drives every actor once per frame.

use std::marker::PhantomData;

use bevy::prelude::*;

pub mod actor;
pub mod angles;
pub mod config;
pub mod input;
pub mod map;
pub mod obstacle;
pub mod quest;
pub mod sensor;
mod sim;
pub mod state;

use actor::PhysicsActor;
use obstacle::ObstacleMap;

/// Commonly used items.
pub mod prelude {
    pub use crate::actor::PhysicsActor;
    pub use crate::config::{
        ActorConfig, AirConfig, JumpingConfig, RollingConfig, WalkingConfig, FIXED_TIMESTEP,
        TARGET_FPS,
    };
    pub use crate::input::{ActorInput, Button};
    pub use crate::map::{BoxObstacle, StaticObstacleMap};
    pub use crate::obstacle::{GroundDirection, Obstacle, ObstacleLayer, ObstacleMap};
    pub use crate::quest::{load_quest, Quest, QuestError};
    pub use crate::sensor::{Sensor, SensorBank, SensorPose, SensorSet};
    pub use crate::state::{ActorState, MovMode};
    pub use crate::{draw_sensor_gizmos, PhysicsActorPlugin, PhysicsActorSet};
}

/// Label of the system driving the physics actors; order your gameplay
/// systems against it.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicsActorSet;

/// Drives every [`PhysicsActor`] against the obstacle-map resource `M`
/// once per frame.
///
/// The actor carries its own fixed-timestep accumulator, so this runs in
/// the regular `Update` schedule with the frame delta.
pub struct PhysicsActorPlugin<M: ObstacleMap + Resource> {
    _map: PhantomData<M>,
}

impl<M: ObstacleMap + Resource> Default for PhysicsActorPlugin<M> {
    fn default() -> Self {
        Self { _map: PhantomData }
    }
}

impl<M: ObstacleMap + Resource> Plugin for PhysicsActorPlugin<M> {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, drive_physics_actors::<M>.in_set(PhysicsActorSet));
    }
}

/// Advance every actor by one outer frame.
pub fn drive_physics_actors<M: ObstacleMap + Resource>(
    time: Res<Time>,
    map: Res<M>,
    mut actors: Query<&mut PhysicsActor>,
) {
    let dt = time.delta_secs();
    for mut actor in &mut actors {
        actor.update(&*map, dt);
    }
}

/// Draw the active sensors, the sprite center and the angle probe
/// contacts of every actor. Add it to your app when tuning collision:
///
/// ```ignore
/// app.add_systems(PostUpdate, draw_sensor_gizmos);
/// ```
pub fn draw_sensor_gizmos(mut gizmos: Gizmos, actors: Query<&PhysicsActor>) {
    for actor in &actors {
        let position = actor.position();
        let movmode = actor.movmode();

        for sensor in actor.sensors().all() {
            if !sensor.is_enabled() {
                continue;
            }
            let head = sensor.head(position, movmode).as_vec2();
            let tail = sensor.tail(position, movmode).as_vec2();
            gizmos.line_2d(head, tail, sensor.color());
        }

        gizmos.circle_2d(Isometry2d::from_translation(position), 1.0, Color::WHITE);

        if !actor.is_midair() {
            for point in actor.angle_probe_points() {
                gizmos.circle_2d(Isometry2d::from_translation(point), 2.0, Color::BLACK);
            }
        }
    }
}
