//! Flat Arena Demo
//!
//! A playable sandbox with a floor, walls on both sides, a staircase of
//! solid steps and a one-way cloud platform. Sensors are drawn with
//! gizmos so the collision probes are visible while you play.
//!
//! ## Controls
//! - **Left/Right**: Move
//! - **Down**: Duck / roll at speed (hold Down + tap Space to charge)
//! - **Up**: Look up
//! - **Space**: Jump
//!
//! ## Running
//! ```bash
//! cargo run --example flat_arena
//! ```

use bevy::prelude::*;
use pixel_platformer_controller::prelude::*;

// ==================== Constants ====================

const ARENA_WIDTH: i32 = 800;
const FLOOR_SURFACE_Y: i32 = 120;
const WALL_THICKNESS: i32 = 24;

// ==================== Main ====================

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Flat Arena - Platformer Physics Demo".into(),
                resolution: (1280, 720).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(build_map())
        .add_plugins(PhysicsActorPlugin::<StaticObstacleMap>::default())
        .add_systems(Startup, setup)
        .add_systems(Update, keyboard_controls.before(PhysicsActorSet))
        .add_systems(
            PostUpdate,
            (draw_map_gizmos, draw_sensor_gizmos, follow_player),
        )
        .run();
}

fn build_map() -> StaticObstacleMap {
    let mut map = StaticObstacleMap::new();
    let half = ARENA_WIDTH / 2;

    // Floor and boundary walls.
    map.add_solid(-half, FLOOR_SURFACE_Y, ARENA_WIDTH, 64);
    map.add_solid(-half - WALL_THICKNESS, -400, WALL_THICKNESS, 520 + FLOOR_SURFACE_Y);
    map.add_solid(half, -400, WALL_THICKNESS, 520 + FLOOR_SURFACE_Y);

    // A staircase of steps on the right.
    for step in 1..=4 {
        map.add_solid(
            120 + step * 40,
            FLOOR_SURFACE_Y - step * 16,
            40,
            step * 16 + 8,
        );
    }

    // A cloud platform: jump through it from below, land on top.
    map.add_cloud(-220, FLOOR_SURFACE_Y - 90, 140, 8);

    map
}

// ==================== Systems ====================

fn setup(mut commands: Commands) {
    // The physics uses screen coordinates (y down); flip the camera so
    // the world renders the right way up.
    commands.spawn((
        Camera2d,
        Transform::from_scale(Vec3::new(1.0, -1.0, 1.0)),
    ));

    commands.spawn(PhysicsActor::new(Vec2::new(0.0, 0.0)));
}

fn keyboard_controls(keys: Res<ButtonInput<KeyCode>>, mut actors: Query<&mut PhysicsActor>) {
    for mut actor in &mut actors {
        if keys.pressed(KeyCode::ArrowLeft) || keys.pressed(KeyCode::KeyA) {
            actor.walk_left();
        }
        if keys.pressed(KeyCode::ArrowRight) || keys.pressed(KeyCode::KeyD) {
            actor.walk_right();
        }
        if keys.pressed(KeyCode::ArrowDown) || keys.pressed(KeyCode::KeyS) {
            actor.duck();
        }
        if keys.pressed(KeyCode::ArrowUp) || keys.pressed(KeyCode::KeyW) {
            actor.look_up();
        }
        if keys.pressed(KeyCode::Space) {
            actor.jump();
        }
    }
}

fn draw_map_gizmos(map: Res<StaticObstacleMap>, mut gizmos: Gizmos) {
    for obstacle in map.obstacles() {
        let size = Vec2::new(obstacle.width as f32, obstacle.height as f32);
        let center = Vec2::new(obstacle.x as f32, obstacle.y as f32) + size / 2.0;
        let color = if obstacle.solid {
            Color::srgb(0.5, 0.5, 0.6)
        } else {
            Color::srgb(0.3, 0.6, 0.9)
        };
        gizmos.rect_2d(Isometry2d::from_translation(center), size, color);
    }
}

fn follow_player(
    actors: Query<&PhysicsActor>,
    mut cameras: Query<&mut Transform, With<Camera2d>>,
) {
    let Ok(actor) = actors.single() else {
        return;
    };

    for mut transform in &mut cameras {
        transform.translation.x = actor.position().x;
        transform.translation.y = actor.position().y;
    }
}
