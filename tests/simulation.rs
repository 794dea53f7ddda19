//! Integration tests for the physics simulation.
//!
//! Each scenario builds a small obstacle map, drives an actor through it
//! frame by frame and proves the outcome with explicit kinematic checks.

use bevy::prelude::*;
use pixel_platformer_controller::input::Button;
use pixel_platformer_controller::prelude::*;

const DT: f32 = 1.0 / 60.0;

/// A wide solid floor whose walkable surface is at y = 10.
fn flat_map() -> StaticObstacleMap {
    let mut map = StaticObstacleMap::new();
    map.add_solid(-1000, 10, 2000, 64);
    map
}

/// Spawn at the origin and settle onto the floor.
fn grounded_actor(map: &StaticObstacleMap) -> PhysicsActor {
    let mut actor = PhysicsActor::new(Vec2::ZERO);
    run_frames(&mut actor, map, 10);
    assert!(!actor.is_midair(), "actor must start the scenario grounded");
    actor
}

/// Run `frames` outer frames with no input.
fn run_frames(actor: &mut PhysicsActor, map: &StaticObstacleMap, frames: usize) {
    for _ in 0..frames {
        actor.update(map, DT);
    }
}

/// Run `frames` outer frames holding the given buttons.
fn run_frames_holding(
    actor: &mut PhysicsActor,
    map: &StaticObstacleMap,
    frames: usize,
    buttons: &[Button],
) {
    for _ in 0..frames {
        for &button in buttons {
            actor.input_mut().simulate_down(button);
        }
        actor.update(map, DT);
    }
}

// ==================== Walking & Running ====================

mod walking {
    use super::*;

    #[test]
    fn accelerates_from_rest_toward_top_speed() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        // One second of holding right: classic acceleration is 168.75
        // px/s^2, so the actor is still below top speed.
        run_frames_holding(&mut actor, &map, 60, &[Button::Right]);

        println!(
            "PROOF: gsp={}, x={}, state={:?}",
            actor.gsp(),
            actor.position().x,
            actor.state()
        );
        assert!(
            (actor.gsp() - 168.75).abs() < 1.0,
            "one second of acceleration should reach ~168.75 px/s, got {}",
            actor.gsp()
        );
        assert_eq!(actor.state(), ActorState::Walking);
        assert!(actor.is_facing_right());
        assert!(
            actor.position().x > 80.0 && actor.position().x < 92.0,
            "expected ~85 px of travel, got {}",
            actor.position().x
        );
    }

    #[test]
    fn reaches_and_holds_top_speed() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        // 2.5 seconds is past the ~128 frames needed to top out.
        run_frames_holding(&mut actor, &map, 150, &[Button::Right]);

        println!("PROOF: gsp={}, state={:?}", actor.gsp(), actor.state());
        assert_eq!(actor.gsp(), actor.top_speed());
        assert_eq!(actor.state(), ActorState::Running);
    }

    #[test]
    fn ground_speed_is_projected_onto_the_world_axes() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        run_frames_holding(&mut actor, &map, 30, &[Button::Right]);

        // Flat floor: xsp = gsp, ysp = 0.
        assert_eq!(actor.xsp(), actor.gsp());
        assert_eq!(actor.ysp(), 0.0);
    }

    #[test]
    fn friction_stops_a_coasting_actor() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        run_frames_holding(&mut actor, &map, 60, &[Button::Right]);
        let coasting_speed = actor.gsp();

        run_frames(&mut actor, &map, 30);
        println!(
            "PROOF: gsp {} -> {} after coasting",
            coasting_speed,
            actor.gsp()
        );
        assert!(actor.gsp() < coasting_speed - 50.0, "friction should bite");

        // Long enough and the actor stands still again.
        run_frames(&mut actor, &map, 120);
        assert_eq!(actor.gsp(), 0.0);
        assert_eq!(actor.state(), ActorState::Stopped);
    }

    #[test]
    fn waits_impatiently_after_standing_still() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        // Default wait time is three seconds.
        run_frames(&mut actor, &map, 185);

        assert_eq!(actor.state(), ActorState::Waiting);
    }
}

// ==================== Jumping ====================

mod jumping {
    use super::*;

    #[test]
    fn jump_applies_the_impulse_and_resets_the_angle() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        actor.jump();
        actor.update(&map, DT);

        println!(
            "PROOF: ysp={}, state={:?}, angle={}, midair={}",
            actor.ysp(),
            actor.state(),
            actor.angle(),
            actor.is_midair()
        );
        assert_eq!(actor.ysp(), -390.0);
        assert_eq!(actor.state(), ActorState::Jumping);
        assert_eq!(actor.angle(), 0x0);
        assert!(actor.is_midair());
    }

    #[test]
    fn releasing_the_button_clamps_the_rise() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        actor.jump();
        actor.update(&map, DT);

        // Next frame without the button: still rising faster than the
        // release speed, so the rise is cut short.
        actor.update(&map, DT);
        assert_eq!(actor.ysp(), -240.0);
    }

    #[test]
    fn short_hop_peaks_lower_than_a_full_jump() {
        let map = flat_map();

        let apex = |hold_frames: usize| {
            let mut actor = grounded_actor(&map);
            let mut apex = actor.position().y;
            for frame in 0..120 {
                if frame < hold_frames {
                    actor.jump();
                }
                actor.update(&map, DT);
                apex = apex.min(actor.position().y);
            }
            assert!(!actor.is_midair(), "the jump should be over in 2 s");
            apex
        };

        let short = apex(3);
        let full = apex(30);

        println!("PROOF: short hop apex y={short}, full jump apex y={full}");
        // y grows down: the higher apex is the smaller y.
        assert!(full < short - 20.0, "full jump should peak much higher");
    }

    #[test]
    fn lands_back_in_a_grounded_state() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        actor.jump();
        run_frames(&mut actor, &map, 120);

        assert!(!actor.is_midair());
        assert_eq!(actor.state(), ActorState::Stopped);
        assert_eq!(actor.position().y, -9.0);
    }

    #[test]
    fn a_low_ceiling_stops_the_rise() {
        let mut map = flat_map();
        // Ceiling 60 px above the floor surface.
        map.add_solid(-1000, -80, 2000, 30);

        let mut actor = grounded_actor(&map);
        actor.jump();
        actor.update(&map, DT);

        let mut lowest = actor.position().y;
        for _ in 0..30 {
            actor.update(&map, DT);
            lowest = lowest.min(actor.position().y);
            assert!(
                actor.ysp() >= -390.0,
                "speed must never exceed the impulse"
            );
        }

        println!("PROOF: lowest y={lowest}");
        // The jump-pose head sensors reach 10 px above center; with the
        // ceiling bottom at y=-51, the center can never pass ~-41.
        assert!(
            lowest > -45.0,
            "the ceiling should have stopped the rise, got y={lowest}"
        );
    }
}

// ==================== Rolling & Charging ====================

mod rolling {
    use super::*;

    #[test]
    fn rolls_at_speed_and_keeps_rolling_without_down() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        // Well past the 60 px/s roll threshold.
        run_frames_holding(&mut actor, &map, 60, &[Button::Right]);
        assert!(actor.gsp() >= actor.roll_threshold());

        run_frames_holding(&mut actor, &map, 1, &[Button::Right, Button::Down]);
        assert_eq!(actor.state(), ActorState::Rolling);

        // Releasing down does not unroll while above the unroll
        // threshold.
        let speed_when_rolling = actor.gsp();
        run_frames(&mut actor, &map, 30);
        println!(
            "PROOF: rolling at {} px/s, decayed to {}",
            speed_when_rolling,
            actor.gsp()
        );
        assert_eq!(actor.state(), ActorState::Rolling);
        assert!(actor.gsp() < speed_when_rolling, "roll friction applies");
        assert!(actor.gsp() > actor.unroll_threshold());
    }

    #[test]
    fn unrolls_below_the_unroll_threshold() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        run_frames_holding(&mut actor, &map, 60, &[Button::Right]);
        run_frames_holding(&mut actor, &map, 1, &[Button::Right, Button::Down]);
        assert_eq!(actor.state(), ActorState::Rolling);

        // Roll friction is 84.375 px/s^2; a few seconds kills the roll.
        run_frames(&mut actor, &map, 240);
        assert_ne!(actor.state(), ActorState::Rolling);
        assert!(actor.gsp().abs() < actor.unroll_threshold());
    }

    #[test]
    fn ducking_charges_and_releases_into_a_spin() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        // Duck, then pump the charge once.
        run_frames_holding(&mut actor, &map, 1, &[Button::Down]);
        assert_eq!(actor.state(), ActorState::Ducking);

        run_frames_holding(&mut actor, &map, 1, &[Button::Down, Button::Fire1]);
        assert_eq!(actor.state(), ActorState::Charging);
        assert!(actor.charge_intensity() > 0.0);

        // Release down: the stored charge becomes ground speed.
        actor.update(&map, DT);
        println!("PROOF: released at gsp={}", actor.gsp());
        assert_eq!(actor.state(), ActorState::Rolling);
        assert!(actor.is_facing_right());
        assert!(
            actor.gsp() > 0.67 * actor.charge_speed() - 1.0,
            "release speed should start at 67% of the charge speed"
        );
        assert!(actor.gsp() <= actor.charge_speed());
        assert_eq!(actor.charge_intensity(), 0.0);
    }

    #[test]
    fn charging_requires_a_charge_speed() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);
        actor.set_charge_speed(0.0);

        run_frames_holding(&mut actor, &map, 1, &[Button::Down]);
        run_frames_holding(&mut actor, &map, 1, &[Button::Down, Button::Fire1]);

        assert_eq!(actor.state(), ActorState::Ducking);
    }
}

// ==================== Walls & Ledges ====================

mod walls {
    use super::*;

    #[test]
    fn pushes_against_a_wall_while_holding_into_it() {
        let mut map = flat_map();
        // A wall whose left face is at x = 50.
        map.add_solid(50, -62, 30, 72);

        let mut actor = grounded_actor(&map);
        run_frames_holding(&mut actor, &map, 90, &[Button::Right]);

        println!(
            "PROOF: x={}, gsp={}, state={:?}",
            actor.position().x,
            actor.gsp(),
            actor.state()
        );
        // The side sensor reaches 10 px right of center; the actor rests
        // just outside the wall (plus up to a pixel of re-acceleration
        // creep between contact frames).
        assert!(
            actor.position().x >= 39.0 && actor.position().x < 41.0,
            "expected the actor pinned at the wall, got x={}",
            actor.position().x
        );
        assert!(actor.gsp() < 20.0, "ground speed resets on every contact");
        assert_eq!(actor.state(), ActorState::Pushing);
        assert!(actor.is_facing_right());
    }

    #[test]
    fn stops_pushing_when_the_button_is_released() {
        let mut map = flat_map();
        map.add_solid(50, -62, 30, 72);

        let mut actor = grounded_actor(&map);
        run_frames_holding(&mut actor, &map, 90, &[Button::Right]);
        assert_eq!(actor.state(), ActorState::Pushing);

        run_frames(&mut actor, &map, 2);
        assert_eq!(actor.state(), ActorState::Stopped);
    }

    #[test]
    fn balances_on_a_ledge() {
        let mut map = StaticObstacleMap::new();
        // The floor ends just left of the actor's center.
        map.add_solid(-200, 10, 195, 64);

        let mut actor = PhysicsActor::new(Vec2::ZERO);
        run_frames(&mut actor, &map, 10);
        assert!(!actor.is_midair(), "the left foot still has ground");

        println!("PROOF: state={:?}", actor.state());
        assert_eq!(actor.state(), ActorState::Ledge);
        assert!(actor.is_facing_right(), "the drop is on the right side");
    }
}

// ==================== Air physics ====================

mod air {
    use super::*;

    fn rising_actor(drag: f32) -> PhysicsActor {
        let mut actor = PhysicsActor::new(Vec2::ZERO);
        actor.set_air_drag(drag);
        actor.set_xsp(50.0);
        actor.set_ysp(-100.0); // rising, slower than the drag threshold
        actor
    }

    #[test]
    fn drag_of_one_is_the_identity() {
        let map = StaticObstacleMap::new();
        let mut actor = rising_actor(1.0);

        actor.update(&map, DT);
        assert_eq!(actor.xsp(), 50.0);
    }

    #[test]
    fn drag_of_zero_kills_horizontal_speed_immediately() {
        let map = StaticObstacleMap::new();
        let mut actor = rising_actor(0.0);

        actor.update(&map, DT);
        assert_eq!(actor.xsp(), 0.0);
    }

    #[test]
    fn default_drag_decays_horizontal_speed_near_the_apex() {
        let map = StaticObstacleMap::new();
        let mut actor = rising_actor(31.0 / 32.0);

        actor.update(&map, DT);
        println!("PROOF: xsp={}", actor.xsp());
        assert!(actor.xsp() < 50.0 && actor.xsp() > 47.0);
    }

    #[test]
    fn gravity_accumulates_to_the_terminal_speed() {
        let map = StaticObstacleMap::new();
        let mut actor = PhysicsActor::new(Vec2::ZERO);

        run_frames(&mut actor, &map, 600);
        assert_eq!(actor.ysp(), actor.top_y_speed());
    }

    #[test]
    fn air_acceleration_respects_top_speed() {
        let map = StaticObstacleMap::new();
        let mut actor = PhysicsActor::new(Vec2::ZERO);

        run_frames_holding(&mut actor, &map, 300, &[Button::Right]);
        assert!(actor.xsp() <= actor.top_speed());
        assert!(actor.xsp() > 0.0);
    }
}

// ==================== Clouds ====================

mod clouds {
    use super::*;

    #[test]
    fn lands_on_a_cloud_from_above() {
        let mut map = StaticObstacleMap::new();
        map.add_cloud(-100, 30, 200, 8);

        let mut actor = PhysicsActor::new(Vec2::ZERO);
        run_frames(&mut actor, &map, 30);

        println!("PROOF: y={}, midair={}", actor.position().y, actor.is_midair());
        assert!(!actor.is_midair());
        assert_eq!(actor.position().y, 11.0);
    }

    #[test]
    fn jumps_up_through_a_cloud() {
        let mut map = StaticObstacleMap::new();
        map.add_solid(-1000, 80, 2000, 32);
        map.add_cloud(-100, 30, 200, 8);

        // Settle on the floor below the cloud.
        let mut actor = PhysicsActor::new(Vec2::new(0.0, 50.0));
        run_frames(&mut actor, &map, 10);
        assert!(!actor.is_midair());
        assert_eq!(actor.position().y, 61.0);

        // Jump: the rise passes straight through the cloud...
        actor.jump();
        actor.update(&map, DT);
        let mut apex = actor.position().y;
        for _ in 0..120 {
            actor.update(&map, DT);
            apex = apex.min(actor.position().y);
        }

        println!("PROOF: apex y={}, final y={}", apex, actor.position().y);
        assert!(apex < 10.0, "the jump should clear the cloud, got {apex}");

        // ...and the fall lands on top of it.
        assert!(!actor.is_midair());
        assert_eq!(actor.position().y, 11.0);
    }
}

// ==================== Control lock, hits, terminal states ====================

mod control {
    use super::*;

    #[test]
    fn horizontal_lock_masks_directions() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        actor.lock_horizontally_for(0.5);
        run_frames_holding(&mut actor, &map, 20, &[Button::Right]);
        assert_eq!(actor.gsp(), 0.0, "input is masked while locked");

        // After the lock expires, control returns.
        run_frames(&mut actor, &map, 15);
        run_frames_holding(&mut actor, &map, 20, &[Button::Right]);
        assert!(actor.gsp() > 0.0);
    }

    /// Knock the actor back the way game code does: set the state, lift
    /// it off the ground and launch it with the hit impulse.
    fn knock_back(actor: &mut PhysicsActor, xsp: f32) {
        actor.hit();
        actor.set_position(actor.position() - Vec2::new(0.0, 4.0));
        actor.set_xsp(xsp);
        actor.set_ysp(actor.hit_impulse());
    }

    #[test]
    fn getting_hit_ignores_input_and_faces_away() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        knock_back(&mut actor, -120.0);
        run_frames_holding(&mut actor, &map, 5, &[Button::Right]);

        assert_eq!(actor.state(), ActorState::GettingHit);
        assert!(actor.is_facing_right(), "faces opposite the knockback");
    }

    #[test]
    fn landing_after_a_hit_stops_the_actor() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        knock_back(&mut actor, -60.0);
        run_frames(&mut actor, &map, 180);

        assert!(!actor.is_midair());
        assert_eq!(actor.state(), ActorState::Stopped);
        assert_eq!(actor.xsp(), 0.0);
    }

    #[test]
    fn dead_actors_fall_through_everything() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        actor.kill();
        actor.set_ysp(actor.death_impulse());
        run_frames(&mut actor, &map, 240);

        println!("PROOF: y={}", actor.position().y);
        assert_eq!(actor.state(), ActorState::Dead);
        assert!(
            actor.position().y > 100.0,
            "a dead actor ignores the floor"
        );
        assert!(actor.is_facing_right());
    }

    #[test]
    fn resurrection_restores_control() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        actor.kill();
        run_frames(&mut actor, &map, 60);
        assert!(actor.resurrect(Vec2::ZERO));

        run_frames(&mut actor, &map, 10);
        assert!(!actor.is_midair());
        assert_eq!(actor.state(), ActorState::Stopped);
    }

    #[test]
    fn winning_pose_brakes_and_poses() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        run_frames_holding(&mut actor, &map, 90, &[Button::Right]);
        actor.enable_winning_pose();
        run_frames(&mut actor, &map, 300);

        println!("PROOF: state={:?}, gsp={}", actor.state(), actor.gsp());
        assert_eq!(actor.state(), ActorState::Winning);
        assert!(actor.gsp().abs() < actor.walk_threshold());
    }

    #[test]
    fn springing_turns_into_walking_past_the_apex() {
        let map = flat_map();
        let mut actor = grounded_actor(&map);

        actor.spring();
        actor.set_position(actor.position() - Vec2::new(0.0, 4.0));
        actor.set_ysp(-300.0);
        run_frames(&mut actor, &map, 2);
        assert_eq!(actor.state(), ActorState::Springing);

        // Past the apex the springing pose ends.
        run_frames(&mut actor, &map, 40);
        assert!(actor.ysp() > 0.0 || !actor.is_midair());
        assert_ne!(actor.state(), ActorState::Springing);
    }
}

// ==================== Invariants ====================

mod invariants {
    use super::*;

    fn check_invariants(actor: &PhysicsActor) {
        // The movement mode is the quadrant of the angle.
        let angle = actor.angle();
        if angle != 0x20 && angle != 0x60 && angle != 0xA0 && angle != 0xE0 {
            let expected = if angle < 0x20 || angle > 0xE0 {
                MovMode::Floor
            } else if angle < 0x60 {
                MovMode::LeftWall
            } else if angle < 0xA0 {
                MovMode::Ceiling
            } else {
                MovMode::RightWall
            };
            assert_eq!(actor.movmode(), expected, "movmode/angle mismatch");
        }

        // Ground speed is capped while grounded.
        if !actor.is_midair() {
            assert!(actor.gsp().abs() <= actor.cap_speed() + f32::EPSILON);
        }

        // Grounded-only states never survive midair.
        if actor.is_midair() {
            assert!(!matches!(
                actor.state(),
                ActorState::Pushing
                    | ActorState::Stopped
                    | ActorState::Waiting
                    | ActorState::Ducking
                    | ActorState::LookingUp
            ));
        }
    }

    #[test]
    fn hold_across_a_busy_scenario() {
        let mut map = flat_map();
        map.add_solid(300, -62, 30, 72);
        map.add_cloud(-300, -40, 100, 8);

        let mut actor = PhysicsActor::new(Vec2::ZERO);
        for frame in 0..600 {
            match frame % 120 {
                0..=50 => actor.walk_right(),
                51..=60 => {
                    actor.walk_right();
                    actor.jump();
                }
                61..=100 => actor.walk_left(),
                _ => actor.duck(),
            }
            actor.update(&map, DT);
            check_invariants(&actor);
        }
    }

    #[test]
    fn degraded_timestep_keeps_the_simulation_stable() {
        let map = flat_map();
        let mut actor = PhysicsActor::new(Vec2::ZERO);

        // Jittery frame times, some far beyond 1/60.
        let deltas = [0.016, 0.05, 0.016, 0.1, 0.033, 0.016, 0.25, 0.016];
        for _ in 0..20 {
            for &dt in &deltas {
                actor.update(&map, dt);
                check_invariants(&actor);
            }
        }

        assert!(!actor.is_midair());
        assert_eq!(actor.position().y, -9.0);
    }
}
