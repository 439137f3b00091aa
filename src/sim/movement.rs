//! Physics & movement integrator
//!
//! Forward progress is derived from speeds, never steered: players move
//! vertically, everything else scrolls past them.

use glam::Vec2;

use super::ability::{nearest_targets, resolve_target};
use super::state::{GameState, ProjectileKind, Slot};
use super::tick::TickInput;
use crate::consts::*;
use crate::{frames, lane_bounds, normalize_angle};

/// Advance every moving entity by `dt` milliseconds
pub fn integrate(state: &mut GameState, input: &TickInput, dt: f32) {
    let f = frames(dt);

    steer_players(state, input, f);
    advance_players(state, f);
    move_traffic(state, f);
    move_projectiles(state, f);
    update_particles(state, dt, f);

    state.screen_shake *= 0.9f32.powf(f);
    if state.screen_shake < 0.01 {
        state.screen_shake = 0.0;
    }
}

/// Vertical steering from held keys (or pointer drag for player one)
fn steer_players(state: &mut GameState, input: &TickInput, f: f32) {
    let slippery = state.config.slippery();
    let accel = state.tuning.slippery_accel;
    let single = !state.config.two_player();

    for (i, p) in state.players.iter_mut().enumerate() {
        if !p.is_alive() {
            continue;
        }
        let handling = state.config.players[i].vehicle.handling;
        let intent = input.players[i].axis();

        if slippery {
            p.vel_y += intent * handling * accel * f;
            p.vel_y *= SLIPPERY_FRICTION.powf(f);
            p.pos.y += p.vel_y * f;
        } else {
            p.pos.y += intent * handling * STEER_FACTOR * f;
        }

        if single && i == 0 {
            if let Some(y) = input.drag_y {
                p.pos.y = y;
                p.vel_y = 0.0;
            }
        }

        p.clamp_to_track();
    }
}

/// Effective forward speed of the player at `index` this tick.
///
/// The opponent's time hack halves it, the opponent's time stop zeroes it.
pub fn effective_speed(state: &GameState, index: usize) -> f32 {
    let Some(p) = state.players.get(index) else {
        return 0.0;
    };
    let mut speed = p.own_speed();
    if let Some(other) = state.player(Slot::from_index(index).other()) {
        if other.status.time_hacked {
            speed *= 0.5;
        }
        if other.status.time_stopped {
            speed = 0.0;
        }
    }
    speed.max(0.0)
}

fn advance_players(state: &mut GameState, f: f32) {
    let speeds: Vec<f32> = (0..state.players.len())
        .map(|i| effective_speed(state, i))
        .collect();

    state.road_speed = speeds.iter().copied().fold(0.0, f32::max);
    state.road_offset = (state.road_offset - state.road_speed * f) % ROAD_TILE;

    for (p, speed) in state.players.iter_mut().zip(&speeds) {
        p.distance += speed / DISTANCE_SCALE * f;
    }

    // Trailing players drift left of the leader
    let leader = state.leader_distance();
    for p in &mut state.players {
        p.pos.x = PLAYER_BASE_X + (p.distance - leader) * RACE_POSITION_SCALE;
    }
}

fn move_traffic(state: &mut GameState, f: f32) {
    let stopped = state.any_player(|s| s.time_stopped);
    let slow = if state.any_player(|s| s.time_hacked) { 0.5 } else { 1.0 };
    let road = state.road_speed;

    for t in &mut state.traffic {
        let own = if stopped { 0.0 } else { t.speed };
        t.pos.x -= (road + own) * slow * f;
    }
    state.traffic.retain(|t| t.pos.x >= -t.size.x);
}

fn move_projectiles(state: &mut GameState, f: f32) {
    let turn_rate = state.tuning.missile_turn_rate;

    for i in 0..state.projectiles.len() {
        let mut p = state.projectiles[i].clone();
        match p.kind {
            ProjectileKind::Shuriken | ProjectileKind::HeavyOrb => {
                p.pos += p.vel * f;
            }
            ProjectileKind::Missile { target } => {
                let center = p.center();
                let mut aim = target.and_then(|t| resolve_target(state, t).map(|at| (t, at)));
                if aim.is_none() {
                    // Lost the target: take the nearest valid one, if any
                    aim = nearest_targets(state, p.owner, center, 1)
                        .into_iter()
                        .find_map(|t| resolve_target(state, t).map(|at| (t, at)));
                }
                p.kind = ProjectileKind::Missile { target: aim.map(|(t, _)| t) };

                if let Some((_, at)) = aim {
                    let speed = p.vel.length();
                    let heading = p.vel.y.atan2(p.vel.x);
                    let wanted = (at.y - center.y).atan2(at.x - center.x);
                    let max_turn = turn_rate * f;
                    let turn = normalize_angle(wanted - heading).clamp(-max_turn, max_turn);
                    p.vel = Vec2::from_angle(heading + turn) * speed;
                }
                p.pos += p.vel * f;
            }
            ProjectileKind::Drone { offset } => {
                if let Some(owner) = state.player(p.owner) {
                    p.pos = owner.pos + offset;
                }
            }
        }
        state.projectiles[i] = p;
    }

    state.projectiles.retain(|p| !p.out_of_bounds());
}

fn update_particles(state: &mut GameState, dt: f32, f: f32) {
    for particle in &mut state.particles {
        particle.pos += particle.vel * f;
        particle.life -= dt / 800.0;
    }
    state.particles.retain(|p| p.life > 0.0);
}

/// Keep a y coordinate inside the track for a car of height `h`
pub fn clamp_lane(y: f32, h: f32) -> f32 {
    let (lo, hi) = lane_bounds(h);
    y.clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Catalog, GameMode, SessionConfig};
    use crate::sim::state::{Projectile, Shape, TargetRef, Traffic};
    use crate::sim::tick::PlayerIntent;
    use crate::tuning::Tuning;

    fn single(vehicle: &str, world: u8, mode: GameMode) -> GameState {
        let setup = Catalog::builtin().setup(vehicle, "rookie").unwrap();
        let config = SessionConfig::single(mode, world, 1, setup).unwrap();
        GameState::new(config, Tuning::quiet(), 3)
    }

    fn versus() -> GameState {
        let catalog = Catalog::builtin();
        let config = SessionConfig::versus(
            catalog.setup("basic", "tech").unwrap(),
            catalog.setup("basic", "chrono").unwrap(),
        )
        .unwrap();
        GameState::new(config, Tuning::quiet(), 3)
    }

    fn hold_up() -> TickInput {
        TickInput {
            players: [
                PlayerIntent { up: true, ..Default::default() },
                PlayerIntent::default(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_distance_per_frame() {
        let mut s = single("basic", 1, GameMode::Infinite);
        integrate(&mut s, &TickInput::default(), FRAME_MS);
        // base 6, x2 road factor, /100
        assert!((s.players[0].distance - 0.12).abs() < 1e-5);
        assert!((s.road_speed - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_steering_scales_with_handling() {
        let mut s = single("basic", 1, GameMode::Infinite);
        let y0 = s.players[0].pos.y;
        integrate(&mut s, &hold_up(), FRAME_MS);
        assert!((y0 - s.players[0].pos.y - 5.0 * STEER_FACTOR).abs() < 1e-4);
    }

    #[test]
    fn test_position_clamped_every_tick() {
        let mut s = single("basic", 1, GameMode::Infinite);
        for _ in 0..200 {
            integrate(&mut s, &hold_up(), FRAME_MS);
        }
        assert_eq!(s.players[0].pos.y, TRACK_MARGIN);
    }

    #[test]
    fn test_slippery_keeps_sliding_after_release() {
        let mut s = single("frost", 3, GameMode::Infinite);
        for _ in 0..10 {
            integrate(&mut s, &hold_up(), FRAME_MS);
        }
        let y = s.players[0].pos.y;
        let v = s.players[0].vel_y;
        assert!(v < 0.0);

        integrate(&mut s, &TickInput::default(), FRAME_MS);
        assert!(s.players[0].pos.y < y);
        assert!(s.players[0].vel_y.abs() < v.abs());
    }

    #[test]
    fn test_drag_sets_player_one_y() {
        let mut s = single("basic", 1, GameMode::Infinite);
        let input = TickInput { drag_y: Some(250.0), ..Default::default() };
        integrate(&mut s, &input, FRAME_MS);
        assert_eq!(s.players[0].pos.y, 250.0);

        let input = TickInput { drag_y: Some(1000.0), ..Default::default() };
        integrate(&mut s, &input, FRAME_MS);
        assert_eq!(s.players[0].pos.y, clamp_lane(1000.0, CAR_HEIGHT));
    }

    #[test]
    fn test_time_effects_hit_the_other_player() {
        let mut s = versus();
        s.players[0].status.time_hacked = true;
        assert_eq!(effective_speed(&s, 0), 12.0);
        assert_eq!(effective_speed(&s, 1), 6.0);

        s.players[1].status.time_stopped = true;
        assert_eq!(effective_speed(&s, 0), 0.0);
    }

    #[test]
    fn test_trailing_player_drawn_behind_leader() {
        let mut s = versus();
        s.players[0].distance = 10.0;
        s.players[1].distance = 8.0;
        integrate(&mut s, &TickInput::default(), 0.0);
        assert_eq!(s.players[0].pos.x, PLAYER_BASE_X);
        assert_eq!(s.players[1].pos.x, PLAYER_BASE_X - 30.0);
    }

    #[test]
    fn test_traffic_scrolls_and_leaves() {
        let mut s = single("basic", 1, GameMode::Infinite);
        let id = s.next_entity_id();
        s.traffic.push(Traffic {
            id,
            pos: Vec2::new(-60.0, 100.0),
            size: Vec2::new(CAR_WIDTH, CAR_HEIGHT),
            speed: 3.0,
        });
        integrate(&mut s, &TickInput::default(), FRAME_MS);
        assert!(s.traffic.is_empty());
    }

    #[test]
    fn test_missile_with_dead_target_flies_straight() {
        let mut s = single("basic", 1, GameMode::Infinite);
        let id = s.next_entity_id();
        s.projectiles.push(Projectile {
            id,
            owner: Slot::One,
            kind: ProjectileKind::Missile { target: Some(TargetRef::Traffic(999)) },
            shape: Shape::Box { size: Vec2::new(20.0, 10.0) },
            pos: Vec2::new(200.0, 100.0),
            vel: Vec2::new(6.0, 0.0),
        });
        integrate(&mut s, &TickInput::default(), FRAME_MS);
        let m = &s.projectiles[0];
        assert_eq!(m.kind, ProjectileKind::Missile { target: None });
        assert_eq!(m.pos, Vec2::new(206.0, 100.0));
    }

    #[test]
    fn test_missile_retargets_and_turns_bounded() {
        let mut s = single("basic", 1, GameMode::Infinite);
        let tid = s.next_entity_id();
        s.traffic.push(Traffic {
            id: tid,
            pos: Vec2::new(400.0, 300.0),
            size: Vec2::new(CAR_WIDTH, CAR_HEIGHT),
            speed: 0.0,
        });
        let id = s.next_entity_id();
        s.projectiles.push(Projectile {
            id,
            owner: Slot::One,
            kind: ProjectileKind::Missile { target: Some(TargetRef::Traffic(999)) },
            shape: Shape::Box { size: Vec2::new(20.0, 10.0) },
            pos: Vec2::new(200.0, 100.0),
            vel: Vec2::new(6.0, 0.0),
        });
        integrate(&mut s, &TickInput::default(), FRAME_MS);
        let m = &s.projectiles[0];
        assert_eq!(m.kind, ProjectileKind::Missile { target: Some(TargetRef::Traffic(tid)) });
        let heading = m.vel.y.atan2(m.vel.x);
        assert!(heading > 0.0 && heading <= Tuning::default().missile_turn_rate + 1e-5);
        assert!((m.vel.length() - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_particles_fade_out() {
        let mut s = single("basic", 1, GameMode::Infinite);
        crate::sim::spawn::explode(&mut s, Vec2::new(50.0, 50.0), crate::sim::state::Burst::Crash, false);
        assert!(!s.particles.is_empty());
        for _ in 0..60 {
            integrate(&mut s, &TickInput::default(), FRAME_MS);
        }
        assert!(s.particles.is_empty());
        assert!(s.screen_shake < 8.0);
    }
}
