//! Traffic, coin and particle spawning

use glam::Vec2;

use super::state::{Burst, Coin, EntityId, GameState, Particle, Traffic};
use crate::consts::*;

/// Run the traffic and coin spawn timers. Race-style sessions spawn nothing.
pub fn update_spawners(state: &mut GameState, dt: f32) {
    if state.config.is_race_style() {
        return;
    }

    // Time hack stretches every spawn interval
    let stretch = if state.any_player(|s| s.time_hacked) { 2.0 } else { 1.0 };

    state.traffic_timer -= dt;
    if state.traffic_timer <= 0.0 {
        if state.tuning.spawn_traffic {
            spawn_traffic(state);
        }
        let interval = state.tuning.traffic_interval(state.config.difficulty());
        state.traffic_timer = (state.random() * interval + interval / 2.0) * stretch;
    }

    state.coin_timer -= dt;
    if state.coin_timer <= 0.0 {
        if state.tuning.spawn_coins {
            spawn_coin(state);
        }
        let span = state.tuning.coin_interval_span_ms;
        state.coin_timer = (state.random() * span + state.tuning.coin_interval_min_ms) * stretch;
    }
}

/// Spawn one traffic car just past the right edge in a random lane position
pub fn spawn_traffic(state: &mut GameState) -> EntityId {
    let y = state.random() * (PLAYFIELD_HEIGHT - CAR_HEIGHT - 2.0 * TRACK_MARGIN) + TRACK_MARGIN;
    let rival_speed = state.tuning.rival_speed(state.config.difficulty());
    let speed = rival_speed * state.tuning.traffic_speed_factor
        + state.random() * state.tuning.traffic_speed_jitter;
    let id = state.next_entity_id();
    state.traffic.push(Traffic {
        id,
        pos: Vec2::new(PLAYFIELD_WIDTH + CAR_WIDTH, y),
        size: Vec2::new(CAR_WIDTH, CAR_HEIGHT),
        speed,
    });
    log::debug!("Spawned traffic {} at y={:.0} speed={:.1}", id, y, speed);
    id
}

/// Spawn one coin just past the right edge
pub fn spawn_coin(state: &mut GameState) -> EntityId {
    let y = state.random() * (PLAYFIELD_HEIGHT - 60.0) + 30.0;
    let id = state.next_entity_id();
    state.coins.push(Coin {
        id,
        pos: Vec2::new(PLAYFIELD_WIDTH + 20.0, y),
        radius: COIN_RADIUS,
    });
    id
}

/// Burst of particles at `at`, plus screen shake
pub fn explode(state: &mut GameState, at: Vec2, burst: Burst, intense: bool) {
    let (count, spread) = if intense {
        (state.tuning.intense_explosion_particles, 15.0)
    } else {
        (state.tuning.explosion_particles, 10.0)
    };
    state.screen_shake = if intense { 15.0 } else { 8.0 };

    for _ in 0..count {
        let vel = Vec2::new(state.random() - 0.5, state.random() - 0.5) * spread;
        let size = state.random() * 4.0 + 2.0;
        state.particles.push(Particle {
            pos: at,
            vel,
            burst,
            life: 1.0,
            size,
        });
    }

    if state.particles.len() > MAX_PARTICLES {
        let excess = state.particles.len() - MAX_PARTICLES;
        state.particles.drain(0..excess);
    }
}
