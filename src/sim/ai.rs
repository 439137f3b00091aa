//! Rival racers
//!
//! A rival is either stunned (frozen in place, no progress) or wandering
//! between randomly picked lane positions while driving forward.

use super::movement::clamp_lane;
use super::state::GameState;
use crate::consts::*;
use crate::{frames, lane_bounds};

/// Advance every rival by `dt` milliseconds
pub fn update_rivals(state: &mut GameState, dt: f32) {
    let f = frames(dt);
    let frozen = state.any_player(|s| s.time_stopped);
    let slow = if state.any_player(|s| s.time_hacked) { 0.5 } else { 1.0 };
    let leader = state.leader_distance();

    for i in 0..state.rivals.len() {
        let stunned = state.rivals[i].is_stunned();

        if stunned {
            state.rivals[i].stun_timer -= dt;
        } else {
            state.rivals[i].wander_timer -= dt;
            if state.rivals[i].wander_timer <= 0.0 {
                let (lo, hi) = lane_bounds(state.rivals[i].size.y);
                let target_y = lo + state.random() * (hi - lo);
                let interval =
                    state.tuning.rival_wander_min_ms + state.random() * state.tuning.rival_wander_span_ms;
                let rival = &mut state.rivals[i];
                rival.target_y = target_y;
                rival.wander_timer = interval;
            }

            let rival = &mut state.rivals[i];
            let gap = rival.target_y - rival.pos.y;
            let step = rival.step * f;
            rival.pos.y += gap.clamp(-step, step);
            rival.pos.y = clamp_lane(rival.pos.y, rival.size.y);
        }

        let rival = &mut state.rivals[i];
        let speed = if frozen || stunned { 0.0 } else { rival.base_speed };
        rival.distance += speed * ROAD_SPEED_FACTOR * slow / DISTANCE_SCALE * f;
        rival.pos.x = PLAYER_BASE_X + (rival.distance - leader) * RACE_POSITION_SCALE;
    }
}

/// Rival with the greatest distance, if any
pub fn leading_rival_distance(state: &GameState) -> Option<f32> {
    state
        .rivals
        .iter()
        .map(|r| r.distance)
        .reduce(f32::max)
}
