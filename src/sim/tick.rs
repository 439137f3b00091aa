//! Simulation tick
//!
//! One call advances a session by `dt` milliseconds: countdown, movement,
//! abilities, rivals, spawns, collisions, then the outcome check.

use super::ability;
use super::ai::{self, leading_rival_distance};
use super::collision;
use super::movement;
use super::spawn;
use super::state::{GameEvent, GamePhase, GameState, Slot};
use crate::consts::*;
use crate::frames;
use crate::outcome::{SessionOutcome, Winner};

/// Held controls of one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerIntent {
    pub up: bool,
    pub down: bool,
    /// Ability key
    pub action: bool,
}

impl PlayerIntent {
    /// -1 (up), 0 or 1 (down)
    pub fn axis(&self) -> f32 {
        match (self.up, self.down) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Input snapshot for a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Index 0 is player one
    pub players: [PlayerIntent; 2],
    /// Pause toggle (single-player only)
    pub pause: bool,
    /// Pointer drag target for player one's top edge
    pub drag_y: Option<f32>,
}

/// Advance the game state by `dt` milliseconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    state.events.clear();
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

    // Handle pause toggle
    if input.pause && !state.config.two_player() && state.phase != GamePhase::Finished {
        state.paused = !state.paused;
        log::info!("{}", if state.paused { "Paused" } else { "Resumed" });
    }
    if state.paused {
        return;
    }

    match state.phase {
        GamePhase::Countdown => {
            run_countdown(state, dt);
            return;
        }
        GamePhase::Finished => {
            slide_off(state, dt);
            return;
        }
        GamePhase::Running => {}
    }

    state.time_ticks += 1;

    movement::integrate(state, input, dt);

    for (i, intent) in input.players.iter().enumerate().take(state.players.len()) {
        if intent.action {
            ability::activate(state, Slot::from_index(i));
        }
    }
    ability::update_status(state, dt);

    ai::update_rivals(state, dt);
    spawn::update_spawners(state, dt);
    collision::resolve(state, dt);

    check_outcome(state);
}

fn run_countdown(state: &mut GameState, dt: f32) {
    state.countdown_timer -= dt;
    if state.countdown_timer > 0.0 {
        return;
    }
    state.countdown = state.countdown.saturating_sub(1);
    state.countdown_timer = COUNTDOWN_STEP_MS;
    state.events.push(GameEvent::CountdownStep(state.countdown));

    if state.countdown == 0 {
        state.phase = GamePhase::Running;
        state.events.push(GameEvent::RaceStarted);
        log::info!("Race started");
    }
}

/// Cosmetic exit after a single-player win
fn slide_off(state: &mut GameState, dt: f32) {
    if !state.sliding_off {
        return;
    }
    let f = frames(dt);
    for p in &mut state.players {
        p.pos.x += SLIDE_OFF_SPEED * f;
    }
    if state
        .players
        .iter()
        .all(|p| p.pos.x > PLAYFIELD_WIDTH + SLIDE_OFF_MARGIN)
    {
        state.sliding_off = false;
        log::debug!("Slide-off complete");
    }
}

/// Decide whether this tick ended the session.
///
/// Checks run in tick order: a player finishing, a rival finishing, then health.
fn check_outcome(state: &mut GameState) {
    let decided = if state.config.two_player() {
        versus_outcome(state)
    } else {
        single_outcome(state)
    };

    if let Some((outcome, slide)) = decided {
        finish(state, outcome, slide);
    }
}

fn single_outcome(state: &GameState) -> Option<(SessionOutcome, bool)> {
    let player = state.players.first()?;
    let mut outcome = SessionOutcome {
        coins_earned: state.session_coins,
        distance_score: player.distance.floor() as u32,
        // Losses earn nothing
        health_or_stars: 0,
        victory: false,
        winner: None,
    };

    if let Some(target) = state.target_distance {
        if player.distance >= target {
            outcome.distance_score = target.floor() as u32;
            outcome.health_or_stars = player.health;
            outcome.victory = true;
            return Some((outcome, true));
        }
        if leading_rival_distance(state).is_some_and(|d| d >= target) {
            return Some((outcome, false));
        }
    }

    if !player.is_alive() {
        return Some((outcome, false));
    }
    None
}

fn versus_outcome(state: &GameState) -> Option<(SessionOutcome, bool)> {
    let [p1, p2] = state.players.as_slice() else {
        return None;
    };
    let target = state.target_distance.unwrap_or(f32::INFINITY);

    let winner = match (p1.distance >= target, p2.distance >= target) {
        (true, true) if p1.distance > p2.distance => Winner::PlayerOne,
        (true, true) if p2.distance > p1.distance => Winner::PlayerTwo,
        (true, true) => Winner::Draw,
        (true, false) => Winner::PlayerOne,
        (false, true) => Winner::PlayerTwo,
        (false, false) if !p1.is_alive() || !p2.is_alive() => {
            if p1.health > p2.health {
                Winner::PlayerOne
            } else if p2.health > p1.health {
                Winner::PlayerTwo
            } else {
                Winner::Draw
            }
        }
        (false, false) => return None,
    };

    let (distance, health) = match winner {
        Winner::PlayerOne => (p1.distance, p1.health),
        Winner::PlayerTwo => (p2.distance, p2.health),
        Winner::Draw => (p1.distance.max(p2.distance), 0),
    };

    Some((
        SessionOutcome {
            coins_earned: state.session_coins,
            distance_score: distance.min(target).floor() as u32,
            health_or_stars: health,
            victory: true,
            winner: Some(winner),
        },
        false,
    ))
}

fn finish(state: &mut GameState, outcome: SessionOutcome, slide: bool) {
    log::info!(
        "Session finished: victory={} distance={} coins={} winner={:?}",
        outcome.victory,
        outcome.distance_score,
        outcome.coins_earned,
        outcome.winner_label()
    );
    state.phase = GamePhase::Finished;
    state.sliding_off = slide;
    state.outcome = Some(outcome);
    state.events.push(GameEvent::Finished);
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use proptest::prelude::*;

    use super::*;
    use crate::config::{Catalog, GameMode, SessionConfig};
    use crate::sim::state::Traffic;
    use crate::tuning::Tuning;

    fn single(mode: GameMode, world: u8, level: u8, driver: &str) -> GameState {
        let setup = Catalog::builtin().setup("basic", driver).unwrap();
        let config = SessionConfig::single(mode, world, level, setup).unwrap();
        GameState::new(config, Tuning::quiet(), 12345)
    }

    fn versus() -> GameState {
        let catalog = Catalog::builtin();
        let config = SessionConfig::versus(
            catalog.setup("basic", "rookie").unwrap(),
            catalog.setup("basic", "rookie").unwrap(),
        )
        .unwrap();
        let mut state = GameState::new(config, Tuning::quiet(), 12345);
        skip_countdown(&mut state);
        state
    }

    fn skip_countdown(state: &mut GameState) {
        for _ in 0..COUNTDOWN_STEPS {
            tick(state, &TickInput::default(), COUNTDOWN_STEP_MS);
        }
        assert_eq!(state.phase, GamePhase::Running);
    }

    /// Traffic that reaches the player after one frame of scrolling
    fn traffic_on_player(state: &mut GameState, slot: Slot) {
        traffic_ahead(state, slot, 20.0);
    }

    fn traffic_ahead(state: &mut GameState, slot: Slot, dx: f32) {
        let pos = state.players[slot.index()].pos;
        let id = state.next_entity_id();
        state.traffic.push(Traffic {
            id,
            pos: pos + Vec2::new(dx, 0.0),
            size: Vec2::new(CAR_WIDTH, CAR_HEIGHT),
            speed: 0.0,
        });
    }

    fn press(action: bool, up: bool, down: bool) -> TickInput {
        TickInput {
            players: [PlayerIntent { up, down, action }, PlayerIntent::default()],
            ..Default::default()
        }
    }

    #[test]
    fn test_infinite_run_accumulates_distance() {
        let mut state = single(GameMode::Infinite, 1, 1, "rookie");
        let input = TickInput::default();
        for _ in 0..600 {
            tick(&mut state, &input, FRAME_MS);
        }
        // 10 s at 60 Hz: 6 base speed, x2, /100 per frame
        assert!((state.players[0].distance - 72.0).abs() < 0.01);
        assert!(state.outcome.is_none());
        assert_eq!(state.phase, GamePhase::Running);
    }

    #[test]
    fn test_distance_independent_of_frame_rate() {
        let mut fast = single(GameMode::Infinite, 1, 1, "rookie");
        let mut slow = single(GameMode::Infinite, 1, 1, "rookie");
        for _ in 0..120 {
            tick(&mut fast, &TickInput::default(), FRAME_MS);
        }
        for _ in 0..40 {
            tick(&mut slow, &TickInput::default(), 50.0);
        }
        assert!((fast.players[0].distance - slow.players[0].distance).abs() < 0.01);
    }

    #[test]
    fn test_levels_victory_fires_once() {
        let mut state = single(GameMode::Levels, 1, 1, "rookie");
        assert_eq!(state.target_distance, Some(100.0));
        state.players[0].distance = 99.95;

        tick(&mut state, &TickInput::default(), FRAME_MS);
        let outcome = state.outcome.clone().unwrap();
        assert_eq!(state.phase, GamePhase::Finished);
        assert!(outcome.victory);
        assert_eq!(outcome.distance_score, 100);
        assert_eq!(outcome.health_or_stars, MAX_HEALTH);
        assert_eq!(outcome.winner, None);
        assert!(state.events.contains(&GameEvent::Finished));
        assert!(state.sliding_off);
        assert!(!state.is_settled());

        // Next tick: no new outcome, the car slides toward the right edge
        let x = state.players[0].pos.x;
        let distance = state.players[0].distance;
        tick(&mut state, &TickInput::default(), FRAME_MS);
        assert!(!state.events.contains(&GameEvent::Finished));
        assert_eq!(state.outcome, Some(outcome));
        assert_eq!(state.players[0].distance, distance);
        assert!(state.players[0].pos.x > x);
    }

    #[test]
    fn test_slide_off_settles() {
        let mut state = single(GameMode::Levels, 1, 1, "rookie");
        state.players[0].distance = 100.0;
        tick(&mut state, &TickInput::default(), FRAME_MS);
        for _ in 0..300 {
            tick(&mut state, &TickInput::default(), FRAME_MS);
        }
        assert!(state.is_settled());
        assert!(state.players[0].pos.x > PLAYFIELD_WIDTH + SLIDE_OFF_MARGIN);
    }

    #[test]
    fn test_last_health_lost_to_traffic() {
        let mut state = single(GameMode::Levels, 1, 1, "rookie");
        state.players[0].health = 1;
        traffic_on_player(&mut state, Slot::One);

        tick(&mut state, &TickInput::default(), FRAME_MS);
        let outcome = state.outcome.clone().unwrap();
        assert!(!outcome.victory);
        assert_eq!(outcome.health_or_stars, 0);
        assert_eq!(outcome.distance_score, 0);
        assert!(!state.sliding_off);
        assert!(state.is_settled());
    }

    #[test]
    fn test_infinite_mode_has_no_victory() {
        let mut state = single(GameMode::Infinite, 1, 1, "rookie");
        state.players[0].distance = 1_000_000.0;
        tick(&mut state, &TickInput::default(), FRAME_MS);
        assert!(state.outcome.is_none());

        state.players[0].health = 1;
        traffic_on_player(&mut state, Slot::One);
        tick(&mut state, &TickInput::default(), FRAME_MS);
        assert_eq!(state.outcome.as_ref().map(|o| o.victory), Some(false));
    }

    #[test]
    fn test_rival_finishing_first_is_a_loss() {
        let mut state = single(GameMode::Levels, 2, 1, "rookie");
        skip_countdown(&mut state);
        let target = state.target_distance.unwrap();
        state.rivals[2].distance = target - 0.001;
        // Keep the player clear of the pack
        state.players[0].pos.y = 20.0;
        state.rivals.iter_mut().for_each(|r| r.pos.y = 300.0);

        tick(&mut state, &TickInput::default(), FRAME_MS);
        let outcome = state.outcome.clone().unwrap();
        assert!(!outcome.victory);
        assert_eq!(state.players[0].health, MAX_HEALTH);
        assert_eq!(outcome.health_or_stars, 0);
        assert!(state.is_settled());
    }

    #[test]
    fn test_countdown_freezes_physics() {
        let mut state = single(GameMode::Levels, 2, 1, "rookie");
        assert_eq!(state.phase, GamePhase::Countdown);

        tick(&mut state, &press(false, true, false), 999.0);
        assert_eq!(state.countdown, 3);
        tick(&mut state, &press(false, true, false), 1.0);
        assert_eq!(state.countdown, 2);
        assert_eq!(state.events, vec![GameEvent::CountdownStep(2)]);
        assert_eq!(state.players[0].distance, 0.0);
        assert_eq!(state.players[0].pos.y, 30.0);
        assert!(state.rivals.iter().all(|r| r.distance == 0.0));

        tick(&mut state, &TickInput::default(), 1000.0);
        tick(&mut state, &TickInput::default(), 1000.0);
        assert_eq!(state.phase, GamePhase::Running);
        assert!(state.events.contains(&GameEvent::RaceStarted));
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut state = single(GameMode::Infinite, 1, 1, "rookie");
        state.tuning = Tuning::default();
        for _ in 0..100 {
            tick(&mut state, &press(false, false, true), FRAME_MS);
        }

        let pause = TickInput { pause: true, ..Default::default() };
        tick(&mut state, &pause, FRAME_MS);
        assert!(state.paused);

        let snapshot = format!("{:?}", (&state.players, &state.traffic, &state.coins, state.traffic_timer));
        for _ in 0..50 {
            tick(&mut state, &press(true, true, false), FRAME_MS);
        }
        let after = format!("{:?}", (&state.players, &state.traffic, &state.coins, state.traffic_timer));
        assert_eq!(snapshot, after);

        tick(&mut state, &pause, FRAME_MS);
        assert!(!state.paused);
    }

    #[test]
    fn test_pause_ignored_with_two_players() {
        let mut state = versus();
        tick(&mut state, &TickInput { pause: true, ..Default::default() }, FRAME_MS);
        assert!(!state.paused);
    }

    #[test]
    fn test_ability_invincibility_blocks_repeated_hits() {
        let mut state = single(GameMode::Infinite, 1, 1, "rookie");
        state.players[0].ability_timer = 1000.0;
        state.players[0].status.invincible = true;

        // Road scroll over 200 ms is 12 px/frame * 12 frames
        let lead = 12.0 * frames(200.0) + 10.0;
        traffic_ahead(&mut state, Slot::One, lead);
        tick(&mut state, &TickInput::default(), 200.0);
        traffic_ahead(&mut state, Slot::One, lead);
        tick(&mut state, &TickInput::default(), 200.0);

        assert_eq!(state.players[0].health, MAX_HEALTH);
    }

    #[test]
    fn test_grace_window_expires() {
        let mut state = single(GameMode::Infinite, 1, 1, "rookie");
        traffic_on_player(&mut state, Slot::One);
        tick(&mut state, &TickInput::default(), FRAME_MS);
        assert_eq!(state.players[0].health, 2);

        // Still inside the window
        tick(&mut state, &TickInput::default(), 500.0);
        traffic_on_player(&mut state, Slot::One);
        tick(&mut state, &TickInput::default(), FRAME_MS);
        assert_eq!(state.players[0].health, 2);

        tick(&mut state, &TickInput::default(), 600.0);
        traffic_on_player(&mut state, Slot::One);
        tick(&mut state, &TickInput::default(), FRAME_MS);
        assert_eq!(state.players[0].health, 1);
    }

    #[test]
    fn test_action_key_casts_ability() {
        let mut state = single(GameMode::Infinite, 1, 1, "racer");
        tick(&mut state, &press(true, false, false), FRAME_MS);
        assert!(state.events.iter().any(|e| matches!(e, GameEvent::AbilityCast { .. })));
        assert_eq!(state.players[0].speed_mult, 2.5);
        assert!(state.players[0].status.invincible);
    }

    #[test]
    fn test_versus_mutual_collision() {
        let mut state = versus();
        state.players[0].pos.y = 150.0;
        state.players[1].pos.y = 170.0;
        tick(&mut state, &TickInput::default(), FRAME_MS);

        assert_eq!(state.players[0].health, 2);
        assert_eq!(state.players[1].health, 2);
        assert!(state.players[0].grace_timer > 0.0 && state.players[1].grace_timer > 0.0);
        assert_eq!(state.players[0].pos.y, 110.0);
        assert_eq!(state.players[1].pos.y, 210.0);
        assert!(state.outcome.is_none());
    }

    #[test]
    fn test_versus_both_knocked_out_is_a_draw() {
        let mut state = versus();
        state.players[0].health = 1;
        state.players[1].health = 1;
        state.players[0].pos.y = 150.0;
        state.players[1].pos.y = 170.0;
        tick(&mut state, &TickInput::default(), FRAME_MS);

        let outcome = state.outcome.clone().unwrap();
        assert_eq!(outcome.winner, Some(Winner::Draw));
        assert_eq!(outcome.winner_label(), Some("Draw"));
        assert!(state.is_settled());
    }

    #[test]
    fn test_versus_knockout_names_survivor() {
        let mut state = versus();
        state.players[1].health = 1;
        traffic_on_player(&mut state, Slot::Two);
        tick(&mut state, &TickInput::default(), FRAME_MS);
        let outcome = state.outcome.clone().unwrap();
        assert_eq!(outcome.winner, Some(Winner::PlayerOne));
        assert_eq!(outcome.health_or_stars, MAX_HEALTH);
    }

    #[test]
    fn test_versus_finish_line() {
        let mut state = versus();
        state.players[1].distance = 1999.99;
        tick(&mut state, &TickInput::default(), FRAME_MS);
        let outcome = state.outcome.clone().unwrap();
        assert_eq!(outcome.winner, Some(Winner::PlayerTwo));
        assert_eq!(outcome.distance_score, 2000);
        assert!(!state.sliding_off);
    }

    #[test]
    fn test_same_seed_same_session() {
        let run = || {
            let setup = Catalog::builtin().setup("sport", "kalleb").unwrap();
            let config = SessionConfig::single(GameMode::Infinite, 2, 1, setup).unwrap();
            let mut state = GameState::new(config, Tuning::default(), 777);
            for i in 0..900 {
                let input = press(i % 200 == 0, i % 3 == 0, i % 5 == 0);
                tick(&mut state, &input, FRAME_MS);
            }
            format!("{:?} {:?} {:?}", state.players, state.traffic, state.session_coins)
        };
        assert_eq!(run(), run());
    }

    fn arb_input() -> impl Strategy<Value = (bool, bool, bool, f32)> {
        (any::<bool>(), any::<bool>(), prop::bool::weighted(0.05), 0.0f32..100.0)
    }

    proptest! {
        #[test]
        fn prop_health_bounded_and_distance_monotone(
            driver in prop::sample::select(vec!["rookie", "nees", "overlord", "chrono", "leader"]),
            seed in any::<u64>(),
            inputs in prop::collection::vec(arb_input(), 1..300),
        ) {
            let setup = Catalog::builtin().setup("basic", driver).unwrap();
            let config = SessionConfig::single(GameMode::Infinite, 1, 1, setup).unwrap();
            let mut state = GameState::new(config, Tuning::default(), seed);

            let mut last = 0.0;
            for (up, down, action, dt) in inputs {
                tick(&mut state, &press(action, up, down), dt);
                let p = &state.players[0];
                prop_assert!(p.health <= MAX_HEALTH);
                if state.phase == GamePhase::Running {
                    prop_assert!(p.distance >= last);
                }
                last = p.distance;
            }
        }

        #[test]
        fn prop_paused_ticks_change_nothing(
            seed in any::<u64>(),
            warmup in 1usize..120,
            inputs in prop::collection::vec(arb_input(), 1..60),
        ) {
            let setup = Catalog::builtin().setup("basic", "rookie").unwrap();
            let config = SessionConfig::single(GameMode::Infinite, 1, 1, setup).unwrap();
            let mut state = GameState::new(config, Tuning::default(), seed);
            for _ in 0..warmup {
                tick(&mut state, &TickInput::default(), FRAME_MS);
            }
            tick(&mut state, &TickInput { pause: true, ..Default::default() }, FRAME_MS);

            let before = format!("{:?}", (&state.players, &state.traffic, &state.coins, &state.rivals, state.time_ticks));
            for (up, down, action, dt) in inputs {
                tick(&mut state, &press(action, up, down), dt);
            }
            let after = format!("{:?}", (&state.players, &state.traffic, &state.coins, &state.rivals, state.time_ticks));
            prop_assert_eq!(before, after);
        }
    }
}
