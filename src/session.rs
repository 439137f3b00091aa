//! Frame driver for one session
//!
//! Owns the game state, the input record and the outcome sink. The host calls
//! `advance` once per animation frame and tears the session down once
//! `is_settled` reports true.

use glam::Vec2;

use crate::config::{ConfigError, SessionConfig};
use crate::consts::MAX_FRAME_MS;
use crate::input::InputState;
use crate::outcome::{SessionEnd, SessionOutcome};
use crate::sim::{GamePhase, GameState, Slot, tick};
use crate::tuning::Tuning;

pub struct Session<E: SessionEnd> {
    state: GameState,
    input: InputState,
    sink: E,
    reported: bool,
}

impl<E: SessionEnd> Session<E> {
    /// Validate `config` and build a fresh session
    pub fn new(config: SessionConfig, tuning: Tuning, seed: u64, sink: E) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            log::warn!("Rejected session config: {}", err);
            return Err(err);
        }
        log::info!(
            "Session start: mode={} world={} level={} players={} seed={}",
            config.mode.as_str(),
            config.world,
            config.level,
            config.players.len(),
            seed
        );
        Ok(Self {
            state: GameState::new(config, tuning, seed),
            input: InputState::new(),
            sink,
            reported: false,
        })
    }

    /// Advance by one frame of `dt_ms` milliseconds.
    ///
    /// Returns the outcome on the frame it is first decided; the sink sees it
    /// exactly once.
    pub fn advance(&mut self, dt_ms: f32) -> Option<&SessionOutcome> {
        let dt = if dt_ms.is_finite() { dt_ms.clamp(0.0, MAX_FRAME_MS) } else { 0.0 };
        let input = self.input.snapshot();
        self.input.clear_one_shots();

        tick(&mut self.state, &input, dt);

        if self.reported {
            return None;
        }
        let outcome = self.state.outcome.as_ref()?;
        self.reported = true;
        self.sink.on_session_end(outcome);
        Some(outcome)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Read the state while writing input (autopilots, replays)
    pub fn state_and_input(&mut self) -> (&GameState, &mut InputState) {
        (&self.state, &mut self.input)
    }

    /// Start a drag if the pointer lands on player one's car
    pub fn pointer_down(&mut self, at: Vec2) -> bool {
        match self.state.player(Slot::One) {
            Some(p) if !self.state.config.two_player() => self.input.pointer_down(at, &p.rect()),
            _ => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.phase == GamePhase::Finished
    }

    /// Outcome reported and the exit animation (if any) done
    pub fn is_settled(&self) -> bool {
        self.reported && self.state.is_settled()
    }
}
