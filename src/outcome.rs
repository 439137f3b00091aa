//! Session outcome handed to the surrounding application
//!
//! The application turns this into star ratings, coin credit and unlocks.
//! The simulation never sees any of that.

use serde::{Deserialize, Serialize};

/// Winner of a two-player race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "Player 1")]
    PlayerOne,
    #[serde(rename = "Player 2")]
    PlayerTwo,
    #[serde(rename = "Draw")]
    Draw,
}

impl Winner {
    pub fn label(&self) -> &'static str {
        match self {
            Winner::PlayerOne => "Player 1",
            Winner::PlayerTwo => "Player 2",
            Winner::Draw => "Draw",
        }
    }
}

/// Final result of one session, produced exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub coins_earned: u32,
    pub distance_score: u32,
    /// Remaining health on a win (levels mode reads it as stars), 0 on a loss
    pub health_or_stars: u8,
    pub victory: bool,
    /// Set in two-player sessions only
    pub winner: Option<Winner>,
}

impl SessionOutcome {
    pub fn winner_label(&self) -> Option<&'static str> {
        self.winner.map(|w| w.label())
    }
}

/// Receiver of the single outbound call a session makes
pub trait SessionEnd {
    fn on_session_end(&mut self, outcome: &SessionOutcome);
}

impl<F> SessionEnd for F
where
    F: FnMut(&SessionOutcome),
{
    fn on_session_end(&mut self, outcome: &SessionOutcome) {
        self(outcome)
    }
}
