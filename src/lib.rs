//! Lane Rush - a 2D lane racing arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, abilities, physics, collisions, outcome)
//! - `config`: Vehicle/driver catalog and per-session configuration
//! - `tuning`: Data-driven game balance
//! - `input`: Key/pointer state shared between the host and the tick loop
//! - `session`: Frame driver that owns a running session and reports its outcome
//! - `outcome`: The single value handed back to the surrounding application

pub mod config;
pub mod input;
pub mod outcome;
pub mod session;
pub mod sim;
pub mod tuning;

pub use config::{AbilityKind, ConfigError, DriverProfile, GameMode, SessionConfig, VehicleProfile};
pub use input::InputState;
pub use outcome::{SessionEnd, SessionOutcome, Winner};
pub use session::Session;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Reference frame duration (ms). Per-frame speeds are expressed against this.
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Longest frame the session driver will simulate in one step
    pub const MAX_FRAME_MS: f32 = 100.0;

    /// Playfield dimensions
    pub const PLAYFIELD_WIDTH: f32 = 800.0;
    pub const PLAYFIELD_HEIGHT: f32 = 400.0;
    /// Gap kept between a car and the top/bottom track edge
    pub const TRACK_MARGIN: f32 = 20.0;

    /// Car footprint (players, rivals, traffic)
    pub const CAR_WIDTH: f32 = 70.0;
    pub const CAR_HEIGHT: f32 = 40.0;
    /// Screen x of the leader in race layouts and of the player otherwise
    pub const PLAYER_BASE_X: f32 = 100.0;

    pub const MAX_HEALTH: u8 = 3;

    /// Ability cooldown applied by every successful cast
    pub const ABILITY_COOLDOWN_MS: f32 = 10_000.0;
    /// Active timer for instant abilities (visual feedback only)
    pub const INSTANT_ABILITY_MS: f32 = 500.0;
    /// Invincibility after any hit
    pub const HIT_GRACE_MS: f32 = 1000.0;
    /// Invincibility after touching a rival
    pub const RIVAL_HIT_GRACE_MS: f32 = 1500.0;
    /// How long a rival stays stunned after a projectile or nuke
    pub const RIVAL_STUN_MS: f32 = 2000.0;

    /// `baseSpeed = vehicle speed * BASE_SPEED_FACTOR`
    pub const BASE_SPEED_FACTOR: f32 = 1.5;
    /// Effective speed = baseSpeed * multiplier * ROAD_SPEED_FACTOR
    pub const ROAD_SPEED_FACTOR: f32 = 2.0;
    /// Effective speed per frame divided by this is distance per frame
    pub const DISTANCE_SCALE: f32 = 100.0;
    /// Screen pixels per unit of distance lead in race layouts
    pub const RACE_POSITION_SCALE: f32 = 15.0;
    /// Road stripe tile size (scroll offset wraps at this)
    pub const ROAD_TILE: f32 = 40.0;
    /// Vertical steering per frame = handling * STEER_FACTOR
    pub const STEER_FACTOR: f32 = 1.2;
    /// Per-frame velocity retention in slippery worlds
    pub const SLIPPERY_FRICTION: f32 = 0.95;

    /// Coins
    pub const COIN_RADIUS: f32 = 10.0;
    pub const MAGNET_RADIUS: f32 = 200.0;
    pub const MAGNET_PULL: f32 = 10.0;

    /// Vertical push applied to both cars on a head-on player collision
    pub const REPULSION: f32 = 40.0;

    /// Race countdown
    pub const COUNTDOWN_STEPS: u8 = 3;
    pub const COUNTDOWN_STEP_MS: f32 = 1000.0;

    /// Cosmetic exit after a single-player victory
    pub const SLIDE_OFF_SPEED: f32 = 5.0;
    pub const SLIDE_OFF_MARGIN: f32 = 100.0;

    /// Particle cap (oldest particles are dropped first)
    pub const MAX_PARTICLES: usize = 512;
}

/// Number of reference frames covered by `dt_ms`
#[inline]
pub fn frames(dt_ms: f32) -> f32 {
    dt_ms / consts::FRAME_MS
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Vertical range a car of height `h` may occupy
#[inline]
pub fn lane_bounds(h: f32) -> (f32, f32) {
    (
        consts::TRACK_MARGIN,
        consts::PLAYFIELD_HEIGHT - h - consts::TRACK_MARGIN,
    )
}
