//! Data-driven game balance
//!
//! Spawn pacing, rival speeds and projectile behaviour. Defaults are the
//! shipped values; a JSON document can override any subset of them.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Balance values read by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Spawning ===
    /// Spawn traffic in non-race sessions
    pub spawn_traffic: bool,
    /// Spawn coins in non-race sessions
    pub spawn_coins: bool,
    /// Traffic interval before difficulty scaling (ms)
    pub traffic_interval_ms: f32,
    /// Interval reduction per difficulty point (ms)
    pub traffic_interval_per_difficulty: f32,
    /// Interval floor (ms)
    pub traffic_interval_min_ms: f32,
    /// Traffic speed = rival base speed * this + jitter
    pub traffic_speed_factor: f32,
    pub traffic_speed_jitter: f32,
    /// Coin interval = min + random * span (ms)
    pub coin_interval_min_ms: f32,
    pub coin_interval_span_ms: f32,

    // === Rivals ===
    pub rival_base_speed: f32,
    pub rival_speed_per_difficulty: f32,
    /// Each rival's speed is scaled by a random factor in [1 - jitter, 1 + jitter)
    pub rival_speed_jitter: f32,
    /// Vertical step per frame, drawn once per rival from [min, max)
    pub rival_step_min: f32,
    pub rival_step_max: f32,
    /// Wander retarget interval = min + random * span (ms)
    pub rival_wander_min_ms: f32,
    pub rival_wander_span_ms: f32,

    // === Projectiles ===
    pub shuriken_speed: f32,
    pub shuriken_radius: f32,
    pub orb_speed: f32,
    pub orb_radius: f32,
    pub missile_speed: f32,
    /// Max heading change per frame (radians)
    pub missile_turn_rate: f32,
    pub missile_count: usize,
    pub drone_count: usize,
    /// Vertical gap between escort drones
    pub drone_spacing: f32,
    /// Horizontal gap between the caster's nose and the drones
    pub drone_lead: f32,
    pub drone_size: f32,

    // === Handling ===
    /// Slippery acceleration per frame = handling * this
    pub slippery_accel: f32,

    // === Effects ===
    pub explosion_particles: usize,
    pub intense_explosion_particles: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            spawn_traffic: true,
            spawn_coins: true,
            traffic_interval_ms: 1500.0,
            traffic_interval_per_difficulty: 40.0,
            traffic_interval_min_ms: 300.0,
            traffic_speed_factor: 0.8,
            traffic_speed_jitter: 2.0,
            coin_interval_min_ms: 500.0,
            coin_interval_span_ms: 2000.0,

            rival_base_speed: 2.5,
            rival_speed_per_difficulty: 0.4,
            rival_speed_jitter: 0.15,
            rival_step_min: 1.0,
            rival_step_max: 3.0,
            rival_wander_min_ms: 1000.0,
            rival_wander_span_ms: 2000.0,

            shuriken_speed: 15.0,
            shuriken_radius: 15.0,
            orb_speed: 10.0,
            orb_radius: 22.0,
            missile_speed: 6.0,
            missile_turn_rate: 0.15,
            missile_count: 3,
            drone_count: 3,
            drone_spacing: 50.0,
            drone_lead: 30.0,
            drone_size: 24.0,

            slippery_accel: 0.15,

            explosion_particles: 20,
            intense_explosion_particles: 40,
        }
    }
}

impl Tuning {
    /// Defaults with every random spawn switched off (scripted tests, demos)
    pub fn quiet() -> Self {
        Self {
            spawn_traffic: false,
            spawn_coins: false,
            ..Self::default()
        }
    }

    /// Load overrides from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning = serde_json::from_str(json)?;
        log::info!("Loaded tuning overrides");
        Ok(tuning)
    }

    /// Base forward speed of rivals for a difficulty index
    pub fn rival_speed(&self, difficulty: f32) -> f32 {
        self.rival_base_speed + difficulty * self.rival_speed_per_difficulty
    }

    /// Mean traffic spawn interval for a difficulty index
    pub fn traffic_interval(&self, difficulty: f32) -> f32 {
        (self.traffic_interval_ms - difficulty * self.traffic_interval_per_difficulty)
            .max(self.traffic_interval_min_ms)
    }
}
