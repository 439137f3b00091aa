//! Vehicle/driver catalog and per-session configuration
//!
//! Everything here is immutable once a session starts. The simulation keeps
//! the `SessionConfig` it was built from and refers to profiles by player slot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Number of levels per world (index 0 = world 1)
pub const WORLD_LEVELS: [u8; 3] = [10, 15, 15];
/// World whose track is slippery (velocity + friction steering)
pub const SLIPPERY_WORLD: u8 = 3;

/// Distance of level 1 in world 1
pub const BASE_LEVEL_DISTANCE: f32 = 100.0;
/// Extra distance per level
pub const LEVEL_DISTANCE_INCREMENT: f32 = 50.0;
/// Extra distance per world
pub const WORLD_DISTANCE_OFFSET: f32 = 500.0;
/// Finish line of a head-to-head race
pub const RACE_DISTANCE: f32 = 2000.0;

/// Closed set of driver abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    Shield,
    Dash,
    Bulldozer,
    Magnet,
    Ghost,
    TimeHack,
    TimeStop,
    Overdrive,
    GodMode,
    HealOne,
    HealFull,
    Nuke,
    Shuriken,
    HeavyOrb,
    MissileSwarm,
    EscortDrones,
}

impl AbilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbilityKind::Shield => "shield",
            AbilityKind::Dash => "dash",
            AbilityKind::Bulldozer => "bulldozer",
            AbilityKind::Magnet => "magnet",
            AbilityKind::Ghost => "ghost",
            AbilityKind::TimeHack => "time_hack",
            AbilityKind::TimeStop => "time_stop",
            AbilityKind::Overdrive => "overdrive",
            AbilityKind::GodMode => "god_mode",
            AbilityKind::HealOne => "heal_one",
            AbilityKind::HealFull => "heal_full",
            AbilityKind::Nuke => "nuke",
            AbilityKind::Shuriken => "shuriken",
            AbilityKind::HeavyOrb => "heavy_orb",
            AbilityKind::MissileSwarm => "missile_swarm",
            AbilityKind::EscortDrones => "escort_drones",
        }
    }

    /// Active-timer length used when a driver profile doesn't override it
    pub fn default_effect_ms(&self) -> f32 {
        match self {
            AbilityKind::Dash => 2000.0,
            AbilityKind::Shield | AbilityKind::TimeStop => 3000.0,
            AbilityKind::Bulldozer
            | AbilityKind::Magnet
            | AbilityKind::Ghost
            | AbilityKind::TimeHack => 5000.0,
            AbilityKind::Overdrive => 8000.0,
            AbilityKind::GodMode => 10_000.0,
            _ => INSTANT_ABILITY_MS,
        }
    }
}

/// Vehicle stat profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub id: String,
    pub name: String,
    /// Forward speed rating
    pub speed: f32,
    /// Steering rating
    pub handling: f32,
    /// Added to base speed every time the car takes a hit
    #[serde(default)]
    pub collision_boost: f32,
    /// World the vehicle belongs to in the shop (0 = special)
    #[serde(default)]
    pub world: u8,
}

impl VehicleProfile {
    /// Starting forward speed of a player driving this vehicle
    pub fn base_speed(&self) -> f32 {
        self.speed * BASE_SPEED_FACTOR
    }
}

fn default_cooldown() -> f32 {
    ABILITY_COOLDOWN_MS
}

/// Driver profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: String,
    pub name: String,
    pub ability: AbilityKind,
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: f32,
    pub effect_ms: f32,
    #[serde(default)]
    pub world: u8,
}

/// Session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Survive as long as possible; there is no victory
    #[default]
    Infinite,
    /// Reach the level's target distance
    Levels,
    /// Race to a fixed finish line against another player or a rival pack
    Race,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Infinite => "infinite",
            GameMode::Levels => "levels",
            GameMode::Race => "race",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "infinite" | "endless" => Some(GameMode::Infinite),
            "levels" | "level" => Some(GameMode::Levels),
            "race" | "multiplayer" | "versus" => Some(GameMode::Race),
            _ => None,
        }
    }
}

/// A vehicle + driver pair occupying one player slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub vehicle: VehicleProfile,
    pub driver: DriverProfile,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown vehicle '{0}'")]
    UnknownVehicle(String),
    #[error("unknown driver '{0}'")]
    UnknownDriver(String),
    #[error("world {0} does not exist")]
    InvalidWorld(u8),
    #[error("level {level} does not exist in world {world}")]
    InvalidLevel { world: u8, level: u8 },
    #[error("a session needs 1 or 2 players, got {0}")]
    PlayerCount(usize),
    #[error("two players are only allowed in race mode, not {}", .0.as_str())]
    SecondPlayerOutsideRace(GameMode),
    #[error("'{id}' has a negative or non-finite {field}")]
    InvalidStat { id: String, field: &'static str },
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the simulation needs to start a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: GameMode,
    /// 1-based world index
    pub world: u8,
    /// 1-based level index (only meaningful in levels mode)
    pub level: u8,
    /// One or two players; slot 0 is player one
    pub players: Vec<PlayerSetup>,
}

impl SessionConfig {
    /// Single-player session
    pub fn single(
        mode: GameMode,
        world: u8,
        level: u8,
        player: PlayerSetup,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            mode,
            world,
            level,
            players: vec![player],
        };
        config.validate()?;
        Ok(config)
    }

    /// Two-player head-to-head race
    pub fn versus(p1: PlayerSetup, p2: PlayerSetup) -> Result<Self, ConfigError> {
        let config = Self {
            mode: GameMode::Race,
            world: 1,
            level: 1,
            players: vec![p1, p2],
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the simulation relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world == 0 || self.world as usize > WORLD_LEVELS.len() {
            return Err(ConfigError::InvalidWorld(self.world));
        }
        if self.mode == GameMode::Levels {
            let max_level = WORLD_LEVELS[self.world as usize - 1];
            if self.level == 0 || self.level > max_level {
                return Err(ConfigError::InvalidLevel {
                    world: self.world,
                    level: self.level,
                });
            }
        }
        match self.players.len() {
            1 => {}
            2 if self.mode == GameMode::Race => {}
            2 => return Err(ConfigError::SecondPlayerOutsideRace(self.mode)),
            n => return Err(ConfigError::PlayerCount(n)),
        }
        for setup in &self.players {
            let v = &setup.vehicle;
            if !(v.speed.is_finite() && v.speed >= 0.0) {
                return Err(ConfigError::InvalidStat { id: v.id.clone(), field: "speed" });
            }
            if !(v.handling.is_finite() && v.handling >= 0.0) {
                return Err(ConfigError::InvalidStat { id: v.id.clone(), field: "handling" });
            }
            let d = &setup.driver;
            if !(d.effect_ms.is_finite() && d.effect_ms >= 0.0) {
                return Err(ConfigError::InvalidStat { id: d.id.clone(), field: "effect_ms" });
            }
        }
        Ok(())
    }

    pub fn two_player(&self) -> bool {
        self.players.len() == 2
    }

    /// Race-style sessions have a countdown and no traffic or coin spawns
    pub fn is_race_style(&self) -> bool {
        match self.mode {
            GameMode::Race => true,
            GameMode::Levels => self.world >= 2 || self.level == WORLD_LEVELS[0],
            GameMode::Infinite => false,
        }
    }

    /// Number of AI rivals on the track
    pub fn rival_count(&self) -> usize {
        if !self.is_race_style() || self.two_player() {
            0
        } else if self.mode == GameMode::Levels && self.world == 1 {
            1
        } else {
            5
        }
    }

    pub fn slippery(&self) -> bool {
        self.world == SLIPPERY_WORLD
    }

    /// Difficulty index driving spawn rates and rival speed
    pub fn difficulty(&self) -> f32 {
        let level = if self.mode == GameMode::Levels { self.level } else { 1 };
        (self.world as f32 - 1.0) * 10.0 + level as f32
    }

    /// Finish distance, `None` when unbounded
    pub fn target_distance(&self) -> Option<f32> {
        match self.mode {
            GameMode::Infinite => None,
            GameMode::Race => Some(RACE_DISTANCE),
            GameMode::Levels => Some(
                (self.world as f32 - 1.0) * WORLD_DISTANCE_OFFSET
                    + BASE_LEVEL_DISTANCE
                    + (self.level as f32 - 1.0) * LEVEL_DISTANCE_INCREMENT,
            ),
        }
    }
}

/// The shop catalog of vehicles and drivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub vehicles: Vec<VehicleProfile>,
    pub drivers: Vec<DriverProfile>,
}

fn vehicle(id: &str, name: &str, speed: f32, handling: f32, world: u8) -> VehicleProfile {
    VehicleProfile {
        id: id.to_string(),
        name: name.to_string(),
        speed,
        handling,
        collision_boost: 0.0,
        world,
    }
}

fn driver(id: &str, name: &str, ability: AbilityKind, world: u8) -> DriverProfile {
    DriverProfile {
        id: id.to_string(),
        name: name.to_string(),
        ability,
        cooldown_ms: ABILITY_COOLDOWN_MS,
        effect_ms: ability.default_effect_ms(),
        world,
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The catalog shipped with the game
    pub fn builtin() -> Self {
        let mut kaiser = vehicle("kaiser", "Kaiser", 8.0, 6.0, 1);
        kaiser.collision_boost = 0.5;

        let vehicles = vec![
            vehicle("basic", "Basic", 4.0, 5.0, 1),
            vehicle("sport", "Sport", 6.0, 4.0, 1),
            vehicle("heavy", "Heavy", 4.0, 7.0, 1),
            vehicle("hover", "Hovercraft", 5.0, 6.0, 1),
            vehicle("beast", "Beast", 5.0, 8.0, 1),
            vehicle("phantom", "Phantom", 7.0, 3.0, 1),
            vehicle("neon", "Neon X", 7.0, 7.0, 1),
            kaiser,
            vehicle("vortex", "Vortex", 9.0, 5.0, 2),
            vehicle("titan", "Titan", 7.0, 10.0, 2),
            vehicle("glider", "Glider", 8.0, 9.0, 2),
            vehicle("shadow", "Shadow", 11.0, 6.0, 2),
            vehicle("zenith", "Zenith", 10.0, 10.0, 2),
            vehicle("omega", "Omega", 12.0, 8.0, 2),
            vehicle("nebula", "Nebula", 11.0, 11.0, 2),
            vehicle("void", "Void", 15.0, 15.0, 2),
            vehicle("frost", "Frost", 10.0, 8.0, 3),
            vehicle("glacier", "Glacier", 9.0, 12.0, 3),
            vehicle("blizzard", "Blizzard", 12.0, 9.0, 3),
            vehicle("tundra", "Tundra", 11.0, 11.0, 3),
            vehicle("avalanche", "Avalanche", 14.0, 9.0, 3),
            vehicle("aurora", "Aurora", 13.0, 12.0, 3),
            vehicle("crystal", "Crystal", 14.0, 13.0, 3),
            vehicle("borealis", "Borealis", 16.0, 16.0, 3),
        ];

        let drivers = vec![
            driver("rookie", "Rookie", AbilityKind::Shield, 1),
            driver("maruto", "Maruto", AbilityKind::Shuriken, 1),
            driver("racer", "Racer", AbilityKind::Dash, 1),
            driver("bruiser", "Bruiser", AbilityKind::Bulldozer, 1),
            driver("collector", "Collector", AbilityKind::Magnet, 1),
            driver("ghost", "Ghost", AbilityKind::Ghost, 1),
            driver("tech", "Tech", AbilityKind::TimeHack, 1),
            driver("nees", "Nees", AbilityKind::HealOne, 1),
            driver("overlord", "Overlord", AbilityKind::Nuke, 2),
            driver("chrono", "Chrono", AbilityKind::TimeStop, 2),
            driver("mender", "Mender", AbilityKind::HealFull, 2),
            driver("stellar", "Stellar", AbilityKind::Overdrive, 2),
            driver("kalleb", "Kalleb", AbilityKind::MissileSwarm, 2),
            driver("prime", "Prime", AbilityKind::GodMode, 0),
            driver("leader", "Leader", AbilityKind::EscortDrones, 3),
            driver("gojo", "Gojo", AbilityKind::HeavyOrb, 3),
        ];

        Self { vehicles, drivers }
    }

    /// Load a catalog document (same shape as `builtin()` serialized)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        log::info!(
            "Loaded catalog: {} vehicles, {} drivers",
            catalog.vehicles.len(),
            catalog.drivers.len()
        );
        Ok(catalog)
    }

    pub fn vehicle(&self, id: &str) -> Result<&VehicleProfile, ConfigError> {
        self.vehicles
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| ConfigError::UnknownVehicle(id.to_string()))
    }

    pub fn driver(&self, id: &str) -> Result<&DriverProfile, ConfigError> {
        self.drivers
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ConfigError::UnknownDriver(id.to_string()))
    }

    /// Look up a vehicle + driver pair by id
    pub fn setup(&self, vehicle_id: &str, driver_id: &str) -> Result<PlayerSetup, ConfigError> {
        Ok(PlayerSetup {
            vehicle: self.vehicle(vehicle_id)?.clone(),
            driver: self.driver(driver_id)?.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_rookie() -> PlayerSetup {
        Catalog::builtin().setup("basic", "rookie").unwrap()
    }

    #[test]
    fn test_target_distance_levels() {
        let c = SessionConfig::single(GameMode::Levels, 1, 1, basic_rookie()).unwrap();
        assert_eq!(c.target_distance(), Some(100.0));

        let c = SessionConfig::single(GameMode::Levels, 1, 5, basic_rookie()).unwrap();
        assert_eq!(c.target_distance(), Some(300.0));

        let c = SessionConfig::single(GameMode::Levels, 2, 3, basic_rookie()).unwrap();
        assert_eq!(c.target_distance(), Some(700.0));
    }

    #[test]
    fn test_target_distance_other_modes() {
        let c = SessionConfig::single(GameMode::Infinite, 1, 1, basic_rookie()).unwrap();
        assert_eq!(c.target_distance(), None);

        let c = SessionConfig::versus(basic_rookie(), basic_rookie()).unwrap();
        assert_eq!(c.target_distance(), Some(RACE_DISTANCE));
    }

    #[test]
    fn test_race_style_and_rivals() {
        let l1 = SessionConfig::single(GameMode::Levels, 1, 1, basic_rookie()).unwrap();
        assert!(!l1.is_race_style());
        assert_eq!(l1.rival_count(), 0);

        let l10 = SessionConfig::single(GameMode::Levels, 1, 10, basic_rookie()).unwrap();
        assert!(l10.is_race_style());
        assert_eq!(l10.rival_count(), 1);

        let w2 = SessionConfig::single(GameMode::Levels, 2, 1, basic_rookie()).unwrap();
        assert_eq!(w2.rival_count(), 5);

        let vs = SessionConfig::versus(basic_rookie(), basic_rookie()).unwrap();
        assert!(vs.is_race_style());
        assert_eq!(vs.rival_count(), 0);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            SessionConfig::single(GameMode::Levels, 4, 1, basic_rookie()),
            Err(ConfigError::InvalidWorld(4))
        ));
        assert!(matches!(
            SessionConfig::single(GameMode::Levels, 1, 11, basic_rookie()),
            Err(ConfigError::InvalidLevel { world: 1, level: 11 })
        ));

        let bad = SessionConfig {
            mode: GameMode::Levels,
            world: 1,
            level: 1,
            players: vec![basic_rookie(), basic_rookie()],
        };
        let err = bad.validate().unwrap_err();
        assert!(matches!(err, ConfigError::SecondPlayerOutsideRace(GameMode::Levels)));
        assert_eq!(err.to_string(), "two players are only allowed in race mode, not levels");
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.vehicle("kaiser").unwrap().collision_boost, 0.5);
        assert_eq!(catalog.driver("kalleb").unwrap().ability, AbilityKind::MissileSwarm);
        assert!(matches!(
            catalog.vehicle("batmobile"),
            Err(ConfigError::UnknownVehicle(id)) if id == "batmobile"
        ));
    }

    #[test]
    fn test_catalog_json_roundtrip_keeps_abilities() {
        let json = serde_json::to_string(&Catalog::builtin()).unwrap();
        let loaded = Catalog::from_json(&json).unwrap();
        assert_eq!(loaded.driver("chrono").unwrap().ability, AbilityKind::TimeStop);
        assert!(Catalog::from_json("{ not json").is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(GameMode::parse("Multiplayer"), Some(GameMode::Race));
        assert_eq!(GameMode::parse("levels"), Some(GameMode::Levels));
        assert_eq!(GameMode::parse("arcade"), None);
    }
}
