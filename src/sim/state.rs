//! Game state and core simulation types
//!
//! Every entity lives here and only for the duration of one session.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::{AbilityKind, SessionConfig};
use crate::consts::*;
use crate::lane_bounds;
use crate::outcome::SessionOutcome;
use crate::tuning::Tuning;

/// Entity ID, unique within a session and never reused
pub type EntityId = u32;

/// Player slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 { Slot::One } else { Slot::Two }
    }

    pub fn other(self) -> Self {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }
}

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Pre-race countdown, physics frozen
    Countdown,
    /// Active gameplay
    Running,
    /// Outcome decided (terminal)
    Finished,
}

/// Transient status, recomputed every tick from the ability and grace timers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub invincible: bool,
    pub magnet: bool,
    pub bulldozer: bool,
    pub time_hacked: bool,
    pub time_stopped: bool,
}

/// Axis-aligned rectangle (top-left corner + size)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max().x && p.y >= self.min.y && p.y <= self.max().y
    }
}

/// A human-controlled car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub slot: Slot,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    /// Forward speed before ability multipliers
    pub base_speed: f32,
    /// Added to `base_speed` on every hit taken
    pub collision_boost: f32,
    /// Vertical velocity (slippery worlds only)
    pub vel_y: f32,
    pub health: u8,
    /// Distance travelled this session
    pub distance: f32,
    /// Remaining active time of the driver ability (ms)
    pub ability_timer: f32,
    /// Time until the ability can be cast again (ms)
    pub ability_cooldown: f32,
    /// Invincibility left from the last hit taken (ms)
    pub grace_timer: f32,
    /// Speed multiplier granted by the active ability
    pub speed_mult: f32,
    pub status: StatusFlags,
}

impl Player {
    pub fn new(slot: Slot, pos: Vec2, base_speed: f32, collision_boost: f32) -> Self {
        Self {
            slot,
            pos,
            size: Vec2::new(CAR_WIDTH, CAR_HEIGHT),
            base_speed,
            collision_boost,
            vel_y: 0.0,
            health: MAX_HEALTH,
            distance: 0.0,
            ability_timer: 0.0,
            ability_cooldown: 0.0,
            grace_timer: 0.0,
            speed_mult: 1.0,
            status: StatusFlags::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn ability_ready(&self) -> bool {
        self.ability_cooldown <= 0.0
    }

    pub fn ability_active(&self) -> bool {
        self.ability_timer > 0.0
    }

    /// Forward speed this tick, before the opponent's time effects
    pub fn own_speed(&self) -> f32 {
        self.base_speed * self.speed_mult * ROAD_SPEED_FACTOR
    }

    /// Apply a hit. Returns false (and changes nothing) while invincible.
    ///
    /// Health saturates at 0; the victim becomes invincible for `grace_ms`.
    pub fn try_damage(&mut self, amount: u8, grace_ms: f32) -> bool {
        if self.status.invincible {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        self.grace_timer = self.grace_timer.max(grace_ms);
        self.status.invincible = true;
        self.base_speed += self.collision_boost;
        true
    }

    /// Restore health, never above `MAX_HEALTH`
    pub fn heal(&mut self, amount: u8) {
        self.health = self.health.saturating_add(amount).min(MAX_HEALTH);
    }

    /// Keep the car on the track
    pub fn clamp_to_track(&mut self) {
        let (lo, hi) = lane_bounds(self.size.y);
        if self.pos.y < lo || self.pos.y > hi {
            self.vel_y = 0.0;
        }
        self.pos.y = self.pos.y.clamp(lo, hi);
    }
}

/// An AI racer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rival {
    pub id: EntityId,
    pub pos: Vec2,
    pub size: Vec2,
    /// Forward speed when neither stunned nor frozen
    pub base_speed: f32,
    /// Vertical step per frame toward `target_y`
    pub step: f32,
    pub target_y: f32,
    /// Time until a new `target_y` is picked (ms)
    pub wander_timer: f32,
    pub stun_timer: f32,
    pub distance: f32,
}

impl Rival {
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }

    pub fn is_stunned(&self) -> bool {
        self.stun_timer > 0.0
    }
}

/// Oncoming traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Traffic {
    pub id: EntityId,
    pub pos: Vec2,
    pub size: Vec2,
    /// Own speed on top of the road scroll
    pub speed: f32,
}

impl Traffic {
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }
}

/// A collectible coin (circle)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
}

/// Non-owning reference from a missile to what it pursues.
///
/// Resolved against the live entity set every tick; a stale reference is
/// an ordinary state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRef {
    Traffic(EntityId),
    Rival(EntityId),
    Player(Slot),
}

/// Projectile behaviour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Straight line, destroys the first thing it hits
    Shuriken,
    /// Straight line, pierces traffic, 2 damage to a player
    HeavyOrb,
    /// Turn-rate limited homing
    Missile { target: Option<TargetRef> },
    /// Blocker riding at a fixed offset from its owner
    Drone { offset: Vec2 },
}

/// Collision shape of a projectile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// `pos` is the center
    Circle { radius: f32 },
    /// `pos` is the top-left corner
    Box { size: Vec2 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub owner: Slot,
    pub kind: ProjectileKind,
    pub shape: Shape,
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Projectile {
    pub fn center(&self) -> Vec2 {
        match self.shape {
            Shape::Circle { .. } => self.pos,
            Shape::Box { size } => self.pos + size * 0.5,
        }
    }

    /// Damage dealt to a player on impact
    pub fn damage(&self) -> u8 {
        match self.kind {
            ProjectileKind::HeavyOrb => 2,
            _ => 1,
        }
    }

    pub fn is_drone(&self) -> bool {
        matches!(self.kind, ProjectileKind::Drone { .. })
    }

    /// Outside the area projectiles may live in
    pub fn out_of_bounds(&self) -> bool {
        let c = self.center();
        c.x > PLAYFIELD_WIDTH + 100.0
            || c.x < -1000.0
            || c.y < -100.0
            || c.y > PLAYFIELD_HEIGHT + 100.0
    }
}

/// What an explosion looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Burst {
    /// A car was destroyed
    Wreck,
    /// A player was hit
    Crash,
    /// Health restored
    Heal,
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    /// Per-frame velocity
    pub vel: Vec2,
    pub burst: Burst,
    /// 0-1, decreases linearly with elapsed time
    pub life: f32,
    pub size: f32,
}

/// Things that happened during a tick (audio/HUD hooks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    CountdownStep(u8),
    RaceStarted,
    AbilityCast { slot: Slot, kind: AbilityKind },
    AbilityFizzled { slot: Slot, kind: AbilityKind },
    PlayerHit { slot: Slot, damage: u8, health: u8 },
    TrafficDestroyed { id: EntityId },
    RivalStunned { id: EntityId },
    CoinCollected { slot: Slot, total: u32 },
    Finished,
}

/// Complete session state (deterministic for a given seed and input sequence)
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: SessionConfig,
    pub tuning: Tuning,
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub phase: GamePhase,
    /// Single-player pause
    pub paused: bool,
    /// Countdown steps left
    pub countdown: u8,
    pub countdown_timer: f32,
    /// Simulation tick counter (running ticks only)
    pub time_ticks: u64,
    /// Finish distance, `None` when unbounded
    pub target_distance: Option<f32>,
    pub players: Vec<Player>,
    pub rivals: Vec<Rival>,
    pub traffic: Vec<Traffic>,
    pub coins: Vec<Coin>,
    pub projectiles: Vec<Projectile>,
    /// Visual particles (not gameplay-affecting)
    pub particles: Vec<Particle>,
    /// Coins picked up this session
    pub session_coins: u32,
    /// Shared scroll speed this tick (per frame)
    pub road_speed: f32,
    /// Road stripe offset, wraps at `ROAD_TILE`
    pub road_offset: f32,
    /// Screen shake intensity (decays)
    pub screen_shake: f32,
    pub traffic_timer: f32,
    pub coin_timer: f32,
    /// Events produced by the last tick
    pub events: Vec<GameEvent>,
    /// Set once the outcome is decided
    pub outcome: Option<SessionOutcome>,
    /// Victory exit animation still running
    pub sliding_off: bool,
    next_id: EntityId,
}

impl GameState {
    /// Create a new session state. `config` must already be validated.
    pub fn new(config: SessionConfig, tuning: Tuning, seed: u64) -> Self {
        let race_style = config.is_race_style();
        let mid = PLAYFIELD_HEIGHT / 2.0;

        let players = config
            .players
            .iter()
            .enumerate()
            .map(|(i, setup)| {
                let y = match (race_style, i) {
                    (true, 0) => 30.0,
                    (true, _) => 90.0,
                    (false, 0) => mid - CAR_HEIGHT,
                    (false, _) => mid + CAR_HEIGHT,
                };
                Player::new(
                    Slot::from_index(i),
                    Vec2::new(PLAYER_BASE_X, y),
                    setup.vehicle.base_speed(),
                    setup.vehicle.collision_boost,
                )
            })
            .collect();

        let (phase, countdown) = if race_style {
            (GamePhase::Countdown, COUNTDOWN_STEPS)
        } else {
            (GamePhase::Running, 0)
        };

        let mut state = Self {
            target_distance: config.target_distance(),
            config,
            tuning,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase,
            paused: false,
            countdown,
            countdown_timer: COUNTDOWN_STEP_MS,
            time_ticks: 0,
            players,
            rivals: Vec::new(),
            traffic: Vec::new(),
            coins: Vec::new(),
            projectiles: Vec::new(),
            particles: Vec::new(),
            session_coins: 0,
            road_speed: 0.0,
            road_offset: 0.0,
            screen_shake: 0.0,
            traffic_timer: 0.0,
            coin_timer: 0.0,
            events: Vec::new(),
            outcome: None,
            sliding_off: false,
            next_id: 1,
        };

        state.spawn_rivals();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Uniform random number in [0, 1)
    pub fn random(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    fn spawn_rivals(&mut self) {
        let count = self.config.rival_count();
        let speed = self.tuning.rival_speed(self.config.difficulty());
        let single_rival = self.config.world == 1;

        for i in 0..count {
            let y = if single_rival { 330.0 } else { 90.0 + i as f32 * 60.0 };
            let jitter = self.tuning.rival_speed_jitter;
            let base_speed = speed * (1.0 - jitter + self.random() * 2.0 * jitter);
            let (lo, hi) = (self.tuning.rival_step_min, self.tuning.rival_step_max);
            let step = if hi > lo { self.rng.random_range(lo..hi) } else { lo };
            let id = self.next_entity_id();
            self.rivals.push(Rival {
                id,
                pos: Vec2::new(PLAYER_BASE_X, y),
                size: Vec2::new(CAR_WIDTH, CAR_HEIGHT),
                base_speed,
                step,
                target_y: y,
                wander_timer: 0.0,
                stun_timer: 0.0,
                distance: 0.0,
            });
        }
    }

    pub fn player(&self, slot: Slot) -> Option<&Player> {
        self.players.get(slot.index())
    }

    pub fn player_mut(&mut self, slot: Slot) -> Option<&mut Player> {
        self.players.get_mut(slot.index())
    }

    /// Ability kind driven by the player in `slot`
    pub fn ability_of(&self, slot: Slot) -> Option<AbilityKind> {
        self.config.players.get(slot.index()).map(|p| p.driver.ability)
    }

    /// Farthest distance among human players
    pub fn leader_distance(&self) -> f32 {
        self.players
            .iter()
            .map(|p| p.distance)
            .fold(0.0, f32::max)
    }

    pub fn any_player(&self, f: impl Fn(&StatusFlags) -> bool) -> bool {
        self.players.iter().any(|p| f(&p.status))
    }

    /// True once the outcome is decided and the exit animation (if any) is done
    pub fn is_settled(&self) -> bool {
        self.phase == GamePhase::Finished && !self.sliding_off
    }
}
