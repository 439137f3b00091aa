//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only enters through the `dt` handed to `tick`
//! - Seeded RNG only
//! - Stable iteration order (insertion order of each entity list)
//! - No rendering or platform dependencies

pub mod ability;
pub mod ai;
pub mod collision;
pub mod movement;
pub mod spawn;
pub mod state;
pub mod tick;

pub use ability::{Cast, activate};
pub use state::{
    Burst, Coin, EntityId, GameEvent, GamePhase, GameState, Particle, Player, Projectile,
    ProjectileKind, Rect, Rival, Shape, Slot, StatusFlags, TargetRef, Traffic,
};
pub use tick::{PlayerIntent, TickInput, tick};
