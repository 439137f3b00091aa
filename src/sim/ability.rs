//! Driver abilities
//!
//! `activate` resolves a cast for one player slot; `update_status` decays the
//! ability/grace timers and rebuilds every player's status flags from them.

use glam::Vec2;

use super::spawn::explode;
use super::state::{
    Burst, GameEvent, GameState, Projectile, ProjectileKind, Shape, Slot, StatusFlags, TargetRef,
};
use crate::config::AbilityKind;
use crate::consts::*;

/// Result of an activation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    /// Cooldown still running, nothing happened
    OnCooldown,
    /// Nothing to do (heal at full health, dead or missing caster)
    Fizzled,
    /// Ability fired and the cooldown started
    Fired(AbilityKind),
}

/// Try to cast the ability of the player in `slot`
pub fn activate(state: &mut GameState, slot: Slot) -> Cast {
    let Some(setup) = state.config.players.get(slot.index()) else {
        return Cast::Fizzled;
    };
    let kind = setup.driver.ability;
    let effect_ms = setup.driver.effect_ms;
    let cooldown_ms = setup.driver.cooldown_ms;

    let Some(caster) = state.player(slot) else {
        return Cast::Fizzled;
    };
    if !caster.ability_ready() {
        return Cast::OnCooldown;
    }
    if !caster.is_alive() {
        return Cast::Fizzled;
    }
    let caster_rect = caster.rect();
    let health = caster.health;

    match kind {
        AbilityKind::HealOne | AbilityKind::HealFull => {
            if health >= MAX_HEALTH {
                state.events.push(GameEvent::AbilityFizzled { slot, kind });
                return Cast::Fizzled;
            }
            let amount = if kind == AbilityKind::HealOne { 1 } else { MAX_HEALTH };
            if let Some(p) = state.player_mut(slot) {
                p.heal(amount);
            }
            explode(state, caster_rect.center(), Burst::Heal, false);
        }
        AbilityKind::Nuke => nuke(state, slot),
        AbilityKind::Shuriken | AbilityKind::HeavyOrb => {
            let (projectile, radius, speed) = if kind == AbilityKind::Shuriken {
                (ProjectileKind::Shuriken, state.tuning.shuriken_radius, state.tuning.shuriken_speed)
            } else {
                (ProjectileKind::HeavyOrb, state.tuning.orb_radius, state.tuning.orb_speed)
            };
            let id = state.next_entity_id();
            state.projectiles.push(Projectile {
                id,
                owner: slot,
                kind: projectile,
                shape: Shape::Circle { radius },
                pos: Vec2::new(caster_rect.max().x, caster_rect.center().y),
                vel: Vec2::new(speed, 0.0),
            });
        }
        AbilityKind::MissileSwarm => {
            let origin = caster_rect.center();
            let limit = state.tuning.missile_count;
            let targets = nearest_targets(state, slot, origin, limit);
            let speed = state.tuning.missile_speed;
            let count = targets.len();
            for (i, target) in targets.into_iter().enumerate() {
                // Fan out: upper, middle, lower
                let spread = i as f32 - (count as f32 - 1.0) / 2.0;
                let heading = Vec2::new(5.0, spread * 2.0).normalize() * speed;
                let id = state.next_entity_id();
                state.projectiles.push(Projectile {
                    id,
                    owner: slot,
                    kind: ProjectileKind::Missile { target: Some(target) },
                    shape: Shape::Box { size: Vec2::new(20.0, 10.0) },
                    pos: Vec2::new(caster_rect.max().x, origin.y - 5.0),
                    vel: heading,
                });
            }
            log::debug!("Missile swarm from {:?}: {} targets", slot, count);
        }
        AbilityKind::EscortDrones => {
            // A fresh cast replaces the previous escort
            state
                .projectiles
                .retain(|p| !(p.owner == slot && p.is_drone()));
            let n = state.tuning.drone_count;
            let size = state.tuning.drone_size;
            for i in 0..n {
                let lane = i as f32 - (n as f32 - 1.0) / 2.0;
                let offset = Vec2::new(
                    caster_rect.size.x + state.tuning.drone_lead,
                    caster_rect.size.y / 2.0 - size / 2.0 + lane * state.tuning.drone_spacing,
                );
                let id = state.next_entity_id();
                state.projectiles.push(Projectile {
                    id,
                    owner: slot,
                    kind: ProjectileKind::Drone { offset },
                    shape: Shape::Box { size: Vec2::splat(size) },
                    pos: caster_rect.min + offset,
                    vel: Vec2::ZERO,
                });
            }
        }
        // Timed buffs: flags come from the active timer in `update_status`
        AbilityKind::Shield
        | AbilityKind::Dash
        | AbilityKind::Bulldozer
        | AbilityKind::Magnet
        | AbilityKind::Ghost
        | AbilityKind::TimeHack
        | AbilityKind::TimeStop
        | AbilityKind::Overdrive
        | AbilityKind::GodMode => {}
    }

    if let Some(p) = state.player_mut(slot) {
        p.ability_timer = effect_ms;
        p.ability_cooldown = cooldown_ms;
    }
    state.events.push(GameEvent::AbilityCast { slot, kind });
    log::debug!("{:?} cast {}", slot, kind.as_str());
    Cast::Fired(kind)
}

/// Clear every hostile car and projectile, stun every rival
fn nuke(state: &mut GameState, slot: Slot) {
    let mut blasts: Vec<Vec2> = state.traffic.iter().map(|t| t.rect().center()).collect();
    for t in &state.traffic {
        state.events.push(GameEvent::TrafficDestroyed { id: t.id });
    }
    state.traffic.clear();

    blasts.extend(
        state
            .projectiles
            .iter()
            .filter(|p| p.owner != slot)
            .map(|p| p.center()),
    );
    state.projectiles.retain(|p| p.owner == slot);

    for rival in &mut state.rivals {
        rival.stun_timer = RIVAL_STUN_MS;
        state.events.push(GameEvent::RivalStunned { id: rival.id });
    }

    log::debug!("Nuke from {:?} cleared {} entities", slot, blasts.len());
    for at in blasts {
        explode(state, at, Burst::Wreck, true);
    }
}

/// Up to `limit` live targets for a missile owned by `owner`, nearest to
/// `origin` first. Ties keep insertion order: traffic, opponent, rivals.
pub fn nearest_targets(
    state: &GameState,
    owner: Slot,
    origin: Vec2,
    limit: usize,
) -> Vec<TargetRef> {
    let mut candidates: Vec<(TargetRef, f32)> = Vec::new();

    for t in &state.traffic {
        candidates.push((TargetRef::Traffic(t.id), t.rect().center().distance(origin)));
    }
    if let Some(opponent) = state.player(owner.other()) {
        if opponent.is_alive() && !opponent.status.invincible {
            candidates.push((TargetRef::Player(opponent.slot), opponent.center().distance(origin)));
        }
    }
    for r in &state.rivals {
        candidates.push((TargetRef::Rival(r.id), r.rect().center().distance(origin)));
    }

    // sort_by is stable, so equal distances keep insertion order
    candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().take(limit).map(|(t, _)| t).collect()
}

/// Current aim point of a target, `None` once it no longer exists
pub fn resolve_target(state: &GameState, target: TargetRef) -> Option<Vec2> {
    match target {
        TargetRef::Traffic(id) => state
            .traffic
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.rect().center()),
        TargetRef::Rival(id) => state
            .rivals
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.rect().center()),
        TargetRef::Player(slot) => state
            .player(slot)
            .filter(|p| p.is_alive())
            .map(|p| p.center()),
    }
}

/// Decay ability, grace and cooldown timers and rebuild status flags.
///
/// Flags are never accumulated: each tick starts from all-clear.
pub fn update_status(state: &mut GameState, dt: f32) {
    for i in 0..state.players.len() {
        let kind = state.config.players[i].driver.ability;
        let p = &mut state.players[i];

        let mut status = StatusFlags::default();
        let mut speed_mult = 1.0;

        if p.ability_timer > 0.0 {
            p.ability_timer -= dt;
            match kind {
                AbilityKind::Dash => {
                    speed_mult = 2.5;
                    status.invincible = true;
                }
                AbilityKind::Shield | AbilityKind::Ghost => status.invincible = true,
                AbilityKind::Overdrive => {
                    speed_mult = 3.0;
                    status.invincible = true;
                }
                AbilityKind::GodMode => {
                    speed_mult = 2.5;
                    status.invincible = true;
                    status.magnet = true;
                }
                AbilityKind::Bulldozer => status.bulldozer = true,
                AbilityKind::Magnet => status.magnet = true,
                AbilityKind::TimeHack => status.time_hacked = true,
                AbilityKind::TimeStop => status.time_stopped = true,
                // Instant kinds: the timer is only visual feedback
                _ => {}
            }
        }

        if p.grace_timer > 0.0 {
            p.grace_timer -= dt;
            status.invincible = true;
        }

        if p.ability_cooldown > 0.0 {
            p.ability_cooldown -= dt;
        }

        p.status = status;
        p.speed_mult = speed_mult;
    }
}
