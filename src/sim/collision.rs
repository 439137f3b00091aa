//! Collision detection and damage resolution
//!
//! Cars, drones and missiles are axis-aligned boxes; coins, shuriken and orbs
//! are circles. Coin pickup uses the center distance against the combined
//! radius, taking the car's half short side as its radius. Shots test their
//! bounding square against the box so a fast shot can't slip past a corner.
//!
//! `resolve` runs the categories in a fixed order since earlier ones remove
//! entities later ones would otherwise see.

use glam::Vec2;

use super::spawn::explode;
use super::state::{Burst, EntityId, GameEvent, GameState, Player, Projectile, ProjectileKind, Rect, Shape};
use crate::consts::*;
use crate::frames;

/// Box overlap (touching edges don't count)
#[inline]
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    let (a_max, b_max) = (a.max(), b.max());
    a.min.x < b_max.x && a_max.x > b.min.x && a.min.y < b_max.y && a_max.y > b.min.y
}

/// Circle vs box, treating the box as a circle of its half short side
#[inline]
pub fn circle_hits_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let rect_radius = rect.size.x.min(rect.size.y) / 2.0;
    center.distance(rect.center()) < radius + rect_radius
}

#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance(b) < ra + rb
}

/// Circle's bounding square vs box
#[inline]
pub fn circle_bounds_hit_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    rects_overlap(&Rect::new(center - Vec2::splat(radius), Vec2::splat(radius * 2.0)), rect)
}

/// Projectile vs box
pub fn projectile_hits_rect(p: &Projectile, rect: &Rect) -> bool {
    match p.shape {
        Shape::Circle { radius } => circle_bounds_hit_rect(p.pos, radius, rect),
        Shape::Box { size } => rects_overlap(&Rect::new(p.pos, size), rect),
    }
}

/// Projectile vs projectile, any shape combination
pub fn projectiles_overlap(a: &Projectile, b: &Projectile) -> bool {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circles_overlap(a.pos, ra, b.pos, rb)
        }
        (Shape::Circle { radius }, Shape::Box { size }) => {
            circle_bounds_hit_rect(a.pos, radius, &Rect::new(b.pos, size))
        }
        (Shape::Box { size }, Shape::Circle { radius }) => {
            circle_bounds_hit_rect(b.pos, radius, &Rect::new(a.pos, size))
        }
        (Shape::Box { size: sa }, Shape::Box { size: sb }) => {
            rects_overlap(&Rect::new(a.pos, sa), &Rect::new(b.pos, sb))
        }
    }
}

/// Hit a player, recording the event. No-op while invincible.
fn damage_player(player: &mut Player, amount: u8, grace_ms: f32, events: &mut Vec<GameEvent>) -> bool {
    if !player.try_damage(amount, grace_ms) {
        return false;
    }
    log::debug!("{:?} hit for {} (health {})", player.slot, amount, player.health);
    events.push(GameEvent::PlayerHit {
        slot: player.slot,
        damage: amount,
        health: player.health,
    });
    true
}

/// Resolve every collision category for this tick
pub fn resolve(state: &mut GameState, dt: f32) {
    let mut blasts: Vec<(Vec2, Burst)> = Vec::new();

    traffic_vs_players(state, &mut blasts);
    rivals_vs_players(state, &mut blasts);
    coins_vs_players(state, dt);
    player_vs_player(state, &mut blasts);
    projectiles_vs_traffic_and_rivals(state, &mut blasts);
    projectiles_vs_players(state, &mut blasts);
    projectiles_vs_projectiles(state, &mut blasts);
    drones_vs_everything(state, &mut blasts);

    for (at, burst) in blasts {
        explode(state, at, burst, false);
    }
}

fn traffic_vs_players(state: &mut GameState, blasts: &mut Vec<(Vec2, Burst)>) {
    for player in &mut state.players {
        if !player.is_alive() {
            continue;
        }
        let rect = player.rect();
        let mut i = 0;
        while i < state.traffic.len() {
            let t_rect = state.traffic[i].rect();
            if !rects_overlap(&rect, &t_rect) {
                i += 1;
                continue;
            }
            let wrecked = player.status.bulldozer
                || damage_player(player, 1, HIT_GRACE_MS, &mut state.events);
            if wrecked {
                let t = state.traffic.remove(i);
                state.events.push(GameEvent::TrafficDestroyed { id: t.id });
                blasts.push((t_rect.center(), Burst::Wreck));
            } else {
                // Invincible: drive straight through
                i += 1;
            }
        }
    }
}

fn rivals_vs_players(state: &mut GameState, blasts: &mut Vec<(Vec2, Burst)>) {
    for player in &mut state.players {
        if !player.is_alive() {
            continue;
        }
        for rival in &state.rivals {
            if rects_overlap(&player.rect(), &rival.rect())
                && damage_player(player, 1, RIVAL_HIT_GRACE_MS, &mut state.events)
            {
                blasts.push((player.center(), Burst::Crash));
            }
        }
    }
}

fn coins_vs_players(state: &mut GameState, dt: f32) {
    let f = frames(dt);

    for coin in &mut state.coins {
        let magnet = state
            .players
            .iter()
            .filter(|p| p.is_alive() && p.status.magnet)
            .map(|p| p.center())
            .find(|c| c.distance(coin.pos) < MAGNET_RADIUS);

        match magnet {
            Some(center) => {
                let to = center - coin.pos;
                let pull = MAGNET_PULL * f;
                coin.pos += if to.length() <= pull { to } else { to.normalize() * pull };
            }
            None => coin.pos.x -= state.road_speed * f,
        }
    }

    let mut i = 0;
    while i < state.coins.len() {
        let coin = &state.coins[i];
        let collector = state
            .players
            .iter()
            .find(|p| p.is_alive() && circle_hits_rect(coin.pos, coin.radius, &p.rect()))
            .map(|p| p.slot);
        match collector {
            Some(slot) => {
                state.coins.remove(i);
                state.session_coins += 1;
                state.screen_shake = state.screen_shake.max(2.0);
                state.events.push(GameEvent::CoinCollected {
                    slot,
                    total: state.session_coins,
                });
            }
            None => i += 1,
        }
    }

    state.coins.retain(|c| c.pos.x >= -20.0);
}

fn player_vs_player(state: &mut GameState, blasts: &mut Vec<(Vec2, Burst)>) {
    let [p1, p2] = state.players.as_mut_slice() else {
        return;
    };
    if !(p1.is_alive() && p2.is_alive()) || !rects_overlap(&p1.rect(), &p2.rect()) {
        return;
    }

    // Push apart vertically; the next integration step clamps to the track
    if p1.pos.y <= p2.pos.y {
        p1.pos.y -= REPULSION;
        p2.pos.y += REPULSION;
    } else {
        p1.pos.y += REPULSION;
        p2.pos.y -= REPULSION;
    }

    let events = &mut state.events;
    if p1.status.bulldozer {
        damage_player(p2, 1, HIT_GRACE_MS, events);
    } else if p2.status.bulldozer {
        damage_player(p1, 1, HIT_GRACE_MS, events);
    } else if !p1.status.invincible && !p2.status.invincible {
        damage_player(p1, 1, HIT_GRACE_MS, events);
        damage_player(p2, 1, HIT_GRACE_MS, events);
    }

    blasts.push(((p1.center() + p2.center()) / 2.0, Burst::Crash));
}

fn projectiles_vs_traffic_and_rivals(state: &mut GameState, blasts: &mut Vec<(Vec2, Burst)>) {
    let mut spent: Vec<EntityId> = Vec::new();

    for proj in &state.projectiles {
        if proj.is_drone() {
            continue;
        }
        let pierce = proj.kind == ProjectileKind::HeavyOrb;
        let mut consumed = false;

        let mut i = 0;
        while i < state.traffic.len() && !consumed {
            let t_rect = state.traffic[i].rect();
            if projectile_hits_rect(proj, &t_rect) {
                let t = state.traffic.remove(i);
                state.events.push(GameEvent::TrafficDestroyed { id: t.id });
                blasts.push((t_rect.center(), Burst::Wreck));
                consumed = !pierce;
            } else {
                i += 1;
            }
        }

        for rival in &mut state.rivals {
            if consumed {
                break;
            }
            if projectile_hits_rect(proj, &rival.rect()) {
                rival.stun_timer = RIVAL_STUN_MS;
                state.events.push(GameEvent::RivalStunned { id: rival.id });
                consumed = !pierce;
            }
        }

        if consumed {
            spent.push(proj.id);
        }
    }

    state.projectiles.retain(|p| !spent.contains(&p.id));
}

fn projectiles_vs_players(state: &mut GameState, blasts: &mut Vec<(Vec2, Burst)>) {
    let mut spent: Vec<EntityId> = Vec::new();

    for proj in &state.projectiles {
        if proj.is_drone() {
            continue;
        }
        let Some(victim) = state.players.get_mut(proj.owner.other().index()) else {
            continue;
        };
        if victim.is_alive()
            && projectile_hits_rect(proj, &victim.rect())
            && damage_player(victim, proj.damage(), HIT_GRACE_MS, &mut state.events)
        {
            blasts.push((victim.center(), Burst::Crash));
            spent.push(proj.id);
        }
    }

    state.projectiles.retain(|p| !spent.contains(&p.id));
}

fn projectiles_vs_projectiles(state: &mut GameState, blasts: &mut Vec<(Vec2, Burst)>) {
    let mut spent: Vec<EntityId> = Vec::new();
    let projs = &state.projectiles;

    for (i, a) in projs.iter().enumerate() {
        if a.is_drone() || spent.contains(&a.id) {
            continue;
        }
        for b in &projs[i + 1..] {
            if b.is_drone() || a.owner == b.owner || spent.contains(&b.id) {
                continue;
            }
            if projectiles_overlap(a, b) {
                spent.push(a.id);
                spent.push(b.id);
                blasts.push(((a.center() + b.center()) / 2.0, Burst::Wreck));
                break;
            }
        }
    }

    state.projectiles.retain(|p| !spent.contains(&p.id));
}

/// Drones block everything and die doing it
fn drones_vs_everything(state: &mut GameState, blasts: &mut Vec<(Vec2, Burst)>) {
    let mut spent: Vec<EntityId> = Vec::new();

    for drone in state.projectiles.iter().filter(|p| p.is_drone()) {
        let Shape::Box { size } = drone.shape else {
            continue;
        };
        let rect = Rect::new(drone.pos, size);

        if let Some(i) = state.traffic.iter().position(|t| rects_overlap(&rect, &t.rect())) {
            let t = state.traffic.remove(i);
            state.events.push(GameEvent::TrafficDestroyed { id: t.id });
            blasts.push((t.rect().center(), Burst::Wreck));
            spent.push(drone.id);
            continue;
        }

        let enemy_shot = state.projectiles.iter().find(|p| {
            p.owner != drone.owner
                && !p.is_drone()
                && !spent.contains(&p.id)
                && projectile_hits_rect(p, &rect)
        });
        if let Some(shot) = enemy_shot {
            spent.push(shot.id);
            spent.push(drone.id);
            blasts.push((rect.center(), Burst::Wreck));
            continue;
        }

        if let Some(enemy) = state.players.get_mut(drone.owner.other().index()) {
            if enemy.is_alive() && rects_overlap(&rect, &enemy.rect()) {
                damage_player(enemy, 1, HIT_GRACE_MS, &mut state.events);
                blasts.push((rect.center(), Burst::Crash));
                spent.push(drone.id);
            }
        }
    }

    state.projectiles.retain(|p| !spent.contains(&p.id));
}
