//! Continuous combat resolution.
//!
//! There are no turns: every tick, each squad with weapons free and a
//! live, visible target fires whichever members have a cold weapon and
//! the target inside range. Damage is deterministic; variance belongs to
//! a seeded layer above this core if a game wants it.

use serde::{Deserialize, Serialize};

use crate::squads::{Squad, SquadId, SquadStorage};
use crate::terrain::{TerrainEffect, TileMap};
use crate::vision::VisionSystem;

/// Damage dealt by one member's shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Squad that fired.
    pub attacker: SquadId,
    /// Squad that was hit.
    pub target: SquadId,
    /// Member index of the firing character in the attacker squad.
    pub member: usize,
    /// Damage dealt after terrain modifiers.
    pub damage: u32,
}

/// Damage of one shot after terrain modifiers, floored at 1.
///
/// Attack is scaled by the terrain under the shooter, defense by the
/// terrain under the target. A hit always deals at least 1 so stacked
/// defense can never make a squad invulnerable.
#[must_use]
pub fn calculate_damage(
    attack: u32,
    defense: u32,
    attacker_terrain: &TerrainEffect,
    defender_terrain: &TerrainEffect,
) -> u32 {
    let effective_attack = i64::from(attack) * i64::from(100 + attacker_terrain.attack_bonus) / 100;
    let effective_defense =
        i64::from(defense) * i64::from(100 + defender_terrain.defense_bonus) / 100;
    (effective_attack - effective_defense).max(1) as u32
}

/// Run one combat tick over every squad, in sorted-id order.
///
/// Firing requires, in order: an attack-allowing stance, a live hostile
/// target, and the target visible to the attacker's faction this tick.
/// Each eligible member with an elapsed interval and the target within
/// its weapon range fires exactly once and restarts its interval.
/// Cooldowns tick down for everyone regardless of eligibility.
pub fn combat_system(
    squads: &mut SquadStorage,
    vision: &mut VisionSystem,
    map: &TileMap,
    delta_ms: u32,
    tick: u64,
) -> Vec<DamageEvent> {
    let ids = squads.sorted_ids();

    for &id in &ids {
        if let Some(squad) = squads.get_mut(id) {
            for member in &mut squad.members {
                member.tick_cooldown(delta_ms);
            }
        }
    }

    let mut events = Vec::new();

    for &attacker_id in &ids {
        let Some(attacker) = squads.get(attacker_id) else {
            continue;
        };
        if !attacker.is_active() || !attacker.mode.profile().attack_allowed {
            continue;
        }
        let Some(target_id) = attacker.attack_target else {
            continue;
        };
        let attacker_faction = attacker.faction;

        let target_alive = squads
            .get(target_id)
            .is_some_and(|target| target.is_active() && attacker_faction.is_hostile_to(target.faction));
        if !target_alive {
            if let Some(attacker) = squads.get_mut(attacker_id) {
                attacker.attack_target = None;
            }
            continue;
        }

        // One shot per ready member whose weapon reaches the target tile.
        let shots: Vec<(usize, u32)> = {
            let Some(attacker) = squads.get(attacker_id) else {
                continue;
            };
            let Some(target) = squads.get(target_id) else {
                continue;
            };

            let viewers: Vec<&Squad> = ids
                .iter()
                .filter_map(|&id| squads.get(id))
                .filter(|squad| squad.faction == attacker_faction && squad.is_active())
                .collect();
            if !vision.is_visible_by_faction(target, attacker_faction, &viewers, map, tick) {
                continue;
            }

            let target_tile = map.pixel_to_grid(target.position);
            let defender_terrain = map.effect_at(target.position);
            let defense = target
                .target_member_index()
                .map_or(0, |index| target.members[index].stats.defense);

            attacker
                .members
                .iter()
                .enumerate()
                .filter(|(_, member)| member.can_fire())
                .filter_map(|(index, member)| {
                    let member_pos = attacker.position + member.offset;
                    let member_tile = map.pixel_to_grid(member_pos);
                    let range = member.stats.attack_range as i32;
                    if member_tile.chebyshev_distance(target_tile) > range {
                        return None;
                    }
                    let attacker_terrain = map.effect_at(member_pos);
                    Some((
                        index,
                        calculate_damage(
                            member.stats.attack,
                            defense,
                            &attacker_terrain,
                            &defender_terrain,
                        ),
                    ))
                })
                .collect()
        };

        for (member_index, damage) in shots {
            if let Some(target) = squads.get_mut(target_id) {
                if target.take_hit(damage).is_none() {
                    break;
                }
            }
            if let Some(attacker) = squads.get_mut(attacker_id) {
                attacker.members[member_index].reset_cooldown();
            }
            events.push(DamageEvent {
                attacker: attacker_id,
                target: target_id,
                member: member_index,
                damage,
            });
        }
    }

    events
}
