//! Squads, characters, and squad storage.
//!
//! A squad is one commander plus up to [`MAX_SOLDIERS`] soldiers moving
//! and fighting as a unit. Characters are pure data; per-frame behavior
//! lives in the movement, vision, and combat modules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::movement::MoveMode;

/// Unique identifier for squads.
pub type SquadId = u64;

/// Maximum number of soldiers per squad (the commander is extra).
pub const MAX_SOLDIERS: usize = 3;

/// Static stats for one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    /// Maximum hit points.
    pub max_hp: u32,
    /// Base attack power.
    pub attack: u32,
    /// Base defense.
    pub defense: u32,
    /// Movement speed contribution to the squad average.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,
    /// Base sight range in tiles.
    pub sight: i32,
    /// Weapon range in tiles (Chebyshev).
    pub attack_range: u32,
    /// Minimum milliseconds between shots.
    pub attack_interval_ms: u32,
}

/// One member of a squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Static stats.
    pub stats: CharacterStats,
    /// Current hit points.
    pub hp: u32,
    /// Position relative to the squad origin, in pixels.
    pub offset: Vec2Fixed,
    /// Milliseconds until this character may fire again.
    pub cooldown_ms: u32,
}

impl Character {
    /// Create a character at full health with a cold weapon.
    #[must_use]
    pub const fn new(stats: CharacterStats, offset: Vec2Fixed) -> Self {
        Self {
            stats,
            hp: stats.max_hp,
            offset,
            cooldown_ms: 0,
        }
    }

    /// Check whether this character is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Check whether this character may fire right now.
    #[must_use]
    pub const fn can_fire(&self) -> bool {
        self.is_alive() && self.cooldown_ms == 0
    }

    /// Apply damage, returning the amount actually dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.hp);
        self.hp -= actual;
        actual
    }

    /// Reset the weapon cooldown after firing.
    pub fn reset_cooldown(&mut self) {
        self.cooldown_ms = self.stats.attack_interval_ms;
    }

    /// Tick the weapon cooldown down by the frame delta.
    pub fn tick_cooldown(&mut self, delta_ms: u32) {
        self.cooldown_ms = self.cooldown_ms.saturating_sub(delta_ms);
    }
}

/// Whether a squad is currently en route to a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementState {
    /// Standing still, no active route.
    #[default]
    Idle,
    /// Heading toward the contained pixel target.
    Moving(Vec2Fixed),
}

/// A commander and up to three soldiers acting as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    /// Unique identifier, assigned by [`SquadStorage`].
    pub id: SquadId,
    /// Owning faction.
    pub faction: Faction,
    /// Squad origin in pixel space. Member positions are origin + offset.
    pub position: Vec2Fixed,
    /// Roster. Invariant: the commander is always member 0.
    pub members: Vec<Character>,
    /// Current movement/combat stance.
    pub mode: MoveMode,
    /// Current movement state, maintained by the movement processor.
    pub movement: MovementState,
    /// Squad this squad is ordered to fire on, if any.
    pub attack_target: Option<SquadId>,
    /// Whether the squad is revealed to the player's side.
    pub visible: bool,
}

impl Squad {
    /// Create a squad from a commander and optional soldiers.
    ///
    /// The id is a placeholder until [`SquadStorage::insert`] assigns
    /// the real one.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RosterFull`] when more than [`MAX_SOLDIERS`]
    /// soldiers are supplied.
    pub fn new(
        faction: Faction,
        position: Vec2Fixed,
        commander: Character,
        soldiers: Vec<Character>,
    ) -> Result<Self> {
        if soldiers.len() > MAX_SOLDIERS {
            return Err(GameError::RosterFull { max: MAX_SOLDIERS });
        }

        let mut members = Vec::with_capacity(1 + soldiers.len());
        members.push(commander);
        members.extend(soldiers);

        Ok(Self {
            id: 0,
            faction,
            position,
            members,
            mode: MoveMode::Normal,
            movement: MovementState::Idle,
            attack_target: None,
            visible: true,
        })
    }

    /// The squad's commander (always member 0).
    #[must_use]
    pub fn commander(&self) -> &Character {
        &self.members[0]
    }

    /// Add a soldier to the roster.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RosterFull`] when the roster already holds
    /// [`MAX_SOLDIERS`] soldiers.
    pub fn add_soldier(&mut self, soldier: Character) -> Result<()> {
        if self.members.len() >= 1 + MAX_SOLDIERS {
            return Err(GameError::RosterFull { max: MAX_SOLDIERS });
        }
        self.members.push(soldier);
        Ok(())
    }

    /// Remove a soldier by member index.
    ///
    /// Index 0 is the commander and cannot be removed; out-of-range or
    /// commander indices return `None`.
    pub fn remove_soldier(&mut self, index: usize) -> Option<Character> {
        if index == 0 || index >= self.members.len() {
            return None;
        }
        Some(self.members.remove(index))
    }

    /// Iterate over alive members.
    pub fn alive_members(&self) -> impl Iterator<Item = &Character> {
        self.members.iter().filter(|member| member.is_alive())
    }

    /// Number of alive members.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive_members().count()
    }

    /// A squad is active while at least one member is alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.members.iter().any(Character::is_alive)
    }

    /// Absolute pixel position of a member.
    #[must_use]
    pub fn member_position(&self, index: usize) -> Vec2Fixed {
        self.position + self.members[index].offset
    }

    /// Check whether the squad is en route to a waypoint.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        matches!(self.movement, MovementState::Moving(_))
    }

    /// Member index the next incoming hit lands on.
    ///
    /// Soldiers soak damage first; the commander falls last.
    #[must_use]
    pub fn target_member_index(&self) -> Option<usize> {
        (1..self.members.len())
            .find(|&index| self.members[index].is_alive())
            .or_else(|| self.members[0].is_alive().then_some(0))
    }

    /// Apply damage to the squad, soldiers before commander.
    ///
    /// Returns the member index hit and the damage actually dealt, or
    /// `None` when no member is alive.
    pub fn take_hit(&mut self, damage: u32) -> Option<(usize, u32)> {
        let index = self.target_member_index()?;
        let dealt = self.members[index].apply_damage(damage);
        Some((index, dealt))
    }
}

/// Storage for all squads in the simulation.
///
/// `HashMap` lookup by id, with deterministic iteration via sorted ids
/// when systems process every squad.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SquadStorage {
    /// Map of squad id to squad data.
    squads: HashMap<SquadId, Squad>,
    /// Next squad id to assign.
    next_id: SquadId,
}

impl SquadStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            squads: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a squad and return its assigned id.
    pub fn insert(&mut self, mut squad: Squad) -> SquadId {
        let id = self.next_id;
        self.next_id += 1;
        squad.id = id;
        self.squads.insert(id, squad);
        id
    }

    /// Remove a squad by id.
    pub fn remove(&mut self, id: SquadId) -> Option<Squad> {
        self.squads.remove(&id)
    }

    /// Get a squad by id.
    #[must_use]
    pub fn get(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(&id)
    }

    /// Get a mutable reference to a squad by id.
    pub fn get_mut(&mut self, id: SquadId) -> Option<&mut Squad> {
        self.squads.get_mut(&id)
    }

    /// Check whether a squad exists.
    #[must_use]
    pub fn contains(&self, id: SquadId) -> bool {
        self.squads.contains_key(&id)
    }

    /// Number of squads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.squads.len()
    }

    /// Check whether storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.squads.is_empty()
    }

    /// Sorted squad ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<SquadId> {
        let mut ids: Vec<_> = self.squads.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all squads (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&SquadId, &Squad)> {
        self.squads.iter()
    }

    /// Sorted ids of active squads belonging to a faction.
    #[must_use]
    pub fn active_ids_of_faction(&self, faction: Faction) -> Vec<SquadId> {
        let mut ids: Vec<_> = self
            .squads
            .values()
            .filter(|squad| squad.faction == faction && squad.is_active())
            .map(|squad| squad.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(move_speed: i32) -> CharacterStats {
        CharacterStats {
            max_hp: 30,
            attack: 10,
            defense: 4,
            move_speed: Fixed::from_num(move_speed),
            sight: 4,
            attack_range: 3,
            attack_interval_ms: 1000,
        }
    }

    fn squad_of(count_soldiers: usize) -> Squad {
        let commander = Character::new(stats(12), Vec2Fixed::ZERO);
        let soldiers = (0..count_soldiers)
            .map(|_| Character::new(stats(10), Vec2Fixed::ZERO))
            .collect();
        Squad::new(Faction::Player, Vec2Fixed::ZERO, commander, soldiers).unwrap()
    }

    #[test]
    fn test_commander_is_member_zero() {
        let squad = squad_of(2);
        assert_eq!(squad.commander().stats.move_speed, Fixed::from_num(12));
        assert_eq!(squad.members.len(), 3);
    }

    #[test]
    fn test_roster_cap() {
        let commander = Character::new(stats(12), Vec2Fixed::ZERO);
        let soldiers = (0..4).map(|_| Character::new(stats(10), Vec2Fixed::ZERO)).collect();
        assert!(matches!(
            Squad::new(Faction::Player, Vec2Fixed::ZERO, commander, soldiers),
            Err(GameError::RosterFull { .. })
        ));

        let mut squad = squad_of(3);
        assert!(squad.add_soldier(Character::new(stats(10), Vec2Fixed::ZERO)).is_err());
    }

    #[test]
    fn test_cannot_remove_commander() {
        let mut squad = squad_of(1);
        assert!(squad.remove_soldier(0).is_none());
        assert!(squad.remove_soldier(1).is_some());
        assert!(squad.remove_soldier(1).is_none());
    }

    #[test]
    fn test_active_until_all_dead() {
        let mut squad = squad_of(1);
        assert!(squad.is_active());

        squad.members[0].hp = 0;
        assert!(squad.is_active());

        squad.members[1].hp = 0;
        assert!(!squad.is_active());
    }

    #[test]
    fn test_hits_land_on_soldiers_first() {
        let mut squad = squad_of(2);
        let (index, dealt) = squad.take_hit(30).unwrap();
        assert_eq!(index, 1);
        assert_eq!(dealt, 30);
        assert!(!squad.members[1].is_alive());

        let (index, _) = squad.take_hit(30).unwrap();
        assert_eq!(index, 2);

        // Only the commander left now.
        let (index, _) = squad.take_hit(5).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_storage_assigns_sequential_ids() {
        let mut storage = SquadStorage::new();
        let a = storage.insert(squad_of(0));
        let b = storage.insert(squad_of(0));
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(storage.sorted_ids(), vec![1, 2]);
    }
}
