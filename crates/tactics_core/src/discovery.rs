//! Discovery: the one-way hidden-to-revealed state machine for enemy
//! squads.
//!
//! Once a squad id enters the discovered set it never leaves it; losing
//! sight of a revealed squad does not hide it again. The permanent
//! reveal is intended design, not a missing feature. History is
//! append-only and survives until an explicit [`DiscoverySystem::reset`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::factions::Faction;
use crate::math::Vec2Fixed;
use crate::squads::{Squad, SquadId, SquadStorage};
use crate::terrain::TileMap;
use crate::vision::VisionSystem;

/// One line of the append-only discovery log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    /// Squad that was revealed.
    pub discovered: SquadId,
    /// Squad credited with the reveal (closest observer).
    pub discoverer: SquadId,
    /// Where the revealed squad stood at that moment.
    pub position: Vec2Fixed,
    /// Tick of the reveal.
    pub tick: u64,
}

/// Event emitted the one time a squad is revealed.
///
/// The presentation layer consumes these for effects and sound; the
/// combat system only reads the discovered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryEvent {
    /// Squad that was revealed.
    pub discovered: SquadId,
    /// Squad credited with the reveal.
    pub discoverer: SquadId,
    /// Where the revealed squad stood.
    pub position: Vec2Fixed,
    /// Tick of the reveal.
    pub tick: u64,
}

/// Tracks which enemy squads have been revealed to the player's side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverySystem {
    /// Ids of squads that have been revealed. Grows monotonically.
    discovered: HashSet<SquadId>,
    /// Append-only log of every reveal.
    history: Vec<DiscoveryRecord>,
}

impl DiscoverySystem {
    /// Create a system with nothing discovered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a squad has been revealed.
    #[must_use]
    pub fn is_discovered(&self, id: SquadId) -> bool {
        self.discovered.contains(&id)
    }

    /// The append-only reveal log.
    #[must_use]
    pub fn history(&self) -> &[DiscoveryRecord] {
        &self.history
    }

    /// Number of squads revealed so far.
    #[must_use]
    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    /// Run the player-side discovery sweep for this tick.
    ///
    /// Observers are the player faction's active squads, targets the
    /// enemy faction's. With no qualifying observer this is a silent
    /// no-op. Returns the events for squads revealed this tick.
    pub fn check_discovery(
        &mut self,
        squads: &mut SquadStorage,
        vision: &mut VisionSystem,
        map: &TileMap,
        tick: u64,
    ) -> Vec<DiscoveryEvent> {
        let observers = squads.active_ids_of_faction(Faction::Player);
        if observers.is_empty() {
            return Vec::new();
        }
        let targets = squads.active_ids_of_faction(Faction::Enemy);
        self.check_faction_discovery(Faction::Player, &observers, &targets, squads, vision, map, tick)
    }

    /// Faction-level discovery sweep.
    ///
    /// Every undiscovered target visible to the faction's shared vision
    /// is revealed, credited to the closest observer squad (Euclidean
    /// distance between squad origins).
    pub fn check_faction_discovery(
        &mut self,
        faction: Faction,
        observer_ids: &[SquadId],
        target_ids: &[SquadId],
        squads: &mut SquadStorage,
        vision: &mut VisionSystem,
        map: &TileMap,
        tick: u64,
    ) -> Vec<DiscoveryEvent> {
        let mut pending: Vec<(SquadId, SquadId, Vec2Fixed)> = Vec::new();

        {
            let observers: Vec<&Squad> = observer_ids
                .iter()
                .filter_map(|&id| squads.get(id))
                .collect();

            for &target_id in target_ids {
                if self.discovered.contains(&target_id) {
                    continue;
                }
                let Some(target) = squads.get(target_id) else {
                    continue;
                };
                if !faction.is_hostile_to(target.faction) {
                    continue;
                }
                if !vision.is_visible_by_faction(target, faction, &observers, map, tick) {
                    continue;
                }

                let mut closest: Option<(SquadId, crate::math::Fixed)> = None;
                for observer in &observers {
                    let dist = observer.position.distance_squared(target.position);
                    let replace = match closest {
                        Some((_, best)) => dist < best,
                        None => true,
                    };
                    if replace {
                        closest = Some((observer.id, dist));
                    }
                }
                if let Some((discoverer, _)) = closest {
                    pending.push((target_id, discoverer, target.position));
                }
            }
        }

        let mut events = Vec::new();
        for (target_id, discoverer, position) in pending {
            if let Some(event) = self.discover(target_id, discoverer, position, tick) {
                if let Some(target) = squads.get_mut(target_id) {
                    target.visible = true;
                }
                events.push(event);
            }
        }
        events
    }

    /// Record a reveal. Idempotent: an already-discovered squad returns
    /// `None` and nothing changes.
    pub fn discover(
        &mut self,
        discovered: SquadId,
        discoverer: SquadId,
        position: Vec2Fixed,
        tick: u64,
    ) -> Option<DiscoveryEvent> {
        if !self.discovered.insert(discovered) {
            return None;
        }
        self.history.push(DiscoveryRecord {
            discovered,
            discoverer,
            position,
            tick,
        });
        tracing::debug!(discovered, discoverer, tick, "squad discovered");
        Some(DiscoveryEvent {
            discovered,
            discoverer,
            position,
            tick,
        })
    }

    /// Set a freshly spawned squad's visible flag.
    ///
    /// Player and neutral squads are always visible. Enemy squads start
    /// hidden unless they were already revealed before spawning (the set
    /// outlives individual squads).
    pub fn initialize_visibility(&self, squad: &mut Squad) {
        squad.visible = match squad.faction {
            Faction::Player | Faction::Neutral => true,
            Faction::Enemy => self.discovered.contains(&squad.id),
        };
    }

    /// Explicit session reset: forget every reveal and the log.
    pub fn reset(&mut self) {
        self.discovered.clear();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;
    use crate::squads::{Character, CharacterStats};
    use crate::terrain::GridPos;

    fn stats() -> CharacterStats {
        CharacterStats {
            max_hp: 30,
            attack: 10,
            defense: 4,
            move_speed: Fixed::from_num(10),
            sight: 4,
            attack_range: 3,
            attack_interval_ms: 1000,
        }
    }

    fn spawn_at(
        storage: &mut SquadStorage,
        faction: Faction,
        tile_x: i32,
        tile_y: i32,
        map: &TileMap,
    ) -> SquadId {
        let position = map.grid_to_pixel(GridPos::new(tile_x, tile_y));
        let commander = Character::new(stats(), Vec2Fixed::ZERO);
        let squad = Squad::new(faction, position, commander, Vec::new()).unwrap();
        storage.insert(squad)
    }

    #[test]
    fn test_discovery_in_vision_range() {
        let map = TileMap::new(64, 64);
        let mut storage = SquadStorage::new();
        let mut vision = VisionSystem::new();
        let mut discovery = DiscoverySystem::new();

        let observer = spawn_at(&mut storage, Faction::Player, 10, 10, &map);
        let hidden = spawn_at(&mut storage, Faction::Enemy, 13, 10, &map);

        let events = discovery.check_discovery(&mut storage, &mut vision, &map, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].discovered, hidden);
        assert_eq!(events[0].discoverer, observer);
        assert!(discovery.is_discovered(hidden));
        assert!(storage.get(hidden).unwrap().visible);
    }

    #[test]
    fn test_out_of_range_stays_hidden() {
        let map = TileMap::new(64, 64);
        let mut storage = SquadStorage::new();
        let mut vision = VisionSystem::new();
        let mut discovery = DiscoverySystem::new();

        spawn_at(&mut storage, Faction::Player, 10, 10, &map);
        let hidden = spawn_at(&mut storage, Faction::Enemy, 40, 40, &map);

        let events = discovery.check_discovery(&mut storage, &mut vision, &map, 0);
        assert!(events.is_empty());
        assert!(!discovery.is_discovered(hidden));
    }

    #[test]
    fn test_no_observers_is_noop() {
        let map = TileMap::new(64, 64);
        let mut storage = SquadStorage::new();
        let mut vision = VisionSystem::new();
        let mut discovery = DiscoverySystem::new();

        spawn_at(&mut storage, Faction::Enemy, 10, 10, &map);

        let events = discovery.check_discovery(&mut storage, &mut vision, &map, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_discovery_is_monotonic_and_fires_once() {
        let map = TileMap::new(64, 64);
        let mut storage = SquadStorage::new();
        let mut vision = VisionSystem::new();
        let mut discovery = DiscoverySystem::new();

        spawn_at(&mut storage, Faction::Player, 10, 10, &map);
        let hidden = spawn_at(&mut storage, Faction::Enemy, 12, 10, &map);

        let first = discovery.check_discovery(&mut storage, &mut vision, &map, 0);
        assert_eq!(first.len(), 1);

        // Repeat sweeps never re-fire and never un-discover.
        for tick in 1..5 {
            vision.clear_cache();
            let events = discovery.check_discovery(&mut storage, &mut vision, &map, tick);
            assert!(events.is_empty());
            assert!(discovery.is_discovered(hidden));
        }
        assert_eq!(discovery.history().len(), 1);
    }

    #[test]
    fn test_closest_observer_credited() {
        let map = TileMap::new(64, 64);
        let mut storage = SquadStorage::new();
        let mut vision = VisionSystem::new();
        let mut discovery = DiscoverySystem::new();

        let far = spawn_at(&mut storage, Faction::Player, 6, 10, &map);
        let near = spawn_at(&mut storage, Faction::Player, 12, 10, &map);
        let mid = spawn_at(&mut storage, Faction::Player, 9, 10, &map);
        let target = spawn_at(&mut storage, Faction::Enemy, 13, 10, &map);

        let events = discovery.check_discovery(&mut storage, &mut vision, &map, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].discoverer, near);
        assert_ne!(events[0].discoverer, far);
        assert_ne!(events[0].discoverer, mid);
        assert_eq!(events[0].discovered, target);
    }

    #[test]
    fn test_initialize_visibility() {
        let map = TileMap::new(64, 64);
        let mut storage = SquadStorage::new();
        let discovery = DiscoverySystem::new();

        let player = spawn_at(&mut storage, Faction::Player, 1, 1, &map);
        let neutral = spawn_at(&mut storage, Faction::Neutral, 2, 2, &map);
        let enemy = spawn_at(&mut storage, Faction::Enemy, 3, 3, &map);

        for id in [player, neutral, enemy] {
            let squad = storage.get_mut(id).unwrap();
            discovery.initialize_visibility(squad);
        }

        assert!(storage.get(player).unwrap().visible);
        assert!(storage.get(neutral).unwrap().visible);
        assert!(!storage.get(enemy).unwrap().visible);
    }

    #[test]
    fn test_late_spawn_of_discovered_id_stays_visible() {
        let mut discovery = DiscoverySystem::new();
        discovery.discover(7, 1, Vec2Fixed::ZERO, 0);

        let commander = Character::new(stats(), Vec2Fixed::ZERO);
        let mut squad = Squad::new(Faction::Enemy, Vec2Fixed::ZERO, commander, Vec::new()).unwrap();
        squad.id = 7;
        discovery.initialize_visibility(&mut squad);
        assert!(squad.visible);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut discovery = DiscoverySystem::new();
        discovery.discover(1, 2, Vec2Fixed::ZERO, 0);
        assert_eq!(discovery.discovered_count(), 1);

        discovery.reset();
        assert_eq!(discovery.discovered_count(), 0);
        assert!(discovery.history().is_empty());
    }
}
