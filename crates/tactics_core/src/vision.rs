//! Fog-of-war vision: per-member sight, faction-shared visible tiles,
//! and the per-tick shared-vision cache.
//!
//! Vision is faction-shared: every squad of a faction contributes to and
//! benefits from one combined tile set. It is never cross-faction; an
//! enemy query can never read the player's cache entry and vice versa.
//! Footprints are square (Chebyshev), matching the tile grid.

use std::collections::{HashMap, HashSet};

use crate::factions::Faction;
use crate::math::Vec2Fixed;
use crate::movement::MoveMode;
use crate::squads::{CharacterStats, Squad, SquadId};
use crate::terrain::{GridPos, TerrainEffect, TileMap};

/// Sight range in tiles after stance and terrain adjustments.
///
/// Floored at 1: no combination of penalties blinds a character
/// completely.
#[must_use]
pub fn effective_sight(stats: &CharacterStats, mode: MoveMode, effect: &TerrainEffect) -> i32 {
    (stats.sight + mode.profile().sight_bonus + effect.vision_modifier).max(1)
}

/// One alive member's field of view, derived fresh per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisionArea {
    /// Member's absolute pixel position.
    pub center: Vec2Fixed,
    /// Tile the member stands on.
    pub tile: GridPos,
    /// Effective sight range in tiles.
    pub range: i32,
}

impl VisionArea {
    /// Check whether a tile falls inside this square footprint.
    #[must_use]
    pub fn contains(&self, tile: GridPos) -> bool {
        in_sight(self.tile, tile, self.range)
    }
}

/// Square-footprint sight test: Chebyshev distance at most `range`.
#[must_use]
pub fn in_sight(observer: GridPos, target: GridPos, range: i32) -> bool {
    observer.chebyshev_distance(target) <= range
}

/// Compute one vision area per alive member of a squad.
///
/// Terrain is looked up at each member's own tile, so a soldier in
/// forest sees less than their commander on the hill next to them.
#[must_use]
pub fn squad_vision(squad: &Squad, map: &TileMap) -> Vec<VisionArea> {
    squad
        .members
        .iter()
        .filter(|member| member.is_alive())
        .map(|member| {
            let center = squad.position + member.offset;
            let effect = map.effect_at(center);
            VisionArea {
                center,
                tile: map.pixel_to_grid(center),
                range: effective_sight(&member.stats, squad.mode, &effect),
            }
        })
        .collect()
}

/// Direct sight test between two squads: true when any alive observer
/// member's footprint contains the target's tile.
#[must_use]
pub fn can_see_squad(observer: &Squad, target: &Squad, map: &TileMap) -> bool {
    let target_tile = map.pixel_to_grid(target.position);
    squad_vision(observer, map)
        .iter()
        .any(|area| area.contains(target_tile))
}

/// The combined sight of one faction, cached for the current tick.
#[derive(Debug, Clone, Default)]
pub struct SharedVision {
    /// Squads that contributed sight this tick.
    pub contributing_squads: HashSet<SquadId>,
    /// Union of every member footprint, as tile coordinates.
    pub visible_tiles: HashSet<GridPos>,
    /// Tick this entry was computed on.
    pub computed_tick: u64,
}

fn compute_shared_vision(squads: &[&Squad], map: &TileMap, tick: u64) -> SharedVision {
    let mut shared = SharedVision {
        computed_tick: tick,
        ..SharedVision::default()
    };

    for squad in squads {
        if !squad.is_active() {
            continue;
        }
        shared.contributing_squads.insert(squad.id);
        for area in squad_vision(squad, map) {
            for dx in -area.range..=area.range {
                for dy in -area.range..=area.range {
                    shared
                        .visible_tiles
                        .insert(GridPos::new(area.tile.x + dx, area.tile.y + dy));
                }
            }
        }
    }

    shared
}

/// Per-faction shared-vision cache.
///
/// Entries are valid for exactly one tick. The simulation clears the
/// whole cache at the top of every tick, so an entry can never be read
/// across a frame boundary even if the clear were skipped: a stale
/// `computed_tick` forces a recompute.
#[derive(Debug, Clone, Default)]
pub struct VisionSystem {
    cache: HashMap<Faction, SharedVision>,
}

impl VisionSystem {
    /// Create an empty vision system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Shared vision of a faction, recomputing when the cached entry is
    /// missing or from an earlier tick.
    ///
    /// `squads` must be exactly the faction's own squads; the cache is
    /// keyed by faction, never mixed across factions.
    pub fn shared_vision_for(
        &mut self,
        faction: Faction,
        squads: &[&Squad],
        map: &TileMap,
        tick: u64,
    ) -> &SharedVision {
        let entry = self
            .cache
            .entry(faction)
            .or_insert_with(|| compute_shared_vision(squads, map, tick));
        if entry.computed_tick != tick {
            *entry = compute_shared_vision(squads, map, tick);
        }
        entry
    }

    /// Whether a squad is visible to a faction this tick.
    ///
    /// Same-faction targets are always visible, no tile test needed.
    pub fn is_visible_by_faction(
        &mut self,
        target: &Squad,
        faction: Faction,
        faction_squads: &[&Squad],
        map: &TileMap,
        tick: u64,
    ) -> bool {
        if target.faction == faction {
            return true;
        }
        let target_tile = map.pixel_to_grid(target.position);
        self.shared_vision_for(faction, faction_squads, map, tick)
            .visible_tiles
            .contains(&target_tile)
    }

    /// Ids of the enemy squads a faction can currently see, sorted.
    pub fn visible_enemy_squads(
        &mut self,
        faction: Faction,
        faction_squads: &[&Squad],
        enemy_squads: &[&Squad],
        map: &TileMap,
        tick: u64,
    ) -> Vec<SquadId> {
        let mut visible: Vec<SquadId> = enemy_squads
            .iter()
            .filter(|enemy| {
                self.is_visible_by_faction(enemy, faction, faction_squads, map, tick)
            })
            .map(|enemy| enemy.id)
            .collect();
        visible.sort_unstable();
        visible
    }

    /// Drop every cached entry. Called once at the top of each tick.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of cached faction entries (for tests and diagnostics).
    #[must_use]
    pub fn cached_factions(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Fixed, Vec2Fixed};
    use crate::squads::Character;
    use crate::terrain::TileKind;

    fn stats(sight: i32) -> CharacterStats {
        CharacterStats {
            max_hp: 30,
            attack: 10,
            defense: 4,
            move_speed: Fixed::from_num(10),
            sight,
            attack_range: 3,
            attack_interval_ms: 1000,
        }
    }

    fn squad_at(faction: Faction, tile_x: i32, tile_y: i32, sight: i32, map: &TileMap) -> Squad {
        let position = map.grid_to_pixel(GridPos::new(tile_x, tile_y));
        let commander = Character::new(stats(sight), Vec2Fixed::ZERO);
        let mut squad = Squad::new(faction, position, commander, Vec::new()).unwrap();
        squad.id = (tile_x * 100 + tile_y) as u64;
        squad
    }

    #[test]
    fn test_effective_sight_floor() {
        let forest = TileKind::Forest.effect();
        // Base 1, forest -2, no stance bonus: floored at 1.
        assert_eq!(effective_sight(&stats(1), MoveMode::Normal, &forest), 1);
    }

    #[test]
    fn test_effective_sight_modifiers() {
        let mountain = TileKind::Mountain.effect();
        assert_eq!(effective_sight(&stats(4), MoveMode::Normal, &mountain), 7);
        // Standby adds +1.
        assert_eq!(effective_sight(&stats(4), MoveMode::Standby, &mountain), 8);
    }

    #[test]
    fn test_square_footprint_boundary() {
        let observer = GridPos::new(10, 10);
        // Corner of the square: Chebyshev distance exactly the range.
        assert!(in_sight(observer, GridPos::new(13, 13), 3));
        assert!(!in_sight(observer, GridPos::new(14, 13), 3));
        assert!(!in_sight(observer, GridPos::new(14, 14), 3));
    }

    #[test]
    fn test_can_see_squad_range() {
        let map = TileMap::new(64, 64);
        let observer = squad_at(Faction::Player, 10, 10, 4, &map);

        let near = squad_at(Faction::Enemy, 14, 10, 4, &map);
        let far = squad_at(Faction::Enemy, 15, 10, 4, &map);

        assert!(can_see_squad(&observer, &near, &map));
        assert!(!can_see_squad(&observer, &far, &map));
    }

    #[test]
    fn test_dead_members_contribute_no_vision() {
        let map = TileMap::new(64, 64);
        let mut observer = squad_at(Faction::Player, 10, 10, 4, &map);
        observer.members[0].hp = 0;

        assert!(squad_vision(&observer, &map).is_empty());
        let target = squad_at(Faction::Enemy, 11, 10, 4, &map);
        assert!(!can_see_squad(&observer, &target, &map));
    }

    #[test]
    fn test_shared_vision_unions_squads() {
        let map = TileMap::new(64, 64);
        let a = squad_at(Faction::Player, 5, 5, 2, &map);
        let b = squad_at(Faction::Player, 40, 40, 2, &map);
        let mut vision = VisionSystem::new();

        let shared = vision.shared_vision_for(Faction::Player, &[&a, &b], &map, 0);
        assert!(shared.visible_tiles.contains(&GridPos::new(5, 5)));
        assert!(shared.visible_tiles.contains(&GridPos::new(7, 7)));
        assert!(shared.visible_tiles.contains(&GridPos::new(40, 40)));
        assert!(!shared.visible_tiles.contains(&GridPos::new(20, 20)));
        assert_eq!(shared.contributing_squads.len(), 2);
    }

    #[test]
    fn test_faction_isolation() {
        let map = TileMap::new(64, 64);
        let player = squad_at(Faction::Player, 5, 5, 2, &map);
        let enemy = squad_at(Faction::Enemy, 50, 50, 2, &map);
        let mut vision = VisionSystem::new();

        let player_tiles = vision
            .shared_vision_for(Faction::Player, &[&player], &map, 0)
            .visible_tiles
            .clone();
        let enemy_tiles = vision
            .shared_vision_for(Faction::Enemy, &[&enemy], &map, 0)
            .visible_tiles
            .clone();

        assert!(player_tiles.is_disjoint(&enemy_tiles));
    }

    #[test]
    fn test_same_faction_always_visible() {
        let map = TileMap::new(64, 64);
        let a = squad_at(Faction::Player, 0, 0, 1, &map);
        let b = squad_at(Faction::Player, 63, 63, 1, &map);
        let mut vision = VisionSystem::new();

        // Far outside each other's range, still mutually visible.
        assert!(!can_see_squad(&a, &b, &map));
        assert!(vision.is_visible_by_faction(&b, Faction::Player, &[&a], &map, 0));
    }

    #[test]
    fn test_cache_recomputes_on_new_tick() {
        let map = TileMap::new(64, 64);
        let mut squad = squad_at(Faction::Player, 5, 5, 2, &map);
        let mut vision = VisionSystem::new();

        let first = vision
            .shared_vision_for(Faction::Player, &[&squad], &map, 0)
            .visible_tiles
            .clone();
        assert!(first.contains(&GridPos::new(5, 5)));

        // Same tick: the cached entry is reused even though the squad moved.
        squad.position = map.grid_to_pixel(GridPos::new(30, 30));
        let stale = vision
            .shared_vision_for(Faction::Player, &[&squad], &map, 0)
            .visible_tiles
            .clone();
        assert_eq!(first, stale);

        // Next tick: recomputed from the new position.
        let fresh = vision
            .shared_vision_for(Faction::Player, &[&squad], &map, 1)
            .visible_tiles
            .clone();
        assert!(fresh.contains(&GridPos::new(30, 30)));
        assert!(!fresh.contains(&GridPos::new(5, 5)));
    }

    #[test]
    fn test_clear_cache_drops_entries() {
        let map = TileMap::new(64, 64);
        let squad = squad_at(Faction::Player, 5, 5, 2, &map);
        let mut vision = VisionSystem::new();

        vision.shared_vision_for(Faction::Player, &[&squad], &map, 0);
        assert_eq!(vision.cached_factions(), 1);

        vision.clear_cache();
        assert_eq!(vision.cached_factions(), 0);
    }

    #[test]
    fn test_visible_enemy_squads_filters() {
        let map = TileMap::new(64, 64);
        let player = squad_at(Faction::Player, 10, 10, 4, &map);
        let near = squad_at(Faction::Enemy, 12, 10, 4, &map);
        let far = squad_at(Faction::Enemy, 40, 40, 4, &map);
        let mut vision = VisionSystem::new();

        let visible = vision.visible_enemy_squads(
            Faction::Player,
            &[&player],
            &[&near, &far],
            &map,
            0,
        );
        assert_eq!(visible, vec![near.id]);
    }
}
