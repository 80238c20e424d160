//! Test fixtures and helpers.
//!
//! Pre-built stat lines, maps, and spawn parameters for consistent
//! testing across crates.

use fixed::types::I32F32;

use tactics_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Fast, fragile, far-seeing scout stat line.
#[must_use]
pub fn scout_stats() -> CharacterStats {
    CharacterStats {
        max_hp: 25,
        attack: 8,
        defense: 2,
        move_speed: fixed(16),
        sight: 6,
        attack_range: 2,
        attack_interval_ms: 900,
    }
}

/// Baseline rifle stat line used in most scenarios.
#[must_use]
pub fn rifle_stats() -> CharacterStats {
    CharacterStats {
        max_hp: 40,
        attack: 14,
        defense: 5,
        move_speed: fixed(12),
        sight: 4,
        attack_range: 3,
        attack_interval_ms: 1200,
    }
}

/// Slow, tough, hard-hitting heavy stat line.
#[must_use]
pub fn heavy_stats() -> CharacterStats {
    CharacterStats {
        max_hp: 60,
        attack: 22,
        defense: 9,
        move_speed: fixed(8),
        sight: 3,
        attack_range: 4,
        attack_interval_ms: 2000,
    }
}

/// Spawn params for a full rifle squad (commander + 3 soldiers) at a
/// tile coordinate of the given map.
#[must_use]
pub fn rifle_squad_at(map: &TileMap, faction: Faction, x: i32, y: i32) -> SquadSpawnParams {
    SquadSpawnParams {
        faction,
        position: map.grid_to_pixel(GridPos::new(x, y)),
        commander: rifle_stats(),
        soldiers: vec![rifle_stats(); MAX_SOLDIERS],
        mode: MoveMode::Normal,
    }
}

/// Spawn params for a lone scout at a tile coordinate.
#[must_use]
pub fn scout_squad_at(map: &TileMap, faction: Faction, x: i32, y: i32) -> SquadSpawnParams {
    SquadSpawnParams {
        faction,
        position: map.grid_to_pixel(GridPos::new(x, y)),
        commander: scout_stats(),
        soldiers: Vec::new(),
        mode: MoveMode::Normal,
    }
}

/// A 64x64 all-plain map.
#[must_use]
pub fn flat_map() -> TileMap {
    TileMap::new(64, 64)
}

/// A 64x64 map with a forest belt across the middle columns.
#[must_use]
pub fn forest_belt_map() -> TileMap {
    let mut map = TileMap::new(64, 64);
    for x in 28..36 {
        for y in 0..64 {
            map.set_kind(GridPos::new(x, y), TileKind::Forest);
        }
    }
    map
}
