//! Scenario loading and configuration.
//!
//! Scenarios define the initial battle state for headless runs: map
//! dimensions, terrain paint, and squad placements with routes. They
//! load from RON files or from the built-in presets.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tactics_core::prelude::*;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// A rectangle of terrain painted over the default plain map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainPatch {
    /// Left tile column.
    pub x: i32,
    /// Top tile row.
    pub y: i32,
    /// Width in tiles.
    pub width: i32,
    /// Height in tiles.
    pub height: i32,
    /// Terrain kind to paint.
    pub kind: TileKind,
}

/// Stat presets for squad members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitPreset {
    /// Fast and far-seeing, weak in a fight.
    Scout,
    /// The baseline line unit.
    Rifle,
    /// Slow and tough with a long-reaching weapon.
    Heavy,
}

impl UnitPreset {
    /// Stat line for this preset.
    #[must_use]
    pub fn stats(self) -> CharacterStats {
        match self {
            Self::Scout => CharacterStats {
                max_hp: 25,
                attack: 8,
                defense: 2,
                move_speed: Fixed::from_num(16),
                sight: 6,
                attack_range: 2,
                attack_interval_ms: 900,
            },
            Self::Rifle => CharacterStats {
                max_hp: 40,
                attack: 14,
                defense: 5,
                move_speed: Fixed::from_num(12),
                sight: 4,
                attack_range: 3,
                attack_interval_ms: 1200,
            },
            Self::Heavy => CharacterStats {
                max_hp: 60,
                attack: 22,
                defense: 9,
                move_speed: Fixed::from_num(8),
                sight: 3,
                attack_range: 4,
                attack_interval_ms: 2000,
            },
        }
    }
}

/// One squad's starting setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadPlacement {
    /// Owning faction.
    pub faction: Faction,
    /// Starting tile.
    pub tile: (i32, i32),
    /// Stat preset for every member.
    pub preset: UnitPreset,
    /// Number of soldiers behind the commander (capped by the roster).
    pub soldiers: usize,
    /// Route waypoints as tiles; empty means hold position.
    pub path: Vec<(i32, i32)>,
    /// Starting stance.
    pub mode: MoveMode,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Map dimensions (width, height) in tiles.
    pub map_size: (u32, u32),
    /// Terrain painted over the plain base map.
    pub terrain: Vec<TerrainPatch>,
    /// Squad placements.
    pub squads: Vec<SquadPlacement>,
    /// Tick budget before the run is called a draw.
    pub max_ticks: u64,
    /// Frame delta in milliseconds per tick.
    pub tick_delta_ms: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::meeting_engagement()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the file is missing, unreadable,
    /// or not valid RON.
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::ParseError`] on invalid RON.
    pub fn from_ron_str(ron: &str) -> std::result::Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Look up a built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "meeting_engagement" => Some(Self::meeting_engagement()),
            "forest_ambush" => Some(Self::forest_ambush()),
            _ => None,
        }
    }

    /// Names of all built-in scenarios.
    #[must_use]
    pub fn builtin_names() -> &'static [&'static str] {
        &["meeting_engagement", "forest_ambush"]
    }

    /// Two rifle forces advancing on each other across open ground.
    #[must_use]
    pub fn meeting_engagement() -> Self {
        Self {
            name: "Meeting Engagement".to_string(),
            description: "Two rifle forces advance on each other across open ground".to_string(),
            map_size: (64, 64),
            terrain: Vec::new(),
            squads: vec![
                SquadPlacement {
                    faction: Faction::Player,
                    tile: (8, 30),
                    preset: UnitPreset::Rifle,
                    soldiers: 3,
                    path: vec![(30, 31)],
                    mode: MoveMode::Combat,
                },
                SquadPlacement {
                    faction: Faction::Player,
                    tile: (8, 34),
                    preset: UnitPreset::Scout,
                    soldiers: 0,
                    path: vec![(28, 33)],
                    mode: MoveMode::Normal,
                },
                SquadPlacement {
                    faction: Faction::Enemy,
                    tile: (56, 32),
                    preset: UnitPreset::Rifle,
                    soldiers: 3,
                    path: vec![(34, 32)],
                    mode: MoveMode::Combat,
                },
            ],
            max_ticks: 36000,
            tick_delta_ms: 50,
        }
    }

    /// A heavy squad waits in forest overwatch for an advancing column.
    #[must_use]
    pub fn forest_ambush() -> Self {
        Self {
            name: "Forest Ambush".to_string(),
            description: "A heavy squad waits in forest overwatch for an advancing column"
                .to_string(),
            map_size: (64, 64),
            terrain: vec![
                TerrainPatch {
                    x: 24,
                    y: 20,
                    width: 10,
                    height: 24,
                    kind: TileKind::Forest,
                },
                TerrainPatch {
                    x: 40,
                    y: 10,
                    width: 8,
                    height: 8,
                    kind: TileKind::Mountain,
                },
            ],
            squads: vec![
                SquadPlacement {
                    faction: Faction::Player,
                    tile: (28, 32),
                    preset: UnitPreset::Heavy,
                    soldiers: 2,
                    path: Vec::new(),
                    mode: MoveMode::Standby,
                },
                SquadPlacement {
                    faction: Faction::Enemy,
                    tile: (58, 32),
                    preset: UnitPreset::Rifle,
                    soldiers: 3,
                    path: vec![(40, 32), (30, 32), (10, 32)],
                    mode: MoveMode::Combat,
                },
            ],
            max_ticks: 36000,
            tick_delta_ms: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert!(Scenario::builtin("meeting_engagement").is_some());
        assert!(Scenario::builtin("forest_ambush").is_some());
        assert!(Scenario::builtin("no_such_scenario").is_none());
        for name in Scenario::builtin_names() {
            assert!(Scenario::builtin(name).is_some());
        }
    }

    #[test]
    fn test_ron_roundtrip() {
        let scenario = Scenario::forest_ambush();
        let ron = ron::to_string(&scenario).unwrap();
        let parsed = Scenario::from_ron_str(&ron).unwrap();
        assert_eq!(parsed, scenario);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Scenario::load("/definitely/not/here.ron");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.ron");
        let ron = ron::to_string(&Scenario::meeting_engagement()).unwrap();
        std::fs::write(&path, ron).unwrap();

        let loaded = Scenario::load(&path).unwrap();
        assert_eq!(loaded.name, "Meeting Engagement");
    }
}
