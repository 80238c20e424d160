//! Tile grid, terrain kinds, and the static terrain-effect table.
//!
//! The map is a row-major grid of 16-pixel tiles. Terrain never changes
//! during a battle; the per-kind effect table is pure data consumed by
//! movement, vision, and combat.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};

/// Side length of one tile in pixels.
pub const TILE_SIZE: Fixed = Fixed::const_from_int(16);

/// Terrain classification for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Open ground. Baseline for every modifier.
    #[default]
    Plain,
    /// Dense cover. Slow to cross, good to defend, hard to see out of.
    Forest,
    /// High ground. Slowest to cross, strong bonuses, wide sight.
    Mountain,
}

/// Static modifiers a terrain kind applies to squads standing on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainEffect {
    /// Multiplier on per-tile travel time (1.0 = baseline).
    pub movement_cost: Fixed,
    /// Defense bonus in percent.
    pub defense_bonus: i32,
    /// Attack bonus in percent (negative = penalty).
    pub attack_bonus: i32,
    /// Sight-range modifier in tiles (negative = penalty).
    pub vision_modifier: i32,
}

impl TileKind {
    /// Look up the effect record for this terrain kind.
    #[must_use]
    pub fn effect(self) -> TerrainEffect {
        match self {
            Self::Plain => TerrainEffect {
                movement_cost: Fixed::from_num(1),
                defense_bonus: 0,
                attack_bonus: 0,
                vision_modifier: 0,
            },
            Self::Forest => TerrainEffect {
                movement_cost: Fixed::from_num(1.5),
                defense_bonus: 20,
                attack_bonus: -10,
                vision_modifier: -2,
            },
            Self::Mountain => TerrainEffect {
                movement_cost: Fixed::from_num(2),
                defense_bonus: 30,
                attack_bonus: 15,
                vision_modifier: 3,
            },
        }
    }
}

/// A tile coordinate on the grid.
///
/// Signed so positions just off the map edge still map to a coordinate;
/// out-of-bounds lookups resolve to plain terrain rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
}

impl GridPos {
    /// Create a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance: max of the axis deltas.
    ///
    /// This is the metric for the square vision and weapon footprints.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> i32 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        if dx > dy {
            dx
        } else {
            dy
        }
    }
}

/// One tile of the battle map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain classification.
    pub kind: TileKind,
    /// Whether squads may stand on this tile.
    pub walkable: bool,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            kind: TileKind::Plain,
            walkable: true,
        }
    }
}

/// The battle map: a grid of tiles plus pixel/grid conversions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMap {
    /// Map width in tiles.
    width: u32,
    /// Map height in tiles.
    height: u32,
    /// Tile data stored in row-major order.
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Create a map with every tile walkable plain ground.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "TileMap width must be positive");
        assert!(height > 0, "TileMap height must be positive");

        let tile_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); tile_count],
        }
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check whether a tile coordinate lies on the map.
    #[must_use]
    pub const fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: GridPos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Get the tile at a coordinate, or `None` when off-map.
    #[must_use]
    pub fn tile_at(&self, pos: GridPos) -> Option<&Tile> {
        if self.in_bounds(pos) {
            Some(&self.tiles[self.index(pos)])
        } else {
            None
        }
    }

    /// Set the terrain kind of a tile. Returns `false` when off-map.
    pub fn set_kind(&mut self, pos: GridPos, kind: TileKind) -> bool {
        if self.in_bounds(pos) {
            let index = self.index(pos);
            self.tiles[index].kind = kind;
            true
        } else {
            false
        }
    }

    /// Set the walkable flag of a tile. Returns `false` when off-map.
    pub fn set_walkable(&mut self, pos: GridPos, walkable: bool) -> bool {
        if self.in_bounds(pos) {
            let index = self.index(pos);
            self.tiles[index].walkable = walkable;
            true
        } else {
            false
        }
    }

    /// Convert a pixel position to its tile coordinate.
    #[must_use]
    pub fn pixel_to_grid(&self, pos: Vec2Fixed) -> GridPos {
        GridPos::new(
            (pos.x / TILE_SIZE).floor().to_num::<i32>(),
            (pos.y / TILE_SIZE).floor().to_num::<i32>(),
        )
    }

    /// Convert a tile coordinate to the pixel position of its centre.
    #[must_use]
    pub fn grid_to_pixel(&self, pos: GridPos) -> Vec2Fixed {
        let half = TILE_SIZE / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(pos.x) * TILE_SIZE + half,
            Fixed::from_num(pos.y) * TILE_SIZE + half,
        )
    }

    /// Terrain kind under a pixel position.
    ///
    /// Off-map positions and missing tiles resolve to [`TileKind::Plain`]
    /// so movement and vision proceed at default cost instead of failing.
    #[must_use]
    pub fn kind_at(&self, pos: Vec2Fixed) -> TileKind {
        self.tile_at(self.pixel_to_grid(pos))
            .map(|tile| tile.kind)
            .unwrap_or_default()
    }

    /// Terrain effect under a pixel position (plain for off-map).
    #[must_use]
    pub fn effect_at(&self, pos: Vec2Fixed) -> TerrainEffect {
        self.kind_at(pos).effect()
    }
}

impl Default for TileMap {
    /// Create a default map (64x64 tiles of plain ground).
    fn default() -> Self {
        Self::new(64, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_table_values() {
        let plain = TileKind::Plain.effect();
        assert_eq!(plain.movement_cost, Fixed::from_num(1));
        assert_eq!(plain.defense_bonus, 0);

        let forest = TileKind::Forest.effect();
        assert_eq!(forest.movement_cost, Fixed::from_num(1.5));
        assert_eq!(forest.defense_bonus, 20);
        assert_eq!(forest.attack_bonus, -10);
        assert_eq!(forest.vision_modifier, -2);

        let mountain = TileKind::Mountain.effect();
        assert_eq!(mountain.movement_cost, Fixed::from_num(2));
        assert_eq!(mountain.attack_bonus, 15);
        assert_eq!(mountain.vision_modifier, 3);
    }

    #[test]
    fn test_pixel_grid_roundtrip() {
        let map = TileMap::new(32, 32);
        let pixel = map.grid_to_pixel(GridPos::new(10, 10));
        assert_eq!(map.pixel_to_grid(pixel), GridPos::new(10, 10));
    }

    #[test]
    fn test_pixel_to_grid_negative_floors() {
        let map = TileMap::new(8, 8);
        let pos = Vec2Fixed::new(Fixed::from_num(-1), Fixed::from_num(-17));
        assert_eq!(map.pixel_to_grid(pos), GridPos::new(-1, -2));
    }

    #[test]
    fn test_off_map_is_plain() {
        let mut map = TileMap::new(4, 4);
        map.set_kind(GridPos::new(0, 0), TileKind::Forest);

        assert_eq!(
            map.kind_at(Vec2Fixed::new(Fixed::from_num(8), Fixed::from_num(8))),
            TileKind::Forest
        );
        // Off-map lookups degrade to plain, never error.
        assert_eq!(
            map.kind_at(Vec2Fixed::new(Fixed::from_num(-50), Fixed::from_num(999))),
            TileKind::Plain
        );
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = GridPos::new(3, 3);
        assert_eq!(a.chebyshev_distance(GridPos::new(6, 4)), 3);
        assert_eq!(a.chebyshev_distance(GridPos::new(3, 3)), 0);
        assert_eq!(a.chebyshev_distance(GridPos::new(0, -1)), 4);
    }

    #[test]
    fn test_set_kind_out_of_bounds() {
        let mut map = TileMap::new(4, 4);
        assert!(!map.set_kind(GridPos::new(5, 0), TileKind::Mountain));
        assert!(map.set_kind(GridPos::new(3, 3), TileKind::Mountain));
    }
}
