//! Waypoint movement: stance profiles, speed math, the per-squad order
//! store, and the per-tick movement processor.
//!
//! Speed is derived, never stored: each tick re-reads the squad roster,
//! the stance, and the terrain under the squad, so a squad crossing from
//! plain into forest slows down the same frame.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};
use crate::squads::{MovementState, Squad, SquadId};
use crate::terrain::{TerrainEffect, TileMap, TILE_SIZE};

/// Base time constant: seconds per tile for a squad of average speed 1
/// in normal stance on plain ground, before multipliers.
pub const BASE_TIME_CONSTANT: Fixed = Fixed::const_from_int(40);

/// Maximum waypoints a single order may carry; extras are dropped.
pub const MAX_WAYPOINTS: usize = 4;

/// Movement/combat stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MoveMode {
    /// Full speed, weapons cold.
    #[default]
    Normal,
    /// Reduced speed, weapons free.
    Combat,
    /// Stationary overwatch: no movement, weapons free, extra sight.
    Standby,
}

/// Fixed multipliers a stance applies. Static configuration, not state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    /// Multiplier on movement speed.
    pub speed_multiplier: Fixed,
    /// Whether squads in this stance may fire.
    pub attack_allowed: bool,
    /// Sight-range bonus in tiles.
    pub sight_bonus: i32,
}

impl MoveMode {
    /// Look up the profile record for this stance.
    #[must_use]
    pub fn profile(self) -> ModeProfile {
        match self {
            Self::Normal => ModeProfile {
                speed_multiplier: Fixed::from_num(1),
                attack_allowed: false,
                sight_bonus: 0,
            },
            Self::Combat => ModeProfile {
                speed_multiplier: Fixed::from_num(0.6),
                attack_allowed: true,
                sight_bonus: 0,
            },
            Self::Standby => ModeProfile {
                speed_multiplier: Fixed::ZERO,
                attack_allowed: true,
                sight_bonus: 1,
            },
        }
    }
}

/// Arithmetic mean of `move_speed` over alive members, zero when none.
#[must_use]
pub fn average_speed(squad: &Squad) -> Fixed {
    let mut sum = Fixed::ZERO;
    let mut count = 0u32;
    for member in squad.alive_members() {
        sum += member.stats.move_speed;
        count += 1;
    }
    if count == 0 {
        Fixed::ZERO
    } else {
        sum / Fixed::from_num(count)
    }
}

/// Seconds to cross one tile, or `None` when movement is impossible
/// (no alive members, or a stance with zero speed).
///
/// `None` is this core's "infinite time" sentinel; downstream code
/// pattern-matches it instead of checking a float infinity.
#[must_use]
pub fn travel_time_per_tile(
    average: Fixed,
    mode: MoveMode,
    effect: &TerrainEffect,
) -> Option<Fixed> {
    let profile = mode.profile();
    if average <= Fixed::ZERO || profile.speed_multiplier <= Fixed::ZERO {
        return None;
    }
    let base = BASE_TIME_CONSTANT / average;
    Some(base * (Fixed::from_num(1) / profile.speed_multiplier) * effect.movement_cost)
}

/// Movement speed in pixels per second, zero when no movement is
/// possible.
#[must_use]
pub fn pixels_per_second(average: Fixed, mode: MoveMode, effect: &TerrainEffect) -> Fixed {
    match travel_time_per_tile(average, mode, effect) {
        Some(time) if time > Fixed::ZERO => TILE_SIZE / time,
        _ => Fixed::ZERO,
    }
}

/// One squad's active route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementCommand {
    /// Ordered waypoints in pixel space, at most [`MAX_WAYPOINTS`].
    pub waypoints: Vec<Vec2Fixed>,
    /// Index of the waypoint currently being approached.
    pub current: usize,
    /// Stance the route is executed in.
    pub mode: MoveMode,
    /// Tick the order was issued on.
    pub issued_tick: u64,
}

impl MovementCommand {
    /// The waypoint currently being approached, or `None` when the
    /// index has run off the end.
    #[must_use]
    pub fn current_target(&self) -> Option<Vec2Fixed> {
        self.waypoints.get(self.current).copied()
    }
}

/// The per-squad order book. At most one active command per squad.
///
/// An order with an empty effective waypoint list cannot exist:
/// [`MovementOrders::set_path`] with no waypoints is a cancel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementOrders {
    orders: HashMap<SquadId, MovementCommand>,
}

impl MovementOrders {
    /// Create an empty order book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    /// Issue a route, replacing any prior order for the squad.
    ///
    /// An empty waypoint list cancels the existing order instead.
    /// Waypoints beyond [`MAX_WAYPOINTS`] are dropped. Returns the first
    /// target so the caller can flip the squad into its moving state.
    pub fn set_path(
        &mut self,
        squad_id: SquadId,
        mut waypoints: Vec<Vec2Fixed>,
        mode: MoveMode,
        tick: u64,
    ) -> Option<Vec2Fixed> {
        if waypoints.is_empty() {
            self.orders.remove(&squad_id);
            return None;
        }
        waypoints.truncate(MAX_WAYPOINTS);
        let first = waypoints[0];
        self.orders.insert(
            squad_id,
            MovementCommand {
                waypoints,
                current: 0,
                mode,
                issued_tick: tick,
            },
        );
        Some(first)
    }

    /// Advance to the next waypoint.
    ///
    /// Returns `true` while a further waypoint exists; when the route is
    /// exhausted the order is deleted and `false` comes back.
    pub fn advance(&mut self, squad_id: SquadId) -> bool {
        let Some(command) = self.orders.get_mut(&squad_id) else {
            return false;
        };
        command.current += 1;
        if command.current >= command.waypoints.len() {
            self.orders.remove(&squad_id);
            false
        } else {
            true
        }
    }

    /// The waypoint the squad is approaching, if it has an order.
    #[must_use]
    pub fn current_target(&self, squad_id: SquadId) -> Option<Vec2Fixed> {
        self.orders
            .get(&squad_id)
            .and_then(MovementCommand::current_target)
    }

    /// Swap the stance of an existing order in place; waypoints and the
    /// current index are untouched. Returns `false` when no order exists.
    pub fn change_mode(&mut self, squad_id: SquadId, mode: MoveMode) -> bool {
        match self.orders.get_mut(&squad_id) {
            Some(command) => {
                command.mode = mode;
                true
            }
            None => false,
        }
    }

    /// Delete the squad's order entirely. No-op when none exists.
    pub fn cancel(&mut self, squad_id: SquadId) {
        self.orders.remove(&squad_id);
    }

    /// Get the squad's active order, if any.
    #[must_use]
    pub fn get(&self, squad_id: SquadId) -> Option<&MovementCommand> {
        self.orders.get(&squad_id)
    }

    /// Number of active orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Check whether no orders are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Advance one squad along its route for one frame.
///
/// Terrain is re-resolved at the squad's present tile every tick, so
/// speed changes take effect mid-leg. Arrival snaps exactly onto the
/// waypoint; there is no overshoot. A squad without an order is marked
/// stopped, which is idempotent.
pub fn process_movement(
    squad: &mut Squad,
    orders: &mut MovementOrders,
    map: &TileMap,
    delta_ms: u32,
) {
    let Some(command) = orders.get(squad.id) else {
        squad.movement = MovementState::Idle;
        return;
    };
    let mode = command.mode;
    let Some(target) = command.current_target() else {
        orders.cancel(squad.id);
        squad.movement = MovementState::Idle;
        return;
    };

    let effect = map.effect_at(squad.position);
    let speed = pixels_per_second(average_speed(squad), mode, &effect);
    if speed == Fixed::ZERO {
        // Standby stance or no alive members: hold position, keep the order.
        squad.movement = MovementState::Moving(target);
        return;
    }

    let step = speed * Fixed::from_num(delta_ms) / Fixed::from_num(1000);
    let remaining = squad.position.distance(target);

    if remaining <= step {
        squad.position = target;
        if orders.advance(squad.id) {
            if let Some(next) = orders.current_target(squad.id) {
                squad.movement = MovementState::Moving(next);
                return;
            }
        }
        squad.movement = MovementState::Idle;
    } else {
        let direction = (target - squad.position).normalize();
        squad.position = squad.position
            + Vec2Fixed::new(direction.x * step, direction.y * step);
        squad.movement = MovementState::Moving(target);
    }
}
