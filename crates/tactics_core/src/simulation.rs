//! The simulation loop that ties movement, vision, discovery, and
//! combat together.
//!
//! Single-threaded and frame-driven: the host calls
//! [`Simulation::tick`] once per frame with the elapsed milliseconds.
//! Every system completes synchronously inside that call, in a fixed
//! order:
//!
//! 1. Clear the shared-vision cache
//! 2. Movement for all squads
//! 3. Shared-vision recompute per faction (positions changed)
//! 4. Discovery checks
//! 5. Combat
//! 6. Disband squads with no alive members
//!
//! Reordering would produce one-frame-stale vision results; keeping the
//! order fixed keeps the presentation free of visible jitter.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{combat_system, DamageEvent};
use crate::discovery::{DiscoveryEvent, DiscoverySystem};
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::Vec2Fixed;
use crate::movement::{process_movement, MoveMode, MovementOrders};
use crate::squads::{
    Character, CharacterStats, MovementState, Squad, SquadId, SquadStorage, MAX_SOLDIERS,
};
use crate::terrain::TileMap;
use crate::vision::VisionSystem;

/// Nominal ticks per second when the host drives fixed steps.
pub const TICK_RATE: u32 = 20;

/// Duration of one nominal tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Default member offsets by roster slot, in pixels from the squad
/// origin: commander up front, soldiers in a loose wedge behind.
const FORMATION_OFFSETS: [(i32, i32); 1 + MAX_SOLDIERS] = [(0, 0), (-12, 10), (12, 10), (0, 18)];

/// Parameters for spawning a new squad.
#[derive(Debug, Clone)]
pub struct SquadSpawnParams {
    /// Owning faction.
    pub faction: Faction,
    /// Squad origin in pixel space.
    pub position: Vec2Fixed,
    /// Commander stats (member 0).
    pub commander: CharacterStats,
    /// Soldier stats, at most [`MAX_SOLDIERS`].
    pub soldiers: Vec<CharacterStats>,
    /// Initial stance.
    pub mode: MoveMode,
}

/// Events generated during one simulation tick.
///
/// The presentation layer consumes these for effects, sound, and UI;
/// nothing in the core reads them back.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Squads revealed this tick.
    pub discoveries: Vec<DiscoveryEvent>,
    /// Shots that landed this tick.
    pub damage_events: Vec<DamageEvent>,
    /// Squads whose last member died this tick, already removed.
    pub disbanded: Vec<SquadId>,
}

/// The core squad-tactics simulation.
///
/// Owns all battle state and advances it deterministically. All shared
/// mutable state has a single owner: movement orders live in the order
/// book, the vision cache in the vision system, the discovered set in
/// the discovery system. Systems communicate through value data only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    /// The battle map.
    map: TileMap,
    /// All squads.
    squads: SquadStorage,
    /// Per-squad movement orders.
    orders: MovementOrders,
    /// Per-faction shared-vision cache. Derived state, rebuilt every
    /// tick, so it is not part of a snapshot.
    #[serde(skip)]
    vision: VisionSystem,
    /// Discovered-squad set and reveal log.
    discovery: DiscoverySystem,
}

impl Simulation {
    /// Create a simulation on the given map with no squads.
    #[must_use]
    pub fn new(map: TileMap) -> Self {
        Self {
            tick: 0,
            map,
            squads: SquadStorage::new(),
            orders: MovementOrders::new(),
            vision: VisionSystem::new(),
            discovery: DiscoverySystem::new(),
        }
    }

    /// Current tick number.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// The battle map.
    #[must_use]
    pub fn map(&self) -> &TileMap {
        &self.map
    }

    /// Squad storage (read-only).
    #[must_use]
    pub fn squads(&self) -> &SquadStorage {
        &self.squads
    }

    /// Get a squad by id.
    #[must_use]
    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(id)
    }

    /// The discovery system (read-only).
    #[must_use]
    pub fn discovery(&self) -> &DiscoverySystem {
        &self.discovery
    }

    /// Advance the simulation by one frame.
    pub fn tick(&mut self, delta_ms: u32) -> TickEvents {
        let mut events = TickEvents::default();

        // 1. Vision from last frame is stale the moment anything moves.
        self.vision.clear_cache();

        // 2. Movement.
        let ids = self.squads.sorted_ids();
        for &id in &ids {
            if let Some(squad) = self.squads.get_mut(id) {
                process_movement(squad, &mut self.orders, &self.map, delta_ms);
            }
        }

        // 3. Shared vision per faction, from post-movement positions.
        for faction in Faction::ALL {
            let viewers: Vec<&Squad> = ids
                .iter()
                .filter_map(|&id| self.squads.get(id))
                .filter(|squad| squad.faction == faction && squad.is_active())
                .collect();
            if viewers.is_empty() {
                continue;
            }
            self.vision
                .shared_vision_for(faction, &viewers, &self.map, self.tick);
        }

        // 4. Discovery.
        events.discoveries =
            self.discovery
                .check_discovery(&mut self.squads, &mut self.vision, &self.map, self.tick);

        // 5. Combat.
        events.damage_events = combat_system(
            &mut self.squads,
            &mut self.vision,
            &self.map,
            delta_ms,
            self.tick,
        );

        // 6. Disband squads with nobody left alive.
        for &id in &ids {
            let dead = self.squads.get(id).is_some_and(|squad| !squad.is_active());
            if dead {
                self.squads.remove(id);
                self.orders.cancel(id);
                events.disbanded.push(id);
            }
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "simulation state hash");
        }

        events
    }

    /// Spawn a new squad and return its id.
    ///
    /// Visibility is initialized from the discovery state: enemy squads
    /// spawn hidden unless their id was already revealed.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RosterFull`] when the params carry more than
    /// [`MAX_SOLDIERS`] soldiers.
    pub fn spawn_squad(&mut self, params: SquadSpawnParams) -> Result<SquadId> {
        let commander = Character::new(params.commander, formation_offset(0));
        let soldiers: Vec<Character> = params
            .soldiers
            .iter()
            .enumerate()
            .map(|(slot, &stats)| Character::new(stats, formation_offset(slot + 1)))
            .collect();

        let mut squad = Squad::new(params.faction, params.position, commander, soldiers)?;
        squad.mode = params.mode;
        let id = self.squads.insert(squad);

        if let Some(squad) = self.squads.get_mut(id) {
            self.discovery.initialize_visibility(squad);
        }
        Ok(id)
    }

    /// Remove a squad explicitly (retreat, scripted exit).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] when the id is unknown.
    pub fn disband_squad(&mut self, id: SquadId) -> Result<()> {
        if self.squads.remove(id).is_none() {
            return Err(GameError::SquadNotFound(id));
        }
        self.orders.cancel(id);
        Ok(())
    }

    /// Issue a route to a squad.
    ///
    /// An empty waypoint list cancels any existing route. Waypoints past
    /// the cap are dropped. The squad adopts the given stance.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] when the id is unknown.
    pub fn set_path(
        &mut self,
        id: SquadId,
        waypoints: Vec<Vec2Fixed>,
        mode: MoveMode,
    ) -> Result<()> {
        let squad = self.squads.get_mut(id).ok_or(GameError::SquadNotFound(id))?;
        match self.orders.set_path(id, waypoints, mode, self.tick) {
            Some(first) => {
                squad.mode = mode;
                squad.movement = MovementState::Moving(first);
            }
            None => {
                squad.movement = MovementState::Idle;
            }
        }
        Ok(())
    }

    /// Change a squad's stance.
    ///
    /// An active route keeps its waypoints and progress; only the stance
    /// (and with it speed, weapons-free, and sight) changes.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] when the id is unknown.
    pub fn set_movement_mode(&mut self, id: SquadId, mode: MoveMode) -> Result<()> {
        let squad = self.squads.get_mut(id).ok_or(GameError::SquadNotFound(id))?;
        squad.mode = mode;
        self.orders.change_mode(id, mode);
        Ok(())
    }

    /// Cancel a squad's route entirely.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] when the id is unknown.
    pub fn cancel_movement(&mut self, id: SquadId) -> Result<()> {
        let squad = self.squads.get_mut(id).ok_or(GameError::SquadNotFound(id))?;
        self.orders.cancel(id);
        squad.movement = MovementState::Idle;
        Ok(())
    }

    /// Order a squad to fire on a target when possible.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] when the attacker id is
    /// unknown.
    pub fn set_attack_target(&mut self, id: SquadId, target: SquadId) -> Result<()> {
        let squad = self.squads.get_mut(id).ok_or(GameError::SquadNotFound(id))?;
        squad.attack_target = Some(target);
        Ok(())
    }

    /// Clear a squad's attack order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] when the id is unknown.
    pub fn clear_attack_target(&mut self, id: SquadId) -> Result<()> {
        let squad = self.squads.get_mut(id).ok_or(GameError::SquadNotFound(id))?;
        squad.attack_target = None;
        Ok(())
    }

    /// Whether a squad currently has an attack order.
    #[must_use]
    pub fn has_attack_target(&self, id: SquadId) -> bool {
        self.squads
            .get(id)
            .is_some_and(|squad| squad.attack_target.is_some())
    }

    /// Whether a squad is en route to a waypoint.
    #[must_use]
    pub fn is_moving(&self, id: SquadId) -> bool {
        self.squads.get(id).is_some_and(Squad::is_moving)
    }

    /// Whether an enemy squad has been revealed.
    #[must_use]
    pub fn is_discovered(&self, id: SquadId) -> bool {
        self.discovery.is_discovered(id)
    }

    /// Ids of enemy squads a faction can see this tick, sorted.
    ///
    /// Uses last tick's cache when called between frames; the answer is
    /// at most one frame stale, which the game tolerates.
    pub fn visible_enemy_squads(&mut self, faction: Faction) -> Vec<SquadId> {
        let ids = self.squads.sorted_ids();
        let viewers: Vec<&Squad> = ids
            .iter()
            .filter_map(|&id| self.squads.get(id))
            .filter(|squad| squad.faction == faction && squad.is_active())
            .collect();
        let enemies: Vec<&Squad> = ids
            .iter()
            .filter_map(|&id| self.squads.get(id))
            .filter(|squad| faction.is_hostile_to(squad.faction) && squad.is_active())
            .collect();
        self.vision
            .visible_enemy_squads(faction, &viewers, &enemies, &self.map, self.tick)
    }

    /// Hash of the full simulation state, for desync detection and the
    /// determinism harness.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.squads.sorted_ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            if let Some(squad) = self.squads.get(id) {
                id.hash(&mut hasher);
                squad.faction.hash(&mut hasher);
                squad.position.x.to_bits().hash(&mut hasher);
                squad.position.y.to_bits().hash(&mut hasher);
                squad.mode.hash(&mut hasher);
                squad.visible.hash(&mut hasher);
                squad.attack_target.hash(&mut hasher);

                for member in &squad.members {
                    member.hp.hash(&mut hasher);
                    member.cooldown_ms.hash(&mut hasher);
                }

                if let Some(command) = self.orders.get(id) {
                    command.current.hash(&mut hasher);
                    command.mode.hash(&mut hasher);
                    for waypoint in &command.waypoints {
                        waypoint.x.to_bits().hash(&mut hasher);
                        waypoint.y.to_bits().hash(&mut hasher);
                    }
                }

                if let MovementState::Moving(target) = squad.movement {
                    target.x.to_bits().hash(&mut hasher);
                    target.y.to_bits().hash(&mut hasher);
                }
            }
        }

        let mut discovered: Vec<SquadId> = self
            .discovery
            .history()
            .iter()
            .map(|record| record.discovered)
            .collect();
        discovered.sort_unstable();
        discovered.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the simulation state for replay or snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when decoding fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize simulation: {e}")))
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(TileMap::default())
    }
}

/// Default member offset for a roster slot (0 = commander).
fn formation_offset(slot: usize) -> Vec2Fixed {
    let (x, y) = FORMATION_OFFSETS[slot.min(MAX_SOLDIERS)];
    Vec2Fixed::new(crate::math::Fixed::from_num(x), crate::math::Fixed::from_num(y))
}
