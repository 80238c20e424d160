//! Battle execution for headless runs.
//!
//! Builds a [`Simulation`] from a [`Scenario`], ticks it to completion,
//! and collects an outcome report.
//!
//! The loop is bounded by the scenario's tick budget, progress is
//! logged at regular intervals, and every failure mode is explicit.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use tactics_core::prelude::*;

use crate::scenario::{Scenario, ScenarioError};

/// Error type for battle runs.
#[derive(Error, Debug)]
pub enum RunError {
    /// Scenario could not be loaded.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The simulation rejected part of the setup.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// One discovery, as reported to the outside world.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DiscoveryLine {
    /// Squad that was revealed.
    pub discovered: SquadId,
    /// Squad credited with the reveal.
    pub discoverer: SquadId,
    /// Tick of the reveal.
    pub tick: u64,
}

/// Outcome report for one battle run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks actually simulated.
    pub ticks_run: u64,
    /// Winning faction, or `None` for a draw at the tick budget.
    pub winner: Option<String>,
    /// Every reveal, in order.
    pub discoveries: Vec<DiscoveryLine>,
    /// Shots that landed over the whole run.
    pub shots_landed: usize,
    /// Total damage dealt over the whole run.
    pub total_damage: u64,
    /// Squads destroyed, in disband order.
    pub disbanded: Vec<SquadId>,
    /// Player squads still active at the end.
    pub survivors_player: usize,
    /// Enemy squads still active at the end.
    pub survivors_enemy: usize,
    /// Final state hash, for replay verification across machines.
    pub final_state_hash: u64,
}

/// Build a simulation from a scenario definition.
///
/// # Errors
///
/// Returns [`RunError::Game`] when a placement is invalid (for example
/// a roster beyond the soldier cap).
pub fn build_simulation(scenario: &Scenario) -> std::result::Result<Simulation, RunError> {
    let mut map = TileMap::new(scenario.map_size.0, scenario.map_size.1);
    for patch in &scenario.terrain {
        for x in patch.x..patch.x + patch.width {
            for y in patch.y..patch.y + patch.height {
                map.set_kind(GridPos::new(x, y), patch.kind);
            }
        }
    }

    let mut sim = Simulation::new(map);
    for placement in &scenario.squads {
        let stats = placement.preset.stats();
        let position = sim
            .map()
            .grid_to_pixel(GridPos::new(placement.tile.0, placement.tile.1));
        let id = sim.spawn_squad(SquadSpawnParams {
            faction: placement.faction,
            position,
            commander: stats,
            soldiers: vec![stats; placement.soldiers],
            mode: placement.mode,
        })?;

        let waypoints: Vec<Vec2Fixed> = placement
            .path
            .iter()
            .map(|&(x, y)| sim.map().grid_to_pixel(GridPos::new(x, y)))
            .collect();
        if !waypoints.is_empty() {
            sim.set_path(id, waypoints, placement.mode)?;
        }

        debug!(id, faction = ?placement.faction, "squad placed");
    }

    Ok(sim)
}

/// Give every weapons-free squad without a target the nearest visible
/// hostile. Targets stick until the target dies; this never retargets.
fn assign_targets(sim: &mut Simulation) {
    for faction in [Faction::Player, Faction::Enemy] {
        let visible = sim.visible_enemy_squads(faction);
        if visible.is_empty() {
            continue;
        }

        let shooters: Vec<SquadId> = sim
            .squads()
            .active_ids_of_faction(faction)
            .into_iter()
            .filter(|&id| {
                sim.squad(id).is_some_and(|squad| {
                    squad.mode.profile().attack_allowed && squad.attack_target.is_none()
                })
            })
            .collect();

        for shooter in shooters {
            let Some(position) = sim.squad(shooter).map(|squad| squad.position) else {
                continue;
            };
            let mut nearest: Option<(SquadId, Fixed)> = None;
            for &candidate in &visible {
                let Some(target) = sim.squad(candidate) else {
                    continue;
                };
                let dist = position.distance_squared(target.position);
                let closer = match nearest {
                    Some((_, best)) => dist < best,
                    None => true,
                };
                if closer {
                    nearest = Some((candidate, dist));
                }
            }
            if let Some((target, _)) = nearest {
                // The shooter exists; a stale id is the only error here.
                let _ = sim.set_attack_target(shooter, target);
            }
        }
    }
}

/// Run a scenario to elimination or its tick budget.
///
/// # Errors
///
/// Returns [`RunError`] when the scenario setup is invalid.
pub fn run_scenario(scenario: &Scenario) -> std::result::Result<RunReport, RunError> {
    let mut sim = build_simulation(scenario)?;

    info!(
        scenario = %scenario.name,
        squads = sim.squads().len(),
        max_ticks = scenario.max_ticks,
        "battle start"
    );

    let mut report = RunReport {
        scenario: scenario.name.clone(),
        ticks_run: 0,
        winner: None,
        discoveries: Vec::new(),
        shots_landed: 0,
        total_damage: 0,
        disbanded: Vec::new(),
        survivors_player: 0,
        survivors_enemy: 0,
        final_state_hash: 0,
    };

    for tick in 0..scenario.max_ticks {
        let events = sim.tick(scenario.tick_delta_ms);

        for discovery in &events.discoveries {
            report.discoveries.push(DiscoveryLine {
                discovered: discovery.discovered,
                discoverer: discovery.discoverer,
                tick: discovery.tick,
            });
        }
        report.shots_landed += events.damage_events.len();
        report.total_damage += events
            .damage_events
            .iter()
            .map(|event| u64::from(event.damage))
            .sum::<u64>();
        report.disbanded.extend(&events.disbanded);

        assign_targets(&mut sim);

        let player_left = sim.squads().active_ids_of_faction(Faction::Player).len();
        let enemy_left = sim.squads().active_ids_of_faction(Faction::Enemy).len();
        report.ticks_run = tick + 1;

        if player_left == 0 || enemy_left == 0 {
            report.winner = match (player_left, enemy_left) {
                (0, 0) => None,
                (_, 0) => Some(Faction::Player.display_name().to_string()),
                (0, _) => Some(Faction::Enemy.display_name().to_string()),
                _ => unreachable!(),
            };
            break;
        }

        if tick % 1000 == 0 {
            debug!(tick, player_left, enemy_left, "battle progress");
        }
    }

    report.survivors_player = sim.squads().active_ids_of_faction(Faction::Player).len();
    report.survivors_enemy = sim.squads().active_ids_of_faction(Faction::Enemy).len();
    report.final_state_hash = sim.state_hash();

    info!(
        ticks = report.ticks_run,
        winner = report.winner.as_deref().unwrap_or("draw"),
        shots = report.shots_landed,
        "battle over"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simulation_places_squads_and_terrain() {
        let scenario = Scenario::forest_ambush();
        let sim = build_simulation(&scenario).unwrap();

        assert_eq!(sim.squads().len(), 2);
        let forest_probe = sim.map().grid_to_pixel(GridPos::new(26, 30));
        assert_eq!(sim.map().kind_at(forest_probe), TileKind::Forest);
    }

    #[test]
    fn test_meeting_engagement_resolves() {
        let scenario = Scenario::meeting_engagement();
        let report = run_scenario(&scenario).unwrap();

        // The forces collide well inside the budget: someone wins and
        // the fight left a paper trail.
        assert!(report.ticks_run < scenario.max_ticks);
        assert!(report.winner.is_some());
        assert!(!report.discoveries.is_empty());
        assert!(report.shots_landed > 0);
        assert!(!report.disbanded.is_empty());
    }

    #[test]
    fn test_runs_are_reproducible() {
        let scenario = Scenario::forest_ambush();
        let a = run_scenario(&scenario).unwrap();
        let b = run_scenario(&scenario).unwrap();
        assert_eq!(a.final_state_hash, b.final_state_hash);
        assert_eq!(a.ticks_run, b.ticks_run);
    }
}
