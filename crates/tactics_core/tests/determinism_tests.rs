//! Determinism verification: identical scenarios must replay tick for
//! tick with identical state hashes.

use tactics_core::prelude::*;
use tactics_core::simulation::TICK_DURATION_MS;
use tactics_test_utils::determinism::{run_lockstep_pair, run_repeated};
use tactics_test_utils::fixtures::{forest_belt_map, rifle_squad_at, scout_squad_at};

/// A full engagement scenario: movement through mixed terrain,
/// discovery, and combat all active.
fn engagement_scenario() -> Simulation {
    let mut sim = Simulation::new(forest_belt_map());

    let scout = sim
        .spawn_squad(scout_squad_at(sim.map(), Faction::Player, 8, 30))
        .unwrap();
    let rifles = sim
        .spawn_squad(rifle_squad_at(sim.map(), Faction::Player, 6, 34))
        .unwrap();
    let enemy = sim
        .spawn_squad(rifle_squad_at(sim.map(), Faction::Enemy, 50, 32))
        .unwrap();

    let east = sim.map().grid_to_pixel(GridPos::new(46, 32));
    sim.set_path(scout, vec![east], MoveMode::Normal).unwrap();
    sim.set_path(rifles, vec![east], MoveMode::Combat).unwrap();
    sim.set_attack_target(rifles, enemy).unwrap();

    let west = sim.map().grid_to_pixel(GridPos::new(20, 32));
    sim.set_path(enemy, vec![west], MoveMode::Combat).unwrap();
    sim.set_attack_target(enemy, rifles).unwrap();

    sim
}

#[test]
fn test_engagement_replays_identically() {
    run_repeated(engagement_scenario, 2000, TICK_DURATION_MS, 4).assert_deterministic();
}

#[test]
fn test_engagement_lockstep_never_diverges() {
    run_lockstep_pair(engagement_scenario, 500, TICK_DURATION_MS);
}

#[test]
fn test_snapshot_resume_matches_straight_run() {
    let mut straight = engagement_scenario();
    for _ in 0..300 {
        straight.tick(TICK_DURATION_MS);
    }

    let mut snapshotted = engagement_scenario();
    for _ in 0..150 {
        snapshotted.tick(TICK_DURATION_MS);
    }
    let bytes = snapshotted.serialize().unwrap();
    let mut resumed = Simulation::deserialize(&bytes).unwrap();
    for _ in 0..150 {
        resumed.tick(TICK_DURATION_MS);
    }

    assert_eq!(straight.state_hash(), resumed.state_hash());
}
