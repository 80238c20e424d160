//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replay verification requires the simulation to be 100%
//! deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different
//!   results. All simulation math uses fixed-point via
//!   [`tactics_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Systems always iterate in sorted squad-id order.
//!
//! - **Wall-clock time**: The vision cache is keyed on tick numbers,
//!   never on elapsed real time.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, vision)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full scenarios are reproducible tick for tick

use tactics_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed
    /// error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Build and run the same scenario `runs` times for `ticks` ticks each
/// and compare the final state hashes.
///
/// The builder must construct the full scenario (map, squads, orders)
/// from scratch each call; leaking state between runs defeats the test.
pub fn run_repeated<F>(builder: F, ticks: u64, delta_ms: u32, runs: usize) -> DeterminismResult
where
    F: Fn() -> Simulation,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut sim = builder();
        for _ in 0..ticks {
            sim.tick(delta_ms);
        }
        hashes.push(sim.state_hash());
    }

    let first = hashes.first().copied();
    let is_deterministic = hashes.iter().all(|&hash| Some(hash) == first);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run two identically built simulations in lockstep, asserting the
/// state hashes match after every tick.
///
/// Pinpoints the exact tick where two runs diverge, which the
/// end-of-run comparison in [`run_repeated`] cannot.
///
/// # Panics
///
/// Panics at the first tick where the hashes differ.
pub fn run_lockstep_pair<F>(builder: F, ticks: u64, delta_ms: u32)
where
    F: Fn() -> Simulation,
{
    let mut a = builder();
    let mut b = builder();

    assert_eq!(
        a.state_hash(),
        b.state_hash(),
        "builder produced diverging initial state"
    );

    for tick in 0..ticks {
        a.tick(delta_ms);
        b.tick(delta_ms);
        assert_eq!(
            a.state_hash(),
            b.state_hash(),
            "simulations diverged at tick {tick}"
        );
    }
}
