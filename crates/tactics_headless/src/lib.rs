//! Headless battle runner for CI verification and balance checks.
//!
//! This crate runs complete battles without graphics:
//!
//! - **CI verification**: Automated testing of the simulation loop and
//!   its determinism
//! - **Balance checks**: Run a scenario, read the outcome report
//! - **Scripted scenarios**: RON files describing terrain and squads
//!
//! # Usage
//!
//! ```bash
//! # Run a built-in scenario
//! cargo run -p tactics_headless -- run --preset meeting_engagement
//!
//! # Run a scenario file
//! cargo run -p tactics_headless -- run --scenario scenarios/ambush.ron
//!
//! # List built-in scenarios
//! cargo run -p tactics_headless -- list
//! ```
//!
//! Output (stdout): one JSON report per run. Logs (stderr): human-readable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod runner;
pub mod scenario;

pub use runner::{run_scenario, RunError, RunReport};
pub use scenario::{Scenario, ScenarioError, SquadPlacement, TerrainPatch, UnitPreset};
