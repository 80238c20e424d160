//! Error types for the simulation core.
//!
//! Most per-frame failure modes degrade silently (missing tiles become
//! plain terrain, stale squad references no-op). Errors exist only for
//! operations with a caller that can meaningfully react: spawning,
//! issuing commands to unknown squads, and snapshot encoding.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for simulation operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// A command referenced a squad that does not exist.
    #[error("Squad not found: {0}")]
    SquadNotFound(u64),

    /// A squad roster cannot take another soldier.
    #[error("Squad roster full: at most {max} soldiers per squad")]
    RosterFull {
        /// Maximum soldier count per squad.
        max: usize,
    },

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}
