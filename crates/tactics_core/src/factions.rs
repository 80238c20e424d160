//! Faction tags and hostility rules.

use serde::{Deserialize, Serialize};

/// Ownership tag attached to every squad at creation.
///
/// The tag drives hostility and vision sharing: squads of one faction
/// pool their sight, and combat only ever targets hostile factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Squads under the player's command.
    Player,
    /// Hostile squads controlled by the opposing commander.
    Enemy,
    /// Bystanders - never hostile, never targeted.
    Neutral,
}

impl Faction {
    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Enemy => "Enemy",
            Self::Neutral => "Neutral",
        }
    }

    /// All faction tags, in deterministic order.
    pub const ALL: [Self; 3] = [Self::Player, Self::Enemy, Self::Neutral];

    /// Check whether two factions are allied (same faction only).
    #[must_use]
    pub const fn is_allied_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Player, Self::Player)
                | (Self::Enemy, Self::Enemy)
                | (Self::Neutral, Self::Neutral)
        )
    }

    /// Check whether this faction treats the other as hostile.
    ///
    /// Neutral is never hostile and never attacked; the same faction is
    /// always allied.
    #[must_use]
    pub const fn is_hostile_to(self, other: Self) -> bool {
        if self.is_allied_with(other) {
            return false;
        }
        !matches!(self, Self::Neutral) && !matches!(other, Self::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_faction_allied() {
        assert!(Faction::Player.is_allied_with(Faction::Player));
        assert!(!Faction::Player.is_allied_with(Faction::Enemy));
    }

    #[test]
    fn test_player_enemy_hostile() {
        assert!(Faction::Player.is_hostile_to(Faction::Enemy));
        assert!(Faction::Enemy.is_hostile_to(Faction::Player));
    }

    #[test]
    fn test_neutral_never_hostile() {
        assert!(!Faction::Neutral.is_hostile_to(Faction::Player));
        assert!(!Faction::Neutral.is_hostile_to(Faction::Enemy));
        assert!(!Faction::Player.is_hostile_to(Faction::Neutral));
        assert!(!Faction::Enemy.is_hostile_to(Faction::Neutral));
    }
}
