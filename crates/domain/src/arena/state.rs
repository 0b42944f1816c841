//! Arena lifecycle status and participant roles.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ArenaError;

/// Lifecycle status of an arena.
///
/// Legal transitions: Pending → Running ⇄ Paused → Finished, with
/// Finished reachable from any state and terminal once entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArenaStatus {
    Pending,
    Running,
    Paused,
    Finished,
}

impl ArenaStatus {
    /// Returns the stable wire name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArenaStatus::Pending => "PENDING",
            ArenaStatus::Running => "RUNNING",
            ArenaStatus::Paused => "PAUSED",
            ArenaStatus::Finished => "FINISHED",
        }
    }

    /// Returns true once the arena can no longer transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ArenaStatus::Finished)
    }
}

impl std::fmt::Display for ArenaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArenaStatus {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ArenaStatus::Pending),
            "RUNNING" => Ok(ArenaStatus::Running),
            "PAUSED" => Ok(ArenaStatus::Paused),
            "FINISHED" => Ok(ArenaStatus::Finished),
            other => Err(ArenaError::InvalidStatus(other.to_string())),
        }
    }
}

/// Role a player holds within an arena.
///
/// Admins may drive lifecycle transitions and update configuration;
/// plain players may only participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    Admin,
    Player,
}
