//! Arena domain events.
//!
//! Events are produced only as a byproduct of an aggregate transition
//! and are immutable once recorded. The variant data structs double as
//! the payload schema carried inside the message envelope, so their
//! field names are part of the wire contract.

use chrono::{DateTime, Utc};
use common::{ArenaId, PlayerId};
use serde::{Deserialize, Serialize};

use super::entity::PlayerAction;
use super::state::PlayerRole;
use super::value_objects::ArenaConfig;

/// Events that can occur on an arena aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ArenaEvent {
    /// Arena was created.
    Created(CreatedData),

    /// Arena left Pending and started running.
    Started(StartedData),

    /// Running arena was paused.
    Paused(PausedData),

    /// Paused arena resumed running.
    Resumed(ResumedData),

    /// Arena was stopped and is now terminal.
    Stopped(StoppedData),

    /// A player joined the arena.
    PlayerJoined(PlayerJoinedData),

    /// A player left the arena.
    PlayerLeft(PlayerLeftData),

    /// Configuration was replaced with a new validated value.
    ConfigUpdated(ConfigUpdatedData),

    /// A player action was accepted into the schedule.
    ActionSubmitted(ActionSubmittedData),

    /// The tick counter advanced.
    TickAdvanced(TickAdvancedData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
    pub name: String,
    pub config: ArenaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
    pub player_id: PlayerId,
    pub display_name: String,
    pub role: PlayerRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdatedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
    pub config: ArenaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSubmittedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
    pub action: PlayerAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickAdvancedData {
    pub arena_id: ArenaId,
    pub occurred_at: DateTime<Utc>,
    pub tick: i64,
}

impl ArenaEvent {
    /// Returns the stable wire name of the event.
    pub fn event_type(&self) -> &'static str {
        match self {
            ArenaEvent::Created(_) => "ArenaCreated",
            ArenaEvent::Started(_) => "ArenaStarted",
            ArenaEvent::Paused(_) => "ArenaPaused",
            ArenaEvent::Resumed(_) => "ArenaResumed",
            ArenaEvent::Stopped(_) => "ArenaStopped",
            ArenaEvent::PlayerJoined(_) => "PlayerJoined",
            ArenaEvent::PlayerLeft(_) => "PlayerLeft",
            ArenaEvent::ConfigUpdated(_) => "ArenaConfigUpdated",
            ArenaEvent::ActionSubmitted(_) => "ActionSubmitted",
            ArenaEvent::TickAdvanced(_) => "TickAdvanced",
        }
    }

    /// Returns the arena the event belongs to.
    pub fn arena_id(&self) -> ArenaId {
        match self {
            ArenaEvent::Created(d) => d.arena_id,
            ArenaEvent::Started(d) => d.arena_id,
            ArenaEvent::Paused(d) => d.arena_id,
            ArenaEvent::Resumed(d) => d.arena_id,
            ArenaEvent::Stopped(d) => d.arena_id,
            ArenaEvent::PlayerJoined(d) => d.arena_id,
            ArenaEvent::PlayerLeft(d) => d.arena_id,
            ArenaEvent::ConfigUpdated(d) => d.arena_id,
            ArenaEvent::ActionSubmitted(d) => d.arena_id,
            ArenaEvent::TickAdvanced(d) => d.arena_id,
        }
    }

    /// Returns when the event occurred.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ArenaEvent::Created(d) => d.occurred_at,
            ArenaEvent::Started(d) => d.occurred_at,
            ArenaEvent::Paused(d) => d.occurred_at,
            ArenaEvent::Resumed(d) => d.occurred_at,
            ArenaEvent::Stopped(d) => d.occurred_at,
            ArenaEvent::PlayerJoined(d) => d.occurred_at,
            ArenaEvent::PlayerLeft(d) => d.occurred_at,
            ArenaEvent::ConfigUpdated(d) => d.occurred_at,
            ArenaEvent::ActionSubmitted(d) => d.occurred_at,
            ArenaEvent::TickAdvanced(d) => d.occurred_at,
        }
    }

    /// Serializes the variant data as the envelope payload.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            ArenaEvent::Created(d) => serde_json::to_value(d),
            ArenaEvent::Started(d) => serde_json::to_value(d),
            ArenaEvent::Paused(d) => serde_json::to_value(d),
            ArenaEvent::Resumed(d) => serde_json::to_value(d),
            ArenaEvent::Stopped(d) => serde_json::to_value(d),
            ArenaEvent::PlayerJoined(d) => serde_json::to_value(d),
            ArenaEvent::PlayerLeft(d) => serde_json::to_value(d),
            ArenaEvent::ConfigUpdated(d) => serde_json::to_value(d),
            ArenaEvent::ActionSubmitted(d) => serde_json::to_value(d),
            ArenaEvent::TickAdvanced(d) => serde_json::to_value(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::value_objects::{ArenaConfig, Temperature};

    fn config() -> ArenaConfig {
        ArenaConfig {
            tick_millis: 100,
            width: 50,
            height: 50,
            diffusion_rate: 0.2,
            mutation_rate: 0.01,
            max_organisms: 1000,
            snapshot_every_ticks: 10,
            temperature: Temperature::celsius(25.0),
        }
    }

    #[test]
    fn event_type_matches_wire_names() {
        let id = ArenaId::new();
        let now = Utc::now();
        let created = ArenaEvent::Created(CreatedData {
            arena_id: id,
            occurred_at: now,
            name: "Dish-1".to_string(),
            config: config(),
        });
        assert_eq!(created.event_type(), "ArenaCreated");
        assert_eq!(created.arena_id(), id);
        assert_eq!(created.occurred_at(), now);
    }

    #[test]
    fn created_payload_carries_name_and_config() {
        let created = ArenaEvent::Created(CreatedData {
            arena_id: ArenaId::new(),
            occurred_at: Utc::now(),
            name: "Dish-1".to_string(),
            config: config(),
        });
        let payload = created.payload().unwrap();
        assert_eq!(payload["name"], "Dish-1");
        assert_eq!(payload["config"]["tickMillis"], 100);
    }
}
