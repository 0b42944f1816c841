//! Participants and scheduled actions.

use chrono::{DateTime, Utc};
use common::{ActionId, PlayerId};
use serde::{Deserialize, Serialize};

use super::state::PlayerRole;
use super::value_objects::{AntibioticKind, Area, ArenaConfig, OrganismKind, Point, Temperature};
use crate::error::ArenaError;

/// A participant of an arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub role: PlayerRole,
    pub joined_at: DateTime<Utc>,
}

/// Payload of a player action, validated against the arena config
/// before it is accepted into the schedule. The `kind` tag is the
/// payload's wire discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPayload {
    AddNutrients {
        area: Area,
        amount: i32,
    },
    DropAntibiotic {
        area: Area,
        antibiotic: AntibioticKind,
        concentration: f64,
    },
    SetTemperature {
        temperature: Temperature,
    },
    SpawnOrganism {
        organism: OrganismKind,
        position: Point,
        genome_template_id: Option<String>,
    },
}

impl ActionPayload {
    /// Validates the payload against the grid and ranges of `cfg`.
    pub fn validate(&self, cfg: &ArenaConfig) -> Result<(), ArenaError> {
        match self {
            ActionPayload::AddNutrients { area, amount } => {
                if *amount <= 0 {
                    return Err(ArenaError::InvalidAction("amount must be > 0".to_string()));
                }
                area.validate(cfg.width, cfg.height)
            }
            ActionPayload::DropAntibiotic {
                area,
                concentration,
                ..
            } => {
                if *concentration <= 0.0 {
                    return Err(ArenaError::InvalidAction(
                        "concentration must be > 0".to_string(),
                    ));
                }
                area.validate(cfg.width, cfg.height)
            }
            ActionPayload::SetTemperature { temperature } => temperature
                .validate()
                .map_err(|_| ArenaError::InvalidAction("temperature out of range".to_string())),
            ActionPayload::SpawnOrganism { position, .. } => {
                position.validate(cfg.width, cfg.height)
            }
        }
    }
}

/// An action a player submitted to take effect at a future tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAction {
    pub id: ActionId,
    pub player_id: PlayerId,
    pub submitted_at: DateTime<Utc>,
    pub apply_at_tick: i64,
    pub payload: ActionPayload,
}
