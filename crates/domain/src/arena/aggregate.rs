//! Arena aggregate root.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{ArenaId, PlayerId};

use super::entity::{Player, PlayerAction};
use super::events::{
    ActionSubmittedData, ArenaEvent, ConfigUpdatedData, CreatedData, PausedData, PlayerJoinedData,
    PlayerLeftData, ResumedData, StartedData, StoppedData, TickAdvancedData,
};
use super::state::{ArenaStatus, PlayerRole};
use super::value_objects::ArenaConfig;
use crate::error::ArenaError;

/// The arena aggregate root.
///
/// Holds the full write-side state of one arena and buffers the domain
/// events its transitions produce. Each instance owns its event queue
/// exclusively; the command handler that mutated the aggregate drains
/// the queue exactly once per transaction via [`Arena::drain_events`].
#[derive(Debug, Clone)]
pub struct Arena {
    id: ArenaId,
    name: String,
    status: ArenaStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,

    tick: i64,
    config: ArenaConfig,

    players: HashMap<PlayerId, Player>,
    scheduled_actions: HashMap<i64, Vec<PlayerAction>>,

    events: Vec<ArenaEvent>,
}

/// Snapshot of persisted state used to rebuild an arena from storage.
///
/// Rehydration runs the same validation as construction but never
/// produces events, so replay-safe reconstruction cannot re-publish.
#[derive(Debug, Clone)]
pub struct RehydrateState {
    pub id: ArenaId,
    pub name: String,
    pub status: ArenaStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub tick: i64,
    pub config: ArenaConfig,
    pub players: Vec<Player>,
    pub scheduled_actions: HashMap<i64, Vec<PlayerAction>>,
}

// Query methods
impl Arena {
    pub fn id(&self) -> ArenaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ArenaStatus {
        self.status
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns all participants in unspecified order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Actions scheduled for a given tick.
    pub fn scheduled_for(&self, tick: i64) -> &[PlayerAction] {
        self.scheduled_actions
            .get(&tick)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of buffered, not-yet-drained events.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

// Factories
impl Arena {
    /// Creates a new arena in Pending status and records the Created
    /// event. Name and configuration are validated before any event is
    /// produced.
    pub fn new(
        id: ArenaId,
        name: impl Into<String>,
        config: ArenaConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, ArenaError> {
        let name = name.into();
        if name.trim().chars().count() < 3 {
            return Err(ArenaError::InvalidName);
        }
        config.validate()?;

        let mut arena = Self {
            id,
            name: name.clone(),
            status: ArenaStatus::Pending,
            created_at: now,
            started_at: None,
            finished_at: None,
            tick: 0,
            config: config.clone(),
            players: HashMap::new(),
            scheduled_actions: HashMap::new(),
            events: Vec::new(),
        };

        arena.record(ArenaEvent::Created(CreatedData {
            arena_id: id,
            occurred_at: now,
            name,
            config,
        }));

        Ok(arena)
    }

    /// Rebuilds an arena from persisted state without emitting events.
    pub fn rehydrate(state: RehydrateState) -> Result<Self, ArenaError> {
        if state.name.is_empty() {
            return Err(ArenaError::IncompleteState);
        }
        state.config.validate()?;

        let players = state.players.into_iter().map(|p| (p.id, p)).collect();

        Ok(Self {
            id: state.id,
            name: state.name,
            status: state.status,
            created_at: state.created_at,
            started_at: state.started_at,
            finished_at: state.finished_at,
            tick: state.tick,
            config: state.config,
            players,
            scheduled_actions: state.scheduled_actions,
            events: Vec::new(),
        })
    }
}

// Lifecycle transitions
impl Arena {
    /// Starts a pending arena.
    pub fn start(&mut self, now: DateTime<Utc>, by: Option<PlayerId>) -> Result<(), ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Err(ArenaError::Finished);
        }
        if self.status != ArenaStatus::Pending {
            return Err(ArenaError::NotPending);
        }
        self.require_admin(by)?;

        self.status = ArenaStatus::Running;
        self.started_at = Some(now);
        self.record(ArenaEvent::Started(StartedData {
            arena_id: self.id,
            occurred_at: now,
        }));
        Ok(())
    }

    /// Pauses a running arena.
    pub fn pause(&mut self, now: DateTime<Utc>, by: Option<PlayerId>) -> Result<(), ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Err(ArenaError::Finished);
        }
        if self.status != ArenaStatus::Running {
            return Err(ArenaError::NotRunning);
        }
        self.require_admin(by)?;

        self.status = ArenaStatus::Paused;
        self.record(ArenaEvent::Paused(PausedData {
            arena_id: self.id,
            occurred_at: now,
        }));
        Ok(())
    }

    /// Resumes a paused arena.
    pub fn resume(&mut self, now: DateTime<Utc>, by: Option<PlayerId>) -> Result<(), ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Err(ArenaError::Finished);
        }
        if self.status != ArenaStatus::Paused {
            return Err(ArenaError::NotPaused);
        }
        self.require_admin(by)?;

        self.status = ArenaStatus::Running;
        self.record(ArenaEvent::Resumed(ResumedData {
            arena_id: self.id,
            occurred_at: now,
        }));
        Ok(())
    }

    /// Stops the arena. Idempotent: stopping an already-finished arena
    /// succeeds without producing a new event.
    pub fn stop(&mut self, now: DateTime<Utc>, by: Option<PlayerId>) -> Result<(), ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Ok(());
        }
        self.require_admin(by)?;

        self.status = ArenaStatus::Finished;
        self.finished_at = Some(now);
        self.record(ArenaEvent::Stopped(StoppedData {
            arena_id: self.id,
            occurred_at: now,
        }));
        Ok(())
    }
}

// Membership, configuration, and actions
impl Arena {
    /// Adds a participant.
    pub fn join(
        &mut self,
        now: DateTime<Utc>,
        player_id: PlayerId,
        display_name: impl Into<String>,
        role: PlayerRole,
    ) -> Result<(), ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Err(ArenaError::Finished);
        }
        if self.players.contains_key(&player_id) {
            return Err(ArenaError::PlayerAlreadyJoined);
        }

        let display_name = display_name.into();
        self.players.insert(
            player_id,
            Player {
                id: player_id,
                display_name: display_name.clone(),
                role,
                joined_at: now,
            },
        );
        self.record(ArenaEvent::PlayerJoined(PlayerJoinedData {
            arena_id: self.id,
            occurred_at: now,
            player_id,
            display_name,
            role,
        }));
        Ok(())
    }

    /// Removes a participant.
    pub fn leave(&mut self, now: DateTime<Utc>, player_id: PlayerId) -> Result<(), ArenaError> {
        if self.players.remove(&player_id).is_none() {
            return Err(ArenaError::PlayerNotFound);
        }
        self.record(ArenaEvent::PlayerLeft(PlayerLeftData {
            arena_id: self.id,
            occurred_at: now,
            player_id,
        }));
        Ok(())
    }

    /// Replaces the configuration with a new validated value.
    pub fn update_config(
        &mut self,
        now: DateTime<Utc>,
        config: ArenaConfig,
        by: Option<PlayerId>,
    ) -> Result<(), ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Err(ArenaError::Finished);
        }
        self.require_admin(by)?;
        config.validate()?;

        self.config = config.clone();
        self.record(ArenaEvent::ConfigUpdated(ConfigUpdatedData {
            arena_id: self.id,
            occurred_at: now,
            config,
        }));
        Ok(())
    }

    /// Accepts a player action into the schedule for a future tick.
    pub fn submit_action(
        &mut self,
        now: DateTime<Utc>,
        action: PlayerAction,
    ) -> Result<(), ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Err(ArenaError::Finished);
        }
        if self.status != ArenaStatus::Running {
            return Err(ArenaError::NotRunning);
        }
        if !self.players.contains_key(&action.player_id) {
            return Err(ArenaError::PlayerNotFound);
        }
        if action.apply_at_tick < self.tick {
            return Err(ArenaError::ActionTickTooOld {
                apply_at_tick: action.apply_at_tick,
                current_tick: self.tick,
            });
        }
        action.payload.validate(&self.config)?;

        self.scheduled_actions
            .entry(action.apply_at_tick)
            .or_default()
            .push(action.clone());
        self.record(ArenaEvent::ActionSubmitted(ActionSubmittedData {
            arena_id: self.id,
            occurred_at: now,
            action,
        }));
        Ok(())
    }

    /// Advances the tick counter and returns the actions due at the new
    /// tick. The tick-by-tick world evolution itself lives elsewhere;
    /// this only moves the counter and hands out the due actions.
    pub fn advance_tick(&mut self, now: DateTime<Utc>) -> Result<Vec<PlayerAction>, ArenaError> {
        if self.status == ArenaStatus::Finished {
            return Err(ArenaError::Finished);
        }
        if self.status != ArenaStatus::Running {
            return Err(ArenaError::NotRunning);
        }

        self.tick += 1;
        let due = self.scheduled_actions.remove(&self.tick).unwrap_or_default();
        self.record(ArenaEvent::TickAdvanced(TickAdvancedData {
            arena_id: self.id,
            occurred_at: now,
            tick: self.tick,
        }));
        Ok(due)
    }
}

// Event queue
impl Arena {
    /// Takes ownership of the buffered events, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, event: ArenaEvent) {
        self.events.push(event);
    }

    fn require_admin(&self, by: Option<PlayerId>) -> Result<(), ArenaError> {
        match by {
            None => Ok(()),
            Some(pid) => {
                let is_admin = self
                    .players
                    .get(&pid)
                    .is_some_and(|p| p.role == PlayerRole::Admin);
                if is_admin {
                    Ok(())
                } else {
                    Err(ArenaError::PermissionDenied)
                }
            }
        }
    }
}
