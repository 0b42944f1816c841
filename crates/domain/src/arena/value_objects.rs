//! Arena configuration and grid value objects.

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;

/// Temperature unit. Only Celsius is supported today; the enum exists
/// so the wire format stays stable if Fahrenheit ever arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[serde(rename = "C")]
    Celsius,
}

/// Ambient temperature of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub value: f64,
    pub unit: TemperatureUnit,
}

impl Temperature {
    /// Creates a Celsius temperature.
    pub fn celsius(value: f64) -> Self {
        Self {
            value,
            unit: TemperatureUnit::Celsius,
        }
    }

    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.value < -50.0 || self.value > 150.0 {
            return Err(ArenaError::InvalidConfig(format!(
                "temperature out of range: {}",
                self.value
            )));
        }
        Ok(())
    }
}

/// A single cell coordinate on the arena grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn validate(&self, width: i32, height: i32) -> Result<(), ArenaError> {
        if self.x < 0 || self.y < 0 || self.x >= width || self.y >= height {
            return Err(ArenaError::InvalidAction(format!(
                "point out of bounds ({},{}) for grid {}x{}",
                self.x, self.y, width, height
            )));
        }
        Ok(())
    }
}

/// A rectangular region of the arena grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Area {
    pub fn validate(&self, grid_w: i32, grid_h: i32) -> Result<(), ArenaError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ArenaError::InvalidAction(
                "area width/height must be > 0".to_string(),
            ));
        }
        if self.x < 0 || self.y < 0 || self.x + self.width > grid_w || self.y + self.height > grid_h
        {
            return Err(ArenaError::InvalidAction(format!(
                "area out of bounds ({},{} {}x{}) for grid {}x{}",
                self.x, self.y, self.width, self.height, grid_w, grid_h
            )));
        }
        Ok(())
    }
}

/// Kinds of organisms a player can spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganismKind {
    Bacteria,
    Fungi,
    Phage,
}

/// Kinds of antibiotics a player can drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AntibioticKind {
    A,
    B,
    C,
}

/// Simulation configuration for an arena.
///
/// Validated as a whole on construction, rehydration, and update; the
/// first violated range rejects the entire value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaConfig {
    pub tick_millis: i64,
    pub width: i32,
    pub height: i32,
    pub diffusion_rate: f64,
    pub mutation_rate: f64,
    pub max_organisms: i32,
    pub snapshot_every_ticks: i32,
    pub temperature: Temperature,
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.tick_millis <= 0 {
            return Err(ArenaError::InvalidConfig(
                "tickMillis must be > 0".to_string(),
            ));
        }
        if self.width <= 0 || self.height <= 0 {
            return Err(ArenaError::InvalidConfig(
                "width/height must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.diffusion_rate) {
            return Err(ArenaError::InvalidConfig(
                "diffusionRate must be in [0,1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ArenaError::InvalidConfig(
                "mutationRate must be in [0,1]".to_string(),
            ));
        }
        if self.max_organisms <= 0 {
            return Err(ArenaError::InvalidConfig(
                "maxOrganisms must be > 0".to_string(),
            ));
        }
        if self.snapshot_every_ticks <= 0 {
            return Err(ArenaError::InvalidConfig(
                "snapshotEveryTicks must be > 0".to_string(),
            ));
        }
        self.temperature.validate()
    }
}
