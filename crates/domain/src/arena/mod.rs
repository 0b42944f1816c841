//! Arena aggregate module.

mod aggregate;
mod entity;
mod events;
mod state;
mod value_objects;

pub use aggregate::{Arena, RehydrateState};
pub use entity::{ActionPayload, Player, PlayerAction};
pub use events::ArenaEvent;
pub use state::{ArenaStatus, PlayerRole};
pub use value_objects::{
    AntibioticKind, Area, ArenaConfig, OrganismKind, Point, Temperature, TemperatureUnit,
};
