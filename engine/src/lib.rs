pub mod types;
pub mod error;
pub mod grid;
pub mod reference;
pub mod theater;
pub mod units;
pub mod setup;
pub mod supply;
pub mod combat;
pub mod engine;
pub mod visibility;
pub mod snapshot;

mod tests;

pub use types::*;
pub use error::{Result, SimError};
pub use grid::{HexGrid, Step};
pub use reference::{ReferenceData, Scenario};
pub use setup::{create_initial_state, default_game, EngineConfig};
pub use engine::{advance, legal_actions, record_timeout, resolve_combat_phase, submit_actions, ActionReport};
pub use visibility::{state_view, GameStateView};
pub use snapshot::{snapshot, GameSnapshot};
