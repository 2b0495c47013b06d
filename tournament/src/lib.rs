pub mod runner;
pub mod batch;
pub mod database;

pub use runner::{run_game, GameResult, FactionResult, RunError, Seats};
pub use batch::{run_batch, summarize, BatchSpec, BatchSummary};
pub use database::{Database, LeaderboardRow, StoreError};
