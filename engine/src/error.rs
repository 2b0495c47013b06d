// ═══════════════════════════════════════════════════════════════════════
// Engine errors
// ═══════════════════════════════════════════════════════════════════════

use crate::types::{Faction, Phase, UnitId};

/// Every recoverable failure the engine reports.
///
/// Per-action failures (`InvalidMove`, `InvalidEngagement`, `IllegalAction`)
/// are dropped from the batch and reported; `DataIntegrity` is fatal at
/// setup. Broken internal invariants panic instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("invalid move for unit {unit}: {reason}")]
    InvalidMove { unit: UnitId, reason: String },

    #[error("invalid engagement: {0}")]
    InvalidEngagement(String),

    #[error("illegal action: {0}")]
    IllegalAction(String),

    #[error("{faction} agent exceeded its decision budget ({elapsed_ms} ms > {limit_ms} ms)")]
    AgentTimeout { faction: Faction, elapsed_ms: u64, limit_ms: u64 },

    #[error("game is already over")]
    GameAlreadyOver,

    #[error("phase order violated: expected {expected:?}, engine is in {actual:?}")]
    PhaseOrder { expected: Phase, actual: Phase },

    #[error("data integrity: {0}")]
    DataIntegrity(String),
}

impl SimError {
    pub(crate) fn invalid_move(unit: UnitId, reason: impl Into<String>) -> Self {
        SimError::InvalidMove { unit, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
