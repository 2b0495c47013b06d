// ═══════════════════════════════════════════════════════════════════════
// Core types — factions, hexes, units, actions, and the game state
// ═══════════════════════════════════════════════════════════════════════

use crate::grid::HexGrid;
use crate::reference::{ReferenceData, ScenarioRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Enums ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    #[serde(rename = "PLA")]
    Pla,
    #[serde(rename = "ROC")]
    Roc,
}

impl Faction {
    pub const ALL: [Faction; 2] = [Faction::Pla, Faction::Roc];

    pub fn opponent(self) -> Faction {
        match self {
            Faction::Pla => Faction::Roc,
            Faction::Roc => Faction::Pla,
        }
    }

    /// The action phase in which this faction submits orders.
    pub fn action_phase(self) -> Phase {
        match self {
            Faction::Pla => Phase::ActionsPla,
            Faction::Roc => Phase::ActionsRoc,
        }
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Faction::Pla => write!(f, "PLA"),
            Faction::Roc => write!(f, "ROC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    Armor,
    Mechanized,
    Infantry,
    Artillery,
    Engineer,
    AttackHelo,
}

impl UnitType {
    pub const ALL: [UnitType; 6] = [
        UnitType::Armor,
        UnitType::Mechanized,
        UnitType::Infantry,
        UnitType::Artillery,
        UnitType::Engineer,
        UnitType::AttackHelo,
    ];
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TerrainType {
    Plains,
    Hills,
    Mountain,
    Urban,
    Forest,
    RiverCrossing,
    Coastal,
    Ocean,
}

impl TerrainType {
    pub const ALL: [TerrainType; 8] = [
        TerrainType::Plains,
        TerrainType::Hills,
        TerrainType::Mountain,
        TerrainType::Urban,
        TerrainType::Forest,
        TerrainType::RiverCrossing,
        TerrainType::Coastal,
        TerrainType::Ocean,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SupplyStatus {
    #[default]
    Supplied,
    Isolated,
    OutOfSupply,
}

/// Turn phases in play order. `GameOver` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    AirSea,
    SupplyCheck,
    ActionsPla,
    ActionsRoc,
    CombatResolution,
    LogisticsReinforcement,
    TurnEndCheck,
    GameOver,
}

impl Phase {
    /// The phase that follows this one within the turn cycle.
    /// `TurnEndCheck` wraps to the next turn's `AirSea`; the engine decides
    /// whether to go there or to `GameOver`.
    pub fn next(self) -> Phase {
        match self {
            Phase::AirSea => Phase::SupplyCheck,
            Phase::SupplyCheck => Phase::ActionsPla,
            Phase::ActionsPla => Phase::ActionsRoc,
            Phase::ActionsRoc => Phase::CombatResolution,
            Phase::CombatResolution => Phase::LogisticsReinforcement,
            Phase::LogisticsReinforcement => Phase::TurnEndCheck,
            Phase::TurnEndCheck => Phase::AirSea,
            Phase::GameOver => Phase::GameOver,
        }
    }

    pub fn acting_faction(self) -> Option<Faction> {
        match self {
            Phase::ActionsPla => Some(Faction::Pla),
            Phase::ActionsRoc => Some(Faction::Roc),
            _ => None,
        }
    }
}

// ── Hex coordinate ─────────────────────────────────────────────────────
// Axial (q, r). The derived ordering is lexical (q, then r), which is the
// tie-break order used everywhere a deterministic choice between hexes is
// needed.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

    pub const fn new(q: i32, r: i32) -> Self {
        HexCoord { q, r }
    }

    /// Convert an "odd-q" offset position (column index, row number) to axial.
    pub fn from_offset(col: i32, row: i32) -> Self {
        HexCoord::new(col, row - (col - (col & 1)) / 2)
    }

    /// Parse a map label such as `A10` (column letter, 1-based row number).
    pub fn from_label(label: &str) -> Option<Self> {
        let mut chars = label.chars();
        let col = chars.next()?;
        if !col.is_ascii_uppercase() {
            return None;
        }
        let row: i32 = chars.as_str().parse().ok()?;
        Some(HexCoord::from_offset(col as i32 - 'A' as i32, row))
    }

    pub fn s(self) -> i32 {
        -self.q - self.r
    }

    pub fn distance(self, other: HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// All six neighbours, whether or not they exist on a given map.
    pub fn adjacent(self) -> [HexCoord; 6] {
        HexCoord::DIRECTIONS.map(|(dq, dr)| HexCoord::new(self.q + dq, self.r + dr))
    }

    pub fn is_adjacent(self, other: HexCoord) -> bool {
        self.distance(other) == 1
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}

// ── Unit ID ────────────────────────────────────────────────────────────
// Arena-style identifier. Hexes refer to units by id; units store their
// own coordinate. Neither owns the other.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Hex ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HexFeatures {
    #[serde(default)]
    pub capital: bool,
    #[serde(default)]
    pub port: bool,
    #[serde(default)]
    pub airfield: bool,
    #[serde(default)]
    pub depot: bool,
    #[serde(default)]
    pub victory_point: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hex {
    pub coord: HexCoord,
    pub label: String,
    pub name: String,
    pub terrain: TerrainType,
    pub owner: Option<Faction>,
    pub features: HexFeatures,
    /// Sorted ids of the units standing on this hex.
    pub occupants: Vec<UnitId>,
}

// ── Unit ───────────────────────────────────────────────────────────────

pub const FULL_STRENGTH: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub attack: u16,
    pub defense: u16,
    pub movement: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFlags {
    pub entrenched: bool,
    pub suppressed: bool,
    /// Thrown back while attacking; suppressed through the next turn.
    #[serde(default)]
    pub repulsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    pub unit_type: UnitType,
    pub strength: u8,
    pub initial_strength: u8,
    pub stats: UnitStats,
    pub position: HexCoord,
    pub supply: SupplyStatus,
    pub turns_out_of_supply: u8,
    pub flags: StatusFlags,
    /// Movement points still available this turn.
    pub movement_left: u16,
    /// Set once the unit attacks, fortifies, supports or builds this turn.
    pub acted: bool,
}

impl Unit {
    pub fn is_destroyed(&self) -> bool {
        self.strength == 0
    }

    pub fn has_moved(&self) -> bool {
        self.movement_left < self.stats.movement
    }
}

// ── Actions ────────────────────────────────────────────────────────────

/// A directive proposed by an agent during its faction's action phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Move a unit to a hex reachable with its remaining movement points.
    Move { unit: UnitId, to: HexCoord },
    /// Declare an attack on an adjacent enemy-held hex.
    Attack { attackers: Vec<UnitId>, target: HexCoord },
    /// Dig in for the rest of the turn. Only before moving.
    Fortify { unit: UnitId },
    /// Engineer entrenches every friendly unit on its own or an adjacent
    /// friendly-controlled hex.
    EngineerAction { unit: UnitId, target: HexCoord },
    /// Artillery adds its fire to this faction's attack on `target`.
    ArtillerySupport { unit: UnitId, target: HexCoord },
}

impl Action {
    /// Every unit this action commits.
    pub fn units(&self) -> Vec<UnitId> {
        match self {
            Action::Move { unit, .. }
            | Action::Fortify { unit }
            | Action::EngineerAction { unit, .. }
            | Action::ArtillerySupport { unit, .. } => vec![*unit],
            Action::Attack { attackers, .. } => attackers.clone(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Move { unit, to } => write!(f, "move {} to {}", unit, to),
            Action::Attack { attackers, target } => {
                let ids: Vec<String> = attackers.iter().map(|u| u.to_string()).collect();
                write!(f, "attack {} with [{}]", target, ids.join(", "))
            }
            Action::Fortify { unit } => write!(f, "fortify {}", unit),
            Action::EngineerAction { unit, target } => write!(f, "entrench {} using {}", target, unit),
            Action::ArtillerySupport { unit, target } => write!(f, "support attack on {} with {}", target, unit),
        }
    }
}

/// An attack accepted during an action phase, waiting for combat resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredAttack {
    pub faction: Faction,
    pub attackers: Vec<UnitId>,
    pub target: HexCoord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredSupport {
    pub faction: Faction,
    pub unit: UnitId,
    pub target: HexCoord,
}

// ── Pending Decision ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingDecision {
    /// The engine waits for this faction's action batch.
    ChooseActions { faction: Faction, turn: u8 },
}

impl PendingDecision {
    pub fn faction(&self) -> Faction {
        match self {
            PendingDecision::ChooseActions { faction, .. } => *faction,
        }
    }
}

/// Limits handed to an agent with each decision request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionBudget {
    /// Wall-clock limit; answers arriving later are discarded.
    pub time_limit_ms: Option<u64>,
    /// Actions beyond this count are dropped unread.
    pub max_actions: usize,
}

// ── Outcome & log ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryReason {
    CapitalCaptured,
    EnemyEliminated,
    Survival,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Faction,
    pub reason: VictoryReason,
    pub turn: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEvent {
    PhaseStarted,
    Interdiction { target: Faction, hexes: Vec<HexCoord> },
    LiftCapacity { before: u32, after: u32 },
    SupplyAssigned { unit: UnitId, status: SupplyStatus },
    ActionAccepted { faction: Faction, action: Action },
    ActionRejected { faction: Faction, action: Action, reason: String },
    AgentTimeout { faction: Faction, elapsed_ms: u64, limit_ms: u64 },
    Engagement(crate::combat::EngagementReport),
    EngagementRejected { faction: Faction, target: HexCoord, reason: String },
    HexCaptured { coord: HexCoord, by: Faction },
    UnitDestroyed { unit: UnitId, name: String },
    Reinforcement { unit: UnitId, name: String, at: HexCoord },
    Refit { unit: UnitId, amount: u8 },
    GameOver(GameOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u8,
    pub phase: Phase,
    pub event: LogEvent,
}

/// Per-turn aggregate appended to the timeline at `TurnEndCheck`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub turn: u8,
    pub pla_units: u32,
    pub roc_units: u32,
    pub pla_strength: u32,
    pub roc_strength: u32,
    pub engagements: u32,
    pub hexes_captured: u32,
}

/// Record kept for a unit after it leaves the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyedUnit {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    pub unit_type: UnitType,
    pub initial_strength: u8,
    pub turn: u8,
}

/// Hexes denied to one faction's supply lines on a given turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interdiction {
    pub turn: u8,
    pub target: Faction,
    pub hexes: Vec<HexCoord>,
}

/// A unit waiting offshore for amphibious lift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reinforcement {
    pub name: String,
    pub unit_type: UnitType,
    pub strength: u8,
    pub lift_cost: u32,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub stats: Option<UnitStats>,
}

// ── Game State ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub turn: u8,
    pub phase: Phase,
    pub seed: Option<u64>,

    pub grid: HexGrid,
    pub units: BTreeMap<UnitId, Unit>,
    pub next_unit_id: u32,
    pub capital: HexCoord,

    /// Supply sources computed at the last `SupplyCheck`.
    pub supply_sources: BTreeMap<Faction, Vec<HexCoord>>,
    /// Interdiction active this turn. Cleared after the supply check.
    pub interdicted: Vec<Interdiction>,
    pub interdiction_plan: Vec<Interdiction>,

    pub declared_attacks: Vec<DeclaredAttack>,
    pub declared_support: Vec<DeclaredSupport>,
    /// Factions whose action phase has committed this turn.
    pub committed: Vec<Faction>,
    pub pending: Option<PendingDecision>,

    pub reinforcement_pool: Vec<Reinforcement>,
    pub lift_capacity: u32,

    /// Zero-strength units awaiting removal at phase end.
    pub pending_removal: Vec<UnitId>,
    pub destroyed: Vec<DestroyedUnit>,

    pub log: Vec<LogEntry>,
    pub timeline: Vec<TurnSummary>,
    pub outcome: Option<GameOutcome>,

    pub reference: ReferenceData,
    pub rules: ScenarioRules,
    pub max_turns: u8,
    pub max_actions_per_decision: usize,
    pub decision_timeout_ms: Option<u64>,
}

impl GameState {
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn hex(&self, coord: HexCoord) -> Option<&Hex> {
        self.grid.get(coord)
    }

    pub fn hex_mut(&mut self, coord: HexCoord) -> Option<&mut Hex> {
        self.grid.get_mut(coord)
    }

    /// Living units of a faction in id order.
    pub fn faction_units(&self, faction: Faction) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.faction == faction && !u.is_destroyed())
    }

    pub fn faction_strength(&self, faction: Faction) -> u32 {
        self.faction_units(faction).map(|u| u.strength as u32).sum()
    }

    /// Whether any living unit of a faction other than `faction` stands on `coord`.
    pub fn has_enemy_units(&self, coord: HexCoord, faction: Faction) -> bool {
        self.hex(coord).map_or(false, |h| {
            h.occupants.iter().any(|id| {
                self.unit(*id).map_or(false, |u| u.faction != faction && !u.is_destroyed())
            })
        })
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn budget(&self) -> DecisionBudget {
        DecisionBudget {
            time_limit_ms: self.decision_timeout_ms,
            max_actions: self.max_actions_per_decision,
        }
    }

    pub(crate) fn record(&mut self, event: LogEvent) {
        self.log.push(LogEntry { turn: self.turn, phase: self.phase, event });
    }
}
