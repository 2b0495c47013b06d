// ═══════════════════════════════════════════════════════════════════════
// Snapshots & post-game analysis
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    pub unit_type: UnitType,
    pub hex: String,
    pub position: HexCoord,
    pub strength: u8,
    pub initial_strength: u8,
    pub supply: SupplyStatus,
    pub turns_out_of_supply: u8,
    pub entrenched: bool,
}

/// Losses relative to each unit's starting strength.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Casualties {
    pub units_destroyed: u32,
    pub units_damaged: u32,
    pub strength_lost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionTotals {
    pub faction: Faction,
    pub units: u32,
    pub strength: u32,
    pub hexes_controlled: u32,
    pub casualties: Casualties,
}

/// Serializable picture of a game at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub turn: u8,
    pub phase: Phase,
    pub units: Vec<UnitSnapshot>,
    pub factions: Vec<FactionTotals>,
    pub reinforcements_waiting: usize,
    pub timeline: Vec<TurnSummary>,
    pub log: Vec<LogEntry>,
    pub outcome: Option<GameOutcome>,
}

pub fn casualties(state: &GameState, faction: Faction) -> Casualties {
    let mut c = Casualties::default();
    for unit in state.faction_units(faction) {
        if unit.strength < unit.initial_strength {
            c.units_damaged += 1;
            c.strength_lost += (unit.initial_strength - unit.strength) as u32;
        }
    }
    for dead in state.destroyed.iter().filter(|d| d.faction == faction) {
        c.units_destroyed += 1;
        c.strength_lost += dead.initial_strength as u32;
    }
    // Zeroed but not yet flushed.
    for unit in state.units.values().filter(|u| u.faction == faction && u.is_destroyed()) {
        c.units_destroyed += 1;
        c.strength_lost += unit.initial_strength as u32;
    }
    c
}

pub fn hexes_controlled(state: &GameState, faction: Faction) -> u32 {
    state.grid.iter().filter(|h| h.owner == Some(faction)).count() as u32
}

pub fn faction_totals(state: &GameState, faction: Faction) -> FactionTotals {
    FactionTotals {
        faction,
        units: state.faction_units(faction).count() as u32,
        strength: state.faction_strength(faction),
        hexes_controlled: hexes_controlled(state, faction),
        casualties: casualties(state, faction),
    }
}

pub fn snapshot(state: &GameState) -> GameSnapshot {
    let units = state
        .units
        .values()
        .map(|u| UnitSnapshot {
            id: u.id,
            name: u.name.clone(),
            faction: u.faction,
            unit_type: u.unit_type,
            hex: state.hex(u.position).map(|h| h.label.clone()).unwrap_or_default(),
            position: u.position,
            strength: u.strength,
            initial_strength: u.initial_strength,
            supply: u.supply,
            turns_out_of_supply: u.turns_out_of_supply,
            entrenched: u.flags.entrenched,
        })
        .collect();

    GameSnapshot {
        turn: state.turn,
        phase: state.phase,
        units,
        factions: Faction::ALL.iter().map(|f| faction_totals(state, *f)).collect(),
        reinforcements_waiting: state.reinforcement_pool.len(),
        timeline: state.timeline.clone(),
        log: state.log.clone(),
        outcome: state.outcome,
    }
}

impl GameSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn totals(&self, faction: Faction) -> Option<&FactionTotals> {
        self.factions.iter().find(|t| t.faction == faction)
    }
}
