// ═══════════════════════════════════════════════════════════════════════
// Visibility / Information Model
//
// Agents never touch the authoritative GameState. They get an owned
// GameStateView built for one faction:
//
//   PUBLIC  — the map, hex control, every unit's position, type,
//             strength, supply status and entrenchment; turn and phase
//   PRIVATE — the viewer's own attack and support declarations, its units'
//             remaining movement, and (PLA) lift capacity and the
//             reinforcement queue
//   HIDDEN  — the opponent's declarations and per-unit budgets
//
// Mutating a view has no effect on the game.
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexView {
    pub coord: HexCoord,
    pub label: String,
    pub name: String,
    pub terrain: TerrainType,
    pub owner: Option<Faction>,
    pub features: HexFeatures,
    pub occupants: Vec<UnitId>,
    /// `None` where the terrain is impassable.
    pub movement_cost: Option<u16>,
    pub defense_pct: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    pub unit_type: UnitType,
    pub strength: u8,
    pub position: HexCoord,
    pub supply: SupplyStatus,
    pub attack: u16,
    pub defense: u16,
    pub entrenched: bool,
    pub suppressed: bool,
    /// Only populated for the viewer's own units.
    pub movement_left: Option<u16>,
    pub acted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    pub viewer: Faction,
    pub turn: u8,
    pub max_turns: u8,
    pub phase: Phase,
    pub capital: HexCoord,
    pub hexes: Vec<HexView>,
    pub units: Vec<UnitView>,
    pub my_supply_sources: Vec<HexCoord>,
    pub my_attacks: Vec<DeclaredAttack>,
    pub my_support: Vec<DeclaredSupport>,
    pub reinforcements_waiting: usize,
    /// PLA only.
    pub lift_capacity: Option<u32>,
    pub outcome: Option<GameOutcome>,
}

impl GameStateView {
    pub fn hex(&self, coord: HexCoord) -> Option<&HexView> {
        self.hexes.binary_search_by_key(&coord, |h| h.coord).ok().map(|i| &self.hexes[i])
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitView> {
        self.units.binary_search_by_key(&id, |u| u.id).ok().map(|i| &self.units[i])
    }

    pub fn my_units(&self) -> impl Iterator<Item = &UnitView> {
        self.units.iter().filter(move |u| u.faction == self.viewer)
    }

    pub fn enemy_units(&self) -> impl Iterator<Item = &UnitView> {
        self.units.iter().filter(move |u| u.faction != self.viewer)
    }

    /// Hexes carrying a victory point or the capital.
    pub fn objectives(&self) -> Vec<HexCoord> {
        self.hexes
            .iter()
            .filter(|h| h.features.capital || h.features.victory_point)
            .map(|h| h.coord)
            .collect()
    }
}

/// Build the view for one faction.
pub fn state_view(state: &GameState, viewer: Faction) -> GameStateView {
    let hexes = state
        .grid
        .iter()
        .map(|h| {
            let terrain = state.reference.terrain(h.terrain);
            HexView {
                coord: h.coord,
                label: h.label.clone(),
                name: h.name.clone(),
                terrain: h.terrain,
                owner: h.owner,
                features: h.features,
                occupants: h.occupants.clone(),
                movement_cost: terrain.and_then(|t| t.movement_cost),
                defense_pct: terrain.map_or(100, |t| t.defense_pct),
            }
        })
        .collect();

    let units = state
        .units
        .values()
        .filter(|u| !u.is_destroyed())
        .map(|u| {
            let mine = u.faction == viewer;
            UnitView {
                id: u.id,
                name: u.name.clone(),
                faction: u.faction,
                unit_type: u.unit_type,
                strength: u.strength,
                position: u.position,
                supply: u.supply,
                attack: u.stats.attack,
                defense: u.stats.defense,
                entrenched: u.flags.entrenched,
                suppressed: u.flags.suppressed,
                movement_left: mine.then_some(u.movement_left),
                acted: mine.then_some(u.acted),
            }
        })
        .collect();

    GameStateView {
        viewer,
        turn: state.turn,
        max_turns: state.max_turns,
        phase: state.phase,
        capital: state.capital,
        hexes,
        units,
        my_supply_sources: state.supply_sources.get(&viewer).cloned().unwrap_or_default(),
        my_attacks: state.declared_attacks.iter().filter(|a| a.faction == viewer).cloned().collect(),
        my_support: state.declared_support.iter().filter(|s| s.faction == viewer).cloned().collect(),
        reinforcements_waiting: state.reinforcement_pool.len(),
        lift_capacity: (viewer == Faction::Pla).then_some(state.lift_capacity),
        outcome: state.outcome,
    }
}
