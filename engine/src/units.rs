// ═══════════════════════════════════════════════════════════════════════
// Unit registry — creation, movement, casualties, deferred removal
// ═══════════════════════════════════════════════════════════════════════

use crate::error::{Result, SimError};
use crate::grid::Step;
use crate::types::*;
use std::collections::BTreeMap;
use tracing::debug;

// ── Hex occupancy ──────────────────────────────────────────────────────

pub fn stacking_limit(state: &GameState, coord: HexCoord) -> u8 {
    state
        .hex(coord)
        .map_or(0, |h| state.reference.terrain_def(h.terrain).stacking_limit)
}

pub fn has_room(state: &GameState, coord: HexCoord) -> bool {
    state
        .hex(coord)
        .map_or(false, |h| h.occupants.len() < stacking_limit(state, coord) as usize)
}

pub fn is_passable(state: &GameState, coord: HexCoord) -> bool {
    state
        .hex(coord)
        .map_or(false, |h| state.reference.terrain_def(h.terrain).is_passable())
}

/// Whether a living enemy unit that projects a zone of control stands
/// next to `coord`.
pub fn in_enemy_zoc(state: &GameState, coord: HexCoord, faction: Faction) -> bool {
    state.grid.neighbors(coord).into_iter().any(|n| {
        state.hex(n).map_or(false, |h| {
            h.occupants.iter().any(|id| {
                state.unit(*id).map_or(false, |u| {
                    u.faction != faction && !u.is_destroyed() && state.reference.unit_def(u.unit_type).projects_zoc
                })
            })
        })
    })
}

fn place(state: &mut GameState, id: UnitId, coord: HexCoord) {
    let hex = state
        .hex_mut(coord)
        .unwrap_or_else(|| panic!("unit {} placed on missing hex {}", id, coord));
    if let Err(pos) = hex.occupants.binary_search(&id) {
        hex.occupants.insert(pos, id);
    }
}

fn lift(state: &mut GameState, id: UnitId, coord: HexCoord) {
    let hex = state
        .hex_mut(coord)
        .unwrap_or_else(|| panic!("unit {} stands on missing hex {}", id, coord));
    match hex.occupants.binary_search(&id) {
        Ok(pos) => {
            hex.occupants.remove(pos);
        }
        Err(_) => panic!("unit {} missing from occupants of {}", id, coord),
    }
}

/// Give `coord` to `faction`. Returns true if control changed hands.
pub(crate) fn claim_hex(state: &mut GameState, coord: HexCoord, faction: Faction) -> bool {
    let changed = match state.hex_mut(coord) {
        Some(hex) if hex.owner != Some(faction) => {
            hex.owner = Some(faction);
            true
        }
        _ => false,
    };
    if changed {
        debug!(%coord, %faction, "hex captured");
        state.record(LogEvent::HexCaptured { coord, by: faction });
    }
    changed
}

// ── Creation ───────────────────────────────────────────────────────────

pub(crate) fn check_strength(name: &str, strength: u8) -> Result<()> {
    if strength == 0 || strength > FULL_STRENGTH {
        return Err(SimError::DataIntegrity(format!("unit {} has strength {}", name, strength)));
    }
    Ok(())
}

/// Create a unit on `at`. The unit starts Supplied with a full movement
/// budget; base stats come from reference data unless `stats` overrides them.
pub fn spawn_unit(
    state: &mut GameState,
    name: &str,
    faction: Faction,
    unit_type: UnitType,
    strength: u8,
    stats: Option<UnitStats>,
    at: HexCoord,
) -> Result<UnitId> {
    let def = state
        .reference
        .unit_type(unit_type)
        .ok_or_else(|| SimError::DataIntegrity(format!("no reference entry for unit type {}", unit_type)))?;
    let stats = stats.unwrap_or_else(|| def.stats());
    check_strength(name, strength)?;
    if !is_passable(state, at) {
        return Err(SimError::DataIntegrity(format!("unit {} placed on impassable or missing hex {}", name, at)));
    }
    if !has_room(state, at) {
        return Err(SimError::DataIntegrity(format!("unit {} exceeds the stacking limit of {}", name, at)));
    }

    let id = UnitId(state.next_unit_id);
    state.next_unit_id += 1;
    state.units.insert(
        id,
        Unit {
            id,
            name: name.to_string(),
            faction,
            unit_type,
            strength,
            initial_strength: strength,
            stats,
            position: at,
            supply: SupplyStatus::Supplied,
            turns_out_of_supply: 0,
            flags: StatusFlags::default(),
            movement_left: stats.movement,
            acted: false,
        },
    );
    place(state, id, at);
    Ok(id)
}

// ── Movement ───────────────────────────────────────────────────────────

/// Edge cost for a unit of `faction` stepping into `to`: impassable and
/// enemy-occupied hexes block, enemy zones of control halt.
pub fn movement_step(state: &GameState, faction: Faction, to: HexCoord) -> Step {
    let Some(hex) = state.hex(to) else {
        return Step::Blocked;
    };
    let Some(cost) = state.reference.terrain_def(hex.terrain).movement_cost else {
        return Step::Blocked;
    };
    if state.has_enemy_units(to, faction) {
        return Step::Blocked;
    }
    if in_enemy_zoc(state, to, faction) {
        Step::CostAndHalt(cost as u32)
    } else {
        Step::Cost(cost as u32)
    }
}

/// Every hex the unit can reach with its remaining movement points.
pub fn reachable_hexes(state: &GameState, id: UnitId) -> BTreeMap<HexCoord, u32> {
    let Some(unit) = state.unit(id) else {
        return BTreeMap::new();
    };
    let faction = unit.faction;
    state
        .grid
        .reachable(unit.position, unit.movement_left as u32, |_, to| movement_step(state, faction, to))
}

/// Move a unit along its cheapest path to `to`, spending movement points.
/// Entering a hex with no enemy units takes control of it.
pub fn move_unit(state: &mut GameState, id: UnitId, to: HexCoord) -> Result<u32> {
    let unit = state
        .unit(id)
        .ok_or_else(|| SimError::invalid_move(id, "no such unit"))?;
    if unit.is_destroyed() {
        return Err(SimError::invalid_move(id, "unit is destroyed"));
    }
    if unit.position == to {
        return Err(SimError::invalid_move(id, "unit is already there"));
    }
    let (from, faction, budget) = (unit.position, unit.faction, unit.movement_left as u32);

    let (_, cost) = state
        .grid
        .shortest_path(from, to, budget, |_, next| movement_step(state, faction, next))
        .ok_or_else(|| SimError::invalid_move(id, format!("{} is not reachable this turn", to)))?;
    if !has_room(state, to) {
        return Err(SimError::invalid_move(id, format!("{} is at its stacking limit", to)));
    }

    lift(state, id, from);
    place(state, id, to);
    if let Some(unit) = state.unit_mut(id) {
        unit.position = to;
        unit.movement_left -= cost as u16;
    }
    claim_hex(state, to, faction);
    debug!(unit = %id, %from, %to, cost, "unit moved");
    Ok(cost)
}

/// Displace a unit without spending movement (retreats, landings).
pub(crate) fn relocate(state: &mut GameState, id: UnitId, to: HexCoord) {
    let from = match state.unit(id) {
        Some(u) => u.position,
        None => panic!("relocating unknown unit {}", id),
    };
    lift(state, id, from);
    place(state, id, to);
    if let Some(unit) = state.unit_mut(id) {
        unit.position = to;
    }
}

// ── Strength ───────────────────────────────────────────────────────────

/// Subtract up to `loss` strength points. Returns the points actually lost.
/// A unit reduced to zero is queued for removal at the end of the phase.
pub fn apply_casualties(state: &mut GameState, id: UnitId, loss: u8) -> u8 {
    let Some(unit) = state.unit_mut(id) else {
        return 0;
    };
    let lost = loss.min(unit.strength);
    unit.strength -= lost;
    let zeroed = unit.strength == 0;
    if zeroed && !state.pending_removal.contains(&id) {
        state.pending_removal.push(id);
    }
    lost
}

/// Zero a unit outright.
pub(crate) fn destroy(state: &mut GameState, id: UnitId) -> u8 {
    apply_casualties(state, id, u8::MAX)
}

pub(crate) fn set_supply(state: &mut GameState, id: UnitId, status: SupplyStatus) {
    if let Some(unit) = state.unit_mut(id) {
        unit.supply = status;
        if status == SupplyStatus::OutOfSupply {
            unit.turns_out_of_supply = unit.turns_out_of_supply.saturating_add(1);
        } else {
            unit.turns_out_of_supply = 0;
        }
    }
}

/// Remove every queued zero-strength unit from its hex and the registry.
pub(crate) fn flush_destroyed(state: &mut GameState) -> Vec<UnitId> {
    let mut removed = std::mem::take(&mut state.pending_removal);
    removed.sort();
    for &id in &removed {
        let Some(unit) = state.units.remove(&id) else {
            continue;
        };
        lift(state, id, unit.position);
        state.destroyed.push(DestroyedUnit {
            id,
            name: unit.name.clone(),
            faction: unit.faction,
            unit_type: unit.unit_type,
            initial_strength: unit.initial_strength,
            turn: state.turn,
        });
        debug!(unit = %id, name = %unit.name, "unit removed");
        state.record(LogEvent::UnitDestroyed { unit: id, name: unit.name });
    }
    removed
}
