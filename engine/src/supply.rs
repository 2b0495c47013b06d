// ═══════════════════════════════════════════════════════════════════════
// Supply lines — sources, blocking rules, per-unit status
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use crate::units;
use std::collections::BTreeSet;
use tracing::debug;

/// Hexes that currently feed `faction`'s supply lines.
pub fn supply_sources(state: &GameState, faction: Faction) -> BTreeSet<HexCoord> {
    let beachheads_open = faction == Faction::Pla && state.turn <= state.rules.beachhead_supply_turns;
    state
        .grid
        .iter()
        .filter(|h| h.owner == Some(faction) && !state.has_enemy_units(h.coord, faction))
        .filter(|h| {
            let f = &h.features;
            f.depot
                || f.port
                || f.airfield
                || (f.capital && faction == Faction::Roc)
                || (beachheads_open && h.terrain == TerrainType::Coastal)
        })
        .map(|h| h.coord)
        .collect()
}

fn is_interdicted(state: &GameState, coord: HexCoord, faction: Faction) -> bool {
    state
        .interdicted
        .iter()
        .any(|i| i.target == faction && i.hexes.binary_search(&coord).is_ok())
}

/// Blocks for both passes: terrain, enemy control, enemy presence.
fn open_to(state: &GameState, coord: HexCoord, faction: Faction) -> bool {
    units::is_passable(state, coord)
        && state.hex(coord).map_or(false, |h| h.owner != Some(faction.opponent()))
        && !state.has_enemy_units(coord, faction)
}

/// Strict pass additionally avoids interdicted and contested hexes.
fn open_strict(state: &GameState, coord: HexCoord, faction: Faction) -> bool {
    open_to(state, coord, faction) && !is_interdicted(state, coord, faction) && !units::in_enemy_zoc(state, coord, faction)
}

/// Supply status for one unit against the given source set. Pure.
pub fn determine_supply(state: &GameState, unit: &Unit, sources: &BTreeSet<HexCoord>) -> SupplyStatus {
    let range = state.rules.max_supply_range;
    let faction = unit.faction;
    let strict = state
        .grid
        .path_to_any(unit.position, sources, |c| open_strict(state, c, faction), range);
    if strict.is_some() {
        return SupplyStatus::Supplied;
    }
    let relaxed = state
        .grid
        .path_to_any(unit.position, sources, |c| open_to(state, c, faction), range);
    if relaxed.is_some() {
        SupplyStatus::Isolated
    } else {
        SupplyStatus::OutOfSupply
    }
}

/// The `SupplyCheck` phase: recompute source sets, assign every unit's
/// status, then lift this turn's interdiction. Returns each unit's status.
pub fn resolve_supply(state: &mut GameState) -> Vec<(UnitId, SupplyStatus)> {
    let mut statuses = Vec::with_capacity(state.units.len());
    for faction in Faction::ALL {
        let sources = supply_sources(state, faction);
        for unit in state.faction_units(faction) {
            statuses.push((unit.id, determine_supply(state, unit, &sources)));
        }
        state.supply_sources.insert(faction, sources.into_iter().collect());
    }
    statuses.sort_by_key(|(id, _)| *id);

    for &(id, status) in &statuses {
        let previous = state.unit(id).map(|u| u.supply);
        units::set_supply(state, id, status);
        if previous != Some(status) {
            debug!(unit = %id, ?status, "supply status changed");
            state.record(LogEvent::SupplyAssigned { unit: id, status });
        }
    }

    state.interdicted.clear();
    statuses
}
