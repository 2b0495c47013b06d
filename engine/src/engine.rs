// ═══════════════════════════════════════════════════════════════════════
// Turn orchestrator — phase state machine and action commitment
//
// Architecture:
//   The engine is a pure state machine. It never does I/O or calls agents.
//   It sets `state.pending` to describe the decision it needs; the driver
//   reads that, asks the faction's agent, and feeds the batch back through
//   `submit_actions()` (or `record_timeout()` when the agent ran late).
//
// Turn:
//   AirSea → SupplyCheck → ActionsPla → ActionsRoc → CombatResolution
//   → LogisticsReinforcement → TurnEndCheck → (next AirSea | GameOver)
// ═══════════════════════════════════════════════════════════════════════

use crate::combat::{self, CombatReport};
use crate::error::{Result, SimError};
use crate::supply;
use crate::types::*;
use crate::units;
use tracing::{debug, info, warn};

/// What happened to one submitted action batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub faction: Faction,
    pub accepted: Vec<Action>,
    pub rejected: Vec<(Action, SimError)>,
    /// Actions past the per-decision limit, ignored unread.
    pub dropped: usize,
    pub timed_out: bool,
}

fn enter(state: &mut GameState, phase: Phase) {
    state.phase = phase;
    debug!(turn = state.turn, ?phase, "phase");
    state.record(LogEvent::PhaseStarted);
}

// ═══════════════════════════════════════════════════════════════════════
// Advance
// ═══════════════════════════════════════════════════════════════════════

/// Run automatic phases until a faction decision is pending or the game
/// ends. A no-op while a decision is outstanding.
pub fn advance(state: &mut GameState) -> Result<()> {
    if state.is_over() {
        return Err(SimError::GameAlreadyOver);
    }
    if state.pending.is_some() {
        return Ok(());
    }
    loop {
        match state.phase {
            Phase::AirSea => {
                run_air_sea(state);
                enter(state, Phase::SupplyCheck);
            }
            Phase::SupplyCheck => {
                supply::resolve_supply(state);
                enter(state, Phase::ActionsPla);
            }
            Phase::ActionsPla | Phase::ActionsRoc => {
                let phase = state.phase;
                let Some(faction) = phase.acting_faction() else {
                    unreachable!("action phase without a faction")
                };
                if state.committed.contains(&faction) {
                    enter(state, phase.next());
                    continue;
                }
                state.pending = Some(PendingDecision::ChooseActions { faction, turn: state.turn });
                return Ok(());
            }
            Phase::CombatResolution => {
                resolve_combat_phase(state)?;
            }
            Phase::LogisticsReinforcement => {
                run_logistics(state)?;
                enter(state, Phase::TurnEndCheck);
            }
            Phase::TurnEndCheck => {
                if run_turn_end(state).is_some() {
                    return Ok(());
                }
                state.turn += 1;
                info!(turn = state.turn, "turn begins");
                enter(state, Phase::AirSea);
            }
            Phase::GameOver => return Err(SimError::GameAlreadyOver),
        }
    }
}

// ── AirSea ─────────────────────────────────────────────────────────────

fn run_air_sea(state: &mut GameState) {
    for unit in state.units.values_mut() {
        unit.movement_left = unit.stats.movement;
        unit.acted = false;
        unit.flags = StatusFlags { suppressed: unit.flags.repulsed, ..StatusFlags::default() };
    }
    state.committed.clear();
    state.declared_attacks.clear();
    state.declared_support.clear();

    let turn = state.turn;
    let active: Vec<Interdiction> = state.interdiction_plan.iter().filter(|p| p.turn == turn).cloned().collect();
    for plan in &active {
        for &coord in &plan.hexes {
            let hit: Vec<UnitId> = state
                .hex(coord)
                .map(|h| h.occupants.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|id| state.unit(*id).map_or(false, |u| u.faction == plan.target))
                .collect();
            for id in hit {
                if let Some(u) = state.unit_mut(id) {
                    u.flags.suppressed = true;
                }
            }
        }
        debug!(target = %plan.target, hexes = plan.hexes.len(), "interdiction");
        state.record(LogEvent::Interdiction { target: plan.target, hexes: plan.hexes.clone() });
    }
    state.interdicted = active;

    if turn <= state.rules.lift_decay_turns {
        let before = state.lift_capacity;
        let after = before - before * state.rules.lift_decay_pct as u32 / 100;
        state.lift_capacity = after;
        state.record(LogEvent::LiftCapacity { before, after });
    }
}

// ── Actions ────────────────────────────────────────────────────────────

/// Commit a faction's action batch. Each action is validated in order
/// against the state left by the ones before it; failures are dropped and
/// reported, never adjusted.
pub fn submit_actions(state: &mut GameState, faction: Faction, actions: Vec<Action>) -> Result<ActionReport> {
    if state.is_over() {
        return Err(SimError::GameAlreadyOver);
    }
    let expected = faction.action_phase();
    let waiting = matches!(&state.pending, Some(p) if p.faction() == faction);
    if !waiting || state.phase != expected {
        return Err(SimError::PhaseOrder { expected, actual: state.phase });
    }

    let limit = state.max_actions_per_decision;
    let mut report = ActionReport {
        faction,
        accepted: Vec::new(),
        rejected: Vec::new(),
        dropped: actions.len().saturating_sub(limit),
        timed_out: false,
    };
    for action in actions.into_iter().take(limit) {
        match apply_action(state, faction, &action) {
            Ok(()) => {
                debug!(%faction, %action, "action accepted");
                state.record(LogEvent::ActionAccepted { faction, action: action.clone() });
                report.accepted.push(action);
            }
            Err(err) => {
                warn!(%faction, %action, %err, "action rejected");
                state.record(LogEvent::ActionRejected { faction, action: action.clone(), reason: err.to_string() });
                report.rejected.push((action, err));
            }
        }
    }
    if report.dropped > 0 {
        warn!(%faction, dropped = report.dropped, limit, "actions over the per-decision limit ignored");
    }

    state.committed.push(faction);
    state.pending = None;
    enter(state, expected.next());
    Ok(report)
}

/// Record that a faction's agent missed its decision budget. The faction
/// passes for this phase; the game continues.
pub fn record_timeout(state: &mut GameState, faction: Faction, elapsed_ms: u64) -> Result<ActionReport> {
    let limit_ms = state.decision_timeout_ms.unwrap_or(0);
    let timeout = SimError::AgentTimeout { faction, elapsed_ms, limit_ms };
    let expected = faction.action_phase();
    if !state.is_over() && state.phase == expected {
        warn!(%timeout, "agent timed out, passing");
        state.record(LogEvent::AgentTimeout { faction, elapsed_ms, limit_ms });
    }
    let mut report = submit_actions(state, faction, Vec::new())?;
    report.timed_out = true;
    Ok(report)
}

fn own_unit(state: &GameState, faction: Faction, id: UnitId) -> Result<&Unit> {
    let unit = state
        .unit(id)
        .ok_or_else(|| SimError::IllegalAction(format!("unknown unit {}", id)))?;
    if unit.faction != faction {
        return Err(SimError::IllegalAction(format!("unit {} does not belong to {}", id, faction)));
    }
    if unit.is_destroyed() {
        return Err(SimError::IllegalAction(format!("unit {} is destroyed", id)));
    }
    Ok(unit)
}

fn spend_action(state: &mut GameState, id: UnitId) {
    if let Some(u) = state.unit_mut(id) {
        u.acted = true;
        u.movement_left = 0;
    }
}

/// Validate one action and, if legal, commit it to the state.
pub fn apply_action(state: &mut GameState, faction: Faction, action: &Action) -> Result<()> {
    match action {
        Action::Move { unit, to } => {
            let u = state
                .unit(*unit)
                .ok_or_else(|| SimError::invalid_move(*unit, "no such unit"))?;
            if u.faction != faction {
                return Err(SimError::IllegalAction(format!("unit {} does not belong to {}", unit, faction)));
            }
            if u.acted {
                return Err(SimError::invalid_move(*unit, "unit has already acted this turn"));
            }
            units::move_unit(state, *unit, *to)?;
        }

        Action::Attack { attackers, target } => {
            combat::validate_attack(state, faction, attackers, *target)?;
            state.declared_attacks.push(DeclaredAttack { faction, attackers: attackers.clone(), target: *target });
            for id in attackers {
                spend_action(state, *id);
            }
        }

        Action::Fortify { unit } => {
            let u = own_unit(state, faction, *unit)?;
            if u.acted {
                return Err(SimError::IllegalAction(format!("unit {} has already acted this turn", unit)));
            }
            if u.has_moved() {
                return Err(SimError::IllegalAction(format!("unit {} moved this turn and cannot fortify", unit)));
            }
            spend_action(state, *unit);
            if let Some(u) = state.unit_mut(*unit) {
                u.flags.entrenched = true;
            }
        }

        Action::EngineerAction { unit, target } => {
            let u = own_unit(state, faction, *unit)?;
            if u.unit_type != UnitType::Engineer {
                return Err(SimError::IllegalAction(format!("unit {} is not an engineer", unit)));
            }
            if u.acted {
                return Err(SimError::IllegalAction(format!("unit {} has already acted this turn", unit)));
            }
            if u.position.distance(*target) > 1 {
                return Err(SimError::IllegalAction(format!("{} is out of reach of unit {}", target, unit)));
            }
            if state.hex(*target).map_or(true, |h| h.owner != Some(faction)) {
                return Err(SimError::IllegalAction(format!("{} is not held by {}", target, faction)));
            }
            let friends: Vec<UnitId> = state
                .hex(*target)
                .map(|h| h.occupants.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|id| state.unit(*id).map_or(false, |u| u.faction == faction && !u.is_destroyed()))
                .collect();
            spend_action(state, *unit);
            for id in friends {
                if let Some(u) = state.unit_mut(id) {
                    u.flags.entrenched = true;
                }
            }
        }

        Action::ArtillerySupport { unit, target } => {
            combat::validate_support(state, faction, *unit, *target)?;
            state.declared_support.push(DeclaredSupport { faction, unit: *unit, target: *target });
            spend_action(state, *unit);
        }
    }
    Ok(())
}

/// Every single action a faction could legally submit right now, unit by
/// unit in id order. Combined attacks list all eligible adjacent units.
pub fn legal_actions(state: &GameState, faction: Faction) -> Vec<Action> {
    let mut out = Vec::new();
    let mut attack_targets: Vec<HexCoord> = Vec::new();

    for unit in state.faction_units(faction).filter(|u| !u.acted) {
        let def = state.reference.unit_def(unit.unit_type);

        for (to, _) in units::reachable_hexes(state, unit.id) {
            if to != unit.position && units::has_room(state, to) {
                out.push(Action::Move { unit: unit.id, to });
            }
        }
        if !unit.has_moved() {
            out.push(Action::Fortify { unit: unit.id });
        }
        if def.can_assault {
            for n in state.grid.neighbors(unit.position) {
                if combat::validate_attack(state, faction, &[unit.id], n).is_ok() {
                    out.push(Action::Attack { attackers: vec![unit.id], target: n });
                    if !attack_targets.contains(&n) {
                        attack_targets.push(n);
                    }
                }
            }
        }
        if unit.unit_type == UnitType::Engineer {
            let mut spots = vec![unit.position];
            spots.extend(state.grid.neighbors(unit.position));
            spots.sort();
            for target in spots {
                let held = state.hex(target).map_or(false, |h| h.owner == Some(faction));
                let has_friends = state.faction_units(faction).any(|u| u.position == target);
                if held && has_friends {
                    out.push(Action::EngineerAction { unit: unit.id, target });
                }
            }
        }
        if def.support_range > 0 {
            for hex in state.grid.iter() {
                if combat::validate_support(state, faction, unit.id, hex.coord).is_ok() {
                    out.push(Action::ArtillerySupport { unit: unit.id, target: hex.coord });
                }
            }
        }
    }

    attack_targets.sort();
    for target in attack_targets {
        let attackers: Vec<UnitId> = state
            .faction_units(faction)
            .filter(|u| combat::validate_attack(state, faction, &[u.id], target).is_ok())
            .map(|u| u.id)
            .collect();
        if attackers.len() > 1 {
            out.push(Action::Attack { attackers, target });
        }
    }
    out
}

// ── Combat ─────────────────────────────────────────────────────────────

/// Resolve every engagement of the turn. Only legal once both factions
/// have committed their action phase.
pub fn resolve_combat_phase(state: &mut GameState) -> Result<CombatReport> {
    if state.is_over() {
        return Err(SimError::GameAlreadyOver);
    }
    let both_committed = Faction::ALL.iter().all(|f| state.committed.contains(f));
    if state.phase != Phase::CombatResolution || !both_committed {
        return Err(SimError::PhaseOrder { expected: Phase::CombatResolution, actual: state.phase });
    }

    let report = combat::resolve_all(state);
    units::flush_destroyed(state);
    info!(
        turn = state.turn,
        engagements = report.engagements.len(),
        destroyed = report.destroyed.len(),
        "combat resolved"
    );
    enter(state, Phase::LogisticsReinforcement);
    Ok(report)
}

// ── Logistics ──────────────────────────────────────────────────────────

/// PLA-held coastal hex with room and the fewest units; lowest coordinate on ties.
pub fn landing_zone(state: &GameState) -> Option<HexCoord> {
    state
        .grid
        .iter()
        .filter(|h| h.terrain == TerrainType::Coastal && h.owner == Some(Faction::Pla))
        .filter(|h| !state.has_enemy_units(h.coord, Faction::Pla) && units::has_room(state, h.coord))
        .min_by_key(|h| (h.occupants.len(), h.coord))
        .map(|h| h.coord)
}

fn run_logistics(state: &mut GameState) -> Result<()> {
    let mut lift = state.lift_capacity;
    while let Some(r) = state.reinforcement_pool.first().cloned() {
        if r.lift_cost > lift {
            break;
        }
        let Some(zone) = landing_zone(state) else {
            debug!("no landing zone available");
            break;
        };
        let id = units::spawn_unit(state, &r.name, Faction::Pla, r.unit_type, r.strength, r.stats, zone)?;
        state.reinforcement_pool.remove(0);
        spend_action(state, id);
        lift -= r.lift_cost;
        info!(unit = %id, name = %r.name, at = %zone, "reinforcement landed");
        state.record(LogEvent::Reinforcement { unit: id, name: r.name, at: zone });
    }

    let refits: Vec<(UnitId, u8)> = state
        .units
        .values()
        .filter(|u| !u.is_destroyed() && u.supply == SupplyStatus::Supplied && u.strength < u.initial_strength)
        .filter_map(|u| {
            let rate = state.rules.refit_per_turn(u.faction);
            let amount = rate.min(u.initial_strength - u.strength);
            (amount > 0).then_some((u.id, amount))
        })
        .collect();
    for (id, amount) in refits {
        if let Some(u) = state.unit_mut(id) {
            u.strength += amount;
        }
        state.record(LogEvent::Refit { unit: id, amount });
    }
    Ok(())
}

// ── Turn end ───────────────────────────────────────────────────────────

fn summarize_turn(state: &GameState) -> TurnSummary {
    let this_turn = state.log.iter().filter(|e| e.turn == state.turn);
    let (mut engagements, mut captured) = (0, 0);
    for entry in this_turn {
        match entry.event {
            LogEvent::Engagement(_) => engagements += 1,
            LogEvent::HexCaptured { .. } => captured += 1,
            _ => {}
        }
    }
    TurnSummary {
        turn: state.turn,
        pla_units: state.faction_units(Faction::Pla).count() as u32,
        roc_units: state.faction_units(Faction::Roc).count() as u32,
        pla_strength: state.faction_strength(Faction::Pla),
        roc_strength: state.faction_strength(Faction::Roc),
        engagements,
        hexes_captured: captured,
    }
}

/// Win conditions in priority order.
pub fn check_victory(state: &GameState) -> Option<GameOutcome> {
    let turn = state.turn;
    if state.hex(state.capital).map_or(false, |h| h.owner == Some(Faction::Pla)) {
        return Some(GameOutcome { winner: Faction::Pla, reason: VictoryReason::CapitalCaptured, turn });
    }
    if state.faction_units(Faction::Pla).next().is_none() && state.reinforcement_pool.is_empty() {
        return Some(GameOutcome { winner: Faction::Roc, reason: VictoryReason::EnemyEliminated, turn });
    }
    if turn >= state.max_turns {
        return Some(GameOutcome { winner: Faction::Roc, reason: VictoryReason::Survival, turn });
    }
    None
}

fn run_turn_end(state: &mut GameState) -> Option<GameOutcome> {
    units::flush_destroyed(state);
    let summary = summarize_turn(state);
    debug!(?summary, "turn summary");
    state.timeline.push(summary);

    let outcome = check_victory(state)?;
    state.outcome = Some(outcome);
    state.pending = None;
    enter(state, Phase::GameOver);
    state.record(LogEvent::GameOver(outcome));
    info!(winner = %outcome.winner, reason = ?outcome.reason, turn = outcome.turn, "game over");
    Some(outcome)
}
