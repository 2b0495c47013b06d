// ═══════════════════════════════════════════════════════════════════════
// Combat resolution — engagements, odds, casualties, retreats, capture
// ═══════════════════════════════════════════════════════════════════════
//
// All engagements of a turn are resolved against one frozen copy of the
// state taken when the phase starts. Results are computed first, then
// applied in engagement order: losses, retreats, hex control.
// Power values are integers in hundredths (attack 8 at strength 100 = 800).

use crate::error::{Result, SimError};
use crate::reference::{CombatResult, OutcomeClass};
use crate::types::*;
use crate::units;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// One attack, assembled from the committed declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub index: u32,
    pub faction: Faction,
    pub target: HexCoord,
    pub attackers: Vec<UnitId>,
    pub support: Vec<UnitId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementReport {
    pub index: u32,
    pub faction: Faction,
    pub target: HexCoord,
    pub attackers: Vec<UnitId>,
    pub defenders: Vec<UnitId>,
    pub support: Vec<UnitId>,
    pub attack_power: u64,
    pub defense_power: u64,
    pub ratio_pct: u64,
    pub column: String,
    pub roll: u8,
    /// `None` for an unopposed advance.
    pub result: Option<CombatResult>,
    /// Strength points lost per unit in this engagement.
    pub losses: Vec<(UnitId, u8)>,
    /// Retreat destination per retreating unit; `None` means destroyed.
    pub retreats: Vec<(UnitId, Option<HexCoord>)>,
    pub captured: bool,
}

impl EngagementReport {
    pub fn outcome(&self) -> Option<OutcomeClass> {
        self.result.map(|r| r.outcome)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub engagements: Vec<EngagementReport>,
    pub destroyed: Vec<UnitId>,
}

// ── Validation ─────────────────────────────────────────────────────────

/// Check an attack declaration against the current state and the attacks
/// already accepted this turn.
pub fn validate_attack(state: &GameState, faction: Faction, attackers: &[UnitId], target: HexCoord) -> Result<()> {
    let fail = |msg: String| Err(SimError::InvalidEngagement(msg));
    if attackers.is_empty() {
        return fail("no attackers".into());
    }
    let unique: BTreeSet<UnitId> = attackers.iter().copied().collect();
    if unique.len() != attackers.len() {
        return fail("a unit is listed twice".into());
    }
    if !state.grid.contains(target) {
        return fail(format!("target {} is off the map", target));
    }
    for id in attackers {
        let Some(unit) = state.unit(*id) else {
            return fail(format!("unknown unit {}", id));
        };
        if unit.faction != faction {
            return fail(format!("unit {} is not {}", id, faction));
        }
        if unit.is_destroyed() {
            return fail(format!("unit {} is destroyed", id));
        }
        if !state.reference.unit_def(unit.unit_type).can_assault {
            return fail(format!("{} units cannot attack", unit.unit_type));
        }
        if unit.acted {
            return fail(format!("unit {} has already acted this turn", id));
        }
        if !unit.position.is_adjacent(target) {
            return fail(format!("unit {} is not adjacent to {}", id, target));
        }
    }
    if !state.has_enemy_units(target, faction) {
        return fail(format!("no enemy units at {}", target));
    }
    if state.declared_attacks.iter().any(|a| a.faction == faction && a.target == target) {
        return fail(format!("{} already attacks {} this turn", faction, target));
    }
    Ok(())
}

pub fn validate_support(state: &GameState, faction: Faction, unit: UnitId, target: HexCoord) -> Result<()> {
    let fail = |msg: String| Err(SimError::IllegalAction(msg));
    let Some(u) = state.unit(unit) else {
        return fail(format!("unknown unit {}", unit));
    };
    if u.faction != faction {
        return fail(format!("unit {} is not {}", unit, faction));
    }
    let range = state.reference.unit_def(u.unit_type).support_range;
    if range == 0 {
        return fail(format!("{} units cannot give fire support", u.unit_type));
    }
    if u.acted || u.is_destroyed() {
        return fail(format!("unit {} cannot act this turn", unit));
    }
    if u.position.distance(target) > range {
        return fail(format!("{} is beyond range {} of unit {}", target, range, unit));
    }
    if !state.has_enemy_units(target, faction) {
        return fail(format!("no enemy units at {}", target));
    }
    Ok(())
}

// ── Assembly ───────────────────────────────────────────────────────────

/// Turn the committed declarations into engagements, ordered by
/// (target hex, lowest attacker id). Structurally broken declarations are
/// returned separately and never resolved.
pub fn build_engagements(state: &GameState) -> (Vec<Engagement>, Vec<(DeclaredAttack, SimError)>) {
    let mut engagements = Vec::new();
    let mut rejected = Vec::new();
    let mut seen: BTreeSet<(Faction, HexCoord)> = BTreeSet::new();
    let mut used: BTreeSet<UnitId> = BTreeSet::new();

    for decl in &state.declared_attacks {
        let problem = if decl.attackers.is_empty() {
            Some("no attackers".to_string())
        } else if decl
            .attackers
            .iter()
            .any(|id| state.unit(*id).map_or(true, |u| u.faction != decl.faction))
        {
            Some("attackers from more than one faction".to_string())
        } else if decl
            .attackers
            .iter()
            .any(|id| state.unit(*id).map_or(true, |u| !u.position.is_adjacent(decl.target)))
        {
            Some("attacker not adjacent to target".to_string())
        } else if !seen.insert((decl.faction, decl.target)) {
            Some(format!("{} repeated", decl.target))
        } else if decl.attackers.iter().any(|id| !used.insert(*id)) {
            Some("unit already committed to another engagement".to_string())
        } else {
            None
        };
        match problem {
            Some(msg) => rejected.push((decl.clone(), SimError::InvalidEngagement(msg))),
            None => {
                let mut attackers = decl.attackers.clone();
                attackers.sort();
                let support = state
                    .declared_support
                    .iter()
                    .filter(|s| s.faction == decl.faction && s.target == decl.target)
                    .map(|s| s.unit)
                    .collect();
                engagements.push(Engagement { index: 0, faction: decl.faction, target: decl.target, attackers, support });
            }
        }
    }

    engagements.sort_by_key(|e| (e.target, e.attackers[0]));
    for (i, e) in engagements.iter_mut().enumerate() {
        e.index = i as u32;
    }
    (engagements, rejected)
}

// ── Power ──────────────────────────────────────────────────────────────

fn scale(value: u64, pct: u16) -> u64 {
    value * pct as u64 / 100
}

fn supply_pct(state: &GameState, status: SupplyStatus) -> u16 {
    let m = &state.reference.modifiers;
    match status {
        SupplyStatus::Supplied => 100,
        SupplyStatus::Isolated => m.isolated_pct,
        SupplyStatus::OutOfSupply => m.out_of_supply_pct,
    }
}

/// One unit's attack contribution, supply and status modifiers applied.
pub fn attack_power(state: &GameState, unit: &Unit) -> u64 {
    let mut power = unit.stats.attack as u64 * unit.strength as u64;
    power = scale(power, supply_pct(state, unit.supply));
    if unit.flags.suppressed {
        power = scale(power, state.reference.modifiers.suppressed_pct);
    }
    power
}

/// One unit's defense contribution, before the terrain multiplier.
pub fn defense_power(state: &GameState, unit: &Unit) -> u64 {
    let m = &state.reference.modifiers;
    let mut power = unit.stats.defense as u64 * unit.strength as u64;
    power = scale(power, supply_pct(state, unit.supply));
    if unit.flags.entrenched {
        power = scale(power, m.entrenched_pct);
    }
    if unit.flags.suppressed {
        power = scale(power, m.suppressed_pct);
    }
    power
}

pub fn close_air_support(state: &GameState, faction: Faction) -> bool {
    faction == Faction::Pla && state.turn <= state.rules.close_air_support_turns
}

/// Living enemy units on the target hex, in id order.
fn defenders_of(state: &GameState, faction: Faction, target: HexCoord) -> Vec<UnitId> {
    state.hex(target).map_or_else(Vec::new, |h| {
        h.occupants
            .iter()
            .copied()
            .filter(|id| state.unit(*id).map_or(false, |u| u.faction != faction && !u.is_destroyed()))
            .collect()
    })
}

/// (attack, defense) totals for an engagement.
pub fn engagement_power(state: &GameState, eng: &Engagement, defenders: &[UnitId]) -> (u64, u64) {
    let mut attack: u64 = eng
        .attackers
        .iter()
        .chain(eng.support.iter())
        .filter_map(|id| state.unit(*id))
        .map(|u| attack_power(state, u))
        .sum();
    if close_air_support(state, eng.faction) {
        attack = scale(attack, state.reference.modifiers.close_air_support_pct);
    }

    let mut defense: u64 = defenders.iter().filter_map(|id| state.unit(*id)).map(|u| defense_power(state, u)).sum();
    if let Some(hex) = state.hex(eng.target) {
        defense = scale(defense, state.reference.terrain_def(hex.terrain).defense_pct);
    }
    (attack, defense)
}

pub fn odds_ratio_pct(attack: u64, defense: u64) -> u64 {
    if defense == 0 {
        u64::MAX
    } else {
        attack.saturating_mul(100) / defense
    }
}

/// The table roll for an engagement: pinned without a seed, otherwise a
/// die roll keyed by (seed, turn, engagement index).
pub fn combat_roll(state: &GameState, index: u32) -> u8 {
    let table = &state.reference.odds_table;
    match state.seed {
        None => table.pinned_roll,
        Some(seed) => {
            let key = seed ^ ((state.turn as u64) << 40) ^ ((index as u64) << 8).rotate_left(17);
            let mut rng = ChaCha8Rng::seed_from_u64(key);
            rng.gen_range(1..=table.die_sides)
        }
    }
}

fn losses_for(state: &GameState, ids: &[UnitId], pct: u8, wiped: bool) -> Vec<(UnitId, u8)> {
    ids.iter()
        .filter_map(|id| state.unit(*id))
        .map(|u| {
            let loss = if wiped { u.strength } else { ((u.strength as u32 * pct as u32 + 50) / 100) as u8 };
            (u.id, loss.min(u.strength))
        })
        .collect()
}

/// Resolve one engagement against the frozen snapshot. Retreats and
/// capture are filled in later, when the result is applied.
pub fn resolve_engagement(snapshot: &GameState, eng: &Engagement) -> EngagementReport {
    let defenders = defenders_of(snapshot, eng.faction, eng.target);
    let (attack, defense) = engagement_power(snapshot, eng, &defenders);
    let ratio = odds_ratio_pct(attack, defense);
    let table = &snapshot.reference.odds_table;

    let mut report = EngagementReport {
        index: eng.index,
        faction: eng.faction,
        target: eng.target,
        attackers: eng.attackers.clone(),
        defenders: defenders.clone(),
        support: eng.support.clone(),
        attack_power: attack,
        defense_power: defense,
        ratio_pct: ratio,
        column: String::new(),
        roll: 0,
        result: None,
        losses: Vec::new(),
        retreats: Vec::new(),
        captured: false,
    };
    if defenders.is_empty() {
        return report;
    }

    let roll = combat_roll(snapshot, eng.index);
    let (column, result) = table
        .lookup(ratio, roll)
        .unwrap_or_else(|| panic!("validated odds table has no cell for ratio {} roll {}", ratio, roll));
    report.column = table.columns[column].label.clone();
    report.roll = roll;
    report.result = Some(result);
    report.losses = losses_for(
        snapshot,
        &eng.attackers,
        result.attacker_loss_pct,
        result.outcome == OutcomeClass::AttackerDestroyed,
    );
    report.losses.extend(losses_for(
        snapshot,
        &defenders,
        result.defender_loss_pct,
        result.outcome == OutcomeClass::DefenderDestroyed,
    ));
    report
}

// ── Application ────────────────────────────────────────────────────────

/// Retreat destination: adjacent, passable, friendly-controlled, free of
/// enemy units and with stacking room. Lowest coordinate wins.
pub fn retreat_destination(state: &GameState, unit: &Unit) -> Option<HexCoord> {
    state.grid.neighbors(unit.position).into_iter().find(|&n| {
        units::is_passable(state, n)
            && state.hex(n).map_or(false, |h| h.owner == Some(unit.faction))
            && !state.has_enemy_units(n, unit.faction)
            && units::has_room(state, n)
    })
}

fn apply_retreats(state: &mut GameState, ids: &[UnitId], from: HexCoord) -> Vec<(UnitId, Option<HexCoord>)> {
    let mut out = Vec::new();
    for &id in ids {
        let Some(unit) = state.unit(id) else { continue };
        if unit.is_destroyed() || unit.position != from {
            continue;
        }
        match retreat_destination(state, unit) {
            Some(to) => {
                units::relocate(state, id, to);
                debug!(unit = %id, %from, %to, "unit retreats");
                out.push((id, Some(to)));
            }
            None => {
                units::destroy(state, id);
                debug!(unit = %id, %from, "no line of retreat, unit destroyed");
                out.push((id, None));
            }
        }
    }
    out
}

/// Resolve every engagement of the turn and apply the results.
/// The caller is responsible for phase checks and for flushing destroyed units.
pub fn resolve_all(state: &mut GameState) -> CombatReport {
    let (engagements, rejected) = build_engagements(state);
    for (decl, err) in rejected {
        debug!(target = %decl.target, faction = %decl.faction, %err, "engagement rejected");
        state.record(LogEvent::EngagementRejected { faction: decl.faction, target: decl.target, reason: err.to_string() });
    }

    let snapshot = state.clone();
    let mut reports: Vec<EngagementReport> = engagements.iter().map(|e| resolve_engagement(&snapshot, e)).collect();

    // Losses: summed per unit, clamped at current strength.
    let mut totals: BTreeMap<UnitId, u32> = BTreeMap::new();
    for report in &reports {
        for &(id, loss) in &report.losses {
            *totals.entry(id).or_default() += loss as u32;
        }
    }
    for (id, loss) in totals {
        units::apply_casualties(state, id, loss.min(u8::MAX as u32) as u8);
    }

    for report in reports.iter_mut() {
        match report.outcome() {
            Some(OutcomeClass::DefenderRetreats) => {
                report.retreats = apply_retreats(state, &report.defenders, report.target);
            }
            Some(OutcomeClass::AttackerRetreats) => {
                for id in &report.attackers {
                    if let Some(u) = state.unit_mut(*id) {
                        u.flags.repulsed = true;
                    }
                }
            }
            _ => {}
        }

        let attackers_alive = report.attackers.iter().any(|id| state.unit(*id).map_or(false, |u| !u.is_destroyed()));
        let defenders_left = state.has_enemy_units(report.target, report.faction);
        if attackers_alive && !defenders_left {
            report.captured = true;
            units::claim_hex(state, report.target, report.faction);
        }

        info!(
            target = %report.target,
            faction = %report.faction,
            ratio = report.ratio_pct,
            roll = report.roll,
            result = %report.result.map_or_else(|| "unopposed".to_string(), |r| r.to_string()),
            captured = report.captured,
            "engagement resolved"
        );
        state.record(LogEvent::Engagement(report.clone()));
    }

    state.declared_attacks.clear();
    state.declared_support.clear();

    let mut destroyed = state.pending_removal.clone();
    destroyed.sort();
    CombatReport { engagements: reports, destroyed }
}
