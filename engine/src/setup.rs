// ═══════════════════════════════════════════════════════════════════════
// Game setup — validates reference data + scenario, builds GameState
// ═══════════════════════════════════════════════════════════════════════

use crate::error::{Result, SimError};
use crate::grid::HexGrid;
use crate::reference::{ReferenceData, Scenario};
use crate::theater;
use crate::types::*;
use crate::units;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Run-level settings that are not part of the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_turns: u8,
    /// `None` pins every combat roll; `Some` draws seeded d20 rolls.
    pub seed: Option<u64>,
    pub decision_timeout_ms: Option<u64>,
    pub max_actions_per_decision: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { max_turns: 10, seed: None, decision_timeout_ms: None, max_actions_per_decision: 64 }
    }
}

fn coord_of(label: &str, what: &str) -> Result<HexCoord> {
    HexCoord::from_label(label).ok_or_else(|| SimError::DataIntegrity(format!("{} refers to malformed hex label '{}'", what, label)))
}

fn known_hex(labels: &BTreeMap<String, HexCoord>, label: &str, what: &str) -> Result<HexCoord> {
    labels
        .get(label)
        .copied()
        .ok_or_else(|| SimError::DataIntegrity(format!("{} refers to unknown hex {}", what, label)))
}

/// Explicit stats win; otherwise a template derives them. `None` leaves
/// the unit type's defaults to `spawn_unit`.
fn base_stats(
    reference: &ReferenceData,
    name: &str,
    unit_type: UnitType,
    template: Option<&str>,
    stats: Option<UnitStats>,
) -> Result<Option<UnitStats>> {
    if stats.is_some() {
        return Ok(stats);
    }
    let Some(id) = template else {
        return Ok(None);
    };
    let t = reference
        .template(id)
        .ok_or_else(|| SimError::DataIntegrity(format!("{} uses unknown template {}", name, id)))?;
    if t.unit_type != unit_type {
        return Err(SimError::DataIntegrity(format!("{} is {} but template {} is {}", name, unit_type, id, t.unit_type)));
    }
    reference.template_stats(t).map(Some)
}

/// Build turn 1, phase `AirSea` from reference data and a scenario.
/// Any missing table entry or dangling hex reference is a `DataIntegrity`
/// error; nothing is created in that case.
pub fn create_initial_state(reference: &ReferenceData, scenario: &Scenario, config: &EngineConfig) -> Result<GameState> {
    reference.validate()?;
    if config.max_turns == 0 {
        return Err(SimError::DataIntegrity("max_turns must be at least 1".into()));
    }

    // ── Map ────────────────────────────────────────────────────────────
    let mut labels: BTreeMap<String, HexCoord> = BTreeMap::new();
    let mut seen: BTreeSet<HexCoord> = BTreeSet::new();
    let mut hexes = Vec::with_capacity(scenario.hexes.len());
    for def in &scenario.hexes {
        let coord = coord_of(&def.label, "hex table")?;
        if reference.terrain(def.terrain).is_none() {
            return Err(SimError::DataIntegrity(format!("no reference entry for terrain {:?} (hex {})", def.terrain, def.label)));
        }
        if !seen.insert(coord) || labels.insert(def.label.clone(), coord).is_some() {
            return Err(SimError::DataIntegrity(format!("hex {} defined twice", def.label)));
        }
        hexes.push(Hex {
            coord,
            label: def.label.clone(),
            name: def.name.clone(),
            terrain: def.terrain,
            owner: def.owner,
            features: def.features,
            occupants: Vec::new(),
        });
    }
    if hexes.is_empty() {
        return Err(SimError::DataIntegrity("scenario has no hexes".into()));
    }
    let capital = known_hex(&labels, &scenario.capital, "capital")?;

    // ── Reinforcement pool ─────────────────────────────────────────────
    let mut reinforcement_pool = Vec::with_capacity(scenario.reinforcements.len());
    for r in &scenario.reinforcements {
        if reference.unit_type(r.unit_type).is_none() {
            return Err(SimError::DataIntegrity(format!("no reference entry for unit type {} ({})", r.unit_type, r.name)));
        }
        units::check_strength(&r.name, r.strength)?;
        let stats = base_stats(reference, &r.name, r.unit_type, r.template.as_deref(), r.stats)?;
        reinforcement_pool.push(Reinforcement { stats, ..r.clone() });
    }
    if !reinforcement_pool.is_empty() && !reference.terrain(TerrainType::Coastal).map_or(false, |t| t.is_passable()) {
        return Err(SimError::DataIntegrity("reinforcements have no passable coastal terrain to land on".into()));
    }

    let mut interdiction_plan = Vec::with_capacity(scenario.interdiction.len());
    for plan in &scenario.interdiction {
        let mut hexes = Vec::with_capacity(plan.hexes.len());
        for label in &plan.hexes {
            hexes.push(known_hex(&labels, label, "interdiction plan")?);
        }
        hexes.sort();
        hexes.dedup();
        interdiction_plan.push(Interdiction { turn: plan.turn, target: plan.target, hexes });
    }

    let mut state = GameState {
        turn: 1,
        phase: Phase::AirSea,
        seed: config.seed,
        grid: HexGrid::new(hexes),
        units: BTreeMap::new(),
        next_unit_id: 1,
        capital,
        supply_sources: BTreeMap::new(),
        interdicted: Vec::new(),
        interdiction_plan,
        declared_attacks: Vec::new(),
        declared_support: Vec::new(),
        committed: Vec::new(),
        pending: None,
        reinforcement_pool,
        lift_capacity: scenario.rules.initial_lift_capacity,
        pending_removal: Vec::new(),
        destroyed: Vec::new(),
        log: Vec::new(),
        timeline: Vec::new(),
        outcome: None,
        reference: reference.clone(),
        rules: scenario.rules.clone(),
        max_turns: config.max_turns,
        max_actions_per_decision: config.max_actions_per_decision,
        decision_timeout_ms: config.decision_timeout_ms,
    };

    // ── Units ──────────────────────────────────────────────────────────
    for p in &scenario.placements {
        let at = known_hex(&labels, &p.at, &format!("placement of {}", p.name))?;
        let stats = base_stats(reference, &p.name, p.unit_type, p.template.as_deref(), p.stats)?;
        units::spawn_unit(&mut state, &p.name, p.faction, p.unit_type, p.strength, stats, at)?;
    }

    state.record(LogEvent::PhaseStarted);
    info!(
        scenario = %scenario.name,
        hexes = state.grid.len(),
        units = state.units.len(),
        reinforcements = state.reinforcement_pool.len(),
        seed = ?config.seed,
        "initial state created"
    );
    Ok(state)
}

/// The built-in Taiwan Strait theater with the given run settings.
pub fn default_game(config: &EngineConfig) -> Result<GameState> {
    create_initial_state(&theater::reference_data(), &theater::default_scenario(), config)
}
