// ═══════════════════════════════════════════════════════════════════════
// Reference data — unit types, terrain, odds table, modifiers, scenarios
// ═══════════════════════════════════════════════════════════════════════
//
// Every numeric rule of the simulation lives here as data. The engine reads
// these tables but never hard-codes their values. All multipliers are
// integer percentages so combat arithmetic stays exact.

use crate::error::{Result, SimError};
use crate::types::{Faction, HexFeatures, Reinforcement, TerrainType, UnitStats, UnitType};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Unit types & terrain ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeDef {
    pub unit_type: UnitType,
    pub attack: u16,
    pub defense: u16,
    pub movement: u16,
    /// Adjacent enemy hexes become contested and halt movement.
    pub projects_zoc: bool,
    /// May be listed as an attacker in an engagement.
    pub can_assault: bool,
    /// Range of artillery support; 0 means the type cannot support.
    #[serde(default)]
    pub support_range: u32,
}

impl UnitTypeDef {
    pub fn stats(&self) -> UnitStats {
        UnitStats { attack: self.attack, defense: self.defense, movement: self.movement }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainDef {
    pub terrain: TerrainType,
    /// Movement points to enter; `None` is impassable.
    pub movement_cost: Option<u16>,
    /// Defender multiplier in percent (100 = ×1.0).
    pub defense_pct: u16,
    pub stacking_limit: u8,
}

impl TerrainDef {
    pub fn is_passable(&self) -> bool {
        self.movement_cost.is_some()
    }
}

// ── Equipment & battalion templates ────────────────────────────────────

const EQUIPMENT_RATING_MAX: u32 = 20;

/// One vehicle or weapon system. Weight is in tenths of a tonne.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub main_gun_mm: u32,
    #[serde(default)]
    pub has_atgm: bool,
    #[serde(default)]
    pub armor_rating: u32,
    #[serde(default)]
    pub engine_hp: u32,
    #[serde(default)]
    pub weight_dt: u32,
}

impl EquipmentDef {
    /// Calibre / 10 + engine hp / 200, plus 3 with ATGMs; 1..=20.
    pub fn attack_rating(&self) -> u32 {
        let atgm = if self.has_atgm { 3 } else { 0 };
        ((self.main_gun_mm * 20 + self.engine_hp) / 200 + atgm).clamp(1, EQUIPMENT_RATING_MAX)
    }

    /// Armor × 1.5 + tonnes / 10; 1..=20.
    pub fn defense_rating(&self) -> u32 {
        ((self.armor_rating * 150 + self.weight_dt) / 100).clamp(1, EQUIPMENT_RATING_MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLine {
    pub equipment: String,
    pub quantity: u32,
}

/// Standard battalion organisation. A template with no equipment lines
/// uses its unit type's base stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattalionTemplate {
    pub id: String,
    pub unit_type: UnitType,
    #[serde(default)]
    pub equipment: Vec<TemplateLine>,
}

// ── Combat results ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeClass {
    NoEffect,
    Exchange,
    DefenderRetreats,
    AttackerRetreats,
    DefenderDestroyed,
    AttackerDestroyed,
}

/// One cell of the odds table, written `A-10/D-20_DR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CombatResult {
    pub attacker_loss_pct: u8,
    pub defender_loss_pct: u8,
    pub outcome: OutcomeClass,
}

impl FromStr for CombatResult {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || SimError::DataIntegrity(format!("malformed combat result '{}'", s));
        let (att, def) = s.split_once('/').ok_or_else(bad)?;
        let (def, suffix) = match def.split_once('_') {
            Some((d, suf)) => (d, Some(suf)),
            None => (def, None),
        };
        let attacker_loss_pct: u8 = att.strip_prefix("A-").and_then(|n| n.parse().ok()).ok_or_else(bad)?;
        let defender_loss_pct: u8 = def.strip_prefix("D-").and_then(|n| n.parse().ok()).ok_or_else(bad)?;
        if attacker_loss_pct > 100 || defender_loss_pct > 100 {
            return Err(bad());
        }
        let outcome = match suffix {
            Some("DR") => OutcomeClass::DefenderRetreats,
            Some("AR") => OutcomeClass::AttackerRetreats,
            Some("DX") => OutcomeClass::DefenderDestroyed,
            Some("AX") => OutcomeClass::AttackerDestroyed,
            Some(_) => return Err(bad()),
            None if attacker_loss_pct > 0 && defender_loss_pct > 0 => OutcomeClass::Exchange,
            None => OutcomeClass::NoEffect,
        };
        Ok(CombatResult { attacker_loss_pct, defender_loss_pct, outcome })
    }
}

impl std::fmt::Display for CombatResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "A-{}/D-{}", self.attacker_loss_pct, self.defender_loss_pct)?;
        match self.outcome {
            OutcomeClass::DefenderRetreats => write!(f, "_DR"),
            OutcomeClass::AttackerRetreats => write!(f, "_AR"),
            OutcomeClass::DefenderDestroyed => write!(f, "_DX"),
            OutcomeClass::AttackerDestroyed => write!(f, "_AX"),
            OutcomeClass::NoEffect | OutcomeClass::Exchange => Ok(()),
        }
    }
}

impl TryFrom<String> for CombatResult {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CombatResult> for String {
    fn from(r: CombatResult) -> String {
        r.to_string()
    }
}

// ── Odds table ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsColumn {
    pub label: String,
    /// Lowest attack:defense ratio (×100) that selects this column.
    pub min_ratio_pct: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsRow {
    pub roll_min: u8,
    pub roll_max: u8,
    pub results: Vec<CombatResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsTable {
    pub columns: Vec<OddsColumn>,
    pub rows: Vec<OddsRow>,
    pub die_sides: u8,
    /// Roll used when no seed is configured.
    pub pinned_roll: u8,
}

impl OddsTable {
    /// Index of the column for a ratio (×100).
    pub fn column_for(&self, ratio_pct: u64) -> usize {
        self.columns.iter().rposition(|c| c.min_ratio_pct <= ratio_pct).unwrap_or(0)
    }

    pub fn row_for(&self, roll: u8) -> Option<&OddsRow> {
        self.rows.iter().find(|r| r.roll_min <= roll && roll <= r.roll_max)
    }

    pub fn lookup(&self, ratio_pct: u64, roll: u8) -> Option<(usize, CombatResult)> {
        let column = self.column_for(ratio_pct);
        let row = self.row_for(roll)?;
        row.results.get(column).map(|r| (column, *r))
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SimError::DataIntegrity(msg));
        if self.columns.is_empty() {
            return fail("odds table has no columns".into());
        }
        if self.columns[0].min_ratio_pct != 0 {
            return fail("first odds column must start at ratio 0".into());
        }
        if self.columns.windows(2).any(|w| w[0].min_ratio_pct >= w[1].min_ratio_pct) {
            return fail("odds column thresholds must be strictly ascending".into());
        }
        if self.die_sides == 0 {
            return fail("odds table die has no sides".into());
        }
        let mut expected = 1u8;
        for row in &self.rows {
            if row.roll_min != expected || row.roll_max < row.roll_min {
                return fail(format!("odds rows leave roll {} uncovered", expected));
            }
            if row.results.len() != self.columns.len() {
                return fail(format!(
                    "odds row {}-{} has {} results for {} columns",
                    row.roll_min,
                    row.roll_max,
                    row.results.len(),
                    self.columns.len()
                ));
            }
            expected = row.roll_max.saturating_add(1);
        }
        if expected != self.die_sides.saturating_add(1) {
            return fail(format!("odds rows do not cover rolls 1..={}", self.die_sides));
        }
        if self.pinned_roll == 0 || self.pinned_roll > self.die_sides {
            return fail(format!("pinned roll {} is off the die", self.pinned_roll));
        }
        Ok(())
    }
}

// ── Modifiers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatModifiers {
    pub isolated_pct: u16,
    pub out_of_supply_pct: u16,
    pub entrenched_pct: u16,
    pub suppressed_pct: u16,
    pub close_air_support_pct: u16,
}

// ── Reference bundle ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub unit_types: Vec<UnitTypeDef>,
    pub terrain: Vec<TerrainDef>,
    pub odds_table: OddsTable,
    pub modifiers: CombatModifiers,
    #[serde(default)]
    pub equipment: Vec<EquipmentDef>,
    #[serde(default)]
    pub templates: Vec<BattalionTemplate>,
}

impl ReferenceData {
    pub fn unit_type(&self, unit_type: UnitType) -> Option<&UnitTypeDef> {
        self.unit_types.iter().find(|d| d.unit_type == unit_type)
    }

    pub fn terrain(&self, terrain: TerrainType) -> Option<&TerrainDef> {
        self.terrain.iter().find(|d| d.terrain == terrain)
    }

    pub fn equipment(&self, id: &str) -> Option<&EquipmentDef> {
        self.equipment.iter().find(|e| e.id == id)
    }

    pub fn template(&self, id: &str) -> Option<&BattalionTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Quantity-weighted mean of the template's equipment ratings, with the
    /// unit type's movement allowance.
    pub fn template_stats(&self, template: &BattalionTemplate) -> Result<UnitStats> {
        let base = self
            .unit_type(template.unit_type)
            .ok_or_else(|| {
                SimError::DataIntegrity(format!("template {} uses unit type {} with no reference entry", template.id, template.unit_type))
            })?
            .stats();
        let (mut attack, mut defense, mut count) = (0u64, 0u64, 0u64);
        for line in template.equipment.iter().filter(|l| l.quantity > 0) {
            let eq = self.equipment(&line.equipment).ok_or_else(|| {
                SimError::DataIntegrity(format!("template {} lists unknown equipment {}", template.id, line.equipment))
            })?;
            attack += eq.attack_rating() as u64 * line.quantity as u64;
            defense += eq.defense_rating() as u64 * line.quantity as u64;
            count += line.quantity as u64;
        }
        if count == 0 {
            return Ok(base);
        }
        Ok(UnitStats { attack: (attack / count) as u16, defense: (defense / count) as u16, movement: base.movement })
    }

    /// Lookup used after setup validation; a miss is a broken invariant.
    pub(crate) fn unit_def(&self, unit_type: UnitType) -> &UnitTypeDef {
        self.unit_type(unit_type)
            .unwrap_or_else(|| panic!("unit type {} vanished from validated reference data", unit_type))
    }

    pub(crate) fn terrain_def(&self, terrain: TerrainType) -> &TerrainDef {
        self.terrain(terrain)
            .unwrap_or_else(|| panic!("terrain {:?} vanished from validated reference data", terrain))
    }

    pub fn validate(&self) -> Result<()> {
        for (i, def) in self.unit_types.iter().enumerate() {
            if self.unit_types[..i].iter().any(|d| d.unit_type == def.unit_type) {
                return Err(SimError::DataIntegrity(format!("unit type {} defined twice", def.unit_type)));
            }
        }
        for (i, def) in self.terrain.iter().enumerate() {
            if self.terrain[..i].iter().any(|d| d.terrain == def.terrain) {
                return Err(SimError::DataIntegrity(format!("terrain {:?} defined twice", def.terrain)));
            }
        }
        for (i, def) in self.equipment.iter().enumerate() {
            if self.equipment[..i].iter().any(|e| e.id == def.id) {
                return Err(SimError::DataIntegrity(format!("equipment {} defined twice", def.id)));
            }
        }
        for (i, def) in self.templates.iter().enumerate() {
            if self.templates[..i].iter().any(|t| t.id == def.id) {
                return Err(SimError::DataIntegrity(format!("template {} defined twice", def.id)));
            }
            self.template_stats(def)?;
        }
        self.odds_table.validate()
    }
}

// ── Scenario ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexDef {
    pub label: String,
    pub name: String,
    pub terrain: TerrainType,
    #[serde(default)]
    pub owner: Option<Faction>,
    #[serde(default)]
    pub features: HexFeatures,
}

fn full_strength() -> u8 {
    crate::types::FULL_STRENGTH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    pub name: String,
    pub faction: Faction,
    pub unit_type: UnitType,
    #[serde(default = "full_strength")]
    pub strength: u8,
    /// Hex label, e.g. `B10`.
    pub at: String,
    /// Battalion template the base stats derive from.
    #[serde(default)]
    pub template: Option<String>,
    /// Overrides both the template and the unit type's base stats.
    #[serde(default)]
    pub stats: Option<UnitStats>,
}

/// Hexes denied to one faction's supply lines on a given turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterdictionPlan {
    pub turn: u8,
    pub target: Faction,
    pub hexes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRules {
    pub max_supply_range: u32,
    /// PLA coastal hexes count as supply sources through this turn.
    pub beachhead_supply_turns: u8,
    pub initial_lift_capacity: u32,
    pub lift_decay_pct: u8,
    pub lift_decay_turns: u8,
    /// PLA attacks receive close air support through this turn.
    pub close_air_support_turns: u8,
    pub pla_refit_per_turn: u8,
    pub roc_refit_per_turn: u8,
}

impl ScenarioRules {
    pub fn refit_per_turn(&self, faction: Faction) -> u8 {
        match faction {
            Faction::Pla => self.pla_refit_per_turn,
            Faction::Roc => self.roc_refit_per_turn,
        }
    }
}

impl Default for ScenarioRules {
    fn default() -> Self {
        ScenarioRules {
            max_supply_range: 10,
            beachhead_supply_turns: 3,
            initial_lift_capacity: 300,
            lift_decay_pct: 25,
            lift_decay_turns: 4,
            close_air_support_turns: 10,
            pla_refit_per_turn: 0,
            roc_refit_per_turn: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Label of the hex whose capture wins the game for PLA.
    pub capital: String,
    pub hexes: Vec<HexDef>,
    pub placements: Vec<UnitPlacement>,
    #[serde(default)]
    pub reinforcements: Vec<Reinforcement>,
    #[serde(default)]
    pub interdiction: Vec<InterdictionPlan>,
    #[serde(default)]
    pub rules: ScenarioRules,
}
