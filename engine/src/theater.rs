// ═══════════════════════════════════════════════════════════════════════
// Built-in theater — Taiwan Strait map, order of battle, reference tables
// ═══════════════════════════════════════════════════════════════════════
//
// The default data set every run starts from unless JSON overrides are
// supplied. The map is 10 columns (A–J) by 13 rows in odd-q offset layout.

use crate::reference::{
    BattalionTemplate, CombatModifiers, CombatResult, EquipmentDef, HexDef, InterdictionPlan, OddsColumn, OddsRow,
    OddsTable, ReferenceData, Scenario, ScenarioRules, TemplateLine, TerrainDef, UnitPlacement, UnitTypeDef,
};
use crate::types::{Faction, HexFeatures, Reinforcement, TerrainType, UnitType};

// ── Key hexes ──────────────────────────────────────────────────────────

pub const TAIPEI: &str = "A10";
pub const TAICHUNG: &str = "D5";
pub const KAOHSIUNG: &str = "G2";
pub const HUALIEN: &str = "H9";
pub const LINKOU_BEACH: &str = "B12";
pub const WEST_COAST_BEACH: &str = "C12";

/// Depots that feed supply lines regardless of port or airfield status.
pub const DEPOTS: &[&str] = &[TAIPEI, TAICHUNG, KAOHSIUNG, HUALIEN];

/// Coastal hexes held by the PLA when the game opens.
pub const PLA_LODGMENT: &[&str] = &[LINKOU_BEACH, WEST_COAST_BEACH];

// ── Map table ──────────────────────────────────────────────────────────

const PORT: u8 = 1;
const AIRFIELD: u8 = 2;
const VP: u8 = 4;

use TerrainType::*;

#[rustfmt::skip]
const MAP: &[(&str, &str, TerrainType, u8)] = &[
    ("A1", "North Coast", Coastal, 0),
    ("A2", "North Coast", Coastal, 0),
    ("A3", "North Hills", Hills, 0),
    ("A4", "North Hills", Hills, 0),
    ("A5", "North Mountains", Mountain, 0),
    ("A6", "North Mountains", Mountain, 0),
    ("A7", "North Mountains", Mountain, 0),
    ("A8", "Yilan Plain", Plains, AIRFIELD),
    ("A9", "Keelung", Urban, PORT),
    ("A10", "Taipei", Urban, PORT | AIRFIELD | VP),
    ("A11", "New Taipei", Urban, 0),
    ("A12", "Matsu Islands", Coastal, PORT | AIRFIELD),
    ("A13", "Kinmen Islands", Coastal, PORT | AIRFIELD),
    ("B1", "West Coast", Coastal, 0),
    ("B2", "West Coast", Coastal, 0),
    ("B3", "Hsinchu Hills", Hills, 0),
    ("B4", "Central Mountains", Mountain, 0),
    ("B5", "Central Mountains", Mountain, 0),
    ("B6", "Central Mountains", Mountain, 0),
    ("B7", "Central Mountains", Mountain, 0),
    ("B8", "Yilan", Urban, 0),
    ("B9", "Taipei Basin", Plains, 0),
    ("B10", "Taoyuan", Plains, AIRFIELD),
    ("B11", "Linkou Plateau", Hills, 0),
    ("B12", "North Coast", Coastal, 0),
    ("B13", "Offshore", Ocean, 0),
    ("C1", "Penghu Channel", Ocean, 0),
    ("C2", "West Coast", Coastal, 0),
    ("C3", "Miaoli Hills", Hills, 0),
    ("C4", "Central Mountains", Mountain, 0),
    ("C5", "Central Mountains", Mountain, 0),
    ("C6", "Central Mountains", Mountain, 0),
    ("C7", "Central Mountains", Mountain, 0),
    ("C8", "East Mountains", Mountain, 0),
    ("C9", "Hualien Valley", Plains, 0),
    ("C10", "Hsinchu", Urban, AIRFIELD),
    ("C11", "Taoyuan Plateau", Hills, 0),
    ("C12", "West Coast", Coastal, 0),
    ("C13", "Offshore", Ocean, 0),
    ("D1", "Penghu Channel", Ocean, 0),
    ("D2", "West Coast", Coastal, PORT),
    ("D3", "Taichung Basin", Plains, 0),
    ("D4", "Central Mountains", Mountain, 0),
    ("D5", "Taichung", Urban, AIRFIELD),
    ("D6", "Central Mt.", Mountain, 0),
    ("D7", "Central Mountains", Mountain, 0),
    ("D8", "East Mountains", Mountain, 0),
    ("D9", "East Rift Valley", Plains, 0),
    ("D10", "Changhua", Plains, 0),
    ("D11", "Yunlin", Plains, 0),
    ("D12", "West Coast", Coastal, 0),
    ("D13", "Offshore", Ocean, 0),
    ("E1", "Penghu Islands", Coastal, PORT | AIRFIELD),
    ("E2", "West Coast", Coastal, 0),
    ("E3", "Chiayi Hills", Hills, 0),
    ("E4", "Alishan", Mountain, 0),
    ("E5", "Central Mountains", Mountain, 0),
    ("E6", "Central Mountains", Mountain, 0),
    ("E7", "Central Mountains", Mountain, 0),
    ("E8", "East Mountains", Mountain, 0),
    ("E9", "East Coast", Coastal, 0),
    ("E10", "Chiayi", Urban, AIRFIELD),
    ("E11", "Tainan Plains", Plains, 0),
    ("E12", "West Coast", Coastal, 0),
    ("E13", "Offshore", Ocean, 0),
    ("F1", "Taiwan Strait", Ocean, 0),
    ("F2", "Anping", Coastal, PORT),
    ("F3", "Tainan", Urban, AIRFIELD),
    ("F4", "Zhuoshui River", RiverCrossing, 0),
    ("F5", "Central Mountains", Mountain, 0),
    ("F6", "Central Mountains", Mountain, 0),
    ("F7", "Central Mountains", Mountain, 0),
    ("F8", "East Mountains", Mountain, 0),
    ("F9", "East Coast", Coastal, 0),
    ("F10", "Tainan County", Plains, 0),
    ("F11", "Kaohsiung Plains", Plains, 0),
    ("F12", "West Coast", Coastal, 0),
    ("F13", "Offshore", Ocean, 0),
    ("G1", "Taiwan Strait", Ocean, 0),
    ("G2", "Kaohsiung", Urban, PORT | AIRFIELD),
    ("G3", "Fengshan", Urban, 0),
    ("G4", "Pingtung Plains", Plains, 0),
    ("G5", "South Mountains", Mountain, 0),
    ("G6", "South Mountains", Mountain, 0),
    ("G7", "South Mountains", Mountain, 0),
    ("G8", "Taitung Coast", Coastal, 0),
    ("G9", "Taitung", Urban, AIRFIELD),
    ("G10", "Green Island", Coastal, AIRFIELD),
    ("G11", "Offshore", Ocean, 0),
    ("G12", "Offshore", Ocean, 0),
    ("G13", "Offshore", Ocean, 0),
    ("H1", "Taiwan Strait", Ocean, 0),
    ("H2", "South Coast", Coastal, 0),
    ("H3", "Pingtung", Urban, AIRFIELD),
    ("H4", "South Mountains", Mountain, 0),
    ("H5", "South Mountains", Mountain, 0),
    ("H6", "South Mountains", Mountain, 0),
    ("H7", "East Coast", Coastal, 0),
    ("H8", "East Coast", Coastal, 0),
    ("H9", "Hualien", Urban, PORT | AIRFIELD),
    ("H10", "Offshore", Ocean, 0),
    ("H11", "Offshore", Ocean, 0),
    ("H12", "Offshore", Ocean, 0),
    ("H13", "Offshore", Ocean, 0),
    ("I1", "Bashi Channel", Ocean, 0),
    ("I2", "Hengchun Peninsula", Coastal, AIRFIELD),
    ("I3", "Kenting", Hills, 0),
    ("I4", "South Mountains", Mountain, 0),
    ("I5", "South Mountains", Mountain, 0),
    ("I6", "East Coast", Coastal, 0),
    ("I7", "East Coast", Coastal, 0),
    ("I8", "East Coast", Coastal, 0),
    ("I9", "Offshore", Ocean, 0),
    ("I10", "Offshore", Ocean, 0),
    ("I11", "Offshore", Ocean, 0),
    ("I12", "Offshore", Ocean, 0),
    ("I13", "Offshore", Ocean, 0),
    ("J1", "Bashi Channel", Ocean, 0),
    ("J2", "South Cape", Coastal, 0),
    ("J3", "Orchid Island", Coastal, AIRFIELD),
    ("J4", "Offshore", Ocean, 0),
    ("J5", "Offshore", Ocean, 0),
    ("J6", "Offshore", Ocean, 0),
    ("J7", "Offshore", Ocean, 0),
    ("J8", "Offshore", Ocean, 0),
    ("J9", "Offshore", Ocean, 0),
    ("J10", "Offshore", Ocean, 0),
    ("J11", "Offshore", Ocean, 0),
    ("J12", "Offshore", Ocean, 0),
    ("J13", "Offshore", Ocean, 0),
];

pub fn hex_defs() -> Vec<HexDef> {
    MAP.iter()
        .map(|&(label, name, terrain, flags)| {
            let owner = if PLA_LODGMENT.contains(&label) {
                Some(Faction::Pla)
            } else if terrain == Ocean {
                None
            } else {
                Some(Faction::Roc)
            };
            HexDef {
                label: label.to_string(),
                name: name.to_string(),
                terrain,
                owner,
                features: HexFeatures {
                    capital: label == TAIPEI,
                    port: flags & PORT != 0,
                    airfield: flags & AIRFIELD != 0,
                    depot: DEPOTS.contains(&label),
                    victory_point: flags & VP != 0,
                },
            }
        })
        .collect()
}

// ── Order of battle ────────────────────────────────────────────────────

fn placement(name: &str, faction: Faction, unit_type: UnitType, strength: u8, at: &str, template: &str) -> UnitPlacement {
    UnitPlacement {
        name: name.to_string(),
        faction,
        unit_type,
        strength,
        at: at.to_string(),
        template: Some(template.to_string()),
        stats: None,
    }
}

pub fn order_of_battle() -> Vec<UnitPlacement> {
    use Faction::{Pla, Roc};
    use UnitType::*;
    vec![
        // PLA first wave, already ashore
        placement("PLA_AMPH_1_BN1", Pla, Armor, 100, LINKOU_BEACH, "PLA_AMPH_ARM_BN"),
        placement("PLA_AMPH_1_BN2", Pla, Mechanized, 100, LINKOU_BEACH, "PLA_AMPH_MECH_BN"),
        placement("PLA_AMPH_2_BN1", Pla, Armor, 100, WEST_COAST_BEACH, "PLA_AMPH_ARM_BN"),
        placement("PLA_AMPH_2_BN2", Pla, Mechanized, 100, WEST_COAST_BEACH, "PLA_AMPH_MECH_BN"),
        // ROC active formations
        placement("ROC_ARM_542_BN1", Roc, Armor, 100, "B10", "ROC_ARM_BN_CM11"),
        placement("ROC_ARM_542_BN2", Roc, Armor, 100, "B10", "ROC_ARM_BN_M60"),
        placement("ROC_ARM_586_BN1", Roc, Armor, 100, TAICHUNG, "ROC_ARM_BN_CM11"),
        placement("ROC_MECH_BN1", Roc, Mechanized, 100, TAIPEI, "ROC_MECH_BN_CM34"),
        placement("ROC_MECH_BN2", Roc, Mechanized, 100, "E10", "ROC_MECH_BN_CM34"),
        placement("ROC_MECH_BN3", Roc, Mechanized, 100, KAOHSIUNG, "ROC_MECH_BN_CM34"),
        placement("ROC_INF_BN1", Roc, Infantry, 100, "C10", "ROC_INF_BN"),
        placement("ROC_INF_BN2", Roc, Infantry, 100, "F3", "ROC_INF_BN"),
        placement("ROC_INF_BN3", Roc, Infantry, 100, HUALIEN, "ROC_INF_BN"),
        // ROC reserves
        placement("ROC_INF_R_TPE1", Roc, Infantry, 80, TAIPEI, "ROC_INF_BN"),
        placement("ROC_INF_R_TPE2", Roc, Infantry, 80, "A11", "ROC_INF_BN"),
        placement("ROC_INF_R_TYN", Roc, Infantry, 80, "B10", "ROC_INF_BN"),
        placement("ROC_INF_R_TCG1", Roc, Infantry, 80, TAICHUNG, "ROC_INF_BN"),
        placement("ROC_INF_R_TCG2", Roc, Infantry, 80, "E5", "ROC_INF_BN"),
        placement("ROC_INF_R_TNN", Roc, Infantry, 80, "F3", "ROC_INF_BN"),
        placement("ROC_INF_R_KHH1", Roc, Infantry, 80, KAOHSIUNG, "ROC_INF_BN"),
        placement("ROC_INF_R_KHH2", Roc, Infantry, 80, "G3", "ROC_INF_BN"),
        placement("ROC_INF_R_PTG", Roc, Infantry, 80, "H3", "ROC_INF_BN"),
        placement("ROC_ARTY_BN1", Roc, Artillery, 100, "C11", "ROC_ARTY_BN_155"),
        placement("ROC_ARTY_BN2", Roc, Artillery, 100, "E11", "ROC_ARTY_BN_203"),
    ]
}

fn reinforcement(name: &str, unit_type: UnitType, lift_cost: u32, template: &str) -> Reinforcement {
    Reinforcement {
        name: name.to_string(),
        unit_type,
        strength: 100,
        lift_cost,
        template: Some(template.to_string()),
        stats: None,
    }
}

/// PLA follow-on echelons, landed in this order as lift allows.
pub fn reinforcement_pool() -> Vec<Reinforcement> {
    use UnitType::*;
    vec![
        reinforcement("PLA_AMPH_1_BN3", Mechanized, 40, "PLA_AMPH_MECH_BN"),
        reinforcement("PLA_AMPH_2_BN3", Mechanized, 40, "PLA_AMPH_MECH_BN"),
        reinforcement("PLA_ARTY_BN1", Artillery, 30, "PLA_ARTY_SPH_BN"),
        reinforcement("PLA_ARTY_BN2", Artillery, 25, "PLA_ARTY_MLRS_BN"),
        reinforcement("PLA_AIRBORNE_BN1", Infantry, 20, "PLA_AIRBORNE_BN"),
        reinforcement("PLA_AIRBORNE_BN2", Infantry, 20, "PLA_AIRBORNE_BN"),
        reinforcement("PLA_ENGINEER_BN1", Engineer, 15, "PLA_ENGINEER_BN"),
        reinforcement("PLA_HELO_BN1", AttackHelo, 35, "PLA_ATTACK_HELO_BN"),
    ]
}

/// Opening air and sea strikes against the ROC rear around Taoyuan.
pub fn interdiction_plan() -> Vec<InterdictionPlan> {
    (1..=3)
        .map(|turn| InterdictionPlan {
            turn,
            target: Faction::Roc,
            hexes: vec!["B10".into(), "B11".into(), "C11".into()],
        })
        .collect()
}

pub fn default_scenario() -> Scenario {
    Scenario {
        name: "Taiwan Strait".to_string(),
        capital: TAIPEI.to_string(),
        hexes: hex_defs(),
        placements: order_of_battle(),
        reinforcements: reinforcement_pool(),
        interdiction: interdiction_plan(),
        rules: ScenarioRules::default(),
    }
}

// ── Reference tables ───────────────────────────────────────────────────

fn unit_type(unit_type: UnitType, attack: u16, defense: u16, movement: u16, zoc: bool, assault: bool, support_range: u32) -> UnitTypeDef {
    UnitTypeDef { unit_type, attack, defense, movement, projects_zoc: zoc, can_assault: assault, support_range }
}

/// Base stats per type, used when a unit has no equipped template.
pub fn unit_types() -> Vec<UnitTypeDef> {
    use UnitType::*;
    vec![
        unit_type(Armor, 15, 12, 6, true, true, 0),
        unit_type(Mechanized, 10, 10, 8, true, true, 0),
        unit_type(Infantry, 8, 12, 4, true, true, 0),
        unit_type(Artillery, 4, 4, 4, false, false, 2),
        unit_type(Engineer, 4, 6, 4, false, false, 0),
        unit_type(AttackHelo, 12, 2, 12, false, true, 0),
    ]
}

fn terrain(terrain: TerrainType, movement_cost: Option<u16>, defense_pct: u16, stacking_limit: u8) -> TerrainDef {
    TerrainDef { terrain, movement_cost, defense_pct, stacking_limit }
}

pub fn terrain_table() -> Vec<TerrainDef> {
    vec![
        terrain(Plains, Some(1), 100, 4),
        terrain(Hills, Some(2), 150, 4),
        terrain(Mountain, Some(4), 180, 2),
        terrain(Urban, Some(2), 200, 4),
        terrain(Forest, Some(2), 130, 3),
        terrain(RiverCrossing, Some(3), 110, 3),
        terrain(Coastal, Some(1), 100, 4),
        terrain(Ocean, None, 100, 0),
    ]
}

#[rustfmt::skip]
const RESULTS: [(u8, u8, [&str; 5]); 5] = [
    (1, 5,   ["A-30/D-0",    "A-20/D-10",    "A-10/D-20",    "A-10/D-30",    "A-0/D-30"]),
    (6, 10,  ["A-20/D-0",    "A-10/D-10",    "A-10/D-20_DR", "A-10/D-20_DR", "A-0/D-20_DR"]),
    (11, 15, ["A-10/D-0",    "A-10/D-10_DR", "A-0/D-30_DR",  "A-0/D-40_DR",  "A-0/D-50_DR"]),
    (16, 19, ["A-10/D-0_AR", "A-0/D-20_DR",  "A-0/D-40_DR",  "A-0/D-50_DR",  "A-0/D-60_DR"]),
    (20, 20, ["A-0/D-0_AX",  "A-0/D-30_DX",  "A-0/D-50_DX",  "A-0/D-60_DX",  "A-0/D-70_DX"]),
];

pub fn odds_table() -> OddsTable {
    let columns = [("1:2", 0), ("1:1", 75), ("2:1", 150), ("3:1", 250), ("4:1+", 350)]
        .iter()
        .map(|&(label, min_ratio_pct)| OddsColumn { label: label.to_string(), min_ratio_pct })
        .collect();
    let rows = RESULTS
        .iter()
        .map(|(roll_min, roll_max, cells)| OddsRow {
            roll_min: *roll_min,
            roll_max: *roll_max,
            results: cells
                .iter()
                .map(|c| c.parse::<CombatResult>().unwrap_or_else(|e| panic!("built-in odds table: {}", e)))
                .collect(),
        })
        .collect();
    OddsTable { columns, rows, die_sides: 20, pinned_roll: 13 }
}

// ── Equipment catalog & battalion templates ────────────────────────────

#[rustfmt::skip]
const EQUIPMENT: &[(&str, &str, u32, bool, u32, u32, u32)] = &[
    // id, name, main gun mm, ATGM, armor rating, engine hp, weight (0.1 t)
    ("PLA_ZTZ99A", "Type 99A",              125, true,  9, 1500, 550),
    ("PLA_ZBD04A", "Type 04A",              100, true,  6,  670, 240),
    ("PLA_ZTD05",  "Type 05 assault gun",   105, true,  5, 1475, 265),
    ("PLA_ZBD05",  "Type 05 IFV",            30, true,  4, 1475, 265),
    ("PLA_PLZ07",  "Type 07 SPH",           122, false, 3,  600, 220),
    ("PLA_PHZ11",  "Type 11 MLRS",          122, false, 3,  450, 200),
    ("ROC_M60A3",  "M60A3 TTS",             105, false, 6,  750, 546),
    ("ROC_CM11",   "CM-11 Brave Tiger",     105, false, 7,  750, 500),
    ("ROC_CM34",   "CM-34 Clouded Leopard",  30, false, 5,  450, 240),
    ("ROC_M109A5", "M109A5",                155, false, 2,  440, 290),
    ("ROC_M110A2", "M110A2",                203, false, 1,  405, 280),
];

#[rustfmt::skip]
const TEMPLATES: &[(&str, UnitType, &[(&str, u32)])] = &[
    ("PLA_AMPH_ARM_BN",    UnitType::Armor,      &[("PLA_ZTD05", 31), ("PLA_ZBD05", 10)]),
    ("PLA_AMPH_MECH_BN",   UnitType::Mechanized, &[("PLA_ZBD05", 42)]),
    ("PLA_ARTY_SPH_BN",    UnitType::Artillery,  &[("PLA_PLZ07", 18)]),
    ("PLA_ARTY_MLRS_BN",   UnitType::Artillery,  &[("PLA_PHZ11", 18)]),
    ("PLA_AIRBORNE_BN",    UnitType::Infantry,   &[]),
    ("PLA_ENGINEER_BN",    UnitType::Engineer,   &[]),
    ("PLA_ATTACK_HELO_BN", UnitType::AttackHelo, &[]),
    ("ROC_ARM_BN_M60",     UnitType::Armor,      &[("ROC_M60A3", 44)]),
    ("ROC_ARM_BN_CM11",    UnitType::Armor,      &[("ROC_CM11", 44)]),
    ("ROC_MECH_BN_CM34",   UnitType::Mechanized, &[("ROC_CM34", 42)]),
    ("ROC_INF_BN",         UnitType::Infantry,   &[]),
    ("ROC_ARTY_BN_155",    UnitType::Artillery,  &[("ROC_M109A5", 18)]),
    ("ROC_ARTY_BN_203",    UnitType::Artillery,  &[("ROC_M110A2", 18)]),
];

pub fn equipment_catalog() -> Vec<EquipmentDef> {
    EQUIPMENT
        .iter()
        .map(|&(id, name, main_gun_mm, has_atgm, armor_rating, engine_hp, weight_dt)| EquipmentDef {
            id: id.to_string(),
            name: name.to_string(),
            main_gun_mm,
            has_atgm,
            armor_rating,
            engine_hp,
            weight_dt,
        })
        .collect()
}

pub fn battalion_templates() -> Vec<BattalionTemplate> {
    TEMPLATES
        .iter()
        .map(|&(id, unit_type, lines)| BattalionTemplate {
            id: id.to_string(),
            unit_type,
            equipment: lines
                .iter()
                .map(|&(equipment, quantity)| TemplateLine { equipment: equipment.to_string(), quantity })
                .collect(),
        })
        .collect()
}

pub fn reference_data() -> ReferenceData {
    ReferenceData {
        unit_types: unit_types(),
        terrain: terrain_table(),
        odds_table: odds_table(),
        modifiers: CombatModifiers {
            isolated_pct: 75,
            out_of_supply_pct: 50,
            entrenched_pct: 150,
            suppressed_pct: 75,
            close_air_support_pct: 120,
        },
        equipment: equipment_catalog(),
        templates: battalion_templates(),
    }
}
