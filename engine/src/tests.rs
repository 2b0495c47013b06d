// ═══════════════════════════════════════════════════════════════════════
// Test suite for the ground-combat engine
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::combat;
    use crate::engine::{advance, legal_actions, record_timeout, resolve_combat_phase, submit_actions};
    use crate::error::SimError;
    use crate::grid::Step;
    use crate::reference::*;
    use crate::setup::{create_initial_state, default_game, EngineConfig};
    use crate::snapshot::{self, GameSnapshot};
    use crate::theater;
    use crate::types::*;
    use crate::visibility::state_view;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    // ── Helpers: small synthetic theaters ───────────────────────────────

    fn c(label: &str) -> HexCoord {
        HexCoord::from_label(label).unwrap()
    }

    fn stats(attack: u16, defense: u16, movement: u16) -> Option<UnitStats> {
        Some(UnitStats { attack, defense, movement })
    }

    fn unit(name: &str, faction: Faction, unit_type: UnitType, at: &str, s: Option<UnitStats>) -> UnitPlacement {
        UnitPlacement { name: name.into(), faction, unit_type, strength: 100, at: at.into(), template: None, stats: s }
    }

    fn reinforcement(name: &str, unit_type: UnitType, lift_cost: u32) -> Reinforcement {
        Reinforcement { name: name.into(), unit_type, strength: 100, lift_cost, template: None, stats: None }
    }

    /// `cols` × `rows` map; `hex` decides terrain, owner and depot per label.
    fn scenario(
        cols: u8,
        rows: i32,
        hex: impl Fn(&str) -> (TerrainType, Option<Faction>, bool),
        placements: Vec<UnitPlacement>,
    ) -> Scenario {
        let mut hexes = Vec::new();
        for col in 0..cols {
            for row in 1..=rows {
                let label = format!("{}{}", (b'A' + col) as char, row);
                let (terrain, owner, depot) = hex(&label);
                hexes.push(HexDef {
                    label: label.clone(),
                    name: label,
                    terrain,
                    owner,
                    features: HexFeatures { depot, ..HexFeatures::default() },
                });
            }
        }
        Scenario {
            name: "test".into(),
            capital: "B2".into(),
            hexes,
            placements,
            reinforcements: Vec::new(),
            interdiction: Vec::new(),
            rules: ScenarioRules {
                close_air_support_turns: 0,
                initial_lift_capacity: 0,
                beachhead_supply_turns: 0,
                lift_decay_turns: 0,
                ..ScenarioRules::default()
            },
        }
    }

    /// 3×3 plains: column A is PLA, the rest ROC. A2 and B2 are depots.
    /// PLA Armor (attack 8) at A2 faces ROC Infantry (defense 6) at B2.
    fn duel() -> Scenario {
        scenario(
            3,
            3,
            |l| {
                let owner = if l.starts_with('A') { Faction::Pla } else { Faction::Roc };
                (TerrainType::Plains, Some(owner), l == "A2" || l == "B2")
            },
            vec![
                unit("PLA_ARM", Faction::Pla, UnitType::Armor, "A2", stats(8, 8, 6)),
                unit("ROC_INF", Faction::Roc, UnitType::Infantry, "B2", stats(4, 6, 4)),
            ],
        )
    }

    fn start(s: &Scenario) -> GameState {
        start_with(s, &EngineConfig::default())
    }

    fn start_with(s: &Scenario, config: &EngineConfig) -> GameState {
        let mut state = create_initial_state(&theater::reference_data(), s, config).unwrap();
        advance(&mut state).unwrap();
        state
    }

    /// Submit both batches of the current turn, leaving the engine at
    /// CombatResolution.
    fn commit_turn(state: &mut GameState, pla: Vec<Action>, roc: Vec<Action>) {
        submit_actions(state, Faction::Pla, pla).unwrap();
        advance(state).unwrap();
        submit_actions(state, Faction::Roc, roc).unwrap();
    }

    fn pass_turn(state: &mut GameState) {
        commit_turn(state, vec![], vec![]);
        let _ = advance(state);
    }

    const PLA_ARM: UnitId = UnitId(1);
    const ROC_INF: UnitId = UnitId(2);

    // ═══════════════════════════════════════════════════════════════════
    // SETUP & REFERENCE DATA TESTS
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn test_offset_labels_to_axial() {
        assert_eq!(c("A10"), HexCoord::new(0, 10));
        assert_eq!(c("B12"), HexCoord::new(1, 12));
        assert_eq!(c("C1"), HexCoord::new(2, 0));
        assert_eq!(c("D3"), HexCoord::new(3, 2));
        assert!(HexCoord::from_label("a1").is_none());
        assert!(HexCoord::from_label("Q").is_none());
    }

    #[test]
    fn test_combat_result_parsing() {
        let r: CombatResult = "A-10/D-20_DR".parse().unwrap();
        assert_eq!((r.attacker_loss_pct, r.defender_loss_pct), (10, 20));
        assert_eq!(r.outcome, OutcomeClass::DefenderRetreats);
        assert_eq!("A-20/D-10".parse::<CombatResult>().unwrap().outcome, OutcomeClass::Exchange);
        assert_eq!("A-30/D-0".parse::<CombatResult>().unwrap().outcome, OutcomeClass::NoEffect);
        assert_eq!("A-0/D-0_AX".parse::<CombatResult>().unwrap().outcome, OutcomeClass::AttackerDestroyed);
        assert_eq!(r.to_string(), "A-10/D-20_DR");
        assert!(matches!("A-10/D-20_XX".parse::<CombatResult>(), Err(SimError::DataIntegrity(_))));
        assert!(matches!("D-10".parse::<CombatResult>(), Err(SimError::DataIntegrity(_))));
    }

    #[test]
    fn test_default_reference_data_is_valid() {
        let reference = theater::reference_data();
        reference.validate().unwrap();
        let table = &reference.odds_table;
        assert_eq!(table.column_for(0), 0);
        assert_eq!(table.column_for(74), 0);
        assert_eq!(table.column_for(75), 1);
        assert_eq!(table.column_for(149), 1);
        assert_eq!(table.column_for(150), 2);
        assert_eq!(table.column_for(350), 4);
        assert_eq!(table.column_for(u64::MAX), 4);
        assert_eq!(table.row_for(table.pinned_roll).unwrap().roll_min, 11);
    }

    #[test]
    fn test_missing_terrain_entry_is_data_integrity() {
        let mut reference = theater::reference_data();
        reference.terrain.retain(|t| t.terrain != TerrainType::Ocean);
        let err = create_initial_state(&reference, &theater::default_scenario(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, SimError::DataIntegrity(_)));
    }

    #[test]
    fn test_missing_unit_type_entry_is_data_integrity() {
        let mut reference = theater::reference_data();
        reference.unit_types.retain(|t| t.unit_type != UnitType::AttackHelo);
        let err = create_initial_state(&reference, &theater::default_scenario(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, SimError::DataIntegrity(_)));
    }

    #[test]
    fn test_dangling_hex_references_rejected() {
        let mut s = duel();
        s.placements[0].at = "Z9".into();
        assert!(matches!(
            create_initial_state(&theater::reference_data(), &s, &EngineConfig::default()),
            Err(SimError::DataIntegrity(_))
        ));

        let mut s = duel();
        s.capital = "C9".into();
        assert!(matches!(
            create_initial_state(&theater::reference_data(), &s, &EngineConfig::default()),
            Err(SimError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_broken_odds_table_rejected() {
        let mut reference = theater::reference_data();
        reference.odds_table.rows.pop();
        assert!(matches!(reference.validate(), Err(SimError::DataIntegrity(_))));

        let mut reference = theater::reference_data();
        reference.odds_table.rows[0].results.pop();
        assert!(matches!(reference.validate(), Err(SimError::DataIntegrity(_))));
    }

    #[test]
    fn test_overstacked_placement_rejected() {
        let mut s = duel();
        for i in 0..5 {
            s.placements.push(unit(&format!("EXTRA_{}", i), Faction::Roc, UnitType::Infantry, "C2", None));
        }
        assert!(matches!(
            create_initial_state(&theater::reference_data(), &s, &EngineConfig::default()),
            Err(SimError::DataIntegrity(_))
        ));
    }

    fn stats_of(state: &GameState, name: &str) -> UnitStats {
        state.units.values().find(|u| u.name == name).unwrap().stats
    }

    #[test]
    fn test_equipment_ratings() {
        let reference = theater::reference_data();
        let m60 = reference.equipment("ROC_M60A3").unwrap();
        assert_eq!((m60.attack_rating(), m60.defense_rating()), (14, 14));
        let cm11 = reference.equipment("ROC_CM11").unwrap();
        assert_eq!((cm11.attack_rating(), cm11.defense_rating()), (14, 15));
        // 203 mm + 405 hp would rate 22; ratings cap at 20.
        assert_eq!(reference.equipment("ROC_M110A2").unwrap().attack_rating(), 20);
    }

    #[test]
    fn test_template_stats_follow_equipment() {
        let state = default_game(&EngineConfig::default()).unwrap();
        // Same brigade, different tanks.
        assert_eq!(stats_of(&state, "ROC_ARM_542_BN1"), UnitStats { attack: 14, defense: 15, movement: 6 });
        assert_eq!(stats_of(&state, "ROC_ARM_542_BN2"), UnitStats { attack: 14, defense: 14, movement: 6 });
        // 31 assault guns (20/10) and 10 IFVs (13/8), averaged.
        assert_eq!(stats_of(&state, "PLA_AMPH_1_BN1"), UnitStats { attack: 18, defense: 9, movement: 6 });
        // No equipment lines: type defaults.
        assert_eq!(stats_of(&state, "ROC_INF_BN1"), UnitStats { attack: 8, defense: 12, movement: 4 });

        let helo = state.reinforcement_pool.iter().find(|r| r.name == "PLA_HELO_BN1").unwrap();
        assert_eq!(helo.stats, Some(UnitStats { attack: 12, defense: 2, movement: 12 }));
        let mech = state.reinforcement_pool.iter().find(|r| r.name == "PLA_AMPH_1_BN3").unwrap();
        assert_eq!(mech.stats, Some(UnitStats { attack: 13, defense: 8, movement: 8 }));
    }

    #[test]
    fn test_explicit_stats_override_template() {
        let mut s = duel();
        s.placements[0].template = Some("ROC_ARM_BN_CM11".into());
        let state = create_initial_state(&theater::reference_data(), &s, &EngineConfig::default()).unwrap();
        assert_eq!(state.unit(PLA_ARM).unwrap().stats, UnitStats { attack: 8, defense: 8, movement: 6 });
    }

    #[test]
    fn test_bad_templates_rejected() {
        let mut s = duel();
        s.placements[0].stats = None;
        s.placements[0].template = Some("NO_SUCH_BN".into());
        assert!(matches!(
            create_initial_state(&theater::reference_data(), &s, &EngineConfig::default()),
            Err(SimError::DataIntegrity(_))
        ));

        // Armor placement on an infantry template.
        s.placements[0].template = Some("ROC_INF_BN".into());
        assert!(matches!(
            create_initial_state(&theater::reference_data(), &s, &EngineConfig::default()),
            Err(SimError::DataIntegrity(_))
        ));

        let mut reference = theater::reference_data();
        reference.equipment.retain(|e| e.id != "ROC_CM11");
        assert!(matches!(reference.validate(), Err(SimError::DataIntegrity(_))));
    }

    #[test]
    fn test_invalid_reinforcements_rejected_at_setup() {
        let load = |r: Reinforcement| {
            let mut s = duel();
            s.reinforcements = vec![r];
            create_initial_state(&theater::reference_data(), &s, &EngineConfig::default())
        };
        assert!(load(reinforcement("OK", UnitType::Infantry, 10)).is_ok());
        assert!(matches!(
            load(Reinforcement { strength: 0, ..reinforcement("EMPTY", UnitType::Infantry, 10) }),
            Err(SimError::DataIntegrity(_))
        ));
        assert!(matches!(
            load(Reinforcement { strength: 101, ..reinforcement("OVER", UnitType::Infantry, 10) }),
            Err(SimError::DataIntegrity(_))
        ));
        assert!(matches!(
            load(Reinforcement { template: Some("NO_SUCH_BN".into()), ..reinforcement("LOST", UnitType::Infantry, 10) }),
            Err(SimError::DataIntegrity(_))
        ));

        let mut reference = theater::reference_data();
        for t in reference.terrain.iter_mut().filter(|t| t.terrain == TerrainType::Coastal) {
            t.movement_cost = None;
        }
        let mut s = duel();
        s.reinforcements = vec![reinforcement("WET", UnitType::Infantry, 10)];
        assert!(matches!(
            create_initial_state(&reference, &s, &EngineConfig::default()),
            Err(SimError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_reference_data_json_override() {
        let json = serde_json::to_string(&theater::reference_data()).unwrap();
        assert!(json.contains("\"A-10/D-10_DR\""));
        let parsed: ReferenceData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, theater::reference_data());
    }

    // ═══════════════════════════════════════════════════════════════════
    // GRID TESTS
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn test_neighbors_sorted_and_clipped() {
        let state = default_game(&EngineConfig::default()).unwrap();
        let corner = state.grid.neighbors(c("A1"));
        assert!(corner.len() < 6);
        let inner = state.grid.neighbors(c("E6"));
        assert_eq!(inner.len(), 6);
        let mut sorted = inner.clone();
        sorted.sort();
        assert_eq!(inner, sorted);
        for n in inner {
            assert_eq!(c("E6").distance(n), 1);
        }
    }

    #[test]
    fn test_reachable_zero_budget_is_origin_only() {
        let state = default_game(&EngineConfig::default()).unwrap();
        let r = state.grid.reachable(c("D3"), 0, |_, _| Step::Cost(1));
        assert_eq!(r.len(), 1);
        assert_eq!(r[&c("D3")], 0);
    }

    #[test]
    fn test_reachable_respects_blocked_and_halt() {
        let state = default_game(&EngineConfig::default()).unwrap();
        let origin = c("D3");
        let wall = c("E3");

        let blocked = state.grid.reachable(origin, 1, |_, to| if to == wall { Step::Blocked } else { Step::Cost(1) });
        assert!(!blocked.contains_key(&wall));
        assert_eq!(blocked.len(), state.grid.neighbors(origin).len());

        let halted = state.grid.reachable(origin, 3, |_, to| if to == wall { Step::CostAndHalt(1) } else { Step::Cost(5) });
        assert_eq!(halted.get(&wall), Some(&1));
        assert_eq!(halted.len(), 2);
    }

    #[test]
    fn test_shortest_path_breaks_ties_on_lowest_coordinate() {
        let state = default_game(&EngineConfig::default()).unwrap();
        let from = c("D5");
        let to = HexCoord::new(from.q + 2, from.r - 1);
        let (path, cost) = state.grid.shortest_path(from, to, 10, |_, _| Step::Cost(1)).unwrap();
        assert_eq!(cost, 2);
        assert_eq!(path.len(), 3);
        // Two middle hexes tie at cost 1; the lower coordinate is taken.
        let candidates: Vec<HexCoord> =
            state.grid.neighbors(from).into_iter().filter(|n| n.distance(to) == 1).collect();
        assert_eq!(candidates.len(), 2);
        assert_eq!(path[1], candidates[0]);
    }

    #[test]
    fn test_path_to_any_limits_steps() {
        let state = default_game(&EngineConfig::default()).unwrap();
        let targets = BTreeSet::from([c("D9")]);
        let dist = c("D2").distance(c("D9"));
        assert!(state.grid.path_to_any(c("D2"), &targets, |_| true, dist - 1).is_none());
        assert_eq!(state.grid.path_to_any(c("D2"), &targets, |_| true, dist), Some((c("D9"), dist)));
        assert!(state.grid.path_exists(c("D2"), c("D9"), |_| true));
        assert!(!state.grid.path_exists(c("D2"), c("D9"), |h| h == c("D9")));
    }

    proptest! {
        #[test]
        fn prop_hex_distance_is_a_metric(
            a in (-20i32..20, -20i32..20),
            b in (-20i32..20, -20i32..20),
            m in (-20i32..20, -20i32..20),
        ) {
            let (a, b, m) = (HexCoord::new(a.0, a.1), HexCoord::new(b.0, b.1), HexCoord::new(m.0, m.1));
            prop_assert_eq!(a.distance(b), b.distance(a));
            prop_assert_eq!(a.distance(a), 0);
            prop_assert!(a.distance(b) <= a.distance(m) + m.distance(b));
            for n in a.adjacent() {
                prop_assert_eq!(a.distance(n), 1);
            }
        }

        #[test]
        fn prop_reachable_within_budget(budget in 0u32..8, col in 0i32..10, row in 1i32..14) {
            let state = default_game(&EngineConfig::default()).unwrap();
            let origin = HexCoord::from_offset(col, row);
            let reached = state.grid.reachable(origin, budget, |_, to| {
                match state.reference.terrain(state.hex(to).unwrap().terrain).unwrap().movement_cost {
                    Some(cost) => Step::Cost(cost as u32),
                    None => Step::Blocked,
                }
            });
            for (hex, cost) in reached {
                prop_assert!(cost <= budget);
                prop_assert!(hex.distance(origin) <= cost);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // SUPPLY TESTS
    // ═══════════════════════════════════════════════════════════════════

    /// 5×5 ROC-held plains with a ROC depot at A1 and a ROC infantry at C3.
    fn supply_field(interdict: bool) -> Scenario {
        let mut s = scenario(
            5,
            5,
            |l| (TerrainType::Plains, Some(Faction::Roc), l == "A1"),
            vec![unit("ROC_INF", Faction::Roc, UnitType::Infantry, "C3", None)],
        );
        s.capital = "A1".into();
        if interdict {
            s.interdiction.push(InterdictionPlan {
                turn: 1,
                target: Faction::Roc,
                hexes: ["D3", "D2", "C2", "B2", "B3", "C4"].iter().map(|h| h.to_string()).collect(),
            });
        }
        s
    }

    #[test]
    fn test_intact_path_is_supplied() {
        let state = start(&supply_field(false));
        assert_eq!(state.phase, Phase::ActionsPla);
        assert_eq!(state.unit(UnitId(1)).unwrap().supply, SupplyStatus::Supplied);
        assert_eq!(state.supply_sources[&Faction::Roc], vec![c("A1")]);
    }

    #[test]
    fn test_interdicted_ring_isolates() {
        let state = start(&supply_field(true));
        assert_eq!(state.unit(UnitId(1)).unwrap().supply, SupplyStatus::Isolated);
        // Interdiction only lasts through the supply check.
        assert!(state.interdicted.is_empty());
    }

    #[test]
    fn test_supply_out_of_range() {
        let mut s = supply_field(false);
        s.rules.max_supply_range = 1;
        let state = start(&s);
        assert_eq!(state.unit(UnitId(1)).unwrap().supply, SupplyStatus::OutOfSupply);
    }

    /// PLA Armor at C3 with its only depot at A1, every other hex ROC-held.
    /// ROC Infantry on a depot at D3 next to it.
    fn cut_off_pocket() -> Scenario {
        let mut s = scenario(
            5,
            5,
            |l| match l {
                "A1" => (TerrainType::Plains, Some(Faction::Pla), true),
                "D3" => (TerrainType::Plains, Some(Faction::Roc), true),
                _ => (TerrainType::Plains, Some(Faction::Roc), false),
            },
            vec![
                unit("PLA_ARM", Faction::Pla, UnitType::Armor, "C3", stats(8, 8, 6)),
                unit("ROC_INF", Faction::Roc, UnitType::Infantry, "D3", stats(4, 6, 4)),
            ],
        );
        s.capital = "E5".into();
        s
    }

    #[test]
    fn test_surrounded_unit_out_of_supply_with_penalty() {
        let mut state = start(&cut_off_pocket());
        let pla = state.unit(PLA_ARM).unwrap();
        assert_eq!(pla.supply, SupplyStatus::OutOfSupply);
        assert_eq!(pla.turns_out_of_supply, 1);
        assert_eq!(state.unit(ROC_INF).unwrap().supply, SupplyStatus::Supplied);

        commit_turn(&mut state, vec![Action::Attack { attackers: vec![PLA_ARM], target: c("D3") }], vec![]);
        let report = resolve_combat_phase(&mut state).unwrap();
        let eng = &report.engagements[0];
        // 8 × 100 halved for being out of supply.
        assert_eq!(eng.attack_power, 400);
        assert_eq!(eng.defense_power, 600);
        assert_eq!(eng.column, "1:2");
        assert_eq!(eng.outcome(), Some(OutcomeClass::NoEffect));
    }

    #[test]
    fn test_out_of_supply_counter_accumulates() {
        let mut state = start(&cut_off_pocket());
        pass_turn(&mut state);
        assert_eq!(state.turn, 2);
        assert_eq!(state.unit(PLA_ARM).unwrap().turns_out_of_supply, 2);
    }

    #[test]
    fn test_beachhead_sources_expire() {
        let reference = theater::reference_data();
        let scenario = theater::default_scenario();
        let mut state = create_initial_state(&reference, &scenario, &EngineConfig::default()).unwrap();
        let beach = c(theater::LINKOU_BEACH);
        state.turn = scenario.rules.beachhead_supply_turns;
        assert!(crate::supply::supply_sources(&state, Faction::Pla).contains(&beach));
        state.turn += 1;
        assert!(!crate::supply::supply_sources(&state, Faction::Pla).contains(&beach));
    }

    // ═══════════════════════════════════════════════════════════════════
    // COMBAT TESTS
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn test_armor_vs_infantry_pinned_defender_retreats() {
        let mut state = start(&duel());
        commit_turn(&mut state, vec![Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }], vec![]);
        let report = resolve_combat_phase(&mut state).unwrap();

        assert_eq!(report.engagements.len(), 1);
        let eng = &report.engagements[0];
        assert_eq!((eng.attack_power, eng.defense_power), (800, 600));
        assert_eq!(eng.ratio_pct, 133);
        assert_eq!(eng.column, "1:1");
        assert_eq!(eng.roll, 13);
        assert_eq!(eng.outcome(), Some(OutcomeClass::DefenderRetreats));

        // B2's lowest friendly, enemy-free neighbour is B1.
        assert_eq!(eng.retreats, vec![(ROC_INF, Some(c("B1")))]);
        assert_eq!(state.unit(ROC_INF).unwrap().position, c("B1"));
        assert_eq!(state.unit(ROC_INF).unwrap().strength, 90);
        assert_eq!(state.unit(PLA_ARM).unwrap().strength, 90);
        assert!(state.hex(c("B1")).unwrap().occupants.contains(&ROC_INF));
        assert!(state.hex(c("B2")).unwrap().occupants.is_empty());
        assert!(eng.captured);
        assert_eq!(state.hex(c("B2")).unwrap().owner, Some(Faction::Pla));
        assert_eq!(state.phase, Phase::LogisticsReinforcement);
    }

    #[test]
    fn test_retreat_without_destination_destroys() {
        let mut s = duel();
        for h in s.hexes.iter_mut() {
            if h.label != "B2" {
                h.owner = Some(Faction::Pla);
            }
        }
        let mut state = start(&s);
        commit_turn(&mut state, vec![Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }], vec![]);
        let report = resolve_combat_phase(&mut state).unwrap();

        assert_eq!(report.engagements[0].retreats, vec![(ROC_INF, None)]);
        assert_eq!(report.destroyed, vec![ROC_INF]);
        assert!(state.unit(ROC_INF).is_none());
        assert_eq!(state.destroyed.len(), 1);
        assert_eq!(state.hex(c("B2")).unwrap().owner, Some(Faction::Pla));
    }

    #[test]
    fn test_unopposed_advance_captures() {
        let mut state = start(&duel());
        commit_turn(
            &mut state,
            vec![Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }],
            vec![Action::Move { unit: ROC_INF, to: c("B1") }],
        );
        let report = resolve_combat_phase(&mut state).unwrap();
        let eng = &report.engagements[0];
        assert!(eng.result.is_none());
        assert!(eng.defenders.is_empty());
        assert!(eng.captured);
        assert_eq!(state.hex(c("B2")).unwrap().owner, Some(Faction::Pla));
        assert_eq!(state.unit(ROC_INF).unwrap().strength, 100);
    }

    #[test]
    fn test_close_air_support_shifts_column() {
        let mut s = duel();
        s.rules.close_air_support_turns = 10;
        let mut state = start(&s);
        commit_turn(&mut state, vec![Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }], vec![]);
        let eng = resolve_combat_phase(&mut state).unwrap().engagements.remove(0);
        assert_eq!(eng.attack_power, 960);
        assert_eq!(eng.column, "2:1");
        assert_eq!(eng.result.unwrap().to_string(), "A-0/D-30_DR");
    }

    #[test]
    fn test_entrenched_defender_and_artillery_support() {
        let mut s = duel();
        s.placements.push(unit("PLA_ARTY", Faction::Pla, UnitType::Artillery, "A1", None));
        if let Some(h) = s.hexes.iter_mut().find(|h| h.label == "A1") {
            h.features.depot = true;
        }
        let mut state = start(&s);
        let arty = UnitId(3);
        submit_actions(
            &mut state,
            Faction::Pla,
            vec![
                Action::Attack { attackers: vec![PLA_ARM], target: c("B2") },
                Action::ArtillerySupport { unit: arty, target: c("B2") },
            ],
        )
        .unwrap();
        advance(&mut state).unwrap();
        submit_actions(&mut state, Faction::Roc, vec![Action::Fortify { unit: ROC_INF }]).unwrap();
        let eng = resolve_combat_phase(&mut state).unwrap().engagements.remove(0);
        assert_eq!(eng.support, vec![arty]);
        // 800 armor + 400 artillery; 600 × 1.5 entrenched.
        assert_eq!(eng.attack_power, 1200);
        assert_eq!(eng.defense_power, 900);
    }

    #[test]
    fn test_invalid_engagements_rejected_before_resolution() {
        let mut s = duel();
        s.placements.push(unit("PLA_MECH", Faction::Pla, UnitType::Mechanized, "A2", None));
        s.placements.push(unit("PLA_FAR", Faction::Pla, UnitType::Infantry, "C1", None));
        let mut state = start(&s);
        let report = submit_actions(
            &mut state,
            Faction::Pla,
            vec![
                Action::Attack { attackers: vec![], target: c("B2") },
                Action::Attack { attackers: vec![PLA_ARM, ROC_INF], target: c("B2") },
                Action::Attack { attackers: vec![UnitId(4)], target: c("B2") },
                Action::Attack { attackers: vec![PLA_ARM], target: c("B2") },
                Action::Attack { attackers: vec![UnitId(3)], target: c("B2") },
            ],
        )
        .unwrap();
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.rejected.len(), 4);
        for (_, err) in &report.rejected {
            assert!(matches!(err, SimError::InvalidEngagement(_)), "{:?}", err);
        }
        assert_eq!(state.declared_attacks.len(), 1);
    }

    #[test]
    fn test_pinned_roll_without_seed() {
        let state = start(&duel());
        for index in 0..50 {
            assert_eq!(combat::combat_roll(&state, index), 13);
        }
    }

    #[test]
    fn test_seeded_rolls_follow_table_bands() {
        let mut state = start_with(&duel(), &EngineConfig { seed: Some(2024), ..EngineConfig::default() });
        let mut counts = [0u32; 5];
        let table = state.reference.odds_table.clone();
        let mut total = 0u32;
        for turn in 1..=10u8 {
            state.turn = turn;
            for index in 0..400 {
                let roll = combat::combat_roll(&state, index);
                assert!((1..=20).contains(&roll));
                let band = table.rows.iter().position(|r| r.roll_min <= roll && roll <= r.roll_max).unwrap();
                counts[band] += 1;
                total += 1;
            }
        }
        let expected = [0.25, 0.25, 0.25, 0.20, 0.05];
        for (band, &share) in expected.iter().enumerate() {
            let observed = counts[band] as f64 / total as f64;
            assert!((observed - share).abs() < 0.03, "band {} observed {:.3}, expected {:.2}", band, observed, share);
        }
    }

    #[test]
    fn test_seeded_rolls_are_reproducible() {
        let config = EngineConfig { seed: Some(99), ..EngineConfig::default() };
        let a = start_with(&duel(), &config);
        let b = start_with(&duel(), &config);
        let rolls_a: Vec<u8> = (0..20).map(|i| combat::combat_roll(&a, i)).collect();
        let rolls_b: Vec<u8> = (0..20).map(|i| combat::combat_roll(&b, i)).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    /// Two PLA units (A2, A3) against three ROC units (two stacked on B2,
    /// one on B1). PLA hits B2 while ROC hits both A2 and A3, so the B2
    /// stack and the A2 armor each take losses from two engagements.
    fn melee(strengths: [u8; 5], ratings: [(u16, u16); 5]) -> Scenario {
        let names = [
            ("PLA_A2", Faction::Pla, "A2"),
            ("PLA_A3", Faction::Pla, "A3"),
            ("ROC_B2_1", Faction::Roc, "B2"),
            ("ROC_B2_2", Faction::Roc, "B2"),
            ("ROC_B1", Faction::Roc, "B1"),
        ];
        let placements = names
            .iter()
            .zip(strengths.iter().zip(ratings.iter()))
            .map(|(&(name, faction, at), (&strength, &(attack, defense)))| UnitPlacement {
                strength,
                ..unit(name, faction, UnitType::Armor, at, stats(attack, defense, 6))
            })
            .collect();
        scenario(
            3,
            3,
            |l| {
                let owner = if l.starts_with('A') { Faction::Pla } else { Faction::Roc };
                (TerrainType::Plains, Some(owner), l == "A2" || l == "B2")
            },
            placements,
        )
    }

    proptest! {
        #[test]
        fn prop_summed_losses_clamped_across_engagements(
            strengths in proptest::array::uniform5(1u8..=100),
            ratings in proptest::array::uniform5((1u16..30, 1u16..30)),
            seed in any::<u64>(),
        ) {
            let config = EngineConfig { seed: Some(seed), ..EngineConfig::default() };
            let mut state = create_initial_state(&theater::reference_data(), &melee(strengths, ratings), &config).unwrap();
            let ids = [UnitId(1), UnitId(2), UnitId(3), UnitId(4), UnitId(5)];
            state.declared_attacks = vec![
                DeclaredAttack { faction: Faction::Pla, attackers: vec![ids[0], ids[1]], target: c("B2") },
                DeclaredAttack { faction: Faction::Roc, attackers: vec![ids[2], ids[4]], target: c("A2") },
                DeclaredAttack { faction: Faction::Roc, attackers: vec![ids[3]], target: c("A3") },
            ];
            let before: Vec<u8> = ids.iter().map(|id| state.unit(*id).unwrap().strength).collect();

            let report = combat::resolve_all(&mut state);
            prop_assert_eq!(report.engagements.len(), 3);

            let mut total_before = 0u32;
            let mut total_after = 0u32;
            for (i, id) in ids.iter().enumerate() {
                let booked: u32 = report
                    .engagements
                    .iter()
                    .flat_map(|e| e.losses.iter())
                    .filter(|(u, _)| u == id)
                    .map(|(_, loss)| *loss as u32)
                    .sum();
                let wiped_in_retreat = report
                    .engagements
                    .iter()
                    .flat_map(|e| e.retreats.iter())
                    .any(|(u, to)| u == id && to.is_none());
                let after = state.unit(*id).unwrap().strength;
                let expected = if wiped_in_retreat { 0 } else { (before[i] as u32).saturating_sub(booked) as u8 };
                prop_assert_eq!(after, expected, "unit {}", id);
                prop_assert_eq!(after == 0, state.pending_removal.contains(id));
                total_before += before[i] as u32;
                total_after += after as u32;
            }
            prop_assert!(total_after <= total_before);
        }
    }

    #[test]
    fn test_repulsed_attackers_suppressed_next_turn() {
        let mut reference = theater::reference_data();
        reference.odds_table.pinned_roll = 17;
        let mut s = duel();
        s.placements[0].stats = stats(2, 8, 6);
        let mut state = create_initial_state(&reference, &s, &EngineConfig::default()).unwrap();
        advance(&mut state).unwrap();

        commit_turn(&mut state, vec![Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }], vec![]);
        let eng = resolve_combat_phase(&mut state).unwrap().engagements.remove(0);
        // 200 against 600 is 1:2; roll 17 throws the attacker back.
        assert_eq!(eng.result.unwrap().to_string(), "A-10/D-0_AR");
        assert!(state.unit(PLA_ARM).unwrap().flags.repulsed);

        advance(&mut state).unwrap();
        assert_eq!(state.turn, 2);
        let armor = state.unit(PLA_ARM).unwrap();
        assert!(armor.flags.suppressed);
        assert!(!armor.flags.repulsed);
        // 2 × 90, then 75 % for suppression.
        assert_eq!(combat::attack_power(&state, armor), 135);

        pass_turn(&mut state);
        assert!(!state.unit(PLA_ARM).unwrap().flags.suppressed);
    }

    // ═══════════════════════════════════════════════════════════════════
    // ACTION VALIDATION TESTS
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn test_move_spends_budget_and_claims_hex() {
        let mut s = duel();
        s.placements[1].at = "C3".into();
        let mut state = start(&s);
        let report = submit_actions(&mut state, Faction::Pla, vec![Action::Move { unit: PLA_ARM, to: c("B1") }]).unwrap();
        assert_eq!(report.accepted.len(), 1);
        let armor = state.unit(PLA_ARM).unwrap();
        assert_eq!(armor.position, c("B1"));
        assert_eq!(armor.movement_left, 5);
        assert_eq!(state.hex(c("B1")).unwrap().owner, Some(Faction::Pla));
    }

    #[test]
    fn test_illegal_actions_dropped_and_reported() {
        let mut state = start(&duel());
        let report = submit_actions(
            &mut state,
            Faction::Pla,
            vec![
                Action::Move { unit: PLA_ARM, to: c("B2") },
                Action::Move { unit: ROC_INF, to: c("C1") },
                Action::Move { unit: PLA_ARM, to: c("A1") },
                Action::Fortify { unit: PLA_ARM },
                Action::EngineerAction { unit: PLA_ARM, target: c("A1") },
            ],
        )
        .unwrap();
        assert_eq!(report.accepted, vec![Action::Move { unit: PLA_ARM, to: c("A1") }]);
        assert!(matches!(report.rejected[0].1, SimError::InvalidMove { .. }));
        assert!(matches!(report.rejected[1].1, SimError::IllegalAction(_)));
        assert!(matches!(report.rejected[2].1, SimError::IllegalAction(_)));
        assert!(matches!(report.rejected[3].1, SimError::IllegalAction(_)));
        let rejected_in_log = state
            .log
            .iter()
            .filter(|e| matches!(e.event, LogEvent::ActionRejected { .. }))
            .count();
        assert_eq!(rejected_in_log, 4);
    }

    #[test]
    fn test_zone_of_control_halts_movement() {
        let mut s = duel();
        s.placements[0].at = "A1".into();
        s.placements[1].at = "C3".into();
        let state = start(&s);
        let reach = crate::units::reachable_hexes(&state, PLA_ARM);
        // B2 touches the infantry at C3, so movement stops there.
        assert!(reach.contains_key(&c("B2")));
        assert!(!reach.contains_key(&c("C3")));
        assert!(crate::units::in_enemy_zoc(&state, c("B2"), Faction::Pla));
    }

    #[test]
    fn test_engineer_entrenches_friendly_hex() {
        let mut s = duel();
        s.placements.push(unit("PLA_ENG", Faction::Pla, UnitType::Engineer, "A2", None));
        let mut state = start(&s);
        let report = submit_actions(
            &mut state,
            Faction::Pla,
            vec![Action::EngineerAction { unit: UnitId(3), target: c("A2") }],
        )
        .unwrap();
        assert_eq!(report.accepted.len(), 1);
        assert!(state.unit(PLA_ARM).unwrap().flags.entrenched);
        assert!(state.unit(UnitId(3)).unwrap().acted);
    }

    #[test]
    fn test_action_limit_drops_excess() {
        let config = EngineConfig { max_actions_per_decision: 1, ..EngineConfig::default() };
        let mut state = start_with(&duel(), &config);
        let report = submit_actions(
            &mut state,
            Faction::Pla,
            vec![Action::Fortify { unit: PLA_ARM }, Action::Move { unit: PLA_ARM, to: c("A1") }],
        )
        .unwrap();
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_legal_actions_are_all_accepted_individually() {
        let state = start(&duel());
        let legal = legal_actions(&state, Faction::Pla);
        assert!(legal.contains(&Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }));
        assert!(legal.contains(&Action::Fortify { unit: PLA_ARM }));
        for action in legal {
            let mut trial = state.clone();
            let report = submit_actions(&mut trial, Faction::Pla, vec![action.clone()]).unwrap();
            assert_eq!(report.accepted, vec![action]);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // PHASE ORDER TESTS
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn test_combat_requires_both_action_phases() {
        let mut state = start(&duel());
        assert_eq!(
            resolve_combat_phase(&mut state),
            Err(SimError::PhaseOrder { expected: Phase::CombatResolution, actual: Phase::ActionsPla })
        );
        submit_actions(&mut state, Faction::Pla, vec![]).unwrap();
        advance(&mut state).unwrap();
        assert_eq!(
            resolve_combat_phase(&mut state),
            Err(SimError::PhaseOrder { expected: Phase::CombatResolution, actual: Phase::ActionsRoc })
        );
        submit_actions(&mut state, Faction::Roc, vec![]).unwrap();
        assert!(resolve_combat_phase(&mut state).is_ok());
    }

    #[test]
    fn test_roc_cannot_act_before_pla() {
        let mut state = start(&duel());
        assert_eq!(
            state.pending,
            Some(PendingDecision::ChooseActions { faction: Faction::Pla, turn: 1 })
        );
        assert_eq!(
            submit_actions(&mut state, Faction::Roc, vec![]).unwrap_err(),
            SimError::PhaseOrder { expected: Phase::ActionsRoc, actual: Phase::ActionsPla }
        );
    }

    #[test]
    fn test_phases_logged_in_order() {
        let mut state = start(&duel());
        pass_turn(&mut state);
        let phases: Vec<Phase> = state
            .log
            .iter()
            .filter(|e| e.turn == 1 && e.event == LogEvent::PhaseStarted)
            .map(|e| e.phase)
            .collect();
        assert_eq!(
            phases,
            vec![
                Phase::AirSea,
                Phase::SupplyCheck,
                Phase::ActionsPla,
                Phase::ActionsRoc,
                Phase::CombatResolution,
                Phase::LogisticsReinforcement,
                Phase::TurnEndCheck,
            ]
        );
    }

    #[test]
    fn test_timeout_passes_the_phase() {
        let config = EngineConfig { decision_timeout_ms: Some(50), ..EngineConfig::default() };
        let mut state = start_with(&duel(), &config);
        let report = record_timeout(&mut state, Faction::Pla, 75).unwrap();
        assert!(report.timed_out);
        assert!(report.accepted.is_empty());
        assert_eq!(state.phase, Phase::ActionsRoc);
        assert!(state.log.iter().any(|e| e.event
            == LogEvent::AgentTimeout { faction: Faction::Pla, elapsed_ms: 75, limit_ms: 50 }));
    }

    // ═══════════════════════════════════════════════════════════════════
    // LOGISTICS TESTS
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn test_reinforcements_land_in_order_within_lift() {
        let mut s = scenario(
            3,
            3,
            |l| match l {
                "A1" => (TerrainType::Coastal, Some(Faction::Pla), true),
                "A3" => (TerrainType::Coastal, Some(Faction::Pla), false),
                _ => (TerrainType::Plains, Some(Faction::Roc), l == "C3"),
            },
            vec![
                unit("PLA_ARM", Faction::Pla, UnitType::Armor, "A1", None),
                unit("ROC_INF", Faction::Roc, UnitType::Infantry, "C3", None),
            ],
        );
        s.rules.initial_lift_capacity = 70;
        s.reinforcements = vec![
            reinforcement("MECH", UnitType::Mechanized, 40),
            reinforcement("INF", UnitType::Infantry, 20),
            reinforcement("ARTY", UnitType::Artillery, 50),
        ];
        let mut state = start(&s);
        pass_turn(&mut state);

        let mech = state.units.values().find(|u| u.name == "MECH").unwrap();
        let inf = state.units.values().find(|u| u.name == "INF").unwrap();
        assert_eq!(mech.position, c("A3"));
        assert_eq!(inf.position, c("A1"));
        assert_eq!(state.reinforcement_pool.len(), 1);
        assert_eq!(state.reinforcement_pool[0].name, "ARTY");
    }

    #[test]
    fn test_lift_capacity_decays_early() {
        let mut state = default_game(&EngineConfig::default()).unwrap();
        advance(&mut state).unwrap();
        assert_eq!(state.lift_capacity, 225);
        pass_turn(&mut state);
        assert_eq!(state.lift_capacity, 169);
    }

    #[test]
    fn test_supplied_units_refit() {
        let mut state = start(&duel());
        state.unit_mut(ROC_INF).unwrap().strength = 70;
        state.unit_mut(PLA_ARM).unwrap().strength = 70;
        pass_turn(&mut state);
        assert_eq!(state.unit(ROC_INF).unwrap().strength, 75);
        // PLA has no refit rate.
        assert_eq!(state.unit(PLA_ARM).unwrap().strength, 70);
    }

    // ═══════════════════════════════════════════════════════════════════
    // WIN CONDITION TESTS
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn test_roc_survival_at_final_turn_only() {
        let mut state = default_game(&EngineConfig::default()).unwrap();
        advance(&mut state).unwrap();
        for turn in 1..=9 {
            assert_eq!(state.turn, turn);
            pass_turn(&mut state);
            assert!(state.outcome.is_none(), "game ended early on turn {}", turn);
        }
        assert_eq!(state.turn, 10);
        pass_turn(&mut state);
        assert_eq!(
            state.outcome,
            Some(GameOutcome { winner: Faction::Roc, reason: VictoryReason::Survival, turn: 10 })
        );
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.timeline.len(), 10);
    }

    #[test]
    fn test_capital_capture_wins_for_pla() {
        let mut s = duel();
        s.placements[1].strength = 10;
        s.placements[0].stats = None;
        for h in s.hexes.iter_mut() {
            if h.label != "B2" {
                h.owner = Some(Faction::Pla);
            }
        }
        let mut state = start(&s);
        commit_turn(&mut state, vec![Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }], vec![]);
        advance(&mut state).unwrap();
        assert_eq!(
            state.outcome,
            Some(GameOutcome { winner: Faction::Pla, reason: VictoryReason::CapitalCaptured, turn: 1 })
        );
    }

    #[test]
    fn test_pla_elimination_wins_for_roc() {
        let mut s = duel();
        s.capital = "C1".into();
        s.placements[0].strength = 1;
        s.placements[1].stats = None;
        s.placements[1].unit_type = UnitType::Armor;
        let mut state = start(&s);
        commit_turn(&mut state, vec![], vec![Action::Attack { attackers: vec![ROC_INF], target: c("A2") }]);
        advance(&mut state).unwrap();
        assert!(state.unit(PLA_ARM).is_none());
        assert_eq!(
            state.outcome,
            Some(GameOutcome { winner: Faction::Roc, reason: VictoryReason::EnemyEliminated, turn: 1 })
        );
    }

    #[test]
    fn test_game_already_over() {
        let config = EngineConfig { max_turns: 1, ..EngineConfig::default() };
        let mut state = start_with(&duel(), &config);
        pass_turn(&mut state);
        assert!(state.is_over());
        assert_eq!(advance(&mut state), Err(SimError::GameAlreadyOver));
        assert_eq!(submit_actions(&mut state, Faction::Pla, vec![]).unwrap_err(), SimError::GameAlreadyOver);
        assert_eq!(resolve_combat_phase(&mut state).unwrap_err(), SimError::GameAlreadyOver);
    }

    // ═══════════════════════════════════════════════════════════════════
    // DETERMINISM & EXPORT TESTS
    // ═══════════════════════════════════════════════════════════════════

    /// Every faction attacks everything it legally can, one unit per target.
    fn play_aggressive(seed: Option<u64>) -> GameState {
        let config = EngineConfig { seed, ..EngineConfig::default() };
        let mut state = default_game(&config).unwrap();
        advance(&mut state).unwrap();
        let mut guard = 0;
        while !state.is_over() && guard < 100 {
            guard += 1;
            let faction = state.pending.as_ref().unwrap().faction();
            let actions: Vec<Action> = legal_actions(&state, faction)
                .into_iter()
                .filter(|a| matches!(a, Action::Attack { attackers, .. } if attackers.len() == 1))
                .collect();
            submit_actions(&mut state, faction, actions).unwrap();
            let _ = advance(&mut state);
        }
        state
    }

    #[test]
    fn test_identical_inputs_identical_games() {
        assert_eq!(play_aggressive(None), play_aggressive(None));
        let a = play_aggressive(Some(17));
        let b = play_aggressive(Some(17));
        assert!(a.is_over());
        assert_eq!(a, b);
        assert_eq!(snapshot::snapshot(&a).to_json().unwrap(), snapshot::snapshot(&b).to_json().unwrap());
    }

    #[test]
    fn test_views_are_detached_copies() {
        let state = start(&duel());
        let mut view = state_view(&state, Faction::Roc);
        view.units.clear();
        assert_eq!(state.units.len(), 2);

        let view = state_view(&state, Faction::Roc);
        assert_eq!(view.unit(ROC_INF).unwrap().movement_left, Some(4));
        assert_eq!(view.unit(PLA_ARM).unwrap().movement_left, None);
        assert!(view.lift_capacity.is_none());
    }

    #[test]
    fn test_snapshot_export() {
        let mut state = start(&duel());
        commit_turn(&mut state, vec![Action::Attack { attackers: vec![PLA_ARM], target: c("B2") }], vec![]);
        advance(&mut state).unwrap();
        let snap = snapshot::snapshot(&state);
        assert_eq!(snap.turn, 2);
        let roc = snap.totals(Faction::Roc).unwrap();
        assert_eq!(roc.units, 1);
        assert_eq!(roc.casualties.units_damaged, 1);
        assert_eq!(roc.casualties.strength_lost, 5); // 10 lost, 5 refit
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"PLA\""));
        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_game_state_survives_json() {
        let state = start(&duel());
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
