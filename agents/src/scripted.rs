// ═══════════════════════════════════════════════════════════════════════
// Scripted Agent — fixed doctrine per faction.
//
//   PLA: launch every available attack, then push the remaining units
//        toward the objective (the enemy capital; once that is held, the
//        secondary objective). Artillery supports the chosen attacks.
//   ROC: counter-attack every adjacent enemy, close on the nearest PLA
//        unit with the rest, and dig in on victory points.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{one_action_per_unit, Agent};
use std::collections::BTreeSet;
use tgcsm_engine::theater;
use tgcsm_engine::types::*;
use tgcsm_engine::visibility::GameStateView;
use tracing::debug;

pub struct ScriptedAgent {
    faction: Faction,
    /// Where the PLA goes once the capital has fallen.
    secondary: Option<HexCoord>,
}

impl ScriptedAgent {
    pub fn new(faction: Faction) -> Self {
        ScriptedAgent {
            faction,
            secondary: HexCoord::from_label(theater::KAOHSIUNG),
        }
    }

    pub fn with_secondary(mut self, objective: HexCoord) -> Self {
        self.secondary = Some(objective);
        self
    }

    /// The hex the PLA is currently driving on.
    pub fn objective(&self, view: &GameStateView) -> HexCoord {
        let capital_held = view.hex(view.capital).map_or(false, |h| h.owner == Some(Faction::Pla));
        match self.secondary {
            Some(secondary) if capital_held && view.hex(secondary).is_some() => secondary,
            _ => view.capital,
        }
    }

    /// One attack per target: the widest legal attack that reuses no unit.
    fn attacks(&self, legal: &[Action], used: &mut BTreeSet<UnitId>) -> Vec<Action> {
        let mut candidates: Vec<&Action> = legal.iter().filter(|a| matches!(a, Action::Attack { .. })).collect();
        candidates.sort_by_key(|a| std::cmp::Reverse(a.units().len()));

        let mut targets: BTreeSet<HexCoord> = BTreeSet::new();
        let mut out = Vec::new();
        for action in candidates {
            let Action::Attack { attackers, target } = action else { continue };
            if targets.contains(target) || attackers.iter().any(|id| used.contains(id)) {
                continue;
            }
            targets.insert(*target);
            used.extend(attackers.iter().copied());
            out.push(action.clone());
        }
        // Artillery joins whichever chosen attack it can reach first.
        for action in legal {
            if let Action::ArtillerySupport { unit, target } = action {
                if targets.contains(target) && !used.contains(unit) {
                    used.insert(*unit);
                    out.push(action.clone());
                }
            }
        }
        out
    }

    /// The legal move for `unit` that ends closest to `goal`, if it gets
    /// strictly closer than where the unit stands now.
    fn move_toward(legal: &[Action], unit: UnitId, from: HexCoord, goal: HexCoord) -> Option<Action> {
        let mut best: Option<(u32, HexCoord)> = None;
        for action in legal {
            let Action::Move { unit: u, to } = action else { continue };
            if *u != unit {
                continue;
            }
            let d = to.distance(goal);
            if d < from.distance(goal) && best.map_or(true, |b| (d, *to) < b) {
                best = Some((d, *to));
            }
        }
        best.map(|(_, to)| Action::Move { unit, to })
    }

    fn pla_actions(&self, view: &GameStateView, legal: &[Action]) -> Vec<Action> {
        let mut used = BTreeSet::new();
        let mut actions = self.attacks(legal, &mut used);
        let goal = self.objective(view);
        debug!(objective = %goal, attacks = actions.len(), "PLA doctrine");

        for unit in view.my_units() {
            if used.contains(&unit.id) {
                continue;
            }
            if let Some(m) = Self::move_toward(legal, unit.id, unit.position, goal) {
                used.insert(unit.id);
                actions.push(m);
            }
        }
        actions
    }

    fn roc_actions(&self, view: &GameStateView, legal: &[Action]) -> Vec<Action> {
        let enemies: Vec<HexCoord> = view.enemy_units().map(|u| u.position).collect();
        if enemies.is_empty() {
            return Vec::new();
        }
        let mut used = BTreeSet::new();
        let mut actions = self.attacks(legal, &mut used);

        for unit in view.my_units() {
            if used.contains(&unit.id) {
                continue;
            }
            let Some(&nearest) = enemies.iter().min_by_key(|e| (unit.position.distance(**e), **e)) else {
                continue;
            };
            if let Some(m) = Self::move_toward(legal, unit.id, unit.position, nearest) {
                used.insert(unit.id);
                actions.push(m);
            }
        }

        for unit in view.my_units() {
            if used.contains(&unit.id) {
                continue;
            }
            let on_objective = view
                .hex(unit.position)
                .map_or(false, |h| h.features.victory_point || h.features.capital);
            let fortify = Action::Fortify { unit: unit.id };
            if on_objective && legal.contains(&fortify) {
                used.insert(unit.id);
                actions.push(fortify);
            }
        }
        actions
    }
}

impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn faction(&self) -> Faction {
        self.faction
    }

    fn choose_actions(&mut self, view: &GameStateView, legal: &[Action], budget: &DecisionBudget) -> Vec<Action> {
        let actions = match self.faction {
            Faction::Pla => self.pla_actions(view, legal),
            Faction::Roc => self.roc_actions(view, legal),
        };
        one_action_per_unit(actions, budget)
    }
}
