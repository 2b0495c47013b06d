// ═══════════════════════════════════════════════════════════════════════
// Random Agent — picks uniformly among legal actions, unit by unit.
// Serves as baseline and for testing game engine stability.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{one_action_per_unit, Agent};
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tgcsm_engine::types::*;
use tgcsm_engine::visibility::GameStateView;

pub struct RandomAgent {
    faction: Faction,
    rng: ChaCha8Rng,
    /// Chance in percent that a unit does nothing this phase.
    idle_pct: u32,
}

impl RandomAgent {
    pub fn new(faction: Faction, seed: u64) -> Self {
        RandomAgent {
            faction,
            rng: ChaCha8Rng::seed_from_u64(seed),
            idle_pct: 20,
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "Random"
    }

    fn faction(&self) -> Faction {
        self.faction
    }

    fn choose_actions(&mut self, view: &GameStateView, legal: &[Action], budget: &DecisionBudget) -> Vec<Action> {
        let mut chosen = Vec::new();
        for unit in view.my_units() {
            if self.rng.gen_range(0..100) < self.idle_pct {
                continue;
            }
            let options: Vec<&Action> = legal.iter().filter(|a| a.units().first() == Some(&unit.id)).collect();
            if let Some(&action) = options.choose(&mut self.rng) {
                chosen.push(action.clone());
            }
        }
        one_action_per_unit(chosen, budget)
    }
}
