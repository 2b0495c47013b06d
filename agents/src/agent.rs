// ═══════════════════════════════════════════════════════════════════════
// Agent Trait — the decision-point contract every player implements
//
// KEY DESIGN PRINCIPLE:
//   Agents receive a `GameStateView` (an owned projection), never the
//   authoritative GameState. They answer once per action phase with a
//   batch of actions; the engine validates each one and drops the illegal
//   ones. An agent cannot corrupt the game by answering badly.
//
//   The agent never gets to see:
//     - The opponent's declared attacks and artillery support
//     - The opponent's remaining movement points
//     - PLA lift capacity (ROC side)
// ═══════════════════════════════════════════════════════════════════════

use crate::human::HumanAgent;
use crate::random::RandomAgent;
use crate::scripted::ScriptedAgent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tgcsm_engine::types::*;
use tgcsm_engine::visibility::GameStateView;

/// Trait that all agents must implement.
pub trait Agent: Send {
    /// Human-readable name for this agent (e.g., "Scripted", "Random").
    fn name(&self) -> &str;

    /// The faction this agent commands.
    fn faction(&self) -> Faction;

    /// Pick this phase's actions. `legal` lists every single action the
    /// engine would currently accept; agents may also submit others, which
    /// are validated the same way. At most `budget.max_actions` are read.
    fn choose_actions(&mut self, view: &GameStateView, legal: &[Action], budget: &DecisionBudget) -> Vec<Action>;
}

/// Agent variants that can be named in a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Scripted,
    Random,
    Human,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Scripted, AgentKind::Random, AgentKind::Human];
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AgentKind::Scripted => "scripted",
            AgentKind::Random => "random",
            AgentKind::Human => "human",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scripted" | "heuristic" => Ok(AgentKind::Scripted),
            "random" => Ok(AgentKind::Random),
            "human" => Ok(AgentKind::Human),
            other => Err(format!("unknown agent kind '{}' (expected scripted, random or human)", other)),
        }
    }
}

/// Build an agent. `seed` only matters for the random agent; the human
/// agent talks to the process console.
pub fn make_agent(kind: AgentKind, faction: Faction, seed: u64) -> Box<dyn Agent> {
    match kind {
        AgentKind::Scripted => Box::new(ScriptedAgent::new(faction)),
        AgentKind::Random => Box::new(RandomAgent::new(faction, seed)),
        AgentKind::Human => Box::new(HumanAgent::console(faction)),
    }
}

/// Keep the first action per unit and cut the batch to the budget.
/// Attacks count every listed attacker as used.
pub fn one_action_per_unit(actions: Vec<Action>, budget: &DecisionBudget) -> Vec<Action> {
    let mut used: Vec<UnitId> = Vec::new();
    let mut out = Vec::new();
    for action in actions {
        let units = action.units();
        if units.iter().any(|u| used.contains(u)) {
            continue;
        }
        used.extend(units);
        out.push(action);
        if out.len() >= budget.max_actions {
            break;
        }
    }
    out
}
