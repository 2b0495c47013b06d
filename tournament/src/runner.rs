// ═══════════════════════════════════════════════════════════════════════
// Game Runner — drives one complete headless game with agents
//
// The engine never calls agents. This loop reads `state.pending`, builds
// the faction's view and legal-action list, times the agent's answer
// against the decision budget, and feeds the batch (or a timeout) back.
//
// With a time limit each decision runs on its own thread. An agent that
// misses the deadline stays out on that thread; its faction passes (as a
// timeout) until the agent hands its answer back, which is then discarded.
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tgcsm_agents::Agent;
use tgcsm_engine::engine::{advance, legal_actions, record_timeout, submit_actions};
use tgcsm_engine::reference::{ReferenceData, Scenario};
use tgcsm_engine::setup::{create_initial_state, EngineConfig};
use tgcsm_engine::snapshot::{self, Casualties, GameSnapshot};
use tgcsm_engine::types::*;
use tgcsm_engine::visibility::{state_view, GameStateView};
use tgcsm_engine::SimError;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("no agent bound to {0}")]
    MissingAgent(Faction),

    #[error("agent for {faction} plays {actual}")]
    WrongFaction { faction: Faction, actual: Faction },

    #[error("game exceeded {limit} decisions without finishing (turn {turn})")]
    TooManyDecisions { limit: usize, turn: u8 },

    #[error("game stuck: no decision pending in {phase:?} on turn {turn}")]
    Stuck { phase: Phase, turn: u8 },

    #[error("{0} agent panicked while deciding")]
    AgentPanicked(Faction),

    #[error("{0}")]
    Config(String),
}

/// Agents bound to each faction for one game.
pub type Seats = BTreeMap<Faction, Box<dyn Agent>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionResult {
    pub faction: Faction,
    pub agent_name: String,
    pub units_remaining: u32,
    pub strength: u32,
    pub hexes_controlled: u32,
    pub casualties: Casualties,
    pub actions_accepted: u32,
    pub actions_rejected: u32,
    pub timeouts: u32,
}

/// Result of a completed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub seed: Option<u64>,
    pub outcome: GameOutcome,
    pub turns_played: u8,
    pub factions: Vec<FactionResult>,
    /// PLA reinforcements never landed.
    pub reinforcements_uncommitted: usize,
    pub snapshot: GameSnapshot,
}

impl GameResult {
    pub fn winner(&self) -> Faction {
        self.outcome.winner
    }

    pub fn faction(&self, faction: Faction) -> Option<&FactionResult> {
        self.factions.iter().find(|f| f.faction == faction)
    }
}

#[derive(Default)]
struct Tally {
    accepted: u32,
    rejected: u32,
    timeouts: u32,
}

type Reply = (Box<dyn Agent>, Vec<Action>);

/// An agent still working on a decision it was timed out of.
struct Overdue {
    reply: Receiver<Reply>,
    since: Instant,
}

enum Decision {
    Actions(Vec<Action>),
    TimedOut { elapsed_ms: u64 },
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Ask the faction's agent for its batch. Without a time limit the agent
/// runs inline; with one it runs on a worker thread and is abandoned to
/// `overdue` if the deadline passes.
fn decide(
    seats: &mut Seats,
    overdue: &mut BTreeMap<Faction, Overdue>,
    faction: Faction,
    view: GameStateView,
    legal: Vec<Action>,
    budget: DecisionBudget,
) -> Result<Decision, RunError> {
    if let Some(late) = overdue.get(&faction) {
        let (reply, since) = (late.reply.try_recv(), late.since);
        match reply {
            Ok((agent, _stale)) => {
                debug!(%faction, "overdue agent returned");
                overdue.remove(&faction);
                seats.insert(faction, agent);
            }
            Err(TryRecvError::Empty) => return Ok(Decision::TimedOut { elapsed_ms: elapsed_ms(since) }),
            Err(TryRecvError::Disconnected) => return Err(RunError::AgentPanicked(faction)),
        }
    }

    let Some(limit) = budget.time_limit_ms else {
        let agent = seats.get_mut(&faction).ok_or(RunError::MissingAgent(faction))?;
        return Ok(Decision::Actions(agent.choose_actions(&view, &legal, &budget)));
    };

    let mut agent = seats.remove(&faction).ok_or(RunError::MissingAgent(faction))?;
    let (tx, rx) = mpsc::channel::<Reply>();
    let started = Instant::now();
    thread::spawn(move || {
        let actions = agent.choose_actions(&view, &legal, &budget);
        // The runner may have stopped listening; the answer is then moot.
        let _ = tx.send((agent, actions));
    });
    match rx.recv_timeout(Duration::from_millis(limit)) {
        Ok((agent, actions)) => {
            seats.insert(faction, agent);
            Ok(Decision::Actions(actions))
        }
        Err(RecvTimeoutError::Timeout) => {
            overdue.insert(faction, Overdue { reply: rx, since: started });
            Ok(Decision::TimedOut { elapsed_ms: elapsed_ms(started) })
        }
        Err(RecvTimeoutError::Disconnected) => Err(RunError::AgentPanicked(faction)),
    }
}

/// Run a complete game. `max_decisions` is a safety limit against engine
/// loops; a normal game needs two per turn.
pub fn run_game(
    seats: &mut Seats,
    reference: &ReferenceData,
    scenario: &Scenario,
    config: &EngineConfig,
    max_decisions: usize,
) -> Result<GameResult, RunError> {
    for (faction, agent) in seats.iter() {
        if agent.faction() != *faction {
            return Err(RunError::WrongFaction { faction: *faction, actual: agent.faction() });
        }
    }
    for faction in Faction::ALL {
        if !seats.contains_key(&faction) {
            return Err(RunError::MissingAgent(faction));
        }
    }

    let names: BTreeMap<Faction, String> = seats.iter().map(|(f, a)| (*f, a.name().to_string())).collect();
    let mut state = create_initial_state(reference, scenario, config)?;
    let mut tallies: BTreeMap<Faction, Tally> = BTreeMap::new();
    let mut overdue: BTreeMap<Faction, Overdue> = BTreeMap::new();
    let mut decisions = 0;

    while !state.is_over() {
        advance(&mut state)?;
        if state.is_over() {
            break;
        }
        let Some(pending) = state.pending.clone() else {
            return Err(RunError::Stuck { phase: state.phase, turn: state.turn });
        };
        let faction = pending.faction();
        let view = state_view(&state, faction);
        let legal = legal_actions(&state, faction);
        let budget = state.budget();

        let report = match decide(seats, &mut overdue, faction, view, legal, budget)? {
            Decision::Actions(actions) => submit_actions(&mut state, faction, actions)?,
            Decision::TimedOut { elapsed_ms } => {
                warn!(%faction, elapsed_ms, "decision over budget");
                record_timeout(&mut state, faction, elapsed_ms)?
            }
        };
        debug!(
            %faction,
            turn = state.turn,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "decision applied"
        );
        let tally = tallies.entry(faction).or_default();
        tally.accepted += report.accepted.len() as u32;
        tally.rejected += report.rejected.len() as u32;
        tally.timeouts += report.timed_out as u32;

        decisions += 1;
        if decisions > max_decisions {
            return Err(RunError::TooManyDecisions { limit: max_decisions, turn: state.turn });
        }
    }

    // Agents that finished late go back to their seats; hung ones stay lost.
    for (faction, late) in overdue {
        if let Ok((agent, _)) = late.reply.try_recv() {
            seats.insert(faction, agent);
        } else {
            warn!(%faction, "agent still deciding at game end, seat left empty");
        }
    }

    let Some(outcome) = state.outcome else {
        return Err(RunError::Stuck { phase: state.phase, turn: state.turn });
    };
    info!(winner = %outcome.winner, reason = ?outcome.reason, turn = outcome.turn, "game finished");
    Ok(build_result(&state, outcome, &names, &tallies))
}

fn build_result(
    state: &GameState,
    outcome: GameOutcome,
    names: &BTreeMap<Faction, String>,
    tallies: &BTreeMap<Faction, Tally>,
) -> GameResult {
    let factions = Faction::ALL
        .iter()
        .map(|&f| {
            let totals = snapshot::faction_totals(state, f);
            let tally = tallies.get(&f);
            FactionResult {
                faction: f,
                agent_name: names.get(&f).cloned().unwrap_or_default(),
                units_remaining: totals.units,
                strength: totals.strength,
                hexes_controlled: totals.hexes_controlled,
                casualties: totals.casualties,
                actions_accepted: tally.map_or(0, |t| t.accepted),
                actions_rejected: tally.map_or(0, |t| t.rejected),
                timeouts: tally.map_or(0, |t| t.timeouts),
            }
        })
        .collect();

    GameResult {
        seed: state.seed,
        outcome,
        turns_played: state.turn,
        factions,
        reinforcements_uncommitted: state.reinforcement_pool.len(),
        snapshot: snapshot::snapshot(state),
    }
}
