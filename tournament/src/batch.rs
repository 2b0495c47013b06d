// ═══════════════════════════════════════════════════════════════════════
// Batch runs — many independent games across seeds, in parallel
// ═══════════════════════════════════════════════════════════════════════

use crate::runner::{run_game, GameResult, RunError, Seats};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tgcsm_agents::{make_agent, AgentKind};
use tgcsm_engine::reference::{ReferenceData, Scenario};
use tgcsm_engine::setup::EngineConfig;
use tgcsm_engine::types::*;
use tracing::info;

#[derive(Debug, Clone)]
pub struct BatchSpec {
    pub reference: ReferenceData,
    pub scenario: Scenario,
    /// Applied to every game; `seed` is replaced per game.
    pub config: EngineConfig,
    pub pla: AgentKind,
    pub roc: AgentKind,
    pub seeds: Vec<u64>,
    pub max_decisions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub games: u32,
    pub errors: u32,
    pub pla_wins: u32,
    pub roc_wins: u32,
    pub by_reason: BTreeMap<String, u32>,
    pub avg_turns: f64,
    pub avg_pla_strength_lost: f64,
    pub avg_roc_strength_lost: f64,
}

fn seats_for(spec: &BatchSpec, seed: u64) -> Seats {
    let mut seats: Seats = BTreeMap::new();
    seats.insert(Faction::Pla, make_agent(spec.pla, Faction::Pla, seed));
    seats.insert(Faction::Roc, make_agent(spec.roc, Faction::Roc, seed.wrapping_add(1)));
    seats
}

/// Play every seed of the batch. Results come back in seed order; each
/// game runs on one rayon worker and stays single-threaded.
pub fn run_batch(spec: &BatchSpec) -> Result<Vec<(u64, Result<GameResult, RunError>)>, RunError> {
    if spec.pla == AgentKind::Human || spec.roc == AgentKind::Human {
        return Err(RunError::Config("human agents cannot play batch games".into()));
    }
    info!(games = spec.seeds.len(), pla = %spec.pla, roc = %spec.roc, "batch started");

    let results = spec
        .seeds
        .par_iter()
        .map(|&seed| {
            let config = EngineConfig { seed: Some(seed), ..spec.config.clone() };
            let mut seats = seats_for(spec, seed);
            (seed, run_game(&mut seats, &spec.reference, &spec.scenario, &config, spec.max_decisions))
        })
        .collect();
    Ok(results)
}

pub fn summarize(results: &[(u64, Result<GameResult, RunError>)]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let (mut turns, mut pla_lost, mut roc_lost) = (0u64, 0u64, 0u64);
    for (_, result) in results {
        let Ok(r) = result else {
            summary.errors += 1;
            continue;
        };
        summary.games += 1;
        match r.winner() {
            Faction::Pla => summary.pla_wins += 1,
            Faction::Roc => summary.roc_wins += 1,
        }
        *summary.by_reason.entry(format!("{:?}", r.outcome.reason)).or_default() += 1;
        turns += r.turns_played as u64;
        pla_lost += r.faction(Faction::Pla).map_or(0, |f| f.casualties.strength_lost) as u64;
        roc_lost += r.faction(Faction::Roc).map_or(0, |f| f.casualties.strength_lost) as u64;
    }
    if summary.games > 0 {
        let n = summary.games as f64;
        summary.avg_turns = turns as f64 / n;
        summary.avg_pla_strength_lost = pla_lost as f64 / n;
        summary.avg_roc_strength_lost = roc_lost as f64 / n;
    }
    summary
}
