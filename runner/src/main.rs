// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for single games, batches and the leaderboard
// ═══════════════════════════════════════════════════════════════════════

mod config;

use clap::{Args, Parser, Subcommand};
use config::{ConfigError, RunConfig};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tgcsm_agents::{make_agent, AgentKind};
use tgcsm_engine::types::Faction;
use tgcsm_tournament::{run_batch, run_game, summarize, BatchSpec, Database, GameResult, RunError, Seats, StoreError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tgcsm", about = "Theater ground combat simulation: PLA vs ROC on a hex map")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by `play` and `batch`; each overrides the config file.
#[derive(Args)]
struct RunFlags {
    /// TOML run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// PLA agent: scripted, random or human
    #[arg(long)]
    pla: Option<AgentKind>,
    /// ROC agent: scripted, random or human
    #[arg(long)]
    roc: Option<AgentKind>,
    #[arg(long)]
    max_turns: Option<u8>,
    /// Per-decision time budget in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// SQLite result database
    #[arg(long)]
    db: Option<PathBuf>,
    /// Write JSON output here
    #[arg(short, long)]
    export: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single game
    Play {
        #[command(flatten)]
        run: RunFlags,
        /// Seed the combat die (omit for the pinned roll)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Also record the result in the database
        #[arg(long)]
        record: bool,
    },
    /// Play many seeded games in parallel and record them
    Batch {
        #[command(flatten)]
        run: RunFlags,
        #[arg(short, long, default_value_t = 100)]
        games: u32,
        #[arg(long, default_value_t = 1)]
        first_seed: u64,
    },
    /// Show leaderboard from database
    Leaderboard {
        #[arg(long, default_value = "results.db")]
        db: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot write {path}: {source}")]
    Export { path: PathBuf, source: std::io::Error },
    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Play { run, seed, record } => cmd_play(run, seed, record),
        Commands::Batch { run, games, first_seed } => cmd_batch(run, games, first_seed),
        Commands::Leaderboard { db } => cmd_leaderboard(&db),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve(flags: &RunFlags) -> Result<RunConfig, CliError> {
    let mut config = RunConfig::load(flags.config.as_deref())?;
    if let Some(k) = flags.pla {
        config.pla = k;
    }
    if let Some(k) = flags.roc {
        config.roc = k;
    }
    if let Some(t) = flags.max_turns {
        config.max_turns = t;
    }
    if let Some(ms) = flags.timeout_ms {
        config.decision_timeout_ms = Some(ms);
    }
    if let Some(db) = &flags.db {
        config.database = db.clone();
    }
    if let Some(path) = &flags.export {
        config.export = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn export_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| CliError::Export { path: path.to_path_buf(), source })?;
    info!(path = %path.display(), "exported");
    println!("Exported to {}", path.display());
    Ok(())
}

fn open_db(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(&path.to_string_lossy())?)
}

fn cmd_play(flags: RunFlags, seed: Option<u64>, record: bool) -> Result<(), CliError> {
    let mut config = resolve(&flags)?;
    if seed.is_some() {
        config.seed = seed;
    }
    let reference = config.load_reference()?;
    let scenario = config.load_scenario()?;

    println!("=== {} ===", scenario.name);
    println!(
        "PLA: {}  ROC: {}  turns: {}  seed: {}\n",
        config.pla,
        config.roc,
        config.max_turns,
        config.seed.map_or_else(|| "none (pinned roll)".to_string(), |s| s.to_string())
    );

    let agent_seed = config.seed.unwrap_or(0);
    let mut seats: Seats = BTreeMap::new();
    seats.insert(Faction::Pla, make_agent(config.pla, Faction::Pla, agent_seed));
    seats.insert(Faction::Roc, make_agent(config.roc, Faction::Roc, agent_seed.wrapping_add(1)));

    let result = run_game(&mut seats, &reference, &scenario, &config.engine_config(), config.max_decisions)?;
    print_result(&result);

    if let Some(path) = &config.export {
        export_json(path, &result)?;
    }
    if record {
        let mut db = open_db(&config.database)?;
        db.store_game(&result, config.elo_k)?;
        println!("Recorded in {}", config.database.display());
    }
    Ok(())
}

fn print_result(result: &GameResult) {
    println!("Game finished on turn {}", result.turns_played);
    println!("  Winner: {} ({:?})", result.outcome.winner, result.outcome.reason);
    println!();
    println!(
        "  {:<5} {:<10} {:>6} {:>9} {:>6} {:>10} {:>8} {:>9} {:>9}",
        "Side", "Agent", "Units", "Strength", "Hexes", "Destroyed", "Damaged", "Lost", "Rejected"
    );
    for f in &result.factions {
        println!(
            "  {:<5} {:<10} {:>6} {:>9} {:>6} {:>10} {:>8} {:>9} {:>9}",
            f.faction.to_string(),
            f.agent_name,
            f.units_remaining,
            f.strength,
            f.hexes_controlled,
            f.casualties.units_destroyed,
            f.casualties.units_damaged,
            f.casualties.strength_lost,
            f.actions_rejected,
        );
    }
    println!("  PLA reinforcements never landed: {}", result.reinforcements_uncommitted);
}

fn cmd_batch(flags: RunFlags, games: u32, first_seed: u64) -> Result<(), CliError> {
    let config = resolve(&flags)?;
    let spec = BatchSpec {
        reference: config.load_reference()?,
        scenario: config.load_scenario()?,
        config: config.engine_config(),
        pla: config.pla,
        roc: config.roc,
        seeds: (0..games as u64).map(|i| first_seed + i).collect(),
        max_decisions: config.max_decisions,
    };
    println!("=== Batch: {} games, PLA={} ROC={} ===\n", games, config.pla, config.roc);

    let results = run_batch(&spec)?;
    let mut db = open_db(&config.database)?;
    for (seed, result) in &results {
        match result {
            Ok(r) => {
                db.store_game(r, config.elo_k)?;
            }
            Err(e) => eprintln!("Game seed {}: ERROR -- {}", seed, e),
        }
    }

    let summary = summarize(&results);
    let pct = |w: u32| if summary.games > 0 { w as f64 / summary.games as f64 * 100.0 } else { 0.0 };
    println!("--- Summary ({} games, {} errors) ---", summary.games, summary.errors);
    println!("  PLA: {:>4} wins ({:.1}%)", summary.pla_wins, pct(summary.pla_wins));
    println!("  ROC: {:>4} wins ({:.1}%)", summary.roc_wins, pct(summary.roc_wins));
    for (reason, n) in &summary.by_reason {
        println!("    {:<16} {:>4}", reason, n);
    }
    println!("  Average turns: {:.1}", summary.avg_turns);
    println!(
        "  Average strength lost: PLA {:.1}, ROC {:.1}",
        summary.avg_pla_strength_lost, summary.avg_roc_strength_lost
    );
    println!("\nResults saved to: {}", config.database.display());
    println!("Total games in DB: {}", db.game_count()?);

    if let Some(path) = &config.export {
        export_json(path, &summary)?;
    }
    Ok(())
}

fn cmd_leaderboard(db_path: &Path) -> Result<(), CliError> {
    let db = open_db(db_path)?;
    let board = db.leaderboard()?;
    if board.is_empty() {
        println!("No agents found. Run some games with --record or a batch first.");
        return Ok(());
    }
    println!("=== Leaderboard ===\n");
    println!("{:<20} {:>8} {:>8} {:>8} {:>7}", "Agent", "ELO", "Games", "Wins", "Win %");
    println!("{}", "-".repeat(55));
    for row in &board {
        println!(
            "{:<20} {:>8.1} {:>8} {:>8} {:>6.1}%",
            row.name,
            row.elo,
            row.games,
            row.wins,
            row.win_rate() * 100.0
        );
    }
    for (faction, wins) in db.faction_wins()? {
        println!("{} wins: {}", faction, wins);
    }
    Ok(())
}
