// ═══════════════════════════════════════════════════════════════════════
// Database — SQLite storage for game results, win tallies and ELO
//
// Agents are rated per seat ("Scripted (PLA)"), since the two sides of
// the scenario play different games.
// ═══════════════════════════════════════════════════════════════════════

use crate::runner::GameResult;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tgcsm_engine::types::Faction;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("game result has no entry for {0}")]
    MissingFaction(Faction),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub name: String,
    pub elo: f64,
    pub games: u32,
    pub wins: u32,
}

impl LeaderboardRow {
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }
}

pub struct Database {
    conn: Connection,
}

pub fn seat_name(agent_name: &str, faction: Faction) -> String {
    format!("{} ({})", agent_name, faction)
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn open(path: &str) -> StoreResult<Self> {
        let db = Database { conn: Connection::open(path)? };
        db.create_schema()?;
        Ok(db)
    }

    /// In-memory database (useful for tests).
    pub fn in_memory() -> StoreResult<Self> {
        let db = Database { conn: Connection::open_in_memory()? };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS agents (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                elo         REAL NOT NULL DEFAULT 1500.0,
                games       INTEGER NOT NULL DEFAULT 0,
                wins        INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS games (
                id          INTEGER PRIMARY KEY,
                seed        INTEGER,
                turns       INTEGER NOT NULL,
                winner      TEXT NOT NULL,
                reason      TEXT NOT NULL,
                reinforcements_uncommitted INTEGER NOT NULL,
                played_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS game_factions (
                id              INTEGER PRIMARY KEY,
                game_id         INTEGER NOT NULL REFERENCES games(id),
                agent_id        INTEGER NOT NULL REFERENCES agents(id),
                faction         TEXT NOT NULL,
                units           INTEGER NOT NULL,
                strength        INTEGER NOT NULL,
                hexes           INTEGER NOT NULL,
                destroyed       INTEGER NOT NULL,
                damaged         INTEGER NOT NULL,
                strength_lost   INTEGER NOT NULL,
                rejected        INTEGER NOT NULL,
                timeouts        INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Register an agent (or return existing ID).
    pub fn register_agent(&self, name: &str) -> StoreResult<i64> {
        self.conn.execute("INSERT OR IGNORE INTO agents (name) VALUES (?1)", params![name])?;
        let id = self.conn.query_row("SELECT id FROM agents WHERE name = ?1", params![name], |row| row.get(0))?;
        Ok(id)
    }

    /// Store a completed game, bump both seats' tallies and update ELO.
    pub fn store_game(&mut self, result: &GameResult, k: f64) -> StoreResult<i64> {
        let mut seat_ids = Vec::new();
        for faction in Faction::ALL {
            let fr = result.faction(faction).ok_or(StoreError::MissingFaction(faction))?;
            seat_ids.push((faction, self.register_agent(&seat_name(&fr.agent_name, faction))?));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO games (seed, turns, winner, reason, reinforcements_uncommitted) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.seed.map(|s| s as i64),
                result.turns_played as i64,
                result.winner().to_string(),
                format!("{:?}", result.outcome.reason),
                result.reinforcements_uncommitted as i64,
            ],
        )?;
        let game_id = tx.last_insert_rowid();

        for &(faction, agent_id) in &seat_ids {
            let fr = result.faction(faction).ok_or(StoreError::MissingFaction(faction))?;
            tx.execute(
                "INSERT INTO game_factions
                    (game_id, agent_id, faction, units, strength, hexes, destroyed, damaged, strength_lost, rejected, timeouts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    game_id,
                    agent_id,
                    faction.to_string(),
                    fr.units_remaining,
                    fr.strength,
                    fr.hexes_controlled,
                    fr.casualties.units_destroyed,
                    fr.casualties.units_damaged,
                    fr.casualties.strength_lost,
                    fr.actions_rejected,
                    fr.timeouts,
                ],
            )?;
            let won = faction == result.winner();
            tx.execute(
                "UPDATE agents SET games = games + 1, wins = wins + ?1 WHERE id = ?2",
                params![won as i64, agent_id],
            )?;
        }
        tx.commit()?;

        let winner_id = seat_ids.iter().find(|(f, _)| *f == result.winner()).map(|(_, id)| *id);
        let loser_ids: Vec<i64> = seat_ids.iter().filter(|(f, _)| *f != result.winner()).map(|(_, id)| *id).collect();
        if let Some(winner_id) = winner_id {
            self.update_elo(winner_id, &loser_ids, k)?;
        }
        Ok(game_id)
    }

    fn elo_of(&self, id: i64) -> StoreResult<f64> {
        Ok(self.conn.query_row("SELECT elo FROM agents WHERE id = ?1", params![id], |row| row.get(0))?)
    }

    /// Winner gains from each loser by the standard expected-score formula.
    pub fn update_elo(&self, winner_id: i64, loser_ids: &[i64], k: f64) -> StoreResult<()> {
        let winner_elo = self.elo_of(winner_id)?;
        for &loser_id in loser_ids {
            let loser_elo = self.elo_of(loser_id)?;
            let expected_winner = 1.0 / (1.0 + 10f64.powf((loser_elo - winner_elo) / 400.0));
            let delta = k * (1.0 - expected_winner);
            self.conn.execute("UPDATE agents SET elo = elo + ?1 WHERE id = ?2", params![delta, winner_id])?;
            self.conn.execute("UPDATE agents SET elo = elo - ?1 WHERE id = ?2", params![delta, loser_id])?;
        }
        Ok(())
    }

    /// ELO leaderboard, best first.
    pub fn leaderboard(&self) -> StoreResult<Vec<LeaderboardRow>> {
        let mut stmt = self.conn.prepare("SELECT name, elo, games, wins FROM agents ORDER BY elo DESC, name ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LeaderboardRow { name: row.get(0)?, elo: row.get(1)?, games: row.get(2)?, wins: row.get(3)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Wins per faction across all stored games.
    pub fn faction_wins(&self) -> StoreResult<Vec<(String, u32)>> {
        let mut stmt = self.conn.prepare("SELECT winner, COUNT(*) FROM games GROUP BY winner ORDER BY winner")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get total number of games stored.
    pub fn game_count(&self) -> StoreResult<u32> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?)
    }
}
