// ═══════════════════════════════════════════════════════════════════════
// Run configuration — TOML file, overridden by command-line flags
//
//   pla = "scripted"
//   roc = "random"
//   max_turns = 10
//   seed = 7                    # omit for the pinned combat roll
//   decision_timeout_ms = 5000
//   export = "game.json"
//   reference = "data/reference.json"   # optional overrides
//   scenario = "data/scenario.json"
// ═══════════════════════════════════════════════════════════════════════

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tgcsm_agents::AgentKind;
use tgcsm_engine::reference::{ReferenceData, Scenario};
use tgcsm_engine::setup::EngineConfig;
use tgcsm_engine::theater;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("malformed config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("malformed JSON in {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub pla: AgentKind,
    pub roc: AgentKind,
    pub max_turns: u8,
    pub seed: Option<u64>,
    pub decision_timeout_ms: Option<u64>,
    pub max_actions_per_decision: usize,
    /// Safety limit on agent decisions per game.
    pub max_decisions: usize,
    pub export: Option<PathBuf>,
    pub database: PathBuf,
    pub elo_k: f64,
    pub reference: Option<PathBuf>,
    pub scenario: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        RunConfig {
            pla: AgentKind::Scripted,
            roc: AgentKind::Scripted,
            max_turns: engine.max_turns,
            seed: engine.seed,
            decision_timeout_ms: engine.decision_timeout_ms,
            max_actions_per_decision: engine.max_actions_per_decision,
            max_decisions: 1_000,
            export: None,
            database: PathBuf::from("results.db"),
            elo_k: 32.0,
            reference: None,
            scenario: None,
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    serde_json::from_str(&read(path)?).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
}

impl RunConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_toml(&read(p)?),
            None => Ok(RunConfig::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be at least 1".into()));
        }
        if self.max_actions_per_decision == 0 {
            return Err(ConfigError::Invalid("max_actions_per_decision must be at least 1".into()));
        }
        if self.max_decisions < 2 * self.max_turns as usize {
            return Err(ConfigError::Invalid(format!(
                "max_decisions {} cannot finish {} turns",
                self.max_decisions, self.max_turns
            )));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_turns: self.max_turns,
            seed: self.seed,
            decision_timeout_ms: self.decision_timeout_ms,
            max_actions_per_decision: self.max_actions_per_decision,
        }
    }

    /// JSON override if configured, otherwise the built-in tables.
    pub fn load_reference(&self) -> Result<ReferenceData, ConfigError> {
        match &self.reference {
            Some(p) => read_json(p),
            None => Ok(theater::reference_data()),
        }
    }

    pub fn load_scenario(&self) -> Result<Scenario, ConfigError> {
        match &self.scenario {
            Some(p) => read_json(p),
            None => Ok(theater::default_scenario()),
        }
    }
}
