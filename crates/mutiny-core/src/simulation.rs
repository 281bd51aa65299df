//! Run bookkeeping: start time, termination conditions, and the result
//! record frozen when a run ends.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mutiny_types::RunId;
use mutiny_world::{Score, World};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors raised while persisting a result record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The results directory or file could not be written.
    #[error("failed to write result record: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The record could not be serialised.
    #[error("failed to serialise result record: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// The wall-clock limit elapsed.
    Timeout,
    /// Every hostile NPC is dead.
    AllEnemiesEliminated,
    /// The server was stopped externally.
    Shutdown,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::AllEnemiesEliminated => "all-enemies-eliminated",
            Self::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

/// One bounded simulation run.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    id: RunId,
    started_at: DateTime<Utc>,
    time_limit: Duration,
    initial_world: World,
}

impl SimulationRun {
    /// Start a run over `world` now.
    pub fn start(world: &World, time_limit: Duration) -> Self {
        let run = Self {
            id: RunId::new(),
            started_at: Utc::now(),
            time_limit,
            initial_world: world.clone(),
        };
        info!(
            run_id = %run.id,
            time_limit_secs = time_limit.as_secs(),
            "Simulation run started"
        );
        run
    }

    /// The run identifier.
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// When the run started.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the run should end, given the live world at `now`.
    ///
    /// Elimination only counts when the run began with at least one enemy.
    pub fn check(&self, world: &World, now: DateTime<Utc>) -> Option<EndReason> {
        let started_with_enemies = self.initial_world.score().enemies > 0;
        if started_with_enemies && world.all_enemies_eliminated() {
            return Some(EndReason::AllEnemiesEliminated);
        }
        let elapsed = (now - self.started_at).to_std().unwrap_or_default();
        (elapsed >= self.time_limit).then_some(EndReason::Timeout)
    }

    /// Freeze the final state of the run.
    pub fn finish(&self, world: &World, reason: EndReason) -> ResultRecord {
        ResultRecord {
            run_id: self.id,
            started_at: self.started_at,
            ended_at: Utc::now(),
            end_reason: reason,
            initial_world: self.initial_world.clone(),
            score: world.score(),
            event_log: world.event_log().render(),
        }
    }
}

/// Everything kept about a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Run identifier, also the file stem.
    pub run_id: RunId,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// End timestamp.
    pub ended_at: DateTime<Utc>,
    /// Why the run ended.
    pub end_reason: EndReason,
    /// The world as it was at start.
    pub initial_world: World,
    /// Final score.
    pub score: Score,
    /// Rendered event log.
    pub event_log: String,
}

impl ResultRecord {
    /// Write the record as pretty JSON to `<dir>/<run-id>.json`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, RecordError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.run_id));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!(
            run_id = %self.run_id,
            end_reason = %self.end_reason,
            path = %path.display(),
            "Result record written"
        );
        Ok(path)
    }
}
