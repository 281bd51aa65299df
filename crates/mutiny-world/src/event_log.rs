//! Cumulative, append-only record of what happened in a world.
//!
//! Entries are numbered in the order they were recorded. The rendered text
//! form, one entry per line, is what ends up in a run's result record.

use core::fmt;

use mutiny_types::ActorId;
use serde::{Deserialize, Serialize};

/// A single recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position of the entry in the log, starting at zero.
    pub seq: u64,
    /// The actor the event concerns, if any.
    pub actor: Option<ActorId>,
    /// Human-readable description.
    pub text: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actor {
            Some(actor) => write!(f, "[{:04}] {actor}: {}", self.seq, self.text),
            None => write!(f, "[{:04}] {}", self.seq, self.text),
        }
    }
}

/// Ordered event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// Append an entry.
    pub fn record(&mut self, actor: Option<&ActorId>, text: impl Into<String>) {
        let seq = u64::try_from(self.entries.len()).unwrap_or(u64::MAX);
        self.entries.push(LogEntry {
            seq,
            actor: actor.cloned(),
            text: text.into(),
        });
    }

    /// All entries in recording order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The log as text, one entry per line.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_numbered_in_order() {
        let mut log = EventLog::default();
        let agent: ActorId = "agent1".parse().unwrap();
        log.record(Some(&agent), "moved up to (0,1)");
        log.record(None, "run started");
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries().first().map(|e| e.seq), Some(0));
        assert_eq!(
            log.render(),
            "[0000] agent1: moved up to (0,1)\n[0001] run started"
        );
    }
}
