//! Liveness and signing checkers.
//!
//! Each checker reads a window of stored telemetry for one agent and emits
//! [`chainmon_alert::AlertCandidate`]s for every violated condition.
//! Checkers never talk to the node directly; a cycle that finds no usable
//! data is inconclusive and stays silent rather than guessing.

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod height_stuck;
pub mod low_peer;
pub mod missing_block;

#[cfg(test)]
mod tests;

use chainmon_alert::AlertCandidate;
use chainmon_storage::EventStore;
use chrono::{DateTime, Utc};
use config::CheckerThresholds;
use error::Result;
use serde::Deserialize;

/// The built-in checker set, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckerKind {
    Heartbeat,
    HeightStuck,
    LowPeer,
    MissingBlock,
}

impl CheckerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckerKind::Heartbeat => "heartbeat",
            CheckerKind::HeightStuck => "height_stuck",
            CheckerKind::LowPeer => "low_peer",
            CheckerKind::MissingBlock => "missing_block",
        }
    }

    /// Runs this checker for one agent at `now`.
    pub fn run(
        &self,
        store: &dyn EventStore,
        thresholds: &CheckerThresholds,
        agent: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertCandidate>> {
        match self {
            CheckerKind::Heartbeat => heartbeat::check(store, thresholds, agent, now),
            CheckerKind::HeightStuck => {
                Ok(height_stuck::check(store, thresholds, agent, now)?
                    .into_iter()
                    .collect())
            }
            CheckerKind::LowPeer => Ok(low_peer::check(store, thresholds, agent, now)?
                .into_iter()
                .collect()),
            CheckerKind::MissingBlock => Ok(missing_block::check(store, thresholds, agent)?
                .into_iter()
                .collect()),
        }
    }
}

impl std::fmt::Display for CheckerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckerKind {
    type Err = String;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name {
            "heartbeat" => Ok(CheckerKind::Heartbeat),
            "height_stuck" => Ok(CheckerKind::HeightStuck),
            "low_peer" => Ok(CheckerKind::LowPeer),
            "missing_block" => Ok(CheckerKind::MissingBlock),
            other => Err(format!("unknown checker '{other}'")),
        }
    }
}
