//! Event store for chainmon telemetry, alert records and mute marks.
//!
//! Monitors append typed samples (status, net-info, commit) anchored on an
//! event row; checkers read windowed views back out. Every query is scoped
//! to the `run_id` the store was opened with, so rows written by an
//! incompatible deployment generation are invisible.
//!
//! The default implementation ([`sqlite::SqliteEventStore`]) is a single
//! SQLite database in WAL mode.

pub mod error;
pub mod sqlite;


use chainmon_common::types::{AgentMark, AlertRecord, CommitRecord, NetInfoRecord, StatusRecord};
use chrono::{DateTime, Duration, Utc};
use error::Result;

/// Most recent event timestamp for one event type, as read by the
/// heartbeat checker.
#[derive(Debug, Clone)]
pub struct LastEventRow {
    pub event_type: String,
    pub created_at: DateTime<Utc>,
}

/// One status sample inside a height-stuck scan window, newest first.
#[derive(Debug, Clone)]
pub struct StatusRow {
    pub latest_block_height: u64,
    pub latest_block_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One commit height annotated with whether the configured validator's
/// signature is present at that height.
#[derive(Debug, Clone)]
pub struct CommitSignRow {
    pub height: u64,
    pub signed: bool,
    pub created_at: DateTime<Utc>,
}

/// The latest net-info sample for an agent. `stored_peer_count` is the
/// number of peer rows actually persisted, which the low-peer checker
/// cross-checks against the reported `n_peers`.
#[derive(Debug, Clone)]
pub struct NetInfoRow {
    pub event_id: String,
    pub n_peers: u64,
    pub listening: bool,
    pub stored_peer_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Persistence backend for telemetry events, alert records and mute marks.
///
/// Implementations must be `Send + Sync`: monitors, checkers and the alert
/// dispatcher all hold the store concurrently, each logical operation being
/// one pooled round trip with no cross-operation transaction.
pub trait EventStore: Send + Sync {
    /// Appends one status sample with its event anchor.
    fn save_status(&self, record: &StatusRecord) -> Result<()>;

    /// Appends one net-info sample, including its peer rows.
    fn save_net_info(&self, record: &NetInfoRecord) -> Result<()>;

    /// Appends a batch of backfilled commits in one transaction. Heights
    /// already present for `(agent, run_id)` are skipped, which makes the
    /// backfill pipeline idempotent against re-fetched ranges.
    fn save_commit_batch(&self, records: &[CommitRecord]) -> Result<()>;

    /// Highest commit height stored for the agent, or `None` when the agent
    /// has no commit history yet.
    fn highest_commit_height(&self, agent: &str) -> Result<Option<u64>>;

    /// Most recent event timestamp per event type. Each type is reduced
    /// independently, so heavy traffic on one type (a backfill writing many
    /// commit events) cannot push another type out of view.
    fn latest_event_per_type(&self, agent: &str) -> Result<Vec<LastEventRow>>;

    /// Status samples created after `since`, newest first.
    fn status_window(&self, agent: &str, since: DateTime<Utc>) -> Result<Vec<StatusRow>>;

    /// The agent's most recent `limit` commit heights, newest first, each
    /// annotated with the presence of `validator`'s signature.
    fn commit_signature_window(
        &self,
        agent: &str,
        validator: &str,
        limit: u32,
    ) -> Result<Vec<CommitSignRow>>;

    /// The agent's most recent net-info sample, if any.
    fn latest_net_info(&self, agent: &str) -> Result<Option<NetInfoRow>>;

    /// Dedup-guard query: true when an alert record for the exact
    /// `(alert_name, alarmer, agent)` tuple exists within
    /// `[now - window, now]`, or an active mute mark covers `now` for the
    /// agent.
    fn alert_sent_or_marked(
        &self,
        alert_name: &str,
        alarmer_name: &str,
        agent: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Records a dispatched alert.
    fn save_alert_record(&self, record: &AlertRecord) -> Result<()>;

    /// Creates or updates a mute mark keyed on `(agent_name, mark_start)`.
    fn upsert_mark(&self, mark: &AgentMark) -> Result<()>;

    /// Removes a mute mark. Returns true when a row was deleted.
    fn clear_mark(&self, agent: &str, mark_start: DateTime<Utc>) -> Result<bool>;

    /// Mute marks covering `at` for the agent.
    fn active_marks(&self, agent: &str, at: DateTime<Utc>) -> Result<Vec<AgentMark>>;
}
