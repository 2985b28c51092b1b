use crate::EventType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One telemetry sample anchor. Immutable once written; typed payload rows
/// (status, net-info, commit) reference it by `event_id`.
///
/// `run_id` scopes all rows to one deployment generation of the monitoring
/// fleet so data from incompatible schema generations never mixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub agent_name: String,
    pub service_name: String,
    pub run_id: String,
    pub event_type: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(agent_name: &str, service_name: &str, run_id: &str, event_type: EventType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            agent_name: agent_name.to_string(),
            service_name: service_name.to_string(),
            run_id: run_id.to_string(),
            event_type: event_type.as_str().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Consensus-engine `/status` sample, one-to-one with an [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub event: Event,
    pub latest_block_height: u64,
    pub latest_block_time: DateTime<Utc>,
    pub earliest_block_height: u64,
    pub earliest_block_time: DateTime<Utc>,
    pub catching_up: bool,
}

/// Identity of a remote node as reported in `/net_info` peer entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: String,
    pub listen_addr: String,
    pub chain_id: String,
    pub moniker: String,
}

/// One connected peer within a [`NetInfoRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub node: NodeInfo,
    pub remote_ip: String,
    pub is_outbound: bool,
}

/// `/net_info` sample: reported peer count plus one [`PeerInfo`] per peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetInfoRecord {
    pub event: Event,
    pub n_peers: u64,
    pub listening: bool,
    pub peers: Vec<PeerInfo>,
}

/// One validator signature on a commit. Rows with an empty validator
/// address carry no information for miss counting and are dropped before
/// a [`CommitRecord`] is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSignature {
    pub validator_address: String,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
    pub block_id_flag: i64,
}

/// `/commit` sample for one height, with the signature set that made it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub event: Event,
    pub chain_id: String,
    pub height: u64,
    pub block_time: DateTime<Utc>,
    pub block_id_hash: String,
    pub data_hash: String,
    pub proposer_address: String,
    pub round: i64,
    pub signatures: Vec<CommitSignature>,
}

/// Audit row written once an alert has actually been dispatched.
/// Its existence implies the dedup guard permitted the send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub alert_name: String,
    pub level: String,
    pub alarmer_name: String,
    pub agent_name: String,
    pub run_id: String,
}

/// Operator-authored mute window. `mark_end = None` means "muted
/// indefinitely until explicitly cleared".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMark {
    pub agent_name: String,
    pub mark_start: DateTime<Utc>,
    pub mark_end: Option<DateTime<Utc>>,
    pub marker_identity: String,
    pub marker_source: String,
}

impl AgentMark {
    /// A mark is active at `now` when it has started and either has no end
    /// or its end lies in the future.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.mark_start <= now && self.mark_end.map_or(true, |end| end >= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn open_ended_mark_is_active() {
        let now = Utc::now();
        let mark = AgentMark {
            agent_name: "val-1".into(),
            mark_start: now - Duration::hours(1),
            mark_end: None,
            marker_identity: "ops@example.com".into(),
            marker_source: "slack".into(),
        };
        assert!(mark.is_active(now));
    }

    #[test]
    fn expired_mark_is_inactive() {
        let now = Utc::now();
        let mark = AgentMark {
            agent_name: "val-1".into(),
            mark_start: now - Duration::hours(2),
            mark_end: Some(now - Duration::hours(1)),
            marker_identity: "ops@example.com".into(),
            marker_source: "slack".into(),
        };
        assert!(!mark.is_active(now));
    }

    #[test]
    fn future_mark_is_inactive() {
        let now = Utc::now();
        let mark = AgentMark {
            agent_name: "val-1".into(),
            mark_start: now + Duration::minutes(5),
            mark_end: None,
            marker_identity: "ops@example.com".into(),
            marker_source: "slack".into(),
        };
        assert!(!mark.is_active(now));
    }
}
