use crate::config::CheckerThresholds;
use crate::error::Result;
use chainmon_alert::AlertCandidate;
use chainmon_common::AlertKind;
use chainmon_storage::EventStore;
use chrono::{DateTime, Duration, Utc};

/// A net-info sample older than this is flagged as stale before use.
const STALE_SAMPLE_SECS: i64 = 300;

/// Alerts when the latest net-info sample reports fewer peers than the
/// configured floor.
pub fn check(
    store: &dyn EventStore,
    thresholds: &CheckerThresholds,
    agent: &str,
    now: DateTime<Utc>,
) -> Result<Option<AlertCandidate>> {
    let Some(row) = store.latest_net_info(agent)? else {
        tracing::debug!(agent, "no net-info samples yet, peer check inconclusive");
        return Ok(None);
    };

    if now - row.created_at > Duration::seconds(STALE_SAMPLE_SECS) {
        tracing::warn!(
            agent,
            sampled_at = %row.created_at,
            "latest net-info sample is stale"
        );
    }
    if row.n_peers != row.stored_peer_count {
        tracing::warn!(
            agent,
            reported = row.n_peers,
            stored = row.stored_peer_count,
            "reported peer count disagrees with stored peer rows"
        );
    }

    if row.n_peers >= thresholds.min_peer_count {
        return Ok(None);
    }
    tracing::info!(
        agent,
        n_peers = row.n_peers,
        floor = thresholds.min_peer_count,
        "peer count below floor"
    );
    Ok(Some(AlertCandidate::new(
        agent,
        vec![AlertKind::LowPeer.keyword().to_string()],
        format!(
            "\nConnected peers: {}\nMinimum required: {}",
            row.n_peers, thresholds.min_peer_count,
        ),
    )))
}
