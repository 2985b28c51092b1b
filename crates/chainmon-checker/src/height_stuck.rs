use crate::config::CheckerThresholds;
use crate::error::Result;
use chainmon_alert::AlertCandidate;
use chainmon_common::AlertKind;
use chainmon_storage::EventStore;
use chrono::{DateTime, Duration, Utc};

/// Alerts when every status sample inside the stuck window reports the
/// same block height. An empty window is inconclusive; a single height
/// change anywhere in the window clears the agent.
pub fn check(
    store: &dyn EventStore,
    thresholds: &CheckerThresholds,
    agent: &str,
    now: DateTime<Utc>,
) -> Result<Option<AlertCandidate>> {
    let since = now - Duration::seconds(thresholds.max_stuck_secs as i64);
    let window = store.status_window(agent, since)?;
    let Some(newest) = window.first() else {
        tracing::debug!(agent, "no status samples in window, height check inconclusive");
        return Ok(None);
    };

    let frozen = newest.latest_block_height;
    if window.iter().any(|row| row.latest_block_height != frozen) {
        return Ok(None);
    }

    let oldest = window.last().unwrap_or(newest);
    let stuck_secs = (now - oldest.created_at).num_seconds();
    tracing::info!(
        agent,
        height = frozen,
        stuck_secs,
        "block height has not advanced"
    );
    Ok(Some(AlertCandidate::new(
        agent,
        vec![AlertKind::HeightStuck.keyword().to_string()],
        format!(
            "\nBlock height stuck at {frozen} since {} ({stuck_secs}s)\nMax stuck: {}s",
            oldest.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            thresholds.max_stuck_secs,
        ),
    )))
}
