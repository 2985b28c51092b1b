use crate::config::CheckerThresholds;
use crate::error::Result;
use chainmon_alert::AlertCandidate;
use chainmon_common::AlertKind;
use chainmon_storage::EventStore;
use chrono::{DateTime, Utc};

/// Flags every event type whose most recent sample is older than its
/// configured wait. The candidate carries the stale event type as a second
/// token so composite alert-level entries can key on it.
pub fn check(
    store: &dyn EventStore,
    thresholds: &CheckerThresholds,
    agent: &str,
    now: DateTime<Utc>,
) -> Result<Vec<AlertCandidate>> {
    let latest = store.latest_event_per_type(agent)?;
    if latest.is_empty() {
        tracing::debug!(agent, "no events recorded yet, heartbeat inconclusive");
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for row in latest {
        let max_wait = thresholds.heartbeat_wait_secs(&row.event_type);
        let elapsed = (now - row.created_at).num_seconds();
        if elapsed <= max_wait as i64 {
            continue;
        }
        tracing::info!(
            agent,
            event_type = %row.event_type,
            elapsed_secs = elapsed,
            max_wait_secs = max_wait,
            "heartbeat overdue"
        );
        candidates.push(AlertCandidate::new(
            agent,
            vec![
                AlertKind::Heartbeat.keyword().to_string(),
                row.event_type.clone(),
            ],
            format!(
                "\nLatest heartbeat ({}):\n{} ({elapsed}s ago)\nMax wait: {max_wait}s",
                row.event_type,
                row.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            ),
        ));
    }
    Ok(candidates)
}
