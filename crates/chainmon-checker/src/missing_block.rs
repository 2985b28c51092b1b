use crate::config::CheckerThresholds;
use crate::error::Result;
use chainmon_alert::AlertCandidate;
use chainmon_common::AlertKind;
use chainmon_storage::EventStore;

/// Counts the configured validator's signatures over the most recent
/// `target_block_count` stored heights and alerts when the miss count
/// exceeds `max_missing_count`.
///
/// The scan requires a contiguous, complete window: a height gap means the
/// backfill is behind and absent signatures cannot be told apart from
/// unfetched blocks, so the cycle is skipped. A window shorter than the
/// target is likewise inconclusive.
pub fn check(
    store: &dyn EventStore,
    thresholds: &CheckerThresholds,
    agent: &str,
) -> Result<Option<AlertCandidate>> {
    let Some(cfg) = &thresholds.missing_block else {
        return Ok(None);
    };

    let window =
        store.commit_signature_window(agent, &cfg.validator_address, cfg.target_block_count)?;
    if window.is_empty() {
        tracing::debug!(agent, "no commits stored yet, signing check inconclusive");
        return Ok(None);
    }
    if (window.len() as u32) < cfg.target_block_count {
        tracing::debug!(
            agent,
            stored = window.len(),
            target = cfg.target_block_count,
            "commit history shorter than target window, signing check inconclusive"
        );
        return Ok(None);
    }

    // Rows come newest first; each height must be exactly one below its
    // predecessor.
    let mut prev = window[0].height;
    for row in &window[1..] {
        if row.height != prev - 1 {
            tracing::warn!(
                agent,
                expected = prev - 1,
                found = row.height,
                "commit window has a height gap, signing check skipped"
            );
            return Ok(None);
        }
        prev = row.height;
    }

    let signed = window.iter().filter(|row| row.signed).count() as u64;
    let missed = cfg.target_block_count as u64 - signed;
    if missed <= cfg.max_missing_count {
        return Ok(None);
    }
    tracing::info!(
        agent,
        validator = %cfg.validator_address,
        missed,
        target = cfg.target_block_count,
        "validator missing block signatures"
    );
    Ok(Some(AlertCandidate::new(
        agent,
        vec![AlertKind::MissingBlock.keyword().to_string()],
        format!(
            "\nValidator {} missed {missed} of the last {} blocks\nMax allowed: {}",
            cfg.validator_address, cfg.target_block_count, cfg.max_missing_count,
        ),
    )))
}
