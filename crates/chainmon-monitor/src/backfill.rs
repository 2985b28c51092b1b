use crate::error::Result;
use crate::pool::FetchPool;
use chainmon_common::types::{CommitRecord, CommitSignature, Event};
use chainmon_common::{EventType, TENDERMINT_SERVICE};
use chainmon_rpc::types::{parse_u64, SignedCommit};
use chainmon_rpc::ChainRpc;
use chainmon_storage::EventStore;
use std::sync::Arc;

/// How many push intervals' worth of blocks a single backfill cycle may
/// cover. A node that has been down for longer resumes from a truncated
/// range instead of replaying its whole outage.
const CLAMP_FACTOR: u64 = 200;

/// Walks the commit-height gap between the store and the live chain tip
/// for one agent, fetching the missing range through a bounded pool and
/// persisting it as a single idempotent batch.
pub struct Backfiller {
    rpc: Arc<dyn ChainRpc>,
    store: Arc<dyn EventStore>,
    agent_name: String,
    run_id: String,
    push_interval_secs: u64,
    max_concurrency: usize,
}

impl Backfiller {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        store: Arc<dyn EventStore>,
        agent_name: &str,
        run_id: &str,
        push_interval_secs: u64,
        max_concurrency: usize,
    ) -> Self {
        Self {
            rpc,
            store,
            agent_name: agent_name.to_string(),
            run_id: run_id.to_string(),
            push_interval_secs: push_interval_secs.max(1),
            max_concurrency,
        }
    }

    /// Runs one backfill cycle. Returns the number of commits persisted.
    ///
    /// The range covered is `[start, live)` where `start` is one past the
    /// highest stored height, or `live - 1` on an agent with no history.
    /// The live tip itself is left to the next cycle, when its commit is
    /// final. Heights whose fetch or decode fails are skipped; the next
    /// cycle will not revisit them.
    pub async fn run_once(&self) -> Result<usize> {
        let status = self.rpc.status().await?;
        let live = parse_u64(
            "latest_block_height",
            &status.sync_info.latest_block_height,
        )?;
        if live == 0 {
            return Ok(0);
        }

        let mut start = match self.store.highest_commit_height(&self.agent_name)? {
            Some(highest) => highest + 1,
            None => live - 1,
        };
        if start >= live {
            return Ok(0);
        }

        let max_span = self.push_interval_secs * CLAMP_FACTOR;
        if live - start > max_span {
            tracing::warn!(
                agent = %self.agent_name,
                gap = live - start,
                max = max_span,
                "commit gap exceeds backfill budget, truncating range"
            );
            start = live - max_span;
        }

        let mut pool = FetchPool::new(Arc::clone(&self.rpc), self.max_concurrency);
        for height in start..live {
            pool.submit(height);
        }

        let mut records = Vec::new();
        for (height, outcome) in pool.drain().await {
            let commit = match outcome {
                Ok(commit) => commit,
                Err(e) => {
                    tracing::warn!(
                        agent = %self.agent_name,
                        height,
                        error = %e,
                        "commit fetch failed, height skipped"
                    );
                    continue;
                }
            };
            match self.to_record(commit) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        agent = %self.agent_name,
                        height,
                        error = %e,
                        "commit payload rejected, height skipped"
                    );
                }
            }
        }
        records.sort_by_key(|r| r.height);

        self.store.save_commit_batch(&records)?;
        tracing::debug!(
            agent = %self.agent_name,
            from = start,
            to = live - 1,
            stored = records.len(),
            "backfill cycle complete"
        );
        Ok(records.len())
    }

    fn to_record(&self, commit: SignedCommit) -> chainmon_rpc::error::Result<CommitRecord> {
        let header = commit.signed_header.header;
        let wire = commit.signed_header.commit;
        let height = parse_u64("height", &wire.height)?;
        let signatures = wire
            .signatures
            .into_iter()
            // Absent-validator slots carry nothing for miss counting.
            .filter(|s| !s.validator_address.is_empty())
            .map(|s| CommitSignature {
                validator_address: s.validator_address,
                timestamp: s.timestamp,
                signature: s.signature.unwrap_or_default(),
                block_id_flag: s.block_id_flag,
            })
            .collect();
        Ok(CommitRecord {
            event: Event::new(
                &self.agent_name,
                TENDERMINT_SERVICE,
                &self.run_id,
                EventType::Commit,
            ),
            chain_id: header.chain_id,
            height,
            block_time: header.time,
            block_id_hash: wire.block_id.hash,
            data_hash: header.data_hash,
            proposer_address: header.proposer_address,
            round: wire.round,
            signatures,
        })
    }
}
