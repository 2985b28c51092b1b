use crate::error::Result;
use chainmon_common::types::{Event, StatusRecord};
use chainmon_common::{EventType, TENDERMINT_SERVICE};
use chainmon_rpc::types::parse_u64;
use chainmon_rpc::ChainRpc;
use chainmon_storage::EventStore;
use std::sync::Arc;

/// Samples `/status` on the push cadence and appends the result.
pub struct StatusMonitor {
    rpc: Arc<dyn ChainRpc>,
    store: Arc<dyn EventStore>,
    agent_name: String,
    run_id: String,
}

impl StatusMonitor {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        store: Arc<dyn EventStore>,
        agent_name: &str,
        run_id: &str,
    ) -> Self {
        Self {
            rpc,
            store,
            agent_name: agent_name.to_string(),
            run_id: run_id.to_string(),
        }
    }

    pub async fn sample(&self) -> Result<()> {
        let status = self.rpc.status().await?;
        let sync = status.sync_info;
        let record = StatusRecord {
            event: Event::new(
                &self.agent_name,
                TENDERMINT_SERVICE,
                &self.run_id,
                EventType::Status,
            ),
            latest_block_height: parse_u64("latest_block_height", &sync.latest_block_height)?,
            latest_block_time: sync.latest_block_time,
            earliest_block_height: parse_u64(
                "earliest_block_height",
                &sync.earliest_block_height,
            )?,
            earliest_block_time: sync.earliest_block_time,
            catching_up: sync.catching_up,
        };
        self.store.save_status(&record)?;
        tracing::debug!(
            agent = %self.agent_name,
            height = record.latest_block_height,
            catching_up = record.catching_up,
            "status sample stored"
        );
        Ok(())
    }
}
