use crate::error::Result;
use chainmon_common::types::{Event, NetInfoRecord, NodeInfo, PeerInfo};
use chainmon_common::{EventType, TENDERMINT_SERVICE};
use chainmon_rpc::types::parse_u64;
use chainmon_rpc::ChainRpc;
use chainmon_storage::EventStore;
use std::sync::Arc;

/// Samples `/net_info` on the push cadence and appends the result,
/// including one row per connected peer.
pub struct NetInfoMonitor {
    rpc: Arc<dyn ChainRpc>,
    store: Arc<dyn EventStore>,
    agent_name: String,
    run_id: String,
}

impl NetInfoMonitor {
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
        let net_info = self.rpc.net_info().await?;
        let peers = net_info
            .peers
            .into_iter()
            .map(|p| PeerInfo {
                node: NodeInfo {
                    node_id: p.node_info.id,
                    listen_addr: p.node_info.listen_addr,
                    chain_id: p.node_info.network,
                    moniker: p.node_info.moniker,
                },
                remote_ip: p.remote_ip,
                is_outbound: p.is_outbound,
            })
            .collect::<Vec<_>>();
        let record = NetInfoRecord {
            event: Event::new(
                &self.agent_name,
                TENDERMINT_SERVICE,
                &self.run_id,
                EventType::NetInfo,
            ),
            n_peers: parse_u64("n_peers", &net_info.n_peers)?,
            listening: net_info.listening,
            peers,
        };
        self.store.save_net_info(&record)?;
        tracing::debug!(
            agent = %self.agent_name,
            n_peers = record.n_peers,
            "net-info sample stored"
        );
        Ok(())
    }
}
