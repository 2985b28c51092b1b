use crate::error::{Result, RpcError};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// CometBFT JSON-RPC envelope; every endpoint wraps its payload in `result`.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope<T> {
    pub result: T,
}

/// Heights and a few other numeric fields arrive as decimal strings.
pub fn parse_u64(field: &'static str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| RpcError::InvalidField {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireNodeInfo {
    pub id: String,
    pub listen_addr: String,
    pub network: String,
    pub moniker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncInfo {
    pub latest_block_hash: String,
    pub latest_block_height: String,
    pub latest_block_time: DateTime<Utc>,
    pub earliest_block_height: String,
    pub earliest_block_time: DateTime<Utc>,
    pub catching_up: bool,
}

/// `/status` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub node_info: WireNodeInfo,
    pub sync_info: SyncInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePeer {
    pub node_info: WireNodeInfo,
    pub remote_ip: String,
    #[serde(default)]
    pub is_outbound: bool,
}

/// `/net_info` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NetInfo {
    pub listening: bool,
    pub n_peers: String,
    #[serde(default)]
    pub peers: Vec<WirePeer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockId {
    pub hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitHeader {
    pub chain_id: String,
    pub height: String,
    pub time: DateTime<Utc>,
    pub data_hash: String,
    pub proposer_address: String,
}

/// One signature slot in a commit. Absent validators appear as a slot with
/// an empty `validator_address` and a null signature.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSignature {
    pub block_id_flag: i64,
    pub validator_address: String,
    pub timestamp: DateTime<Utc>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCommit {
    pub height: String,
    pub round: i64,
    pub block_id: BlockId,
    pub signatures: Vec<WireSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedHeader {
    pub header: CommitHeader,
    pub commit: WireCommit,
}

/// `/commit` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedCommit {
    pub signed_header: SignedHeader,
}
