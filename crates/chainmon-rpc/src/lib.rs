//! CometBFT RPC client used by the chainmon monitors.
//!
//! Exposes the three endpoints the monitors sample (`/status`, `/net_info`,
//! `/commit?height=`) behind the [`ChainRpc`] trait so the monitor and
//! backfill code can be tested against a mock node.

pub mod error;
pub mod types;

use async_trait::async_trait;
use error::{Result, RpcError};
use serde::de::DeserializeOwned;
use std::time::Duration;
use types::{NetInfo, NodeStatus, RpcEnvelope, SignedCommit};

/// A node's consensus-engine RPC surface, as consumed by the monitors.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn status(&self) -> Result<NodeStatus>;
    async fn net_info(&self) -> Result<NetInfo>;
    async fn commit(&self, height: u64) -> Result<SignedCommit>;
}

/// HTTP implementation of [`ChainRpc`] with a configured timeout and a
/// small fixed retry count on transport error (no backoff, matching the
/// push cadence these calls run at).
pub struct HttpRpcClient {
    client: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl HttpRpcClient {
    pub fn new(base_url: &str, timeout: Duration, retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retries: retries.max(1),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str, url: String) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(&url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if !status.is_success() {
                        return Err(RpcError::Api {
                            endpoint,
                            status: status.as_u16(),
                        });
                    }
                    let body = resp.text().await?;
                    let envelope: RpcEnvelope<T> = serde_json::from_str(&body)
                        .map_err(|source| RpcError::Decode { endpoint, source })?;
                    return Ok(envelope.result);
                }
                Err(e) if attempt >= self.retries => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(endpoint, attempt, error = %e, "rpc request failed");
                }
            }
        }
    }
}

#[async_trait]
impl ChainRpc for HttpRpcClient {
    async fn status(&self) -> Result<NodeStatus> {
        self.get_json("/status", format!("{}/status", self.base_url))
            .await
    }

    async fn net_info(&self) -> Result<NetInfo> {
        self.get_json("/net_info", format!("{}/net_info", self.base_url))
            .await
    }

    async fn commit(&self, height: u64) -> Result<SignedCommit> {
        self.get_json(
            "/commit",
            format!("{}/commit?height={height}", self.base_url),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::types::*;

    #[test]
    fn decodes_status_envelope() {
        let body = r#"{
            "jsonrpc": "2.0",
            "id": -1,
            "result": {
                "node_info": {
                    "id": "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771",
                    "listen_addr": "tcp://0.0.0.0:26656",
                    "network": "testchain-1",
                    "moniker": "val-1"
                },
                "sync_info": {
                    "latest_block_hash": "AA11",
                    "latest_block_height": "1042",
                    "latest_block_time": "2024-05-01T12:00:00.123456789Z",
                    "earliest_block_height": "1",
                    "earliest_block_time": "2024-01-01T00:00:00Z",
                    "catching_up": false
                }
            }
        }"#;
        let envelope: RpcEnvelope<NodeStatus> = serde_json::from_str(body).unwrap();
        let status = envelope.result;
        assert_eq!(status.node_info.moniker, "val-1");
        assert_eq!(
            parse_u64("latest_block_height", &status.sync_info.latest_block_height).unwrap(),
            1042
        );
        assert!(!status.sync_info.catching_up);
    }

    #[test]
    fn decodes_net_info_envelope() {
        let body = r#"{
            "result": {
                "listening": true,
                "n_peers": "2",
                "peers": [
                    {
                        "node_info": {
                            "id": "peer-a",
                            "listen_addr": "tcp://0.0.0.0:26656",
                            "network": "testchain-1",
                            "moniker": "sentry-1"
                        },
                        "remote_ip": "10.0.0.5",
                        "is_outbound": true
                    },
                    {
                        "node_info": {
                            "id": "peer-b",
                            "listen_addr": "tcp://0.0.0.0:26656",
                            "network": "testchain-1",
                            "moniker": "sentry-2"
                        },
                        "remote_ip": "10.0.0.6"
                    }
                ]
            }
        }"#;
        let envelope: RpcEnvelope<NetInfo> = serde_json::from_str(body).unwrap();
        let net_info = envelope.result;
        assert_eq!(parse_u64("n_peers", &net_info.n_peers).unwrap(), 2);
        assert_eq!(net_info.peers.len(), 2);
        assert!(net_info.peers[0].is_outbound);
        assert!(!net_info.peers[1].is_outbound);
    }

    #[test]
    fn decodes_commit_with_absent_signature_slot() {
        let body = r#"{
            "result": {
                "signed_header": {
                    "header": {
                        "chain_id": "testchain-1",
                        "height": "1042",
                        "time": "2024-05-01T12:00:00Z",
                        "data_hash": "DD",
                        "proposer_address": "PROP"
                    },
                    "commit": {
                        "height": "1042",
                        "round": 0,
                        "block_id": { "hash": "BB" },
                        "signatures": [
                            {
                                "block_id_flag": 2,
                                "validator_address": "VALIDATOR_A",
                                "timestamp": "2024-05-01T12:00:00Z",
                                "signature": "c2ln"
                            },
                            {
                                "block_id_flag": 1,
                                "validator_address": "",
                                "timestamp": "0001-01-01T00:00:00Z",
                                "signature": null
                            }
                        ]
                    }
                }
            }
        }"#;
        let envelope: RpcEnvelope<SignedCommit> = serde_json::from_str(body).unwrap();
        let commit = envelope.result.signed_header;
        assert_eq!(parse_u64("height", &commit.commit.height).unwrap(), 1042);
        assert_eq!(commit.commit.signatures.len(), 2);
        assert!(commit.commit.signatures[1].validator_address.is_empty());
        assert!(commit.commit.signatures[1].signature.is_none());
    }

    #[test]
    fn rejects_malformed_numeric_field() {
        assert!(parse_u64("height", "not-a-number").is_err());
    }
}
