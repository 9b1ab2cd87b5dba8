//! Node RPC client.
//!
//! Typed async methods for the algod `/v2` endpoints used to compose and
//! submit transactions: suggested parameters, raw submission, pending
//! transaction lookup, status and asset metadata.

use crate::client::{RpcClient, RpcConfig};
use crate::error::RpcError;
use algotx_tx::NetworkParams;
use algotx_types::constants::DEFAULT_VALIDITY_WINDOW;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

// =============================================================================
// Response Types
// =============================================================================

/// `GET /v2/transactions/params` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransactionParams {
    #[serde(default)]
    pub consensus_version: String,
    /// Suggested fee per byte.
    pub fee: u64,
    /// Base64 genesis hash.
    pub genesis_hash: String,
    pub genesis_id: String,
    pub last_round: u64,
    pub min_fee: u64,
}

impl TransactionParams {
    /// Convert to encoder parameters with the default validity window.
    pub fn to_network_params(&self) -> Result<NetworkParams, RpcError> {
        let hash = STANDARD
            .decode(&self.genesis_hash)
            .map_err(|e| RpcError::Other(format!("invalid genesis hash: {}", e)))?;
        let genesis_hash: [u8; 32] = hash.as_slice().try_into().map_err(|_| {
            RpcError::Other(format!("genesis hash has {} bytes, expected 32", hash.len()))
        })?;

        Ok(NetworkParams {
            genesis_id: self.genesis_id.clone(),
            genesis_hash,
            fee_per_byte: self.fee,
            min_fee: self.min_fee,
            first_round: self.last_round,
            last_round: self.last_round.saturating_add(DEFAULT_VALIDITY_WINDOW),
        })
    }
}

/// `GET /v2/status` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeStatus {
    pub last_round: u64,
    #[serde(default)]
    pub time_since_last_round: u64,
    #[serde(default)]
    pub catchup_time: u64,
    #[serde(default)]
    pub last_version: String,
}

/// `GET /v2/transactions/pending/{txid}` response (msgpack).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PendingTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_round: Option<u64>,
    #[serde(default)]
    pub pool_error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_index: Option<u64>,
}

impl PendingTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_round.is_some_and(|r| r > 0)
    }
}

/// `POST /v2/transactions` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResult {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

/// Asset parameters as reported by the node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssetInfoParams {
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub default_frozen: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub reserve: Option<String>,
    #[serde(default)]
    pub freeze: Option<String>,
    #[serde(default)]
    pub clawback: Option<String>,
}

/// `GET /v2/assets/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfo {
    pub index: u64,
    pub params: AssetInfoParams,
}

// =============================================================================
// NodeRpc
// =============================================================================

/// Async RPC client for an algod node.
pub struct NodeRpc {
    client: RpcClient,
}

impl NodeRpc {
    /// Create a node RPC client connected to the given URL.
    pub fn new(url: &str) -> Self {
        Self {
            client: RpcClient::new(url),
        }
    }

    /// Create with full configuration.
    pub fn with_config(config: RpcConfig) -> Self {
        Self {
            client: RpcClient::with_config(config),
        }
    }

    /// Get the underlying RPC client for custom calls.
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    // =========================================================================
    // Network Information
    // =========================================================================

    /// Get suggested transaction parameters.
    pub async fn transaction_params(&self) -> Result<TransactionParams, RpcError> {
        self.client.get_json("/v2/transactions/params").await
    }

    /// Suggested parameters converted for the encoder.
    pub async fn network_params(&self) -> Result<NetworkParams, RpcError> {
        self.transaction_params().await?.to_network_params()
    }

    /// Get node status.
    pub async fn status(&self) -> Result<NodeStatus, RpcError> {
        self.client.get_json("/v2/status").await
    }

    /// Wait until the node has seen a block after `round`.
    pub async fn status_after_block(&self, round: u64) -> Result<NodeStatus, RpcError> {
        self.client
            .get_json(&format!("/v2/status/wait-for-block-after/{}", round))
            .await
    }

    /// Get asset parameters (for display of decimals and names).
    pub async fn asset_info(&self, asset_id: u64) -> Result<AssetInfo, RpcError> {
        self.client
            .get_json(&format!("/v2/assets/{}", asset_id))
            .await
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Submit raw signed transaction bytes. Returns the transaction id.
    pub async fn send_raw_transaction(&self, signed: &[u8]) -> Result<String, RpcError> {
        let val = self
            .client
            .post_binary("/v2/transactions", signed.to_vec())
            .await?;
        let result: SendResult = serde_json::from_value(val)?;
        log::info!("Submitted transaction {}", result.tx_id);
        Ok(result.tx_id)
    }

    /// Look up a transaction in the pending pool.
    pub async fn pending_transaction(&self, tx_id: &str) -> Result<PendingTransaction, RpcError> {
        self.client
            .get_msgpack(&format!(
                "/v2/transactions/pending/{}?format=msgpack",
                tx_id
            ))
            .await
    }

    /// Poll until `tx_id` is confirmed, for at most `rounds` rounds.
    ///
    /// Fails with [`RpcError::Rejected`] when the pool reports an error and
    /// with [`RpcError::NotConfirmed`] when the round budget runs out.
    pub async fn wait_for_confirmation(
        &self,
        tx_id: &str,
        rounds: u64,
    ) -> Result<PendingTransaction, RpcError> {
        let status = self.status().await?;
        let start_round = status.last_round.saturating_add(1);

        // A zero budget still checks the pool once.
        for offset in 0..rounds.max(1) {
            let pending = self.pending_transaction(tx_id).await?;
            if pending.is_confirmed() {
                log::info!(
                    "Transaction {} confirmed in round {}",
                    tx_id,
                    pending.confirmed_round.unwrap_or_default()
                );
                return Ok(pending);
            }
            if !pending.pool_error.is_empty() {
                return Err(RpcError::Rejected {
                    tx_id: tx_id.to_string(),
                    pool_error: pending.pool_error,
                });
            }
            if offset + 1 < rounds {
                self.status_after_block(start_round.saturating_add(offset))
                    .await?;
            }
        }

        Err(RpcError::NotConfirmed {
            tx_id: tx_id.to_string(),
            rounds,
        })
    }
}
