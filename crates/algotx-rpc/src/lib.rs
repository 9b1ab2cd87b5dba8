//! algod REST client library.
//!
//! Provides an async HTTP client for the node's `/v2` REST API: suggested
//! parameters, raw transaction submission, pending-transaction polling and
//! the confirmation wait loop built on top of them.
//!
//! # Example
//!
//! ```ignore
//! use algotx_rpc::NodeRpc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let node = NodeRpc::new("https://testnet-api.algonode.cloud");
//!     let status = node.status().await.unwrap();
//!     println!("Round: {}", status.last_round);
//! }
//! ```

pub mod client;
pub mod error;
pub mod node;


pub use client::{RpcClient, RpcConfig};
pub use error::RpcError;
pub use node::{
    AssetInfo, AssetInfoParams, NodeRpc, NodeStatus, PendingTransaction, SendResult,
    TransactionParams,
};
