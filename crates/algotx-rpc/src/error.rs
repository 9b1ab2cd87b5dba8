//! RPC error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP error calling {method} {url}: {source}")]
    Http {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    #[error("{method} {url} returned HTTP {status}: {body}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("authentication failed for {url}")]
    AuthFailed { url: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack decode error: {0}")]
    Msgpack(#[from] rmp_serde::decode::Error),

    #[error("transaction {tx_id} was rejected by the network: {pool_error}")]
    Rejected { tx_id: String, pool_error: String },

    #[error("transaction {tx_id} not confirmed after {rounds} rounds")]
    NotConfirmed { tx_id: String, rounds: u64 },

    #[error("{0}")]
    Other(String),
}

impl RpcError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            RpcError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RpcError::HttpStatus { status, .. } => Some(*status),
            RpcError::AuthFailed { .. } => Some(401),
            RpcError::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
