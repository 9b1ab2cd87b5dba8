//! Submission and storage error types.

use algotx_rpc::RpcError;
use algotx_tx::{DecodeError, EncodeError, EnvelopeError, ValidationResult};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure class of a send or confirmation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionErrorKind {
    /// The node refused the request (HTTP 4xx other than 401).
    Client,
    /// Missing or wrong API token (HTTP 401).
    Unauthorized,
    /// The node failed (HTTP 5xx).
    Server,
    /// The transaction pool rejected the transaction.
    Rejected,
    Unknown,
}

impl fmt::Display for SubmissionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmissionErrorKind::Client => "client",
            SubmissionErrorKind::Unauthorized => "unauthorized",
            SubmissionErrorKind::Server => "server",
            SubmissionErrorKind::Rejected => "rejected",
            SubmissionErrorKind::Unknown => "unknown",
        })
    }
}

/// A failed send or confirmation, classified for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct SubmissionError {
    pub kind: SubmissionErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl SubmissionError {
    /// Classify a failed send by HTTP status.
    pub fn from_send(err: &RpcError) -> Self {
        let status = err.status();
        let kind = match status {
            Some(401) => SubmissionErrorKind::Unauthorized,
            Some(400..=499) => SubmissionErrorKind::Client,
            Some(500..=599) => SubmissionErrorKind::Server,
            _ => SubmissionErrorKind::Unknown,
        };
        Self {
            kind,
            status,
            message: err.to_string(),
        }
    }

    /// Classify a failed confirmation wait that was not a timeout.
    pub fn from_confirmation(err: &RpcError) -> Self {
        let message = err.to_string();
        let kind = if message.contains("rejected") {
            SubmissionErrorKind::Rejected
        } else {
            SubmissionErrorKind::Unknown
        };
        Self {
            kind,
            status: err.status(),
            message,
        }
    }
}

/// Whether a confirmation error means the round budget ran out.
pub fn is_confirmation_timeout(err: &RpcError) -> bool {
    matches!(err, RpcError::NotConfirmed { .. }) || err.to_string().contains("not confirmed")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored draft: {0}")]
    Draft(#[from] serde_json::Error),

    #[error("invalid stored envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("state store lock poisoned")]
    Poisoned,
}

/// Engine operations that cannot start.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no signed transaction available")]
    NoEnvelope,

    #[error("no pending transaction to wait for")]
    NothingPending,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("draft has {} validation error(s)", .0.error_count())]
    Blocked(ValidationResult),

    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
