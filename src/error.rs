//! Error Types
//!
//! Typed errors for the seams where callers branch on the failure class:
//! chain RPC calls (revert vs. everything else), account secrets, and the
//! credentials file. Everything above these seams uses `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single JSON-RPC interaction with the chain.
///
/// Nothing in the client retries on these; retry and skip decisions belong
/// to the orchestrator and scheduler.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("transport error calling {method}: {reason}")]
    Transport { method: String, reason: String },

    /// The call did not complete within the configured RPC timeout.
    #[error("timed out after {secs}s waiting for {method}")]
    Timeout { method: String, secs: u64 },

    /// The node answered with a JSON-RPC error object.
    #[error("JSON-RPC error from {method}: {message} (code: {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    /// Contract execution reverted, either during `eth_call` or in a mined receipt.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// The node answered, but the payload was not what the call expects.
    #[error("malformed {method} response: {reason}")]
    Decode { method: String, reason: String },
}

impl ChainError {
    /// Whether this error is a contract revert (as opposed to a node or network failure).
    pub fn is_revert(&self) -> bool {
        matches!(self, ChainError::Reverted(_))
    }

    pub(crate) fn decode(method: &str, reason: impl Into<String>) -> Self {
        ChainError::Decode {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// An account secret that cannot be turned into a signing key.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("secret is not valid hex")]
    InvalidHex,
    #[error("secret must be 32 bytes, got {0}")]
    InvalidLength(usize),
    #[error("secret is not a valid secp256k1 scalar")]
    InvalidScalar,
}

/// The credentials file could not be read.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
