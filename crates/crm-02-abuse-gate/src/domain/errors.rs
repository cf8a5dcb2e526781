//! Abuse gate errors.

use thiserror::Error;

/// Counter store failures. The gate logs these and lets the submission through.
#[derive(Debug, Clone, Error)]
pub enum CounterError {
    #[error("counter backend unavailable: {0}")]
    Unavailable(String),
    #[error("counter backend error: {0}")]
    Backend(String),
}

/// Form token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("form token missing")]
    Missing,
    #[error("form token malformed")]
    Malformed,
    #[error("form token signature mismatch")]
    BadSignature,
    #[error("form token expired ({age_secs}s old)")]
    Expired { age_secs: u64 },
    #[error("form token issued in the future")]
    FromFuture,
}
