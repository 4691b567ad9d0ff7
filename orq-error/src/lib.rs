//! Error taxonomy for the ORQ secure-computation core.
//!
//! Every public operation in the workspace returns `Result<T, OrqError>`.
//! None of the four kinds are recovered locally: a protocol that hits one
//! surfaces it immediately to the caller instead of retrying.

use thiserror::Error;

/// The four error kinds every fallible operation in the core reduces to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrqError {
    /// Size, precision, or encoding mismatch. Always a caller bug.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A protocol asked a correlation pool for more triples/permutations
    /// than it holds. The caller must `reserve_*` more ahead of time.
    #[error("correlation exhausted: {0}")]
    CorrelationExhausted(String),

    /// Peer disconnect, socket error, or transport abort. Terminates the
    /// session for every worker thread; never retried.
    #[error("communication failed: {0}")]
    CommunicationFailed(String),

    /// An authenticated-share MAC check at session end found a mismatch.
    #[error("integrity check failed: {0}")]
    IntegrityFailed(String),
}

impl OrqError {
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        OrqError::InvalidShape(msg.into())
    }

    pub fn exhausted(msg: impl Into<String>) -> Self {
        OrqError::CorrelationExhausted(msg.into())
    }

    pub fn comm_failed(msg: impl Into<String>) -> Self {
        OrqError::CommunicationFailed(msg.into())
    }

    pub fn integrity_failed(msg: impl Into<String>) -> Self {
        OrqError::IntegrityFailed(msg.into())
    }
}

pub type OrqResult<T> = Result<T, OrqError>;
