//! Pacer error types

use thiserror::Error;

/// Errors surfaced to request pacer callers
#[derive(Debug, Error)]
pub enum PacerError {
    /// A request was submitted before the pacer was configured
    #[error("request pacer not configured yet; call configure() first")]
    NotConfigured,

    /// The network call failed (connection, timeout, undecodable body)
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The request was dropped unresolved, e.g. shutdown began first
    #[error("request abandoned before completion")]
    Abandoned,
}

impl PacerError {
    /// Check if this is the not-configured error
    pub fn is_not_configured(&self) -> bool {
        matches!(self, PacerError::NotConfigured)
    }

    /// Check if this error came out of the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, PacerError::Transport(_))
    }

    /// Check if this request was abandoned during teardown
    pub fn is_abandoned(&self) -> bool {
        matches!(self, PacerError::Abandoned)
    }
}
