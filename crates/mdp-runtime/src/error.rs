//! Error types for the transport adapter and event loop.

use thiserror::Error;

/// Failures a [`crate::Transport`] implementation can report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the underlying port failed.
    #[error("failed to open transport: {reason}")]
    Open {
        /// Reason reported by the underlying implementation.
        reason: String,
    },
    /// A read from the transport failed.
    #[error("transport read failed: {reason}")]
    Read {
        /// Reason reported by the underlying implementation.
        reason: String,
    },
    /// A write to the transport failed.
    #[error("transport write failed: {reason}")]
    Write {
        /// Reason reported by the underlying implementation.
        reason: String,
    },
}

/// Errors the [`crate::Runtime`] event loop can surface.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The transport itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The command layer rejected an event.
    #[error(transparent)]
    Command(#[from] mdp_client::CommandError),
}
