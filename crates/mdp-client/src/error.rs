//! Error types for the command layer.

use thiserror::Error;

/// A transport-level send failure that reached the optimistic-toggle state
/// machine or another in-flight command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Writing the encoded frame for a channel's output/input toggle failed.
    #[error("send failed for channel {channel} output toggle: {reason}")]
    ToggleSendFailed {
        /// Slot index the toggle targeted.
        channel: u8,
        /// Transport-reported failure reason.
        reason: String,
    },
    /// A command named a slot index outside `0..6`.
    #[error("channel {channel} is out of range (0..6)")]
    InvalidChannel {
        /// The offending slot index.
        channel: u8,
    },
}
