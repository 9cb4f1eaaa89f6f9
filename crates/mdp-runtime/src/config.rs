//! Runtime-level configuration: the knobs that live above the command
//! layer's own [`mdp_client::ClientConfig`].

use std::time::Duration;

use mdp_client::ClientConfig;

/// Top-level configuration for a [`crate::Runtime`]. Defaults match
/// spec.md's literal constants: 1000 ms heartbeat, 5000 ms toggle
/// acknowledge window, 256-byte garbage cap, debounce of 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfig {
    /// Command-layer timing and debounce knobs.
    pub client: ClientConfig,
    /// Byte threshold above which the frame scanner discards its buffer
    /// rather than waiting indefinitely for a magic sequence.
    pub garbage_buffer_limit: usize,
    /// How often the event loop wakes even with no bytes available, so
    /// the heartbeat and toggle-timeout suspension points (spec.md §5)
    /// get checked on a cadence instead of only after a read resolves.
    /// Not itself a spec.md literal constant; chosen short enough to
    /// keep toggle-timeout detection within a fraction of a second of
    /// the 5 s window.
    pub tick_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            garbage_buffer_limit: 256,
            tick_interval: Duration::from_millis(100),
        }
    }
}
