//! Heartbeat scheduling (spec §4.4).
//!
//! A pure "what's due at `now`" query rather than an owned background
//! task, so the `Runtime` event loop can drive it the same way it drives
//! the optimistic-toggle timeout: one suspension point, one check.

use std::time::Duration;

/// HEARTBEAT cadence while the transport is connected.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1000);

/// Tracks when the next HEARTBEAT is due.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatSchedule<I> {
    last_sent: Option<I>,
    interval: Duration,
}

impl<I> HeartbeatSchedule<I> {
    /// Creates a schedule with no heartbeat sent yet; the first [`is_due`]
    /// check (any `now`) reports due, matching "one on connect".
    ///
    /// [`is_due`]: HeartbeatSchedule::is_due
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            last_sent: None,
            interval,
        }
    }
}

impl<I> Default for HeartbeatSchedule<I> {
    fn default() -> Self {
        Self::new(HEARTBEAT_INTERVAL)
    }
}

impl<I: Copy + Ord + std::ops::Sub<Output = Duration>> HeartbeatSchedule<I> {
    /// Whether a HEARTBEAT should be sent at `now`.
    #[must_use]
    pub fn is_due(&self, now: I) -> bool {
        match self.last_sent {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Records that a HEARTBEAT was just sent at `now`.
    pub fn mark_sent(&mut self, now: I) {
        self.last_sent = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn due_immediately_before_first_send() {
        let schedule: HeartbeatSchedule<Instant> = HeartbeatSchedule::default();
        assert!(schedule.is_due(Instant::now()));
    }

    #[test]
    fn not_due_until_interval_elapses() {
        let mut schedule: HeartbeatSchedule<Instant> = HeartbeatSchedule::default();
        let t0 = Instant::now();
        schedule.mark_sent(t0);
        assert!(!schedule.is_due(t0 + Duration::from_millis(500)));
        assert!(schedule.is_due(t0 + Duration::from_millis(1000)));
        assert!(schedule.is_due(t0 + Duration::from_millis(1500)));
    }
}
