//! Environment abstraction for deterministic testing.
//!
//! Decouples the heartbeat/toggle-timeout logic from the system clock so a
//! production environment (real `Instant`, real `sleep`) and a simulation
//! environment (virtual clock) can drive identical code paths in tests.

use std::time::Duration;

/// Abstract environment providing monotonic time and suspension.
///
/// # Safety
///
/// Implementations MUST guarantee `now()` never goes backwards within a
/// single execution context.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments use a virtual clock driven by test code.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    /// Subsequent calls must return times `>=` previous calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the only async method in the trait; it is used solely by the
    /// heartbeat and optimistic-toggle timeout logic, never by the sans-IO
    /// protocol core.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Production environment: real wall-clock time, real sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl Environment for RealClock {
    type Instant = std::time::Instant;

    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Simulation environment: built on `tokio`'s paused test clock so a test
/// can drive the heartbeat and toggle-timeout logic deterministically with
/// `tokio::time::advance` under `#[tokio::test(start_paused = true)]`,
/// rather than waiting on a real timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock;

impl Environment for SimClock {
    type Instant = tokio::time::Instant;

    fn now(&self) -> tokio::time::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sim_clock_advances_only_when_driven() {
        let clock = SimClock;
        let start = clock.now();
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(clock.now() - start, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn sim_clock_sleep_resolves_after_advance() {
        let clock = SimClock;
        let slept = tokio::spawn(async move {
            clock.sleep(Duration::from_millis(500)).await;
        });
        tokio::time::advance(Duration::from_millis(500)).await;
        slept.await.expect("sleep task should not panic");
    }
}
