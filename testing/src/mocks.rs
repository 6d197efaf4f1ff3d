//! Deterministic clock for reproducible tests.

use chrono::{DateTime, Duration, Utc};
use repairbench_core::Clock;
use std::sync::{Mutex, PoisonError};

/// Controllable clock: time only moves when the test says so.
///
/// # Example
///
/// ```
/// use repairbench_testing::mocks::FixedClock;
/// use repairbench_core::Clock;
/// use chrono::Duration;
///
/// let clock = FixedClock::default();
/// let before = clock.now();
/// clock.advance(Duration::minutes(30));
/// assert_eq!(clock.now() - before, Duration::minutes(30));
/// ```
#[derive(Debug)]
pub struct FixedClock {
    time: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock frozen at `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    /// Moves the clock by `delta`; negative values simulate clock skew.
    pub fn advance(&self, delta: Duration) {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += delta;
    }

    /// Pins the clock to an exact instant.
    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }
}

impl Default for FixedClock {
    /// Frozen at 2025-01-01 00:00:00 UTC.
    fn default() -> Self {
        Self::new(test_epoch())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The instant tests start from (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Never in practice; the hardcoded timestamp always parses.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .expect("hardcoded timestamp should always parse")
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_frozen_until_advanced() {
        let clock = FixedClock::default();
        assert_eq!(clock.now(), clock.now());

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), test_epoch() + Duration::minutes(5));
    }
}
