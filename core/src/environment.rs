//! Injected dependencies shared by the coordination core.
//!
//! All external concerns are abstracted behind traits and handed to
//! components at construction, so tests can substitute deterministic
//! implementations.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
///
/// Production wires [`SystemClock`]; tests use the fixed clock from the
/// testing crate so timestamps and durations are reproducible.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
