//! # Repairbench Testing
//!
//! Deterministic test doubles and a scenario harness for the coordination
//! core.
//!
//! This crate provides:
//! - [`mocks::FixedClock`] - controllable time
//! - [`memory`] - in-memory repository implementations with inspection
//!   helpers and a one-shot save-failure switch
//! - [`recording`] - an event recorder and a capturing error sink
//! - [`scenario::Harness`] - a fully wired core over in-memory
//!   collaborators, one per test
//! - [`scenario::LifecycleTest`] - fluent Given-When-Then builder for
//!   single-operation lifecycle tests
//!
//! ## Example
//!
//! ```ignore
//! use repairbench_testing::LifecycleTest;
//!
//! LifecycleTest::new()
//!     .given_ticket(|t| t.status = TicketStatus::Diagnosed)
//!     .when(|lc, id| lc.change_status(id, TicketStatus::Completed, "done", &actor))
//!     .then_ticket(|t| assert!(t.completed_at.is_some()))
//!     .run();
//! ```

/// In-memory repositories.
pub mod memory;

/// Deterministic clock.
pub mod mocks;

/// Capturing subscribers and sinks.
pub mod recording;

/// Harness and fluent scenario builder.
pub mod scenario;

pub use memory::{InMemoryTicketRepository, InMemoryWorkSessionRepository};
pub use mocks::{FixedClock, test_epoch};
pub use recording::{CapturingErrorSink, RecordingHandler};
pub use scenario::{Harness, LifecycleTest};

/// Installs a compact `tracing` subscriber for a test run.
///
/// Honors `RUST_LOG`; safe to call from several tests, later calls are
/// no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .compact()
        .try_init();
}
