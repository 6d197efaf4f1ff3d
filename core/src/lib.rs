//! # Repairbench Core
//!
//! Event types, event bus and debounce primitives for the Repairbench
//! coordination core.
//!
//! This crate is the contract layer of the workspace: the closed set of
//! [`DomainEvent`](event::DomainEvent) variants is the wire format between
//! the lifecycle engine and every view, and the [`EventBus`](bus::EventBus)
//! is the only channel those views observe changes through. Views never call
//! the lifecycle engine to *observe* changes, only to *request* them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   change_status /      ┌───────────────────┐
//! │  UI command  │── assign_technician ──►│  TicketLifecycle  │
//! └──────────────┘                        └────────┬──────────┘
//!                                                  │ save, then publish
//!                                                  ▼
//!                                          ┌──────────────┐
//!                                          │   EventBus   │
//!                                          └──────┬───────┘
//!                      ┌────────────────┬─────────┴────────────┐
//!                      ▼                ▼                      ▼
//!              ┌──────────────┐  ┌─────────────┐   ┌────────────────────┐
//!              │ WorkSession  │  │ list views  │   │ other subscribers  │
//!              │   tracker    │  │ (debounced) │   │                    │
//!              └──────────────┘  └─────────────┘   └────────────────────┘
//! ```
//!
//! ## Key Principles
//!
//! - **Persist first**: an event is published only after the state it
//!   announces has been saved; a failed save broadcasts nothing.
//! - **Ids, not snapshots**: events carry identifiers and deltas; consumers
//!   re-fetch authoritative state themselves.
//! - **Failure isolation**: one broken subscriber never aborts dispatch to
//!   the rest, and never reaches the publisher.

/// Synchronous publish/subscribe registry with snapshot-isolated dispatch.
pub mod bus;

/// Trailing-edge debounce helper for expensive consumers.
pub mod debounce;

/// Injected dependencies ([`Clock`](environment::Clock)).
pub mod environment;

/// Domain event union, event kinds and identifier newtypes.
pub mod event;

pub use bus::{ErrorSink, EventBus, EventHandler, SubscriptionHandle, TracingErrorSink};
pub use debounce::{DebouncedHandler, Debouncer};
pub use environment::{Clock, SystemClock};
pub use event::{
    Actor, BranchId, CustomerId, DomainEvent, EventKind, InvoiceId, TechnicianId, TicketId,
    TicketStatus, WorkSessionId,
};
