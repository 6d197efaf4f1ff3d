//! # Repairbench Lifecycle
//!
//! Domain rules over the Repairbench event bus: the ticket status/assignment
//! state machine, the automatic work-session tracker it drives, and the
//! active-branch scoping filter.
//!
//! ## Core Concepts
//!
//! - **[`TicketLifecycle`](ticket::TicketLifecycle)**: the single write path
//!   for ticket status and assignment. Load → validate → save → publish;
//!   failed validation or persistence broadcasts nothing.
//! - **[`WorkSessionTracker`](work_session::WorkSessionTracker)**: a bus
//!   subscriber that keeps the billing clock honest -- opens a session when
//!   a technician is assigned, closes every open session when the ticket
//!   reaches a terminal status.
//! - **[`BranchContext`](branch::BranchContext)**: the one process-wide
//!   mutable scoping value, with an always-republish setter.
//! - **Repositories**: persistence seams; this crate never owns storage.

use repairbench_core::DomainEvent;
use smallvec::SmallVec;

/// Active-branch scoping value and its broadcast.
pub mod branch;

/// Persistence seams consumed by the engine and the tracker.
pub mod repository;

/// Ticket entity and lifecycle state machine.
pub mod ticket;

/// Work sessions and the tracker that maintains them.
pub mod work_session;

/// Events produced by one lifecycle operation, inline up to the common case.
pub type EventBatch = SmallVec<[DomainEvent; 4]>;

pub use branch::BranchContext;
pub use repository::{TicketRepository, WorkSessionRepository};
pub use ticket::{LifecycleError, Ticket, TicketLifecycle};
pub use work_session::{WorkSession, WorkSessionTracker};
