//! Persistence seams consumed by the lifecycle engine.
//!
//! Storage is owned by the surrounding application; this core only computes
//! intended next states. The traits return `anyhow::Result` so concrete
//! implementations (ORM, SQL, in-memory) can surface their own failures
//! unchanged. A repository failure always aborts the operation before any
//! event is published.

use crate::ticket::Ticket;
use crate::work_session::WorkSession;
use chrono::{DateTime, Utc};
use repairbench_core::{TechnicianId, TicketId, WorkSessionId};

/// Storage for [`Ticket`] records.
pub trait TicketRepository: Send + Sync {
    /// Allocates the next free ticket id.
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn next_id(&self) -> anyhow::Result<TicketId>;

    /// Loads a ticket, `None` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Any storage failure. An unknown id is `Ok(None)`, not an error.
    fn load(&self, id: TicketId) -> anyhow::Result<Option<Ticket>>;

    /// Persists the full ticket record.
    ///
    /// # Errors
    ///
    /// Any storage failure; the caller aborts without publishing.
    fn save(&self, ticket: &Ticket) -> anyhow::Result<()>;
}

/// Storage for [`WorkSession`] records.
pub trait WorkSessionRepository: Send + Sync {
    /// Allocates the next free session id.
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn next_id(&self) -> anyhow::Result<WorkSessionId>;

    /// Persists a freshly opened session.
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn create(&self, session: &WorkSession) -> anyhow::Result<()>;

    /// The open session for `(ticket, technician)`, if one exists.
    ///
    /// At most one session per pair may be open at any time; that invariant
    /// is maintained by the tracker, not the store.
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn find_open(
        &self,
        ticket_id: TicketId,
        technician_id: TechnicianId,
    ) -> anyhow::Result<Option<WorkSession>>;

    /// Every open session for a ticket, across all technicians.
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn open_for_ticket(&self, ticket_id: TicketId) -> anyhow::Result<Vec<WorkSession>>;

    /// Closes one session, recording the end time and the audit flag.
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn close(
        &self,
        session_id: WorkSessionId,
        end_time: DateTime<Utc>,
        flagged_for_audit: bool,
    ) -> anyhow::Result<()>;
}
