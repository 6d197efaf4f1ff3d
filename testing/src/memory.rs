//! In-memory repository implementations.
//!
//! Faithful to the contract the lifecycle engine relies on, plus a few
//! inspection helpers and a failure switch for exercising the
//! nothing-published-on-failed-save guarantee.

use anyhow::bail;
use chrono::{DateTime, Utc};
use repairbench_core::{TechnicianId, TicketId, WorkSessionId};
use repairbench_lifecycle::repository::{TicketRepository, WorkSessionRepository};
use repairbench_lifecycle::{Ticket, WorkSession};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-memory [`TicketRepository`] with a one-shot failure switch.
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: Mutex<BTreeMap<TicketId, Ticket>>,
    next: AtomicI64,
    fail_next_save: AtomicBool,
}

impl InMemoryTicketRepository {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a ticket directly, bypassing the lifecycle engine.
    pub fn insert(&self, ticket: Ticket) {
        self.lock().insert(ticket.id, ticket);
    }

    /// Reads a stored ticket without going through the engine.
    #[must_use]
    pub fn get(&self, id: TicketId) -> Option<Ticket> {
        self.lock().get(&id).cloned()
    }

    /// Makes the next `save` call fail once.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<TicketId, Ticket>> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TicketRepository for InMemoryTicketRepository {
    fn next_id(&self) -> anyhow::Result<TicketId> {
        Ok(TicketId::new(self.next.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn load(&self, id: TicketId) -> anyhow::Result<Option<Ticket>> {
        Ok(self.get(id))
    }

    fn save(&self, ticket: &Ticket) -> anyhow::Result<()> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            bail!("simulated save failure for ticket {}", ticket.id);
        }
        self.insert(ticket.clone());
        Ok(())
    }
}

/// In-memory [`WorkSessionRepository`].
#[derive(Default)]
pub struct InMemoryWorkSessionRepository {
    sessions: Mutex<BTreeMap<WorkSessionId, WorkSession>>,
    next: AtomicI64,
}

impl InMemoryWorkSessionRepository {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored session, in id (creation) order.
    #[must_use]
    pub fn all(&self) -> Vec<WorkSession> {
        self.lock().values().cloned().collect()
    }

    /// Number of open sessions for a ticket.
    #[must_use]
    pub fn open_count(&self, ticket_id: TicketId) -> usize {
        self.lock()
            .values()
            .filter(|s| s.ticket_id == ticket_id && s.end_time.is_none())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<WorkSessionId, WorkSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkSessionRepository for InMemoryWorkSessionRepository {
    fn next_id(&self) -> anyhow::Result<WorkSessionId> {
        Ok(WorkSessionId::new(
            self.next.fetch_add(1, Ordering::SeqCst) + 1,
        ))
    }

    fn create(&self, session: &WorkSession) -> anyhow::Result<()> {
        self.lock().insert(session.id, session.clone());
        Ok(())
    }

    fn find_open(
        &self,
        ticket_id: TicketId,
        technician_id: TechnicianId,
    ) -> anyhow::Result<Option<WorkSession>> {
        Ok(self
            .lock()
            .values()
            .find(|s| {
                s.ticket_id == ticket_id
                    && s.technician_id == technician_id
                    && s.end_time.is_none()
            })
            .cloned())
    }

    fn open_for_ticket(&self, ticket_id: TicketId) -> anyhow::Result<Vec<WorkSession>> {
        Ok(self
            .lock()
            .values()
            .filter(|s| s.ticket_id == ticket_id && s.end_time.is_none())
            .cloned()
            .collect())
    }

    fn close(
        &self,
        session_id: WorkSessionId,
        end_time: DateTime<Utc>,
        flagged_for_audit: bool,
    ) -> anyhow::Result<()> {
        let mut sessions = self.lock();
        let Some(session) = sessions.get_mut(&session_id) else {
            bail!("close of unknown work session {session_id}");
        };
        session.end_time = Some(end_time);
        session.flagged_for_audit = flagged_for_audit;
        Ok(())
    }
}
