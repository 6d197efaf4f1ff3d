//! Automatic work-time tracking driven by lifecycle events.
//!
//! [`WorkSessionTracker`] is an ordinary bus subscriber: it reacts to
//! assignment events by opening a session and to terminal status events by
//! closing every open session for the ticket. It guarantees a session
//! *exists* while a technician is on a ticket; amending the description or
//! stopping early is an explicit UI action outside this core.
//!
//! Invariant: at most one open session per `(ticket, technician)` pair.
//! Closing is naturally idempotent, so duplicate event delivery is harmless.

use crate::repository::WorkSessionRepository;
use chrono::{DateTime, Utc};
use repairbench_core::{
    Clock, DomainEvent, EventBus, EventHandler, EventKind, SubscriptionHandle, TechnicianId,
    TicketId, WorkSessionId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A timed interval attributed to one technician working one ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    /// Repository-allocated id.
    pub id: WorkSessionId,
    /// Ticket being worked on.
    pub ticket_id: TicketId,
    /// Technician on the clock.
    pub technician_id: TechnicianId,
    /// When the clock started.
    pub start_time: DateTime<Utc>,
    /// When the clock stopped; `None` while the session is open.
    pub end_time: Option<DateTime<Utc>>,
    /// Free-text description, empty until the technician fills it in.
    pub work_description: String,
    /// Set when clock skew forced the duration to clamp to zero.
    pub flagged_for_audit: bool,
}

impl WorkSession {
    /// Billable duration in whole minutes, never negative.
    ///
    /// `None` while the session is still open. Clock skew that would yield
    /// a negative interval clamps to zero; such sessions carry
    /// [`flagged_for_audit`](Self::flagged_for_audit).
    #[must_use]
    pub fn duration_minutes(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_minutes().max(0))
    }
}

/// Bus subscriber that opens and closes work sessions automatically.
pub struct WorkSessionTracker {
    sessions: Arc<dyn WorkSessionRepository>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl WorkSessionTracker {
    /// Creates the tracker over its injected collaborators.
    ///
    /// Returned as `Arc` because the bus holds handlers by shared reference;
    /// call [`attach`](Self::attach) to subscribe it.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn WorkSessionRepository>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions,
            bus,
            clock,
        })
    }

    /// Subscribes the tracker to the two event kinds it reacts to.
    pub fn attach(self: Arc<Self>) -> [SubscriptionHandle; 2] {
        let handler: Arc<dyn EventHandler> = Arc::clone(&self) as Arc<dyn EventHandler>;
        [
            self.bus
                .subscribe(EventKind::TicketTechnicianAssigned, Arc::clone(&handler)),
            self.bus
                .subscribe(EventKind::TicketStatusChanged, handler),
        ]
    }

    fn on_assigned(&self, ticket_id: TicketId, technician_id: TechnicianId) -> anyhow::Result<()> {
        if self.sessions.find_open(ticket_id, technician_id)?.is_some() {
            // Already on the clock for this ticket.
            return Ok(());
        }

        let session = WorkSession {
            id: self.sessions.next_id()?,
            ticket_id,
            technician_id,
            start_time: self.clock.now(),
            end_time: None,
            work_description: String::new(),
            flagged_for_audit: false,
        };
        self.sessions.create(&session)?;
        tracing::debug!(%ticket_id, %technician_id, session = %session.id, "work session opened");

        self.bus.publish(&DomainEvent::WorkSessionStarted {
            session_id: session.id,
            ticket_id,
            technician_id,
            start_time: session.start_time,
        });
        Ok(())
    }

    fn on_terminal(&self, ticket_id: TicketId) -> anyhow::Result<()> {
        // More than one session may be open when technicians were
        // transferred mid-ticket; terminal status stops every clock.
        for session in self.sessions.open_for_ticket(ticket_id)? {
            let end_time = self.clock.now();
            let flagged_for_audit = end_time < session.start_time;
            if flagged_for_audit {
                tracing::warn!(
                    session = %session.id,
                    %ticket_id,
                    start = %session.start_time,
                    end = %end_time,
                    "work session ended before it started, clamping duration to zero"
                );
            }
            self.sessions
                .close(session.id, end_time, flagged_for_audit)?;

            self.bus.publish(&DomainEvent::WorkSessionClosed {
                session_id: session.id,
                ticket_id,
                technician_id: session.technician_id,
                end_time,
                flagged_for_audit,
            });
        }
        Ok(())
    }
}

impl EventHandler for WorkSessionTracker {
    fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        match event {
            DomainEvent::TicketTechnicianAssigned {
                ticket_id,
                new_technician_id: Some(technician_id),
                ..
            } => self.on_assigned(*ticket_id, *technician_id),

            DomainEvent::TicketStatusChanged {
                ticket_id,
                new_status,
                ..
            } if new_status.is_terminal() => self.on_terminal(*ticket_id),

            // Clearing a technician, non-terminal transitions: still working.
            _ => Ok(()),
        }
    }
}

