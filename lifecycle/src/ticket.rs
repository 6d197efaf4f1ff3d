//! Ticket entity and the lifecycle state machine.
//!
//! [`TicketLifecycle`] is the single write path for ticket status and
//! technician assignment. Every operation follows the same shape:
//! load → validate → mutate → save → publish. Validation failures leave the
//! ticket untouched and publish nothing, so UI state before and after a
//! rejected attempt is indistinguishable except for the error message.
//! Repository failures likewise abort before any event is broadcast.

use crate::EventBatch;
use crate::repository::TicketRepository;
use chrono::{DateTime, Utc};
use repairbench_core::{
    Actor, BranchId, Clock, CustomerId, DomainEvent, EventBus, TechnicianId, TicketId, TicketStatus,
};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::sync::Arc;

// ============================================================================
// Entity
// ============================================================================

/// A repair ticket as the lifecycle engine sees it.
///
/// Owned by the external ticket repository; this struct is a working copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Repository-allocated id.
    pub id: TicketId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Branch the ticket belongs to.
    pub branch_id: BranchId,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// Assigned technician, `None` when unassigned.
    pub assigned_technician_id: Option<TechnicianId>,
    /// Promised completion date, if any.
    pub deadline: Option<DateTime<Utc>>,
    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
    /// Set when the ticket first enters a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Soft-delete flag; deleted tickets stay restorable.
    pub is_deleted: bool,
}

impl Ticket {
    /// A fresh `open`, unassigned ticket.
    #[must_use]
    pub const fn new(
        id: TicketId,
        customer_id: CustomerId,
        branch_id: BranchId,
        deadline: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_id,
            branch_id,
            status: TicketStatus::Open,
            assigned_technician_id: None,
            deadline,
            created_at,
            completed_at: None,
            is_deleted: false,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failures surfaced to the caller of a lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The requested status is not reachable from the current one.
    ///
    /// Permanent rejection: retrying with the same input cannot succeed.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the ticket is in.
        from: TicketStatus,
        /// Status that was requested.
        to: TicketStatus,
    },

    /// Reassignment between two technicians needs an operator-supplied
    /// reason. Recoverable: prompt for the missing field and retry.
    #[error("ticket {ticket_id}: transferring between technicians requires a reason")]
    TransferReasonRequired {
        /// The ticket being transferred.
        ticket_id: TicketId,
    },

    /// No ticket with this id exists.
    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),

    /// The external repository failed; nothing was published.
    #[error("repository operation failed")]
    Repository(#[source] anyhow::Error),
}

// ============================================================================
// Lifecycle engine
// ============================================================================

/// Validates and applies ticket transitions, then fans the results out.
///
/// Holds no ticket state of its own; the repository is the source of truth
/// and events are published only after a successful save.
pub struct TicketLifecycle {
    tickets: Arc<dyn TicketRepository>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl TicketLifecycle {
    /// Creates the engine over its injected collaborators.
    #[must_use]
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { tickets, bus, clock }
    }

    /// Creates an `open`, unassigned ticket and announces it.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Repository`] when id allocation or save fails.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn create_ticket(
        &self,
        customer_id: CustomerId,
        branch_id: BranchId,
        deadline: Option<DateTime<Utc>>,
        actor: &Actor,
    ) -> Result<(Ticket, EventBatch), LifecycleError> {
        let id = self.tickets.next_id().map_err(LifecycleError::Repository)?;
        let ticket = Ticket::new(id, customer_id, branch_id, deadline, self.clock.now());
        self.tickets
            .save(&ticket)
            .map_err(LifecycleError::Repository)?;

        let events: EventBatch = smallvec![DomainEvent::TicketCreated {
            ticket_id: id,
            customer_id,
            branch_id,
            actor: actor.clone(),
        }];
        self.publish_all(&events);
        Ok((ticket, events))
    }

    /// Moves a ticket along the lifecycle graph.
    ///
    /// Requesting the current status is a no-op: the unchanged ticket comes
    /// back with an empty event list and nothing is saved or published, so a
    /// resubmitted form never causes an event storm. Entering a terminal
    /// status stamps `completed_at`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidTransition`] when the edge is not in the
    ///   graph, or for `diagnosed -> open` while a technician is still
    ///   assigned (that edge only exists for unassigned tickets; clearing
    ///   the assignment takes the ticket back automatically).
    /// - [`LifecycleError::TicketNotFound`] / [`LifecycleError::Repository`].
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn change_status(
        &self,
        ticket_id: TicketId,
        new_status: TicketStatus,
        reason: &str,
        actor: &Actor,
    ) -> Result<(Ticket, EventBatch), LifecycleError> {
        let mut ticket = self.load(ticket_id)?;

        if ticket.status == new_status {
            return Ok((ticket, EventBatch::new()));
        }

        let reachable = ticket.status.can_transition_to(new_status)
            && !(ticket.status == TicketStatus::Diagnosed
                && new_status == TicketStatus::Open
                && ticket.assigned_technician_id.is_some());
        if !reachable {
            return Err(LifecycleError::InvalidTransition {
                from: ticket.status,
                to: new_status,
            });
        }

        let old_status = ticket.status;
        ticket.status = new_status;
        if new_status.is_terminal() {
            ticket.completed_at = Some(self.clock.now());
        }
        self.tickets
            .save(&ticket)
            .map_err(LifecycleError::Repository)?;

        let events: EventBatch = smallvec![DomainEvent::TicketStatusChanged {
            ticket_id,
            old_status,
            new_status,
            reason: reason.to_string(),
            actor: actor.clone(),
        }];
        self.publish_all(&events);
        Ok((ticket, events))
    }

    /// Assigns, clears or transfers the ticket's technician.
    ///
    /// Assignment and status are coupled: assigning onto an `open` ticket
    /// auto-advances it to `diagnosed`, clearing the technician of a
    /// `diagnosed` ticket auto-reverts it to `open`. A transfer (one
    /// technician directly to another) requires a non-empty `reason`.
    /// Requesting the current assignee is a no-op. The assignment event is
    /// emitted before the coupled status event.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::TransferReasonRequired`] for a transfer without a
    ///   reason; ticket and sessions stay untouched, zero events publish.
    /// - [`LifecycleError::TicketNotFound`] / [`LifecycleError::Repository`].
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn assign_technician(
        &self,
        ticket_id: TicketId,
        technician_id: Option<TechnicianId>,
        reason: &str,
        actor: &Actor,
    ) -> Result<(Ticket, EventBatch), LifecycleError> {
        let mut ticket = self.load(ticket_id)?;

        if ticket.assigned_technician_id == technician_id {
            return Ok((ticket, EventBatch::new()));
        }

        let is_transfer = ticket.assigned_technician_id.is_some() && technician_id.is_some();
        if is_transfer && reason.trim().is_empty() {
            return Err(LifecycleError::TransferReasonRequired { ticket_id });
        }

        let old_technician_id = ticket.assigned_technician_id;
        ticket.assigned_technician_id = technician_id;

        // Auto status coupling, applied in the same save.
        let auto_transition = if technician_id.is_some() && ticket.status == TicketStatus::Open {
            Some((TicketStatus::Open, TicketStatus::Diagnosed))
        } else if technician_id.is_none() && ticket.status == TicketStatus::Diagnosed {
            Some((TicketStatus::Diagnosed, TicketStatus::Open))
        } else {
            None
        };
        if let Some((_, to)) = auto_transition {
            ticket.status = to;
        }

        self.tickets
            .save(&ticket)
            .map_err(LifecycleError::Repository)?;

        let mut events: EventBatch = smallvec![DomainEvent::TicketTechnicianAssigned {
            ticket_id,
            old_technician_id,
            new_technician_id: technician_id,
            reason: reason.to_string(),
            actor: actor.clone(),
        }];
        if let Some((from, to)) = auto_transition {
            events.push(DomainEvent::TicketStatusChanged {
                ticket_id,
                old_status: from,
                new_status: to,
                reason: reason.to_string(),
                actor: actor.clone(),
            });
        }
        self.publish_all(&events);
        Ok((ticket, events))
    }

    /// The combined "update ticket" action: status first, then assignment.
    ///
    /// The two steps are independent calls; the status change is validated
    /// against the old assignment, the assignment against the new status.
    /// If the status step fails, the assignment step is never attempted.
    ///
    /// # Errors
    ///
    /// Whatever [`change_status`](Self::change_status) or
    /// [`assign_technician`](Self::assign_technician) return, in that order.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn update_ticket(
        &self,
        ticket_id: TicketId,
        new_status: Option<TicketStatus>,
        technician: Option<Option<TechnicianId>>,
        reason: &str,
        actor: &Actor,
    ) -> Result<(Ticket, EventBatch), LifecycleError> {
        let mut events = EventBatch::new();
        let mut ticket = match new_status {
            Some(status) => {
                let (ticket, batch) = self.change_status(ticket_id, status, reason, actor)?;
                events.extend(batch);
                ticket
            }
            None => self.load(ticket_id)?,
        };
        if let Some(technician_id) = technician {
            let (updated, batch) = self.assign_technician(ticket_id, technician_id, reason, actor)?;
            events.extend(batch);
            ticket = updated;
        }
        Ok((ticket, events))
    }

    /// Soft-deletes a ticket. Already-deleted tickets are a no-op.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::TicketNotFound`] / [`LifecycleError::Repository`].
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn delete_ticket(
        &self,
        ticket_id: TicketId,
        actor: &Actor,
    ) -> Result<(Ticket, EventBatch), LifecycleError> {
        let mut ticket = self.load(ticket_id)?;
        if ticket.is_deleted {
            return Ok((ticket, EventBatch::new()));
        }
        ticket.is_deleted = true;
        self.tickets
            .save(&ticket)
            .map_err(LifecycleError::Repository)?;

        let events: EventBatch = smallvec![DomainEvent::TicketDeleted {
            ticket_id,
            actor: actor.clone(),
        }];
        self.publish_all(&events);
        Ok((ticket, events))
    }

    /// Restores a soft-deleted ticket. Status is left exactly as it was;
    /// restore never un-completes a completed ticket.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::TicketNotFound`] / [`LifecycleError::Repository`].
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn restore_ticket(
        &self,
        ticket_id: TicketId,
        actor: &Actor,
    ) -> Result<(Ticket, EventBatch), LifecycleError> {
        let mut ticket = self.load(ticket_id)?;
        if !ticket.is_deleted {
            return Ok((ticket, EventBatch::new()));
        }
        ticket.is_deleted = false;
        self.tickets
            .save(&ticket)
            .map_err(LifecycleError::Repository)?;

        let events: EventBatch = smallvec![DomainEvent::TicketRestored {
            ticket_id,
            actor: actor.clone(),
        }];
        self.publish_all(&events);
        Ok((ticket, events))
    }

    fn load(&self, ticket_id: TicketId) -> Result<Ticket, LifecycleError> {
        self.tickets
            .load(ticket_id)
            .map_err(LifecycleError::Repository)?
            .ok_or(LifecycleError::TicketNotFound(ticket_id))
    }

    fn publish_all(&self, events: &[DomainEvent]) {
        for event in events {
            self.bus.publish(event);
        }
    }
}

