//! Domain events and the vocabulary they are built from.
//!
//! Every state change in the system is announced as a [`DomainEvent`]: a closed
//! tagged union whose variants carry entity identifiers plus the fields that
//! changed, never a full entity snapshot. Consumers that need authoritative
//! state re-fetch it from their own data source; the event only tells them
//! *that* something changed and *what kind* of change it was. This keeps
//! payloads cheap to clone and makes it impossible for a stale subscriber to
//! observe a half-constructed entity.
//!
//! [`EventKind`] is the field-less discriminant used to key the subscriber
//! registry. Routing is a compile-time-checked `match` on the union, not a
//! runtime type test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a repository-allocated numeric id.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying numeric id.
            #[must_use]
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id! {
    /// Unique identifier for a repair ticket.
    TicketId
}

entity_id! {
    /// Unique identifier for a technician.
    TechnicianId
}

entity_id! {
    /// Unique identifier for a customer.
    CustomerId
}

entity_id! {
    /// Unique identifier for an invoice.
    InvoiceId
}

entity_id! {
    /// Unique identifier for a branch (shop location).
    BranchId
}

entity_id! {
    /// Unique identifier for a work session.
    WorkSessionId
}

/// The operator performing a command, as shown in audit trails.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor(String);

impl Actor {
    /// Creates an actor from an operator name or login.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the operator name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Ticket status vocabulary
// ============================================================================

/// Lifecycle status of a repair ticket.
///
/// The legal transitions form a fixed graph:
///
/// ```text
/// open ──────────► diagnosed ──────────► in_progress ◄──► awaiting_parts
///   │                  │  ▲                   │                  │
///   │                  │  └── (unassigned)    │                  │
///   ▼                  ▼                      ▼                  ▼
/// cancelled      {completed, cancelled, unrepairable}  ◄─────────┘
/// ```
///
/// `completed`, `cancelled` and `unrepairable` are terminal: a ticket never
/// leaves them through this graph. Soft-delete restore is a separate
/// mechanism that does not touch status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Newly created, not yet looked at.
    Open,
    /// A technician has diagnosed the fault.
    Diagnosed,
    /// Repair work is underway.
    InProgress,
    /// Blocked on a parts delivery.
    AwaitingParts,
    /// Repair finished and handed back.
    Completed,
    /// Abandoned at the customer's or shop's request.
    Cancelled,
    /// Diagnosed as not worth or not possible to repair.
    Unrepairable,
}

impl TicketStatus {
    /// Whether this status has no outbound transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Unrepairable)
    }

    /// Whether the lifecycle graph contains an edge from `self` to `next`.
    ///
    /// A status is never reachable from itself; same-status requests are
    /// handled as no-ops upstream, before this check runs.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Diagnosed | Self::Cancelled)
                | (
                    Self::Diagnosed,
                    Self::InProgress
                        | Self::Open
                        | Self::AwaitingParts
                        | Self::Completed
                        | Self::Cancelled
                        | Self::Unrepairable,
                )
                | (
                    Self::InProgress,
                    Self::AwaitingParts
                        | Self::Completed
                        | Self::Cancelled
                        | Self::Unrepairable,
                )
                | (
                    Self::AwaitingParts,
                    Self::InProgress
                        | Self::Completed
                        | Self::Cancelled
                        | Self::Unrepairable,
                )
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Diagnosed => "diagnosed",
            Self::InProgress => "in_progress",
            Self::AwaitingParts => "awaiting_parts",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Unrepairable => "unrepairable",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Domain events
// ============================================================================

/// A fact about a state change, immutable once constructed.
///
/// Variants carry identifiers and the delta only. Field names and
/// nullability are the wire contract between the coordination core and every
/// view; changing them is a breaking change for all consumers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A ticket was created (always `open`, unassigned).
    TicketCreated {
        /// The new ticket.
        ticket_id: TicketId,
        /// Owning customer.
        customer_id: CustomerId,
        /// Branch the ticket belongs to.
        branch_id: BranchId,
        /// Operator who created it.
        actor: Actor,
    },

    /// A ticket moved along the lifecycle graph.
    TicketStatusChanged {
        /// The ticket.
        ticket_id: TicketId,
        /// Status before the transition.
        old_status: TicketStatus,
        /// Status after the transition.
        new_status: TicketStatus,
        /// Operator-supplied note, may be empty.
        reason: String,
        /// Operator who requested the change.
        actor: Actor,
    },

    /// A ticket's technician assignment changed.
    TicketTechnicianAssigned {
        /// The ticket.
        ticket_id: TicketId,
        /// Previous assignee, `None` if unassigned.
        old_technician_id: Option<TechnicianId>,
        /// New assignee, `None` clears the assignment.
        new_technician_id: Option<TechnicianId>,
        /// Required to be non-empty for technician-to-technician transfers.
        reason: String,
        /// Operator who requested the change.
        actor: Actor,
    },

    /// A ticket was soft-deleted.
    TicketDeleted {
        /// The ticket.
        ticket_id: TicketId,
        /// Operator who deleted it.
        actor: Actor,
    },

    /// A soft-deleted ticket was brought back. Status is untouched.
    TicketRestored {
        /// The ticket.
        ticket_id: TicketId,
        /// Operator who restored it.
        actor: Actor,
    },

    /// An invoice was created for a ticket.
    InvoiceCreated {
        /// The new invoice.
        invoice_id: InvoiceId,
        /// Ticket the invoice bills for.
        ticket_id: TicketId,
    },

    /// An existing invoice changed.
    InvoiceUpdated {
        /// The invoice.
        invoice_id: InvoiceId,
    },

    /// A customer record was created.
    CustomerCreated {
        /// The new customer.
        customer_id: CustomerId,
    },

    /// A customer record changed.
    CustomerUpdated {
        /// The customer.
        customer_id: CustomerId,
    },

    /// A customer record was deleted.
    CustomerDeleted {
        /// The customer.
        customer_id: CustomerId,
    },

    /// The active-branch scoping filter changed. `None` means all branches.
    BranchContextChanged {
        /// The newly active branch, if any.
        branch_id: Option<BranchId>,
    },

    /// The tracker opened a work session for a technician on a ticket.
    WorkSessionStarted {
        /// The new session.
        session_id: WorkSessionId,
        /// Ticket being worked on.
        ticket_id: TicketId,
        /// Technician on the clock.
        technician_id: TechnicianId,
        /// When the clock started.
        start_time: DateTime<Utc>,
    },

    /// The tracker closed a work session.
    WorkSessionClosed {
        /// The session.
        session_id: WorkSessionId,
        /// Ticket that was worked on.
        ticket_id: TicketId,
        /// Technician who was on the clock.
        technician_id: TechnicianId,
        /// When the clock stopped.
        end_time: DateTime<Utc>,
        /// Set when clock skew forced the duration to clamp to zero.
        flagged_for_audit: bool,
    },
}

impl DomainEvent {
    /// Returns the discriminant used to key subscriber lists.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::TicketCreated { .. } => EventKind::TicketCreated,
            Self::TicketStatusChanged { .. } => EventKind::TicketStatusChanged,
            Self::TicketTechnicianAssigned { .. } => EventKind::TicketTechnicianAssigned,
            Self::TicketDeleted { .. } => EventKind::TicketDeleted,
            Self::TicketRestored { .. } => EventKind::TicketRestored,
            Self::InvoiceCreated { .. } => EventKind::InvoiceCreated,
            Self::InvoiceUpdated { .. } => EventKind::InvoiceUpdated,
            Self::CustomerCreated { .. } => EventKind::CustomerCreated,
            Self::CustomerUpdated { .. } => EventKind::CustomerUpdated,
            Self::CustomerDeleted { .. } => EventKind::CustomerDeleted,
            Self::BranchContextChanged { .. } => EventKind::BranchContextChanged,
            Self::WorkSessionStarted { .. } => EventKind::WorkSessionStarted,
            Self::WorkSessionClosed { .. } => EventKind::WorkSessionClosed,
        }
    }
}

/// Field-less discriminant of [`DomainEvent`], used as the registry key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// See [`DomainEvent::TicketCreated`].
    TicketCreated,
    /// See [`DomainEvent::TicketStatusChanged`].
    TicketStatusChanged,
    /// See [`DomainEvent::TicketTechnicianAssigned`].
    TicketTechnicianAssigned,
    /// See [`DomainEvent::TicketDeleted`].
    TicketDeleted,
    /// See [`DomainEvent::TicketRestored`].
    TicketRestored,
    /// See [`DomainEvent::InvoiceCreated`].
    InvoiceCreated,
    /// See [`DomainEvent::InvoiceUpdated`].
    InvoiceUpdated,
    /// See [`DomainEvent::CustomerCreated`].
    CustomerCreated,
    /// See [`DomainEvent::CustomerUpdated`].
    CustomerUpdated,
    /// See [`DomainEvent::CustomerDeleted`].
    CustomerDeleted,
    /// See [`DomainEvent::BranchContextChanged`].
    BranchContextChanged,
    /// See [`DomainEvent::WorkSessionStarted`].
    WorkSessionStarted,
    /// See [`DomainEvent::WorkSessionClosed`].
    WorkSessionClosed,
}

impl EventKind {
    /// Every kind, in declaration order. Used by consumers that observe the
    /// whole stream (audit log, test recorders).
    pub const ALL: [Self; 13] = [
        Self::TicketCreated,
        Self::TicketStatusChanged,
        Self::TicketTechnicianAssigned,
        Self::TicketDeleted,
        Self::TicketRestored,
        Self::InvoiceCreated,
        Self::InvoiceUpdated,
        Self::CustomerCreated,
        Self::CustomerUpdated,
        Self::CustomerDeleted,
        Self::BranchContextChanged,
        Self::WorkSessionStarted,
        Self::WorkSessionClosed,
    ];
}
