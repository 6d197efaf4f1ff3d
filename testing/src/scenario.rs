//! Scenario harness and a fluent Given-When-Then builder for lifecycle
//! tests.

use crate::memory::{InMemoryTicketRepository, InMemoryWorkSessionRepository};
use crate::mocks::FixedClock;
use crate::recording::{CapturingErrorSink, RecordingHandler};
use repairbench_core::{BranchId, Clock, CustomerId, DomainEvent, ErrorSink, EventBus, TicketId};
use repairbench_lifecycle::repository::{TicketRepository, WorkSessionRepository};
use repairbench_lifecycle::{
    EventBatch, LifecycleError, Ticket, TicketLifecycle, WorkSessionTracker,
};
use std::sync::Arc;

/// A fully wired coordination core over in-memory collaborators.
///
/// Every test gets its own bus, clock, repositories and recorder; nothing is
/// shared between tests. The recorder subscribes to every event kind before
/// anything else, so it observes the complete publish order.
pub struct Harness {
    /// The bus everything is wired to.
    pub bus: Arc<EventBus>,
    /// Controllable time source shared by engine and tracker.
    pub clock: Arc<FixedClock>,
    /// Ticket store, seedable and inspectable.
    pub tickets: Arc<InMemoryTicketRepository>,
    /// Work-session store, inspectable.
    pub sessions: Arc<InMemoryWorkSessionRepository>,
    /// The engine under test.
    pub lifecycle: TicketLifecycle,
    /// Records every published event in delivery order.
    pub recorder: Arc<RecordingHandler>,
    /// Captures contained handler failures.
    pub sink: Arc<CapturingErrorSink>,
    /// The tracker, when wired via [`with_tracker`](Self::with_tracker).
    pub tracker: Option<Arc<WorkSessionTracker>>,
}

impl Harness {
    /// Core without the work-session tracker attached.
    #[must_use]
    pub fn new() -> Self {
        let sink = Arc::new(CapturingErrorSink::new());
        let bus = Arc::new(EventBus::new(Arc::clone(&sink) as Arc<dyn ErrorSink>));
        let clock = Arc::new(FixedClock::default());
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let sessions = Arc::new(InMemoryWorkSessionRepository::new());

        let recorder = Arc::new(RecordingHandler::new());
        Arc::clone(&recorder).attach_to(&bus);

        let lifecycle = TicketLifecycle::new(
            Arc::clone(&tickets) as Arc<dyn TicketRepository>,
            Arc::clone(&bus),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );

        Self {
            bus,
            clock,
            tickets,
            sessions,
            lifecycle,
            recorder,
            sink,
            tracker: None,
        }
    }

    /// Core with the tracker subscribed, as in production wiring.
    #[must_use]
    pub fn with_tracker() -> Self {
        let mut harness = Self::new();
        let tracker = WorkSessionTracker::new(
            Arc::clone(&harness.sessions) as Arc<dyn WorkSessionRepository>,
            Arc::clone(&harness.bus),
            Arc::clone(&harness.clock) as Arc<dyn Clock>,
        );
        Arc::clone(&tracker).attach();
        harness.tracker = Some(tracker);
        harness
    }

    /// Seeds an `open`, unassigned ticket, then lets `adjust` reshape it.
    ///
    /// Bypasses the engine so tests can start from any state, including
    /// states the engine itself would refuse to produce.
    ///
    /// # Panics
    ///
    /// Never in practice; the in-memory id allocator is infallible.
    #[allow(clippy::expect_used)]
    pub fn seed_ticket(&self, adjust: impl FnOnce(&mut Ticket)) -> Ticket {
        let id = self
            .tickets
            .next_id()
            .expect("in-memory id allocation cannot fail");
        let mut ticket = Ticket::new(
            id,
            CustomerId::new(1),
            BranchId::new(1),
            None,
            self.clock.now(),
        );
        adjust(&mut ticket);
        self.tickets.insert(ticket.clone());
        ticket
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

type TicketSeed = Box<dyn FnOnce(&mut Ticket)>;
type Operation =
    Box<dyn FnOnce(&TicketLifecycle, TicketId) -> Result<(Ticket, EventBatch), LifecycleError>>;
type TicketAssertion = Box<dyn FnOnce(&Ticket)>;
type EventsAssertion = Box<dyn FnOnce(&[DomainEvent])>;
type ErrorAssertion = Box<dyn FnOnce(&LifecycleError)>;

/// Fluent Given-When-Then builder over [`Harness`] for single-operation
/// lifecycle tests.
///
/// # Example
///
/// ```ignore
/// LifecycleTest::new()
///     .given_ticket(|t| t.status = TicketStatus::Diagnosed)
///     .when(|lc, id| lc.change_status(id, TicketStatus::Completed, "done", &actor))
///     .then_ticket(|t| assert!(t.completed_at.is_some()))
///     .then_events(|events| assert_eq!(events.len(), 1))
///     .run();
/// ```
///
/// On a failed operation, `then_ticket` assertions run against the ticket
/// as persisted (proving the store is untouched) and the builder verifies
/// that zero events were published.
#[must_use]
pub struct LifecycleTest {
    harness: Harness,
    seed: Option<TicketSeed>,
    operation: Option<Operation>,
    ticket_assertions: Vec<TicketAssertion>,
    events_assertions: Vec<EventsAssertion>,
    error_assertions: Vec<ErrorAssertion>,
}

impl LifecycleTest {
    /// Fresh builder over a tracker-less [`Harness`].
    pub fn new() -> Self {
        Self {
            harness: Harness::new(),
            seed: None,
            operation: None,
            ticket_assertions: Vec::new(),
            events_assertions: Vec::new(),
            error_assertions: Vec::new(),
        }
    }

    /// Seeds the ticket under test (Given). Starts `open`, unassigned.
    pub fn given_ticket(mut self, seed: impl FnOnce(&mut Ticket) + 'static) -> Self {
        self.seed = Some(Box::new(seed));
        self
    }

    /// The operation under test (When).
    pub fn when(
        mut self,
        operation: impl FnOnce(&TicketLifecycle, TicketId) -> Result<(Ticket, EventBatch), LifecycleError>
        + 'static,
    ) -> Self {
        self.operation = Some(Box::new(operation));
        self
    }

    /// Asserts on the resulting ticket (Then). On failure, runs against the
    /// persisted ticket instead.
    pub fn then_ticket(mut self, assertion: impl FnOnce(&Ticket) + 'static) -> Self {
        self.ticket_assertions.push(Box::new(assertion));
        self
    }

    /// Asserts on the returned event batch (Then).
    pub fn then_events(mut self, assertion: impl FnOnce(&[DomainEvent]) + 'static) -> Self {
        self.events_assertions.push(Box::new(assertion));
        self
    }

    /// Expects the operation to fail and asserts on the error (Then).
    pub fn then_error(mut self, assertion: impl FnOnce(&LifecycleError) + 'static) -> Self {
        self.error_assertions.push(Box::new(assertion));
        self
    }

    /// Runs the scenario and every assertion.
    ///
    /// # Panics
    ///
    /// Panics if the seed or operation is missing, if the outcome does not
    /// match the registered assertions, or if any assertion fails.
    #[allow(clippy::panic, clippy::expect_used)]
    pub fn run(self) {
        let seed = self.seed.expect("ticket must be seeded with given_ticket()");
        let operation = self.operation.expect("operation must be set with when()");

        let ticket = self.harness.seed_ticket(seed);
        self.harness.recorder.clear();

        match operation(&self.harness.lifecycle, ticket.id) {
            Ok((updated, events)) => {
                assert!(
                    self.error_assertions.is_empty(),
                    "expected the operation to fail, but it succeeded with {events:?}"
                );
                for assertion in self.ticket_assertions {
                    assertion(&updated);
                }
                for assertion in self.events_assertions {
                    assertion(&events);
                }
                // Returned batch and published stream must agree.
                assert_eq!(self.harness.recorder.recorded(), events.to_vec());
            }
            Err(error) => {
                assert!(
                    !self.error_assertions.is_empty(),
                    "operation failed unexpectedly: {error}"
                );
                for assertion in self.error_assertions {
                    assertion(&error);
                }
                let persisted = self
                    .harness
                    .tickets
                    .get(ticket.id)
                    .expect("seeded ticket is still stored");
                for assertion in self.ticket_assertions {
                    assertion(&persisted);
                }
                assert!(
                    self.harness.recorder.recorded().is_empty(),
                    "a failed operation must publish nothing"
                );
            }
        }
    }
}

impl Default for LifecycleTest {
    fn default() -> Self {
        Self::new()
    }
}
