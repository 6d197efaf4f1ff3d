//! End-to-end scenarios across the engine, bus and tracker, wired the way
//! production wires them.

#![allow(clippy::unwrap_used)]

use repairbench_core::{Actor, EventKind, TechnicianId, TicketStatus};
use repairbench_lifecycle::LifecycleError;
use repairbench_testing::Harness;

fn actor() -> Actor {
    Actor::new("front-desk")
}

#[test]
fn repair_flow_from_assignment_to_completion() {
    let harness = Harness::with_tracker();
    let ticket = harness.seed_ticket(|_| {});
    harness.recorder.clear();

    // Assigning onto an open ticket: auto-diagnosed, clock starts.
    let (ticket_after, events) = harness
        .lifecycle
        .assign_technician(ticket.id, Some(TechnicianId::new(7)), "", &actor())
        .unwrap();

    assert_eq!(ticket_after.status, TicketStatus::Diagnosed);
    assert_eq!(events.len(), 2);
    assert_eq!(harness.sessions.open_count(ticket.id), 1);
    // The tracker reacts inside the assignment publish, so its session
    // event lands between the two lifecycle events.
    assert_eq!(
        harness.recorder.kinds(),
        vec![
            EventKind::TicketTechnicianAssigned,
            EventKind::WorkSessionStarted,
            EventKind::TicketStatusChanged,
        ]
    );

    harness.clock.advance(chrono::Duration::minutes(90));
    harness.recorder.clear();

    // Completion: one status event, clock stops.
    let (done, events) = harness
        .lifecycle
        .change_status(ticket.id, TicketStatus::Completed, "repaired", &actor())
        .unwrap();

    assert_eq!(events.len(), 1);
    assert!(done.completed_at.is_some());
    assert_eq!(harness.sessions.open_count(ticket.id), 0);
    assert_eq!(
        harness.recorder.kinds(),
        vec![EventKind::TicketStatusChanged, EventKind::WorkSessionClosed]
    );
    let session = &harness.sessions.all()[0];
    assert_eq!(session.duration_minutes(), Some(90));
}

#[test]
fn clearing_the_technician_reverts_without_a_reason() {
    let harness = Harness::with_tracker();
    let ticket = harness.seed_ticket(|_| {});

    harness
        .lifecycle
        .assign_technician(ticket.id, Some(TechnicianId::new(7)), "", &actor())
        .unwrap();
    harness.recorder.clear();

    let (reverted, events) = harness
        .lifecycle
        .assign_technician(ticket.id, None, "", &actor())
        .unwrap();

    assert_eq!(reverted.status, TicketStatus::Open);
    assert_eq!(reverted.assigned_technician_id, None);
    assert_eq!(
        events.iter().map(|e| e.kind()).collect::<Vec<_>>(),
        vec![
            EventKind::TicketTechnicianAssigned,
            EventKind::TicketStatusChanged,
        ]
    );
    // Unassignment does not stop the clock.
    assert_eq!(harness.sessions.open_count(ticket.id), 1);
}

#[test]
fn rejected_transfer_changes_nothing_anywhere() {
    let harness = Harness::with_tracker();
    let ticket = harness.seed_ticket(|_| {});

    harness
        .lifecycle
        .assign_technician(ticket.id, Some(TechnicianId::new(7)), "", &actor())
        .unwrap();
    harness.recorder.clear();

    let result =
        harness
            .lifecycle
            .assign_technician(ticket.id, Some(TechnicianId::new(8)), "", &actor());

    assert!(matches!(
        result,
        Err(LifecycleError::TransferReasonRequired { .. })
    ));
    let stored = harness.tickets.get(ticket.id).unwrap();
    assert_eq!(stored.assigned_technician_id, Some(TechnicianId::new(7)));
    assert_eq!(harness.sessions.open_count(ticket.id), 1);
    assert!(harness.recorder.recorded().is_empty());
}

#[test]
fn transfer_leaves_both_clocks_running_until_completion() {
    let harness = Harness::with_tracker();
    let ticket = harness.seed_ticket(|_| {});

    harness
        .lifecycle
        .assign_technician(ticket.id, Some(TechnicianId::new(7)), "", &actor())
        .unwrap();
    harness
        .lifecycle
        .assign_technician(ticket.id, Some(TechnicianId::new(8)), "shift change", &actor())
        .unwrap();

    // One open session per technician, never two for the same one.
    assert_eq!(harness.sessions.open_count(ticket.id), 2);

    harness
        .lifecycle
        .change_status(ticket.id, TicketStatus::InProgress, "", &actor())
        .unwrap();
    harness
        .lifecycle
        .change_status(ticket.id, TicketStatus::Completed, "", &actor())
        .unwrap();

    assert_eq!(harness.sessions.open_count(ticket.id), 0);
}

#[test]
fn no_handler_failures_in_the_happy_path() {
    let harness = Harness::with_tracker();
    let ticket = harness.seed_ticket(|_| {});

    harness
        .lifecycle
        .assign_technician(ticket.id, Some(TechnicianId::new(7)), "", &actor())
        .unwrap();
    harness
        .lifecycle
        .change_status(ticket.id, TicketStatus::Cancelled, "customer gave up", &actor())
        .unwrap();

    assert!(harness.sink.is_empty());
}
