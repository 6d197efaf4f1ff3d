//! Work-session tracker tests exercised through the shared test harness.
//!
//! These live as integration tests because the harness crate
//! (`repairbench-testing`) itself depends on `repairbench-lifecycle`; unit
//! tests inside the library would link a second copy of the crate's types.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use repairbench_core::{Actor, DomainEvent, EventKind, TechnicianId, TicketId, TicketStatus};
use repairbench_lifecycle::WorkSessionRepository;
use repairbench_testing::Harness;

fn assigned(ticket: i64, technician: i64) -> DomainEvent {
    DomainEvent::TicketTechnicianAssigned {
        ticket_id: TicketId::new(ticket),
        old_technician_id: None,
        new_technician_id: Some(TechnicianId::new(technician)),
        reason: String::new(),
        actor: Actor::new("tester"),
    }
}

fn completed(ticket: i64) -> DomainEvent {
    DomainEvent::TicketStatusChanged {
        ticket_id: TicketId::new(ticket),
        old_status: TicketStatus::InProgress,
        new_status: TicketStatus::Completed,
        reason: String::new(),
        actor: Actor::new("tester"),
    }
}

#[test]
fn assignment_opens_a_session() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));

    assert_eq!(harness.sessions.open_count(TicketId::new(1)), 1);
    let open = harness
        .sessions
        .find_open(TicketId::new(1), TechnicianId::new(7))
        .unwrap()
        .unwrap();
    assert!(open.end_time.is_none());
    assert!(open.work_description.is_empty());
    assert!(
        harness
            .recorder
            .kinds()
            .contains(&EventKind::WorkSessionStarted)
    );
}

#[test]
fn duplicate_assignment_delivery_opens_nothing_new() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));
    harness.bus.publish(&assigned(1, 7));

    assert_eq!(harness.sessions.open_count(TicketId::new(1)), 1);
}

#[test]
fn clearing_a_technician_keeps_the_session_open() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));
    harness.bus.publish(&DomainEvent::TicketTechnicianAssigned {
        ticket_id: TicketId::new(1),
        old_technician_id: Some(TechnicianId::new(7)),
        new_technician_id: None,
        reason: String::new(),
        actor: Actor::new("tester"),
    });

    assert_eq!(harness.sessions.open_count(TicketId::new(1)), 1);
}

#[test]
fn terminal_status_closes_every_open_session() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));
    harness.bus.publish(&assigned(1, 8));
    assert_eq!(harness.sessions.open_count(TicketId::new(1)), 2);

    harness.clock.advance(Duration::minutes(42));
    harness.bus.publish(&completed(1));

    assert_eq!(harness.sessions.open_count(TicketId::new(1)), 0);
    for session in harness.sessions.all() {
        assert_eq!(session.duration_minutes(), Some(42));
        assert!(!session.flagged_for_audit);
    }
    assert_eq!(
        harness
            .recorder
            .kinds()
            .iter()
            .filter(|k| **k == EventKind::WorkSessionClosed)
            .count(),
        2
    );
}

#[test]
fn non_terminal_transitions_do_not_stop_the_clock() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));

    for status in [TicketStatus::AwaitingParts, TicketStatus::InProgress] {
        harness.bus.publish(&DomainEvent::TicketStatusChanged {
            ticket_id: TicketId::new(1),
            old_status: TicketStatus::InProgress,
            new_status: status,
            reason: String::new(),
            actor: Actor::new("tester"),
        });
    }

    assert_eq!(harness.sessions.open_count(TicketId::new(1)), 1);
}

#[test]
fn duplicate_terminal_delivery_is_idempotent() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));
    harness.bus.publish(&completed(1));
    let closed = harness.sessions.all();

    harness.bus.publish(&completed(1));
    assert_eq!(harness.sessions.all(), closed);
}

#[test]
fn clock_skew_clamps_to_zero_and_flags_for_audit() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));

    harness.clock.advance(Duration::minutes(-5));
    harness.bus.publish(&completed(1));

    let session = &harness.sessions.all()[0];
    assert!(session.flagged_for_audit);
    assert_eq!(session.duration_minutes(), Some(0));
    assert!(matches!(
        harness
            .recorder
            .recorded()
            .iter()
            .find(|e| e.kind() == EventKind::WorkSessionClosed),
        Some(DomainEvent::WorkSessionClosed {
            flagged_for_audit: true,
            ..
        })
    ));
}

#[test]
fn sessions_on_other_tickets_are_untouched() {
    let harness = Harness::with_tracker();
    harness.bus.publish(&assigned(1, 7));
    harness.bus.publish(&assigned(2, 7));

    harness.bus.publish(&completed(1));

    assert_eq!(harness.sessions.open_count(TicketId::new(1)), 0);
    assert_eq!(harness.sessions.open_count(TicketId::new(2)), 1);
}
