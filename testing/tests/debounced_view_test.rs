//! A list view wired the way the UI wires one: debounced refresh driven by
//! ticket events plus the branch scoping broadcast.

#![allow(clippy::unwrap_used)]

use repairbench_core::{
    Actor, BranchId, DebouncedHandler, EventHandler, EventKind, TechnicianId, TicketStatus,
};
use repairbench_lifecycle::BranchContext;
use repairbench_testing::Harness;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::advance;

async fn settle() {
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn view_refreshes_once_per_burst_and_on_branch_change() {
    let harness = Harness::with_tracker();
    let refreshes = Arc::new(AtomicUsize::new(0));

    let view: Arc<dyn EventHandler> = {
        let refreshes = Arc::clone(&refreshes);
        Arc::new(DebouncedHandler::spawn(
            "ticket-list",
            Duration::from_millis(300),
            move || {
                refreshes.fetch_add(1, Ordering::SeqCst);
            },
        ))
    };
    harness.bus.subscribe_all(
        &[
            EventKind::TicketCreated,
            EventKind::TicketStatusChanged,
            EventKind::TicketTechnicianAssigned,
            EventKind::BranchContextChanged,
        ],
        &view,
    );

    // A burst of edits: create, assign (2 events + session), progress.
    let actor = Actor::new("front-desk");
    let ticket = harness.seed_ticket(|_| {});
    harness
        .lifecycle
        .assign_technician(ticket.id, Some(TechnicianId::new(7)), "", &actor)
        .unwrap();
    harness
        .lifecycle
        .change_status(ticket.id, TicketStatus::InProgress, "", &actor)
        .unwrap();
    settle().await;

    advance(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(refreshes.load(Ordering::SeqCst), 1, "one refresh per burst");

    // Switching branch is its own burst.
    let branches = BranchContext::new(Arc::clone(&harness.bus));
    branches.set_branch(Some(BranchId::new(2)));
    settle().await;

    advance(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);
}
