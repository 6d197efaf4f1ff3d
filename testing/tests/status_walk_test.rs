//! Property test: every realized status sequence is a path through the
//! lifecycle graph, and rejected steps change nothing.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use repairbench_core::{Actor, TicketStatus};
use repairbench_lifecycle::LifecycleError;
use repairbench_testing::Harness;

fn arb_status() -> impl Strategy<Value = TicketStatus> {
    prop_oneof![
        Just(TicketStatus::Open),
        Just(TicketStatus::Diagnosed),
        Just(TicketStatus::InProgress),
        Just(TicketStatus::AwaitingParts),
        Just(TicketStatus::Completed),
        Just(TicketStatus::Cancelled),
        Just(TicketStatus::Unrepairable),
    ]
}

proptest! {
    #[test]
    fn random_walk_stays_on_the_graph(steps in proptest::collection::vec(arb_status(), 1..40)) {
        let harness = Harness::new();
        let actor = Actor::new("walker");
        let ticket = harness.seed_ticket(|_| {});
        let mut current = TicketStatus::Open;

        for step in steps {
            match harness.lifecycle.change_status(ticket.id, step, "", &actor) {
                Ok((updated, events)) => {
                    if step == current {
                        prop_assert!(events.is_empty(), "no-op must publish nothing");
                    } else {
                        // The ticket stays unassigned, so acceptance means
                        // exactly graph membership.
                        prop_assert!(current.can_transition_to(step));
                        prop_assert_eq!(updated.status, step);
                        prop_assert_eq!(events.len(), 1);
                        current = step;
                    }
                }
                Err(LifecycleError::InvalidTransition { from, to }) => {
                    prop_assert_eq!(from, current);
                    prop_assert_eq!(to, step);
                    prop_assert!(!current.can_transition_to(step));
                    // Rejection leaves the stored ticket untouched.
                    prop_assert_eq!(
                        harness.tickets.get(ticket.id).unwrap().status,
                        current
                    );
                }
                Err(other) => {
                    return Err(proptest::test_runner::TestCaseError::fail(format!(
                        "unexpected error: {other}"
                    )));
                }
            }
        }
    }
}
