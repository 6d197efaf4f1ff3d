//! Active-branch scoping shared by every list view.
//!
//! A repair chain runs several branches; most screens scope their queries to
//! one of them (or to all, `None`). [`BranchContext`] holds that single
//! value and broadcasts every change. The core never refilters on a
//! consumer's behalf -- each view re-runs its own query with the new id.

use repairbench_core::{BranchId, DomainEvent, EventBus};
use std::sync::{Arc, Mutex, PoisonError};

/// Process-wide "active branch" value with a single writer.
///
/// Readers treat the value as a point-in-time snapshot, obtained either by
/// [`current`](Self::current) or by receiving
/// [`DomainEvent::BranchContextChanged`].
pub struct BranchContext {
    current: Mutex<Option<BranchId>>,
    bus: Arc<EventBus>,
}

impl BranchContext {
    /// Starts scoped to all branches (`None`).
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            current: Mutex::new(None),
            bus,
        }
    }

    /// Sets the active branch and notifies every subscriber.
    ///
    /// The notification fires exactly once per call -- also when the new
    /// value equals the old one, so a manual "refresh" action can reuse this
    /// primitive instead of needing a separate path.
    pub fn set_branch(&self, branch_id: Option<BranchId>) {
        {
            let mut current = self
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *current = branch_id;
        }
        // Published outside the lock: handlers may read current().
        self.bus
            .publish(&DomainEvent::BranchContextChanged { branch_id });
    }

    /// Point-in-time snapshot of the active branch. `None` = all branches.
    #[must_use]
    pub fn current(&self) -> Option<BranchId> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
