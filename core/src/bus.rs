//! In-process event bus: the dispatch primitive behind every view.
//!
//! The bus is an explicitly constructed object, created once at startup and
//! injected into every component that needs it -- never a process global.
//! Each test builds its own bus, so test isolation comes for free.
//!
//! # Delivery contract
//!
//! - [`EventBus::publish`] is synchronous: handlers run on the calling
//!   thread, in registration order, before `publish` returns.
//! - Before iterating, the dispatcher snapshots the handler list under a
//!   short-lived lock. A handler that subscribes or unsubscribes during its
//!   own invocation never mutates the list being iterated, and an in-flight
//!   publish still delivers to a handler unsubscribed mid-dispatch.
//! - A handler that returns an error or panics is reported to the injected
//!   [`ErrorSink`] and dispatch continues; `publish` never surfaces handler
//!   failure to the caller. One broken subscriber must not be able to abort
//!   an operation initiated by an unrelated component.
//! - Ordering is guaranteed per subscriber list only; there is no ordering
//!   across distinct event kinds.
//!
//! Handlers that need to do real I/O (database reload, file export) must
//! hand off to their own background task and return promptly -- see
//! [`crate::debounce`] for the coalescing adapter the list views use.

use crate::event::{DomainEvent, EventKind};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A subscriber callback.
///
/// Implementations must be cheap and non-blocking; the bus invokes them
/// inline on the publishing thread. Returning `Err` does not stop dispatch,
/// it only gets reported to the bus's [`ErrorSink`].
pub trait EventHandler: Send + Sync {
    /// React to one event.
    ///
    /// # Errors
    ///
    /// Any error is contained by the bus and forwarded to the error sink;
    /// it never reaches the publisher.
    fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Destination for contained handler failures.
///
/// Injected into the bus at construction. The default implementation logs
/// through `tracing`; tests swap in a capturing sink.
pub trait ErrorSink: Send + Sync {
    /// Record a contained failure with its dispatch context.
    fn report(&self, context: &str, error: &anyhow::Error);
}

/// [`ErrorSink`] that reports through `tracing::error!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, context: &str, error: &anyhow::Error) {
        tracing::error!(context, error = %error, "event handler failed");
    }
}

/// Proof of registration, returned by [`EventBus::subscribe`].
///
/// Re-subscribing the same handler for the same kind returns the original
/// handle. Can be used for teardown via [`EventBus::unsubscribe_handle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    kind: EventKind,
}

impl SubscriptionHandle {
    /// The event kind this registration listens for.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }
}

struct Registration {
    handle: SubscriptionHandle,
    handler: Arc<dyn EventHandler>,
}

impl Registration {
    /// Identity is the handler allocation, not its contents: two `Arc`s
    /// wrapping equal closures are distinct subscribers.
    fn is(&self, handler: &Arc<dyn EventHandler>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.handler), Arc::as_ptr(handler))
    }
}

/// Process-wide registry mapping event kind to an ordered subscriber list.
///
/// Thread safe; the registry lock is held only while mutating or snapshotting
/// the subscriber list, never across handler invocations, so publishing from
/// inside a handler is legal.
pub struct EventBus {
    registry: Mutex<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
    sink: Arc<dyn ErrorSink>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Arc::new(TracingErrorSink))
    }
}

impl EventBus {
    /// Creates a bus reporting contained handler failures to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            sink,
        }
    }

    /// Registers `handler` for `kind`.
    ///
    /// Idempotent: if this handler is already registered for `kind`, the
    /// existing handle is returned and nothing changes. Components may
    /// re-attach during their lifecycle without receiving duplicate
    /// callbacks. Registration order is delivery order.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> SubscriptionHandle {
        let mut registry = self.lock_registry();
        let list = registry.entry(kind).or_default();

        if let Some(existing) = list.iter().find(|r| r.is(&handler)) {
            return existing.handle;
        }

        let handle = SubscriptionHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
        };
        list.push(Registration { handle, handler });
        tracing::debug!(?kind, subscribers = list.len(), "handler subscribed");
        handle
    }

    /// Registers one handler for several kinds at once.
    ///
    /// Equivalent to calling [`subscribe`](Self::subscribe) per kind, with
    /// the same idempotence per `(kind, handler)` pair.
    pub fn subscribe_all(
        &self,
        kinds: &[EventKind],
        handler: &Arc<dyn EventHandler>,
    ) -> Vec<SubscriptionHandle> {
        kinds
            .iter()
            .map(|kind| self.subscribe(*kind, Arc::clone(handler)))
            .collect()
    }

    /// Removes the registration of `handler` for `kind`.
    ///
    /// Silent no-op when absent, supporting best-effort teardown in
    /// indeterminate shutdown order. Takes effect for future publishes only:
    /// an in-flight publish that already snapshotted the list still invokes
    /// the handler once.
    pub fn unsubscribe(&self, kind: EventKind, handler: &Arc<dyn EventHandler>) {
        let mut registry = self.lock_registry();
        if let Some(list) = registry.get_mut(&kind) {
            list.retain(|r| !r.is(handler));
        }
    }

    /// Removes a registration by its handle. Same semantics as
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn unsubscribe_handle(&self, handle: SubscriptionHandle) {
        let mut registry = self.lock_registry();
        if let Some(list) = registry.get_mut(&handle.kind) {
            list.retain(|r| r.handle != handle);
        }
    }

    /// Synchronously delivers `event` to every handler registered for its
    /// exact kind, in registration order, on the calling thread.
    ///
    /// Handler failures (errors and panics) are reported to the error sink
    /// and never propagate to the caller.
    pub fn publish(&self, event: &DomainEvent) {
        let kind = event.kind();
        // Snapshot under the lock, dispatch outside it (read-snapshot
        // isolation; also makes reentrant publish safe).
        let snapshot: Vec<(SubscriptionHandle, Arc<dyn EventHandler>)> = {
            let registry = self.lock_registry();
            registry
                .get(&kind)
                .map(|list| {
                    list.iter()
                        .map(|r| (r.handle, Arc::clone(&r.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };

        tracing::trace!(?kind, subscribers = snapshot.len(), "dispatching event");

        for (handle, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    self.sink
                        .report(&format!("handler {} for {kind:?}", handle.id), &error);
                }
                Err(payload) => {
                    let error =
                        anyhow::anyhow!("handler panicked: {}", panic_message(payload.as_ref()));
                    self.sink
                        .report(&format!("handler {} for {kind:?}", handle.id), &error);
                }
            }
        }
    }

    /// Number of handlers currently registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock_registry().get(&kind).map_or(0, Vec::len)
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<EventKind, Vec<Registration>>> {
        // The registry is never mutated while a handler runs, so a poisoned
        // lock can only come from a panic on an unrelated code path; the map
        // itself is still consistent.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
