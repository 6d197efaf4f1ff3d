//! Trailing-edge debounce for event consumers.
//!
//! List views refresh by re-querying their own data source, which is far too
//! expensive to do once per event when a batch operation publishes dozens in
//! a burst. Each consumer wraps its refresh in a [`Debouncer`]: every
//! incoming event resets the timer, and the refresh runs exactly once after
//! the window elapses with no further events. Timers are per-consumer, never
//! shared, so one slow consumer cannot delay another.
//!
//! Windows observed in practice sit between 100ms and 500ms.

use crate::bus::EventHandler;
use crate::event::DomainEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A trailing-edge debounce timer owning a background worker task.
///
/// [`trigger`](Self::trigger) is cheap, synchronous and non-blocking; the
/// callback runs on the worker task. Dropping the debouncer aborts the
/// worker, so a pending window that has not fired yet is discarded.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    worker: JoinHandle<()>,
    label: String,
}

impl Debouncer {
    /// Spawns the worker for a debounced `callback` with the given quiet
    /// `window`. `label` names the consumer in logs.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, as `tokio::spawn` does.
    #[must_use]
    pub fn new<F>(label: impl Into<String>, window: Duration, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let label = label.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let worker_label = label.clone();
        let worker = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // A signal arrived; wait for a full quiet window, restarting
                // on every further signal.
                loop {
                    match tokio::time::timeout(window, rx.recv()).await {
                        Ok(Some(())) => {}
                        // Sender gone mid-window: the consumer was dropped,
                        // do not fire.
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                tracing::trace!(consumer = %worker_label, "debounce window elapsed, refreshing");
                callback();
            }
        });

        Self { tx, worker, label }
    }

    /// Restarts the quiet window. Coalesces with any pending window.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::warn!(consumer = %self.label, "debounce worker gone, trigger dropped");
        }
    }

    /// The consumer label given at construction.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Adapter exposing a [`Debouncer`] as an [`EventHandler`].
///
/// Subscribe it to every kind the view cares about; any qualifying event
/// restarts the shared window and the refresh runs once per burst.
pub struct DebouncedHandler {
    debouncer: Debouncer,
}

impl DebouncedHandler {
    /// Wraps an existing debouncer.
    #[must_use]
    pub const fn new(debouncer: Debouncer) -> Self {
        Self { debouncer }
    }

    /// Convenience constructor spawning the worker directly.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, as [`Debouncer::new`] does.
    #[must_use]
    pub fn spawn<F>(label: impl Into<String>, window: Duration, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::new(Debouncer::new(label, window, callback))
    }
}

impl EventHandler for DebouncedHandler {
    fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        self.debouncer.trigger();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::event::{Actor, EventKind, TicketId, TicketStatus};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    fn status_changed(ticket: i64) -> DomainEvent {
        DomainEvent::TicketStatusChanged {
            ticket_id: TicketId::new(ticket),
            old_status: TicketStatus::Open,
            new_status: TicketStatus::Diagnosed,
            reason: String::new(),
            actor: Actor::new("tester"),
        }
    }

    /// Let the worker task observe queued signals and timers.
    async fn settle() {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_events_fires_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let debouncer = {
            let fired = Arc::clone(&fired);
            Debouncer::new("ticket-list", Duration::from_millis(300), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };

        for _ in 0..5 {
            debouncer.trigger();
            settle().await;
            advance(Duration::from_millis(20)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0, "window still open");

        advance(Duration::from_millis(300)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Quiet afterwards: no further firings.
        advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn each_burst_fires_again() {
        let fired = Arc::new(AtomicUsize::new(0));
        let debouncer = {
            let fired = Arc::clone(&fired);
            Debouncer::new("dashboard", Duration::from_millis(100), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };

        for _ in 0..3 {
            debouncer.trigger();
            settle().await;
            advance(Duration::from_millis(150)).await;
            settle().await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_debouncer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let debouncer = {
            let fired = Arc::clone(&fired);
            Debouncer::new("devices", Duration::from_millis(200), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };

        debouncer.trigger();
        settle().await;
        drop(debouncer);

        advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_handler_coalesces_bus_events() {
        let bus = EventBus::default();
        let fired = Arc::new(AtomicUsize::new(0));
        let handler: Arc<dyn EventHandler> = {
            let fired = Arc::clone(&fired);
            Arc::new(DebouncedHandler::spawn(
                "kanban",
                Duration::from_millis(300),
                move || {
                    fired.fetch_add(1, Ordering::SeqCst);
                },
            ))
        };
        bus.subscribe_all(
            &[EventKind::TicketStatusChanged, EventKind::TicketDeleted],
            &handler,
        );

        for i in 0..5 {
            bus.publish(&status_changed(i));
            settle().await;
            advance(Duration::from_millis(20)).await;
        }
        bus.publish(&DomainEvent::TicketDeleted {
            ticket_id: TicketId::new(1),
            actor: Actor::new("tester"),
        });
        settle().await;

        advance(Duration::from_millis(300)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
