//! Capturing subscribers and error sinks.

use repairbench_core::{DomainEvent, ErrorSink, EventBus, EventHandler, EventKind};
use std::sync::{Arc, Mutex, PoisonError};

/// Subscriber that records every event it receives, in delivery order.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingHandler {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the recorder to every event kind on `bus`.
    pub fn attach_to(self: Arc<Self>, bus: &EventBus) {
        let handler: Arc<dyn EventHandler> = self as Arc<dyn EventHandler>;
        bus.subscribe_all(&EventKind::ALL, &handler);
    }

    /// Everything recorded so far, in delivery order.
    #[must_use]
    pub fn recorded(&self) -> Vec<DomainEvent> {
        self.lock().clone()
    }

    /// The kinds of everything recorded so far, in delivery order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.lock().iter().map(DomainEvent::kind).collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DomainEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventHandler for RecordingHandler {
    fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        self.lock().push(event.clone());
        Ok(())
    }
}

/// [`ErrorSink`] that captures contained handler failures for assertions.
#[derive(Default)]
pub struct CapturingErrorSink {
    reports: Mutex<Vec<(String, String)>>,
}

impl CapturingErrorSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured `(context, message)` pairs, in report order.
    #[must_use]
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl ErrorSink for CapturingErrorSink {
    fn report(&self, context: &str, error: &anyhow::Error) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((context.to_string(), format!("{error:#}")));
    }
}
