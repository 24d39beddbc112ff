//! Delivery of continuation panics to registered observers.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

/// Observer callback receiving the payload of a panicking continuation.
pub(crate) type PanicHandler = Arc<dyn Fn(&(dyn Any + Send)) + Send + Sync>;

/// Multicast list of panic observers.
///
/// With no observers registered, payloads are logged and dropped. Observers are
/// invoked outside the list lock, so an observer may itself subscribe without
/// deadlocking.
pub(crate) struct PanicSink {
    handlers: Mutex<Vec<PanicHandler>>,
}

impl PanicSink {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, handler: PanicHandler) {
        self.handlers.lock().push(handler);
    }

    /// Reports one continuation panic to every registered observer.
    pub(crate) fn dispatch(&self, payload: &(dyn Any + Send)) {
        error!(panic_message = payload_message(payload), "continuation panicked");

        let handlers: Vec<PanicHandler> = self.handlers.lock().clone();
        for handler in &handlers {
            handler(payload);
        }
    }

    /// Drops every registered observer. Called at the end of disposal.
    pub(crate) fn clear(&self) {
        self.handlers.lock().clear();
    }
}

/// Best-effort extraction of the human-readable panic message.
fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "(non-string panic payload)"
    }
}
