//! Work items queued for execution on the owner thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use rsevents::ManualResetEvent;

/// A unit of deferred work: a continuation plus an optional completion signal.
///
/// Items created by `post` carry no completion signal; items created by a cross-thread
/// `send` carry the event the sending thread is blocked on.
pub(crate) struct WorkItem {
    continuation: Box<dyn FnOnce() + Send>,
    completion: Option<Arc<ManualResetEvent>>,
}

impl WorkItem {
    pub(crate) fn new<F>(continuation: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            continuation: Box::new(continuation),
            completion: None,
        }
    }

    pub(crate) fn with_completion<F>(continuation: F, completion: Arc<ManualResetEvent>) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            continuation: Box::new(continuation),
            completion: Some(completion),
        }
    }

    /// Runs the continuation, capturing any panic instead of unwinding into the caller.
    ///
    /// The completion signal fires even when the continuation panics, so a blocked
    /// `send` caller is always released.
    pub(crate) fn execute(self) -> thread::Result<()> {
        let _signal_on_exit = self
            .completion
            .map(|event| scopeguard::guard(event, |event| event.set()));

        panic::catch_unwind(AssertUnwindSafe(self.continuation))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use rsevents::{Awaitable, EventState};

    use super::*;
    use crate::test_utils::with_watchdog;

    #[test]
    fn execute_runs_continuation() {
        static RAN: AtomicBool = AtomicBool::new(false);
        RAN.store(false, Ordering::Relaxed);

        let item = WorkItem::new(|| {
            RAN.store(true, Ordering::Relaxed);
        });

        item.execute().expect("no-op continuation must not panic");
        assert!(RAN.load(Ordering::Relaxed));
    }

    #[test]
    fn execute_captures_panic() {
        let item = WorkItem::new(|| panic!("intentional panic"));

        let payload = item
            .execute()
            .expect_err("the panic must be captured, not unwound");

        let message = payload.downcast_ref::<&str>().copied().unwrap_or("unknown");
        assert_eq!(message, "intentional panic");
    }

    #[test]
    fn completion_fires_on_success() {
        with_watchdog(|| {
            let completion = Arc::new(ManualResetEvent::new(EventState::Unset));
            let item = WorkItem::with_completion(|| {}, Arc::clone(&completion));

            item.execute().expect("no-op continuation must not panic");

            // Returns only because execute fired the signal; the watchdog catches a hang.
            completion.wait();
        });
    }

    #[test]
    fn completion_fires_on_panic() {
        with_watchdog(|| {
            let completion = Arc::new(ManualResetEvent::new(EventState::Unset));
            let item =
                WorkItem::with_completion(|| panic!("intentional panic"), Arc::clone(&completion));

            item.execute()
                .expect_err("the panic must be captured, not unwound");

            completion.wait();
        });
    }
}
