//! Tracking of asynchronous operations that have not yet queued their continuation.

use std::sync::atomic::{AtomicU64, Ordering};

use rsevents::{Awaitable, EventState, ManualResetEvent};

/// Countdown latch for in-flight asynchronous operations.
///
/// The count starts at 1: the extra unit represents the dispatcher itself and is
/// released during disposal. Callers contract to match every `add` with exactly one
/// `signal`; once the count reaches zero it never rises again.
pub(crate) struct PendingOperations {
    count: AtomicU64,
    idle: ManualResetEvent,
}

impl PendingOperations {
    pub(crate) fn new() -> Self {
        Self {
            count: AtomicU64::new(1),
            idle: ManualResetEvent::new(EventState::Unset),
        }
    }

    /// Records the start of an asynchronous operation.
    pub(crate) fn add(&self) {
        let previous = self.count.fetch_add(1, Ordering::AcqRel);
        debug_assert!(
            previous > 0,
            "operation started after the pending count already reached zero"
        );
    }

    /// Records the completion of an asynchronous operation.
    ///
    /// The count saturates at zero rather than wrapping; an unmatched completion is a
    /// caller contract violation surfaced only by the debug assertion.
    #[cfg_attr(test, mutants::skip)] // Tampering here hangs dispose, timing out the test run.
    pub(crate) fn signal(&self) {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                Some(count.saturating_sub(1))
            })
            .expect("the update closure never declines a value");

        debug_assert!(
            previous > 0,
            "operation completed more times than operations were started"
        );

        if previous == 1 {
            self.idle.set();
        }
    }

    /// Blocks until the count reaches zero.
    pub(crate) fn wait_idle(&self) {
        self.idle.wait();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::test_utils::with_watchdog;

    #[test]
    fn final_signal_releases_waiter() {
        with_watchdog(|| {
            let pending = PendingOperations::new();

            pending.signal();

            pending.wait_idle();
        });
    }

    #[test]
    fn matched_operations_release_waiter() {
        with_watchdog(|| {
            let pending = PendingOperations::new();

            pending.add();
            pending.add();
            pending.signal();
            pending.signal();
            pending.signal();

            pending.wait_idle();
        });
    }

    #[test]
    fn waiter_blocks_until_operations_complete() {
        with_watchdog(|| {
            let pending = Arc::new(PendingOperations::new());
            let (woke_tx, woke_rx) = mpsc::channel();

            pending.add();

            let waiter = {
                let pending = Arc::clone(&pending);
                thread::spawn(move || {
                    pending.wait_idle();
                    woke_tx.send(()).expect("test receiver is alive");
                })
            };

            // The waiter must still be blocked: one operation and the "alive" unit remain.
            assert!(
                woke_rx.recv_timeout(Duration::from_millis(50)).is_err(),
                "waiter woke before the count reached zero"
            );

            pending.signal();
            pending.signal();

            woke_rx.recv().expect("waiter wakes after the final signal");
            waiter.join().expect("waiter thread does not panic");
        });
    }
}
