//! Shared helpers for tests that block on cross-thread signaling.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Fails fast instead of hanging the whole test run when a blocking primitive
/// never wakes up.
///
/// The test closure runs on a separate thread; if it has not delivered its result
/// within the deadline, the calling test panics.
pub(crate) fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    const DEADLINE: Duration = Duration::from_secs(10);

    let (done_tx, done_rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        // A send failure means the watchdog already gave up; nothing left to do.
        drop(done_tx.send(test_fn()));
    });

    match done_rx.recv_timeout(DEADLINE) {
        Ok(result) => {
            worker.join().expect("worker already delivered its result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {DEADLINE:?}; a blocking call is likely stuck")
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match worker.join() {
            Ok(()) => panic!("test worker exited without delivering a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}
