//! Cooperative shutdown signaling.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rsevents::{Awaitable, EventState, ManualResetEvent};

/// A signal raised exactly once, at the start of dispatcher disposal.
///
/// Holders should treat a raised signal as a cooperative "stop starting new
/// long-running work" hint. It has no preemptive effect: continuations that are
/// already queued or already running proceed to completion.
///
/// Clones observe the same underlying signal.
///
/// # Example
///
/// ```rust
/// use frame_pump::FramePump;
///
/// # fn main() -> Result<(), frame_pump::ConfigError> {
/// let pump = FramePump::builder().build()?;
/// let dispatcher = pump.dispatcher();
/// let signal = dispatcher.shutdown_signal();
///
/// assert!(!signal.is_raised());
///
/// dispatcher.dispose();
/// assert!(signal.is_raised());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ShutdownSignal {
    state: Arc<SignalState>,
}

struct SignalState {
    raised: AtomicBool,
    event: ManualResetEvent,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(SignalState {
                raised: AtomicBool::new(false),
                event: ManualResetEvent::new(EventState::Unset),
            }),
        }
    }

    /// Raises the signal. Idempotent.
    #[cfg_attr(test, mutants::skip)] // Tampering here hangs waiters, timing out the test run.
    pub(crate) fn raise(&self) {
        // Release pairs with the Acquire in is_raised: an observer that sees the flag
        // also sees every write made before the raise.
        self.state.raised.store(true, Ordering::Release);
        self.state.event.set();
    }

    /// Returns whether the signal has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.state.raised.load(Ordering::Acquire)
    }

    /// Blocks the calling thread until the signal is raised.
    pub fn wait(&self) {
        self.state.event.wait();
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("raised", &self.is_raised())
            .finish_non_exhaustive()
    }
}
