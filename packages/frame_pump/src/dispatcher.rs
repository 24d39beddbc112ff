//! Scheduling work onto the owner thread and orderly teardown.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use rsevents::{Awaitable, EventState, ManualResetEvent};
use tracing::{debug, trace};

use crate::{Mailbox, PanicSink, PendingOperations, SendError, ShutdownSignal, WorkItem};

/// State shared between the pump, every dispatcher clone and every queued work item.
pub(crate) struct DispatcherCore {
    /// The thread whose ticks drain the mailbox. Captured when the pump is built.
    pub(crate) owner_thread: ThreadId,
    pub(crate) mailbox: Mailbox,
    pub(crate) pending: PendingOperations,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) panic_sink: PanicSink,
    disposed: AtomicBool,
}

impl DispatcherCore {
    pub(crate) fn new(owner_thread: ThreadId) -> Self {
        Self {
            owner_thread,
            mailbox: Mailbox::new(),
            pending: PendingOperations::new(),
            shutdown: ShutdownSignal::new(),
            panic_sink: PanicSink::new(),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        // Acquire pairs with the AcqRel compare-exchange in dispose.
        self.disposed.load(Ordering::Acquire)
    }

    /// Executes one work item, forwarding a captured panic to the sink.
    pub(crate) fn run_item(&self, item: WorkItem) {
        if let Err(payload) = item.execute() {
            self.panic_sink.dispatch(&*payload);
        }
    }

    /// Ordered teardown. Idempotent; the first caller wins and subsequent calls
    /// return immediately.
    ///
    /// Runs on whichever thread calls it: remaining items execute here, without a
    /// budget, so work queued before disposal is never lost even if the host has
    /// already stopped ticking.
    pub(crate) fn dispose(&self) {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        debug!(queued = self.mailbox.len(), "dispatcher disposing");

        self.shutdown.raise();
        self.mailbox.close();

        // The mailbox is closed, so the blocking pop drains the backlog and then
        // reports empty instead of waiting for producers.
        while let Some(item) = self.mailbox.pop_blocking() {
            self.run_item(item);
        }

        // Release the "dispatcher alive" unit, then wait out every asynchronous
        // operation announced via operation_started.
        self.pending.signal();
        self.pending.wait_idle();

        self.panic_sink.clear();

        debug!("dispatcher disposed");
    }
}

impl fmt::Debug for DispatcherCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("owner_thread", &self.owner_thread)
            .field("queued", &self.mailbox.len())
            .field("mailbox_closed", &self.mailbox.is_closed())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Handle for scheduling work onto the owner thread.
///
/// Obtained from [`FramePump::dispatcher`][crate::FramePump::dispatcher]. Cheaply
/// cloneable; all clones reference the same scheduling context and any clone may be
/// moved to another thread.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use frame_pump::FramePump;
///
/// # fn main() -> Result<(), frame_pump::ConfigError> {
/// let pump = FramePump::builder().build()?;
/// let dispatcher = pump.dispatcher();
///
/// let producer = thread::spawn(move || {
///     dispatcher.post(|| println!("runs on the owner thread"));
/// });
/// producer.join().unwrap();
///
/// // The host's periodic callback executes the queued work.
/// pump.tick(0.0, 0.0, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    core: Arc<DispatcherCore>,
}

impl Dispatcher {
    pub(crate) fn new(core: Arc<DispatcherCore>) -> Self {
        Self { core }
    }

    /// Queues a continuation for execution on the owner thread and returns
    /// immediately.
    ///
    /// There is no guarantee of *when* the continuation runs, only that it runs
    /// before disposal completes. A continuation posted after disposal started is
    /// silently dropped.
    pub fn post<F>(&self, continuation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.core.mailbox.push(WorkItem::new(continuation)) {
            trace!("work item posted");
        } else {
            trace!("work item posted after disposal; dropped");
        }
    }

    /// Executes a continuation on the owner thread, blocking until it completes.
    ///
    /// Called from the owner thread itself, the continuation runs synchronously in
    /// place without touching the queue — queuing would deadlock the caller behind
    /// its own tick. From any other thread, the continuation is queued and the
    /// caller blocks until the pump (or the shutdown drain) has executed it; the
    /// caller then observes all of the continuation's side effects.
    ///
    /// A panicking continuation still releases the caller and `send` still returns
    /// `Ok`: the panic is reported through the panic observers (see
    /// [`on_unhandled_panic`][Self::on_unhandled_panic]), never rethrown here.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Disposed`] if the dispatcher was disposed before the
    /// continuation could be queued.
    pub fn send<F>(&self, continuation: F) -> Result<(), SendError>
    where
        F: FnOnce() + Send + 'static,
    {
        if thread::current().id() == self.core.owner_thread {
            trace!("send on owner thread; executing inline");
            self.core.run_item(WorkItem::new(continuation));
            return Ok(());
        }

        let completion = Arc::new(ManualResetEvent::new(EventState::Unset));
        let item = WorkItem::with_completion(continuation, Arc::clone(&completion));

        if !self.core.mailbox.push(item) {
            return Err(SendError::Disposed);
        }

        trace!("work item sent; waiting for completion");
        completion.wait();
        Ok(())
    }

    /// Announces an asynchronous operation that will queue its continuation later.
    ///
    /// Disposal blocks until every announced operation has called
    /// [`operation_completed`][Self::operation_completed]. Call this *before*
    /// starting work such as a timer or an I/O request whose completion will be
    /// posted here, so a concurrent shutdown cannot finish before the completion
    /// arrives.
    pub fn operation_started(&self) {
        self.core.pending.add();
    }

    /// Matches one prior [`operation_started`][Self::operation_started] call.
    ///
    /// Every started operation must complete exactly once; a missing completion
    /// makes disposal wait forever.
    pub fn operation_completed(&self) {
        self.core.pending.signal();
    }

    /// Returns the cooperative shutdown signal for this scheduling context.
    ///
    /// The signal is raised at the start of disposal, before the final drain.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.core.shutdown.clone()
    }

    /// Registers an observer for panics captured while executing continuations.
    ///
    /// Observers are invoked on the thread that executed the panicking continuation,
    /// once per panic, in registration order. With no observer registered the
    /// payload is logged and dropped.
    pub fn on_unhandled_panic<F>(&self, handler: F)
    where
        F: Fn(&(dyn Any + Send)) + Send + Sync + 'static,
    {
        self.core.panic_sink.subscribe(Arc::new(handler));
    }

    /// Disposes the scheduling context: stops accepting work, drains the queue on
    /// this thread, and blocks until every announced asynchronous operation has
    /// completed. Idempotent.
    ///
    /// Dropping the [`FramePump`][crate::FramePump] disposes automatically; call
    /// this to tear down at a precise point instead.
    pub fn dispose(&self) {
        self.core.dispose();
    }

    /// Returns whether disposal has started.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("core", &self.core)
            .finish()
    }
}
