//! Per-tick draining of queued work under a budget.

use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::{ConfigError, Dispatcher, DispatcherCore};

/// Reschedule value telling the host to stop invoking the pump.
const STOP_TICKING: f32 = 0.0;

/// Negative intervals count ticks instead of seconds, so -1 is "every tick".
const DEFAULT_INTERVAL: f32 = -1.0;

/// How much queued work one tick may start.
#[derive(Clone, Copy, Debug)]
enum Budget {
    /// Drain until the queue is empty.
    Unbounded,

    /// Start at most this many items per tick.
    Items(NonZero<usize>),

    /// Stop starting new items once this much wall-clock time has elapsed within
    /// the tick. Checked only between items; a running item is never preempted.
    Time(Duration),
}

/// Drains queued continuations on the owner thread, once per host tick.
///
/// Built on the thread that the host will tick (the owner thread). The host invokes
/// [`tick`][Self::tick] periodically; each invocation executes queued work up to the
/// configured budget and returns the reschedule value for the next invocation.
///
/// Dropping the pump disposes the dispatcher, draining any remaining work on the
/// dropping thread.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use frame_pump::FramePump;
///
/// # fn main() -> Result<(), frame_pump::ConfigError> {
/// let pump = FramePump::builder()
///     .items_per_tick(NonZero::new(64).unwrap())
///     .build()?;
/// let dispatcher = pump.dispatcher();
///
/// dispatcher.post(|| println!("deferred"));
///
/// // Host tick: drains up to 64 items, then asks to be called again next tick.
/// assert_eq!(pump.tick(0.016, 0.016, 1), -1.0);
/// # Ok(())
/// # }
/// ```
pub struct FramePump {
    core: Arc<DispatcherCore>,
    interval: f32,
    budget: Budget,
}

impl FramePump {
    /// Creates a builder for configuring a pump.
    #[must_use]
    pub fn builder() -> FramePumpBuilder {
        FramePumpBuilder::new()
    }

    /// Returns a dispatcher handle for scheduling work onto this pump.
    ///
    /// The handle can be cloned and shared across threads.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.core))
    }

    /// Executes queued work up to the configured budget.
    ///
    /// This is the host's periodic callback body and must be invoked on the owner
    /// thread. The arguments mirror what periodic-callback hosts provide: seconds
    /// since this pump was last called, seconds since any tick ran, and a
    /// monotonically increasing tick counter.
    ///
    /// Returns the reschedule value for the host: `0.0` to stop being called (the
    /// pump is disposed), a positive value meaning "call again in this many
    /// seconds", a negative value meaning "call again in this many ticks".
    pub fn tick(
        &self,
        elapsed_since_last_call: f32,
        elapsed_since_last_tick: f32,
        counter: i32,
    ) -> f32 {
        if self.core.is_disposed() {
            return STOP_TICKING;
        }

        trace!(
            elapsed_since_last_call = f64::from(elapsed_since_last_call),
            elapsed_since_last_tick = f64::from(elapsed_since_last_tick),
            counter = i64::from(counter),
            queued = self.core.mailbox.len(),
            "pump tick"
        );

        match self.budget {
            Budget::Unbounded => {
                while let Some(item) = self.core.mailbox.pop() {
                    self.core.run_item(item);
                }
            }
            Budget::Items(cap) => {
                for _ in 0..cap.get() {
                    let Some(item) = self.core.mailbox.pop() else {
                        break;
                    };
                    self.core.run_item(item);
                }
            }
            Budget::Time(budget) => {
                let tick_started = Instant::now();
                while let Some(item) = self.core.mailbox.pop() {
                    self.core.run_item(item);

                    // The budget bounds how many items are started, never how long
                    // one item runs.
                    if tick_started.elapsed() >= budget {
                        break;
                    }
                }
            }
        }

        self.interval
    }

    /// Returns the configured reschedule interval.
    #[must_use]
    pub fn interval(&self) -> f32 {
        self.interval
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        self.core.dispose();
    }
}

impl fmt::Debug for FramePump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("interval", &self.interval)
            .field("budget", &self.budget)
            .field("core", &self.core)
            .finish()
    }
}

/// Builder for configuring a [`FramePump`].
///
/// The two budget strategies are mutually exclusive: configure
/// [`items_per_tick`][Self::items_per_tick] or [`time_per_tick`][Self::time_per_tick],
/// not both. With neither configured, every tick drains the queue completely.
#[derive(Debug)]
pub struct FramePumpBuilder {
    interval: f32,
    items_per_tick: Option<NonZero<usize>>,
    time_per_tick: Option<Duration>,
}

impl FramePumpBuilder {
    fn new() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            items_per_tick: None,
            time_per_tick: None,
        }
    }

    /// Sets the reschedule interval returned from every tick.
    ///
    /// Positive values are seconds, negative values are ticks. Default is `-1.0`,
    /// "call again next tick". Zero is rejected at build time: hosts interpret a
    /// zero reschedule value as "stop calling me".
    #[must_use]
    pub fn interval(mut self, interval: f32) -> Self {
        self.interval = interval;
        self
    }

    /// Caps how many items one tick may start.
    #[must_use]
    pub fn items_per_tick(mut self, cap: NonZero<usize>) -> Self {
        self.items_per_tick = Some(cap);
        self
    }

    /// Caps how much wall-clock time one tick may spend starting items.
    ///
    /// Measured with a monotonic clock and checked only between items: a
    /// continuation that runs long overruns the budget and is never interrupted.
    #[must_use]
    pub fn time_per_tick(mut self, budget: Duration) -> Self {
        self.time_per_tick = Some(budget);
        self
    }

    /// Builds the pump, capturing the calling thread as the owner thread.
    ///
    /// Call this on the thread that the host will tick: `send` uses the captured
    /// identity to decide when it may execute inline.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero interval, a zero time budget, or when
    /// both budget strategies are configured.
    pub fn build(self) -> Result<FramePump, ConfigError> {
        #[expect(
            clippy::float_cmp,
            reason = "zero is the single forbidden value and is representable exactly"
        )]
        let zero_interval = self.interval == 0.0;
        if zero_interval {
            return Err(ConfigError::ZeroInterval);
        }

        let budget = match (self.items_per_tick, self.time_per_tick) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingBudgets),
            (Some(cap), None) => Budget::Items(cap),
            (None, Some(budget)) => {
                if budget.is_zero() {
                    return Err(ConfigError::ZeroTimeBudget);
                }
                Budget::Time(budget)
            }
            (None, None) => Budget::Unbounded,
        };

        Ok(FramePump {
            core: Arc::new(DispatcherCore::new(thread::current().id())),
            interval: self.interval,
            budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::test_utils::with_watchdog;

    assert_impl_all!(FramePump: Send, Sync);

    #[test]
    fn zero_interval_is_rejected() {
        let result = FramePump::builder().interval(0.0).build();

        assert!(matches!(result, Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn zero_time_budget_is_rejected() {
        let result = FramePump::builder()
            .time_per_tick(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(ConfigError::ZeroTimeBudget)));
    }

    #[test]
    fn conflicting_budgets_are_rejected() {
        let result = FramePump::builder()
            .items_per_tick(nz!(1_usize))
            .time_per_tick(Duration::from_millis(1))
            .build();

        assert!(matches!(result, Err(ConfigError::ConflictingBudgets)));
    }

    #[test]
    fn tick_returns_configured_interval() {
        let pump = FramePump::builder()
            .interval(0.25)
            .build()
            .expect("a positive interval is valid");

        assert_eq!(pump.tick(0.0, 0.0, 1), 0.25);
        assert_eq!(pump.interval(), 0.25);
    }

    #[test]
    fn tick_after_dispose_asks_host_to_stop() {
        with_watchdog(|| {
            let pump = FramePump::builder().build().expect("default config is valid");

            pump.dispatcher().dispose();

            assert_eq!(pump.tick(0.0, 0.0, 1), 0.0);
        });
    }

    #[test]
    fn unbounded_tick_drains_everything() {
        let pump = FramePump::builder().build().expect("default config is valid");
        let dispatcher = pump.dispatcher();
        let executed = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let executed = Arc::clone(&executed);
            dispatcher.post(move || {
                executed.fetch_add(1, Ordering::Relaxed);
            });
        }

        pump.tick(0.0, 0.0, 1);

        assert_eq!(executed.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn item_budget_caps_each_tick() {
        let pump = FramePump::builder()
            .items_per_tick(nz!(2_usize))
            .build()
            .expect("an item cap is valid");
        let dispatcher = pump.dispatcher();
        let executed = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let executed = Arc::clone(&executed);
            dispatcher.post(move || {
                executed.fetch_add(1, Ordering::Relaxed);
            });
        }

        pump.tick(0.0, 0.0, 1);
        assert_eq!(executed.load(Ordering::Relaxed), 2);

        pump.tick(0.0, 0.0, 2);
        assert_eq!(executed.load(Ordering::Relaxed), 4);

        pump.tick(0.0, 0.0, 3);
        assert_eq!(executed.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn time_budget_is_checked_only_between_items() {
        let pump = FramePump::builder()
            .time_per_tick(Duration::from_millis(1))
            .build()
            .expect("a time budget is valid");
        let dispatcher = pump.dispatcher();
        let executed = Arc::new(AtomicUsize::new(0));

        // Both items outlast the budget; only the first may start this tick.
        for _ in 0..2 {
            let executed = Arc::clone(&executed);
            dispatcher.post(move || {
                thread::sleep(Duration::from_millis(2));
                executed.fetch_add(1, Ordering::Relaxed);
            });
        }

        pump.tick(0.0, 0.0, 1);
        assert_eq!(executed.load(Ordering::Relaxed), 1);

        pump.tick(0.0, 0.0, 2);
        assert_eq!(executed.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn panicking_item_does_not_abort_the_batch() {
        let pump = FramePump::builder().build().expect("default config is valid");
        let dispatcher = pump.dispatcher();
        let executed = Arc::new(AtomicUsize::new(0));
        let reported = Arc::new(AtomicUsize::new(0));

        {
            let reported = Arc::clone(&reported);
            dispatcher.on_unhandled_panic(move |_| {
                reported.fetch_add(1, Ordering::Relaxed);
            });
        }

        dispatcher.post(|| panic!("intentional panic"));
        {
            let executed = Arc::clone(&executed);
            dispatcher.post(move || {
                executed.fetch_add(1, Ordering::Relaxed);
            });
        }

        pump.tick(0.0, 0.0, 1);

        assert_eq!(executed.load(Ordering::Relaxed), 1);
        assert_eq!(reported.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn drop_disposes_and_drains() {
        with_watchdog(|| {
            let pump = FramePump::builder().build().expect("default config is valid");
            let dispatcher = pump.dispatcher();
            let executed = Arc::new(AtomicUsize::new(0));

            {
                let executed = Arc::clone(&executed);
                dispatcher.post(move || {
                    executed.fetch_add(1, Ordering::Relaxed);
                });
            }

            drop(pump);

            assert_eq!(executed.load(Ordering::Relaxed), 1);
            assert!(dispatcher.is_disposed());
        });
    }
}
