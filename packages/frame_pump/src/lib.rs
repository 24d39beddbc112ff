//! Frame-budgeted dispatch of cross-thread work onto a host-ticked owner thread.
//!
//! Simulation hosts drive embedded code through a periodic callback on a single
//! thread, once per frame. Background threads cannot touch host state directly;
//! instead they hand continuations to a [`Dispatcher`], and the host-invoked
//! [`FramePump`] executes them on the owner thread — at most a configured number of
//! items, or a configured slice of wall-clock time, per tick.
//!
//! # Quick start
//!
//! ```rust
//! use frame_pump::FramePump;
//!
//! # fn main() -> Result<(), frame_pump::ConfigError> {
//! // Build on the thread that the host will tick.
//! let pump = FramePump::builder().build()?;
//! let dispatcher = pump.dispatcher();
//!
//! // Any thread can schedule work...
//! dispatcher.post(|| println!("runs on the owner thread"));
//!
//! // ...which the host's periodic callback drains.
//! let reschedule = pump.tick(0.016, 0.016, 1);
//! assert_eq!(reschedule, -1.0); // "call me again next tick"
//! # Ok(())
//! # }
//! ```
//!
//! # Budgets
//!
//! A tick with no budget drains the queue completely. To keep frame times stable,
//! cap each tick by item count or by wall-clock time (mutually exclusive):
//!
//! ```rust
//! use std::num::NonZero;
//! use std::time::Duration;
//!
//! use frame_pump::FramePump;
//!
//! # fn main() -> Result<(), frame_pump::ConfigError> {
//! let by_count = FramePump::builder()
//!     .items_per_tick(NonZero::new(64).unwrap())
//!     .build()?;
//!
//! let by_time = FramePump::builder()
//!     .time_per_tick(Duration::from_millis(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! The time budget bounds how many items are *started* per tick, never how long a
//! single item runs: it is checked between items and a running continuation is
//! never preempted.
//!
//! # Blocking calls
//!
//! [`Dispatcher::send`] blocks the calling thread until the continuation has run on
//! the owner thread. Called from the owner thread itself it executes inline, so
//! code that does not know which thread it is on cannot deadlock itself.
//!
//! # Shutdown
//!
//! [`Dispatcher::dispose`] (or dropping the pump) stops new work, raises the
//! [`ShutdownSignal`], drains everything still queued, and waits until every
//! asynchronous operation announced via [`Dispatcher::operation_started`] has
//! completed. Work posted before disposal is never lost, even if the host has
//! already stopped ticking.
//!
//! # Panics in continuations
//!
//! A panicking continuation never takes down the pump or the host frame: each item
//! is isolated, the panic payload goes to observers registered with
//! [`Dispatcher::on_unhandled_panic`], and the drain continues with the next item.

mod dispatcher;
mod error;
mod mailbox;
mod panic_sink;
mod pending;
mod pump;
mod registry;
mod shutdown_signal;
#[cfg(test)]
mod test_utils;
mod work_item;

pub(crate) use dispatcher::DispatcherCore;
pub use dispatcher::*;
pub use error::*;
pub(crate) use mailbox::*;
pub(crate) use panic_sink::*;
pub(crate) use pending::*;
pub use pump::*;
pub use registry::*;
pub use shutdown_signal::*;
pub(crate) use work_item::*;
