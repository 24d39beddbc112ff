//! Integer-token indirection between C-style host callbacks and pump instances.
//!
//! Periodic-callback hosts typically identify a callback registration with an opaque
//! pointer-sized "refcon". Handing out object pointers for that purpose ties object
//! lifetime to callback lifetime; instead, a registry slot index travels through the
//! refcon and every lookup is bounds-checked against the arena.

use std::any::type_name;
use std::fmt;
use std::mem;

use tracing::trace;

use crate::FramePump;

/// Reschedule value dispatched for tokens that no longer resolve to a pump.
const STALE_TOKEN: f32 = 0.0;

/// Opaque token identifying a pump registered in a [`TickRegistry`].
///
/// The raw value round-trips through [`to_raw`][Self::to_raw] and
/// [`from_raw`][Self::from_raw] so host shims can carry it through a pointer-sized
/// refcon parameter without handing out object pointers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TickToken(usize);

impl TickToken {
    /// Returns the raw slot index for smuggling through a host refcon.
    #[must_use]
    pub fn to_raw(self) -> usize {
        self.0
    }

    /// Reconstructs a token from a raw refcon value.
    ///
    /// Any value is accepted; dispatching through a token that does not identify a
    /// live registration is harmless (see [`TickRegistry::dispatch`]).
    #[must_use]
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }
}

enum Slot {
    Occupied(Box<FramePump>),

    /// Part of the intrusive free list: holds the index of the next vacant slot.
    Vacant { next_free: usize },
}

/// Arena of registered pumps indexed by [`TickToken`].
///
/// Vacant slots form an intrusive free list, so tokens are reused compactly instead
/// of growing the arena forever. The registry lives on the owner thread next to the
/// host's callback shim; it is not a concurrent structure.
///
/// # Example
///
/// ```rust
/// use frame_pump::{FramePump, TickRegistry, TickToken};
///
/// # fn main() -> Result<(), frame_pump::ConfigError> {
/// let mut registry = TickRegistry::new();
/// let token = registry.register(FramePump::builder().build()?);
///
/// // What a host callback shim does with the refcon it is handed back:
/// let refcon = token.to_raw();
/// let reschedule = registry.dispatch(TickToken::from_raw(refcon), 0.016, 0.016, 1);
/// assert_eq!(reschedule, -1.0);
///
/// // Explicit teardown; dropping the returned pump disposes its dispatcher.
/// let pump = registry.remove(token);
/// assert!(pump.is_some());
/// # Ok(())
/// # }
/// ```
pub struct TickRegistry {
    slots: Vec<Slot>,

    /// Index of the first vacant slot; equals `slots.len()` when every slot is
    /// occupied.
    next_free: usize,

    occupied: usize,
}

impl TickRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_free: 0,
            occupied: 0,
        }
    }

    /// Registers a pump and returns the token identifying its slot.
    pub fn register(&mut self, pump: FramePump) -> TickToken {
        let index = self.next_free;

        match self.slots.get_mut(index) {
            Some(slot) => {
                let previous = mem::replace(slot, Slot::Occupied(Box::new(pump)));
                match previous {
                    Slot::Vacant { next_free } => self.next_free = next_free,
                    Slot::Occupied(_) => unreachable!("the free list pointed at an occupied slot"),
                }
            }
            None => {
                self.slots.push(Slot::Occupied(Box::new(pump)));
                self.next_free = self.slots.len();
            }
        }

        self.occupied = self.occupied.saturating_add(1);
        trace!(token = index, "pump registered");

        TickToken(index)
    }

    /// Forwards one host tick to the pump registered under `token`.
    ///
    /// A stale or out-of-range token is not an error: hosts may deliver a late
    /// callback for a registration that was already removed. Such ticks resolve to
    /// nothing and yield the "stop calling me" reschedule value.
    #[must_use]
    pub fn dispatch(
        &self,
        token: TickToken,
        elapsed_since_last_call: f32,
        elapsed_since_last_tick: f32,
        counter: i32,
    ) -> f32 {
        match self.slots.get(token.0) {
            Some(Slot::Occupied(pump)) => {
                pump.tick(elapsed_since_last_call, elapsed_since_last_tick, counter)
            }
            Some(Slot::Vacant { .. }) | None => {
                trace!(token = token.0, "tick dispatched to a vacant slot");
                STALE_TOKEN
            }
        }
    }

    /// Removes and returns the pump registered under `token`.
    ///
    /// Returns [`None`] for a token that does not identify a live registration.
    /// Dropping the returned pump disposes its dispatcher; hold on to it if
    /// teardown should happen later.
    pub fn remove(&mut self, token: TickToken) -> Option<FramePump> {
        let slot = self.slots.get_mut(token.0)?;

        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }

        let previous = mem::replace(
            slot,
            Slot::Vacant {
                next_free: self.next_free,
            },
        );
        self.next_free = token.0;
        self.occupied = self.occupied.saturating_sub(1);
        trace!(token = token.0, "pump removed");

        match previous {
            Slot::Occupied(pump) => Some(*pump),
            Slot::Vacant { .. } => unreachable!("vacancy was checked above"),
        }
    }

    /// Returns the number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns whether the registry has no live registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }
}

impl Default for TickRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TickRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("slots", &self.slots.len())
            .field("occupied", &self.occupied)
            .finish_non_exhaustive()
    }
}
