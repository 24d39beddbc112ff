//! The mailbox: an unbounded FIFO of work items shared by all producer threads.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;

use crate::WorkItem;

/// Unbounded FIFO of [`WorkItem`]s with a one-way close.
///
/// Producers push from any thread. Items are popped by the owner thread during normal
/// operation and by the disposing thread during the shutdown drain.
///
/// The sender lives in `RwLock<Option<..>>` so `close()` can drop it; dropping the
/// sender is what wakes a blocked `pop_blocking` call once the queue runs dry.
#[derive(Debug)]
pub(crate) struct Mailbox {
    sender: RwLock<Option<Sender<WorkItem>>>,
    receiver: Receiver<WorkItem>,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = channel::unbounded();

        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
        }
    }

    /// Enqueues a work item without blocking.
    ///
    /// Returns `false` if the mailbox is closed, in which case the item is dropped.
    pub(crate) fn push(&self, item: WorkItem) -> bool {
        match &*self.sender.read() {
            Some(sender) => {
                sender
                    .send(item)
                    .expect("the receiver is owned by the mailbox and outlives every sender");
                true
            }
            None => false,
        }
    }

    /// Pops the oldest queued item without blocking.
    pub(crate) fn pop(&self) -> Option<WorkItem> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until an item is available or the mailbox is closed with nothing queued.
    pub(crate) fn pop_blocking(&self) -> Option<WorkItem> {
        self.receiver.recv().ok()
    }

    /// Closes the mailbox to new pushes. Idempotent.
    ///
    /// Items queued before the close remain poppable until exhausted.
    pub(crate) fn close(&self) {
        drop(self.sender.write().take());
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }
}
