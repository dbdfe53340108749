#![forbid(unsafe_code)]

//! Single-threaded message queue.
//!
//! Components that run inside frame callbacks or observable notifications
//! never call back into their owner. They post to a [`Mailbox`] and the owner
//! drains it once the callback chain has unwound.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Shared FIFO of messages. Clones post into the same queue.
#[derive(Debug)]
pub struct Mailbox<M> {
    queue: Rc<RefCell<VecDeque<M>>>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<M> Default for Mailbox<M> {
    fn default() -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
        }
    }
}

impl<M> Mailbox<M> {
    /// Create an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message.
    pub fn post(&self, message: M) {
        self.queue.borrow_mut().push_back(message);
    }

    /// Take every queued message in arrival order.
    pub fn drain(&self) -> Vec<M> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Drop every queued message.
    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
