//! Bounded single-producer/single-consumer FIFO with lock-step commit.
//!
//! Every boundary between stages, and the boundary to the transport, is one
//! of these queues. It behaves like a synchronous hardware FIFO:
//!
//! - status (`writable`, `readable`) reflects the state committed at the
//!   last tick boundary, so producer and consumer see the same picture no
//!   matter which runs first within a tick
//! - a push or pop made during a tick is staged, and becomes visible only
//!   after `commit()`
//! - at most one push and one pop may be staged per tick
//!
//! A full queue rejects writes; nothing is ever overwritten or dropped.
//!
//! # Example
//! ```
//! use collatz_sim_core::queue::FlowQueue;
//!
//! let mut q = FlowQueue::new(2);
//! q.push(b'a').unwrap();
//! assert!(!q.readable()); // not visible until the tick boundary
//! q.commit();
//! assert_eq!(q.pop().unwrap(), b'a');
//! q.commit();
//! assert!(q.is_empty());
//! ```

use crate::error::{QueueError, Result};
use std::collections::VecDeque;

/// Bounded FIFO whose writes and reads take effect at the tick boundary.
///
/// # Invariants
/// - `items.len() <= capacity` at every commit
/// - at most one staged push and one staged pop between commits
#[derive(Debug, Clone)]
pub struct FlowQueue<T> {
    /// Committed entries, oldest first
    items: VecDeque<T>,
    /// Maximum committed entries
    capacity: usize,
    /// Entry written this tick
    staged_push: Option<T>,
    /// Whether the front entry was read this tick
    staged_pop: bool,
}

impl<T: Clone> FlowQueue<T> {
    /// Create an empty queue holding at most `capacity` entries.
    ///
    /// A zero capacity queue is never writable; configuration validation
    /// rejects it before it gets here.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            staged_push: None,
            staged_pop: false,
        }
    }

    /// Whether a push would be accepted this tick.
    pub fn writable(&self) -> bool {
        self.staged_push.is_none() && self.items.len() < self.capacity
    }

    /// Whether a pop would return an entry this tick.
    pub fn readable(&self) -> bool {
        !self.staged_pop && !self.items.is_empty()
    }

    /// Stage `value` for the end of this tick.
    ///
    /// # Errors
    /// `QueueError::Full` if the queue is not writable; the value is
    /// returned to nobody and must be retried by the producer next tick.
    pub fn push(&mut self, value: T) -> Result<()> {
        if !self.writable() {
            return Err(QueueError::Full {
                capacity: self.capacity,
            }
            .into());
        }
        self.staged_push = Some(value);
        Ok(())
    }

    /// Read the oldest committed entry, removing it at the end of this tick.
    ///
    /// # Errors
    /// `QueueError::Empty` if the queue is not readable.
    pub fn pop(&mut self) -> Result<T> {
        if !self.readable() {
            return Err(QueueError::Empty.into());
        }
        let value = self.items.front().cloned().ok_or(QueueError::Empty)?;
        self.staged_pop = true;
        Ok(value)
    }

    /// Look at the oldest readable entry without consuming it.
    pub fn peek(&self) -> Option<&T> {
        if self.staged_pop {
            None
        } else {
            self.items.front()
        }
    }

    /// Apply this tick's staged pop and push.
    pub fn commit(&mut self) {
        if self.staged_pop {
            self.items.pop_front();
            self.staged_pop = false;
        }
        if let Some(value) = self.staged_push.take() {
            self.items.push_back(value);
        }
    }

    /// Committed entry count.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is committed or staged.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.staged_push.is_none()
    }

    /// Whether the committed entries fill the queue.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Maximum committed entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_push_visible_after_commit() {
        let mut q = FlowQueue::new(4);
        q.push(1u8).unwrap();
        assert!(!q.readable());
        assert!(!q.is_empty());
        q.commit();
        assert!(q.readable());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_one_push_per_tick() {
        let mut q = FlowQueue::new(4);
        q.push(1u8).unwrap();
        assert!(matches!(
            q.push(2),
            Err(Error::Queue(QueueError::Full { capacity: 4 }))
        ));
        q.commit();
        q.push(2).unwrap();
    }

    #[test]
    fn test_full_rejects_write() {
        let mut q = FlowQueue::new(2);
        for v in [10u8, 20] {
            q.push(v).unwrap();
            q.commit();
        }
        assert!(q.is_full());
        assert!(!q.writable());
        assert!(matches!(
            q.push(30),
            Err(Error::Queue(QueueError::Full { capacity: 2 }))
        ));
        assert_eq!(q.capacity(), 2);
        q.commit();

        // Contents untouched by the rejected write
        assert_eq!(q.pop().unwrap(), 10);
        q.commit();
        assert_eq!(q.pop().unwrap(), 20);
        q.commit();
        assert!(q.is_empty());
    }

    #[test]
    fn test_pop_empty() {
        let mut q: FlowQueue<u8> = FlowQueue::new(1);
        assert!(matches!(q.pop(), Err(Error::Queue(QueueError::Empty))));
    }

    #[test]
    fn test_one_pop_per_tick() {
        let mut q = FlowQueue::new(4);
        q.push(1u8).unwrap();
        q.commit();
        q.push(2u8).unwrap();
        q.commit();

        assert_eq!(q.pop().unwrap(), 1);
        assert!(q.peek().is_none());
        assert!(q.pop().is_err());
        q.commit();
        assert_eq!(q.peek(), Some(&2));
    }

    #[test]
    fn test_full_queue_frees_slot_at_commit() {
        let mut q = FlowQueue::new(1);
        q.push(1u8).unwrap();
        q.commit();

        // Consumer drains while producer still sees full this tick
        assert_eq!(q.pop().unwrap(), 1);
        assert!(!q.writable());
        q.commit();
        assert!(q.writable());
    }

    #[test]
    fn test_simultaneous_push_and_pop() {
        let mut q = FlowQueue::new(2);
        q.push(1u8).unwrap();
        q.commit();

        assert_eq!(q.pop().unwrap(), 1);
        q.push(2).unwrap();
        q.commit();

        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap(), 2);
    }

    #[test]
    fn test_zero_capacity_never_writable() {
        let q: FlowQueue<u8> = FlowQueue::new(0);
        assert!(!q.writable());
        assert!(q.is_full());
    }
}
