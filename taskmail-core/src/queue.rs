//! Bounded queue used as mailbox storage
//!
//! Thin wrapper over `crossbeam_queue::ArrayQueue`: lock-free, multi-producer,
//! fixed capacity, FIFO. A full queue hands the element back to the caller
//! instead of blocking or overwriting.

use crossbeam_queue::ArrayQueue;
use std::fmt;

/// Bounded lock-free queue holding at most `capacity` elements
pub struct BoundedQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> BoundedQueue<T> {
    /// Create a new bounded queue holding at most `capacity` elements
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be at least 1");
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Push a value, handing it back if the queue is full
    pub fn try_push(&self, value: T) -> Result<(), T> {
        self.inner.push(value)
    }

    /// Pop the oldest value
    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
