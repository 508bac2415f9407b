//! Multi-producer multi-consumer queues.
//!
//! The only variant with contention on both ends. Each slot's sequence
//! number arbitrates between claim and publish: producers claim the tail
//! slot with a compare-and-swap once the sequence says it is writable,
//! consumers claim the head slot once the sequence says it is readable.
//! A thread that loses a claim retries without blocking; there is no
//! starvation guarantee beyond what compare-and-swap fairness provides
//! on the underlying hardware.
//!
//! # Example
//!
//! ```
//! use flux_queue::mpmc;
//!
//! let (tx, rx) = mpmc::bounded::<u64>(8);
//! let tx2 = tx.clone();
//! let rx2 = rx.clone();
//!
//! tx.offer(1).unwrap();
//! tx2.offer(2).unwrap();
//!
//! assert_eq!(rx.poll(), Some(1));
//! assert_eq!(rx2.poll(), Some(2));
//! assert_eq!(rx.poll(), None);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::Full;
use crate::ring::SeqRing;

/// Creates a bounded MPMC queue with the given capacity.
///
/// The capacity is rounded up to the next power of two (minimum 2).
#[must_use]
pub fn bounded<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let ring = Arc::new(SeqRing::new(capacity));

    (
        Producer {
            ring: Arc::clone(&ring),
        },
        Consumer { ring },
    )
}

/// The producing half of a bounded MPMC queue.
///
/// Clone it to add producers; all clones share the same ring.
pub struct Producer<T> {
    ring: Arc<SeqRing<T>>,
}

impl<T> Producer<T> {
    /// Attempts to insert `value` at the back of the queue.
    ///
    /// Lock-free: a lost slot claim retries; a full queue fails
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the queue was observed full.
    #[inline]
    pub fn offer(&self, value: T) -> Result<(), Full<T>> {
        self.ring.push_shared(value)
    }

    /// Returns the capacity of the queue.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the number of queued elements (best-effort).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if the queue was observed empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns `true` if the queue was observed full.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// The consuming half of a bounded MPMC queue.
///
/// Clone it to add consumers; all clones share the same ring.
pub struct Consumer<T> {
    ring: Arc<SeqRing<T>>,
}

impl<T> Consumer<T> {
    /// Removes and returns the element at the front of the queue.
    ///
    /// Lock-free: a lost head claim retries. Returns `None` if the queue
    /// was observed empty.
    #[inline]
    pub fn poll(&self) -> Option<T> {
        self.ring.pop_shared()
    }

    /// Returns the capacity of the queue.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the number of queued elements (best-effort).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if the queue was observed empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
