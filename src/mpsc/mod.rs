//! Multi-producer single-consumer queues.
//!
//! Producers race for slots with a compare-and-swap claim on the tail
//! cursor; the winner writes its element and publishes it through the
//! slot's sequence number. The consumer owns the head cursor exclusively,
//! and on a claimed-but-unpublished slot it spins briefly for the publish,
//! so delivery order always equals claim order (per-producer FIFO).
//!
//! # Example
//!
//! ```
//! use flux_queue::mpsc;
//! use std::thread;
//!
//! let (tx, mut rx) = mpsc::bounded::<u64>(1024);
//! let tx2 = tx.clone();
//!
//! let h1 = thread::spawn(move || {
//!     for i in 0..100 {
//!         while tx.offer(i).is_err() {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//! let h2 = thread::spawn(move || {
//!     for i in 100..200 {
//!         while tx2.offer(i).is_err() {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//!
//! let mut received = 0;
//! while received < 200 {
//!     if rx.poll().is_some() {
//!         received += 1;
//!     }
//! }
//!
//! h1.join().unwrap();
//! h2.join().unwrap();
//! ```

pub mod compound;
pub mod linked;

use std::fmt;
use std::sync::Arc;

use crate::error::Full;
use crate::ring::SeqRing;

/// Creates a bounded MPSC queue with the given capacity.
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

/// The producing half of a bounded MPSC queue.
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

/// The consuming half of a bounded MPSC queue.
///
/// Cannot be cloned; polls take `&mut self`.
pub struct Consumer<T> {
    ring: Arc<SeqRing<T>>,
}

impl<T> Consumer<T> {
    /// Removes and returns the element at the front of the queue.
    ///
    /// Returns `None` only when the queue was observed empty; an element
    /// mid-publish is waited out so claim order is never reordered.
    #[inline]
    pub fn poll(&mut self) -> Option<T> {
        // Safety: this handle is unique and `&mut`, so we are the only
        // consumer thread.
        unsafe { self.ring.pop_exclusive() }
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

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
