//! Single-producer multi-consumer queues.
//!
//! The mirror image of the MPSC ring: the producer owns the tail cursor
//! exclusively and never needs a compare-and-swap, while consumers race
//! for the head with a compare-and-swap claim. A consumer only claims a
//! slot whose publish is already visible through the slot sequence, so
//! the consumer side never waits on the producer.
//!
//! # Example
//!
//! ```
//! use flux_queue::spmc;
//!
//! let (mut tx, rx) = spmc::bounded::<u64>(8);
//! let rx2 = rx.clone();
//!
//! tx.offer(1).unwrap();
//! tx.offer(2).unwrap();
//!
//! assert_eq!(rx.poll(), Some(1));
//! assert_eq!(rx2.poll(), Some(2));
//! assert_eq!(rx.poll(), None);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::Full;
use crate::ring::SeqRing;

/// Creates a bounded SPMC queue with the given capacity.
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

/// The producing half of a bounded SPMC queue.
///
/// Cannot be cloned; offers take `&mut self`.
pub struct Producer<T> {
    ring: Arc<SeqRing<T>>,
}

impl<T> Producer<T> {
    /// Attempts to insert `value` at the back of the queue.
    ///
    /// Wait-free: one sequence load, one write, two stores.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the queue was observed full.
    #[inline]
    pub fn offer(&mut self, value: T) -> Result<(), Full<T>> {
        // Safety: this handle is unique and `&mut`, so we are the only
        // producer thread.
        unsafe { self.ring.push_exclusive(value) }
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

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// The consuming half of a bounded SPMC queue.
///
/// Clone it to add consumers; all clones share the same ring.
pub struct Consumer<T> {
    ring: Arc<SeqRing<T>>,
}

impl<T> Consumer<T> {
    /// Removes and returns the element at the front of the queue.
    ///
    /// Lock-free: a lost head claim retries against the next slot.
    /// Returns `None` if the queue was observed empty.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn basic_offer_poll() {
        let (mut tx, rx) = bounded::<u64>(8);

        tx.offer(1).unwrap();
        tx.offer(2).unwrap();

        assert_eq!(rx.poll(), Some(1));
        assert_eq!(rx.poll(), Some(2));
        assert_eq!(rx.poll(), None);
    }

    #[test]
    fn full_then_drain() {
        let (mut tx, rx) = bounded::<u64>(4);

        for i in 0..4 {
            tx.offer(i).unwrap();
        }
        assert_eq!(tx.offer(4).unwrap_err().into_inner(), 4);

        assert_eq!(rx.poll(), Some(0));
        tx.offer(4).unwrap();
    }

    #[test]
    fn consumers_split_the_stream() {
        const TOTAL: u64 = 100_000;
        let (mut tx, rx) = bounded::<u64>(1024);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let rx = rx.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        match rx.poll() {
                            Some(u64::MAX) => return seen,
                            Some(value) => seen.push(value),
                            None => std::hint::spin_loop(),
                        }
                    }
                })
            })
            .collect();

        for i in 0..TOTAL {
            while tx.offer(i).is_err() {
                std::hint::spin_loop();
            }
        }
        // One stop marker per consumer.
        for _ in 0..4 {
            while tx.offer(u64::MAX).is_err() {
                std::hint::spin_loop();
            }
        }

        let mut all: Vec<u64> = consumers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort_unstable();

        let expected: Vec<u64> = (0..TOTAL).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn single_consumer_sees_fifo() {
        let (mut tx, rx) = bounded::<u64>(8);

        for lap in 0..100 {
            for i in 0..8 {
                tx.offer(lap * 8 + i).unwrap();
            }
            for i in 0..8 {
                assert_eq!(rx.poll(), Some(lap * 8 + i));
            }
        }
    }
}
