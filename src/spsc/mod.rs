//! Single-producer single-consumer queues.
//!
//! The bounded queue here is the fastest variant in the crate: exactly one
//! thread writes each cursor, so acquire/release loads and stores are all
//! the synchronization it needs. No compare-and-swap anywhere.
//!
//! # Example
//!
//! ```
//! use flux_queue::spsc;
//!
//! let (mut tx, mut rx) = spsc::bounded::<u64>(1024);
//!
//! tx.offer(1).unwrap();
//! tx.offer(2).unwrap();
//!
//! assert_eq!(rx.poll(), Some(1));
//! assert_eq!(rx.poll(), Some(2));
//! assert_eq!(rx.poll(), None);
//! ```
//!
//! # Performance Notes
//!
//! Each handle keeps a cached snapshot of the other side's cursor and only
//! refreshes it from the shared atomic when the cheap check fails. On the
//! hot path (queue neither full nor empty) an offer or poll performs zero
//! atomic loads and one release store.
//!
//! # Arity
//!
//! Both handles are exclusive: they cannot be cloned and their operations
//! take `&mut self`, so the single-producer/single-consumer precondition is
//! enforced by ownership rather than checked at runtime.

pub mod linked;

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::error::Full;

/// Creates a bounded SPSC queue with the given capacity.
///
/// The capacity is rounded up to the next power of two (minimum 2) so index
/// wrapping is a mask instead of a division.
///
/// # Example
///
/// ```
/// use flux_queue::spsc;
///
/// let (tx, _rx) = spsc::bounded::<String>(100);
/// assert_eq!(tx.capacity(), 128);
/// ```
#[must_use]
pub fn bounded<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let ring = Arc::new(Ring::new(capacity));

    (
        Producer {
            ring: Arc::clone(&ring),
            tail: 0,
            cached_head: 0,
        },
        Consumer {
            ring,
            head: 0,
            cached_tail: 0,
        },
    )
}

/// Shared ring storage: two padded cursors and a slot array.
struct Ring<T> {
    /// Next slot to consume. Written only by the consumer.
    head: CachePadded<AtomicUsize>,
    /// Next slot to produce. Written only by the producer.
    tail: CachePadded<AtomicUsize>,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
}

unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(2);
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
            mask: capacity - 1,
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.mask + 1
    }

    #[inline]
    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.capacity())
    }

    /// Writes `value` into the slot for `index`.
    ///
    /// # Safety
    ///
    /// The slot must be empty and owned by the calling producer.
    #[inline]
    unsafe fn write(&self, index: usize, value: T) {
        unsafe {
            (*self.slots[index & self.mask].get()).write(value);
        }
    }

    /// Moves the value out of the slot for `index`.
    ///
    /// # Safety
    ///
    /// The slot must hold a published element owned by the calling consumer.
    #[inline]
    unsafe fn read(&self, index: usize) -> T {
        unsafe { (*self.slots[index & self.mask].get()).assume_init_read() }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Both handles are gone; cursors are quiescent.
        let tail = self.tail.load(Ordering::Relaxed);
        let mut head = self.head.load(Ordering::Relaxed);

        while head != tail {
            unsafe {
                (*self.slots[head & self.mask].get()).assume_init_drop();
            }
            head = head.wrapping_add(1);
        }
    }
}

/// The producing half of a bounded SPSC queue.
///
/// Cannot be cloned; offers take `&mut self`.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
    /// Our write position (authoritative, only we advance it).
    tail: usize,
    /// Snapshot of the consumer's head, refreshed only when the queue
    /// appears full.
    cached_head: usize,
}

impl<T> Producer<T> {
    /// Attempts to insert `value` at the back of the queue.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the queue was observed full. Never
    /// blocks.
    ///
    /// # Example
    ///
    /// ```
    /// use flux_queue::spsc;
    ///
    /// let (mut tx, _rx) = spsc::bounded::<u32>(2);
    ///
    /// assert!(tx.offer(1).is_ok());
    /// assert!(tx.offer(2).is_ok());
    /// assert_eq!(tx.offer(3).unwrap_err().into_inner(), 3);
    /// ```
    #[inline]
    pub fn offer(&mut self, value: T) -> Result<(), Full<T>> {
        let tail = self.tail;

        // Fast path: room according to the cached head, no atomic load.
        if tail.wrapping_sub(self.cached_head) < self.ring.capacity() {
            unsafe {
                self.ring.write(tail, value);
            }
            self.ring.tail.store(tail.wrapping_add(1), Ordering::Release);
            self.tail = tail.wrapping_add(1);
            return Ok(());
        }

        self.offer_slow(value)
    }

    #[cold]
    fn offer_slow(&mut self, value: T) -> Result<(), Full<T>> {
        let tail = self.tail;
        self.cached_head = self.ring.head.load(Ordering::Acquire);

        if tail.wrapping_sub(self.cached_head) < self.ring.capacity() {
            unsafe {
                self.ring.write(tail, value);
            }
            self.ring.tail.store(tail.wrapping_add(1), Ordering::Release);
            self.tail = tail.wrapping_add(1);
            Ok(())
        } else {
            Err(Full(value))
        }
    }

    /// Returns the capacity of the queue.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the number of queued elements.
    ///
    /// Best-effort snapshot; may be stale by the time it returns.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if the queue was observed empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
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

/// The consuming half of a bounded SPSC queue.
///
/// Cannot be cloned; polls take `&mut self`.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
    /// Our read position (authoritative, only we advance it).
    head: usize,
    /// Snapshot of the producer's tail, refreshed only when the queue
    /// appears empty.
    cached_tail: usize,
}

impl<T> Consumer<T> {
    /// Removes and returns the element at the front of the queue.
    ///
    /// Returns `None` if the queue was observed empty. Never blocks.
    ///
    /// # Example
    ///
    /// ```
    /// use flux_queue::spsc;
    ///
    /// let (mut tx, mut rx) = spsc::bounded::<u32>(8);
    ///
    /// assert_eq!(rx.poll(), None);
    /// tx.offer(42).unwrap();
    /// assert_eq!(rx.poll(), Some(42));
    /// ```
    #[inline]
    pub fn poll(&mut self) -> Option<T> {
        let head = self.head;

        // Fast path: data according to the cached tail, no atomic load.
        if head != self.cached_tail {
            let value = unsafe { self.ring.read(head) };
            self.ring.head.store(head.wrapping_add(1), Ordering::Release);
            self.head = head.wrapping_add(1);
            return Some(value);
        }

        self.poll_slow()
    }

    #[cold]
    fn poll_slow(&mut self) -> Option<T> {
        let head = self.head;
        self.cached_tail = self.ring.tail.load(Ordering::Acquire);

        if head != self.cached_tail {
            let value = unsafe { self.ring.read(head) };
            self.ring.head.store(head.wrapping_add(1), Ordering::Release);
            self.head = head.wrapping_add(1);
            Some(value)
        } else {
            None
        }
    }

    /// Returns the capacity of the queue.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the number of queued elements.
    ///
    /// Best-effort snapshot; may be stale by the time it returns.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if the queue was observed empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
