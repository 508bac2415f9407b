//! Sequenced ring-buffer storage for the multi-producer and multi-consumer
//! bounded queues.
//!
//! Every slot carries its own sequence number, which encodes the slot's
//! state relative to the cursors:
//!
//! - `sequence == index`: empty, writable
//! - `sequence == index + 1`: published, readable
//! - `sequence == index + capacity`: consumed, writable next lap
//!
//! A side with exclusive ownership of its cursor (the MPSC consumer, the
//! SPMC producer) advances it with plain stores; a shared side claims via a
//! compare-and-swap loop. Publication always travels through the slot
//! sequence with release/acquire ordering, never through the cursors.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::error::Full;

/// A slot and its state sequence.
struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Power-of-two slot array with padded head/tail cursors.
pub(crate) struct SeqRing<T> {
    /// Next slot to consume.
    head: CachePadded<AtomicUsize>,
    /// Next slot to produce.
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
    mask: usize,
}

unsafe impl<T: Send> Send for SeqRing<T> {}
unsafe impl<T: Send> Sync for SeqRing<T> {}

impl<T> SeqRing<T> {
    /// Allocates a ring; capacity rounds up to the next power of two
    /// (minimum 2). Slot `i` starts at `sequence == i` (writable).
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(2);
        let slots = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
            mask: capacity - 1,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Best-effort occupancy; clamped to `[0, capacity]` because the two
    /// cursor loads are not a consistent snapshot.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        let diff = tail.wrapping_sub(head) as isize;
        if diff < 0 {
            0
        } else {
            (diff as usize).min(self.capacity())
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index & self.mask]
    }

    /// Inserts from any number of producer threads.
    ///
    /// Claims the tail slot via compare-and-swap, writes, then publishes by
    /// advancing the slot sequence with a release store. A lost claim
    /// retries with backoff; a slot not yet recycled means the queue was
    /// observed full.
    pub(crate) fn push_shared(&self, value: T) -> Result<(), Full<T>> {
        let backoff = Backoff::new();
        let mut tail = self.tail.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(tail);
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(tail) as isize;

            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            (*slot.value.get()).write(value);
                        }
                        slot.sequence
                            .store(tail.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => {
                        tail = current;
                        backoff.spin();
                    }
                }
            } else if diff < 0 {
                return Err(Full(value));
            } else {
                // Another producer claimed this slot; chase the cursor.
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Inserts from the single producer thread.
    ///
    /// # Safety
    ///
    /// The caller must be the only thread ever pushing into this ring.
    pub(crate) unsafe fn push_exclusive(&self, value: T) -> Result<(), Full<T>> {
        let tail = self.tail.load(Ordering::Relaxed);
        let slot = self.slot(tail);
        let seq = slot.sequence.load(Ordering::Acquire);

        if (seq.wrapping_sub(tail) as isize) < 0 {
            return Err(Full(value));
        }

        // seq == tail: writable, and no other producer can exist.
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.sequence
            .store(tail.wrapping_add(1), Ordering::Release);
        self.tail.store(tail.wrapping_add(1), Ordering::Relaxed);
        Ok(())
    }

    /// Removes from any number of consumer threads.
    ///
    /// A consumer only claims a slot whose publish is already visible, so
    /// it never waits on a producer.
    pub(crate) fn pop_shared(&self) -> Option<T> {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(head);
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(head.wrapping_add(1)) as isize;

            if diff == 0 {
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(head.wrapping_add(self.capacity()), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => {
                        head = current;
                        backoff.spin();
                    }
                }
            } else if diff < 0 {
                return None;
            } else {
                // Another consumer claimed this slot; chase the cursor.
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Removes from the single consumer thread.
    ///
    /// If the head slot is claimed but not yet published, spins briefly for
    /// the publish instead of skipping it, so delivery order equals claim
    /// order.
    ///
    /// # Safety
    ///
    /// The caller must be the only thread ever popping from this ring.
    pub(crate) unsafe fn pop_exclusive(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = self.slot(head);
        let published = head.wrapping_add(1);

        if slot.sequence.load(Ordering::Acquire) != published {
            if self.tail.load(Ordering::Acquire) == head {
                return None;
            }
            // A producer won the claim but hasn't published yet; the
            // publish is at most a store away.
            let backoff = Backoff::new();
            while slot.sequence.load(Ordering::Acquire) != published {
                backoff.snooze();
            }
        }

        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.sequence
            .store(head.wrapping_add(self.capacity()), Ordering::Release);
        self.head.store(head.wrapping_add(1), Ordering::Relaxed);
        Some(value)
    }
}

impl<T> Drop for SeqRing<T> {
    fn drop(&mut self) {
        // All handles are gone; drop whatever was published but never
        // consumed. Claimed-but-unpublished slots hold no value.
        let tail = self.tail.load(Ordering::Relaxed);
        let mut head = self.head.load(Ordering::Relaxed);

        while head != tail {
            let slot = self.slot(head);
            if slot.sequence.load(Ordering::Relaxed) == head.wrapping_add(1) {
                unsafe {
                    (*slot.value.get()).assume_init_drop();
                }
            }
            head = head.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_start_at_index() {
        let ring = SeqRing::<u64>::new(8);
        for i in 0..8 {
            assert_eq!(ring.slot(i).sequence.load(Ordering::Relaxed), i);
        }
    }

    #[test]
    fn shared_push_pop_roundtrip() {
        let ring = SeqRing::<u64>::new(4);

        ring.push_shared(7).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.pop_shared(), Some(7));
        assert_eq!(ring.pop_shared(), None);
    }

    #[test]
    fn exclusive_push_pop_roundtrip() {
        let ring = SeqRing::<u64>::new(4);

        unsafe {
            ring.push_exclusive(1).unwrap();
            ring.push_exclusive(2).unwrap();
            assert_eq!(ring.pop_exclusive(), Some(1));
            assert_eq!(ring.pop_exclusive(), Some(2));
            assert_eq!(ring.pop_exclusive(), None);
        }
    }

    #[test]
    fn full_detection_both_paths() {
        let ring = SeqRing::<u64>::new(2);

        ring.push_shared(1).unwrap();
        ring.push_shared(2).unwrap();
        assert_eq!(ring.push_shared(3).unwrap_err().into_inner(), 3);
        unsafe {
            assert_eq!(ring.push_exclusive(3).unwrap_err().into_inner(), 3);
        }

        assert_eq!(ring.pop_shared(), Some(1));
        ring.push_shared(3).unwrap();
    }

    #[test]
    fn recycled_slots_wrap() {
        let ring = SeqRing::<u64>::new(2);

        for lap in 0..50 {
            ring.push_shared(lap).unwrap();
            assert_eq!(ring.pop_shared(), Some(lap));
        }
    }

    #[test]
    fn drop_skips_consumed_slots() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        let drops = Arc::new(AtomicUsize::new(0));

        struct DropCounter(Arc<AtomicUsize>);
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let ring = SeqRing::<DropCounter>::new(4);
        ring.push_shared(DropCounter(Arc::clone(&drops))).unwrap();
        ring.push_shared(DropCounter(Arc::clone(&drops))).unwrap();
        drop(ring.pop_shared());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(ring);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }
}
