//! Unbounded multi-producer single-consumer linked queue.
//!
//! Producers extend the chain with an atomic exchange on the shared tail:
//! swap the tail to the new node, then link the predecessor's next
//! reference. Between those two steps the chain is momentarily broken — a
//! consumer that sees a null next while the tail has moved on has caught a
//! producer mid-link and spins briefly for the missing store. Overall FIFO
//! order of linked nodes is preserved; producers never retry, so the
//! producer side is wait-free.
//!
//! # Example
//!
//! ```
//! use flux_queue::mpsc::linked;
//! use std::thread;
//!
//! let (tx, mut rx) = linked::unbounded::<u64>();
//! let tx2 = tx.clone();
//!
//! thread::spawn(move || tx.offer(1)).join().unwrap();
//! thread::spawn(move || tx2.offer(2)).join().unwrap();
//!
//! assert!(rx.poll().is_some());
//! assert!(rx.poll().is_some());
//! assert_eq!(rx.poll(), None);
//! ```

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use crossbeam_utils::{Backoff, CachePadded};

/// Creates an unbounded MPSC queue.
#[must_use]
pub fn unbounded<T>() -> (Producer<T>, Consumer<T>) {
    let chain = Arc::new(Chain::new());

    (
        Producer {
            chain: Arc::clone(&chain),
        },
        Consumer { chain },
    )
}

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    value: MaybeUninit<T>,
}

/// Shared chain anchors; same stub discipline as the SPSC linked queue,
/// but the tail is claimed by exchange.
struct Chain<T> {
    /// Consumer-owned.
    head: CachePadded<AtomicPtr<Node<T>>>,
    /// Swapped by producers.
    tail: CachePadded<AtomicPtr<Node<T>>>,
}

unsafe impl<T: Send> Send for Chain<T> {}
unsafe impl<T: Send> Sync for Chain<T> {}

impl<T> Chain<T> {
    fn new() -> Self {
        let stub = Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value: MaybeUninit::uninit(),
        }));

        Self {
            head: CachePadded::new(AtomicPtr::new(stub)),
            tail: CachePadded::new(AtomicPtr::new(stub)),
        }
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        unsafe {
            let stub = self.head.load(Ordering::Relaxed);
            let mut cur = (*stub).next.load(Ordering::Relaxed);
            drop(Box::from_raw(stub));

            while !cur.is_null() {
                let next = (*cur).next.load(Ordering::Relaxed);
                ptr::drop_in_place((*cur).value.as_mut_ptr());
                drop(Box::from_raw(cur));
                cur = next;
            }
        }
    }
}

/// The producing half of an unbounded MPSC queue.
///
/// Clone it to add producers; all clones share the same chain.
pub struct Producer<T> {
    chain: Arc<Chain<T>>,
}

impl<T> Producer<T> {
    /// Inserts `value` at the back of the queue.
    ///
    /// Always succeeds in a bounded number of steps: one allocation, one
    /// exchange, one store.
    pub fn offer(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value: MaybeUninit::new(value),
        }));

        // The predecessor cannot be freed before we link it: the consumer
        // stops at a null next while the tail has moved past it.
        let prev = self.chain.tail.swap(node, Ordering::AcqRel);
        unsafe {
            (*prev).next.store(node, Ordering::Release);
        }
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}

/// The consuming half of an unbounded MPSC queue.
///
/// Cannot be cloned; polls take `&mut self`.
pub struct Consumer<T> {
    chain: Arc<Chain<T>>,
}

impl<T> Consumer<T> {
    /// Removes and returns the element at the front of the queue.
    ///
    /// Returns `None` only when the queue was observed empty; a node whose
    /// link is still in flight is waited out.
    pub fn poll(&mut self) -> Option<T> {
        let head = self.chain.head.load(Ordering::Relaxed);
        let mut next = unsafe { (*head).next.load(Ordering::Acquire) };

        if next.is_null() {
            if self.chain.tail.load(Ordering::Acquire) == head {
                return None;
            }
            // A producer swapped the tail but hasn't linked yet.
            let backoff = Backoff::new();
            loop {
                next = unsafe { (*head).next.load(Ordering::Acquire) };
                if !next.is_null() {
                    break;
                }
                backoff.snooze();
            }
        }

        let value = unsafe { (*next).value.assume_init_read() };
        self.chain.head.store(next, Ordering::Relaxed);
        drop(unsafe { Box::from_raw(head) });
        Some(value)
    }

    /// Returns the number of queued elements by walking the chain.
    ///
    /// Best-effort: the walk stops at an in-flight link, so the count may
    /// lag the true occupancy.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cur = self.chain.head.load(Ordering::Relaxed);
        loop {
            let next = unsafe { (*cur).next.load(Ordering::Acquire) };
            if next.is_null() {
                return count;
            }
            count += 1;
            cur = next;
        }
    }

    /// Returns `true` if the queue was observed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let head = self.chain.head.load(Ordering::Relaxed);
        self.chain.tail.load(Ordering::Acquire) == head
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("is_empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}
