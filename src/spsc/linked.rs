//! Unbounded single-producer single-consumer linked queue.
//!
//! A singly linked chain of heap nodes behind a stub-node discipline: the
//! chain always holds at least one node, `head` names the stub, and payload
//! lives strictly after it. With one writer per reference, a release store
//! links a node and an acquire load observes it; there is no
//! compare-and-swap and polling never races on the terminal pointer.
//!
//! # Example
//!
//! ```
//! use flux_queue::spsc::linked;
//!
//! let (mut tx, mut rx) = linked::unbounded::<u64>();
//!
//! tx.offer(1);
//! tx.offer(2);
//!
//! assert_eq!(rx.poll(), Some(1));
//! assert_eq!(rx.poll(), Some(2));
//! assert_eq!(rx.poll(), None);
//! ```

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

/// Creates an unbounded SPSC queue.
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

impl<T> Node<T> {
    fn boxed(value: T) -> *mut Self {
        Box::into_raw(Box::new(Self {
            next: AtomicPtr::new(ptr::null_mut()),
            value: MaybeUninit::new(value),
        }))
    }
}

/// Shared chain anchors.
///
/// `head` always points at the stub whose value has already been moved
/// out (or was never present); live elements sit in the nodes after it.
struct Chain<T> {
    /// Consumer-owned.
    head: CachePadded<AtomicPtr<Node<T>>>,
    /// Producer-owned.
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

/// The producing half of an unbounded SPSC queue.
///
/// Cannot be cloned; offers take `&mut self`.
pub struct Producer<T> {
    chain: Arc<Chain<T>>,
}

impl<T> Producer<T> {
    /// Inserts `value` at the back of the queue.
    ///
    /// Always succeeds; the queue grows by one heap node.
    pub fn offer(&mut self, value: T) {
        let node = Node::boxed(value);
        let prev = self.chain.tail.load(Ordering::Relaxed);
        // Link first, then advance the producer-private tail.
        unsafe {
            (*prev).next.store(node, Ordering::Release);
        }
        self.chain.tail.store(node, Ordering::Relaxed);
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}

/// The consuming half of an unbounded SPSC queue.
///
/// Cannot be cloned; polls take `&mut self`.
pub struct Consumer<T> {
    chain: Arc<Chain<T>>,
}

impl<T> Consumer<T> {
    /// Removes and returns the element at the front of the queue.
    ///
    /// Returns `None` if no element was linked at the time of the call.
    pub fn poll(&mut self) -> Option<T> {
        let head = self.chain.head.load(Ordering::Relaxed);
        let next = unsafe { (*head).next.load(Ordering::Acquire) };
        if next.is_null() {
            return None;
        }

        // `next` becomes the new stub; its value moves out and the old
        // stub is the only node the chain no longer references.
        let value = unsafe { (*next).value.assume_init_read() };
        self.chain.head.store(next, Ordering::Relaxed);
        drop(unsafe { Box::from_raw(head) });
        Some(value)
    }

    /// Returns the number of queued elements by walking the chain.
    ///
    /// Best-effort: producers may append while we count.
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
        unsafe { (*head).next.load(Ordering::Acquire).is_null() }
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("is_empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_offer_poll() {
        let (mut tx, mut rx) = unbounded::<u64>();

        assert_eq!(rx.poll(), None);
        tx.offer(1);
        tx.offer(2);
        tx.offer(3);

        assert_eq!(rx.len(), 3);
        assert_eq!(rx.poll(), Some(1));
        assert_eq!(rx.poll(), Some(2));
        assert_eq!(rx.poll(), Some(3));
        assert_eq!(rx.poll(), None);
        assert!(rx.is_empty());
    }

    #[test]
    fn grows_past_any_fixed_capacity() {
        let (mut tx, mut rx) = unbounded::<u64>();

        for i in 0..10_000 {
            tx.offer(i);
        }
        for i in 0..10_000 {
            assert_eq!(rx.poll(), Some(i));
        }
    }

    #[test]
    fn cross_thread_fifo() {
        use std::thread;

        let (mut tx, mut rx) = unbounded::<u64>();

        let handle = thread::spawn(move || {
            for i in 0..100_000u64 {
                tx.offer(i);
            }
        });

        let mut expected = 0u64;
        while expected < 100_000 {
            if let Some(value) = rx.poll() {
                assert_eq!(value, expected);
                expected += 1;
            }
        }

        handle.join().unwrap();
    }

    #[test]
    fn drops_undrained_elements() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let drops = Arc::new(AtomicUsize::new(0));

        struct DropCounter(Arc<AtomicUsize>);
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let (mut tx, mut rx) = unbounded::<DropCounter>();
        tx.offer(DropCounter(Arc::clone(&drops)));
        tx.offer(DropCounter(Arc::clone(&drops)));
        tx.offer(DropCounter(Arc::clone(&drops)));

        drop(rx.poll());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(tx);
        drop(rx);
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }
}
