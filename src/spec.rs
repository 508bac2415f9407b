//! Declarative queue requirements.
//!
//! A [`QueueSpec`] describes the contention profile a caller needs — how
//! many threads produce, how many consume, whether the queue is bounded,
//! and how strict the delivery order must be. The factory maps a spec to
//! the cheapest algorithm that satisfies it; see [`crate::factory`].
//!
//! # Example
//!
//! ```
//! use flux_queue::spec::{Arity, Ordering, QueueSpec};
//!
//! let spec = QueueSpec::bounded_mpsc(1024);
//! assert_eq!(spec.producers, Arity::Many);
//! assert_eq!(spec.consumers, Arity::One);
//! assert_eq!(spec.ordering, Ordering::Fifo);
//! assert!(spec.is_bounded());
//! ```

use std::num::NonZeroUsize;

/// Number of threads acting on one side of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly one thread.
    One,
    /// Any number of threads.
    Many,
}

/// How strictly delivery order must follow offer order.
///
/// Only meaningful for multi-producer queues: with a single producer every
/// variant is FIFO anyway, and the factory ignores the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ordering {
    /// Each producer's elements are delivered in its offer order.
    Fifo,
    /// No ordering guarantee across producers; buys reduced contention.
    Relaxed,
}

/// Immutable description of the queue a caller needs.
///
/// Constructed once and handed to [`crate::factory::create`] or
/// [`crate::factory::create_blocking`]; never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueSpec {
    /// How many threads offer into the queue.
    pub producers: Arity,
    /// How many threads poll from the queue.
    pub consumers: Arity,
    /// Requested capacity; `None` means unbounded.
    ///
    /// Bounded queues round this up to the next power of two (minimum 2).
    pub capacity: Option<NonZeroUsize>,
    /// Required delivery order.
    pub ordering: Ordering,
}

impl QueueSpec {
    /// Creates a spec from its four structural parameters.
    #[must_use]
    pub const fn new(
        producers: Arity,
        consumers: Arity,
        capacity: Option<NonZeroUsize>,
        ordering: Ordering,
    ) -> Self {
        Self {
            producers,
            consumers,
            capacity,
            ordering,
        }
    }

    /// Bounded single-producer single-consumer spec.
    #[must_use]
    pub fn bounded_spsc(capacity: usize) -> Self {
        Self::new(Arity::One, Arity::One, bounded(capacity), Ordering::Fifo)
    }

    /// Bounded multi-producer single-consumer spec with FIFO ordering.
    #[must_use]
    pub fn bounded_mpsc(capacity: usize) -> Self {
        Self::new(Arity::Many, Arity::One, bounded(capacity), Ordering::Fifo)
    }

    /// Bounded multi-producer single-consumer spec with relaxed ordering.
    ///
    /// Routes to the sharded compound queue, trading cross-producer order
    /// for a contention-free producer side.
    #[must_use]
    pub fn relaxed_mpsc(capacity: usize) -> Self {
        Self::new(Arity::Many, Arity::One, bounded(capacity), Ordering::Relaxed)
    }

    /// Bounded single-producer multi-consumer spec.
    #[must_use]
    pub fn bounded_spmc(capacity: usize) -> Self {
        Self::new(Arity::One, Arity::Many, bounded(capacity), Ordering::Fifo)
    }

    /// Bounded multi-producer multi-consumer spec.
    #[must_use]
    pub fn bounded_mpmc(capacity: usize) -> Self {
        Self::new(Arity::Many, Arity::Many, bounded(capacity), Ordering::Fifo)
    }

    /// Unbounded single-producer single-consumer spec.
    #[must_use]
    pub const fn unbounded_spsc() -> Self {
        Self::new(Arity::One, Arity::One, None, Ordering::Fifo)
    }

    /// Unbounded multi-producer single-consumer spec.
    #[must_use]
    pub const fn unbounded_mpsc() -> Self {
        Self::new(Arity::Many, Arity::One, None, Ordering::Fifo)
    }

    /// Unbounded multi-producer multi-consumer spec.
    #[must_use]
    pub const fn unbounded_mpmc() -> Self {
        Self::new(Arity::Many, Arity::Many, None, Ordering::Fifo)
    }

    /// Returns `true` if the spec names a capacity.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.capacity.is_some()
    }

    /// Returns `true` for one producer and one consumer.
    #[must_use]
    pub fn is_spsc(&self) -> bool {
        self.producers == Arity::One && self.consumers == Arity::One
    }

    /// Returns `true` for many producers and one consumer.
    #[must_use]
    pub fn is_mpsc(&self) -> bool {
        self.producers == Arity::Many && self.consumers == Arity::One
    }

    /// Returns `true` for one producer and many consumers.
    #[must_use]
    pub fn is_spmc(&self) -> bool {
        self.producers == Arity::One && self.consumers == Arity::Many
    }

    /// Returns `true` for many producers and many consumers.
    #[must_use]
    pub fn is_mpmc(&self) -> bool {
        self.producers == Arity::Many && self.consumers == Arity::Many
    }
}

fn bounded(capacity: usize) -> Option<NonZeroUsize> {
    Some(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_predicates() {
        assert!(QueueSpec::bounded_spsc(8).is_spsc());
        assert!(QueueSpec::bounded_mpsc(8).is_mpsc());
        assert!(QueueSpec::bounded_spmc(8).is_spmc());
        assert!(QueueSpec::bounded_mpmc(8).is_mpmc());
        assert!(!QueueSpec::bounded_mpsc(8).is_spsc());
    }

    #[test]
    fn boundedness() {
        assert!(QueueSpec::bounded_spsc(8).is_bounded());
        assert!(!QueueSpec::unbounded_mpsc().is_bounded());
        assert_eq!(QueueSpec::unbounded_spsc().capacity, None);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let spec = QueueSpec::bounded_spsc(0);
        assert_eq!(spec.capacity.map(NonZeroUsize::get), Some(1));
    }

    #[test]
    fn relaxed_only_differs_in_ordering() {
        let fifo = QueueSpec::bounded_mpsc(64);
        let relaxed = QueueSpec::relaxed_mpsc(64);
        assert_eq!(fifo.producers, relaxed.producers);
        assert_eq!(fifo.consumers, relaxed.consumers);
        assert_eq!(fifo.capacity, relaxed.capacity);
        assert_ne!(fifo.ordering, relaxed.ordering);
    }
}
