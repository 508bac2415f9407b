//! Spec-driven queue selection.
//!
//! [`create`] is a pure function from a [`QueueSpec`] to the cheapest
//! queue that satisfies it — no side effects, no hidden state, fully
//! deterministic. Selection order: boundedness first, then producer
//! arity, then consumer arity, then ordering (which only matters for the
//! bounded multi-producer single-consumer case, where relaxed ordering
//! routes to the sharded compound queue).
//!
//! [`create_blocking`] composes the selected queue with a take/put wait
//! strategy pair after validating the strategies against the spec.
//!
//! # Example
//!
//! ```
//! use flux_queue::factory;
//! use flux_queue::spec::QueueSpec;
//!
//! let (mut tx, mut rx) = factory::create::<u32>(&QueueSpec::bounded_spsc(4));
//!
//! for i in 1..=4 {
//!     tx.offer(i).unwrap();
//! }
//! assert!(tx.offer(5).is_err());
//!
//! assert_eq!(rx.poll(), Some(1));
//! assert!(tx.offer(5).is_ok());
//! ```

use std::fmt;
use std::sync::Arc;

use crossbeam_queue::SegQueue;

use crate::blocking::{BlockingConsumer, BlockingProducer};
use crate::error::{ConfigError, Full};
use crate::spec::{Ordering, QueueSpec};
use crate::wait::{ParkTakeStrategy, PutStrategy, TakeStrategy, YieldPutStrategy};
use crate::{mpmc, mpsc, spmc, spsc};

/// Builds the cheapest queue satisfying `spec`.
///
/// Bounded specs select among the ring-buffer variants; unbounded specs
/// select the linked queues, falling back to a general unbounded
/// multi-producer multi-consumer queue when no specialized multi-consumer
/// variant exists.
#[must_use]
pub fn create<T>(spec: &QueueSpec) -> (Producer<T>, Consumer<T>) {
    match spec.capacity {
        Some(capacity) => {
            let capacity = capacity.get();
            if spec.is_spsc() {
                let (tx, rx) = spsc::bounded(capacity);
                wrap(ProducerRepr::SpscArray(tx), ConsumerRepr::SpscArray(rx))
            } else if spec.is_mpsc() {
                if spec.ordering == Ordering::Fifo {
                    let (tx, rx) = mpsc::bounded(capacity);
                    wrap(ProducerRepr::MpscArray(tx), ConsumerRepr::MpscArray(rx))
                } else {
                    let (tx, rx) = mpsc::compound::bounded(capacity);
                    wrap(ProducerRepr::Compound(tx), ConsumerRepr::Compound(rx))
                }
            } else if spec.is_spmc() {
                let (tx, rx) = spmc::bounded(capacity);
                wrap(ProducerRepr::SpmcArray(tx), ConsumerRepr::SpmcArray(rx))
            } else {
                let (tx, rx) = mpmc::bounded(capacity);
                wrap(ProducerRepr::MpmcArray(tx), ConsumerRepr::MpmcArray(rx))
            }
        }
        None => {
            if spec.is_spsc() {
                let (tx, rx) = spsc::linked::unbounded();
                wrap(ProducerRepr::SpscLinked(tx), ConsumerRepr::SpscLinked(rx))
            } else if spec.is_mpsc() {
                let (tx, rx) = mpsc::linked::unbounded();
                wrap(ProducerRepr::MpscLinked(tx), ConsumerRepr::MpscLinked(rx))
            } else {
                let queue = Arc::new(SegQueue::new());
                wrap(
                    ProducerRepr::Unbounded(Arc::clone(&queue)),
                    ConsumerRepr::Unbounded(queue),
                )
            }
        }
    }
}

/// Builds a blocking queue from `spec` with the default strategies:
/// a park-based take strategy matching the consumer arity and the
/// yielding put strategy.
///
/// # Errors
///
/// The defaults are compatible with every spec, so this only fails if a
/// future default stops being universal; the signature matches
/// [`create_blocking_with`] for uniformity.
pub fn create_blocking<T>(
    spec: &QueueSpec,
) -> Result<
    (
        BlockingProducer<T, ParkTakeStrategy, YieldPutStrategy>,
        BlockingConsumer<T, ParkTakeStrategy, YieldPutStrategy>,
    ),
    ConfigError,
> {
    create_blocking_with(spec, ParkTakeStrategy::for_spec(spec), YieldPutStrategy::new())
}

/// Builds a blocking queue from `spec` with explicit strategies.
///
/// Both strategies are validated against the spec before any queue is
/// built, so an incompatible pairing can never silently degrade to
/// different semantics than the caller asked for.
///
/// # Errors
///
/// [`ConfigError::IncompatibleTakeStrategy`] or
/// [`ConfigError::IncompatiblePutStrategy`] if the corresponding strategy
/// rejects the spec.
pub fn create_blocking_with<T, TS, PS>(
    spec: &QueueSpec,
    take: TS,
    put: PS,
) -> Result<(BlockingProducer<T, TS, PS>, BlockingConsumer<T, TS, PS>), ConfigError>
where
    TS: TakeStrategy,
    PS: PutStrategy,
{
    if !take.supports_spec(spec) {
        return Err(ConfigError::IncompatibleTakeStrategy);
    }
    if !put.supports_spec(spec) {
        return Err(ConfigError::IncompatiblePutStrategy);
    }

    let (producer, consumer) = create(spec);
    let take = Arc::new(take);
    let put = Arc::new(put);

    Ok((
        BlockingProducer::new(producer, Arc::clone(&take), Arc::clone(&put)),
        BlockingConsumer::new(consumer, take, put),
    ))
}

fn wrap<T>(producer: ProducerRepr<T>, consumer: ConsumerRepr<T>) -> (Producer<T>, Consumer<T>) {
    (Producer(producer), Consumer(consumer))
}

enum ProducerRepr<T> {
    SpscArray(spsc::Producer<T>),
    MpscArray(mpsc::Producer<T>),
    Compound(mpsc::compound::Producer<T>),
    SpmcArray(spmc::Producer<T>),
    MpmcArray(mpmc::Producer<T>),
    SpscLinked(spsc::linked::Producer<T>),
    MpscLinked(mpsc::linked::Producer<T>),
    Unbounded(Arc<SegQueue<T>>),
}

/// The producing half of a factory-selected queue.
///
/// Dispatches to whichever variant the spec selected. Whether additional
/// producers can exist mirrors the spec's producer arity: [`try_clone`]
/// returns `None` for single-producer backings.
///
/// [`try_clone`]: Producer::try_clone
pub struct Producer<T>(ProducerRepr<T>);

impl<T> Producer<T> {
    /// Attempts to insert `value` at the back of the queue.
    ///
    /// Never blocks. Unbounded backings always accept.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if a bounded queue was observed full.
    #[inline]
    pub fn offer(&mut self, value: T) -> Result<(), Full<T>> {
        match &mut self.0 {
            ProducerRepr::SpscArray(tx) => tx.offer(value),
            ProducerRepr::MpscArray(tx) => tx.offer(value),
            ProducerRepr::Compound(tx) => tx.offer(value),
            ProducerRepr::SpmcArray(tx) => tx.offer(value),
            ProducerRepr::MpmcArray(tx) => tx.offer(value),
            ProducerRepr::SpscLinked(tx) => {
                tx.offer(value);
                Ok(())
            }
            ProducerRepr::MpscLinked(tx) => {
                tx.offer(value);
                Ok(())
            }
            ProducerRepr::Unbounded(queue) => {
                queue.push(value);
                Ok(())
            }
        }
    }

    /// Returns another handle to the same queue, or `None` if the backing
    /// supports only one producer.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        match &self.0 {
            ProducerRepr::MpscArray(tx) => Some(Self(ProducerRepr::MpscArray(tx.clone()))),
            ProducerRepr::Compound(tx) => Some(Self(ProducerRepr::Compound(tx.clone()))),
            ProducerRepr::MpmcArray(tx) => Some(Self(ProducerRepr::MpmcArray(tx.clone()))),
            ProducerRepr::MpscLinked(tx) => Some(Self(ProducerRepr::MpscLinked(tx.clone()))),
            ProducerRepr::Unbounded(queue) => {
                Some(Self(ProducerRepr::Unbounded(Arc::clone(queue))))
            }
            ProducerRepr::SpscArray(_)
            | ProducerRepr::SpmcArray(_)
            | ProducerRepr::SpscLinked(_) => None,
        }
    }

    /// Returns the queue capacity, or `None` for unbounded backings.
    ///
    /// Bounded backings may report more than the spec requested because
    /// capacities round up to powers of two.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        match &self.0 {
            ProducerRepr::SpscArray(tx) => Some(tx.capacity()),
            ProducerRepr::MpscArray(tx) => Some(tx.capacity()),
            ProducerRepr::Compound(tx) => Some(tx.capacity()),
            ProducerRepr::SpmcArray(tx) => Some(tx.capacity()),
            ProducerRepr::MpmcArray(tx) => Some(tx.capacity()),
            ProducerRepr::SpscLinked(_)
            | ProducerRepr::MpscLinked(_)
            | ProducerRepr::Unbounded(_) => None,
        }
    }

    /// Returns `true` if a bounded queue was observed full.
    ///
    /// Unbounded backings are never full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        match &self.0 {
            ProducerRepr::SpscArray(tx) => tx.is_full(),
            ProducerRepr::MpscArray(tx) => tx.is_full(),
            ProducerRepr::Compound(tx) => tx.is_full(),
            ProducerRepr::SpmcArray(tx) => tx.is_full(),
            ProducerRepr::MpmcArray(tx) => tx.is_full(),
            ProducerRepr::SpscLinked(_)
            | ProducerRepr::MpscLinked(_)
            | ProducerRepr::Unbounded(_) => false,
        }
    }

    fn variant(&self) -> &'static str {
        match &self.0 {
            ProducerRepr::SpscArray(_) => "SpscArray",
            ProducerRepr::MpscArray(_) => "MpscArray",
            ProducerRepr::Compound(_) => "Compound",
            ProducerRepr::SpmcArray(_) => "SpmcArray",
            ProducerRepr::MpmcArray(_) => "MpmcArray",
            ProducerRepr::SpscLinked(_) => "SpscLinked",
            ProducerRepr::MpscLinked(_) => "MpscLinked",
            ProducerRepr::Unbounded(_) => "Unbounded",
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("variant", &self.variant())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

enum ConsumerRepr<T> {
    SpscArray(spsc::Consumer<T>),
    MpscArray(mpsc::Consumer<T>),
    Compound(mpsc::compound::Consumer<T>),
    SpmcArray(spmc::Consumer<T>),
    MpmcArray(mpmc::Consumer<T>),
    SpscLinked(spsc::linked::Consumer<T>),
    MpscLinked(mpsc::linked::Consumer<T>),
    Unbounded(Arc<SegQueue<T>>),
}

/// The consuming half of a factory-selected queue.
///
/// Dispatches to whichever variant the spec selected. Whether additional
/// consumers can exist mirrors the spec's consumer arity: [`try_clone`]
/// returns `None` for single-consumer backings.
///
/// [`try_clone`]: Consumer::try_clone
pub struct Consumer<T>(ConsumerRepr<T>);

impl<T> Consumer<T> {
    /// Removes and returns the element at the front of the queue.
    ///
    /// Returns `None` if the queue was observed empty. Never blocks.
    #[inline]
    pub fn poll(&mut self) -> Option<T> {
        match &mut self.0 {
            ConsumerRepr::SpscArray(rx) => rx.poll(),
            ConsumerRepr::MpscArray(rx) => rx.poll(),
            ConsumerRepr::Compound(rx) => rx.poll(),
            ConsumerRepr::SpmcArray(rx) => rx.poll(),
            ConsumerRepr::MpmcArray(rx) => rx.poll(),
            ConsumerRepr::SpscLinked(rx) => rx.poll(),
            ConsumerRepr::MpscLinked(rx) => rx.poll(),
            ConsumerRepr::Unbounded(queue) => queue.pop(),
        }
    }

    /// Returns another handle to the same queue, or `None` if the backing
    /// supports only one consumer.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        match &self.0 {
            ConsumerRepr::SpmcArray(rx) => Some(Self(ConsumerRepr::SpmcArray(rx.clone()))),
            ConsumerRepr::MpmcArray(rx) => Some(Self(ConsumerRepr::MpmcArray(rx.clone()))),
            ConsumerRepr::Unbounded(queue) => {
                Some(Self(ConsumerRepr::Unbounded(Arc::clone(queue))))
            }
            ConsumerRepr::SpscArray(_)
            | ConsumerRepr::MpscArray(_)
            | ConsumerRepr::Compound(_)
            | ConsumerRepr::SpscLinked(_)
            | ConsumerRepr::MpscLinked(_) => None,
        }
    }

    /// Returns the queue capacity, or `None` for unbounded backings.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        match &self.0 {
            ConsumerRepr::SpscArray(rx) => Some(rx.capacity()),
            ConsumerRepr::MpscArray(rx) => Some(rx.capacity()),
            ConsumerRepr::Compound(rx) => Some(rx.capacity()),
            ConsumerRepr::SpmcArray(rx) => Some(rx.capacity()),
            ConsumerRepr::MpmcArray(rx) => Some(rx.capacity()),
            ConsumerRepr::SpscLinked(_)
            | ConsumerRepr::MpscLinked(_)
            | ConsumerRepr::Unbounded(_) => None,
        }
    }

    /// Returns the number of queued elements (best-effort).
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.0 {
            ConsumerRepr::SpscArray(rx) => rx.len(),
            ConsumerRepr::MpscArray(rx) => rx.len(),
            ConsumerRepr::Compound(rx) => rx.len(),
            ConsumerRepr::SpmcArray(rx) => rx.len(),
            ConsumerRepr::MpmcArray(rx) => rx.len(),
            ConsumerRepr::SpscLinked(rx) => rx.len(),
            ConsumerRepr::MpscLinked(rx) => rx.len(),
            ConsumerRepr::Unbounded(queue) => queue.len(),
        }
    }

    /// Returns `true` if the queue was observed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            ConsumerRepr::SpscArray(rx) => rx.is_empty(),
            ConsumerRepr::MpscArray(rx) => rx.is_empty(),
            ConsumerRepr::Compound(rx) => rx.is_empty(),
            ConsumerRepr::SpmcArray(rx) => rx.is_empty(),
            ConsumerRepr::MpmcArray(rx) => rx.is_empty(),
            ConsumerRepr::SpscLinked(rx) => rx.is_empty(),
            ConsumerRepr::MpscLinked(rx) => rx.is_empty(),
            ConsumerRepr::Unbounded(queue) => queue.is_empty(),
        }
    }

    fn variant(&self) -> &'static str {
        match &self.0 {
            ConsumerRepr::SpscArray(_) => "SpscArray",
            ConsumerRepr::MpscArray(_) => "MpscArray",
            ConsumerRepr::Compound(_) => "Compound",
            ConsumerRepr::SpmcArray(_) => "SpmcArray",
            ConsumerRepr::MpmcArray(_) => "MpmcArray",
            ConsumerRepr::SpscLinked(_) => "SpscLinked",
            ConsumerRepr::MpscLinked(_) => "MpscLinked",
            ConsumerRepr::Unbounded(_) => "Unbounded",
        }
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("variant", &self.variant())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
