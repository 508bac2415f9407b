//! Blocking queue halves.
//!
//! A statically composed decorator: each half pairs a factory-selected
//! queue handle with a shared [`TakeStrategy`]/[`PutStrategy`] pair. The
//! compiler monomorphizes the composition per strategy choice, so there is
//! no dispatch overhead on the hot path — the non-blocking `offer`/`poll`
//! remain direct calls with a signal bolted on.
//!
//! Neither `put` nor `take` accepts a deadline; a caller wanting a timeout
//! must race the wait against an external timer.
//!
//! # Example
//!
//! ```
//! use flux_queue::factory;
//! use flux_queue::spec::QueueSpec;
//! use std::thread;
//!
//! let (mut tx, mut rx) =
//!     factory::create_blocking::<u64>(&QueueSpec::bounded_mpsc(8)).unwrap();
//!
//! let consumer = thread::spawn(move || rx.take());
//!
//! tx.put(42);
//! assert_eq!(consumer.join().unwrap(), 42);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::Full;
use crate::factory;
use crate::wait::{PutStrategy, TakeStrategy};

/// The producing half of a blocking queue.
///
/// Wraps a non-blocking producer; `put` suspends the calling thread (via
/// the put strategy's backoff) instead of failing when the queue is full.
pub struct BlockingProducer<T, TS, PS> {
    inner: factory::Producer<T>,
    take: Arc<TS>,
    put: Arc<PS>,
}

impl<T, TS, PS> BlockingProducer<T, TS, PS>
where
    TS: TakeStrategy,
    PS: PutStrategy,
{
    pub(crate) fn new(inner: factory::Producer<T>, take: Arc<TS>, put: Arc<PS>) -> Self {
        Self { inner, take, put }
    }

    /// Inserts `value`, retrying with the put strategy's backoff until the
    /// queue has room.
    ///
    /// Signals the take strategy after the element is published so a
    /// parked consumer wakes and observes it.
    pub fn put(&mut self, value: T) {
        let mut value = value;
        loop {
            match self.inner.offer(value) {
                Ok(()) => {
                    self.take.signal();
                    return;
                }
                Err(Full(rejected)) => {
                    value = rejected;
                    self.put.backoff();
                }
            }
        }
    }

    /// Attempts a non-blocking insert, signaling a parked consumer on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the queue was observed full.
    pub fn offer(&mut self, value: T) -> Result<(), Full<T>> {
        self.inner.offer(value)?;
        self.take.signal();
        Ok(())
    }

    /// Returns another handle to the same queue, or `None` if the backing
    /// supports only one producer.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        self.inner.try_clone().map(|inner| Self {
            inner,
            take: Arc::clone(&self.take),
            put: Arc::clone(&self.put),
        })
    }

    /// Returns the queue capacity, or `None` for unbounded backings.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity()
    }
}

impl<T, TS, PS> fmt::Debug for BlockingProducer<T, TS, PS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingProducer")
            .field("capacity", &self.inner.capacity())
            .finish_non_exhaustive()
    }
}

/// The consuming half of a blocking queue.
///
/// Wraps a non-blocking consumer; `take` parks the calling thread (via the
/// take strategy) instead of returning empty.
pub struct BlockingConsumer<T, TS, PS> {
    inner: factory::Consumer<T>,
    take: Arc<TS>,
    put: Arc<PS>,
}

impl<T, TS, PS> BlockingConsumer<T, TS, PS>
where
    TS: TakeStrategy,
    PS: PutStrategy,
{
    pub(crate) fn new(inner: factory::Consumer<T>, take: Arc<TS>, put: Arc<PS>) -> Self {
        Self { inner, take, put }
    }

    /// Removes and returns the element at the front of the queue, parking
    /// until one is available.
    ///
    /// Re-polls on every wake; spurious wakeups are expected and harmless.
    /// Signals the put strategy afterwards so a backing-off producer gets
    /// its slot.
    pub fn take(&mut self) -> T {
        let inner = &mut self.inner;
        let value = self.take.wait_for(|| inner.poll());
        self.put.signal();
        value
    }

    /// Attempts a non-blocking removal, signaling the put strategy on
    /// success.
    pub fn poll(&mut self) -> Option<T> {
        let value = self.inner.poll();
        if value.is_some() {
            self.put.signal();
        }
        value
    }

    /// Returns another handle to the same queue, or `None` if the backing
    /// supports only one consumer.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        self.inner.try_clone().map(|inner| Self {
            inner,
            take: Arc::clone(&self.take),
            put: Arc::clone(&self.put),
        })
    }

    /// Returns the queue capacity, or `None` for unbounded backings.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity()
    }

    /// Returns the number of queued elements (best-effort).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the queue was observed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T, TS, PS> fmt::Debug for BlockingConsumer<T, TS, PS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingConsumer")
            .field("capacity", &self.inner.capacity())
            .finish_non_exhaustive()
    }
}
