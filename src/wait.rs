//! Blocking wait strategies.
//!
//! A [`TakeStrategy`] turns a non-blocking `poll` into a blocking take by
//! parking the consumer until the producer side signals; a [`PutStrategy`]
//! does the mirror job for `offer` on a bounded queue. Strategies are
//! independent of any concrete queue: the blocking wrapper feeds them a
//! poll closure and invokes `signal` from the opposite end after every
//! successful operation.
//!
//! Each strategy declares which specs it supports; the factory rejects an
//! incompatible pairing at construction time (see
//! [`crate::factory::create_blocking_with`]).

use std::sync::atomic::{fence, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, Thread};

use crossbeam_utils::atomic::AtomicCell;

use crate::spec::{Arity, QueueSpec};

/// Parks a consumer until an element is available.
///
/// `signal` is invoked by the producer side after every successful offer;
/// `wait_for` re-polls on every wake because spurious wakeups are expected.
pub trait TakeStrategy: Send + Sync {
    /// Returns `true` if this strategy is sound for the given spec.
    fn supports_spec(&self, spec: &QueueSpec) -> bool;

    /// Wakes a waiting consumer, if any.
    ///
    /// Called after the element is published; implementations order the
    /// publish before the wake so the woken thread observes it.
    fn signal(&self);

    /// Polls until an element is available, parking between attempts.
    fn wait_for<T>(&self, poll: impl FnMut() -> Option<T>) -> T;
}

/// Retries a rejected offer until a bounded queue has room.
pub trait PutStrategy: Send + Sync {
    /// Returns `true` if this strategy is sound for the given spec.
    fn supports_spec(&self, spec: &QueueSpec) -> bool;

    /// Invoked between failed offer attempts.
    fn backoff(&self);

    /// Invoked by the consumer side after every successful poll.
    fn signal(&self);
}

/// Park-based take strategy for a single consumer.
///
/// Holds the identity of at most one waiting thread. Cheaper than
/// [`McParkTakeStrategy`] because waking is a single unpark with no lock.
#[derive(Default)]
pub struct ScParkTakeStrategy {
    waiter: AtomicCell<Option<Thread>>,
}

impl ScParkTakeStrategy {
    /// Creates the strategy with no registered waiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TakeStrategy for ScParkTakeStrategy {
    fn supports_spec(&self, spec: &QueueSpec) -> bool {
        spec.consumers == Arity::One
    }

    fn signal(&self) {
        // The publish must be visible before the waiter resumes.
        fence(Ordering::SeqCst);
        if let Some(waiter) = self.waiter.take() {
            waiter.unpark();
        }
    }

    fn wait_for<T>(&self, mut poll: impl FnMut() -> Option<T>) -> T {
        if let Some(value) = poll() {
            return value;
        }

        loop {
            // Register before the re-poll: an offer that lands in between
            // will find us and unpark, so the park below cannot be lost.
            self.waiter.store(Some(thread::current()));
            if let Some(value) = poll() {
                self.waiter.take();
                return value;
            }
            thread::park();
        }
    }
}

/// Park-based take strategy for any number of consumers.
///
/// Uses a mutex-guarded waiter count and a condition variable, leaving
/// arbitration among waiting consumers to the OS scheduler. The lock sits
/// on the blocking path only; non-blocking polls never touch it.
#[derive(Default)]
pub struct McParkTakeStrategy {
    waiters: Mutex<usize>,
    cond: Condvar,
}

impl McParkTakeStrategy {
    /// Creates the strategy with no registered waiters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TakeStrategy for McParkTakeStrategy {
    fn supports_spec(&self, _spec: &QueueSpec) -> bool {
        true
    }

    fn signal(&self) {
        fence(Ordering::SeqCst);
        let waiters = self.lock();
        if *waiters > 0 {
            self.cond.notify_one();
        }
    }

    fn wait_for<T>(&self, mut poll: impl FnMut() -> Option<T>) -> T {
        if let Some(value) = poll() {
            return value;
        }

        let mut waiters = self.lock();
        *waiters += 1;
        loop {
            if let Some(value) = poll() {
                *waiters -= 1;
                return value;
            }
            waiters = self
                .cond
                .wait(waiters)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Spec-driven choice between the two park strategies.
///
/// The default take strategy used by [`crate::factory::create_blocking`]:
/// single-consumer specs get the unpark-based strategy, multi-consumer
/// specs the condvar-based one.
pub enum ParkTakeStrategy {
    /// Single-consumer parking.
    SingleConsumer(ScParkTakeStrategy),
    /// Multi-consumer parking.
    MultiConsumer(McParkTakeStrategy),
}

impl ParkTakeStrategy {
    /// Picks the variant matching the spec's consumer arity.
    #[must_use]
    pub fn for_spec(spec: &QueueSpec) -> Self {
        match spec.consumers {
            Arity::One => Self::SingleConsumer(ScParkTakeStrategy::new()),
            Arity::Many => Self::MultiConsumer(McParkTakeStrategy::new()),
        }
    }
}

impl TakeStrategy for ParkTakeStrategy {
    fn supports_spec(&self, spec: &QueueSpec) -> bool {
        match self {
            Self::SingleConsumer(inner) => inner.supports_spec(spec),
            Self::MultiConsumer(inner) => inner.supports_spec(spec),
        }
    }

    fn signal(&self) {
        match self {
            Self::SingleConsumer(inner) => inner.signal(),
            Self::MultiConsumer(inner) => inner.signal(),
        }
    }

    fn wait_for<T>(&self, poll: impl FnMut() -> Option<T>) -> T {
        match self {
            Self::SingleConsumer(inner) => inner.wait_for(poll),
            Self::MultiConsumer(inner) => inner.wait_for(poll),
        }
    }
}

/// Put strategy that retries with a cooperative yield instead of parking.
///
/// Producers are assumed few relative to how quickly a consumer drains, so
/// yielding the time slice is cheaper than a park/unpark round trip.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldPutStrategy;

impl YieldPutStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PutStrategy for YieldPutStrategy {
    fn supports_spec(&self, _spec: &QueueSpec) -> bool {
        true
    }

    fn backoff(&self) {
        thread::yield_now();
    }

    fn signal(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_queue::SegQueue;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn sc_strategy_rejects_multi_consumer_specs() {
        let strategy = ScParkTakeStrategy::new();
        assert!(strategy.supports_spec(&QueueSpec::bounded_mpsc(8)));
        assert!(!strategy.supports_spec(&QueueSpec::bounded_mpmc(8)));
    }

    #[test]
    fn mc_strategy_supports_everything() {
        let strategy = McParkTakeStrategy::new();
        assert!(strategy.supports_spec(&QueueSpec::bounded_spsc(8)));
        assert!(strategy.supports_spec(&QueueSpec::bounded_mpmc(8)));
    }

    #[test]
    fn for_spec_picks_by_consumer_arity() {
        assert!(matches!(
            ParkTakeStrategy::for_spec(&QueueSpec::bounded_mpsc(8)),
            ParkTakeStrategy::SingleConsumer(_)
        ));
        assert!(matches!(
            ParkTakeStrategy::for_spec(&QueueSpec::bounded_mpmc(8)),
            ParkTakeStrategy::MultiConsumer(_)
        ));
    }

    #[test]
    fn sc_wait_for_wakes_on_signal() {
        let strategy = Arc::new(ScParkTakeStrategy::new());
        let queue = Arc::new(SegQueue::new());

        let waiter = {
            let strategy = Arc::clone(&strategy);
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || strategy.wait_for(|| queue.pop()))
        };

        std::thread::sleep(Duration::from_millis(50));
        queue.push(7u64);
        strategy.signal();

        assert_eq!(waiter.join().unwrap(), 7);
    }

    #[test]
    fn mc_wait_for_wakes_on_signal() {
        let strategy = Arc::new(McParkTakeStrategy::new());
        let queue = Arc::new(SegQueue::new());

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let strategy = Arc::clone(&strategy);
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || strategy.wait_for(|| queue.pop()))
            })
            .collect();

        std::thread::sleep(Duration::from_millis(50));
        for value in [1u64, 2] {
            queue.push(value);
            strategy.signal();
        }

        let mut got: Vec<u64> = waiters
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        got.sort_unstable();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn wait_for_returns_immediately_when_available() {
        let strategy = ScParkTakeStrategy::new();
        assert_eq!(strategy.wait_for(|| Some(3)), 3);
    }
}
