//! End-to-end tests driving every spec shape through the factory.

use std::thread;

use flux_queue::error::ConfigError;
use flux_queue::factory;
use flux_queue::spec::QueueSpec;
use flux_queue::wait::{ScParkTakeStrategy, YieldPutStrategy};

#[test]
fn bounded_spsc_end_to_end() {
    let (mut tx, mut rx) = factory::create::<u32>(&QueueSpec::bounded_spsc(4));

    for i in 1..=4 {
        tx.offer(i).unwrap();
    }
    assert_eq!(tx.offer(5).unwrap_err().into_inner(), 5);

    for i in 1..=4 {
        assert_eq!(rx.poll(), Some(i));
    }
    assert_eq!(rx.poll(), None);

    tx.offer(5).unwrap();
    assert_eq!(rx.poll(), Some(5));
}

#[test]
fn mpsc_stress_preserves_per_producer_order() {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 10_000;

    let (tx, mut rx) = factory::create::<u64>(&QueueSpec::bounded_mpsc(64));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let mut tx = tx.try_clone().unwrap();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let value = producer * PER_PRODUCER + i;
                    while tx.offer(value).is_err() {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();
    drop(tx);

    let mut last_seen = [None::<u64>; PRODUCERS as usize];
    let mut received = 0;
    while received < PRODUCERS * PER_PRODUCER {
        if let Some(value) = rx.poll() {
            let producer = (value / PER_PRODUCER) as usize;
            let seq = value % PER_PRODUCER;
            if let Some(prev) = last_seen[producer] {
                assert!(seq > prev, "producer {producer} reordered");
            }
            last_seen[producer] = Some(seq);
            received += 1;
        }
    }
    assert_eq!(rx.poll(), None);

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn spmc_stress_splits_without_loss() {
    const TOTAL: u64 = 40_000;
    const CONSUMERS: usize = 4;

    let (mut tx, rx) = factory::create::<u64>(&QueueSpec::bounded_spmc(64));

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let mut rx = rx.try_clone().unwrap();
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
    for _ in 0..CONSUMERS {
        while tx.offer(u64::MAX).is_err() {
            std::hint::spin_loop();
        }
    }

    let mut all: Vec<u64> = consumers
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..TOTAL).collect::<Vec<u64>>());
}

#[test]
fn mpmc_stress_balances_offers_and_polls() {
    const PRODUCERS: u64 = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: u64 = 10_000;

    let (tx, rx) = factory::create::<u64>(&QueueSpec::bounded_mpmc(128));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let mut tx = tx.try_clone().unwrap();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let value = producer * PER_PRODUCER + i;
                    while tx.offer(value).is_err() {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let mut rx = rx.try_clone().unwrap();
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

    for handle in producers {
        handle.join().unwrap();
    }
    let mut tx = tx;
    for _ in 0..CONSUMERS {
        while tx.offer(u64::MAX).is_err() {
            std::hint::spin_loop();
        }
    }

    let mut all: Vec<u64> = consumers
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<u64>>());
}

#[test]
fn relaxed_mpsc_stress_keeps_the_multiset() {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 10_000;

    let (tx, mut rx) = factory::create::<u64>(&QueueSpec::relaxed_mpsc(256));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let mut tx = tx.try_clone().unwrap();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let value = producer * PER_PRODUCER + i;
                    while tx.offer(value).is_err() {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();
    drop(tx);

    let mut received = Vec::new();
    while received.len() < (PRODUCERS * PER_PRODUCER) as usize {
        if let Some(value) = rx.poll() {
            received.push(value);
        }
    }
    assert_eq!(rx.poll(), None);

    for handle in handles {
        handle.join().unwrap();
    }

    received.sort_unstable();
    assert_eq!(received, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<u64>>());
}

#[test]
fn unbounded_mpsc_never_rejects() {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 10_000;

    let (tx, mut rx) = factory::create::<u64>(&QueueSpec::unbounded_mpsc());

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let mut tx = tx.try_clone().unwrap();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    tx.offer(producer * PER_PRODUCER + i).unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    for handle in handles {
        handle.join().unwrap();
    }

    let mut received: Vec<u64> = std::iter::from_fn(|| rx.poll()).collect();
    received.sort_unstable();
    assert_eq!(received, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<u64>>());
}

#[test]
fn blocking_handoff_loses_nothing() {
    const TOTAL: u64 = 20_000;

    let (mut tx, mut rx) =
        factory::create_blocking::<u64>(&QueueSpec::bounded_mpsc(16)).unwrap();

    let consumer = thread::spawn(move || {
        let mut sum = 0u64;
        for _ in 0..TOTAL {
            sum += rx.take();
        }
        sum
    });

    for i in 0..TOTAL {
        tx.put(i);
    }

    assert_eq!(consumer.join().unwrap(), (0..TOTAL).sum());
}

#[test]
fn incompatible_strategy_fails_at_construction() {
    let err = factory::create_blocking_with::<u64, _, _>(
        &QueueSpec::bounded_spmc(8),
        ScParkTakeStrategy::new(),
        YieldPutStrategy::new(),
    )
    .map(|_| ())
    .unwrap_err();

    assert_eq!(err, ConfigError::IncompatibleTakeStrategy);
    assert_eq!(
        err.to_string(),
        "take strategy is not compatible with the queue spec"
    );
}
