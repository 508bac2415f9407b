//! # flux-queue
//!
//! High-throughput inter-thread queues selected by contention profile
//! rather than by naming a concrete implementation.
//!
//! Describe what you need — producer/consumer arity, boundedness, ordering
//! strictness — as a [`spec::QueueSpec`] and let [`factory::create`] pick
//! the cheapest algorithm that satisfies it. Every variant moves elements
//! with the minimum synchronization its parameter set allows, preserves
//! FIFO order where promised, never loses or duplicates elements, and
//! fails immediately instead of blocking unless a blocking wrapper is
//! explicitly requested.
//!
//! ## Queue families
//!
//! - [`spsc`]: wait-free bounded ring and unbounded linked queue
//! - [`mpsc`]: lock-free bounded ring, unbounded linked queue, and a
//!   sharded compound queue that trades cross-producer order for
//!   scalability
//! - [`spmc`], [`mpmc`]: bounded rings with per-slot sequence numbers
//! - [`blocking`] + [`wait`]: park/signal decoration for any of the above
//!
//! The concrete modules are also usable directly when the shape is known
//! at compile time; the factory exists for callers who want to express
//! requirements declaratively.
//!
//! ## Example
//!
//! ```
//! use flux_queue::factory;
//! use flux_queue::spec::QueueSpec;
//!
//! // One producer, one consumer, room for four in-flight elements.
//! let (mut tx, mut rx) = factory::create::<u64>(&QueueSpec::bounded_spsc(4));
//!
//! for i in 1..=4 {
//!     tx.offer(i).unwrap();
//! }
//! assert!(tx.offer(5).is_err());
//!
//! assert_eq!(rx.poll(), Some(1));
//! assert!(tx.offer(5).is_ok());
//! ```
//!
//! ## Design Notes
//!
//! - Capacities round up to the next power of two so index wrapping is a
//!   bitwise mask.
//! - Cursors live on their own cache lines to prevent false sharing.
//! - Arity preconditions are enforced by ownership: exclusive handles are
//!   not cloneable and operate through `&mut self`, so there is nothing to
//!   check at runtime.
//! - `offer`/`poll` never block; only [`blocking`] `put`/`take` may
//!   suspend the calling thread.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod blocking;
pub mod error;
pub mod factory;
pub mod mpmc;
pub mod mpsc;
mod ring;
pub mod spec;
pub mod spmc;
pub mod spsc;
pub mod wait;

pub use error::{ConfigError, Full};
pub use spec::QueueSpec;
