//! Error types shared across the queue families.

use std::fmt;

/// Error returned by `offer` when a bounded queue is full.
///
/// Carries the rejected element back to the caller so nothing is lost.
/// A full queue is ordinary control flow, not a fault: the caller is
/// expected to retry, drop the element, or apply backpressure.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the element that couldn't be offered.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("queue is full")
    }
}

impl<T> std::error::Error for Full<T> {}

/// Construction-time rejection of an incompatible spec/strategy pairing.
///
/// Surfaced by [`crate::factory::create_blocking_with`] before any queue is
/// built, so a caller can never run with silently different semantics than
/// the strategy choice implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The take strategy does not support the spec's consumer arity.
    IncompatibleTakeStrategy,
    /// The put strategy does not support the spec.
    IncompatiblePutStrategy,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompatibleTakeStrategy => {
                write!(f, "take strategy is not compatible with the queue spec")
            }
            Self::IncompatiblePutStrategy => {
                write!(f, "put strategy is not compatible with the queue spec")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
