//! Error types.
//!
//! Only recoverable conditions get error values; violated internal
//! contracts (blocking in interrupt context, releasing a lock the caller
//! does not hold, stale or corrupted handles) panic with a diagnostic
//! instead, because they indicate a broken invariant nothing can safely
//! unwind from.

use core::fmt;

/// Error returned when a thread cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// The thread registry is at its configured capacity.
    Exhausted,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "thread registry exhausted"),
        }
    }
}

impl std::error::Error for SpawnError {}
