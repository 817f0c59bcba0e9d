//! Typed handles for scheduler objects.
//!
//! Handles wrap generation-checked arena indices, so a handle outliving its
//! object stops resolving instead of aliasing a reused slot. Each object
//! class gets its own type; mixing them up is a compile error.

use crate::util::ArenaIndex;
use core::fmt;

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) ArenaIndex);

        impl $name {
            pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
                Self(index)
            }

            pub(crate) const fn arena_index(self) -> ArenaIndex {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($name), "({}:{})"),
                    self.0.index(),
                    self.0.generation()
                )
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0.index())
            }
        }
    };
}

handle_type!(
    /// Handle to an execution context (thread) in the kernel's registry.
    ThreadId,
    "T"
);

handle_type!(
    /// Handle to a counting semaphore.
    SemaId,
    "S"
);

handle_type!(
    /// Handle to a lock.
    LockId,
    "L"
);

handle_type!(
    /// Handle to a condition variable.
    CondId,
    "C"
);
