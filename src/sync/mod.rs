//! Synchronization primitives: semaphore, lock, condition variable.
//!
//! All three are registered objects inside the [`Kernel`](crate::Kernel)
//! and are operated on through it, because every operation may reschedule:
//! a down can block the caller, an up can wake a higher-priority waiter and
//! yield to it, and lock traffic drives the donation engine.
//!
//! The wait list of every primitive is kept priority-ordered at enqueue and
//! re-sorted immediately before a wake picks a waiter: donations may have
//! changed priorities while a thread sat queued, and the wake must go to
//! the waiter that is highest *now*.

mod condvar;
mod lock;
mod semaphore;

pub use condvar::Condvar;
pub use lock::Lock;
pub use semaphore::Semaphore;
