//! Core scheduler types: handles, priorities, ticks.

mod id;

pub use id::{CondId, LockId, SemaId, ThreadId};

/// A scheduling priority. Higher values run first.
pub type Priority = i32;

/// Lowest priority.
pub const PRI_MIN: Priority = 0;

/// Default priority for new threads.
pub const PRI_DEFAULT: Priority = 31;

/// Highest priority.
pub const PRI_MAX: Priority = 63;

/// Lowest niceness (most CPU-greedy) under MLFQS.
pub const NICE_MIN: i32 = -20;

/// Highest niceness (most CPU-yielding) under MLFQS.
pub const NICE_MAX: i32 = 20;

/// A value of the monotonic timer tick counter owned by the embedder.
pub type Tick = u64;
