//! Quantum: a deterministic priority-scheduling and synchronization core.
//!
//! # Overview
//!
//! Quantum models the thread-scheduling heart of a small kernel as an
//! ordinary, fully deterministic Rust library: a priority-ordered ready
//! queue, a sleep/wake timer queue, semaphore/lock/condition-variable
//! primitives, transitive priority donation to bound priority inversion,
//! and an alternative multi-level-feedback scheduler (MLFQS) driven by
//! 17.14 fixed-point load and CPU-usage accounting.
//!
//! All mutable scheduler state lives in a single [`Kernel`] value. Threads
//! are records in a generation-checked arena, addressed by small copyable
//! handles; queues and wait lists store handles, never records, so there is
//! no aliasing anywhere and the crate forbids `unsafe` entirely. Time is
//! virtual: the embedder owns the tick counter and drives the kernel through
//! [`Kernel::handle_tick`], which makes every schedule reproducible and
//! directly testable.
//!
//! # Core guarantees
//!
//! - **Priority order**: dispatch always selects the highest effective
//!   priority, FIFO within a priority band.
//! - **Donation correctness**: a lock holder runs at the priority of its
//!   highest blocked waiter, transitively across wait-for chains, and the
//!   boost is refunded exactly when the lock is released.
//! - **Earliest wake first**: the sleep queue is kept sorted by wake tick
//!   and drained with a short-circuit pass on every dispatch.
//! - **Single-core atomicity**: exclusive ownership of the [`Kernel`] plus
//!   an explicit interrupt-context flag stand in for the interrupt-disable
//!   discipline of the modelled machine.
//!
//! # Module structure
//!
//! - [`fixed`]: 17.14 signed fixed-point arithmetic
//! - [`types`]: handles, priority and tick types
//! - [`util`]: generation-checked arena
//! - [`record`]: thread control blocks and donation records
//! - [`sched`]: ready and sleep queues
//! - [`sync`]: semaphore, lock, condition variable
//! - [`kernel`]: the scheduler state machine and its collaborator traits
//! - [`trace`]: bounded ring buffer of scheduler events
//! - [`error`]: typed errors
//! - [`test_utils`]: tracing-based test harness helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

pub mod error;
pub mod fixed;
pub mod kernel;
pub mod record;
pub mod sched;
pub mod sync;
pub mod test_utils;
pub mod trace;
pub mod types;
pub mod util;

pub use error::SpawnError;
pub use fixed::Fixed;
pub use kernel::{ContextSwitch, Kernel, KernelConfig, NullSwitch, ProcessHooks};
pub use record::{ThreadEntry, ThreadRecord, ThreadState};
pub use trace::{EventBuffer, SchedEvent};
pub use types::{
    CondId, LockId, Priority, SemaId, ThreadId, Tick, NICE_MAX, NICE_MIN, PRI_DEFAULT, PRI_MAX,
    PRI_MIN,
};
