//! Collaborator traits at the kernel's boundary.
//!
//! The scheduler decides *who* runs; actually exchanging execution between
//! two contexts, and reacting to thread lifecycle for process bookkeeping,
//! belong to the embedder. Both seams are trait objects installed on the
//! [`Kernel`](crate::Kernel); the defaults do nothing, which is exactly
//! right for a simulated machine.

use crate::types::ThreadId;

/// The context-switch primitive.
///
/// Invoked on every dispatch that changes the running thread, after the
/// scheduler has picked the successor and before post-switch housekeeping.
/// Implementations exchange whatever per-context execution state the
/// embedder keeps; the kernel itself only needs the call to happen.
pub trait ContextSwitch {
    /// Exchange execution from `outgoing` to `incoming`.
    fn switch(&mut self, outgoing: ThreadId, incoming: ThreadId);
}

/// A context switch that does nothing, for pure simulation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSwitch;

impl ContextSwitch for NullSwitch {
    fn switch(&mut self, _outgoing: ThreadId, _incoming: ThreadId) {}
}

/// Notifications consumed by the process layer.
pub trait ProcessHooks {
    /// A thread was created and is about to become READY.
    fn thread_created(&mut self, _thread: ThreadId) {}

    /// The running thread is exiting and will never run again.
    fn thread_exited(&mut self, _thread: ThreadId) {}
}

/// Process hooks that ignore every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHooks;

impl ProcessHooks for NullHooks {}
