//! Thread control block.
//!
//! A [`ThreadRecord`] is everything the scheduler knows about one execution
//! context. Records live in the kernel's thread arena from creation until
//! the dispatch that switches away from the dying context reclaims them;
//! queues and wait lists refer to them only by handle.

use crate::fixed::Fixed;
use crate::types::{LockId, Priority, ThreadId, Tick};

/// Integrity tag stamped into every live record.
///
/// An access that finds any other value here means the record was
/// overwritten by a neighbour (the modelled equivalent of a kernel stack
/// overflow) and is unrecoverable.
pub const THREAD_MAGIC: u32 = 0xcd6a_bf4b;

/// Entry point of a thread: a function and its integer argument.
///
/// The kernel stores the pair for the process-layer collaborator that
/// actually enters new contexts; the scheduler itself never calls it.
pub type ThreadEntry = fn(usize);

/// Lifecycle state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Not runnable until unblocked: waiting on a semaphore, a lock, a
    /// condition, or a wake tick.
    Blocked,
    /// Eligible for dispatch; enqueued on the ready queue.
    Ready,
    /// Currently executing. Exactly one thread is in this state.
    Running,
    /// Exited; the record is reclaimed by the next dispatch away from it.
    Dying,
}

impl ThreadState {
    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dying)
    }
}

/// Per-thread scheduler state.
#[derive(Debug)]
pub struct ThreadRecord {
    /// Handle of this record in the thread arena.
    pub id: ThreadId,
    /// Monotonically assigned numeric identity, never reused.
    pub tid: u64,
    /// Human-readable name, for diagnostics.
    pub name: String,
    /// Lifecycle state.
    pub state: ThreadState,
    /// Priority used for every scheduling decision. May exceed
    /// `base_priority` while donations are in force; never below it.
    pub effective_priority: Priority,
    /// Priority last requested through the public priority-set API.
    pub base_priority: Priority,
    /// Niceness under MLFQS, clamped into `[NICE_MIN, NICE_MAX]`.
    pub nice: i32,
    /// Decaying CPU-usage estimate under MLFQS.
    pub recent_cpu: Fixed,
    /// Wake-due tick; meaningful only while queued on the sleep queue.
    pub wake_due: Option<Tick>,
    /// The lock this thread is currently blocked acquiring, if any.
    /// This is the wait-for edge the donation walk follows.
    pub blocked_on: Option<LockId>,
    /// Entry function and argument, absent for the bootstrap and idle
    /// contexts.
    pub entry: Option<(ThreadEntry, usize)>,
    /// Timer ticks spent running.
    pub ticks_run: u64,
    /// Integrity tag; must equal [`THREAD_MAGIC`].
    pub magic: u32,
}

impl ThreadRecord {
    pub(crate) fn new(
        id: ThreadId,
        tid: u64,
        name: &str,
        priority: Priority,
        entry: Option<(ThreadEntry, usize)>,
    ) -> Self {
        Self {
            id,
            tid,
            name: name.to_owned(),
            state: ThreadState::Blocked,
            effective_priority: priority,
            base_priority: priority,
            nice: 0,
            recent_cpu: Fixed::ZERO,
            wake_due: None,
            blocked_on: None,
            entry,
            ticks_run: 0,
            magic: THREAD_MAGIC,
        }
    }

    /// Returns true while the thread runs above its base priority, i.e. it
    /// is currently a donation receiver.
    #[must_use]
    pub fn is_donated(&self) -> bool {
        self.effective_priority > self.base_priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ArenaIndex;

    #[test]
    fn new_record_starts_blocked_with_equal_priorities() {
        let id = ThreadId::from_arena(ArenaIndex::new(0, 0));
        let record = ThreadRecord::new(id, 1, "main", 31, None);
        assert_eq!(record.state, ThreadState::Blocked);
        assert_eq!(record.effective_priority, record.base_priority);
        assert!(!record.is_donated());
        assert_eq!(record.magic, THREAD_MAGIC);
    }
}
