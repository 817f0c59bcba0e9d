//! Counting semaphore.

use crate::kernel::Kernel;
use crate::record::ThreadRecord;
use crate::types::{SemaId, ThreadId};
use crate::util::Arena;
use core::cmp::Reverse;

/// A nonnegative counter with a priority-ordered wait list.
///
/// `down` waits for the value to become positive, then decrements it; `up`
/// increments it and wakes the highest-priority waiter, if any. In this
/// deterministic single-core model the released unit is handed directly to
/// the woken waiter, so a waiter that is unblocked owns its decrement.
#[derive(Debug)]
pub struct Semaphore {
    pub(crate) value: u32,
    pub(crate) waiters: Vec<ThreadId>,
}

impl Semaphore {
    pub(crate) const fn new(value: u32) -> Self {
        Self {
            value,
            waiters: Vec::new(),
        }
    }

    /// Returns the current counter value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Returns the queued waiters in wait order.
    #[must_use]
    pub fn waiters(&self) -> &[ThreadId] {
        &self.waiters
    }

    /// Queues `id` before the first waiter with strictly lower priority.
    pub(crate) fn enqueue_waiter(&mut self, id: ThreadId, threads: &Arena<ThreadRecord>) {
        let priority = waiter_priority(threads, id);
        let position = self
            .waiters
            .iter()
            .position(|&other| priority > waiter_priority(threads, other))
            .unwrap_or(self.waiters.len());
        self.waiters.insert(position, id);
    }

    /// Re-sorts the wait list by current priorities and removes the front
    /// waiter. The re-sort is stable, so ties keep arrival order.
    pub(crate) fn pick_waiter(&mut self, threads: &Arena<ThreadRecord>) -> Option<ThreadId> {
        if self.waiters.is_empty() {
            return None;
        }
        self.waiters
            .sort_by_key(|&id| Reverse(waiter_priority(threads, id)));
        Some(self.waiters.remove(0))
    }
}

fn waiter_priority(threads: &Arena<ThreadRecord>, id: ThreadId) -> i32 {
    threads
        .get(id.arena_index())
        .expect("wait list entry refers to a live thread")
        .effective_priority
}

impl Kernel {
    /// Registers a new semaphore with the given initial value.
    pub fn sema_create(&mut self, value: u32) -> SemaId {
        let index = self
            .semas
            .try_insert(Semaphore::new(value))
            .expect("semaphore registry exhausted");
        SemaId::from_arena(index)
    }

    /// Removes a semaphore. Destroying a semaphore with queued waiters is a
    /// contract violation.
    pub fn sema_destroy(&mut self, sema: SemaId) {
        let removed = self
            .semas
            .remove(sema.arena_index())
            .unwrap_or_else(|| panic!("stale semaphore handle {sema}"));
        assert!(
            removed.waiters.is_empty(),
            "semaphore {sema} destroyed while threads wait on it"
        );
    }

    /// Returns a semaphore's current value.
    #[must_use]
    pub fn sema_value(&self, sema: SemaId) -> u32 {
        self.semas
            .get(sema.arena_index())
            .unwrap_or_else(|| panic!("stale semaphore handle {sema}"))
            .value
    }

    /// Down ("P"): wait until the value is positive, then decrement it.
    ///
    /// Blocks the calling context while the value is zero, so this must not
    /// be used in interrupt context.
    pub fn sema_down(&mut self, sema: SemaId) {
        assert!(
            !self.in_interrupt,
            "sema_down called from interrupt context"
        );
        let current = self.current;
        let record = self
            .semas
            .get_mut(sema.arena_index())
            .unwrap_or_else(|| panic!("stale semaphore handle {sema}"));
        if record.value > 0 {
            record.value -= 1;
            return;
        }
        record.enqueue_waiter(current, &self.threads);
        tracing::trace!(sema = %sema, thread = %current, "sema_down blocks");
        // The up that wakes this waiter hands its unit over, so the
        // decrement is complete by the time the waiter runs again.
        self.block_current();
    }

    /// Non-blocking down; usable from interrupt context.
    ///
    /// Returns true if the value was positive and has been decremented.
    pub fn sema_try_down(&mut self, sema: SemaId) -> bool {
        let record = self
            .semas
            .get_mut(sema.arena_index())
            .unwrap_or_else(|| panic!("stale semaphore handle {sema}"));
        if record.value > 0 {
            record.value -= 1;
            true
        } else {
            false
        }
    }

    /// Up ("V"): wake the highest-priority waiter or increment the value,
    /// then yield so a newly-woken higher-priority thread runs immediately.
    ///
    /// Usable from interrupt context, where the yield becomes a
    /// yield-on-return request.
    pub fn sema_up(&mut self, sema: SemaId) {
        let woken = self
            .semas
            .get_mut(sema.arena_index())
            .unwrap_or_else(|| panic!("stale semaphore handle {sema}"))
            .pick_waiter(&self.threads);
        match woken {
            Some(waiter) => {
                tracing::trace!(sema = %sema, waiter = %waiter, "sema_up wakes waiter");
                self.unblock(waiter);
            }
            None => {
                self.semas
                    .get_mut(sema.arena_index())
                    .expect("semaphore vanished during up")
                    .value += 1;
            }
        }
        self.yield_or_mark_preempt();
    }
}
