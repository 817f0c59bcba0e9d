//! Mutual-exclusion lock.

use crate::kernel::Kernel;
use crate::sync::Semaphore;
use crate::types::{LockId, ThreadId};

/// A lock: a semaphore with initial value 1 plus an owner.
///
/// Unlike a bare semaphore, a lock has a holder: the thread that acquired
/// it and the only thread allowed to release it. Acquiring it again
/// while holding it is a contract violation. Lock traffic feeds the
/// priority-donation engine: blocking on a held lock boosts the holder,
/// releasing refunds the boost.
#[derive(Debug)]
pub struct Lock {
    pub(crate) sema: Semaphore,
    pub(crate) holder: Option<ThreadId>,
}

impl Lock {
    pub(crate) const fn new() -> Self {
        Self {
            sema: Semaphore::new(1),
            holder: None,
        }
    }

    /// Returns the current holder, if any.
    #[must_use]
    pub fn holder(&self) -> Option<ThreadId> {
        self.holder
    }
}

impl Kernel {
    /// Registers a new, unheld lock.
    pub fn lock_create(&mut self) -> LockId {
        let index = self
            .locks
            .try_insert(Lock::new())
            .expect("lock registry exhausted");
        LockId::from_arena(index)
    }

    /// Removes a lock. Destroying a held lock is a contract violation.
    pub fn lock_destroy(&mut self, lock: LockId) {
        let removed = self
            .locks
            .remove(lock.arena_index())
            .unwrap_or_else(|| panic!("stale lock handle {lock}"));
        assert!(
            removed.holder.is_none(),
            "lock {lock} destroyed while held"
        );
    }

    /// Returns the lock's holder, if any.
    #[must_use]
    pub fn lock_holder(&self, lock: LockId) -> Option<ThreadId> {
        self.locks
            .get(lock.arena_index())
            .unwrap_or_else(|| panic!("stale lock handle {lock}"))
            .holder
    }

    /// Returns true if the running thread holds the lock.
    #[must_use]
    pub fn lock_held_by_current(&self, lock: LockId) -> bool {
        self.lock_holder(lock) == Some(self.current)
    }

    /// Acquires the lock, blocking until it is available.
    ///
    /// If the lock is held by a lower-priority thread, the donation engine
    /// boosts the holder (and, transitively, whatever that holder is itself
    /// waiting on) before the caller blocks. Must not be called in
    /// interrupt context, and the caller must not already hold the lock.
    pub fn lock_acquire(&mut self, lock: LockId) {
        assert!(
            !self.in_interrupt,
            "lock_acquire called from interrupt context"
        );
        let current = self.current;
        let holder = self
            .locks
            .get(lock.arena_index())
            .unwrap_or_else(|| panic!("stale lock handle {lock}"))
            .holder;
        assert!(
            holder != Some(current),
            "lock {lock} already held by the caller"
        );
        if holder.is_some() {
            self.lock_wait_for(current, lock);
            // The release path hands the lock over before unblocking the
            // waiter, so the caller owns it at its next dispatch.
            self.block_current();
        } else {
            let record = self
                .locks
                .get_mut(lock.arena_index())
                .expect("lock vanished during acquire");
            record.sema.value = 0;
            record.holder = Some(current);
        }
    }

    /// Non-blocking acquire. Returns true on success.
    pub fn lock_try_acquire(&mut self, lock: LockId) -> bool {
        let current = self.current;
        let record = self
            .locks
            .get_mut(lock.arena_index())
            .unwrap_or_else(|| panic!("stale lock handle {lock}"));
        assert!(
            record.holder != Some(current),
            "lock {lock} already held by the caller"
        );
        if record.holder.is_some() {
            return false;
        }
        record.sema.value = 0;
        record.holder = Some(current);
        true
    }

    /// Releases the lock, which the running thread must hold.
    ///
    /// Refunds any priority donated through this lock, hands the lock to
    /// the highest-priority waiter, frees the retired donation records, and
    /// yields so the new holder can run immediately.
    pub fn lock_release(&mut self, lock: LockId) {
        assert!(
            self.lock_held_by_current(lock),
            "lock {lock} not held by the caller"
        );
        self.lock_release_inner(lock, true);
        self.free_donations();
    }

    /// Queues `waiter` on the lock's wait list, donating to the holder
    /// first when the waiter outranks it. The waiter's state is untouched;
    /// callers decide whether it blocks now or is already blocked.
    pub(crate) fn lock_wait_for(&mut self, waiter: ThreadId, lock: LockId) {
        let holder = self
            .locks
            .get(lock.arena_index())
            .unwrap_or_else(|| panic!("stale lock handle {lock}"))
            .holder
            .expect("waiting requires a held lock");
        if !self.config.mlfqs {
            let waiter_priority = self.thread(waiter).effective_priority;
            let holder_priority = self.thread(holder).effective_priority;
            if waiter_priority > holder_priority {
                self.donate_priority(waiter, lock);
            }
        }
        self.thread_mut(waiter).blocked_on = Some(lock);
        let record = self
            .locks
            .get_mut(lock.arena_index())
            .expect("lock vanished during wait");
        record.sema.enqueue_waiter(waiter, &self.threads);
    }

    /// Release without the trailing donation-record sweep; `yield_after`
    /// controls whether the caller offers the CPU afterwards.
    pub(crate) fn lock_release_inner(&mut self, lock: LockId, yield_after: bool) {
        if !self.config.mlfqs {
            self.refund_priority(lock);
        }
        let woken = {
            let record = self
                .locks
                .get_mut(lock.arena_index())
                .unwrap_or_else(|| panic!("stale lock handle {lock}"));
            record.holder = None;
            record.sema.pick_waiter(&self.threads)
        };
        if let Some(waiter) = woken {
            // Hand the lock straight to the winner so it owns the lock the
            // moment it is unblocked.
            self.locks
                .get_mut(lock.arena_index())
                .expect("lock vanished during release")
                .holder = Some(waiter);
            self.thread_mut(waiter).blocked_on = None;
            tracing::trace!(lock = %lock, waiter = %waiter, "lock handed to waiter");
            self.unblock(waiter);
        } else {
            self.locks
                .get_mut(lock.arena_index())
                .expect("lock vanished during release")
                .sema
                .value = 1;
        }
        if yield_after {
            self.yield_or_mark_preempt();
        }
    }
}
