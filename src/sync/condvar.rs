//! Condition variable with Mesa semantics.

use crate::kernel::Kernel;
use crate::sync::Semaphore;
use crate::types::{CondId, LockId, SemaId, ThreadId};
use core::cmp::Reverse;

/// One queued `cond_wait` caller: the private semaphore it blocks on and
/// the thread the semaphore will wake.
#[derive(Debug)]
pub(crate) struct CondWaiter {
    pub(crate) sema: SemaId,
    pub(crate) thread: ThreadId,
}

/// A condition variable.
///
/// Each waiter blocks on its own single-use semaphore; the wait list orders
/// those semaphores by the priority of the thread they will wake, re-sorted
/// at signal time. Signalling is Mesa style: the woken thread re-competes
/// for the lock, so the caller of [`Kernel::cond_wait`] must recheck its
/// condition when the wait returns.
#[derive(Debug, Default)]
pub struct Condvar {
    pub(crate) waiters: Vec<CondWaiter>,
}

impl Condvar {
    pub(crate) const fn new() -> Self {
        Self { waiters: Vec::new() }
    }

    /// Returns the number of queued waiters.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }
}

impl Kernel {
    /// Registers a new condition variable.
    pub fn cond_create(&mut self) -> CondId {
        let index = self
            .conds
            .try_insert(Condvar::new())
            .expect("condvar registry exhausted");
        CondId::from_arena(index)
    }

    /// Removes a condition variable. Destroying one with queued waiters is
    /// a contract violation.
    pub fn cond_destroy(&mut self, cond: CondId) {
        let removed = self
            .conds
            .remove(cond.arena_index())
            .unwrap_or_else(|| panic!("stale condvar handle {cond}"));
        assert!(
            removed.waiters.is_empty(),
            "condvar {cond} destroyed while threads wait on it"
        );
    }

    /// Returns the number of threads waiting on the condition.
    #[must_use]
    pub fn cond_waiter_count(&self, cond: CondId) -> usize {
        self.conds
            .get(cond.arena_index())
            .unwrap_or_else(|| panic!("stale condvar handle {cond}"))
            .waiter_count()
    }

    /// Atomically releases `lock` and waits on `cond`; the waiter holds
    /// the lock again when it is next dispatched.
    ///
    /// The caller must hold `lock`. Release, enqueue and block happen as
    /// one scheduling step, so a signal cannot slip between them. Mesa
    /// semantics: the awaited condition must be rechecked after waking.
    pub fn cond_wait(&mut self, cond: CondId, lock: LockId) {
        assert!(
            !self.in_interrupt,
            "cond_wait called from interrupt context"
        );
        assert!(
            self.lock_held_by_current(lock),
            "cond_wait requires the associated lock"
        );
        let current = self.current;
        let sema_index = self
            .semas
            .try_insert(Semaphore::new(0))
            .expect("semaphore registry exhausted");
        let sema = SemaId::from_arena(sema_index);
        self.conds
            .get_mut(cond.arena_index())
            .unwrap_or_else(|| panic!("stale condvar handle {cond}"))
            .waiters
            .push(CondWaiter { sema, thread: current });
        tracing::trace!(cond = %cond, lock = %lock, thread = %current, "cond_wait blocks");
        self.lock_release_inner(lock, false);
        self.free_donations();
        self.semas
            .get_mut(sema.arena_index())
            .expect("private semaphore vanished")
            .enqueue_waiter(current, &self.threads);
        // The signal path routes the waiter through the lock's wait list,
        // so it holds the lock again at its next dispatch.
        self.block_current();
    }

    /// Wakes the waiter whose thread currently has the highest priority.
    ///
    /// The caller must hold the associated lock, and therefore the woken
    /// thread always moves onto the lock's wait list first (donating to
    /// the signaller if it outranks it); it runs once the lock is released
    /// and handed to it.
    pub fn cond_signal(&mut self, cond: CondId, lock: LockId) {
        assert!(
            !self.in_interrupt,
            "cond_signal called from interrupt context"
        );
        assert!(
            self.lock_held_by_current(lock),
            "cond_signal requires the associated lock"
        );
        let picked = {
            let threads = &self.threads;
            let record = self
                .conds
                .get_mut(cond.arena_index())
                .unwrap_or_else(|| panic!("stale condvar handle {cond}"));
            record.waiters.sort_by_key(|waiter| {
                Reverse(
                    threads
                        .get(waiter.thread.arena_index())
                        .expect("condvar waiter refers to a live thread")
                        .effective_priority,
                )
            });
            if record.waiters.is_empty() {
                None
            } else {
                Some(record.waiters.remove(0))
            }
        };
        if let Some(waiter) = picked {
            // The private semaphore is single-use; retire it now.
            let sema = self
                .semas
                .remove(waiter.sema.arena_index())
                .expect("private semaphore vanished");
            debug_assert_eq!(sema.waiters(), &[waiter.thread][..]);
            tracing::trace!(cond = %cond, thread = %waiter.thread, "cond_signal wakes waiter");
            self.lock_wait_for(waiter.thread, lock);
        }
    }

    /// Wakes every waiter, highest priority first.
    pub fn cond_broadcast(&mut self, cond: CondId, lock: LockId) {
        while self.cond_waiter_count(cond) > 0 {
            self.cond_signal(cond, lock);
        }
    }
}
