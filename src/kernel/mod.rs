//! The scheduler state machine.
//!
//! A [`Kernel`] owns every piece of mutable scheduler state: the thread
//! registry, the synchronization-object registries, the ready and sleep
//! queues, the donation-record collection, the MLFQS load average and the
//! tick bookkeeping. Exclusive ownership is the locking discipline of the
//! modelled single-core machine: any `&mut Kernel` section is an
//! interrupts-disabled critical section.
//!
//! Construction bootstraps two contexts: `main`, the thread the embedder
//! is considered to be running on, and `idle`, dispatched only when the
//! ready queue is empty and never enqueued on it.
//!
//! The embedder plays the part of the timer interrupt by calling
//! [`Kernel::handle_tick`] with its monotonic counter, then
//! [`Kernel::yield_on_return`] on the way out, which delivers slice
//! preemption exactly where a real interrupt return would.

mod donation;
mod mlfqs;
mod switch;

pub use switch::{ContextSwitch, NullHooks, NullSwitch, ProcessHooks};

use crate::error::SpawnError;
use crate::fixed::Fixed;
use crate::record::{DonationRecord, ThreadEntry, ThreadRecord, ThreadState, THREAD_MAGIC};
use crate::sched::{ReadyQueue, SleepQueue};
use crate::sync::{Condvar, Lock, Semaphore};
use crate::trace::{EventBuffer, SchedEvent};
use crate::types::{Priority, ThreadId, Tick, PRI_DEFAULT, PRI_MAX, PRI_MIN};
use crate::util::Arena;

/// Priorities are recomputed under MLFQS every this many ticks.
const PRIORITY_INTERVAL: Tick = 4;

/// Build-time parameters of a [`Kernel`].
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// Use the multi-level-feedback scheduler instead of donation-based
    /// priority scheduling.
    pub mlfqs: bool,
    /// Timer ticks per scheduling slice.
    pub time_slice: u32,
    /// Timer ticks per second, the cadence of the load-average update.
    pub timer_freq: Tick,
    /// Capacity of the thread registry, including `main` and `idle`.
    pub max_threads: usize,
    /// Capacity of the scheduler event ring.
    pub trace_capacity: usize,
}

impl KernelConfig {
    /// Creates the default configuration: priority scheduling, 4-tick
    /// slices, 100 ticks per second, 64 threads, 1024 trace events.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mlfqs: false,
            time_slice: 4,
            timer_freq: 100,
            max_threads: 64,
            trace_capacity: 1024,
        }
    }

    /// Selects the scheduler discipline.
    #[must_use]
    pub const fn mlfqs(mut self, enabled: bool) -> Self {
        self.mlfqs = enabled;
        self
    }

    /// Sets the slice length in ticks.
    #[must_use]
    pub const fn time_slice(mut self, ticks: u32) -> Self {
        self.time_slice = ticks;
        self
    }

    /// Sets the timer frequency in ticks per second.
    #[must_use]
    pub const fn timer_freq(mut self, ticks: Tick) -> Self {
        self.timer_freq = ticks;
        self
    }

    /// Bounds the thread registry.
    #[must_use]
    pub const fn max_threads(mut self, limit: usize) -> Self {
        self.max_threads = limit;
        self
    }

    /// Sets the trace ring capacity.
    #[must_use]
    pub const fn trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The scheduler: all state, one owner.
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) threads: Arena<ThreadRecord>,
    pub(crate) semas: Arena<Semaphore>,
    pub(crate) locks: Arena<Lock>,
    pub(crate) conds: Arena<Condvar>,
    pub(crate) ready: ReadyQueue,
    pub(crate) sleepers: SleepQueue,
    pub(crate) donations: Vec<DonationRecord>,
    pub(crate) retired: Vec<DonationRecord>,
    pub(crate) current: ThreadId,
    pub(crate) idle: ThreadId,
    pub(crate) load_avg: Fixed,
    pub(crate) now: Tick,
    pub(crate) slice_ticks: u32,
    pub(crate) preempt_pending: bool,
    pub(crate) in_interrupt: bool,
    pub(crate) trace: EventBuffer,
    next_tid: u64,
    idle_ticks: u64,
    kernel_ticks: u64,
    switch: Box<dyn ContextSwitch>,
    hooks: Box<dyn ProcessHooks>,
}

impl Kernel {
    /// Creates a kernel with a no-op context-switch collaborator.
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        Self::with_switch(config, Box::new(NullSwitch))
    }

    /// Creates a kernel with the given context-switch collaborator.
    ///
    /// Bootstraps the `main` context (RUNNING, default priority) and the
    /// `idle` context (minimum priority, never on the ready queue).
    #[must_use]
    pub fn with_switch(config: KernelConfig, switch: Box<dyn ContextSwitch>) -> Self {
        assert!(config.max_threads >= 2, "registry must fit main and idle");
        assert!(config.time_slice > 0, "time slice must be positive");
        let mut threads = Arena::bounded(config.max_threads);
        let main_index = threads
            .try_insert_with(|index| {
                ThreadRecord::new(ThreadId::from_arena(index), 1, "main", PRI_DEFAULT, None)
            })
            .expect("registry fits the bootstrap threads");
        let idle_index = threads
            .try_insert_with(|index| {
                ThreadRecord::new(ThreadId::from_arena(index), 2, "idle", PRI_MIN, None)
            })
            .expect("registry fits the bootstrap threads");
        let main = ThreadId::from_arena(main_index);
        let idle = ThreadId::from_arena(idle_index);
        threads
            .get_mut(main_index)
            .expect("main just inserted")
            .state = ThreadState::Running;
        Self {
            config,
            threads,
            semas: Arena::new(),
            locks: Arena::new(),
            conds: Arena::new(),
            ready: ReadyQueue::new(),
            sleepers: SleepQueue::new(),
            donations: Vec::new(),
            retired: Vec::new(),
            current: main,
            idle,
            load_avg: Fixed::ZERO,
            now: 0,
            slice_ticks: 0,
            preempt_pending: false,
            in_interrupt: false,
            trace: EventBuffer::new(config.trace_capacity),
            next_tid: 3,
            idle_ticks: 0,
            kernel_ticks: 0,
            switch,
            hooks: Box::new(NullHooks),
        }
    }

    /// Installs the process-lifecycle notification hooks.
    pub fn set_process_hooks(&mut self, hooks: Box<dyn ProcessHooks>) {
        self.hooks = hooks;
    }

    // ------------------------------------------------------------------
    // Registry access
    // ------------------------------------------------------------------

    /// Returns the record behind `thread`.
    ///
    /// Panics on a stale handle or a record whose integrity tag has been
    /// clobbered; both are unrecoverable programming errors.
    #[must_use]
    pub fn thread(&self, thread: ThreadId) -> &ThreadRecord {
        let record = self
            .threads
            .get(thread.arena_index())
            .unwrap_or_else(|| panic!("stale thread handle {thread}"));
        assert!(
            record.magic == THREAD_MAGIC,
            "corrupted thread record {thread}"
        );
        record
    }

    pub(crate) fn thread_mut(&mut self, thread: ThreadId) -> &mut ThreadRecord {
        let record = self
            .threads
            .get_mut(thread.arena_index())
            .unwrap_or_else(|| panic!("stale thread handle {thread}"));
        assert!(
            record.magic == THREAD_MAGIC,
            "corrupted thread record {thread}"
        );
        record
    }

    /// Calls `f` for every live thread record, bootstrap contexts included.
    pub fn for_each_thread(&self, mut f: impl FnMut(&ThreadRecord)) {
        for (_, record) in self.threads.iter() {
            f(record);
        }
    }

    /// Returns the number of live thread records.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Returns the running thread's handle.
    #[must_use]
    pub fn running(&self) -> ThreadId {
        self.current
    }

    /// Returns the idle thread's handle.
    #[must_use]
    pub fn idle_thread(&self) -> ThreadId {
        self.idle
    }

    /// Returns the last tick counter value seen by the tick handler.
    #[must_use]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Returns the running thread's effective priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.thread(self.current).effective_priority
    }

    /// Returns `thread`'s effective priority.
    #[must_use]
    pub fn priority_of(&self, thread: ThreadId) -> Priority {
        self.thread(thread).effective_priority
    }

    /// Returns `thread`'s base priority.
    #[must_use]
    pub fn base_priority_of(&self, thread: ThreadId) -> Priority {
        self.thread(thread).base_priority
    }

    /// Returns `thread`'s lifecycle state.
    #[must_use]
    pub fn state_of(&self, thread: ThreadId) -> ThreadState {
        self.thread(thread).state
    }

    /// Returns the running thread's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.thread(self.current).name
    }

    /// Returns `thread`'s name.
    #[must_use]
    pub fn name_of(&self, thread: ThreadId) -> &str {
        &self.thread(thread).name
    }

    /// Returns the number of READY threads.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Returns true while the tick handler (or an explicit interrupt
    /// section) is active.
    #[must_use]
    pub fn in_interrupt(&self) -> bool {
        self.in_interrupt
    }

    /// Returns true if slice preemption has been requested and not yet
    /// delivered.
    #[must_use]
    pub fn preempt_requested(&self) -> bool {
        self.preempt_pending
    }

    /// Returns ticks spent in the idle thread.
    #[must_use]
    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    /// Returns ticks spent in non-idle threads.
    #[must_use]
    pub fn kernel_ticks(&self) -> u64 {
        self.kernel_ticks
    }

    /// Returns the scheduler event ring.
    #[must_use]
    pub fn trace(&self) -> &EventBuffer {
        &self.trace
    }

    /// Discards all recorded scheduler events.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    // ------------------------------------------------------------------
    // Thread lifecycle
    // ------------------------------------------------------------------

    /// Creates a thread and makes it READY.
    ///
    /// Returns [`SpawnError::Exhausted`] when the registry is full. The
    /// creator yields afterwards, so a higher-priority newcomer (or an
    /// equal-priority one, by arrival order) may run before this returns.
    pub fn spawn(
        &mut self,
        name: &str,
        priority: Priority,
        entry: ThreadEntry,
        arg: usize,
    ) -> Result<ThreadId, SpawnError> {
        assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "priority {priority} out of range"
        );
        let tid = self.next_tid;
        let index = self
            .threads
            .try_insert_with(|index| {
                ThreadRecord::new(
                    ThreadId::from_arena(index),
                    tid,
                    name,
                    priority,
                    Some((entry, arg)),
                )
            })
            .ok_or(SpawnError::Exhausted)?;
        self.next_tid += 1;
        let thread = ThreadId::from_arena(index);
        self.hooks.thread_created(thread);
        self.trace.push(SchedEvent::Spawned { thread, priority });
        tracing::debug!(thread = %thread, name, priority, "thread spawned");
        self.unblock(thread);
        self.yield_or_mark_preempt();
        Ok(thread)
    }

    /// Terminates the running thread.
    ///
    /// The record is reclaimed by the dispatch this call performs; from the
    /// modelled thread's point of view this never returns. The embedder
    /// must drop the handle afterwards.
    pub fn exit_current(&mut self) {
        assert!(
            !self.in_interrupt,
            "exit_current called from interrupt context"
        );
        let current = self.current;
        assert!(current != self.idle, "idle thread cannot exit");
        self.hooks.thread_exited(current);
        self.trace.push(SchedEvent::Exited { thread: current });
        tracing::debug!(thread = %current, "thread exits");
        self.thread_mut(current).state = ThreadState::Dying;
        self.schedule();
    }

    /// Yields the CPU; the running thread stays READY and may be dispatched
    /// again immediately if it still leads its band.
    pub fn yield_now(&mut self) {
        assert!(
            !self.in_interrupt,
            "yield_now called from interrupt context"
        );
        let current = self.current;
        if current == self.idle {
            // The idle thread parks instead of queueing.
            self.thread_mut(current).state = ThreadState::Blocked;
        } else {
            self.thread_mut(current).state = ThreadState::Ready;
            self.ready.insert(current, &self.threads);
        }
        self.schedule();
    }

    /// Blocks the running thread until some other thread unblocks it.
    pub fn block_current(&mut self) {
        assert!(
            !self.in_interrupt,
            "block_current called from interrupt context"
        );
        let current = self.current;
        self.thread_mut(current).state = ThreadState::Blocked;
        self.trace.push(SchedEvent::Blocked { thread: current });
        self.schedule();
    }

    /// Transitions a BLOCKED thread to READY.
    ///
    /// Does not preempt the running thread; callers that want the woken
    /// thread considered immediately yield themselves. Usable from
    /// interrupt context.
    pub fn unblock(&mut self, thread: ThreadId) {
        let record = self.thread(thread);
        assert!(
            record.state == ThreadState::Blocked,
            "unblock on thread {thread} which is not blocked"
        );
        if record.wake_due.is_some() {
            // Early wake: drop the sleep registration.
            self.sleepers.remove(thread);
            self.thread_mut(thread).wake_due = None;
        }
        self.thread_mut(thread).state = ThreadState::Ready;
        self.ready.insert(thread, &self.threads);
        self.trace.push(SchedEvent::Unblocked { thread });
        tracing::trace!(thread = %thread, "thread unblocked");
    }

    /// Blocks the running thread until the tick counter reaches `due`.
    ///
    /// A wake tick already in the past degenerates to a yield.
    pub fn sleep_until(&mut self, due: Tick) {
        assert!(
            !self.in_interrupt,
            "sleep_until called from interrupt context"
        );
        if due <= self.now {
            self.yield_now();
            return;
        }
        let current = self.current;
        assert!(current != self.idle, "idle thread cannot sleep");
        self.thread_mut(current).wake_due = Some(due);
        self.sleepers.insert(current, due);
        self.trace.push(SchedEvent::Slept { thread: current, due });
        tracing::trace!(thread = %current, due, "thread sleeps");
        self.thread_mut(current).state = ThreadState::Blocked;
        self.schedule();
    }

    /// Blocks the running thread for `ticks` timer ticks.
    pub fn sleep_for(&mut self, ticks: Tick) {
        self.sleep_until(self.now.saturating_add(ticks));
    }

    /// Sets the running thread's priority.
    ///
    /// Raising takes effect immediately on both fields. Lowering while
    /// boosted updates only the base; the effective value falls when the
    /// boost is refunded. Lowering while not boosted drops both fields and
    /// yields, since the caller may no longer deserve the CPU. Ignored
    /// under MLFQS, where the recompute rule owns priorities.
    pub fn set_priority(&mut self, priority: Priority) {
        assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "priority {priority} out of range"
        );
        if self.config.mlfqs {
            return;
        }
        let current = self.current;
        let record = self.thread_mut(current);
        if priority >= record.effective_priority {
            record.effective_priority = priority;
            record.base_priority = priority;
        } else if record.is_donated() {
            record.base_priority = priority;
        } else {
            record.effective_priority = priority;
            record.base_priority = priority;
            self.yield_or_mark_preempt();
        }
    }

    // ------------------------------------------------------------------
    // Timer interrupt
    // ------------------------------------------------------------------

    /// The per-tick entry point, called by the embedder's timer with its
    /// monotonic counter value. Runs in interrupt context: it updates
    /// statistics, applies the MLFQS cadence rules, and accounts the
    /// scheduling slice. Returns true when the embedder should deliver
    /// preemption via [`Kernel::yield_on_return`].
    pub fn handle_tick(&mut self, now: Tick) -> bool {
        self.in_interrupt = true;
        self.now = now;
        let current = self.current;
        if current == self.idle {
            self.idle_ticks += 1;
        } else {
            self.kernel_ticks += 1;
            self.thread_mut(current).ticks_run += 1;
        }
        if self.config.mlfqs {
            self.mlfqs_tick();
            if self.config.timer_freq > 0 && now % self.config.timer_freq == 0 {
                self.mlfqs_second();
            }
            if now % PRIORITY_INTERVAL == 0 {
                self.mlfqs_recompute();
            }
        }
        self.slice_ticks += 1;
        if self.slice_ticks >= self.config.time_slice {
            self.preempt_pending = true;
        }
        self.in_interrupt = false;
        self.preempt_pending
    }

    /// Enters an explicit interrupt section; only non-blocking operations
    /// are legal until [`Kernel::interrupt_exit`].
    pub fn interrupt_enter(&mut self) {
        assert!(!self.in_interrupt, "interrupt sections do not nest");
        self.in_interrupt = true;
    }

    /// Leaves an interrupt section. Returns true when preemption is
    /// pending and should be delivered via [`Kernel::yield_on_return`].
    pub fn interrupt_exit(&mut self) -> bool {
        assert!(self.in_interrupt, "interrupt_exit outside interrupt section");
        self.in_interrupt = false;
        self.preempt_pending
    }

    /// Delivers a pending preemption request by yielding, the way a real
    /// interrupt return would. No-op when nothing is pending.
    pub fn yield_on_return(&mut self) {
        if self.preempt_pending {
            self.preempt_pending = false;
            self.yield_now();
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Yield, or request yield-on-return when in interrupt context.
    pub(crate) fn yield_or_mark_preempt(&mut self) {
        if self.in_interrupt {
            self.preempt_pending = true;
        } else {
            self.yield_now();
        }
    }

    fn wake_sleepers(&mut self) {
        while let Some(thread) = self.sleepers.pop_due(self.now) {
            self.thread_mut(thread).wake_due = None;
            tracing::trace!(thread = %thread, now = self.now, "sleeper due");
            self.unblock(thread);
        }
    }

    /// Picks and switches to the next thread.
    ///
    /// Preconditions: not in interrupt context, and the caller has already
    /// moved the running thread's state away from RUNNING (to READY,
    /// BLOCKED or DYING).
    fn schedule(&mut self) {
        let previous = self.current;
        debug_assert!(
            self.thread(previous).state != ThreadState::Running,
            "schedule with the running thread still RUNNING"
        );
        self.wake_sleepers();
        let next = self.ready.pop().unwrap_or(self.idle);
        if next != previous {
            self.switch.switch(previous, next);
            self.trace.push(SchedEvent::Dispatched { thread: next, at: self.now });
            tracing::trace!(previous = %previous, next = %next, "dispatch");
        }
        self.current = next;
        self.thread_mut(next).state = ThreadState::Running;
        // Fresh slice for the incoming thread.
        self.slice_ticks = 0;
        if next != previous && self.thread(previous).state == ThreadState::Dying {
            // Safe to reclaim now that execution has moved off the dying
            // context.
            self.threads.remove(previous.arena_index());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ThreadState;

    fn noop(_arg: usize) {}

    #[test]
    fn bootstrap_runs_main_at_default_priority() {
        let kernel = Kernel::new(KernelConfig::default());
        assert_eq!(kernel.name(), "main");
        assert_eq!(kernel.priority(), PRI_DEFAULT);
        assert_eq!(kernel.state_of(kernel.running()), ThreadState::Running);
        assert_eq!(kernel.thread_count(), 2);
        assert_eq!(kernel.ready_len(), 0);
    }

    #[test]
    fn spawn_of_higher_priority_preempts_creator() {
        let mut kernel = Kernel::new(KernelConfig::default());
        let main = kernel.running();
        let high = kernel.spawn("high", 50, noop, 0).unwrap();
        assert_eq!(kernel.running(), high);
        assert_eq!(kernel.state_of(main), ThreadState::Ready);
    }

    #[test]
    fn spawn_of_lower_priority_keeps_creator_running() {
        let mut kernel = Kernel::new(KernelConfig::default());
        let main = kernel.running();
        let low = kernel.spawn("low", 10, noop, 0).unwrap();
        assert_eq!(kernel.running(), main);
        assert_eq!(kernel.state_of(low), ThreadState::Ready);
    }

    #[test]
    fn registry_exhaustion_is_an_error_not_a_panic() {
        let mut kernel = Kernel::new(KernelConfig::new().max_threads(3));
        assert!(kernel.spawn("one", 10, noop, 0).is_ok());
        assert_eq!(kernel.spawn("two", 10, noop, 0), Err(SpawnError::Exhausted));
    }

    #[test]
    fn exit_reclaims_the_record() {
        let mut kernel = Kernel::new(KernelConfig::default());
        let high = kernel.spawn("high", 50, noop, 0).unwrap();
        assert_eq!(kernel.running(), high);
        kernel.exit_current();
        assert_eq!(kernel.thread_count(), 2);
        assert!(!kernel.threads.contains(high.arena_index()));
    }

    #[test]
    #[should_panic(expected = "stale thread handle")]
    fn stale_handles_are_rejected() {
        let mut kernel = Kernel::new(KernelConfig::default());
        let high = kernel.spawn("high", 50, noop, 0).unwrap();
        kernel.exit_current();
        let _ = kernel.priority_of(high);
    }

    #[test]
    fn idle_runs_when_nothing_is_ready() {
        let mut kernel = Kernel::new(KernelConfig::default());
        kernel.block_current();
        assert_eq!(kernel.running(), kernel.idle_thread());
    }

    #[test]
    #[should_panic(expected = "interrupt context")]
    fn blocking_in_interrupt_context_panics() {
        let mut kernel = Kernel::new(KernelConfig::default());
        kernel.interrupt_enter();
        kernel.block_current();
    }

    #[test]
    fn slice_expiry_requests_preemption() {
        let mut kernel = Kernel::new(KernelConfig::default());
        let _ = kernel.spawn("peer", PRI_DEFAULT, noop, 0);
        for tick in 1..=3 {
            assert!(!kernel.handle_tick(tick));
        }
        assert!(kernel.handle_tick(4));
        assert!(kernel.preempt_requested());
        kernel.yield_on_return();
        assert!(!kernel.preempt_requested());
    }
}
