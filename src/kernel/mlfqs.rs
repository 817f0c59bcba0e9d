//! Multi-level-feedback-queue accounting.
//!
//! In MLFQS mode priorities are not chosen by threads; they are recomputed
//! from decaying CPU-usage estimates, niceness and system load:
//!
//! ```text
//! load_avg   = (59/60)·load_avg + (1/60)·ready_count        (each second)
//! recent_cpu = (2·load_avg)/(2·load_avg + 1)·recent_cpu + nice
//! priority   = PRI_MAX − recent_cpu/4 − 2·nice              (each 4 ticks)
//! ```
//!
//! All three formulas run on [`Fixed`] 17.14 arithmetic; the final priority
//! truncates toward zero and clamps into `[PRI_MIN, PRI_MAX]`.

use crate::fixed::Fixed;
use crate::kernel::Kernel;
use crate::record::ThreadRecord;
use crate::types::{Priority, ThreadId, NICE_MAX, NICE_MIN, PRI_MAX, PRI_MIN};

fn mlfqs_priority(record: &ThreadRecord) -> Priority {
    let raw = Fixed::from_int(PRI_MAX) - record.recent_cpu / 4 - Fixed::from_int(2 * record.nice);
    raw.trunc().clamp(PRI_MIN, PRI_MAX)
}

impl Kernel {
    /// Per-tick rule: charge the running thread one unit of recent CPU.
    /// The idle thread is exempt.
    pub fn mlfqs_tick(&mut self) {
        let current = self.current;
        if current != self.idle {
            let record = self.thread_mut(current);
            record.recent_cpu = record.recent_cpu + 1;
        }
    }

    /// Per-second rule: fold the ready-thread count into `load_avg`, then
    /// decay every thread's `recent_cpu` against the new load.
    pub fn mlfqs_second(&mut self) {
        let ready_count = self.ready.len() as i32 + i32::from(self.current != self.idle);
        self.load_avg = self.load_avg * 59 / 60 + Fixed::from_int(ready_count) / 60;
        let coefficient =
            (self.load_avg * 2) / (self.load_avg * 2 + Fixed::from_int(1));
        for (_, record) in self.threads.iter_mut() {
            record.recent_cpu = coefficient * record.recent_cpu + Fixed::from_int(record.nice);
        }
        tracing::trace!(load_avg = %self.load_avg, "mlfqs second boundary");
    }

    /// Four-tick rule: recompute every thread's priority and restore the
    /// ready queue's ordering invariant.
    pub fn mlfqs_recompute(&mut self) {
        for (_, record) in self.threads.iter_mut() {
            let priority = mlfqs_priority(record);
            record.effective_priority = priority;
            record.base_priority = priority;
        }
        self.ready.resort(&self.threads);
    }

    /// Sets the running thread's niceness, clamped into
    /// [`NICE_MIN`]..=[`NICE_MAX`], recomputes its priority, and yields if
    /// it no longer leads the ready queue.
    pub fn set_nice(&mut self, nice: i32) {
        let nice = nice.clamp(NICE_MIN, NICE_MAX);
        let current = self.current;
        self.thread_mut(current).nice = nice;
        if !self.config.mlfqs {
            return;
        }
        let priority = mlfqs_priority(self.thread(current));
        {
            let record = self.thread_mut(current);
            record.effective_priority = priority;
            record.base_priority = priority;
        }
        let front = self.ready.front().map(|id| self.thread(id).effective_priority);
        if front.is_some_and(|front_priority| front_priority > priority) {
            self.yield_or_mark_preempt();
        }
    }

    /// Returns the running thread's niceness.
    #[must_use]
    pub fn nice(&self) -> i32 {
        self.thread(self.current).nice
    }

    /// Returns 100 times the system load average, rounded to nearest.
    #[must_use]
    pub fn load_avg_x100(&self) -> i32 {
        (self.load_avg * 100).round_nearest()
    }

    /// Returns 100 times the running thread's `recent_cpu`, rounded to
    /// nearest.
    #[must_use]
    pub fn recent_cpu_x100(&self) -> i32 {
        self.recent_cpu_x100_of(self.current)
    }

    /// Returns 100 times `thread`'s `recent_cpu`, rounded to nearest.
    #[must_use]
    pub fn recent_cpu_x100_of(&self, thread: ThreadId) -> i32 {
        (self.thread(thread).recent_cpu * 100).round_nearest()
    }
}
