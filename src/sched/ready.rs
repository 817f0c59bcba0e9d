//! Priority-ordered ready queue.
//!
//! Insertion places a thread immediately before the first entry whose
//! effective priority is strictly lower, so equal priorities keep arrival
//! order: the queue is a sequence of FIFO bands, highest band first.
//! Dispatch pops the front.
//!
//! Priorities live in the thread records, not in the queue, so callers pass
//! the registry to every operation that needs a current value. Two
//! maintenance operations cover priority churn: [`ReadyQueue::reposition`]
//! moves one boosted thread forward past now-lower entries (donation), and
//! [`ReadyQueue::resort`] stably reorders the whole queue (MLFQS
//! recomputation).

use crate::record::ThreadRecord;
use crate::types::{Priority, ThreadId};
use crate::util::Arena;
use std::collections::VecDeque;

/// The queue of READY threads, highest effective priority first.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    queue: VecDeque<ThreadId>,
}

fn priority_of(threads: &Arena<ThreadRecord>, id: ThreadId) -> Priority {
    threads
        .get(id.arena_index())
        .expect("ready queue entry refers to a live thread")
        .effective_priority
}

impl ReadyQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is ready.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the next thread to dispatch without removing it.
    #[must_use]
    pub fn front(&self) -> Option<ThreadId> {
        self.queue.front().copied()
    }

    /// Returns true if `id` is queued.
    #[must_use]
    pub fn contains(&self, id: ThreadId) -> bool {
        self.queue.contains(&id)
    }

    /// Iterates over queued threads in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.queue.iter().copied()
    }

    /// Inserts `id` before the first entry with strictly lower priority.
    pub fn insert(&mut self, id: ThreadId, threads: &Arena<ThreadRecord>) {
        let priority = priority_of(threads, id);
        let position = self
            .queue
            .iter()
            .position(|&other| priority > priority_of(threads, other))
            .unwrap_or(self.queue.len());
        self.queue.insert(position, id);
    }

    /// Removes and returns the highest-priority thread.
    pub fn pop(&mut self) -> Option<ThreadId> {
        self.queue.pop_front()
    }

    /// Removes `id` from the queue if present.
    pub fn remove(&mut self, id: ThreadId) {
        self.queue.retain(|&other| other != id);
    }

    /// Re-inserts `id` according to its current priority.
    ///
    /// Used after a donation boost so dispatch order reflects the new
    /// priority immediately; the boosted thread lands after any entries
    /// that still tie with it.
    pub fn reposition(&mut self, id: ThreadId, threads: &Arena<ThreadRecord>) {
        if self.contains(id) {
            self.remove(id);
            self.insert(id, threads);
        }
    }

    /// Stably reorders the whole queue by current priorities.
    pub fn resort(&mut self, threads: &Arena<ThreadRecord>) {
        let mut entries: Vec<ThreadId> = self.queue.drain(..).collect();
        entries.sort_by_key(|&id| core::cmp::Reverse(priority_of(threads, id)));
        self.queue.extend(entries);
    }
}
