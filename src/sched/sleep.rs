//! Wake-tick-ordered sleep queue.
//!
//! Threads that sleep register a wake-due tick before blocking; the queue
//! keeps them sorted ascending by that tick, so the wake pass run on every
//! dispatch can pop due threads from the front and stop at the first one
//! that is not due yet.

use crate::types::{ThreadId, Tick};
use std::collections::VecDeque;

/// Blocked threads waiting for the tick counter to reach a wake point.
#[derive(Debug, Default)]
pub struct SleepQueue {
    queue: VecDeque<(ThreadId, Tick)>,
}

impl SleepQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sleeping threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no thread is sleeping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns true if `id` is queued.
    #[must_use]
    pub fn contains(&self, id: ThreadId) -> bool {
        self.queue.iter().any(|&(other, _)| other == id)
    }

    /// Inserts `id` with wake tick `due`, before the first entry due
    /// strictly later; equal wake ticks keep arrival order.
    pub fn insert(&mut self, id: ThreadId, due: Tick) {
        let position = self
            .queue
            .iter()
            .position(|&(_, other)| other > due)
            .unwrap_or(self.queue.len());
        self.queue.insert(position, (id, due));
    }

    /// Pops the front thread if its wake tick has passed.
    pub fn pop_due(&mut self, now: Tick) -> Option<ThreadId> {
        match self.queue.front() {
            Some(&(_, due)) if due <= now => self.queue.pop_front().map(|(id, _)| id),
            _ => None,
        }
    }

    /// Removes `id` from the queue if present (early wake).
    pub fn remove(&mut self, id: ThreadId) {
        self.queue.retain(|&(other, _)| other != id);
    }
}
