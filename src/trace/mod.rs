//! Bounded ring buffer of scheduler events.
//!
//! The kernel records every externally visible transition (spawns,
//! dispatches, blocks, wakes, donations, refunds, exits) into a fixed-size
//! ring. When the ring fills, the oldest events are overwritten, so capture
//! never allocates after construction and never grows without bound. Tests
//! read the ring to assert dispatch order instead of instrumenting thread
//! bodies.

use crate::types::{Priority, ThreadId, Tick};

/// One scheduler transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedEvent {
    /// A thread was created and made READY.
    Spawned {
        /// The new thread.
        thread: ThreadId,
        /// Its initial priority.
        priority: Priority,
    },
    /// A context switch dispatched this thread.
    Dispatched {
        /// The incoming thread.
        thread: ThreadId,
        /// Tick counter value at dispatch.
        at: Tick,
    },
    /// The running thread blocked.
    Blocked {
        /// The blocking thread.
        thread: ThreadId,
    },
    /// A blocked thread was made READY.
    Unblocked {
        /// The woken thread.
        thread: ThreadId,
    },
    /// The running thread registered a wake tick and went to sleep.
    Slept {
        /// The sleeping thread.
        thread: ThreadId,
        /// The tick it asked to be woken at.
        due: Tick,
    },
    /// A donation boosted a lock holder.
    Donated {
        /// The boosting thread.
        donor: ThreadId,
        /// The boosted lock holder.
        receiver: ThreadId,
        /// The priority the receiver was raised to.
        priority: Priority,
        /// True for a non-first hop of a donation chain.
        nested: bool,
    },
    /// A lock release refunded donated priority.
    Refunded {
        /// The releasing thread.
        receiver: ThreadId,
        /// Its effective priority after the refund.
        restored: Priority,
    },
    /// The running thread exited.
    Exited {
        /// The exiting thread.
        thread: ThreadId,
    },
}

/// Fixed-capacity ring of [`SchedEvent`]s, oldest overwritten first.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<SchedEvent>>,
    head: usize,
    len: usize,
}

impl EventBuffer {
    /// Creates a buffer holding at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    /// Returns the buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    /// Returns the number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no events are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends an event, overwriting the oldest when full.
    pub fn push(&mut self, event: SchedEvent) {
        let index = (self.head + self.len) % self.events.len();
        self.events[index] = Some(event);
        if self.len < self.events.len() {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % self.events.len();
        }
    }

    /// Iterates stored events oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &SchedEvent> {
        (0..self.len).filter_map(move |i| {
            let index = (self.head + i) % self.events.len();
            self.events[index].as_ref()
        })
    }

    /// Returns the most recent event.
    #[must_use]
    pub fn last(&self) -> Option<&SchedEvent> {
        if self.len == 0 {
            return None;
        }
        let index = (self.head + self.len - 1) % self.events.len();
        self.events[index].as_ref()
    }

    /// Returns the dispatch order recorded so far.
    #[must_use]
    pub fn dispatches(&self) -> Vec<ThreadId> {
        self.iter()
            .filter_map(|event| match event {
                SchedEvent::Dispatched { thread, .. } => Some(*thread),
                _ => None,
            })
            .collect()
    }

    /// Discards all stored events.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}
