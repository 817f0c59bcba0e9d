//! Priority-donation records.

use crate::types::{LockId, Priority, ThreadId};

/// One edge of the wait-for graph: a donor boosting a lock holder.
///
/// Records are created when a higher-priority thread blocks acquiring a
/// held lock, kept in a single collection ordered by descending donor
/// priority, and retired by the refund scan when the lock is released.
///
/// Invariant: while a record is live, its receiver's effective priority is
/// at least `donor_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonationRecord {
    /// The boosting thread.
    pub donor: ThreadId,
    /// The donor's effective priority when the record was created.
    pub donor_priority: Priority,
    /// The contended lock.
    pub lock: LockId,
    /// The lock holder that received the boost.
    pub receiver: ThreadId,
    /// The receiver's effective priority just before the boost.
    pub receiver_prior: Priority,
    /// True if this record was not the first hop of its donation pass, or
    /// if a later pass walked through its donor. A nested record's refund
    /// must leave the donor's priority alone.
    pub nested: bool,
}
