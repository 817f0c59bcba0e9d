//! Priority-donation engine.
//!
//! When a thread blocks on a lock held by something lower priority, the
//! holder inherits the waiter's priority for as long as it stands between
//! the waiter and the lock. The inheritance is transitive: if the holder is
//! itself blocked on another lock, the boost walks the chain of
//! `blocked_on` edges, raising every holder along the way. Each raised hop
//! leaves a [`DonationRecord`] in a single collection ordered by descending
//! donor priority; releasing a lock scans that collection to unwind exactly
//! the boosts the lock justified.
//!
//! The walk does not detect cycles. A wait-for cycle is a deadlock the
//! surrounding locking discipline is assumed to prevent; here it would
//! spin, not resolve.

use crate::kernel::Kernel;
use crate::record::{DonationRecord, ThreadState};
use crate::trace::SchedEvent;
use crate::types::{LockId, ThreadId};

impl Kernel {
    /// Returns the number of live donation records.
    #[must_use]
    pub fn donation_count(&self) -> usize {
        self.donations.len()
    }

    /// Boosts the holder chain of `lock` to `donor`'s priority.
    ///
    /// Called when `donor` is about to wait on `lock` and outranks its
    /// holder. Each hop raises only while the donor still strictly
    /// outranks the next receiver; the donor's own priority is never
    /// touched.
    pub(crate) fn donate_priority(&mut self, donor: ThreadId, lock: LockId) {
        let donor_priority = self.thread(donor).effective_priority;
        let mut lock = lock;
        let mut nested = false;
        loop {
            let receiver = self
                .locks
                .get(lock.arena_index())
                .unwrap_or_else(|| panic!("stale lock handle {lock}"))
                .holder
                .expect("donation requires a held lock");
            let receiver_prior = self.thread(receiver).effective_priority;
            if donor_priority <= receiver_prior {
                break;
            }

            let position = self
                .donations
                .iter()
                .position(|record| donor_priority > record.donor_priority)
                .unwrap_or(self.donations.len());
            self.donations.insert(
                position,
                DonationRecord {
                    donor,
                    donor_priority,
                    lock,
                    receiver,
                    receiver_prior,
                    nested,
                },
            );

            self.thread_mut(receiver).effective_priority = donor_priority;
            if self.thread(receiver).state == ThreadState::Ready {
                // Dispatch order must reflect the boost immediately.
                self.ready.reposition(receiver, &self.threads);
            }
            self.trace.push(SchedEvent::Donated {
                donor,
                receiver,
                priority: donor_priority,
                nested,
            });
            tracing::debug!(
                donor = %donor,
                receiver = %receiver,
                priority = donor_priority,
                nested,
                "priority donated"
            );

            match self.thread(receiver).blocked_on {
                Some(next_lock) => {
                    // The receiver's own donations become interior links of
                    // a longer chain; their refunds must no longer touch
                    // the receiver as donor.
                    for record in &mut self.donations {
                        if record.donor == receiver && record.lock == next_lock {
                            record.nested = true;
                        }
                    }
                    lock = next_lock;
                    nested = true;
                }
                None => break,
            }
        }
    }

    /// Unwinds the boosts that releasing `lock` no longer justifies.
    ///
    /// Scans the record collection (descending donor priority) for records
    /// naming the running thread as receiver through `lock`. A record whose
    /// donor priority matches the current effective priority restores the
    /// receiver's prior value; for non-nested records the donor's recorded
    /// priority is restored as well. A record outranked by a still-active
    /// higher donation gets the lesser restoration. Matched records move to
    /// the pending-free list and are dropped by [`Kernel::free_donations`]
    /// once the caller is done with the release.
    pub(crate) fn refund_priority(&mut self, lock: LockId) {
        let current = self.current;
        let base = self.thread(current).base_priority;
        let mut effective = self.thread(current).effective_priority;
        let mut donor_restores: Vec<(ThreadId, i32)> = Vec::new();
        let mut other_records_remain = false;

        let mut index = 0;
        while index < self.donations.len() {
            let record = &self.donations[index];
            if record.receiver == current && record.lock == lock {
                let record = self.donations.remove(index);
                if record.donor_priority == effective {
                    effective = record.receiver_prior;
                    if !record.nested {
                        donor_restores.push((record.donor, record.donor_priority));
                    }
                } else if record.donor_priority < effective {
                    if record.nested {
                        effective = record.receiver_prior;
                    } else {
                        donor_restores.push((record.donor, record.donor_priority));
                    }
                }
                self.retired.push(record);
            } else {
                if record.receiver == current {
                    other_records_remain = true;
                }
                index += 1;
            }
        }

        if !other_records_remain {
            effective = base;
        }
        if base > effective {
            // The owner lowered its base while boosted; the deferred drop
            // lands here.
            effective = base;
        }
        // Donations through other locks still bound the receiver from
        // below.
        let floor = self
            .donations
            .iter()
            .filter(|record| record.receiver == current)
            .map(|record| record.donor_priority)
            .max();
        if let Some(floor) = floor {
            effective = effective.max(floor);
        }

        self.thread_mut(current).effective_priority = effective;
        self.trace.push(SchedEvent::Refunded {
            receiver: current,
            restored: effective,
        });
        tracing::debug!(receiver = %current, restored = effective, "donation refunded");

        for (donor, priority) in donor_restores {
            let record = self.thread_mut(donor);
            // A donor that picked up a later, higher boost keeps it.
            if record.effective_priority <= priority {
                record.effective_priority = priority;
            }
        }
    }

    /// Drops the records retired by the last refund scan.
    pub(crate) fn free_donations(&mut self) {
        self.retired.clear();
    }
}
