#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

pub use quantum::test_utils::init_test_logging;
pub use quantum::{assert_with_log, test_complete, test_phase, test_section};

use quantum::{Kernel, KernelConfig};

/// Logging + phase banner for one test.
pub fn init_test(name: &str) {
    init_test_logging();
    test_phase!(name);
}

/// Entry function for threads whose body the test drives itself.
pub fn noop_entry(_arg: usize) {}

/// A kernel under the default priority-donation discipline.
#[must_use]
pub fn kernel() -> Kernel {
    Kernel::new(KernelConfig::default())
}

/// A kernel under the MLFQS discipline.
#[must_use]
pub fn mlfqs_kernel() -> Kernel {
    Kernel::new(KernelConfig::new().mlfqs(true))
}

/// Plays the timer: ticks through `from..=to`, delivering slice preemption
/// on interrupt return exactly when the kernel asks for it.
pub fn drive_ticks(kernel: &mut Kernel, from: u64, to: u64) {
    for tick in from..=to {
        if kernel.handle_tick(tick) {
            kernel.yield_on_return();
        }
    }
}
