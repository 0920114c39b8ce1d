//! Process-level failure flag.
//!
//! A failed compilation marks the process exit code in addition to returning
//! the failure, so scripted callers that drop the result still observe it.

use std::sync::atomic::{AtomicI32, Ordering};

static EXIT_CODE: AtomicI32 = AtomicI32::new(0);

/// Mark the process as failed. Sticky until [`reset`].
pub fn mark_failure() {
    EXIT_CODE.store(1, Ordering::SeqCst);
}

/// Exit code the process should terminate with.
pub fn current() -> i32 {
    EXIT_CODE.load(Ordering::SeqCst)
}

pub fn reset() {
    EXIT_CODE.store(0, Ordering::SeqCst);
}
