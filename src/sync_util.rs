//! Small shared helpers for guarding state behind `std::sync::Mutex`.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering from poisoning rather than propagating the
/// panic of whichever task held the lock. A single stats/history/job-handle
/// writer panicking must not wedge every other task reading it.
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
