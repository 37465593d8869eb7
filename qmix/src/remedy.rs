use std::sync::{Condvar, LockResult, MutexGuard};
use std::time::Duration;

/// Unpacks a lock result, extracting the guard whether or not the lock was poisoned.
///
/// Workers never leave shared state half-updated across a panic (every mutation of a
/// channel or pool is a single push or insert), so a poisoned lock still guards
/// consistent data and the driver keeps going.
pub trait Remedy<T> {
    fn remedy(self) -> T;
}

impl<T> Remedy<T> for LockResult<T> {
    #[inline(always)]
    fn remedy(self) -> T {
        match self {
            Ok(inner) => inner,
            Err(error) => error.into_inner(),
        }
    }
}

/// Waits on `cond` for at most `duration`, returning the reacquired guard and whether
/// the wait timed out. [`Duration::ZERO`] returns immediately as timed out;
/// [`Duration::MAX`] waits without a timeout.
#[inline(always)]
pub fn cond_wait<'a, T>(
    cond: &Condvar,
    guard: MutexGuard<'a, T>,
    duration: Duration,
) -> (MutexGuard<'a, T>, bool) {
    if duration.is_zero() {
        (guard, true)
    } else if duration == Duration::MAX {
        (cond.wait(guard).remedy(), false)
    } else {
        let (guard, result) = cond.wait_timeout(guard, duration).remedy();
        (guard, result.timed_out())
    }
}
