use crate::remedy;
use crate::remedy::Remedy;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// What [`Monitor::enter`] should do after evaluating its closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Leave the monitor, holding the lock.
    Return,
    /// Park until notified or until the duration elapses, then evaluate the closure again.
    /// A timed-out wait leaves the monitor without re-evaluating.
    Wait(Duration),
    NotifyOne,
    NotifyAll,
}

struct Tracker<S> {
    waiting: u32,
    data: S,
}

/// A mutex paired with a condition variable, where the caller expresses each step of a
/// wait/notify protocol as a closure over the guarded state.
pub struct Monitor<S> {
    tracker: Mutex<Tracker<S>>,
    cond: Condvar,
}

impl<S: Default> Default for Monitor<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Monitor<S> {
    #[inline]
    pub fn new(s: S) -> Self {
        Self {
            tracker: Mutex::new(Tracker { waiting: 0, data: s }),
            cond: Condvar::new(),
        }
    }

    /// Repeatedly evaluates `f` over the guarded state, acting on the returned
    /// [`Directive`] until it yields control back to the caller.
    ///
    /// # Examples
    /// ```
    /// use qmix::monitor::{Directive, Monitor};
    /// let monitor = Monitor::new(0u32);
    /// let guard = monitor.enter(|count| {
    ///     *count += 1;
    ///     Directive::NotifyAll
    /// });
    /// assert_eq!(1, *guard);
    /// ```
    pub fn enter<F: FnMut(&mut S) -> Directive>(&self, mut f: F) -> MonitorGuard<S> {
        let mut guard = self.tracker.lock().remedy();
        loop {
            match f(&mut guard.data) {
                Directive::Return => return MonitorGuard { guard },
                Directive::Wait(duration) => {
                    if duration.is_zero() {
                        return MonitorGuard { guard };
                    }
                    guard.waiting += 1;
                    let (mut reacquired, timed_out) = remedy::cond_wait(&self.cond, guard, duration);
                    reacquired.waiting -= 1;
                    guard = reacquired;
                    if timed_out {
                        return MonitorGuard { guard };
                    }
                }
                Directive::NotifyOne => {
                    if guard.waiting > 0 {
                        self.cond.notify_one();
                    }
                    return MonitorGuard { guard };
                }
                Directive::NotifyAll => {
                    if guard.waiting > 0 {
                        self.cond.notify_all();
                    }
                    return MonitorGuard { guard };
                }
            }
        }
    }

    #[inline]
    pub fn lock(&self) -> MonitorGuard<S> {
        MonitorGuard {
            guard: self.tracker.lock().remedy(),
        }
    }

    /// Invokes the given closure exactly once over the guarded state, without waiting or
    /// notifying.
    #[inline]
    pub fn alter<F: FnOnce(&mut S)>(&self, f: F) {
        let mut guard = self.lock();
        f(&mut guard);
    }

    #[inline]
    pub fn compute<T, F: FnOnce(&S) -> T>(&self, f: F) -> T {
        let guard = self.lock();
        f(&guard)
    }

    /// Number of threads currently parked in [`enter`](Self::enter).
    pub fn num_waiting(&self) -> u32 {
        self.tracker.lock().remedy().waiting
    }

    pub fn into_inner(self) -> S {
        self.tracker.into_inner().remedy().data
    }
}

impl<S: fmt::Debug> fmt::Debug for Monitor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Monitor");
        match self.tracker.try_lock() {
            Ok(guard) => {
                d.field("data", &guard.data);
            }
            Err(_) => {
                d.field("data", &format_args!("<locked>"));
            }
        }
        d.finish_non_exhaustive()
    }
}

pub struct MonitorGuard<'a, S> {
    guard: MutexGuard<'a, Tracker<S>>,
}

impl<S> Deref for MonitorGuard<'_, S> {
    type Target = S;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.guard.data
    }
}

impl<S> DerefMut for MonitorGuard<'_, S> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard.data
    }
}
