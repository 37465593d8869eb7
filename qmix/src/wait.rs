use crate::deadline::Deadline;
use std::cmp::Ordering;
use std::time::Duration;
use std::{hint, thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

pub type WaitResult = Result<(), TimedOut>;

/// Polls a condition until it holds or a deadline passes.
pub trait Wait {
    fn wait_until<C>(condition: C, deadline: Deadline) -> WaitResult
    where
        C: FnMut() -> bool;

    #[inline(always)]
    fn wait_for<C>(condition: C, duration: Duration) -> WaitResult
    where
        C: FnMut() -> bool,
    {
        Self::wait_until(condition, Deadline::lazy_after(duration))
    }

    #[inline(always)]
    fn wait_for_inequality<T, G>(
        mut lhs_f: G,
        mut cmp: impl FnMut(Ordering) -> bool,
        rhs: &T,
        duration: Duration,
    ) -> WaitResult
    where
        T: Ord,
        G: FnMut() -> T,
    {
        Self::wait_for(|| cmp(lhs_f().cmp(rhs)), duration)
    }
}

/// Spins briefly, then backs off with sleeps that double up to a ceiling.
pub struct Spin;

const SPIN_ITERS: u32 = 100;
const MIN_SLEEP: Duration = Duration::from_micros(100);
const MAX_SLEEP: Duration = Duration::from_millis(10);

impl Wait for Spin {
    fn wait_until<C>(mut condition: C, mut deadline: Deadline) -> WaitResult
    where
        C: FnMut() -> bool,
    {
        let mut iterations = 0u32;
        let mut sleep = MIN_SLEEP;
        while !condition() {
            if deadline.is_elapsed() {
                return Err(TimedOut);
            }
            if iterations < SPIN_ITERS {
                iterations += 1;
                hint::spin_loop();
            } else {
                thread::sleep(sleep.min(deadline.remaining()));
                sleep = (sleep * 2).min(MAX_SLEEP);
            }
        }
        Ok(())
    }
}
