use std::time::{Duration, Instant};

/// A point in time after which a blocking operation gives up. The clock is read
/// lazily, on the first call to [`remaining`](Deadline::remaining), so constructing
/// a deadline that is never consulted costs nothing.
#[derive(Debug)]
pub enum Deadline {
    Point(Instant),
    Forever,
    Uninitialized(Duration),
    Elapsed,
}

impl Deadline {
    #[inline(always)]
    pub fn lazy_after(duration: Duration) -> Self {
        Self::Uninitialized(duration)
    }

    #[inline(always)]
    pub fn after(duration: Duration) -> Self {
        let mut deadline = Self::lazy_after(duration);
        deadline.ensure_initialized();
        deadline
    }

    #[inline(always)]
    fn ensure_initialized(&mut self) {
        if let Self::Uninitialized(duration) = self {
            *self = if *duration == Duration::MAX {
                Deadline::Forever
            } else if duration.is_zero() {
                Deadline::Elapsed
            } else {
                match Instant::now().checked_add(*duration) {
                    None => Deadline::Forever,
                    Some(instant) => Deadline::Point(instant),
                }
            };
        }
    }

    /// Time left until the deadline, saturating at zero.
    #[inline(always)]
    pub fn remaining(&mut self) -> Duration {
        self.ensure_initialized();
        match self {
            Deadline::Point(instant) => instant.saturating_duration_since(Instant::now()),
            Deadline::Forever => Duration::MAX,
            Deadline::Elapsed => Duration::ZERO,
            Deadline::Uninitialized(_) => unreachable!(),
        }
    }

    #[inline(always)]
    pub fn is_elapsed(&mut self) -> bool {
        self.remaining().is_zero()
    }
}
