use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out a strictly increasing sequence of identifiers, safe to share between threads.
///
/// Each component that needs unique identifiers owns (or is handed) its own generator;
/// there is no process-wide counter.
///
/// # Examples
/// ```
/// use qmix::sequence::SequenceGenerator;
/// let ids = SequenceGenerator::new(5, 2);
/// assert_eq!(5, ids.next());
/// assert_eq!(7, ids.next());
/// assert_eq!(9, ids.peek());
/// ```
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicU64,
    step: u64,
}

impl SequenceGenerator {
    #[inline]
    pub fn new(start: u64, step: u64) -> Self {
        assert!(step > 0, "step cannot be zero");
        Self {
            next: AtomicU64::new(start),
            step,
        }
    }

    #[inline]
    pub fn next(&self) -> u64 {
        self.next.fetch_add(self.step, Ordering::Relaxed)
    }

    #[inline]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequenceGenerator {
    #[inline]
    fn default() -> Self {
        Self::new(0, 1)
    }
}
