use std::ops::Range;
use std::time::{Duration, SystemTime};

/// A minimal specification of a 64-bit random number generator.
pub trait Rand64 {
    /// Return the next random `u64`.
    fn next_u64(&mut self) -> u64;

    /// Returns a `bool` with a probability `p` of being true.
    ///
    /// # Example
    /// ```
    /// use qmix::rand::{Probability, Rand64, Wyrand};
    /// let mut rng = Wyrand::default();
    /// println!("{}", rng.next_bool(Probability::new(1.0 / 3.0)));
    /// ```
    #[inline]
    fn next_bool(&mut self, p: Probability) -> bool {
        let cutoff = (p.0 * u64::MAX as f64) as u64;
        let mut next = self.next_u64();
        if next == u64::MAX {
            // guarantees that next_bool(p=1.0) is always true
            next = u64::MAX - 1;
        }
        next < cutoff
    }

    /// Returns a value uniformly distributed in `0..bound`. `bound` must be nonzero.
    #[inline]
    fn next_below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        self.next_u64() % bound
    }
}

/// Represents a probability in the range \[0, 1\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probability(f64);

impl Probability {
    /// Creates a new [`Probability`] value, bounded in the range \[0, 1\].
    ///
    /// # Example
    /// ```
    /// use qmix::rand::Probability;
    /// let p = Probability::new(0.25);
    /// assert_eq!(0.25, f64::from(p));
    /// ```
    ///
    /// # Panics
    /// If `p < 0` or `p > 1`.
    pub fn new(p: f64) -> Self {
        assert!(p >= 0f64, "p ({p}) cannot be less than 0");
        assert!(p <= 1f64, "p ({p}) cannot be greater than 1");
        Self(p)
    }

    /// Non-panicking counterpart of [`new`](Self::new); `None` for values outside \[0, 1\]
    /// (including NaN).
    pub fn try_new(p: f64) -> Option<Self> {
        (0f64..=1f64).contains(&p).then_some(Self(p))
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> Self {
        p.0
    }
}

impl From<f64> for Probability {
    fn from(p: f64) -> Self {
        Probability::new(p)
    }
}

/// The means for seeding an RNG.
pub trait Seeded {
    type Rng: Rand64;

    /// Creates a new [`Rand64`] instance from the given seed.
    fn seed(seed: u64) -> Self::Rng;
}

/// Randomly chooses a duration from a range.
pub trait RandDuration {
    fn gen_range(&mut self, range: Range<Duration>) -> Duration;
}

impl<R: Rand64> RandDuration for R {
    #[inline(always)]
    fn gen_range(&mut self, range: Range<Duration>) -> Duration {
        if range.is_empty() {
            return range.start;
        }
        let span = (range.end - range.start).as_nanos();
        let random = if span <= u64::MAX as u128 {
            self.next_below(span as u64) as u128
        } else {
            ((self.next_u64() as u128) << 64 | (self.next_u64() as u128)) % span
        };
        range.start + duration_from_nanos(random)
    }
}

/// [`Duration::from_nanos`] only accepts a `u64`; this is the `u128` counterpart of
/// [`Duration::as_nanos`].
#[inline(always)]
pub const fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = (nanos / NANOS_PER_SEC) as u64;
    let nanos = (nanos % NANOS_PER_SEC) as u32;
    Duration::new(secs, nanos)
}

/// Basic [Xorshift](https://en.wikipedia.org/wiki/Xorshift) RNG.
#[derive(Debug, Clone)]
pub struct Xorshift {
    seed: u64,
}

impl Default for Xorshift {
    fn default() -> Self {
        Self::seed(1)
    }
}

impl Rand64 for Xorshift {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        let mut s = self.seed;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.seed = s;
        s
    }
}

impl Seeded for Xorshift {
    type Rng = Xorshift;

    #[inline]
    fn seed(seed: u64) -> Self::Rng {
        // a zero seed disables Xorshift, rendering it (effectively) a constant; hence, we avoid it
        Self { seed: if seed == 0 { u64::MAX >> 1 } else { seed } }
    }
}

/// [Wyrand](https://github.com/wangyi-fudan/wyhash), a 64-bit generator with a 2^64
/// period that tolerates any seed, including zero.
#[derive(Debug, Clone)]
pub struct Wyrand {
    seed: u64,
}

impl Default for Wyrand {
    fn default() -> Self {
        Self::seed(0)
    }
}

impl Rand64 for Wyrand {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.seed = self.seed.wrapping_add(0xa076_1d64_78bd_642f);
        let t = (self.seed as u128).wrapping_mul((self.seed ^ 0xe703_7ed1_a0b4_28db) as u128);
        ((t >> 64) ^ t) as u64
    }
}

impl Seeded for Wyrand {
    type Rng = Wyrand;

    #[inline]
    fn seed(seed: u64) -> Self::Rng {
        Self { seed }
    }
}

/// Derives the seed of an independent stream from a run seed, so that several generators
/// created from one run seed do not replay each other's sequence.
#[inline]
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    // SplitMix64 finalizer
    let mut z = seed.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Derives a seed from the system clock by XORing the upper 64 bits of the nanosecond timestamp
/// with the lower 64 bits.
pub fn clock_seed() -> u64 {
    let time = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let folded = (time >> 64) ^ time;
    folded as u64
}

#[cfg(test)]
mod tests;
