use std::fmt::Display;
use std::fmt::Formatter;
use std::time::Duration;

const SECS_PER_HOUR: f64 = 3_600.0;

/// Operations per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rate(pub f64);

impl Rate {
    /// `ops` over `duration`; zero if nothing elapsed.
    pub fn rate(duration: Duration, ops: u64) -> Rate {
        let secs = duration.as_secs_f64();
        if secs == 0.0 {
            Rate(0.0)
        } else {
            Rate(ops as f64 / secs)
        }
    }

    pub fn maybe_rate(duration: Duration, ops: Option<u64>) -> Option<Rate> {
        ops.map(|ops| Self::rate(duration, ops))
    }

    #[inline]
    pub fn per_sec(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn per_hour(&self) -> f64 {
        self.0 * SECS_PER_HOUR
    }

    /// Complete passes over a mix of `mix_len` queries per hour.
    pub fn mixes_per_hour(&self, mix_len: usize) -> f64 {
        if mix_len == 0 {
            0.0
        } else {
            self.per_hour() / mix_len as f64
        }
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut unaligned = {
            if f.alternate() {
                format!("{:.1}/h", self.per_hour())
            } else {
                match self.0 {
                    val if val > 1_000_000.0 => format!("{:.3} M/s", val / 1_000_000.0),
                    val if val > 1_000.0 => format!("{:.3} k/s", val / 1_000.0),
                    val => format!("{val:.3} /s"),
                }
            }
        };

        if let Some(width) = f.width() {
            while unaligned.len() < width {
                unaligned.insert(0, ' ');
            }
        }
        f.write_str(&unaligned)
    }
}
