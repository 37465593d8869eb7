use crate::manager::PoolSummary;
use crate::query::QueryResult;
use crate::rand::duration_from_nanos;
use crate::rate::Rate;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one query type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub successes: u64,
    pub failures: u64,
    /// Subset of `failures`.
    pub timeouts: u64,
    pub total_latency: Duration,
    pub min_latency: Option<Duration>,
    pub max_latency: Duration,
}

impl QueryStats {
    #[inline]
    pub fn executed(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn mean_latency(&self) -> Option<Duration> {
        match self.executed() {
            0 => None,
            n => Some(duration_from_nanos(self.total_latency.as_nanos() / n as u128)),
        }
    }

    fn record(&mut self, result: &QueryResult) {
        match result.error() {
            None => self.successes += 1,
            Some(err) => {
                self.failures += 1;
                if err.is_timeout() {
                    self.timeouts += 1;
                }
            }
        }
        self.total_latency += result.elapsed;
        self.min_latency = Some(self.min_latency.map_or(result.elapsed, |min| min.min(result.elapsed)));
        self.max_latency = self.max_latency.max(result.elapsed);
    }

    pub fn merge(&mut self, other: &QueryStats) {
        self.successes += other.successes;
        self.failures += other.failures;
        self.timeouts += other.timeouts;
        self.total_latency += other.total_latency;
        self.min_latency = match (self.min_latency, other.min_latency) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_latency = self.max_latency.max(other.max_latency);
    }
}

/// Statistics of one or more waves. Confined to the aggregating thread; every fold and
/// merge is commutative, so arrival order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub per_kind: BTreeMap<String, QueryStats>,
    pub skipped: u64,
    pub suppressed: u64,
    /// Wall-clock span of the waves folded in.
    pub elapsed: Duration,
    pub workers: usize,
    /// Templates in the mix that drove these waves, for mix-level throughput.
    pub mix_len: usize,
}

impl RunStatistics {
    pub fn fold(&mut self, result: &QueryResult) {
        if let Some(stats) = self.per_kind.get_mut(result.kind()) {
            stats.record(result);
        } else {
            let mut stats = QueryStats::default();
            stats.record(result);
            self.per_kind.insert(result.kind().to_string(), stats);
        }
    }

    /// Takes the wave's worker-side tallies: skips, suppressions and wall-clock span.
    pub fn record_pool(&mut self, pool: &PoolSummary) {
        self.skipped += pool.summary.skipped;
        self.suppressed += pool.summary.suppressed;
        self.elapsed += pool.elapsed;
        self.workers = self.workers.max(pool.workers);
    }

    /// Combines the statistics of two waves run one after the other.
    pub fn merge(&mut self, other: &RunStatistics) {
        for (kind, stats) in &other.per_kind {
            self.per_kind.entry(kind.clone()).or_default().merge(stats);
        }
        self.skipped += other.skipped;
        self.suppressed += other.suppressed;
        self.elapsed += other.elapsed;
        self.workers = self.workers.max(other.workers);
        self.mix_len = self.mix_len.max(other.mix_len);
    }

    pub fn merged<'a, I: IntoIterator<Item = &'a RunStatistics>>(all: I) -> RunStatistics {
        let mut total = RunStatistics::default();
        for stats in all {
            total.merge(stats);
        }
        total
    }

    pub fn successes(&self) -> u64 {
        self.per_kind.values().map(|s| s.successes).sum()
    }

    pub fn failures(&self) -> u64 {
        self.per_kind.values().map(|s| s.failures).sum()
    }

    pub fn timeouts(&self) -> u64 {
        self.per_kind.values().map(|s| s.timeouts).sum()
    }

    pub fn executed(&self) -> u64 {
        self.successes() + self.failures()
    }

    pub fn is_empty(&self) -> bool {
        self.per_kind.is_empty()
    }

    pub fn throughput(&self) -> Rate {
        Rate::rate(self.elapsed, self.executed())
    }

    pub fn mixes_per_hour(&self) -> f64 {
        self.throughput().mixes_per_hour(self.mix_len)
    }
}
