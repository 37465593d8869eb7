use clap::ValueEnum;
use parking_lot::Mutex;
use qmix::endpoint::{Endpoint, FnEndpoint};
use qmix::error::QueryError;
use qmix::query::{BoundQuery, RowSet};
use qmix::rand::{Probability, Rand64, RandDuration, Seeded, Wyrand};
use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Stands in for a database: sleeps for a random latency, fails at a set rate and
/// otherwise answers with synthetic rows.
///
/// Rows carry one column named after the template's entity column (or `value`), each
/// value derived from the query's first parameter, so that feedback has something to
/// harvest.
#[derive(Debug)]
pub struct SimulatedEndpoint {
    name: String,
    latency: Range<Duration>,
    failure: Probability,
    rows: Range<usize>,
    rng: Mutex<Wyrand>,
}

impl SimulatedEndpoint {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO..Duration::ZERO,
            failure: Probability::new(0.0),
            rows: 1..2,
            rng: Mutex::new(Wyrand::seed(seed)),
        }
    }

    pub fn with_latency(mut self, latency: Range<Duration>) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_failure(mut self, failure: Probability) -> Self {
        self.failure = failure;
        self
    }

    pub fn with_rows(mut self, rows: Range<usize>) -> Self {
        self.rows = rows;
        self
    }
}

impl Endpoint for SimulatedEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, query: &BoundQuery, timeout: Duration) -> Result<RowSet, QueryError> {
        let (latency, failed, rows) = {
            let mut rng = self.rng.lock();
            let latency = rng.gen_range(self.latency.clone());
            let failed = rng.next_bool(self.failure);
            let rows = if self.rows.is_empty() {
                self.rows.start
            } else {
                self.rows.start + rng.next_below((self.rows.end - self.rows.start) as u64) as usize
            };
            (latency, failed, rows)
        };

        if latency > timeout {
            thread::sleep(timeout);
            return Err(QueryError::Timeout(timeout));
        }
        thread::sleep(latency);
        if failed {
            return Err(QueryError::Endpoint(format!("{}: simulated failure", self.name)));
        }

        let template = query.template();
        let key = template
            .params()
            .first()
            .and_then(|param| query.params().get(param))
            .unwrap_or(template.name());
        let mut row_set = RowSet::new([template.entity_column().unwrap_or("value")]);
        for i in 0..rows {
            row_set.push_row([format!("{key}.{i}")]);
        }
        Ok(row_set)
    }
}

/// Which kind of endpoint the harness drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EndpointKind {
    /// Random latency and failures; see [`SimulatedEndpoint`].
    Simulated,
    /// Answers at once with an empty row set; measures driver overhead alone.
    Instant,
    /// Never answers in time.
    Unreachable,
}

/// Parameters of the endpoints built by [`EndpointKind::build`].
#[derive(Debug, Clone)]
pub struct EndpointOptions {
    pub latency: Range<Duration>,
    pub failure: Probability,
    pub rows: Range<usize>,
    pub seed: u64,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            latency: Duration::from_micros(50)..Duration::from_micros(500),
            failure: Probability::new(0.0),
            rows: 1..8,
            seed: 0,
        }
    }
}

impl EndpointKind {
    pub fn build(&self, name: &str, opts: &EndpointOptions) -> Arc<dyn Endpoint> {
        match self {
            EndpointKind::Simulated => Arc::new(
                SimulatedEndpoint::new(name, opts.seed)
                    .with_latency(opts.latency.clone())
                    .with_failure(opts.failure)
                    .with_rows(opts.rows.clone()),
            ),
            EndpointKind::Instant => Arc::new(FnEndpoint::new(name, |_, _| Ok(RowSet::default()))),
            EndpointKind::Unreachable => Arc::new(FnEndpoint::new(name, |_, timeout| Err(QueryError::Timeout(timeout)))),
        }
    }
}
