use crate::channel::ResultChannel;
use crate::endpoint::Endpoint;
use crate::error::QueryError;
use crate::mix::QueryMix;
use crate::pool::ParameterPool;
use crate::query::{Phase, QueryResult, QueryTemplate};
use crate::sequence::SequenceGenerator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How many iterations a worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBudget {
    Bounded(u64),
    /// Runs until the stop flag is raised.
    UntilStopped,
}

impl RunBudget {
    #[inline]
    fn allows(&self, completed: u64) -> bool {
        match self {
            RunBudget::Bounded(runs) => completed < *runs,
            RunBudget::UntilStopped => true,
        }
    }
}

/// Per-worker tallies, merged by the owning manager once every worker has exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Queries sent to the endpoint and published, failed or not.
    pub executed: u64,
    pub failed: u64,
    /// Iterations abandoned because the pool could not bind the template.
    pub skipped: u64,
    /// Update queries not issued during warmup.
    pub suppressed: u64,
}

impl WorkerSummary {
    #[inline]
    pub fn iterations(&self) -> u64 {
        self.executed + self.skipped + self.suppressed
    }

    pub fn merge(&mut self, other: &WorkerSummary) {
        self.executed += other.executed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.suppressed += other.suppressed;
    }
}

/// Everything one worker thread needs; moved onto that thread by the manager.
pub struct Worker {
    pub id: usize,
    pub mix: QueryMix,
    pub pool: Arc<dyn ParameterPool>,
    pub endpoint: Arc<dyn Endpoint>,
    pub channel: Arc<ResultChannel>,
    pub sequence: Arc<SequenceGenerator>,
    pub stop: Arc<AtomicBool>,
    pub phase: Phase,
    pub budget: RunBudget,
    pub timeout: Duration,
    pub allow_updates: bool,
}

impl Worker {
    /// Runs iterations until the budget is spent, the stop flag is raised, or the channel
    /// is closed underneath it. The flag is only checked between iterations, so an
    /// in-flight query always completes (or times out) first.
    pub fn run(self) -> WorkerSummary {
        let mut summary = WorkerSummary::default();
        let mut cursor = self.mix.cursor();
        while self.budget.allows(summary.iterations()) && !self.stop.load(Ordering::Acquire) {
            let Some(template) = cursor.next_template() else {
                warn!(worker = self.id, mix = self.mix.name(), "query mix is empty");
                break;
            };

            if self.phase == Phase::Warmup && template.is_update() && !self.allow_updates {
                summary.suppressed += 1;
                continue;
            }

            let result = match self.execute(&template) {
                Ok(result) => result,
                Err(err) => {
                    debug!(worker = self.id, query = template.name(), %err, "skipping iteration");
                    summary.skipped += 1;
                    continue;
                }
            };

            summary.executed += 1;
            if !result.is_success() {
                summary.failed += 1;
            }
            if self.channel.publish(result).is_err() {
                debug!(worker = self.id, "channel closed; exiting");
                break;
            }
        }
        debug!(worker = self.id, phase = %self.phase, ?summary, "worker finished");
        summary
    }

    /// Binds and executes one query. Only a binding failure is returned as an error; an
    /// endpoint failure is captured in the result.
    fn execute(&self, template: &Arc<QueryTemplate>) -> Result<QueryResult, QueryError> {
        let params = self.pool.bind(template)?;
        let bound = QueryTemplate::bind(template, params)?;

        let seq = self.sequence.next();
        let start = Instant::now();
        let outcome = self.endpoint.execute(&bound, self.timeout);
        let elapsed = start.elapsed();
        let outcome = match outcome {
            Ok(_) if elapsed > self.timeout => Err(QueryError::Timeout(self.timeout)),
            outcome => outcome,
        };

        Ok(QueryResult {
            seq,
            template: template.clone(),
            query: bound.text().to_string(),
            phase: self.phase,
            endpoint: self.endpoint.name().to_string(),
            elapsed,
            outcome,
        })
    }
}
