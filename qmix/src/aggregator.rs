use crate::channel::ResultChannel;
use crate::error::CollectorError;
use crate::manager::ClientManager;
use crate::pool::ParameterPool;
use crate::query::{Phase, QueryResult};
use crate::rand::{Probability, Rand64, Seeded, Wyrand};
use crate::sink::{QualificationComparator, QualificationSummary, ResultCollector};
use crate::stats::RunStatistics;
use tracing::{debug, info, warn};

/// Bernoulli decisions drawn from one seeded stream for the whole run.
#[derive(Debug, Clone)]
pub struct FeedbackSampler<R = Wyrand> {
    rng: R,
    probability: Probability,
}

impl<R: Rand64 + Seeded<Rng = R>> FeedbackSampler<R> {
    pub fn new(seed: u64, probability: Probability) -> Self {
        Self {
            rng: R::seed(seed),
            probability,
        }
    }
}

impl<R: Rand64> FeedbackSampler<R> {
    #[inline]
    pub fn sample(&mut self) -> bool {
        self.rng.next_bool(self.probability)
    }

    #[inline]
    pub fn probability(&self) -> Probability {
        self.probability
    }
}

/// Where harvested values go during the primary wave.
pub struct FeedbackTarget<'a> {
    pub pool: &'a dyn ParameterPool,
    /// The pool kind harvested values are injected under.
    pub kind: &'a str,
    /// Gains one pending run per harvested value; must not have been started.
    pub secondary: &'a mut ClientManager,
}

/// The wave whose channel is being drained; decides which steps apply to each result.
pub enum Wave<'a> {
    Warmup,
    Primary { feedback: Option<FeedbackTarget<'a>> },
    Secondary,
}

impl Wave<'_> {
    fn phase(&self) -> Phase {
        match self {
            Wave::Warmup => Phase::Warmup,
            Wave::Primary { .. } => Phase::Primary,
            Wave::Secondary => Phase::Secondary,
        }
    }
}

/// What the aggregator has to report once every wave is drained.
#[derive(Debug, Default)]
pub struct AggregatorOutcome {
    pub qualification: Option<QualificationSummary>,
    pub collector_error: Option<CollectorError>,
    pub warmup_discarded: u64,
    pub feedback_harvested: u64,
}

/// The single consumer of result channels.
pub struct ResultAggregator {
    comparator: Option<Box<dyn QualificationComparator>>,
    collector: Option<Box<dyn ResultCollector>>,
    sampler: FeedbackSampler,
    print_results: bool,
    collector_error: Option<CollectorError>,
    warmup_discarded: u64,
    feedback_harvested: u64,
}

impl ResultAggregator {
    pub fn new(sampler: FeedbackSampler) -> Self {
        Self {
            comparator: None,
            collector: None,
            sampler,
            print_results: false,
            collector_error: None,
            warmup_discarded: 0,
            feedback_harvested: 0,
        }
    }

    pub fn with_comparator(mut self, comparator: Box<dyn QualificationComparator>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn with_collector(mut self, collector: Box<dyn ResultCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn with_print_results(mut self, print_results: bool) -> Self {
        self.print_results = print_results;
        self
    }

    #[inline]
    pub fn warmup_discarded(&self) -> u64 {
        self.warmup_discarded
    }

    #[inline]
    pub fn feedback_harvested(&self) -> u64 {
        self.feedback_harvested
    }

    /// Takes from `channel` until the sentinel, returning the statistics folded from the
    /// wave's results. Warmup results are counted and dropped.
    pub fn drain(&mut self, channel: &ResultChannel, mut wave: Wave<'_>) -> RunStatistics {
        let mut statistics = RunStatistics::default();
        let mut received = 0u64;
        while let Some(result) = channel.take() {
            received += 1;
            if self.print_results {
                print_result(&result);
            }
            if result.phase == Phase::Warmup {
                self.warmup_discarded += 1;
                continue;
            }

            if matches!(wave, Wave::Primary { .. }) {
                if let Some(comparator) = self.comparator.as_mut() {
                    comparator.add_result(&result);
                }
            }
            self.collect(&result);
            statistics.fold(&result);
            if let Wave::Primary { feedback: Some(target) } = &mut wave {
                self.harvest(&result, target);
            }
        }
        debug!(phase = %wave.phase(), received, "channel drained");
        statistics
    }

    fn collect(&mut self, result: &QueryResult) {
        // a failed collector is not written to again
        if self.collector_error.is_some() {
            return;
        }
        if let Some(collector) = self.collector.as_mut() {
            if let Err(err) = collector.add_result(result) {
                warn!(%err, "cannot persist result; collection stopped");
                self.collector_error = Some(err);
            }
        }
    }

    fn harvest(&mut self, result: &QueryResult, target: &mut FeedbackTarget<'_>) {
        let (Some(rows), Some(column)) = (result.rows(), result.template.entity_column()) else {
            return;
        };
        let Some(index) = rows.column(column) else {
            return;
        };
        for row in &rows.rows {
            let Some(value) = row.get(index) else {
                continue;
            };
            if !self.sampler.sample() {
                continue;
            }
            if let Err(err) = target.secondary.add_runs(1) {
                warn!(%err, "secondary wave no longer accepts runs");
                return;
            }
            target.pool.inject_feedback(target.kind, value.clone());
            self.feedback_harvested += 1;
        }
    }

    /// Closes the collector and produces the qualification summary. The collector error,
    /// if any, is the first one seen: from a write, or else from the close.
    pub fn finish(mut self) -> AggregatorOutcome {
        if let Some(mut collector) = self.collector.take() {
            if let Err(err) = collector.close() {
                warn!(%err, "cannot close result collector");
                self.collector_error.get_or_insert(err);
            }
        }
        let qualification = self.comparator.as_ref().map(|comparator| comparator.report_total());
        if let Some(qualification) = &qualification {
            info!(
                checked = qualification.checked,
                matched = qualification.matched,
                mismatched = qualification.mismatches.len(),
                "qualification finished"
            );
        }
        AggregatorOutcome {
            qualification,
            collector_error: self.collector_error,
            warmup_discarded: self.warmup_discarded,
            feedback_harvested: self.feedback_harvested,
        }
    }
}

fn print_result(result: &QueryResult) {
    match &result.outcome {
        Ok(rows) => debug!(
            seq = result.seq,
            query = result.kind(),
            phase = %result.phase,
            endpoint = result.endpoint.as_str(),
            elapsed = ?result.elapsed,
            rows = rows.len(),
            "{}",
            result.query
        ),
        Err(err) => debug!(
            seq = result.seq,
            query = result.kind(),
            phase = %result.phase,
            endpoint = result.endpoint.as_str(),
            elapsed = ?result.elapsed,
            %err,
            "{}",
            result.query
        ),
    }
}
