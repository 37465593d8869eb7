use crate::aggregator::{FeedbackSampler, FeedbackTarget, ResultAggregator, Wave};
use crate::config::DriverConfig;
use crate::endpoint::Endpoint;
use crate::error::{ConfigError, DriverError};
use crate::manager::ClientManager;
use crate::mix::QueryMix;
use crate::pool::ParameterPool;
use crate::query::Phase;
use crate::rand::{clock_seed, derive_seed};
use crate::remedy::Remedy;
use crate::report::{RunReport, StatisticsReport};
use crate::sink::{QualificationComparator, ResultCollector};
use crate::stats::RunStatistics;
use std::fmt::{Display, Formatter};
use std::io;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Stages of a run, in the order they are entered. `Warmup` and `SecondaryRun` are
/// skipped when they have nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configured,
    Warmup,
    PrimaryRun,
    SecondaryRun,
    Reported,
    Done,
}

impl Display for RunState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunState::Configured => "configured",
            RunState::Warmup => "warmup",
            RunState::PrimaryRun => "primary run",
            RunState::SecondaryRun => "secondary run",
            RunState::Reported => "reported",
            RunState::Done => "done",
        })
    }
}

/// Read-only view of an orchestrator's state, usable from other threads while
/// [`RunOrchestrator::run`] blocks.
#[derive(Debug, Clone)]
pub struct StateWatch(Arc<Mutex<RunState>>);

impl StateWatch {
    pub fn get(&self) -> RunState {
        *self.0.lock().remedy()
    }
}

/// Drives a run from configuration to report: warmup, primary wave, the secondary wave
/// fed by the primary's results, then reporting. Results are consumed on the thread that
/// calls [`run`](Self::run).
pub struct RunOrchestrator {
    config: DriverConfig,
    mix: QueryMix,
    secondary_mix: Option<QueryMix>,
    pool: Arc<dyn ParameterPool>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    comparator: Option<Box<dyn QualificationComparator>>,
    collector: Option<Box<dyn ResultCollector>>,
    reports: Vec<Box<dyn StatisticsReport>>,
    output: Box<dyn Write + Send>,
    state: Arc<Mutex<RunState>>,
}

impl RunOrchestrator {
    pub fn new(
        config: DriverConfig,
        mix: QueryMix,
        pool: Arc<dyn ParameterPool>,
        endpoints: Vec<Arc<dyn Endpoint>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if mix.is_empty() {
            return Err(ConfigError::EmptyMix(mix.name().to_string()));
        }
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        Ok(Self {
            config,
            mix,
            secondary_mix: None,
            pool,
            endpoints,
            comparator: None,
            collector: None,
            reports: vec![],
            output: Box::new(io::stdout()),
            state: Arc::new(Mutex::new(RunState::Configured)),
        })
    }

    /// The mix of the secondary wave, whose runs are fed by the primary wave's results.
    pub fn with_secondary_mix(mut self, mix: QueryMix) -> Self {
        self.secondary_mix = Some(mix);
        self
    }

    pub fn with_comparator(mut self, comparator: Box<dyn QualificationComparator>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn with_collector(mut self, collector: Box<dyn ResultCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn with_report(mut self, report: Box<dyn StatisticsReport>) -> Self {
        self.reports.push(report);
        self
    }

    /// Where reports are rendered; standard output by default.
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    #[inline]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().remedy()
    }

    pub fn watch(&self) -> StateWatch {
        StateWatch(self.state.clone())
    }

    fn enter(&self, state: RunState) {
        let mut current = self.state.lock().remedy();
        info!(from = %*current, to = %state, "run state");
        *current = state;
    }

    fn manager(&self, name: &str, mix: QueryMix, phase: Phase, runs: u64) -> Result<ClientManager, ConfigError> {
        ClientManager::new(
            name,
            mix,
            self.pool.clone(),
            self.endpoints.clone(),
            self.config.manager_options(phase, runs),
        )
    }

    /// Runs every wave and renders the reports. Can be called once.
    ///
    /// Per-query failures and collector failures end up in the report; only invalid
    /// setup, a refused thread or a panicked worker fail the run.
    pub fn run(&mut self) -> Result<RunReport, DriverError> {
        if self.state() != RunState::Configured {
            return Err(DriverError::AlreadyRun);
        }
        if self.config.feedback && self.secondary_mix.is_none() {
            return Err(ConfigError::MissingSecondaryMix.into());
        }

        let seed = match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed = clock_seed();
                info!(seed, "no seed configured; drew one from the clock");
                seed
            }
        };
        let sampler = FeedbackSampler::new(derive_seed(seed, 0), self.config.sample_probability()?);
        let mut aggregator = ResultAggregator::new(sampler).with_print_results(self.config.print_results);
        if let Some(comparator) = self.comparator.take() {
            aggregator = aggregator.with_comparator(comparator);
        }
        if let Some(collector) = self.collector.take() {
            aggregator = aggregator.with_collector(collector);
        }

        // every manager is built up front so that invalid setup fails before any thread starts
        let mut warmup = match self.config.warmups {
            0 => None,
            warmups => Some(self.manager("warmup", self.mix.restarted(), Phase::Warmup, warmups)?),
        };
        let mut primary = self.manager("primary", self.mix.restarted(), Phase::Primary, self.config.effective_runs())?;
        let mut secondary = match &self.secondary_mix {
            Some(mix) => Some(self.manager("secondary", mix.restarted(), Phase::Secondary, 0)?),
            None => None,
        };

        if let Some(warmup) = warmup.as_mut() {
            self.enter(RunState::Warmup);
            run_wave(warmup, &mut aggregator, Wave::Warmup)?;
        }

        self.enter(RunState::PrimaryRun);
        let feedback = match secondary.as_mut() {
            Some(secondary) if self.config.feedback => Some(FeedbackTarget {
                pool: self.pool.as_ref(),
                kind: &self.config.feedback_kind,
                secondary,
            }),
            _ => None,
        };
        let primary_stats = run_wave(&mut primary, &mut aggregator, Wave::Primary { feedback })?;

        let secondary_stats = match secondary.as_mut() {
            Some(secondary) if secondary.runs() > 0 => {
                self.enter(RunState::SecondaryRun);
                Some(run_wave(secondary, &mut aggregator, Wave::Secondary)?)
            }
            _ => None,
        };

        self.enter(RunState::Reported);
        let total = RunStatistics::merged(std::iter::once(&primary_stats).chain(secondary_stats.as_ref()));
        let outcome = aggregator.finish();
        let report = RunReport {
            seed,
            primary: primary_stats,
            secondary: secondary_stats,
            total,
            qualification: outcome.qualification,
            collector_error: outcome.collector_error,
            warmup_discarded: outcome.warmup_discarded,
            feedback_harvested: outcome.feedback_harvested,
        };
        self.render(&report);

        self.enter(RunState::Done);
        Ok(report)
    }

    fn render(&mut self, report: &RunReport) {
        for renderer in &self.reports {
            if let Err(err) = renderer.render(report, &mut self.output) {
                warn!(%err, "cannot render report");
            }
        }
        if let Err(err) = self.output.flush() {
            warn!(%err, "cannot flush report output");
        }
    }
}

/// Starts `manager`, drains its channel into `aggregator` and joins it.
fn run_wave(
    manager: &mut ClientManager,
    aggregator: &mut ResultAggregator,
    wave: Wave<'_>,
) -> Result<RunStatistics, DriverError> {
    if let Err(err) = manager.start() {
        // the manager aborted whatever it did start; join it before bailing out
        let _ = manager.await_completion();
        return Err(err.into());
    }
    let channel = manager.channel().clone();
    let mut statistics = aggregator.drain(&channel, wave);
    let pool_summary = manager.await_completion()?;
    statistics.record_pool(&pool_summary);
    statistics.mix_len = manager.mix().len();
    Ok(statistics)
}

#[cfg(test)]
mod tests;
