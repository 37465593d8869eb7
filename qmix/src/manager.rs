use crate::channel::ResultChannel;
use crate::endpoint::Endpoint;
use crate::error::{ConfigError, ManagerError};
use crate::executor::WorkerPool;
use crate::mix::QueryMix;
use crate::pool::ParameterPool;
use crate::query::Phase;
use crate::remedy::Remedy;
use crate::sequence::SequenceGenerator;
use crate::worker::{RunBudget, Worker, WorkerSummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

/// Sizing and behaviour of a [`ClientManager`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ManagerOptions {
    #[builder(default = 1)]
    pub clients: usize,

    /// Total iterations, split across the clients.
    #[builder(default = 0)]
    pub runs: u64,

    #[builder(default = Phase::Primary)]
    pub phase: Phase,

    /// Whether update templates are issued during warmup.
    #[builder(default = false)]
    pub allow_updates: bool,

    #[builder(default = Duration::from_secs(30))]
    pub timeout: Duration,

    #[builder(default = 1_024)]
    pub channel_capacity: usize,

    /// Ignore `runs` and keep going until [`ClientManager::stop`] is called.
    #[builder(default = false)]
    pub until_stopped: bool,
}

impl ManagerOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clients == 0 {
            return Err(ConfigError::NoClients);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Aggregate of every worker of one manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub summary: WorkerSummary,
    pub workers: usize,
    /// From `start` until the last worker exited.
    pub elapsed: Duration,
}

/// Splits `runs` into `clients` near-equal shares, the first `runs % clients` shares one
/// larger than the rest.
///
/// # Examples
/// ```
/// use qmix::manager::partition;
/// assert_eq!(vec![3, 3, 2, 2], partition(10, 4));
/// assert_eq!(vec![0, 0], partition(0, 2));
/// ```
pub fn partition(runs: u64, clients: usize) -> Vec<u64> {
    if clients == 0 {
        return vec![];
    }
    let clients_u64 = clients as u64;
    let (share, remainder) = (runs / clients_u64, runs % clients_u64);
    (0..clients_u64)
        .map(|i| if i < remainder { share + 1 } else { share })
        .collect()
}

/// Owns a fixed set of workers running one query mix against a set of endpoints, and the
/// channel they publish into.
///
/// Once every worker has exited, a supervisor thread closes the channel, so the consumer
/// of [`channel`](Self::channel) sees the sentinel only after the last result. This holds
/// for a manager started with zero runs too.
pub struct ClientManager {
    name: String,
    mix: QueryMix,
    pool: Arc<dyn ParameterPool>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    options: ManagerOptions,
    channel: Arc<ResultChannel>,
    sequence: Arc<SequenceGenerator>,
    stop: Arc<AtomicBool>,
    workers: WorkerPool<WorkerSummary>,
    elapsed: Arc<Mutex<Duration>>,
}

impl ClientManager {
    pub fn new(
        name: impl Into<String>,
        mix: QueryMix,
        pool: Arc<dyn ParameterPool>,
        endpoints: Vec<Arc<dyn Endpoint>>,
        options: ManagerOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        if mix.is_empty() {
            return Err(ConfigError::EmptyMix(mix.name().to_string()));
        }
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        let name = name.into();
        Ok(Self {
            workers: WorkerPool::new(name.clone()),
            name,
            mix,
            pool,
            endpoints,
            channel: Arc::new(ResultChannel::new(options.channel_capacity)),
            options,
            sequence: Arc::new(SequenceGenerator::default()),
            stop: Arc::new(AtomicBool::new(false)),
            elapsed: Arc::default(),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn runs(&self) -> u64 {
        self.options.runs
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.options.phase
    }

    #[inline]
    pub fn mix(&self) -> &QueryMix {
        &self.mix
    }

    #[inline]
    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// The channel every worker of this manager publishes into.
    #[inline]
    pub fn channel(&self) -> &Arc<ResultChannel> {
        &self.channel
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.workers.is_started()
    }

    fn ensure_pending(&self) -> Result<(), ManagerError> {
        if self.is_started() {
            Err(ManagerError::AlreadyStarted(self.name.clone()))
        } else {
            Ok(())
        }
    }

    pub fn set_runs(&mut self, runs: u64) -> Result<(), ManagerError> {
        self.ensure_pending()?;
        self.options.runs = runs;
        Ok(())
    }

    pub fn add_runs(&mut self, runs: u64) -> Result<(), ManagerError> {
        self.ensure_pending()?;
        self.options.runs += runs;
        Ok(())
    }

    pub fn set_mix(&mut self, mix: QueryMix) -> Result<(), ManagerError> {
        self.ensure_pending()?;
        if mix.is_empty() {
            return Err(ConfigError::EmptyMix(mix.name().to_string()).into());
        }
        self.mix = mix;
        Ok(())
    }

    pub fn set_phase(&mut self, phase: Phase) -> Result<(), ManagerError> {
        self.ensure_pending()?;
        self.options.phase = phase;
        Ok(())
    }

    /// Spawns one thread per client. Runs are split by [`partition`]; endpoints are
    /// assigned round-robin.
    ///
    /// If the OS refuses a thread, the workers already running are aborted and the error
    /// is returned; [`await_completion`](Self::await_completion) still joins them.
    pub fn start(&mut self) -> Result<(), ManagerError> {
        self.ensure_pending()?;
        let budgets: Vec<RunBudget> = if self.options.until_stopped {
            vec![RunBudget::UntilStopped; self.options.clients]
        } else {
            partition(self.options.runs, self.options.clients)
                .into_iter()
                .map(RunBudget::Bounded)
                .collect()
        };

        for (id, budget) in budgets.into_iter().enumerate() {
            let worker = Worker {
                id,
                mix: self.mix.clone(),
                pool: self.pool.clone(),
                endpoint: self.endpoints[id % self.endpoints.len()].clone(),
                channel: self.channel.clone(),
                sequence: self.sequence.clone(),
                stop: self.stop.clone(),
                phase: self.options.phase,
                budget,
                timeout: self.options.timeout,
                allow_updates: self.options.allow_updates,
            };
            self.workers.push(move || worker.run());
        }

        info!(
            manager = self.name.as_str(),
            phase = %self.options.phase,
            clients = self.options.clients,
            runs = self.options.runs,
            mix = self.mix.name(),
            "starting clients"
        );
        let started = Instant::now();
        let on_complete = {
            let channel = self.channel.clone();
            let elapsed = self.elapsed.clone();
            let name = self.name.clone();
            move || {
                *elapsed.lock().remedy() = started.elapsed();
                channel.close();
                debug!(manager = name.as_str(), "published sentinel");
            }
        };
        if let Err(err) = self.workers.start(on_complete) {
            warn!(manager = self.name.as_str(), %err, "aborting partially started clients");
            self.abort();
            return Err(err.into());
        }
        Ok(())
    }

    /// Asks every worker to exit once its in-flight query is done.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stops the workers and closes the channel at once, releasing any worker blocked on a
    /// full channel. Results not yet taken remain available to the consumer.
    pub fn abort(&self) {
        self.stop();
        self.channel.close();
    }

    /// Joins every worker and returns their merged summaries.
    pub fn await_completion(&mut self) -> Result<PoolSummary, ManagerError> {
        let completion = self
            .workers
            .await_completion()
            .ok_or_else(|| ManagerError::NotStarted(self.name.clone()))?;
        if completion.panicked > 0 {
            return Err(ManagerError::WorkerPanicked {
                manager: self.name.clone(),
                count: completion.panicked,
            });
        }

        let mut summary = WorkerSummary::default();
        for worker in &completion.results {
            summary.merge(worker);
        }
        let pool_summary = PoolSummary {
            summary,
            workers: completion.results.len(),
            elapsed: *self.elapsed.lock().remedy(),
        };
        info!(manager = self.name.as_str(), ?pool_summary, "clients finished");
        Ok(pool_summary)
    }
}
