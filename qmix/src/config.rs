use crate::error::ConfigError;
use crate::manager::ManagerOptions;
use crate::query::Phase;
use crate::rand::Probability;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Settings of one benchmark run.
///
/// Loadable from JSON, where every field is optional and durations are given in
/// milliseconds:
/// ```
/// use qmix::config::DriverConfig;
/// let config = DriverConfig::from_json(r#"{"clients": 4, "timeout_ms": 500}"#).unwrap();
/// assert_eq!(4, config.clients);
/// assert_eq!(4, config.effective_runs());
/// assert_eq!(0.1, config.sample_rate);
/// ```
#[derive(Debug, Clone, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    #[builder(default = 1)]
    pub clients: usize,

    /// Primary-wave iterations; one per client when unset.
    #[builder(default, setter(strip_option))]
    pub runs: Option<u64>,

    #[builder(default = 0)]
    pub warmups: u64,

    /// Whether update queries are issued during warmup.
    #[builder(default = false)]
    pub warmup_updates: bool,

    /// Harvest values from primary results to drive a secondary wave.
    #[builder(default = false)]
    pub feedback: bool,

    #[builder(default = 1_024)]
    pub channel_capacity: usize,

    /// Probability that a harvestable row is fed back.
    #[builder(default = 0.1)]
    pub sample_rate: f64,

    #[builder(default = Duration::from_secs(30))]
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,

    /// Seed of the feedback sampler; drawn from the clock when unset.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,

    /// Pool kind that harvested values are injected under.
    #[builder(default = String::from("entity"), setter(into))]
    pub feedback_kind: String,

    /// Log every result at debug level.
    #[builder(default = false)]
    pub print_results: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DriverConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Parse(format!("{}: {err}", path.display())))?;
        Self::from_json(&json)
    }

    #[inline]
    pub fn effective_runs(&self) -> u64 {
        self.runs.unwrap_or(self.clients as u64)
    }

    pub fn sample_probability(&self) -> Result<Probability, ConfigError> {
        Probability::try_new(self.sample_rate).ok_or_else(|| ConfigError::SampleRate(self.sample_rate.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.manager_options(Phase::Primary, self.effective_runs()).validate()?;
        self.sample_probability()?;
        Ok(())
    }

    /// Options for a manager running `runs` iterations of `phase`.
    pub fn manager_options(&self, phase: Phase, runs: u64) -> ManagerOptions {
        ManagerOptions::builder()
            .clients(self.clients)
            .runs(runs)
            .phase(phase)
            .allow_updates(phase != Phase::Warmup || self.warmup_updates)
            .timeout(self.timeout)
            .channel_capacity(self.channel_capacity)
            .build()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
