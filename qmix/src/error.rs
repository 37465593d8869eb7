use std::io;
use std::time::Duration;
use thiserror::Error;

/// Per-iteration failures. These never escape a worker: they are either counted as a
/// skipped iteration or captured in a failed [`QueryResult`](crate::query::QueryResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("parameter pool has no value of kind '{kind}'")]
    ParameterExhausted { kind: String },

    #[error("endpoint error: {0}")]
    Endpoint(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl QueryError {
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Timeout(_))
    }
}

/// Invalid setup, detected before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one client is required")]
    NoClients,

    #[error("channel capacity must be greater than zero")]
    ZeroCapacity,

    #[error("query mix '{0}' has no queries")]
    EmptyMix(String),

    #[error("no endpoints given")]
    NoEndpoints,

    #[error("adaptive feedback requires a secondary query mix")]
    MissingSecondaryMix,

    #[error("sample rate {0} is outside [0, 1]")]
    SampleRate(String),

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("cannot read config: {0}")]
    Parse(String),
}

/// Persistence failures. Cloneable so that a repeated `close` can hand back the outcome of
/// the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("cannot serialize result: {0}")]
    Serialize(String),

    #[error("collector is closed")]
    Closed,
}

impl CollectorError {
    pub fn io(path: impl Into<String>, err: &io::Error) -> Self {
        CollectorError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        CollectorError::Serialize(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("client manager '{0}' has already been started")]
    AlreadyStarted(String),

    #[error("client manager '{0}' was never started")]
    NotStarted(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("{count} worker(s) of client manager '{manager}' panicked")]
    WorkerPanicked { manager: String, count: usize },
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot spawn worker thread: {0}")]
    Spawn(io::Error),

    #[error("{count} worker(s) of client manager '{manager}' panicked")]
    WorkerPanicked { manager: String, count: usize },

    #[error("run has already been started")]
    AlreadyRun,

    #[error(transparent)]
    Manager(ManagerError),
}

impl From<ManagerError> for DriverError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Config(err) => DriverError::Config(err),
            ManagerError::Spawn(err) => DriverError::Spawn(err),
            ManagerError::WorkerPanicked { manager, count } => DriverError::WorkerPanicked { manager, count },
            err => DriverError::Manager(err),
        }
    }
}
