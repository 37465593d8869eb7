pub mod aggregator;
pub mod channel;
pub mod config;
pub mod deadline;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod manager;
pub mod mix;
pub mod monitor;
pub mod orchestrator;
pub mod pool;
pub mod query;
pub mod rand;
pub mod rate;
pub mod remedy;
pub mod report;
pub mod sequence;
pub mod sink;
pub mod stats;
pub mod wait;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
