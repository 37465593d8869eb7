pub mod endpoint;
pub mod mix_harness;
pub mod workload;
