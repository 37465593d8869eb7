use crate::endpoint::{EndpointKind, EndpointOptions};
use crate::workload;
use qmix::config::DriverConfig;
use qmix::endpoint::Endpoint;
use qmix::error::DriverError;
use qmix::orchestrator::RunOrchestrator;
use qmix::report::{RunReport, StatisticsReport};
use qmix::sink::{QualificationComparator, ResultCollector};
use std::io;
use std::io::Write;
use std::sync::Arc;

pub mod print;

#[derive(Debug, Clone)]
pub struct Options {
    pub config: DriverConfig,
    pub endpoint: EndpointKind,
    pub endpoints: usize,
    pub endpoint_opts: EndpointOptions,
    pub people: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: DriverConfig::default(),
            endpoint: EndpointKind::Simulated,
            endpoints: 1,
            endpoint_opts: EndpointOptions::default(),
            people: 1_000,
        }
    }
}

/// Optional plumbing around a run; none of it affects what is measured.
pub struct ExtendedOptions {
    pub reports: Vec<Box<dyn StatisticsReport>>,
    pub output: Box<dyn Write + Send>,
    pub comparator: Option<Box<dyn QualificationComparator>>,
    pub collector: Option<Box<dyn ResultCollector>>,
}

impl Default for ExtendedOptions {
    fn default() -> Self {
        Self {
            reports: vec![],
            output: Box::new(io::stdout()),
            comparator: None,
            collector: None,
        }
    }
}

/// Runs the social workload against the chosen endpoints. The drill-down wave is fed
/// only when the config enables feedback.
pub fn run(opts: &Options, ext_opts: ExtendedOptions) -> Result<RunReport, DriverError> {
    let seed = opts.config.seed.unwrap_or(0);
    let pool = Arc::new(workload::seed_pool(seed, opts.people));
    let endpoints: Vec<Arc<dyn Endpoint>> = (0..opts.endpoints.max(1))
        .map(|i| {
            let endpoint_opts = EndpointOptions {
                seed: opts.endpoint_opts.seed.wrapping_add(i as u64),
                ..opts.endpoint_opts.clone()
            };
            opts.endpoint.build(&format!("{:?}-{i}", opts.endpoint).to_lowercase(), &endpoint_opts)
        })
        .collect();

    let mut orchestrator = RunOrchestrator::new(opts.config.clone(), workload::primary_mix(), pool, endpoints)?
        .with_secondary_mix(workload::drill_down_mix())
        .with_output(ext_opts.output);
    for report in ext_opts.reports {
        orchestrator = orchestrator.with_report(report);
    }
    if let Some(comparator) = ext_opts.comparator {
        orchestrator = orchestrator.with_comparator(comparator);
    }
    if let Some(collector) = ext_opts.collector {
        orchestrator = orchestrator.with_collector(collector);
    }
    orchestrator.run()
}
