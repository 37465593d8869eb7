use clap::Parser;
use qmix::config::DriverConfig;
use qmix::rand::Probability;
use qmix::report::{JsonReport, StatisticsReport, TextReport};
use qmix::sink::{JsonLinesCollector, ReferenceComparator};
use qmix_bench::endpoint::{EndpointKind, EndpointOptions};
use qmix_bench::mix_harness;
use qmix_bench::mix_harness::print::{Header, Row, Separator};
use qmix_bench::mix_harness::{ExtendedOptions, Options};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mix_bench", about = "Replays the social query mix against simulated endpoints")]
struct Args {
    /// JSON driver config; flags given explicitly override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Client counts to sweep, e.g. `1,2,4`.
    #[arg(long, value_delimiter = ',')]
    clients: Vec<usize>,

    #[arg(long)]
    runs: Option<u64>,

    #[arg(long)]
    warmups: Option<u64>,

    #[arg(long, default_value_t = false)]
    warmup_updates: bool,

    #[arg(long, default_value_t = false)]
    feedback: bool,

    #[arg(long)]
    sample_rate: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = EndpointKind::Simulated)]
    endpoint: EndpointKind,

    #[arg(long, default_value_t = 1)]
    endpoints: usize,

    #[arg(long, default_value_t = 50)]
    min_latency_us: u64,

    #[arg(long, default_value_t = 500)]
    max_latency_us: u64,

    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,

    #[arg(long, default_value_t = 1_000)]
    people: usize,

    /// Write every result to this JSON-lines file.
    #[arg(long)]
    collect: Option<PathBuf>,

    /// Qualify primary results against a file written by `--collect`.
    #[arg(long)]
    qualify: Option<PathBuf>,

    /// Render the full report of each run, as text or JSON.
    #[arg(long, default_value_t = false)]
    report: bool,

    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, default_value_t = false)]
    print_results: bool,

    /// Print the effective config as JSON and exit.
    #[arg(long, default_value_t = false)]
    dump_config: bool,
}

impl Args {
    fn config(&self) -> Result<DriverConfig, String> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::load(path).map_err(|err| err.to_string())?,
            None => DriverConfig::default(),
        };
        if let Some(runs) = self.runs {
            config.runs = Some(runs);
        }
        if let Some(warmups) = self.warmups {
            config.warmups = warmups;
        }
        if let Some(sample_rate) = self.sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(timeout_ms);
        }
        config.warmup_updates |= self.warmup_updates;
        config.feedback |= self.feedback;
        config.print_results |= self.print_results;
        Ok(config)
    }

    fn endpoint_opts(&self) -> Result<EndpointOptions, String> {
        let failure = Probability::try_new(self.failure_rate)
            .ok_or_else(|| format!("failure rate {} is outside [0, 1]", self.failure_rate))?;
        Ok(EndpointOptions {
            latency: Duration::from_micros(self.min_latency_us)..Duration::from_micros(self.max_latency_us),
            failure,
            seed: self.seed.unwrap_or(0),
            ..EndpointOptions::default()
        })
    }

    /// Client counts to run, one report per step. A collector file holds a single run's
    /// results, so collecting is limited to one step.
    fn sweep(&self, config: &DriverConfig) -> Result<Vec<usize>, String> {
        let sweep = if self.clients.is_empty() {
            vec![config.clients]
        } else {
            self.clients.clone()
        };
        if self.collect.is_some() && sweep.len() > 1 {
            return Err(format!("--collect takes a single client count, got {}", sweep.len()));
        }
        Ok(sweep)
    }

    fn ext_opts(&self) -> Result<ExtendedOptions, String> {
        let mut ext_opts = ExtendedOptions::default();
        if self.report {
            let report: Box<dyn StatisticsReport> = if self.json {
                Box::new(JsonReport { pretty: true })
            } else {
                Box::new(TextReport)
            };
            ext_opts.reports.push(report);
        }
        if let Some(path) = &self.qualify {
            let comparator = ReferenceComparator::load(path).map_err(|err| err.to_string())?;
            ext_opts.comparator = Some(Box::new(comparator));
        }
        if let Some(path) = &self.collect {
            let collector = JsonLinesCollector::create(path).map_err(|err| err.to_string())?;
            ext_opts.collector = Some(Box::new(collector));
        }
        Ok(ext_opts)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let config = args.config()?;
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config).map_err(|err| err.to_string())?);
        return Ok(());
    }
    let endpoint_opts = args.endpoint_opts()?;
    let sweep = args.sweep(&config)?;

    println!("{}", Separator());
    println!("{}", Header());
    for clients in sweep {
        let opts = Options {
            config: DriverConfig { clients, ..config.clone() },
            endpoint: args.endpoint,
            endpoints: args.endpoints,
            endpoint_opts: endpoint_opts.clone(),
            people: args.people,
        };
        info!(%opts, "starting run");
        let report = mix_harness::run(&opts, args.ext_opts()?).map_err(|err| err.to_string())?;
        println!("{}", Row(&format!("clients: {clients}"), &report));
    }
    println!("{}", Separator());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("mix_bench").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn sweep_defaults_to_config_clients() {
        let config = DriverConfig::builder().clients(3).build();
        assert_eq!(vec![3], args(&[]).sweep(&config).unwrap());
        assert_eq!(vec![1, 2, 4], args(&["--clients", "1,2,4"]).sweep(&config).unwrap());
    }

    #[test]
    fn collect_limited_to_one_step() {
        let config = DriverConfig::default();
        assert_eq!(vec![2], args(&["--clients", "2", "--collect", "out.jsonl"]).sweep(&config).unwrap());
        assert!(args(&["--clients", "1,2", "--collect", "out.jsonl"]).sweep(&config).is_err());
    }
}
