use crate::config::DriverConfig;
use crate::endpoint::{Endpoint, FnEndpoint};
use crate::error::{ConfigError, DriverError};
use crate::mix::QueryMix;
use crate::orchestrator::{RunOrchestrator, RunState};
use crate::pool::{MemoryParameterPool, ParameterPool};
use crate::report::{JsonReport, TextReport};
use crate::sink::{JsonLinesCollector, ReferenceComparator};
use crate::test_utils::{friends_endpoint, lookup_mix, profile_mix, timeout_endpoint};
use std::io;
use std::io::Write;
use std::sync::{Arc, Mutex};

fn people() -> Arc<MemoryParameterPool> {
    Arc::new(MemoryParameterPool::new(5).with_values("person", ["alice", "bob", "carol", "dave"]))
}

fn orchestrator(config: DriverConfig, endpoint: Arc<dyn Endpoint>) -> RunOrchestrator {
    RunOrchestrator::new(config, lookup_mix(), people(), vec![endpoint])
        .unwrap()
        .with_output(Box::new(io::sink()))
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn plain_run_without_feedback() {
    let config = DriverConfig::builder().clients(4).runs(40).seed(1).build();
    let mut orchestrator = orchestrator(config, friends_endpoint(2)).with_secondary_mix(profile_mix());
    let watch = orchestrator.watch();
    assert_eq!(RunState::Configured, orchestrator.state());

    let report = orchestrator.run().unwrap();
    assert_eq!(40, report.primary.executed());
    assert_eq!(40, report.primary.successes());
    assert_eq!(4, report.primary.workers);
    assert_eq!(vec!["q1", "q2"], report.primary.per_kind.keys().map(String::as_str).collect::<Vec<_>>());
    assert!(report.secondary.is_none());
    assert_eq!(40, report.total.executed());
    assert_eq!(0, report.feedback_harvested);
    assert_eq!(1, report.seed);
    assert_eq!(RunState::Done, orchestrator.state());
    assert_eq!(RunState::Done, watch.get());
}

#[test]
fn runs_default_to_clients() {
    let config = DriverConfig::builder().clients(3).seed(1).build();
    let report = orchestrator(config, friends_endpoint(0)).run().unwrap();
    assert_eq!(3, report.primary.executed());
}

#[test]
fn feedback_drives_secondary_wave() {
    // 20 runs over two templates: 10 listings of 5 friends each, so 50 rows sampled at 0.1
    let pool = people();
    let config = DriverConfig::builder()
        .clients(2)
        .runs(20)
        .feedback(true)
        .seed(7)
        .build();
    let mut orchestrator = RunOrchestrator::new(config, lookup_mix(), pool.clone(), vec![friends_endpoint(5)])
        .unwrap()
        .with_secondary_mix(profile_mix())
        .with_output(Box::new(io::sink()));
    let report = orchestrator.run().unwrap();

    assert_eq!(20, report.primary.executed());
    let harvested = report.feedback_harvested;
    assert!((1..=10).contains(&harvested), "harvested {harvested}");
    assert_eq!(harvested as usize, pool.len("entity"));
    let secondary = report.secondary.as_ref().unwrap();
    assert_eq!(harvested, secondary.executed());
    assert_eq!(vec!["profile"], secondary.per_kind.keys().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(20 + harvested, report.total.executed());
    assert_eq!(RunState::Done, orchestrator.state());
}

#[test]
fn feedback_at_certainty_harvests_every_row() {
    let pool = people();
    let config = DriverConfig::builder()
        .clients(3)
        .runs(20)
        .feedback(true)
        .sample_rate(1.0)
        .seed(7)
        .build();
    let report = RunOrchestrator::new(config, lookup_mix(), pool.clone(), vec![friends_endpoint(5)])
        .unwrap()
        .with_secondary_mix(profile_mix())
        .with_output(Box::new(io::sink()))
        .run()
        .unwrap();
    assert_eq!(50, report.feedback_harvested);
    assert_eq!(Some(50), report.secondary.as_ref().map(|s| s.executed()));
    assert_eq!(50, pool.len("entity"));
}

#[test]
fn same_seed_same_harvest() {
    let harvest = || {
        let config = DriverConfig::builder()
            .clients(1)
            .runs(40)
            .feedback(true)
            .sample_rate(0.3)
            .seed(1234)
            .build();
        RunOrchestrator::new(config, lookup_mix(), people(), vec![friends_endpoint(7)])
            .unwrap()
            .with_secondary_mix(profile_mix())
            .with_output(Box::new(io::sink()))
            .run()
            .unwrap()
            .feedback_harvested
    };
    assert_eq!(harvest(), harvest());
}

#[test]
fn timeouts_are_reported_not_fatal() {
    let config = DriverConfig::builder().clients(2).runs(12).seed(1).build();
    let mut orchestrator = orchestrator(config, timeout_endpoint());
    let report = orchestrator.run().unwrap();
    assert_eq!(12, report.primary.failures());
    assert_eq!(12, report.primary.timeouts());
    assert_eq!(0, report.primary.successes());
    assert_eq!(RunState::Done, orchestrator.state());
}

#[test]
fn warmup_results_discarded() {
    let config = DriverConfig::builder().clients(2).runs(4).warmups(6).seed(1).build();
    let report = orchestrator(config, friends_endpoint(1)).run().unwrap();
    assert_eq!(6, report.warmup_discarded);
    assert_eq!(4, report.primary.executed());
    assert_eq!(4, report.total.executed());
}

#[test]
fn warmup_does_not_shift_primary_mix() {
    let primary_kinds = |warmups: u64| {
        let config = DriverConfig::builder().clients(1).runs(1).warmups(warmups).seed(1).build();
        let report = orchestrator(config, friends_endpoint(1)).run().unwrap();
        report
            .primary
            .per_kind
            .iter()
            .map(|(kind, stats)| (kind.clone(), stats.executed()))
            .collect::<Vec<_>>()
    };
    let expected = vec![("q1".to_string(), 1)];
    for warmups in [0, 1, 2, 3] {
        assert_eq!(expected, primary_kinds(warmups), "warmups {warmups}");
    }
}

#[test]
fn collected_results_qualify_a_later_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reference.jsonl");
    let single = || -> Arc<dyn ParameterPool> {
        Arc::new(MemoryParameterPool::new(1).with_values("person", ["alice"]))
    };
    let config = DriverConfig::builder().clients(2).runs(10).seed(1).build();

    let report = RunOrchestrator::new(config.clone(), lookup_mix(), single(), vec![friends_endpoint(3)])
        .unwrap()
        .with_collector(Box::new(JsonLinesCollector::create(&path).unwrap()))
        .with_output(Box::new(io::sink()))
        .run()
        .unwrap();
    assert_eq!(None, report.collector_error);
    assert!(report.qualification.is_none());
    assert_eq!(10, std::fs::read_to_string(&path).unwrap().lines().count());

    let report = RunOrchestrator::new(config, lookup_mix(), single(), vec![friends_endpoint(3)])
        .unwrap()
        .with_comparator(Box::new(ReferenceComparator::load(&path).unwrap()))
        .with_output(Box::new(io::sink()))
        .run()
        .unwrap();
    let qualification = report.qualification.unwrap();
    assert_eq!(10, qualification.checked);
    assert_eq!(10, qualification.matched);
    assert!(qualification.is_qualified());
}

struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
}

#[test]
fn collector_failure_carried_in_report() {
    let config = DriverConfig::builder().clients(1).runs(3).seed(1).build();
    let report = orchestrator(config, friends_endpoint(1))
        .with_collector(Box::new(JsonLinesCollector::new("broken", BrokenWriter)))
        .run()
        .unwrap();
    assert!(report.collector_error.is_some());
    assert_eq!(3, report.primary.executed());
}

#[test]
fn reports_rendered_to_output() {
    let buffer = SharedBuffer::default();
    let config = DriverConfig::builder().clients(2).runs(6).seed(9).build();
    orchestrator(config, friends_endpoint(1))
        .with_report(Box::new(TextReport))
        .with_report(Box::new(JsonReport::default()))
        .with_output(Box::new(buffer.clone()))
        .run()
        .unwrap();

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(output.starts_with("seed 9\n"));
    assert!(output.contains("== primary =="));
    let json = output.lines().last().unwrap();
    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(6, value["primary"]["executed"]);
}

#[test]
fn feedback_needs_secondary_mix() {
    let config = DriverConfig::builder().feedback(true).build();
    let mut orchestrator = orchestrator(config, friends_endpoint(0));
    assert!(matches!(orchestrator.run(), Err(DriverError::Config(ConfigError::MissingSecondaryMix))));
    assert_eq!(RunState::Configured, orchestrator.state());
}

#[test]
fn runs_only_once() {
    let mut orchestrator = orchestrator(DriverConfig::builder().seed(1).build(), friends_endpoint(0));
    orchestrator.run().unwrap();
    assert!(matches!(orchestrator.run(), Err(DriverError::AlreadyRun)));
}

#[test]
fn panicking_worker_fails_run() {
    let endpoint: Arc<dyn Endpoint> = Arc::new(FnEndpoint::new("broken", |_, _| panic!("driver bug")));
    let config = DriverConfig::builder().clients(2).runs(2).build();
    match orchestrator(config, endpoint).run() {
        Err(DriverError::WorkerPanicked { manager, count }) => {
            assert_eq!("primary", manager);
            assert_eq!(2, count);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_setup_rejected() {
    let new = |config, mix: QueryMix, endpoints: Vec<Arc<dyn Endpoint>>| {
        RunOrchestrator::new(config, mix, people(), endpoints).err()
    };
    assert_eq!(
        Some(ConfigError::NoClients),
        new(DriverConfig::builder().clients(0).build(), lookup_mix(), vec![friends_endpoint(0)])
    );
    assert_eq!(
        Some(ConfigError::EmptyMix("none".into())),
        new(DriverConfig::default(), QueryMix::new("none", vec![]), vec![friends_endpoint(0)])
    );
    assert_eq!(Some(ConfigError::NoEndpoints), new(DriverConfig::default(), lookup_mix(), vec![]));
}
