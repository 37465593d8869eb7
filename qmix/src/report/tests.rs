use crate::error::CollectorError;
use crate::report::{JsonReport, RunReport, StatisticsReport, TextReport};
use crate::sink::QualificationSummary;
use crate::stats::{QueryStats, RunStatistics};
use std::time::Duration;

fn statistics(kind: &str, successes: u64, failures: u64) -> RunStatistics {
    let mut stats = RunStatistics {
        elapsed: Duration::from_secs(2),
        workers: 4,
        mix_len: 2,
        ..RunStatistics::default()
    };
    stats.per_kind.insert(
        kind.to_string(),
        QueryStats {
            successes,
            failures,
            timeouts: failures,
            total_latency: Duration::from_millis(10 * (successes + failures)),
            min_latency: Some(Duration::from_millis(5)),
            max_latency: Duration::from_millis(20),
        },
    );
    stats
}

fn report() -> RunReport {
    let primary = statistics("q1", 8, 2);
    let secondary = statistics("profile", 3, 0);
    let total = RunStatistics::merged([&primary, &secondary]);
    RunReport {
        seed: 99,
        primary,
        secondary: Some(secondary),
        total,
        qualification: Some(QualificationSummary { checked: 10, matched: 10, ..QualificationSummary::default() }),
        collector_error: Some(CollectorError::Closed),
        warmup_discarded: 7,
        feedback_harvested: 3,
    }
}

fn render(renderer: &dyn StatisticsReport, report: &RunReport) -> String {
    let mut out = vec![];
    renderer.render(report, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn text_report_has_every_section() {
    let text = render(&TextReport, &report());
    assert!(text.starts_with("seed 99\n"));
    for expected in [
        "warmup: 7 result(s) discarded",
        "== primary ==",
        "== secondary ==",
        "== total ==",
        "feedback: 3 value(s) harvested",
        "qualification: 10 checked, 10 matched",
        "result collection failed: collector is closed",
        "executed 10 (2 failed) in 2.000s by 4 client(s): 5.000 /s, 9000.0 mixes/h",
    ] {
        assert!(text.contains(expected), "missing '{expected}' in\n{text}");
    }
    let q1 = text.lines().find(|line| line.starts_with("q1")).unwrap();
    assert_eq!(vec!["q1", "8", "2", "2", "10.000", "5.000", "20.000"], q1.split_whitespace().collect::<Vec<_>>());
}

#[test]
fn text_report_without_secondary_omits_total() {
    let report = RunReport {
        primary: statistics("q1", 1, 0),
        ..RunReport::default()
    };
    let text = render(&TextReport, &report);
    assert!(text.contains("== primary =="));
    assert!(!text.contains("== total =="));
    assert!(!text.contains("feedback"));
}

#[test]
fn json_report_parses_back() {
    for pretty in [false, true] {
        let json = render(&JsonReport { pretty }, &report());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(99, value["seed"]);
        assert_eq!(10, value["primary"]["executed"]);
        assert_eq!(2, value["primary"]["queries"]["q1"]["timeouts"]);
        assert_eq!(5.0, value["primary"]["queries_per_sec"]);
        assert_eq!(3, value["secondary"]["executed"]);
        assert_eq!(13, value["total"]["executed"]);
        assert_eq!(10, value["qualification"]["matched"]);
        assert_eq!("collector is closed", value["collector_error"]);
    }

    let json = render(&JsonReport::default(), &RunReport::default());
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value.get("secondary").is_none());
    assert!(value.get("qualification").is_none());
}
