use crate::error::CollectorError;
use crate::sink::QualificationSummary;
use crate::stats::{QueryStats, RunStatistics};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::io::Write;
use std::time::Duration;

/// Everything a finished run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// The seed of the run's feedback sampler, so that a run can be replayed.
    pub seed: u64,
    pub primary: RunStatistics,
    pub secondary: Option<RunStatistics>,
    /// `primary` and `secondary` merged.
    pub total: RunStatistics,
    pub qualification: Option<QualificationSummary>,
    pub collector_error: Option<CollectorError>,
    pub warmup_discarded: u64,
    pub feedback_harvested: u64,
}

impl RunReport {
    /// The waves that ran, in order, with their labels.
    pub fn sections(&self) -> Vec<(&'static str, &RunStatistics)> {
        let mut sections = vec![("primary", &self.primary)];
        if let Some(secondary) = &self.secondary {
            sections.push(("secondary", secondary));
            sections.push(("total", &self.total));
        }
        sections
    }
}

/// Renders a [`RunReport`].
pub trait StatisticsReport: Send {
    fn render(&self, report: &RunReport, out: &mut dyn Write) -> io::Result<()>;
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

/// An aligned table per wave, followed by throughput and qualification lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl TextReport {
    fn render_section(&self, label: &str, stats: &RunStatistics, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "== {label} ==")?;
        writeln!(
            out,
            "{:<24} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10}",
            "query", "ok", "failed", "timeout", "avg ms", "min ms", "max ms"
        )?;
        for (kind, query) in &stats.per_kind {
            writeln!(
                out,
                "{:<24} {:>8} {:>8} {:>8} {:>10.3} {:>10.3} {:>10.3}",
                kind,
                query.successes,
                query.failures,
                query.timeouts,
                query.mean_latency().map_or(0.0, millis),
                query.min_latency.map_or(0.0, millis),
                millis(query.max_latency)
            )?;
        }
        writeln!(
            out,
            "executed {} ({} failed) in {:.3}s by {} client(s): {}, {:.1} mixes/h",
            stats.executed(),
            stats.failures(),
            stats.elapsed.as_secs_f64(),
            stats.workers,
            stats.throughput(),
            stats.mixes_per_hour()
        )?;
        if stats.skipped > 0 || stats.suppressed > 0 {
            writeln!(out, "skipped {}, suppressed {}", stats.skipped, stats.suppressed)?;
        }
        Ok(())
    }
}

impl StatisticsReport for TextReport {
    fn render(&self, report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "seed {}", report.seed)?;
        if report.warmup_discarded > 0 {
            writeln!(out, "warmup: {} result(s) discarded", report.warmup_discarded)?;
        }
        for (label, stats) in report.sections() {
            self.render_section(label, stats, out)?;
        }
        if report.secondary.is_some() || report.feedback_harvested > 0 {
            writeln!(out, "feedback: {} value(s) harvested", report.feedback_harvested)?;
        }
        if let Some(qualification) = &report.qualification {
            writeln!(
                out,
                "qualification: {} checked, {} matched, {} mismatched, {} unreferenced, {} failed",
                qualification.checked,
                qualification.matched,
                qualification.mismatches.len(),
                qualification.unreferenced,
                qualification.failed
            )?;
        }
        if let Some(err) = &report.collector_error {
            writeln!(out, "result collection failed: {err}")?;
        }
        Ok(())
    }
}

/// The report as one JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport {
    pub pretty: bool,
}

#[derive(Serialize)]
struct QueryView {
    successes: u64,
    failures: u64,
    timeouts: u64,
    mean_ms: Option<f64>,
    min_ms: Option<f64>,
    max_ms: f64,
}

impl From<&QueryStats> for QueryView {
    fn from(stats: &QueryStats) -> Self {
        Self {
            successes: stats.successes,
            failures: stats.failures,
            timeouts: stats.timeouts,
            mean_ms: stats.mean_latency().map(millis),
            min_ms: stats.min_latency.map(millis),
            max_ms: millis(stats.max_latency),
        }
    }
}

#[derive(Serialize)]
struct SectionView<'a> {
    queries: BTreeMap<&'a str, QueryView>,
    executed: u64,
    failures: u64,
    skipped: u64,
    suppressed: u64,
    workers: usize,
    elapsed_ms: f64,
    queries_per_sec: f64,
    mixes_per_hour: f64,
}

impl<'a> From<&'a RunStatistics> for SectionView<'a> {
    fn from(stats: &'a RunStatistics) -> Self {
        Self {
            queries: stats
                .per_kind
                .iter()
                .map(|(kind, query)| (kind.as_str(), QueryView::from(query)))
                .collect(),
            executed: stats.executed(),
            failures: stats.failures(),
            skipped: stats.skipped,
            suppressed: stats.suppressed,
            workers: stats.workers,
            elapsed_ms: millis(stats.elapsed),
            queries_per_sec: stats.throughput().per_sec(),
            mixes_per_hour: stats.mixes_per_hour(),
        }
    }
}

#[derive(Serialize)]
struct ReportView<'a> {
    seed: u64,
    primary: SectionView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secondary: Option<SectionView<'a>>,
    total: SectionView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qualification: Option<&'a QualificationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collector_error: Option<String>,
    warmup_discarded: u64,
    feedback_harvested: u64,
}

impl StatisticsReport for JsonReport {
    fn render(&self, report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
        let view = ReportView {
            seed: report.seed,
            primary: SectionView::from(&report.primary),
            secondary: report.secondary.as_ref().map(SectionView::from),
            total: SectionView::from(&report.total),
            qualification: report.qualification.as_ref(),
            collector_error: report.collector_error.as_ref().map(ToString::to_string),
            warmup_discarded: report.warmup_discarded,
            feedback_harvested: report.feedback_harvested,
        };
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, &view)?;
        } else {
            serde_json::to_writer(&mut *out, &view)?;
        }
        writeln!(out)
    }
}

#[cfg(test)]
mod tests;
