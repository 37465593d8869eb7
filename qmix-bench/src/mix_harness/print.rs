use crate::mix_harness::Options;
use qmix::report::RunReport;
use std::fmt::{Display, Formatter};

impl Display for Options {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let config = &self.config;
        write!(
            f,
            "clients: {}, runs: {}, warmups: {}, feedback: {} (p={}), endpoint: {:?} x{}, timeout: {:?}",
            config.clients,
            config.effective_runs(),
            config.warmups,
            config.feedback,
            config.sample_rate,
            self.endpoint,
            self.endpoints,
            config.timeout
        )
    }
}

/// One row of the summary table: a [`RunReport`] reduced to its headline numbers.
pub struct Row<'a>(pub &'a str, pub &'a RunReport);

impl Display for Row<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Row(name, report) = self;
        let secondary = report.secondary.as_ref().map_or(0, |s| s.executed());
        write!(
            f,
            "|{:40}|{:>10}|{:>10}|{:>10}|{:>14}|{:>14.1}|",
            name,
            report.primary.executed(),
            secondary,
            report.total.failures(),
            report.total.throughput(),
            report.primary.mixes_per_hour(),
        )
    }
}

pub struct Separator();

impl Display for Separator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "|{:->40}|{:->10}|{:->10}|{:->10}|{:->14}|{:->14}|", "", "", "", "", "", "")
    }
}

pub struct Header();

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "|{:40}|{:>10}|{:>10}|{:>10}|{:>14}|{:>14}|",
            "", "primary", "secondary", "failed", "rate", "mixes/h"
        )
    }
}
