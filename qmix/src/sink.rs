//! Destinations for results beyond statistics: qualification against reference results,
//! and persistence of results for later qualification runs.
//!
//! Both share one record format, [`QualificationRecord`], written one JSON object per line.

use crate::error::CollectorError;
use crate::query::QueryResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// The persisted form of one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationRecord {
    pub kind: String,
    pub query: String,
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&QueryResult> for QualificationRecord {
    fn from(result: &QueryResult) -> Self {
        let (header, rows, error) = match &result.outcome {
            Ok(rows) => (rows.header.clone(), rows.rows.clone(), None),
            Err(err) => (vec![], vec![], Some(err.to_string())),
        };
        Self {
            kind: result.kind().to_string(),
            query: result.query.clone(),
            header,
            rows,
            error,
        }
    }
}

/// A result whose rows differ from the reference for the same query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub kind: String,
    pub query: String,
    pub expected_rows: usize,
    pub actual_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualificationSummary {
    pub checked: u64,
    pub matched: u64,
    /// Results with no reference record for their query.
    pub unreferenced: u64,
    /// Results that failed outright and so could not be compared.
    pub failed: u64,
    pub mismatches: Vec<Mismatch>,
}

impl QualificationSummary {
    pub fn is_qualified(&self) -> bool {
        self.mismatches.is_empty() && self.unreferenced == 0 && self.failed == 0
    }
}

/// Checks primary-wave results against expected ones.
pub trait QualificationComparator: Send {
    fn add_result(&mut self, result: &QueryResult);

    fn report_total(&self) -> QualificationSummary;
}

/// Persists results.
pub trait ResultCollector: Send {
    fn add_result(&mut self, result: &QueryResult) -> Result<(), CollectorError>;

    /// Flushes and releases the underlying resource. Calling it again returns the outcome
    /// of the first call.
    fn close(&mut self) -> Result<(), CollectorError>;
}

/// Compares results against reference records, keyed by query type and bound text. Rows
/// are compared as multisets, so row order does not matter.
#[derive(Debug, Default)]
pub struct ReferenceComparator {
    expected: HashMap<(String, String), Vec<Vec<String>>>,
    summary: QualificationSummary,
}

fn sorted(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    rows.sort_unstable();
    rows
}

impl ReferenceComparator {
    pub fn from_records<I: IntoIterator<Item = QualificationRecord>>(records: I) -> Self {
        let expected = records
            .into_iter()
            .map(|record| ((record.kind, record.query), sorted(record.rows)))
            .collect();
        Self {
            expected,
            summary: QualificationSummary::default(),
        }
    }

    /// Reads records written by a [`JsonLinesCollector`]. Blank lines are ignored.
    pub fn from_reader<R: BufRead>(source: &str, reader: R) -> Result<Self, CollectorError> {
        let mut records = vec![];
        for line in reader.lines() {
            let line = line.map_err(|err| CollectorError::io(source, &err))?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        debug!(source, records = records.len(), "loaded reference results");
        Ok(Self::from_records(records))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CollectorError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let file = File::open(path).map_err(|err| CollectorError::io(source.as_str(), &err))?;
        Self::from_reader(&source, BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}

impl QualificationComparator for ReferenceComparator {
    fn add_result(&mut self, result: &QueryResult) {
        self.summary.checked += 1;
        let Some(actual) = result.rows() else {
            self.summary.failed += 1;
            return;
        };
        let key = (result.kind().to_string(), result.query.clone());
        match self.expected.get(&key) {
            None => self.summary.unreferenced += 1,
            Some(expected) if *expected == sorted(actual.rows.clone()) => self.summary.matched += 1,
            Some(expected) => {
                warn!(query = result.kind(), seq = result.seq, "result differs from reference");
                self.summary.mismatches.push(Mismatch {
                    kind: key.0,
                    query: key.1,
                    expected_rows: expected.len(),
                    actual_rows: actual.len(),
                });
            }
        }
    }

    fn report_total(&self) -> QualificationSummary {
        self.summary.clone()
    }
}

/// Writes one [`QualificationRecord`] per line.
pub struct JsonLinesCollector<W: Write> {
    target: String,
    writer: Option<BufWriter<W>>,
    closed: Option<Result<(), CollectorError>>,
}

impl JsonLinesCollector<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CollectorError> {
        let path = path.as_ref();
        let target = path.display().to_string();
        let file = File::create(path).map_err(|err| CollectorError::io(target.as_str(), &err))?;
        Ok(Self::new(target, file))
    }
}

impl<W: Write> JsonLinesCollector<W> {
    pub fn new(target: impl Into<String>, writer: W) -> Self {
        Self {
            target: target.into(),
            writer: Some(BufWriter::new(writer)),
            closed: None,
        }
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl<W: Write + Send> ResultCollector for JsonLinesCollector<W> {
    fn add_result(&mut self, result: &QueryResult) -> Result<(), CollectorError> {
        let writer = self.writer.as_mut().ok_or(CollectorError::Closed)?;
        serde_json::to_writer(&mut *writer, &QualificationRecord::from(result))?;
        writer
            .write_all(b"\n")
            .map_err(|err| CollectorError::io(self.target.as_str(), &err))
    }

    fn close(&mut self) -> Result<(), CollectorError> {
        if let Some(outcome) = &self.closed {
            return outcome.clone();
        }
        let outcome = match self.writer.take() {
            Some(mut writer) => writer
                .flush()
                .map_err(|err| CollectorError::io(self.target.as_str(), &err)),
            None => Ok(()),
        };
        debug!(collector = self.target.as_str(), ?outcome, "collector closed");
        self.closed = Some(outcome.clone());
        outcome
    }
}

impl<W: Write> Drop for JsonLinesCollector<W> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
