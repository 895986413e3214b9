//! One row of a result file and its CSV encoding.
//!
//! Numeric fields carry an explicit `NO_OUTPUT` sentinel for "zero successful
//! trials"; it is modelled as [`Metric::NoOutput`] so it can never leak into an
//! average as a number.

use crate::stats::RunStats;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

pub const NO_OUTPUT: &str = "NO_OUTPUT";

pub const RESULT_HEADER: &str =
    "dataset,size,algorithm,mean,stddev,min,max,runtime_ms,successful_runs,requested_runs";

const FIELD_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    NoOutput,
}

impl Metric {
    /// Parses a stored field. Anything that is not a finite number reads as
    /// `NoOutput`, mirroring how the aggregation coerces unreadable means.
    pub fn parse(raw: &str) -> Metric {
        let raw = raw.trim();
        if raw == NO_OUTPUT {
            return Metric::NoOutput;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Metric::Value(v),
            _ => Metric::NoOutput,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::NoOutput => None,
        }
    }

    pub fn is_no_output(self) -> bool {
        matches!(self, Metric::NoOutput)
    }
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        value.map(Metric::Value).unwrap_or(Metric::NoOutput)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{}", v),
            Metric::NoOutput => f.write_str(NO_OUTPUT),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::NoOutput => serializer.serialize_str(NO_OUTPUT),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("field '{field}' is not a non-negative integer: '{value}'")]
    Counter { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub dataset: String,
    pub size: i64,
    pub algorithm: String,
    pub mean: Metric,
    pub stddev: Metric,
    pub min: Metric,
    pub max: Metric,
    pub runtime_ms: Metric,
    pub successful_runs: u32,
    pub requested_runs: u32,
}

impl RunRecord {
    /// Builds the record for one session's trials of a dataset.
    ///
    /// `requested_runs` is the number of trials attempted in this session, and
    /// `total_runtime_ms` covers all of them, failed ones included.
    pub fn from_session(
        dataset: &str,
        size: i64,
        algorithm: &str,
        stats: Option<RunStats>,
        total_runtime_ms: f64,
        requested_runs: u32,
    ) -> RunRecord {
        match stats {
            Some(s) => {
                let avg_runtime = total_runtime_ms / s.count as f64;
                RunRecord {
                    dataset: csv_safe(dataset),
                    size,
                    algorithm: csv_safe(algorithm),
                    mean: Metric::Value(s.mean),
                    stddev: Metric::Value(s.stddev),
                    min: Metric::Value(s.min),
                    max: Metric::Value(s.max),
                    runtime_ms: Metric::Value((avg_runtime * 1000.0).round() / 1000.0),
                    successful_runs: s.count as u32,
                    requested_runs,
                }
            }
            None => RunRecord {
                dataset: csv_safe(dataset),
                size,
                algorithm: csv_safe(algorithm),
                mean: Metric::NoOutput,
                stddev: Metric::NoOutput,
                min: Metric::NoOutput,
                max: Metric::NoOutput,
                runtime_ms: Metric::NoOutput,
                successful_runs: 0,
                requested_runs,
            },
        }
    }

    /// Runs that count toward completion: a sentinel mean contributes nothing
    /// whatever the stored counter says.
    pub fn completed_runs(&self) -> u32 {
        if self.mean.is_no_output() {
            0
        } else {
            self.successful_runs
        }
    }

    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.dataset,
            self.size,
            self.algorithm,
            self.mean,
            self.stddev,
            self.min,
            self.max,
            self.runtime_ms,
            self.successful_runs,
            self.requested_runs
        )
    }

    pub fn parse_csv_line(line: &str) -> Result<RunRecord, RecordError> {
        let parts: Vec<&str> = line.trim().split(',').collect();
        if parts.len() != FIELD_COUNT {
            return Err(RecordError::FieldCount {
                expected: FIELD_COUNT,
                found: parts.len(),
            });
        }
        Ok(RunRecord {
            dataset: parts[0].trim().to_string(),
            size: parts[1].trim().parse::<i64>().unwrap_or(-1),
            algorithm: parts[2].trim().to_string(),
            mean: Metric::parse(parts[3]),
            stddev: Metric::parse(parts[4]),
            min: Metric::parse(parts[5]),
            max: Metric::parse(parts[6]),
            runtime_ms: Metric::parse(parts[7]),
            successful_runs: parse_counter("successful_runs", parts[8])?,
            // Informational only; a damaged value must not hide the row's runs.
            requested_runs: parts[9].trim().parse::<u32>().unwrap_or(0),
        })
    }
}

fn parse_counter(field: &'static str, raw: &str) -> Result<u32, RecordError> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(RecordError::Counter {
            field,
            value: raw.to_string(),
        });
    }
    raw.parse::<u32>().map_err(|_| RecordError::Counter {
        field,
        value: raw.to_string(),
    })
}

/// Result rows are plain comma-separated text; separators inside names are
/// replaced so a row always splits into exactly ten fields.
pub fn csv_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c == ',' || c == '\n' || c == '\r' { '_' } else { c })
        .collect()
}
