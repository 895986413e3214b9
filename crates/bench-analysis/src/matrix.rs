//! Dataset x algorithm pivot of merged records, expressed relative to a
//! baseline column.

use crate::merge::MergedRecord;
use std::collections::BTreeMap;
use std::fmt;

/// One rendered comparison. Every way a percentage can be unavailable has its
/// own variant so the report always says why.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// The pair never appears in any result file.
    NotRun,
    /// Attempted, but no successful run anywhere.
    NoOutput,
    Baseline(f64),
    /// No baseline column was selected at all.
    Uncompared(f64),
    BaselineMissing(f64),
    BaselineZero(f64),
    Deviation { value: f64, percent: f64 },
}

impl Cell {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Cell::Deviation { percent, .. } => Some(*percent),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::NotRun | Cell::NoOutput => None,
            Cell::Baseline(v)
            | Cell::Uncompared(v)
            | Cell::BaselineMissing(v)
            | Cell::BaselineZero(v) => Some(*v),
            Cell::Deviation { value, .. } => Some(*value),
        }
    }

    fn compare(value: Option<f64>, baseline: Option<Option<f64>>) -> Cell {
        let Some(value) = value else {
            return Cell::NoOutput;
        };
        match baseline {
            None => Cell::Uncompared(value),
            Some(None) => Cell::BaselineMissing(value),
            Some(Some(base)) if base == 0.0 => Cell::BaselineZero(value),
            Some(Some(base)) => Cell::Deviation {
                value,
                percent: (value - base) / base * 100.0,
            },
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::NotRun => f.write_str("NOT RUN"),
            Cell::NoOutput => f.write_str("NO OUTPUT"),
            Cell::Baseline(v) => write!(f, "{:.4}", v),
            Cell::Uncompared(v) => write!(f, "{:.4} (N/A)", v),
            Cell::BaselineMissing(v) => write!(f, "{:.4} (baseline missing)", v),
            Cell::BaselineZero(v) => write!(f, "{:.4} (baseline returned 0 - invalid)", v),
            Cell::Deviation { value, percent } => write!(f, "{:.4} ({:+.2}%)", value, percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub dataset: String,
    pub size: i64,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Name of the baseline column; when set it is `columns[0]`.
    pub baseline: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

impl Matrix {
    pub fn is_baseline_column(&self, idx: usize) -> bool {
        self.baseline.is_some() && idx == 0
    }
}

/// First algorithm, in name order, whose name contains `marker`
/// (case-insensitive). An empty marker selects nothing.
pub fn select_baseline<'a>(algorithms: &[&'a str], marker: &str) -> Option<&'a str> {
    let marker = marker.trim().to_lowercase();
    if marker.is_empty() {
        return None;
    }
    let mut sorted = algorithms.to_vec();
    sorted.sort_unstable();
    sorted
        .into_iter()
        .find(|name| name.to_lowercase().contains(&marker))
}

/// Run-count weighted pool of every merged group that lands in one cell.
#[derive(Debug, Default, Clone, Copy)]
struct Pooled {
    weighted_sum: f64,
    weight: u64,
}

impl Pooled {
    fn add(&mut self, rec: &MergedRecord) {
        if let Some(mean) = rec.mean {
            let runs = rec.successful_runs.max(1);
            self.weighted_sum += mean * runs as f64;
            self.weight += runs;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.weight > 0).then(|| self.weighted_sum / self.weight as f64)
    }
}

/// Pivots merged records into one row per dataset. Groups of the same
/// (dataset, algorithm) recorded under different sizes share a cell, pooled
/// by successful runs; the row takes the largest size seen.
pub fn build_matrix(records: &[MergedRecord], baseline_marker: &str) -> Matrix {
    // dataset -> (size, algorithm -> pooled runs)
    let mut pivot: BTreeMap<&str, (i64, BTreeMap<&str, Pooled>)> = BTreeMap::new();
    for rec in records {
        let (size, by_algo) = pivot
            .entry(rec.dataset.as_str())
            .or_insert_with(|| (rec.size, BTreeMap::new()));
        *size = (*size).max(rec.size);
        by_algo
            .entry(rec.algorithm.as_str())
            .or_default()
            .add(rec);
    }

    let mut algorithms: Vec<&str> = records.iter().map(|r| r.algorithm.as_str()).collect();
    algorithms.sort_unstable();
    algorithms.dedup();
    let baseline = select_baseline(&algorithms, baseline_marker);
    let mut columns: Vec<&str> = Vec::with_capacity(algorithms.len());
    columns.extend(baseline);
    columns.extend(algorithms.iter().copied().filter(|a| Some(*a) != baseline));

    let rows = pivot
        .into_iter()
        .map(|(dataset, (size, pooled))| {
            let by_algo: BTreeMap<&str, Option<f64>> =
                pooled.into_iter().map(|(algo, p)| (algo, p.mean())).collect();
            let base_value = baseline.map(|b| by_algo.get(b).copied().flatten());
            let cells = columns
                .iter()
                .map(|algo| match by_algo.get(algo) {
                    None => Cell::NotRun,
                    Some(None) => Cell::NoOutput,
                    Some(Some(v)) if Some(*algo) == baseline => Cell::Baseline(*v),
                    Some(mean) => Cell::compare(*mean, base_value),
                })
                .collect();
            MatrixRow {
                dataset: dataset.to_string(),
                size,
                cells,
            }
        })
        .collect();

    Matrix {
        baseline: baseline.map(str::to_string),
        columns: columns.into_iter().map(str::to_string).collect(),
        rows,
    }
}
