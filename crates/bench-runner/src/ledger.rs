//! Completion ledger: how many successful runs already exist per
//! (dataset, algorithm identity), rebuilt from the result directory on every
//! session start and never stored anywhere else.

use anyhow::Result;
use bench_core::{file_identity, list_result_files, read_result_file, IdentityMode, RunRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub dataset: String,
    pub algorithm: String,
    pub successful_runs: u64,
    pub last_source: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionLedger {
    mode: IdentityMode,
    counts: BTreeMap<(String, String), u64>,
    sources: BTreeMap<(String, String), PathBuf>,
    files_scanned: usize,
    malformed_rows: usize,
}

impl CompletionLedger {
    pub fn empty(mode: IdentityMode) -> CompletionLedger {
        CompletionLedger {
            mode,
            counts: BTreeMap::new(),
            sources: BTreeMap::new(),
            files_scanned: 0,
            malformed_rows: 0,
        }
    }

    /// Scans every result file in `dir`. Unreadable files and malformed rows
    /// contribute nothing.
    pub fn scan(dir: &Path, mode: IdentityMode) -> Result<CompletionLedger> {
        let mut ledger = CompletionLedger::empty(mode);
        for path in list_result_files(dir)? {
            let rows = match read_result_file(&path) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable result file");
                    continue;
                }
            };
            let identity = file_identity(&path, mode);
            for record in &rows.records {
                ledger.record(&identity, record, &path);
            }
            ledger.files_scanned += 1;
            ledger.malformed_rows += rows.malformed;
        }
        debug!(
            files = ledger.files_scanned,
            keys = ledger.counts.len(),
            malformed = ledger.malformed_rows,
            "completion ledger rebuilt"
        );
        Ok(ledger)
    }

    pub fn record(&mut self, identity: &str, record: &RunRecord, source: &Path) {
        let runs = record.completed_runs();
        if runs == 0 {
            return;
        }
        let key = (record.dataset.clone(), identity.to_string());
        *self.counts.entry(key.clone()).or_default() += u64::from(runs);
        self.sources.insert(key, source.to_path_buf());
    }

    pub fn mode(&self) -> IdentityMode {
        self.mode
    }

    pub fn completed(&self, dataset: &str, algorithm: &str) -> u64 {
        self.counts
            .get(&(dataset.to_string(), algorithm.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// The result file that most recently (in name order) added to the count.
    pub fn last_source(&self, dataset: &str, algorithm: &str) -> Option<&Path> {
        self.sources
            .get(&(dataset.to_string(), algorithm.to_string()))
            .map(PathBuf::as_path)
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn malformed_rows(&self) -> usize {
        self.malformed_rows
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.counts
            .iter()
            .map(|((dataset, algorithm), runs)| LedgerEntry {
                dataset: dataset.clone(),
                algorithm: algorithm.clone(),
                successful_runs: *runs,
                last_source: self
                    .sources
                    .get(&(dataset.clone(), algorithm.clone()))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scratch_dir;
    use bench_core::RESULT_HEADER;
    use std::fs;

    fn write_rows(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut body = format!("{}\n", RESULT_HEADER);
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        fs::write(&path, body).expect("write rows");
        path
    }

    #[test]
    fn counts_add_up_across_files() {
        let dir = scratch_dir("ledger_additive");
        write_rows(
            &dir,
            "greedy_20251119_101500_aaaaaa.csv",
            &["uniform_50.txt,50,greedy,10,0,10,10,1,2,2"],
        );
        let second = write_rows(
            &dir,
            "greedy_20251120_090000_bbbbbb.csv",
            &["uniform_50.txt,50,greedy,20,1,19,21,1,3,3"],
        );
        let ledger = CompletionLedger::scan(&dir, IdentityMode::Normalized).expect("scan");
        assert_eq!(ledger.completed("uniform_50.txt", "greedy"), 5);
        assert_eq!(ledger.last_source("uniform_50.txt", "greedy"), Some(second.as_path()));
        assert_eq!(ledger.files_scanned(), 2);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn sentinel_rows_and_malformed_rows_count_zero() {
        let dir = scratch_dir("ledger_sentinel");
        write_rows(
            &dir,
            "greedy_20251119_101500_aaaaaa.csv",
            &[
                "uniform_50.txt,50,greedy,NO_OUTPUT,NO_OUTPUT,NO_OUTPUT,NO_OUTPUT,NO_OUTPUT,0,3",
                "uniform_50.txt,50,greedy,NO_OUTPUT,1,1,1,1,4,4",
                "uniform_50.txt,50,greedy,12,0,12,12,1,x,1",
                "uniform_50.txt,50,greedy,12",
                "convex_20.txt,20,greedy,7,0,7,7,1,1,3",
            ],
        );
        let ledger = CompletionLedger::scan(&dir, IdentityMode::Normalized).expect("scan");
        assert_eq!(ledger.completed("uniform_50.txt", "greedy"), 0);
        assert_eq!(ledger.completed("convex_20.txt", "greedy"), 1);
        assert_eq!(ledger.malformed_rows(), 2);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn damaged_requested_count_still_counts_successes() {
        let dir = scratch_dir("ledger_requested");
        write_rows(
            &dir,
            "greedy_20251119_101500_aaaaaa.csv",
            &["uniform_50.txt,50,greedy,12.5,0,12.5,12.5,1,3,"],
        );
        let ledger = CompletionLedger::scan(&dir, IdentityMode::Normalized).expect("scan");
        assert_eq!(ledger.completed("uniform_50.txt", "greedy"), 3);
        assert_eq!(ledger.malformed_rows(), 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn strict_mode_keeps_sessions_apart() {
        let dir = scratch_dir("ledger_strict");
        write_rows(
            &dir,
            "greedy_20251119_101500_aaaaaa.csv",
            &["a_1.txt,1,greedy,1,0,1,1,1,2,2"],
        );
        write_rows(
            &dir,
            "greedy_v2_20251119_101500_cccccc.csv",
            &["a_1.txt,1,greedy,1,0,1,1,1,4,4"],
        );
        let strict = CompletionLedger::scan(&dir, IdentityMode::Strict).expect("scan");
        assert_eq!(strict.completed("a_1.txt", "greedy_20251119_101500_aaaaaa"), 2);
        assert_eq!(strict.completed("a_1.txt", "greedy"), 0);
        let normalized = CompletionLedger::scan(&dir, IdentityMode::Normalized).expect("scan");
        assert_eq!(normalized.completed("a_1.txt", "greedy"), 2);
        assert_eq!(normalized.completed("a_1.txt", "greedy_v2"), 4);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let dir = scratch_dir("ledger_rebuild");
        write_rows(
            &dir,
            "greedy_20251119_101500_aaaaaa.csv",
            &["a_1.txt,1,greedy,1,0,1,1,1,2,2", "b_2.txt,2,greedy,3,0,3,3,1,1,1"],
        );
        let first = CompletionLedger::scan(&dir, IdentityMode::Normalized).expect("scan");
        let second = CompletionLedger::scan(&dir, IdentityMode::Normalized).expect("scan");
        assert_eq!(first, second);
        assert_eq!(first.entries().len(), 2);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_directory_is_an_empty_ledger() {
        let dir = scratch_dir("ledger_missing");
        let ledger =
            CompletionLedger::scan(&dir.join("nope"), IdentityMode::Normalized).expect("scan");
        assert!(ledger.entries().is_empty());
        let _ = fs::remove_dir_all(dir);
    }
}
