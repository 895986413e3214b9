use anyhow::Result;
use bench_core::{file_identity, list_result_files, read_result_file, IdentityMode, RunRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// All rows sharing (dataset, size, algorithm identity), combined across every
/// result file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub dataset: String,
    pub size: i64,
    pub algorithm: String,
    /// Run-count weighted mean; `None` when no row had a successful run.
    pub mean: Option<f64>,
    pub successful_runs: u64,
    pub rows: usize,
}

#[derive(Default)]
struct Accumulator {
    weighted_sum: f64,
    weight: u64,
    rows: usize,
}

/// Folds `(identity, record)` pairs into merged records, ordered by key.
/// Sentinel rows keep their group alive but add no weight.
pub fn merge_records<I>(rows: I) -> Vec<MergedRecord>
where
    I: IntoIterator<Item = (String, RunRecord)>,
{
    let mut groups: BTreeMap<(String, i64, String), Accumulator> = BTreeMap::new();
    for (identity, record) in rows {
        let acc = groups
            .entry((record.dataset.clone(), record.size, identity))
            .or_default();
        acc.rows += 1;
        let runs = record.completed_runs();
        if let (Some(mean), true) = (record.mean.value(), runs > 0) {
            acc.weighted_sum += mean * f64::from(runs);
            acc.weight += u64::from(runs);
        }
    }
    groups
        .into_iter()
        .map(|((dataset, size, algorithm), acc)| MergedRecord {
            dataset,
            size,
            algorithm,
            mean: (acc.weight > 0).then(|| acc.weighted_sum / acc.weight as f64),
            successful_runs: acc.weight,
            rows: acc.rows,
        })
        .collect()
}

/// Loads every result file in `dir`, for every algorithm, keyed by the
/// normalized file identity.
pub fn load_merged(dir: &Path) -> Result<Vec<MergedRecord>> {
    let files = list_result_files(dir)?;
    let mut rows = Vec::new();
    for path in &files {
        let parsed = match read_result_file(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable result file");
                continue;
            }
        };
        let identity = file_identity(path, IdentityMode::Normalized);
        rows.extend(parsed.records.into_iter().map(|r| (identity.clone(), r)));
    }
    let merged = merge_records(rows);
    debug!(files = files.len(), groups = merged.len(), "merged result files");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::{summarize, RESULT_HEADER};
    use chrono::Utc;
    use std::fs;

    fn record(dataset: &str, algorithm: &str, values: &[f64]) -> RunRecord {
        RunRecord::from_session(
            dataset,
            bench_core::infer_size(dataset),
            algorithm,
            summarize(values),
            1.0,
            values.len().max(1) as u32,
        )
    }

    #[test]
    fn weighted_mean_uses_run_counts() {
        let merged = merge_records(vec![
            ("greedy".to_string(), record("a_10.txt", "greedy", &[10.0, 10.0])),
            ("greedy".to_string(), record("a_10.txt", "greedy", &[20.0, 20.0, 20.0])),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].mean, Some(16.0));
        assert_eq!(merged[0].successful_runs, 5);
        assert_eq!(merged[0].rows, 2);
    }

    #[test]
    fn sentinel_rows_add_no_weight() {
        let merged = merge_records(vec![
            ("greedy".to_string(), record("a_10.txt", "greedy", &[])),
            ("greedy".to_string(), record("a_10.txt", "greedy", &[8.0])),
        ]);
        assert_eq!(merged[0].mean, Some(8.0));
        assert_eq!(merged[0].successful_runs, 1);
    }

    #[test]
    fn group_without_successes_is_undefined_not_dropped() {
        let merged = merge_records(vec![
            ("greedy".to_string(), record("a_10.txt", "greedy", &[])),
            ("greedy".to_string(), record("a_10.txt", "greedy", &[])),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].mean, None);
        assert_eq!(merged[0].rows, 2);
    }

    #[test]
    fn identities_separate_columns() {
        let merged = merge_records(vec![
            ("greedy".to_string(), record("a_10.txt", "greedy", &[1.0])),
            ("greedy_v2".to_string(), record("a_10.txt", "greedy", &[2.0])),
        ]);
        let algos: Vec<_> = merged.iter().map(|m| m.algorithm.as_str()).collect();
        assert_eq!(algos, vec!["greedy", "greedy_v2"]);
    }

    #[test]
    fn loading_twice_gives_identical_output() {
        let dir = std::env::temp_dir().join(format!(
            "bench_analysis_merge_{}_{}",
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        fs::create_dir_all(&dir).expect("dir");
        fs::write(
            dir.join("greedy_20251119_101500_aaaaaa.csv"),
            format!("{}\na_10.txt,10,greedy,10,0,10,10,1,2,2\n", RESULT_HEADER),
        )
        .expect("write");
        fs::write(
            dir.join("greedy_20251120_101500_bbbbbb.csv"),
            format!("{}\na_10.txt,10,greedy,20,0,20,20,1,3,3\nbroken\n", RESULT_HEADER),
        )
        .expect("write");
        fs::write(
            dir.join("BruteForce_20251119_101500_cccccc.csv"),
            format!("{}\na_10.txt,10,BruteForce,15,0,15,15,1,1,1\n", RESULT_HEADER),
        )
        .expect("write");

        let first = load_merged(&dir).expect("merge");
        let second = load_merged(&dir).expect("merge");
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        let greedy = first.iter().find(|m| m.algorithm == "greedy").expect("greedy");
        assert_eq!(greedy.mean, Some(16.0));
        let _ = fs::remove_dir_all(dir);
    }
}
