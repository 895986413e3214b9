use anyhow::Result;
use bench_core::{atomic_write_bytes, list_result_files};
use std::path::Path;
use tracing::{info, warn};

pub mod matrix;
pub mod merge;
pub mod summary;

pub use matrix::{build_matrix, select_baseline, Cell, Matrix, MatrixRow};
pub use merge::{load_merged, merge_records, MergedRecord};
pub use summary::{summarize_categories, SummaryTable, TableRow};

#[derive(Debug, Clone)]
pub struct Report {
    pub merged: Vec<MergedRecord>,
    pub matrix: Matrix,
    pub table: SummaryTable,
}

impl Report {
    pub fn render(&self) -> String {
        self.table.render()
    }
}

/// Merges every result file in `results_dir` and lays the outcome out as a
/// baseline-relative comparison table.
pub fn build_report(results_dir: &Path, baseline_marker: &str) -> Result<Report> {
    if list_result_files(results_dir)?.is_empty() {
        warn!(dir = %results_dir.display(), "no result files found, summary will be empty");
    }
    let merged = load_merged(results_dir)?;
    let matrix = build_matrix(&merged, baseline_marker);
    match &matrix.baseline {
        Some(baseline) => info!(baseline = %baseline, "baseline column selected"),
        None => warn!(
            marker = baseline_marker,
            "no baseline results found, skipping percent comparison"
        ),
    }
    let table = summarize_categories(&matrix);
    Ok(Report {
        merged,
        matrix,
        table,
    })
}

pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    atomic_write_bytes(path, report.render().as_bytes())?;
    info!(path = %path.display(), "summary written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::RESULT_HEADER;
    use chrono::Utc;
    use std::fs;

    fn scratch(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bench_analysis_{}_{}_{}",
            label,
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        fs::create_dir_all(&dir).expect("scratch");
        dir
    }

    #[test]
    fn report_covers_every_attempted_pair() {
        let dir = scratch("report");
        let raw = dir.join("raw");
        fs::create_dir_all(&raw).expect("raw");
        fs::write(
            raw.join("BruteForce_20251119_101500_aaaaaa.csv"),
            format!(
                "{}\nconvex_10.txt,10,BruteForce,0,0,0,0,1,1,1\nuniform_50.txt,50,BruteForce,100,0,100,100,1,1,1\n",
                RESULT_HEADER
            ),
        )
        .expect("write");
        fs::write(
            raw.join("greedy_20251119_101600_bbbbbb.csv"),
            format!(
                "{}\nconvex_10.txt,10,greedy,4,0,4,4,1,2,2\nuniform_50.txt,50,greedy,NO_OUTPUT,NO_OUTPUT,NO_OUTPUT,NO_OUTPUT,NO_OUTPUT,0,3\n",
                RESULT_HEADER
            ),
        )
        .expect("write");

        let report = build_report(&raw, "brute").expect("report");
        let text = report.render();
        assert!(text.contains("4.0000 (baseline returned 0 - invalid)"), "{}", text);
        assert!(text.contains("NO OUTPUT"), "{}", text);
        assert!(text.contains("GLOBAL AVG"), "{}", text);
        assert!(text.lines().last().unwrap().ends_with("N/A"), "{}", text);

        let out = dir.join("summary").join("matrix_summary.txt");
        write_report(&out, &report).expect("write report");
        assert_eq!(fs::read_to_string(&out).expect("read"), text);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_results_directory_gives_an_empty_table() {
        let dir = scratch("report_empty");
        let report = build_report(&dir, "brute").expect("empty report");
        assert!(report.merged.is_empty());
        assert!(report.matrix.columns.is_empty());
        let text = report.render();
        assert!(text.starts_with("Dataset"), "{}", text);
        assert!(text.contains("GLOBAL AVG"), "{}", text);
        let _ = fs::remove_dir_all(dir);
    }
}
