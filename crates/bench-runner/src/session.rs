//! One orchestrator session: work out what is still missing, run it, and
//! append the outcome to a result file nobody else writes to.

use crate::discovery::discover_datasets;
use crate::harness::Harness;
use crate::ledger::CompletionLedger;
use anyhow::{anyhow, Result};
use bench_core::{
    csv_safe, normalize_identity, session_file_stem, summarize, IdentityMode, ResultFile,
    RunRecord,
};
use chrono::Local;
use rand::Rng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const STEM_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub dataset_root: PathBuf,
    pub output_dir: PathBuf,
    pub tag: Option<String>,
    pub requested_runs: u32,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Identity the ledger and the aggregation use for this session's rows.
    pub identity: String,
    pub output_path: PathBuf,
    pub requested_runs: u32,
    pub datasets_discovered: usize,
    pub datasets_skipped: usize,
    pub datasets_run: usize,
    pub trials_attempted: u64,
    pub trials_succeeded: u64,
    pub records: Vec<RunRecord>,
}

pub fn run_session<H: Harness + ?Sized>(
    options: &SessionOptions,
    harness: &H,
) -> Result<SessionReport> {
    let datasets = discover_datasets(&options.dataset_root, &options.extensions)?;

    // Ledger first: the session's own file must not be part of it.
    let ledger = CompletionLedger::scan(&options.output_dir, IdentityMode::Normalized)?;
    let file = create_session_file(options, harness.algorithm())?;
    let identity = file
        .path()
        .file_stem()
        .and_then(|s| s.to_str())
        .map(normalize_identity)
        .ok_or_else(|| anyhow!("unusable result file name: {}", file.path().display()))?;

    info!(
        algorithm = harness.algorithm(),
        identity = %identity,
        runs = options.requested_runs,
        datasets = datasets.len(),
        output = %file.path().display(),
        "benchmark session started"
    );

    let mut report = SessionReport {
        identity: identity.clone(),
        output_path: file.path().to_path_buf(),
        requested_runs: options.requested_runs,
        datasets_discovered: datasets.len(),
        datasets_skipped: 0,
        datasets_run: 0,
        trials_attempted: 0,
        trials_succeeded: 0,
        records: Vec::new(),
    };

    let requested = u64::from(options.requested_runs);
    for dataset in &datasets {
        let key = csv_safe(&dataset.name);
        let already = ledger.completed(&key, &identity);
        if already >= requested {
            info!(
                dataset = %dataset.name,
                done = already,
                requested,
                source = %ledger
                    .last_source(&key, &identity)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "none".to_string()),
                "skipping dataset, already complete"
            );
            report.datasets_skipped += 1;
            continue;
        }

        let remaining = (requested - already) as u32;
        info!(
            dataset = %dataset.name,
            done = already,
            requested,
            remaining,
            "running dataset"
        );

        let mut values = Vec::with_capacity(remaining as usize);
        let mut total_runtime_ms = 0.0;
        for run in 1..=remaining {
            let trial = harness.run_trial(&dataset.path);
            total_runtime_ms += trial.elapsed_ms();
            match trial.outcome {
                Ok(value) => {
                    debug!(dataset = %dataset.name, run, of = remaining, value, "trial finished");
                    values.push(value);
                }
                Err(failure) => {
                    warn!(dataset = %dataset.name, run, of = remaining, error = %failure, "trial failed");
                }
            }
        }

        let record = RunRecord::from_session(
            &dataset.name,
            dataset.size,
            harness.algorithm(),
            summarize(&values),
            total_runtime_ms,
            remaining,
        );
        file.append(&record)?;

        report.datasets_run += 1;
        report.trials_attempted += u64::from(remaining);
        report.trials_succeeded += values.len() as u64;
        report.records.push(record);
    }

    info!(
        run = report.datasets_run,
        skipped = report.datasets_skipped,
        trials = report.trials_attempted,
        succeeded = report.trials_succeeded,
        output = %report.output_path.display(),
        "benchmark session complete"
    );
    Ok(report)
}

fn create_session_file(options: &SessionOptions, algorithm: &str) -> Result<ResultFile> {
    let started = Local::now().naive_local();
    let mut rng = rand::thread_rng();
    let mut last_err = None;
    for _ in 0..STEM_ATTEMPTS {
        let suffix = format!("{:06x}", rng.gen::<u32>() & 0x00ff_ffff);
        let stem = session_file_stem(algorithm, options.tag.as_deref(), &started, &suffix);
        match ResultFile::create(&options.output_dir, &stem) {
            Ok(file) => return Ok(file),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("could not create a session result file")))
}
