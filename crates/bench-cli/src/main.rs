use anyhow::Result;
use bench_core::{BenchConfig, IdentityMode};
use bench_runner::{CompletionLedger, Harness, ProcessHarness, SessionOptions};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bench", version, about = "Resumable point-set algorithm benchmark runner")]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the remaining trials for every dataset and record them in a new result file
    Run {
        #[arg(long = "exec")]
        executable: PathBuf,
        #[arg(long)]
        datasets: Option<PathBuf>,
        #[arg(long, short = 'r')]
        runs: Option<u32>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        timeout_secs: Option<u64>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Merge all result files into the baseline-relative summary table
    Aggregate {
        #[arg(long)]
        results: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        baseline: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Show how many successful runs each (dataset, algorithm) pair already has
    Ledger {
        #[arg(long)]
        results: Option<PathBuf>,
        #[arg(long)]
        algorithm: Option<String>,
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// List the datasets a run would pick up
    Datasets {
        #[arg(long)]
        datasets: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = command_json_mode(&cli.command);
    let result = run_command(cli.command);
    match result {
        Ok(Some(payload)) => {
            emit_json(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            if json_mode {
                let code = if err.downcast_ref::<bench_runner::DiscoveryError>().is_some() {
                    "no_datasets"
                } else {
                    "command_failed"
                };
                emit_json(&json_error(code, format!("{:#}", err), json!({})));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(command: Commands) -> Result<Option<Value>> {
    match command {
        Commands::Run {
            executable,
            datasets,
            runs,
            tag,
            output_dir,
            timeout_secs,
            config,
            json,
        } => {
            let mut cfg = BenchConfig::load(config.as_deref())?;
            if let Some(secs) = timeout_secs {
                cfg.trial_timeout_secs = Some(secs);
            }
            cfg.validate()?;
            let options = SessionOptions {
                dataset_root: datasets.unwrap_or_else(|| cfg.datasets.clone()),
                output_dir: output_dir.unwrap_or_else(|| cfg.results_dir.clone()),
                tag,
                requested_runs: runs.unwrap_or(cfg.runs),
                extensions: cfg.normalized_extensions(),
            };
            let harness = ProcessHarness::new(&executable)?
                .with_timeout(cfg.trial_timeout_secs.map(Duration::from_secs));
            let report = bench_runner::run_session(&options, &harness)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "run",
                    "algorithm": harness.algorithm(),
                    "executable": harness.executable().display().to_string(),
                    "session": serde_json::to_value(&report)?,
                })));
            }
            println!("algorithm: {}", harness.algorithm());
            println!("identity: {}", report.identity);
            println!("runs_requested: {}", report.requested_runs);
            println!("datasets: {}", report.datasets_discovered);
            println!("datasets_run: {}", report.datasets_run);
            println!("datasets_skipped: {}", report.datasets_skipped);
            println!(
                "trials: {} ({} successful)",
                report.trials_attempted, report.trials_succeeded
            );
            println!("output: {}", report.output_path.display());
        }
        Commands::Aggregate {
            results,
            out,
            baseline,
            config,
            json,
        } => {
            let cfg = BenchConfig::load(config.as_deref())?;
            let results_dir = results.unwrap_or_else(|| cfg.results_dir.clone());
            let out_path = out.unwrap_or_else(|| cfg.summary_path.clone());
            let marker = baseline.unwrap_or_else(|| cfg.baseline_marker.clone());
            let report = bench_analysis::build_report(&results_dir, &marker)?;
            bench_analysis::write_report(&out_path, &report)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "aggregate",
                    "baseline": report.matrix.baseline,
                    "columns": report.matrix.columns,
                    "merged": serde_json::to_value(&report.merged)?,
                    "table": report.render(),
                    "summary_path": out_path.display().to_string(),
                })));
            }
            print!("{}", report.render());
            println!();
            println!("summary: {}", out_path.display());
        }
        Commands::Ledger {
            results,
            algorithm,
            strict,
            config,
            json,
        } => {
            let cfg = BenchConfig::load(config.as_deref())?;
            let results_dir = results.unwrap_or_else(|| cfg.results_dir.clone());
            let mode = if strict {
                IdentityMode::Strict
            } else {
                IdentityMode::Normalized
            };
            let ledger = CompletionLedger::scan(&results_dir, mode)?;
            let entries: Vec<_> = ledger
                .entries()
                .into_iter()
                .filter(|e| algorithm.as_deref().map_or(true, |a| e.algorithm == a))
                .collect();
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "ledger",
                    "results_dir": results_dir.display().to_string(),
                    "strict": strict,
                    "files_scanned": ledger.files_scanned(),
                    "malformed_rows": ledger.malformed_rows(),
                    "entries": serde_json::to_value(&entries)?,
                })));
            }
            println!("results_dir: {}", results_dir.display());
            println!("files_scanned: {}", ledger.files_scanned());
            println!("malformed_rows: {}", ledger.malformed_rows());
            for entry in &entries {
                println!(
                    "{}\t{}\t{}",
                    entry.algorithm, entry.dataset, entry.successful_runs
                );
            }
        }
        Commands::Datasets {
            datasets,
            config,
            json,
        } => {
            let cfg = BenchConfig::load(config.as_deref())?;
            let root = datasets.unwrap_or_else(|| cfg.datasets.clone());
            let found = bench_runner::discover_datasets(&root, &cfg.normalized_extensions())?;
            let listing: Vec<Value> = found
                .iter()
                .map(|d| match bench_runner::load_points(&d.path) {
                    Ok(points) => json!({
                        "name": d.name,
                        "path": d.path.display().to_string(),
                        "size": d.size,
                        "points": points.len(),
                    }),
                    Err(e) => json!({
                        "name": d.name,
                        "path": d.path.display().to_string(),
                        "size": d.size,
                        "error": e.to_string(),
                    }),
                })
                .collect();
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "datasets",
                    "root": root.display().to_string(),
                    "datasets": listing,
                })));
            }
            for item in &listing {
                let detail = match (item.get("points"), item.get("error")) {
                    (Some(points), _) => format!("{} points", points),
                    (_, Some(error)) => format!("unreadable: {}", error.as_str().unwrap_or("")),
                    _ => String::new(),
                };
                println!(
                    "{}\tsize={}\t{}",
                    item["name"].as_str().unwrap_or(""),
                    item["size"],
                    detail
                );
            }
        }
    }
    Ok(None)
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::Run { json, .. }
        | Commands::Aggregate { json, .. }
        | Commands::Ledger { json, .. }
        | Commands::Datasets { json, .. } => *json,
    }
}
