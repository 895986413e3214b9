//! Adapter around the external algorithm executable.
//!
//! The executable is a black box: it gets the dataset path as its only
//! argument and must print a `RESULT,<value>[,...]` line on stdout. Exit status
//! is not inspected.

use anyhow::{anyhow, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const RESULT_PREFIX: &str = "RESULT,";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why a single trial produced no value. Never fatal to a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrialFailure {
    #[error("no RESULT line found")]
    NoResultLine,
    #[error("failed to parse RESULT: '{payload}'")]
    ParseError { payload: String },
    #[error("process error: {0}")]
    ProcessError(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub elapsed: Duration,
    pub outcome: Result<f64, TrialFailure>,
}

impl Trial {
    pub fn elapsed_ms(&self) -> f64 {
        (self.elapsed.as_secs_f64() * 1000.0 * 1000.0).round() / 1000.0
    }
}

/// Something that can run one trial of an algorithm against a dataset.
pub trait Harness {
    /// Name recorded in the `algorithm` column of result rows.
    fn algorithm(&self) -> &str;

    fn run_trial(&self, dataset: &Path) -> Trial;
}

#[derive(Debug, Clone)]
pub struct ProcessHarness {
    executable: PathBuf,
    algorithm: String,
    timeout: Option<Duration>,
}

impl ProcessHarness {
    pub fn new(executable: &Path) -> Result<ProcessHarness> {
        let executable = if executable.is_absolute() {
            executable.to_path_buf()
        } else {
            std::env::current_dir()?.join(executable)
        };
        if !executable.is_file() {
            return Err(anyhow!("executable not found: {}", executable.display()));
        }
        let algorithm = executable
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("executable has no usable file name: {}", executable.display()))?
            .to_string();
        Ok(ProcessHarness {
            executable,
            algorithm,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> ProcessHarness {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn capture_stdout(&self, dataset: &Path) -> Result<String, TrialFailure> {
        let mut child = Command::new(&self.executable)
            .arg(dataset)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                TrialFailure::ProcessError(format!("spawn {}: {}", self.executable.display(), e))
            })?;

        let Some(timeout) = self.timeout else {
            let output = child
                .wait_with_output()
                .map_err(|e| TrialFailure::ProcessError(e.to_string()))?;
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        };

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| TrialFailure::ProcessError("stdout was not captured".to_string()))?;
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        });

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // the reader finishes on its own once every writer closes the pipe
                    return Err(TrialFailure::TimedOut(timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(TrialFailure::ProcessError(e.to_string()));
                }
            }
        }
        // a background grandchild may still hold the pipe open
        while !reader.is_finished() {
            if Instant::now() >= deadline {
                return Err(TrialFailure::TimedOut(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
        let bytes = reader
            .join()
            .map_err(|_| TrialFailure::ProcessError("stdout reader panicked".to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Harness for ProcessHarness {
    fn algorithm(&self) -> &str {
        &self.algorithm
    }

    fn run_trial(&self, dataset: &Path) -> Trial {
        let start = Instant::now();
        let outcome = self
            .capture_stdout(dataset)
            .and_then(|stdout| parse_result_output(&stdout));
        Trial {
            elapsed: start.elapsed(),
            outcome,
        }
    }
}

/// Extracts the reported scalar from captured stdout. The last `RESULT,` line
/// wins; only its first comma-separated field is read.
pub fn parse_result_output(stdout: &str) -> Result<f64, TrialFailure> {
    let mut payload = None;
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix(RESULT_PREFIX) {
            payload = Some(rest.trim());
        }
    }
    let payload = payload.ok_or(TrialFailure::NoResultLine)?;
    let first = payload.split(',').next().unwrap_or_default().trim();
    match first.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(TrialFailure::ParseError {
            payload: payload.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_field_of_result_line() {
        let out = "loading 50 points\nRESULT,1234.5678,17.2\ndone\n";
        assert_eq!(parse_result_output(out), Ok(1234.5678));
    }

    #[test]
    fn last_result_line_wins() {
        let out = "RESULT,10.0,1\nimproving...\nRESULT,8.5,2\n";
        assert_eq!(parse_result_output(out), Ok(8.5));
    }

    #[test]
    fn missing_result_line_is_reported() {
        assert_eq!(
            parse_result_output("segfault imminent\n"),
            Err(TrialFailure::NoResultLine)
        );
        assert_eq!(
            parse_result_output(" RESULT,1.0\n"),
            Err(TrialFailure::NoResultLine)
        );
    }

    #[test]
    fn unparseable_payload_is_reported() {
        assert_eq!(
            parse_result_output("RESULT,abc,1\n"),
            Err(TrialFailure::ParseError {
                payload: "abc,1".to_string()
            })
        );
        assert!(matches!(
            parse_result_output("RESULT,nan\n"),
            Err(TrialFailure::ParseError { .. })
        ));
    }

    #[test]
    fn crlf_output_is_accepted() {
        assert_eq!(parse_result_output("RESULT,3.25\r\n"), Ok(3.25));
    }

    #[test]
    fn missing_executable_is_rejected_up_front() {
        let err = ProcessHarness::new(Path::new("/no/such/algorithm")).expect_err("missing");
        assert!(err.to_string().contains("executable not found"), "{}", err);
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use crate::test_support::{scratch_dir, write_script};
        use std::fs;

        #[test]
        fn nonzero_exit_with_result_line_is_success() {
            let dir = scratch_dir("harness_exit");
            let exe = write_script(&dir, "crashy", "echo \"RESULT,42.5,9\"\nexit 3\n");
            let harness = ProcessHarness::new(&exe).expect("harness");
            assert_eq!(harness.algorithm(), "crashy");
            let trial = harness.run_trial(&dir.join("uniform_50.txt"));
            assert_eq!(trial.outcome, Ok(42.5));
            let _ = fs::remove_dir_all(dir);
        }

        #[test]
        fn dataset_is_passed_as_single_argument() {
            let dir = scratch_dir("harness_arg");
            let exe = write_script(&dir, "echoer", "echo \"RESULT,$#\"\n");
            let harness = ProcessHarness::new(&exe).expect("harness");
            let trial = harness.run_trial(&dir.join("name with spaces.txt"));
            assert_eq!(trial.outcome, Ok(1.0));
            let _ = fs::remove_dir_all(dir);
        }

        #[test]
        fn hang_becomes_a_timed_out_trial() {
            let dir = scratch_dir("harness_timeout");
            let exe = write_script(&dir, "hang", "exec sleep 5\n");
            let harness = ProcessHarness::new(&exe)
                .expect("harness")
                .with_timeout(Some(Duration::from_millis(200)));
            let trial = harness.run_trial(&dir.join("x.txt"));
            assert_eq!(
                trial.outcome,
                Err(TrialFailure::TimedOut(Duration::from_millis(200)))
            );
            assert!(trial.elapsed < Duration::from_secs(4));
            let _ = fs::remove_dir_all(dir);
        }

        #[test]
        fn background_writer_cannot_outlive_the_deadline() {
            let dir = scratch_dir("harness_grandchild");
            let exe = write_script(&dir, "forker", "sleep 5 &\necho RESULT,1\n");
            let harness = ProcessHarness::new(&exe)
                .expect("harness")
                .with_timeout(Some(Duration::from_millis(300)));
            let trial = harness.run_trial(&dir.join("x.txt"));
            assert_eq!(
                trial.outcome,
                Err(TrialFailure::TimedOut(Duration::from_millis(300)))
            );
            assert!(trial.elapsed < Duration::from_secs(4));
            let _ = fs::remove_dir_all(dir);
        }

        #[test]
        fn timeout_does_not_affect_fast_runs() {
            let dir = scratch_dir("harness_fast");
            let exe = write_script(&dir, "fast", "echo RESULT,7\n");
            let harness = ProcessHarness::new(&exe)
                .expect("harness")
                .with_timeout(Some(Duration::from_secs(10)));
            assert_eq!(harness.run_trial(&dir.join("x.txt")).outcome, Ok(7.0));
            let _ = fs::remove_dir_all(dir);
        }
    }
}
