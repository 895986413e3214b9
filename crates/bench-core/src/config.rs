use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Batch settings shared by every subcommand. Command-line flags override
/// these values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub datasets: PathBuf,
    pub results_dir: PathBuf,
    pub summary_path: PathBuf,
    pub baseline_marker: String,
    pub extensions: Vec<String>,
    pub runs: u32,
    pub trial_timeout_secs: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            datasets: PathBuf::from("final_test_datasets"),
            results_dir: PathBuf::from("results/raw"),
            summary_path: PathBuf::from("results/summary/matrix_summary.txt"),
            baseline_marker: "brute".to_string(),
            extensions: vec!["txt".to_string(), "pnt".to_string()],
            runs: 1,
            trial_timeout_secs: None,
        }
    }
}

impl BenchConfig {
    /// Loads `path` if given, else the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<BenchConfig, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                BenchConfig::from_yaml_str(&raw).map_err(|e| match e {
                    ConfigError::Parse { source, .. } => ConfigError::Parse {
                        path: path.to_path_buf(),
                        source,
                    },
                    other => other,
                })?
            }
            None => BenchConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<BenchConfig, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(BenchConfig::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "extensions must name at least one file extension".to_string(),
            ));
        }
        if self.trial_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "trial_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Extensions lower-cased and without a leading dot.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}
