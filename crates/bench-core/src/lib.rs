use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::Path;

pub mod config;
pub mod naming;
pub mod record;
pub mod results;
pub mod stats;

pub use config::{BenchConfig, ConfigError};
pub use naming::{
    category_of, infer_size, normalize_identity, session_file_stem, IdentityMode,
};
pub use record::{csv_safe, Metric, RecordError, RunRecord, NO_OUTPUT, RESULT_HEADER};
pub use results::{file_identity, list_result_files, read_result_file, ResultFile, ResultFileRows};
pub use stats::{summarize, RunStats};

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Writes `bytes` to a sibling temp file and renames it into place, so readers
/// never observe a half-written report.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let ts = Utc::now().timestamp_micros();
    let pid = std::process::id();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(".{}.tmp.{}.{}", name, pid, ts));
    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn scratch_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "bench_core_{}_{}_{}",
        label,
        std::process::id(),
        Utc::now().timestamp_micros()
    ));
    ensure_dir(&dir).expect("scratch dir");
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parent_and_leaves_no_temp_files() {
        let root = scratch_dir("atomic");
        let target = root.join("summary").join("matrix_summary.txt");
        atomic_write_bytes(&target, b"first\n").expect("write");
        atomic_write_bytes(&target, b"second\n").expect("overwrite");
        assert_eq!(fs::read_to_string(&target).expect("read"), "second\n");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .expect("list")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
        let _ = fs::remove_dir_all(root);
    }
}
