//! The result directory: write-once session files plus readers that treat the
//! whole directory as one unordered collection of records.

use crate::ensure_dir;
use crate::naming::IdentityMode;
use crate::record::{RunRecord, RESULT_HEADER};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A session's own output file. Only the owning session ever writes to it.
#[derive(Debug)]
pub struct ResultFile {
    path: PathBuf,
}

impl ResultFile {
    /// Creates `<dir>/<stem>.csv` with its header. Fails rather than truncate
    /// if the name is already taken.
    pub fn create(dir: &Path, stem: &str) -> Result<ResultFile> {
        ensure_dir(dir)?;
        let path = dir.join(format!("{}.csv", stem));
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(anyhow!("result file already exists: {}", path.display()))
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(format!("{}\n", RESULT_HEADER).as_bytes())?;
        file.sync_all()?;
        Ok(ResultFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row and flushes it to disk before returning.
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open result file {}", self.path.display()))?;
        file.write_all(format!("{}\n", record.to_csv_line()).as_bytes())?;
        file.sync_data()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ResultFileRows {
    pub records: Vec<RunRecord>,
    pub malformed: usize,
}

/// Reads every well-formed row of one result file. Malformed rows are counted
/// and skipped.
pub fn read_result_file(path: &Path) -> Result<ResultFileRows> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read result file {}", path.display()))?;
    let mut rows = ResultFileRows::default();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if idx == 0 && line.trim_start().starts_with("dataset,") {
            continue;
        }
        match RunRecord::parse_csv_line(line) {
            Ok(record) => rows.records.push(record),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping malformed result row"
                );
                rows.malformed += 1;
            }
        }
    }
    Ok(rows)
}

/// All `.csv` files directly inside `dir`, sorted by name. A missing
/// directory simply has no results yet.
pub fn list_result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv") {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

pub fn file_identity(path: &Path, mode: IdentityMode) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    mode.identity(stem)
}
