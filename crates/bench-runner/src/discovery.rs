use bench_core::infer_size;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no datasets found in {root} (extensions: {extensions})")]
    NoDatasets { root: PathBuf, extensions: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetFile {
    pub path: PathBuf,
    /// Base file name; the dataset's identity in result rows.
    pub name: String,
    pub size: i64,
}

/// Recursively collects dataset files under `root` whose extension matches one
/// of `extensions` (case-insensitive), ordered by file name.
pub fn discover_datasets(
    root: &Path,
    extensions: &[String],
) -> Result<Vec<DatasetFile>, DiscoveryError> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    let mut found = Vec::new();
    if root.exists() {
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable dataset path");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.trim().to_ascii_lowercase());
            if !ext.map(|e| wanted.contains(&e)).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            found.push(DatasetFile {
                size: infer_size(&name),
                path: path.to_path_buf(),
                name,
            });
        }
    }
    if found.is_empty() {
        return Err(DiscoveryError::NoDatasets {
            root: root.to_path_buf(),
            extensions: wanted.join(","),
        });
    }
    found.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(found)
}
