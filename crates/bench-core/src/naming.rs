//! Filename heuristics shared by the runner and the aggregation.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

fn thousands_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*[kK]").expect("valid size pattern"))
}

fn digits_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits pattern"))
}

fn session_suffix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<base>.+?)_\d{8}_\d{6}(?:_[0-9A-Za-z]+)?$").expect("valid suffix pattern")
    })
}

/// Point count implied by a dataset filename: `<digits>k` means thousands,
/// otherwise the last run of digits, otherwise -1.
pub fn infer_size(name: &str) -> i64 {
    if let Some(caps) = thousands_pattern().captures(name) {
        if let Some(n) = caps[1]
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_mul(1000))
        {
            return n;
        }
    }
    digits_pattern()
        .find_iter(name)
        .last()
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(-1)
}

/// Strips the `_<YYYYMMDD>_<HHMMSS>[_<suffix>]` tail every session appends to
/// its file stem, so repeated sessions of one algorithm share an identity.
pub fn normalize_identity(stem: &str) -> String {
    match session_suffix_pattern().captures(stem) {
        Some(caps) => caps["base"].to_string(),
        None => stem.to_string(),
    }
}

/// How a result file's algorithm identity is derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    /// The exact file stem; one identity per session file.
    Strict,
    /// The stem with the session timestamp and random suffix removed.
    Normalized,
}

impl IdentityMode {
    pub fn identity(self, stem: &str) -> String {
        match self {
            IdentityMode::Strict => stem.to_string(),
            IdentityMode::Normalized => normalize_identity(stem),
        }
    }
}

pub fn session_file_stem(
    algorithm: &str,
    tag: Option<&str>,
    started: &NaiveDateTime,
    suffix: &str,
) -> String {
    let tag = tag
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("_{}", t))
        .unwrap_or_default();
    format!(
        "{}{}_{}_{}",
        algorithm,
        tag,
        started.format("%Y%m%d_%H%M%S"),
        suffix
    )
}

/// Category tag of a dataset: everything before the first underscore.
pub fn category_of(dataset: &str) -> &str {
    dataset.split('_').next().unwrap_or(dataset)
}
