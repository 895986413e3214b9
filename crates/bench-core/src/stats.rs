use serde::Serialize;

/// Summary of the successful outcomes of one (dataset, algorithm) pair within
/// a single session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStats {
    pub mean: f64,
    /// Population standard deviation (divides by N).
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Folds successful trial values into mean/stddev/min/max. `None` when there
/// were no successes, which callers must record as the `NO_OUTPUT` sentinel.
pub fn summarize(values: &[f64]) -> Option<RunStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let stddev = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    } else {
        0.0
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(RunStats {
        mean,
        stddev,
        min,
        max,
        count: values.len(),
    })
}
