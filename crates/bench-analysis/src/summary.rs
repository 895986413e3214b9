//! Category grouping, average-deviation rows and the aligned text table.

use crate::matrix::{Matrix, MatrixRow};
use bench_core::category_of;
use std::collections::BTreeMap;

const DATASET_HEADER: &str = "Dataset";
const GLOBAL_LABEL: &str = "GLOBAL AVG";
const BASELINE_AVERAGE: &str = "---";
const UNAVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    Data(Vec<String>),
    Average(Vec<String>),
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// Groups matrix rows by category and interleaves per-category and global
/// average deviation rows.
pub fn summarize_categories(matrix: &Matrix) -> SummaryTable {
    let mut header = vec![DATASET_HEADER.to_string()];
    header.extend(matrix.columns.iter().cloned());

    let mut groups: BTreeMap<&str, Vec<&MatrixRow>> = BTreeMap::new();
    for row in &matrix.rows {
        groups
            .entry(category_of(&row.dataset))
            .or_default()
            .push(row);
    }

    let mut rows = Vec::new();
    for (category, members) in &groups {
        for row in members {
            let mut cells = vec![row.dataset.clone()];
            cells.extend(row.cells.iter().map(|c| c.to_string()));
            rows.push(TableRow::Data(cells));
        }
        if members.len() > 1 {
            rows.push(TableRow::Separator);
            rows.push(TableRow::Average(average_row(
                &format!("Avg - {}", category),
                matrix,
                members,
            )));
        }
        rows.push(TableRow::Separator);
    }
    let all: Vec<&MatrixRow> = matrix.rows.iter().collect();
    rows.push(TableRow::Average(average_row(GLOBAL_LABEL, matrix, &all)));

    SummaryTable { header, rows }
}

fn average_row(label: &str, matrix: &Matrix, members: &[&MatrixRow]) -> Vec<String> {
    let mut out = vec![label.to_string()];
    for idx in 0..matrix.columns.len() {
        if matrix.is_baseline_column(idx) {
            out.push(BASELINE_AVERAGE.to_string());
            continue;
        }
        let percents: Vec<f64> = members
            .iter()
            .filter_map(|row| row.cells.get(idx).and_then(|c| c.percent()))
            .collect();
        if matrix.baseline.is_none() || percents.is_empty() {
            out.push(UNAVAILABLE.to_string());
        } else {
            let mean = percents.iter().sum::<f64>() / percents.len() as f64;
            out.push(format!("{:+.2}%", mean));
        }
    }
    out
}

impl SummaryTable {
    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            if let TableRow::Data(cells) | TableRow::Average(cells) = row {
                for (w, cell) in widths.iter_mut().zip(cells) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }
        widths
    }

    /// Monospace rendering: first column left-justified, the rest
    /// right-justified, columns joined by ` | `.
    pub fn render(&self) -> String {
        let widths = self.widths();
        let rule = "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1));
        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    if i == 0 {
                        format!("{:<w$}", cell, w = *w)
                    } else {
                        format!("{:>w$}", cell, w = *w)
                    }
                })
                .collect::<Vec<_>>()
                .join(" | ")
        };

        let mut out = String::new();
        out.push_str(&line(&self.header));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for row in &self.rows {
            match row {
                TableRow::Data(cells) | TableRow::Average(cells) => out.push_str(&line(cells)),
                TableRow::Separator => out.push_str(&rule),
            }
            out.push('\n');
        }
        out
    }
}
