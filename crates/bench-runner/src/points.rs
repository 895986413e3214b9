//! Loader for the point-set dataset files handed to the algorithm.
//!
//! Two layouts exist: a leading count line followed by whitespace-separated
//! `x y` rows, or comma-separated `index,x,y` / `x,y` rows.

use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum PointsError {
    #[error("cannot read dataset: {0}")]
    Read(String),
    #[error("dataset contains no points")]
    Empty,
    #[error("line {line}: cannot parse point from '{content}'")]
    BadRow { line: usize, content: String },
    #[error("header declares {declared} points but {found} were read")]
    CountMismatch { declared: usize, found: usize },
}

pub fn load_points(path: &Path) -> Result<Vec<Point>, PointsError> {
    let text = fs::read_to_string(path).map_err(|e| PointsError::Read(e.to_string()))?;
    parse_points(&text)
}

pub fn parse_points(text: &str) -> Result<Vec<Point>, PointsError> {
    let mut rows = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .peekable();

    let declared = match rows.peek() {
        None => return Err(PointsError::Empty),
        Some((_, first)) => {
            let mut tokens = first.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some(tok), None) if !tok.contains(',') => tok.parse::<usize>().ok(),
                _ => None,
            }
        }
    };
    if declared.is_some() {
        rows.next();
    }

    let mut points = Vec::new();
    for (line, content) in rows {
        let point = parse_row(content).ok_or_else(|| PointsError::BadRow {
            line,
            content: content.to_string(),
        })?;
        points.push(point);
    }

    if let Some(declared) = declared {
        if declared != points.len() {
            return Err(PointsError::CountMismatch {
                declared,
                found: points.len(),
            });
        }
    }
    if points.is_empty() {
        return Err(PointsError::Empty);
    }
    Ok(points)
}

fn parse_row(content: &str) -> Option<Point> {
    let fields: Vec<&str> = if content.contains(',') {
        content.split(',').map(str::trim).collect()
    } else {
        content.split_whitespace().collect()
    };
    let (x, y) = match fields.as_slice() {
        [x, y] => (x, y),
        [_, x, y] => (x, y),
        _ => return None,
    };
    Some(Point {
        x: x.parse().ok()?,
        y: y.parse().ok()?,
    })
}
