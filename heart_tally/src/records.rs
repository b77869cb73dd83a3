//! The raw input rows, before any interpretation of the columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::{HashMap, HashSet};

use crate::config::Cell;

static EMPTY_CELL: Cell = Cell::Empty;

// Formats seen in the platform exports, most common first.
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

impl Cell {
    /// The textual content of the cell, or `None` for an empty cell.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::String(s) => Some(s.clone()),
            Cell::Int(i) => Some(i.to_string()),
            // Spreadsheets store every number as a float.
            Cell::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", *f as i64))
            }
            Cell::Float(f) => Some(f.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// The number of hearts in this cell.
    ///
    /// Never fails: anything that is not a finite number counts as 0, negative
    /// numbers are clamped to 0 and fractions are truncated.
    pub fn as_amount(&self) -> u64 {
        let x: f64 = match self {
            Cell::Int(i) => return (*i).max(0) as u64,
            Cell::Float(f) => *f,
            Cell::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Cell::Empty | Cell::Bool(_) | Cell::DateTime(_) => 0.0,
        };
        if x.is_finite() && x > 0.0 {
            x.trunc() as u64
        } else {
            0
        }
    }

    /// The broadcaster designated by this cell, if any.
    pub fn as_group_key(&self) -> Option<String> {
        self.as_text()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// The time of the event, when it can be understood.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            Cell::String(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS.iter() {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_local())
}

/// A table of raw cells with a header row.
///
/// Rows may be shorter than the header: missing cells read as [Cell::Empty].
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RecordSet {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RecordSet {
    /// Builds a record set. Duplicated header names get a `.1`, `.2`, ... suffix.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> RecordSet {
        RecordSet {
            headers: unique_headers(headers),
            rows,
        }
    }

    /// Stacks several record sets, in order.
    ///
    /// Columns are aligned by header name. The columns of the result are all
    /// the headers, in the order they are first seen.
    pub fn concat(sets: &[RecordSet]) -> RecordSet {
        let mut headers: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for set in sets.iter() {
            for h in set.headers.iter() {
                if !positions.contains_key(h) {
                    positions.insert(h.clone(), headers.len());
                    headers.push(h.clone());
                }
            }
        }

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for set in sets.iter() {
            let mapping: Vec<usize> = set.headers.iter().map(|h| positions[h]).collect();
            for row in set.rows.iter() {
                let mut merged = vec![Cell::Empty; headers.len()];
                for (idx, cell) in row.iter().enumerate() {
                    // Cells beyond the header of their own file have no column to go to.
                    if let Some(pos) = mapping.get(idx) {
                        merged[*pos] = cell.clone();
                    }
                }
                rows.push(merged);
            }
        }
        debug!(
            "concat: {} sets -> {} columns, {} rows",
            sets.len(),
            headers.len(),
            rows.len()
        );
        RecordSet { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// The earliest event time found in the given column.
    pub fn earliest_timestamp(&self, col: usize) -> Option<NaiveDateTime> {
        (0..self.rows.len())
            .filter_map(|idx| self.cell(idx, col).as_timestamp())
            .min()
    }
}

fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<String> = Vec::with_capacity(headers.len());
    for h in headers {
        let mut name = h.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", h, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        res.push(name);
    }
    res
}
