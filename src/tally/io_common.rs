// File names: the date prefix of the inputs and the names of the exported tables.

use std::path::Path;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::tally::export::ViewKind;
use crate::tally::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// The `MM.DD` that starts the name of the first input file that has one.
pub fn prefix_from_file_names(paths: &[String]) -> Option<String> {
    let re = Regex::new(r"^(\d{2}\.\d{2})").ok()?;
    paths.iter().find_map(|p| {
        let stem = file_stem(p);
        re.captures(stem.as_str())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

pub fn prefix_from_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%m.%d").to_string()
}

/// The date prefix of the exported files.
///
/// The file names take precedence over the content of the time column. Under
/// `SingleFileOnly`, no prefix is derived when several files are given.
pub fn derive_prefix(
    paths: &[String],
    records: &RecordSet,
    time_col: Option<usize>,
    policy: PrefixPolicy,
) -> Option<String> {
    if policy == PrefixPolicy::SingleFileOnly && paths.len() != 1 {
        debug!(
            "derive_prefix: {} input files, no prefix under {:?}",
            paths.len(),
            policy
        );
        return None;
    }
    if let Some(p) = prefix_from_file_names(paths) {
        debug!("derive_prefix: from file names: {:?}", p);
        return Some(p);
    }
    let ts = time_col.and_then(|col| records.earliest_timestamp(col))?;
    debug!("derive_prefix: from earliest donation: {:?}", ts);
    Some(prefix_from_timestamp(&ts))
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// `<prefix>_<BJ>_<view>.csv`, or `<BJ>_<view>.csv` without a prefix.
pub fn output_file_name(prefix: Option<&str>, group_key: &str, view: ViewKind) -> String {
    let base = format!("{}_{}.csv", sanitize(group_key), view.label());
    match prefix {
        Some(p) => format!("{}_{}", p, base),
        None => base,
    }
}
