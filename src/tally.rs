pub mod config_reader;
pub mod export;
pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;
pub mod session;

use log::{debug, info, warn};

use heart_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::config_reader::*;
use crate::tally::export::ViewKind;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Error reading file {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing CSV file {path}"))]
    CsvParse { source: csv::Error, path: String },
    #[snafu(display("Error opening configuration {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Cannot find the directory of {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Unknown input type {provider:?} for {path}"))]
    UnknownProvider { provider: String, path: String },
    #[snafu(display("Unknown column mode {mode:?} (expected positional or fuzzy)"))]
    UnknownMode { mode: String },
    #[snafu(display("Unknown prefix policy {policy:?} (expected singleFileOnly or anyFile)"))]
    UnknownPrefixPolicy { policy: String },
    #[snafu(display("No input file given"))]
    NoInput {},
    #[snafu(display("None of the {count} input files could be read"))]
    NoReadableInput { count: usize },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Wrong password"))]
    AccessDenied {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;

/// Everything a run needs, once the configuration file and the command line
/// have been merged and validated.
#[derive(PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub inputs: Vec<InputFile>,
    pub output_directory: Option<String>,
    pub summary_path: Option<String>,
    pub aggregation_mode: ResolveMode,
    pub rollup_mode: ResolveMode,
    pub roles: RoleTable,
    pub prefix_policy: PrefixPolicy,
    pub reference: Option<String>,
}

/// What a run produced. Each computation is `None` when it was skipped.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct TallyReport {
    pub prefix: Option<String>,
    pub rollup: Option<Vec<RollupRow>>,
    pub tally: Option<Tally>,
    pub diagnostics: Vec<String>,
    pub files_written: Vec<String>,
}

fn rows_to_json(rows: &[DonorRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| {
            json!({
                "donorId": r.donor_key,
                "nickname": r.nickname,
                "hearts": r.total_amount
            })
        })
        .collect()
}

fn build_summary_js(report: &TallyReport) -> JSValue {
    let summary: Option<Vec<JSValue>> = report.rollup.as_ref().map(|rows| {
        rows.iter()
            .map(|r| {
                json!({
                    "bj": r.group_key,
                    "standard": r.standard_total,
                    "partner": r.partner_total,
                    "total": r.total
                })
            })
            .collect()
    });
    let broadcasters: Option<Vec<JSValue>> = report.tally.as_ref().map(|t| {
        t.groups
            .iter()
            .map(|g| {
                json!({
                    "bj": g.group_key,
                    "total": g.total(),
                    "settlement": rows_to_json(&g.settlement),
                    "display": rows_to_json(&g.display)
                })
            })
            .collect()
    });
    json!({
        "prefix": report.prefix,
        "summary": summary,
        "broadcasters": broadcasters,
        "diagnostics": report.diagnostics
    })
}

fn read_input(input: &InputFile) -> TallyResult<RecordSet> {
    info!("Attempting to read donation file {:?}", input.path);
    match input.provider {
        Provider::Csv => io_csv::read_csv_records(&input.path),
        Provider::Xlsx => {
            io_xlsx::read_xlsx_records(&input.path, input.excel_worksheet_name.as_deref())
        }
    }
}

/// Reads every input, keeping the ones that could be read.
fn read_inputs(settings: &RunSettings, diagnostics: &mut Vec<String>) -> TallyResult<RecordSet> {
    ensure!(!settings.inputs.is_empty(), NoInputSnafu {});
    let mut sets: Vec<RecordSet> = Vec::new();
    for input in settings.inputs.iter() {
        match read_input(input) {
            Ok(rs) => {
                debug!(
                    "read_inputs: {:?}: {} columns, {} rows",
                    input.path,
                    rs.num_columns(),
                    rs.len()
                );
                sets.push(rs);
            }
            Err(e) => {
                warn!("Could not read {:?}: {}", input.path, e);
                diagnostics.push(format!("{}: could not be read: {}", input.path, e));
            }
        }
    }
    ensure!(
        !sets.is_empty(),
        NoReadableInputSnafu {
            count: settings.inputs.len()
        }
    );
    Ok(RecordSet::concat(&sets))
}

fn resolve_or_report(
    records: &RecordSet,
    mode: ResolveMode,
    roles: &RoleTable,
    what: &str,
    diagnostics: &mut Vec<String>,
) -> Option<ResolvedColumns> {
    match resolve(records, mode, roles) {
        Ok(cols) => Some(cols),
        Err(e) => {
            warn!("Skipping the {}: {}", what, e);
            diagnostics.push(format!("{} skipped: {}", what, e));
            None
        }
    }
}

/// Computes the summary table and the per-BJ tables, writes them out and
/// checks the summary against the reference if one is given.
pub fn run_tally(settings: &RunSettings) -> TallyResult<TallyReport> {
    info!("settings: {:?}", settings);
    let mut report = TallyReport::default();
    let records = read_inputs(settings, &mut report.diagnostics)?;
    info!(
        "Merged {} rows with headers {:?}",
        records.len(),
        records.headers()
    );

    // The two computations do not depend on each other: one may fail while
    // the other goes through.
    let rollup_cols = resolve_or_report(
        &records,
        settings.rollup_mode,
        &settings.roles,
        "summary",
        &mut report.diagnostics,
    );
    report.rollup = rollup_cols.map(|cols| rollup(&records, &cols));

    let agg_cols = resolve_or_report(
        &records,
        settings.aggregation_mode,
        &settings.roles,
        "aggregation",
        &mut report.diagnostics,
    );
    report.tally = agg_cols.map(|cols| aggregate(&records, &cols));
    if let Some(t) = &report.tally {
        if t.is_empty() {
            warn!("No aggregation result");
            report.diagnostics.push("no aggregation result".to_string());
        }
    }

    let time_col = columns::find_column(records.headers(), settings.roles.required(Role::Time))
        .or(agg_cols.and_then(|c| c.time))
        .or(rollup_cols.and_then(|c| c.time));
    let paths: Vec<String> = settings.inputs.iter().map(|i| i.path.clone()).collect();
    report.prefix = io_common::derive_prefix(&paths, &records, time_col, settings.prefix_policy);
    info!("File prefix: {:?}", report.prefix);

    if let (Some(dir), Some(tally)) = (&settings.output_directory, &report.tally) {
        let dir_p = Path::new(dir.as_str());
        fs::create_dir_all(dir_p).context(WritingOutputSnafu { path: dir.clone() })?;
        for g in tally.groups.iter() {
            for view in [ViewKind::Settlement, ViewKind::Display] {
                let p = export::write_view(dir_p, report.prefix.as_deref(), g, view)?;
                report.files_written.push(p);
            }
        }
        info!("Wrote {} files to {:?}", report.files_written.len(), dir);
    }

    let summary_js = build_summary_js(&report);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    export::write_summary(settings.summary_path.as_deref(), &pretty_js_summary)?;

    // The reference summary, if provided for comparison
    if let Some(reference_p) = &settings.reference {
        let contents = fs::read_to_string(reference_p).context(OpeningJsonSnafu {
            path: reference_p.clone(),
        })?;
        let reference_js: JSValue =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        let pretty_js_reference =
            serde_json::to_string_pretty(&reference_js).context(ParsingJsonSnafu {})?;
        if pretty_js_reference != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_reference.as_str(),
                pretty_js_summary.as_str(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(report)
}

/// Merges the configuration file (if any) and the command line.
///
/// Command line options take precedence. Input files from both are used.
pub fn settings_from_args(args: &Args) -> TallyResult<RunSettings> {
    let (config, root_p): (TallyConfig, Option<PathBuf>) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {
                    path: config_path.clone(),
                })?
                .to_path_buf();
            (config, Some(root_p))
        }
        None => (TallyConfig::default(), None),
    };
    debug!("config: {:?}", config);

    let relative_to_config = |p: &str| -> String {
        match &root_p {
            Some(root) if Path::new(p).is_relative() => root.join(p).display().to_string(),
            _ => p.to_string(),
        }
    };

    let mut inputs: Vec<InputFile> = Vec::new();
    for source in config.input_files.iter() {
        inputs.push(source.validate(&relative_to_config(&source.file_path))?);
    }
    for p in args.input.iter() {
        let source = FileSource {
            provider: args.input_type.clone(),
            file_path: p.clone(),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
        };
        inputs.push(source.validate(p)?);
    }
    ensure!(!inputs.is_empty(), NoInputSnafu {});

    let output_directory = match &args.out {
        Some(o) => Some(o.clone()),
        None => config
            .output_settings
            .output_directory
            .as_deref()
            .map(relative_to_config),
    };
    let summary_path = args
        .summary
        .clone()
        .or_else(|| config.output_settings.summary_path.clone())
        .or_else(|| Some(STDOUT.to_string()));

    let aggregation_mode = match args
        .mode
        .as_ref()
        .or(config.columns.aggregation_mode.as_ref())
    {
        Some(m) => parse_mode(m)?,
        None => ResolveMode::Positional,
    };
    let rollup_mode = match args
        .rollup_mode
        .as_ref()
        .or(config.columns.rollup_mode.as_ref())
    {
        Some(m) => parse_mode(m)?,
        None => ResolveMode::FuzzyName,
    };
    let prefix_policy = match args
        .prefix_policy
        .as_ref()
        .or(config.output_settings.prefix_policy.as_ref())
    {
        Some(p) => parse_prefix_policy(p)?,
        None => PrefixPolicy::SingleFileOnly,
    };

    Ok(RunSettings {
        inputs,
        output_directory,
        summary_path,
        aggregation_mode,
        rollup_mode,
        roles: config.columns.role_table(),
        prefix_policy,
        reference: args.reference.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    const HEADER: &str = "후원시간,후원아이디(닉네임),후원하트,참여BJ\n";

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> String {
        let p = dir.join(name);
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(content).unwrap();
        p.display().to_string()
    }

    fn args(xs: &[&str]) -> Args {
        let mut all = vec!["bjtally"];
        all.extend_from_slice(xs);
        Args::parse_from(all)
    }

    fn quiet(xs: &[&str], summary: &str) -> RunSettings {
        let mut all = xs.to_vec();
        all.extend_from_slice(&["--summary", summary]);
        settings_from_args(&args(&all)).unwrap()
    }

    #[test]
    fn end_to_end_csv() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            "{}{}{}{}",
            HEADER,
            "2024-01-05 10:00:00,a@ka(Kim),100,BJ1\n",
            "2024-01-04 09:00:00,b@x(Lee),50,BJ1\n",
            "2024-01-06 11:00:00,a@ka(Kim),20,BJ2\n"
        );
        let input = write_file(dir.path(), "hearts.csv", content.as_bytes());
        let out = dir.path().join("out").display().to_string();
        let summary = dir.path().join("summary.json").display().to_string();
        let settings = quiet(&["-i", input.as_str(), "-o", out.as_str()], &summary);

        let report = run_tally(&settings).unwrap();
        assert_eq!(report.prefix, Some("01.04".to_string()));
        assert!(report.diagnostics.is_empty());
        let tally = report.tally.unwrap();
        assert_eq!(tally.group_keys(), vec!["BJ1", "BJ2"]);
        let rollup = report.rollup.unwrap();
        assert_eq!(rollup[0].group_key, "BJ1");
        assert_eq!(rollup[0].standard_total, 100);
        assert_eq!(rollup[0].partner_total, 50);

        assert_eq!(report.files_written.len(), 4);
        let settlement = fs::read_to_string(Path::new(&out).join("01.04_BJ1_정산용.csv")).unwrap();
        let lines: Vec<&str> = settlement.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(
            lines,
            vec![",BJ1,150", "후원아이디,닉네임,후원하트", "a@ka,Kim,100", "b@x,Lee,50"]
        );
        assert!(Path::new(&out).join("01.04_BJ2_BJ용.csv").exists());

        let js: JSValue =
            serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(js["prefix"], "01.04");
        assert_eq!(js["broadcasters"][0]["settlement"][1]["donorId"], "b@x");
        assert_eq!(js["summary"][1]["bj"], "BJ2");
    }

    #[test]
    fn cp949_input() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}{}", HEADER, "2024-02-01 10:00:00,u1(김철수),7,방송인A\n");
        let (bytes, _, had_errors) = encoding_rs::EUC_KR.encode(&content);
        assert!(!had_errors);
        let input = write_file(dir.path(), "02.14 내역.csv", &bytes);
        let summary = dir.path().join("s.json").display().to_string();
        let report = run_tally(&quiet(&["-i", input.as_str()], &summary)).unwrap();
        // The file name wins over the data.
        assert_eq!(report.prefix, Some("02.14".to_string()));
        let tally = report.tally.unwrap();
        let g = tally.get("방송인A").unwrap();
        assert_eq!(g.display[0].nickname, "김철수");
        assert_eq!(g.display[0].total_amount, 7);
    }

    #[test]
    fn fuzzy_failure_keeps_the_other_computation() {
        let dir = tempfile::tempdir().unwrap();
        let content = "시간,아이디,하트,방송\nt,u1(A),3,BJ\n";
        let input = write_file(dir.path(), "x.csv", content.as_bytes());
        let summary = dir.path().join("s.json").display().to_string();
        let report = run_tally(&quiet(&["-i", input.as_str()], &summary)).unwrap();
        assert_eq!(report.rollup, None);
        assert_eq!(report.tally.unwrap().len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].starts_with("summary skipped"));
    }

    #[test]
    fn several_files_and_prefix_policy() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(
            dir.path(),
            "03.01 a.csv",
            format!("{}t,u1(A),3,BJ\n", HEADER).as_bytes(),
        );
        let b = write_file(
            dir.path(),
            "b.csv",
            format!("{}t,u1(B),5,BJ\n", HEADER).as_bytes(),
        );
        let summary = dir.path().join("s.json").display().to_string();

        let report = run_tally(&quiet(&["-i", a.as_str(), "-i", b.as_str()], &summary)).unwrap();
        assert_eq!(report.prefix, None);
        let g = report.tally.unwrap();
        assert_eq!(g.get("BJ").unwrap().display[0].nickname, "B");
        assert_eq!(g.get("BJ").unwrap().display[0].total_amount, 8);

        let report = run_tally(&quiet(
            &["-i", a.as_str(), "-i", b.as_str(), "--prefix-policy", "anyFile"],
            &summary,
        ))
        .unwrap();
        assert_eq!(report.prefix, Some("03.01".to_string()));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(
            dir.path(),
            "good.csv",
            format!("{}t,u1,3,BJ\n", HEADER).as_bytes(),
        );
        let missing = dir.path().join("missing.csv").display().to_string();
        let summary = dir.path().join("s.json").display().to_string();
        let report = run_tally(&quiet(&["-i", missing.as_str(), "-i", good.as_str()], &summary)).unwrap();
        assert_eq!(report.tally.unwrap().len(), 1);
        assert_eq!(report.diagnostics.len(), 1);

        let res = run_tally(&quiet(&["-i", missing.as_str()], &summary));
        assert!(matches!(res, Err(TallyError::NoReadableInput { count: 1 })));
    }

    #[test]
    fn reference_check() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "x.csv",
            format!("{}t,u1(A),3,BJ\n", HEADER).as_bytes(),
        );
        let summary = dir.path().join("s.json").display().to_string();
        let settings = quiet(&["-i", input.as_str()], &summary);
        run_tally(&settings).unwrap();

        // The summary of a run is its own reference.
        let mut with_ref = settings.clone();
        with_ref.reference = Some(summary.clone());
        let summary2 = dir.path().join("s2.json").display().to_string();
        with_ref.summary_path = Some(summary2);
        assert!(run_tally(&with_ref).is_ok());

        let other = write_file(dir.path(), "other.json", b"{\"prefix\": \"12.25\"}");
        with_ref.reference = Some(other);
        assert!(run_tally(&with_ref).is_err());
    }

    #[test]
    fn settings_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "in.csv",
            format!("{}t,u1,3,BJ\n", HEADER).as_bytes(),
        );
        let config = write_file(
            dir.path(),
            "config.json",
            r#"{
                "outputSettings": {"outputDirectory": "out", "prefixPolicy": "anyFile"},
                "inputFiles": [{"filePath": "in.csv"}],
                "columns": {"aggregationMode": "fuzzy", "roles": {"group": ["BJ"]}}
            }"#
            .as_bytes(),
        );
        let settings = settings_from_args(&args(&["-c", config.as_str(), "--rollup-mode", "positional"])).unwrap();
        assert_eq!(settings.inputs.len(), 1);
        assert_eq!(settings.inputs[0].provider, Provider::Csv);
        assert!(Path::new(&settings.inputs[0].path).exists());
        assert_eq!(
            settings.output_directory,
            Some(dir.path().join("out").display().to_string())
        );
        assert_eq!(settings.prefix_policy, PrefixPolicy::AnyFile);
        assert_eq!(settings.aggregation_mode, ResolveMode::FuzzyName);
        assert_eq!(settings.rollup_mode, ResolveMode::Positional);
        assert_eq!(settings.roles.group, vec!["BJ".to_string()]);
        assert_eq!(settings.roles.amount, RoleTable::legacy().amount);
        assert_eq!(settings.summary_path, Some(STDOUT.to_string()));
    }

    #[test]
    fn no_input() {
        assert!(matches!(
            settings_from_args(&args(&[])),
            Err(TallyError::NoInput {})
        ));
    }
}
