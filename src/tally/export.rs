// Writing the per-BJ tables and the summary.

use std::io::Write;

use csv::Writer;

use crate::tally::*;

/// The two tables written for each BJ.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ViewKind {
    /// Standard donors, then partner donors.
    Settlement,
    /// All donors by decreasing hearts.
    Display,
}

impl ViewKind {
    pub fn label(&self) -> &'static str {
        match self {
            ViewKind::Settlement => "정산용",
            ViewKind::Display => "BJ용",
        }
    }

    pub fn rows<'a>(&self, g: &'a GroupViews) -> &'a [DonorRow] {
        match self {
            ViewKind::Settlement => &g.settlement,
            ViewKind::Display => &g.display,
        }
    }
}

pub const TABLE_HEADER: [&str; 3] = ["후원아이디", "닉네임", "후원하트"];

/// Writes one table as CSV, with a byte order mark so that spreadsheet
/// programs pick up UTF-8.
///
/// The first row carries the BJ and its total, the second one the column names.
pub fn write_table<W: Write>(mut out: W, g: &GroupViews, view: ViewKind) -> csv::Result<()> {
    out.write_all(b"\xEF\xBB\xBF")?;
    let mut wtr = Writer::from_writer(out);
    let total = g.total().to_string();
    wtr.write_record(["", g.group_key.as_str(), total.as_str()])?;
    wtr.write_record(TABLE_HEADER)?;
    for r in view.rows(g) {
        let amount = r.total_amount.to_string();
        wtr.write_record([r.donor_key.as_str(), r.nickname.as_str(), amount.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a table into the output directory and returns the path of the file.
pub fn write_view(
    dir: &Path,
    prefix: Option<&str>,
    g: &GroupViews,
    view: ViewKind,
) -> TallyResult<String> {
    let p = dir
        .join(io_common::output_file_name(prefix, &g.group_key, view))
        .display()
        .to_string();
    debug!("write_view: {:?} ({} rows)", p, view.rows(g).len());
    let f = fs::File::create(&p).context(WritingOutputSnafu { path: p.clone() })?;
    write_table(f, g, view).context(WritingCsvSnafu { path: p.clone() })?;
    Ok(p)
}

/// Writes the summary to the given path, or prints it.
pub fn write_summary(path: Option<&str>, content: &str) -> TallyResult<()> {
    match path {
        None | Some(STDOUT) => {
            println!("{}", content);
        }
        Some(p) => {
            fs::write(p, content).context(WritingOutputSnafu { path: p })?;
            info!("Summary written to {:?}", p);
        }
    }
    Ok(())
}
