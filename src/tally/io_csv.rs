// Primitives for reading CSV files.

use csv::ReaderBuilder;
use encoding_rs::EUC_KR;

use crate::tally::*;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes the content of a file, returning the text and the name of the
/// encoding that worked.
///
/// The platform exports either UTF-8 (with or without BOM) or CP949. The EUC-KR
/// decoder of encoding_rs covers CP949 too. As a last resort, invalid bytes are
/// replaced.
pub fn decode_bytes(bytes: &[u8]) -> (String, &'static str) {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(s) = std::str::from_utf8(rest) {
            return (s.to_string(), "utf-8-sig");
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return (s.to_string(), "utf-8");
    }
    if let Some(s) = EUC_KR.decode_without_bom_handling_and_without_replacement(bytes) {
        return (s.into_owned(), "cp949");
    }
    (String::from_utf8_lossy(bytes).into_owned(), "utf-8-lossy")
}

/// Parses decoded CSV content. The first record holds the headers.
pub fn parse_csv_str(content: &str, path: &str) -> TallyResult<RecordSet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context(CsvParseSnafu { path })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    debug!("parse_csv_str: headers: {:?}", headers);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for line_r in reader.records() {
        let line = line_r.context(CsvParseSnafu { path })?;
        let row: Vec<Cell> = line
            .iter()
            .map(|s| {
                if s.is_empty() {
                    Cell::Empty
                } else {
                    Cell::String(s.to_string())
                }
            })
            .collect();
        rows.push(row);
    }
    Ok(RecordSet::new(headers, rows))
}

pub fn read_csv_records(path: &str) -> TallyResult<RecordSet> {
    let bytes = fs::read(path).context(ReadingFileSnafu { path })?;
    let (content, encoding) = decode_bytes(&bytes);
    info!(
        "Read {:?} ({} bytes, {})",
        io_common::simplify_file_name(path),
        bytes.len(),
        encoding
    );
    parse_csv_str(&content, path)
}
