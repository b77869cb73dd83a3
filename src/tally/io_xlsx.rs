// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::tally::*;

// Excel stores dates as a number of days since 1899-12-30 (the 1900 leap
// year bug included). Serials past 9999-12-31 are not dates.
const MAX_EXCEL_SERIAL: f64 = 2958466.0;

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial >= MAX_EXCEL_SERIAL {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(Duration::milliseconds(millis))
}

pub fn convert_cell(dt: &DataType) -> Cell {
    match dt {
        DataType::Empty => Cell::Empty,
        DataType::String(s) if s.is_empty() => Cell::Empty,
        DataType::String(s) => Cell::String(s.clone()),
        DataType::Int(i) => Cell::Int(*i),
        DataType::Float(f) => Cell::Float(*f),
        DataType::Bool(b) => Cell::Bool(*b),
        DataType::DateTime(f) => match excel_serial_to_datetime(*f) {
            Some(ts) => Cell::DateTime(ts),
            None => Cell::Float(*f),
        },
        // Error cells
        _ => Cell::Empty,
    }
}

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> TallyResult<Range<DataType>> {
    debug!(
        "read_xlsx_records: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}

/// Converts a worksheet into records: the first row holds the headers.
pub fn range_to_records(wrange: &Range<DataType>) -> RecordSet {
    let mut iter = wrange.rows();
    let headers: Vec<String> = match iter.next() {
        Some(header) => header
            .iter()
            .map(|dt| {
                convert_cell(dt)
                    .as_text()
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            })
            .collect(),
        None => Vec::new(),
    };
    debug!("read_xlsx_records: header: {:?}", headers);
    let rows: Vec<Vec<Cell>> = iter
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();
    RecordSet::new(headers, rows)
}

pub fn read_xlsx_records(path: &str, worksheet_name_o: Option<&str>) -> TallyResult<RecordSet> {
    let wrange = get_range(path, worksheet_name_o)?;
    let records = range_to_records(&wrange);
    info!(
        "Read {:?}: {} rows",
        io_common::simplify_file_name(path),
        records.len()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_dates() {
        let ts = excel_serial_to_datetime(45292.5).unwrap();
        assert_eq!(ts.to_string(), "2024-01-01 12:00:00");
        assert_eq!(
            excel_serial_to_datetime(1.0).unwrap().to_string(),
            "1899-12-31 00:00:00"
        );
        assert_eq!(excel_serial_to_datetime(-1.0), None);
        assert_eq!(excel_serial_to_datetime(3e6), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn cells() {
        assert_eq!(convert_cell(&DataType::Empty), Cell::Empty);
        assert_eq!(convert_cell(&DataType::String("".to_string())), Cell::Empty);
        assert_eq!(convert_cell(&DataType::Int(3)), Cell::Int(3));
        assert_eq!(convert_cell(&DataType::Float(2.5)), Cell::Float(2.5));
        assert_eq!(convert_cell(&DataType::DateTime(3e6)), Cell::Float(3e6));
        assert_eq!(
            convert_cell(&DataType::Error(calamine::CellErrorType::Div0)),
            Cell::Empty
        );
        assert!(matches!(
            convert_cell(&DataType::DateTime(45292.0)),
            Cell::DateTime(_)
        ));
    }

    #[test]
    fn worksheet_to_records() {
        let mut wrange: Range<DataType> = Range::new((0, 0), (2, 3));
        let header = ["후원시간", "후원아이디(닉네임)", "후원하트", "참여BJ"];
        for (col, h) in header.iter().enumerate() {
            wrange.set_value((0, col as u32), DataType::String(h.to_string()));
        }
        wrange.set_value((1, 0), DataType::DateTime(45292.5));
        wrange.set_value((1, 1), DataType::String("a@ka(Kim)".to_string()));
        wrange.set_value((1, 2), DataType::Float(100.0));
        wrange.set_value((1, 3), DataType::String("BJ1".to_string()));
        wrange.set_value((2, 1), DataType::String("b".to_string()));
        wrange.set_value((2, 2), DataType::Int(5));
        wrange.set_value((2, 3), DataType::Float(7.0));

        let records = range_to_records(&wrange);
        assert_eq!(records.headers(), &header);
        assert_eq!(records.len(), 2);
        let columns = resolve(&records, ResolveMode::FuzzyName, &RoleTable::legacy()).unwrap();
        let tally = aggregate(&records, &columns);
        // Numeric BJ names read as integers.
        assert_eq!(tally.group_keys(), vec!["BJ1", "7"]);
        assert_eq!(
            records.earliest_timestamp(0).map(|t| t.to_string()),
            Some("2024-01-01 12:00:00".to_string())
        );
    }
}
