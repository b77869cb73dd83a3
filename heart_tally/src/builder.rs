pub use crate::config::*;
use crate::records::RecordSet;

/// The headers of the platform export, in their positional order.
pub const LEGACY_HEADERS: [&str; 4] = ["후원시간", "후원아이디(닉네임)", "후원하트", "참여BJ"];

/// A builder for assembling a set of records in memory.
///
/// ```
/// use heart_tally::builder::Builder;
/// use heart_tally::{aggregate, resolve, ResolveMode, RoleTable};
///
/// let mut builder = Builder::legacy();
/// builder.add_donation("2024-01-01 10:00:00", "a@ka(Kim)", 100, "BJ1");
/// builder.add_donation("2024-01-01 10:05:00", "b@x(Lee)", 50, "BJ1");
/// let records = builder.build();
///
/// let columns = resolve(&records, ResolveMode::FuzzyName, &RoleTable::legacy())?;
/// let tally = aggregate(&records, &columns);
/// assert_eq!(tally.get("BJ1").unwrap().settlement[0].nickname, "Kim");
///
/// # Ok::<(), heart_tally::SchemaError>(())
/// ```
pub struct Builder {
    pub(crate) _headers: Vec<String>,
    pub(crate) _rows: Vec<Vec<Cell>>,
}

impl Builder {
    pub fn new(headers: &[&str]) -> Builder {
        Builder {
            _headers: headers.iter().map(|s| s.to_string()).collect(),
            _rows: Vec::new(),
        }
    }

    /// A builder with the headers of the platform export.
    pub fn legacy() -> Builder {
        Builder::new(&LEGACY_HEADERS)
    }

    /// Adds a row of raw cells.
    pub fn add_row(&mut self, cells: Vec<Cell>) {
        self._rows.push(cells);
    }

    /// Adds a donation in the positional layout: time, identity, amount, BJ.
    pub fn add_donation(&mut self, time: &str, identity: &str, amount: i64, group: &str) {
        self.add_row(vec![
            Cell::String(time.to_string()),
            Cell::String(identity.to_string()),
            Cell::Int(amount),
            Cell::String(group.to_string()),
        ]);
    }

    pub fn build(self) -> RecordSet {
        RecordSet::new(self._headers, self._rows)
    }
}
