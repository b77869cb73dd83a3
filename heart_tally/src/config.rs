// ********* Input data structures ***********

use chrono::NaiveDateTime;
use std::error::Error;
use std::fmt::Display;

/// A raw scalar, as read from one cell of an input file.
///
/// The readers never interpret the content: a CSV field is always a `String`
/// (or `Empty`), while spreadsheet cells keep their native type.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

/// The semantic roles that the engine needs from the input columns.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Role {
    /// The time of the donation event. Only used to derive the date prefix.
    Time,
    /// The donor identity, `ID` or `ID(NICKNAME)`.
    Identity,
    /// The number of hearts donated.
    Amount,
    /// The participating broadcaster (BJ).
    Group,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Time, Role::Identity, Role::Amount, Role::Group];

    /// Roles without which no computation can happen.
    pub const MANDATORY: [Role; 3] = [Role::Identity, Role::Amount, Role::Group];
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Time => "time",
            Role::Identity => "identity",
            Role::Amount => "amount",
            Role::Group => "group",
        };
        write!(f, "{}", s)
    }
}

/// How the columns are located in the merged input.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ResolveMode {
    /// Fixed positions: time, identity, amount, group.
    Positional,
    /// By matching fragments of the header text, see [RoleTable].
    FuzzyName,
}

/// For each role, the fragments that must all appear in a header for this
/// column to be bound to the role.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoleTable {
    pub time: Vec<String>,
    pub identity: Vec<String>,
    pub amount: Vec<String>,
    pub group: Vec<String>,
}

impl RoleTable {
    /// The header fragments used by the broadcasting platform exports
    /// (`후원시간`, `후원아이디(닉네임)`, `후원하트`, `참여BJ`).
    pub fn legacy() -> RoleTable {
        let v = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<String>>();
        RoleTable {
            time: v(&["후원", "시간"]),
            identity: v(&["후원", "아이디"]),
            amount: v(&["후원", "하트"]),
            group: v(&["참여", "BJ"]),
        }
    }

    pub fn required(&self, role: Role) -> &[String] {
        match role {
            Role::Time => &self.time,
            Role::Identity => &self.identity,
            Role::Amount => &self.amount,
            Role::Group => &self.group,
        }
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        RoleTable::legacy()
    }
}

/// Column indexes (0-based) of each role in a record set.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ResolvedColumns {
    pub time: Option<usize>,
    pub identity: usize,
    pub amount: usize,
    pub group: usize,
}

// ******** Output data structures *********

/// The two donation categories ("일반" / "제휴").
///
/// The order of the variants is the order of the blocks in the settlement view.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Standard,
    Partner,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Standard => "일반",
            Category::Partner => "제휴",
        }
    }
}

/// One row of an output table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DonorRow {
    pub donor_key: String,
    pub nickname: String,
    pub total_amount: u64,
}

/// All the donations of one donor to one broadcaster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DonorAggregate {
    pub donor_key: String,
    /// The nickname that carried the most hearts for this donor.
    pub nickname: String,
    pub total_amount: u64,
    pub category: Category,
}

impl DonorAggregate {
    pub fn row(&self) -> DonorRow {
        DonorRow {
            donor_key: self.donor_key.clone(),
            nickname: self.nickname.clone(),
            total_amount: self.total_amount,
        }
    }
}

/// The two views produced for one broadcaster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GroupViews {
    pub group_key: String,
    /// Standard donors first, then partner donors, each block by decreasing amount.
    pub settlement: Vec<DonorRow>,
    /// All donors by decreasing amount.
    pub display: Vec<DonorRow>,
}

impl GroupViews {
    /// The single-table shape (one table per broadcaster, ranked by amount).
    pub fn flat(&self) -> &[DonorRow] {
        &self.display
    }

    pub fn total(&self) -> u64 {
        self.display.iter().map(|r| r.total_amount).sum()
    }
}

/// The result of the per-donor aggregation, by broadcaster.
///
/// Broadcasters are kept in the order in which they first appear in the input.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Tally {
    pub groups: Vec<GroupViews>,
}

impl Tally {
    pub fn get(&self, group_key: &str) -> Option<&GroupViews> {
        self.groups.iter().find(|g| g.group_key == group_key)
    }

    pub fn group_keys(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.group_key.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

/// One line of the summary table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RollupRow {
    pub group_key: String,
    pub standard_total: u64,
    pub partner_total: u64,
    pub total: u64,
}

/// Errors that prevent the columns from being located.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SchemaError {
    /// Positional mode needs at least 4 columns.
    TooFewColumns { found: usize },
    /// Some mandatory roles did not match any header.
    MissingRoles(Vec<Role>),
}

impl Error for SchemaError {}

impl Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::TooFewColumns { found } => write!(
                f,
                "not enough columns: found {}, expected time, identity(nickname), amount, BJ",
                found
            ),
            SchemaError::MissingRoles(roles) => {
                let names: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
                write!(f, "could not find the columns for: {}", names.join(", "))
            }
        }
    }
}
