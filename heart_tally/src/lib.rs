mod config;
pub mod builder;
pub mod columns;
pub mod identity;
pub mod manual;
pub mod records;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap};

pub use crate::columns::resolve;
pub use crate::config::*;
pub use crate::identity::{classify, normalize, normalize_cell};
pub use crate::records::RecordSet;

// **** Private structures ****

// One input row, after normalization.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Donation {
    group_key: String,
    donor_key: String,
    nickname: String,
    amount: u64,
}

#[derive(Debug, Clone)]
struct DonorAccumulator {
    donor_key: String,
    total: u64,
    // (nickname, hearts given under this nickname), in order of first appearance.
    nicknames: Vec<(String, u64)>,
}

impl DonorAccumulator {
    fn new(donor_key: &str) -> DonorAccumulator {
        DonorAccumulator {
            donor_key: donor_key.to_string(),
            total: 0,
            nicknames: Vec::new(),
        }
    }

    fn add(&mut self, nickname: &str, amount: u64) {
        self.total = self.total.saturating_add(amount);
        match self.nicknames.iter_mut().find(|(n, _)| n == nickname) {
            Some((_, sub)) => *sub = sub.saturating_add(amount),
            None => self.nicknames.push((nickname.to_string(), amount)),
        }
    }

    /// The nickname with the largest sub-total. The first one seen wins a tie.
    fn nickname(&self) -> String {
        let mut best: Option<&(String, u64)> = None;
        for candidate in self.nicknames.iter() {
            match best {
                Some((_, best_amount)) if candidate.1 <= *best_amount => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|(n, _)| n.clone()).unwrap_or_default()
    }

    fn build(&self) -> DonorAggregate {
        DonorAggregate {
            donor_key: self.donor_key.clone(),
            nickname: self.nickname(),
            total_amount: self.total,
            // Decided on the final key, never carried over from a row.
            category: classify(&self.donor_key),
        }
    }
}

#[derive(Debug, Clone)]
struct GroupAccumulator {
    group_key: String,
    donors: Vec<DonorAccumulator>,
    positions: HashMap<String, usize>,
}

impl GroupAccumulator {
    fn new(group_key: &str) -> GroupAccumulator {
        GroupAccumulator {
            group_key: group_key.to_string(),
            donors: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn add(&mut self, d: &Donation) {
        let idx = match self.positions.get(&d.donor_key) {
            Some(idx) => *idx,
            None => {
                self.positions.insert(d.donor_key.clone(), self.donors.len());
                self.donors.push(DonorAccumulator::new(&d.donor_key));
                self.donors.len() - 1
            }
        };
        self.donors[idx].add(&d.nickname, d.amount);
    }

    fn build(&self) -> GroupViews {
        let aggregates: Vec<DonorAggregate> = self.donors.iter().map(|d| d.build()).collect();
        GroupViews {
            group_key: self.group_key.clone(),
            settlement: settlement_order(&aggregates),
            display: display_order(&aggregates),
        }
    }
}

fn read_donations(records: &RecordSet, columns: &ResolvedColumns) -> Vec<Donation> {
    let mut res: Vec<Donation> = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for idx in 0..records.len() {
        let group_key = match records.cell(idx, columns.group).as_group_key() {
            Some(g) => g,
            None => {
                dropped += 1;
                continue;
            }
        };
        let (donor_key, nickname) = normalize_cell(records.cell(idx, columns.identity));
        let amount = records.cell(idx, columns.amount).as_amount();
        res.push(Donation {
            group_key,
            donor_key,
            nickname,
            amount,
        });
    }
    debug!(
        "read_donations: {} donations, {} rows without BJ dropped",
        res.len(),
        dropped
    );
    res
}

/// Standard donors, then partner donors, each by decreasing amount.
///
/// The sort is stable: equal amounts keep their order of first appearance.
fn settlement_order(aggregates: &[DonorAggregate]) -> Vec<DonorRow> {
    let mut sorted: Vec<&DonorAggregate> = aggregates.iter().collect();
    sorted.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(b.total_amount.cmp(&a.total_amount))
    });
    sorted.iter().map(|a| a.row()).collect()
}

fn display_order(aggregates: &[DonorAggregate]) -> Vec<DonorRow> {
    let mut sorted: Vec<&DonorAggregate> = aggregates.iter().collect();
    sorted.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    sorted.iter().map(|a| a.row()).collect()
}

/// Aggregates the donations by broadcaster and by donor.
///
/// Arguments:
/// * `records` the merged input rows
/// * `columns` where to find the identity, amount and broadcaster of each row
///
/// Rows without a broadcaster are ignored. Each donor appears once per
/// broadcaster, with the sum of its hearts and the nickname under which it
/// gave the most. The function is pure: the same input always gives the same
/// output, in the same order.
pub fn aggregate(records: &RecordSet, columns: &ResolvedColumns) -> Tally {
    info!(
        "aggregate: processing {:?} rows, columns: {:?}",
        records.len(),
        columns
    );
    let donations = read_donations(records, columns);

    let mut groups: Vec<GroupAccumulator> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for d in donations.iter() {
        let idx = match positions.get(&d.group_key) {
            Some(idx) => *idx,
            None => {
                positions.insert(d.group_key.clone(), groups.len());
                groups.push(GroupAccumulator::new(&d.group_key));
                groups.len() - 1
            }
        };
        groups[idx].add(d);
    }

    let tally = Tally {
        groups: groups.iter().map(|g| g.build()).collect(),
    };
    for g in tally.groups.iter() {
        info!(
            "aggregate: BJ {}: {} donors, {} hearts",
            g.group_key,
            g.display.len(),
            g.total()
        );
    }
    tally
}

/// Sums the hearts of each broadcaster by category.
///
/// Unlike [aggregate], donors are not merged: every row counts on its own.
/// The rows are sorted by decreasing total, then by broadcaster name.
pub fn rollup(records: &RecordSet, columns: &ResolvedColumns) -> Vec<RollupRow> {
    info!("rollup: processing {:?} rows", records.len());
    let mut sums: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for idx in 0..records.len() {
        let group_key = match records.cell(idx, columns.group).as_group_key() {
            Some(g) => g,
            None => continue,
        };
        let (donor_key, _) = normalize_cell(records.cell(idx, columns.identity));
        let amount = records.cell(idx, columns.amount).as_amount();
        let e = sums.entry(group_key).or_insert((0, 0));
        match classify(&donor_key) {
            Category::Standard => e.0 = e.0.saturating_add(amount),
            Category::Partner => e.1 = e.1.saturating_add(amount),
        }
    }

    let mut res: Vec<RollupRow> = sums
        .into_iter()
        .map(|(group_key, (standard_total, partner_total))| RollupRow {
            group_key,
            standard_total,
            partner_total,
            total: standard_total.saturating_add(partner_total),
        })
        .collect();
    res.sort_by(|a, b| b.total.cmp(&a.total));
    debug!("rollup: {:?}", res);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc(entries: &[(&str, u64)]) -> DonorAccumulator {
        let mut a = DonorAccumulator::new("u1");
        for (n, x) in entries {
            a.add(n, *x);
        }
        a
    }

    #[test]
    fn nickname_by_sub_total() {
        let a = acc(&[("Alice", 10), ("Bob", 15), ("Alice", 3)]);
        assert_eq!(a.nickname(), "Bob");
        assert_eq!(a.total, 28);
    }

    #[test]
    fn nickname_tie_keeps_first() {
        assert_eq!(acc(&[("Alice", 10), ("Bob", 10)]).nickname(), "Alice");
        assert_eq!(acc(&[("Bob", 0), ("Alice", 0)]).nickname(), "Bob");
        assert_eq!(acc(&[("", 5), ("Alice", 5)]).nickname(), "");
    }

    #[test]
    fn nickname_of_empty_accumulator() {
        assert_eq!(acc(&[]).nickname(), "");
    }

    #[test]
    fn category_from_final_key() {
        let mut a = DonorAccumulator::new("b@x");
        a.add("Lee", 1);
        assert_eq!(a.build().category, Category::Partner);
        let mut a = DonorAccumulator::new("a@ka");
        a.add("Kim", 1);
        assert_eq!(a.build().category, Category::Standard);
    }

    #[test]
    fn orders_are_stable() {
        let mk = |k: &str, x: u64| DonorAggregate {
            donor_key: k.to_string(),
            nickname: String::new(),
            total_amount: x,
            category: classify(k),
        };
        let aggs = vec![mk("p1@x", 50), mk("s1", 10), mk("p2@x", 50), mk("s2", 10), mk("s3", 30)];
        let keys = |rows: Vec<DonorRow>| rows.into_iter().map(|r| r.donor_key).collect::<Vec<_>>();
        assert_eq!(
            keys(settlement_order(&aggs)),
            vec!["s3", "s1", "s2", "p1@x", "p2@x"]
        );
        assert_eq!(
            keys(display_order(&aggs)),
            vec!["p1@x", "p2@x", "s3", "s1", "s2"]
        );
    }
}
