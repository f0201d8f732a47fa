//! Tally primitives for the Elections Canada event-results export.
//!
//! This crate holds the pure bookkeeping of the pipeline: deciding which
//! result rows count, summing votes into party buckets and computing the
//! per-riding margin of victory (MOV). File ingestion, geometry and
//! rendering live in the binary crate.

use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::Display;

/// Only rows whose result type starts with this prefix are tabulated.
/// Validated and judicially-recounted rows are excluded on purpose: the
/// export mixes result types for the same riding and counting both would
/// double the votes.
pub const PRELIMINARY_PREFIX: &str = "preliminary";

// ********* Input data structures ***********

/// One line item of the event-results export, in file column order.
///
/// Only the two fields that enter arithmetic (`votes`, `votes_pct`) are
/// parsed to numbers at load time. The trailing ballot counters are kept
/// verbatim: they are per-riding figures repeated on every candidate row
/// and are not summed anywhere.
#[derive(PartialEq, Debug, Clone)]
pub struct ResultRow {
    /// Electoral district number, e.g. "35007". Kept as text: it is a key,
    /// not a quantity.
    pub district_num: String,
    pub district_name_en: String,
    pub district_name_fr: String,
    /// English result type, e.g. "preliminary results" or "validated results".
    pub result_type: String,
    pub result_type_fr: String,
    pub surname: String,
    pub middle_name: String,
    pub given_name: String,
    /// English political affiliation. Party bucketing matches this field.
    pub affiliation: String,
    pub affiliation_fr: String,
    /// Votes obtained by this candidate row.
    pub votes: u64,
    /// Percentage of votes obtained within the riding.
    pub votes_pct: f64,
    pub rejected_ballots: String,
    pub total_ballots: String,
}

impl ResultRow {
    pub fn party(&self) -> Party {
        Party::from_affiliation(&self.affiliation)
    }

    pub fn is_preliminary(&self) -> bool {
        self.result_type.starts_with(PRELIMINARY_PREFIX)
    }
}

/// The four tracked party buckets.
///
/// Bucketing is an exact match on the English affiliation text. Everything
/// else (independents, minor parties, spelling variants) is `Other`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Party {
    Liberal,
    Conservative,
    Ndp,
    Other,
}

impl Party {
    pub fn from_affiliation(affiliation: &str) -> Party {
        match affiliation {
            "Liberal" => Party::Liberal,
            "Conservative" => Party::Conservative,
            "NDP-New Democratic Party" => Party::Ndp,
            _ => Party::Other,
        }
    }
}

/// True iff the row counts towards the tallies: its riding is in the
/// allow-list and its result type is preliminary.
pub fn is_included(row: &ResultRow, districts: &HashSet<&str>) -> bool {
    districts.contains(row.district_num.as_str()) && row.is_preliminary()
}

/// Restricts the full export to the allow-listed ridings and to preliminary
/// rows. Row order is preserved.
pub fn filter_rows<'a>(rows: &'a [ResultRow], districts: &[&str]) -> Vec<&'a ResultRow> {
    let district_set: HashSet<&str> = districts.iter().copied().collect();
    let res: Vec<&ResultRow> = rows
        .iter()
        .filter(|r| is_included(r, &district_set))
        .collect();
    debug!(
        "filter_rows: kept {} of {} rows for {} ridings",
        res.len(),
        rows.len(),
        districts.len()
    );
    res
}

// ******** Output data structures *********

/// Votes summed per party bucket over all filtered rows, regardless of
/// riding. Percentages are votes-weighted, not riding-weighted.
#[derive(PartialEq, Debug, Clone, Default, Serialize)]
pub struct AggregateTotals {
    pub liberal: u64,
    pub conservative: u64,
    pub ndp: u64,
    pub other: u64,
}

impl AggregateTotals {
    pub fn total(&self) -> u64 {
        self.liberal + self.conservative + self.ndp + self.other
    }

    pub fn votes(&self, party: Party) -> u64 {
        match party {
            Party::Liberal => self.liberal,
            Party::Conservative => self.conservative,
            Party::Ndp => self.ndp,
            Party::Other => self.other,
        }
    }

    /// Percentage of the combined total, in [0, 100]. An empty tally has no
    /// meaningful share; 0.0 is returned rather than NaN.
    pub fn share(&self, party: Party) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.votes(party) as f64 / total as f64 * 100.0
    }
}

/// Sums votes into the four buckets in a single pass.
pub fn aggregate_totals(rows: &[&ResultRow]) -> AggregateTotals {
    let mut totals = AggregateTotals::default();
    for row in rows {
        match row.party() {
            Party::Liberal => totals.liberal += row.votes,
            Party::Conservative => totals.conservative += row.votes,
            Party::Ndp => totals.ndp += row.votes,
            Party::Other => totals.other += row.votes,
        }
    }
    totals
}

/// Margin of victory for one riding, in percentage points.
/// Positive favors Liberal, negative favors Conservative.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct RidingMov {
    pub district_num: String,
    pub name: String,
    pub mov: f64,
}

/// Errors that prevent the tally from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    /// A riding from the allow-list has no preliminary rows at all, so
    /// neither its display name nor its MOV can be established.
    NoPreliminaryRows { riding: String },
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::NoPreliminaryRows { riding } => {
                write!(f, "no preliminary result rows for riding {}", riding)
            }
        }
    }
}

/// Computes the MOV for every riding of the allow-list, in allow-list order.
///
/// Within one riding, the percentage fields of all Liberal rows are summed
/// and the sum over all Conservative rows is subtracted. A party with no row
/// contributes 0. A riding with no rows at all is an input error: the export
/// always carries every candidate of a riding, so an absent riding means the
/// wrong file or the wrong allow-list.
pub fn compute_mov(rows: &[&ResultRow], districts: &[&str]) -> Result<Vec<RidingMov>, TallyError> {
    let mut res: Vec<RidingMov> = Vec::new();
    for &district in districts {
        let riding_rows: Vec<&&ResultRow> = rows
            .iter()
            .filter(|r| r.district_num == district)
            .collect();
        let name = match riding_rows.first() {
            Some(row) => row.district_name_en.clone(),
            None => {
                return Err(TallyError::NoPreliminaryRows {
                    riding: district.to_string(),
                })
            }
        };
        let liberal_pct: f64 = riding_rows
            .iter()
            .filter(|r| r.party() == Party::Liberal)
            .map(|r| r.votes_pct)
            .sum();
        let conservative_pct: f64 = riding_rows
            .iter()
            .filter(|r| r.party() == Party::Conservative)
            .map(|r| r.votes_pct)
            .sum();
        debug!(
            "compute_mov: {} {}: lib {:.2} con {:.2}",
            district, name, liberal_pct, conservative_pct
        );
        res.push(RidingMov {
            district_num: district.to_string(),
            name,
            mov: liberal_pct - conservative_pct,
        });
    }
    Ok(res)
}
