//! Human-readable plan identifiers: `PN <year>-<sequence>`.
//!
//! The sequence restarts every year and is zero-padded to four digits.
//! [`next_plan_id`] derives the next free identifier from a snapshot of the
//! identifiers already persisted. It is a pure function: two callers working
//! from the same stale snapshot get the same answer, and the persistence
//! layer's primary key is what turns that into a detectable conflict.

use std::collections::BTreeSet;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix shared by every plan identifier.
const PREFIX: &str = "PN ";

/// Minimum width of the sequence part.
const SEQ_WIDTH: usize = 4;

/// A well-formed plan identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlanId {
    year: i32,
    seq: u64,
}

impl PlanId {
    pub fn new(year: i32, seq: u64) -> Self {
        Self { year, seq }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", year_prefix(self.year), zero_pad(self.seq))
    }
}

/// Error returned when parsing a string that is not `PN <year>-<digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid plan identifier {0:?} (expected \"PN <year>-<sequence>\")")]
pub struct PlanIdParseError(pub String);

impl FromStr for PlanId {
    type Err = PlanIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PlanIdParseError(s.to_owned());

        let rest = s.strip_prefix(PREFIX).ok_or_else(err)?;
        let (year, seq) = rest.split_once('-').ok_or_else(err)?;

        let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || !all_digits(year) || seq.len() < SEQ_WIDTH || !all_digits(seq) {
            return Err(err());
        }

        Ok(Self {
            year: year.parse().map_err(|_| err())?,
            seq: seq.parse().map_err(|_| err())?,
        })
    }
}

impl TryFrom<String> for PlanId {
    type Error = PlanIdParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PlanId> for String {
    fn from(id: PlanId) -> Self {
        id.to_string()
    }
}

fn year_prefix(year: i32) -> String {
    format!("{PREFIX}{year}-")
}

fn zero_pad(seq: u64) -> String {
    format!("{seq:0width$}", width = SEQ_WIDTH)
}

/// Compute the next plan identifier for the year of `today`.
///
/// Only identifiers starting with `PN <year>-` count. Each is split on `-`;
/// it contributes a sequence number when the split yields exactly two parts
/// and the second parses as an unsigned integer. Everything else is skipped.
/// The result is `max + 1` (or 1 when nothing matched), so it never collides
/// with an identifier in the given snapshot.
pub fn next_plan_id<'a, I>(existing: I, today: impl Datelike) -> PlanId
where
    I: IntoIterator<Item = &'a str>,
{
    let year = today.year();
    let prefix = year_prefix(year);

    let seqs: BTreeSet<u64> = existing
        .into_iter()
        .filter(|id| id.starts_with(&prefix))
        .filter_map(|id| {
            let parts: Vec<&str> = id.split('-').collect();
            match parts.as_slice() {
                [_, seq] => parse_seq(seq),
                _ => None,
            }
        })
        .collect();

    let max_seq = seqs.last().copied().unwrap_or(0);
    let next = match max_seq.checked_add(1) {
        Some(next) => next,
        // The top of the range is taken: reuse the lowest free sequence.
        None => (1..).find(|n| !seqs.contains(n)).unwrap_or(1),
    };
    PlanId::new(year, next)
}

/// Sequences too large for `u64` count as `u64::MAX`, so they still block
/// the top of the range instead of being skipped.
fn parse_seq(seq: &str) -> Option<u64> {
    match seq.parse::<u64>() {
        Ok(n) => Some(n),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u64::MAX),
        Err(_) => None,
    }
}
