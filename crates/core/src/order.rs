//! Test ordering strategies
//!
//! Each strategy turns the per-test coverage map into the sequence in which
//! snapshots are built. Iteration runs over a `BTreeMap`, so ties always
//! resolve by ascending test id.

use crate::coverage::{lines_covered, merge, CoverageProfile};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Coverage profiles collected for each test, keyed by test id
pub type TestProfiles = BTreeMap<String, Vec<CoverageProfile>>;

/// Error returned for an unrecognized ordering tag
#[derive(Debug, thiserror::Error)]
#[error("unknown test ordering '{0}' (expected hardcoded, raw, net or importance)")]
pub struct UnknownOrder(pub String);

/// Strategy tag as it appears in requests and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderKind {
    /// Keep the order the tests were requested in
    #[default]
    Hardcoded,
    /// Fewest covered lines first
    Raw,
    /// Smallest marginal gain first
    Net,
    /// Lowest average line weight first
    Importance,
}

impl FromStr for OrderKind {
    type Err = UnknownOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "hardcoded" => Ok(Self::Hardcoded),
            "raw" => Ok(Self::Raw),
            "net" => Ok(Self::Net),
            "importance" => Ok(Self::Importance),
            other => Err(UnknownOrder(other.to_string())),
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Hardcoded => "hardcoded",
            Self::Raw => "raw",
            Self::Net => "net",
            Self::Importance => "importance",
        };
        f.write_str(tag)
    }
}

/// A test ordering strategy together with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOrder {
    /// Fixed, caller-supplied order; profiles are ignored
    Hardcoded(Vec<String>),
    /// Ascending by number of lines each test covers on its own
    RawCoverage,
    /// Greedy: repeatedly take the test adding the fewest new lines
    NewLinesCovered,
    /// Ascending by the average weight of the lines a test covers, where a
    /// line's weight is the number of tests covering it
    Importance,
}

impl TestOrder {
    /// Build the strategy for a tag; `tests` feeds the hardcoded order
    pub fn from_kind(kind: OrderKind, tests: &[String]) -> Self {
        match kind {
            OrderKind::Hardcoded => Self::Hardcoded(tests.to_vec()),
            OrderKind::Raw => Self::RawCoverage,
            OrderKind::Net => Self::NewLinesCovered,
            OrderKind::Importance => Self::Importance,
        }
    }

    pub fn kind(&self) -> OrderKind {
        match self {
            Self::Hardcoded(_) => OrderKind::Hardcoded,
            Self::RawCoverage => OrderKind::Raw,
            Self::NewLinesCovered => OrderKind::Net,
            Self::Importance => OrderKind::Importance,
        }
    }

    /// Produce the test sequence for the given profiles
    pub fn sort(&self, profiles: &TestProfiles) -> Vec<String> {
        match self {
            Self::Hardcoded(order) => order.clone(),
            Self::RawCoverage => sort_by_raw_lines_covered(profiles),
            Self::NewLinesCovered => sort_by_new_lines_covered(profiles),
            Self::Importance => sort_by_importance(profiles),
        }
    }
}

fn sort_by_raw_lines_covered(profiles: &TestProfiles) -> Vec<String> {
    let mut counted: Vec<(&String, usize)> = profiles
        .iter()
        .map(|(test, ps)| (test, lines_covered(ps).len()))
        .collect();

    counted.sort_by_key(|&(_, count)| count);
    counted.into_iter().map(|(test, _)| test.clone()).collect()
}

fn sort_by_new_lines_covered(profiles: &TestProfiles) -> Vec<String> {
    let mut remaining: Vec<&String> = profiles.keys().collect();
    let mut sorted = Vec::with_capacity(remaining.len());
    let mut existing: Vec<CoverageProfile> = Vec::new();

    while !remaining.is_empty() {
        let mut best: Option<(usize, u64, Vec<CoverageProfile>)> = None;

        for (idx, test) in remaining.iter().enumerate() {
            let (merged, gain) = merge(&existing, &profiles[*test]);
            debug!("{} adds {} lines", test, gain);

            if best.as_ref().map_or(true, |(_, min_gain, _)| gain < *min_gain) {
                best = Some((idx, gain, merged));
            }
        }

        if let Some((idx, _, merged)) = best {
            sorted.push(remaining.remove(idx).clone());
            existing = merged;
        }
    }

    sorted
}

fn sort_by_importance(profiles: &TestProfiles) -> Vec<String> {
    let lines_by_test: Vec<(&String, BTreeSet<(&str, u32)>)> = profiles
        .iter()
        .map(|(test, ps)| (test, lines_covered(ps)))
        .collect();

    let mut weights: HashMap<(&str, u32), u32> = HashMap::new();
    for (_, lines) in &lines_by_test {
        for line in lines {
            *weights.entry(*line).or_insert(0) += 1;
        }
    }

    let mut scored: Vec<(&String, f64)> = lines_by_test
        .iter()
        .map(|(test, lines)| (*test, average_weight(lines, &weights)))
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.into_iter().map(|(test, _)| test.clone()).collect()
}

fn average_weight(lines: &BTreeSet<(&str, u32)>, weights: &HashMap<(&str, u32), u32>) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }

    let total: u64 = lines
        .iter()
        .map(|line| u64::from(weights.get(line).copied().unwrap_or(0)))
        .sum();

    total as f64 / lines.len() as f64
}
