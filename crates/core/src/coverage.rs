//! Coverage profiles and the merge/gain algorithm
//!
//! A profile is the set of spans one test run touched in one file. Profiles
//! from several tests are folded together with [`merge`], which also reports
//! how many lines the incoming profiles newly covered.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Identifier of a source file as reported by the test runner
pub type FileId = String;

/// A source position (1-based line and byte column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Contiguous region of a source file and whether it executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoverageSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub covered: bool,
}

/// Position key used to reconcile spans across profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SpanKey {
    start_line: u32,
    start_col: u32,
    end_line: u32,
    end_col: u32,
}

impl SpanKey {
    fn into_span(self, covered: bool) -> CoverageSpan {
        CoverageSpan {
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: self.end_line,
            end_col: self.end_col,
            covered,
        }
    }
}

impl CoverageSpan {
    /// Create a span from `(line, col)` start and end pairs
    pub const fn new(start: (u32, u32), end: (u32, u32), covered: bool) -> Self {
        Self {
            start_line: start.0,
            start_col: start.1,
            end_line: end.0,
            end_col: end.1,
            covered,
        }
    }

    fn key(&self) -> SpanKey {
        SpanKey {
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: self.end_line,
            end_col: self.end_col,
        }
    }

    /// Lines touched by the span, both ends included
    pub fn lines(&self) -> RangeInclusive<u32> {
        self.start_line..=self.end_line
    }

    /// Number of lines the span contributes to a coverage gain
    pub fn line_count(&self) -> u64 {
        u64::from(self.end_line.saturating_sub(self.start_line)) + 1
    }

    /// Check whether a position lies inside the span
    ///
    /// Lines strictly between start and end are always inside. On the start
    /// line the column must be at or after the start column, on the end line
    /// at or before the end column; single-line spans need both.
    pub fn contains(&self, pos: Position) -> bool {
        if pos.line < self.start_line || pos.line > self.end_line {
            return false;
        }

        if self.start_line == self.end_line {
            return self.start_col <= pos.col && pos.col <= self.end_col;
        }

        if pos.line == self.start_line {
            return pos.col >= self.start_col;
        }

        if pos.line == self.end_line {
            return pos.col <= self.end_col;
        }

        true
    }
}

/// Coverage observed for one file during a test run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageProfile {
    pub file: FileId,
    pub spans: Vec<CoverageSpan>,
}

impl CoverageProfile {
    pub fn new(file: impl Into<FileId>, spans: Vec<CoverageSpan>) -> Self {
        Self {
            file: file.into(),
            spans,
        }
    }

    /// Whether the position falls inside a span that never executed
    pub fn is_uncovered(&self, pos: Position) -> bool {
        self.spans
            .iter()
            .any(|span| !span.covered && span.contains(pos))
    }

    /// Spans that executed at least once
    pub fn covered_spans(&self) -> impl Iterator<Item = &CoverageSpan> {
        self.spans.iter().filter(|span| span.covered)
    }
}

/// Fold `incoming` profiles into `existing` ones
///
/// Returns one profile per file holding every distinct span position of
/// both inputs, each marked covered if either side covered it, plus the
/// number of lines the incoming side newly covered. A span that is absent
/// from `existing` adds its line count when covered; a span that flips from
/// uncovered to covered adds its line count; a span covered on both sides
/// adds nothing. Conflicting duplicates resolve as "covered wins".
///
/// Output profiles are ordered by file and spans by position.
pub fn merge(
    existing: &[CoverageProfile],
    incoming: &[CoverageProfile],
) -> (Vec<CoverageProfile>, u64) {
    let mut by_file: BTreeMap<&str, BTreeMap<SpanKey, bool>> = BTreeMap::new();

    for profile in existing {
        let table = by_file.entry(profile.file.as_str()).or_default();
        for span in &profile.spans {
            let covered = table.entry(span.key()).or_insert(false);
            *covered |= span.covered;
        }
    }

    let mut gain = 0u64;
    for profile in incoming {
        let table = by_file.entry(profile.file.as_str()).or_default();
        for span in &profile.spans {
            match table.entry(span.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(span.covered);
                    if span.covered {
                        gain += span.line_count();
                    }
                }
                Entry::Occupied(mut slot) => {
                    if span.covered && !*slot.get() {
                        slot.insert(true);
                        gain += span.line_count();
                    }
                }
            }
        }
    }

    let merged = by_file
        .into_iter()
        .map(|(file, table)| CoverageProfile {
            file: file.to_string(),
            spans: table
                .into_iter()
                .map(|(key, covered)| key.into_span(covered))
                .collect(),
        })
        .collect();

    (merged, gain)
}

/// Distinct `(file, line)` pairs covered by at least one span
pub fn lines_covered(profiles: &[CoverageProfile]) -> BTreeSet<(&str, u32)> {
    let mut lines = BTreeSet::new();
    for profile in profiles {
        for span in profile.covered_spans() {
            for line in span.lines() {
                lines.insert((profile.file.as_str(), line));
            }
        }
    }
    lines
}

/// Number of distinct lines covered across the given profiles
///
/// A line touched by two spans counts once.
pub fn num_lines_covered(profiles: &[CoverageProfile]) -> usize {
    lines_covered(profiles).len()
}
