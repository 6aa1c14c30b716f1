//! Turn a [`FeatureTable`] into m/z intervals and hand them to a feature list store.
//!
//! Before emission, matched rows whose left and right boundaries coincide, as happens
//! for a lone spike, are widened to a symmetric window of [`REPAIR_PPM`] around
//! the matched m/z. Rows whose boundaries still do not describe a non-empty interval
//! are dropped and counted. Unmatched and deleted rows are never emitted.
use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::feature::{FeatureTable, MatchResult};
use crate::ppm::ppm_window;

/// The half-width of the window a degenerate boundary pair is replaced by, in ppm
pub const REPAIR_PPM: f64 = 30.0;

/// A named, closed m/z interval `[left_mz, right_mz]`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    pub left_mz: f64,
    pub right_mz: f64,
    pub name: String,
}

impl Interval {
    pub fn new(left_mz: f64, right_mz: f64, name: impl Into<String>) -> Self {
        Self {
            left_mz,
            right_mz,
            name: name.into(),
        }
    }

    pub fn start(&self) -> f64 {
        self.left_mz
    }

    pub fn end(&self) -> f64 {
        self.right_mz
    }

    pub fn width(&self) -> f64 {
        self.right_mz - self.left_mz
    }

    pub fn contains(&self, mz: f64) -> bool {
        self.left_mz <= mz && mz <= self.right_mz
    }

    /// Whether this interval can be emitted, having a strictly positive width
    pub fn is_valid(&self) -> bool {
        self.left_mz < self.right_mz
    }
}

/// Something that persists named lists of m/z intervals.
pub trait FeatureListSink {
    type Error: StdError + Send + Sync + 'static;

    /// Create a feature list called `name` containing `intervals`, returning the
    /// number of features actually created.
    fn create_feature_list(
        &mut self,
        name: &str,
        intervals: &[Interval],
    ) -> Result<usize, Self::Error>;
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("A feature list name must not be empty")]
    EmptyName,
    #[error("The feature list sink failed: {0}")]
    Sink(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

/// The outcome of repairing a [`FeatureTable`]'s degenerate boundaries
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeReport {
    pub repaired_count: usize,
}

/// The intervals selected from a [`FeatureTable`] for emission, and why the other rows
/// were left out.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IntervalSelection {
    pub intervals: Vec<Interval>,
    /// Matched rows whose boundaries did not form a non-empty interval
    pub dropped_count: usize,
    pub unmatched_count: usize,
    pub deleted_count: usize,
}

/// Counts describing one emission of a feature list
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmitSummary {
    /// The number of intervals handed to the sink
    pub submitted_count: usize,
    /// The number of features the sink reported creating
    pub accepted_count: usize,
    pub repaired_count: usize,
    pub dropped_count: usize,
    pub unmatched_count: usize,
    pub deleted_count: usize,
}

impl EmitSummary {
    /// Whether the sink created a different number of features than it was given
    pub fn is_mismatched(&self) -> bool {
        self.submitted_count != self.accepted_count
    }
}

impl fmt::Display for EmitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} intervals created ({} repaired, {} dropped, {} unmatched, {} deleted)",
            self.accepted_count,
            self.submitted_count,
            self.repaired_count,
            self.dropped_count,
            self.unmatched_count,
            self.deleted_count
        )
    }
}

fn repair_row(row: &mut MatchResult) -> bool {
    if row.deleted {
        return false;
    }
    match row.peak.as_mut() {
        Some(peak) if peak.is_degenerate() => {
            let (left, right) = ppm_window(peak.matched_mz, REPAIR_PPM, REPAIR_PPM);
            peak.set_boundaries(left, right);
            true
        }
        _ => false,
    }
}

/// Replace every active, matched row's zero-width boundaries with a window of
/// [`REPAIR_PPM`] around its matched m/z.
pub fn normalize(table: &mut FeatureTable) -> NormalizeReport {
    let repaired_count = table.iter_mut().map(repair_row).filter(|x| *x).count();
    if repaired_count > 0 {
        log::info!(
            "Found {repaired_count} features with identical left and right boundaries, widened to +/- {REPAIR_PPM} ppm"
        );
    }
    NormalizeReport { repaired_count }
}

/// Select an [`Interval`] for every active, matched row with valid boundaries.
pub fn build_intervals(table: &FeatureTable) -> IntervalSelection {
    let mut selection = IntervalSelection::default();
    for row in table.iter() {
        if row.deleted {
            selection.deleted_count += 1;
            continue;
        }
        let Some(peak) = row.peak.as_ref() else {
            selection.unmatched_count += 1;
            continue;
        };
        let interval = Interval::new(peak.left_boundary_mz, peak.right_boundary_mz, row.name());
        if interval.is_valid() {
            selection.intervals.push(interval);
        } else {
            log::debug!(
                "Dropping {} with boundaries [{}, {}]",
                row.name(),
                interval.left_mz,
                interval.right_mz
            );
            selection.dropped_count += 1;
        }
    }
    selection
}

/// Repair `table`'s degenerate boundaries, select its valid intervals, and create a
/// feature list called `list_name` from them with `sink`.
///
/// A sink creating fewer or more features than it was given is reported through
/// [`EmitSummary::is_mismatched`] and a warning, not an error.
pub fn normalize_and_emit<S: FeatureListSink>(
    table: &mut FeatureTable,
    list_name: &str,
    sink: &mut S,
) -> Result<EmitSummary, EmitError> {
    if list_name.trim().is_empty() {
        return Err(EmitError::EmptyName);
    }
    let report = normalize(table);
    let selection = build_intervals(table);
    if selection.intervals.is_empty() {
        log::warn!("No valid intervals to write to feature list '{list_name}'");
    }

    let accepted_count = sink
        .create_feature_list(list_name, &selection.intervals)
        .map_err(|e| EmitError::Sink(Box::new(e)))?;

    let summary = EmitSummary {
        submitted_count: selection.intervals.len(),
        accepted_count,
        repaired_count: report.repaired_count,
        dropped_count: selection.dropped_count,
        unmatched_count: selection.unmatched_count,
        deleted_count: selection.deleted_count,
    };
    if summary.is_mismatched() {
        log::warn!(
            "Mismatch in number of intervals and features created. Expected {}, got {}",
            summary.submitted_count,
            summary.accepted_count
        );
    }
    log::info!("Feature list '{list_name}': {summary}");
    Ok(summary)
}

/// A [`FeatureListSink`] that keeps every list in memory.
///
/// If `capacity` is set, at most that many intervals are kept from each list.
#[derive(Debug, Default, Clone)]
pub struct MemoryFeatureListSink {
    pub lists: Vec<(String, Vec<Interval>)>,
    pub capacity: Option<usize>,
}

impl MemoryFeatureListSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lists: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Interval]> {
        self.lists
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ivs)| ivs.as_slice())
    }
}

impl FeatureListSink for MemoryFeatureListSink {
    type Error = std::convert::Infallible;

    fn create_feature_list(
        &mut self,
        name: &str,
        intervals: &[Interval],
    ) -> Result<usize, Self::Error> {
        let n = self
            .capacity
            .map_or(intervals.len(), |c| c.min(intervals.len()));
        self.lists.push((name.to_string(), intervals[..n].to_vec()));
        Ok(n)
    }
}

/// A [`FeatureListSink`] that writes each interval as a delimited text row of
/// `feature_list`, `name`, `left_mz` and `right_mz`.
pub struct TextFeatureListSink<W: io::Write> {
    writer: csv::Writer<W>,
    wrote_header: bool,
}

impl<W: io::Write> TextFeatureListSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_delimiter(writer, b'\t')
    }

    pub fn with_delimiter(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        Self {
            writer,
            wrote_header: false,
        }
    }

    pub fn into_inner(self) -> Result<W, io::Error> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: io::Write> FeatureListSink for TextFeatureListSink<W> {
    type Error = csv::Error;

    fn create_feature_list(
        &mut self,
        name: &str,
        intervals: &[Interval],
    ) -> Result<usize, Self::Error> {
        if !self.wrote_header {
            self.writer
                .write_record(["feature_list", "name", "left_mz", "right_mz"])?;
            self.wrote_header = true;
        }
        for iv in intervals {
            let left = iv.left_mz.to_string();
            let right = iv.right_mz.to_string();
            self.writer
                .write_record([name, iv.name.as_str(), left.as_str(), right.as_str()])?;
        }
        self.writer.flush()?;
        Ok(intervals.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feature::{Feature, MatchResult, PeakMatch};

    fn peak_with_bounds(mz: f64, left: f64, right: f64) -> PeakMatch {
        let mut peak = PeakMatch {
            matched_mz: mz,
            matched_intensity: 100.0,
            ..Default::default()
        };
        peak.set_boundaries(left, right);
        peak
    }

    fn row(name: &str, mz: f64, left: f64, right: f64) -> MatchResult {
        MatchResult::new(Feature::new(name, mz), Some(peak_with_bounds(mz, left, right)))
    }

    #[test]
    fn test_repair_degenerate() {
        let mut table: FeatureTable = vec![row("spike", 500.0, 500.0, 500.0)].into_iter().collect();
        let report = normalize(&mut table);
        assert_eq!(report.repaired_count, 1);
        let peak = table[0].peak.unwrap();
        assert!((peak.left_boundary_mz - 499.985).abs() < 1e-9);
        assert!((peak.right_boundary_mz - 500.015).abs() < 1e-9);
        assert!((peak.peak_width_da - 0.03).abs() < 1e-9);
        assert!((peak.peak_width_ppm - 60.0).abs() < 1e-6);
    }

    #[test_log::test]
    fn test_emission_counts() {
        let mut rows: Vec<MatchResult> = (0..7)
            .map(|i| {
                let mz = 200.0 + i as f64;
                row(&format!("ok{i}"), mz, mz - 0.01, mz + 0.01)
            })
            .collect();
        rows.push(row("deg1", 300.0, 300.0, 300.0));
        rows.push(row("deg2", 400.0, 400.0, 400.0));
        rows.push(row("bad", 450.0, 450.02, 449.98));
        let mut table = FeatureTable::new(rows);

        let mut sink = MemoryFeatureListSink::new();
        let summary = normalize_and_emit(&mut table, "auto", &mut sink).unwrap();
        assert_eq!(summary.submitted_count, 9);
        assert_eq!(summary.accepted_count, 9);
        assert_eq!(summary.repaired_count, 2);
        assert_eq!(summary.dropped_count, 1);
        assert!(!summary.is_mismatched());

        let stored = sink.get("auto").unwrap();
        assert_eq!(stored.len(), 9);
        assert!(stored.iter().all(|iv| iv.is_valid()));
        assert!(stored.iter().all(|iv| iv.name != "bad"));
    }

    #[test_log::test]
    fn test_unmatched_deleted_and_mismatch() {
        let mut table = FeatureTable::new(vec![
            row("a", 200.0, 199.99, 200.01),
            row("b", 300.0, 299.99, 300.01),
            row("c", 400.0, 399.99, 400.01),
            MatchResult::unmatched(Feature::new("d", 500.0)),
        ]);
        table.set_deleted(1, true).unwrap();

        let mut sink = MemoryFeatureListSink::with_capacity(1);
        let summary = normalize_and_emit(&mut table, "reviewed", &mut sink).unwrap();
        assert_eq!(summary.submitted_count, 2);
        assert_eq!(summary.accepted_count, 1);
        assert_eq!(summary.unmatched_count, 1);
        assert_eq!(summary.deleted_count, 1);
        assert_eq!(summary.dropped_count, 0);
        assert!(summary.is_mismatched());
    }

    #[test]
    fn test_empty_name() {
        let mut table = FeatureTable::default();
        let mut sink = MemoryFeatureListSink::new();
        assert!(matches!(
            normalize_and_emit(&mut table, "  ", &mut sink),
            Err(EmitError::EmptyName)
        ));
        assert!(sink.lists.is_empty());
    }

    #[test]
    fn test_text_sink() {
        let mut sink = TextFeatureListSink::new(Vec::new());
        let intervals = vec![
            Interval::new(99.99, 100.01, "x"),
            Interval::new(199.99, 200.01, "y z"),
        ];
        assert_eq!(sink.create_feature_list("list", &intervals).unwrap(), 2);
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "feature_list\tname\tleft_mz\tright_mz");
        assert_eq!(lines[1], "list\tx\t99.99\t100.01");
        assert_eq!(lines[2], "list\ty z\t199.99\t200.01");
    }

    #[test]
    fn test_interval() {
        let iv = Interval::new(10.0, 12.0, "iv");
        assert!(iv.contains(11.0));
        assert!(!iv.contains(12.5));
        assert_eq!(iv.width(), 2.0);
        assert!(!Interval::new(1.0, 1.0, "empty").is_valid());
    }
}
