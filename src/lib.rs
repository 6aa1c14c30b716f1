//! `mzboundary` matches a list of target m/z values against a profile-mode mass
//! spectrum and finds the m/z extent of the signal around each match.
//!
//! Each target [`Feature`] is paired with the closest spectrum sample. When that
//! sample lies within a ppm tolerance of the target, a [`BoundaryScanner`] walks
//! outwards from it until the signal ends, and the result is recorded as a
//! [`PeakMatch`]. The matched rows, collected in a [`FeatureTable`], can then be
//! reviewed and handed to a [`FeatureListSink`] as a named list of m/z intervals.
//!
//! # Usage
//! ```
//! use mzboundary::prelude::*;
//!
//! let spectrum = Spectrum::new(
//!     vec![499.99, 499.995, 500.0, 500.005, 500.01],
//!     vec![1.0, 40.0, 100.0, 40.0, 1.0],
//! ).unwrap();
//! let features = vec![
//!     Feature::new("target", 500.001),
//!     Feature::new("missing", 800.0),
//! ];
//!
//! let matcher = FeatureMatcher::default();
//! let mut table = matcher.match_features(&features, &spectrum).unwrap();
//! assert_eq!(table.matched_count(), 1);
//! assert_eq!(table[0].matched_mz(), Some(500.0));
//! assert!(table[1].peak.is_none());
//!
//! let mut sink = MemoryFeatureListSink::new();
//! let summary = normalize_and_emit(&mut table, "targets", &mut sink).unwrap();
//! assert_eq!(summary.accepted_count, 1);
//! assert_eq!(summary.unmatched_count, 1);
//! ```
//!
//! ## Features
//! - `parallelism`: match rows in parallel with `rayon`. Enabled by default.
//! - `cli`: build the `mzboundary` command line program. Enabled by default.
//! - `serde`: derive `Serialize` and `Deserialize` for the data model and parameters.
pub mod boundary;
pub mod feature;
pub mod feature_list;
pub mod matcher;
pub mod ppm;
pub mod prelude;
pub mod provider;
pub mod search;
pub mod spectrum;
pub mod summary;
pub mod text;

#[cfg(test)]
mod test_data;

pub use crate::boundary::{find_peak_boundaries, BoundaryScanner};
pub use crate::feature::{Feature, FeatureTable, FeatureTableError, MatchResult, PeakMatch};
pub use crate::feature_list::{
    normalize_and_emit, EmitError, EmitSummary, FeatureListSink, Interval,
    MemoryFeatureListSink, TextFeatureListSink,
};
pub use crate::matcher::{match_all, FeatureMatcher, FeatureMatcherBuilder, MatchError};
pub use crate::ppm::ppm_error;
pub use crate::provider::{ProviderError, Session, SpectrumProvider, TextSpectrumProvider};
pub use crate::spectrum::{Spectrum, SpectrumError};
pub use crate::summary::MatchSummary;
