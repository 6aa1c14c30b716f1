pub use crate::boundary::BoundaryScanner;
pub use crate::feature::{Feature, FeatureTable, MatchResult, PeakMatch};
pub use crate::feature_list::{normalize_and_emit, FeatureListSink, Interval, MemoryFeatureListSink};
pub use crate::matcher::FeatureMatcher;
pub use crate::provider::{Session, SpectrumProvider};
pub use crate::spectrum::Spectrum;
pub use crate::summary::MatchSummary;
