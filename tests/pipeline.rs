use std::fs;
use std::path::PathBuf;

use mzboundary::feature_list::{build_intervals, normalize};
use mzboundary::text::{FeatureTableReader, FeatureTableWriter};
use mzboundary::{
    match_all, normalize_and_emit, Feature, FeatureMatcher, FeatureTable, MatchSummary,
    MemoryFeatureListSink, Session, SpectrumProvider, TextFeatureListSink, TextSpectrumProvider,
};

const MZS: [f64; 5] = [100.0, 100.001, 100.002, 100.01, 100.02];
const INTS: [f32; 5] = [10.0, 100.0, 95.0, 5.0, 1.0];

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mzboundary-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test_log::test]
fn single_feature_boundaries() {
    let features = vec![Feature::new("A", 100.001)];
    let table = match_all(&features, &MZS, &INTS, 50.0, 50.0, 50.0, 0.1).unwrap();
    let row = &table[0];
    let peak = row.peak.unwrap();
    assert_eq!(peak.matched_index, 1);
    assert_eq!(row.matched_mz(), Some(100.001));
    assert!(peak.ppm_error.abs() < 1e-9);
    assert_eq!(peak.left_index, 0);
    assert_eq!(peak.right_index, 3);
    assert_eq!(row.right_boundary_intensity(), Some(5.0));
    assert!((peak.peak_width_da - 0.01).abs() < 1e-9);
}

#[test]
fn out_of_range_feature_is_unmatched() {
    let features = vec![Feature::new("far", 900.0)];
    let table = match_all(&features, &MZS, &INTS, 10.0, 50.0, 50.0, 0.01).unwrap();
    let row = &table[0];
    assert!(!row.is_matched());
    assert_eq!(row.matched_mz(), None);
    assert_eq!(row.matched_intensity(), None);
    assert_eq!(row.ppm_error(), None);
    assert_eq!(row.left_boundary_mz(), None);
    assert_eq!(row.right_boundary_mz(), None);
    assert_eq!(row.left_boundary_intensity(), None);
    assert_eq!(row.right_boundary_intensity(), None);
    assert_eq!(row.peak_width_da(), None);
    assert_eq!(row.peak_width_ppm(), None);
}

#[test]
fn adjacent_peaks_stop_at_valley() {
    let mz: Vec<f64> = (0..11).map(|i| 200.0 + i as f64 * 0.001).collect();
    let ints: [f32; 11] = [1.0, 20.0, 60.0, 100.0, 60.0, 30.0, 50.0, 90.0, 50.0, 20.0, 1.0];
    let features = vec![Feature::new("first", 200.003), Feature::new("second", 200.007)];
    let table = match_all(&features, &mz, &ints, 50.0, 1000.0, 1000.0, 0.0).unwrap();

    let first = table[0].peak.unwrap();
    let second = table[1].peak.unwrap();
    assert_eq!((first.left_index, first.right_index), (0, 5));
    assert_eq!((second.left_index, second.right_index), (5, 10));
    assert_eq!(first.right_boundary_mz, second.left_boundary_mz);
}

#[test]
fn matching_is_deterministic() {
    let features: Vec<_> = (0..20)
        .map(|i| Feature::new(format!("F{i}"), 100.0 + i as f64 * 0.001))
        .collect();
    let a = match_all(&features, &MZS, &INTS, 50.0, 50.0, 50.0, 0.01).unwrap();
    let b = match_all(&features, &MZS, &INTS, 50.0, 50.0, 50.0, 0.01).unwrap();
    assert_eq!(a, b);
    for (row, f) in a.iter().zip(features.iter()) {
        assert_eq!(row.name(), f.name);
    }
}

#[test]
fn normalize_is_idempotent() {
    let mz = [100.0, 100.001, 100.002, 100.003, 100.004];
    let ints = [10.0, 100.0, 50.0, 80.0, 1.0];
    let spectrum = mzboundary::Spectrum::wrap(&mz, &ints).unwrap();
    let features = vec![Feature::new("valley", 100.002), Feature::new("A", 100.001)];

    let matcher = FeatureMatcher::new(50.0, 50.0, 50.0, 2.0);
    assert!(matcher.validate().is_err());

    let mut table = FeatureMatcher::default()
        .match_features(&features, &spectrum)
        .unwrap();
    assert!(table[0].peak.unwrap().is_degenerate());
    assert!(!table[1].peak.unwrap().is_degenerate());

    assert_eq!(normalize(&mut table).repaired_count, 1);
    let once = table.clone();
    assert_eq!(normalize(&mut table).repaired_count, 0);
    assert_eq!(once, table);

    let valley = table[0].peak.unwrap();
    assert!((valley.peak_width_ppm - 60.0).abs() < 1e-6);
    assert_eq!(build_intervals(&table).intervals.len(), 2);
}

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn end_to_end_text_pipeline() {
    let dir = scratch_dir("pipeline");
    let spectrum_text: String = MZS
        .iter()
        .zip(INTS.iter())
        .map(|(mz, i)| format!("{mz}\t{i}\n"))
        .collect();
    fs::write(dir.join("1.txt"), spectrum_text).unwrap();
    fs::write(
        dir.join("features.csv"),
        "preamble\nName;m/z;Adduct\nA;100.001;[M+H]+\nB;900.0;[M+Na]+\n",
    )
    .unwrap();

    let mut session = Session::open(TextSpectrumProvider::new(&dir));
    let spectrum = session.spectrum("1").unwrap();
    let features = FeatureTableReader::default()
        .skip_rows(1)
        .read_path(dir.join("features.csv"))
        .unwrap();
    assert_eq!(features.len(), 2);

    let matcher = FeatureMatcher::builder()
        .max_ppm_error(50.0)
        .min_intensity_ratio(0.1)
        .build()
        .unwrap();
    let mut table = matcher.match_features(&features, &spectrum).unwrap();

    let summary = MatchSummary::from_table(&table);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.match_rate(), 50.0);

    let mut sink = TextFeatureListSink::new(Vec::new());
    let emitted = normalize_and_emit(&mut table, "targets", &mut sink).unwrap();
    assert_eq!(emitted.submitted_count, 1);
    assert_eq!(emitted.accepted_count, 1);
    assert_eq!(emitted.unmatched_count, 1);
    let list = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let lines: Vec<&str> = list.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("targets\tA\t100\t"));

    let output = dir.join("results.csv");
    FeatureTableWriter::default().write_path(&table, &output).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.lines().next().unwrap().starts_with("Name,m/z,Adduct,matched_spectrum_mz"));
    assert!(written.contains("B,900,[M+Na]+,,,,,,,,,"));

    session.close();
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn review_edits_change_emission() {
    let features = vec![Feature::new("A", 100.001), Feature::new("B", 100.002)];
    let mut table = match_all(&features, &MZS, &INTS, 50.0, 50.0, 50.0, 0.1).unwrap();
    table.rename(0, "renamed").unwrap();
    table.set_boundaries(1, 100.0015, 100.0025).unwrap();
    table.toggle_deleted(0).unwrap();

    let mut sink = MemoryFeatureListSink::with_capacity(10);
    let emitted = normalize_and_emit(&mut table, "reviewed", &mut sink).unwrap();
    assert_eq!(emitted.deleted_count, 1);
    let list = sink.get("reviewed").unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "B");
    assert_eq!(list[0].left_mz, 100.0015);

    let table: FeatureTable = table.into_iter().filter(|r| !r.deleted).collect();
    assert_eq!(table.len(), 1);
}

#[test]
fn provider_errors_on_missing_region() {
    let dir = scratch_dir("missing");
    let mut provider = TextSpectrumProvider::from_directory(&dir);
    assert!(provider.spectrum("42").is_err());
    provider.close();
    fs::remove_dir_all(&dir).unwrap();
}

#[cfg(feature = "serde")]
#[test]
fn table_serializes() {
    let features = vec![Feature::new("A", 100.001), Feature::new("far", 900.0)];
    let table = match_all(&features, &MZS, &INTS, 50.0, 50.0, 50.0, 0.1).unwrap();
    let text = serde_json::to_string(&table).unwrap();
    let back: FeatureTable = serde_json::from_str(&text).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back[0].name(), "A");
    assert_eq!(back[0].peak.unwrap().right_index, 3);
    assert!((back[0].matched_mz().unwrap() - 100.001).abs() < 1e-9);
    assert!(back[1].peak.is_none());

    let text = serde_json::to_string(&FeatureMatcher::default()).unwrap();
    let back: FeatureMatcher = serde_json::from_str(&text).unwrap();
    assert_eq!(back.max_ppm_error, 200.0);
    assert_eq!(back.scanner.left_ppm, 50.0);
}
