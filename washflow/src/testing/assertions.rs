//! Test assertions for run reports.

use std::collections::BTreeSet;

use crate::core::{OutputFormat, StageKind, StageStatus};
use crate::pipeline::RunReport;

/// Asserts that the run completed with eight produced stages.
pub fn assert_complete(report: &RunReport) {
    assert!(
        report.is_complete(),
        "Expected complete run, got status: {:?}",
        report.status
    );
    assert_log_invariants(report);
}

/// Asserts that the run aborted at `stage`.
pub fn assert_aborted_at(report: &RunReport, stage: StageKind) {
    assert_eq!(
        report.aborted_at(),
        Some(stage),
        "Expected abort at {stage}, got status: {:?}",
        report.status
    );
    assert_log_invariants(report);
}

/// Asserts the structural rules every run log obeys.
///
/// Entries follow stage order from stage 1, every entry but the last is
/// produced, and the run is complete exactly when all eight produced.
pub fn assert_log_invariants(report: &RunReport) {
    let entries = &report.entries;
    assert!(
        (1..=StageKind::COUNT).contains(&entries.len()),
        "Run log has {} entries",
        entries.len()
    );

    for (entry, expected) in entries.iter().zip(StageKind::ALL) {
        assert_eq!(entry.stage, expected, "Run log out of order");
        assert_eq!(entry.position, expected.position());
    }

    let (last, earlier) = entries.split_last().unwrap_or_else(|| unreachable!());
    assert!(
        earlier.iter().all(|e| e.status() == StageStatus::Produced),
        "A failed entry is followed by further entries"
    );

    let all_produced = last.is_produced() && entries.len() == StageKind::COUNT;
    assert_eq!(
        report.is_complete(),
        all_produced,
        "Status {:?} disagrees with the log",
        report.status
    );
}

/// Asserts that the output root holds exactly the produced artifacts,
/// counting image files of every supported format.
pub fn assert_artifacts_on_disk(report: &RunReport) {
    let is_image = |name: &str| {
        OutputFormat::ALL
            .iter()
            .any(|format| name.ends_with(&format!(".{}", format.extension())))
    };
    let on_disk: BTreeSet<String> = std::fs::read_dir(&report.output_root)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| is_image(name))
                .collect()
        })
        .unwrap_or_default();

    let expected: BTreeSet<String> = report
        .artifacts()
        .iter()
        .map(|a| a.filename.clone())
        .collect();

    assert_eq!(on_disk, expected, "Files on disk disagree with the run log");
}
