use crate::types::report::{FleetSummary, RepoStatus};
use std::fmt::Write;

pub fn to_text(summary: &FleetSummary) -> String {
    let mut out = String::new();
    if summary.timed_out > 0 {
        let _ = writeln!(out, "{} repos timeout", summary.timed_out);
    }
    if summary.errored > 0 {
        let _ = writeln!(out, "{} repos errored", summary.errored);
    }
    let _ = writeln!(
        out,
        "Processed {} repos with {} skipped, {} not found, {} download failed, \
         {} extract failed, and {} failed to mine any testing functions",
        summary.processed(),
        summary.count(RepoStatus::Skipped),
        summary.count(RepoStatus::NotFound),
        summary.count(RepoStatus::DownloadFailed),
        summary.count(RepoStatus::ExtractFailed),
        summary.count(RepoStatus::NoTestsFound),
    );
    let _ = writeln!(
        out,
        "Collected {} tests from {} files in total",
        summary.total_tests, summary.total_files
    );
    out
}
