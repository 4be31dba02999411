use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one repository. The numeric codes are stable and shared
/// with the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Success,
    NotFound,
    NoTestsFound,
    Skipped,
    DownloadFailed,
    ExtractFailed,
}

impl RepoStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NotFound => 1,
            Self::NoTestsFound => 2,
            Self::Skipped => 3,
            Self::DownloadFailed => 4,
            Self::ExtractFailed => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::NoTestsFound => "no_tests_found",
            Self::Skipped => "skipped",
            Self::DownloadFailed => "download_failed",
            Self::ExtractFailed => "extract_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepoOutcome {
    pub status: RepoStatus,
    /// Files that contributed at least one test.
    pub file_count: usize,
    pub test_count: usize,
}

impl RepoOutcome {
    pub fn bare(status: RepoStatus) -> Self {
        Self {
            status,
            file_count: 0,
            test_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub generated_at: String,
    pub requested: usize,
    pub statuses: BTreeMap<RepoStatus, usize>,
    pub total_files: usize,
    pub total_tests: usize,
    pub timed_out: usize,
    /// Tasks that panicked or hit an unexpected I/O error.
    pub errored: usize,
}

impl FleetSummary {
    pub fn record(&mut self, outcome: RepoOutcome) {
        *self.statuses.entry(outcome.status).or_default() += 1;
        self.total_files += outcome.file_count;
        self.total_tests += outcome.test_count;
    }

    pub fn count(&self, status: RepoStatus) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }

    /// Repositories that produced a status, i.e. neither timed out nor
    /// errored.
    pub fn processed(&self) -> usize {
        self.statuses.values().sum()
    }
}
