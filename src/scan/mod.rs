pub mod filesystem;

use filesystem::list_files;
use std::path::{Path, PathBuf};

const SOURCE_EXTENSION: &str = ".py";
const TEST_FILE_PREFIX: &str = "test_";
const TEST_FILE_SUFFIX: &str = "_test.py";

/// Candidate test modules under `root`: `test_*.py` and `*_test.py`.
///
/// Nothing is excluded by directory, so vendored packages and virtualenvs
/// inside a repository are scanned too.
pub fn collect_test_files(root: &Path) -> Vec<PathBuf> {
    list_files(root)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_test_file_name)
        })
        .collect()
}

pub fn is_test_file_name(name: &str) -> bool {
    name.ends_with(TEST_FILE_SUFFIX)
        || (name.starts_with(TEST_FILE_PREFIX) && name.ends_with(SOURCE_EXTENSION))
}
