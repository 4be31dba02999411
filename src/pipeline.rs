//! One repository end to end: acquire, discover, classify, write, clean up.

use crate::acquire::fetch::ArchiveFetcher;
use crate::acquire::{self, Acquired, RepoDescriptor};
use crate::cancel::CancelToken;
use crate::classify::{self, ClassifyOptions};
use crate::error::{MineError, ParseError, Result};
use crate::scan::{self, filesystem::relative_slash_path};
use crate::syntax::Navigator;
use crate::types::config::MineConfig;
use crate::types::report::{RepoOutcome, RepoStatus};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const ID_SEPARATOR: &str = "::";

/// Everything a repository task needs; shared read-only across workers.
pub struct MineContext {
    pub config: MineConfig,
    pub fetcher: Arc<dyn ArchiveFetcher>,
}

impl MineContext {
    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            include_async: self.config.include_async,
        }
    }
}

/// Tests found under one source tree, identifiers relative to its root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinedTests {
    pub file_count: usize,
    pub test_ids: Vec<String>,
}

pub fn collect_from_repo(
    ctx: &MineContext,
    repo_id: &str,
    cancel: &CancelToken,
) -> Result<RepoOutcome> {
    let repo = RepoDescriptor::new(repo_id, &ctx.config);
    let tree = match acquire::acquire(&repo, &ctx.config, ctx.fetcher.as_ref(), cancel)? {
        Acquired::Ready(tree) => tree,
        Acquired::Finished(status) => return Ok(RepoOutcome::bare(status)),
    };

    let mined = mine_tree(tree.path(), ctx.classify_options(), cancel)?;
    debug!(
        repo = repo_id,
        files = mined.file_count,
        tests = mined.test_ids.len(),
        extracted = tree.extracted(),
        "mined source tree"
    );
    record_tests(&repo, &mined, cancel)
}

/// Write the mined identifiers unless the task was cancelled meanwhile; a
/// cancelled repository must stay eligible for the next run.
fn record_tests(
    repo: &RepoDescriptor,
    mined: &MinedTests,
    cancel: &CancelToken,
) -> Result<RepoOutcome> {
    if mined.test_ids.is_empty() {
        return Ok(RepoOutcome {
            status: RepoStatus::NoTestsFound,
            file_count: mined.file_count,
            test_count: 0,
        });
    }

    cancel.check()?;
    write_output(&repo.output_path, &mined.test_ids)?;
    Ok(RepoOutcome {
        status: RepoStatus::Success,
        file_count: mined.file_count,
        test_count: mined.test_ids.len(),
    })
}

/// Classify every candidate test file under `root`. Files that fail to
/// read or parse contribute nothing; only cancellation aborts the walk.
pub fn mine_tree(
    root: &Path,
    options: ClassifyOptions,
    cancel: &CancelToken,
) -> Result<MinedTests> {
    let mut mined = MinedTests::default();
    for path in scan::collect_test_files(root) {
        cancel.check()?;
        let found = match collect_file_tests(&path, options, cancel) {
            Ok(found) => found,
            Err(ParseError::TimedOut) if cancel.is_cancelled() => return Err(MineError::Cancelled),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping file");
                continue;
            }
        };
        if found.is_empty() {
            continue;
        }
        mined.file_count += 1;
        mined
            .test_ids
            .extend(found.iter().map(|id| relativize_identifier(id, root)));
    }
    Ok(mined)
}

/// Test identifiers of one file, labelled with the path as given.
pub fn collect_file_tests(
    path: &Path,
    options: ClassifyOptions,
    cancel: &CancelToken,
) -> std::result::Result<Vec<String>, ParseError> {
    let nav = Navigator::from_file(path, cancel)?;
    Ok(classify::collect_tests(
        &nav,
        &path.to_string_lossy(),
        options,
    ))
}

/// Rewrite the file component of `{file}::{name}` relative to `root`.
/// Identifiers whose file lies outside `root` are returned unchanged.
pub fn relativize_identifier(id: &str, root: &Path) -> String {
    let Some((file, name)) = id.split_once(ID_SEPARATOR) else {
        return id.to_string();
    };
    match relative_slash_path(Path::new(file), root) {
        Some(relative) => format!("{relative}{ID_SEPARATOR}{name}"),
        None => id.to_string(),
    }
}

/// One identifier per line, written to a temporary file beside `path`
/// and renamed into place.
fn write_output(path: &Path, test_ids: &[String]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    for id in test_ids {
        writeln!(tmp, "{id}")?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| MineError::Io(e.error))?;
    Ok(())
}
