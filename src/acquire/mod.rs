//! Getting a repository's source tree onto local disk.
//!
//! Acquisition walks: output already written -> skip; local tree present
//! -> use it as-is; otherwise fetch the archive (unless cached) and
//! extract it through a scratch directory. Every failure becomes a
//! [`RepoStatus`]; only cancellation is returned as an error.

pub mod extract;
pub mod fetch;

use crate::cancel::CancelToken;
use crate::error::{MineError, Result};
use crate::types::config::MineConfig;
use crate::types::report::RepoStatus;
use fetch::ArchiveFetcher;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PARTIAL_SUFFIX: &str = ".part";

/// Replace separators so a repository id becomes one path segment.
pub fn sanitize_repo_id(repo_id: &str) -> String {
    repo_id.replace(['/', '\\'], "#")
}

/// Accepts `owner/name` with both halves non-empty.
pub fn validate_repo_id(repo_id: &str) -> Result<()> {
    match repo_id.split_once('/') {
        Some((owner, name))
            if !owner.is_empty()
                && !name.is_empty()
                && !name.contains('/')
                && !repo_id.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(MineError::InvalidRepoId(repo_id.to_string())),
    }
}

/// Where one repository lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub repo_id: String,
    pub local_path: PathBuf,
    pub archive_path: PathBuf,
    pub output_path: PathBuf,
}

impl RepoDescriptor {
    pub fn new(repo_id: &str, config: &MineConfig) -> Self {
        let name = sanitize_repo_id(repo_id);
        Self {
            repo_id: repo_id.to_string(),
            local_path: config.repo_root.join(&name),
            archive_path: config
                .archive_root()
                .join(format!("{name}.{}", config.archive_format.extension())),
            output_path: config.test_root.join(format!("{name}.txt")),
        }
    }
}

/// A source tree ready to scan. If this run extracted it, dropping the
/// value deletes it; a tree that was already present is never touched.
#[derive(Debug)]
pub struct WorkTree {
    path: PathBuf,
    extracted: bool,
}

impl WorkTree {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extracted(&self) -> bool {
        self.extracted
    }
}

impl Drop for WorkTree {
    fn drop(&mut self) {
        if !self.extracted || !self.path.exists() {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed extracted tree"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to clean up extracted tree"),
        }
    }
}

#[derive(Debug)]
pub enum Acquired {
    Ready(WorkTree),
    Finished(RepoStatus),
}

pub fn acquire(
    repo: &RepoDescriptor,
    config: &MineConfig,
    fetcher: &dyn ArchiveFetcher,
    cancel: &CancelToken,
) -> Result<Acquired> {
    if repo.output_path.exists() {
        return Ok(Acquired::Finished(RepoStatus::Skipped));
    }

    if repo.local_path.is_dir() {
        return Ok(Acquired::Ready(WorkTree {
            path: repo.local_path.clone(),
            extracted: false,
        }));
    }

    if !config.auto_download {
        return Ok(Acquired::Finished(RepoStatus::NotFound));
    }

    if repo.archive_path.is_file() {
        debug!(repo_id = repo.repo_id.as_str(), "using cached archive");
    } else {
        match download(repo, config, fetcher, cancel) {
            Ok(()) => info!(
                repo_id = repo.repo_id.as_str(),
                archive = %repo.archive_path.display(),
                "downloaded archive"
            ),
            Err(MineError::Cancelled) => return Err(MineError::Cancelled),
            Err(e) => {
                warn!(repo_id = repo.repo_id.as_str(), error = %e, "download failed");
                return Ok(Acquired::Finished(RepoStatus::DownloadFailed));
            }
        }
    }

    match extract::extract_archive(
        &repo.archive_path,
        config.archive_format,
        &config.repo_root,
        &repo.local_path,
        cancel,
    ) {
        Ok(()) => Ok(Acquired::Ready(WorkTree {
            path: repo.local_path.clone(),
            extracted: true,
        })),
        Err(MineError::Cancelled) => Err(MineError::Cancelled),
        Err(e) => {
            warn!(repo_id = repo.repo_id.as_str(), error = %e, "extract failed");
            Ok(Acquired::Finished(RepoStatus::ExtractFailed))
        }
    }
}

/// Fetch into `<archive>.part` and rename on success, so an interrupted
/// transfer never looks like a cached archive.
fn download(
    repo: &RepoDescriptor,
    config: &MineConfig,
    fetcher: &dyn ArchiveFetcher,
    cancel: &CancelToken,
) -> Result<()> {
    if let Some(parent) = repo.archive_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut partial = OsString::from(repo.archive_path.as_os_str());
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    match write_archive(repo, config, fetcher, &partial, cancel) {
        Ok(()) => {
            fs::rename(&partial, &repo.archive_path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn write_archive(
    repo: &RepoDescriptor,
    config: &MineConfig,
    fetcher: &dyn ArchiveFetcher,
    partial: &Path,
    cancel: &CancelToken,
) -> Result<()> {
    let mut file = File::create(partial)?;
    fetcher.fetch(&repo.repo_id, config.archive_format, &mut file, cancel)?;
    file.sync_all()?;
    Ok(())
}
