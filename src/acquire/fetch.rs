use crate::cancel::CancelToken;
use crate::error::{MineError, Result};
use crate::types::config::{ArchiveFormat, FetchConfig};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

const COPY_CHUNK: usize = 64 * 1024;

/// Source of repository archives. The acquisition step owns caching and
/// atomic placement; a fetcher only streams bytes into `dest`.
pub trait ArchiveFetcher: Send + Sync {
    fn fetch(
        &self,
        repo_id: &str,
        format: ArchiveFormat,
        dest: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<()>;
}

/// Fetches from a GitHub-compatible host: tarballs through the REST API,
/// zips through the web archive endpoint.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
    token: Option<String>,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.transfer_timeout))
            .user_agent(config.user_agent.clone())
            .build()?;
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty());
        Ok(Self {
            client,
            config: config.clone(),
            token,
        })
    }

    fn tarball_url(&self, repo_id: &str) -> String {
        format!(
            "{}/repos/{}/tarball",
            self.config.api_base.trim_end_matches('/'),
            repo_id
        )
    }

    fn zip_url(&self, repo_id: &str, branch: &str) -> String {
        format!(
            "{}/{}/archive/refs/heads/{}.zip",
            self.config.web_base.trim_end_matches('/'),
            repo_id,
            branch
        )
    }

    fn fetch_tarball(
        &self,
        repo_id: &str,
        dest: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<()> {
        let url = self.tarball_url(repo_id);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MineError::Download(format!("{url}: HTTP {status}")));
        }
        copy_cancellable(response, dest, cancel)?;
        Ok(())
    }

    fn fetch_branch_zip(
        &self,
        repo_id: &str,
        dest: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<()> {
        for branch in &self.config.branches {
            cancel.check()?;
            let url = self.zip_url(repo_id, branch);
            let response = self.client.get(&url).send()?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                debug!(repo_id, branch = branch.as_str(), "branch archive not found");
                continue;
            }
            if !status.is_success() {
                return Err(MineError::Download(format!("{url}: HTTP {status}")));
            }
            copy_cancellable(response, dest, cancel)?;
            return Ok(());
        }
        Err(MineError::Download(format!(
            "{repo_id}: no archive for branches {}",
            self.config.branches.join(", ")
        )))
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(
        &self,
        repo_id: &str,
        format: ArchiveFormat,
        dest: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<()> {
        match format {
            ArchiveFormat::TarGz => self.fetch_tarball(repo_id, dest, cancel),
            ArchiveFormat::Zip => self.fetch_branch_zip(repo_id, dest, cancel),
        }
    }
}

/// Stream `reader` into `dest`, checking `cancel` between chunks.
pub fn copy_cancellable<R: Read>(
    mut reader: R,
    dest: &mut dyn Write,
    cancel: &CancelToken,
) -> Result<u64> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut copied = 0u64;
    loop {
        cancel.check()?;
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        dest.write_all(&buf[..read])?;
        copied += read as u64;
    }
    dest.flush()?;
    Ok(copied)
}
