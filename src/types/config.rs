use crate::error::MineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ARCHIVE_DIR: &str = "repos_tarball";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MineConfig {
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,
    #[serde(default = "default_test_root")]
    pub test_root: PathBuf,
    /// Defaults to `repos_tarball` next to `repo_root`.
    pub archive_root: Option<PathBuf>,
    /// Seconds per repository; 0 disables the limit.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub parallelism: usize,
    pub limit: Option<usize>,
    #[serde(default = "default_true")]
    pub auto_download: bool,
    #[serde(default)]
    pub archive_format: ArchiveFormat,
    #[serde(default)]
    pub include_async: bool,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Seconds allowed to reach the host.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Seconds allowed for the whole transfer.
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_repo_root() -> PathBuf {
    PathBuf::from("data/repos")
}

fn default_test_root() -> PathBuf {
    PathBuf::from("data/tests")
}

fn default_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_transfer_timeout() -> u64 {
    300
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_web_base() -> String {
    "https://github.com".to_string()
}

fn default_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_user_agent() -> String {
    concat!("testmine/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            transfer_timeout: default_transfer_timeout(),
            api_base: default_api_base(),
            web_base: default_web_base(),
            branches: default_branches(),
            token_env: default_token_env(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for MineConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            test_root: default_test_root(),
            archive_root: None,
            timeout: default_timeout(),
            parallelism: 0,
            limit: None,
            auto_download: true,
            archive_format: ArchiveFormat::default(),
            include_async: false,
            fetch: FetchConfig::default(),
        }
    }
}

impl MineConfig {
    pub fn archive_root(&self) -> PathBuf {
        match &self.archive_root {
            Some(root) => root.clone(),
            None => self
                .repo_root
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(DEFAULT_ARCHIVE_DIR),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    pub fn validate(&self) -> Result<(), MineError> {
        if self.repo_root.as_os_str().is_empty() {
            return Err(MineError::ConfigParse("repo_root must not be empty".to_string()));
        }
        if self.test_root.as_os_str().is_empty() {
            return Err(MineError::ConfigParse("test_root must not be empty".to_string()));
        }
        if self.limit == Some(0) {
            return Err(MineError::ConfigParse(
                "limit must be positive when set".to_string(),
            ));
        }
        if self.fetch.connect_timeout == 0 || self.fetch.transfer_timeout == 0 {
            return Err(MineError::ConfigParse(
                "fetch timeouts must be positive".to_string(),
            ));
        }
        if matches!(self.archive_format, ArchiveFormat::Zip) && self.fetch.branches.is_empty() {
            return Err(MineError::ConfigParse(
                "fetch.branches must list at least one branch for zip archives".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_root_defaults_next_to_repo_root() {
        let config = MineConfig {
            repo_root: PathBuf::from("data/repos/"),
            ..MineConfig::default()
        };
        assert_eq!(config.archive_root(), PathBuf::from("data/repos_tarball"));
    }

    #[test]
    fn zero_timeout_disables_the_limit() {
        let config = MineConfig {
            timeout: 0,
            ..MineConfig::default()
        };
        assert!(config.timeout().is_none());
        assert_eq!(
            MineConfig::default().timeout(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn validate_rejects_zero_limit_and_empty_branches() {
        let zero_limit = MineConfig {
            limit: Some(0),
            ..MineConfig::default()
        };
        assert!(matches!(zero_limit.validate(), Err(MineError::ConfigParse(_))));

        let mut no_branches = MineConfig {
            archive_format: ArchiveFormat::Zip,
            ..MineConfig::default()
        };
        no_branches.fetch.branches.clear();
        assert!(matches!(no_branches.validate(), Err(MineError::ConfigParse(_))));

        assert!(MineConfig::default().validate().is_ok());
    }
}
