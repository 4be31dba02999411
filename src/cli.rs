use crate::types::config::{ArchiveFormat, MineConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "testmine",
    version,
    about = "Mine Python test functions from many source repositories"
)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect tests for one repository id or a file of ids
    Collect(CollectCommand),
    /// Print the tests found in a local file or directory
    Inspect(InspectCommand),
}

#[derive(Clone, Debug, ValueEnum)]
pub enum CliArchiveFormat {
    TarGz,
    Zip,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct CollectCommand {
    /// `owner/name`, or a file with one id per line
    pub repo_id: String,
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub repo_root: Option<PathBuf>,
    #[arg(long)]
    pub test_root: Option<PathBuf>,
    #[arg(long)]
    pub archive_root: Option<PathBuf>,
    /// Seconds per repository (0 = unlimited)
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Worker count (0 or 1 = sequential)
    #[arg(long, short = 'j')]
    pub parallelism: Option<usize>,
    /// Process at most this many ids
    #[arg(long)]
    pub limit: Option<usize>,
    /// Treat a missing local tree as not found instead of fetching it
    #[arg(long)]
    pub no_download: bool,
    #[arg(long, value_enum)]
    pub archive_format: Option<CliArchiveFormat>,
    /// Also classify `async def` functions
    #[arg(long)]
    pub include_async: bool,
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ReportFormat,
}

impl CollectCommand {
    /// Flags given on the command line win over config files.
    pub fn apply_to(&self, config: &mut MineConfig) {
        if let Some(repo_root) = &self.repo_root {
            config.repo_root = repo_root.clone();
        }
        if let Some(test_root) = &self.test_root {
            config.test_root = test_root.clone();
        }
        if let Some(archive_root) = &self.archive_root {
            config.archive_root = Some(archive_root.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
        }
        if let Some(limit) = self.limit {
            config.limit = Some(limit);
        }
        if self.no_download {
            config.auto_download = false;
        }
        if let Some(format) = &self.archive_format {
            config.archive_format = match format {
                CliArchiveFormat::TarGz => ArchiveFormat::TarGz,
                CliArchiveFormat::Zip => ArchiveFormat::Zip,
            };
        }
        if self.include_async {
            config.include_async = true;
        }
    }
}

#[derive(Args)]
pub struct InspectCommand {
    pub path: PathBuf,
    /// Also classify `async def` functions
    #[arg(long)]
    pub include_async: bool,
}
