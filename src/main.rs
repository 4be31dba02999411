mod acquire;
mod cancel;
mod classify;
mod cli;
mod config;
mod error;
mod fleet;
mod pipeline;
mod report;
mod scan;
mod syntax;
#[cfg(test)]
mod test_support;
mod types;

use crate::cancel::CancelToken;
use crate::classify::ClassifyOptions;
use crate::error::MineError;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const RUNTIME_FAILURE: i32 = 3;
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("testmine={default_level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<i32, MineError> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        cli::Commands::Collect(cmd) => {
            let mut loaded = config::load_config(cmd.config.as_deref())?;
            cmd.apply_to(&mut loaded);
            loaded.validate()?;

            let repo_ids = fleet::load_repo_ids(&cmd.repo_id, loaded.limit)?;
            if !cli.quiet {
                println!("Loaded {} repos to be processed", repo_ids.len());
            }

            let fetcher = acquire::fetch::HttpFetcher::new(&loaded.fetch)?;
            let ctx = Arc::new(pipeline::MineContext {
                config: loaded,
                fetcher: Arc::new(fetcher),
            });
            let summary = fleet::run_fleet(ctx, &repo_ids);

            let output_format = match cmd.format {
                cli::ReportFormat::Text => report::OutputFormat::Text,
                cli::ReportFormat::Json => report::OutputFormat::Json,
            };
            let rendered = report::render(&summary, output_format)?;
            print!("{rendered}");
            if matches!(output_format, report::OutputFormat::Json) {
                println!();
            }
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::Inspect(cmd) => {
            if !cmd.path.exists() {
                return Err(MineError::PathNotFound(cmd.path.display().to_string()));
            }
            let options = ClassifyOptions {
                include_async: cmd.include_async,
            };
            let cancel = CancelToken::never();

            let test_ids = if cmd.path.is_dir() {
                pipeline::mine_tree(&cmd.path, options, &cancel)?.test_ids
            } else {
                pipeline::collect_file_tests(&cmd.path, options, &cancel).map_err(|source| {
                    MineError::Parse {
                        path: cmd.path.display().to_string(),
                        source,
                    }
                })?
            };

            if test_ids.is_empty() {
                println!("inspect: no tests found");
            }
            for id in &test_ids {
                println!("{id}");
            }
            Ok(exit_code::SUCCESS)
        }
    }
}

fn main() {
    match run() {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(exit_code::RUNTIME_FAILURE);
        }
    }
}
