//! Running the pipeline over many repositories with a per-repository
//! wall-clock budget and an optional worker pool.

use crate::acquire::validate_repo_id;
use crate::cancel::CancelToken;
use crate::error::{MineError, Result};
use crate::pipeline::{self, MineContext};
use crate::types::report::{FleetSummary, RepoOutcome};
use chrono::Utc;
use crossbeam_channel::RecvTimeoutError;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    Finished(RepoOutcome),
    TimedOut,
    Errored,
}

/// Repository ids from `source`: a newline-delimited file when one exists
/// at that path, otherwise `source` itself. Blank lines are ignored,
/// malformed ids in a list are skipped with a warning and repeated ids
/// keep only their first occurrence.
pub fn load_repo_ids(source: &str, limit: Option<usize>) -> Result<Vec<String>> {
    let mut ids = match fs::read_to_string(source) {
        Ok(content) => {
            let mut ids = Vec::new();
            let mut seen = HashSet::new();
            for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
                if let Err(e) = validate_repo_id(line) {
                    warn!(list = source, error = %e, "skipping repository id");
                    continue;
                }
                if !seen.insert(line) {
                    debug!(list = source, repo_id = line, "skipping repeated repository id");
                    continue;
                }
                ids.push(line.to_string());
            }
            ids
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let id = source.trim();
            validate_repo_id(id)?;
            vec![id.to_string()]
        }
        Err(e) => return Err(e.into()),
    };

    if ids.is_empty() {
        return Err(MineError::EmptyRepoList);
    }
    if let Some(limit) = limit {
        ids.truncate(limit);
    }
    Ok(ids)
}

pub fn run_fleet(ctx: Arc<MineContext>, repo_ids: &[String]) -> FleetSummary {
    let workers = ctx.config.parallelism.clamp(1, repo_ids.len().max(1));
    info!(repos = repo_ids.len(), workers, "processing repositories");

    let results = if workers == 1 {
        run_sequential(&ctx, repo_ids)
    } else {
        run_pool(&ctx, repo_ids, workers)
    };

    let mut summary = FleetSummary {
        generated_at: Utc::now().to_rfc3339(),
        requested: repo_ids.len(),
        ..FleetSummary::default()
    };
    for result in results {
        match result {
            TaskResult::Finished(outcome) => summary.record(outcome),
            TaskResult::TimedOut => summary.timed_out += 1,
            TaskResult::Errored => summary.errored += 1,
        }
    }
    summary
}

fn run_sequential(ctx: &Arc<MineContext>, repo_ids: &[String]) -> Vec<TaskResult> {
    let mut lingering = Vec::new();
    let results = repo_ids
        .iter()
        .map(|repo_id| run_with_timeout(ctx, repo_id, &mut lingering))
        .collect();
    join_lingering(lingering);
    results
}

fn run_pool(ctx: &Arc<MineContext>, repo_ids: &[String], workers: usize) -> Vec<TaskResult> {
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<&str>();
    for repo_id in repo_ids {
        let _ = job_tx.send(repo_id.as_str());
    }
    drop(job_tx);

    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                let mut lingering = Vec::new();
                for repo_id in job_rx.iter() {
                    let result = run_with_timeout(ctx, repo_id, &mut lingering);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                join_lingering(lingering);
            });
        }
    });
    drop(result_tx);
    result_rx.iter().collect()
}

/// Run one repository on its own thread and wait at most the configured
/// timeout. On expiry the task is cancelled and its handle parked in
/// `lingering`; it unwinds on its next cancellation check and its
/// working-tree guard removes anything it extracted.
pub fn run_with_timeout(
    ctx: &Arc<MineContext>,
    repo_id: &str,
    lingering: &mut Vec<JoinHandle<()>>,
) -> TaskResult {
    let timeout = ctx.config.timeout();
    let cancel = CancelToken::new(timeout);
    let (tx, rx) = crossbeam_channel::bounded(1);

    let task_ctx = Arc::clone(ctx);
    let task_cancel = cancel.clone();
    let task_repo = repo_id.to_string();
    let spawned = thread::Builder::new()
        .name(format!("repo:{repo_id}"))
        .spawn(move || {
            let result = pipeline::collect_from_repo(&task_ctx, &task_repo, &task_cancel);
            let _ = tx.send(result);
        });
    let handle = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            error!(repo_id, error = %e, "failed to start repository task");
            return TaskResult::Errored;
        }
    };

    let received = match timeout {
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!(repo_id, timeout_secs = limit.as_secs(), "repository timed out");
                lingering.push(handle);
                return TaskResult::TimedOut;
            }
            Err(RecvTimeoutError::Disconnected) => None,
        },
        None => rx.recv().ok(),
    };
    let _ = handle.join();

    match received {
        Some(Ok(outcome)) => {
            info!(
                repo_id,
                status = outcome.status.as_str(),
                code = outcome.status.code(),
                files = outcome.file_count,
                tests = outcome.test_count,
                "repository done"
            );
            TaskResult::Finished(outcome)
        }
        Some(Err(MineError::Cancelled)) => {
            warn!(repo_id, "repository timed out");
            TaskResult::TimedOut
        }
        Some(Err(e)) => {
            error!(repo_id, error = %e, "repository failed");
            TaskResult::Errored
        }
        None => {
            error!(repo_id, "repository task panicked");
            TaskResult::Errored
        }
    }
}

fn join_lingering(lingering: Vec<JoinHandle<()>>) {
    for handle in lingering {
        let _ = handle.join();
    }
}
