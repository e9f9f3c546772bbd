//! Test dispatcher
//!
//! One worker per candidate directory. Each worker runs
//! `go test -coverprofile` scoped to its directory, relays the output, and
//! hands the resulting profile bytes to the collector over a channel.
//!
//! The first failure cancels the whole group: sibling tasks are aborted,
//! which drops their child processes and kills them, and a single error is
//! returned to the caller.

use std::path::MAIN_SEPARATOR;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info};

use super::merge::PKG_FILENAME;
use super::walker::CandidateDirectory;
use crate::config::RunConfig;
use crate::error::OverallsError;
use crate::exec::run_streamed;

/// Arguments for `go test` in one candidate directory
pub fn test_args(config: &RunConfig, candidate: &CandidateDirectory) -> Vec<String> {
    // 1 for "test", 4 for covermode, coverprofile, outputdir, package
    let mut args = Vec::with_capacity(1 + config.go_args.len() + 4);
    args.push("test".to_string());
    args.extend(config.go_args.iter().cloned());
    args.push(format!("-covermode={}", config.mode));
    args.push(format!("-coverprofile={}", PKG_FILENAME));
    args.push(format!(
        "-outputdir={}{}",
        candidate.path.display(),
        MAIN_SEPARATOR
    ));
    args.push(candidate.package());
    args
}

/// Worker pool with a completion latch and a results channel
pub struct Dispatcher {
    config: Arc<RunConfig>,
    tasks: JoinSet<Result<()>>,
    limit: Option<Arc<Semaphore>>,
    results: mpsc::UnboundedSender<Vec<u8>>,
    profiles: mpsc::UnboundedReceiver<Vec<u8>>,
    dispatched: usize,
    completed: usize,
}

impl Dispatcher {
    pub fn new(config: Arc<RunConfig>) -> Self {
        let limit = config.concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let (results, profiles) = mpsc::unbounded_channel();
        Self {
            config,
            tasks: JoinSet::new(),
            limit,
            results,
            profiles,
            dispatched: 0,
            completed: 0,
        }
    }

    /// Start a worker for `candidate`
    ///
    /// Fails without starting anything if an earlier worker has already failed.
    pub fn dispatch(&mut self, candidate: CandidateDirectory) -> Result<()> {
        self.reap_finished()?;

        let worker = test_package(
            Arc::clone(&self.config),
            candidate,
            self.limit.clone(),
            self.results.clone(),
        );
        self.tasks.spawn(worker);
        self.dispatched += 1;
        Ok(())
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Wait for every worker, then drain the delivered profiles in arrival order
    pub async fn finish(mut self) -> Result<Vec<Vec<u8>>> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = flatten(joined) {
                self.cancel().await;
                return Err(e);
            }
            self.completed += 1;
        }
        debug!(
            dispatched = self.dispatched,
            completed = self.completed,
            "all workers finished"
        );

        // Every sender clone lived in a finished task; dropping ours closes the channel
        let Dispatcher {
            results,
            mut profiles,
            dispatched,
            ..
        } = self;
        drop(results);

        let mut collected = Vec::with_capacity(dispatched);
        while let Some(profile) = profiles.recv().await {
            collected.push(profile);
        }
        Ok(collected)
    }

    /// Abort every running worker and wait for them to unwind
    pub async fn cancel(&mut self) {
        if !self.tasks.is_empty() {
            debug!(running = self.tasks.len(), "cancelling workers");
        }
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
    }

    fn reap_finished(&mut self) -> Result<()> {
        while let Some(joined) = self.tasks.try_join_next() {
            flatten(joined)?;
            self.completed += 1;
        }
        Ok(())
    }
}

fn flatten(joined: Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(anyhow!("test worker panicked")),
        Err(e) => Err(anyhow!("test worker cancelled: {}", e)),
    }
}

async fn test_package(
    config: Arc<RunConfig>,
    candidate: CandidateDirectory,
    limit: Option<Arc<Semaphore>>,
    results: mpsc::UnboundedSender<Vec<u8>>,
) -> Result<()> {
    let _permit = match limit {
        Some(semaphore) => Some(
            semaphore
                .acquire_owned()
                .await
                .context("worker pool closed")?,
        ),
        None => None,
    };

    let package = candidate.package();
    let fail = |message: String| OverallsError::dispatch_error(package.as_str(), message);

    let profile_path = candidate.path.join(PKG_FILENAME);
    // A profile left by an earlier run must not stand in for this one
    match tokio::fs::remove_file(&profile_path).await {
        Ok(()) => debug!("Removed stale {}", profile_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(fail(format!("removing {}: {}", profile_path.display(), e)).into());
        }
    }

    let args = test_args(&config, &candidate);
    info!("Test package: {}", package);
    debug!("Processing: {} {}", config.go_program, args.join(" "));

    let mut cmd = Command::new(&config.go_program);
    cmd.args(&args).current_dir(&config.project_root);

    let result = run_streamed(cmd, &package, config.timeout)
        .await
        .map_err(|e| fail(format!("{:#}", e)))?;
    if !result.success() {
        return Err(fail(format!("{} test {}", config.go_program, result.status)).into());
    }
    debug!(
        package = %package,
        elapsed_ms = result.duration.as_millis() as u64,
        "test run finished"
    );

    let profile = tokio::fs::read(&profile_path)
        .await
        .map_err(|e| fail(format!("reading {}: {}", profile_path.display(), e)))?;

    results
        .send(profile)
        .map_err(|_| fail("results channel closed".to_string()))?;
    Ok(())
}
