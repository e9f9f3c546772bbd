//! Coverage pipeline
//!
//! This module provides the three stages of a run:
//! - Directory discovery ([`walker`])
//! - Concurrent per-directory test runs ([`dispatch`])
//! - Profile merging and the final report ([`merge`])

pub mod dispatch;
pub mod merge;
pub mod walker;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

pub use dispatch::Dispatcher;
pub use merge::{merge_profiles, write_report};
pub use walker::{CandidateDirectory, Walker};

use crate::config::RunConfig;

/// Candidates buffered between the walk and the dispatcher
const WALK_BUFFER: usize = 64;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Number of package profiles merged
    pub packages: usize,
    /// Path of the merged profile
    pub output: PathBuf,
}

/// Walk the project, test every candidate concurrently and write the merged profile
///
/// Workers start while the walk is still in progress. Any failure, in the
/// walk or in a worker, cancels the remaining workers and is returned
/// without writing a report.
pub async fn run(config: Arc<RunConfig>) -> Result<RunSummary> {
    let (mut discovered, walk) = spawn_walk(Arc::clone(&config));
    let mut dispatcher = Dispatcher::new(Arc::clone(&config));

    let mut failure = None;
    while let Some(candidate) = discovered.recv().await {
        if let Err(e) = candidate.and_then(|c| dispatcher.dispatch(c)) {
            failure = Some(e);
            break;
        }
    }
    // Stops the walk at its next send
    drop(discovered);
    if failure.is_none() {
        if let Err(e) = walk.await {
            failure = Some(anyhow!("directory walk failed: {}", e));
        }
    }
    if let Some(e) = failure {
        dispatcher.cancel().await;
        return Err(e);
    }

    info!("Dispatched {} package(s)", dispatcher.dispatched());
    let profiles = dispatcher.finish().await?;

    let merged = merge_profiles(config.mode, &profiles);
    let output = write_report(&config.project_root, &merged)?;

    Ok(RunSummary {
        packages: profiles.len(),
        output,
    })
}

/// Walk the tree on the blocking pool, sending candidates as they are found
///
/// The walk ends after the first error or once the receiver is dropped.
fn spawn_walk(
    config: Arc<RunConfig>,
) -> (mpsc::Receiver<Result<CandidateDirectory>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(WALK_BUFFER);
    let walk = tokio::task::spawn_blocking(move || {
        let walker = match Walker::new(&config.project_root, &config.ignores) {
            Ok(walker) => walker,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        };
        for candidate in walker.candidates() {
            let fatal = candidate.is_err();
            if tx.blocking_send(candidate).is_err() || fatal {
                break;
            }
        }
    });
    (rx, walk)
}
