//! Download manager: a bounded worker pool that fetches artifact files
//! through the repository chain, verifies them and commits them into the
//! local cache atomically.

mod error;
mod pool;
mod task;

pub use error::{DownloadError, DownloadFailure};
pub use pool::run_bounded;

use std::collections::HashSet;
use std::sync::Arc;

use crate::checksum::ChecksumPolicy;
use crate::control::{CancelToken, Cancelled};
use crate::events::{EventSink, SessionEvent};
use crate::model::{DownloadTask, ResolvedArtifact};
use crate::repository::RepositoryChain;
use crate::retry::RetryPolicy;

/// Outcome of `download_all`, in task order.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub artifacts: Vec<ResolvedArtifact>,
    pub errors: Vec<DownloadError>,
}

pub struct DownloadManager {
    chain: Arc<RepositoryChain>,
    retry: RetryPolicy,
    checksum_policy: ChecksumPolicy,
    events: EventSink,
}

impl DownloadManager {
    pub fn new(chain: Arc<RepositoryChain>, retry: RetryPolicy, checksum_policy: ChecksumPolicy) -> Self {
        Self {
            chain,
            retry,
            checksum_policy,
            events: EventSink::default(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Run every task with at most `parallelism` concurrent workers.
    ///
    /// A failing task never affects its siblings. Duplicate tasks are run
    /// once. After cancellation no new task starts; tasks that never ran are
    /// reported as cancelled. A task whose worker died is reported as
    /// [`DownloadFailure::WorkerFailed`].
    pub fn download_all(&self, tasks: Vec<DownloadTask>, parallelism: usize, cancel: &CancelToken) -> DownloadReport {
        let mut seen = HashSet::new();
        let tasks: Vec<DownloadTask> = tasks
            .into_iter()
            .filter(|t| seen.insert((t.coordinate.clone(), t.target_path.clone())))
            .collect();
        let coordinates: Vec<_> = tasks.iter().map(|t| t.coordinate.clone()).collect();
        tracing::info!(tasks = tasks.len(), parallelism, "starting downloads");

        let results = run_bounded(tasks, parallelism, cancel, |task| {
            let result = self.execute(&task, cancel);
            match &result {
                Ok(artifact) => self.events.emit(SessionEvent::ArtifactReady {
                    coordinate: artifact.coordinate.clone(),
                    path: artifact.local_path.clone(),
                    from_cache: artifact.from_cache,
                }),
                Err(e) => {
                    tracing::warn!(coordinate = %task.coordinate, attempts = e.attempts, "download failed: {}", e.cause);
                    self.events.emit(SessionEvent::ArtifactFailed {
                        coordinate: task.coordinate.clone(),
                        error: e.to_string(),
                    });
                }
            }
            result
        });

        let mut report = DownloadReport::default();
        for (coordinate, result) in coordinates.into_iter().zip(results) {
            match result {
                Some(Ok(artifact)) => report.artifacts.push(artifact),
                Some(Err(e)) => report.errors.push(e),
                None => {
                    let cause = if cancel.is_cancelled() {
                        Cancelled.into()
                    } else {
                        tracing::error!(coordinate = %coordinate, "download worker stopped without a result");
                        DownloadFailure::WorkerFailed
                    };
                    report.errors.push(DownloadError {
                        coordinate,
                        attempts: 0,
                        cause,
                    });
                }
            }
        }
        let cached = report.artifacts.iter().filter(|a| a.from_cache).count();
        tracing::info!(
            downloaded = report.artifacts.len() - cached,
            cached,
            failed = report.errors.len(),
            "downloads finished"
        );
        report
    }
}
