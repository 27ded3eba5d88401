//! One download task: cache check, fetch, verify, atomic commit.

use std::path::Path;

use super::error::{DownloadError, DownloadFailure};
use super::DownloadManager;
use crate::cache::read_sidecar_file;
use crate::checksum::{sha1_hex, sha1_path, Checksum, ChecksumAlgo, ChecksumError, ChecksumPolicy};
use crate::control::{CancelToken, Cancelled};
use crate::model::{DownloadTask, ResolvedArtifact};
use crate::repository::Origin;
use crate::retry::run_with_retry;

impl DownloadManager {
    pub(super) fn execute(&self, task: &DownloadTask, cancel: &CancelToken) -> Result<ResolvedArtifact, DownloadError> {
        let failed = |attempts: u32, cause: DownloadFailure| DownloadError {
            coordinate: task.coordinate.clone(),
            attempts,
            cause,
        };
        if cancel.is_cancelled() {
            return Err(failed(0, Cancelled.into()));
        }
        task.coordinate.validate().map_err(|e| failed(0, e.into()))?;
        let rel = task.coordinate.repository_path();

        if task.target_path.is_file() {
            match self.try_cache_hit(task, &rel, cancel) {
                Ok(Some(artifact)) => return Ok(artifact),
                Ok(None) => {}
                Err(cause) => return Err(failed(0, cause)),
            }
        }

        let (result, attempts) = run_with_retry(&self.retry, cancel, |attempt| {
            if attempt > 1 {
                tracing::info!(coordinate = %task.coordinate, attempt, "retrying download");
            }
            self.fetch_verified(task, &rel, cancel)
        });
        result.map_err(|cause| failed(attempts, cause))
    }

    /// A cached file is reused when it matches the pinned digest, the local
    /// sidecar, or (fetched now) a remote checksum.
    fn try_cache_hit(
        &self,
        task: &DownloadTask,
        rel: &str,
        cancel: &CancelToken,
    ) -> Result<Option<ResolvedArtifact>, DownloadFailure> {
        let local_sidecar = match &task.expected_checksum {
            Some(_) => None,
            None => read_sidecar_file(&task.target_path).unwrap_or_else(|e| {
                tracing::debug!(path = %task.target_path.display(), "unreadable sidecar: {}", e);
                None
            }),
        };
        let had_local_sidecar = local_sidecar.is_some();
        let expected = match task.expected_checksum.clone().or(local_sidecar) {
            Some(sum) => Some(sum),
            None => self.chain.fetch_any_checksum(&task.coordinate, cancel)?,
        };

        let Some(expected) = expected else {
            return match self.checksum_policy {
                ChecksumPolicy::Warn => {
                    tracing::warn!(coordinate = %task.coordinate, "cached artifact has no checksum; accepted unverified");
                    let sha1 = sha1_path(&task.target_path).map_err(|e| DownloadFailure::Io(e.to_string()))?;
                    Ok(Some(self.ready(task, sha1, true)))
                }
                ChecksumPolicy::Strict => Ok(None),
            };
        };

        match expected.verify_path(&task.target_path) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(coordinate = %task.coordinate, "cached artifact fails {} check; refetching", expected.algo);
                return Ok(None);
            }
            Err(e) => {
                tracing::debug!(coordinate = %task.coordinate, "cannot verify cached artifact: {:#}", e);
                return Ok(None);
            }
        }
        let sha1 = match expected.algo {
            ChecksumAlgo::Sha1 => expected.hex.clone(),
            ChecksumAlgo::Sha256 | ChecksumAlgo::Md5 => {
                sha1_path(&task.target_path).map_err(|e| DownloadFailure::Io(e.to_string()))?
            }
        };
        if !had_local_sidecar {
            self.write_sidecar(&task.target_path, &sha1);
        }
        tracing::debug!(coordinate = %task.coordinate, "artifact cache hit");
        Ok(Some(self.ready(task, sha1, true)))
    }

    fn fetch_verified(
        &self,
        task: &DownloadTask,
        rel: &str,
        cancel: &CancelToken,
    ) -> Result<ResolvedArtifact, DownloadFailure> {
        cancel.check()?;
        let fetched = self.chain.fetch_remote_artifact(&task.coordinate, cancel)?;
        let expected = match (&task.expected_checksum, &fetched.origin) {
            (Some(sum), _) => Some(sum.clone()),
            (None, Origin::Remote(repo)) => self.chain.fetch_checksum(repo, &fetched.path, cancel)?,
            (None, Origin::Cache) => None,
        };
        match &expected {
            Some(sum) => ChecksumError::verify(rel, sum, &fetched.bytes)?,
            None => match self.checksum_policy {
                ChecksumPolicy::Strict => {
                    return Err(ChecksumError::Missing { path: rel.to_string() }.into())
                }
                ChecksumPolicy::Warn => {
                    tracing::warn!(coordinate = %task.coordinate, "no checksum published; accepted unverified")
                }
            },
        }
        // Nothing reaches the final path unless verified and not cancelled.
        cancel.check()?;
        let sha1 = sha1_hex(&fetched.bytes);
        self.chain
            .cache()
            .commit_path(&task.target_path, &fetched.bytes)
            .map_err(|e| DownloadFailure::Io(format!("{}: {}", task.target_path.display(), e)))?;
        self.write_sidecar(&task.target_path, &sha1);
        tracing::debug!(coordinate = %task.coordinate, bytes = fetched.bytes.len(), "artifact downloaded");
        Ok(self.ready(task, sha1, false))
    }

    fn write_sidecar(&self, path: &Path, sha1: &str) {
        let sum = Checksum {
            algo: ChecksumAlgo::Sha1,
            hex: sha1.to_string(),
        };
        if let Err(e) = self.chain.cache().commit_sidecar(path, &sum) {
            tracing::warn!(path = %path.display(), "could not write checksum sidecar: {}", e);
        }
    }

    fn ready(&self, task: &DownloadTask, sha1: String, from_cache: bool) -> ResolvedArtifact {
        ResolvedArtifact {
            coordinate: task.coordinate.clone(),
            local_path: task.target_path.clone(),
            sha1,
            from_cache,
        }
    }
}
