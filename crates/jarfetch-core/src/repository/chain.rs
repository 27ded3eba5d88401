use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::error::{RepositoryError, RepositoryFailure, RepositoryUrlError, TransportError};
use super::remote::RemoteRepository;
use super::snapshot::SnapshotMetadata;
use super::transport::Transport;
use crate::cache::LocalCache;
use crate::checksum::{parse_sidecar, Checksum, REMOTE_SIDECAR_ALGOS};
use crate::control::{CancelToken, Cancelled};
use crate::coord::Coordinate;
use crate::memo::SingleFlight;

/// Where a fetched file came from.
#[derive(Debug, Clone)]
pub enum Origin {
    Cache,
    Remote(Arc<RemoteRepository>),
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub origin: Origin,
    /// Path the bytes were served under; differs from the cache path for
    /// timestamped SNAPSHOT files.
    pub path: String,
}

type SnapshotSlot = Result<Option<Arc<SnapshotMetadata>>, TransportError>;

/// Local cache followed by remote repositories, tried strictly in order.
///
/// Remotes may be appended while a session runs (repositories discovered in
/// descriptors); readers take a snapshot, so a fetch already iterating the
/// chain is unaffected.
pub struct RepositoryChain {
    cache: Arc<LocalCache>,
    remotes: RwLock<Vec<Arc<RemoteRepository>>>,
    transport: Arc<dyn Transport>,
    requests: AtomicU64,
    /// Per (repository, metadata path).
    snapshots: SingleFlight<(String, String), SnapshotSlot>,
}

impl RepositoryChain {
    pub fn new(
        cache: Arc<LocalCache>,
        remotes: Vec<RemoteRepository>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mut unique: Vec<Arc<RemoteRepository>> = Vec::with_capacity(remotes.len());
        for r in remotes {
            if !unique.iter().any(|u| u.url() == r.url()) {
                unique.push(Arc::new(r));
            }
        }
        Self {
            cache,
            remotes: RwLock::new(unique),
            transport,
            requests: AtomicU64::new(0),
            snapshots: SingleFlight::new(),
        }
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    /// Snapshot of the remote repositories in lookup order.
    pub fn remotes(&self) -> Vec<Arc<RemoteRepository>> {
        match self.remotes.read() {
            Ok(r) => r.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Append a repository unless one with the same URL is already present.
    /// Returns whether the chain changed.
    pub fn add_repository(&self, raw: &str) -> Result<bool, RepositoryUrlError> {
        let repo = RemoteRepository::parse(raw)?;
        let mut remotes = match self.remotes.write() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        if remotes.iter().any(|r| r.url() == repo.url()) {
            return Ok(false);
        }
        tracing::info!(repository = %repo, "adding repository to chain");
        remotes.push(Arc::new(repo));
        Ok(true)
    }

    /// Number of remote GETs issued so far.
    pub fn network_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// `coordinate`'s file from the local cache, else from the first remote
    /// that has it.
    pub fn fetch_artifact(&self, coordinate: &Coordinate, cancel: &CancelToken) -> Result<Fetched, RepositoryError> {
        match self.read_cached(&coordinate.repository_path()) {
            Some(fetched) => Ok(fetched),
            None => self.fetch_remote_artifact(coordinate, cancel),
        }
    }

    /// First remote that serves `coordinate`, skipping the local cache.
    /// `-SNAPSHOT` versions map to each repository's latest timestamped file.
    pub fn fetch_remote_artifact(
        &self,
        coordinate: &Coordinate,
        cancel: &CancelToken,
    ) -> Result<Fetched, RepositoryError> {
        self.first_remote(&coordinate.repository_path(), cancel, |repo| {
            self.remote_path(repo, coordinate, cancel)
        })
    }

    /// Where `repo` publishes `coordinate`. Falls back to the literal path
    /// when a SNAPSHOT has no usable metadata.
    pub fn remote_path(
        &self,
        repo: &RemoteRepository,
        coordinate: &Coordinate,
        cancel: &CancelToken,
    ) -> Result<String, TransportError> {
        let literal = coordinate.repository_path();
        if !coordinate.is_snapshot() {
            return Ok(literal);
        }
        let metadata_path = coordinate.metadata_path();
        let key = (repo.url().to_string(), metadata_path.clone());
        let metadata = self.snapshots.get_or_run(&key, || match self.fetch_from(repo, &metadata_path, cancel) {
            Ok(bytes) => match SnapshotMetadata::parse(&bytes) {
                Ok(m) => Ok(Some(Arc::new(m))),
                Err(e) => {
                    tracing::warn!(path = %metadata_path, repository = %repo, "unreadable snapshot metadata: {}", e);
                    Ok(None)
                }
            },
            Err(TransportError::Cancelled) => Err(TransportError::Cancelled),
            Err(e) => {
                tracing::debug!(path = %metadata_path, repository = %repo, "no snapshot metadata: {}", e);
                Ok(None)
            }
        })?;
        let Some(file_version) = metadata.and_then(|m| m.file_version(coordinate)) else {
            return Ok(literal);
        };
        if let Err(e) = coordinate.clone().with_version(file_version.as_str()).validate() {
            tracing::warn!(repository = %repo, "ignoring snapshot metadata: {}", e);
            return Ok(literal);
        }
        tracing::debug!(coordinate = %coordinate, repository = %repo, file_version = %file_version, "snapshot resolved");
        Ok(coordinate.snapshot_path(&file_version))
    }

    /// Checksum `repo` publishes for `path`: `.sha1`, else `.md5`. Only `repo`
    /// is asked, so the digest always comes from the source of the bytes.
    pub fn fetch_checksum(
        &self,
        repo: &RemoteRepository,
        path: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Checksum>, Cancelled> {
        for algo in REMOTE_SIDECAR_ALGOS {
            let sidecar = format!("{}.{}", path, algo.extension());
            match self.fetch_from(repo, &sidecar, cancel) {
                Ok(body) => match parse_sidecar(algo, &body) {
                    Some(sum) => return Ok(Some(sum)),
                    None => tracing::debug!(path = %sidecar, repository = %repo, "malformed checksum sidecar"),
                },
                Err(TransportError::Cancelled) => return Err(Cancelled),
                Err(e) => tracing::debug!(path = %sidecar, repository = %repo, "no checksum sidecar: {}", e),
            }
        }
        Ok(None)
    }

    /// Checksum for a `coordinate` whose bytes came from the cache: the first
    /// remote that publishes one.
    pub fn fetch_any_checksum(
        &self,
        coordinate: &Coordinate,
        cancel: &CancelToken,
    ) -> Result<Option<Checksum>, Cancelled> {
        for repo in self.remotes() {
            let path = match self.remote_path(&repo, coordinate, cancel) {
                Ok(path) => path,
                Err(TransportError::Cancelled) => return Err(Cancelled),
                Err(_) => continue,
            };
            if let Some(sum) = self.fetch_checksum(&repo, &path, cancel)? {
                return Ok(Some(sum));
            }
        }
        Ok(None)
    }

    fn read_cached(&self, path: &str) -> Option<Fetched> {
        match self.cache.read(path) {
            Ok(Some(bytes)) => Some(Fetched {
                bytes,
                origin: Origin::Cache,
                path: path.to_string(),
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(path, "unreadable cache entry, falling back to remotes: {}", e);
                None
            }
        }
    }

    /// Try each remote in order; `locate` names the path to ask it for.
    fn first_remote(
        &self,
        path: &str,
        cancel: &CancelToken,
        locate: impl Fn(&RemoteRepository) -> Result<String, TransportError>,
    ) -> Result<Fetched, RepositoryError> {
        let mut failures = Vec::new();
        for repo in self.remotes() {
            if cancel.is_cancelled() {
                failures.push(RepositoryFailure {
                    repository: repo.to_string(),
                    error: TransportError::Cancelled,
                });
                break;
            }
            let fetched = locate(&repo)
                .and_then(|remote_path| self.fetch_from(&repo, &remote_path, cancel).map(|bytes| (remote_path, bytes)));
            match fetched {
                Ok((remote_path, bytes)) => {
                    tracing::debug!(path = %remote_path, repository = %repo, bytes = bytes.len(), "fetched");
                    return Ok(Fetched {
                        bytes,
                        origin: Origin::Remote(repo),
                        path: remote_path,
                    });
                }
                Err(error) => {
                    tracing::debug!(path, repository = %repo, "fetch failed: {}", error);
                    let stop = error == TransportError::Cancelled;
                    failures.push(RepositoryFailure {
                        repository: repo.to_string(),
                        error,
                    });
                    if stop {
                        break;
                    }
                }
            }
        }
        Err(RepositoryError::new(path, failures))
    }

    /// GET `path` from one specific repository.
    pub fn fetch_from(
        &self,
        repo: &RemoteRepository,
        path: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, TransportError> {
        let url = repo
            .resolve(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{}{}: {}", repo, path, e)))?;
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.transport.get(&url, repo.credentials(), cancel)
    }
}
