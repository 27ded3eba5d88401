//! Resolution session: wires the repository chain, descriptor fetcher, graph
//! resolver and download manager together for one set of roots.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::LocalCache;
use crate::checksum::{Checksum, ChecksumPolicy};
use crate::control::{CancelToken, Cancelled};
use crate::coord::{ArtifactKey, Coordinate};
use crate::download::{DownloadError, DownloadManager};
use crate::events::{EventSink, SessionEvent};
use crate::model::{DownloadTask, ResolvedArtifact, ScopeFilter};
use crate::pom::PomFetcher;
use crate::repository::{
    CurlTransport, RemoteRepository, RepositoryChain, RepositoryUrlError, Transport, TransportOptions, MAVEN_CENTRAL,
};
use crate::resolver::{GraphResolver, ResolutionError, ResolveOptions, RootDependency};
use crate::retry::RetryPolicy;

/// Engine-facing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Remote repository base URLs in priority order.
    pub repositories: Vec<String>,
    pub scopes: ScopeFilter,
    pub include_optional: bool,
    /// Download workers.
    pub parallelism: usize,
    /// Concurrent descriptor fetches per graph level.
    pub pom_parallelism: usize,
    pub checksum_policy: ChecksumPolicy,
    pub retry: RetryPolicy,
    pub discover_repositories: bool,
    /// Artifacts that must resolve, besides roots flagged mandatory.
    pub mandatory: BTreeSet<ArtifactKey>,
    pub transport: TransportOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repositories: vec![MAVEN_CENTRAL.to_string()],
            scopes: ScopeFilter::runtime(),
            include_optional: false,
            parallelism: 4,
            pom_parallelism: 4,
            checksum_policy: ChecksumPolicy::Strict,
            retry: RetryPolicy::default(),
            discover_repositories: false,
            mandatory: BTreeSet::new(),
            transport: TransportOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Local files for everything one root pulled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootResult {
    pub root: Coordinate,
    /// Breadth-first from the root; only artifacts that were downloaded.
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionResult {
    pub artifacts: Vec<ResolvedArtifact>,
    pub roots: Vec<RootResult>,
    /// Every failure, fatal or not.
    pub errors: Vec<SessionFailure>,
    pub warnings: Vec<String>,
    /// A mandatory artifact failed or the session was cancelled.
    pub failed: bool,
}

impl SessionResult {
    pub fn is_success(&self) -> bool {
        !self.failed
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.artifacts.iter().map(|a| a.local_path.as_path()).collect()
    }
}

pub struct ResolutionSession {
    cache: Arc<LocalCache>,
    chain: Arc<RepositoryChain>,
    fetcher: PomFetcher,
    downloads: DownloadManager,
    config: SessionConfig,
    cancel: CancelToken,
}

impl ResolutionSession {
    /// Session over HTTP(S)/file repositories using curl.
    pub fn new(cache: Arc<LocalCache>, config: SessionConfig) -> Result<Self, RepositoryUrlError> {
        let transport = Arc::new(CurlTransport::new(config.transport.clone()));
        Self::with_transport(cache, config, transport)
    }

    pub fn with_transport(
        cache: Arc<LocalCache>,
        config: SessionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, RepositoryUrlError> {
        let remotes = config
            .repositories
            .iter()
            .map(|r| RemoteRepository::parse(r))
            .collect::<Result<Vec<_>, _>>()?;
        let chain = Arc::new(RepositoryChain::new(Arc::clone(&cache), remotes, transport));
        let fetcher = PomFetcher::new(Arc::clone(&chain), config.checksum_policy)
            .with_repository_discovery(config.discover_repositories);
        let downloads = DownloadManager::new(Arc::clone(&chain), config.retry, config.checksum_policy);
        Ok(Self {
            cache,
            chain,
            fetcher,
            downloads,
            config,
            cancel: CancelToken::new(),
        })
    }

    /// Report progress on `tx`. Events are dropped if the receiver lags.
    pub fn with_events(mut self, tx: tokio::sync::mpsc::Sender<SessionEvent>) -> Self {
        let sink = EventSink::new(tx);
        self.fetcher = self.fetcher.with_events(sink.clone());
        self.downloads = self.downloads.with_events(sink);
        self
    }

    /// Token that cancels this session's running and future work.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn chain(&self) -> &RepositoryChain {
        &self.chain
    }

    pub fn resolve(&self, roots: &[RootDependency]) -> SessionResult {
        let mut mandatory = self.config.mandatory.clone();
        mandatory.extend(roots.iter().filter(|r| r.mandatory).map(|r| r.coordinate.key()));
        let options = ResolveOptions {
            scopes: self.config.scopes.clone(),
            include_optional: self.config.include_optional,
            parallelism: self.config.pom_parallelism,
            mandatory: mandatory.clone(),
        };
        tracing::info!(roots = roots.len(), repositories = self.chain.remotes().len(), "resolution started");

        let resolution = GraphResolver::new(&self.fetcher).resolve(roots, &options, &self.cancel);
        let mut result = SessionResult {
            warnings: resolution.warnings.clone(),
            failed: resolution.failed,
            errors: resolution.errors.iter().cloned().map(SessionFailure::from).collect(),
            ..SessionResult::default()
        };
        if resolution.cancelled || self.cancel.is_cancelled() {
            result.errors.push(Cancelled.into());
            result.failed = true;
            return result;
        }

        let pinned: HashMap<&Coordinate, &Checksum> = roots
            .iter()
            .filter_map(|r| r.pinned_checksum().map(|c| (&r.coordinate, c)))
            .collect();
        let tasks: Vec<DownloadTask> = resolution
            .nodes
            .iter()
            .map(|n| DownloadTask {
                coordinate: n.coordinate.clone(),
                target_path: self.cache.artifact_path(&n.coordinate),
                expected_checksum: pinned.get(&n.coordinate).map(|c| (*c).clone()),
            })
            .collect();

        let report = self.downloads.download_all(tasks, self.config.parallelism, &self.cancel);
        for e in &report.errors {
            if e.is_cancelled() || mandatory.contains(&e.coordinate.key()) {
                result.failed = true;
            }
        }

        let by_coordinate: HashMap<&Coordinate, &ResolvedArtifact> =
            report.artifacts.iter().map(|a| (&a.coordinate, a)).collect();
        result.roots = roots
            .iter()
            .map(|root| RootResult {
                root: root.coordinate.clone(),
                paths: resolution
                    .closure(&root.coordinate)
                    .into_iter()
                    .filter_map(|n| by_coordinate.get(&n.coordinate))
                    .map(|a| a.local_path.clone())
                    .collect(),
            })
            .collect();

        result.errors.extend(report.errors.into_iter().map(SessionFailure::from));
        result.artifacts = report.artifacts;
        tracing::info!(
            artifacts = result.artifacts.len(),
            errors = result.errors.len(),
            network_requests = self.chain.network_requests(),
            failed = result.failed,
            "resolution finished"
        );
        result
    }
}

/// One-shot resolution with a fresh session.
pub fn resolve(
    cache: Arc<LocalCache>,
    roots: &[RootDependency],
    config: SessionConfig,
) -> Result<SessionResult, RepositoryUrlError> {
    Ok(ResolutionSession::new(cache, config)?.resolve(roots))
}
