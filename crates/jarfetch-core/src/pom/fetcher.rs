use std::sync::Arc;

use super::effective::effective_pom;
use super::error::{ParseError, PomError};
use super::parse::RawPom;
use crate::checksum::{sha1_hex, Checksum, ChecksumAlgo, ChecksumError, ChecksumPolicy};
use crate::control::CancelToken;
use crate::coord::Coordinate;
use crate::events::{EventSink, SessionEvent};
use crate::memo::SingleFlight;
use crate::model::Pom;
use crate::repository::{Origin, RepositoryChain};

/// Fetches, verifies, caches and merges descriptors.
///
/// Both raw documents and effective POMs are memoized per key with
/// single-flight semantics: a parent shared by many modules is downloaded and
/// parsed once, and concurrent requests for one coordinate join the same
/// fetch. Descriptor fetches are a single attempt.
pub struct PomFetcher {
    chain: Arc<RepositoryChain>,
    checksum_policy: ChecksumPolicy,
    discover_repositories: bool,
    events: EventSink,
    raw: SingleFlight<Coordinate, Result<Arc<RawPom>, PomError>>,
    effective: SingleFlight<Coordinate, Result<Arc<Pom>, PomError>>,
}

impl PomFetcher {
    pub fn new(chain: Arc<RepositoryChain>, checksum_policy: ChecksumPolicy) -> Self {
        Self {
            chain,
            checksum_policy,
            discover_repositories: false,
            events: EventSink::default(),
            raw: SingleFlight::new(),
            effective: SingleFlight::new(),
        }
    }

    /// Append `<repositories>` found in descriptors to the chain.
    pub fn with_repository_discovery(mut self, enabled: bool) -> Self {
        self.discover_repositories = enabled;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Effective POM describing `coordinate` (classifier/extension ignored).
    pub fn fetch_pom(&self, coordinate: &Coordinate, cancel: &CancelToken) -> Result<Arc<Pom>, PomError> {
        coordinate
            .validate()
            .map_err(|e| ParseError::new(coordinate, e.to_string()))?;
        let pom_coordinate = coordinate.pom_coordinate();
        self.effective.get_or_run(&pom_coordinate, || {
            cancel.check()?;
            let pom = effective_pom(&pom_coordinate, &|c: &Coordinate| self.load_raw(c, cancel))?;
            if self.discover_repositories {
                for url in &pom.repositories {
                    if let Err(e) = self.chain.add_repository(url) {
                        tracing::warn!(coordinate = %pom_coordinate, "ignoring declared repository: {}", e);
                    }
                }
            }
            tracing::debug!(
                coordinate = %pom_coordinate,
                dependencies = pom.dependencies.len(),
                "descriptor resolved"
            );
            self.events.emit(SessionEvent::PomResolved {
                coordinate: pom_coordinate.clone(),
            });
            Ok(Arc::new(pom))
        })
    }

    /// Number of effective POMs computed so far.
    pub fn memoized(&self) -> usize {
        self.effective.len()
    }

    fn load_raw(&self, coordinate: &Coordinate, cancel: &CancelToken) -> Result<Arc<RawPom>, PomError> {
        self.raw.get_or_run(coordinate, || {
            let bytes = self.fetch_descriptor(coordinate, cancel)?;
            Ok(Arc::new(RawPom::parse(&bytes, coordinate)?))
        })
    }

    /// Descriptor bytes from the cache, or from the first remote that has
    /// them, verified against that remote's checksum and committed to the cache.
    fn fetch_descriptor(&self, coordinate: &Coordinate, cancel: &CancelToken) -> Result<Vec<u8>, PomError> {
        cancel.check()?;
        let path = coordinate.repository_path();
        let fetched = self.chain.fetch_artifact(coordinate, cancel)?;
        let repo = match fetched.origin {
            Origin::Cache => {
                tracing::debug!(coordinate = %coordinate, "descriptor cache hit");
                return Ok(fetched.bytes);
            }
            Origin::Remote(repo) => repo,
        };
        let bytes = fetched.bytes;

        let expected = self.chain.fetch_checksum(&repo, &fetched.path, cancel)?;
        match &expected {
            Some(sum) => ChecksumError::verify(&path, sum, &bytes)?,
            None => match self.checksum_policy {
                ChecksumPolicy::Strict => return Err(ChecksumError::Missing { path }.into()),
                ChecksumPolicy::Warn => {
                    tracing::warn!(coordinate = %coordinate, repository = %repo, "descriptor has no checksum; accepted unverified")
                }
            },
        }

        let target = self.chain.cache().commit(&path, &bytes).map_err(|e| PomError::Cache {
            path: path.clone(),
            message: e.to_string(),
        })?;
        // The cache keeps SHA-1 sidecars whatever the remote published.
        let sum = match expected {
            Some(sum) if sum.algo == ChecksumAlgo::Sha1 => sum,
            _ => Checksum {
                algo: ChecksumAlgo::Sha1,
                hex: sha1_hex(&bytes),
            },
        };
        if let Err(e) = self.chain.cache().commit_sidecar(&target, &sum) {
            tracing::warn!(path = %target.display(), "could not write checksum sidecar: {}", e);
        }
        Ok(bytes)
    }
}
