use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::error::ResolutionError;
use super::root::RootDependency;
use crate::control::{CancelToken, Cancelled};
use crate::coord::{ArtifactKey, Coordinate, Exclusion};
use crate::download::run_bounded;
use crate::model::{ResolvedNode, Scope, ScopeFilter};
use crate::pom::{PomError, PomFetcher};

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub scopes: ScopeFilter,
    pub include_optional: bool,
    /// Concurrent descriptor fetches per breadth-first level.
    pub parallelism: usize,
    /// Keys whose failure fails the whole resolution, in addition to
    /// mandatory roots.
    pub mandatory: BTreeSet<ArtifactKey>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            scopes: ScopeFilter::runtime(),
            include_optional: false,
            parallelism: 4,
            mandatory: BTreeSet::new(),
        }
    }
}

/// Frozen outcome of one expansion.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Retained nodes in breadth-first visitation order; one per artifact key.
    pub nodes: Vec<ResolvedNode>,
    pub errors: Vec<ResolutionError>,
    pub warnings: Vec<String>,
    /// A mandatory node failed.
    pub failed: bool,
    pub cancelled: bool,
    /// Admitted dependency edges per processed node, by key.
    edges: HashMap<ArtifactKey, Vec<ArtifactKey>>,
}

impl Resolution {
    pub fn node(&self, key: &ArtifactKey) -> Option<&ResolvedNode> {
        self.nodes.iter().find(|n| &n.coordinate.key() == key)
    }

    /// Retained version for `groupId:artifactId` with the default extension.
    pub fn version_of(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.node(&Coordinate::new(group_id, artifact_id, "").key())
            .map(|n| n.coordinate.version())
    }

    /// Retained nodes reachable from `root` (itself included), breadth first.
    /// Edges to a key follow whichever version of it was retained.
    pub fn closure(&self, root: &Coordinate) -> Vec<&ResolvedNode> {
        let index: HashMap<ArtifactKey, &ResolvedNode> =
            self.nodes.iter().map(|n| (n.coordinate.key(), n)).collect();
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root.key()]);
        while let Some(key) = queue.pop_front() {
            if !seen.insert(key.clone()) {
                continue;
            }
            let Some(node) = index.get(&key) else { continue };
            out.push(*node);
            if let Some(children) = self.edges.get(&key) {
                queue.extend(children.iter().cloned());
            }
        }
        out
    }
}

struct Candidate {
    coordinate: Coordinate,
    depth: usize,
    scope: Scope,
    /// Exclusions accumulated along the path from the root.
    exclusions: Arc<BTreeSet<Exclusion>>,
    transitive: bool,
    mandatory: bool,
    ancestors: Arc<Vec<ArtifactKey>>,
}

/// Breadth-first expansion of a root set.
///
/// The first candidate to reach a key claims it: smaller depth wins, and at
/// equal depth the earlier one in visitation order wins. Claims are made while
/// processing a level strictly in order, so the outcome does not depend on the
/// order in which concurrent descriptor fetches complete. A candidate that is
/// excluded or filtered out never claims its key.
pub struct GraphResolver<'a> {
    fetcher: &'a PomFetcher,
}

impl<'a> GraphResolver<'a> {
    pub fn new(fetcher: &'a PomFetcher) -> Self {
        Self { fetcher }
    }

    pub fn resolve(&self, roots: &[RootDependency], options: &ResolveOptions, cancel: &CancelToken) -> Resolution {
        let mut out = Resolution::default();
        let mut claimed: HashMap<ArtifactKey, Coordinate> = HashMap::new();
        let mut level: Vec<Candidate> = Vec::new();

        for root in roots {
            let key = root.coordinate.key();
            if let Some(existing) = claimed.get(&key) {
                if existing != &root.coordinate {
                    out.warnings.push(format!(
                        "root {} conflicts with root {}; keeping the first",
                        root.coordinate, existing
                    ));
                }
                continue;
            }
            claimed.insert(key.clone(), root.coordinate.clone());
            level.push(Candidate {
                coordinate: root.coordinate.clone(),
                depth: 0,
                scope: root.scope,
                exclusions: Arc::new(BTreeSet::new()),
                transitive: root.transitive,
                mandatory: root.mandatory || options.mandatory.contains(&key),
                ancestors: Arc::new(vec![key]),
            });
        }

        while !level.is_empty() {
            if cancel.is_cancelled() {
                out.cancelled = true;
                break;
            }
            let coordinates: Vec<Coordinate> = level.iter().map(|c| c.coordinate.clone()).collect();
            let poms = run_bounded(coordinates, options.parallelism, cancel, |c| {
                self.fetcher.fetch_pom(&c, cancel)
            });

            let mut next = Vec::new();
            for (candidate, pom) in level.into_iter().zip(poms) {
                let pom = pom.unwrap_or_else(|| {
                    if cancel.is_cancelled() {
                        Err(Cancelled.into())
                    } else {
                        Err(PomError::WorkerFailed)
                    }
                });
                let pom = match pom {
                    Ok(pom) => pom,
                    Err(e) if e.is_cancelled() => {
                        out.cancelled = true;
                        continue;
                    }
                    Err(cause) => {
                        tracing::warn!(
                            coordinate = %candidate.coordinate,
                            depth = candidate.depth,
                            mandatory = candidate.mandatory,
                            "dropping node: {}",
                            cause
                        );
                        out.failed |= candidate.mandatory;
                        out.errors.push(ResolutionError {
                            coordinate: candidate.coordinate,
                            depth: candidate.depth,
                            mandatory: candidate.mandatory,
                            cause,
                        });
                        continue;
                    }
                };

                let key = candidate.coordinate.key();
                let mut admitted = Vec::new();
                if candidate.transitive {
                    for dep in &pom.dependencies {
                        if dep.optional && !options.include_optional {
                            continue;
                        }
                        let Some(scope) = candidate.scope.propagate(dep.scope) else {
                            continue;
                        };
                        if !options.scopes.contains(scope) {
                            continue;
                        }
                        if candidate.exclusions.iter().any(|ex| ex.matches(&dep.coordinate)) {
                            tracing::debug!(parent = %candidate.coordinate, excluded = %dep.coordinate, "excluded");
                            continue;
                        }
                        let dep_key = dep.coordinate.key();
                        admitted.push(dep_key.clone());
                        if let Some(winner) = claimed.get(&dep_key) {
                            if candidate.ancestors.contains(&dep_key) {
                                tracing::debug!(parent = %candidate.coordinate, dependency = %dep.coordinate, "dependency cycle skipped");
                            } else if winner != &dep.coordinate {
                                tracing::debug!(
                                    dependency = %dep.coordinate,
                                    retained = %winner,
                                    "version conflict: keeping nearer/first declared"
                                );
                            }
                            continue;
                        }
                        claimed.insert(dep_key.clone(), dep.coordinate.clone());

                        let exclusions = if dep.exclusions.is_empty() {
                            Arc::clone(&candidate.exclusions)
                        } else {
                            let mut merged = (*candidate.exclusions).clone();
                            merged.extend(dep.exclusions.iter().cloned());
                            Arc::new(merged)
                        };
                        let mut ancestors = (*candidate.ancestors).clone();
                        ancestors.push(dep_key.clone());
                        next.push(Candidate {
                            coordinate: dep.coordinate.clone(),
                            depth: candidate.depth + 1,
                            scope,
                            exclusions,
                            transitive: true,
                            mandatory: options.mandatory.contains(&dep_key),
                            ancestors: Arc::new(ancestors),
                        });
                    }
                }
                out.edges.insert(key, admitted);
                out.warnings.extend(
                    pom.warnings
                        .iter()
                        .map(|w| format!("{}: {}", pom.coordinate, w)),
                );
                out.nodes.push(ResolvedNode {
                    coordinate: candidate.coordinate,
                    depth: candidate.depth,
                    scope: candidate.scope,
                    pom,
                });
            }

            if out.failed || out.cancelled {
                break;
            }
            level = next;
        }

        out.warnings.dedup();
        tracing::info!(
            retained = out.nodes.len(),
            errors = out.errors.len(),
            failed = out.failed,
            "dependency graph resolved"
        );
        out
    }
}
