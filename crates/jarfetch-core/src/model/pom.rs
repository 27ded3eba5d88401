//! Parsed and merged POM documents.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::Scope;
use crate::coord::{Coordinate, Exclusion};

/// One `<dependency>` entry after property substitution and management merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub coordinate: Coordinate,
    pub scope: Scope,
    pub optional: bool,
    pub exclusions: BTreeSet<Exclusion>,
}

impl Dependency {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            scope: Scope::Compile,
            optional: false,
            exclusions: BTreeSet::new(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn excludes(&self, coordinate: &Coordinate) -> bool {
        self.exclusions.iter().any(|ex| ex.matches(coordinate))
    }
}

/// Effective POM: the document merged with its whole parent chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pom {
    /// `groupId:artifactId:version@pom` of the project.
    pub coordinate: Coordinate,
    pub parent: Option<Coordinate>,
    pub packaging: String,
    /// Inherited properties, child entries override parents.
    pub properties: BTreeMap<String, String>,
    /// Declaration order is preserved; it drives first-declared-wins.
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    /// `<repositories>` URLs, for opt-in repository discovery.
    pub repositories: Vec<String>,
    /// Tolerated problems (unresolved placeholders, skipped entries).
    pub warnings: Vec<String>,
}

impl Pom {
    /// Managed entry for `coordinate`; the version is ignored.
    pub fn managed(&self, coordinate: &Coordinate) -> Option<&Dependency> {
        find_managed(&self.dependency_management, coordinate)
    }
}

/// Exact artifact-key match first, then any entry for the same `groupId:artifactId`.
pub(crate) fn find_managed<'a>(managed: &'a [Dependency], probe: &Coordinate) -> Option<&'a Dependency> {
    let key = probe.key();
    managed.iter().find(|m| m.coordinate.key() == key).or_else(|| {
        managed.iter().find(|m| {
            m.coordinate.group_id() == probe.group_id() && m.coordinate.artifact_id() == probe.artifact_id()
        })
    })
}
