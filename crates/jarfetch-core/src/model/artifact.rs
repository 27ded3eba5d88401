//! Resolution output and download units.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::{Pom, Scope};
use crate::checksum::Checksum;
use crate::coord::Coordinate;

/// One retained artifact after conflict resolution.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    pub coordinate: Coordinate,
    /// Path length from the nearest root (roots are depth 0).
    pub depth: usize,
    pub scope: Scope,
    pub pom: Arc<Pom>,
}

/// A file that is fully written and checksum-verified at `local_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub local_path: PathBuf,
    /// Lowercase hex SHA-1 of the file contents.
    pub sha1: String,
    /// True when the bytes were already in the cache and verified in place.
    pub from_cache: bool,
}

/// Unit of work for the download manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownloadTask {
    pub coordinate: Coordinate,
    pub target_path: PathBuf,
    /// Caller-pinned checksum; when absent the repository `.sha1` sidecar is used.
    pub expected_checksum: Option<Checksum>,
}
