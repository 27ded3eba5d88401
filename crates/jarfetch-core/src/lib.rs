//! jarfetch core: resolve Maven coordinates to a verified local artifact set.
//!
//! [`session::ResolutionSession`] is the entry point. It expands the dependency
//! graph from each root's POM, picks one version per artifact, and downloads
//! everything into a [`cache::LocalCache`] with checksum verification.

pub mod config;
pub mod logging;

pub mod cache;
pub mod checksum;
pub mod control;
pub mod coord;
pub mod download;
pub mod events;
mod memo;
pub mod model;
pub mod pom;
pub mod repository;
pub mod resolver;
pub mod retry;
pub mod session;

pub use cache::LocalCache;
pub use checksum::{Checksum, ChecksumAlgo, ChecksumPolicy};
pub use control::{CancelToken, Cancelled};
pub use coord::{ArtifactKey, Coordinate, Exclusion};
pub use events::SessionEvent;
pub use model::{ResolvedArtifact, Scope, ScopeFilter};
pub use resolver::RootDependency;
pub use session::{resolve, ResolutionSession, RootResult, SessionConfig, SessionFailure, SessionResult};
