//! Value types shared by the parser, the graph resolver and the download manager.
//!
//! Everything here is created once per session and read-only afterwards.

mod artifact;
mod pom;
mod scope;

pub use artifact::{DownloadTask, ResolvedArtifact, ResolvedNode};
pub use pom::{Dependency, Pom};
pub(crate) use pom::find_managed;
pub use scope::{Scope, ScopeFilter};
