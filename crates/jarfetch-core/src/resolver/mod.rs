//! Dependency graph expansion with scope filtering, exclusions and
//! nearest-wins conflict resolution.

mod error;
mod graph;
mod root;

pub use error::ResolutionError;
pub use graph::{GraphResolver, Resolution, ResolveOptions};
pub use root::RootDependency;
