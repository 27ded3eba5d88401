use std::fmt;

use crate::coord::Coordinate;
use crate::pom::PomError;

/// A node's descriptor could not be produced; its subtree was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ResolutionError {
    pub coordinate: Coordinate,
    pub depth: usize,
    /// Set when the caller required this artifact; the resolution as a whole failed.
    pub mandatory: bool,
    #[source]
    pub cause: PomError,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot resolve {} at depth {}", self.coordinate, self.depth)?;
        if self.mandatory {
            f.write_str(" (mandatory)")?;
        }
        write!(f, ": {}", self.cause)
    }
}
