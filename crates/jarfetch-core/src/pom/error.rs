use std::fmt;

use crate::checksum::ChecksumError;
use crate::control::Cancelled;
use crate::coord::Coordinate;
use crate::repository::RepositoryError;

/// Malformed descriptor. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed POM {coordinate}: {message}")]
pub struct ParseError {
    pub coordinate: Coordinate,
    pub message: String,
}

impl ParseError {
    pub fn new(coordinate: &Coordinate, message: impl Into<String>) -> Self {
        Self {
            coordinate: coordinate.clone(),
            message: message.into(),
        }
    }
}

/// Which relation closed the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Parent,
    Import,
    Dependency,
}

/// A coordinate was reached twice while walking one chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct CycleError {
    pub kind: CycleKind,
    /// The walk in order; the last element repeats an earlier one.
    pub chain: Vec<Coordinate>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            CycleKind::Parent => "parent",
            CycleKind::Import => "BOM import",
            CycleKind::Dependency => "dependency",
        };
        write!(f, "{} cycle: ", what)?;
        for (i, c) in self.chain.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}:{}:{}", c.group_id(), c.artifact_id(), c.version())?;
        }
        Ok(())
    }
}

/// Why a descriptor could not be produced. Cloneable so memoized failures can
/// be handed to every requester.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PomError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Checksum(#[from] ChecksumError),
    #[error("cannot write {path} to the local cache: {message}")]
    Cache { path: String, message: String },
    #[error("descriptor worker stopped without a result")]
    WorkerFailed,
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl PomError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            PomError::Cancelled(_) => true,
            PomError::Repository(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
