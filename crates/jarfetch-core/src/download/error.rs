use crate::checksum::ChecksumError;
use crate::control::Cancelled;
use crate::coord::{Coordinate, CoordinateParseError};
use crate::repository::RepositoryError;
use crate::retry::{Classify, ErrorKind};

/// Cause of one failed download attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadFailure {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Checksum(#[from] ChecksumError),
    #[error("local cache I/O: {0}")]
    Io(String),
    #[error(transparent)]
    Coordinate(#[from] CoordinateParseError),
    #[error("download worker stopped without a result")]
    WorkerFailed,
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Classify for DownloadFailure {
    fn kind(&self) -> ErrorKind {
        match self {
            DownloadFailure::Repository(e) => e.kind(),
            DownloadFailure::Checksum(e) => e.kind(),
            DownloadFailure::Io(_)
            | DownloadFailure::Coordinate(_)
            | DownloadFailure::WorkerFailed
            | DownloadFailure::Cancelled(_) => ErrorKind::Other,
        }
    }
}

/// An artifact that exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{coordinate}: failed after {attempts} attempt(s): {cause}")]
pub struct DownloadError {
    pub coordinate: Coordinate,
    pub attempts: u32,
    #[source]
    pub cause: DownloadFailure,
}

impl DownloadError {
    pub fn is_cancelled(&self) -> bool {
        match &self.cause {
            DownloadFailure::Cancelled(_) => true,
            DownloadFailure::Repository(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
