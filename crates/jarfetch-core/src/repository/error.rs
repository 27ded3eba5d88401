use std::fmt;

use crate::retry::{classify_http_status, Classify, ErrorKind};

/// A single GET against a single repository failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// 404/410, or a missing `file://` path.
    #[error("not found")]
    NotFound,
    #[error("HTTP {0}")]
    Status(u32),
    #[error("{message}")]
    Network { kind: ErrorKind, message: String },
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("transfer cancelled")]
    Cancelled,
}

impl Classify for TransportError {
    fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Status(code) => classify_http_status(*code),
            TransportError::Network { kind, .. } => *kind,
            TransportError::NotFound | TransportError::InvalidUrl(_) | TransportError::Cancelled => {
                ErrorKind::Other
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFailure {
    /// Repository URL with credentials removed.
    pub repository: String,
    pub error: TransportError,
}

/// No repository in the chain could serve a path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct RepositoryError {
    pub path: String,
    pub failures: Vec<RepositoryFailure>,
}

impl RepositoryError {
    pub fn new(path: impl Into<String>, failures: Vec<RepositoryFailure>) -> Self {
        Self {
            path: path.into(),
            failures,
        }
    }

    /// Every repository answered "not found" (or none were configured).
    pub fn is_not_found(&self) -> bool {
        self.failures
            .iter()
            .all(|f| f.error == TransportError::NotFound)
    }

    pub fn is_cancelled(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.error == TransportError::Cancelled)
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "{}: no remote repositories configured", self.path);
        }
        write!(f, "{} could not be fetched from any repository", self.path)?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{} ({})", sep, failure.repository, failure.error)?;
        }
        Ok(())
    }
}

impl Classify for RepositoryError {
    /// Retryable when at least one repository failed transiently.
    fn kind(&self) -> ErrorKind {
        self.failures
            .iter()
            .map(|f| f.error.kind())
            .find(ErrorKind::is_retryable)
            .unwrap_or(ErrorKind::Other)
    }
}

/// A configured or discovered repository URL was unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryUrlError {
    #[error("invalid repository URL {0:?}: {1}")]
    Invalid(String, String),
    #[error("unsupported repository URL scheme {0:?} (expected http, https or file)")]
    UnsupportedScheme(String),
}
