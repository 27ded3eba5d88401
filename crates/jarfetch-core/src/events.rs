//! Progress events for embedding applications.

use serde::Serialize;
use std::path::PathBuf;

use crate::coord::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// An effective descriptor became available.
    PomResolved { coordinate: Coordinate },
    /// An artifact is verified at its final path.
    ArtifactReady {
        coordinate: Coordinate,
        path: PathBuf,
        from_cache: bool,
    },
    ArtifactFailed { coordinate: Coordinate, error: String },
}

/// Optional progress channel. Sends never block; events are dropped when the
/// receiver lags or is gone.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<tokio::sync::mpsc::Sender<SessionEvent>>,
}

impl EventSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<SessionEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }
}
