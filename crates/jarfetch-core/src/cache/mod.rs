//! Local repository cache.
//!
//! Files live under `<root>/<group as dirs>/<artifact>/<version>/<file>`, with
//! `.sha1` sidecars next to them. Every write goes to a temp file in the target
//! directory and is renamed into place after fsync, so a reader sees either the
//! previous complete file or the new complete file.

mod writer;

pub use writer::{commit_atomic, TEMP_SUFFIX};

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::checksum::Checksum;
use crate::coord::{sidecar_path, Coordinate};

pub struct LocalCache {
    root: PathBuf,
    closed: AtomicBool,
    /// Directories this process wrote into; swept for orphaned temps on close.
    touched: Mutex<BTreeSet<PathBuf>>,
}

impl LocalCache {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            closed: AtomicBool::new(false),
            touched: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a `/`-separated repository path.
    pub fn path_for(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |p, seg| p.join(seg))
    }

    pub fn artifact_path(&self, coordinate: &Coordinate) -> PathBuf {
        coordinate.local_path(&self.root)
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.path_for(relative).is_file()
    }

    /// Contents of a cached file, or `None` when absent.
    pub fn read(&self, relative: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(relative)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Atomically store `bytes` at `relative`.
    pub fn commit(&self, relative: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(relative);
        self.commit_path(&path, bytes)?;
        Ok(path)
    }

    /// Atomically store `bytes` at an absolute path inside the cache.
    pub fn commit_path(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::other("local cache is closed"));
        }
        if let Some(parent) = path.parent() {
            if let Ok(mut touched) = self.touched.lock() {
                touched.insert(parent.to_path_buf());
            }
        }
        commit_atomic(path, bytes)
    }

    /// Write the `.sha1` sidecar next to `path`.
    pub fn commit_sidecar(&self, path: &Path, checksum: &Checksum) -> io::Result<()> {
        self.commit_path(&sidecar_file(path), checksum.hex.as_bytes())
    }

    /// Cached `.sha1` sidecar for `relative`, if present and well formed.
    pub fn read_sidecar(&self, relative: &str) -> io::Result<Option<Checksum>> {
        Ok(self
            .read(&sidecar_path(relative))?
            .and_then(|b| crate::checksum::parse_sha1_sidecar(&b)))
    }

    /// Refuse further writes and remove temp files this process left behind.
    /// Returns the number of orphaned temps removed.
    pub fn close(&self) -> io::Result<usize> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(0);
        }
        let dirs = match self.touched.lock() {
            Ok(mut t) => std::mem::take(&mut *t),
            Err(_) => BTreeSet::new(),
        };
        let marker = writer::process_marker();
        let mut removed = 0;
        for dir in dirs {
            let entries = match std::fs::read_dir(&dir) {
                Ok(e) => e,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            for entry in entries {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.ends_with(TEMP_SUFFIX) && name.contains(&marker) {
                    std::fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
        }
        tracing::debug!(root = %self.root.display(), removed, "local cache closed");
        Ok(removed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// `<path>.sha1`
pub fn sidecar_file(path: &Path) -> PathBuf {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".");
    sidecar.push(crate::coord::SHA1_SIDECAR_EXT);
    PathBuf::from(sidecar)
}

/// Sidecar next to an arbitrary file, if present and well formed.
pub fn read_sidecar_file(path: &Path) -> io::Result<Option<Checksum>> {
    match std::fs::read(sidecar_file(path)) {
        Ok(bytes) => Ok(crate::checksum::parse_sha1_sidecar(&bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
