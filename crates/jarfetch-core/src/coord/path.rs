//! Standard repository layout: `group/with/slashes/artifact/version/artifact-version[-classifier].ext`.

use std::path::{Path, PathBuf};

use super::Coordinate;

/// Extension of the checksum file stored next to every artifact.
pub const SHA1_SIDECAR_EXT: &str = "sha1";

impl Coordinate {
    /// File name inside the version directory.
    pub fn file_name(&self) -> String {
        match self.classifier() {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id(),
                self.version(),
                classifier,
                self.extension()
            ),
            None => format!("{}-{}.{}", self.artifact_id(), self.version(), self.extension()),
        }
    }

    /// Repository-relative path with `/` separators, used both for URLs and for the cache.
    pub fn repository_path(&self) -> String {
        format!("{}/{}", self.version_dir(), self.file_name())
    }

    /// `maven-metadata.xml` inside the version directory.
    pub fn metadata_path(&self) -> String {
        format!("{}/maven-metadata.xml", self.version_dir())
    }

    /// Remote path of a SNAPSHOT published under a timestamped file version
    /// such as `1.0-20240105.101500-3`. The directory keeps the `-SNAPSHOT`
    /// version.
    pub fn snapshot_path(&self, file_version: &str) -> String {
        format!(
            "{}/{}",
            self.version_dir(),
            self.clone().with_version(file_version).file_name()
        )
    }

    fn version_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id().replace('.', "/"),
            self.artifact_id(),
            self.version()
        )
    }

    /// Same layout under a local directory.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.group_id().split('.') {
            path.push(segment);
        }
        path.push(self.artifact_id());
        path.push(self.version());
        path.push(self.file_name());
        path
    }
}

/// `<relative>.sha1` for a repository-relative path.
pub fn sidecar_path(relative: &str) -> String {
    format!("{}.{}", relative, SHA1_SIDECAR_EXT)
}
