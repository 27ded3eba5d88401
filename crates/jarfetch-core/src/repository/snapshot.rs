//! `maven-metadata.xml` of a `-SNAPSHOT` version directory.
//!
//! Repositories publish snapshot builds under timestamped file names; the
//! metadata maps the `-SNAPSHOT` version to the latest of them.

use roxmltree::{Document, Node};

use crate::coord::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotFile {
    classifier: Option<String>,
    extension: String,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SnapshotMetadata {
    timestamp: Option<String>,
    build_number: Option<String>,
    /// Files are stored under the literal `-SNAPSHOT` name.
    local_copy: bool,
    files: Vec<SnapshotFile>,
}

impl SnapshotMetadata {
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let source = std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {}", e))?;
        let document = Document::parse(source.trim_start_matches('\u{feff}')).map_err(|e| e.to_string())?;
        let root = document.root_element();
        if root.tag_name().name() != "metadata" {
            return Err(format!("root element is <{}>, expected <metadata>", root.tag_name().name()));
        }
        let Some(versioning) = child(&root, "versioning") else {
            return Ok(Self::default());
        };
        let snapshot = child(&versioning, "snapshot");
        let files = child(&versioning, "snapshotVersions")
            .map(|list| {
                list.children()
                    .filter(|c| c.is_element() && c.tag_name().name() == "snapshotVersion")
                    .filter_map(|v| {
                        Some(SnapshotFile {
                            classifier: text(&v, "classifier"),
                            extension: text(&v, "extension")?,
                            value: text(&v, "value")?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            timestamp: snapshot.as_ref().and_then(|s| text(s, "timestamp")),
            build_number: snapshot.as_ref().and_then(|s| text(s, "buildNumber")),
            local_copy: snapshot
                .as_ref()
                .and_then(|s| text(s, "localCopy"))
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            files,
        })
    }

    /// Version string in the published file name of `coordinate`, or `None`
    /// when the repository stores it under the literal `-SNAPSHOT` name.
    pub fn file_version(&self, coordinate: &Coordinate) -> Option<String> {
        if self.local_copy {
            return None;
        }
        let listed = self
            .files
            .iter()
            .find(|f| f.extension == coordinate.extension() && f.classifier.as_deref() == coordinate.classifier());
        if let Some(file) = listed {
            return Some(file.value.clone());
        }
        let base = coordinate.version().strip_suffix("-SNAPSHOT")?;
        match (&self.timestamp, &self.build_number) {
            (Some(ts), Some(build)) => Some(format!("{}-{}-{}", base, ts, build)),
            _ => None,
        }
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
