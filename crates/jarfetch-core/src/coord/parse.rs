//! `groupId:artifactId:version[:classifier][@extension]` string form.

use std::str::FromStr;

use super::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateParseError {
    #[error("invalid coordinate '{0}': expected groupId:artifactId:version[:classifier][@extension]")]
    Shape(String),
    #[error("invalid coordinate '{0}': empty {1}")]
    EmptyField(String, &'static str),
    #[error("invalid coordinate '{0}': {1} is not a safe path segment")]
    UnsafeField(String, &'static str),
}

impl Coordinate {
    /// Every field becomes a path segment under the cache root, so none may
    /// contain a separator or NUL, or be `.`/`..`. Group segments split on `.`
    /// must be non-empty.
    pub fn validate(&self) -> Result<(), CoordinateParseError> {
        let unsafe_field = |name: &'static str| CoordinateParseError::UnsafeField(self.to_string(), name);
        if self.group_id().split('.').any(|seg| !is_safe_segment(seg)) {
            return Err(unsafe_field("groupId"));
        }
        let fields = [
            (Some(self.artifact_id()), "artifactId"),
            (Some(self.version()), "version"),
            (self.classifier(), "classifier"),
            (Some(self.extension()), "extension"),
        ];
        for (value, name) in fields {
            if let Some(value) = value {
                if !is_safe_segment(value) {
                    return Err(unsafe_field(name));
                }
            }
        }
        Ok(())
    }
}

fn is_safe_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\', '\0'])
}

impl FromStr for Coordinate {
    type Err = CoordinateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (body, extension) = match raw.rsplit_once('@') {
            Some((body, ext)) => (body, Some(ext)),
            None => (raw, None),
        };

        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(CoordinateParseError::Shape(raw.to_string()));
        }
        for (part, name) in parts.iter().zip(["groupId", "artifactId", "version", "classifier"]) {
            if part.trim().is_empty() {
                return Err(CoordinateParseError::EmptyField(raw.to_string(), name));
            }
        }
        if let Some(ext) = extension {
            if ext.trim().is_empty() {
                return Err(CoordinateParseError::EmptyField(raw.to_string(), "extension"));
            }
        }

        let mut coordinate = Coordinate::new(parts[0].trim(), parts[1].trim(), parts[2].trim());
        if let Some(classifier) = parts.get(3) {
            coordinate = coordinate.with_classifier(classifier.trim());
        }
        if let Some(ext) = extension {
            coordinate = coordinate.with_extension(ext.trim());
        }
        coordinate.validate()?;
        Ok(coordinate)
    }
}
