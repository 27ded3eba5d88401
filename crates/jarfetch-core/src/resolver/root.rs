use crate::checksum::Checksum;
use crate::coord::Coordinate;
use crate::model::Scope;

/// One top-level request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDependency {
    pub coordinate: Coordinate,
    pub scope: Scope,
    /// Failure to resolve or download this artifact fails the whole session.
    pub mandatory: bool,
    /// When false the root is retained but its dependencies are not followed.
    pub transitive: bool,
    /// Caller-pinned digests; they replace the repository `.sha1` lookup.
    pub checksums: Vec<Checksum>,
}

impl RootDependency {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            scope: Scope::Compile,
            mandatory: false,
            transitive: true,
            checksums: Vec::new(),
        }
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn transitive(mut self, transitive: bool) -> Self {
        self.transitive = transitive;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksums.push(checksum);
        self
    }

    /// Strongest pinned digest, if any.
    pub fn pinned_checksum(&self) -> Option<&Checksum> {
        self.checksums
            .iter()
            .max_by_key(|c| c.algo.hex_len())
    }
}

impl From<Coordinate> for RootDependency {
    fn from(coordinate: Coordinate) -> Self {
        Self::new(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_sha256_when_both_pinned() {
        let root = RootDependency::new(Coordinate::new("g", "a", "1"))
            .with_checksum(Checksum::sha1("f572d396fae9206628714fb2ce00f72e94f2258f").unwrap())
            .with_checksum(
                Checksum::sha256("5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03").unwrap(),
            );
        assert_eq!(
            root.pinned_checksum().unwrap().algo,
            crate::checksum::ChecksumAlgo::Sha256
        );
        assert!(root.transitive);
        assert!(!root.mandatory);
    }
}
