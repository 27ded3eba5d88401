//! Dependency scopes and the transitive scope table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Test,
    Provided,
    System,
    /// Only meaningful inside `dependencyManagement` (BOM import).
    Import,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::Provided => "provided",
            Scope::System => "system",
            Scope::Import => "import",
        }
    }

    /// Whether an artifact in this scope belongs on a runtime classpath.
    pub fn on_runtime_classpath(&self) -> bool {
        match self {
            Scope::Compile | Scope::Runtime => true,
            Scope::Test | Scope::Provided | Scope::System | Scope::Import => false,
        }
    }

    /// Effective scope of `child` when reached through a node resolved as `self`.
    ///
    /// `None` means the edge is not transitive at all.
    pub fn propagate(&self, child: Scope) -> Option<Scope> {
        match child {
            Scope::Provided | Scope::Test | Scope::System | Scope::Import => None,
            Scope::Compile => match self {
                Scope::Compile => Some(Scope::Compile),
                Scope::Runtime => Some(Scope::Runtime),
                Scope::Provided => Some(Scope::Provided),
                Scope::Test => Some(Scope::Test),
                Scope::System | Scope::Import => None,
            },
            Scope::Runtime => match self {
                Scope::Compile | Scope::Runtime => Some(Scope::Runtime),
                Scope::Provided => Some(Scope::Provided),
                Scope::Test => Some(Scope::Test),
                Scope::System | Scope::Import => None,
            },
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compile" => Ok(Scope::Compile),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "provided" => Ok(Scope::Provided),
            "system" => Ok(Scope::System),
            "import" => Ok(Scope::Import),
            other => Err(format!("unknown scope '{}'", other)),
        }
    }
}

/// Set of scopes admitted into a resolution closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeFilter(BTreeSet<Scope>);

impl ScopeFilter {
    /// compile + runtime.
    pub fn runtime() -> Self {
        Self([Scope::Compile, Scope::Runtime].into_iter().collect())
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self::runtime()
    }
}

impl FromIterator<Scope> for ScopeFilter {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
