use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum::ChecksumPolicy;
use crate::model::{Scope, ScopeFilter};
use crate::repository::{TransportOptions, MAVEN_CENTRAL};
use crate::retry::RetryPolicy;
use crate::session::SessionConfig;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per artifact (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt; later attempts wait proportionally longer.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Global configuration loaded from `~/.config/jarfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JarfetchConfig {
    /// Remote repositories in lookup order.
    pub repositories: Vec<String>,
    /// Local repository root; defaults to `$XDG_CACHE_HOME/jarfetch/repository`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Concurrent artifact downloads.
    pub parallelism: usize,
    /// Concurrent POM fetches per graph level.
    pub pom_parallelism: usize,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub include_optional: bool,
    #[serde(default)]
    pub checksum_policy: ChecksumPolicy,
    /// Add `<repositories>` declared by fetched POMs to the lookup chain.
    #[serde(default)]
    pub discover_repositories: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_scopes() -> Vec<Scope> {
    ScopeFilter::runtime().iter().collect()
}

fn default_connect_timeout() -> u64 {
    TransportOptions::default().connect_timeout.as_secs()
}

fn default_request_timeout() -> u64 {
    TransportOptions::default().request_timeout.as_secs()
}

impl Default for JarfetchConfig {
    fn default() -> Self {
        Self {
            repositories: vec![MAVEN_CENTRAL.to_string()],
            cache_dir: None,
            parallelism: 4,
            pom_parallelism: 4,
            scopes: default_scopes(),
            include_optional: false,
            checksum_policy: ChecksumPolicy::Strict,
            discover_repositories: false,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            retry: None,
        }
    }
}

impl JarfetchConfig {
    /// Configured cache root, or the XDG default.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir(),
        }
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            repositories: self.repositories.clone(),
            scopes: self.scopes.iter().copied().collect(),
            include_optional: self.include_optional,
            parallelism: self.parallelism.max(1),
            pom_parallelism: self.pom_parallelism.max(1),
            checksum_policy: self.checksum_policy,
            retry: self.retry.clone().unwrap_or_default().to_policy(),
            discover_repositories: self.discover_repositories,
            mandatory: BTreeSet::new(),
            transport: TransportOptions {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                ..TransportOptions::default()
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jarfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

pub fn default_cache_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jarfetch")?;
    Ok(xdg_dirs.get_cache_home().join("jarfetch").join("repository"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<JarfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = JarfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<JarfetchConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: JarfetchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = JarfetchConfig::default();
        assert_eq!(cfg.repositories, vec![MAVEN_CENTRAL.to_string()]);
        assert_eq!(cfg.parallelism, 4);
        assert_eq!(cfg.checksum_policy, ChecksumPolicy::Strict);
        assert_eq!(cfg.scopes, vec![Scope::Compile, Scope::Runtime]);
        assert_eq!(cfg.to_session_config(), SessionConfig::default());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = JarfetchConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: JarfetchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.repositories, cfg.repositories);
        assert_eq!(parsed.parallelism, cfg.parallelism);
        assert_eq!(parsed.scopes, cfg.scopes);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            repositories = ["https://repo.example/maven2", "https://mirror.example/"]
            cache_dir = "/tmp/jf-cache"
            parallelism = 8
            pom_parallelism = 2
            scopes = ["compile", "runtime", "test"]
            checksum_policy = "warn"
            request_timeout_secs = 10
        "#;
        let cfg: JarfetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.repositories.len(), 2);
        assert_eq!(cfg.cache_dir().unwrap(), PathBuf::from("/tmp/jf-cache"));
        assert!(cfg.retry.is_none());
        let session = cfg.to_session_config();
        assert_eq!(session.parallelism, 8);
        assert!(session.scopes.contains(Scope::Test));
        assert_eq!(session.checksum_policy, ChecksumPolicy::Warn);
        assert_eq!(session.transport.request_timeout, Duration::from_secs(10));
        assert_eq!(session.retry, RetryPolicy::default());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            repositories = []
            parallelism = 1
            pom_parallelism = 1

            [retry]
            max_attempts = 0
            base_delay_ms = 100
            max_delay_ms = 400
        "#;
        let cfg: JarfetchConfig = toml::from_str(toml).unwrap();
        let policy = cfg.to_session_config().retry;
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_millis(400));
    }

    #[test]
    fn load_from_path_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "parallelism = \"many\"").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}
