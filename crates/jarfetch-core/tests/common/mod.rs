//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod repo_server;

use std::time::Duration;

use jarfetch_core::retry::RetryPolicy;
use jarfetch_core::SessionConfig;
use repo_server::RepoServer;

/// `g/a/v/a-v.<ext>` with dots in the group turned into directories.
pub fn repo_path(group: &str, artifact: &str, version: &str, ext: &str) -> String {
    format!(
        "{}/{}/{}/{}-{}.{}",
        group.replace('.', "/"),
        artifact,
        version,
        artifact,
        version,
        ext
    )
}

/// A POM with plain compile dependencies.
pub fn pom(group: &str, artifact: &str, version: &str, deps: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        "<project><modelVersion>4.0.0</modelVersion><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>",
        group, artifact, version
    );
    if !deps.is_empty() {
        xml.push_str("<dependencies>");
        for (g, a, v) in deps {
            xml.push_str(&format!(
                "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>",
                g, a, v
            ));
        }
        xml.push_str("</dependencies>");
    }
    xml.push_str("</project>");
    xml
}

pub fn jar_body(group: &str, artifact: &str, version: &str) -> Vec<u8> {
    format!("jar bytes of {}:{}:{}", group, artifact, version).into_bytes()
}

/// Publish POM and jar, each with a `.sha1` sidecar.
pub fn publish(server: &RepoServer, group: &str, artifact: &str, version: &str, deps: &[(&str, &str, &str)]) {
    server.put_with_sha1(&repo_path(group, artifact, version, "pom"), pom(group, artifact, version, deps));
    server.put_with_sha1(&repo_path(group, artifact, version, "jar"), jar_body(group, artifact, version));
}

/// Session config over `repositories` with fast retries.
pub fn config(repositories: &[&str]) -> SessionConfig {
    SessionConfig {
        repositories: repositories.iter().map(|r| r.to_string()).collect(),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        },
        ..SessionConfig::default()
    }
}
