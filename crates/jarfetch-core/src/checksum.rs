//! Content checksums: `.sha1`/`.md5` sidecars published by repositories and
//! caller-pinned digests (hex or base64).
//!
//! Digests are always compared as lowercase hex.

use anyhow::{Context, Result};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgo {
    Sha1,
    Sha256,
    Md5,
}

/// Sidecars a remote repository is asked for, in order.
pub const REMOTE_SIDECAR_ALGOS: [ChecksumAlgo; 2] = [ChecksumAlgo::Sha1, ChecksumAlgo::Md5];

impl ChecksumAlgo {
    /// Length of the hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumAlgo::Sha1 => 40,
            ChecksumAlgo::Sha256 => 64,
            ChecksumAlgo::Md5 => 32,
        }
    }

    /// File extension of this algorithm's sidecar.
    pub fn extension(&self) -> &'static str {
        match self {
            ChecksumAlgo::Sha1 => "sha1",
            ChecksumAlgo::Sha256 => "sha256",
            ChecksumAlgo::Md5 => "md5",
        }
    }

    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            ChecksumAlgo::Sha1 => sha1_hex(data),
            ChecksumAlgo::Sha256 => hex::encode(Sha256::digest(data)),
            ChecksumAlgo::Md5 => hex::encode(Md5::digest(data)),
        }
    }
}

impl std::str::FromStr for ChecksumAlgo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(ChecksumAlgo::Sha1),
            "sha256" => Ok(ChecksumAlgo::Sha256),
            "md5" => Ok(ChecksumAlgo::Md5),
            other => Err(format!("unknown checksum algorithm '{}' (expected sha1, sha256 or md5)", other)),
        }
    }
}

impl fmt::Display for ChecksumAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumAlgo::Sha1 => f.write_str("SHA-1"),
            ChecksumAlgo::Sha256 => f.write_str("SHA-256"),
            ChecksumAlgo::Md5 => f.write_str("MD5"),
        }
    }
}

/// An expected digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub algo: ChecksumAlgo,
    /// Lowercase hex.
    pub hex: String,
}

impl Checksum {
    /// Normalises to lowercase; rejects strings that are not hex of the right length.
    pub fn new(algo: ChecksumAlgo, hex: &str) -> Option<Self> {
        let hex = hex.trim().to_ascii_lowercase();
        if hex.len() != algo.hex_len() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self { algo, hex })
    }

    pub fn sha1(hex: &str) -> Option<Self> {
        Self::new(ChecksumAlgo::Sha1, hex)
    }

    pub fn sha256(hex: &str) -> Option<Self> {
        Self::new(ChecksumAlgo::Sha256, hex)
    }

    pub fn md5(hex: &str) -> Option<Self> {
        Self::new(ChecksumAlgo::Md5, hex)
    }

    /// Base64-encoded raw digest, as some build tools publish pins.
    pub fn from_base64(algo: ChecksumAlgo, encoded: &str) -> Option<Self> {
        let raw = base64::decode(encoded.trim()).ok()?;
        if raw.len() * 2 != algo.hex_len() {
            return None;
        }
        Some(Self {
            algo,
            hex: hex::encode(raw),
        })
    }

    /// Hex first, then base64.
    pub fn parse_digest(algo: ChecksumAlgo, digest: &str) -> Option<Self> {
        Self::new(algo, digest).or_else(|| Self::from_base64(algo, digest))
    }

    /// Digest of `data` under this checksum's algorithm.
    pub fn actual(&self, data: &[u8]) -> String {
        self.algo.digest_hex(data)
    }

    pub fn verify(&self, data: &[u8]) -> bool {
        self.actual(data) == self.hex
    }

    pub fn verify_path(&self, path: &Path) -> Result<bool> {
        let actual = match self.algo {
            ChecksumAlgo::Sha1 => sha1_path(path)?,
            ChecksumAlgo::Sha256 => sha256_path(path)?,
            ChecksumAlgo::Md5 => digest_path::<Md5>(path)?,
        };
        Ok(actual == self.hex)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algo, self.hex)
    }
}

/// What to do when neither a pinned digest nor a remote sidecar is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Fail the artifact.
    #[default]
    Strict,
    /// Accept it and log a warning.
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumError {
    #[error("{path}: {} mismatch (expected {}, got {actual})", .expected.algo, .expected.hex)]
    Mismatch {
        path: String,
        expected: Checksum,
        actual: String,
    },
    #[error("{path}: no checksum available to verify against")]
    Missing { path: String },
}

impl ChecksumError {
    /// Check `data` against `expected`.
    pub fn verify(path: &str, expected: &Checksum, data: &[u8]) -> Result<(), ChecksumError> {
        let actual = expected.actual(data);
        if actual == expected.hex {
            Ok(())
        } else {
            Err(ChecksumError::Mismatch {
                path: path.to_string(),
                expected: expected.clone(),
                actual,
            })
        }
    }
}

impl crate::retry::Classify for ChecksumError {
    fn kind(&self) -> crate::retry::ErrorKind {
        match self {
            ChecksumError::Mismatch { .. } => crate::retry::ErrorKind::ChecksumMismatch,
            ChecksumError::Missing { .. } => crate::retry::ErrorKind::Other,
        }
    }
}

/// Parse a sidecar: first whitespace-delimited token, lowercase hex.
///
/// Accepts the coreutils `<digest>  <filename>` form as well.
pub fn parse_sidecar(algo: ChecksumAlgo, contents: &[u8]) -> Option<Checksum> {
    let text = std::str::from_utf8(contents).ok()?;
    let token = text.split_whitespace().next()?;
    Checksum::new(algo, token)
}

pub fn parse_sha1_sidecar(contents: &[u8]) -> Option<Checksum> {
    parse_sidecar(ChecksumAlgo::Sha1, contents)
}

pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Compute SHA-1 of a file and return the digest as lowercase hex.
pub fn sha1_path(path: &Path) -> Result<String> {
    digest_path::<Sha1>(path)
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    digest_path::<Sha256>(path)
}

/// Reads in chunks to keep memory use bounded; suitable for large files.
fn digest_path<D: Digest>(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = D::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
