//! Checksum command: compute SHA-1 (or SHA-256) of a file.

use anyhow::Result;
use jarfetch_core::checksum;
use std::path::Path;

/// Compute and print the digest of the given file in `sha1sum` format.
pub async fn run_checksum(path: &Path, sha256: bool) -> Result<()> {
    let digest = if sha256 {
        checksum::sha256_path(path)?
    } else {
        checksum::sha1_path(path)?
    };
    println!("{}  {}", digest, path.display());
    Ok(())
}
