//! `jarfetch path` – where a coordinate is stored in the local cache.

use anyhow::Result;
use jarfetch_core::Coordinate;
use std::path::Path;

pub async fn run_path(coordinate: &str, cache_dir: &Path) -> Result<()> {
    let coordinate: Coordinate = coordinate.parse()?;
    let path = coordinate.local_path(cache_dir);
    println!("{}", path.display());
    if !path.is_file() {
        eprintln!("(not cached)");
    }
    Ok(())
}
