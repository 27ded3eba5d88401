//! CLI for the jarfetch artifact resolver.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use jarfetch_core::config::{self, JarfetchConfig};
use std::path::{Path, PathBuf};

use commands::{run_checksum, run_path, run_resolve};

/// Top-level CLI for jarfetch.
#[derive(Debug, Parser)]
#[command(name = "jarfetch")]
#[command(about = "jarfetch: resolve and download Maven artifacts with their dependencies", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of `~/.config/jarfetch/config.toml`.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve coordinates and download their runtime closure into the local cache.
    Resolve(ResolveArgs),

    /// Compute the SHA-1 of a file, as published in repository `.sha1` sidecars.
    Checksum {
        /// Path to the file.
        path: String,
        /// Print SHA-256 instead.
        #[arg(long)]
        sha256: bool,
    },

    /// Print where a coordinate lives in the local cache.
    Path {
        /// `groupId:artifactId:version[:classifier][@extension]`.
        coordinate: String,
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// One or more `groupId:artifactId:version[:classifier][@extension]`.
    #[arg(required = true, value_name = "COORDINATE")]
    pub coordinates: Vec<String>,

    /// Remote repository base URL; repeat for several. Replaces the configured list.
    #[arg(long = "repo", value_name = "URL")]
    pub repositories: Vec<String>,

    /// Local repository root.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Concurrent downloads.
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Scopes to include, comma separated (default: compile,runtime).
    #[arg(long, value_delimiter = ',', value_name = "SCOPE")]
    pub scope: Vec<String>,

    /// Include optional dependencies.
    #[arg(long)]
    pub optional: bool,

    /// Fail when any root cannot be resolved or downloaded.
    #[arg(long)]
    pub mandatory: bool,

    /// Download the roots only, not their dependencies.
    #[arg(long)]
    pub no_transitive: bool,

    /// Pin a digest for a root: `COORDINATE=HEX` (32 hex chars = MD5, 40 = SHA-1, 64 = SHA-256)
    /// or `COORDINATE=ALGO:DIGEST` with a hex or base64 digest.
    #[arg(long, value_name = "COORDINATE=DIGEST")]
    pub pin: Vec<String>,

    /// Accept artifacts that have no checksum to verify against.
    #[arg(long)]
    pub allow_unverified: bool,

    /// Follow `<repositories>` declared in fetched POMs.
    #[arg(long)]
    pub discover_repositories: bool,

    /// Print the result as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Resolve(args) => {
                let cfg = load_config(cli.config.as_deref())?;
                run_resolve(&cfg, args).await?;
            }
            CliCommand::Checksum { path, sha256 } => run_checksum(Path::new(&path), sha256).await?,
            CliCommand::Path {
                coordinate,
                cache_dir,
            } => {
                let cache_dir = match cache_dir {
                    Some(dir) => dir,
                    None => load_config(cli.config.as_deref())?.cache_dir()?,
                };
                run_path(&coordinate, &cache_dir).await?;
            }
        }

        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<JarfetchConfig> {
    let cfg = match path {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
