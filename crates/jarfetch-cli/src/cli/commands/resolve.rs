//! `jarfetch resolve` – resolve roots and download their closure.

use anyhow::{bail, Context, Result};
use jarfetch_core::config::JarfetchConfig;
use jarfetch_core::{
    Checksum, ChecksumAlgo, ChecksumPolicy, Coordinate, LocalCache, ResolutionSession, RootDependency, Scope,
    SessionEvent, SessionResult,
};
use std::sync::Arc;

use crate::cli::ResolveArgs;

pub async fn run_resolve(cfg: &JarfetchConfig, args: ResolveArgs) -> Result<()> {
    let session_cfg = {
        let mut cfg = cfg.clone();
        if !args.repositories.is_empty() {
            cfg.repositories = args.repositories.clone();
        }
        if let Some(dir) = &args.cache_dir {
            cfg.cache_dir = Some(dir.clone());
        }
        if let Some(jobs) = args.jobs {
            cfg.parallelism = jobs;
        }
        if !args.scope.is_empty() {
            cfg.scopes = args
                .scope
                .iter()
                .map(|s| s.parse::<Scope>().map_err(anyhow::Error::msg))
                .collect::<Result<_>>()?;
        }
        cfg.include_optional |= args.optional;
        cfg.discover_repositories |= args.discover_repositories;
        if args.allow_unverified {
            cfg.checksum_policy = ChecksumPolicy::Warn;
        }
        cfg
    };
    let roots = build_roots(&args)?;

    let cache_dir = session_cfg.cache_dir()?;
    let cache = Arc::new(
        LocalCache::open(&cache_dir).with_context(|| format!("open cache {}", cache_dir.display()))?,
    );
    tracing::info!(cache = %cache_dir.display(), roots = roots.len(), "resolve");

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel::<SessionEvent>(256);
    let session = ResolutionSession::new(Arc::clone(&cache), session_cfg.to_session_config())?.with_events(events_tx);

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupted; cancelling");
            cancel.cancel();
        }
    });

    let quiet = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if quiet {
                continue;
            }
            match event {
                SessionEvent::PomResolved { coordinate } => tracing::debug!("resolved {}", coordinate),
                SessionEvent::ArtifactReady {
                    coordinate,
                    from_cache,
                    ..
                } => {
                    let how = if from_cache { "cached" } else { "downloaded" };
                    eprintln!("  {:<10} {}", how, coordinate);
                }
                SessionEvent::ArtifactFailed { coordinate, error } => {
                    eprintln!("  {:<10} {}: {}", "failed", coordinate, error);
                }
            }
        }
    });

    // The session drops (closing the event channel) when the blocking task returns.
    let result = tokio::task::spawn_blocking(move || session.resolve(&roots)).await?;
    let _ = printer.await;

    match cache.close() {
        Ok(0) => {}
        Ok(n) => tracing::debug!("removed {} temp file(s)", n),
        Err(e) => tracing::warn!("cache cleanup: {}", e),
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&result))?);
    } else {
        print_report(&result);
    }

    if result.failed {
        bail!("resolution failed with {} error(s)", result.errors.len());
    }
    Ok(())
}

fn build_roots(args: &ResolveArgs) -> Result<Vec<RootDependency>> {
    let pins = args
        .pin
        .iter()
        .map(|p| parse_pin(p))
        .collect::<Result<Vec<_>>>()?;
    let mut roots = Vec::with_capacity(args.coordinates.len());
    for raw in &args.coordinates {
        let coordinate: Coordinate = raw.parse()?;
        let mut root = RootDependency::new(coordinate)
            .mandatory(args.mandatory)
            .transitive(!args.no_transitive);
        for (pinned, checksum) in &pins {
            if *pinned == root.coordinate {
                root = root.with_checksum(checksum.clone());
            }
        }
        roots.push(root);
    }
    for (pinned, _) in &pins {
        if !roots.iter().any(|r| &r.coordinate == pinned) {
            bail!("--pin {} does not name a requested coordinate", pinned);
        }
    }
    Ok(roots)
}

/// `COORDINATE=HEX` (the digest length picks the algorithm) or
/// `COORDINATE=ALGO:DIGEST` (hex or base64).
pub(crate) fn parse_pin(raw: &str) -> Result<(Coordinate, Checksum)> {
    let Some((coordinate, digest)) = raw.split_once('=') else {
        bail!("invalid pin '{}': expected COORDINATE=DIGEST", raw);
    };
    let coordinate: Coordinate = coordinate.parse()?;
    let digest = digest.trim();
    let checksum = match digest.split_once(':') {
        Some((algo, digest)) => {
            let algo: ChecksumAlgo = algo.parse().map_err(|e| anyhow::anyhow!("invalid pin '{}': {}", raw, e))?;
            Checksum::parse_digest(algo, digest)
                .with_context(|| format!("invalid pin '{}': not a hex or base64 {} digest", raw, algo))?
        }
        None => {
            let algo = match digest.len() {
                32 => ChecksumAlgo::Md5,
                40 => ChecksumAlgo::Sha1,
                64 => ChecksumAlgo::Sha256,
                _ => bail!(
                    "invalid pin '{}': digest must be 32 (MD5), 40 (SHA-1) or 64 (SHA-256) hex chars",
                    raw
                ),
            };
            Checksum::new(algo, digest).with_context(|| format!("invalid pin '{}': digest is not hex", raw))?
        }
    };
    Ok((coordinate, checksum))
}

fn print_report(result: &SessionResult) {
    for artifact in &result.artifacts {
        println!("{}", artifact.local_path.display());
    }
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &result.errors {
        eprintln!("error: {}", error);
    }
    eprintln!(
        "{} artifact(s), {} error(s), {} warning(s)",
        result.artifacts.len(),
        result.errors.len(),
        result.warnings.len()
    );
}

fn report_json(result: &SessionResult) -> serde_json::Value {
    serde_json::json!({
        "failed": result.failed,
        "artifacts": result.artifacts,
        "roots": result.roots.iter().map(|r| serde_json::json!({
            "root": r.root.to_string(),
            "paths": r.paths,
        })).collect::<Vec<_>>(),
        "errors": result.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        "warnings": result.warnings,
    })
}
