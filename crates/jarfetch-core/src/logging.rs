//! Diagnostics for resolution sessions.
//!
//! Per-node resolution decisions, retries and checksum fallbacks are logged at
//! `debug`, which is too chatty for a terminal, so `jarfetch` appends them to a
//! log file and keeps stdout for the resolved paths.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Engine and CLI at `debug`, dependencies (curl) at `info`. `RUST_LOG` overrides.
const DEFAULT_FILTER: &str = "info,jarfetch_core=debug,jarfetch=debug";

/// A download worker's handle on the log file, or stderr when the handle
/// cannot be duplicated.
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

/// `$XDG_STATE_HOME/jarfetch/jarfetch.log`.
pub fn log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jarfetch")?;
    Ok(xdg_dirs.get_state_home().join("jarfetch").join("jarfetch.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Append session logs to [`log_path`]. Errors when the state directory cannot
/// be created or the file opened; the CLI then calls [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let log_file_path = log_path()?;
    if let Some(log_dir) = log_file_path.parent() {
        fs::create_dir_all(log_dir)?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    struct FileMakeWriter(std::fs::File);

    impl<'a> MakeWriter<'a> for FileMakeWriter {
        type Writer = FileOrStderr;

        fn make_writer(&'a self) -> Self::Writer {
            self.0
                .try_clone()
                .map(FileOrStderr::File)
                .unwrap_or(FileOrStderr::Stderr)
        }
    }

    let writer: BoxMakeWriter = BoxMakeWriter::new(FileMakeWriter(file));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!("jarfetch logging initialized at {}", log_file_path.display());

    Ok(())
}

/// Session logs on stderr, for read-only homes and sandboxed CI runners.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_in_state_dir() {
        let path = log_path().unwrap();
        assert!(path.ends_with("jarfetch/jarfetch.log"), "{}", path.display());
    }

    #[test]
    fn default_filter_covers_engine_and_binary() {
        let filter: EnvFilter = DEFAULT_FILTER.parse().unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("jarfetch_core=debug"), "{}", rendered);
        assert!(rendered.contains("jarfetch=debug"), "{}", rendered);
    }
}
