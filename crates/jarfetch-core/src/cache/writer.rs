//! Temp-then-rename file commit.

use std::io::{self, Write};
use std::path::Path;

/// Suffix of in-progress temp files.
pub const TEMP_SUFFIX: &str = ".part";

/// Fragment embedded in temp names so `close` only sweeps this process's files.
pub(crate) fn process_marker() -> String {
    format!(".jf{}.", std::process::id())
}

/// Write `bytes` to a temp file next to `final_path`, fsync, then rename over
/// `final_path`. Concurrent committers of the same path each rename a complete
/// file; the last rename wins.
pub fn commit_atomic(final_path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = final_path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    std::fs::create_dir_all(parent)?;
    let file_name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!(".{}{}", file_name, process_marker());
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(final_path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("out.jar");
        commit_atomic(&p, b"first").unwrap();
        commit_atomic(&p, b"second").unwrap();
        assert_eq!(std::fs::read(&p).unwrap(), b"second");
        let leftovers: Vec<_> = std::fs::read_dir(p.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn concurrent_commits_never_expose_partial_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("shared.bin");
        let a = vec![b'a'; 256 * 1024];
        let b = vec![b'b'; 256 * 1024];
        let writers_done = AtomicBool::new(false);
        std::thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut observed = 0;
                loop {
                    let done = writers_done.load(Ordering::SeqCst);
                    match std::fs::read(&p) {
                        Ok(got) => {
                            assert!(got == a || got == b, "reader saw {} bytes of mixed content", got.len());
                            observed += 1;
                        }
                        Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
                    }
                    if done {
                        break observed;
                    }
                }
            });
            let writers: Vec<_> = (0..8)
                .map(|i| {
                    let p = &p;
                    let data = if i % 2 == 0 { &a } else { &b };
                    s.spawn(move || {
                        for _ in 0..4 {
                            commit_atomic(p, data).unwrap();
                        }
                    })
                })
                .collect();
            for w in writers {
                w.join().unwrap();
            }
            writers_done.store(true, Ordering::SeqCst);
            assert!(reader.join().unwrap() >= 1);
        });
        let got = std::fs::read(&p).unwrap();
        assert!(got == a || got == b);
    }
}
