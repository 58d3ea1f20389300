use std::path::{Path, PathBuf};

/// Registry of every intermediate file created (or reused) during an export.
///
/// Append-only while the run is in flight; drained exactly once, after the
/// final container is fully assembled. A failure on any earlier stage leaves
/// the ledger un-drained so the segment files survive for a later resume.
#[derive(Debug, Default)]
pub struct TempFileLedger {
    paths: Vec<PathBuf>,
}

impl TempFileLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicates are fine; deletion is idempotent.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete every registered path that still exists and clear the registry.
    ///
    /// A path that cannot be removed is logged and skipped; cleanup problems
    /// must not turn a successful export into a failure.
    pub fn drain(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed temp file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file");
                }
            }
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_deletes_registered_files_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"x").unwrap();

        let mut ledger = TempFileLedger::new();
        ledger.register(&a);
        ledger.register(&b);
        ledger.register(&a); // duplicate
        ledger.drain();

        assert!(!a.exists());
        assert!(!b.exists());
        assert!(ledger.paths().is_empty());
    }

    #[test]
    fn drain_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = TempFileLedger::new();
        ledger.register(dir.path().join("never-created.mp4"));
        ledger.drain();
        assert!(ledger.paths().is_empty());
    }

    #[test]
    fn undrained_ledger_leaves_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        std::fs::write(&a, b"x").unwrap();

        let mut ledger = TempFileLedger::new();
        ledger.register(&a);
        assert!(ledger.contains(&a));
        drop(ledger); // simulated failure path: no drain
        assert!(a.exists());
    }
}
