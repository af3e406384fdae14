//! Build log storage
//!
//! The orchestrator hands every attempt's output to a `LogStore`; the pointer
//! it returns is what a skip entry's `log` field refers to.

use camino::Utf8PathBuf;
use std::fs;

pub trait LogStore: Send + Sync {
    /// Persist `log` and return a pointer to it, or `None` if not stored.
    ///
    /// Storage failures are logged, never raised: losing a log must not
    /// lose the build result.
    fn store(&self, package: &str, version: &str, python: &str, log: &str) -> Option<String>;
}

/// Writes `{work}/{package}/logs/{version}-{python}.log`
#[derive(Debug, Clone)]
pub struct LocalLogStore {
    work_dir: Utf8PathBuf,
}

impl LocalLogStore {
    pub fn new(work_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn path_for(&self, package: &str, version: &str, python: &str) -> Utf8PathBuf {
        self.work_dir
            .join(package)
            .join("logs")
            .join(format!("{}-{}.log", version, python))
    }
}

impl LogStore for LocalLogStore {
    fn store(&self, package: &str, version: &str, python: &str, log: &str) -> Option<String> {
        let path = self.path_for(package, version, python);
        let written = path
            .parent()
            .map(fs::create_dir_all)
            .unwrap_or(Ok(()))
            .and_then(|_| fs::write(&path, log));
        match written {
            Ok(()) => {
                tracing::debug!("Wrote build log: {}", path);
                Some(path.into_string())
            }
            Err(e) => {
                tracing::warn!("Failed to write build log {}: {}", path, e);
                None
            }
        }
    }
}

/// Discards every log
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogStore;

impl LogStore for NullLogStore {
    fn store(&self, _package: &str, _version: &str, _python: &str, _log: &str) -> Option<String> {
        None
    }
}
