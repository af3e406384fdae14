//! Directory-backed ledger store
//!
//! Each key is a file under the root. Creation writes a hidden temp file and
//! hard-links it into place, so a key is never visible half-written and the
//! link fails atomically when the key exists. Mutations also hold an
//! exclusive lock on `{root}/.lock` so compare-and-delete cannot interleave
//! with a create or delete from another agent.

use super::{check_key, ConditionalDelete, CreateOutcome, DeleteOutcome, LedgerStore};
use crate::error::{LedgerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use walkdir::WalkDir;

const LOCK_FILE: &str = ".lock";

/// Ledger rooted in a (possibly shared) directory
#[derive(Debug, Clone)]
pub struct FsLedgerStore {
    root: Utf8PathBuf,
}

impl FsLedgerStore {
    /// Open a ledger at `root`, creating the directory if needed
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| LedgerError::io(root.as_str(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<Utf8PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }

    /// Exclusive lock held until the returned file is dropped
    fn lock(&self) -> Result<File> {
        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| LedgerError::io(LOCK_FILE, e))?;
        file.lock_exclusive()
            .map_err(|e| LedgerError::io(LOCK_FILE, e))?;
        Ok(file)
    }

    fn remove(&self, key: &str, path: &Utf8Path) -> Result<DeleteOutcome> {
        match fs::remove_file(path) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(LedgerError::io(key, e)),
        }
    }

    /// Every file under the root as a `/`-separated key, hidden entries
    /// (the lock and in-flight temp files) excluded
    fn collect_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Entries removed by another agent mid-walk
                Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {
                    continue
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_else(|| self.root.to_string());
                    return Err(LedgerError::io(path, e.into()));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let Some(rel) = rel.to_str() else {
                continue;
            };
            keys.push(rel.replace('\\', "/"));
        }
        Ok(keys)
    }
}

impl LedgerStore for FsLedgerStore {
    fn try_create(&self, key: &str, content: &str) -> Result<CreateOutcome> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(self.root.as_path()).to_path_buf();
        fs::create_dir_all(&parent).map_err(|e| LedgerError::io(key, e))?;

        let _guard = self.lock()?;

        let file_name = path.file_name().unwrap_or(key);
        let temp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp)
                .map_err(|e| LedgerError::io(key, e))?;
            file.write_all(content.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| LedgerError::io(key, e))?;
        }

        let linked = fs::hard_link(&temp, &path);
        let _ = fs::remove_file(&temp);
        match linked {
            Ok(()) => Ok(CreateOutcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(LedgerError::io(key, e)),
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::io(key, e)),
        }
    }

    fn delete(&self, key: &str) -> Result<DeleteOutcome> {
        let path = self.path_for(key)?;
        let _guard = self.lock()?;
        self.remove(key, &path)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = self.collect_keys()?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn delete_if_unchanged(&self, key: &str, expected: &str) -> Result<ConditionalDelete> {
        let path = self.path_for(key)?;
        let _guard = self.lock()?;
        match fs::read_to_string(&path) {
            Ok(current) if current != expected => Ok(ConditionalDelete::Changed),
            Ok(_) => Ok(match self.remove(key, &path)? {
                DeleteOutcome::Deleted => ConditionalDelete::Deleted,
                DeleteOutcome::NotFound => ConditionalDelete::NotFound,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ConditionalDelete::NotFound),
            Err(e) => Err(LedgerError::io(key, e)),
        }
    }
}
