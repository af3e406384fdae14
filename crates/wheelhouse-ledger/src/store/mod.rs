//! Ledger store abstraction
//!
//! A keyed text store whose only concurrency primitive is an atomic
//! create-if-absent. Keys are `/`-separated relative paths such as
//! `claims/numpy.yaml`.

mod fs;
mod memory;

pub use fs::FsLedgerStore;
pub use memory::MemoryLedgerStore;

use crate::error::{LedgerError, Result};

/// Result of `try_create`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Result of `delete`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Result of `delete_if_unchanged`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalDelete {
    Deleted,
    NotFound,
    /// The entry holds different content than expected and was kept
    Changed,
}

/// Versioned text store addressed by key
pub trait LedgerStore: Send + Sync {
    /// Create `key` with `content` unless it already exists.
    ///
    /// Must be atomic across every caller of the same store: of two racing
    /// creates exactly one observes `Created`.
    fn try_create(&self, key: &str, content: &str) -> Result<CreateOutcome>;

    /// Content of `key`, or `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`
    fn delete(&self, key: &str) -> Result<DeleteOutcome>;

    /// Keys starting with `prefix`, sorted
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove `key` only while it still holds `expected`.
    ///
    /// The default implementation is a read followed by a delete; backends
    /// that can do better override it.
    fn delete_if_unchanged(&self, key: &str, expected: &str) -> Result<ConditionalDelete> {
        match self.read(key)? {
            None => Ok(ConditionalDelete::NotFound),
            Some(current) if current != expected => Ok(ConditionalDelete::Changed),
            Some(_) => Ok(match self.delete(key)? {
                DeleteOutcome::Deleted => ConditionalDelete::Deleted,
                DeleteOutcome::NotFound => ConditionalDelete::NotFound,
            }),
        }
    }
}

/// Reject empty keys and keys that would escape the store root
pub(crate) fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.contains('\\')
        && key
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && !seg.starts_with('.'));
    if valid {
        Ok(())
    } else {
        Err(LedgerError::invalid_key(key))
    }
}
