//! In-process ledger store for tests and single-agent runs

use super::{check_key, ConditionalDelete, CreateOutcome, DeleteOutcome, LedgerStore};
use crate::error::Result;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn try_create(&self, key: &str, content: &str) -> Result<CreateOutcome> {
        check_key(key)?;
        match self.entries().entry(key.to_string()) {
            Entry::Occupied(_) => Ok(CreateOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(content.to_string());
                Ok(CreateOutcome::Created)
            }
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        Ok(self.entries().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<DeleteOutcome> {
        check_key(key)?;
        Ok(match self.entries().remove(key) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete_if_unchanged(&self, key: &str, expected: &str) -> Result<ConditionalDelete> {
        check_key(key)?;
        let mut entries = self.entries();
        Ok(match entries.get(key) {
            None => ConditionalDelete::NotFound,
            Some(current) if current != expected => ConditionalDelete::Changed,
            Some(_) => {
                entries.remove(key);
                ConditionalDelete::Deleted
            }
        })
    }
}
