//! Pending-work set
//!
//! Each pending package is a `pending/{name}` key whose content is the time
//! it was queued. Insertion is a create-if-absent, so re-queuing is a no-op.

use crate::error::Result;
use crate::store::{CreateOutcome, DeleteOutcome, LedgerStore};
use chrono::Utc;
use std::sync::Arc;
use wheelhouse_core::catalog::check_package_name;

const PENDING_PREFIX: &str = "pending/";

#[derive(Clone)]
pub struct PendingQueue {
    store: Arc<dyn LedgerStore>,
}

impl PendingQueue {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    fn key(package: &str) -> Result<String> {
        check_package_name(package)?;
        Ok(format!("{}{}", PENDING_PREFIX, package))
    }

    /// Queue `package`. Returns `false` when it was already pending.
    pub fn ensure_pending(&self, package: &str) -> Result<bool> {
        let key = Self::key(package)?;
        let added = self.store.try_create(&key, &Utc::now().to_rfc3339())? == CreateOutcome::Created;
        if added {
            tracing::debug!("Queued {}", package);
        }
        Ok(added)
    }

    /// Drop `package` from the queue. Returns `false` when it was not pending.
    pub fn remove(&self, package: &str) -> Result<bool> {
        let key = Self::key(package)?;
        Ok(self.store.delete(&key)? == DeleteOutcome::Deleted)
    }

    pub fn contains(&self, package: &str) -> Result<bool> {
        let key = Self::key(package)?;
        Ok(self.store.read(&key)?.is_some())
    }

    /// Pending packages, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_keys(PENDING_PREFIX)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(PENDING_PREFIX).map(String::from))
            .filter(|name| !name.contains('/'))
            .collect())
    }
}
