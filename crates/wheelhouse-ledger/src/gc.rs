//! Expired lease garbage collection
//!
//! A sweep deletes leases whose holder has been silent for longer than the
//! TTL. Every deletion is conditional on the lease still being the one that
//! was judged expired, so a lease released and re-acquired mid-sweep is
//! never removed. Packages reclaimed before their first config was committed
//! go back to the pending queue.

use crate::claims::{package_from_key, LeaseRecord, CLAIMS_PREFIX};
use crate::error::Result;
use crate::queue::PendingQueue;
use crate::store::{ConditionalDelete, LedgerStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use wheelhouse_core::types::Lease;
use wheelhouse_core::PackageCatalog;

/// What the collector needs to know about the package catalog
#[cfg_attr(test, mockall::automock)]
pub trait CatalogLookup: Send + Sync {
    /// Whether the package already has a committed configuration
    fn has_config(&self, package: &str) -> bool;
}

impl CatalogLookup for PackageCatalog {
    fn has_config(&self, package: &str) -> bool {
        PackageCatalog::has_config(self, package)
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Lease keys examined
    pub scanned: usize,
    /// Expired leases deleted (or that would be, in a dry run)
    pub reclaimed: Vec<LeaseRecord>,
    /// Reclaimed packages put back on the pending queue
    pub requeued: Vec<String>,
    /// Lease keys that could not be parsed and were left alone
    pub unreadable: Vec<String>,
    /// Expired leases that changed before they could be deleted
    pub raced: usize,
}

impl SweepReport {
    pub fn reclaimed_count(&self) -> usize {
        self.reclaimed.len()
    }
}

pub struct GarbageCollector {
    store: Arc<dyn LedgerStore>,
    queue: PendingQueue,
    catalog: Arc<dyn CatalogLookup>,
    ttl: Duration,
    dry_run: bool,
}

impl GarbageCollector {
    pub fn new(store: Arc<dyn LedgerStore>, catalog: Arc<dyn CatalogLookup>, ttl: Duration) -> Self {
        Self {
            queue: PendingQueue::new(store.clone()),
            store,
            catalog,
            ttl,
            dry_run: false,
        }
    }

    /// Report what would be reclaimed without touching the ledger
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now())
    }

    /// Sweep as if the current time were `now`
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for key in self.store.list_keys(CLAIMS_PREFIX)? {
            let Some(package) = package_from_key(&key) else {
                continue;
            };
            report.scanned += 1;

            let Some(content) = self.store.read(&key)? else {
                continue;
            };
            let lease = match Lease::from_yaml(&content) {
                Ok(lease) => lease,
                Err(e) => {
                    tracing::warn!("Skipping unreadable lease {}: {}", key, e);
                    report.unreadable.push(key.clone());
                    continue;
                }
            };

            if !lease.is_expired(now, self.ttl) {
                continue;
            }

            let age_secs = lease.age(now).num_seconds();
            if self.dry_run {
                tracing::info!(
                    "Would reclaim {} held by {} for {}s",
                    package,
                    lease.agent,
                    age_secs
                );
            } else {
                match self.store.delete_if_unchanged(&key, &content)? {
                    ConditionalDelete::Deleted => {
                        tracing::info!(
                            "Reclaimed {} held by {} for {}s",
                            package,
                            lease.agent,
                            age_secs
                        );
                    }
                    ConditionalDelete::NotFound | ConditionalDelete::Changed => {
                        tracing::debug!("Lease on {} changed during sweep; kept", package);
                        report.raced += 1;
                        continue;
                    }
                }
            }

            if !self.catalog.has_config(package) {
                if !self.dry_run {
                    self.queue.ensure_pending(package)?;
                }
                report.requeued.push(package.to_string());
            }

            report.reclaimed.push(LeaseRecord {
                package: package.to_string(),
                lease,
            });
        }

        tracing::debug!(
            scanned = report.scanned,
            reclaimed = report.reclaimed.len(),
            requeued = report.requeued.len(),
            "lease sweep complete"
        );
        Ok(report)
    }
}
