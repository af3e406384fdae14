//! Package leases
//!
//! A lease is the document at `claims/{package}.yaml`. Acquiring is a single
//! create-if-absent on that key, so at most one agent holds a package at a
//! time without any coordinator.

use crate::error::Result;
use crate::store::{ConditionalDelete, CreateOutcome, DeleteOutcome, LedgerStore};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use wheelhouse_core::catalog::check_package_name;
use wheelhouse_core::types::{ClaimType, Lease};
use wheelhouse_core::validate::validate_lease;

pub(crate) const CLAIMS_PREFIX: &str = "claims/";
const LEASE_SUFFIX: &str = ".yaml";

/// Ledger key of a package's lease
pub fn lease_key(package: &str) -> String {
    format!("{}{}{}", CLAIMS_PREFIX, package, LEASE_SUFFIX)
}

/// Package name addressed by a lease key
pub fn package_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(CLAIMS_PREFIX)?
        .strip_suffix(LEASE_SUFFIX)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

/// Result of an acquire attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller now holds the lease
    Acquired(Lease),
    /// Someone else holds it. The holder is included when it could be read.
    Conflict { holder: Option<Lease> },
}

impl ClaimOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, ClaimOutcome::Acquired(_))
    }
}

/// Result of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// There was no lease to release
    NotFound,
    /// The lease was replaced by another holder and left in place
    Superseded,
}

/// A lease together with the package it guards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseRecord {
    pub package: String,
    #[serde(flatten)]
    pub lease: Lease,
}

/// Acquires, releases and inspects package leases
#[derive(Clone)]
pub struct ClaimManager {
    store: Arc<dyn LedgerStore>,
}

impl ClaimManager {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Try to take the lease on `package` for `agent`, stamped now
    pub fn acquire(&self, package: &str, agent: &str, claim_type: ClaimType) -> Result<ClaimOutcome> {
        self.acquire_at(package, agent, claim_type, Utc::now())
    }

    /// Try to take the lease on `package` with an explicit timestamp
    pub fn acquire_at(
        &self,
        package: &str,
        agent: &str,
        claim_type: ClaimType,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        check_package_name(package)?;
        let lease = Lease::new(agent, claim_type, now);
        validate_lease(&lease)?;

        let key = lease_key(package);
        match self.store.try_create(&key, &lease.to_yaml()?)? {
            CreateOutcome::Created => {
                tracing::info!("Claimed {} as {} ({})", package, agent, claim_type);
                Ok(ClaimOutcome::Acquired(lease))
            }
            CreateOutcome::AlreadyExists => {
                let holder = self.current(package).unwrap_or_else(|e| {
                    tracing::debug!("Could not read existing lease on {}: {}", package, e);
                    None
                });
                tracing::debug!("{} is already claimed", package);
                Ok(ClaimOutcome::Conflict { holder })
            }
        }
    }

    /// Remove the lease on `package` regardless of holder.
    ///
    /// Idempotent: releasing a missing lease reports `NotFound`.
    pub fn release(&self, package: &str) -> Result<ReleaseOutcome> {
        check_package_name(package)?;
        match self.store.delete(&lease_key(package))? {
            DeleteOutcome::Deleted => {
                tracing::info!("Released {}", package);
                Ok(ReleaseOutcome::Released)
            }
            DeleteOutcome::NotFound => Ok(ReleaseOutcome::NotFound),
        }
    }

    /// Remove the lease on `package` only if it is still exactly `lease`.
    ///
    /// An agent whose lease was reclaimed and re-acquired by someone else
    /// must not delete the new holder's lease.
    pub fn release_owned(&self, package: &str, lease: &Lease) -> Result<ReleaseOutcome> {
        check_package_name(package)?;
        match self
            .store
            .delete_if_unchanged(&lease_key(package), &lease.to_yaml()?)?
        {
            ConditionalDelete::Deleted => {
                tracing::info!("Released {}", package);
                Ok(ReleaseOutcome::Released)
            }
            ConditionalDelete::NotFound => Ok(ReleaseOutcome::NotFound),
            ConditionalDelete::Changed => {
                tracing::warn!("Lease on {} is now held by another agent; leaving it", package);
                Ok(ReleaseOutcome::Superseded)
            }
        }
    }

    /// Current lease on `package`, if any
    pub fn current(&self, package: &str) -> Result<Option<Lease>> {
        check_package_name(package)?;
        match self.store.read(&lease_key(package))? {
            Some(content) => Ok(Some(Lease::from_yaml(&content)?)),
            None => Ok(None),
        }
    }

    /// Every readable lease, sorted by package. Unreadable leases are logged
    /// and left out.
    pub fn list(&self) -> Result<Vec<LeaseRecord>> {
        let mut records = Vec::new();
        for key in self.store.list_keys(CLAIMS_PREFIX)? {
            let Some(package) = package_from_key(&key) else {
                continue;
            };
            let Some(content) = self.store.read(&key)? else {
                continue;
            };
            match Lease::from_yaml(&content) {
                Ok(lease) => records.push(LeaseRecord {
                    package: package.to_string(),
                    lease,
                }),
                Err(e) => tracing::warn!("Unreadable lease {}: {}", key, e),
            }
        }
        Ok(records)
    }

    /// `now - claimed_at > ttl`
    pub fn is_expired(lease: &Lease, now: DateTime<Utc>, ttl: Duration) -> bool {
        lease.is_expired(now, ttl)
    }
}
