//! Semantic validation of package configs, skip ledgers and leases
//!
//! Validation runs before any build attempt. Every failure is a
//! `ConfigValidation` or `VersionSpecParse` error naming the offending
//! element by index.

use crate::error::{Error, Result};
use crate::types::{Lease, PackageConfig, Skips};
use crate::version::{looks_like_specifier, same_version, VersionSpec};

/// Validate a package configuration
pub fn validate_config(config: &PackageConfig) -> Result<()> {
    if config.repo.trim().is_empty() {
        return Err(Error::validation("repo is required"));
    }

    if config.versions.is_empty() {
        return Err(Error::validation("at least one version is required"));
    }

    for (i, v) in config.versions.iter().enumerate() {
        if v.tag.trim().is_empty() {
            return Err(Error::validation(format!("versions[{}]: tag is required", i)));
        }
        if v.version.trim().is_empty() {
            return Err(Error::validation(format!(
                "versions[{}]: version is required",
                i
            )));
        }
        if let Some(earlier) = config.versions[..i]
            .iter()
            .find(|e| same_version(&e.version, &v.version))
        {
            return Err(Error::validation(format!(
                "versions[{}]: duplicate version {:?} (same as {:?})",
                i, v.version, earlier.version
            )));
        }
    }

    if let Some(key) = config.env.keys().find(|k| k.trim().is_empty()) {
        return Err(Error::validation(format!("env: invalid variable name {:?}", key)));
    }

    for (i, o) in config.overrides.iter().enumerate() {
        if o.match_spec.trim().is_empty() {
            return Err(Error::validation(format!("overrides[{}]: match is required", i)));
        }
        VersionSpec::parse(&o.match_spec)?;
        if let Some(key) = o.env.keys().find(|k| k.trim().is_empty()) {
            return Err(Error::validation(format!(
                "overrides[{}]: invalid env variable name {:?}",
                i, key
            )));
        }
    }

    Ok(())
}

/// Validate a skip ledger
pub fn validate_skips(skips: &Skips) -> Result<()> {
    for (i, s) in skips.skips.iter().enumerate() {
        if s.version.trim().is_empty() {
            return Err(Error::validation(format!("skips[{}]: version is required", i)));
        }
        if looks_like_specifier(&s.version) {
            VersionSpec::parse(&s.version)?;
        }
        if s.python.is_empty() || s.python.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::validation(format!(
                "skips[{}]: at least one python version is required",
                i
            )));
        }
        if s.reason.trim().is_empty() {
            return Err(Error::validation(format!("skips[{}]: reason is required", i)));
        }
    }
    Ok(())
}

/// Validate a lease document
pub fn validate_lease(lease: &Lease) -> Result<()> {
    if lease.agent.trim().is_empty() {
        return Err(Error::validation("agent is required"));
    }
    Ok(())
}
