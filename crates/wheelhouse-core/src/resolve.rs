//! Effective configuration for one version
//!
//! The base configuration is merged with at most one override: the first in
//! list order whose `match` specifier accepts the target version. Each field
//! kind has its own merge rule:
//!
//! - lists (`system_deps`, `patches`) append, base first, no de-duplication
//! - maps (`env`) union, override wins on collision
//! - scalars (`script`) replace only when the override value is non-empty

use crate::error::Result;
use crate::types::{Override, PackageConfig};
use crate::version::VersionSpec;
use serde::Serialize;
use std::collections::BTreeMap;

/// Merged configuration used to build one version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub system_deps: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub patches: Vec<String>,
    pub script: String,

    /// Index of the override that applied, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_override: Option<usize>,
}

impl EffectiveConfig {
    fn from_base(base: &PackageConfig) -> Self {
        Self {
            system_deps: base.system_deps.clone(),
            env: base.env.clone(),
            patches: base.patches.clone(),
            script: base.script.clone(),
            applied_override: None,
        }
    }

    /// The custom build command, if one is configured
    pub fn custom_script(&self) -> Option<&str> {
        if self.script.is_empty() {
            None
        } else {
            Some(&self.script)
        }
    }
}

/// Resolve the effective configuration of `base` for `target_version`
pub fn resolve(base: &PackageConfig, target_version: &str) -> Result<EffectiveConfig> {
    resolve_with(base, &base.overrides, target_version)
}

/// Resolve using an explicit override list
pub fn resolve_with(
    base: &PackageConfig,
    overrides: &[Override],
    target_version: &str,
) -> Result<EffectiveConfig> {
    let mut effective = EffectiveConfig::from_base(base);

    for (index, candidate) in overrides.iter().enumerate() {
        let spec = VersionSpec::parse(&candidate.match_spec)?;
        if !spec.matches(target_version) {
            continue;
        }

        merge_list(&mut effective.system_deps, &candidate.system_deps);
        merge_list(&mut effective.patches, &candidate.patches);
        merge_map(&mut effective.env, &candidate.env);
        merge_scalar(&mut effective.script, &candidate.script);
        effective.applied_override = Some(index);

        tracing::debug!(
            version = target_version,
            matched = %candidate.match_spec,
            "applied override {}",
            index
        );
        break;
    }

    Ok(effective)
}

fn merge_list(base: &mut Vec<String>, extra: &[String]) {
    base.extend(extra.iter().cloned());
}

fn merge_map(base: &mut BTreeMap<String, String>, extra: &BTreeMap<String, String>) {
    for (key, value) in extra {
        base.insert(key.clone(), value.clone());
    }
}

fn merge_scalar(base: &mut String, replacement: &str) {
    if !replacement.is_empty() {
        *base = replacement.to_string();
    }
}
